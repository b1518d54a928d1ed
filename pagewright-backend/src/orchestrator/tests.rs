use super::*;
use crate::agents::AgentRoster;
use crate::ai::mock::TraceEntry;
use crate::ai::{MessageContent, MessageRole, MockAiClient, MockReply};
use crate::artifacts::ArtifactKind;
use crate::models::user_turn::Attachment;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tempfile::TempDir;
use tokio::sync::mpsc;

const PLAN_DONE: &str = "# Overview\nA landing page.\n\n# Milestones\n\n - [ ] 1. Build the header\n - [ ] 2. Style the footer\n";

struct Harness {
    orchestrator: Orchestrator,
    client: Arc<AiClient>,
    _dir: TempDir,
}

impl Harness {
    fn new(replies: Vec<MockReply>) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let client = Arc::new(AiClient::Mock(MockAiClient::new(replies)));
        let orchestrator = Orchestrator::new(
            client.clone(),
            GenerationConfig::default(),
            Dispatcher::new(AgentRoster::new(client.clone())),
            Arc::new(ArtifactStore::new(dir.path())),
        );
        Self {
            orchestrator,
            client,
            _dir: dir,
        }
    }

    fn trace(&self) -> Vec<TraceEntry> {
        match self.client.as_ref() {
            AiClient::Mock(mock) => mock.trace(),
            _ => unreachable!(),
        }
    }
}

fn drain(rx: &mut mpsc::Receiver<GatewayEvent>) -> Vec<GatewayEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn jpeg_attachment() -> Attachment {
    Attachment {
        name: Some("homepage.jpg".to_string()),
        mime: "image/jpeg".to_string(),
        path: None,
        data: Some(STANDARD.encode([0xFFu8, 0xD8, 0xFF, 0xE0])),
    }
}

#[test]
fn test_state_transitions() {
    use TurnState::*;
    assert!(Idle.can_transition_to(AwaitingModel));
    assert!(AwaitingModel.can_transition_to(DirectiveCheck));
    assert!(DirectiveCheck.can_transition_to(NoOp));
    assert!(DirectiveCheck.can_transition_to(AgentHandoff));
    assert!(NoOp.can_transition_to(Idle));
    assert!(AgentHandoff.can_transition_to(Idle));

    assert!(!Idle.can_transition_to(DirectiveCheck));
    assert!(!NoOp.can_transition_to(AgentHandoff));
    assert!(!DirectiveCheck.can_transition_to(Idle));
}

#[tokio::test]
async fn test_image_turn_hands_off_to_planning() {
    let harness = Harness::new(vec![
        MockReply::text(r#"{"function_name":"call_agent","parameters":["planning"]}"#),
        MockReply::text("# Overview\nA hero banner over a three-column grid."),
    ]);
    let mut session = harness.orchestrator.new_session();
    let (sink, mut rx) = EventSink::channel(session.id.clone());

    let turn = UserTurn {
        text: "Here is my homepage design".to_string(),
        attachments: vec![jpeg_attachment()],
    };
    let outcome = harness
        .orchestrator
        .handle_turn(&mut session, turn, &sink)
        .await
        .unwrap();

    assert_eq!(outcome.final_state, TurnState::AgentHandoff);
    assert_eq!(outcome.agent, Some(AgentKind::Planning));
    assert_eq!(outcome.content, "# Overview\nA hero banner over a three-column grid.");

    let history = session.store.all();
    assert_eq!(history.len(), 3);
    assert_eq!(history[0].role, MessageRole::System);
    assert_eq!(history[0].content.as_text(), prompts::ORCHESTRATOR_PROMPT);
    assert!(history[1].content.is_multimodal());
    assert_eq!(history[1].content.as_text(), "Here is my homepage design");
    assert_eq!(history[2], Message::assistant(outcome.content.clone()));

    // The agent saw the same history behind its own instruction layer
    let trace = harness.trace();
    assert_eq!(trace.len(), 2);
    let agent_input = &trace[1].input_messages;
    assert_eq!(agent_input[0], history[0]);
    assert_eq!(agent_input[1].role, MessageRole::System);
    assert!(agent_input[1].content.as_text().starts_with("# Planning Agent"));
    assert_eq!(agent_input[2], history[1]);

    let handoff = drain(&mut rx)
        .into_iter()
        .find(|e| e.event == "agent.handoff")
        .unwrap();
    assert_eq!(handoff.data["agent"], "planning");
    assert_eq!(handoff.data["fallback"], false);
}

#[tokio::test]
async fn test_plain_reply_ends_in_noop() {
    let reply = "Great, the plan is saved. Say \"build it\" when you want milestone 1.";
    let harness = Harness::new(vec![MockReply::text(reply)]);
    harness
        .orchestrator
        .artifacts()
        .write(ArtifactKind::Plan, PLAN_DONE)
        .await
        .unwrap();

    let mut session = harness.orchestrator.new_session();
    session.store.append(Message::user("Plan this page"));
    session.store.append(Message::assistant(PLAN_DONE));
    let (sink, mut rx) = EventSink::channel(session.id.clone());

    let outcome = harness
        .orchestrator
        .handle_turn(&mut session, UserTurn::text("go ahead"), &sink)
        .await
        .unwrap();

    assert_eq!(outcome.final_state, TurnState::NoOp);
    assert_eq!(outcome.agent, None);
    assert_eq!(outcome.content, reply);
    assert_eq!(session.store.len(), 5);
    assert_eq!(session.store.all()[3], Message::user("go ahead"));
    assert_eq!(session.store.last(), Some(&Message::assistant(reply)));

    let events = drain(&mut rx);
    assert!(events.iter().all(|e| e.event != "agent.handoff"));
    let streamed: String = events.iter().filter_map(|e| e.token()).collect();
    assert_eq!(streamed, reply);
}

#[tokio::test]
async fn test_unknown_action_ends_in_noop() {
    let text = r#"{"function_name":"unknown_fn","parameters":[]}"#;
    let harness = Harness::new(vec![MockReply::text(text)]);
    let mut session = harness.orchestrator.new_session();
    let (sink, _rx) = EventSink::channel(session.id.clone());

    let outcome = harness
        .orchestrator
        .handle_turn(&mut session, UserTurn::text("hello"), &sink)
        .await
        .unwrap();

    assert_eq!(outcome.final_state, TurnState::NoOp);
    assert_eq!(outcome.content, text);
    assert_eq!(session.store.last(), Some(&Message::assistant(text)));
    assert_eq!(harness.trace().len(), 1);
}

#[tokio::test]
async fn test_malformed_directive_ends_in_noop() {
    let text = r#"{"function_name":"call_agent","parameters":["planning"]"#;
    let harness = Harness::new(vec![MockReply::text(text)]);
    let mut session = harness.orchestrator.new_session();
    let (sink, _rx) = EventSink::channel(session.id.clone());

    let outcome = harness
        .orchestrator
        .handle_turn(&mut session, UserTurn::text("plan it"), &sink)
        .await
        .unwrap();
    assert_eq!(outcome.final_state, TurnState::NoOp);
    assert_eq!(outcome.content, text);
}

#[tokio::test]
async fn test_wrong_argument_count_ends_in_noop() {
    let text = r#"{"function_name":"call_agent","parameters":[]}"#;
    let harness = Harness::new(vec![MockReply::text(text)]);
    let mut session = harness.orchestrator.new_session();
    let (sink, _rx) = EventSink::channel(session.id.clone());

    let outcome = harness
        .orchestrator
        .handle_turn(&mut session, UserTurn::text("plan it"), &sink)
        .await
        .unwrap();
    assert_eq!(outcome.final_state, TurnState::NoOp);
    assert_eq!(harness.trace().len(), 1);
}

#[tokio::test]
async fn test_unknown_keyword_falls_back_to_implementation() {
    let harness = Harness::new(vec![
        MockReply::text(r#"{"function_name":"call_agent","parameters":["designer"]}"#),
        MockReply::text("Nothing to build yet."),
    ]);
    let mut session = harness.orchestrator.new_session();
    let (sink, mut rx) = EventSink::channel(session.id.clone());

    let outcome = harness
        .orchestrator
        .handle_turn(&mut session, UserTurn::text("next"), &sink)
        .await
        .unwrap();
    assert_eq!(outcome.agent, Some(AgentKind::Implementation));

    let handoff = drain(&mut rx)
        .into_iter()
        .find(|e| e.event == "agent.handoff")
        .unwrap();
    assert_eq!(handoff.data["keyword"], "designer");
    assert_eq!(handoff.data["fallback"], true);
}

#[tokio::test]
async fn test_implementation_turn_updates_artifacts() {
    let save_page = serde_json::json!({
        "function_name": "update_artifact",
        "parameters": ["index.html", "<header>Acme</header>"]
    })
    .to_string();
    let harness = Harness::new(vec![
        MockReply::text(r#"{"function_name":"call_agent","parameters":["implementation"]}"#),
        MockReply::Tokens(vec![save_page]),
        MockReply::text(r#"{"function_name":"complete_milestone","parameters":[1]}"#),
        MockReply::text("The header is built and milestone 1 is checked off."),
    ]);
    let artifacts = harness.orchestrator.artifacts();
    artifacts.write(ArtifactKind::Plan, PLAN_DONE).await.unwrap();

    let mut session = harness.orchestrator.new_session();
    let (sink, _rx) = EventSink::channel(session.id.clone());
    let outcome = harness
        .orchestrator
        .handle_turn(&mut session, UserTurn::text("go ahead"), &sink)
        .await
        .unwrap();

    assert_eq!(outcome.content, "The header is built and milestone 1 is checked off.");
    // Agent scratch turns stay out of the session
    assert_eq!(session.store.len(), 3);
    assert_eq!(
        artifacts.read(ArtifactKind::Page).await.unwrap().as_deref(),
        Some("<header>Acme</header>")
    );
    let plan = artifacts.plan().await.unwrap().unwrap();
    assert_eq!(plan.completed_count(), 1);
}

#[tokio::test]
async fn test_system_message_survives_many_turns() {
    let harness = Harness::new(vec![
        MockReply::text("One."),
        MockReply::text("Two."),
        MockReply::text("Three."),
    ]);
    let mut session = harness.orchestrator.new_session();
    let (sink, _rx) = EventSink::channel(session.id.clone());

    for text in ["a", "b", "c"] {
        harness
            .orchestrator
            .handle_turn(&mut session, UserTurn::text(text), &sink)
            .await
            .unwrap();
    }

    assert_eq!(session.store.len(), 7);
    assert_eq!(session.store.count_role(MessageRole::System), 1);
    assert_eq!(session.store.all()[0].content.as_text(), prompts::ORCHESTRATOR_PROMPT);

    // Each call sees the full history so far
    let trace = harness.trace();
    assert_eq!(trace[2].input_messages.len(), 6);
}

#[tokio::test]
async fn test_unreadable_attachment_leaves_history_untouched() {
    let harness = Harness::new(vec![MockReply::text("unused")]);
    let mut session = harness.orchestrator.new_session();
    let (sink, _rx) = EventSink::channel(session.id.clone());

    let turn = UserTurn {
        text: "see attached".to_string(),
        attachments: vec![Attachment {
            name: Some("missing.jpg".to_string()),
            mime: "image/jpeg".to_string(),
            path: Some("/nonexistent/missing.jpg".into()),
            data: None,
        }],
    };
    let err = harness
        .orchestrator
        .handle_turn(&mut session, turn, &sink)
        .await
        .unwrap_err();

    assert!(matches!(err, TurnError::Attachment(_)));
    assert_eq!(session.store.len(), 1);
    assert!(harness.trace().is_empty());
}

#[tokio::test]
async fn test_model_failure_appends_no_assistant_turn() {
    let harness = Harness::new(vec![
        MockReply::FailMidStream(vec!["Sure".to_string()], "upstream closed".to_string()),
        MockReply::text("Recovered."),
    ]);
    let mut session = harness.orchestrator.new_session();
    let (sink, _rx) = EventSink::channel(session.id.clone());

    let err = harness
        .orchestrator
        .handle_turn(&mut session, UserTurn::text("first"), &sink)
        .await
        .unwrap_err();
    assert!(matches!(err, TurnError::Model(_)));
    assert_eq!(session.store.len(), 2);
    assert_eq!(session.store.count_role(MessageRole::Assistant), 0);

    // The session stays usable
    let outcome = harness
        .orchestrator
        .handle_turn(&mut session, UserTurn::text("again"), &sink)
        .await
        .unwrap();
    assert_eq!(outcome.content, "Recovered.");
    assert_eq!(session.store.len(), 4);
}

#[tokio::test]
async fn test_disconnect_abandons_turn() {
    let harness = Harness::new(vec![MockReply::text("nobody is listening")]);
    let mut session = harness.orchestrator.new_session();
    let (sink, rx) = EventSink::channel(session.id.clone());
    drop(rx);

    let err = harness
        .orchestrator
        .handle_turn(&mut session, UserTurn::text("hi"), &sink)
        .await
        .unwrap_err();
    assert!(matches!(err, TurnError::Disconnected));
    assert_eq!(session.store.count_role(MessageRole::Assistant), 0);
}

#[tokio::test]
async fn test_plain_turn_is_stored_verbatim() {
    let harness = Harness::new(vec![MockReply::text("ok")]);
    let mut session = harness.orchestrator.new_session();
    let (sink, _rx) = EventSink::channel(session.id.clone());

    let raw = "  keep   my spacing\n";
    harness
        .orchestrator
        .handle_turn(&mut session, UserTurn::text(raw), &sink)
        .await
        .unwrap();
    assert_eq!(
        session.store.all()[1].content,
        MessageContent::Text(raw.to_string())
    );
}
