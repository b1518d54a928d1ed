use actix_web::{web, HttpResponse, Responder};
use serde::Serialize;

use crate::artifacts::{ArtifactKind, Milestone};
use crate::AppState;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/api/artifacts").route(web::get().to(list_artifacts)));
    cfg.service(web::resource("/api/artifacts/plan").route(web::get().to(get_plan)));
}

#[derive(Serialize)]
struct ArtifactInfo {
    file: &'static str,
    bytes: usize,
}

#[derive(Serialize)]
struct PlanResponse {
    milestones: Vec<Milestone>,
    completed: usize,
    next: Option<u32>,
    finished: bool,
    summary: String,
    markdown: String,
}

async fn list_artifacts(state: web::Data<AppState>) -> impl Responder {
    match state.orchestrator.artifacts().snapshot().await {
        Ok(files) => {
            let files: Vec<ArtifactInfo> = files
                .into_iter()
                .map(|(kind, contents)| ArtifactInfo {
                    file: kind.file_name(),
                    bytes: contents.len(),
                })
                .collect();
            HttpResponse::Ok().json(files)
        }
        Err(e) => {
            log::error!("[ARTIFACT] Failed to list artifacts: {}", e);
            HttpResponse::InternalServerError().json(serde_json::json!({ "error": e }))
        }
    }
}

async fn get_plan(state: web::Data<AppState>) -> impl Responder {
    let artifacts = state.orchestrator.artifacts();
    let markdown = match artifacts.read(ArtifactKind::Plan).await {
        Ok(Some(markdown)) => markdown,
        Ok(None) => {
            return HttpResponse::NotFound().json(serde_json::json!({
                "error": "No plan has been saved yet"
            }));
        }
        Err(e) => {
            log::error!("[ARTIFACT] Failed to read plan: {}", e);
            return HttpResponse::InternalServerError().json(serde_json::json!({ "error": e }));
        }
    };

    let plan = crate::artifacts::Plan::parse(&markdown);
    HttpResponse::Ok().json(PlanResponse {
        milestones: plan.milestones().to_vec(),
        completed: plan.completed_count(),
        next: plan.next_pending().map(|m| m.number),
        finished: plan.is_finished(),
        summary: plan.progress_summary(),
        markdown,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_state;
    use actix_web::{test, App};

    #[actix_web::test]
    async fn test_plan_route() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path());
        let app = test::init_service(App::new().app_data(state.clone()).configure(config)).await;

        let req = test::TestRequest::get().uri("/api/artifacts/plan").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::NOT_FOUND);

        state
            .orchestrator
            .artifacts()
            .write(ArtifactKind::Plan, " - [x] 1. Header\n - [ ] 2. Footer\n")
            .await
            .unwrap();

        let req = test::TestRequest::get().uri("/api/artifacts/plan").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["completed"], 1);
        assert_eq!(body["next"], 2);
        assert_eq!(body["finished"], false);
        assert_eq!(body["milestones"][1]["title"], "Footer");

        let req = test::TestRequest::get().uri("/api/artifacts").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body[0]["file"], "plan.md");
    }
}
