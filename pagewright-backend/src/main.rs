use actix_cors::Cors;
use actix_files::Files;
use actix_web::{middleware::Logger, web, App, HttpServer};
use dotenv::dotenv;
use std::sync::Arc;
use std::time::Duration;

mod agents;
mod ai;
mod artifacts;
mod config;
mod controllers;
mod execution;
mod gateway;
mod http;
mod models;
mod orchestrator;

use agents::AgentRoster;
use ai::{AiClient, OpenAIClient};
use artifacts::ArtifactStore;
use config::Config;
use execution::{SessionRegistry, SESSION_IDLE_TIMEOUT};
use orchestrator::dispatch::Dispatcher;
use orchestrator::Orchestrator;

/// How often idle sessions are swept
const SESSION_PRUNE_INTERVAL: Duration = Duration::from_secs(600);

pub struct AppState {
    pub config: Config,
    pub orchestrator: Arc<Orchestrator>,
    pub sessions: Arc<SessionRegistry>,
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init();

    let config = Config::from_env()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
    let port = config.port;

    let client = OpenAIClient::new(&config.openai_api_key, Some(&config.openai_endpoint))
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
    log::info!(
        "Using model {} (temperature {}) at {}",
        config.generation.model,
        config.generation.temperature,
        client.endpoint()
    );
    let client = Arc::new(AiClient::OpenAI(client));

    log::info!("Artifacts directory: {}", config.artifacts_dir.display());
    std::fs::create_dir_all(&config.artifacts_dir)?;
    let artifacts = Arc::new(ArtifactStore::new(config.artifacts_dir.clone()));

    let dispatcher = Dispatcher::new(AgentRoster::new(client.clone()));
    let orchestrator = Arc::new(Orchestrator::new(
        client,
        config.generation.clone(),
        dispatcher,
        artifacts,
    ));
    let sessions = Arc::new(SessionRegistry::new());

    let pruned_sessions = sessions.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_PRUNE_INTERVAL);
        loop {
            interval.tick().await;
            pruned_sessions.prune_idle(SESSION_IDLE_TIMEOUT);
        }
    });

    log::info!("Starting Pagewright server on port {}", port);
    log::info!("Chat gateway available at ws://0.0.0.0:{}/ws", port);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(web::Data::new(AppState {
                config: config.clone(),
                orchestrator: Arc::clone(&orchestrator),
                sessions: Arc::clone(&sessions),
            }))
            .app_data(web::Data::new(Arc::clone(&orchestrator)))
            .app_data(web::Data::new(Arc::clone(&sessions)))
            .wrap(Logger::default())
            .wrap(cors)
            .configure(controllers::health::config)
            .configure(controllers::sessions::config)
            .configure(controllers::artifacts::config)
            .route("/ws", web::get().to(gateway::actix_ws::ws_handler))
            // Live preview of the page being built
            .service(Files::new("/preview", config.artifacts_dir.clone()).index_file("index.html"))
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}
