use actix_web::{web, HttpResponse, Responder};

use crate::execution::SessionError;
use crate::AppState;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/api/sessions").route(web::get().to(session_stats)));
    cfg.service(web::resource("/api/sessions/{id}").route(web::get().to(get_transcript)));
}

async fn session_stats(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(state.sessions.stats())
}

/// Full history of a live session. Refused while a turn is running so the
/// transcript never shows a half-finished turn.
async fn get_transcript(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let session_id = path.into_inner();
    match state.sessions.try_acquire(&session_id) {
        Ok(session) => HttpResponse::Ok().json(session.transcript()),
        Err(e @ SessionError::NotFound(_)) => HttpResponse::NotFound().json(serde_json::json!({
            "error": e.to_string()
        })),
        Err(e @ SessionError::Busy(_)) => HttpResponse::Conflict().json(serde_json::json!({
            "error": e.to_string()
        })),
    }
}
