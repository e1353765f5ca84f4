// src/api/handlers/code.rs
use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, Result};
use serde::Serialize;

use crate::api::AppState;
use crate::config::ResponseMode;
use crate::models::{CodeSubmission, DebugResponse, ReasoningResponse};
use crate::runner::Fault;

/// Status for an outcome. Legacy mode always answers 200.
pub fn status_for(mode: ResponseMode, fault: Option<Fault>) -> StatusCode {
    match (mode, fault) {
        (ResponseMode::Legacy, _) | (ResponseMode::Strict, None) => StatusCode::OK,
        (ResponseMode::Strict, Some(Fault::Inference)) => StatusCode::BAD_GATEWAY,
        (ResponseMode::Strict, Some(Fault::Sandbox)) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn respond<T: Serialize>(state: &AppState, fault: Option<Fault>, body: T) -> HttpResponse {
    HttpResponse::build(status_for(state.config.server.response_mode, fault)).json(body)
}

pub async fn reasoning(state: web::Data<AppState>, req: web::Json<CodeSubmission>) -> Result<HttpResponse> {
    let submission = req.into_inner();
    log::debug!("Reasoning request ({} bytes)", submission.code.len());

    let outcome = state.pipeline.reasoning(&submission.code).await;

    Ok(respond(&state, outcome.fault, ReasoningResponse { reasoning: outcome.text }))
}

pub async fn debug(state: web::Data<AppState>, req: web::Json<CodeSubmission>) -> Result<HttpResponse> {
    let submission = req.into_inner();
    log::debug!("Debug request ({} bytes)", submission.code.len());

    let outcome = state.pipeline.debug(&submission.code).await;

    Ok(respond(&state, outcome.fault, DebugResponse { output: outcome.text }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(ResponseMode::Legacy, Some(Fault::Inference)), StatusCode::OK);
        assert_eq!(status_for(ResponseMode::Legacy, Some(Fault::Sandbox)), StatusCode::OK);
        assert_eq!(status_for(ResponseMode::Strict, None), StatusCode::OK);
        assert_eq!(status_for(ResponseMode::Strict, Some(Fault::Inference)), StatusCode::BAD_GATEWAY);
        assert_eq!(status_for(ResponseMode::Strict, Some(Fault::Sandbox)), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
