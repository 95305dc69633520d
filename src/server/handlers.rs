use std::io::ErrorKind;
use std::sync::Arc;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, error, warn};

use super::AppState;
use crate::address::check_syntax;
use crate::cancel::CancelFlag;
use crate::pipeline::Verdict;

#[derive(Debug, Clone, Deserialize)]
pub struct VerifyRequest {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub is_valid: bool,
    pub message: String,
}

impl VerifyResponse {
    fn invalid(message: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            message: message.into(),
        }
    }
}

impl From<Verdict> for VerifyResponse {
    fn from(verdict: Verdict) -> Self {
        Self {
            is_valid: verdict.is_valid,
            message: verdict.message,
        }
    }
}

pub async fn root() -> Json<Value> {
    Json(json!({ "message": "Hello World" }))
}

/// Every outcome the caller can act on is a 200; only a crashed validation
/// task answers 500.
pub async fn verify_email(
    State(state): State<AppState>,
    body: Result<Json<VerifyRequest>, JsonRejection>,
) -> (StatusCode, Json<VerifyResponse>) {
    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => {
            debug!(error = %rejection, "rejected request body");
            let message = format!("malformed request: {}", rejection.body_text());
            return (StatusCode::OK, Json(VerifyResponse::invalid(message)));
        }
    };

    let syntax = check_syntax(&request.name, state.syntax_mode);
    if !syntax.ok {
        let message = format!("invalid email address: {}", syntax.reasons.join(", "));
        return (StatusCode::OK, Json(VerifyResponse::invalid(message)));
    }

    // Dropping this future (client disconnect) cancels the blocking work.
    let cancel = CancelFlag::new();
    let _guard = cancel.drop_guard();
    let validator = Arc::clone(&state.validator);
    let input = request.name;
    let task = tokio::task::spawn_blocking(move || validator.validate(&input, &cancel));

    match task.await {
        Ok(verdict) => (StatusCode::OK, Json(verdict.into())),
        Err(err) => {
            error!(error = %err, "validation task failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(VerifyResponse::invalid("internal error")),
            )
        }
    }
}

pub async fn favicon(State(state): State<AppState>) -> Response {
    let path = state.static_dir.join("favicon.ico");
    match tokio::fs::read(&path).await {
        Ok(bytes) => ([(header::CONTENT_TYPE, "image/x-icon")], bytes).into_response(),
        Err(err) if err.kind() == ErrorKind::NotFound => StatusCode::NOT_FOUND.into_response(),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "cannot read favicon");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
