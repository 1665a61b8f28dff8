use crate::knowledge::{KnowledgeResponse, DEFAULT_TOP_K};
use crate::Error;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use super::AppState;

#[derive(Debug, Deserialize)]
struct SearchBody {
    #[serde(default)]
    query: Option<Value>,
    #[serde(default)]
    top_k: Option<usize>,
}

pub async fn create_session(State(state): State<Arc<AppState>>) -> Response {
    match state.mint_session().await {
        Ok(session) => Json(session).into_response(),
        Err(err) => {
            tracing::error!("Session creation error: {err}");
            let message = match err {
                Error::SessionToken(message) | Error::InvalidConfig(message) => message,
                other => other.to_string(),
            };
            let body = json!({
                "error": message,
                "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            });
            (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
        }
    }
}

pub async fn search_knowledge(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let body: SearchBody = match serde_json::from_slice(&body) {
        Ok(body) => body,
        Err(err) => {
            tracing::warn!("Unreadable knowledge search body: {err}");
            return Json(KnowledgeResponse::unavailable()).into_response();
        }
    };

    let Some(query) = body.query.and_then(query_text) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "Query parameter is required"})),
        )
            .into_response();
    };

    let response = state.knowledge.lookup(&query, body.top_k.unwrap_or(DEFAULT_TOP_K)).await;
    Json(response).into_response()
}

/// Only absent, null, empty, `false` and zero queries are rejected; anything else is
/// searched for as text.
fn query_text(query: Value) -> Option<String> {
    match query {
        Value::Null | Value::Bool(false) => None,
        Value::String(text) if text.is_empty() => None,
        Value::String(text) => Some(text),
        Value::Number(number) if number.as_f64() == Some(0.0) => None,
        other => Some(other.to_string()),
    }
}
