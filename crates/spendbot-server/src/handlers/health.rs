//! Health handler

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Serialize;

use crate::{AppError, AppState};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub classifier: String,
    pub users: i64,
}

/// GET /health - Liveness plus classifier host and user count
pub async fn health(State(state): State<Arc<AppState>>) -> Result<Json<HealthResponse>, AppError> {
    let users = state.dispatcher.db().count_users()?;
    Ok(Json(HealthResponse {
        status: "ok",
        classifier: state.dispatcher.classifier().host().to_string(),
        users,
    }))
}
