//! Admin session, maintenance, and membership handlers.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use crate::auth::middleware::bearer_token;
use crate::config::AppState;
use crate::error::ApiResult;
use crate::models::MaintenanceSnapshot;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceInput {
    pub message: Option<String>,
    pub logo_url: Option<String>,
    pub duration_minutes: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct MemberEntry {
    pub id: Uuid,
    pub username: String,
}

/// POST /admin/login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    info!("POST /admin/login - {}", req.username);
    let token = state.sessions.login(&req.username, &req.password)?;
    Ok(Json(LoginResponse { token }))
}

/// POST /admin/logout (admin) - revokes the presented session.
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> StatusCode {
    info!("POST /admin/logout");
    if let Some(token) = bearer_token(&headers) {
        state.sessions.revoke(token);
    }
    StatusCode::OK
}

/// GET /admin/maintenance (admin)
pub async fn get_maintenance(State(state): State<AppState>) -> Json<MaintenanceSnapshot> {
    Json(state.maintenance.snapshot())
}

/// POST|PUT /admin/maintenance (admin) - enable or re-arm maintenance.
pub async fn set_maintenance(
    State(state): State<AppState>,
    Json(input): Json<MaintenanceInput>,
) -> Json<MaintenanceSnapshot> {
    info!("POST /admin/maintenance");
    Json(state.maintenance.enable(
        input.message,
        input.logo_url,
        input.duration_minutes,
    ))
}

/// DELETE /admin/maintenance (admin)
pub async fn clear_maintenance(State(state): State<AppState>) -> Json<MaintenanceSnapshot> {
    info!("DELETE /admin/maintenance");
    Json(state.maintenance.disable())
}

/// GET /members/count
pub async fn member_count(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "count": state.hub.count() }))
}

/// GET /admin/members (admin)
pub async fn list_members(State(state): State<AppState>) -> Json<Vec<MemberEntry>> {
    info!("GET /admin/members");
    let members = state
        .hub
        .members()
        .into_iter()
        .map(|m| MemberEntry {
            id: m.id,
            username: m.display_name().to_string(),
        })
        .collect();
    Json(members)
}
