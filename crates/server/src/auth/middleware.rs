use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::debug;

use crate::config::AppState;
use crate::error::{ApiError, ApiResult};

/// Gate for privileged routes: requires `Authorization: Bearer <token>`
/// resolving to a live admin session.
pub async fn mw_require_admin(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> ApiResult<Response> {
    debug!("MIDDLEWARE: require_admin");

    let token = bearer_token(req.headers()).ok_or(ApiError::Unauthorized)?;
    state.sessions.validate(token)?;

    Ok(next.run(req).await)
}

/// Extract the token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}
