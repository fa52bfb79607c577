//! Bearer token authentication middleware.
//!
//! Extracts `Authorization: Bearer <token>`, resolves the session from
//! the database, and injects `StaffContext` into request extensions for
//! downstream handlers. Role checks stay in the service layer, which
//! re-reads the role per call.

use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, StaffContext};
use crate::auth;
use crate::models::StaffSummary;

pub async fn require_auth(req: Request<axum::body::Body>, next: Next) -> Response {
    match require_auth_inner(req, next).await {
        Ok(resp) => resp,
        Err(err) => err.into_response(),
    }
}

async fn require_auth_inner(
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let ctx: ApiContext = req
        .extensions()
        .get::<ApiContext>()
        .cloned()
        .ok_or(ApiError::Internal("missing API context".into()))?;

    let token = req
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(ApiError::Unauthorized)?
        .to_string();

    let conn = ctx.open_db()?;
    let staff = auth::resolve_token(&conn, &token)
        .map_err(ApiError::from)?
        .ok_or(ApiError::Unauthorized)?;
    let summary = StaffSummary::from(&staff);

    req.extensions_mut().insert(StaffContext {
        staff_id: summary.id,
        name: summary.name,
        role: summary.role,
    });

    Ok(next.run(req).await)
}
