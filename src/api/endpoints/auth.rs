//! Login and logout. The session token travels to the client exactly
//! once, in the login response.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::endpoints::now;
use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::auth;
use crate::models::StaffSummary;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub staff: StaffSummary,
}

/// `POST /api/auth/login`
pub async fn login(
    State(ctx): State<ApiContext>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let conn = ctx.open_db()?;
    let session = auth::login(&conn, &req.email, &req.password, now())?;
    Ok(Json(LoginResponse {
        token: session.token,
        staff: session.staff,
    }))
}

#[derive(Serialize)]
pub struct LogoutResponse {
    pub status: &'static str,
}

/// `POST /api/auth/logout` deletes the session behind the bearer token.
pub async fn logout(
    State(ctx): State<ApiContext>,
    headers: HeaderMap,
) -> Result<Json<LogoutResponse>, ApiError> {
    let token = headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(ApiError::Unauthorized)?;

    let conn = ctx.open_db()?;
    auth::logout(&conn, token)?;
    Ok(Json(LogoutResponse { status: "ok" }))
}
