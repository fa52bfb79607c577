//! Staff accounts and sessions: PBKDF2-SHA256 password hashing, opaque
//! bearer tokens stored as SHA-256 hashes, and per-action role checks
//! that re-read the role from the staff table.

use chrono::NaiveDateTime;
use pbkdf2::pbkdf2_hmac;
use rusqlite::Connection;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use uuid::Uuid;

use crate::db;
use crate::error::ServiceError;
use crate::models::enums::StaffRole;
use crate::models::filters::StaffFilter;
use crate::models::{Staff, StaffSummary};

pub const PBKDF2_ITERATIONS: u32 = 600_000;
const HASH_LENGTH: usize = 32;
const SALT_LENGTH: usize = 16;

#[derive(Debug, Clone)]
pub struct NewStaff {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: StaffRole,
}

/// Result of a successful login: the token goes to the client once and
/// is never stored server-side in the clear.
#[derive(Debug, Clone)]
pub struct LoginSession {
    pub token: String,
    pub staff: StaffSummary,
}

pub fn hash_password(password: &str, salt: &[u8]) -> String {
    let mut out = [0u8; HASH_LENGTH];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, PBKDF2_ITERATIONS, &mut out);
    hex_encode(&out)
}

pub fn generate_salt() -> [u8; SALT_LENGTH] {
    use rand::RngCore;
    let mut salt = [0u8; SALT_LENGTH];
    rand::thread_rng().fill_bytes(&mut salt);
    salt
}

/// Generate a random bearer token (URL-safe base64, 32 bytes of entropy).
pub fn generate_token() -> String {
    use base64::Engine;
    let bytes: [u8; 32] = rand::random();
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// Hash a bearer token for storage/lookup.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex_encode(&hasher.finalize())
}

pub fn create_staff(conn: &Connection, new: &NewStaff) -> Result<StaffSummary, ServiceError> {
    if new.name.trim().is_empty() || new.email.trim().is_empty() {
        return Err(ServiceError::Validation(
            "Staff name and email are required".into(),
        ));
    }
    if new.password.len() < 8 {
        return Err(ServiceError::Validation(
            "Password must be at least 8 characters".into(),
        ));
    }

    let salt = generate_salt();
    let staff = Staff {
        id: Uuid::new_v4(),
        name: new.name.trim().to_string(),
        email: new.email.trim().to_lowercase(),
        password_hash: hash_password(&new.password, &salt),
        password_salt: hex_encode(&salt),
        role: new.role,
    };
    db::insert_staff(conn, &staff)?;
    tracing::info!(staff_id = %staff.id, role = staff.role.as_str(), "Staff account created");
    Ok(StaffSummary::from(&staff))
}

pub fn list_staff(conn: &Connection, filter: &StaffFilter) -> Result<Vec<StaffSummary>, ServiceError> {
    let members = db::list_staff(conn, filter)?;
    Ok(members.iter().map(StaffSummary::from).collect())
}

/// Verify credentials and open a session.
pub fn login(
    conn: &Connection,
    email: &str,
    password: &str,
    now: NaiveDateTime,
) -> Result<LoginSession, ServiceError> {
    let staff = db::get_staff_by_email(conn, email)?.ok_or(ServiceError::InvalidCredentials)?;

    let salt = hex_decode(&staff.password_salt)
        .ok_or_else(|| ServiceError::Validation("Corrupt password salt".into()))?;
    let candidate = hash_password(password, &salt);
    // Constant-time comparison, timing must not leak hash prefixes.
    if candidate
        .as_bytes()
        .ct_eq(staff.password_hash.as_bytes())
        .unwrap_u8()
        == 0
    {
        return Err(ServiceError::InvalidCredentials);
    }

    let token = generate_token();
    db::insert_session(conn, &hash_token(&token), &staff.id, &now)?;
    tracing::info!(staff_id = %staff.id, "Login");
    Ok(LoginSession {
        token,
        staff: StaffSummary::from(&staff),
    })
}

pub fn logout(conn: &Connection, token: &str) -> Result<(), ServiceError> {
    db::delete_session(conn, &hash_token(token))?;
    Ok(())
}

/// Resolve a bearer token to the staff member owning the session.
pub fn resolve_token(conn: &Connection, token: &str) -> Result<Option<Staff>, ServiceError> {
    Ok(db::get_session_staff(conn, &hash_token(token))?)
}

/// Role check against the staff table, not the session claim. Admin
/// passes every check.
pub fn authorize(
    conn: &Connection,
    staff_id: &Uuid,
    required: &[StaffRole],
) -> Result<(), ServiceError> {
    let role = db::get_staff_role(conn, staff_id)?
        .ok_or_else(|| ServiceError::not_found("Staff", staff_id))?;

    if role == StaffRole::Admin || required.contains(&role) {
        return Ok(());
    }
    tracing::warn!(
        staff_id = %staff_id,
        role = role.as_str(),
        "Authorization denied"
    );
    Err(ServiceError::Unauthorized {
        required: required.to_vec(),
    })
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn hex_decode(s: &str) -> Option<Vec<u8>> {
    if s.len() % 2 != 0 {
        return None;
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).ok())
        .collect()
}
