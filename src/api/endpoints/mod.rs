pub mod appointments;
pub mod auth;
pub mod billing;
pub mod clinical;
pub mod health;
pub mod patients;
pub mod pharmacy;
pub mod print;
pub mod referrals;
pub mod reports;
pub mod staff;

/// Wall-clock timestamp used for created_at fields and stats windows.
pub(crate) fn now() -> chrono::NaiveDateTime {
    chrono::Local::now().naive_local()
}
