//! Specialist referrals: a pending referral is accepted by the
//! specialist, then completed (or cancelled along the way).

use chrono::NaiveDateTime;
use rusqlite::Connection;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth;
use crate::db;
use crate::error::ServiceError;
use crate::models::enums::{ReferralStatus, StaffRole};
use crate::models::filters::ReferralFilter;
use crate::models::Referral;

#[derive(Debug, Clone, Deserialize)]
pub struct NewReferral {
    pub patient_id: Uuid,
    pub specialist_id: Uuid,
    pub reason: String,
    pub notes: Option<String>,
}

/// The acting staff member is the referring doctor.
pub fn create_referral(
    conn: &Connection,
    staff_id: &Uuid,
    new: &NewReferral,
    now: NaiveDateTime,
) -> Result<Referral, ServiceError> {
    auth::authorize(conn, staff_id, &[StaffRole::Doctor])?;

    if new.reason.trim().is_empty() {
        return Err(ServiceError::Validation("Referral reason is required".into()));
    }
    db::get_patient(conn, &new.patient_id)?
        .ok_or_else(|| ServiceError::not_found("Patient", new.patient_id))?;
    db::get_staff(conn, &new.specialist_id)?
        .ok_or_else(|| ServiceError::not_found("Staff", new.specialist_id))?;

    let referral = Referral {
        id: Uuid::new_v4(),
        patient_id: new.patient_id,
        referring_doctor_id: *staff_id,
        specialist_id: new.specialist_id,
        reason: new.reason.trim().to_string(),
        notes: new.notes.clone(),
        status: ReferralStatus::Pending,
        created_at: now,
    };
    db::insert_referral(conn, &referral)?;
    tracing::info!(referral_id = %referral.id, specialist_id = %new.specialist_id, "Referral created");
    Ok(referral)
}

pub fn get_referral(conn: &Connection, id: &Uuid) -> Result<Referral, ServiceError> {
    db::get_referral(conn, id)?.ok_or_else(|| ServiceError::not_found("Referral", id))
}

pub fn list_referrals(
    conn: &Connection,
    filter: &ReferralFilter,
) -> Result<Vec<Referral>, ServiceError> {
    Ok(db::list_referrals(conn, filter)?)
}

pub fn update_referral_status(
    conn: &Connection,
    staff_id: &Uuid,
    id: &Uuid,
    status: ReferralStatus,
) -> Result<Referral, ServiceError> {
    auth::authorize(conn, staff_id, &[StaffRole::Doctor])?;

    let mut referral =
        db::get_referral(conn, id)?.ok_or_else(|| ServiceError::not_found("Referral", id))?;
    if !referral.status.can_transition_to(status) {
        return Err(ServiceError::InvalidTransition {
            from: referral.status.as_str().into(),
            to: status.as_str().into(),
        });
    }
    db::set_referral_status(conn, id, status)?;
    referral.status = status;
    Ok(referral)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_memory_database;
    use crate::models::enums::Gender;
    use crate::registry::{self, NewPatient};
    use crate::testutil::{seed_staff, NOW};

    fn setup(conn: &Connection) -> (Uuid, Uuid, Uuid) {
        let receptionist = seed_staff(conn, StaffRole::Receptionist);
        let doctor = seed_staff(conn, StaffRole::Doctor);
        let specialist = seed_staff(conn, StaffRole::Doctor);
        let patient = registry::create_patient(
            conn,
            &receptionist,
            &NewPatient {
                first_name: "Rose".into(),
                last_name: "Namara".into(),
                phone: "+256706000000".into(),
                email: None,
                date_of_birth: None,
                gender: Some(Gender::Female),
                blood_group: None,
                address: None,
                doctor_id: None,
            },
            *NOW,
        )
        .unwrap()
        .id;
        (patient, doctor, specialist)
    }

    fn refer(conn: &Connection, patient: Uuid, doctor: &Uuid, specialist: Uuid) -> Referral {
        create_referral(
            conn,
            doctor,
            &NewReferral {
                patient_id: patient,
                specialist_id: specialist,
                reason: "Cardiology review".into(),
                notes: None,
            },
            *NOW,
        )
        .unwrap()
    }

    #[test]
    fn lifecycle_pending_accepted_completed() {
        let conn = open_memory_database().unwrap();
        let (patient, doctor, specialist) = setup(&conn);
        let referral = refer(&conn, patient, &doctor, specialist);
        assert_eq!(referral.status, ReferralStatus::Pending);

        let accepted =
            update_referral_status(&conn, &specialist, &referral.id, ReferralStatus::Accepted)
                .unwrap();
        assert_eq!(accepted.status, ReferralStatus::Accepted);

        let completed =
            update_referral_status(&conn, &specialist, &referral.id, ReferralStatus::Completed)
                .unwrap();
        assert_eq!(completed.status, ReferralStatus::Completed);
    }

    #[test]
    fn cannot_complete_pending_referral() {
        let conn = open_memory_database().unwrap();
        let (patient, doctor, specialist) = setup(&conn);
        let referral = refer(&conn, patient, &doctor, specialist);

        let result =
            update_referral_status(&conn, &specialist, &referral.id, ReferralStatus::Completed);
        assert!(matches!(result, Err(ServiceError::InvalidTransition { .. })));
    }

    #[test]
    fn list_by_specialist_and_status() {
        let conn = open_memory_database().unwrap();
        let (patient, doctor, specialist) = setup(&conn);
        let referral = refer(&conn, patient, &doctor, specialist);
        update_referral_status(&conn, &specialist, &referral.id, ReferralStatus::Accepted).unwrap();
        refer(&conn, patient, &doctor, specialist);

        let accepted = list_referrals(
            &conn,
            &ReferralFilter {
                specialist_id: Some(specialist),
                status: Some(ReferralStatus::Accepted),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(accepted.len(), 1);
        assert_eq!(accepted[0].id, referral.id);

        let for_patient = list_referrals(
            &conn,
            &ReferralFilter {
                patient_id: Some(patient),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(for_patient.len(), 2);
    }
}
