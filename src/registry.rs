//! Patient registry: CRUD over patient records plus search and the
//! full per-patient aggregate used by the patient detail page.

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth;
use crate::db;
use crate::error::ServiceError;
use crate::models::enums::{Gender, StaffRole};
use crate::models::*;

/// Roles allowed to mutate the registry (admin always passes).
const REGISTRY_ROLES: &[StaffRole] = &[StaffRole::Receptionist, StaffRole::Nurse];

#[derive(Debug, Clone, Deserialize)]
pub struct NewPatient {
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub email: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub blood_group: Option<String>,
    pub address: Option<String>,
    pub doctor_id: Option<Uuid>,
}

/// Partial update. Absent fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PatientChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub blood_group: Option<String>,
    pub address: Option<String>,
    pub doctor_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DoctorRef {
    pub id: Uuid,
    pub name: String,
}

/// List row: patient plus assigned doctor and most recent appointment.
#[derive(Debug, Clone, Serialize)]
pub struct PatientSummary {
    #[serde(flatten)]
    pub patient: Patient,
    pub doctor: Option<DoctorRef>,
    pub last_appointment: Option<Appointment>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PrescriptionLineView {
    #[serde(flatten)]
    pub line: PrescriptionMedication,
    /// Derived: true iff at least one dispense record exists.
    pub dispensed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PrescriptionView {
    #[serde(flatten)]
    pub prescription: Prescription,
    pub medications: Vec<PrescriptionLineView>,
}

/// Full aggregate for the patient detail page, each list newest-first.
#[derive(Debug, Clone, Serialize)]
pub struct PatientDetail {
    #[serde(flatten)]
    pub patient: Patient,
    pub doctor: Option<DoctorRef>,
    pub appointments: Vec<Appointment>,
    pub diagnoses: Vec<Diagnosis>,
    pub test_results: Vec<TestResult>,
    pub prescriptions: Vec<PrescriptionView>,
    pub payments: Vec<Payment>,
    pub referrals: Vec<Referral>,
}

pub fn list_patients(
    conn: &Connection,
    query: Option<&str>,
) -> Result<Vec<PatientSummary>, ServiceError> {
    let patients = db::search_patients(conn, query)?;

    let mut summaries = Vec::with_capacity(patients.len());
    for patient in patients {
        let doctor = doctor_ref(conn, patient.doctor_id)?;
        let last_appointment = db::get_latest_appointment(conn, &patient.id)?;
        summaries.push(PatientSummary {
            patient,
            doctor,
            last_appointment,
        });
    }
    Ok(summaries)
}

pub fn get_patient(conn: &Connection, id: &Uuid) -> Result<PatientDetail, ServiceError> {
    let patient = db::get_patient(conn, id)?.ok_or_else(|| ServiceError::not_found("Patient", id))?;

    let doctor = doctor_ref(conn, patient.doctor_id)?;
    let appointments = db::list_appointments_by_patient(conn, id)?;
    let diagnoses = db::list_diagnoses_by_patient(conn, id)?;
    let test_results = db::list_test_results_by_patient(conn, id)?;
    let payments = db::list_payments_by_patient(conn, id)?;
    let referrals = db::list_referrals(
        conn,
        &filters::ReferralFilter {
            patient_id: Some(*id),
            ..Default::default()
        },
    )?;

    let mut prescriptions = Vec::new();
    for rx in db::list_prescriptions_by_patient(conn, id)? {
        prescriptions.push(prescription_view(conn, rx)?);
    }

    Ok(PatientDetail {
        patient,
        doctor,
        appointments,
        diagnoses,
        test_results,
        prescriptions,
        payments,
        referrals,
    })
}

pub fn create_patient(
    conn: &Connection,
    staff_id: &Uuid,
    new: &NewPatient,
    now: NaiveDateTime,
) -> Result<Patient, ServiceError> {
    auth::authorize(conn, staff_id, REGISTRY_ROLES)?;
    validate_required(&new.first_name, &new.last_name, &new.phone)?;

    let patient = Patient {
        id: Uuid::new_v4(),
        first_name: new.first_name.trim().to_string(),
        last_name: new.last_name.trim().to_string(),
        phone: new.phone.trim().to_string(),
        email: new.email.clone(),
        date_of_birth: new.date_of_birth,
        gender: new.gender,
        blood_group: new.blood_group.clone(),
        address: new.address.clone(),
        doctor_id: new.doctor_id,
        created_at: now,
    };
    db::insert_patient(conn, &patient)?;
    tracing::info!(patient_id = %patient.id, "Patient registered");
    Ok(patient)
}

pub fn update_patient(
    conn: &Connection,
    staff_id: &Uuid,
    id: &Uuid,
    changes: &PatientChanges,
) -> Result<Patient, ServiceError> {
    auth::authorize(conn, staff_id, REGISTRY_ROLES)?;

    let mut patient =
        db::get_patient(conn, id)?.ok_or_else(|| ServiceError::not_found("Patient", id))?;

    if let Some(first_name) = &changes.first_name {
        patient.first_name = first_name.trim().to_string();
    }
    if let Some(last_name) = &changes.last_name {
        patient.last_name = last_name.trim().to_string();
    }
    if let Some(phone) = &changes.phone {
        patient.phone = phone.trim().to_string();
    }
    if let Some(email) = &changes.email {
        patient.email = Some(email.clone());
    }
    if let Some(dob) = changes.date_of_birth {
        patient.date_of_birth = Some(dob);
    }
    if let Some(gender) = changes.gender {
        patient.gender = Some(gender);
    }
    if let Some(blood_group) = &changes.blood_group {
        patient.blood_group = Some(blood_group.clone());
    }
    if let Some(address) = &changes.address {
        patient.address = Some(address.clone());
    }
    if let Some(doctor_id) = changes.doctor_id {
        patient.doctor_id = Some(doctor_id);
    }

    validate_required(&patient.first_name, &patient.last_name, &patient.phone)?;
    db::update_patient(conn, &patient)?;
    Ok(patient)
}

/// Hard delete; dependent records cascade. Irreversible.
pub fn delete_patient(conn: &Connection, staff_id: &Uuid, id: &Uuid) -> Result<(), ServiceError> {
    auth::authorize(conn, staff_id, REGISTRY_ROLES)?;
    db::delete_patient_cascade(conn, id)?;
    tracing::info!(patient_id = %id, "Patient deleted");
    Ok(())
}

pub(crate) fn prescription_view(
    conn: &Connection,
    prescription: Prescription,
) -> Result<PrescriptionView, ServiceError> {
    let lines = db::list_medications_for_prescription(conn, &prescription.id)?;
    let counts = db::dispense_counts_for_prescription(conn, &prescription.id)?;

    let medications = lines
        .into_iter()
        .map(|line| {
            let dispensed = counts
                .iter()
                .any(|(id, count)| *id == line.id && *count > 0);
            PrescriptionLineView { line, dispensed }
        })
        .collect();

    Ok(PrescriptionView {
        prescription,
        medications,
    })
}

fn doctor_ref(conn: &Connection, doctor_id: Option<Uuid>) -> Result<Option<DoctorRef>, ServiceError> {
    match doctor_id {
        Some(id) => Ok(db::get_staff(conn, &id)?.map(|s| DoctorRef {
            id: s.id,
            name: s.name,
        })),
        None => Ok(None),
    }
}

fn validate_required(first_name: &str, last_name: &str, phone: &str) -> Result<(), ServiceError> {
    if first_name.trim().is_empty() || last_name.trim().is_empty() {
        return Err(ServiceError::Validation("Patient name is required".into()));
    }
    if phone.trim().is_empty() {
        return Err(ServiceError::Validation("Patient phone is required".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_memory_database;
    use crate::testutil::{seed_staff, NOW};

    fn new_patient() -> NewPatient {
        NewPatient {
            first_name: "Jane".into(),
            last_name: "Doe".into(),
            phone: "+256700000000".into(),
            email: None,
            date_of_birth: None,
            gender: Some(Gender::Female),
            blood_group: None,
            address: None,
            doctor_id: None,
        }
    }

    #[test]
    fn create_requires_name_and_phone() {
        let conn = open_memory_database().unwrap();
        let receptionist = seed_staff(&conn, StaffRole::Receptionist);

        let mut missing_phone = new_patient();
        missing_phone.phone = "  ".into();
        assert!(matches!(
            create_patient(&conn, &receptionist, &missing_phone, *NOW),
            Err(ServiceError::Validation(_))
        ));

        let mut missing_name = new_patient();
        missing_name.first_name = "".into();
        assert!(matches!(
            create_patient(&conn, &receptionist, &missing_name, *NOW),
            Err(ServiceError::Validation(_))
        ));
    }

    #[test]
    fn create_and_get_round_trip() {
        let conn = open_memory_database().unwrap();
        let receptionist = seed_staff(&conn, StaffRole::Receptionist);

        let patient = create_patient(&conn, &receptionist, &new_patient(), *NOW).unwrap();
        let detail = get_patient(&conn, &patient.id).unwrap();
        assert_eq!(detail.patient.full_name(), "Jane Doe");
        assert!(detail.appointments.is_empty());
        assert!(detail.prescriptions.is_empty());
    }

    #[test]
    fn unauthorized_role_cannot_create() {
        let conn = open_memory_database().unwrap();
        let technician = seed_staff(&conn, StaffRole::LabTechnician);

        assert!(matches!(
            create_patient(&conn, &technician, &new_patient(), *NOW),
            Err(ServiceError::Unauthorized { .. })
        ));
    }

    #[test]
    fn search_matches_name_and_phone() {
        let conn = open_memory_database().unwrap();
        let receptionist = seed_staff(&conn, StaffRole::Receptionist);
        create_patient(&conn, &receptionist, &new_patient(), *NOW).unwrap();

        assert_eq!(list_patients(&conn, Some("jane")).unwrap().len(), 1);
        assert_eq!(list_patients(&conn, Some("doe")).unwrap().len(), 1);
        assert_eq!(list_patients(&conn, Some("+256700")).unwrap().len(), 1);
        assert!(list_patients(&conn, Some("nomatch")).unwrap().is_empty());
        assert_eq!(list_patients(&conn, None).unwrap().len(), 1);
    }

    #[test]
    fn partial_update_keeps_other_fields() {
        let conn = open_memory_database().unwrap();
        let receptionist = seed_staff(&conn, StaffRole::Receptionist);
        let patient = create_patient(&conn, &receptionist, &new_patient(), *NOW).unwrap();

        let updated = update_patient(
            &conn,
            &receptionist,
            &patient.id,
            &PatientChanges {
                phone: Some("+256711111111".into()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(updated.phone, "+256711111111");
        assert_eq!(updated.first_name, "Jane");
    }

    #[test]
    fn update_missing_patient_is_not_found() {
        let conn = open_memory_database().unwrap();
        let receptionist = seed_staff(&conn, StaffRole::Receptionist);
        let result = update_patient(
            &conn,
            &receptionist,
            &Uuid::new_v4(),
            &PatientChanges::default(),
        );
        assert!(matches!(result, Err(ServiceError::NotFound { .. })));
    }

    #[test]
    fn delete_cascades() {
        let conn = open_memory_database().unwrap();
        let receptionist = seed_staff(&conn, StaffRole::Receptionist);
        let patient = create_patient(&conn, &receptionist, &new_patient(), *NOW).unwrap();

        delete_patient(&conn, &receptionist, &patient.id).unwrap();
        assert!(matches!(
            get_patient(&conn, &patient.id),
            Err(ServiceError::NotFound { .. })
        ));
        assert!(matches!(
            delete_patient(&conn, &receptionist, &patient.id),
            Err(ServiceError::Database(crate::db::DatabaseError::NotFound { .. }))
        ));
    }
}
