//! Appointment workflow: booking, status lifecycle, and the weekly
//! scheduled-vs-completed dashboard series.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth;
use crate::db;
use crate::error::ServiceError;
use crate::models::enums::{AppointmentPayment, AppointmentStatus, StaffRole};
use crate::models::filters::AppointmentFilter;
use crate::models::Appointment;

const SCHEDULING_ROLES: &[StaffRole] = &[
    StaffRole::Receptionist,
    StaffRole::Nurse,
    StaffRole::Doctor,
];

#[derive(Debug, Clone, Deserialize)]
pub struct NewAppointment {
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub scheduled_at: NaiveDateTime,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppointmentChanges {
    pub scheduled_at: Option<NaiveDateTime>,
    pub notes: Option<String>,
    pub status: Option<AppointmentStatus>,
}

/// One day of the current week on the dashboard. `scheduled` counts all
/// appointments on that day regardless of status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayStats {
    pub day: NaiveDate,
    pub scheduled: i64,
    pub completed: i64,
}

pub fn create_appointment(
    conn: &Connection,
    staff_id: &Uuid,
    new: &NewAppointment,
    now: NaiveDateTime,
) -> Result<Appointment, ServiceError> {
    auth::authorize(conn, staff_id, SCHEDULING_ROLES)?;

    db::get_patient(conn, &new.patient_id)?
        .ok_or_else(|| ServiceError::not_found("Patient", new.patient_id))?;
    db::get_staff(conn, &new.doctor_id)?
        .ok_or_else(|| ServiceError::not_found("Staff", new.doctor_id))?;

    let appointment = Appointment {
        id: Uuid::new_v4(),
        patient_id: new.patient_id,
        doctor_id: new.doctor_id,
        scheduled_at: new.scheduled_at,
        notes: new.notes.clone(),
        status: AppointmentStatus::Scheduled,
        payment_status: AppointmentPayment::Unpaid,
        created_at: now,
    };
    db::insert_appointment(conn, &appointment)?;
    tracing::info!(appointment_id = %appointment.id, patient_id = %new.patient_id, "Appointment booked");
    Ok(appointment)
}

pub fn update_appointment(
    conn: &Connection,
    staff_id: &Uuid,
    id: &Uuid,
    changes: &AppointmentChanges,
) -> Result<Appointment, ServiceError> {
    auth::authorize(conn, staff_id, SCHEDULING_ROLES)?;

    let mut appointment =
        db::get_appointment(conn, id)?.ok_or_else(|| ServiceError::not_found("Appointment", id))?;

    if let Some(status) = changes.status {
        if status != appointment.status {
            if !appointment.status.can_transition_to(status) {
                return Err(ServiceError::InvalidTransition {
                    from: appointment.status.as_str().into(),
                    to: status.as_str().into(),
                });
            }
            appointment.status = status;
        }
    }
    if let Some(scheduled_at) = changes.scheduled_at {
        appointment.scheduled_at = scheduled_at;
    }
    if let Some(notes) = &changes.notes {
        appointment.notes = Some(notes.clone());
    }

    db::update_appointment(conn, &appointment)?;
    Ok(appointment)
}

pub fn get_appointment(conn: &Connection, id: &Uuid) -> Result<Appointment, ServiceError> {
    db::get_appointment(conn, id)?.ok_or_else(|| ServiceError::not_found("Appointment", id))
}

pub fn list_appointments(
    conn: &Connection,
    filter: &AppointmentFilter,
) -> Result<Vec<Appointment>, ServiceError> {
    Ok(db::list_appointments(conn, filter)?)
}

/// Start of the week containing `day`: the most recent Sunday.
pub fn week_start(day: NaiveDate) -> NaiveDate {
    day - Duration::days(day.weekday().num_days_from_sunday() as i64)
}

pub fn weekly_appointment_stats(
    conn: &Connection,
    today: NaiveDate,
) -> Result<Vec<DayStats>, ServiceError> {
    let start = week_start(today);
    let end = start + Duration::days(6);
    let counted = db::count_appointments_per_day(conn, start, end)?;

    let stats = (0..7)
        .map(|offset| {
            let day = start + Duration::days(offset);
            let (scheduled, completed) = counted
                .iter()
                .find(|(d, _, _)| *d == day)
                .map(|(_, total, done)| (*total, *done))
                .unwrap_or((0, 0));
            DayStats {
                day,
                scheduled,
                completed,
            }
        })
        .collect();
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_memory_database;
    use crate::models::enums::Gender;
    use crate::registry::{self, NewPatient};
    use crate::testutil::{seed_staff, NOW};

    fn seed_patient(conn: &Connection, receptionist: &Uuid) -> Uuid {
        registry::create_patient(
            conn,
            receptionist,
            &NewPatient {
                first_name: "Amos".into(),
                last_name: "Kato".into(),
                phone: "+256701000000".into(),
                email: None,
                date_of_birth: None,
                gender: Some(Gender::Male),
                blood_group: None,
                address: None,
                doctor_id: None,
            },
            *NOW,
        )
        .unwrap()
        .id
    }

    fn book(conn: &Connection, staff: &Uuid, patient: Uuid, doctor: Uuid, at: NaiveDateTime) -> Appointment {
        create_appointment(
            conn,
            staff,
            &NewAppointment {
                patient_id: patient,
                doctor_id: doctor,
                scheduled_at: at,
                notes: None,
            },
            *NOW,
        )
        .unwrap()
    }

    #[test]
    fn new_appointment_starts_scheduled_and_unpaid() {
        let conn = open_memory_database().unwrap();
        let receptionist = seed_staff(&conn, StaffRole::Receptionist);
        let doctor = seed_staff(&conn, StaffRole::Doctor);
        let patient = seed_patient(&conn, &receptionist);

        let appt = book(&conn, &receptionist, patient, doctor, *NOW);
        assert_eq!(appt.status, AppointmentStatus::Scheduled);
        assert_eq!(appt.payment_status, AppointmentPayment::Unpaid);
    }

    #[test]
    fn terminal_status_is_immutable() {
        let conn = open_memory_database().unwrap();
        let receptionist = seed_staff(&conn, StaffRole::Receptionist);
        let doctor = seed_staff(&conn, StaffRole::Doctor);
        let patient = seed_patient(&conn, &receptionist);
        let appt = book(&conn, &receptionist, patient, doctor, *NOW);

        update_appointment(
            &conn,
            &receptionist,
            &appt.id,
            &AppointmentChanges {
                status: Some(AppointmentStatus::Cancelled),
                ..Default::default()
            },
        )
        .unwrap();

        let result = update_appointment(
            &conn,
            &receptionist,
            &appt.id,
            &AppointmentChanges {
                status: Some(AppointmentStatus::Completed),
                ..Default::default()
            },
        );
        assert!(matches!(result, Err(ServiceError::InvalidTransition { .. })));
    }

    #[test]
    fn listing_filters_by_status_and_name() {
        let conn = open_memory_database().unwrap();
        let receptionist = seed_staff(&conn, StaffRole::Receptionist);
        let doctor = seed_staff(&conn, StaffRole::Doctor);
        let patient = seed_patient(&conn, &receptionist);

        let first = book(&conn, &receptionist, patient, doctor, *NOW);
        book(&conn, &receptionist, patient, doctor, *NOW + Duration::hours(1));
        update_appointment(
            &conn,
            &receptionist,
            &first.id,
            &AppointmentChanges {
                status: Some(AppointmentStatus::Completed),
                ..Default::default()
            },
        )
        .unwrap();

        let completed = list_appointments(
            &conn,
            &AppointmentFilter {
                status: Some(AppointmentStatus::Completed),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].id, first.id);

        let by_name = list_appointments(
            &conn,
            &AppointmentFilter {
                search: Some("kato".into()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(by_name.len(), 2);

        let none = list_appointments(
            &conn,
            &AppointmentFilter {
                search: Some("absent".into()),
                ..Default::default()
            },
        )
        .unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn week_starts_on_sunday() {
        // 2026-03-02 is a Monday.
        let monday = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        assert_eq!(week_start(monday), NaiveDate::from_ymd_opt(2026, 3, 1).unwrap());
        let sunday = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        assert_eq!(week_start(sunday), sunday);
    }

    #[test]
    fn weekly_stats_zero_fill_seven_days() {
        let conn = open_memory_database().unwrap();
        let receptionist = seed_staff(&conn, StaffRole::Receptionist);
        let doctor = seed_staff(&conn, StaffRole::Doctor);
        let patient = seed_patient(&conn, &receptionist);

        let appt = book(&conn, &receptionist, patient, doctor, *NOW);
        update_appointment(
            &conn,
            &receptionist,
            &appt.id,
            &AppointmentChanges {
                status: Some(AppointmentStatus::Completed),
                ..Default::default()
            },
        )
        .unwrap();
        book(&conn, &receptionist, patient, doctor, *NOW + Duration::hours(2));

        let stats = weekly_appointment_stats(&conn, NOW.date()).unwrap();
        assert_eq!(stats.len(), 7);
        // NOW is Monday; index 1 in a Sunday-based week.
        assert_eq!(stats[1].scheduled, 2);
        assert_eq!(stats[1].completed, 1);
        assert!(stats.iter().enumerate().filter(|(i, _)| *i != 1).all(|(_, d)| d.scheduled == 0));
    }
}
