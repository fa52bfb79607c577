//! Billing: invoice generation from outstanding charges, payment
//! capture, refunds, and the cashier dashboard revenue figures.

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use rand::Rng;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth;
use crate::config::Config;
use crate::db;
use crate::error::ServiceError;
use crate::models::enums::{InvoiceStatus, PaymentMethod, PaymentStatus, StaffRole};
use crate::models::{Invoice, InvoiceItem, Payment};
use crate::scheduling::week_start;

#[derive(Debug, Clone, Serialize)]
pub struct InvoiceWithItems {
    #[serde(flatten)]
    pub invoice: Invoice,
    pub items: Vec<InvoiceItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentRequest {
    pub patient_id: Uuid,
    pub invoice_id: Option<Uuid>,
    pub amount: i64,
    pub method: PaymentMethod,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MethodBreakdown {
    pub method: String,
    pub count: i64,
    pub total: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentStats {
    pub total_revenue: i64,
    pub today: i64,
    pub this_week: i64,
    pub this_month: i64,
    pub by_method: Vec<MethodBreakdown>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthTotal {
    pub month: u32,
    pub total: i64,
}

fn random_suffix() -> String {
    let n: u32 = rand::thread_rng().gen_range(0..0x0100_0000);
    format!("{n:06x}")
}

fn invoice_number(day: NaiveDate) -> String {
    format!("INV-{}-{}", day.format("%Y%m%d"), random_suffix())
}

fn receipt_number(day: NaiveDate) -> String {
    format!("RCT-{}-{}", day.format("%Y%m%d"), random_suffix())
}

/// Collect everything the patient owes into one pending invoice:
/// consultation fees per unpaid appointment, lab fees per completed
/// unbilled test, and dispensed medication priced from stock. Tests and
/// dispenses are flagged billed in the same transaction so the next
/// invoice cannot pick them up again.
pub fn generate_invoice(
    conn: &mut Connection,
    staff_id: &Uuid,
    config: &Config,
    patient_id: &Uuid,
    now: NaiveDateTime,
) -> Result<InvoiceWithItems, ServiceError> {
    auth::authorize(conn, staff_id, &[StaffRole::Cashier])?;

    db::get_patient(conn, patient_id)?
        .ok_or_else(|| ServiceError::not_found("Patient", *patient_id))?;

    let tx = conn.transaction().map_err(crate::db::DatabaseError::Sqlite)?;

    let mut line_items: Vec<(String, i64)> = Vec::new();

    let unpaid_appointments = db::count_unpaid_appointments(&tx, patient_id)?;
    if unpaid_appointments > 0 {
        line_items.push((
            format!("Consultation ({unpaid_appointments} appointment(s))"),
            unpaid_appointments * config.billing.consultation_fee,
        ));
    }

    let unbilled_tests = db::count_unbilled_completed_tests(&tx, patient_id)?;
    if unbilled_tests > 0 {
        line_items.push((
            format!("Laboratory tests ({unbilled_tests} test(s))"),
            unbilled_tests * config.billing.test_fee,
        ));
        db::mark_completed_tests_billed(&tx, patient_id)?;
    }

    let charges = db::unbilled_dispense_charges(&tx, patient_id)?;
    if !charges.is_empty() {
        let total: i64 = charges.iter().map(|(qty, price, _)| qty * price).sum();
        let names: Vec<&str> = charges.iter().map(|(_, _, name)| name.as_str()).collect();
        line_items.push((format!("Medication ({})", names.join(", ")), total));
        db::mark_dispenses_billed(&tx, patient_id)?;
    }

    if line_items.is_empty() {
        return Err(ServiceError::Validation(
            "Patient has no outstanding charges".into(),
        ));
    }

    let invoice = Invoice {
        id: Uuid::new_v4(),
        invoice_number: invoice_number(now.date()),
        patient_id: *patient_id,
        amount: line_items.iter().map(|(_, amount)| amount).sum(),
        status: InvoiceStatus::Pending,
        created_at: now,
    };
    db::insert_invoice(&tx, &invoice)?;

    let mut items = Vec::with_capacity(line_items.len());
    for (description, amount) in line_items {
        let item = InvoiceItem {
            id: Uuid::new_v4(),
            invoice_id: invoice.id,
            description,
            amount,
        };
        db::insert_invoice_item(&tx, &item)?;
        items.push(item);
    }

    tx.commit().map_err(crate::db::DatabaseError::Sqlite)?;
    tracing::info!(
        invoice_number = invoice.invoice_number,
        amount = invoice.amount,
        "Invoice generated"
    );
    Ok(InvoiceWithItems { invoice, items })
}

pub fn get_invoice(conn: &Connection, id: &Uuid) -> Result<InvoiceWithItems, ServiceError> {
    let invoice = db::get_invoice(conn, id)?.ok_or_else(|| ServiceError::not_found("Invoice", id))?;
    let items = db::list_invoice_items(conn, id)?;
    Ok(InvoiceWithItems { invoice, items })
}

pub fn list_invoices(conn: &Connection, patient_id: &Uuid) -> Result<Vec<Invoice>, ServiceError> {
    Ok(db::list_invoices_by_patient(conn, patient_id)?)
}

/// Capture a payment: the payment row, the linked invoice flip to paid,
/// and the patient's unpaid appointments all settle in one transaction.
pub fn process_payment(
    conn: &mut Connection,
    staff_id: &Uuid,
    req: &PaymentRequest,
    now: NaiveDateTime,
) -> Result<Payment, ServiceError> {
    auth::authorize(conn, staff_id, &[StaffRole::Cashier])?;

    if req.amount <= 0 {
        return Err(ServiceError::Validation("Payment amount must be positive".into()));
    }
    db::get_patient(conn, &req.patient_id)?
        .ok_or_else(|| ServiceError::not_found("Patient", req.patient_id))?;

    let tx = conn.transaction().map_err(crate::db::DatabaseError::Sqlite)?;

    if let Some(invoice_id) = req.invoice_id {
        db::get_invoice(&tx, &invoice_id)?
            .ok_or_else(|| ServiceError::not_found("Invoice", invoice_id))?;
        db::set_invoice_paid(&tx, &invoice_id)?;
    }

    let payment = Payment {
        id: Uuid::new_v4(),
        receipt_number: receipt_number(now.date()),
        patient_id: req.patient_id,
        cashier_id: *staff_id,
        invoice_id: req.invoice_id,
        amount: req.amount,
        method: req.method,
        status: PaymentStatus::Completed,
        description: req.description.clone(),
        created_at: now,
    };
    db::insert_payment(&tx, &payment)?;
    db::mark_appointments_paid(&tx, &req.patient_id)?;

    tx.commit().map_err(crate::db::DatabaseError::Sqlite)?;
    tracing::info!(
        receipt_number = payment.receipt_number,
        amount = payment.amount,
        method = payment.method.as_str(),
        "Payment recorded"
    );
    Ok(payment)
}

pub fn get_payment(conn: &Connection, id: &Uuid) -> Result<Payment, ServiceError> {
    db::get_payment(conn, id)?.ok_or_else(|| ServiceError::not_found("Payment", id))
}

pub fn list_payments(conn: &Connection, patient_id: &Uuid) -> Result<Vec<Payment>, ServiceError> {
    Ok(db::list_payments_by_patient(conn, patient_id)?)
}

/// The only backward move in the payment lifecycle.
pub fn refund_payment(conn: &Connection, staff_id: &Uuid, id: &Uuid) -> Result<Payment, ServiceError> {
    auth::authorize(conn, staff_id, &[StaffRole::Cashier])?;

    let mut payment =
        db::get_payment(conn, id)?.ok_or_else(|| ServiceError::not_found("Payment", id))?;
    if payment.status != PaymentStatus::Completed {
        return Err(ServiceError::InvalidTransition {
            from: payment.status.as_str().into(),
            to: PaymentStatus::Refunded.as_str().into(),
        });
    }
    db::set_payment_status(conn, id, PaymentStatus::Refunded)?;
    payment.status = PaymentStatus::Refunded;
    tracing::info!(receipt_number = payment.receipt_number, "Payment refunded");
    Ok(payment)
}

/// Revenue figures over completed payments. Day windows are calendar
/// days: a payment at 23:59 and one at 00:00 land in different days.
pub fn payment_stats(conn: &Connection, now: NaiveDateTime) -> Result<PaymentStats, ServiceError> {
    let today = now.date();
    let month_start = today.with_day(1).unwrap_or(today);

    let total_revenue = db::sum_completed_payments(conn)?;
    let today_total = db::sum_completed_payments_between(conn, today, today)?;
    let this_week = db::sum_completed_payments_between(conn, week_start(today), today)?;
    let this_month = db::sum_completed_payments_between(conn, month_start, today)?;
    let by_method = db::sum_completed_by_method(conn)?
        .into_iter()
        .map(|(method, count, total)| MethodBreakdown {
            method,
            count,
            total,
        })
        .collect();

    Ok(PaymentStats {
        total_revenue,
        today: today_total,
        this_week,
        this_month,
        by_method,
    })
}

/// Twelve rows, one per month, zero-filled.
pub fn revenue_by_month(conn: &Connection, year: i32) -> Result<Vec<MonthTotal>, ServiceError> {
    let sums = db::sum_completed_by_month(conn, year)?;
    Ok((1..=12)
        .map(|month| {
            let total = sums
                .iter()
                .find(|(m, _)| *m == month)
                .map(|(_, t)| *t)
                .unwrap_or(0);
            MonthTotal { month, total }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clinical::{self, NewDiagnosis, NewTestResult};
    use crate::db::open_memory_database;
    use crate::models::enums::{AppointmentPayment, Gender};
    use crate::pharmacy::{self, DispenseRequest, NewMedication, NewPrescription, NewPrescriptionLine};
    use crate::registry::{self, NewPatient};
    use crate::scheduling::{self, NewAppointment};
    use crate::testutil::{seed_staff, NOW};
    use chrono::Duration;

    struct Fixture {
        patient: Uuid,
        doctor: Uuid,
        cashier: Uuid,
        receptionist: Uuid,
    }

    fn fixture(conn: &Connection) -> Fixture {
        let receptionist = seed_staff(conn, StaffRole::Receptionist);
        let doctor = seed_staff(conn, StaffRole::Doctor);
        let cashier = seed_staff(conn, StaffRole::Cashier);
        let patient = registry::create_patient(
            conn,
            &receptionist,
            &NewPatient {
                first_name: "Sarah".into(),
                last_name: "Akello".into(),
                phone: "+256704000000".into(),
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
        Fixture {
            patient,
            doctor,
            cashier,
            receptionist,
        }
    }

    fn book_appointment(conn: &Connection, f: &Fixture) {
        scheduling::create_appointment(
            conn,
            &f.receptionist,
            &NewAppointment {
                patient_id: f.patient,
                doctor_id: f.doctor,
                scheduled_at: *NOW,
                notes: None,
            },
            *NOW,
        )
        .unwrap();
    }

    #[test]
    fn invoice_collects_all_charge_kinds_once() {
        let mut conn = open_memory_database().unwrap();
        let f = fixture(&conn);
        let tech = seed_staff(&conn, StaffRole::LabTechnician);
        let pharmacist = seed_staff(&conn, StaffRole::Pharmacist);
        book_appointment(&conn, &f);

        let diagnosis = clinical::create_diagnosis(
            &mut conn,
            &f.doctor,
            &NewDiagnosis {
                patient_id: f.patient,
                summary: "Typhoid".into(),
                detail: None,
                test_types: vec!["Widal".into()],
            },
            *NOW,
        )
        .unwrap();
        clinical::record_test_result(
            &mut conn,
            &tech,
            &NewTestResult {
                test_request_id: diagnosis.test_requests[0].id,
                result: "Positive".into(),
                report_url: None,
            },
            *NOW,
        )
        .unwrap();

        let item = pharmacy::create_medication(
            &conn,
            &pharmacist,
            &NewMedication {
                name: "Ciprofloxacin 500mg".into(),
                category: None,
                quantity: 100,
                unit_price: 800,
                expiry_date: None,
            },
        )
        .unwrap();
        let rx = pharmacy::create_prescription(
            &mut conn,
            &f.doctor,
            &NewPrescription {
                patient_id: f.patient,
                diagnosis_id: diagnosis.diagnosis.id,
                medications: vec![NewPrescriptionLine {
                    medication_name: "Ciprofloxacin 500mg".into(),
                    dosage: "500mg".into(),
                    frequency: "2x daily".into(),
                    duration: None,
                    notes: None,
                    inventory_item_id: Some(item.id),
                }],
            },
            *NOW,
        )
        .unwrap();
        pharmacy::dispense_medication(
            &mut conn,
            &pharmacist,
            &DispenseRequest {
                prescription_medication_id: rx.medications[0].line.id,
                quantity: 14,
            },
            *NOW,
        )
        .unwrap();

        let config = Config::default();
        let invoice = generate_invoice(&mut conn, &f.cashier, &config, &f.patient, *NOW).unwrap();
        assert_eq!(invoice.items.len(), 3);
        // 50_000 consultation + 30_000 test + 14 × 800 medication
        assert_eq!(invoice.invoice.amount, 50_000 + 30_000 + 11_200);
        assert!(invoice.invoice.invoice_number.starts_with("INV-20260302-"));

        // Tests and dispenses were flagged billed; only the still-unpaid
        // consultation carries over to a second invoice.
        let second = generate_invoice(&mut conn, &f.cashier, &config, &f.patient, *NOW).unwrap();
        assert_eq!(second.items.len(), 1);
        assert_eq!(second.invoice.amount, 50_000);
    }

    #[test]
    fn invoice_with_nothing_owed_is_rejected() {
        let mut conn = open_memory_database().unwrap();
        let f = fixture(&conn);
        let result = generate_invoice(
            &mut conn,
            &f.cashier,
            &Config::default(),
            &f.patient,
            *NOW,
        );
        assert!(matches!(result, Err(ServiceError::Validation(_))));
    }

    #[test]
    fn payment_settles_invoice_and_appointments() {
        let mut conn = open_memory_database().unwrap();
        let f = fixture(&conn);
        book_appointment(&conn, &f);

        let config = Config::default();
        let invoice = generate_invoice(&mut conn, &f.cashier, &config, &f.patient, *NOW).unwrap();

        let payment = process_payment(
            &mut conn,
            &f.cashier,
            &PaymentRequest {
                patient_id: f.patient,
                invoice_id: Some(invoice.invoice.id),
                amount: invoice.invoice.amount,
                method: PaymentMethod::MobileMoney,
                description: None,
            },
            *NOW,
        )
        .unwrap();
        assert_eq!(payment.status, PaymentStatus::Completed);
        assert!(payment.receipt_number.starts_with("RCT-20260302-"));

        let paid = get_invoice(&conn, &invoice.invoice.id).unwrap();
        assert_eq!(paid.invoice.status, InvoiceStatus::Paid);

        let appts = db::list_appointments_by_patient(&conn, &f.patient).unwrap();
        assert!(appts
            .iter()
            .all(|a| a.payment_status == AppointmentPayment::Paid));
    }

    #[test]
    fn refund_only_from_completed() {
        let mut conn = open_memory_database().unwrap();
        let f = fixture(&conn);
        let payment = process_payment(
            &mut conn,
            &f.cashier,
            &PaymentRequest {
                patient_id: f.patient,
                invoice_id: None,
                amount: 10_000,
                method: PaymentMethod::Cash,
                description: Some("Walk-in".into()),
            },
            *NOW,
        )
        .unwrap();

        let refunded = refund_payment(&conn, &f.cashier, &payment.id).unwrap();
        assert_eq!(refunded.status, PaymentStatus::Refunded);

        let twice = refund_payment(&conn, &f.cashier, &payment.id);
        assert!(matches!(twice, Err(ServiceError::InvalidTransition { .. })));
    }

    #[test]
    fn stats_window_at_midnight_boundary() {
        let mut conn = open_memory_database().unwrap();
        let f = fixture(&conn);

        // 23:59 yesterday and 00:00 today fall in different day windows.
        let yesterday_late = (*NOW - Duration::days(1)).date().and_hms_opt(23, 59, 0).unwrap();
        let today_midnight = NOW.date().and_hms_opt(0, 0, 0).unwrap();
        for (at, amount) in [(yesterday_late, 7_000), (today_midnight, 5_000)] {
            process_payment(
                &mut conn,
                &f.cashier,
                &PaymentRequest {
                    patient_id: f.patient,
                    invoice_id: None,
                    amount,
                    method: PaymentMethod::Cash,
                    description: None,
                },
                at,
            )
            .unwrap();
        }

        let stats = payment_stats(&conn, *NOW).unwrap();
        assert_eq!(stats.total_revenue, 12_000);
        assert_eq!(stats.today, 5_000);
        // Week started Sunday 2026-03-01, so both payments count.
        assert_eq!(stats.this_week, 12_000);
        assert_eq!(stats.by_method.len(), 1);
        assert_eq!(stats.by_method[0].count, 2);
    }

    #[test]
    fn refunded_payments_drop_out_of_revenue() {
        let mut conn = open_memory_database().unwrap();
        let f = fixture(&conn);
        let payment = process_payment(
            &mut conn,
            &f.cashier,
            &PaymentRequest {
                patient_id: f.patient,
                invoice_id: None,
                amount: 20_000,
                method: PaymentMethod::Card,
                description: None,
            },
            *NOW,
        )
        .unwrap();
        assert_eq!(payment_stats(&conn, *NOW).unwrap().total_revenue, 20_000);

        refund_payment(&conn, &f.cashier, &payment.id).unwrap();
        assert_eq!(payment_stats(&conn, *NOW).unwrap().total_revenue, 0);
    }

    #[test]
    fn monthly_revenue_zero_filled() {
        let mut conn = open_memory_database().unwrap();
        let f = fixture(&conn);
        process_payment(
            &mut conn,
            &f.cashier,
            &PaymentRequest {
                patient_id: f.patient,
                invoice_id: None,
                amount: 9_000,
                method: PaymentMethod::Cash,
                description: None,
            },
            *NOW,
        )
        .unwrap();

        let months = revenue_by_month(&conn, 2026).unwrap();
        assert_eq!(months.len(), 12);
        assert_eq!(months[2], MonthTotal { month: 3, total: 9_000 });
        assert!(months.iter().filter(|m| m.month != 3).all(|m| m.total == 0));
    }
}
