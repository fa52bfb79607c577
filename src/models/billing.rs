use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{InvoiceStatus, PaymentMethod, PaymentStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub id: Uuid,
    pub invoice_number: String,
    pub patient_id: Uuid,
    /// Integer shillings.
    pub amount: i64,
    pub status: InvoiceStatus,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceItem {
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub description: String,
    pub amount: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub receipt_number: String,
    pub patient_id: Uuid,
    pub cashier_id: Uuid,
    pub invoice_id: Option<Uuid>,
    pub amount: i64,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub description: Option<String>,
    pub created_at: NaiveDateTime,
}
