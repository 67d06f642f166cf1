//! Invoice entity model.

use patchdock_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

use crate::models::status::StatusId;

/// Invoice kind: what the charge paid for.
pub const INVOICE_KIND_FIX: &str = "fix";
pub const INVOICE_KIND_SUBSCRIPTION: &str = "subscription";

/// A row from the `invoices` table: a record of one completed charge.
/// Immutable after creation; inserts dedup idempotently on the payment
/// host's invoice identifier.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Invoice {
    pub id: DbId,
    pub user_id: DbId,
    pub project_id: Option<DbId>,
    pub fix_request_id: Option<DbId>,
    pub stripe_invoice_id: Option<String>,
    pub stripe_payment_intent_id: Option<String>,
    pub kind: String,
    pub description: Option<String>,
    pub amount_cents: i32,
    pub status_id: StatusId,
    pub created_at: Timestamp,
}

/// DTO for recording a charge.
#[derive(Debug, Clone)]
pub struct RecordInvoice {
    pub user_id: DbId,
    pub project_id: Option<DbId>,
    pub fix_request_id: Option<DbId>,
    pub stripe_invoice_id: Option<String>,
    pub stripe_payment_intent_id: Option<String>,
    pub kind: String,
    pub description: Option<String>,
    pub amount_cents: i32,
    pub status_id: StatusId,
}
