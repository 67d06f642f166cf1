//! Repository for the `invoices` table.

use patchdock_core::types::DbId;
use sqlx::PgPool;

use crate::models::invoice::{Invoice, RecordInvoice};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "\
    id, user_id, project_id, fix_request_id, stripe_invoice_id, \
    stripe_payment_intent_id, kind, description, amount_cents, status_id, \
    created_at";

/// Provides operations for invoice records.
pub struct InvoiceRepo;

impl InvoiceRepo {
    /// Record a charge. Idempotent on the payment host's invoice
    /// identifier: a duplicate delivery of the same webhook inserts
    /// nothing and returns `None`.
    pub async fn record(
        pool: &PgPool,
        input: &RecordInvoice,
    ) -> Result<Option<Invoice>, sqlx::Error> {
        let query = format!(
            "INSERT INTO invoices \
                 (user_id, project_id, fix_request_id, stripe_invoice_id, \
                  stripe_payment_intent_id, kind, description, amount_cents, status_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             ON CONFLICT (stripe_invoice_id) DO NOTHING \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Invoice>(&query)
            .bind(input.user_id)
            .bind(input.project_id)
            .bind(input.fix_request_id)
            .bind(&input.stripe_invoice_id)
            .bind(&input.stripe_payment_intent_id)
            .bind(&input.kind)
            .bind(&input.description)
            .bind(input.amount_cents)
            .bind(input.status_id)
            .fetch_optional(pool)
            .await
    }

    /// List a user's invoices, newest first.
    pub async fn list_by_user(pool: &PgPool, user_id: DbId) -> Result<Vec<Invoice>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM invoices WHERE user_id = $1 ORDER BY created_at DESC");
        sqlx::query_as::<_, Invoice>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }
}
