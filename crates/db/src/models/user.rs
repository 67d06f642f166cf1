//! User entity model.

use patchdock_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `users` table.
///
/// `fix_count` is the cumulative completed-fix counter the pricing policy
/// reads; it is only ever incremented by the payment webhook path.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: DbId,
    pub auth_subject: String,
    pub email: String,
    pub full_name: Option<String>,
    #[serde(skip_serializing)]
    pub stripe_customer_id: Option<String>,
    pub fix_count: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
