//! Repository for the `users` table.

use patchdock_core::types::DbId;
use sqlx::PgPool;

use crate::models::user::User;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "\
    id, auth_subject, email, full_name, stripe_customer_id, fix_count, \
    created_at, updated_at";

/// Provides CRUD operations for users.
pub struct UserRepo;

impl UserRepo {
    /// Find a user by internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a user by the identity provider's stable subject, creating the
    /// row on first sight. Email and name refresh on every call so the
    /// local record tracks the provider.
    pub async fn upsert_by_auth_subject(
        pool: &PgPool,
        auth_subject: &str,
        email: &str,
        full_name: Option<&str>,
    ) -> Result<User, sqlx::Error> {
        let query = format!(
            "INSERT INTO users (auth_subject, email, full_name) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (auth_subject) DO UPDATE \
                 SET email = EXCLUDED.email, \
                     full_name = COALESCE(EXCLUDED.full_name, users.full_name), \
                     updated_at = NOW() \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(auth_subject)
            .bind(email)
            .bind(full_name)
            .fetch_one(pool)
            .await
    }

    /// Persist the payment host's customer handle for a user.
    pub async fn set_stripe_customer(
        pool: &PgPool,
        id: DbId,
        customer_id: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE users SET stripe_customer_id = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(customer_id)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Find a user by their payment-host customer handle.
    pub async fn find_by_stripe_customer(
        pool: &PgPool,
        customer_id: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE stripe_customer_id = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(customer_id)
            .fetch_optional(pool)
            .await
    }

    /// Read the completed-fix counter fresh from the row. The pricing
    /// policy calls this on every quote; the value is never cached.
    pub async fn completed_fix_count(pool: &PgPool, id: DbId) -> Result<i64, sqlx::Error> {
        let count: Option<i32> = sqlx::query_scalar("SELECT fix_count FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(i64::from(count.unwrap_or(0)))
    }

    /// Increment the completed-fix counter. Called once per successful fix
    /// payment, from the webhook path only.
    pub async fn increment_fix_count(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET fix_count = fix_count + 1, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }
}
