//! Handlers for the `/billing` resource.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use patchdock_db::repositories::InvoiceRepo;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/billing/invoices
///
/// List the caller's invoices, newest first.
pub async fn list_invoices(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let invoices = InvoiceRepo::list_by_user(&state.pool, auth.user.id).await?;
    Ok(Json(DataResponse { data: invoices }))
}
