//! Payment webhook handler.
//!
//! The payment host reports completion asynchronously. The raw body is
//! verified against the endpoint secret, parsed into a typed event, and
//! dispatched. Handling failures are logged and still acknowledged with
//! 200 so the payment host does not retry forever; only signature and
//! parse failures are rejected.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use patchdock_db::models::invoice::{RecordInvoice, INVOICE_KIND_SUBSCRIPTION};
use patchdock_db::models::status::InvoiceStatus;
use patchdock_db::repositories::{InvoiceRepo, ProjectRepo, UserRepo};
use patchdock_pipeline::fix as fix_pipeline;
use patchdock_stripe::webhook::{parse_event, verify_signature, WebhookEvent};
use serde_json::json;

use crate::state::AppState;

/// POST /api/v1/webhooks/stripe
pub async fn stripe(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let Some(signature) = headers.get("stripe-signature").and_then(|v| v.to_str().ok()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Missing stripe-signature header" })),
        );
    };

    if let Err(e) = verify_signature(&body, signature, &state.config.stripe_webhook_secret) {
        tracing::warn!(error = %e, "Webhook signature verification failed");
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Invalid signature" })),
        );
    }

    let event = match parse_event(&body) {
        Ok(event) => event,
        Err(e) => {
            tracing::error!(error = %e, "Webhook event rejected");
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": e.to_string() })),
            );
        }
    };

    if let Err(e) = handle_event(&state, event).await {
        // Internal failures are logged, never bounced back to the payment
        // host -- retrying the delivery would not fix them.
        tracing::error!(error = %e, "Webhook event handling failed");
    }

    (StatusCode::OK, Json(json!({ "received": true })))
}

async fn handle_event(
    state: &AppState,
    event: WebhookEvent,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    match event {
        WebhookEvent::FixPaymentSucceeded {
            fix_request_id,
            payment_intent_id,
            amount_cents,
        } => {
            tracing::info!(fix_request_id, amount_cents, "Fix payment succeeded");
            fix_pipeline::handle_fix_payment(
                &state.pipeline,
                fix_request_id,
                &payment_intent_id,
                amount_cents,
            )
            .await?;
        }

        WebhookEvent::InvoicePaid {
            invoice_id,
            customer_id,
            amount_cents,
            description,
        } => {
            let Some(customer_id) = customer_id else {
                tracing::warn!(invoice_id = %invoice_id, "Invoice without customer, skipping");
                return Ok(());
            };
            let Some(user) =
                UserRepo::find_by_stripe_customer(&state.pool, &customer_id).await?
            else {
                tracing::warn!(customer_id = %customer_id, "No user for payment customer");
                return Ok(());
            };

            let recorded = InvoiceRepo::record(
                &state.pool,
                &RecordInvoice {
                    user_id: user.id,
                    project_id: None,
                    fix_request_id: None,
                    stripe_invoice_id: Some(invoice_id),
                    stripe_payment_intent_id: None,
                    kind: INVOICE_KIND_SUBSCRIPTION.to_string(),
                    description: description.or_else(|| Some("Monthly hosting".to_string())),
                    amount_cents: amount_cents as i32,
                    status_id: InvoiceStatus::Paid.id(),
                },
            )
            .await?;
            if recorded.is_none() {
                tracing::debug!("Duplicate invoice delivery, already recorded");
            }
        }

        WebhookEvent::SubscriptionDeleted { customer_id } => {
            let Some(customer_id) = customer_id else {
                return Ok(());
            };
            if let Some(user) =
                UserRepo::find_by_stripe_customer(&state.pool, &customer_id).await?
            {
                let suspended = ProjectRepo::suspend_all_active(&state.pool, user.id).await?;
                tracing::info!(user_id = user.id, suspended, "Hosting subscription ended");
            }
        }

        WebhookEvent::Ignored { event_type } => {
            tracing::debug!(event_type = %event_type, "Unhandled webhook event type");
        }
    }

    Ok(())
}
