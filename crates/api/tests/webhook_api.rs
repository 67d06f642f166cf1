//! Integration tests for the payment webhook path.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::{bearer_token, body_json, post_json_auth, TEST_WEBHOOK_SECRET};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use sqlx::PgPool;
use tower::ServiceExt;

use patchdock_db::models::status::FixStatus;
use patchdock_db::repositories::FixRequestRepo;

type HmacSha256 = Hmac<Sha256>;

/// Build a valid `Stripe-Signature` header for a payload.
fn sign(payload: &[u8], secret: &str) -> String {
    let timestamp = "1712000000";
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);
    format!("t={timestamp},v1={}", hex::encode(mac.finalize().into_bytes()))
}

async fn post_webhook(
    app: axum::Router,
    payload: &str,
    signature: &str,
) -> axum::http::Response<Body> {
    app.oneshot(
        Request::builder()
            .method("POST")
            .uri("/api/v1/webhooks/stripe")
            .header("content-type", "application/json")
            .header("stripe-signature", signature)
            .body(Body::from(payload.to_string()))
            .unwrap(),
    )
    .await
    .unwrap()
}

/// Create a project + submitted fix via the API; returns the fix id.
async fn seed_fix(pool: &PgPool) -> i64 {
    let token = bearer_token("sub-1", "owner@example.com");

    let app = common::build_test_app(pool.clone());
    let created = post_json_auth(
        app,
        "/api/v1/projects",
        &token,
        serde_json::json!({ "name": "Storefront" }),
    )
    .await;
    let project_id = body_json(created).await["data"]["id"].as_i64().unwrap();

    let app = common::build_test_app(pool.clone());
    let submitted = post_json_auth(
        app,
        &format!("/api/v1/projects/{project_id}/fixes"),
        &token,
        serde_json::json!({ "description": "Change the hero headline to say Grand Opening" }),
    )
    .await;
    body_json(submitted).await["data"]["id"].as_i64().unwrap()
}

#[sqlx::test(migrations = "../db/migrations")]
async fn fix_payment_advances_fix_and_enqueues_generation(pool: PgPool) {
    let fix_id = seed_fix(&pool).await;

    let payload = serde_json::json!({
        "type": "payment_intent.succeeded",
        "data": { "object": {
            "id": "pi_42",
            "amount": 300,
            "metadata": { "type": "fix", "fix_request_id": fix_id.to_string() },
        }},
    })
    .to_string();
    let signature = sign(payload.as_bytes(), TEST_WEBHOOK_SECRET);

    let app = common::build_test_app(pool.clone());
    let response = post_webhook(app, &payload, &signature).await;
    assert_eq!(response.status(), StatusCode::OK);

    let fix = FixRequestRepo::find_by_id(&pool, fix_id).await.unwrap().unwrap();
    assert_eq!(fix.status_id, FixStatus::InProgress.id());
    assert_eq!(fix.stripe_payment_intent_id.as_deref(), Some("pi_42"));

    // Completed-fix counter bumped, paid invoice recorded, generation queued.
    let fix_count: i32 = sqlx::query_scalar("SELECT fix_count FROM users WHERE id = $1")
        .bind(fix.user_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(fix_count, 1);

    let invoices: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM invoices WHERE fix_request_id = $1")
            .bind(fix_id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(invoices, 1);

    let generate_jobs: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM pipeline_jobs WHERE job_type = 'generate_fix'")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(generate_jobs, 1);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn bad_signature_is_rejected(pool: PgPool) {
    let payload = r#"{"type":"invoice.paid","data":{"object":{"id":"in_1"}}}"#;
    let signature = sign(payload.as_bytes(), "whsec_wrong_secret");

    let app = common::build_test_app(pool);
    let response = post_webhook(app, payload, &signature).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn fix_payment_without_reference_is_rejected(pool: PgPool) {
    let payload = serde_json::json!({
        "type": "payment_intent.succeeded",
        "data": { "object": {
            "id": "pi_42",
            "amount": 300,
            "metadata": { "type": "fix" },
        }},
    })
    .to_string();
    let signature = sign(payload.as_bytes(), TEST_WEBHOOK_SECRET);

    let app = common::build_test_app(pool);
    let response = post_webhook(app, &payload, &signature).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
