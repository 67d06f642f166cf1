//! Repository-level tests for the fix request lifecycle invariants.

use sqlx::PgPool;

use patchdock_core::types::DbId;
use patchdock_db::models::fix_request::PreviewOutcome;
use patchdock_db::models::status::FixStatus;
use patchdock_db::repositories::FixRequestRepo;

/// Insert a user, project, and submitted fix; return the fix id.
async fn seed_fix(pool: &PgPool) -> DbId {
    let user_id: DbId = sqlx::query_scalar(
        "INSERT INTO users (auth_subject, email) VALUES ('sub-1', 'owner@example.com') RETURNING id",
    )
    .fetch_one(pool)
    .await
    .unwrap();

    let project_id: DbId = sqlx::query_scalar(
        "INSERT INTO projects (user_id, name) VALUES ($1, 'Storefront') RETURNING id",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await
    .unwrap();

    let fix = FixRequestRepo::create(pool, project_id, user_id, "Change the header color", 300)
        .await
        .unwrap();
    fix.id
}

#[sqlx::test]
async fn claim_from_expected_state_wins(pool: PgPool) {
    let fix_id = seed_fix(&pool).await;

    let won = FixRequestRepo::claim_status(
        &pool,
        fix_id,
        &[FixStatus::Submitted, FixStatus::Quoted],
        FixStatus::Triaging,
    )
    .await
    .unwrap();
    assert!(won);

    let fix = FixRequestRepo::find_by_id(&pool, fix_id).await.unwrap().unwrap();
    assert_eq!(fix.status_id, FixStatus::Triaging.id());
}

#[sqlx::test]
async fn claim_from_wrong_state_loses_and_leaves_row_untouched(pool: PgPool) {
    let fix_id = seed_fix(&pool).await;

    // First claimant wins submitted -> triaging.
    assert!(FixRequestRepo::claim_status(&pool, fix_id, &[FixStatus::Submitted], FixStatus::Triaging)
        .await
        .unwrap());

    // Second claimant expecting `submitted` must lose.
    let won = FixRequestRepo::claim_status(&pool, fix_id, &[FixStatus::Submitted], FixStatus::Triaging)
        .await
        .unwrap();
    assert!(!won);

    let fix = FixRequestRepo::find_by_id(&pool, fix_id).await.unwrap().unwrap();
    assert_eq!(fix.status_id, FixStatus::Triaging.id());
}

#[sqlx::test]
async fn preview_then_deploy_clears_staging_fields(pool: PgPool) {
    let fix_id = seed_fix(&pool).await;

    let outcome = PreviewOutcome {
        generation_result: serde_json::json!({"success": true, "changes": []}),
        staging_branch: "fix/00000001".to_string(),
        preview_url: Some("https://preview.example.com".to_string()),
    };
    FixRequestRepo::record_preview(&pool, fix_id, &outcome).await.unwrap();

    let fix = FixRequestRepo::find_by_id(&pool, fix_id).await.unwrap().unwrap();
    assert_eq!(fix.status_id, FixStatus::PreviewReady.id());
    assert_eq!(fix.staging_branch.as_deref(), Some("fix/00000001"));
    assert!(fix.preview_url.is_some());

    FixRequestRepo::mark_deployed(&pool, fix_id).await.unwrap();

    let fix = FixRequestRepo::find_by_id(&pool, fix_id).await.unwrap().unwrap();
    assert_eq!(fix.status_id, FixStatus::Deployed.id());
    assert!(fix.staging_branch.is_none());
    assert!(fix.preview_url.is_none());
}

#[sqlx::test]
async fn reject_requires_preview_ready(pool: PgPool) {
    let fix_id = seed_fix(&pool).await;

    // Not previewable yet: reject must lose the claim.
    assert!(!FixRequestRepo::claim_rejected(&pool, fix_id).await.unwrap());

    let outcome = PreviewOutcome {
        generation_result: serde_json::json!({"success": true, "changes": []}),
        staging_branch: "fix/00000001".to_string(),
        preview_url: None,
    };
    FixRequestRepo::record_preview(&pool, fix_id, &outcome).await.unwrap();

    assert!(FixRequestRepo::claim_rejected(&pool, fix_id).await.unwrap());

    let fix = FixRequestRepo::find_by_id(&pool, fix_id).await.unwrap().unwrap();
    assert_eq!(fix.status_id, FixStatus::Rejected.id());
    assert!(fix.staging_branch.is_none());
    assert!(fix.preview_url.is_none());
}

#[sqlx::test]
async fn failure_preserves_staging_fields_for_retry(pool: PgPool) {
    let fix_id = seed_fix(&pool).await;

    let outcome = PreviewOutcome {
        generation_result: serde_json::json!({"success": true, "changes": []}),
        staging_branch: "fix/00000001".to_string(),
        preview_url: Some("https://preview.example.com".to_string()),
    };
    FixRequestRepo::record_preview(&pool, fix_id, &outcome).await.unwrap();
    FixRequestRepo::mark_failed(&pool, fix_id, "deploy trigger timed out").await.unwrap();

    let fix = FixRequestRepo::find_by_id(&pool, fix_id).await.unwrap().unwrap();
    assert_eq!(fix.status_id, FixStatus::Failed.id());
    assert_eq!(fix.error_log.as_deref(), Some("deploy trigger timed out"));
    // Branch and preview stay intact so the step can be retried or rejected.
    assert!(fix.staging_branch.is_some());
    assert!(fix.preview_url.is_some());
}

#[sqlx::test]
async fn mark_paid_is_idempotent_under_duplicate_delivery(pool: PgPool) {
    let fix_id = seed_fix(&pool).await;

    assert!(FixRequestRepo::mark_paid(&pool, fix_id, "pi_1").await.unwrap());
    // Second delivery of the same completion event changes nothing.
    assert!(!FixRequestRepo::mark_paid(&pool, fix_id, "pi_1").await.unwrap());

    let fix = FixRequestRepo::find_by_id(&pool, fix_id).await.unwrap().unwrap();
    assert_eq!(fix.status_id, FixStatus::InProgress.id());
}

#[sqlx::test]
async fn record_payment_intent_only_from_confirmable_states(pool: PgPool) {
    let fix_id = seed_fix(&pool).await;

    let updated = FixRequestRepo::record_payment_intent(&pool, fix_id, "pi_123")
        .await
        .unwrap()
        .expect("submitted fix is confirmable");
    assert_eq!(updated.status_id, FixStatus::AwaitingPayment.id());
    assert_eq!(updated.stripe_payment_intent_id.as_deref(), Some("pi_123"));

    // Already awaiting payment: a second confirm must not match.
    let second = FixRequestRepo::record_payment_intent(&pool, fix_id, "pi_456")
        .await
        .unwrap();
    assert!(second.is_none());
}
