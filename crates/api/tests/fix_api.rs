//! HTTP-level integration tests for fix lifecycle transitions.
//!
//! Preconditions are enforced by the pipeline layer's status claims;
//! these tests drive them through the HTTP surface.

mod common;

use axum::http::StatusCode;
use common::{bearer_token, body_json, post_json_auth};
use sqlx::PgPool;

use patchdock_db::models::fix_request::PreviewOutcome;
use patchdock_db::models::status::FixStatus;
use patchdock_db::repositories::FixRequestRepo;

/// Create a project and a submitted fix through the API; returns
/// (project_id, fix_id, token).
async fn seed_fix(pool: &PgPool) -> (i64, i64, String) {
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
    let fix_id = body_json(submitted).await["data"]["id"].as_i64().unwrap();

    (project_id, fix_id, token)
}

#[sqlx::test(migrations = "../db/migrations")]
async fn approve_rejects_non_previewable_fix(pool: PgPool) {
    let (_, fix_id, token) = seed_fix(&pool).await;

    let app = common::build_test_app(pool);
    let response = post_json_auth(
        app,
        &format!("/api/v1/fixes/{fix_id}/approve"),
        &token,
        serde_json::json!({}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let json = body_json(response).await;
    assert_eq!(json["code"], "INVALID_STATE");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn reject_rejects_non_previewable_fix(pool: PgPool) {
    let (_, fix_id, token) = seed_fix(&pool).await;

    let app = common::build_test_app(pool);
    let response = post_json_auth(
        app,
        &format!("/api/v1/fixes/{fix_id}/reject"),
        &token,
        serde_json::json!({}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn approve_on_preview_ready_enqueues_deploy(pool: PgPool) {
    let (_, fix_id, token) = seed_fix(&pool).await;

    let outcome = PreviewOutcome {
        generation_result: serde_json::json!({"success": true, "changes": []}),
        staging_branch: format!("fix/{fix_id:08x}"),
        preview_url: None,
    };
    FixRequestRepo::record_preview(&pool, fix_id, &outcome).await.unwrap();

    let app = common::build_test_app(pool.clone());
    let response = post_json_auth(
        app,
        &format!("/api/v1/fixes/{fix_id}/approve"),
        &token,
        serde_json::json!({}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["status_id"], i64::from(FixStatus::Approved.id()));

    let deploy_jobs: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM pipeline_jobs WHERE job_type = 'deploy_fix'")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(deploy_jobs, 1);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn reject_clears_staging_fields(pool: PgPool) {
    let (_, fix_id, token) = seed_fix(&pool).await;

    let outcome = PreviewOutcome {
        generation_result: serde_json::json!({"success": true, "changes": []}),
        staging_branch: format!("fix/{fix_id:08x}"),
        preview_url: Some("https://preview.example.com".to_string()),
    };
    FixRequestRepo::record_preview(&pool, fix_id, &outcome).await.unwrap();

    let app = common::build_test_app(pool.clone());
    let response = post_json_auth(
        app,
        &format!("/api/v1/fixes/{fix_id}/reject"),
        &token,
        serde_json::json!({}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["status_id"], i64::from(FixStatus::Rejected.id()));
    assert!(json["data"]["staging_branch"].is_null());
    assert!(json["data"]["preview_url"].is_null());
}

#[sqlx::test(migrations = "../db/migrations")]
async fn confirm_rejects_fix_in_wrong_state(pool: PgPool) {
    let (_, fix_id, token) = seed_fix(&pool).await;

    // Push the fix past the confirmable window.
    FixRequestRepo::mark_deployed(&pool, fix_id).await.unwrap();

    let app = common::build_test_app(pool);
    let response = post_json_auth(
        app,
        &format!("/api/v1/fixes/{fix_id}/confirm"),
        &token,
        serde_json::json!({}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
}
