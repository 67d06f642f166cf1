//! HTTP-level integration tests for the projects resource.

mod common;

use axum::http::StatusCode;
use common::{bearer_token, body_json, get, get_auth, post_json_auth};
use sqlx::PgPool;

#[sqlx::test(migrations = "../db/migrations")]
async fn requests_without_token_are_unauthorized(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = get(app, "/api/v1/projects").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn create_project_returns_201(pool: PgPool) {
    let app = common::build_test_app(pool);
    let token = bearer_token("sub-1", "owner@example.com");

    let response = post_json_auth(
        app,
        "/api/v1/projects",
        &token,
        serde_json::json!({ "name": "Storefront" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["data"]["name"], "Storefront");
    assert!(json["data"]["id"].is_number());
    // No repository URL -> no migration enqueued, status stays onboarding.
    assert_eq!(json["data"]["status_id"], 1);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn create_project_with_repo_url_enqueues_migration(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    let token = bearer_token("sub-1", "owner@example.com");

    let response = post_json_auth(
        app,
        "/api/v1/projects",
        &token,
        serde_json::json!({
            "name": "Storefront",
            "github_repo_url": "https://github.com/acme/storefront",
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let pending: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM pipeline_jobs WHERE job_type = 'migrate_project'",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(pending, 1);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn duplicate_subdomain_is_rejected(pool: PgPool) {
    let token = bearer_token("sub-1", "owner@example.com");

    let app = common::build_test_app(pool.clone());
    let first = post_json_auth(
        app,
        "/api/v1/projects",
        &token,
        serde_json::json!({ "name": "First", "subdomain": "my-shop" }),
    )
    .await;
    assert_eq!(first.status(), StatusCode::CREATED);

    let app = common::build_test_app(pool);
    let second = post_json_auth(
        app,
        "/api/v1/projects",
        &token,
        serde_json::json!({ "name": "Second", "subdomain": "my-shop" }),
    )
    .await;
    assert_eq!(second.status(), StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn projects_are_scoped_to_their_owner(pool: PgPool) {
    let owner = bearer_token("sub-owner", "owner@example.com");
    let stranger = bearer_token("sub-stranger", "stranger@example.com");

    let app = common::build_test_app(pool.clone());
    let created = post_json_auth(
        app,
        "/api/v1/projects",
        &owner,
        serde_json::json!({ "name": "Private" }),
    )
    .await;
    let id = body_json(created).await["data"]["id"].as_i64().unwrap();

    let app = common::build_test_app(pool);
    let response = get_auth(app, &format!("/api/v1/projects/{id}"), &stranger).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn submit_fix_quotes_and_enqueues_triage(pool: PgPool) {
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
    let response = post_json_auth(
        app,
        &format!("/api/v1/projects/{project_id}/fixes"),
        &token,
        serde_json::json!({ "description": "Change the hero headline to say Grand Opening" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["data"]["status_id"], 1); // submitted
    assert_eq!(json["data"]["price_cents"], 300); // promotional quote

    let triage_jobs: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM pipeline_jobs WHERE job_type = 'triage_fix'")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(triage_jobs, 1);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn submit_fix_rejects_short_description(pool: PgPool) {
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

    let app = common::build_test_app(pool);
    let response = post_json_auth(
        app,
        &format!("/api/v1/projects/{project_id}/fixes"),
        &token,
        serde_json::json!({ "description": "too short" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn stats_counts_fixes_and_deployments(pool: PgPool) {
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
    post_json_auth(
        app,
        &format!("/api/v1/projects/{project_id}/fixes"),
        &token,
        serde_json::json!({ "description": "Change the hero headline to say Grand Opening" }),
    )
    .await;

    let app = common::build_test_app(pool);
    let response = get_auth(app, &format!("/api/v1/projects/{project_id}/stats"), &token).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["data"]["total_fixes"], 1);
    assert_eq!(json["data"]["deployed_fixes"], 0);
    assert_eq!(json["data"]["total_deployments"], 0);
}
