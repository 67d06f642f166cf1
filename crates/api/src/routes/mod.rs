//! Route tree assembly.

pub mod health;

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{billing, deployments, fixes, projects, webhooks};
use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /projects                                 GET list, POST create
/// /projects/check-subdomain/{subdomain}     GET availability
/// /projects/{id}                            GET, PUT, DELETE
/// /projects/{id}/stats                      GET fix/deploy counts
/// /projects/{project_id}/fixes              GET list, POST submit
/// /projects/{project_id}/deployments        GET list, POST redeploy
///
/// /fixes/{id}                               GET detail
/// /fixes/{id}/triage                        POST re-enqueue triage
/// /fixes/{id}/confirm                       POST create charge intent
/// /fixes/{id}/start                         POST enqueue generation
/// /fixes/{id}/approve                       POST approve preview
/// /fixes/{id}/reject                        POST reject preview
///
/// /deployments/{id}                         GET detail
/// /deployments/{id}/refresh                 POST reconcile now
/// /deployments/{id}/rollback                POST record rollback
///
/// /billing/invoices                         GET list
///
/// /webhooks/stripe                          POST payment events (no auth)
/// ```
pub fn api_routes() -> Router<AppState> {
    let project_routes = Router::new()
        .route("/", get(projects::list).post(projects::create))
        .route("/check-subdomain/{subdomain}", get(projects::check_subdomain))
        .route(
            "/{id}",
            get(projects::get_by_id)
                .put(projects::update)
                .delete(projects::delete),
        )
        .route("/{id}/stats", get(projects::stats))
        .route(
            "/{project_id}/fixes",
            get(projects::list_fixes).post(projects::submit_fix),
        )
        .route(
            "/{project_id}/deployments",
            get(projects::list_deployments).post(projects::trigger_deployment),
        );

    let fix_routes = Router::new()
        .route("/{id}", get(fixes::get_by_id))
        .route("/{id}/triage", post(fixes::triage))
        .route("/{id}/confirm", post(fixes::confirm))
        .route("/{id}/start", post(fixes::start))
        .route("/{id}/approve", post(fixes::approve))
        .route("/{id}/reject", post(fixes::reject));

    let deployment_routes = Router::new()
        .route("/{id}", get(deployments::get_by_id))
        .route("/{id}/refresh", post(deployments::refresh))
        .route("/{id}/rollback", post(deployments::rollback));

    let billing_routes = Router::new().route("/invoices", get(billing::list_invoices));

    let webhook_routes = Router::new().route("/stripe", post(webhooks::stripe));

    Router::new()
        .nest("/projects", project_routes)
        .nest("/fixes", fix_routes)
        .nest("/deployments", deployment_routes)
        .nest("/billing", billing_routes)
        .nest("/webhooks", webhook_routes)
}
