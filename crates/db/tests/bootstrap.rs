use sqlx::PgPool;

/// Full bootstrap test: connect, migrate, verify seed data.
#[sqlx::test]
async fn test_full_bootstrap(pool: PgPool) {
    patchdock_db::health_check(&pool).await.unwrap();

    // Verify all six lookup tables exist and have seed data.
    let tables = [
        "project_statuses",
        "fix_statuses",
        "fix_complexities",
        "deployment_statuses",
        "invoice_statuses",
        "job_statuses",
    ];

    for table in tables {
        let count: (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(&pool)
            .await
            .unwrap_or_else(|e| panic!("{table} query failed: {e}"));
        assert!(count.0 > 0, "{table} should have seed data, got 0 rows");
    }
}

/// The fix status seed order must match the Rust enum discriminants.
#[sqlx::test]
async fn test_fix_status_seed_order(pool: PgPool) {
    let rows: Vec<(i16, String)> = sqlx::query_as("SELECT id, name FROM fix_statuses ORDER BY id")
        .fetch_all(&pool)
        .await
        .unwrap();

    let expected = [
        (1, "submitted"),
        (2, "triaging"),
        (3, "quoted"),
        (4, "awaiting_payment"),
        (5, "in_progress"),
        (6, "preview_ready"),
        (7, "approved"),
        (8, "deploying"),
        (9, "deployed"),
        (10, "rejected"),
        (11, "out_of_scope"),
        (12, "failed"),
    ];

    assert_eq!(rows.len(), expected.len());
    for ((id, name), (want_id, want_name)) in rows.iter().zip(expected) {
        assert_eq!(*id, want_id);
        assert_eq!(name, want_name);
    }
}
