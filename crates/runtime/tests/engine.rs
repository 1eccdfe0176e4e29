use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use sightline_common::config::{QueryCacheConfig, WarehouseSettings};
use sightline_common::models::{Row, TableMeta};
use sightline_error::{ErrorCode, Result, SightlineError};
use sightline_runtime::{
    DateRangeSelector, ReportingEngine, ReportingEngineOptions, TableResolver,
};
use sightline_warehouse::Warehouse;

#[derive(Default)]
struct MockWarehouse {
    tables: Vec<String>,
    rows: Vec<Row>,
    fail_queries: bool,
    query_delay: Option<Duration>,
    list_calls: AtomicUsize,
    query_calls: AtomicUsize,
    last_sql: Mutex<Option<String>>,
}

impl MockWarehouse {
    fn with_tables(tables: &[&str]) -> Self {
        Self {
            tables: tables.iter().map(|t| t.to_string()).collect(),
            rows: sample_rows(2),
            ..Default::default()
        }
    }
}

#[async_trait]
impl Warehouse for MockWarehouse {
    async fn list_tables(&self, _dataset: &str) -> Result<Vec<TableMeta>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .tables
            .iter()
            .map(|t| TableMeta::new(t.clone()))
            .collect())
    }

    async fn query(&self, sql: &str) -> Result<Vec<Row>> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_sql.lock().unwrap() = Some(sql.to_string());

        if let Some(delay) = self.query_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_queries {
            return Err(SightlineError::new(
                ErrorCode::QueryExecution,
                "quotaExceeded",
            ));
        }
        Ok(self.rows.clone())
    }
}

fn sample_rows(n: usize) -> Vec<Row> {
    (0..n)
        .map(|i| {
            let mut row = Row::new();
            row.insert("user_pseudo_id".to_string(), format!("user_{i}").into());
            row.insert("city".to_string(), "Cape Town".into());
            row
        })
        .collect()
}

fn settings() -> WarehouseSettings {
    WarehouseSettings {
        project_id: "test-project".to_string(),
        dataset: "analytics_test".to_string(),
        ..Default::default()
    }
}

fn engine_over(warehouse: Arc<MockWarehouse>) -> ReportingEngine {
    ReportingEngine::new(ReportingEngineOptions {
        warehouse,
        settings: settings(),
        cache: QueryCacheConfig::default(),
    })
}

#[tokio::test]
async fn test_cache_idempotence() {
    let warehouse = Arc::new(MockWarehouse::with_tables(&[
        "pseudonymous_users_20240110",
        "pseudonymous_users_20240115",
    ]));
    let engine = engine_over(warehouse.clone());

    let first = engine.run_report("geo", None).await.unwrap();
    let second = engine.run_report("geo", None).await.unwrap();

    // Exactly one warehouse query; the cached response is deep-equal.
    assert_eq!(warehouse.query_calls.load(Ordering::SeqCst), 1);
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_cache_keys_are_exact_query_text() {
    let warehouse = Arc::new(MockWarehouse::with_tables(&[]));
    let engine = engine_over(warehouse.clone());

    engine.execute("SELECT 1", "x").await.unwrap();
    engine.execute("SELECT  1", "x").await.unwrap();

    // No normalization: whitespace variants are distinct entries.
    assert_eq!(warehouse.query_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_label_round_trip() {
    let warehouse = Arc::new(MockWarehouse {
        rows: sample_rows(3),
        ..Default::default()
    });
    let engine = engine_over(warehouse);

    let out = engine.execute("SELECT whatever", "geo").await.unwrap();

    assert_eq!(out.len(), 3);
    for (i, wrapped) in out.iter().enumerate() {
        let obj = wrapped.as_object().unwrap();
        assert_eq!(obj.len(), 1);
        assert_eq!(obj["geo"]["user_pseudo_id"], format!("user_{i}"));
        assert_eq!(obj["geo"]["city"], "Cape Town");
    }
}

#[tokio::test]
async fn test_resolver_end_to_end_scenarios() {
    let warehouse = Arc::new(MockWarehouse::with_tables(&[
        "events_20240101",
        "events_20240108",
        "events_20240115",
    ]));
    let resolver = TableResolver::new(warehouse, "analytics_test", "events_");
    let now = chrono::NaiveDate::from_ymd_opt(2024, 1, 20).unwrap();

    // 7days from 2024-01-20 targets events_20240113, which is absent.
    let err = resolver
        .resolve_at(Some(DateRangeSelector::SevenDays), now)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::TableNotFound);

    // No selector resolves the lexicographically greatest shard.
    let latest = resolver.resolve_at(None, now).await.unwrap();
    assert_eq!(latest.as_deref(), Some("events_20240115"));
}

#[tokio::test]
async fn test_selector_miss_surfaces_through_engine() {
    // A 2024-era listing cannot contain today-minus-7.
    let warehouse = Arc::new(MockWarehouse::with_tables(&[
        "pseudonymous_users_20240115",
    ]));
    let engine = engine_over(warehouse.clone());

    let err = engine
        .run_report("geo", Some(DateRangeSelector::SevenDays))
        .await
        .unwrap_err();

    assert_eq!(err.code, ErrorCode::TableNotFound);
    assert_eq!(warehouse.query_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_unknown_report_fails_before_warehouse() {
    let warehouse = Arc::new(MockWarehouse::with_tables(&[
        "pseudonymous_users_20240115",
    ]));
    let engine = engine_over(warehouse.clone());

    let err = engine.run_report("nonexistent", None).await.unwrap_err();

    assert_eq!(err.code, ErrorCode::UnknownReport);
    assert_eq!(warehouse.list_calls.load(Ordering::SeqCst), 0);
    assert_eq!(warehouse.query_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_wildcard_report_spans_shards_without_listing() {
    let warehouse = Arc::new(MockWarehouse::with_tables(&[]));
    let engine = engine_over(warehouse.clone());

    engine.run_report("eventPopularity", None).await.unwrap();

    assert_eq!(warehouse.list_calls.load(Ordering::SeqCst), 0);
    let sql = warehouse.last_sql.lock().unwrap().clone().unwrap();
    assert!(sql.contains("`test-project.analytics_test.events_*`"));
}

#[tokio::test]
async fn test_snapshot_report_on_empty_dataset() {
    let warehouse = Arc::new(MockWarehouse::with_tables(&["events_20240115"]));
    let engine = engine_over(warehouse.clone());

    let err = engine.run_report("mobile", None).await.unwrap_err();

    assert_eq!(err.code, ErrorCode::DatasetEmpty);
    assert_eq!(warehouse.query_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_warehouse_errors_propagate_and_are_not_cached() {
    let warehouse = Arc::new(MockWarehouse {
        fail_queries: true,
        ..Default::default()
    });
    let engine = engine_over(warehouse.clone());

    let err = engine.run_report("userRetention", None).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::QueryExecution);
    assert!(err.message.contains("quotaExceeded"));

    // The failure was not stored; a second request queries again.
    let _ = engine.run_report("userRetention", None).await.unwrap_err();
    assert_eq!(warehouse.query_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_concurrent_identical_requests_share_one_query() {
    let warehouse = Arc::new(MockWarehouse {
        rows: sample_rows(1),
        query_delay: Some(Duration::from_millis(100)),
        ..Default::default()
    });
    let engine = engine_over(warehouse.clone());

    let (a, b) = tokio::join!(
        engine.run_report("eventPopularity", None),
        engine.run_report("eventPopularity", None)
    );

    assert_eq!(a.unwrap(), b.unwrap());
    assert_eq!(warehouse.query_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_disabled_cache_queries_every_time() {
    let warehouse = Arc::new(MockWarehouse {
        rows: sample_rows(1),
        ..Default::default()
    });
    let engine = ReportingEngine::new(ReportingEngineOptions {
        warehouse: warehouse.clone(),
        settings: settings(),
        cache: QueryCacheConfig {
            enabled: false,
            ..Default::default()
        },
    });

    engine.run_report("userActivityOverTime", None).await.unwrap();
    engine.run_report("userActivityOverTime", None).await.unwrap();

    assert_eq!(warehouse.query_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_response_body_shape() {
    let warehouse = Arc::new(MockWarehouse::with_tables(&[
        "pseudonymous_users_20240115",
    ]));
    let engine = engine_over(warehouse);

    let body = engine.run_report("user", None).await.unwrap();
    let obj = body.as_object().unwrap();

    // Exactly one key, the report's label, holding the row array.
    assert_eq!(obj.len(), 1);
    let rows = obj["users"].as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].as_object().unwrap().len(), 1);
}
