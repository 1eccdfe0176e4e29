//! Report execution: cache-wrapped warehouse queries and response shaping.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tracing::{debug, info};

use sightline_common::config::{QueryCacheConfig, WarehouseSettings};
use sightline_common::models::ReportDescriptor;
use sightline_error::{ErrorCode, ErrorContext, Result, SightlineError};
use sightline_warehouse::Warehouse;

use crate::cache::ResultCache;
use crate::catalog::{ReportCatalog, TableRef, TableScope};
use crate::resolver::{DateRangeSelector, TableResolver};

pub struct ReportingEngineOptions {
    pub warehouse: Arc<dyn Warehouse>,
    pub settings: WarehouseSettings,
    pub cache: QueryCacheConfig,
}

pub struct ReportingEngine {
    warehouse: Arc<dyn Warehouse>,
    resolver: TableResolver,
    catalog: ReportCatalog,
    cache: ResultCache,
    project_id: String,
    dataset: String,
    users_table_prefix: String,
    events_table_prefix: String,
    active_queries: Arc<AtomicUsize>,
}

impl ReportingEngine {
    pub fn new(options: ReportingEngineOptions) -> Self {
        let resolver = TableResolver::new(
            options.warehouse.clone(),
            options.settings.dataset.clone(),
            options.settings.users_table_prefix.clone(),
        );

        Self {
            warehouse: options.warehouse,
            resolver,
            catalog: ReportCatalog::standard(),
            cache: ResultCache::new(&options.cache),
            project_id: options.settings.project_id.clone(),
            dataset: options.settings.dataset.clone(),
            users_table_prefix: options.settings.users_table_prefix.clone(),
            events_table_prefix: options.settings.events_table_prefix.clone(),
            active_queries: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn catalog(&self) -> &ReportCatalog {
        &self.catalog
    }

    pub fn report_descriptors(&self) -> Vec<ReportDescriptor> {
        self.catalog.descriptors()
    }

    pub fn active_queries(&self) -> usize {
        self.active_queries.load(Ordering::Relaxed)
    }

    pub fn cached_entries(&self) -> u64 {
        self.cache.entry_count()
    }

    /// Serve one report: catalog lookup, shard resolution, rendering,
    /// cached execution, label shaping.
    pub async fn run_report(
        &self,
        name: &str,
        selector: Option<DateRangeSelector>,
    ) -> Result<Value> {
        let report = self.catalog.get(name)?;

        let table = match report.scope {
            TableScope::Snapshot => match self.resolver.resolve(selector).await? {
                Some(table) => table,
                None => {
                    return Err(SightlineError::new(
                        ErrorCode::DatasetEmpty,
                        format!(
                            "No '{}' tables found in dataset '{}'",
                            self.users_table_prefix, self.dataset
                        ),
                    )
                    .with_context(ErrorContext::DatasetEmpty {
                        dataset: self.dataset.clone(),
                        prefix: self.users_table_prefix.clone(),
                    }))
                }
            },
            // Wildcard templates span every shard; no listing call needed.
            TableScope::Wildcard => format!("{}*", self.events_table_prefix),
        };

        let table_ref = TableRef {
            project: self.project_id.clone(),
            dataset: self.dataset.clone(),
            table,
        };
        let sql = report.render(&table_ref);

        let started = Instant::now();
        let rows = self.execute(&sql, report.label).await?;

        info!(
            target: "metrics",
            report = report.name,
            rows = rows.len(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Report served"
        );

        let mut body = serde_json::Map::new();
        body.insert(report.label.to_string(), Value::Array(rows));
        Ok(Value::Object(body))
    }

    /// Run a query string through the cache, projecting each row under
    /// `label`.
    pub async fn execute(&self, sql: &str, label: &str) -> Result<Vec<Value>> {
        self.active_queries.fetch_add(1, Ordering::Relaxed);
        let fetched = AtomicBool::new(false);

        let result = self
            .cache
            .get_or_fetch(sql, async {
                fetched.store(true, Ordering::Relaxed);
                self.warehouse.query(sql).await
            })
            .await;

        self.active_queries.fetch_sub(1, Ordering::Relaxed);
        let rows = result?;

        let outcome = if fetched.load(Ordering::Relaxed) {
            "miss"
        } else {
            "hit"
        };
        debug!(target: "cache", outcome, rows = rows.len(), "Result cache consulted");

        Ok(rows
            .iter()
            .map(|row| {
                let mut wrapped = serde_json::Map::new();
                wrapped.insert(label.to_string(), Value::Object(row.clone()));
                Value::Object(wrapped)
            })
            .collect())
    }
}
