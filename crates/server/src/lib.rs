//! Sightline Server: the HTTP API layer.
//!
//! Exposes the reporting engine via:
//! - **KPI API**: `/api/kpi/{report}` JSON endpoints for the dashboard.
//! - **Observability**: `/health`, `/ready`, and Prometheus `/metrics`.
use anyhow::Context;
use axum::{response::IntoResponse, routing::get, Json, Router};
use once_cell::sync::Lazy;
use prometheus::{Encoder, IntCounter, IntGauge, Opts, Registry, TextEncoder};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use sightline_common::config::AppConfig;
use sightline_runtime::{ReportingEngine, ReportingEngineOptions};
use sightline_warehouse::{BigQueryClient, Warehouse};

// Global metrics registry
pub static REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

pub static REPORT_REQUESTS: Lazy<IntCounter> = Lazy::new(|| {
    let opts = Opts::new(
        "sightline_report_requests_total",
        "Total number of report requests received",
    );
    let counter = IntCounter::with_opts(opts).unwrap();
    REGISTRY.register(Box::new(counter.clone())).unwrap();
    counter
});

pub static ACTIVE_QUERIES: Lazy<IntGauge> = Lazy::new(|| {
    let opts = Opts::new(
        "sightline_active_queries",
        "Number of currently active warehouse queries",
    );
    let gauge = IntGauge::with_opts(opts).unwrap();
    REGISTRY.register(Box::new(gauge.clone())).unwrap();
    gauge
});

pub static CACHE_ENTRIES: Lazy<IntGauge> = Lazy::new(|| {
    let opts = Opts::new(
        "sightline_cache_entries",
        "Number of entries in the result cache",
    );
    let gauge = IntGauge::with_opts(opts).unwrap();
    REGISTRY.register(Box::new(gauge.clone())).unwrap();
    gauge
});

pub mod api;

pub use api::{create_api_router, ApiError};

pub struct SightlineServer {
    config_path: String,
    warehouse: Option<Arc<dyn Warehouse>>,
}

impl Default for SightlineServer {
    fn default() -> Self {
        Self {
            config_path: "config/sightline.yaml".to_string(),
            warehouse: None,
        }
    }
}

impl SightlineServer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config_path: &str) -> Self {
        self.config_path = config_path.to_string();
        self
    }

    /// Inject a warehouse implementation; the BigQuery client built from
    /// configuration is used otherwise.
    pub fn with_warehouse(mut self, warehouse: Arc<dyn Warehouse>) -> Self {
        self.warehouse = Some(warehouse);
        self
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let config = AppConfig::from_file(&self.config_path)?;

        // Ensure logs directory exists
        std::fs::create_dir_all("logs").ok();

        // Per-report execution records land in a daily metrics appender;
        // everything else goes to stdout under RUST_LOG control.
        let metrics_appender = tracing_appender::rolling::daily("logs", "metrics.jsonl");
        let metrics_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_writer(metrics_appender)
            .with_filter(tracing_subscriber::filter::filter_fn(|metadata| {
                metadata.target() == "metrics"
            }));

        let stdout_layer =
            tracing_subscriber::fmt::layer().with_filter(EnvFilter::from_default_env());

        tracing_subscriber::registry()
            .with(stdout_layer)
            .with(metrics_layer)
            .try_init()
            .ok();

        let warehouse: Arc<dyn Warehouse> = match self.warehouse {
            Some(warehouse) => warehouse,
            None => Arc::new(
                BigQueryClient::from_settings(&config.warehouse)
                    .context("Failed to build BigQuery client")?,
            ),
        };

        let engine = Arc::new(ReportingEngine::new(ReportingEngineOptions {
            warehouse,
            settings: config.warehouse.clone(),
            cache: config.cache.clone(),
        }));

        let metrics_engine = engine.clone();
        let app = Router::new()
            .route("/health", get(health_handler))
            .route("/ready", get(ready_handler))
            .route(
                "/metrics",
                get(move || metrics_handler(metrics_engine.clone())),
            )
            .nest("/api", api::create_api_router(engine.clone()));

        let addr: SocketAddr = config.server.listen_addr.parse()?;
        info!(
            "{} listening on {} (dataset={}, cache={})",
            config.server.name, addr, config.warehouse.dataset, config.cache.enabled
        );

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .context("Failed to bind listen address")?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn ready_handler() -> Json<serde_json::Value> {
    Json(json!({ "status": "ready" }))
}

async fn metrics_handler(engine: Arc<ReportingEngine>) -> impl IntoResponse {
    ACTIVE_QUERIES.set(engine.active_queries() as i64);
    CACHE_ENTRIES.set(engine.cached_entries() as i64);

    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = vec![];
    encoder.encode(&metric_families, &mut buffer).unwrap();

    axum::response::Response::builder()
        .status(axum::http::StatusCode::OK)
        .header(axum::http::header::CONTENT_TYPE, encoder.format_type())
        .body(axum::body::Body::from(buffer))
        .unwrap()
}
