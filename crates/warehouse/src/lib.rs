//! Warehouse client abstraction and the BigQuery implementation.
//!
//! The reporting runtime talks to the warehouse exclusively through the
//! [`Warehouse`] trait: one metadata listing call and one query call. The
//! production implementation is [`BigQueryClient`], speaking the BigQuery
//! REST v2 API with service-account JWT-assertion authentication; tests
//! supply their own implementations.

use async_trait::async_trait;
use sightline_common::models::{Row, TableMeta};
use sightline_error::Result;

pub mod auth;
pub mod bigquery;
pub mod rows;

pub use auth::{AccessTokenProvider, ServiceAccountKey, ServiceAccountTokenProvider, StaticTokenProvider};
pub use bigquery::BigQueryClient;

#[async_trait]
pub trait Warehouse: Send + Sync {
    /// Lists all tables in the given dataset.
    async fn list_tables(&self, dataset: &str) -> Result<Vec<TableMeta>>;

    /// Executes a query string and returns the full decoded row set.
    async fn query(&self, sql: &str) -> Result<Vec<Row>>;
}
