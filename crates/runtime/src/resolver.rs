//! Dated-shard resolution against the warehouse table listing.
//!
//! Analytics exports land as one table per calendar day
//! (`<prefix>YYYYMMDD`). Snapshot reports pin the most recent shard, or an
//! explicitly selected one; descending lexicographic order equals reverse
//! chronological order because the date suffix is fixed-width and
//! zero-padded.

use chrono::{Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use sightline_common::models::TableMeta;
use sightline_error::{ErrorCode, ErrorContext, Result, SightlineError};
use sightline_warehouse::Warehouse;

/// Named date-range override for shard resolution. Absent means "latest".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DateRangeSelector {
    #[serde(rename = "7days")]
    SevenDays,
    #[serde(rename = "3months")]
    ThreeMonths,
}

impl DateRangeSelector {
    /// Days subtracted from today to find the target shard date.
    pub fn offset_days(&self) -> i64 {
        match self {
            Self::SevenDays => 7,
            Self::ThreeMonths => 90,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SevenDays => "7days",
            Self::ThreeMonths => "3months",
        }
    }
}

pub struct TableResolver {
    warehouse: Arc<dyn Warehouse>,
    dataset: String,
    prefix: String,
}

impl TableResolver {
    pub fn new(
        warehouse: Arc<dyn Warehouse>,
        dataset: impl Into<String>,
        prefix: impl Into<String>,
    ) -> Self {
        Self {
            warehouse,
            dataset: dataset.into(),
            prefix: prefix.into(),
        }
    }

    /// Resolve the shard to query, relative to the current date.
    ///
    /// Returns `Ok(None)` when no table matches the prefix at all; callers
    /// treat that as "no data available", not a crash.
    pub async fn resolve(&self, selector: Option<DateRangeSelector>) -> Result<Option<String>> {
        self.resolve_at(selector, Utc::now().date_naive()).await
    }

    /// Deterministic seam: resolution against an explicit "today".
    pub async fn resolve_at(
        &self,
        selector: Option<DateRangeSelector>,
        today: NaiveDate,
    ) -> Result<Option<String>> {
        let tables = self.warehouse.list_tables(&self.dataset).await?;
        let shards = filter_shards(tables, &self.prefix);

        match selector {
            None => Ok(shards.into_iter().next()),
            Some(selector) => {
                // The offset assumes daily shard granularity; ingestion lag
                // makes the strict match fail, which is surfaced rather than
                // papered over with the nearest shard.
                let target = today - Duration::days(selector.offset_days());
                let wanted = format!("{}{}", self.prefix, target.format("%Y%m%d"));

                if shards.iter().any(|shard| shard == &wanted) {
                    Ok(Some(wanted))
                } else {
                    Err(SightlineError::new(
                        ErrorCode::TableNotFound,
                        format!(
                            "Table '{}' for selector '{}' not found in dataset '{}'",
                            wanted,
                            selector.as_str(),
                            self.dataset
                        ),
                    )
                    .with_context(ErrorContext::TableNotFound {
                        table: wanted,
                        selector: Some(selector.as_str().to_string()),
                        available_tables: shards,
                    })
                    .with_hint("Ingestion for the requested day may not have landed yet"))
                }
            }
        }
    }
}

/// Filter the listing to prefix matches, most recent first.
fn filter_shards(tables: Vec<TableMeta>, prefix: &str) -> Vec<String> {
    let mut shards: Vec<String> = tables
        .into_iter()
        .map(|t| t.id)
        .filter(|id| id.starts_with(prefix))
        .collect();
    shards.sort_by(|a, b| b.cmp(a));
    shards
}
