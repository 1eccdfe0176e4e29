//! Core report orchestration for the Sightline KPI gateway.
//!
//! The [`ReportingEngine`] is the central entry point for serving a report.
//! It manages:
//!
//! 1. **Shard Resolution**: Choosing the dated warehouse table to query
//!    ([`resolver`]).
//! 2. **The Report Catalog**: The fixed set of SQL templates ([`catalog`]).
//! 3. **Caching**: Result reuse keyed by exact query text ([`cache`]).
//! 4. **Execution**: The warehouse round trip and response shaping
//!    ([`engine`]).
//!
//! # Report Lifecycle
//!
//! 1. `run_report(name, selector)` called.
//! 2. **Lookup**: Report fetched from the catalog; unknown names fail before
//!    any warehouse I/O.
//! 3. **Resolution**: Snapshot reports resolve the latest (or
//!    selector-dated) shard; aggregate reports span the event wildcard.
//! 4. **Rendering**: The report template produces the query string.
//! 5. **Caching Check / Execution**: The exact query string keys the result
//!    cache; concurrent identical misses share one warehouse call.
//! 6. **Shaping**: Each row is projected under the report's label.

pub mod cache;
pub mod catalog;
pub mod engine;
pub mod resolver;

pub use cache::ResultCache;
pub use catalog::{Report, ReportCatalog, TableRef, TableScope};
pub use engine::{ReportingEngine, ReportingEngineOptions};
pub use resolver::{DateRangeSelector, TableResolver};
