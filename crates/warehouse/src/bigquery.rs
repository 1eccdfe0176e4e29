//! BigQuery REST v2 client.
//!
//! Covers exactly the two calls the gateway needs: dataset table listing
//! (paged) and synchronous query execution via `jobs.query`, polling
//! `getQueryResults` when the initial response reports an incomplete job.
//! Failed calls are never reissued.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use sightline_common::config::WarehouseSettings;
use sightline_common::models::{Row, TableMeta};
use sightline_error::{ErrorCode, ErrorContext, Result, SightlineError};

use crate::auth::{AccessTokenProvider, ServiceAccountKey, ServiceAccountTokenProvider};
use crate::rows::{convert_rows, TableRow, TableSchema};
use crate::Warehouse;

const POLL_INTERVAL: Duration = Duration::from_millis(500);
const LIST_PAGE_SIZE: &str = "1000";

pub struct BigQueryClient {
    http: reqwest::Client,
    project_id: String,
    api_base: String,
    query_timeout_ms: u64,
    auth: Arc<dyn AccessTokenProvider>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TableList {
    #[serde(default)]
    tables: Option<Vec<TableListItem>>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TableListItem {
    table_reference: TableReference,
    #[serde(rename = "type", default)]
    kind: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TableReference {
    table_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResults {
    #[serde(default)]
    job_complete: Option<bool>,
    #[serde(default)]
    job_reference: Option<JobReference>,
    #[serde(default)]
    schema: Option<TableSchema>,
    #[serde(default)]
    rows: Option<Vec<TableRow>>,
    #[serde(default)]
    page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobReference {
    job_id: String,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorBody {
    error: GoogleError,
}

#[derive(Debug, Deserialize)]
struct GoogleError {
    message: String,
}

impl BigQueryClient {
    /// Build a client from settings, loading the service-account key for
    /// authentication. The key's project id is used when the settings leave
    /// it unset.
    pub fn from_settings(settings: &WarehouseSettings) -> Result<Self> {
        let key = ServiceAccountKey::from_file(&settings.credentials_file)?;
        let auth = Arc::new(ServiceAccountTokenProvider::new(
            key.clone(),
            settings.scope.clone(),
        ));
        let mut client = Self::new(settings, auth)?;
        if client.project_id.is_empty() {
            client.project_id = key.project_id;
        }
        Ok(client)
    }

    /// Build a client with an explicit token provider (tests, pre-issued
    /// tokens).
    pub fn new(
        settings: &WarehouseSettings,
        auth: Arc<dyn AccessTokenProvider>,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            // Leave headroom over the server-side long poll.
            .timeout(Duration::from_millis(settings.query_timeout_ms + 10_000))
            .build()
            .map_err(|e| {
                SightlineError::new(
                    ErrorCode::InvalidConfig,
                    format!("Failed to build HTTP client: {}", e),
                )
            })?;

        Ok(Self {
            http,
            project_id: settings.project_id.clone(),
            api_base: settings.api_base.trim_end_matches('/').to_string(),
            query_timeout_ms: settings.query_timeout_ms,
            auth,
        })
    }

    async fn get_query_results(
        &self,
        token: &str,
        job_id: &str,
        page_token: Option<&str>,
    ) -> Result<QueryResults> {
        let url = format!(
            "{}/projects/{}/queries/{}",
            self.api_base, self.project_id, job_id
        );
        let mut req = self
            .http
            .get(&url)
            .bearer_auth(token)
            .query(&[("timeoutMs", self.query_timeout_ms.to_string())]);
        if let Some(pt) = page_token {
            req = req.query(&[("pageToken", pt)]);
        }

        let resp = req.send().await?;
        let resp = check_status(resp, &url).await?;
        Ok(resp.json().await?)
    }
}

async fn check_status(resp: reqwest::Response, endpoint: &str) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let code = match status.as_u16() {
        401 => ErrorCode::CredentialRejected,
        408 | 504 => ErrorCode::ConnectionTimeout,
        500..=599 => ErrorCode::WarehouseUnavailable,
        _ => ErrorCode::QueryExecution,
    };

    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<GoogleErrorBody>(&body)
        .map(|b| b.error.message)
        .unwrap_or(body);

    Err(
        SightlineError::new(code, format!("Warehouse call failed: {}", message)).with_context(
            ErrorContext::Warehouse {
                endpoint: endpoint.to_string(),
                status: Some(status.as_u16()),
            },
        ),
    )
}

#[async_trait]
impl Warehouse for BigQueryClient {
    async fn list_tables(&self, dataset: &str) -> Result<Vec<TableMeta>> {
        let token = self.auth.access_token().await?;
        let url = format!(
            "{}/projects/{}/datasets/{}/tables",
            self.api_base, self.project_id, dataset
        );

        let mut out = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut req = self
                .http
                .get(&url)
                .bearer_auth(&token)
                .query(&[("maxResults", LIST_PAGE_SIZE)]);
            if let Some(pt) = &page_token {
                req = req.query(&[("pageToken", pt.as_str())]);
            }

            let resp = req.send().await?;
            let resp = check_status(resp, &url).await?;
            let page: TableList = resp.json().await?;

            out.extend(page.tables.unwrap_or_default().into_iter().map(|t| {
                TableMeta {
                    id: t.table_reference.table_id,
                    kind: t.kind,
                }
            }));

            match page.next_page_token {
                Some(pt) => page_token = Some(pt),
                None => break,
            }
        }

        tracing::debug!(target: "warehouse", dataset, tables = out.len(), "Listed tables");
        Ok(out)
    }

    async fn query(&self, sql: &str) -> Result<Vec<Row>> {
        let token = self.auth.access_token().await?;
        let url = format!("{}/projects/{}/queries", self.api_base, self.project_id);
        tracing::debug!(target: "warehouse", sql, "Submitting query");

        let resp = self
            .http
            .post(&url)
            .bearer_auth(&token)
            .json(&json!({
                "query": sql,
                "useLegacySql": false,
                "timeoutMs": self.query_timeout_ms,
            }))
            .send()
            .await?;
        let resp = check_status(resp, &url).await?;
        let mut results: QueryResults = resp.json().await?;

        let job_id = results.job_reference.as_ref().map(|j| j.job_id.clone());

        // The long poll can return before the job finishes; keep asking for
        // results until it does. This completes one logical call, it is not
        // a retry.
        while !results.job_complete.unwrap_or(false) {
            let job_id = job_id.as_deref().ok_or_else(|| {
                SightlineError::new(
                    ErrorCode::QueryExecution,
                    "Incomplete query response without a job reference",
                )
            })?;
            tokio::time::sleep(POLL_INTERVAL).await;
            results = self.get_query_results(&token, job_id, None).await?;
        }

        let schema = match results.schema.take() {
            Some(s) => s,
            None => return Ok(Vec::new()),
        };
        let mut raw = results.rows.take().unwrap_or_default();
        let mut page_token = results.page_token.take();

        while let Some(pt) = page_token {
            let job_id = job_id.as_deref().ok_or_else(|| {
                SightlineError::new(
                    ErrorCode::QueryExecution,
                    "Paged query response without a job reference",
                )
            })?;
            let next = self.get_query_results(&token, job_id, Some(&pt)).await?;
            raw.extend(next.rows.unwrap_or_default());
            page_token = next.page_token;
        }

        Ok(convert_rows(&schema, raw))
    }
}
