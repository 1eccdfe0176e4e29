use anyhow::{Context, Result};
use serde::Deserialize;
use validator::Validate;

// Default constants
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:3001";
pub const DEFAULT_SERVER_NAME: &str = "Sightline Server";

pub const DEFAULT_API_BASE: &str = "https://bigquery.googleapis.com/bigquery/v2";
pub const DEFAULT_TOKEN_SCOPE: &str = "https://www.googleapis.com/auth/bigquery.readonly";
pub const DEFAULT_USERS_TABLE_PREFIX: &str = "pseudonymous_users_";
pub const DEFAULT_EVENTS_TABLE_PREFIX: &str = "events_";
pub const DEFAULT_QUERY_TIMEOUT_MS: u64 = 30_000;

pub const DEFAULT_CACHE_ENABLED: bool = true;

#[derive(Debug, Deserialize, Default, Clone, Validate)]
pub struct AppConfig {
    #[serde(default)]
    #[validate(nested)]
    pub server: ServerSettings,
    #[serde(default)]
    #[validate(nested)]
    pub warehouse: WarehouseSettings,
    #[serde(default)]
    pub cache: QueryCacheConfig,
}

#[derive(Debug, Deserialize, Clone, Validate)]
pub struct ServerSettings {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    #[serde(default = "default_server_name")]
    pub name: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            name: default_server_name(),
        }
    }
}

fn default_listen_addr() -> String {
    DEFAULT_LISTEN_ADDR.to_string()
}

fn default_server_name() -> String {
    DEFAULT_SERVER_NAME.to_string()
}

/// Warehouse connection settings.
///
/// `project_id` and `dataset` identify the analytics export;
/// `credentials_file` points at the service-account JSON key supplying the
/// client's identity. `api_base` is overridable so tests can target a local
/// mock server.
#[derive(Debug, Deserialize, Clone, Validate)]
pub struct WarehouseSettings {
    #[serde(default)]
    pub project_id: String,

    #[serde(default)]
    pub dataset: String,

    #[serde(default)]
    pub credentials_file: String,

    #[serde(default = "default_api_base")]
    #[validate(custom(function = "validate_api_base"))]
    pub api_base: String,

    #[serde(default = "default_token_scope")]
    pub scope: String,

    #[serde(default = "default_users_table_prefix")]
    pub users_table_prefix: String,

    #[serde(default = "default_events_table_prefix")]
    pub events_table_prefix: String,

    #[serde(default = "default_query_timeout_ms")]
    pub query_timeout_ms: u64,
}

impl Default for WarehouseSettings {
    fn default() -> Self {
        Self {
            project_id: String::new(),
            dataset: String::new(),
            credentials_file: String::new(),
            api_base: default_api_base(),
            scope: default_token_scope(),
            users_table_prefix: default_users_table_prefix(),
            events_table_prefix: default_events_table_prefix(),
            query_timeout_ms: default_query_timeout_ms(),
        }
    }
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_token_scope() -> String {
    DEFAULT_TOKEN_SCOPE.to_string()
}

fn default_users_table_prefix() -> String {
    DEFAULT_USERS_TABLE_PREFIX.to_string()
}

fn default_events_table_prefix() -> String {
    DEFAULT_EVENTS_TABLE_PREFIX.to_string()
}

fn default_query_timeout_ms() -> u64 {
    DEFAULT_QUERY_TIMEOUT_MS
}

fn validate_api_base(url: &str) -> Result<(), validator::ValidationError> {
    if url.is_empty() {
        return Ok(()); // Allow empty - will use default
    }

    match url::Url::parse(url) {
        Ok(_) => Ok(()),
        Err(_) => Err(validator::ValidationError::new("invalid_url")),
    }
}

/// Result cache settings.
///
/// TTL and capacity are deliberately optional: with both unset, entries live
/// for the process lifetime. They bound staleness and memory, they are not
/// relied upon for correctness.
#[derive(Debug, Deserialize, Clone)]
pub struct QueryCacheConfig {
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub max_entries: Option<u64>,
    #[serde(default)]
    pub ttl_seconds: Option<u64>,
}

impl Default for QueryCacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            max_entries: None,
            ttl_seconds: None,
        }
    }
}

fn default_cache_enabled() -> bool {
    DEFAULT_CACHE_ENABLED
}

// Config implementation
impl AppConfig {
    pub fn from_file(path: &str) -> Result<Self> {
        let builder = config::Config::builder();

        let builder = if std::path::Path::new(path).exists() {
            builder.add_source(config::File::with_name(path))
        } else {
            builder
        };

        // Add environment variables
        // Map SIGHTLINE_WAREHOUSE__DATASET to warehouse.dataset, etc.
        let builder = builder.add_source(
            config::Environment::with_prefix("SIGHTLINE")
                .separator("__")
                .try_parsing(true),
        );

        let cfg = builder.build().context("Failed to build configuration")?;

        let app_config: AppConfig = cfg
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        app_config
            .validate()
            .map_err(|e| anyhow::anyhow!("Configuration validation failed: {:?}", e))?;

        Ok(app_config)
    }
}
