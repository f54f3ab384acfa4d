use crate::humanize::ByteSize;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub broker: BrokerConfig,
    #[serde(default)]
    pub result_store: ResultStoreConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub downloader: DownloaderConfig,
    #[serde(default)]
    pub s3: S3Config,
}

/// RabbitMQ-style broker the framework delivers jobs through
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BrokerConfig {
    #[serde(default = "default_broker_host")]
    pub host: String,
    #[serde(default = "default_broker_port")]
    pub port: u16,
    #[serde(default = "default_exchange")]
    pub exchange: String,
    #[serde(default = "default_response_queue")]
    pub response_queue: String,
    #[serde(default = "default_broker_user")]
    pub user: String,
    #[serde(default = "default_broker_user", skip_serializing)]
    pub password: String,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: default_broker_host(),
            port: default_broker_port(),
            exchange: default_exchange(),
            response_queue: default_response_queue(),
            user: default_broker_user(),
            password: default_broker_user(),
        }
    }
}

fn default_broker_host() -> String {
    "localhost".to_string()
}

fn default_broker_port() -> u16 {
    5672
}

fn default_exchange() -> String {
    "DANE-exchange".to_string()
}

fn default_response_queue() -> String {
    "DANE-response-queue".to_string()
}

fn default_broker_user() -> String {
    "guest".to_string()
}

/// Embedded result ledger
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResultStoreConfig {
    #[serde(default = "default_result_store_path")]
    pub path: PathBuf,
    #[serde(default = "default_task_kind")]
    pub task_kind: String,
}

impl Default for ResultStoreConfig {
    fn default() -> Self {
        Self {
            path: default_result_store_path(),
            task_kind: default_task_kind(),
        }
    }
}

fn default_result_store_path() -> PathBuf {
    PathBuf::from("data/results")
}

fn default_task_kind() -> String {
    crate::job::DOWNLOAD_TASK_KIND.to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// DEBUG, INFO, WARNING, ERROR or CRITICAL
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Directory for the log file; stdout only when unset
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            dir: None,
        }
    }
}

fn default_log_level() -> String {
    "INFO".to_string()
}

/// Roots for per-document directory allocation
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PathsConfig {
    #[serde(default = "default_temp_folder")]
    pub temp_folder: PathBuf,
    #[serde(default = "default_out_folder")]
    pub out_folder: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            temp_folder: default_temp_folder(),
            out_folder: default_out_folder(),
        }
    }
}

fn default_temp_folder() -> PathBuf {
    PathBuf::from("input-files")
}

fn default_out_folder() -> PathBuf {
    PathBuf::from("output-files")
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DownloaderConfig {
    /// Bare domains HTTP(S) sources must match exactly
    #[serde(default, deserialize_with = "string_or_list")]
    pub whitelist: Vec<String>,
    /// Minimum free bytes to keep on the download filesystem
    #[serde(default)]
    pub fs_threshold: Option<ByteSize>,
    #[serde(default)]
    pub http: HttpConfig,
}

/// HTTP client settings; unset timeouts leave the client defaults in place
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default)]
    pub connect_timeout_secs: Option<u64>,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            connect_timeout_secs: None,
            request_timeout_secs: None,
        }
    }
}

fn default_user_agent() -> String {
    format!("download-worker/{}", env!("CARGO_PKG_VERSION"))
}

/// S3 (or compatible) object store settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct S3Config {
    pub region: Option<String>,
    pub endpoint: Option<String>,
    #[serde(default)]
    pub allow_http: bool,
    /// S3 access key (loaded from environment, not from config file)
    #[serde(skip)]
    pub access_key: Option<String>,
    /// S3 secret key (loaded from environment, not from config file)
    #[serde(skip)]
    pub secret_key: Option<String>,
}

/// Accepts `["a", "b"]` as well as `"a,b"`
fn string_or_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrList {
        List(Vec<String>),
        Str(String),
    }

    Ok(match StringOrList::deserialize(deserializer)? {
        StringOrList::List(list) => list,
        StringOrList::Str(joined) => joined
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(String::from)
            .collect(),
    })
}
