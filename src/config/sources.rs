use super::models::Config;
use config::{ConfigError, Environment, File};
use std::env;
use std::path::PathBuf;

const CONFIG_ENV_VAR: &str = "DOWNLOAD_WORKER_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config/download-worker.toml";
const ENV_PREFIX: &str = "DOWNLOAD_WORKER";
const ENV_SEPARATOR: &str = "__";

/// Load configuration from multiple sources with priority:
/// 1. Defaults (embedded in structs)
/// 2. TOML file (if exists)
/// 3. Environment variables from .env file (via dotenvy)
/// 4. System environment variables (highest priority)
pub fn load() -> Result<Config, ConfigError> {
    let _ = dotenvy::dotenv();

    let config_path = env::var(CONFIG_ENV_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));

    load_from_sources(config_path)
}

/// Secrets are never stored in TOML files, only in environment
fn load_secrets(config: &mut Config) {
    config.s3.access_key = env::var("S3_ACCESS_KEY")
        .or_else(|_| env::var("AWS_ACCESS_KEY_ID"))
        .ok();
    config.s3.secret_key = env::var("S3_SECRET_KEY")
        .or_else(|_| env::var("AWS_SECRET_ACCESS_KEY"))
        .ok();
}

/// Load configuration from a specific path and environment
pub fn load_from_sources(config_path: PathBuf) -> Result<Config, ConfigError> {
    let mut builder = config::Config::builder();

    if config_path.exists() {
        tracing::info!("Loading configuration from: {}", config_path.display());
        builder = builder.add_source(File::from(config_path).required(false));
    } else {
        tracing::warn!(
            "Configuration file not found at {}, using defaults and environment overrides",
            config_path.display()
        );
    }

    // DOWNLOAD_WORKER__DOWNLOADER__WHITELIST=a.nl,b.nl -> downloader.whitelist
    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator(ENV_SEPARATOR)
            .list_separator(",")
            .with_list_parse_key("downloader.whitelist")
            .try_parsing(true),
    );

    let mut config: Config = builder.build()?.try_deserialize()?;
    load_secrets(&mut config);
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::humanize::ByteSize;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_defaults_only() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nonexistent.toml");

        let config = load_from_sources(config_path).unwrap();
        assert_eq!(config.broker.host, "localhost");
        assert_eq!(config.result_store.task_kind, "DOWNLOAD");
    }

    #[test]
    fn test_load_from_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        let toml_content = r#"
[broker]
host = "rabbitmq"
port = 5673

[downloader]
whitelist = ["dummy.nl", "beeldengeluid.nl"]
fs_threshold = "10GB"

[downloader.http]
request_timeout_secs = 300

[s3]
region = "eu-west-1"
endpoint = "http://minio:9000"
allow_http = true
        "#;

        fs::write(&config_path, toml_content).unwrap();

        let config = load_from_sources(config_path).unwrap();
        assert_eq!(config.broker.host, "rabbitmq");
        assert_eq!(config.broker.port, 5673);
        assert_eq!(config.downloader.whitelist, vec!["dummy.nl", "beeldengeluid.nl"]);
        assert_eq!(config.downloader.fs_threshold, Some(ByteSize(10_000_000_000)));
        assert_eq!(config.downloader.http.request_timeout_secs, Some(300));
        assert_eq!(config.downloader.http.connect_timeout_secs, None);
        assert_eq!(config.s3.region.as_deref(), Some("eu-west-1"));
        assert!(config.s3.allow_http);
    }

    #[test]
    fn test_malformed_threshold_fails() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");
        fs::write(&config_path, "[downloader]\nfs_threshold = \"1Megabyte\"\n").unwrap();

        assert!(load_from_sources(config_path).is_err());
    }

    // Environment overrides are not exercised here to avoid unsafe env::set_var
}
