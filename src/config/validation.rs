use super::models::Config;
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;
use thiserror::Error;

const LOG_LEVELS: [&str; 5] = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"];

/// One or more labels followed by an alphabetic top-level label
const DOMAIN_PATTERN: &str = concat!(
    r"^(?:[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?\.)+",
    r"[A-Za-z][A-Za-z0-9-]{0,61}[A-Za-z0-9]$",
);

static DOMAIN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(DOMAIN_PATTERN).expect("valid domain regex"));

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Broker setting '{field}' must not be empty")]
    EmptyBrokerField { field: &'static str },

    #[error("Broker port must be non-zero")]
    InvalidBrokerPort,

    #[error("Result store task_kind must not be empty")]
    EmptyTaskKind,

    #[error("Invalid log level '{level}', expected one of DEBUG, INFO, WARNING, ERROR, CRITICAL")]
    InvalidLogLevel { level: String },

    #[error("Parent directory of {field} does not exist: {path}")]
    MissingParentDir { field: &'static str, path: String },

    #[error("Whitelist entry is not a valid domain: '{domain}'")]
    InvalidDomain { domain: String },
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_broker(config)?;
    validate_result_store(config)?;
    validate_logging(config)?;
    validate_paths(config)?;
    validate_whitelist(config)?;
    Ok(())
}

fn validate_broker(config: &Config) -> Result<(), ValidationError> {
    let broker = &config.broker;
    for (field, value) in [
        ("host", &broker.host),
        ("exchange", &broker.exchange),
        ("response_queue", &broker.response_queue),
        ("user", &broker.user),
    ] {
        if value.trim().is_empty() {
            return Err(ValidationError::EmptyBrokerField { field });
        }
    }

    if broker.port == 0 {
        return Err(ValidationError::InvalidBrokerPort);
    }

    Ok(())
}

fn validate_result_store(config: &Config) -> Result<(), ValidationError> {
    if config.result_store.task_kind.trim().is_empty() {
        return Err(ValidationError::EmptyTaskKind);
    }
    Ok(())
}

fn validate_logging(config: &Config) -> Result<(), ValidationError> {
    let level = &config.logging.level;
    if !LOG_LEVELS.iter().any(|known| known.eq_ignore_ascii_case(level)) {
        return Err(ValidationError::InvalidLogLevel {
            level: level.clone(),
        });
    }

    if let Some(dir) = &config.logging.dir {
        require_parent("logging.dir", dir)?;
    }
    Ok(())
}

fn validate_paths(config: &Config) -> Result<(), ValidationError> {
    require_parent("paths.temp_folder", &config.paths.temp_folder)?;
    require_parent("paths.out_folder", &config.paths.out_folder)?;
    Ok(())
}

/// Whitelist entries must be bare domain names, no scheme or path
fn validate_whitelist(config: &Config) -> Result<(), ValidationError> {
    for domain in &config.downloader.whitelist {
        if domain.len() > 253 || !DOMAIN_RE.is_match(domain) {
            return Err(ValidationError::InvalidDomain {
                domain: domain.clone(),
            });
        }
    }
    Ok(())
}

/// A relative path without a parent component lives in the working directory.
fn require_parent(field: &'static str, path: &Path) -> Result<(), ValidationError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() && !parent.is_dir() => {
            Err(ValidationError::MissingParentDir {
                field,
                path: path.display().to_string(),
            })
        }
        _ => Ok(()),
    }
}
