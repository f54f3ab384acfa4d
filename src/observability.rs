//! Tracing setup and job counters

use std::fs::OpenOptions;
use std::io;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::LoggingConfig;

pub const LOG_FILE_NAME: &str = "download-worker.log";

/// Tracing directive for a configured level name
pub fn level_directive(level: &str) -> &'static str {
    match level.to_ascii_uppercase().as_str() {
        "DEBUG" => "debug",
        "WARNING" | "WARN" => "warn",
        "ERROR" | "CRITICAL" => "error",
        _ => "info",
    }
}

/// Install the global subscriber: stdout, plus an append-only log file when
/// a log directory is configured. `RUST_LOG` overrides the configured level.
pub fn init_tracing(logging: &LoggingConfig) -> io::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_directive(&logging.level)));

    let file_layer = match &logging.dir {
        Some(dir) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(dir.join(LOG_FILE_NAME))?;
            Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .try_init()
        .map_err(io::Error::other)
}

/// Run `f` under a temporary stdout subscriber at INFO (or `RUST_LOG`).
///
/// Configuration is read before [`init_tracing`] can be called, so its own
/// log lines would otherwise go nowhere.
pub fn with_startup_logging<T>(f: impl FnOnce() -> T) -> T {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    with_startup_subscriber(filter, io::stdout, f)
}

fn with_startup_subscriber<W, T>(filter: EnvFilter, make_writer: W, f: impl FnOnce() -> T) -> T
where
    W: for<'a> fmt::MakeWriter<'a> + Send + Sync + 'static,
{
    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(make_writer)
        .finish();
    tracing::subscriber::with_default(subscriber, f)
}

/// Per-outcome job counters
#[derive(Debug, Default)]
pub struct Metrics {
    jobs_received: AtomicU64,
    downloads_completed: AtomicU64,
    already_present: AtomicU64,
    results_reused: AtomicU64,
    jobs_rejected: AtomicU64,
    remote_errors: AtomicU64,
    jobs_requeued: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn job_received(&self) {
        Self::incr(&self.jobs_received, "jobs_received");
    }

    pub fn download_completed(&self) {
        Self::incr(&self.downloads_completed, "downloads_completed");
    }

    pub fn already_present(&self) {
        Self::incr(&self.already_present, "already_present");
    }

    pub fn result_reused(&self) {
        Self::incr(&self.results_reused, "results_reused");
    }

    pub fn job_rejected(&self) {
        Self::incr(&self.jobs_rejected, "jobs_rejected");
    }

    pub fn remote_error(&self) {
        Self::incr(&self.remote_errors, "remote_errors");
    }

    pub fn job_requeued(&self) {
        Self::incr(&self.jobs_requeued, "jobs_requeued");
    }

    fn incr(counter: &AtomicU64, name: &'static str) {
        counter.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = name, "Metric incremented");
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            jobs_received: self.jobs_received.load(Ordering::Relaxed),
            downloads_completed: self.downloads_completed.load(Ordering::Relaxed),
            already_present: self.already_present.load(Ordering::Relaxed),
            results_reused: self.results_reused.load(Ordering::Relaxed),
            jobs_rejected: self.jobs_rejected.load(Ordering::Relaxed),
            remote_errors: self.remote_errors.load(Ordering::Relaxed),
            jobs_requeued: self.jobs_requeued.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub jobs_received: u64,
    pub downloads_completed: u64,
    pub already_present: u64,
    pub results_reused: u64,
    pub jobs_rejected: u64,
    pub remote_errors: u64,
    pub jobs_requeued: u64,
}
