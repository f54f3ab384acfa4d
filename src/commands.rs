use std::path::PathBuf;
use std::sync::Arc;

use download_worker::config::{Config, ConfigError};
use download_worker::job::SourceKind;
use download_worker::ledger::FjallStore;
use download_worker::messaging::StdoutChannel;
use download_worker::strategy::{AmazonS3Provider, DownloadStrategy, HttpStrategy, S3Strategy};
use download_worker::worker::{Worker, build_orchestrator, feed_jobs_from_file};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::cli::{FetchArgs, RunArgs};

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub fn load_config(path: Option<PathBuf>) -> Result<Config, ConfigError> {
    match path {
        Some(path) => Config::load_from_path(path),
        None => Config::load(),
    }
}

pub async fn run(config: &Config, args: RunArgs) -> Result<(), AnyError> {
    let store = Arc::new(FjallStore::open(&config.result_store.path)?);
    let orchestrator = Arc::new(build_orchestrator(config, store.clone())?);
    let metrics = orchestrator.metrics().clone();
    let worker = Worker::new(orchestrator, Arc::new(StdoutChannel::new()));

    let (sender, receiver) = mpsc::channel(args.queue_depth.max(1));
    let jobs = args.jobs;
    let feed = tokio::spawn(async move { feed_jobs_from_file(&jobs, sender).await });

    let (snapshot, interrupted) = tokio::select! {
        snapshot = worker.run(receiver) => (snapshot, false),
        _ = shutdown_signal() => (metrics.snapshot(), true),
    };

    store.persist()?;
    info!(?snapshot, "Job run finished");

    if interrupted {
        feed.abort();
        return Ok(());
    }
    let sent = feed.await??;
    info!(sent, "All jobs processed");
    Ok(())
}

pub async fn fetch(config: &Config, args: FetchArgs) -> Result<(), AnyError> {
    let strategy: Arc<dyn DownloadStrategy> = match SourceKind::from_uri(&args.uri) {
        Some(SourceKind::Http) => Arc::new(HttpStrategy::new(&config.downloader.http)?),
        Some(SourceKind::S3) => Arc::new(S3Strategy::new(Arc::new(AmazonS3Provider::new(
            config.s3.clone(),
        )))),
        None => return Err(format!("Unsupported source URI: {}", args.uri).into()),
    };

    let outcome = strategy.fetch(&args.uri, &args.dir).await;
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}

pub fn check_config(config: &Config) -> Result<(), AnyError> {
    println!("{}", serde_json::to_string_pretty(config)?);
    info!(
        whitelist = config.downloader.whitelist.len(),
        fs_threshold = ?config.downloader.fs_threshold.map(|t| t.to_human_readable()),
        "Configuration is valid"
    );
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
