use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "download-worker")]
#[command(about = "Downloads HTTP(S) and S3 sources for document jobs", long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to $DOWNLOAD_WORKER_CONFIG or config/download-worker.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Process jobs from a JSON-lines file, one response per line on stdout
    Run(RunArgs),
    /// Download a single source into a directory
    Fetch(FetchArgs),
    /// Load and validate the configuration
    CheckConfig,
}

#[derive(clap::Args, Debug)]
pub struct RunArgs {
    /// File with one `{"task": ..., "document": ...}` object per line
    #[arg(long)]
    pub jobs: PathBuf,

    /// Jobs buffered between the reader and the worker
    #[arg(long, default_value_t = 16)]
    pub queue_depth: usize,
}

#[derive(clap::Args, Debug)]
pub struct FetchArgs {
    /// http(s):// or s3:// source
    pub uri: String,

    /// Existing directory to download into
    #[arg(long)]
    pub dir: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run() {
        let cli = Cli::parse_from([
            "download-worker",
            "--config",
            "w.toml",
            "run",
            "--jobs",
            "jobs.jsonl",
        ]);
        assert_eq!(cli.config, Some(PathBuf::from("w.toml")));
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.jobs, PathBuf::from("jobs.jsonl"));
                assert_eq!(args.queue_depth, 16);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_fetch() {
        let cli = Cli::parse_from([
            "download-worker",
            "fetch",
            "s3://bucket/key.mp4",
            "--dir",
            "/tmp",
        ]);
        assert!(matches!(
            cli.command,
            Commands::Fetch(ref args) if args.uri == "s3://bucket/key.mp4"
        ));
    }

    #[test]
    fn test_parse_check_config() {
        let cli = Cli::parse_from(["download-worker", "check-config", "--config", "w.toml"]);
        assert!(matches!(cli.command, Commands::CheckConfig));
        assert!(cli.config.is_some());
    }
}
