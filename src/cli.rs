use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Parser)]
#[command(
    name = "nsdeck",
    version,
    about = "Terminal console for cloning namespaces and tuning their deployments, config maps and secrets."
)]
pub struct CliArgs {
    /// Runtime config file (YAML)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Fixture data set served by the offline backend (YAML)
    #[arg(long)]
    pub fixtures: Option<PathBuf>,

    /// Open a namespace's deployments directly
    #[arg(short, long)]
    pub namespace: Option<String>,

    /// Screen opened for --namespace: deployments, configmaps or secrets
    #[arg(long)]
    pub view: Option<String>,

    /// Rows requested per page
    #[arg(long)]
    pub page_size: Option<usize>,

    /// Artificial backend latency in milliseconds
    #[arg(long)]
    pub latency_ms: Option<u64>,

    /// tracing filter (for example: info,debug,trace)
    #[arg(long, default_value = "info")]
    pub log_filter: String,

    /// Write logs to this file instead of discarding them
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}
