use access_dashboard::app;
use access_dashboard::config::DashboardConfig;
use clap::Parser;
use std::path::PathBuf;

/// Serve the access dashboard API
#[derive(Parser, Debug)]
#[command(name = "dashboard-web", version)]
struct WebArgs {
    /// Optional TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Access log export (.xlsx or .csv)
    #[arg(long)]
    source: Option<PathBuf>,

    /// Address to listen on, e.g. 0.0.0.0:8080
    #[arg(long)]
    bind: Option<String>,
}

/// Main entry point for the web dashboard
///
/// Loads the access log once and serves the filter, summary, chart and
/// export endpoints until the process is stopped.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = WebArgs::parse();
    let mut config = match &args.config {
        Some(path) => DashboardConfig::from_file(path)?,
        None => DashboardConfig::default(),
    }
    .with_overrides(args.source, None, None);
    if let Some(bind) = args.bind {
        config.web.bind = bind;
    }

    app::run(config).await
}
