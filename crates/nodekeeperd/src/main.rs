//! nodekeeperd: per-node health and maintenance agent.
//!
//! # Usage
//!
//! ```text
//! nodekeeperd --control-plane --config /etc/nodekeeper/agent.toml
//! ```
//!
//! Exit codes: 0 after a clean shutdown, 1 on configuration or server
//! errors, 2 when no liveness probes can be discovered, 3 when the reboot
//! coordination config cannot be resolved.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, ValueEnum};
use nodekeeper_core::NodeRole;
use nodekeeperd::{server, startup};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str =
    "info,nodekeeperd=debug,nodekeeper_probe=debug,nodekeeper_runtime=debug,nodekeeper_api=debug";

#[derive(Parser)]
#[command(name = "nodekeeperd", about = "Kubernetes node health and maintenance agent", version)]
struct Cli {
    /// Run as a control-plane node: adds the apiserver, controller-manager,
    /// scheduler and etcd probes and units.
    #[arg(long)]
    control_plane: bool,

    /// Pass `--insecure-options=all` to `rkt fetch`.
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    rkt_fetch_insecure: bool,

    /// Path to agent.toml. Built-in defaults are used when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Address to serve the API on.
    #[arg(long, default_value = "0.0.0.0:8000")]
    listen: SocketAddr,

    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

fn init_tracing(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

/// Exit code for a rejected command line: 0 for `--help`/`--version`, 1 for
/// usage errors. 2 is reserved for discovery failures.
fn usage_exit_code(err: &clap::Error) -> u8 {
    if err.use_stderr() { 1 } else { 0 }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return ExitCode::from(usage_exit_code(&e));
        }
    };
    init_tracing(cli.log_format);

    let role = NodeRole::from_control_plane_flag(cli.control_plane);
    info!(%role, version = env!("CARGO_PKG_VERSION"), "nodekeeperd starting");

    let runtime = match startup::load_config(cli.config.as_deref())
        .and_then(|config| startup::build_runtime(role, cli.rkt_fetch_insecure, &config))
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "startup failed");
            return ExitCode::from(e.exit_code());
        }
    };
    info!(
        endpoint = %runtime.reboot().reboot_endpoint,
        lock = %runtime.reboot().reboot_lock,
        probes = runtime.health().probes().len(),
        "reboot coordination resolved"
    );

    match server::serve(cli.listen, runtime).await {
        Ok(()) => {
            info!("nodekeeperd stopped");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "API server failed");
            ExitCode::FAILURE
        }
    }
}
