//! `buffered` 命令行入口
//!
//! 解析参数、初始化日志，然后分发到 run / validate / info 子命令。

mod cli;
mod commands;
mod error;
mod workload;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

use cli::{Cli, Commands};
use commands::{run_info, run_validate, run_workload};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Prometheus is set up by `run` itself, only when a port is given.
    observability::init_with_config(cli.observability_config())?;

    info!(version = env!("CARGO_PKG_VERSION"), "Buffered CLI starting");

    let result = match &cli.command {
        Commands::Run(args) => run_workload(args).await,
        Commands::Validate(args) => run_validate(args),
        Commands::Info(args) => run_info(args),
    };

    result.inspect_err(|e| error!(error = %e, "Command failed"))
}
