//! Synth API Server
//!
//! 合成 API 服务的命令行入口点。

use clap::Parser;
use synth_api::cli::{Cli, CommandRunner, Commands};
use synth_shared::config::AppConfig;
use synth_shared::observability;

const SERVICE_NAME: &str = "synth-api";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config_dir {
        Some(dir) => AppConfig::load_from(SERVICE_NAME, dir)?,
        None => AppConfig::load(SERVICE_NAME)?,
    };
    if let Some(level) = &cli.log_level {
        config.observability.log_level = level.clone();
    }
    // 指标只对常驻服务有意义
    if !matches!(cli.command, Commands::Serve { .. }) {
        config.observability.metrics_enabled = false;
    }

    let guard = observability::init(SERVICE_NAME, &config.observability)?;
    let runner = CommandRunner::new(config);

    match cli.command {
        Commands::Serve {
            port,
            scenarios_dir,
        } => {
            runner
                .run_serve(port, scenarios_dir, guard.metrics_handle())
                .await?;
        }
        Commands::Verify { path } => {
            runner.run_verify(&path)?;
        }
        Commands::List { scenarios_dir } => {
            runner.run_list(scenarios_dir)?;
        }
    }

    Ok(())
}
