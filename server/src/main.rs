mod config;
mod http;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use platform_obs::{ObsConfig, init_tracing};
use products_hr::EmployeeStore;
use tracing::info;

use crate::{
    config::AppConfig,
    http::{AppState, ServeConfig},
};

#[derive(Parser, Debug)]
#[command(name = "employee-api", version, about = "In-memory employee records over HTTP")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP server.
    Serve(ServeCommand),
    /// Print the effective configuration as JSON.
    #[command(name = "config:print")]
    ConfigPrint,
}

#[derive(Args, Debug)]
struct ServeCommand {
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: std::net::IpAddr,
    #[arg(long, env = "PORT", default_value_t = 8080)]
    port: u16,
    #[arg(long, help = "Load demo employees before accepting requests")]
    seed: bool,
}

impl From<&ServeCommand> for ServeConfig {
    fn from(value: &ServeCommand) -> Self {
        ServeConfig::new(value.host, value.port)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let _obs = init_tracing(ObsConfig::from_env("employee-api")?)?;
    let cli = Cli::parse();
    let app_config = Arc::new(AppConfig::load()?);
    match cli.command {
        Command::Serve(cmd) => run_server(cmd, app_config).await,
        Command::ConfigPrint => config_print(&app_config),
    }
}

fn config_print(config: &AppConfig) -> Result<()> {
    let rendered =
        serde_json::to_string_pretty(config).context("failed to render configuration")?;
    println!("{rendered}");
    Ok(())
}

async fn run_server(cmd: ServeCommand, config: Arc<AppConfig>) -> Result<()> {
    let store = Arc::new(EmployeeStore::new());
    if cmd.seed || config.seed_demo {
        let seeded = store.seed_demo();
        info!(count = seeded.len(), "demo employees loaded");
    }
    let state = AppState {
        store,
        config: config.clone(),
    };
    http::serve(ServeConfig::from(&cmd), state).await
}
