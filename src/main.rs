use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::filter::{EnvFilter, LevelFilter};

mod cli;
mod commands;
mod config;
mod credentials;
mod error;
mod media;
mod platform;

use cli::{Cli, Command};
use commands::Runtime;
use config::{Config, LogFormat};
use credentials::{process_env, TerminalPrompter};
use media::ConsoleReporter;
use platform::InstagramClient;

fn get_config_path(args: &Cli) -> Option<PathBuf> {
    if let Some(path) = &args.config {
        return Some(path.clone());
    }

    if let Ok(path) = std::env::var("INSTAGROOL_CONFIG") {
        return Some(PathBuf::from(path));
    }

    if let Ok(xdg_config_home) = std::env::var("XDG_CONFIG_HOME") {
        let config_path = PathBuf::from(xdg_config_home)
            .join("instagrool")
            .join("config.toml");
        if config_path.exists() {
            return Some(config_path);
        }
    }

    if let Some(home) = dirs::home_dir() {
        let config_path = home.join(".config").join("instagrool").join("config.toml");
        if config_path.exists() {
            return Some(config_path);
        }
    }

    None
}

fn init_logging(format: LogFormat) {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = match Cli::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let code = cli::parse_error_exit_code(&e);
            let _ = e.print();
            std::process::exit(code);
        }
    };

    let config_path = get_config_path(&args);
    let config = match &config_path {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::default(),
    };

    init_logging(config.get_logging_format());

    match &config_path {
        Some(path) => info!("Loaded config from: {}", path.display()),
        None => info!("No config file found, using defaults"),
    }

    let client = InstagramClient::new(&config.platform)?;
    let mut reporter = ConsoleReporter;
    let runtime = Runtime {
        client: &client,
        reporter: &mut reporter,
        prompter: &TerminalPrompter,
        env: &process_env,
        config: &config,
    };

    let summary = match &args.command {
        Command::Delete(delete) => commands::run_delete(delete, runtime).await?,
        Command::Backup(backup) => commands::run_backup(backup, runtime).await?,
    };

    info!("Done: {} item(s) processed", summary.succeeded);
    Ok(())
}
