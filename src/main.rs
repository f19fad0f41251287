use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use colored::Colorize;

use fleetlink::{
    app::{load_config, load_config_file, AppState, Config},
    cli::{handle_command, init, spawn_loading_indicator, Cli, Commands},
    gateway::GatewayError,
    notify::TerminalNotifier,
    utils::{init_logger, log_debug, log_error, FleetlinkError},
};

#[tokio::main]
async fn main() {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Set up logging if verbose
    if cli.verbose {
        init_logger();
    }

    if let Err(err) = run(cli).await {
        log_error("fleetlink", &err);
        // Gateway failures were already shown by the notifier
        if !already_notified(&err) {
            eprintln!("{} {:#}", "Error:".red().bold(), err);
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    if matches!(cli.command, Commands::Init) {
        return init();
    }

    // Load configuration
    let mut config = if let Some(config_path) = &cli.config {
        load_config_file(config_path)?
    } else {
        load_config().unwrap_or_else(|e| {
            log_debug(format!("Using default configuration: {:#}", e));
            Config::default()
        })
    };
    if let Some(path) = cli.documents.clone() {
        config.documents.path = Some(path);
    }
    log_debug(format!("Configuration: {:?}", config));

    let app = AppState::new(config, Arc::new(TerminalNotifier)).await?;

    let indicator = if cli.no_indicator {
        None
    } else {
        Some(spawn_loading_indicator(app.session.subscribe_loading()))
    };

    let result = handle_command(&cli.command, &app, cli.output_format).await;

    if let Some(indicator) = indicator {
        indicator.abort();
    }
    result
}

fn already_notified(err: &anyhow::Error) -> bool {
    err.downcast_ref::<GatewayError>().is_some()
        || matches!(
            err.downcast_ref::<FleetlinkError>(),
            Some(FleetlinkError::Gateway(_))
        )
}
