//! Deployment monitor - Entry Point

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

use deploywatch::app::options::AppOptions;
use deploywatch::app::run::run;
use deploywatch::logs::{init_logging, LogOptions};
use deploywatch::settings::Settings;
use deploywatch::utils::version_info;

use tracing::{error, info};

const DEFAULT_SETTINGS_FILE: &str = "settings.json";

#[tokio::main]
async fn main() {
    // Parse command line arguments
    let mut cli_args: HashMap<String, String> = HashMap::new();
    for arg in env::args().skip(1) {
        if let Some((key, value)) = arg.split_once('=') {
            // Handle --key=value format
            let clean_key = key.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), value.to_string());
        } else if arg.starts_with("--") {
            // Handle standalone flags like --version
            let clean_key = arg.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), "true".to_string());
        }
    }

    // Print version and exit
    let version = version_info();
    if cli_args.contains_key("version") {
        match serde_json::to_string_pretty(&version) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Failed to render version info: {e}"),
        }
        return;
    }

    // Retrieve the settings file
    let settings_file = cli_args
        .get("config")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_FILE));
    let settings = if settings_file.exists() {
        match Settings::load(&settings_file).await {
            Ok(settings) => settings,
            Err(e) => {
                eprintln!("Unable to read settings file {}: {e}", settings_file.display());
                return;
            }
        }
    } else {
        Settings::default()
    };

    // Initialize logging
    if let Err(e) = init_logging(LogOptions::from_settings(&settings)) {
        println!("Failed to initialize logging: {e}");
    }
    if !settings_file.exists() {
        info!(
            "No settings file at {}, using defaults",
            settings_file.display()
        );
    }

    // Run the service
    let options = AppOptions::from_settings(&settings);
    info!("Running deployment monitor with options: {:?}", options);
    let result = run(version.version, options, await_shutdown_signal()).await;
    if let Err(e) = result {
        error!("Failed to run the deployment monitor: {e}");
    }
}

async fn await_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let (mut sigterm, mut sigint) = match (
            signal(SignalKind::terminate()),
            signal(SignalKind::interrupt()),
        ) {
            (Ok(sigterm), Ok(sigint)) => (sigterm, sigint),
            _ => {
                error!("Failed to install signal handlers, falling back to Ctrl+C");
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };

        tokio::select! {
            _ = sigterm.recv() => {
                info!("SIGTERM received, shutting down...");
            }
            _ = sigint.recv() => {
                info!("SIGINT received, shutting down...");
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl+C received, shutting down...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {e}");
        }
        info!("Ctrl+C received, shutting down...");
    }
}
