//! Web Starter - Main Application Entry Point

use anyhow::{Context, Result};
use clap::Parser;
use config::{render_example, AppEnvConfig, ConfigError, EnvConfig, EnvStore, LoggingConfig};
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod app;
mod daemon;
mod database;

use app::Application;

/// Command line options
#[derive(Debug, Parser)]
#[command(name = "web-starter", version, about = "Web application starter")]
struct Cli {
    /// Dotenv file merged into the environment before configuration is bound.
    /// Variables already set in the environment take precedence.
    #[arg(long = "env", value_name = "PATH")]
    env_file: Option<PathBuf>,

    /// Print an example env file listing every supported variable and exit
    #[arg(long)]
    example_env: bool,

    /// Unrecognised arguments are accepted and ignored
    #[arg(hide = true, trailing_var_arg = true, allow_hyphen_values = true)]
    passthrough: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.example_env {
        let example =
            render_example::<AppEnvConfig>().context("Failed to render example env file")?;
        print!("{}", example);
        return Ok(());
    }

    let mut env = EnvStore::from_process();
    let loaded = cli
        .env_file
        .as_deref()
        .map(|path| env.load_file(path).map(|added| (path, added)));

    // Logging settings may come from the env file, so bind them after merging
    let logging = LoggingConfig::bind(&env);
    init_logging(logging.as_ref().unwrap_or(&LoggingConfig::default()))?;
    if let Err(e) = &logging {
        warn!("Falling back to default logging settings: {}", e);
    }

    info!("Starting Web Starter v{}", env!("CARGO_PKG_VERSION"));
    if !cli.passthrough.is_empty() {
        info!(count = cli.passthrough.len(), "Ignoring extra command line arguments");
    }

    match loaded {
        Some(Ok((path, added))) => {
            info!(path = %path.display(), added, "Loaded environment variables from env file");
        }
        Some(Err(e)) => {
            error!("{}", e);
            return Err(e).context("Failed to load env file");
        }
        None => {}
    }

    let config = match AppEnvConfig::bind(&env) {
        Ok(config) => config,
        Err(e) => {
            report_config_error(&e);
            return Err(e).context("Failed to bind configuration");
        }
    };

    info!(
        listen_addresses = ?config.web_listen_addresses(),
        port = config.web_http_port(),
        database = %config.database_hostname(),
        "Configuration loaded"
    );

    // Create and start the application
    let mut app = Application::new(config)
        .await
        .context("Failed to create application")?;

    let shutdown_signal = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Shutdown signal received"),
            Err(e) => error!("Failed to listen for shutdown signal: {}", e),
        }
    };

    info!("Application starting...");
    let outcome = tokio::select! {
        result = app.run() => result,
        _ = shutdown_signal => {
            info!("Initiating graceful shutdown...");
            Ok(())
        }
    };

    if let Err(e) = &outcome {
        error!("Application error: {:#}", e);
    }

    app.shutdown().await?;
    info!("Web Starter shutdown complete");
    outcome
}

/// Log every problem found while binding, one line per offending variable
fn report_config_error(error: &ConfigError) {
    match error {
        ConfigError::Binding(aggregate) => {
            for failure in aggregate.errors() {
                error!(key = %failure.key, "{}", failure);
            }
        }
        ConfigError::Registry(e) => error!("Invalid configuration declaration: {}", e),
    }
}

/// Initialize logging from the bound logging settings
fn init_logging(settings: &LoggingConfig) -> Result<()> {
    let log_level = settings.level();
    let log_format = settings.format();

    let env_filter = tracing_subscriber::EnvFilter::try_new(log_level)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    match log_format.as_str() {
        "pretty" => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty())
                .try_init()
                .context("Failed to initialize pretty logging")?;
        }
        _ => {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .try_init()
                .context("Failed to initialize JSON logging")?;
        }
    }

    info!("Logging initialized");
    info!("Log level: {}", log_level);
    info!("Log format: {}", log_format);

    if log_level == "trace" || log_level == "debug" {
        warn!("Debug/trace logging enabled - may impact performance in production");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_env_option() {
        let cli = Cli::try_parse_from(["web-starter", "--env", "local.env"]).unwrap();
        assert_eq!(cli.env_file, Some(PathBuf::from("local.env")));
        assert!(!cli.example_env);
    }

    #[test]
    fn test_cli_accepts_unknown_trailing_arguments() {
        let cli = Cli::try_parse_from(["web-starter", "--env", "a.env", "serve", "--verbose"])
            .unwrap();
        assert_eq!(cli.env_file, Some(PathBuf::from("a.env")));
        assert_eq!(cli.passthrough, ["serve", "--verbose"]);
    }

    #[test]
    fn test_cli_without_arguments() {
        let cli = Cli::try_parse_from(["web-starter"]).unwrap();
        assert_eq!(cli.env_file, None);
        assert!(cli.passthrough.is_empty());
    }
}
