//! Main application structure and lifecycle management

use crate::{
    api::{server::listen_addrs, WebDaemon},
    daemon::{Daemon, DaemonHandle},
    database::Database,
};
use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use config::AppEnvConfig;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

const DAEMON_STOP_TIMEOUT: Duration = Duration::from_secs(10);

/// Main application state
#[derive(Debug)]
pub struct AppState {
    pub config: AppEnvConfig,
    pub database: Database,
    pub started_at: DateTime<Utc>,
}

/// Main application that coordinates all components
pub struct Application {
    state: Arc<AppState>,
    listen_addrs: Vec<SocketAddr>,
    shutdown: CancellationToken,
    daemons: Vec<DaemonHandle>,
}

impl Application {
    /// Validate listener settings, connect and prepare the database, then
    /// build shared state
    pub async fn new(config: AppEnvConfig) -> Result<Self> {
        info!("Initializing application components...");

        // Checked before the database so a bad address never migrates anything
        let listen_addrs =
            listen_addrs(&config).context("Invalid web listener configuration")?;

        let database = Database::new(&config)
            .await
            .context("Failed to initialize database")?;

        let fresh = database
            .migrate()
            .await
            .context("Failed to run database migrations")?;
        if fresh {
            database
                .seed()
                .await
                .context("Failed to seed database")?;
        }

        let state = Arc::new(AppState {
            config,
            database,
            started_at: Utc::now(),
        });

        info!("Application components initialized successfully");

        Ok(Self {
            state,
            listen_addrs,
            shutdown: CancellationToken::new(),
            daemons: Vec::new(),
        })
    }

    /// Start every daemon and wait until shutdown is requested or one crashes
    pub async fn run(&mut self) -> Result<()> {
        info!("Starting application services...");

        let web = WebDaemon::new(self.state.clone(), self.listen_addrs.clone());
        self.start(web);

        self.shutdown.cancelled().await;

        let crashed: Vec<_> = self
            .daemons
            .iter()
            .filter(|daemon| daemon.has_crashed())
            .map(|daemon| daemon.name())
            .collect();
        if !crashed.is_empty() {
            bail!("Daemon(s) crashed: {}", crashed.join(", "));
        }

        Ok(())
    }

    fn start<D: Daemon>(&mut self, daemon: D) {
        info!(daemon = daemon.name(), "Starting daemon");
        self.daemons
            .push(DaemonHandle::spawn(daemon, self.shutdown.clone()));
    }

    /// Shutdown the application gracefully.
    ///
    /// Every daemon is awaited and the database is closed even when a daemon
    /// task failed; the first failure is returned afterwards.
    pub async fn shutdown(&mut self) -> Result<()> {
        info!("Shutting down application...");
        self.shutdown.cancel();

        let stopped = stop_daemons(self.daemons.drain(..).collect()).await;
        info!("Daemons stopped");

        let closed = self
            .state
            .database
            .close()
            .await
            .context("Failed to close database");
        if closed.is_ok() {
            info!("Database connections closed");
        }

        info!("Application shutdown complete");
        stopped.and(closed)
    }
}

/// Join every daemon, logging failures, and report the first one
async fn stop_daemons(daemons: Vec<DaemonHandle>) -> Result<()> {
    let mut first_error = None;

    for daemon in daemons {
        let name = daemon.name();
        if daemon.is_running() {
            info!(daemon = name, "Waiting for daemon to stop");
        }
        match tokio::time::timeout(DAEMON_STOP_TIMEOUT, daemon.join()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                error!(daemon = name, "{:#}", e);
                first_error.get_or_insert(e);
            }
            Err(_) => warn!(daemon = name, "Daemon did not stop in time"),
        }
    }

    first_error.map_or(Ok(()), Err)
}
