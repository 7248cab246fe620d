//! HTTP API server implementation

use crate::api::routes;
use crate::app::AppState;
use crate::daemon::{Daemon, DaemonContext};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use axum::Router;
use config::AppEnvConfig;
use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
    time::Duration,
};
use tokio::{net::TcpListener, task::JoinSet};
use tower_http::{
    cors::CorsLayer,
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, Level};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Serves the HTTP API on every configured listen address
pub struct WebDaemon {
    app: Router,
    addrs: Vec<SocketAddr>,
}

impl WebDaemon {
    /// Create the web daemon for already validated listen addresses
    pub fn new(state: Arc<AppState>, addrs: Vec<SocketAddr>) -> Self {
        let app = Router::new()
            .merge(routes::create_routes())
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                    .on_response(DefaultOnResponse::new().level(Level::INFO)),
            )
            .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
            .layer(CorsLayer::permissive())
            .with_state(state);

        info!("Web daemon configured for {:?}", addrs);

        Self { app, addrs }
    }
}

#[async_trait]
impl Daemon for WebDaemon {
    fn name(&self) -> &'static str {
        "WebDaemon"
    }

    async fn entry_point(&self, ctx: DaemonContext) -> Result<()> {
        let mut listeners = Vec::with_capacity(self.addrs.len());
        for addr in &self.addrs {
            let listener = TcpListener::bind(addr)
                .await
                .with_context(|| format!("Failed to bind to {}", addr))?;
            info!("API server listening on {}", addr);
            listeners.push(listener);
        }

        let mut servers = JoinSet::new();
        for listener in listeners {
            let app = self.app.clone();
            let shutdown = ctx.shutdown.clone();
            servers.spawn(async move {
                axum::serve(listener, app)
                    .with_graceful_shutdown(async move { shutdown.cancelled().await })
                    .await
            });
        }

        info!("{} started", self.name());
        ctx.mark_running();

        while let Some(joined) = servers.join_next().await {
            joined
                .context("API server task failed")?
                .context("API server error")?;
        }

        Ok(())
    }
}

/// One socket address per configured listen address, all on the HTTP port
pub fn listen_addrs(config: &AppEnvConfig) -> Result<Vec<SocketAddr>> {
    let port = u16::try_from(*config.web_http_port()).with_context(|| {
        format!(
            "WEB_HTTP_PORT {} is not a valid TCP port",
            config.web_http_port()
        )
    })?;

    if config.web_listen_addresses().is_empty() {
        bail!("WEB_LISTEN_ADDRESSES does not contain any address");
    }

    config
        .web_listen_addresses()
        .iter()
        .map(|address| {
            let ip: IpAddr = address
                .parse()
                .with_context(|| format!("Invalid listen address {:?}", address))?;
            Ok(SocketAddr::new(ip, port))
        })
        .collect()
}
