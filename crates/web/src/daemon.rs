//! Long running background services

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// A service hosted for the lifetime of the application
#[async_trait]
pub trait Daemon: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    /// Run until `ctx.shutdown` is cancelled or the service fails
    async fn entry_point(&self, ctx: DaemonContext) -> Result<()>;
}

/// Handed to a daemon when it starts
#[derive(Debug, Clone)]
pub struct DaemonContext {
    pub shutdown: CancellationToken,
    running: Arc<AtomicBool>,
}

impl DaemonContext {
    /// Report that start up finished and the daemon is serving
    pub fn mark_running(&self) {
        self.running.store(true, Ordering::SeqCst);
    }
}

/// A spawned daemon
#[derive(Debug)]
pub struct DaemonHandle {
    name: &'static str,
    running: Arc<AtomicBool>,
    crashed: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl DaemonHandle {
    /// Spawn `daemon` on the runtime.
    ///
    /// A daemon that returns an error is logged and cancels `shutdown`, which
    /// brings the rest of the application down with it.
    pub fn spawn<D: Daemon>(daemon: D, shutdown: CancellationToken) -> Self {
        let name = daemon.name();
        let running = Arc::new(AtomicBool::new(false));
        let crashed = Arc::new(AtomicBool::new(false));

        let ctx = DaemonContext {
            shutdown: shutdown.clone(),
            running: running.clone(),
        };
        let task_running = running.clone();
        let task_crashed = crashed.clone();

        let task = tokio::spawn(async move {
            match daemon.entry_point(ctx).await {
                Ok(()) => info!(daemon = name, "Daemon stopped"),
                Err(e) => {
                    task_crashed.store(true, Ordering::SeqCst);
                    error!(daemon = name, "{} has crashed: {:#}", name, e);
                    shutdown.cancel();
                }
            }
            task_running.store(false, Ordering::SeqCst);
        });

        Self {
            name,
            running,
            crashed,
            task,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn has_crashed(&self) -> bool {
        self.crashed.load(Ordering::SeqCst)
    }

    /// Wait for the daemon task to finish
    pub async fn join(self) -> Result<()> {
        self.task
            .await
            .with_context(|| format!("Daemon {} task panicked", self.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    struct Idle;

    #[async_trait]
    impl Daemon for Idle {
        fn name(&self) -> &'static str {
            "Idle"
        }

        async fn entry_point(&self, ctx: DaemonContext) -> Result<()> {
            ctx.mark_running();
            ctx.shutdown.cancelled().await;
            Ok(())
        }
    }

    struct Failing;

    #[async_trait]
    impl Daemon for Failing {
        fn name(&self) -> &'static str {
            "Failing"
        }

        async fn entry_point(&self, _ctx: DaemonContext) -> Result<()> {
            Err(anyhow!("listener could not bind"))
        }
    }

    #[tokio::test]
    async fn test_daemon_runs_until_shutdown() {
        let shutdown = CancellationToken::new();
        let handle = DaemonHandle::spawn(Idle, shutdown.clone());

        for _ in 0..100 {
            if handle.is_running() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(handle.is_running());
        assert_eq!(handle.name(), "Idle");

        shutdown.cancel();
        let running = handle.running.clone();
        handle.join().await.unwrap();
        assert!(!running.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_crashed_daemon_cancels_shutdown_token() {
        let shutdown = CancellationToken::new();
        let handle = DaemonHandle::spawn(Failing, shutdown.clone());

        shutdown.cancelled().await;
        let crashed = handle.crashed.clone();
        handle.join().await.unwrap();

        assert!(crashed.load(Ordering::SeqCst));
        assert!(shutdown.is_cancelled());
    }
}
