//! Database operations and connection management

use anyhow::{Context, Result};
use chrono::Utc;
use config::AppEnvConfig;
use sqlx::{
    postgres::{PgConnectOptions, PgPool, PgPoolOptions},
    Row,
};
use std::time::Duration;
use tracing::info;

/// A versioned schema change, applied at most once
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub version: i64,
    pub description: &'static str,
    pub sql: &'static str,
}

/// Schema history, in application order
pub const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    description: "create app_settings",
    sql: r#"
        CREATE TABLE IF NOT EXISTS app_settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
    "#,
}];

/// Database connection manager
#[derive(Debug, Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Connect a pooled Postgres client using the bound configuration
    pub async fn new(config: &AppEnvConfig) -> Result<Self> {
        let pool = pool_options(config)?
            .connect_with(connect_options(config)?)
            .await
            .context("Failed to connect to database")?;

        info!(
            host = %config.database_hostname(),
            database = %config.database_dbname(),
            "Database connected"
        );
        Ok(Self { pool })
    }

    /// Pool that only connects on first use, for tests that never reach a server
    #[cfg(test)]
    pub fn new_lazy(config: &AppEnvConfig) -> Result<Self> {
        let pool = pool_options(config)?
            .acquire_timeout(Duration::from_millis(200))
            .connect_lazy_with(connect_options(config)?);
        Ok(Self { pool })
    }

    /// Apply pending migrations.
    ///
    /// Returns `true` when the database had no migrations applied before this
    /// call, i.e. it was freshly created and should be seeded.
    pub async fn migrate(&self) -> Result<bool> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version BIGINT PRIMARY KEY,
                description TEXT NOT NULL,
                applied_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create schema_migrations table")?;

        let applied: Vec<i64> = sqlx::query("SELECT version FROM schema_migrations")
            .fetch_all(&self.pool)
            .await
            .context("Failed to read applied migrations")?
            .iter()
            .map(|row| row.try_get::<i64, _>("version"))
            .collect::<Result<_, _>>()
            .context("Failed to decode applied migrations")?;

        let fresh = applied.is_empty();

        for migration in pending(MIGRATIONS, &applied) {
            let mut tx = self
                .pool
                .begin()
                .await
                .context("Failed to start migration transaction")?;

            sqlx::query(migration.sql)
                .execute(&mut *tx)
                .await
                .with_context(|| format!("Failed to apply migration {}", migration.version))?;

            sqlx::query("INSERT INTO schema_migrations (version, description) VALUES ($1, $2)")
                .bind(migration.version)
                .bind(migration.description)
                .execute(&mut *tx)
                .await
                .with_context(|| format!("Failed to record migration {}", migration.version))?;

            tx.commit()
                .await
                .with_context(|| format!("Failed to commit migration {}", migration.version))?;

            info!(
                version = migration.version,
                description = migration.description,
                "Applied migration"
            );
        }

        Ok(fresh && !MIGRATIONS.is_empty())
    }

    /// Populate a newly created database
    pub async fn seed(&self) -> Result<()> {
        info!("Database newly created. Processing seed data");

        sqlx::query(
            "INSERT INTO app_settings (key, value) VALUES ($1, $2) ON CONFLICT (key) DO NOTHING",
        )
        .bind("seeded_at")
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to seed app_settings")?;

        Ok(())
    }

    /// Perform a health check on the database
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .context("Database health check failed")?;
        Ok(())
    }

    /// Close the database connection
    pub async fn close(&self) -> Result<()> {
        self.pool.close().await;
        Ok(())
    }

    #[cfg(test)]
    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }
}

/// Connection settings for the configured server
pub fn connect_options(config: &AppEnvConfig) -> Result<PgConnectOptions> {
    let port = u16::try_from(*config.database_port()).with_context(|| {
        format!(
            "DATABASE_PORT {} is not a valid TCP port",
            config.database_port()
        )
    })?;

    Ok(PgConnectOptions::new()
        .host(config.database_hostname())
        .port(port)
        .database(config.database_dbname())
        .username(config.database_username())
        .password(config.database_password())
        .application_name(env!("CARGO_PKG_NAME")))
}

fn pool_options(config: &AppEnvConfig) -> Result<PgPoolOptions> {
    let max_connections = u32::try_from(*config.database_max_connections())
        .ok()
        .filter(|max| *max > 0)
        .context("DATABASE_MAX_CONNECTIONS must be a positive integer")?;

    Ok(PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(30)))
}

fn pending<'a>(
    migrations: &'a [Migration],
    applied: &'a [i64],
) -> impl Iterator<Item = &'a Migration> + 'a {
    migrations
        .iter()
        .filter(move |migration| !applied.contains(&migration.version))
}
