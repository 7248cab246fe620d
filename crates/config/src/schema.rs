//! Application configuration shape

use crate::descriptor::{integer, list, string};
use std::fmt;

crate::env_config! {
    /// Settings bound from the environment once at startup and shared
    /// read-only by the web and database layers.
    #[derive(Clone)]
    pub struct AppEnvConfig {
        /// Addresses the web listener binds, one listener per entry
        web_listen_addresses: Vec<String> = list("WEB_LISTEN_ADDRESSES").with_default("0.0.0.0"),
        /// Public host name, if the deployment has one
        web_hostname: Option<String> = string("WEB_HOSTNAME").optional(),
        web_http_port: i64 = integer("WEB_HTTP_PORT").with_default("80"),

        database_hostname: String = string("DATABASE_HOSTNAME"),
        database_port: i64 = integer("DATABASE_PORT").with_default("5432"),
        database_dbname: String = string("DATABASE_DBNAME"),
        database_username: String = string("DATABASE_USERNAME"),
        database_password: String = string("DATABASE_PASSWORD"),
        /// Upper bound of the connection pool
        database_max_connections: i64 = integer("DATABASE_MAX_CONNECTIONS").with_default("50"),
    }
}

crate::env_config! {
    /// Logging settings. Every field has a default so this binds even when
    /// [`AppEnvConfig`] does not, letting binding failures be logged.
    #[derive(Debug, Clone)]
    pub struct LoggingConfig {
        /// Tracing filter directive, e.g. `info` or `web=debug,sqlx=warn`
        level: String = string("RUST_LOG").with_default("info"),
        /// `json` or `pretty`
        format: String = string("LOG_FORMAT").with_default("json"),
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "json".to_string(),
        }
    }
}

impl fmt::Debug for AppEnvConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppEnvConfig")
            .field("web_listen_addresses", &self.web_listen_addresses)
            .field("web_hostname", &self.web_hostname)
            .field("web_http_port", &self.web_http_port)
            .field("database_hostname", &self.database_hostname)
            .field("database_port", &self.database_port)
            .field("database_dbname", &self.database_dbname)
            .field("database_username", &self.database_username)
            .field("database_password", &"<redacted>")
            .field("database_max_connections", &self.database_max_connections)
            .finish()
    }
}
