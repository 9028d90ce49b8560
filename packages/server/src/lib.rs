#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for crime incident records.
//!
//! Serves CRUD endpoints over the incident store and the fixed question
//! catalog. The store is chosen at startup: `Postgres` (default) or an
//! in-memory store for local experiments.

mod handlers;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::error::InternalError;
use actix_web::{App, HttpResponse, HttpServer, middleware, web};
use crime_insights_analytics::QueryCatalog;
use crime_insights_database::{IncidentStore, MemoryStore, PgIncidentStore, db, run_migrations};
use crime_insights_server_models::ApiError;

/// Largest accepted JSON request body.
const JSON_LIMIT: usize = 2 * 1024 * 1024;

/// Errors raised while reading server configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An environment variable holds an unusable value.
    #[error("Invalid value for {name}: {value:?}")]
    Invalid {
        /// Variable name.
        name: &'static str,
        /// The rejected value.
        value: String,
    },
}

/// Which incident store backs the server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StoreBackend {
    /// `Postgres` via `DATABASE_URL`.
    #[default]
    Postgres,
    /// Process memory; contents are lost on exit.
    Memory,
}

impl std::str::FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "pg" => Ok(Self::Postgres),
            "memory" | "mem" => Ok(Self::Memory),
            _ => Err(ConfigError::Invalid {
                name: "CRIME_INSIGHTS_STORE",
                value: s.to_string(),
            }),
        }
    }
}

/// Server settings, read from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address to bind.
    pub bind_addr: String,
    /// Port to bind.
    pub port: u16,
    /// Store backend.
    pub store: StoreBackend,
    /// `Postgres` connection URL.
    pub database_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1".to_string(),
            port: 3000,
            store: StoreBackend::Postgres,
            database_url: db::DEFAULT_DATABASE_URL.to_string(),
        }
    }
}

impl ServerConfig {
    /// Reads `BIND_ADDR`, `PORT`, `CRIME_INSIGHTS_STORE` and `DATABASE_URL`.
    /// Unset variables take their defaults.
    ///
    /// # Errors
    ///
    /// * If `PORT` is not a valid port number
    /// * If `CRIME_INSIGHTS_STORE` names an unknown backend
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`Self::from_env`], reading variables through `lookup`.
    ///
    /// # Errors
    ///
    /// * If `PORT` is not a valid port number
    /// * If `CRIME_INSIGHTS_STORE` names an unknown backend
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let port = match lookup("PORT") {
            Some(value) => value
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid { name: "PORT", value })?,
            None => defaults.port,
        };

        let store = match lookup("CRIME_INSIGHTS_STORE") {
            Some(value) => value.parse()?,
            None => defaults.store,
        };

        Ok(Self {
            bind_addr: lookup("BIND_ADDR").unwrap_or(defaults.bind_addr),
            port,
            store,
            database_url: lookup("DATABASE_URL").unwrap_or(defaults.database_url),
        })
    }
}

/// Shared application state.
pub struct AppState {
    /// Incident store for CRUD requests.
    pub store: Arc<dyn IncidentStore>,
    /// Question catalog over the same store.
    pub catalog: QueryCatalog,
}

impl AppState {
    /// Builds state around `store`.
    #[must_use]
    pub fn new(store: Arc<dyn IncidentStore>) -> Self {
        Self {
            catalog: QueryCatalog::new(Arc::clone(&store)),
            store,
        }
    }
}

/// Registers every route and the JSON error handlers.
///
/// Callers attach [`AppState`] with `App::app_data`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .limit(JSON_LIMIT)
            .error_handler(|err, _req| {
                let response = HttpResponse::BadRequest().json(ApiError::rejected(err.to_string()));
                InternalError::from_response(err, response).into()
            }),
    )
    .app_data(web::PathConfig::default().error_handler(|err, _req| {
        let response = HttpResponse::BadRequest().json(ApiError::rejected(err.to_string()));
        InternalError::from_response(err, response).into()
    }))
    .app_data(web::QueryConfig::default().error_handler(|err, _req| {
        let response = HttpResponse::BadRequest().json(ApiError::rejected(err.to_string()));
        InternalError::from_response(err, response).into()
    }))
    .route("/", web::get().to(handlers::root))
    .service(
        web::scope("/api")
            .route("/health", web::get().to(handlers::health))
            .route("/crimes", web::post().to(handlers::create_crime))
            .route("/crimes", web::get().to(handlers::list_crimes))
            .route("/crimes/{id}", web::get().to(handlers::get_crime))
            .route("/crimes/{id}", web::put().to(handlers::update_crime))
            .route("/crimes/{id}", web::delete().to(handlers::delete_crime))
            .route("/questions", web::get().to(handlers::questions))
            .route("/questions/{slug}", web::get().to(handlers::question)),
    );
}

async fn open_store(config: &ServerConfig) -> std::io::Result<Arc<dyn IncidentStore>> {
    match config.store {
        StoreBackend::Memory => {
            log::warn!("Using in-memory store; incidents are lost on exit");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreBackend::Postgres => {
            log::info!("Connecting to database...");
            let db_conn = db::connect(&config.database_url)
                .await
                .map_err(|e| std::io::Error::other(format!("Failed to connect: {e}")))?;

            log::info!("Running migrations...");
            run_migrations(db_conn.as_ref())
                .await
                .map_err(|e| std::io::Error::other(format!("Failed to migrate: {e}")))?;

            Ok(Arc::new(PgIncidentStore::new(Arc::from(db_conn))))
        }
    }
}

/// Starts the API server and runs until it is stopped.
///
/// The caller provides the async runtime (e.g. via `#[actix_web::main]`)
/// and initializes logging.
///
/// # Errors
///
/// * If the store cannot be opened or migrated
/// * If the HTTP server fails to bind or encounters a runtime error
#[allow(clippy::future_not_send)]
pub async fn run_server(config: ServerConfig) -> std::io::Result<()> {
    let store = open_store(&config).await?;
    let state = web::Data::new(AppState::new(store));

    log::info!("Starting server on {}:{}", config.bind_addr, config.port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((config.bind_addr, config.port))?
    .run()
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: BTreeMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        assert_eq!(
            ServerConfig::from_lookup(lookup(&[])).unwrap(),
            ServerConfig::default()
        );
    }

    #[test]
    fn reads_overrides() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("PORT", "8081"),
            ("BIND_ADDR", "0.0.0.0"),
            ("CRIME_INSIGHTS_STORE", "Memory"),
            ("DATABASE_URL", "postgres://db/crimes"),
        ]))
        .unwrap();

        assert_eq!(config.port, 8081);
        assert_eq!(config.bind_addr, "0.0.0.0");
        assert_eq!(config.store, StoreBackend::Memory);
        assert_eq!(config.database_url, "postgres://db/crimes");
    }

    #[test]
    fn rejects_bad_values() {
        assert!(ServerConfig::from_lookup(lookup(&[("PORT", "http")])).is_err());
        assert!(ServerConfig::from_lookup(lookup(&[("CRIME_INSIGHTS_STORE", "mongo")])).is_err());
    }
}
