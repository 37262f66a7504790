use sqlx::postgres::PgPoolOptions;
use std::net::TcpListener;
use std::sync::Arc;

use chirpy::auth::SessionService;
use chirpy::clock::SystemClock;
use chirpy::configuration::get_configuration;
use chirpy::startup::run;
use chirpy::store::{PgCredentialStore, PgRefreshTokenRepository};
use chirpy::telemetry::init_telemetry;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    init_telemetry("info");

    tracing::info!("Starting application");

    let configuration = get_configuration().map_err(|e| {
        tracing::error!("Failed to read configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "Configuration error")
    })?;

    tracing::info!("Attempting to connect to database");
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&configuration.database.connection_string())
        .await
        .map_err(|e| {
            tracing::error!("Failed to create connection pool: {}", e);
            std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "Database connection error")
        })?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to run migrations: {}", e);
            std::io::Error::new(std::io::ErrorKind::Other, "Migration error")
        })?;

    let sessions = SessionService::from_settings(
        &configuration.auth,
        Arc::new(PgCredentialStore::new(pool.clone())),
        Arc::new(PgRefreshTokenRepository::new(pool)),
        Arc::new(SystemClock),
    )
    .map_err(|e| {
        tracing::error!("Invalid auth settings: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "Configuration error")
    })?;

    let address = format!(
        "{}:{}",
        configuration.application.host, configuration.application.port
    );
    let listener = TcpListener::bind(&address)?;
    tracing::info!(
        address = %address,
        platform = %configuration.application.platform,
        "Server listening"
    );

    run(listener, sessions, configuration.application)?.await
}
