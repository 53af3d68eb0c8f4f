use library_catalog::auth::{PgTokenStore, TokenCodec};
use library_catalog::configuration::{get_configuration, DatabaseSettings};
use library_catalog::startup::run;
use library_catalog::telemetry::init_telemetry;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::net::TcpListener;
use std::sync::Arc;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    init_telemetry();

    tracing::info!("Starting application");

    let configuration = match get_configuration() {
        Ok(config) => {
            tracing::info!("Configuration loaded successfully");
            config
        }
        Err(e) => {
            tracing::error!("Failed to read configuration: {}", e);
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Configuration error",
            ));
        }
    };

    let codec = TokenCodec::new(&configuration.token).map_err(|e| {
        tracing::error!("Invalid token configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "Configuration error")
    })?;

    tracing::info!("Attempting to connect to database");

    let pool = connect_pool(&configuration.database, configuration.database.max_connections).await?;
    let token_pool =
        connect_pool(&configuration.database, configuration.database.token_max_connections).await?;

    tracing::info!("Database connection pools created successfully");

    // The token ledger gets its own pool: a lease holds its connection
    // while the catalog write runs on the other one
    let store = Arc::new(PgTokenStore::new(token_pool));

    let address = configuration.application.address();
    let listener = TcpListener::bind(&address)?;
    tracing::info!("Server listening on: {}", address);

    run(listener, pool, store, codec)?.await
}

async fn connect_pool(settings: &DatabaseSettings, max_connections: u32) -> std::io::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(&settings.connection_string())
        .await
        .map_err(|e| {
            tracing::error!("Failed to create connection pool: {}", e);
            std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "Database connection error",
            )
        })
}
