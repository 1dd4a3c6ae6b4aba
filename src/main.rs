use std::net::TcpListener;
use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;

use membergate::configuration::get_configuration;
use membergate::documents::FsDocumentStore;
use membergate::lifecycle::AccountLifecycle;
use membergate::repository::postgres::{PgAccountRepository, PgNotificationSink};
use membergate::startup::run;
use membergate::telemetry::init_telemetry;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    init_telemetry();

    tracing::info!("Starting application");

    let configuration = match get_configuration() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to read configuration: {}", e);
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Configuration error",
            ));
        }
    };

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&configuration.database.connection_string())
        .await
        .map_err(|e| {
            tracing::error!("Failed to create connection pool: {}", e);
            std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "Database connection error",
            )
        })?;

    tracing::info!("Database connection pool created");

    // Composition root: every collaborator is constructed here and handed to
    // the components that need it.
    let accounts = Arc::new(PgAccountRepository::new(pool.clone()));
    let documents = Arc::new(FsDocumentStore::new(
        &configuration.application.documents_dir,
    ));
    let notifications = Arc::new(PgNotificationSink::new(pool));
    let lifecycle = AccountLifecycle::new(accounts, documents, notifications);

    let address = format!("127.0.0.1:{}", configuration.application.port);
    let listener = TcpListener::bind(&address)?;
    tracing::info!("Server listening on {}", address);

    run(listener, lifecycle, configuration)?.await
}
