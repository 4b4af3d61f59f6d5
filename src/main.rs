use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use social_auth::auth::{RefreshSessionManager, SessionStore, TokenSigner};
use social_auth::configuration::get_configuration;
use social_auth::startup::run;
use social_auth::store::{KeyValueStore, MemoryStore, RedisStore};
use social_auth::telemetry::init_telemetry;

const PURGE_INTERVAL: Duration = Duration::from_secs(60);

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

    let keys = configuration.jwt.keypair().map_err(|e| {
        tracing::error!("Failed to initialize JWT keys: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "JWT key error")
    })?;
    let signer = TokenSigner::new(keys, configuration.jwt.issuer.clone());

    let store: Arc<dyn KeyValueStore> = match configuration.store.redis_url() {
        Some(url) => {
            let store = RedisStore::connect(url).await.map_err(|e| {
                tracing::error!("Failed to connect to Redis: {}", e);
                std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "Session store error")
            })?;
            store.ping().await.map_err(|e| {
                tracing::error!("Redis ping failed: {}", e);
                std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "Session store error")
            })?;
            tracing::info!("Successfully connected to Redis");
            Arc::new(store)
        }
        None => {
            tracing::warn!("No store.redis_url configured; sessions are kept in process");
            let store = MemoryStore::new();
            let sweeper = store.clone();
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(PURGE_INTERVAL);
                loop {
                    interval.tick().await;
                    let purged = sweeper.purge_expired();
                    if purged > 0 {
                        tracing::debug!(purged, "Purged expired sessions");
                    }
                }
            });
            Arc::new(store)
        }
    };
    let sessions = RefreshSessionManager::new(SessionStore::new(store));

    let address = configuration.application.address();
    let listener = TcpListener::bind(&address)?;
    tracing::info!("Server listening on: {}", address);

    let server = run(listener, signer, sessions, configuration.cors.policy())?;
    server.await?;

    tracing::info!("Server exiting");
    Ok(())
}
