use std::net::SocketAddr;
use std::sync::Arc;

use chrono::Duration;
use dotenvy::dotenv;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use venuebook_server::auth::TokenService;
use venuebook_server::config::Config;
use venuebook_server::images::DiskImageStore;
use venuebook_server::routes::create_routes;
use venuebook_server::state::AppState;
use venuebook_server::store::{MemoryStore, PgStore, Store};

#[tokio::main]
async fn main() {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("venuebook_server=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env().expect("Invalid configuration");

    let store: Arc<dyn Store> = match &config.database_url {
        Some(database_url) => {
            let store = PgStore::connect(database_url, config.database_max_connections)
                .await
                .expect("Failed to connect to database");
            tracing::info!("Successfully connected to database");

            store.migrate().await.expect("Failed to run migrations");
            tracing::info!("Migrations run successfully");
            Arc::new(store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory store; data is lost on exit");
            Arc::new(MemoryStore::new())
        }
    };

    let images = Arc::new(DiskImageStore::new(&config.upload_dir));
    tracing::info!(dir = %images.root().display(), "Storing venue images on disk");

    let tokens = TokenService::new(&config.jwt_secret, Duration::days(config.token_ttl_days));
    let state = AppState::new(store, images, tokens, config.bcrypt_cost);
    let app = create_routes(state, &config);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("🚀 Server running at http://{}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .expect("Failed to bind address");

    axum::serve(listener, app).await.expect("Server failed");
}
