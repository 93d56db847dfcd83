use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use event_board::{
    cache::CacheService,
    clock::SystemClock,
    config::{Config, LogFormat, StorageBackend},
    error::set_debug_errors,
    redis_client::RedisClient,
    repository::{EventRepository, MemoryStore, PgStore, RequestRepository, UserRepository},
    services::{identity::HttpIdentityProvider, images::HttpImageStore},
    AppState,
};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

type Stores = (
    Arc<dyn EventRepository>,
    Arc<dyn RequestRepository>,
    Arc<dyn UserRepository>,
);

// Одно хранилище за тремя трейтами
fn shared<S>(store: Arc<S>) -> Stores
where
    S: EventRepository + RequestRepository + UserRepository + 'static,
{
    let events: Arc<dyn EventRepository> = store.clone();
    let requests: Arc<dyn RequestRepository> = store.clone();
    let users: Arc<dyn UserRepository> = store;
    (events, requests, users)
}

async fn connect_storage(config: &Config) -> anyhow::Result<Stores> {
    match config.database.backend {
        StorageBackend::Postgres => {
            let url = config
                .database
                .url
                .as_deref()
                .context("DATABASE_URL is required for the postgres backend")?;
            let store = PgStore::connect(url, config.database.pool_size)
                .await
                .context("Failed to connect to database")?;
            info!("Database connected");

            store
                .run_migrations()
                .await
                .context("Failed to run migrations")?;

            Ok(shared(Arc::new(store)))
        }
        StorageBackend::Memory => {
            warn!("Using in-memory storage: data is lost on restart");
            Ok(shared(Arc::new(MemoryStore::new())))
        }
    }
}

async fn connect_cache(config: &Config) -> CacheService {
    let Some(url) = config.redis.url.as_deref() else {
        info!("REDIS_URL not set, search cache disabled");
        return CacheService::disabled();
    };
    match RedisClient::new(url).await {
        Ok(redis) => {
            info!("Redis connected");
            CacheService::new(redis, config.redis.search_ttl_seconds)
        }
        Err(e) => {
            warn!("Redis unavailable, search cache disabled: {:?}", e);
            CacheService::disabled()
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env().context("Invalid configuration")?;

    let registry = tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.app.rust_log));
    match config.app.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }

    info!("Starting Event Board API ({})", config.app.environment);
    set_debug_errors(config.app.debug_errors);

    let (events, requests, users) = connect_storage(&config).await?;
    let cache = connect_cache(&config).await;
    info!("Search cache: {}", if cache.is_enabled() { "redis" } else { "off" });
    let identity = HttpIdentityProvider::new(&config.identity).context("Failed to build identity client")?;
    let images = HttpImageStore::new(&config.images).context("Failed to build image upload client")?;

    // Create the shared application state
    let app_state = Arc::new(AppState {
        config: config.clone(),
        events,
        requests,
        users,
        cache,
        identity: Arc::new(identity),
        images: Arc::new(images),
        clock: Arc::new(SystemClock),
    });

    let app = event_board::router(app_state);

    let host: std::net::IpAddr = config
        .app
        .host
        .parse()
        .with_context(|| format!("Invalid HOST '{}'", config.app.host))?;
    let addr = SocketAddr::from((host, config.app.port));
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}
