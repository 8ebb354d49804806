use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use hotmatch_engine::config::{LoggingSettings, Settings};
use hotmatch_engine::routes::{self, handle_json_payload_error, handle_query_payload_error, AppState};
use hotmatch_engine::services::{
    CacheManager, CachedEntityStore, ChatCompletionClient, Collaborators, EntityStore,
    HttpEntityStore, InMemoryEntityStore, MatchService, MemoryStore, PostgresStore, TokenVerifier,
};
use std::io;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// `LOG_LEVEL` / `LOG_FORMAT` win over the logging section
fn init_tracing(logging: &LoggingSettings) {
    let level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| logging.level.clone());
    let format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| logging.format.clone());

    let filter = EnvFilter::try_new(&level).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.compact().init();
    }
}

fn startup_error(context: &str, err: impl std::fmt::Display) -> io::Error {
    error!("{}: {}", context, err);
    io::Error::other(format!("{}: {}", context, err))
}

async fn build_state(settings: &Settings) -> io::Result<AppState> {
    // Cache (Redis optional; the in-process tier always exists)
    let cache_ttl = settings.cache.ttl_secs.unwrap_or(300);
    let l1_cache_size = settings.cache.l1_cache_size.unwrap_or(10_000);

    let cache = match settings.cache.redis_url.as_deref() {
        Some(url) => match CacheManager::new(Some(url), l1_cache_size, cache_ttl).await {
            Ok(c) => c,
            Err(e) => {
                warn!("Redis unavailable ({}), running with the in-process cache only", e);
                CacheManager::local(l1_cache_size, cache_ttl)
            }
        },
        None => CacheManager::local(l1_cache_size, cache_ttl),
    };
    let cache = Arc::new(cache);
    info!("Cache initialized (L1: {} entries, TTL: {}s, L2: {})", l1_cache_size, cache_ttl, cache.has_l2());

    // Entity store
    let roster: Arc<dyn EntityStore> = if settings.entity_store.endpoint.is_empty() {
        warn!("No entity store endpoint configured, serving an empty in-process roster");
        Arc::new(InMemoryEntityStore::default())
    } else {
        let client = HttpEntityStore::new(&settings.entity_store)
            .map_err(|e| startup_error("Failed to build entity store client", e))?;
        info!("Entity store client initialized ({})", settings.entity_store.endpoint);
        Arc::new(client)
    };
    let entities: Arc<dyn EntityStore> = Arc::new(CachedEntityStore::new(roster, cache.clone()));

    // Text generation for deal memos
    let text = Arc::new(
        ChatCompletionClient::new(&settings.text_generation)
            .map_err(|e| startup_error("Failed to build text generation client", e))?,
    );
    if settings.text_generation.api_key.is_empty() {
        warn!("Text generation API key not set, memo requests will fail");
    }

    // Match store
    let (collaborators, postgres) = if settings.database.is_memory() {
        warn!("Using the in-process match store, data is lost on restart");
        let store = Arc::new(MemoryStore::new());
        (Collaborators::with_store(entities, store, text), None)
    } else {
        let store = Arc::new(
            PostgresStore::connect(&settings.database)
                .await
                .map_err(|e| startup_error("Failed to connect to PostgreSQL", e))?,
        );
        info!(
            "PostgreSQL store initialized (max: {} connections)",
            settings.database.max_connections.unwrap_or(10)
        );
        (Collaborators::with_store(entities, store.clone(), text), Some(store))
    };

    if settings.auth.jwt_secret.is_empty() {
        warn!("JWT secret not set, every bearer token will be rejected");
    }
    let verifier = Arc::new(TokenVerifier::new(&settings.auth.jwt_secret));

    let service = Arc::new(MatchService::new(collaborators, settings));
    info!("Match service initialized with weights: {:?}", settings.scoring.weights());

    Ok(AppState {
        service,
        verifier,
        cache,
        postgres,
    })
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    let loaded = Settings::load();
    let logging = loaded.as_ref().map(|s| s.logging.clone()).unwrap_or_default();
    init_tracing(&logging);

    info!("Starting hotmatch engine...");

    let settings = loaded.map_err(|e| startup_error("Failed to load configuration", e))?;
    info!("Configuration loaded successfully");

    let app_state = build_state(&settings).await?;

    // Configure HTTP server
    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .app_data(web::QueryConfig::default().error_handler(handle_query_payload_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
