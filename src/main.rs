use actix_cors::Cors;
use actix_web::{http::header, web, App, HttpServer};
use anyhow::Context;
use dotenv::dotenv;
use stable_auth::config::CorsConfig;
use stable_auth::{routes, AppState, PgUserStore, Settings};
use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

fn cors(config: &CorsConfig) -> Cors {
    if !config.enabled {
        // CORS disabled - use most restrictive settings
        return Cors::default();
    }

    let cors = if config.allow_any_origin {
        Cors::default().allow_any_origin()
    } else {
        config
            .allowed_origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
    };

    // Cookies are the primary token transport, so credentials must be allowed.
    cors.allowed_methods(vec!["GET", "POST"])
        .allowed_headers(vec![header::AUTHORIZATION, header::CONTENT_TYPE])
        .supports_credentials()
        .max_age(config.max_age as usize)
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .init();

    // Load configuration
    let config = Settings::new().context("failed to load configuration")?;
    info!(environment = %config.environment, "Configuration loaded successfully");

    let store = PgUserStore::connect(
        &config.database.url,
        config.database.max_connections,
        Duration::from_secs(config.database.acquire_timeout_secs),
    )
    .await
    .context("failed to connect to the user database")?;
    store.migrate().await.context("failed to apply migrations")?;

    // Initialize application state (validates the configuration)
    let state = AppState::new(config.clone(), Arc::new(store))
        .context("failed to initialize application state")?;
    let state = web::Data::new(state);

    // Periodically drop expired limiter windows
    let eviction_state = state.clone();
    let eviction_interval = Duration::from_secs(config.rate_limit.eviction_interval_secs);
    actix_rt::spawn(async move {
        let mut ticker = tokio::time::interval(eviction_interval);
        loop {
            ticker.tick().await;
            let evicted = eviction_state
                .sessions
                .throttle()
                .evict_expired(chrono::Utc::now())
                .await;
            if evicted > 0 {
                debug!(evicted, "Evicted expired rate limit windows");
            }
        }
    });

    // Create and bind TCP listener
    let address = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&address)
        .with_context(|| format!("failed to bind {}", address))?;

    info!("Starting server at {}", address);

    let cors_config = config.cors.clone();
    HttpServer::new(move || {
        App::new()
            .wrap(cors(&cors_config))
            .app_data(state.clone())
            .configure(routes)
    })
    .listen(listener)?
    .workers(config.server.workers as usize)
    .run()
    .await
    .context("server terminated with an error")?;

    Ok(())
}
