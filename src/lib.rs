pub mod auth;
pub mod config;
pub mod db;
pub mod error;

use std::sync::Arc;
use actix_web::{web, HttpResponse};

pub use error::AppError;
pub type Result<T> = std::result::Result<T, AppError>;
pub use config::Settings;

pub use auth::{
    Argon2Scheme, CookiePolicy, LoginThrottle, PasswordScheme, PermissionMatrix,
    SessionOrchestrator, TokenIssuer,
};
pub use db::{InMemoryUserStore, PgUserStore, UserRecord, UserStore};

/// Health check endpoint handler
/// Returns a JSON response with server status and timestamp
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Application state shared across all workers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Settings>,
    pub sessions: Arc<SessionOrchestrator>,
    pub cookies: Arc<CookiePolicy>,
}

impl AppState {
    /// Wires the auth core from settings over the given user store.
    pub fn new(config: Settings, store: Arc<dyn UserStore>) -> Result<Self> {
        Self::with_scheme(config, store, Arc::new(Argon2Scheme::new()))
    }

    pub fn with_scheme(
        config: Settings,
        store: Arc<dyn UserStore>,
        scheme: Arc<dyn PasswordScheme>,
    ) -> Result<Self> {
        config.validate()?;

        let sessions = SessionOrchestrator::new(
            store,
            scheme,
            TokenIssuer::from_config(&config.auth),
            LoginThrottle::from_settings(&config.rate_limit),
            PermissionMatrix::standard(),
        )?;

        Ok(Self {
            cookies: Arc::new(CookiePolicy::from_settings(&config)),
            sessions: Arc::new(sessions),
            config: Arc::new(config),
        })
    }
}

/// Registers every route the service exposes.
pub fn routes(cfg: &mut web::ServiceConfig) {
    use auth::handlers;

    cfg.route("/health", web::get().to(health_check))
        .service(
            web::scope("/auth")
                .route("/login", web::post().to(handlers::login))
                .route("/refresh", web::post().to(handlers::refresh))
                .route("/logout", web::post().to(handlers::logout))
                .route("/verify", web::get().to(handlers::verify))
                .route("/permissions", web::get().to(handlers::permissions)),
        )
        .route("/admin/rate-limits", web::get().to(handlers::rate_limit_stats));
}
