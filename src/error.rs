use thiserror::Error;
use actix_web::{ResponseError, HttpResponse, http::StatusCode};
use actix_web::http::header;
use serde_json::json;

/// Message shared by every failed login, whatever the underlying reason.
pub const LOGIN_FAILED_MESSAGE: &str = "Invalid email or password";

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication error: {0}")]
    AuthError(#[from] AuthError),

    #[error("Database error: {0}")]
    DatabaseError(#[from] DatabaseError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Internal server error: {0}")]
    InternalError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

// Implement conversion from config::ConfigError
impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(err.to_string())
    }
}

// Implement conversion from sqlx::Error
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AppError::DatabaseError(DatabaseError::NotFound),
            _ => AppError::DatabaseError(DatabaseError::QueryError(err.to_string())),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        AppError::DatabaseError(DatabaseError::MigrationError(err.to_string()))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::InternalError(err.to_string())
    }
}

impl AppError {
    /// Machine-readable code placed in the error body.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::AuthError(e) => e.code(),
            AppError::ValidationError(_) => "validation_error",
            AppError::DatabaseError(_) | AppError::ConfigError(_) | AppError::InternalError(_) => {
                "internal_error"
            }
        }
    }

    /// Message shown to the client. Internal details stay in the logs.
    fn public_message(&self) -> String {
        match self {
            AppError::AuthError(e) => e.public_message(),
            AppError::ValidationError(msg) => msg.clone(),
            AppError::DatabaseError(_) | AppError::ConfigError(_) | AppError::InternalError(_) => {
                "Internal server error".to_string()
            }
        }
    }
}

// Implement actix_web::ResponseError for AppError
impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let mut response = HttpResponse::build(status);

        if let AppError::AuthError(AuthError::RateLimited { retry_after_secs }) = self {
            response.insert_header((header::RETRY_AFTER, retry_after_secs.to_string()));
            return response.json(json!({
                "error": {
                    "status": status.as_u16(),
                    "code": self.code(),
                    "message": self.public_message(),
                    "retry_after_minutes": retry_after_minutes(*retry_after_secs),
                }
            }));
        }

        response.json(json!({
            "error": {
                "status": status.as_u16(),
                "code": self.code(),
                "message": self.public_message(),
            }
        }))
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::AuthError(e) => match e {
                AuthError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
                AuthError::Forbidden { .. } => StatusCode::FORBIDDEN,
                _ => StatusCode::UNAUTHORIZED,
            },
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::ConfigError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Account inactive")]
    AccountInactive,

    #[error("Rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Token missing")]
    TokenMissing,

    #[error("Token expired")]
    TokenExpired,

    #[error("Token malformed")]
    TokenMalformed,

    #[error("Token has the wrong type")]
    TokenWrongType,

    #[error("Refresh rejected")]
    RefreshRejected,

    #[error("User not found")]
    UserNotFound,

    #[error("User inactive")]
    UserInactive,

    #[error("Missing permission {permission}")]
    Forbidden { permission: String },
}

impl AuthError {
    pub fn code(&self) -> &'static str {
        match self {
            // Login failures share one code so the account state never leaks.
            AuthError::InvalidCredentials | AuthError::AccountInactive => "invalid_credentials",
            AuthError::RateLimited { .. } => "rate_limited",
            AuthError::TokenMissing => "token_missing",
            AuthError::TokenExpired => "token_expired",
            AuthError::TokenMalformed | AuthError::TokenWrongType => "token_invalid",
            AuthError::RefreshRejected => "unauthorized",
            AuthError::UserNotFound => "user_not_found",
            AuthError::UserInactive => "user_inactive",
            AuthError::Forbidden { .. } => "forbidden",
        }
    }

    fn public_message(&self) -> String {
        match self {
            AuthError::InvalidCredentials | AuthError::AccountInactive => {
                LOGIN_FAILED_MESSAGE.to_string()
            }
            AuthError::RateLimited { retry_after_secs } => {
                let minutes = retry_after_minutes(*retry_after_secs);
                format!(
                    "Too many login attempts. Try again in {} minute{}.",
                    minutes,
                    if minutes == 1 { "" } else { "s" }
                )
            }
            AuthError::TokenMissing => "Authentication required".to_string(),
            AuthError::TokenExpired => "Token expired".to_string(),
            AuthError::TokenMalformed | AuthError::TokenWrongType => "Invalid token".to_string(),
            AuthError::RefreshRejected => "Unauthorized".to_string(),
            AuthError::UserNotFound => "User not found".to_string(),
            AuthError::UserInactive => "User inactive".to_string(),
            AuthError::Forbidden { .. } => "Insufficient permissions".to_string(),
        }
    }
}

/// Whole minutes to wait, rounded up and never zero.
pub fn retry_after_minutes(retry_after_secs: u64) -> u64 {
    retry_after_secs.div_ceil(60).max(1)
}

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error("Migration error: {0}")]
    MigrationError(String),

    #[error("Record not found")]
    NotFound,
}
