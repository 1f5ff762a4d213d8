use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::db::UserRecord;
use crate::error::{AppError, AuthError};
use crate::Result;

/// Discriminates access from refresh tokens. Both share a shape and a secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenType::Access => write!(f, "access"),
            TokenType::Refresh => write!(f, "refresh"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,  // User ID
    pub email: String,
    pub role: String,
    pub typ: TokenType,
    pub jti: String,
    pub iat: i64,     // Issued at
    pub exp: i64,     // Expiration time
}

impl Claims {
    pub fn user_id(&self) -> std::result::Result<i64, TokenError> {
        self.sub.parse().map_err(|_| TokenError::Malformed)
    }
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub value: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access: IssuedToken,
    pub refresh: IssuedToken,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    #[error("token expired")]
    Expired,

    #[error("token malformed")]
    Malformed,

    #[error("wrong token type")]
    WrongType,
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => AuthError::TokenExpired,
            TokenError::Malformed => AuthError::TokenMalformed,
            TokenError::WrongType => AuthError::TokenWrongType,
        }
    }
}

/// Mints and checks HS256 tokens with a process-wide secret.
///
/// Changing the secret invalidates every outstanding token.
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &[u8], access_ttl: Duration, refresh_ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            access_ttl,
            refresh_ttl,
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(
            config.jwt_secret.as_bytes(),
            Duration::minutes(config.access_token_minutes),
            Duration::days(config.refresh_token_days),
        )
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    pub fn issue_access_token(&self, user: &UserRecord) -> Result<IssuedToken> {
        self.issue(user, TokenType::Access, self.access_ttl)
    }

    pub fn issue_refresh_token(&self, user: &UserRecord) -> Result<IssuedToken> {
        self.issue(user, TokenType::Refresh, self.refresh_ttl)
    }

    pub fn issue_pair(&self, user: &UserRecord) -> Result<TokenPair> {
        Ok(TokenPair {
            access: self.issue_access_token(user)?,
            refresh: self.issue_refresh_token(user)?,
        })
    }

    fn issue(&self, user: &UserRecord, typ: TokenType, ttl: Duration) -> Result<IssuedToken> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            role: user.role.clone(),
            typ,
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };

        let value = self.sign(&claims)?;
        let expires_at = Utc
            .timestamp_opt(claims.exp, 0)
            .single()
            .ok_or_else(|| AppError::InternalError("token expiry out of range".into()))?;

        Ok(IssuedToken { value, expires_at })
    }

    pub(crate) fn sign(&self, claims: &Claims) -> Result<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| AppError::InternalError(format!("Token signing failed: {}", e)))
    }

    /// Checks signature, expiry and type, in that order.
    ///
    /// A token whose `exp` equals the current second is already expired.
    pub fn verify(
        &self,
        token: &str,
        expected: TokenType,
    ) -> std::result::Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;

        let claims = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed,
            })?
            .claims;

        // the library only rejects exp < now
        if claims.exp <= Utc::now().timestamp() {
            return Err(TokenError::Expired);
        }

        if claims.typ != expected {
            return Err(TokenError::WrongType);
        }

        Ok(claims)
    }
}
