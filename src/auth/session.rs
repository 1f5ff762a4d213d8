use chrono::Utc;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::auth::credentials::{normalize_email, CredentialVerifier, PasswordScheme};
use crate::auth::permissions::PermissionMatrix;
use crate::auth::rate_limit::{LoginThrottle, RateLimitDecision, ThrottleStats};
use crate::auth::tokens::{TokenIssuer, TokenPair, TokenType};
use crate::db::{UserProfile, UserRecord, UserStore};
use crate::error::{AppError, AuthError};
use crate::Result;

/// Who made an authorized request. Built fresh from the user store per request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub user_id: i64,
    pub email: String,
    pub role: String,
}

#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub user: UserProfile,
    pub tokens: TokenPair,
}

/// Login, refresh, authorization and permission checks over the auth parts.
pub struct SessionOrchestrator {
    store: Arc<dyn UserStore>,
    verifier: CredentialVerifier,
    issuer: TokenIssuer,
    throttle: LoginThrottle,
    matrix: PermissionMatrix,
}

impl SessionOrchestrator {
    pub fn new(
        store: Arc<dyn UserStore>,
        scheme: Arc<dyn PasswordScheme>,
        issuer: TokenIssuer,
        throttle: LoginThrottle,
        matrix: PermissionMatrix,
    ) -> Result<Self> {
        let verifier = CredentialVerifier::new(Arc::clone(&store), scheme)?;
        Ok(Self {
            store,
            verifier,
            issuer,
            throttle,
            matrix,
        })
    }

    pub fn issuer(&self) -> &TokenIssuer {
        &self.issuer
    }

    pub fn throttle(&self) -> &LoginThrottle {
        &self.throttle
    }

    pub fn matrix(&self) -> &PermissionMatrix {
        &self.matrix
    }

    /// Email/password login from `source` (a network address).
    ///
    /// Both limiters are consulted before the credentials are looked at, and
    /// every consulted limiter counts the attempt whatever its outcome. Only
    /// a successful login clears the account counter.
    pub async fn login(&self, email: &str, password: &str, source: &str) -> Result<LoginOutcome> {
        let account = normalize_email(email);

        if let RateLimitDecision::Blocked { retry_after_secs } =
            self.throttle.by_address().check_and_increment(source).await
        {
            warn!(source, retry_after_secs, "Login blocked by address limiter");
            return Err(AuthError::RateLimited { retry_after_secs }.into());
        }

        if let RateLimitDecision::Blocked { retry_after_secs } =
            self.throttle.by_account().check_and_increment(&account).await
        {
            warn!(email = %account, source, retry_after_secs, "Login blocked by account limiter");
            return Err(AuthError::RateLimited { retry_after_secs }.into());
        }

        let mut user = match self.verifier.verify(&account, password).await {
            Ok(user) => user,
            Err(AppError::AuthError(reason)) => {
                warn!(email = %account, source, reason = %reason, "Login failed");
                return Err(reason.into());
            }
            Err(e) => {
                error!(email = %account, source, "Login aborted: {}", e);
                return Err(e);
            }
        };

        self.throttle.by_account().clear(&account).await;

        let tokens = self.issuer.issue_pair(&user)?;

        match self.store.touch_last_login(user.id).await {
            Ok(()) => user.last_login = Some(Utc::now()),
            Err(e) => warn!(user_id = user.id, "Could not record last login: {}", e),
        }

        info!(user_id = user.id, role = %user.role, source, "Login successful");

        Ok(LoginOutcome {
            user: UserProfile::from(&user),
            tokens,
        })
    }

    /// Swaps a refresh token for a new access and refresh pair.
    ///
    /// Every failure collapses into `RefreshRejected`.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair> {
        let claims = self
            .issuer
            .verify(refresh_token, TokenType::Refresh)
            .map_err(|reason| {
                warn!(reason = %reason, "Refresh rejected");
                AuthError::RefreshRejected
            })?;

        let user_id = claims.user_id().map_err(|_| {
            warn!("Refresh rejected: non-numeric subject");
            AuthError::RefreshRejected
        })?;

        let user = match self.store.find_by_id(user_id).await? {
            Some(user) if user.is_active => user,
            Some(_) => {
                warn!(user_id, "Refresh rejected: user inactive");
                return Err(AuthError::RefreshRejected.into());
            }
            None => {
                warn!(user_id, "Refresh rejected: user not found");
                return Err(AuthError::RefreshRejected.into());
            }
        };

        let tokens = self.issuer.issue_pair(&user)?;
        info!(user_id, "Tokens refreshed");
        Ok(tokens)
    }

    /// Resolves an access token into the identity of a current, active user.
    pub async fn authorize(&self, access_token: Option<&str>) -> Result<Identity> {
        let token = access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                warn!("Authorization rejected: no access token presented");
                AuthError::TokenMissing
            })?;

        let claims = self
            .issuer
            .verify(token, TokenType::Access)
            .map_err(|reason| {
                warn!(reason = %reason, "Authorization rejected");
                AuthError::from(reason)
            })?;
        let user_id = claims.user_id().map_err(|reason| {
            warn!(reason = %reason, "Authorization rejected: non-numeric subject");
            AuthError::from(reason)
        })?;

        let user = self
            .store
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| {
                warn!(user_id, "Authorization rejected: user not found");
                AuthError::UserNotFound
            })?;

        if !user.is_active {
            warn!(user_id, "Authorization rejected: user inactive");
            return Err(AuthError::UserInactive.into());
        }

        Ok(identity_of(&user))
    }

    /// Tokens are stateless: the caller clears the transport, nothing else happens.
    pub fn logout(&self, identity: &Identity) {
        info!(user_id = identity.user_id, "Logout");
    }

    pub fn require_permission(&self, identity: &Identity, permission: &str) -> Result<()> {
        if self.matrix.has_permission(&identity.role, permission) {
            return Ok(());
        }
        warn!(user_id = identity.user_id, role = %identity.role, permission, "Permission denied");
        Err(AuthError::Forbidden {
            permission: permission.to_string(),
        }
        .into())
    }

    pub fn require_role(&self, identity: &Identity, allowed: &[&str]) -> Result<()> {
        if self.matrix.has_role(&identity.role, allowed) {
            return Ok(());
        }
        warn!(user_id = identity.user_id, role = %identity.role, "Role not allowed");
        Err(AuthError::Forbidden {
            permission: format!("role:{}", allowed.join("|")),
        }
        .into())
    }

    pub fn permissions_of(&self, identity: &Identity) -> BTreeSet<&str> {
        self.matrix.permissions_for(&identity.role)
    }

    pub async fn rate_limit_stats(&self) -> ThrottleStats {
        self.throttle.stats().await
    }
}

fn identity_of(user: &UserRecord) -> Identity {
    Identity {
        user_id: user.id,
        email: user.email.clone(),
        role: user.role.clone(),
    }
}
