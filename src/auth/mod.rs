//! Authentication and authorization for the stable backend.
//!
//! Login with dual-key brute-force throttling, signed access/refresh token
//! pairs carried in httpOnly cookies (bearer header accepted as fallback),
//! per-request authorization against the live user record, and the static
//! role/capability matrix.

pub mod cookies;
pub mod credentials;
pub mod extract;
pub mod handlers;
pub mod permissions;
pub mod rate_limit;
pub mod session;
pub mod tokens;

pub use cookies::CookiePolicy;
pub use credentials::{Argon2Scheme, CredentialVerifier, PasswordScheme};
pub use extract::Authenticated;
pub use permissions::PermissionMatrix;
pub use rate_limit::{LoginThrottle, RateLimitConfig, RateLimitDecision, RateLimiter};
pub use session::{Identity, LoginOutcome, SessionOrchestrator};
pub use tokens::{Claims, TokenError, TokenIssuer, TokenPair, TokenType};
