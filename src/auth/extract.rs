use actix_web::dev::Payload;
use actix_web::http::header;
use actix_web::{web, FromRequest, HttpRequest};
use futures::future::LocalBoxFuture;

use crate::auth::session::Identity;
use crate::error::AppError;
use crate::AppState;

/// Extractor for handlers behind authentication.
///
/// Resolves the request's access token through the session orchestrator and
/// hands the handler the resulting identity. Rejections short-circuit with
/// the orchestrator's reason code.
#[derive(Debug, Clone)]
pub struct Authenticated(pub Identity);

impl Authenticated {
    pub fn into_inner(self) -> Identity {
        self.0
    }
}

impl FromRequest for Authenticated {
    type Error = AppError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let state = req.app_data::<web::Data<AppState>>().cloned();
        let token = state
            .as_ref()
            .and_then(|state| access_token(req, &state.cookies.access_name));

        Box::pin(async move {
            let state = state
                .ok_or_else(|| AppError::InternalError("application state not configured".into()))?;
            let identity = state.sessions.authorize(token.as_deref()).await?;
            Ok(Authenticated(identity))
        })
    }
}

/// Access token from the cookie, falling back to `Authorization: Bearer`.
pub fn access_token(req: &HttpRequest, cookie_name: &str) -> Option<String> {
    req.cookie(cookie_name)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
        .or_else(|| bearer_token(req))
}

pub fn bearer_token(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

/// Network address a login attempt is attributed to.
///
/// The first `X-Forwarded-For` hop is only honoured behind a trusted proxy.
pub fn source_address(req: &HttpRequest, trust_forwarded_for: bool) -> String {
    if trust_forwarded_for {
        let forwarded = req
            .headers()
            .get("x-forwarded-for")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|value| !value.is_empty());
        if let Some(forwarded) = forwarded {
            return forwarded.to_string();
        }
    }

    req.peer_addr()
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::cookie::Cookie;
    use actix_web::test::TestRequest;

    #[test]
    fn test_cookie_takes_precedence_over_bearer() {
        let req = TestRequest::default()
            .cookie(Cookie::new("access_token", "from-cookie"))
            .insert_header((header::AUTHORIZATION, "Bearer from-header"))
            .to_http_request();
        assert_eq!(access_token(&req, "access_token").as_deref(), Some("from-cookie"));
    }

    #[test]
    fn test_bearer_fallback() {
        let req = TestRequest::default()
            .insert_header((header::AUTHORIZATION, "Bearer from-header"))
            .to_http_request();
        assert_eq!(access_token(&req, "access_token").as_deref(), Some("from-header"));

        let req = TestRequest::default()
            .cookie(Cookie::new("access_token", ""))
            .insert_header((header::AUTHORIZATION, "Bearer from-header"))
            .to_http_request();
        assert_eq!(access_token(&req, "access_token").as_deref(), Some("from-header"));
    }

    #[test]
    fn test_non_bearer_schemes_are_ignored() {
        let req = TestRequest::default()
            .insert_header((header::AUTHORIZATION, "Basic dXNlcjpwYXNz"))
            .to_http_request();
        assert_eq!(access_token(&req, "access_token"), None);

        let req = TestRequest::default()
            .insert_header((header::AUTHORIZATION, "Bearer "))
            .to_http_request();
        assert_eq!(bearer_token(&req), None);
    }

    #[test]
    fn test_source_address() {
        let req = TestRequest::default()
            .peer_addr("10.1.2.3:5555".parse().unwrap())
            .insert_header(("x-forwarded-for", "203.0.113.9, 10.0.0.1"))
            .to_http_request();

        assert_eq!(source_address(&req, false), "10.1.2.3");
        assert_eq!(source_address(&req, true), "203.0.113.9");

        let req = TestRequest::default().to_http_request();
        assert_eq!(source_address(&req, true), "unknown");
    }
}
