//! httpOnly cookie transport for the access and refresh tokens.

use actix_web::cookie::time::Duration;
use actix_web::cookie::{Cookie, SameSite};

use crate::config::Settings;

#[derive(Debug, Clone)]
pub struct CookiePolicy {
    pub access_name: String,
    pub refresh_name: String,
    pub path: String,
    pub secure: bool,
    pub same_site: SameSite,
    pub access_max_age: Duration,
    pub refresh_max_age: Duration,
}

impl CookiePolicy {
    pub fn from_settings(settings: &Settings) -> Self {
        let same_site = if settings.is_development() {
            SameSite::Lax
        } else {
            SameSite::Strict
        };

        Self {
            access_name: settings.cookies.access_cookie_name.clone(),
            refresh_name: settings.cookies.refresh_cookie_name.clone(),
            path: settings.cookies.path.clone(),
            secure: settings.cookie_secure(),
            same_site,
            access_max_age: Duration::minutes(settings.cookies.access_max_age_minutes),
            refresh_max_age: Duration::days(settings.cookies.refresh_max_age_days),
        }
    }

    pub fn access_cookie(&self, token: &str) -> Cookie<'static> {
        self.build(&self.access_name, token, self.access_max_age)
    }

    pub fn refresh_cookie(&self, token: &str) -> Cookie<'static> {
        self.build(&self.refresh_name, token, self.refresh_max_age)
    }

    /// Expired, empty cookies that make the browser drop both tokens.
    pub fn clearing_cookies(&self) -> [Cookie<'static>; 2] {
        [
            self.build(&self.access_name, "", Duration::ZERO),
            self.build(&self.refresh_name, "", Duration::ZERO),
        ]
    }

    fn build(&self, name: &str, value: &str, max_age: Duration) -> Cookie<'static> {
        Cookie::build(name.to_string(), value.to_string())
            .http_only(true)
            .secure(self.secure)
            .same_site(self.same_site)
            .path(self.path.clone())
            .max_age(max_age)
            .finish()
    }
}
