//! `AuthUser` extractor: pulls the bearer token, verifies it, and resolves
//! per-request preferences.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use assetdesk_core::AppError;
use assetdesk_service::{Preferences, RequestContext};

use crate::error::ApiError;
use crate::state::AppState;

/// Header carrying the caller's theme preference.
pub const THEME_HEADER: &str = "x-theme";
/// Cookie consulted when the header is absent.
const THEME_COOKIE: &str = "theme";

/// Extracted authenticated user context available in handlers.
#[derive(Debug, Clone)]
pub struct AuthUser(pub RequestContext);

impl AuthUser {
    /// Returns the inner `RequestContext`.
    pub fn context(&self) -> &RequestContext {
        &self.0
    }
}

impl std::ops::Deref for AuthUser {
    type Target = RequestContext;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::authentication("Missing Authorization header"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::authentication("Invalid Authorization header format"))?;

        let claims = state.jwt_decoder.decode(token)?;
        let preferences = Preferences::resolve(theme(parts).as_deref());

        let ctx = RequestContext::new(claims.user_id(), claims.role, claims.username)
            .with_preferences(preferences);

        Ok(AuthUser(ctx))
    }
}

fn theme(parts: &Parts) -> Option<String> {
    if let Some(value) = parts.headers.get(THEME_HEADER).and_then(|v| v.to_str().ok()) {
        return Some(value.to_string());
    }
    parts
        .headers
        .get_all("cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == THEME_COOKIE)
        .map(|(_, value)| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(headers: &[(&str, &str)]) -> Parts {
        let mut builder = Request::builder();
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_theme_header_wins_over_cookie() {
        let p = parts(&[("x-theme", "dark"), ("cookie", "theme=light")]);
        assert_eq!(theme(&p).as_deref(), Some("dark"));
    }

    #[test]
    fn test_theme_from_cookie() {
        let p = parts(&[("cookie", "sid=abc; theme=dark")]);
        assert_eq!(theme(&p).as_deref(), Some("dark"));
        assert_eq!(theme(&parts(&[])), None);
    }
}
