use axum::{
    extract::{Query, Request, State},
    http::{HeaderMap, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use tower_sessions::Session;
use url::Url;

use super::{ApiError, AppState};
use crate::config::SsoConfig;

pub const SESSION_USER: &str = "user";
pub const SESSION_API_KEY: &str = "api_key";
pub const SESSION_OWNED_SERVER: &str = "owned_server";

pub const LOGIN_PATH: &str = "/login_redirect";
pub const CALLBACK_PATH: &str = "/auth_callback";

// ============================================================================
// Request Types
// ============================================================================

#[derive(Deserialize)]
pub struct CallbackQuery {
    pub username: Option<String>,
}

// ============================================================================
// Middleware
// ============================================================================

/// Sends every request without a logged-in session to the SSO login.
///
/// Only applied to protected routes; the login, callback, logout and static
/// routes are mounted outside it.
pub async fn require_login(session: Session, request: Request, next: Next) -> Response {
    match session.get::<String>(SESSION_USER).await {
        Ok(Some(user)) => {
            tracing::Span::current().record("user_id", user.as_str());
            next.run(request).await
        }
        Ok(None) => Redirect::to(LOGIN_PATH).into_response(),
        Err(e) => {
            tracing::warn!("Session lookup failed, forcing login: {e}");
            Redirect::to(LOGIN_PATH).into_response()
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /login_redirect
/// Hands the browser to the SSO backend with this dashboard's credentials
pub async fn login_redirect(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Redirect, ApiError> {
    let callback = callback_url(state.config.server.public_url.as_deref(), &headers)?;
    let login_url = build_login_url(&state.config.sso, &callback)?;

    Ok(Redirect::to(login_url.as_str()))
}

/// GET /auth_callback?username=
/// The SSO backend returns here once the user has authenticated
pub async fn auth_callback(
    State(state): State<Arc<AppState>>,
    session: Session,
    Query(query): Query<CallbackQuery>,
) -> Result<Response, ApiError> {
    let Some(username) = query.username.filter(|u| !u.trim().is_empty()) else {
        tracing::warn!("SSO callback without a username");
        return Ok((StatusCode::UNAUTHORIZED, "Authentication failed").into_response());
    };

    // Nothing from a different identity may carry over.
    let previous = session.get::<String>(SESSION_USER).await?;
    if previous.as_deref() != Some(username.as_str()) {
        session.clear().await;
    }

    session.cycle_id().await?;
    session.insert(SESSION_USER, &username).await?;

    if session.get::<String>(SESSION_API_KEY).await?.is_none() {
        session.insert(SESSION_API_KEY, generate_api_key()).await?;
    }

    state.store.create_user_if_missing(&username).await;

    if let Some(record) = state.store.get_user(&username).await {
        match record.owned_server {
            Some(server) => session.insert(SESSION_OWNED_SERVER, server).await?,
            None => {
                session.remove::<String>(SESSION_OWNED_SERVER).await?;
            }
        }
    }

    tracing::info!(%username, "User logged in");

    Ok(Redirect::to("/").into_response())
}

/// Unmatched paths: anonymous visitors are sent to the login, others get 404.
pub async fn gated_fallback(session: Session) -> Response {
    match session.get::<String>(SESSION_USER).await {
        Ok(Some(_)) => (StatusCode::NOT_FOUND, "404 Not Found").into_response(),
        Ok(None) => Redirect::to(LOGIN_PATH).into_response(),
        Err(e) => {
            tracing::warn!("Session lookup failed, forcing login: {e}");
            Redirect::to(LOGIN_PATH).into_response()
        }
    }
}

/// GET /logout
pub async fn logout(session: Session) -> Redirect {
    if let Err(e) = session.flush().await {
        tracing::warn!("Failed to flush session on logout: {e}");
    }
    Redirect::to(LOGIN_PATH)
}

// ============================================================================
// Helpers
// ============================================================================

/// Get username from session, returns error if not authenticated
pub async fn session_username(session: &Session) -> Result<String, ApiError> {
    session
        .get::<String>(SESSION_USER)
        .await?
        .ok_or_else(ApiError::not_logged_in)
}

/// The session API key, minting one if the session predates it.
pub async fn session_api_key(session: &Session) -> Result<String, ApiError> {
    if let Some(key) = session.get::<String>(SESSION_API_KEY).await? {
        return Ok(key);
    }

    let key = generate_api_key();
    session.insert(SESSION_API_KEY, &key).await?;
    Ok(key)
}

pub async fn session_owned_server(session: &Session) -> Result<Option<String>, ApiError> {
    Ok(session.get::<String>(SESSION_OWNED_SERVER).await?)
}

/// Absolute URL of the callback route, from `public_url` or the request `Host`.
fn callback_url(public_url: Option<&str>, headers: &HeaderMap) -> Result<String, ApiError> {
    if let Some(public_url) = public_url {
        return Ok(format!(
            "{}{CALLBACK_PATH}",
            public_url.trim_end_matches('/')
        ));
    }

    let host = headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| ApiError::validation("Missing Host header"))?;

    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|h| h.to_str().ok())
        .filter(|proto| matches!(*proto, "http" | "https"))
        .unwrap_or("http");

    Ok(format!("{scheme}://{host}{CALLBACK_PATH}"))
}

/// `{backend}/login?next=..&server_id=..&secret=..`
///
/// The access code travels in the query string because the SSO backend
/// expects it there.
pub fn build_login_url(sso: &SsoConfig, callback: &str) -> anyhow::Result<Url> {
    let base = format!("{}/login", sso.backend_url.trim_end_matches('/'));
    let mut url = Url::parse(&base)?;

    url.query_pairs_mut()
        .append_pair("next", callback)
        .append_pair("server_id", &sso.dashboard_id)
        .append_pair("secret", &sso.dashboard_access_code);

    Ok(url)
}

/// Generate a random API key (64 character hex string)
#[must_use]
pub fn generate_api_key() -> String {
    use rand::Rng;

    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();

    bytes.iter().fold(String::with_capacity(64), |mut acc, b| {
        use std::fmt::Write;
        let _ = write!(acc, "{b:02x}");
        acc
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn sso() -> SsoConfig {
        SsoConfig {
            backend_url: "https://auth.example.org/".to_string(),
            dashboard_id: "dash-7".to_string(),
            dashboard_access_code: "s3cr&t".to_string(),
        }
    }

    #[test]
    fn test_build_login_url() {
        let url = build_login_url(&sso(), "http://localhost:5000/auth_callback").unwrap();

        assert_eq!(url.host_str(), Some("auth.example.org"));
        assert_eq!(url.path(), "/login");

        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                (
                    "next".to_string(),
                    "http://localhost:5000/auth_callback".to_string()
                ),
                ("server_id".to_string(), "dash-7".to_string()),
                ("secret".to_string(), "s3cr&t".to_string()),
            ]
        );
    }

    #[test]
    fn test_callback_url_prefers_public_url() {
        let headers = HeaderMap::new();
        assert_eq!(
            callback_url(Some("https://dash.example.org/"), &headers).unwrap(),
            "https://dash.example.org/auth_callback"
        );
        assert!(callback_url(None, &headers).is_err());
    }

    #[test]
    fn test_callback_url_from_host() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("dash.local:5000"));
        assert_eq!(
            callback_url(None, &headers).unwrap(),
            "http://dash.local:5000/auth_callback"
        );

        headers.insert("x-forwarded-proto", HeaderValue::from_static("https"));
        assert_eq!(
            callback_url(None, &headers).unwrap(),
            "https://dash.local:5000/auth_callback"
        );
    }

    #[test]
    fn test_generate_api_key() {
        let a = generate_api_key();
        let b = generate_api_key();
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }
}
