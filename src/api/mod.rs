use axum::{
    Router, middleware,
    routing::{get, post},
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tower_sessions::{
    Expiry, MemoryStore, SessionManagerLayer,
    cookie::{Key, SameSite},
};

use crate::config::Config;
use crate::db::Store;
use crate::services::{CommandProvisioner, ServerProvisioner, ServerService};

pub mod auth;
mod assets;
mod dashboard;
mod error;
mod observability;
mod pages;
pub mod rate_limit;
mod servers;
mod types;
pub mod validation;
pub mod views;

pub use error::ApiError;
pub use types::*;

use rate_limit::{Limit, RateLimited, RateLimiter};

pub const SESSION_COOKIE: &str = "modernauthdash_session";

pub struct AppState {
    pub config: Config,

    pub store: Store,

    pub servers: ServerService,

    pub rate_limiter: Arc<RateLimiter>,

    pub session_key: Key,

    pub prometheus_handle: Option<PrometheusHandle>,
}

pub async fn create_app_state(
    config: Config,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let provisioner = Arc::new(CommandProvisioner::new(&config.provisioning));
    create_app_state_with_provisioner(config, provisioner, prometheus_handle).await
}

pub async fn create_app_state_with_provisioner(
    config: Config,
    provisioner: Arc<dyn ServerProvisioner>,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let store = Store::with_pool_options(
        &config.general.database_url,
        config.general.max_db_connections,
        config.general.min_db_connections,
    )
    .await?;

    let servers = ServerService::new(store.clone(), provisioner);
    let rate_limiter = Arc::new(RateLimiter::new(config.security.rate_limits.enabled));
    let session_key = session_key(&config.security.app_secret_key);

    Ok(Arc::new(AppState {
        config,
        store,
        servers,
        rate_limiter,
        session_key,
        prometheus_handle,
    }))
}

/// Cookie signing key from the configured secret, or a per-process one.
fn session_key(secret: &str) -> Key {
    if !secret.is_empty() {
        match Key::try_from(secret.as_bytes()) {
            Ok(key) => return key,
            Err(e) => tracing::warn!("Unusable app_secret_key ({e}), generating one"),
        }
    }

    tracing::warn!("No app_secret_key configured; sessions will not survive a restart");
    Key::generate()
}

pub fn router(state: Arc<AppState>) -> Router {
    let limits = &state.config.security.rate_limits;

    let session_layer = SessionManagerLayer::new(MemoryStore::default())
        .with_name(SESSION_COOKIE)
        .with_secure(state.config.server.secure_cookies)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::minutes(
            state.config.server.session_inactivity_minutes,
        )))
        .with_signed(state.session_key.clone());

    let default_limit = middleware::from_fn_with_state(
        RateLimited::new(
            &state.rate_limiter,
            Limit::per_day("default", limits.default_per_day),
        ),
        rate_limit::enforce,
    );

    let public_routes = Router::new()
        .route(auth::LOGIN_PATH, get(auth::login_redirect))
        .route(auth::CALLBACK_PATH, get(auth::auth_callback))
        .route("/logout", get(auth::logout))
        .route("/static/{*path}", get(assets::serve_asset));

    Router::new()
        .merge(create_protected_router(&state))
        .merge(public_routes)
        .fallback(auth::gated_fallback)
        .layer(session_layer)
        .layer(default_limit)
        .with_state(state)
        .layer(middleware::from_fn(observability::logging_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(
            observability::security_headers_middleware,
        ))
}

fn create_protected_router(state: &Arc<AppState>) -> Router<Arc<AppState>> {
    let limits = &state.config.security.rate_limits;

    let data_limit = middleware::from_fn_with_state(
        RateLimited::new(&state.rate_limiter, Limit::per_hour("data", limits.data_per_hour)),
        rate_limit::enforce,
    );
    let reset_key_limit = middleware::from_fn_with_state(
        RateLimited::new(
            &state.rate_limiter,
            Limit::per_hour("reset_key", limits.reset_key_per_hour),
        ),
        rate_limit::enforce,
    );

    Router::new()
        .route("/", get(pages::dashboard).post(pages::dashboard))
        .route("/analytics", get(pages::analytics))
        .route("/settings", get(pages::settings))
        .route(
            "/api/data",
            get(dashboard::get_data).route_layer(data_limit),
        )
        .route(
            "/api/reset_key",
            post(dashboard::reset_key).route_layer(reset_key_limit),
        )
        .route("/api/create_server", post(servers::create_server))
        .route("/api/reset_server_code", post(servers::reset_server_code))
        .route("/api/delete_server", post(servers::delete_server))
        .route("/metrics", get(observability::get_metrics))
        .route_layer(middleware::from_fn(auth::require_login))
}
