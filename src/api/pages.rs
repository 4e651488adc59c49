//! Server-rendered dashboard pages. All of them sit behind the login gate.

use axum::{extract::State, response::Html};
use std::sync::Arc;
use tower_sessions::Session;

use super::auth::{session_api_key, session_owned_server, session_username};
use super::views::{self, AnalyticsView, DashboardView, SettingsView};
use super::{ApiError, AppState};
use crate::models::user_record::UserRecord;

/// GET|POST /
pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Html<String>, ApiError> {
    let user = session_username(&session).await?;
    let api_key = session_api_key(&session).await?;
    let (record, owned_server) = load_ownership(&state, &session, &user).await?;

    Ok(Html(views::dashboard(&DashboardView {
        user: &user,
        api_key: &api_key,
        owned_server: owned_server.as_deref(),
        premium_user: record.premium_user,
    })))
}

/// GET /analytics
pub async fn analytics(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Html<String>, ApiError> {
    let user = session_username(&session).await?;
    let record = load_record(&state, &user).await;
    let quota = state.config.player_quota(record.premium_user);

    Ok(Html(views::analytics(&AnalyticsView {
        user: &user,
        percent_using: record.modern_auth_percent(),
        number_using: record.total_modern_auth_players,
        percent_quota: record.quota_percent(quota),
    })))
}

/// GET /settings
pub async fn settings(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Html<String>, ApiError> {
    let user = session_username(&session).await?;
    let api_key = session_api_key(&session).await?;

    let (_, owned_server) = load_ownership(&state, &session, &user).await?;

    Ok(Html(views::settings(&SettingsView {
        user: &user,
        api_key: &api_key,
        owned_server: owned_server.as_deref(),
    })))
}

/// Storage failures render as an empty, zero-valued record.
async fn load_record(state: &AppState, username: &str) -> UserRecord {
    state
        .store
        .get_user(username)
        .await
        .unwrap_or_else(|| UserRecord::new(username))
}

/// The record plus its owned server; the session copy stands in only when
/// the record cannot be read.
async fn load_ownership(
    state: &AppState,
    session: &Session,
    username: &str,
) -> Result<(UserRecord, Option<String>), ApiError> {
    match state.store.get_user(username).await {
        Some(record) => {
            let owned_server = record.owned_server.clone();
            Ok((record, owned_server))
        }
        None => Ok((
            UserRecord::new(username),
            session_owned_server(session).await?,
        )),
    }
}
