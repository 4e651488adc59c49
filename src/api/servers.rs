use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use serde::Deserialize;
use std::sync::Arc;
use tower_sessions::Session;

use super::auth::{SESSION_OWNED_SERVER, session_owned_server, session_username};
use super::validation::validate_server_id;
use super::{
    ApiError, ApiResponse, AppState, CreatedServerData, Empty, ServerCodeData,
};

#[derive(Deserialize)]
pub struct CreateServerRequest {
    #[serde(default)]
    pub server_id: String,
}

/// POST /api/create_server
pub async fn create_server(
    State(state): State<Arc<AppState>>,
    session: Session,
    payload: Result<Json<CreateServerRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<CreatedServerData>>, ApiError> {
    let username = session_username(&session).await?;
    let Json(request) =
        payload.map_err(|e| ApiError::validation(format!("Invalid request body: {e}")))?;

    let server_id = validate_server_id(&request.server_id)?;
    let session_server = session_owned_server(&session).await?;

    let created = state
        .servers
        .create(&username, &server_id, session_server)
        .await?;

    session
        .insert(SESSION_OWNED_SERVER, &created.server_id)
        .await?;

    Ok(Json(ApiResponse::success(
        "Server created.",
        CreatedServerData {
            owned_server: created.server_id,
            secret_key: created.secret_key,
        },
    )))
}

/// POST /api/delete_server
pub async fn delete_server(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Json<ApiResponse<Empty>>, ApiError> {
    let username = session_username(&session).await?;
    let session_server = session_owned_server(&session).await?;

    state.servers.delete(&username, session_server).await?;
    session.remove::<String>(SESSION_OWNED_SERVER).await?;

    Ok(Json(ApiResponse::ok("Server removed.")))
}

/// POST /api/reset_server_code
pub async fn reset_server_code(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Json<ApiResponse<ServerCodeData>>, ApiError> {
    let username = session_username(&session).await?;
    let session_server = session_owned_server(&session).await?;

    let (_, new_code) = state.servers.reset_code(&username, session_server).await?;

    Ok(Json(ApiResponse::success(
        "Server access code updated.",
        ServerCodeData { new_code },
    )))
}
