use axum::Json;
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use tower_sessions::Session;

use super::auth::{SESSION_API_KEY, generate_api_key, session_username};
use super::{ApiError, ApiKeyData, ApiResponse, ChartData};

const CHART_DAYS: i64 = 7;

/// GET /api/data
/// Player series for the analytics chart
pub async fn get_data() -> Json<ChartData> {
    Json(chart_data(Utc::now()))
}

/// POST /api/reset_key
/// Replace the session API key
pub async fn reset_key(
    session: Session,
) -> Result<Json<ApiResponse<ApiKeyData>>, ApiError> {
    let username = session_username(&session).await?;

    let api_key = generate_api_key();
    session.insert(SESSION_API_KEY, &api_key).await?;

    tracing::info!(%username, "API key regenerated");

    Ok(Json(ApiResponse::success(
        "API key updated.",
        ApiKeyData { api_key },
    )))
}

fn chart_data(now: DateTime<Utc>) -> ChartData {
    let mut rng = rand::rng();

    let (labels, values): (Vec<String>, Vec<u32>) = (0..CHART_DAYS)
        .rev()
        .map(|days_ago| {
            let day = now - Duration::days(days_ago);
            (day.format("%b %d").to_string(), rng.random_range(10..=100))
        })
        .unzip();

    ChartData { labels, values }
}
