use crate::app::SharedState;
use crate::auth::AuthUser;
use crate::call_models::{AnalyticsData, ApiEnvelope, Call, CallList, CreateCallRequest};
use crate::error::ApiError;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use tracing::info;

const MAX_LIST_LIMIT: usize = 100;

#[derive(Debug, Deserialize)]
pub struct ListCallsQuery {
    pub limit: Option<usize>,
}

pub async fn list_calls(
    State(state): State<SharedState>,
    user: AuthUser,
    query: Result<Query<ListCallsQuery>, QueryRejection>,
) -> Result<Json<ApiEnvelope<CallList>>, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let limit = query.limit.unwrap_or(MAX_LIST_LIMIT).min(MAX_LIST_LIMIT);
    let calls = state.calls.calls_for_owner(&user.user_id, Some(limit)).await;
    Ok(Json(ApiEnvelope::ok(CallList { calls })))
}

pub async fn create_call(
    State(state): State<SharedState>,
    user: AuthUser,
    payload: Result<Json<CreateCallRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiEnvelope<Call>>), ApiError> {
    let Json(payload) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let title = payload
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Title is required".to_string()))?
        .to_string();

    if let Some(score) = payload.score {
        if !(0.0..=100.0).contains(&score) {
            return Err(ApiError::BadRequest("Score must be between 0 and 100".to_string()));
        }
    }

    let call = state
        .calls
        .add_call(Call::new(user.user_id, title, payload))
        .await
        .map_err(|e| ApiError::upstream("Failed to save call", e))?;

    info!(id = %call.id, duration = call.duration, "call logged");
    Ok((StatusCode::CREATED, Json(ApiEnvelope::ok(call))))
}

pub async fn analytics(
    State(state): State<SharedState>,
    user: AuthUser,
) -> Json<ApiEnvelope<AnalyticsData>> {
    let calls = state.calls.calls_for_owner(&user.user_id, None).await;
    Json(ApiEnvelope::ok(AnalyticsData::compute(&calls, Utc::now().date_naive())))
}
