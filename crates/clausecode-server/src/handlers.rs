//! HTTP request handlers.

use crate::types::{
    AnalysisResponse, ListParams, ListResponse, SaveRequest, SaveResponse, StatusResponse,
};
use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use clausecode_store::{AnalysisQuery, AnalysisStore};
use log::{debug, info};
use std::sync::Arc;

/// Header carrying the authenticated caller, set by the auth layer in front.
pub const USER_ID_HEADER: &str = "x-user-id";

const UNAVAILABLE: &str = "Document store not available";

type ApiError = (StatusCode, Json<StatusResponse>);

/// State shared by all handlers.
pub struct AppState {
    pub store: Arc<AnalysisStore>,
    /// Page size used when `GET /analyses` has no `limit`.
    pub default_limit: usize,
}

impl AppState {
    pub fn new(store: Arc<AnalysisStore>, default_limit: usize) -> Arc<Self> {
        Arc::new(Self {
            store,
            default_limit,
        })
    }

    async fn require_documents(&self) -> Result<(), ApiError> {
        if self.store.initialize().await {
            Ok(())
        } else {
            Err(api_error(StatusCode::SERVICE_UNAVAILABLE, UNAVAILABLE))
        }
    }
}

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(StatusResponse::error(message)))
}

fn caller_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

pub async fn health() -> Json<StatusResponse> {
    Json(StatusResponse::ok("Server is running"))
}

/// Persist an analysis to every available backend.
///
/// Responds 200 even when nothing was saved; `saved_to` tells the caller
/// which backends accepted the write.
pub async fn save(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<Json<SaveRequest>, JsonRejection>,
) -> Result<Json<SaveResponse>, ApiError> {
    let Json(request) =
        body.map_err(|rejection| api_error(StatusCode::BAD_REQUEST, rejection.body_text()))?;
    let analysis = request.into_analysis(caller_id(&headers));
    let report = state.store.persist(&analysis).await;
    debug!("save finished (saved_to={:?})", report.saved_to);
    Ok(Json(SaveResponse {
        status: "ok".to_string(),
        message: "Data processed successfully".to_string(),
        saved_to: report.saved_to,
        document_id: report.document_id,
    }))
}

/// List analyses newest first with optional exact-match filters.
pub async fn list_analyses(
    State(state): State<Arc<AppState>>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<ListResponse>, ApiError> {
    let Query(params) =
        params.map_err(|rejection| api_error(StatusCode::BAD_REQUEST, rejection.body_text()))?;
    state.require_documents().await?;

    let mut query = AnalysisQuery::new(params.limit.unwrap_or(state.default_limit));
    if let Some(agent) = params.agent {
        query = query.with_agent(agent);
    }
    if let Some(analysis_type) = params.analysis_type {
        query = query.with_analysis_type(analysis_type);
    }
    if let Some(user_id) = params.user_id {
        query = query.with_user_id(user_id);
    }
    let analyses = state.store.list(&query).await;
    Ok(Json(ListResponse::new(analyses)))
}

pub async fn get_analysis(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<AnalysisResponse>, ApiError> {
    state.require_documents().await?;
    match state.store.get(&id).await {
        Some(analysis) => Ok(Json(AnalysisResponse::new(analysis))),
        None => Err(api_error(StatusCode::NOT_FOUND, "Analysis not found")),
    }
}

pub async fn delete_analysis(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<StatusResponse>, ApiError> {
    state.require_documents().await?;
    if state.store.delete(&id).await {
        info!("analysis deleted via API (id={id})");
        Ok(Json(StatusResponse::ok("Analysis deleted successfully")))
    } else {
        Err(api_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to delete analysis",
        ))
    }
}
