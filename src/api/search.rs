use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use super::ApiError;
use crate::models::Entry;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    pub q: String,
    pub count: usize,
    pub results: Vec<Entry>,
}

/// GET /api/search - 词条搜索
pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<SearchResponse>, ApiError> {
    let q = params.q.unwrap_or_default();
    if q.is_empty() {
        return Err(ApiError::BadRequest("Query parameter 'q' is required".to_string()));
    }

    let limit = params.limit.unwrap_or(state.default_limit);
    if limit == 0 || limit > state.max_limit {
        return Err(ApiError::BadRequest(format!(
            "limit must be between 1 and {}",
            state.max_limit
        )));
    }

    let results = state.engine.search(&q, limit).await?;
    Ok(Json(SearchResponse {
        q,
        count: results.len(),
        results,
    }))
}

/// GET /api/entry/:id - 单个词条
pub async fn get_entry(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Entry>, ApiError> {
    state
        .engine
        .get(id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("Entry not found"))
}
