use axum::{
    extract::{rejection::JsonRejection, Query, RawQuery, State},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

use super::json_body;
use crate::error::{AppError, AppResult};
use crate::filter::{search_predicate, FilterParams, FilterRequest, ListingQuery, NumberInput};
use crate::listing::{self, ListingPage};
use crate::AppState;

const SEARCH_PAGE_SIZE: u32 = 10;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/events", get(filter_events_get).post(filter_events_post))
        .route("/search", get(search_events))
}

async fn run_filter(state: &AppState, params: &FilterParams) -> AppResult<ListingPage> {
    let request = FilterRequest::from_params(params, &state.config.listing);
    let query = request.build(state.clock.today());
    debug!(page = query.page, limit = query.limit, "filtering events");
    listing::fetch(state.events.as_ref(), &query).await
}

/// GET /api/events?category=&tags=&timeFilter=&startDate=&endDate=&location=&search=&page=&limit=
pub async fn filter_events_get(
    State(state): State<Arc<AppState>>,
    RawQuery(raw): RawQuery,
) -> AppResult<Json<serde_json::Value>> {
    let pairs: Vec<(String, String)> = serde_urlencoded::from_str(raw.as_deref().unwrap_or(""))
        .map_err(|e| AppError::validation(format!("Malformed query string: {e}")))?;
    let params = FilterParams::from_query_pairs(&pairs);
    let page = run_filter(&state, &params).await?;

    Ok(Json(json!({
        "success": true,
        "data": {
            "events": page.events,
            "pagination": page.pagination,
            "filters": params,
        }
    })))
}

/// POST /api/events с теми же полями в JSON.
pub async fn filter_events_post(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<FilterParams>, JsonRejection>,
) -> AppResult<Json<serde_json::Value>> {
    let params = json_body(payload)?;
    let page = run_filter(&state, &params).await?;

    Ok(Json(json!({
        "success": true,
        "data": {
            "events": page.events,
            "pagination": page.pagination,
            "appliedFilters": params,
        }
    })))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

fn number(raw: &Option<String>) -> Option<i64> {
    raw.clone().map(NumberInput::Text).and_then(|n| n.value())
}

/// GET /api/search?q=&page=&limit=
pub async fn search_events(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchQuery>,
) -> AppResult<Response> {
    let term = params
        .q
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| AppError::validation("Query parameter q is required"))?;

    let page = number(&params.page).unwrap_or(1).clamp(1, u32::MAX as i64) as u32;
    let max = state.config.listing.max_page_size.max(1) as i64;
    let limit = number(&params.limit)
        .unwrap_or(SEARCH_PAGE_SIZE as i64)
        .clamp(1, max) as u32;

    // 1. Кеш: поколение фиксируется до похода в хранилище
    let mut lookup = state.cache.get_search(term, page, limit).await;
    if let Some(cached) = lookup.page.take() {
        return Ok(search_response(cached, "HIT"));
    }

    // 2. Промах: идем в хранилище
    let query = ListingQuery::new(search_predicate(term), page, limit);
    let result = listing::fetch(state.events.as_ref(), &query).await?;

    // 3. Кладем в кеш под тем же поколением
    state.cache.put_search(&lookup, term, page, limit, &result).await;
    Ok(search_response(result, "MISS"))
}

fn search_response(page: ListingPage, cache_status: &'static str) -> Response {
    let mut response = (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "data": {
                "events": page.events,
                "pagination": page.pagination,
            }
        })),
    )
        .into_response();
    response
        .headers_mut()
        .insert("x-cache", HeaderValue::from_static(cache_status));
    response
}
