//! # Storage service (C7)
//!
//! The authenticated HTTP surface over the zone registry, fronting
//! [`ZoneRegistry`] with the endpoints this service exposes.

pub mod error;

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;

use crate::registry::ZoneRegistry;
use crate::sanitize::sanitize;
use crate::store::entity::Entity;
use crate::token::TokenCodec;
use crate::blacklist::Blacklist;

use error::ServiceError;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ZoneRegistry>,
    pub token_codec: Arc<TokenCodec>,
    pub blacklist: Arc<Blacklist>,
}

/// Build the service router. `X-API-Key` authorization is enforced inline
/// in each handler rather than via a separate middleware layer, since every
/// route needs the decoded token's principal id for ownership checks.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/get_max_index/:zone", get(get_max_index))
        .route("/set/:zone", post(set_entity))
        .route("/get/:zone/:index", get(get_entity_latest))
        .route("/get/:zone/:index/:iter", get(get_entity_iter))
        .route("/owned/:zone/:principal", get(get_owned))
        .route("/expand", post(expand))
        .route("/expandall", post(expand_all))
        .route("/range/:zone", post(range_query))
        .route("/health", get(health))
        .route("/health/:zone", get(health_zone))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<String, ServiceError> {
    let key = headers
        .get("X-API-Key")
        .and_then(|v| v.to_str().ok())
        .ok_or(ServiceError::Unauthorized)?;

    let decoded = state.token_codec.decode(key);
    let blacklist = &state.blacklist;
    if !decoded.is_authorized(|id| blacklist.contains(id)) {
        return Err(ServiceError::Unauthorized);
    }
    decoded.parts.first().cloned().ok_or(ServiceError::Unauthorized)
}

#[derive(Serialize)]
struct MaxIndexResponse {
    max_index: Option<i64>,
}

async fn get_max_index(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(zone): Path<i64>,
) -> Result<impl IntoResponse, ServiceError> {
    authorize(&state, &headers)?;
    let store = state.registry.get(zone)?;
    let max_index = store.get_max_index().await?;
    Ok(Json(MaxIndexResponse { max_index }))
}

#[derive(Serialize)]
struct SetResponse {
    status: &'static str,
    id: String,
    index: i64,
    entities: Vec<Entity>,
    is_latest_on_file: bool,
}

async fn set_entity(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(zone): Path<i64>,
    Json(mut entity): Json<Entity>,
) -> Result<impl IntoResponse, ServiceError> {
    authorize(&state, &headers)?;
    let store = state.registry.get(zone)?;

    let index = match entity.index {
        Some(index) => index,
        None => store.allocate_index().await?,
    };
    entity.index = Some(index);
    entity.name = sanitize(&entity.name, None);
    entity.description = sanitize(&entity.description, None);

    store.set(&entity).await?;
    let stack = store.get_iters_of_one(index).await?;
    let is_latest_on_file = stack
        .iter()
        .map(|e| e.iter)
        .max()
        .map(|max| max == entity.iter)
        .unwrap_or(false);

    Ok(Json(SetResponse {
        status: "ok",
        id: format!("{index}v{iter}", iter = entity.iter),
        index,
        entities: stack,
        is_latest_on_file,
    }))
}

async fn get_entity_latest(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((zone, index)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, ServiceError> {
    authorize(&state, &headers)?;
    let store = state.registry.get(zone)?;
    let entity = store
        .get(index, None)
        .await?
        .ok_or(ServiceError::NotFound { index, iter: None })?;
    Ok(Json(entity))
}

async fn get_entity_iter(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((zone, index, iter)): Path<(i64, i64, i64)>,
) -> Result<impl IntoResponse, ServiceError> {
    authorize(&state, &headers)?;
    let store = state.registry.get(zone)?;
    let entity = store
        .get(index, Some(iter))
        .await?
        .ok_or(ServiceError::NotFound { index, iter: Some(iter) })?;
    Ok(Json(entity))
}

#[derive(Deserialize)]
struct OwnedQuery {
    after: Option<i64>,
    #[serde(default = "default_limit")]
    page_size: i64,
    #[serde(default)]
    include_totals: bool,
}

#[derive(Serialize)]
struct OwnedResponse {
    entities: Vec<Entity>,
    has_more: bool,
    total: Option<i64>,
}

async fn get_owned(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((zone, principal)): Path<(i64, String)>,
    Query(query): Query<OwnedQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    authorize(&state, &headers)?;
    let store = state.registry.get(zone)?;
    let page = store
        .get_by_ownership_cursor(&principal, query.after, query.page_size, query.include_totals)
        .await?;
    Ok(Json(OwnedResponse {
        entities: page.entities,
        has_more: page.has_more,
        total: page.total,
    }))
}

#[derive(Deserialize)]
struct ExpandRequest {
    x: i64,
    y: i64,
    z: i64,
    i: Option<i64>,
}

async fn expand(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ExpandRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    authorize(&state, &headers)?;
    let store = state.registry.get(req.z)?;
    let Some(index) = store.find_index_at(req.x, req.y).await? else {
        return Ok(Json(Vec::<Entity>::new()));
    };
    let mut stack = store.get_iters_of_one(index).await?;
    if let Some(bound) = req.i {
        stack.retain(|e| e.iter <= bound);
    }
    Ok(Json(stack))
}

async fn expand_all(
    state: State<AppState>,
    headers: HeaderMap,
    req: Json<ExpandRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    expand(state, headers, Json(ExpandRequest { i: None, ..req.0 })).await
}

#[derive(Deserialize)]
struct RangeRequest {
    x_min: i64,
    x_max: i64,
    y_min: i64,
    y_max: i64,
    #[serde(default = "default_limit")]
    limit: i64,
}

fn default_limit() -> i64 {
    64
}

async fn range_query(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(zone): Path<i64>,
    Json(req): Json<RangeRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    authorize(&state, &headers)?;
    let store = state.registry.get(zone)?;
    let rows = store
        .range_query(req.x_min, req.x_max, req.y_min, req.y_max, req.limit)
        .await?;
    Ok(Json(rows))
}

#[derive(Serialize)]
struct ZoneHealth {
    zone: i64,
    started: i64,
    flushes: u64,
    writes: u64,
    cache_hits: u64,
    cache_misses: u64,
    queue_depth: usize,
}

async fn health() -> impl IntoResponse {
    StatusCode::OK
}

async fn health_zone(
    State(state): State<AppState>,
    Path(zone): Path<i64>,
) -> Result<impl IntoResponse, ServiceError> {
    let store = state.registry.get(zone)?;
    let metrics = store.metrics();
    let queue_depth = store.queue_depth().await?;
    Ok(Json(ZoneHealth {
        zone,
        started: store.opened_at(),
        flushes: metrics.flushes,
        writes: metrics.writes,
        cache_hits: metrics.cache_hits,
        cache_misses: metrics.cache_misses,
        queue_depth,
    }))
}
