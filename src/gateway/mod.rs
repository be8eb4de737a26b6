//! # Edge gateway (C8)
//!
//! The authenticated, rate-limited HTTP surface clients actually talk to.
//! It never touches SQLite directly: every read or write is a call into the
//! storage service (C7), decorated with genesis fill, the mint/iterate
//! state machine, and the render grid assembly.

pub mod client;
pub mod error;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::blacklist::Blacklist;
use crate::ratelimit::{buckets, RateLimiter};
use crate::store::entity::Entity;
use crate::token::TokenCodec;
use crate::zone::synth;
use crate::zone::tarot;

use client::{RangeBounds, StorageClient};
use error::GatewayError;

#[derive(Clone)]
pub struct AppState {
    pub client: StorageClient,
    pub token_codec: Arc<TokenCodec>,
    pub blacklist: Arc<Blacklist>,
    pub limiter: Arc<RateLimiter>,
    pub zones: Vec<i64>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/render", post(render))
        .route("/api/render/one", post(render_one))
        .route("/api/render/areas", post(render_areas))
        .route("/api/newiter", post(new_iter))
        .route("/api/mint", post(mint))
        .route("/api/CheckAPIKey", post(check_api_key))
        .route("/api/APIKey", post(issue_api_key))
        .route("/api/APIKey/renew", post(renew_api_key))
        .route("/api/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn client_ip(headers: &HeaderMap, addr: Option<SocketAddr>) -> String {
    headers
        .get("X-Forwarded-For")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .or_else(|| addr.map(|a| a.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

/// Decode the bearer token and admit the request against both the per-key
/// and per-IP buckets named by `ip_bucket`. Returns the caller's principal
/// id (the first token part).
fn authenticate_and_admit(
    state: &AppState,
    headers: &HeaderMap,
    addr: Option<SocketAddr>,
    ip_bucket: &'static str,
) -> Result<String, GatewayError> {
    let key = headers
        .get("X-API-Key")
        .and_then(|v| v.to_str().ok())
        .ok_or(GatewayError::Unauthorized)?;

    let decoded = state.token_codec.decode(key);
    if !decoded.is_authorized(|id| state.blacklist.contains(id)) {
        return Err(GatewayError::Unauthorized);
    }

    if !state.limiter.admit(buckets::API_KEY, key) {
        return Err(GatewayError::RateLimited);
    }
    let ip = client_ip(headers, addr);
    if !state.limiter.admit(ip_bucket, &ip) {
        return Err(GatewayError::RateLimited);
    }

    decoded.parts.first().cloned().ok_or(GatewayError::Unauthorized)
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Resolve the full iter stack at `(x, y, zone)`, falling back to the
/// unpersisted genesis entity (marked `exists = false`) when the backend
/// has never seen the cell.
async fn fetch_stack_or_genesis(
    state: &AppState,
    x: i64,
    y: i64,
    zone: i64,
) -> Result<Vec<Entity>, GatewayError> {
    let stack = state.client.expand_all(x, y, zone).await?;
    if stack.is_empty() {
        Ok(vec![synth::genesis_entity(x, y, zone, now())])
    } else {
        Ok(stack)
    }
}

#[derive(Deserialize)]
struct CellRequest {
    x: i64,
    y: i64,
    z: i64,
}

async fn render_one(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(req): Json<CellRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    authenticate_and_admit(&state, &headers, Some(addr), buckets::IP_RENDER_ONE)?;
    let stack = fetch_stack_or_genesis(&state, req.x, req.y, req.z).await?;
    let latest = stack.into_iter().max_by_key(|e| e.iter).expect("non-empty stack");
    Ok(Json(latest))
}

#[derive(Deserialize)]
struct RenderAreasRequest {
    cells: Vec<CellRequest>,
}

async fn render_areas(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(req): Json<RenderAreasRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    authenticate_and_admit(&state, &headers, Some(addr), buckets::IP_DEFAULT)?;
    let mut out = Vec::with_capacity(req.cells.len());
    for cell in req.cells {
        let stack = fetch_stack_or_genesis(&state, cell.x, cell.y, cell.z).await?;
        out.push(stack.into_iter().max_by_key(|e| e.iter).expect("non-empty stack"));
    }
    Ok(Json(out))
}

#[derive(Deserialize)]
struct RenderRequest {
    z: i64,
    x_min: i64,
    x_max: i64,
    y_min: i64,
    y_max: i64,
}

async fn render(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(req): Json<RenderRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    authenticate_and_admit(&state, &headers, Some(addr), buckets::IP_DEFAULT)?;
    if !state.zones.contains(&req.z) {
        return Err(GatewayError::BackendError(format!("zone {} not registered", req.z)));
    }

    let rows = state
        .client
        .range_query(
            req.z,
            &RangeBounds {
                x_min: req.x_min,
                x_max: req.x_max,
                y_min: req.y_min,
                y_max: req.y_max,
                limit: 10_000,
            },
        )
        .await?;

    let mut grid = Vec::new();
    for x in req.x_min..=req.x_max {
        let mut row = Vec::new();
        for y in req.y_min..=req.y_max {
            let found = rows.iter().find(|e| e.position_x == x && e.position_y == y).cloned();
            row.push(found.unwrap_or_else(|| synth::genesis_entity(x, y, req.z, now())));
        }
        grid.push(row);
    }
    Ok(Json(grid))
}

#[derive(Deserialize)]
struct MintRequest {
    x: i64,
    y: i64,
    z: i64,
    #[serde(default)]
    i: i64,
}

async fn mint(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(req): Json<MintRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let caller = authenticate_and_admit(&state, &headers, Some(addr), buckets::IP_MINT_ITER_RENEW)?;

    let stack = fetch_stack_or_genesis(&state, req.x, req.y, req.z).await?;
    let mut target = stack
        .iter()
        .find(|e| e.iter == req.i)
        .cloned()
        .unwrap_or_else(|| synth::genesis_entity(req.x, req.y, req.z, now()));

    if let Some(owner) = &target.ownership {
        if owner != &caller {
            return Err(GatewayError::OwnershipViolation(
                "Cell is already owned by another principal.".to_string(),
            ));
        }
    }
    if target.minted {
        return Err(GatewayError::OwnershipViolation(
            "Cell has already been minted.".to_string(),
        ));
    }

    target.ownership = Some(caller);
    target.minted = true;
    if req.i == 0 {
        target.state = 1;
    }
    target.exists = true;

    let resp = state.client.set(req.z, &target).await?;
    Ok(Json(resp.entities))
}

async fn new_iter(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(req): Json<CellRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let caller = authenticate_and_admit(&state, &headers, Some(addr), buckets::IP_MINT_ITER_RENEW)?;

    let stack = state.client.expand_all(req.x, req.y, req.z).await?;
    let genesis_row = stack
        .iter()
        .find(|e| e.iter == 0)
        .cloned()
        .ok_or_else(|| GatewayError::OwnershipViolation("Cell has not been minted yet.".to_string()))?;

    if genesis_row.ownership.as_deref() != Some(caller.as_str()) {
        return Err(GatewayError::OwnershipViolation(
            "Only the owner of genesis may create new iterations.".to_string(),
        ));
    }

    let next_iter = stack.len() as i64;
    let last_iter = stack.iter().map(|e| e.iter).max().unwrap_or(0);
    let name = synth::tarot_name_for_iter(req.x, req.y, req.z, last_iter);
    let description = tarot::meaning(name);

    let mut new_entity = synth::genesis_entity(req.x, req.y, req.z, now());
    new_entity.index = genesis_row.index;
    new_entity.uuid = genesis_row.uuid.clone();
    new_entity.iter = next_iter;
    new_entity.ownership = Some(caller);
    new_entity.minted = true;
    new_entity.state = 2;
    new_entity.name = name.to_string();
    new_entity.description = description.to_string();
    new_entity.exists = true;

    let resp = state.client.set(req.z, &new_entity).await?;
    Ok(Json(resp.entities))
}

#[derive(Deserialize)]
struct CheckApiKeyRequest {
    api_key: String,
}

#[derive(Serialize)]
struct CheckApiKeyResponse {
    valid: bool,
}

async fn check_api_key(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(req): Json<CheckApiKeyRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let ip = client_ip(&headers, Some(addr));
    if !state.limiter.admit(buckets::IP_CHECK_KEY, &ip) {
        return Err(GatewayError::RateLimited);
    }
    let decoded = state.token_codec.decode(&req.api_key);
    let valid = decoded.is_authorized(|id| state.blacklist.contains(id));
    Ok(Json(CheckApiKeyResponse { valid }))
}

#[derive(Deserialize)]
struct IssueApiKeyRequest {
    parts: Vec<String>,
}

#[derive(Serialize)]
struct IssueApiKeyResponse {
    api_key: String,
}

async fn issue_api_key(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(req): Json<IssueApiKeyRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let ip = client_ip(&headers, Some(addr));
    if !state.limiter.admit(buckets::CHAT_TOKEN_ISSUANCE, &ip) {
        return Err(GatewayError::RateLimited);
    }
    let api_key = state.token_codec.issue(&req.parts);
    Ok(Json(IssueApiKeyResponse { api_key }))
}

async fn renew_api_key(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, GatewayError> {
    let ip = client_ip(&headers, Some(addr));
    if !state.limiter.admit(buckets::IP_MINT_ITER_RENEW, &ip) {
        return Err(GatewayError::RateLimited);
    }
    let key = headers
        .get("X-API-Key")
        .and_then(|v| v.to_str().ok())
        .ok_or(GatewayError::Unauthorized)?;
    let decoded = state.token_codec.decode(key);
    if !decoded.is_authorized(|id| state.blacklist.contains(id)) {
        return Err(GatewayError::Unauthorized);
    }
    let api_key = state.token_codec.issue(&decoded.parts);
    Ok(Json(IssueApiKeyResponse { api_key }))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let zone = state.zones.first().copied().unwrap_or(0);
    match state.client.get_max_index(zone).await {
        Ok(max_index) => Json(json!({
            "message": "OK",
            "db_health": { "reachable": true, "max_index": max_index },
        })),
        Err(e) => {
            log::warn!("gateway health check: backend unreachable: {e}");
            Json(json!({
                "message": "ERROR",
                "db_health": { "reachable": false },
            }))
        }
    }
}
