//! HTTP API for the ciphertext blob host.
//!
//! The host never sees keys or plaintext. It stores whatever bytes clients
//! upload under their BLAKE3 digest, so a fetcher can verify a download
//! against the `contentDigest` carried in a remote attachment pointer.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, State},
    http::{header, Method},
    middleware,
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use colis_shared::Digest;

use crate::blob_store::BlobStore;
use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::rate_limit::{rate_limit_middleware, RateLimiter};

#[derive(Clone)]
pub struct AppState {
    pub blob_store: Arc<BlobStore>,
    pub rate_limiter: RateLimiter,
    pub config: Arc<ServerConfig>,
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/info", get(server_info))
        .route("/blob", put(blob_upload))
        .route("/blob/:digest", get(blob_download).delete(blob_delete))
        .layer(DefaultBodyLimit::max(state.config.max_blob_size))
        .layer(middleware::from_fn_with_state(
            state.rate_limiter.clone(),
            rate_limit_middleware,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Serialize)]
struct ServerInfoResponse {
    name: String,
    version: &'static str,
    max_blob_size: usize,
    blob_count: usize,
}

#[derive(Serialize)]
struct BlobUploadResponse {
    digest: String,
    size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<String>,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn server_info(
    State(state): State<AppState>,
) -> Result<Json<ServerInfoResponse>, ServerError> {
    let blob_count = state.blob_store.list_blobs().await?.len();
    Ok(Json(ServerInfoResponse {
        name: state.config.instance_name.clone(),
        version: env!("CARGO_PKG_VERSION"),
        max_blob_size: state.config.max_blob_size,
        blob_count,
    }))
}

async fn blob_upload(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<BlobUploadResponse>, ServerError> {
    let id = state.blob_store.store_blob(&body).await?;
    let digest = id.to_hex();

    info!(digest = %id.short(), size = body.len(), "Blob uploaded via API");

    Ok(Json(BlobUploadResponse {
        url: state.config.blob_url(&digest),
        digest,
        size: body.len(),
    }))
}

async fn blob_download(
    State(state): State<AppState>,
    Path(digest): Path<String>,
) -> Result<impl IntoResponse, ServerError> {
    let id = parse_digest(&digest)?;
    let data = state.blob_store.get_blob(&id).await?;
    Ok(([(header::CONTENT_TYPE, "application/octet-stream")], data))
}

async fn blob_delete(
    State(state): State<AppState>,
    Path(digest): Path<String>,
) -> Result<Json<serde_json::Value>, ServerError> {
    let id = parse_digest(&digest)?;
    state.blob_store.delete_blob(&id).await?;
    Ok(Json(serde_json::json!({ "deleted": true })))
}

/// Path digests must be exactly 64 hex chars, which also keeps them path-safe.
fn parse_digest(hex: &str) -> Result<Digest, ServerError> {
    Digest::from_hex(hex.trim())
        .map_err(|e| ServerError::BadRequest(format!("Invalid digest '{hex}': {e}")))
}

pub async fn serve(state: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
