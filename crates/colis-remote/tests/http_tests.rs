//! HTTP fetch/upload against an in-process mock host and the real
//! colis-server router.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use tempfile::TempDir;
use tokio::sync::RwLock;

use colis_remote::{
    FetchConfig, Fetcher, HttpFetcher, HttpUploader, RemoteAttachmentCodec, Uploader, Url,
};
use colis_shared::crypto::digest;
use colis_server::api::{build_router, AppState};
use colis_server::blob_store::BlobStore;
use colis_server::config::ServerConfig;
use colis_server::rate_limit::RateLimiter;
use colis_shared::{Attachment, AttachmentError, FetchError};

type Blobs = Arc<RwLock<HashMap<String, Bytes>>>;

async fn put_blob(State(blobs): State<Blobs>, body: Bytes) -> Json<serde_json::Value> {
    let hex = digest(&body).to_hex();
    let size = body.len();
    blobs.write().await.insert(hex.clone(), body);
    Json(serde_json::json!({ "digest": hex, "size": size }))
}

async fn get_blob(
    State(blobs): State<Blobs>,
    Path(hex): Path<String>,
) -> Result<Bytes, StatusCode> {
    blobs
        .read()
        .await
        .get(&hex)
        .cloned()
        .ok_or(StatusCode::NOT_FOUND)
}

async fn broken() -> StatusCode {
    StatusCode::INTERNAL_SERVER_ERROR
}

async fn slow() -> &'static str {
    tokio::time::sleep(Duration::from_secs(5)).await;
    "late"
}

async fn spawn_host() -> (SocketAddr, Blobs) {
    let blobs: Blobs = Arc::default();
    let app = Router::new()
        .route("/blob", put(put_blob))
        .route("/blob/:digest", get(get_blob))
        .route("/broken", get(broken))
        .route("/slow", get(slow))
        .with_state(blobs.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, blobs)
}

/// Run the real blob host router. `public_host` overrides the host used in
/// the advertised `PUBLIC_BASE_URL`, keeping the bound port.
async fn spawn_colis_server(public_host: Option<&str>) -> (SocketAddr, TempDir) {
    let dir = TempDir::new().unwrap();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let config = ServerConfig {
        blob_storage_path: dir.path().to_path_buf(),
        public_base_url: public_host.map(|host| format!("http://{host}:{}", addr.port())),
        ..ServerConfig::default()
    };
    let blob_store = BlobStore::new(config.blob_storage_path.clone(), config.max_blob_size)
        .await
        .unwrap();
    let state = AppState {
        blob_store: Arc::new(blob_store),
        rate_limiter: RateLimiter::from_config(&config),
        config: Arc::new(config),
    };

    tokio::spawn(async move {
        axum::serve(listener, build_router(state)).await.unwrap();
    });
    (addr, dir)
}

fn dev_config() -> FetchConfig {
    FetchConfig::default().with_allow_http(true)
}

#[tokio::test]
async fn test_upload_then_load_over_http() {
    let (addr, _blobs) = spawn_host().await;
    let config = dev_config();
    let uploader = HttpUploader::new(&format!("http://{addr}"), &config).unwrap();
    let codec = RemoteAttachmentCodec::with_config(HttpFetcher::new(&config).unwrap(), &config);

    let attachment = Attachment::new("a.png", "image/png", vec![0u8; 10]);
    let pointer = codec.upload_and_point(&attachment, &uploader).await.unwrap();

    assert_eq!(pointer.scheme, "http://");
    assert!(pointer
        .url
        .ends_with(&format!("/blob/{}", pointer.content_digest.to_hex())));
    assert_eq!(codec.load(&pointer).await.unwrap(), attachment);
}

#[tokio::test]
async fn test_tampered_blob_over_http() {
    let (addr, blobs) = spawn_host().await;
    let config = dev_config();
    let uploader = HttpUploader::new(&format!("http://{addr}"), &config).unwrap();
    let codec = RemoteAttachmentCodec::with_config(HttpFetcher::new(&config).unwrap(), &config);

    let attachment = Attachment::new("a.png", "image/png", vec![0u8; 10]);
    let pointer = codec.upload_and_point(&attachment, &uploader).await.unwrap();

    {
        let mut blobs = blobs.write().await;
        let stored = blobs.get_mut(&pointer.content_digest.to_hex()).unwrap();
        let mut bytes = stored.to_vec();
        bytes[0] ^= 0xff;
        *stored = Bytes::from(bytes);
    }

    assert!(matches!(
        codec.load(&pointer).await,
        Err(AttachmentError::Integrity { .. })
    ));
}

#[tokio::test]
async fn test_http_refused_without_opt_in() {
    let (addr, _blobs) = spawn_host().await;
    let uploader = HttpUploader::new(&format!("http://{addr}"), &dev_config()).unwrap();
    let codec = RemoteAttachmentCodec::new(HttpFetcher::new(&FetchConfig::default()).unwrap());

    let attachment = Attachment::new("a.png", "image/png", vec![0u8; 10]);
    let pointer = codec.upload_and_point(&attachment, &uploader).await.unwrap();

    assert!(matches!(
        codec.load(&pointer).await,
        Err(AttachmentError::Fetch(FetchError::UnsupportedScheme(_)))
    ));
}

#[tokio::test]
async fn test_status_mapping() {
    let (addr, _blobs) = spawn_host().await;
    let fetcher = HttpFetcher::new(&dev_config()).unwrap();

    let missing = Url::parse(&format!("http://{addr}/blob/{}", "00".repeat(32))).unwrap();
    assert!(matches!(
        fetcher.fetch(&missing).await,
        Err(FetchError::NotFound(_))
    ));

    let broken = Url::parse(&format!("http://{addr}/broken")).unwrap();
    assert!(matches!(
        fetcher.fetch(&broken).await,
        Err(FetchError::Status { status: 500, .. })
    ));
}

#[tokio::test]
async fn test_oversized_blob_rejected() {
    let (addr, _blobs) = spawn_host().await;
    let config = dev_config().with_max_bytes(64);
    let uploader = HttpUploader::new(&format!("http://{addr}"), &config).unwrap();
    let fetcher = HttpFetcher::new(&config).unwrap();

    let body = Bytes::from(vec![3u8; 256]);
    let url = uploader.upload(body.clone(), &digest(&body)).await.unwrap();

    assert!(matches!(
        fetcher.fetch(&url).await,
        Err(FetchError::TooLarge { max: 64, .. })
    ));
}

#[tokio::test]
async fn test_slow_host_times_out() {
    let (addr, _blobs) = spawn_host().await;
    let config = dev_config().with_timeout(Duration::from_millis(100));
    let fetcher = HttpFetcher::new(&config).unwrap();

    let slow = Url::parse(&format!("http://{addr}/slow")).unwrap();
    assert!(matches!(
        fetcher.fetch(&slow).await,
        Err(FetchError::Timeout(_))
    ));
}

#[tokio::test]
async fn test_upload_digest_mismatch_rejected() {
    let (addr, _blobs) = spawn_host().await;
    let uploader = HttpUploader::new(&format!("http://{addr}"), &dev_config()).unwrap();

    let body = Bytes::from_static(b"ciphertext");
    let wrong = digest(b"something else");

    assert!(matches!(
        uploader.upload(body, &wrong).await,
        Err(FetchError::Upload(_))
    ));
}

#[tokio::test]
async fn test_roundtrip_through_colis_server() {
    let (addr, _dir) = spawn_colis_server(None).await;
    let config = dev_config();
    let uploader = HttpUploader::new(&format!("http://{addr}"), &config).unwrap();
    let codec = RemoteAttachmentCodec::with_config(HttpFetcher::new(&config).unwrap(), &config);

    let attachment = Attachment::new("report.pdf", "application/pdf", vec![9u8; 64 * 1024]);
    let pointer = codec.upload_and_point(&attachment, &uploader).await.unwrap();

    assert_eq!(
        pointer.url,
        format!("http://{addr}/blob/{}", pointer.content_digest.to_hex())
    );
    assert_eq!(codec.load(&pointer).await.unwrap(), attachment);
}

#[tokio::test]
async fn test_colis_server_public_url_used_in_pointer() {
    let (addr, _dir) = spawn_colis_server(Some("localhost")).await;
    let config = dev_config();
    let uploader = HttpUploader::new(&format!("http://{addr}"), &config).unwrap();
    let codec = RemoteAttachmentCodec::with_config(HttpFetcher::new(&config).unwrap(), &config);

    let attachment = Attachment::new("a.png", "image/png", vec![0u8; 10]);
    let pointer = codec.upload_and_point(&attachment, &uploader).await.unwrap();

    assert_eq!(
        pointer.url,
        format!(
            "http://localhost:{}/blob/{}",
            addr.port(),
            pointer.content_digest.to_hex()
        )
    );
    assert_eq!(pointer.scheme, "http://");
}

#[tokio::test]
async fn test_colis_server_missing_blob_maps_to_not_found() {
    let (addr, _dir) = spawn_colis_server(None).await;
    let fetcher = HttpFetcher::new(&dev_config()).unwrap();

    let missing = Url::parse(&format!("http://{addr}/blob/{}", "ab".repeat(32))).unwrap();
    assert!(matches!(
        fetcher.fetch(&missing).await,
        Err(FetchError::NotFound(_))
    ));
}
