//! # colis-server
//!
//! Blob host for remote attachments.
//!
//! Clients encrypt attachments locally and upload only ciphertext. The server
//! stores each blob under its BLAKE3 digest and serves it back by digest, so
//! anything it returns can be checked against the pointer that references it.
//!
//! - **REST API** (axum): health, instance info, blob upload/download/delete
//! - **Per-IP rate limiting** to protect against abuse

pub mod api;
pub mod blob_store;
pub mod config;
pub mod error;
pub mod rate_limit;
