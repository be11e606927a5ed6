//! # colis-remote
//!
//! Large-path attachment delivery: the ciphertext lives in external
//! storage, a pointer travels with the message, and receivers fetch,
//! verify and decrypt through [`RemoteAttachmentCodec`].
//!
//! Storage is injected through the [`Fetcher`] and [`Uploader`] traits.
//! [`HttpFetcher`]/[`HttpUploader`] cover HTTPS hosts; [`MemoryStore`] is
//! an in-process stand-in.

pub mod codec;
pub mod config;
pub mod fetch;
pub mod http;
pub mod memory;

pub use codec::RemoteAttachmentCodec;
pub use config::FetchConfig;
pub use fetch::{Fetcher, Uploader};
pub use http::{HttpFetcher, HttpUploader};
pub use memory::MemoryStore;
pub use reqwest::Url;
pub use tokio_util::sync::CancellationToken;
