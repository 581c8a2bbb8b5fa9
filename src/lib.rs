//! # TextBlast-RS
//!
//! Batch SMS dispatch service with live progress streaming. Accepts a
//! message plus a recipient list, fans the sends out to the provider with
//! bounded concurrency, streams per-recipient progress over server-sent
//! events, and keeps a durable per-recipient outcome log.
//!
//! ## Features
//!
//! - **Bounded fan-out**: concurrent provider calls capped per batch, with
//!   an optional messages-per-second pacer
//! - **Live progress**: `connected` / `status` / `complete` events per
//!   batch over SSE, deduplicated per recipient
//! - **Durable log**: batch summary and per-recipient outcome rows written
//!   through SeaORM, idempotent under repeated flushes
//! - **Failure isolation**: one recipient's provider error never aborts
//!   the rest; timeouts end with partial results persisted, never lost
//! - **Delivery receipts**: Twilio-style webhook flips `sent` outcomes to
//!   `delivered` after the fact
//!
//! ## Quick Start - Embedded Dispatcher
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use textblast_rs::config::StorageConfig;
//! use textblast_rs::core::batch::{DispatchRequest, Dispatcher, DispatcherConfig, Recipient};
//! use textblast_rs::core::providers::{TwilioClient, TwilioConfig};
//! use textblast_rs::storage::StorageLayer;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let storage = Arc::new(StorageLayer::new(&StorageConfig::default()).await?);
//!     storage.migrate().await?;
//!
//!     let provider = Arc::new(TwilioClient::new(TwilioConfig::from_env()?)?);
//!     let dispatcher = Dispatcher::new(provider, storage, DispatcherConfig::new());
//!
//!     let request = DispatchRequest::new(
//!         "Pancake breakfast moved to 9am",
//!         vec![Recipient::new("+18015551234")],
//!     );
//!
//!     let (message_id, mut progress) = dispatcher.submit_with_stream(request).await?;
//!     println!("dispatched batch {message_id}");
//!     while let Some(event) = progress.recv().await? {
//!         println!("{event:?}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Server Mode
//!
//! ```rust,no_run
//! use textblast_rs::config::Config;
//! use textblast_rs::server::HttpServer;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_file("config/dispatcher.yaml").await?;
//!     HttpServer::new(config).await?.start().await?;
//!     Ok(())
//! }
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_inception)]

// Public module exports
pub mod config;
pub mod core;
pub mod server;
pub mod storage;
pub mod utils;

// Re-export main types
pub use config::Config;
pub use utils::error::{DispatchError, Result};

// Export the batch dispatch surface
pub use core::batch::{
    BatchStatus, BatchSummary, DispatchRequest, Dispatcher, DispatcherConfig, MessageLogEntry,
    Owner, OwnerKind, ProgressEvent, ProgressStream, Recipient,
};

// Export provider types
pub use core::providers::{ProviderError, SmsProvider, TwilioClient, TwilioConfig};

// Version information
/// Current version of the crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
/// Name of the crate
pub const NAME: &str = env!("CARGO_PKG_NAME");
/// Description of the crate
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
