//! # outpost-queue
//!
//! Durable queue of writes captured while the device is offline.
//!
//! Requests are persisted through the same [`SecureStore`](outpost_auth::SecureStore)
//! that holds credentials, always read back in creation order, and replayed
//! by [`OfflineQueueManager::drain`] once connectivity returns.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use outpost_auth::FileSecureStore;
//! use outpost_client::RequestMethod;
//! use outpost_queue::{DrainPolicy, OfflineQueueManager, QueuedRequest, ReplayStatus};
//!
//! let queue = OfflineQueueManager::new(Arc::new(FileSecureStore::new()?));
//! queue
//!     .enqueue(QueuedRequest::new(
//!         RequestMethod::Post,
//!         "/messages",
//!         Some(serde_json::json!({"text": "sent from the subway"})),
//!         None,
//!         chrono::Utc::now(),
//!     ))
//!     .await?;
//!
//! let report = queue
//!     .drain(DrainPolicy::BestEffort, |request| async move {
//!         println!("replaying {} {}", request.method(), request.path());
//!         ReplayStatus::Delivered
//!     })
//!     .await?;
//! ```

mod error;
mod manager;
mod request;

pub use error::{Error, ErrorKind, Result};
pub use manager::{DrainPolicy, DrainReport, OfflineQueueManager, ReplayStatus, DEFAULT_MAX_QUEUE_SIZE};
pub use request::QueuedRequest;
