//! Durable offline queue.
//!
//! The whole queue is one JSON array stored under
//! [`OFFLINE_QUEUE_KEY`](outpost_auth::OFFLINE_QUEUE_KEY). Every mutation
//! is a read-modify-compare-and-swap on that blob, so managers sharing a
//! store never clobber each other's writes.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use outpost_auth::{SecureStore, OFFLINE_QUEUE_KEY};

use crate::error::{Error, ErrorKind, Result};
use crate::request::QueuedRequest;

/// Default maximum number of pending requests.
pub const DEFAULT_MAX_QUEUE_SIZE: usize = 1000;

/// Compare-and-swap attempts before giving up on a mutation.
const MAX_CAS_ATTEMPTS: u32 = 16;

/// What to do when a replayed request fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DrainPolicy {
    /// Keep going; failed entries stay queued in place.
    #[default]
    BestEffort,
    /// Stop at the first failure.
    StopOnFailure,
}

/// Result of replaying one queued request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplayStatus {
    /// The backend accepted it; the entry is removed.
    Delivered,
    /// The replay failed; the entry stays queued.
    Failed(String),
    /// Replay is no longer possible (e.g. connectivity dropped); stop the
    /// drain without counting a failure.
    Interrupted,
}

/// Summary of one drain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Requests delivered and removed.
    pub replayed: usize,
    /// Requests that failed and were left in place.
    pub failed: usize,
    /// Requests still queued when the drain finished.
    pub remaining: usize,
    /// True if another drain was already running and this one did nothing.
    pub skipped: bool,
    /// True if the drain stopped early.
    pub interrupted: bool,
}

/// Durable FIFO of writes captured while offline, ordered by creation time.
#[derive(Debug)]
pub struct OfflineQueueManager {
    store: Arc<dyn SecureStore>,
    max_size: usize,
    write_lock: tokio::sync::Mutex<()>,
    drain_lock: tokio::sync::Mutex<()>,
    drain_requested: AtomicBool,
}

impl OfflineQueueManager {
    /// Create a manager with the default capacity.
    pub fn new(store: Arc<dyn SecureStore>) -> Self {
        Self::with_max_size(store, DEFAULT_MAX_QUEUE_SIZE)
    }

    /// Create a manager holding at most `max_size` requests.
    pub fn with_max_size(store: Arc<dyn SecureStore>, max_size: usize) -> Self {
        Self {
            store,
            max_size,
            write_lock: tokio::sync::Mutex::new(()),
            drain_lock: tokio::sync::Mutex::new(()),
            drain_requested: AtomicBool::new(false),
        }
    }

    /// Maximum number of pending requests.
    pub fn max_queue_size(&self) -> usize {
        self.max_size
    }

    /// Persist a request. Fails if the store fails or the queue is full;
    /// a request is never silently dropped.
    #[instrument(skip(self, request), fields(id = %request.id(), method = %request.method()))]
    pub async fn enqueue(&self, request: QueuedRequest) -> Result<()> {
        let max_size = self.max_size;
        self.mutate(|entries| {
            if entries.iter().any(|e| e.id() == request.id()) {
                return Ok(());
            }
            if entries.len() >= max_size {
                return Err(Error::new(ErrorKind::Full { capacity: max_size }));
            }
            let at = entries.partition_point(|e| e.created_at() <= request.created_at());
            entries.insert(at, request.clone());
            Ok(())
        })
        .await?;

        debug!("Request queued for replay");
        Ok(())
    }

    /// All pending requests, ascending by creation time.
    ///
    /// Corrupted persisted state is logged and reset to an empty queue.
    pub async fn list(&self) -> Result<Vec<QueuedRequest>> {
        let (_, entries) = self.load().await?;
        Ok(entries)
    }

    /// Remove one request. Returns whether it was present.
    pub async fn remove(&self, id: &str) -> Result<bool> {
        self.mutate(|entries| {
            let before = entries.len();
            entries.retain(|e| e.id() != id);
            Ok(entries.len() != before)
        })
        .await
    }

    /// Remove every pending request.
    pub async fn clear(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.store.delete(OFFLINE_QUEUE_KEY).await?;
        info!("Offline queue cleared");
        Ok(())
    }

    /// Number of pending requests.
    pub async fn len(&self) -> Result<usize> {
        Ok(self.list().await?.len())
    }

    /// Whether nothing is pending.
    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// Replay pending requests in creation order.
    ///
    /// Delivered requests are removed; failed ones stay where they are. If
    /// a drain is already running on this manager, returns immediately with
    /// `skipped` set and the running drain makes another pass before it
    /// finishes, so no drain request is lost.
    pub async fn drain<F, Fut>(&self, policy: DrainPolicy, mut replay: F) -> Result<DrainReport>
    where
        F: FnMut(QueuedRequest) -> Fut,
        Fut: Future<Output = ReplayStatus>,
    {
        self.drain_requested.store(true, Ordering::SeqCst);
        let mut report = DrainReport {
            skipped: true,
            ..Default::default()
        };

        loop {
            let Ok(guard) = self.drain_lock.try_lock() else {
                debug!("Drain already in progress; it will run again");
                return Ok(report);
            };

            while self.drain_requested.swap(false, Ordering::SeqCst) {
                let pass = self.drain_pass(policy, &mut replay).await?;
                report.replayed += pass.replayed;
                report.failed += pass.failed;
                report.remaining = pass.remaining;
                report.interrupted = pass.interrupted;
                report.skipped = false;
            }
            drop(guard);

            // A request that arrived after the last check but before the
            // lock was released found it held; pick it up here.
            if !self.drain_requested.load(Ordering::SeqCst) {
                return Ok(report);
            }
        }
    }

    async fn drain_pass<F, Fut>(&self, policy: DrainPolicy, replay: &mut F) -> Result<DrainReport>
    where
        F: FnMut(QueuedRequest) -> Fut,
        Fut: Future<Output = ReplayStatus>,
    {
        let pending = self.list().await?;
        if pending.is_empty() {
            return Ok(DrainReport::default());
        }
        info!(pending = pending.len(), ?policy, "Draining offline queue");

        let mut report = DrainReport::default();
        for request in pending {
            let id = request.id().to_string();
            match replay(request).await {
                ReplayStatus::Delivered => {
                    self.remove(&id).await?;
                    report.replayed += 1;
                }
                ReplayStatus::Failed(reason) => {
                    warn!(id = %id, error = %reason, "Queued request failed; keeping it");
                    report.failed += 1;
                    if policy == DrainPolicy::StopOnFailure {
                        report.interrupted = true;
                        break;
                    }
                }
                ReplayStatus::Interrupted => {
                    info!("Drain interrupted");
                    report.interrupted = true;
                    break;
                }
            }
        }

        report.remaining = self.len().await?;
        info!(
            replayed = report.replayed,
            failed = report.failed,
            remaining = report.remaining,
            "Drain pass finished"
        );
        Ok(report)
    }

    /// Read and decode the queue, returning the raw blob it came from.
    async fn load(&self) -> Result<(Option<String>, Vec<QueuedRequest>)> {
        let raw = match self.store.read(OFFLINE_QUEUE_KEY).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return Ok((None, Vec::new())),
            // The store could not decode its own record for the key.
            Err(e) if matches!(e.kind, outpost_auth::ErrorKind::Json(_)) => {
                warn!(error = %e, "Offline queue record is unreadable; resetting it");
                self.store.delete(OFFLINE_QUEUE_KEY).await?;
                return Ok((None, Vec::new()));
            }
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_str::<Vec<QueuedRequest>>(&raw) {
            Ok(mut entries) => {
                entries.sort_by_key(|e| e.created_at());
                Ok((Some(raw), entries))
            }
            Err(e) => {
                warn!(error = %e, bytes = raw.len(), "Offline queue is corrupted; resetting it");
                self.store
                    .compare_and_swap(OFFLINE_QUEUE_KEY, Some(&raw), None)
                    .await?;
                Ok((None, Vec::new()))
            }
        }
    }

    /// Apply `f` to the current queue and swap the result in, retrying if
    /// another writer got there first.
    async fn mutate<T, F>(&self, mut f: F) -> Result<T>
    where
        F: FnMut(&mut Vec<QueuedRequest>) -> Result<T>,
    {
        let _guard = self.write_lock.lock().await;

        for attempt in 1..=MAX_CAS_ATTEMPTS {
            let (raw, mut entries) = self.load().await?;
            let value = f(&mut entries)?;

            let updated = if entries.is_empty() {
                None
            } else {
                Some(serde_json::to_string(&entries)?)
            };
            if updated == raw {
                return Ok(value);
            }

            if self
                .store
                .compare_and_swap(OFFLINE_QUEUE_KEY, raw.as_deref(), updated.as_deref())
                .await?
            {
                return Ok(value);
            }
            debug!(attempt, "Offline queue changed underneath us; retrying");
        }

        Err(Error::new(ErrorKind::Contended {
            attempts: MAX_CAS_ATTEMPTS,
        }))
    }
}
