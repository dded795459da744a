//! Keyed debounce engine. The public API for submitting bursts.
//!
//! Each key buffers submissions until it has been quiet for the configured
//! gap, then hands the whole burst to its consumer as one payload. Keys are
//! independent: each has its own lock, timer and flush cycle, and nothing
//! is shared between them beyond the sharded key map.

mod consumer;
mod flush;
mod scheduler;
mod state;

pub use consumer::Consumer;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use dashmap::DashMap;
use tokio::runtime::Handle;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::model::{KeyStatus, PendingItem};
use crate::telemetry::metrics::EngineMetrics;
use state::{KeyState, Slot};

struct Inner {
    config: EngineConfig,
    keys: DashMap<String, Slot>,
    runtime: Handle,
    metrics: EngineMetrics,
    /// Signalled whenever a key goes back to idle.
    idle: Notify,
    closed: AtomicBool,
}

impl Inner {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

/// The debounce engine. Cloning is cheap; clones share all state.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<Inner>,
}

impl Engine {
    /// Create an engine bound to the current tokio runtime.
    ///
    /// Timers and deliveries are spawned onto that runtime, so `submit`
    /// may be called from any thread afterwards.
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let runtime = Handle::try_current().map_err(|e| Error::Runtime(e.to_string()))?;

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                keys: DashMap::new(),
                runtime,
                metrics: EngineMetrics::new(),
                idle: Notify::new(),
                closed: AtomicBool::new(false),
            }),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    /// Buffer `payload` under `key`; see [`Engine::submit_with_cancel`].
    pub fn submit(&self, key: &str, payload: &str, consumer: Arc<dyn Consumer>) -> bool {
        self.submit_with_cancel(key, payload, consumer, CancellationToken::new())
    }

    /// Buffer `payload` under `key` and restart the key's quiet period.
    ///
    /// Never blocks on delivery and never calls the consumer. `consumer`
    /// and `cancel` replace whatever the key held before. If a flush is in
    /// flight the item waits for the next cycle and the timer is untouched.
    ///
    /// Returns `false` when the submission was dropped: empty key, empty
    /// payload, or an engine that has been shut down.
    pub fn submit_with_cancel(
        &self,
        key: &str,
        payload: &str,
        consumer: Arc<dyn Consumer>,
        cancel: CancellationToken,
    ) -> bool {
        if key.is_empty() || payload.is_empty() {
            debug!(key, "dropping submission with empty key or payload");
            self.inner.metrics.record_submission(false);
            return false;
        }
        if self.inner.is_closed() {
            warn!(key, "engine shut down, dropping submission");
            self.inner.metrics.record_submission(false);
            return false;
        }

        // The shard entry stays locked until the item is recorded, so a
        // concurrent evict_idle can never remove the slot from under us.
        let entry = self
            .inner
            .keys
            .entry(key.to_string())
            .or_insert_with(|| KeyState::new_slot(Arc::clone(&consumer), cancel.clone()));
        let slot = Arc::clone(entry.value());
        let mut state = slot.lock();

        state.pending.push(PendingItem::new(payload));
        state.consumer = consumer;
        state.cancel = cancel;

        if state.flushing {
            debug!(
                key,
                pending = state.pending.len(),
                "flush in flight, item held for next cycle"
            );
        } else {
            debug!(key, pending = state.pending.len(), "enqueued");
            scheduler::arm(&self.inner, key, &slot, &mut state);
        }

        drop(state);
        drop(entry);
        self.inner.metrics.record_submission(true);
        true
    }

    /// Current state of `key`, or `None` if it was never submitted to.
    pub fn status(&self, key: &str) -> Option<KeyStatus> {
        self.inner.keys.get(key).map(|slot| slot.lock().status())
    }

    /// Number of keys with state.
    pub fn len(&self) -> usize {
        self.inner.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.keys.is_empty()
    }

    /// True when no key has pending items, an armed timer or a flush in flight.
    pub fn is_quiescent(&self) -> bool {
        self.inner.keys.iter().all(|slot| slot.lock().is_idle())
    }

    /// Wait until every key is idle.
    ///
    /// Returns immediately on a quiescent engine. Keys that keep receiving
    /// submissions keep this waiting.
    pub async fn drain(&self) {
        loop {
            let notified = self.inner.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.is_quiescent() {
                return;
            }
            notified.await;
        }
    }

    /// Remove idle keys from the store. Returns how many were removed.
    ///
    /// Never called by the engine itself; keys otherwise live as long as
    /// the engine does.
    pub fn evict_idle(&self) -> usize {
        let mut evicted = 0;
        self.inner.keys.retain(|_, slot| {
            let idle = slot.lock().is_idle();
            if idle {
                evicted += 1;
            }
            !idle
        });
        if evicted > 0 {
            debug!(evicted, "evicted idle keys");
        }
        evicted
    }

    /// Stop accepting submissions and cancel every scheduled flush.
    ///
    /// Buffered bursts that have not started flushing are discarded. Flushes
    /// already in flight run to completion; anything that arrived during
    /// them is discarded too.
    pub fn shutdown(&self) {
        self.inner.closed.store(true, Ordering::Release);

        let mut dropped = 0;
        for slot in self.inner.keys.iter() {
            let mut state = slot.lock();
            state.disarm();
            if !state.flushing {
                dropped += state.pending.len();
                state.pending.clear();
            }
        }

        info!(dropped, "debounce engine shut down");
        self.inner.idle.notify_waiters();
    }
}
