//! Per-key burst state.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::consumer::Consumer;
use crate::model::{KeyStatus, PendingItem};

/// Shared handle to one key's state. The timer task and the submission
/// path both hold one.
pub(crate) type Slot = Arc<Mutex<KeyState>>;

pub(crate) struct KeyState {
    /// Items for the next flush, in arrival order.
    pub(crate) pending: Vec<PendingItem>,
    /// The one outstanding scheduled flush, if any.
    pub(crate) timer: Option<JoinHandle<()>>,
    /// Bumped on every arm; a fire carrying an older value is stale.
    pub(crate) generation: u64,
    /// Last writer wins.
    pub(crate) consumer: Arc<dyn Consumer>,
    /// Last writer wins, travels with the consumer.
    pub(crate) cancel: CancellationToken,
    /// True from snapshot until the consumer call has returned.
    pub(crate) flushing: bool,
}

impl KeyState {
    pub(crate) fn new(consumer: Arc<dyn Consumer>, cancel: CancellationToken) -> Self {
        Self {
            pending: Vec::new(),
            timer: None,
            generation: 0,
            consumer,
            cancel,
            flushing: false,
        }
    }

    pub(crate) fn new_slot(consumer: Arc<dyn Consumer>, cancel: CancellationToken) -> Slot {
        Arc::new(Mutex::new(Self::new(consumer, cancel)))
    }

    pub(crate) fn status(&self) -> KeyStatus {
        KeyStatus {
            pending: self.pending.len(),
            flushing: self.flushing,
            timer_armed: self.timer.is_some(),
        }
    }

    pub(crate) fn is_idle(&self) -> bool {
        self.status().is_idle()
    }

    /// Cancel the scheduled flush, if any, and invalidate its generation.
    pub(crate) fn disarm(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        self.generation = self.generation.wrapping_add(1);
    }
}
