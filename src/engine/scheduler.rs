//! Per-key single-shot debounce timer.
//!
//! Arming always disarms first, so a key never has two live timers. The
//! generation captured at arm time is re-checked under the key's lock when
//! the timer fires; a fire that lost the race with a newer arm does nothing.

use std::sync::Arc;

use tokio::time::{Instant, sleep_until};
use tracing::trace;

use super::Inner;
use super::flush;
use super::state::{KeyState, Slot};

/// (Re)start the quiet-period countdown for `key`.
///
/// Caller holds the key's lock; `state` is the guarded value of `slot`.
pub(super) fn arm(inner: &Arc<Inner>, key: &str, slot: &Slot, state: &mut KeyState) {
    state.disarm();
    let generation = state.generation;
    let gap = inner.config.gap;
    let deadline = Instant::now() + gap;

    let task_inner = Arc::clone(inner);
    let task_slot = Arc::clone(slot);
    let task_key = key.to_string();

    trace!(key, generation, gap_ms = gap.as_millis() as u64, "timer armed");

    state.timer = Some(inner.runtime.spawn(async move {
        sleep_until(deadline).await;
        fire(task_inner, task_key, task_slot, generation).await;
    }));
}

async fn fire(inner: Arc<Inner>, key: String, slot: Slot, generation: u64) {
    let snapshot = {
        let mut state = slot.lock();
        if state.generation != generation {
            trace!(
                key = key.as_str(),
                generation,
                current = state.generation,
                "stale timer fire ignored"
            );
            return;
        }
        flush::take_snapshot(&mut state)
    };

    match snapshot {
        Some(snapshot) => flush::run(inner, key, slot, snapshot).await,
        None => inner.idle.notify_waiters(),
    }
}
