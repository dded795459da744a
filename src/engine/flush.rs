//! Flush executor: snapshot, deliver, then settle the key.
//!
//! Idle -> Flushing -> Idle when nothing arrived during delivery, and
//! Idle -> Flushing -> (re-armed) -> Flushing when something did. The
//! snapshot is taken and `pending` cleared under the key's lock before the
//! consumer runs; the lock is not held while the consumer is suspended.

use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{Instrument, error, info, warn};

use super::Inner;
use super::consumer::Consumer;
use super::scheduler;
use super::state::{KeyState, Slot};
use crate::model::{FlushId, FlushOutcome, PendingItem, coalesce};
use crate::telemetry::flush::{record_outcome, record_state_transition, start_flush_span};

/// Everything a flush needs once the key's lock is released.
pub(super) struct Snapshot {
    items: Vec<PendingItem>,
    consumer: Arc<dyn Consumer>,
    cancel: CancellationToken,
}

/// Swap out the pending items and mark the key as flushing.
///
/// Returns `None`, leaving the key idle, when there is nothing to deliver.
pub(super) fn take_snapshot(state: &mut KeyState) -> Option<Snapshot> {
    state.timer = None;
    let items = std::mem::take(&mut state.pending);
    if items.is_empty() {
        return None;
    }
    state.flushing = true;
    Some(Snapshot {
        items,
        consumer: Arc::clone(&state.consumer),
        cancel: state.cancel.clone(),
    })
}

pub(super) async fn run(inner: Arc<Inner>, key: String, slot: Slot, snapshot: Snapshot) {
    let Snapshot {
        items,
        consumer,
        cancel,
    } = snapshot;

    let span = start_flush_span(&key, FlushId::new(), items.len());
    record_state_transition(&span, "idle", "flushing");

    let payload = coalesce(&items);
    let outcome = deliver(&inner, &key, payload, consumer, &cancel)
        .instrument(span.clone())
        .await;

    record_outcome(&span, outcome.as_str());
    inner.metrics.record_flush(outcome.as_str(), items.len());

    settle(&inner, &key, &slot, &span);
}

async fn deliver(
    inner: &Inner,
    key: &str,
    payload: String,
    consumer: Arc<dyn Consumer>,
    cancel: &CancellationToken,
) -> FlushOutcome {
    if cancel.is_cancelled() {
        warn!("cancellation signalled before delivery, skipping flush");
        return FlushOutcome::Cancelled;
    }

    info!(bytes = payload.len(), "delivering coalesced payload");

    let started = Instant::now();
    let task_key = key.to_string();
    let mut call = inner
        .runtime
        .spawn(async move { consumer.deliver(payload, task_key).await });

    let outcome = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            call.abort();
            warn!("cancellation signalled during delivery, abandoning flush");
            FlushOutcome::Cancelled
        }
        joined = &mut call => match joined {
            Ok(Ok(())) => FlushOutcome::Delivered,
            Ok(Err(e)) => {
                let message = format!("{e:#}");
                error!(error = %message, "delivery failed, burst dropped");
                FlushOutcome::Failed(message)
            }
            Err(e) => {
                error!(error = %e, "consumer task aborted, burst dropped");
                FlushOutcome::Failed(e.to_string())
            }
        },
    };

    inner
        .metrics
        .record_delivery_duration(started.elapsed().as_secs_f64() * 1000.0);
    outcome
}

/// Clear `flushing` and either re-arm for late arrivals or go idle.
fn settle(inner: &Arc<Inner>, key: &str, slot: &Slot, span: &tracing::Span) {
    let mut state = slot.lock();
    state.flushing = false;

    if state.pending.is_empty() {
        drop(state);
        record_state_transition(span, "flushing", "idle");
        inner.idle.notify_waiters();
        return;
    }

    if inner.is_closed() {
        let dropped = state.pending.len();
        state.pending.clear();
        drop(state);
        span.in_scope(|| warn!(dropped, "engine shut down, discarding late arrivals"));
        record_state_transition(span, "flushing", "idle");
        inner.idle.notify_waiters();
        return;
    }

    span.in_scope(|| {
        info!(
            pending = state.pending.len(),
            "items arrived during delivery, re-arming timer"
        )
    });
    inner.metrics.record_rearm();
    scheduler::arm(inner, key, slot, &mut state);
    drop(state);
    record_state_transition(span, "flushing", "armed");
}
