//! Flush cycle span helpers.

use tracing::Span;

use crate::model::FlushId;

/// Start a span covering one flush cycle for a key.
///
/// The `flush.outcome` field is declared empty and filled by
/// [`record_outcome`].
pub fn start_flush_span(key: &str, flush_id: FlushId, items: usize) -> Span {
    tracing::info_span!(
        "coalesce.flush",
        "flush.key" = key,
        "flush.id" = %flush_id,
        "flush.items" = items,
        "flush.outcome" = tracing::field::Empty,
    )
}

/// Record a state transition event on the given span.
pub fn record_state_transition(span: &Span, from: &str, to: &str) {
    span.in_scope(|| {
        tracing::debug!(from = from, to = to, "state_transition");
    });
}

/// Record how the flush ended.
pub fn record_outcome(span: &Span, outcome: &str) {
    span.record("flush.outcome", outcome);
}
