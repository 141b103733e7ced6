//! Process-wide counters for the ambient observability surface (§10.3).
//!
//! Trimmed from the source repo's `ServerMetrics` (`AtomicU64` struct, JSON snapshot) down
//! to the counters this domain actually reports on. No per-operation latency histogram is
//! kept: nothing in the spec calls for percentile tracking, so plain counters/gauges cover
//! the ambient metrics layer without the `hdrhistogram` dependency (see `DESIGN.md`).

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic counters updated by the connection gateway, room actors, and the lobby actor.
#[derive(Debug, Default)]
pub struct ServerMetrics {
    // Connections
    pub connections_total: AtomicU64,
    pub connections_active: AtomicU64,
    pub connections_rejected_auth: AtomicU64,
    pub connections_dropped_backpressure: AtomicU64,

    // Rooms
    pub rooms_created: AtomicU64,
    pub rooms_completed: AtomicU64,
    pub rooms_abandoned: AtomicU64,
    pub rooms_cleaned_up: AtomicU64,

    // Alarms
    pub alarms_scheduled: AtomicU64,
    pub alarms_cancelled: AtomicU64,
    pub alarms_fired: AtomicU64,

    // Turns
    pub turns_completed: AtomicU64,
    pub turns_skipped_timeout: AtomicU64,

    // Reconnection
    pub reconnections_attempted: AtomicU64,
    pub reconnections_succeeded: AtomicU64,
    pub seats_expired: AtomicU64,

    // Lobby
    pub invites_issued: AtomicU64,
    pub invites_accepted: AtomicU64,
    pub invites_expired: AtomicU64,
    pub join_requests_issued: AtomicU64,
    pub join_requests_approved: AtomicU64,
    pub join_requests_declined: AtomicU64,
    pub join_requests_expired: AtomicU64,

    // Errors
    pub validation_errors: AtomicU64,
    pub internal_errors: AtomicU64,
}

impl ServerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dec(counter: &AtomicU64) {
        counter.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn get(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::Relaxed)
    }

    /// Render a JSON-serializable snapshot for the `/metrics` endpoint.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            connections_total: Self::get(&self.connections_total),
            connections_active: Self::get(&self.connections_active),
            connections_rejected_auth: Self::get(&self.connections_rejected_auth),
            connections_dropped_backpressure: Self::get(&self.connections_dropped_backpressure),
            rooms_created: Self::get(&self.rooms_created),
            rooms_completed: Self::get(&self.rooms_completed),
            rooms_abandoned: Self::get(&self.rooms_abandoned),
            rooms_cleaned_up: Self::get(&self.rooms_cleaned_up),
            alarms_scheduled: Self::get(&self.alarms_scheduled),
            alarms_cancelled: Self::get(&self.alarms_cancelled),
            alarms_fired: Self::get(&self.alarms_fired),
            turns_completed: Self::get(&self.turns_completed),
            turns_skipped_timeout: Self::get(&self.turns_skipped_timeout),
            reconnections_attempted: Self::get(&self.reconnections_attempted),
            reconnections_succeeded: Self::get(&self.reconnections_succeeded),
            seats_expired: Self::get(&self.seats_expired),
            invites_issued: Self::get(&self.invites_issued),
            invites_accepted: Self::get(&self.invites_accepted),
            invites_expired: Self::get(&self.invites_expired),
            join_requests_issued: Self::get(&self.join_requests_issued),
            join_requests_approved: Self::get(&self.join_requests_approved),
            join_requests_declined: Self::get(&self.join_requests_declined),
            join_requests_expired: Self::get(&self.join_requests_expired),
            validation_errors: Self::get(&self.validation_errors),
            internal_errors: Self::get(&self.internal_errors),
        }
    }
}

/// Plain-value snapshot of [`ServerMetrics`], serialized for the `/metrics` endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub connections_total: u64,
    pub connections_active: u64,
    pub connections_rejected_auth: u64,
    pub connections_dropped_backpressure: u64,
    pub rooms_created: u64,
    pub rooms_completed: u64,
    pub rooms_abandoned: u64,
    pub rooms_cleaned_up: u64,
    pub alarms_scheduled: u64,
    pub alarms_cancelled: u64,
    pub alarms_fired: u64,
    pub turns_completed: u64,
    pub turns_skipped_timeout: u64,
    pub reconnections_attempted: u64,
    pub reconnections_succeeded: u64,
    pub seats_expired: u64,
    pub invites_issued: u64,
    pub invites_accepted: u64,
    pub invites_expired: u64,
    pub join_requests_issued: u64,
    pub join_requests_approved: u64,
    pub join_requests_declined: u64,
    pub join_requests_expired: u64,
    pub validation_errors: u64,
    pub internal_errors: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_start_at_zero_and_increment() {
        let metrics = ServerMetrics::new();
        assert_eq!(ServerMetrics::get(&metrics.rooms_created), 0);
        ServerMetrics::inc(&metrics.rooms_created);
        ServerMetrics::inc(&metrics.rooms_created);
        assert_eq!(ServerMetrics::get(&metrics.rooms_created), 2);
    }

    #[test]
    fn snapshot_reflects_current_values() {
        let metrics = ServerMetrics::new();
        ServerMetrics::inc(&metrics.connections_active);
        ServerMetrics::inc(&metrics.connections_active);
        ServerMetrics::dec(&metrics.connections_active);
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.connections_active, 1);
    }
}
