//! AlarmQueue (C2): a persisted, sorted multi-timer layered over a single external wake.
//!
//! The queue itself holds no storage handle — the owning actor persists the list after
//! every mutation, matching storage-first discipline (`room`/`lobby` mutate the queue,
//! persist the resulting snapshot, *then* re-arm their `tokio::time::sleep_until` against
//! `next_deadline()`). This keeps `AlarmQueue` a plain, deterministically testable value
//! type while the actor supplies the "persist" and "external wake" halves of the contract
//! (spec §4.2 [SUPPLEMENT] — the in-process analogue of the platform's single wake-up
//! primitive).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kinds of time-driven events a room or lobby schedules against itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlarmKind {
    SeatExpiration,
    PauseTimeout,
    RoomCleanup,
    TurnTimeout,
    AfkCheck,
    AiTurnTimeout,
    JoinRequestExpiration,
    InviteExpiration,
    DirectoryPrune,
}

/// A single pending alarm (spec §3 ScheduledAlarm).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledAlarm {
    pub kind: AlarmKind,
    pub target_id: Option<Uuid>,
    pub fires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub metadata: Option<serde_json::Value>,
}

/// Sorted (soonest-first) list of pending alarms with upsert-by-`(kind, targetId)`
/// semantics (I5: at most one pending alarm per key).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlarmQueue {
    alarms: Vec<ScheduledAlarm>,
}

impl AlarmQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_alarms(alarms: Vec<ScheduledAlarm>) -> Self {
        let mut queue = Self { alarms };
        queue.resort();
        queue
    }

    /// Upsert: any existing alarm with the same `(kind, target_id)` is replaced.
    pub fn schedule(
        &mut self,
        kind: AlarmKind,
        target_id: Option<Uuid>,
        fires_at: DateTime<Utc>,
        metadata: Option<serde_json::Value>,
        now: DateTime<Utc>,
    ) {
        self.alarms
            .retain(|a| !(a.kind == kind && a.target_id == target_id));
        self.alarms.push(ScheduledAlarm {
            kind,
            target_id,
            fires_at,
            created_at: now,
            metadata,
        });
        self.resort();
    }

    /// Removes any alarm matching `(kind, target_id)`. Returns whether one was removed.
    pub fn cancel(&mut self, kind: AlarmKind, target_id: Option<Uuid>) -> bool {
        let before = self.alarms.len();
        self.alarms
            .retain(|a| !(a.kind == kind && a.target_id == target_id));
        self.alarms.len() != before
    }

    /// Partitions off everything due at or before `now`, leaving the remainder in the
    /// queue (already persisted by the time a caller observes the due set, per the
    /// actor's own persist-before-wake sequencing).
    pub fn process_due(&mut self, now: DateTime<Utc>) -> Vec<ScheduledAlarm> {
        let (due, remaining): (Vec<_>, Vec<_>) =
            self.alarms.drain(..).partition(|a| a.fires_at <= now);
        self.alarms = remaining;
        self.resort();
        due
    }

    pub fn has(&self, kind: AlarmKind, target_id: Option<Uuid>) -> bool {
        self.alarms
            .iter()
            .any(|a| a.kind == kind && a.target_id == target_id)
    }

    pub fn pending(&self) -> &[ScheduledAlarm] {
        &self.alarms
    }

    /// `min(firesAt)` of the persisted list, or `None` when empty — the value the actor
    /// re-arms its `tokio::time::sleep_until` against.
    pub fn next_deadline(&self) -> Option<DateTime<Utc>> {
        self.alarms.first().map(|a| a.fires_at)
    }

    fn resort(&mut self) {
        self.alarms.sort_by_key(|a| a.fires_at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    fn t(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    #[test]
    fn schedule_upserts_by_kind_and_target() {
        let mut queue = AlarmQueue::new();
        let player = Uuid::new_v4();
        queue.schedule(AlarmKind::TurnTimeout, Some(player), t(10), None, t(0));
        queue.schedule(AlarmKind::TurnTimeout, Some(player), t(20), None, t(0));
        assert_eq!(queue.pending().len(), 1);
        assert_eq!(queue.next_deadline(), Some(t(20)));
    }

    #[test]
    fn distinct_targets_coexist() {
        let mut queue = AlarmQueue::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        queue.schedule(AlarmKind::SeatExpiration, Some(a), t(30), None, t(0));
        queue.schedule(AlarmKind::SeatExpiration, Some(b), t(10), None, t(0));
        assert_eq!(queue.pending().len(), 2);
        assert_eq!(queue.next_deadline(), Some(t(10)));
    }

    #[test]
    fn cancel_removes_matching_entry_only() {
        let mut queue = AlarmQueue::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        queue.schedule(AlarmKind::SeatExpiration, Some(a), t(30), None, t(0));
        queue.schedule(AlarmKind::SeatExpiration, Some(b), t(10), None, t(0));
        assert!(queue.cancel(AlarmKind::SeatExpiration, Some(b)));
        assert_eq!(queue.pending().len(), 1);
        assert_eq!(queue.next_deadline(), Some(t(30)));
    }

    #[test]
    fn cancel_on_absent_key_is_a_no_op() {
        let mut queue = AlarmQueue::new();
        let a = Uuid::new_v4();
        queue.schedule(AlarmKind::TurnTimeout, Some(a), t(10), None, t(0));
        assert!(!queue.cancel(AlarmKind::TurnTimeout, Some(Uuid::new_v4())));
        assert_eq!(queue.pending().len(), 1);
    }

    #[test]
    fn schedule_then_cancel_leaves_queue_unchanged() {
        let mut queue = AlarmQueue::new();
        let before = queue.clone();
        let a = Uuid::new_v4();
        queue.schedule(AlarmKind::PauseTimeout, Some(a), t(5), None, t(0));
        queue.cancel(AlarmKind::PauseTimeout, Some(a));
        assert_eq!(queue.pending().len(), before.pending().len());
    }

    #[test]
    fn process_due_partitions_and_keeps_remainder_sorted() {
        let mut queue = AlarmQueue::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();
        queue.schedule(AlarmKind::TurnTimeout, Some(a), t(5), None, t(0));
        queue.schedule(AlarmKind::TurnTimeout, Some(b), t(15), None, t(0));
        queue.schedule(AlarmKind::TurnTimeout, Some(c), t(25), None, t(0));

        let due = queue.process_due(t(16));
        assert_eq!(due.len(), 2);
        assert_eq!(queue.pending().len(), 1);
        assert_eq!(queue.next_deadline(), Some(t(25)));
    }

    #[test]
    fn has_reflects_current_membership() {
        let mut queue = AlarmQueue::new();
        let a = Uuid::new_v4();
        assert!(!queue.has(AlarmKind::AfkCheck, Some(a)));
        queue.schedule(AlarmKind::AfkCheck, Some(a), t(5), None, t(0));
        assert!(queue.has(AlarmKind::AfkCheck, Some(a)));
    }

    #[test]
    fn next_deadline_is_none_when_empty() {
        let queue = AlarmQueue::new();
        assert_eq!(queue.next_deadline(), None);
    }

    #[test]
    fn targetless_alarms_use_kind_alone_as_key() {
        let mut queue = AlarmQueue::new();
        queue.schedule(AlarmKind::RoomCleanup, None, t(10), None, t(0));
        queue.schedule(AlarmKind::RoomCleanup, None, t(40), None, t(0));
        assert_eq!(queue.pending().len(), 1);
        assert_eq!(queue.next_deadline(), Some(t(40)));
    }

    use proptest::prelude::*;

    fn kind_from_tag(tag: u8) -> AlarmKind {
        const KINDS: [AlarmKind; 9] = [
            AlarmKind::SeatExpiration,
            AlarmKind::PauseTimeout,
            AlarmKind::RoomCleanup,
            AlarmKind::TurnTimeout,
            AlarmKind::AfkCheck,
            AlarmKind::AiTurnTimeout,
            AlarmKind::JoinRequestExpiration,
            AlarmKind::InviteExpiration,
            AlarmKind::DirectoryPrune,
        ];
        KINDS[tag as usize % KINDS.len()]
    }

    proptest! {
        // I5: for any interleaving of schedule/cancel on a handful of (kind, target)
        // keys, the queue never holds two entries for the same key, and a cancel
        // immediately following a schedule on the same key restores the prior length.
        #[test]
        fn at_most_one_alarm_per_key_after_random_ops(
            ops in proptest::collection::vec(
                (any::<u8>(), 0u8..3, any::<bool>(), 1i64..1000),
                0..50,
            )
        ) {
            let targets: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
            let mut queue = AlarmQueue::new();

            for (kind_tag, target_idx, is_cancel, fire_offset) in ops {
                let kind = kind_from_tag(kind_tag);
                let target = Some(targets[target_idx as usize]);
                if is_cancel {
                    queue.cancel(kind, target);
                } else {
                    queue.schedule(kind, target, t(fire_offset), None, t(0));
                }
            }

            let mut seen = std::collections::HashSet::new();
            for alarm in queue.pending() {
                prop_assert!(seen.insert((alarm.kind, alarm.target_id)), "duplicate key survived");
            }

            let sorted = queue
                .pending()
                .windows(2)
                .all(|pair| pair[0].fires_at <= pair[1].fires_at);
            prop_assert!(sorted, "pending alarms must stay sorted soonest-first");
        }

        #[test]
        fn schedule_then_cancel_is_idempotent_for_any_kind_and_deadline(
            kind_tag in any::<u8>(), fire_offset in 1i64..10_000,
        ) {
            let kind = kind_from_tag(kind_tag);
            let target = Some(Uuid::new_v4());
            let mut queue = AlarmQueue::new();
            let before_len = queue.pending().len();

            queue.schedule(kind, target, t(fire_offset), None, t(0));
            prop_assert!(queue.cancel(kind, target));

            prop_assert_eq!(queue.pending().len(), before_len);
            prop_assert!(!queue.has(kind, target));
        }
    }
}
