// src/scheduler.rs

use crate::event::{ContactId, Timestamp};
use crate::state::NodeId;

/// Identity of one scheduled timer.
///
/// Tokens are never reused, so a fired timer can be matched against
/// the state that scheduled it.
pub type TimerToken = u64;

/// A pending hold-threshold check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HoldTimer {
    pub token: TimerToken,
    pub node: NodeId,
    pub contact: ContactId,
    pub deadline: Timestamp,
}

/// Queue of hold timers, kept sorted by deadline.
///
/// This struct does not run anything by itself.
/// The engine polls it before every event and on every host tick;
/// whoever receives a fired timer must re-validate it.
#[derive(Debug)]
pub struct HoldScheduler {
    pending: Vec<HoldTimer>,
    next_token: TimerToken,
}

impl HoldScheduler {
    pub fn new() -> Self {
        Self {
            pending: Vec::with_capacity(4),
            next_token: 1,
        }
    }

    /// Schedule a check for `contact` on `node` at `deadline`.
    pub fn schedule(&mut self, node: NodeId, contact: ContactId, deadline: Timestamp) -> TimerToken {
        let token = self.next_token;
        self.next_token += 1;

        let timer = HoldTimer {
            token,
            node,
            contact,
            deadline,
        };
        let at = self
            .pending
            .partition_point(|t| t.deadline <= deadline);
        self.pending.insert(at, timer);
        token
    }

    /// Cancel a timer. Returns whether it was still pending.
    pub fn cancel(&mut self, token: TimerToken) -> bool {
        let before = self.pending.len();
        self.pending.retain(|t| t.token != token);
        self.pending.len() != before
    }

    /// Remove and return every timer whose deadline is strictly before `now`.
    ///
    /// Strict: a timer due at exactly `now` has not yet been exceeded.
    pub fn take_expired(&mut self, now: Timestamp) -> Vec<HoldTimer> {
        let due = self.pending.partition_point(|t| t.deadline < now);
        self.pending.drain(..due).collect()
    }

    #[cfg(test)]
    pub fn is_pending(&self, token: TimerToken) -> bool {
        self.pending.iter().any(|t| t.token == token)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Earliest deadline, for hosts that want to schedule a wake-up.
    pub fn next_deadline(&self) -> Option<Timestamp> {
        self.pending.first().map(|t| t.deadline)
    }
}

impl Default for HoldScheduler {
    fn default() -> Self {
        Self::new()
    }
}
