// src/event.rs

use crate::geometry::Point;

/// Platform-assigned identifier of one physical contact.
///
/// Stable from start to end; may be reused by the platform afterwards.
pub type ContactId = u64;

/// Host clock in milliseconds (e.g. `performance.now()`).
pub type Timestamp = f64;

/// ===============================
/// Normalized contact stream
/// ===============================

/// One event from the host's pointer/touch stream.
///
/// These events:
/// - are immutable snapshots
/// - are processed one at a time, to completion
/// - carry the host timestamp at which they happened
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ContactEvent {
    Start {
        contact_id: ContactId,
        position: Point,
        timestamp: Timestamp,
    },

    Move {
        contact_id: ContactId,
        position: Point,
        timestamp: Timestamp,
    },

    End {
        contact_id: ContactId,
        timestamp: Timestamp,
    },

    /// The platform took the contact away (e.g. `touchcancel`).
    ///
    /// Treated as an end that never completes a tap.
    Cancel {
        contact_id: ContactId,
        timestamp: Timestamp,
    },
}

impl ContactEvent {
    pub fn start(contact_id: ContactId, position: impl Into<Point>, timestamp: Timestamp) -> Self {
        ContactEvent::Start {
            contact_id,
            position: position.into(),
            timestamp,
        }
    }

    pub fn moved(contact_id: ContactId, position: impl Into<Point>, timestamp: Timestamp) -> Self {
        ContactEvent::Move {
            contact_id,
            position: position.into(),
            timestamp,
        }
    }

    pub fn end(contact_id: ContactId, timestamp: Timestamp) -> Self {
        ContactEvent::End {
            contact_id,
            timestamp,
        }
    }

    pub fn cancel(contact_id: ContactId, timestamp: Timestamp) -> Self {
        ContactEvent::Cancel {
            contact_id,
            timestamp,
        }
    }

    #[inline]
    pub fn contact_id(&self) -> ContactId {
        match self {
            ContactEvent::Start { contact_id, .. }
            | ContactEvent::Move { contact_id, .. }
            | ContactEvent::End { contact_id, .. }
            | ContactEvent::Cancel { contact_id, .. } => *contact_id,
        }
    }

    #[inline]
    pub fn timestamp(&self) -> Timestamp {
        match self {
            ContactEvent::Start { timestamp, .. }
            | ContactEvent::Move { timestamp, .. }
            | ContactEvent::End { timestamp, .. }
            | ContactEvent::Cancel { timestamp, .. } => *timestamp,
        }
    }
}

/// ===============================
/// Core-side contact snapshot
/// ===============================

/// A contact as the core remembers it.
///
/// A move produces a new snapshot with the same `started_at`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    pub contact_id: ContactId,
    pub position: Point,
    pub started_at: Timestamp,
}

impl Contact {
    pub fn new(contact_id: ContactId, position: Point, started_at: Timestamp) -> Self {
        Self {
            contact_id,
            position,
            started_at,
        }
    }

    /// Same contact, new position.
    #[inline]
    pub fn moved_to(self, position: Point) -> Self {
        Self { position, ..self }
    }
}
