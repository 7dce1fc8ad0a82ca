// src/gesture.rs
//
// Secondary-contact disambiguation.
//
// While a node has a primary contact, a second contact that starts near
// it is either a quick tap (announce the next value) or a hold (enter
// proximity navigation). The decision is made by a hold timer that is
// cancelled synchronously on lift and re-validated when it fires.
//
//   Idle ──second contact near primary──▶ SecondaryPending
//   SecondaryPending ──lift, elapsed <= hold──▶ Idle   (announce, advance)
//   SecondaryPending ──timer, elapsed > hold──▶ Navigating
//   Navigating ──lift──▶ Idle
//   any ──primary lifts──▶ (destroyed, cycle index back to 0)

use std::collections::HashMap;

use log::{debug, trace};

use crate::config::InteractionConfig;
use crate::diagram::Node;
use crate::event::{Contact, ContactId, Timestamp};
use crate::geometry::{Point, distance};
use crate::output::SpeechOutput;
use crate::scheduler::{HoldScheduler, TimerToken};
use crate::speech::{Announcer, format_announceable};
use crate::state::NodeId;

/// When a secondary started at `started_at` stops being a tap.
#[inline]
fn hold_deadline(started_at: Timestamp, hold_threshold_ms: f64) -> Timestamp {
    started_at + hold_threshold_ms
}

/// Strictly past the deadline, the same test the timer queue applies.
#[inline]
fn hold_exceeded(started_at: Timestamp, hold_threshold_ms: f64, now: Timestamp) -> bool {
    hold_deadline(started_at, hold_threshold_ms) < now
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureMode {
    Idle,
    SecondaryPending,
    Navigating,
}

/// Gesture state of one node with a primary contact.
#[derive(Debug, Clone, PartialEq)]
pub struct GestureState {
    pub secondary_contact_id: Option<ContactId>,
    pub secondary_started_at: Option<Timestamp>,
    pub mode: GestureMode,
    /// Next value to announce; always `< value_count`.
    pub cycle_index: usize,
    value_count: usize,
    timer: Option<TimerToken>,
}

impl GestureState {
    fn new(value_count: usize) -> Self {
        Self {
            secondary_contact_id: None,
            secondary_started_at: None,
            mode: GestureMode::Idle,
            cycle_index: 0,
            value_count: value_count.max(1),
            timer: None,
        }
    }

    fn reset_to_idle(&mut self) {
        self.secondary_contact_id = None;
        self.secondary_started_at = None;
        self.mode = GestureMode::Idle;
        self.timer = None;
    }
}

/// What lifting a secondary contact meant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecondaryRelease {
    /// Lifted within the hold threshold: announce the next value.
    Tap,
    /// Lifted while navigating: navigation ends.
    NavigationEnded,
    /// Lifted while pending but past the threshold before the timer
    /// was observed. No announcement.
    Expired,
    /// The platform cancelled the contact; nothing happens.
    Cancelled,
    /// The contact is not this node's secondary.
    NotSecondary,
}

/// A gesture whose hold timer fired: it is now navigating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HoldFired {
    pub node: NodeId,
    pub contact: ContactId,
}

pub struct GestureDisambiguator {
    states: HashMap<NodeId, GestureState>,
    timers: HoldScheduler,
    proximity_threshold: f32,
    hold_threshold_ms: f64,
}

impl GestureDisambiguator {
    pub fn new(config: &InteractionConfig) -> Self {
        Self {
            states: HashMap::new(),
            timers: HoldScheduler::new(),
            proximity_threshold: config.proximity_threshold,
            hold_threshold_ms: config.hold_threshold_ms,
        }
    }

    // -------------------------------
    // MARK: Primary lifecycle
    // -------------------------------

    /// A node got a (new) primary contact. Starts from Idle, index 0.
    pub fn begin_primary(&mut self, node: NodeId, value_count: usize) {
        if let Some(old) = self.states.insert(node, GestureState::new(value_count)) {
            if let Some(token) = old.timer {
                self.timers.cancel(token);
            }
        }
    }

    /// The node's primary contact lifted; the gesture state is destroyed.
    ///
    /// Returns the destroyed state so the caller can wind down whatever
    /// the secondary was doing.
    pub fn end_primary(&mut self, node: NodeId) -> Option<GestureState> {
        let state = self.states.remove(&node)?;
        if let Some(token) = state.timer {
            self.timers.cancel(token);
        }
        debug!("Gesture on node {} reset ({:?})", node, state.mode);
        Some(state)
    }

    // -------------------------------
    // MARK: Secondary contact
    // -------------------------------

    /// The idle node whose primary is nearest to `position`, within the
    /// proximity threshold.
    pub fn secondary_candidate(
        &self,
        position: Point,
        primaries: impl IntoIterator<Item = (NodeId, Contact)>,
    ) -> Option<NodeId> {
        primaries
            .into_iter()
            .filter(|(node, _)| self.mode(*node) == Some(GestureMode::Idle))
            .map(|(node, primary)| (node, distance(position, primary.position)))
            .filter(|(_, d)| *d <= self.proximity_threshold)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(node, _)| node)
    }

    /// Record a secondary contact and arm its hold timer.
    ///
    /// Only an idle gesture accepts a secondary.
    pub fn begin_secondary(&mut self, node: NodeId, contact: ContactId, now: Timestamp) -> bool {
        let Some(state) = self.states.get_mut(&node) else {
            return false;
        };
        if state.mode != GestureMode::Idle {
            return false;
        }

        let token = self
            .timers
            .schedule(node, contact, hold_deadline(now, self.hold_threshold_ms));
        state.secondary_contact_id = Some(contact);
        state.secondary_started_at = Some(now);
        state.mode = GestureMode::SecondaryPending;
        state.timer = Some(token);
        trace!("Node {} secondary {} pending", node, contact);
        true
    }

    /// The secondary contact lifted (or was cancelled).
    pub fn release_secondary(
        &mut self,
        node: NodeId,
        contact: ContactId,
        now: Timestamp,
        cancelled: bool,
    ) -> SecondaryRelease {
        let Some(state) = self.states.get_mut(&node) else {
            return SecondaryRelease::NotSecondary;
        };
        if state.secondary_contact_id != Some(contact) {
            return SecondaryRelease::NotSecondary;
        }

        if let Some(token) = state.timer {
            self.timers.cancel(token);
        }

        let held = state
            .secondary_started_at
            .is_some_and(|t| hold_exceeded(t, self.hold_threshold_ms, now));
        let release = match state.mode {
            GestureMode::Navigating => SecondaryRelease::NavigationEnded,
            GestureMode::SecondaryPending if cancelled => SecondaryRelease::Cancelled,
            GestureMode::SecondaryPending if !held => SecondaryRelease::Tap,
            GestureMode::SecondaryPending => SecondaryRelease::Expired,
            GestureMode::Idle => SecondaryRelease::NotSecondary,
        };

        state.reset_to_idle();
        release
    }

    /// Announce the node's current value and advance the cycle.
    ///
    /// The index only advances if the announcer accepted the utterance.
    pub fn announce_next(
        &mut self,
        node: &Node,
        announcer: &mut Announcer,
        out: &mut dyn SpeechOutput,
    ) -> bool {
        let Some(state) = self.states.get_mut(&node.id) else {
            return false;
        };
        let Some(value) = node.values.get(state.cycle_index) else {
            return false;
        };

        let text = format_announceable(value);
        if !announcer.announce(&text, out) {
            return false;
        }

        state.cycle_index = (state.cycle_index + 1) % state.value_count;
        debug!("Node {} announced \"{}\"", node.id, text);
        true
    }

    // -------------------------------
    // MARK: Timers
    // -------------------------------

    /// Fire every hold timer that expired before `now`.
    ///
    /// Each timer is checked against the current state first; a timer
    /// whose gesture moved on is discarded.
    pub fn fire_due(&mut self, now: Timestamp) -> Vec<HoldFired> {
        let mut fired = Vec::new();

        for timer in self.timers.take_expired(now) {
            let Some(state) = self.states.get_mut(&timer.node) else {
                trace!("Stale hold timer for node {}", timer.node);
                continue;
            };

            // The scheduler only yields timers whose deadline has passed
            let live = state.timer == Some(timer.token)
                && state.mode == GestureMode::SecondaryPending
                && state.secondary_contact_id == Some(timer.contact);
            if !live {
                trace!("Stale hold timer for node {}", timer.node);
                continue;
            }

            state.mode = GestureMode::Navigating;
            state.timer = None;
            debug!(
                "Node {} entering navigation (contact {})",
                timer.node, timer.contact
            );
            fired.push(HoldFired {
                node: timer.node,
                contact: timer.contact,
            });
        }

        fired
    }

    /// Earliest pending hold deadline.
    pub fn next_deadline(&self) -> Option<Timestamp> {
        self.timers.next_deadline()
    }

    // -------------------------------
    // MARK: Accessors
    // -------------------------------

    pub fn state(&self, node: NodeId) -> Option<&GestureState> {
        self.states.get(&node)
    }

    pub fn mode(&self, node: NodeId) -> Option<GestureMode> {
        self.states.get(&node).map(|s| s.mode)
    }

    /// Next index to announce; 0 for nodes without a gesture.
    pub fn cycle_index(&self, node: NodeId) -> usize {
        self.states.get(&node).map_or(0, |s| s.cycle_index)
    }

    #[cfg(test)]
    pub fn secondary_of(&self, node: NodeId) -> Option<ContactId> {
        self.states.get(&node).and_then(|s| s.secondary_contact_id)
    }

    #[cfg(test)]
    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::EffectLog;
    use crate::state::Announceable;

    fn node(values: &[&str]) -> Node {
        Node {
            id: 0,
            center: Point::new(100.0, 100.0),
            radius: 40.0,
            pitch: 261.63,
            values: values.iter().map(|v| Announceable::Text(v.to_string())).collect(),
        }
    }

    fn gestures() -> GestureDisambiguator {
        GestureDisambiguator::new(&InteractionConfig::default())
    }

    #[test]
    fn test_tap_announces_and_advances() {
        let node = node(&["cat", "kitten", "feline"]);
        let mut g = gestures();
        let mut announcer = Announcer::new();
        let mut out = EffectLog::new();

        g.begin_primary(0, node.values.len());
        assert!(g.begin_secondary(0, 2, 100.0));
        assert_eq!(g.mode(0), Some(GestureMode::SecondaryPending));

        assert_eq!(g.release_secondary(0, 2, 200.0, false), SecondaryRelease::Tap);
        assert!(g.announce_next(&node, &mut announcer, &mut out));
        assert_eq!(out.spoken(), vec!["cat"]);
        assert_eq!(g.cycle_index(0), 1);
        assert_eq!(g.mode(0), Some(GestureMode::Idle));
        assert_eq!(g.pending_timers(), 0);
    }

    #[test]
    fn test_cycle_wraps() {
        let node = node(&["a", "b"]);
        let mut g = gestures();
        let mut announcer = Announcer::new();
        let mut out = EffectLog::new();

        g.begin_primary(0, 2);
        for i in 0..5u64 {
            let t = i as f64 * 1000.0;
            g.begin_secondary(0, 10 + i, t);
            assert_eq!(g.release_secondary(0, 10 + i, t + 50.0, false), SecondaryRelease::Tap);
            g.announce_next(&node, &mut announcer, &mut out);
            announcer.utterance_finished();
        }
        assert_eq!(g.cycle_index(0), 5 % 2);
        assert_eq!(out.spoken(), vec!["a", "b", "a", "b", "a"]);
    }

    #[test]
    fn test_busy_announcer_does_not_advance() {
        let node = node(&["a", "b"]);
        let mut g = gestures();
        let mut announcer = Announcer::new();
        let mut out = EffectLog::new();

        g.begin_primary(0, 2);
        announcer.announce("something else", &mut out);
        assert!(!g.announce_next(&node, &mut announcer, &mut out));
        assert_eq!(g.cycle_index(0), 0);
    }

    #[test]
    fn test_hold_timer_boundary() {
        let mut g = gestures();
        g.begin_primary(0, 1);
        g.begin_secondary(0, 2, 1000.0);

        assert!(g.fire_due(1300.0).is_empty());
        assert_eq!(g.mode(0), Some(GestureMode::SecondaryPending));

        let fired = g.fire_due(1300.5);
        assert_eq!(fired, vec![HoldFired { node: 0, contact: 2 }]);
        assert_eq!(g.mode(0), Some(GestureMode::Navigating));

        assert_eq!(
            g.release_secondary(0, 2, 1400.0, false),
            SecondaryRelease::NavigationEnded
        );
        assert_eq!(g.mode(0), Some(GestureMode::Idle));
    }

    #[test]
    fn test_expired_timer_always_navigates() {
        // started_at + hold and now - started_at disagree by one ulp here
        let started_at = 169.1901034984733;
        let mut g = gestures();
        g.begin_primary(0, 1);
        g.begin_secondary(0, 2, started_at);

        g.fire_due(469.1901034984733);
        g.fire_due(469.1901034984733 + 1000.0);

        assert_eq!(g.mode(0), Some(GestureMode::Navigating));
        assert_eq!(g.next_deadline(), None);
    }

    #[test]
    fn test_release_agrees_with_timer_at_boundary() {
        let started_at = 169.1901034984733;
        let lift = 469.1901034984733;
        let mut g = gestures();
        g.begin_primary(0, 1);
        g.begin_secondary(0, 2, started_at);

        let fired = !g.fire_due(lift).is_empty();
        let release = g.release_secondary(0, 2, lift, false);
        let expected = if fired {
            SecondaryRelease::NavigationEnded
        } else {
            SecondaryRelease::Tap
        };
        assert_eq!(release, expected);
    }

    #[test]
    fn test_release_cancels_timer() {
        let mut g = gestures();
        g.begin_primary(0, 1);
        g.begin_secondary(0, 2, 0.0);
        g.release_secondary(0, 2, 100.0, false);

        assert!(g.fire_due(10_000.0).is_empty());
        assert_eq!(g.mode(0), Some(GestureMode::Idle));
    }

    #[test]
    fn test_timer_after_primary_lift_is_stale() {
        let mut g = gestures();
        g.begin_primary(0, 1);
        g.begin_secondary(0, 2, 0.0);

        let destroyed = g.end_primary(0).unwrap();
        assert_eq!(destroyed.mode, GestureMode::SecondaryPending);
        assert!(g.fire_due(10_000.0).is_empty());
        assert!(g.state(0).is_none());
        assert_eq!(g.cycle_index(0), 0);
    }

    #[test]
    fn test_new_primary_ignores_old_timer() {
        let mut g = gestures();
        g.begin_primary(0, 1);
        g.begin_secondary(0, 2, 0.0);
        g.begin_primary(0, 1);

        assert!(g.fire_due(10_000.0).is_empty());
        assert_eq!(g.mode(0), Some(GestureMode::Idle));
    }

    #[test]
    fn test_cancel_never_taps() {
        let mut g = gestures();
        g.begin_primary(0, 1);
        g.begin_secondary(0, 2, 0.0);
        assert_eq!(g.release_secondary(0, 2, 50.0, true), SecondaryRelease::Cancelled);
    }

    #[test]
    fn test_only_idle_gesture_accepts_secondary() {
        let mut g = gestures();
        g.begin_primary(0, 1);
        assert!(g.begin_secondary(0, 2, 0.0));
        assert!(!g.begin_secondary(0, 3, 10.0));
        assert!(!g.begin_secondary(7, 3, 10.0));
        assert_eq!(g.secondary_of(0), Some(2));
        assert_eq!(g.release_secondary(0, 3, 20.0, false), SecondaryRelease::NotSecondary);
    }

    #[test]
    fn test_secondary_candidate_picks_nearest_idle_primary() {
        let mut g = gestures();
        g.begin_primary(0, 1);
        g.begin_primary(1, 1);
        let primaries = vec![
            (0, Contact::new(1, Point::new(0.0, 0.0), 0.0)),
            (1, Contact::new(2, Point::new(100.0, 0.0), 0.0)),
        ];

        assert_eq!(g.secondary_candidate(Point::new(70.0, 0.0), primaries.clone()), Some(1));
        assert_eq!(g.secondary_candidate(Point::new(400.0, 0.0), primaries.clone()), None);

        g.begin_secondary(1, 3, 0.0);
        assert_eq!(g.secondary_candidate(Point::new(70.0, 0.0), primaries), Some(0));
    }
}
