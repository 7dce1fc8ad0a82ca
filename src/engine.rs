// src/engine.rs

use std::collections::HashMap;

use log::{debug, trace};

use crate::config::{InteractionConfig, InvalidConfig};
use crate::diagram::Diagram;
use crate::event::{Contact, ContactEvent, ContactId, Timestamp};
use crate::geometry::Point;
use crate::gesture::{GestureDisambiguator, GestureMode, GestureState, HoldFired, SecondaryRelease};
use crate::navigation::{NavigationOwner, ProximityNavigator};
use crate::output::Output;
use crate::speech::Announcer;
use crate::state::NodeId;
use crate::tracker::{ContactTracker, NodeTouchState, NodeTransition};
use crate::voice::{SourceId, Timbre};
use crate::voice_pool::VoicePool;

/// What a live contact is currently doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactRole {
    /// Roaming: not on a node, tracked against links.
    Free,
    /// Member of a node's contact set.
    Node(NodeId),
    /// Secondary of a node's gesture (pending tap or navigating).
    Secondary(NodeId),
}

#[derive(Debug, Clone, Copy)]
struct TrackedContact {
    contact: Contact,
    role: ContactRole,
}

/// Interaction engine for one diagram.
///
/// The host feeds it contact events and clock ticks; it drives the
/// host's tone, speech and highlight outputs. Every call runs to
/// completion before the next one, so no event ever observes another
/// half-applied.
pub struct Engine<O: Output> {
    diagram: Diagram,
    config: InteractionConfig,

    /// Live contacts by platform id
    contacts: HashMap<ContactId, TrackedContact>,

    tracker: ContactTracker,
    gestures: GestureDisambiguator,
    voices: VoicePool,
    navigator: ProximityNavigator,
    announcer: Announcer,

    output: O,

    /// Latest host time seen (never goes backwards)
    now: Timestamp,
}

impl<O: Output> Engine<O> {
    pub fn new(diagram: Diagram, output: O) -> Self {
        Self::build(diagram, InteractionConfig::default(), output)
    }

    pub fn with_config(
        diagram: Diagram,
        config: InteractionConfig,
        output: O,
    ) -> Result<Self, InvalidConfig> {
        config.validate()?;
        Ok(Self::build(diagram, config, output))
    }

    fn build(diagram: Diagram, config: InteractionConfig, output: O) -> Self {
        Self {
            diagram,
            contacts: HashMap::new(),
            tracker: ContactTracker::new(&config),
            gestures: GestureDisambiguator::new(&config),
            voices: VoicePool::from_config(&config),
            navigator: ProximityNavigator::new(&config),
            announcer: Announcer::new(),
            output,
            now: 0.0,
            config,
        }
    }

    // -------------------------------
    // MARK: Host entry points
    // -------------------------------

    /// Process one contact event.
    ///
    /// Timers due before the event's timestamp fire first, so a lift
    /// just past the hold threshold is seen as the end of a hold.
    pub fn handle_contact_event(&mut self, event: ContactEvent) {
        self.tick(event.timestamp());
        let now = self.now;

        match event {
            ContactEvent::Start {
                contact_id,
                position,
                ..
            } => self.contact_start(contact_id, position, now),

            ContactEvent::Move {
                contact_id,
                position,
                ..
            } => self.contact_move(contact_id, position, now),

            ContactEvent::End { contact_id, .. } => self.contact_end(contact_id, now, false),

            ContactEvent::Cancel { contact_id, .. } => self.contact_end(contact_id, now, true),
        }
    }

    /// Advance time: fire expired hold timers and progress voice envelopes.
    ///
    /// Hosts call this once per animation frame.
    pub fn tick(&mut self, now: Timestamp) {
        self.now = self.now.max(now);
        let now = self.now;

        for fired in self.gestures.fire_due(now) {
            self.enter_navigation(fired, now);
        }
        self.voices.advance(now, &mut self.output);
    }

    /// Host notification: the platform started speaking.
    pub fn speech_started(&mut self) {
        self.announcer.utterance_started();
    }

    /// Host notification: the current utterance finished.
    pub fn speech_finished(&mut self) {
        self.announcer.utterance_finished();
    }

    /// Drop every contact and fade everything out (focus loss, teardown).
    pub fn release_all(&mut self, now: Timestamp) {
        self.tick(now);
        let now = self.now;

        // Members first: their gestures go with them, so no secondary
        // ends a navigation and brings a node voice back mid-teardown.
        let mut ids: Vec<(bool, ContactId)> = self
            .contacts
            .iter()
            .map(|(id, t)| (!matches!(t.role, ContactRole::Node(_)), *id))
            .collect();
        ids.sort_unstable();
        for (_, id) in ids {
            self.contact_end(id, now, true);
        }
        if let Some(owner) = self.navigator.owner() {
            self.navigator.deactivate(owner, &mut self.output);
        }
        self.voices.release_all(now, &mut self.output);
    }

    // -------------------------------
    // MARK: Contact dispatch
    // -------------------------------

    fn contact_start(&mut self, id: ContactId, position: Point, now: Timestamp) {
        if self.contacts.contains_key(&id) {
            debug!("Duplicate start for contact {}", id);
            return;
        }

        let contact = Contact::new(id, position, now);
        let role = self.classify(position);
        self.contacts.insert(id, TrackedContact { contact, role });

        match role {
            ContactRole::Secondary(node) => {
                if !self.gestures.begin_secondary(node, id, now) {
                    self.set_role(id, ContactRole::Free);
                    self.roam(contact, None, now);
                }
            }
            ContactRole::Node(node) => self.join_node(node, contact, now),
            ContactRole::Free => self.roam(contact, None, now),
        }
    }

    fn contact_move(&mut self, id: ContactId, position: Point, now: Timestamp) {
        let Some(tracked) = self.contacts.get_mut(&id) else {
            trace!("Move for untracked contact {}", id);
            return;
        };
        let previous = tracked.contact.position;
        let role = tracked.role;
        tracked.contact = tracked.contact.moved_to(position);
        let contact = tracked.contact;

        match role {
            ContactRole::Secondary(_) => {
                self.navigator
                    .update(id, position, &self.diagram, &mut self.output);
            }
            ContactRole::Node(node) => {
                let Some(n) = self.diagram.node(node) else {
                    return;
                };
                let transition = self.tracker.on_contact_move(
                    n,
                    contact,
                    now,
                    &mut self.voices,
                    &mut self.output,
                );
                if let NodeTransition::Left { .. } = transition {
                    self.after_node_left(node, transition, now);
                    self.set_role(id, ContactRole::Free);
                    self.roam(contact, None, now);
                }
            }
            ContactRole::Free => self.roam(contact, Some(previous), now),
        }
    }

    fn contact_end(&mut self, id: ContactId, now: Timestamp, cancelled: bool) {
        let Some(tracked) = self.contacts.remove(&id) else {
            trace!("End for untracked contact {}", id);
            return;
        };

        match tracked.role {
            ContactRole::Secondary(node) => {
                let release = self.gestures.release_secondary(node, id, now, cancelled);
                match release {
                    SecondaryRelease::Tap => {
                        if let Some(n) = self.diagram.node(node) {
                            self.gestures
                                .announce_next(n, &mut self.announcer, &mut self.output);
                        }
                    }
                    SecondaryRelease::NavigationEnded => {
                        self.navigator
                            .deactivate(NavigationOwner { node, contact: id }, &mut self.output);
                        self.resume_node_voice(node, now);
                    }
                    SecondaryRelease::Expired
                    | SecondaryRelease::Cancelled
                    | SecondaryRelease::NotSecondary => {}
                }
            }
            ContactRole::Node(node) => {
                let transition =
                    self.tracker
                        .on_contact_end(node, id, now, &mut self.voices, &mut self.output);
                self.after_node_left(node, transition, now);
            }
            ContactRole::Free => self.tracker.forget_links(id),
        }
    }

    /// Decide what a new contact at `position` is.
    ///
    /// A contact inside another node's circle belongs to that node even
    /// when it is also near some primary; otherwise nearness to an idle
    /// primary makes it a secondary.
    fn classify(&self, position: Point) -> ContactRole {
        let hit = self
            .diagram
            .node_at(position, self.config.touch_margin)
            .map(|n| n.id);

        let primaries: Vec<(NodeId, Contact)> = self
            .tracker
            .active_nodes()
            .filter_map(|(node, state)| state.primary_contact.map(|c| (node, c)))
            .collect();
        let candidate = self.gestures.secondary_candidate(position, primaries);

        match (candidate, hit) {
            (Some(near), Some(on)) if near != on => ContactRole::Node(on),
            (Some(near), _) => ContactRole::Secondary(near),
            (None, Some(on)) => ContactRole::Node(on),
            (None, None) => ContactRole::Free,
        }
    }

    /// A free contact: join a node if it is on one, else track links.
    fn roam(&mut self, contact: Contact, previous: Option<Point>, now: Timestamp) {
        let id = contact.contact_id;
        let hit = self
            .diagram
            .node_at(contact.position, self.config.touch_margin)
            .map(|n| n.id);

        match hit {
            Some(node) => {
                self.tracker.forget_links(id);
                self.set_role(id, ContactRole::Node(node));
                self.join_node(node, contact, now);
            }
            None => {
                self.tracker.on_link_contact(
                    &self.diagram,
                    id,
                    previous,
                    contact.position,
                    now,
                    &mut self.voices,
                    &mut self.output,
                );
            }
        }
    }

    fn join_node(&mut self, node: NodeId, contact: Contact, now: Timestamp) {
        let Some(n) = self.diagram.node(node) else {
            return;
        };
        let transition = self.tracker.on_contact_start(
            n,
            contact,
            now,
            &mut self.voices,
            &mut self.output,
        );
        if matches!(transition, NodeTransition::Joined { primary: true }) {
            self.gestures.begin_primary(node, n.values.len());
        }
    }

    /// Wind down the gesture when a node's primary contact has gone.
    fn after_node_left(&mut self, node: NodeId, transition: NodeTransition, now: Timestamp) {
        let NodeTransition::Left {
            primary_lifted: true,
            new_primary,
            ..
        } = transition
        else {
            return;
        };

        if let Some(state) = self.gestures.end_primary(node) {
            self.abandon_secondary(node, &state);
        }

        if new_primary.is_some() {
            let value_count = self.diagram.node(node).map_or(1, |n| n.values.len());
            self.gestures.begin_primary(node, value_count);
            self.resume_node_voice(node, now);
        }
    }

    fn abandon_secondary(&mut self, node: NodeId, state: &GestureState) {
        let Some(secondary) = state.secondary_contact_id else {
            return;
        };
        if state.mode == GestureMode::Navigating {
            self.navigator.deactivate(
                NavigationOwner {
                    node,
                    contact: secondary,
                },
                &mut self.output,
            );
        }
        self.set_role(secondary, ContactRole::Free);
    }

    fn enter_navigation(&mut self, fired: HoldFired, now: Timestamp) {
        self.voices
            .stop(SourceId::Node(fired.node), now, &mut self.output);
        self.navigator.activate(
            NavigationOwner {
                node: fired.node,
                contact: fired.contact,
            },
            &mut self.output,
        );
    }

    /// Bring the node voice back if the node is still touched and no
    /// longer navigating.
    fn resume_node_voice(&mut self, node: NodeId, now: Timestamp) {
        if !self.tracker.is_sound_playing(node)
            || self.gestures.mode(node) == Some(GestureMode::Navigating)
        {
            return;
        }
        if let Some(n) = self.diagram.node(node) {
            self.voices.start(
                SourceId::Node(node),
                n.pitch,
                Timbre::Sustained,
                now,
                &mut self.output,
            );
        }
    }

    fn set_role(&mut self, id: ContactId, role: ContactRole) {
        if let Some(tracked) = self.contacts.get_mut(&id) {
            tracked.role = role;
        }
    }

    // -------------------------------
    // MARK: Accessors
    // -------------------------------

    pub fn diagram(&self) -> &Diagram {
        &self.diagram
    }

    pub fn config(&self) -> &InteractionConfig {
        &self.config
    }

    pub fn output(&self) -> &O {
        &self.output
    }

    pub fn output_mut(&mut self) -> &mut O {
        &mut self.output
    }

    pub fn node_state(&self, node: NodeId) -> Option<&NodeTouchState> {
        self.tracker.node_state(node)
    }

    pub fn is_sound_playing(&self, node: NodeId) -> bool {
        self.tracker.is_sound_playing(node)
    }

    pub fn gesture_state(&self, node: NodeId) -> Option<&GestureState> {
        self.gestures.state(node)
    }

    pub fn gesture_mode(&self, node: NodeId) -> Option<GestureMode> {
        self.gestures.mode(node)
    }

    pub fn cycle_index(&self, node: NodeId) -> usize {
        self.gestures.cycle_index(node)
    }

    pub fn contact_role(&self, id: ContactId) -> Option<ContactRole> {
        self.contacts.get(&id).map(|t| t.role)
    }

    pub fn active_contacts(&self) -> usize {
        self.contacts.len()
    }

    pub fn voices(&self) -> &VoicePool {
        &self.voices
    }

    pub fn navigator(&self) -> &ProximityNavigator {
        &self.navigator
    }

    pub fn is_speaking(&self) -> bool {
        self.announcer.is_speaking()
    }

    /// When the host should tick next to resolve a pending hold.
    pub fn next_deadline(&self) -> Option<Timestamp> {
        self.gestures.next_deadline()
    }

    pub fn now(&self) -> Timestamp {
        self.now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::compile;
    use crate::output::{Effect, EffectLog};
    use crate::state::{Announceable, DiagramDef};

    const A: NodeId = 0;
    const B: NodeId = 1;

    /// Node A at (100, 200), node B at (400, 200), radius 50, linked.
    fn engine() -> Engine<EffectLog> {
        let mut def = DiagramDef::new();
        let a = def.add_node(
            (100.0, 200.0),
            50.0,
            261.63,
            vec!["cat".into(), "kitten".into(), "feline".into()],
        );
        let b = def.add_node((400.0, 200.0), 50.0, 329.63, vec![Announceable::Number(7.0)]);
        def.add_link(a, b, 440.0);
        Engine::new(compile(&def).unwrap(), EffectLog::new())
    }

    fn start(e: &mut Engine<EffectLog>, id: ContactId, x: f32, y: f32, t: f64) {
        e.handle_contact_event(ContactEvent::start(id, (x, y), t));
    }

    fn moved(e: &mut Engine<EffectLog>, id: ContactId, x: f32, y: f32, t: f64) {
        e.handle_contact_event(ContactEvent::moved(id, (x, y), t));
    }

    fn end(e: &mut Engine<EffectLog>, id: ContactId, t: f64) {
        e.handle_contact_event(ContactEvent::end(id, t));
    }

    fn spoken(e: &Engine<EffectLog>) -> Vec<String> {
        e.output().spoken().into_iter().map(String::from).collect()
    }

    #[test]
    fn test_tap_announces_cycle() {
        let mut e = engine();

        start(&mut e, 1, 100.0, 200.0, 0.0);
        assert!(e.is_sound_playing(A));
        assert_eq!(e.output().starts_of(SourceId::Node(A)), 1);

        start(&mut e, 2, 150.0, 200.0, 1000.0);
        assert_eq!(e.contact_role(2), Some(ContactRole::Secondary(A)));
        end(&mut e, 2, 1100.0);
        assert_eq!(spoken(&e), vec!["cat"]);
        assert_eq!(e.cycle_index(A), 1);

        e.speech_finished();
        start(&mut e, 3, 150.0, 200.0, 2000.0);
        end(&mut e, 3, 2100.0);
        assert_eq!(spoken(&e), vec!["cat", "kitten"]);
        assert_eq!(e.cycle_index(A), 2);

        // Secondaries never touch the node voice
        assert_eq!(e.output().starts_of(SourceId::Node(A)), 1);
        assert_eq!(e.output().stops_of(SourceId::Node(A)), 0);
    }

    #[test]
    fn test_hold_enters_navigation_without_speaking() {
        let mut e = engine();

        start(&mut e, 1, 100.0, 200.0, 0.0);
        start(&mut e, 2, 150.0, 200.0, 1000.0);
        end(&mut e, 2, 1500.0);

        assert!(spoken(&e).is_empty());
        assert_eq!(e.output().stops_of(SourceId::Node(A)), 1);
        assert!(!e.navigator().is_active());
        assert_eq!(e.output().last_gain(), Some((0.0, 500.0)));
        assert_eq!(e.gesture_mode(A), Some(GestureMode::Idle));
        assert_eq!(e.cycle_index(A), 0);
    }

    #[test]
    fn test_navigation_entered_on_tick_and_voice_resumes_after() {
        let mut e = engine();

        start(&mut e, 1, 100.0, 200.0, 0.0);
        start(&mut e, 2, 150.0, 200.0, 1000.0);
        e.tick(1301.0);

        assert_eq!(e.gesture_mode(A), Some(GestureMode::Navigating));
        assert!(e.navigator().is_active());
        assert!(!e.voices().is_sounding(SourceId::Node(A)));
        assert!(e.is_sound_playing(A));
        assert_eq!(e.output().last_gain(), Some((0.5, 100.0)));

        // Gain follows the navigating contact immediately
        moved(&mut e, 2, 250.0, 250.0, 1320.0);
        assert_eq!(e.output().last_gain(), Some((0.75, 0.0)));
        moved(&mut e, 2, 250.0, 500.0, 1340.0);
        assert_eq!(e.output().last_gain(), Some((0.0, 0.0)));

        end(&mut e, 2, 1400.0);
        assert!(e.voices().is_sounding(SourceId::Node(A)));
        assert_eq!(e.output().starts_of(SourceId::Node(A)), 2);
    }

    #[test]
    fn test_hold_threshold_boundary() {
        let mut e = engine();
        start(&mut e, 1, 100.0, 200.0, 0.0);

        start(&mut e, 2, 150.0, 200.0, 1000.0);
        end(&mut e, 2, 1299.9);
        assert_eq!(spoken(&e), vec!["cat"]);
        assert_eq!(e.output().stops_of(SourceId::Node(A)), 0);

        e.speech_finished();
        start(&mut e, 3, 150.0, 200.0, 2000.0);
        end(&mut e, 3, 2300.1);
        assert_eq!(spoken(&e), vec!["cat"]);
        assert_eq!(e.output().stops_of(SourceId::Node(A)), 1);
        assert_eq!(e.cycle_index(A), 1);
    }

    #[test]
    fn test_lift_exactly_at_threshold_is_a_tap() {
        let mut e = engine();
        start(&mut e, 1, 100.0, 200.0, 0.0);
        start(&mut e, 2, 150.0, 200.0, 1000.0);
        end(&mut e, 2, 1300.0);
        assert_eq!(spoken(&e), vec!["cat"]);
    }

    #[test]
    fn test_sub_frame_tap() {
        let mut e = engine();
        start(&mut e, 1, 100.0, 200.0, 0.0);
        start(&mut e, 2, 150.0, 200.0, 500.0);
        end(&mut e, 2, 500.0);

        assert_eq!(spoken(&e), vec!["cat"]);
        assert_eq!(e.gesture_mode(A), Some(GestureMode::Idle));
        assert_eq!(e.next_deadline(), None);
    }

    #[test]
    fn test_stale_timer_does_not_navigate() {
        let mut e = engine();
        start(&mut e, 1, 100.0, 200.0, 0.0);
        start(&mut e, 2, 150.0, 200.0, 1000.0);
        end(&mut e, 2, 1100.0);
        e.tick(5000.0);

        assert!(!e.navigator().is_active());
        assert_eq!(e.gesture_mode(A), Some(GestureMode::Idle));
        assert_eq!(e.output().stops_of(SourceId::Node(A)), 0);
    }

    #[test]
    fn test_busy_speech_drops_tap() {
        let mut e = engine();
        start(&mut e, 1, 100.0, 200.0, 0.0);
        start(&mut e, 2, 150.0, 200.0, 1000.0);
        end(&mut e, 2, 1050.0);
        start(&mut e, 3, 150.0, 200.0, 1100.0);
        end(&mut e, 3, 1150.0);

        assert!(e.is_speaking());
        assert_eq!(spoken(&e), vec!["cat"]);
        assert_eq!(e.cycle_index(A), 1);
    }

    #[test]
    fn test_cycle_is_taps_mod_len_and_resets_on_lift() {
        let mut e = engine();
        start(&mut e, 1, 100.0, 200.0, 0.0);

        for i in 0..7u64 {
            let t = 1000.0 * (i + 1) as f64;
            start(&mut e, 10 + i, 140.0, 220.0, t);
            end(&mut e, 10 + i, t + 80.0);
            e.speech_finished();
        }
        assert_eq!(e.cycle_index(A), 7 % 3);

        end(&mut e, 1, 9000.0);
        assert_eq!(e.cycle_index(A), 0);
        assert!(e.gesture_state(A).is_none());
        assert!(!e.is_sound_playing(A));

        start(&mut e, 20, 100.0, 200.0, 10_000.0);
        start(&mut e, 21, 150.0, 200.0, 10_100.0);
        end(&mut e, 21, 10_150.0);
        assert_eq!(spoken(&e).last().map(String::as_str), Some("cat"));
    }

    #[test]
    fn test_number_values_are_spoken_plainly() {
        let mut e = engine();
        start(&mut e, 1, 400.0, 200.0, 0.0);
        start(&mut e, 2, 430.0, 180.0, 100.0);
        end(&mut e, 2, 150.0);
        assert_eq!(spoken(&e), vec!["7"]);
        assert_eq!(e.cycle_index(B), 0);
    }

    #[test]
    fn test_two_nodes_are_independent() {
        let mut e = engine();
        start(&mut e, 1, 100.0, 200.0, 0.0);
        start(&mut e, 2, 400.0, 200.0, 0.0);

        assert_eq!(e.contact_role(2), Some(ContactRole::Node(B)));
        assert!(e.is_sound_playing(A));
        assert!(e.is_sound_playing(B));

        end(&mut e, 1, 50.0);
        assert!(!e.is_sound_playing(A));
        assert!(e.is_sound_playing(B));
        assert_eq!(e.output().stops_of(SourceId::Node(B)), 0);
    }

    #[test]
    fn test_contact_on_nearby_node_is_not_a_secondary() {
        let mut def = DiagramDef::new();
        let a = def.add_node((100.0, 200.0), 30.0, 261.63, vec!["a".into()]);
        let b = def.add_node((220.0, 200.0), 30.0, 329.63, vec!["b".into()]);
        let mut e = Engine::new(compile(&def).unwrap(), EffectLog::new());

        start(&mut e, 1, 100.0, 200.0, 0.0);
        start(&mut e, 2, 220.0, 200.0, 10.0);

        assert_eq!(e.contact_role(2), Some(ContactRole::Node(b)));
        assert!(e.is_sound_playing(a));
        assert!(e.is_sound_playing(b));
        assert_eq!(e.gesture_mode(a), Some(GestureMode::Idle));
    }

    #[test]
    fn test_link_crossing_plucks_once_per_entry() {
        let mut e = engine();
        let link = SourceId::Link(0);

        start(&mut e, 1, 250.0, 150.0, 0.0);
        assert_eq!(e.contact_role(1), Some(ContactRole::Free));

        moved(&mut e, 1, 250.0, 190.0, 16.0);
        moved(&mut e, 1, 250.0, 198.0, 32.0);
        moved(&mut e, 1, 255.0, 201.0, 48.0);
        moved(&mut e, 1, 260.0, 203.0, 64.0);
        moved(&mut e, 1, 265.0, 197.0, 80.0);
        assert_eq!(e.output().starts_of(link), 1);

        moved(&mut e, 1, 265.0, 230.0, 96.0);
        moved(&mut e, 1, 270.0, 199.0, 112.0);
        assert_eq!(e.output().starts_of(link), 2);
        assert_eq!(e.voices().active_count(), 1);
    }

    #[test]
    fn test_roaming_contact_enters_and_leaves_node() {
        let mut e = engine();
        start(&mut e, 1, 250.0, 100.0, 0.0);
        assert!(!e.is_sound_playing(A));

        moved(&mut e, 1, 120.0, 200.0, 20.0);
        assert_eq!(e.contact_role(1), Some(ContactRole::Node(A)));
        assert!(e.is_sound_playing(A));
        assert_eq!(e.gesture_mode(A), Some(GestureMode::Idle));

        moved(&mut e, 1, 250.0, 100.0, 40.0);
        assert_eq!(e.contact_role(1), Some(ContactRole::Free));
        assert!(!e.is_sound_playing(A));
        assert!(e.gesture_state(A).is_none());
    }

    #[test]
    fn test_primary_lift_during_navigation() {
        let mut e = engine();
        start(&mut e, 1, 100.0, 200.0, 0.0);
        start(&mut e, 2, 150.0, 200.0, 1000.0);
        e.tick(1400.0);
        assert!(e.navigator().is_active());

        end(&mut e, 1, 1500.0);
        assert!(!e.navigator().is_active());
        assert_eq!(e.output().last_gain(), Some((0.0, 500.0)));
        assert_eq!(e.contact_role(2), Some(ContactRole::Free));
        assert!(e.gesture_state(A).is_none());
        assert!(!e.is_sound_playing(A));

        // The orphan lifting later is just a free contact ending
        end(&mut e, 2, 1600.0);
        assert!(spoken(&e).is_empty());
    }

    #[test]
    fn test_primary_promotion_resets_gesture() {
        let mut e = engine();
        start(&mut e, 1, 100.0, 200.0, 0.0);
        start(&mut e, 2, 150.0, 200.0, 100.0);
        end(&mut e, 2, 150.0);
        assert_eq!(e.cycle_index(A), 1);

        // A roaming contact slides onto A and becomes a plain member
        start(&mut e, 4, 250.0, 50.0, 300.0);
        moved(&mut e, 4, 60.0, 200.0, 320.0);
        assert_eq!(e.contact_role(4), Some(ContactRole::Node(A)));

        end(&mut e, 1, 400.0);
        let state = e.node_state(A).unwrap();
        assert_eq!(state.primary_id(), Some(4));
        assert!(state.is_sound_playing);
        assert_eq!(e.cycle_index(A), 0);
        assert_eq!(e.gesture_mode(A), Some(GestureMode::Idle));
        assert_eq!(e.output().stops_of(SourceId::Node(A)), 0);
    }

    #[test]
    fn test_navigation_ends_when_promoted_primary_takes_over() {
        let mut e = engine();
        start(&mut e, 1, 100.0, 200.0, 0.0);
        start(&mut e, 4, 250.0, 50.0, 10.0);
        moved(&mut e, 4, 60.0, 200.0, 20.0);
        start(&mut e, 2, 150.0, 200.0, 100.0);
        e.tick(500.0);
        assert!(!e.voices().is_sounding(SourceId::Node(A)));

        end(&mut e, 1, 600.0);
        assert!(!e.navigator().is_active());
        assert_eq!(e.contact_role(2), Some(ContactRole::Free));
        assert_eq!(e.node_state(A).and_then(|s| s.primary_id()), Some(4));
        assert!(e.voices().is_sounding(SourceId::Node(A)));
    }

    #[test]
    fn test_cancelled_secondary_is_silent() {
        let mut e = engine();
        start(&mut e, 1, 100.0, 200.0, 0.0);
        start(&mut e, 2, 150.0, 200.0, 100.0);
        e.handle_contact_event(ContactEvent::cancel(2, 150.0));

        assert!(spoken(&e).is_empty());
        assert_eq!(e.gesture_mode(A), Some(GestureMode::Idle));
        assert_eq!(e.next_deadline(), None);
    }

    #[test]
    fn test_stale_and_duplicate_events_are_ignored() {
        let mut e = engine();
        end(&mut e, 42, 0.0);
        moved(&mut e, 42, 1.0, 1.0, 1.0);

        start(&mut e, 1, 100.0, 200.0, 2.0);
        start(&mut e, 1, 400.0, 200.0, 3.0);
        assert_eq!(e.contact_role(1), Some(ContactRole::Node(A)));
        assert!(!e.is_sound_playing(B));

        end(&mut e, 1, 4.0);
        end(&mut e, 1, 5.0);
        assert_eq!(e.output().stops_of(SourceId::Node(A)), 1);
        assert_eq!(e.active_contacts(), 0);
    }

    #[test]
    fn test_full_pool_degrades_silently() {
        let mut def = DiagramDef::new();
        for i in 0..9 {
            def.add_node((i as f32 * 300.0, 0.0), 20.0, 200.0 + i as f32, vec![i.into()]);
        }
        let mut e = Engine::new(compile(&def).unwrap(), EffectLog::new());

        for i in 0..9u64 {
            start(&mut e, i, i as f32 * 300.0, 0.0, 0.0);
        }
        e.tick(50.0);

        assert_eq!(e.voices().sustaining_count(), 8);
        assert_eq!(e.voices().active_count(), 8);
        assert_eq!(e.voices().state_of(SourceId::Node(8)), None);
        assert!(e.is_sound_playing(8));
    }

    #[test]
    fn test_release_all_never_restarts_a_voice() {
        // HashMap order differs per engine; every order must stay silent
        for _ in 0..32 {
            let mut e = engine();
            start(&mut e, 1, 100.0, 200.0, 0.0);
            start(&mut e, 2, 150.0, 200.0, 10.0);
            start(&mut e, 3, 400.0, 200.0, 20.0);
            start(&mut e, 4, 430.0, 200.0, 30.0);
            e.tick(400.0);
            assert_eq!(e.gesture_mode(A), Some(GestureMode::Navigating));
            assert_eq!(e.gesture_mode(B), Some(GestureMode::Navigating));

            e.output_mut().clear();
            e.release_all(500.0);

            assert!(
                !e.output()
                    .effects()
                    .iter()
                    .any(|fx| matches!(fx, Effect::StartVoice { .. })),
                "{:?}",
                e.output().effects()
            );
            assert!(!e.navigator().is_active());
            assert_eq!(e.active_contacts(), 0);
        }
    }

    #[test]
    fn test_hold_navigates_at_ulp_boundary() {
        let mut e = engine();
        start(&mut e, 1, 100.0, 200.0, 0.0);
        start(&mut e, 2, 150.0, 200.0, 169.1901034984733);
        e.tick(469.1901034984733);
        e.tick(1469.1901034984733);

        assert_eq!(e.gesture_mode(A), Some(GestureMode::Navigating));
        assert!(e.navigator().is_active());
        assert_eq!(e.next_deadline(), None);
    }

    #[test]
    fn test_release_all() {
        let mut e = engine();
        start(&mut e, 1, 100.0, 200.0, 0.0);
        start(&mut e, 2, 150.0, 200.0, 10.0);
        e.tick(400.0);
        assert!(e.navigator().is_active());

        e.release_all(500.0);
        assert_eq!(e.active_contacts(), 0);
        assert!(!e.navigator().is_active());
        assert!(!e.is_sound_playing(A));
        assert!(spoken(&e).is_empty());
        e.tick(2000.0);
        assert_eq!(e.voices().active_count(), 0);
    }

    #[test]
    fn test_with_config_rejects_invalid() {
        let config = InteractionConfig::default().with_max_voices(0);
        let result = Engine::with_config(Diagram::default(), config, EffectLog::new());
        assert!(result.is_err());
    }

    /// Deterministic pseudo-random contact stream; checks the voice
    /// claim invariants after every event.
    #[test]
    fn test_voice_invariants_hold_for_any_sequence() {
        let mut e = engine();
        let mut seed: u64 = 0x2545_f491_4f6c_dd1d;
        let mut next = move |bound: u64| {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            seed % bound
        };

        let mut live = [false; 5];
        let mut t = 0.0;

        for _ in 0..4000 {
            t += (next(120) + 1) as f64;
            let id = next(5);
            let slot = id as usize;
            let x = next(500) as f32;
            let y = 100.0 + next(200) as f32;

            match (live[slot], next(4)) {
                (false, _) => {
                    start(&mut e, id, x, y, t);
                    live[slot] = true;
                }
                (true, 0) => {
                    end(&mut e, id, t);
                    live[slot] = false;
                }
                (true, 1) => e.tick(t),
                (true, _) => moved(&mut e, id, x, y, t),
            }

            for node in [A, B] {
                let claimed = e.node_state(node).is_some_and(|s| s.is_sound_playing);
                let members = e.node_state(node).map_or(0, |s| s.len());
                assert_eq!(claimed, members > 0);

                let navigating = e.gesture_mode(node) == Some(GestureMode::Navigating);
                assert_eq!(
                    e.voices().is_sounding(SourceId::Node(node)),
                    claimed && !navigating
                );
                assert!(e.cycle_index(node) < e.diagram().node(node).unwrap().values.len());
            }
            assert!(e.voices().active_count() <= e.voices().capacity());
        }
    }
}
