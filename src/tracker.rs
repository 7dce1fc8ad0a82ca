// src/tracker.rs
//
// Per-shape contact membership.
//
// Nodes: the node voice is claimed when the first contact enters the
// node's effective circle and released when the last one leaves. That
// is the only place a node voice is started or stopped for membership
// reasons, which is what keeps `is_sound_playing` honest.
//
// Links: a pluck fires when a contact enters the hit band from outside,
// or jumps across the segment between two moves. Moving around inside
// the band never re-triggers.

use std::collections::{HashMap, HashSet};

use log::{debug, trace};

use crate::config::InteractionConfig;
use crate::diagram::{Diagram, Node};
use crate::event::{Contact, ContactId, Timestamp};
use crate::geometry::{Point, segments_intersect};
use crate::output::Output;
use crate::state::{LinkId, NodeId};
use crate::voice::{SourceId, Timbre};
use crate::voice_pool::VoicePool;

/// Touch state of one node with at least one contact.
#[derive(Debug, Clone)]
pub struct NodeTouchState {
    /// First contact to arrive; promoted from the rest when it leaves.
    pub primary_contact: Option<Contact>,
    active: HashMap<ContactId, Contact>,
    /// The tracker's claim on the node voice.
    pub is_sound_playing: bool,
}

impl NodeTouchState {
    fn new() -> Self {
        Self {
            primary_contact: None,
            active: HashMap::new(),
            is_sound_playing: false,
        }
    }

    pub fn active_contact_ids(&self) -> impl Iterator<Item = ContactId> + '_ {
        self.active.keys().copied()
    }

    pub fn contains(&self, contact: ContactId) -> bool {
        self.active.contains_key(&contact)
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn primary_id(&self) -> Option<ContactId> {
        self.primary_contact.map(|c| c.contact_id)
    }
}

/// Membership change caused by one contact event on one node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeTransition {
    Unchanged,

    /// The contact entered the node.
    Joined {
        /// It is the node's first contact and therefore its primary.
        primary: bool,
    },

    /// The contact left the node.
    Left {
        primary_lifted: bool,
        /// Promoted primary when the old one left and others remain.
        new_primary: Option<Contact>,
        /// No contacts remain; the node voice was released.
        emptied: bool,
    },
}

pub struct ContactTracker {
    nodes: HashMap<NodeId, NodeTouchState>,
    link_bands: HashMap<LinkId, HashSet<ContactId>>,
    touch_margin: f32,
    link_hit_tolerance: f32,
}

impl ContactTracker {
    pub fn new(config: &InteractionConfig) -> Self {
        Self {
            nodes: HashMap::new(),
            link_bands: HashMap::new(),
            touch_margin: config.touch_margin,
            link_hit_tolerance: config.link_hit_tolerance,
        }
    }

    // -------------------------------
    // MARK: Nodes
    // -------------------------------

    /// A contact began; it joins `node` if it lands in the effective circle.
    pub fn on_contact_start<O: Output>(
        &mut self,
        node: &Node,
        contact: Contact,
        now: Timestamp,
        pool: &mut VoicePool,
        out: &mut O,
    ) -> NodeTransition {
        if !node.contains(contact.position, self.touch_margin) {
            return NodeTransition::Unchanged;
        }
        if self.is_member(node.id, contact.contact_id) {
            trace!("Contact {} already on node {}", contact.contact_id, node.id);
            return NodeTransition::Unchanged;
        }
        self.join(node, contact, now, pool, out)
    }

    /// A contact moved; membership of `node` is re-evaluated.
    pub fn on_contact_move<O: Output>(
        &mut self,
        node: &Node,
        contact: Contact,
        now: Timestamp,
        pool: &mut VoicePool,
        out: &mut O,
    ) -> NodeTransition {
        let inside = node.contains(contact.position, self.touch_margin);
        let member = self.is_member(node.id, contact.contact_id);

        match (member, inside) {
            (false, true) => self.join(node, contact, now, pool, out),
            (true, false) => self.leave(node.id, contact.contact_id, now, pool, out),
            (true, true) => {
                if let Some(state) = self.nodes.get_mut(&node.id) {
                    state.active.insert(contact.contact_id, contact);
                    if state.primary_id() == Some(contact.contact_id) {
                        state.primary_contact = Some(contact);
                    }
                }
                NodeTransition::Unchanged
            }
            (false, false) => NodeTransition::Unchanged,
        }
    }

    /// A contact lifted.
    pub fn on_contact_end<O: Output>(
        &mut self,
        node_id: NodeId,
        contact_id: ContactId,
        now: Timestamp,
        pool: &mut VoicePool,
        out: &mut O,
    ) -> NodeTransition {
        if !self.is_member(node_id, contact_id) {
            return NodeTransition::Unchanged;
        }
        self.leave(node_id, contact_id, now, pool, out)
    }

    fn join<O: Output>(
        &mut self,
        node: &Node,
        contact: Contact,
        now: Timestamp,
        pool: &mut VoicePool,
        out: &mut O,
    ) -> NodeTransition {
        let state = self.nodes.entry(node.id).or_insert_with(NodeTouchState::new);
        let first = state.active.is_empty();
        state.active.insert(contact.contact_id, contact);

        if first {
            state.primary_contact = Some(contact);
            state.is_sound_playing = true;
            pool.start(SourceId::Node(node.id), node.pitch, Timbre::Sustained, now, out);
            out.set_highlight(node.id, true);
            debug!("Node {} claimed by contact {}", node.id, contact.contact_id);
        }

        NodeTransition::Joined { primary: first }
    }

    fn leave<O: Output>(
        &mut self,
        node_id: NodeId,
        contact_id: ContactId,
        now: Timestamp,
        pool: &mut VoicePool,
        out: &mut O,
    ) -> NodeTransition {
        let Some(state) = self.nodes.get_mut(&node_id) else {
            return NodeTransition::Unchanged;
        };

        state.active.remove(&contact_id);
        let primary_lifted = state.primary_id() == Some(contact_id);

        if state.active.is_empty() {
            self.nodes.remove(&node_id);
            pool.stop(SourceId::Node(node_id), now, out);
            out.set_highlight(node_id, false);
            debug!("Node {} released by contact {}", node_id, contact_id);
            return NodeTransition::Left {
                primary_lifted,
                new_primary: None,
                emptied: true,
            };
        }

        let mut new_primary = None;
        if primary_lifted {
            new_primary = state
                .active
                .values()
                .min_by(|a, b| {
                    a.started_at
                        .total_cmp(&b.started_at)
                        .then(a.contact_id.cmp(&b.contact_id))
                })
                .copied();
            state.primary_contact = new_primary;
        }

        NodeTransition::Left {
            primary_lifted,
            new_primary,
            emptied: false,
        }
    }

    pub fn is_member(&self, node_id: NodeId, contact_id: ContactId) -> bool {
        self.nodes
            .get(&node_id)
            .is_some_and(|s| s.contains(contact_id))
    }

    pub fn node_state(&self, node_id: NodeId) -> Option<&NodeTouchState> {
        self.nodes.get(&node_id)
    }

    pub fn is_sound_playing(&self, node_id: NodeId) -> bool {
        self.nodes
            .get(&node_id)
            .is_some_and(|s| s.is_sound_playing)
    }

    #[cfg(test)]
    pub fn primary_of(&self, node_id: NodeId) -> Option<Contact> {
        self.nodes.get(&node_id).and_then(|s| s.primary_contact)
    }

    /// Nodes that currently have contacts.
    pub fn active_nodes(&self) -> impl Iterator<Item = (NodeId, &NodeTouchState)> {
        self.nodes.iter().map(|(id, s)| (*id, s))
    }

    // -------------------------------
    // MARK: Links
    // -------------------------------

    /// Track a roaming contact against every link; pluck on entry or crossing.
    ///
    /// Returns the links that were plucked.
    pub fn on_link_contact<O: Output>(
        &mut self,
        diagram: &Diagram,
        contact_id: ContactId,
        previous: Option<Point>,
        position: Point,
        now: Timestamp,
        pool: &mut VoicePool,
        out: &mut O,
    ) -> Vec<LinkId> {
        let mut plucked = Vec::new();

        for link in diagram.links() {
            let in_band = link.hit(position).distance <= self.link_hit_tolerance;
            let band = self.link_bands.entry(link.id).or_default();
            let was_in_band = band.contains(&contact_id);

            let pluck = match (was_in_band, in_band) {
                (false, true) => {
                    band.insert(contact_id);
                    true
                }
                (true, false) => {
                    band.remove(&contact_id);
                    false
                }
                (true, true) => false,
                (false, false) => previous
                    .is_some_and(|prev| segments_intersect(prev, position, link.start, link.end)),
            };

            if pluck {
                trace!("Contact {} plucked link {}", contact_id, link.id);
                pool.start(SourceId::Link(link.id), link.pitch, Timbre::Pluck, now, out);
                plucked.push(link.id);
            }
        }

        plucked
    }

    /// Drop all link-band state for a contact.
    pub fn forget_links(&mut self, contact_id: ContactId) {
        for band in self.link_bands.values_mut() {
            band.remove(&contact_id);
        }
    }

    pub fn in_link_band(&self, link_id: LinkId, contact_id: ContactId) -> bool {
        self.link_bands
            .get(&link_id)
            .is_some_and(|b| b.contains(&contact_id))
    }
}
