// src/navigation.rs
//
// Proximity navigation: while active, a continuous tone gets louder as
// the navigating contact approaches the nearest link.

use log::{debug, trace};

use crate::config::InteractionConfig;
use crate::diagram::Diagram;
use crate::event::ContactId;
use crate::geometry::Point;
use crate::output::ToneOutput;
use crate::state::NodeId;

/// Who currently drives the navigation tone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavigationOwner {
    pub node: NodeId,
    pub contact: ContactId,
}

/// Linear falloff from full volume on a link to silence at `max_distance`.
///
/// `None` (no links at all) is silence.
#[inline]
pub fn volume_for_distance(min_distance: Option<f32>, max_distance: f32) -> f32 {
    match min_distance {
        Some(d) => (1.0 - d / max_distance).max(0.0),
        None => 0.0,
    }
}

pub struct ProximityNavigator {
    owner: Option<NavigationOwner>,
    gain: f32,
    max_feedback_distance: f32,
    entry_gain: f32,
    fade_in_ms: f64,
    fade_out_ms: f64,
}

impl ProximityNavigator {
    pub fn new(config: &InteractionConfig) -> Self {
        Self {
            owner: None,
            gain: 0.0,
            max_feedback_distance: config.max_feedback_distance,
            entry_gain: config.navigation_entry_gain,
            fade_in_ms: config.navigation_fade_in_ms,
            fade_out_ms: config.navigation_fade_out_ms,
        }
    }

    /// Fade the continuous tone in for `owner`.
    ///
    /// A second activation hands the tone to the newer owner.
    pub fn activate(&mut self, owner: NavigationOwner, out: &mut dyn ToneOutput) {
        if let Some(previous) = self.owner {
            debug!(
                "Navigation handed from node {} to node {}",
                previous.node, owner.node
            );
        }
        self.owner = Some(owner);
        self.gain = self.entry_gain;
        out.set_continuous_gain(self.entry_gain, self.fade_in_ms);
    }

    /// Fade the continuous tone out, if `owner` still holds it.
    pub fn deactivate(&mut self, owner: NavigationOwner, out: &mut dyn ToneOutput) {
        if self.owner != Some(owner) {
            trace!("Ignoring deactivate from non-owner {:?}", owner);
            return;
        }
        self.owner = None;
        self.gain = 0.0;
        out.set_continuous_gain(0.0, self.fade_out_ms);
    }

    /// Map the owning contact's position to gain, applied immediately.
    ///
    /// Returns the new gain, or `None` if the contact does not drive navigation.
    pub fn update(
        &mut self,
        contact: ContactId,
        position: Point,
        diagram: &Diagram,
        out: &mut dyn ToneOutput,
    ) -> Option<f32> {
        match self.owner {
            Some(owner) if owner.contact == contact => {}
            _ => return None,
        }

        let volume = self.volume_for(position, diagram);
        self.gain = volume;
        out.set_continuous_gain(volume, 0.0);
        trace!("Navigation gain {:.3} at ({}, {})", volume, position.x, position.y);
        Some(volume)
    }

    /// Volume a contact at `position` would produce.
    pub fn volume_for(&self, position: Point, diagram: &Diagram) -> f32 {
        volume_for_distance(
            diagram.nearest_link_distance(position),
            self.max_feedback_distance,
        )
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.owner.is_some()
    }

    pub fn owner(&self) -> Option<NavigationOwner> {
        self.owner
    }

    /// Last gain sent to the output.
    pub fn gain(&self) -> f32 {
        self.gain
    }
}
