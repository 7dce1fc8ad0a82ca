// src/diagram.rs

use std::collections::HashMap;

use crate::geometry::{Point, SegmentHit, closest_point_on_segment, distance, point_in_circle};
use crate::state::{Announceable, LinkId, NodeId, Pitch};

/// A validated node, ready for hit testing.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub center: Point,
    pub radius: f32,
    pub pitch: Pitch,
    /// Never empty.
    pub values: Vec<Announceable>,
}

impl Node {
    /// Visual radius plus the touch-forgiveness margin.
    #[inline]
    pub fn effective_radius(&self, touch_margin: f32) -> f32 {
        self.radius + touch_margin
    }

    #[inline]
    pub fn contains(&self, p: Point, touch_margin: f32) -> bool {
        point_in_circle(p, self.center, self.effective_radius(touch_margin))
    }
}

/// A validated link with its derived hit segment.
///
/// The segment runs between the two node rims, so it never overlaps
/// either disc.
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    pub id: LinkId,
    pub endpoint_a: NodeId,
    pub endpoint_b: NodeId,
    pub pitch: Pitch,
    pub start: Point,
    pub end: Point,
}

impl Link {
    #[inline]
    pub fn hit(&self, p: Point) -> SegmentHit {
        closest_point_on_segment(p, self.start, self.end)
    }
}

/// Runtime diagram.
///
/// Built by `compile`; immutable while contacts are being processed.
#[derive(Debug, Clone, Default)]
pub struct Diagram {
    nodes: Vec<Node>,
    links: Vec<Link>,
    node_index: HashMap<NodeId, usize>,
    link_index: HashMap<LinkId, usize>,
}

impl Diagram {
    pub(crate) fn from_parts(nodes: Vec<Node>, links: Vec<Link>) -> Self {
        let node_index = nodes.iter().enumerate().map(|(i, n)| (n.id, i)).collect();
        let link_index = links.iter().enumerate().map(|(i, l)| (l.id, i)).collect();
        Self {
            nodes,
            links,
            node_index,
            link_index,
        }
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.node_index.get(&id).map(|&i| &self.nodes[i])
    }

    pub fn link(&self, id: LinkId) -> Option<&Link> {
        self.link_index.get(&id).map(|&i| &self.links[i])
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    /// The node whose effective circle contains `p`.
    ///
    /// Overlapping effective circles resolve to the nearest center.
    pub fn node_at(&self, p: Point, touch_margin: f32) -> Option<&Node> {
        self.nodes
            .iter()
            .filter(|n| n.contains(p, touch_margin))
            .min_by(|a, b| distance(p, a.center).total_cmp(&distance(p, b.center)))
    }

    /// Distance from `p` to the closest link segment, if there are any links.
    pub fn nearest_link_distance(&self, p: Point) -> Option<f32> {
        self.links
            .iter()
            .map(|l| l.hit(p).distance)
            .min_by(f32::total_cmp)
    }
}
