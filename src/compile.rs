// src/compile.rs
//
// Compiles DiagramDef (declarative) into Diagram (runtime).
//
// This is the bridge between the host's description of the diagram
// and the structure the interaction engine hit-tests against.

use std::collections::HashSet;

use crate::diagram::{Diagram, Link, Node};
use crate::geometry::{Point, distance};
use crate::state::{DiagramDef, LinkId, NodeDef, NodeId};

/// Error during diagram compilation.
#[derive(Debug, Clone, PartialEq)]
pub enum DiagramError {
    /// Two nodes share an ID.
    DuplicateNode { node_id: NodeId },

    /// Two links share an ID.
    DuplicateLink { link_id: LinkId },

    /// A node radius is zero, negative or not finite.
    InvalidRadius { node_id: NodeId, radius: f32 },

    /// A node has nothing to announce.
    EmptyValues { node_id: NodeId },

    /// A link connects a node to itself.
    SelfLink { link_id: LinkId, node_id: NodeId },

    /// A link references a non-existent node.
    UnknownEndpoint { link_id: LinkId, node_id: NodeId },
}

impl std::fmt::Display for DiagramError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiagramError::DuplicateNode { node_id } => {
                write!(f, "Node {} is defined more than once", node_id)
            }
            DiagramError::DuplicateLink { link_id } => {
                write!(f, "Link {} is defined more than once", link_id)
            }
            DiagramError::InvalidRadius { node_id, radius } => {
                write!(f, "Node {} has invalid radius {}", node_id, radius)
            }
            DiagramError::EmptyValues { node_id } => {
                write!(f, "Node {} has no values to announce", node_id)
            }
            DiagramError::SelfLink { link_id, node_id } => {
                write!(f, "Link {} connects node {} to itself", link_id, node_id)
            }
            DiagramError::UnknownEndpoint { link_id, node_id } => {
                write!(f, "Link {} references unknown node {}", link_id, node_id)
            }
        }
    }
}

impl std::error::Error for DiagramError {}

/// Result of diagram compilation.
pub type CompileResult<T> = Result<T, DiagramError>;

/// Compile a DiagramDef into a runtime Diagram.
///
/// This function:
/// 1. Validates every node (unique ID, positive radius, values present)
/// 2. Validates every link (unique ID, distinct known endpoints)
/// 3. Derives each link's hit segment from its endpoint discs
pub fn compile(def: &DiagramDef) -> CompileResult<Diagram> {
    let mut seen_nodes = HashSet::new();
    let mut nodes = Vec::with_capacity(def.nodes.len());

    for n in &def.nodes {
        if !seen_nodes.insert(n.id) {
            return Err(DiagramError::DuplicateNode { node_id: n.id });
        }
        if !n.radius.is_finite() || n.radius <= 0.0 {
            return Err(DiagramError::InvalidRadius {
                node_id: n.id,
                radius: n.radius,
            });
        }
        if n.values.is_empty() {
            return Err(DiagramError::EmptyValues { node_id: n.id });
        }

        nodes.push(Node {
            id: n.id,
            center: n.center,
            radius: n.radius,
            pitch: n.pitch,
            values: n.values.clone(),
        });
    }

    let mut seen_links = HashSet::new();
    let mut links = Vec::with_capacity(def.links.len());

    for l in &def.links {
        if !seen_links.insert(l.id) {
            return Err(DiagramError::DuplicateLink { link_id: l.id });
        }
        if l.endpoint_a == l.endpoint_b {
            return Err(DiagramError::SelfLink {
                link_id: l.id,
                node_id: l.endpoint_a,
            });
        }

        let a = endpoint(def, l.id, l.endpoint_a)?;
        let b = endpoint(def, l.id, l.endpoint_b)?;
        let (start, end) = link_segment(a, b);

        links.push(Link {
            id: l.id,
            endpoint_a: l.endpoint_a,
            endpoint_b: l.endpoint_b,
            pitch: l.pitch,
            start,
            end,
        });
    }

    Ok(Diagram::from_parts(nodes, links))
}

fn endpoint(def: &DiagramDef, link_id: LinkId, node_id: NodeId) -> CompileResult<&NodeDef> {
    def.get_node(node_id)
        .ok_or(DiagramError::UnknownEndpoint { link_id, node_id })
}

/// Segment between the rims of two discs.
///
/// Overlapping discs collapse the segment to the midpoint of the overlap.
fn link_segment(a: &NodeDef, b: &NodeDef) -> (Point, Point) {
    let d = distance(a.center, b.center);
    if d <= f32::EPSILON {
        return (a.center, a.center);
    }

    let ux = (b.center.x - a.center.x) / d;
    let uy = (b.center.y - a.center.y) / d;
    let along = |offset: f32| Point::new(a.center.x + ux * offset, a.center.y + uy * offset);

    if d <= a.radius + b.radius {
        let mid = along((a.radius + d - b.radius) / 2.0);
        return (mid, mid);
    }

    (along(a.radius), along(d - b.radius))
}
