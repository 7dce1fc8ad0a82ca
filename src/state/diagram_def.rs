// Declarative diagram definition.
//
// This is the "document" representation of a diagram.
// The host builds it freely; it is validated and compiled to a
// runtime `Diagram` before any contact is processed.

use crate::geometry::Point;

/// Unique identifier for a node within a diagram.
pub type NodeId = u32;

/// Unique identifier for a link within a diagram.
pub type LinkId = u32;

/// Tone frequency in Hz.
pub type Pitch = f32;

/// A value a node can announce on a secondary tap.
#[derive(Debug, Clone, PartialEq)]
pub enum Announceable {
    Text(String),
    Number(f64),
    List(Vec<Announceable>),
}

impl From<&str> for Announceable {
    fn from(s: &str) -> Self {
        Announceable::Text(s.to_string())
    }
}

impl From<String> for Announceable {
    fn from(s: String) -> Self {
        Announceable::Text(s)
    }
}

impl From<f64> for Announceable {
    fn from(n: f64) -> Self {
        Announceable::Number(n)
    }
}

impl From<i32> for Announceable {
    fn from(n: i32) -> Self {
        Announceable::Number(n as f64)
    }
}

impl<T: Into<Announceable>> From<Vec<T>> for Announceable {
    fn from(items: Vec<T>) -> Self {
        Announceable::List(items.into_iter().map(Into::into).collect())
    }
}

/// A circular touch target.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeDef {
    pub id: NodeId,
    pub center: Point,
    pub radius: f32,
    pub pitch: Pitch,

    /// Values cycled one at a time by secondary taps.
    pub values: Vec<Announceable>,
}

impl NodeDef {
    pub fn new(id: NodeId, center: Point, radius: f32, pitch: Pitch) -> Self {
        Self {
            id,
            center,
            radius,
            pitch,
            values: Vec::new(),
        }
    }

    pub fn with_value(mut self, value: impl Into<Announceable>) -> Self {
        self.values.push(value.into());
        self
    }

    pub fn with_values<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Announceable>,
    {
        self.values.extend(values.into_iter().map(Into::into));
        self
    }
}

/// A connection between two nodes, plucked when swiped across.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkDef {
    pub id: LinkId,
    pub endpoint_a: NodeId,
    pub endpoint_b: NodeId,
    pub pitch: Pitch,
}

/// The complete declarative diagram.
#[derive(Debug, Clone, Default)]
pub struct DiagramDef {
    /// Nodes in insertion order
    pub nodes: Vec<NodeDef>,

    /// Links in insertion order
    pub links: Vec<LinkDef>,

    next_node_id: NodeId,
    next_link_id: LinkId,
}

impl DiagramDef {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node, returning its ID.
    pub fn add_node(
        &mut self,
        center: impl Into<Point>,
        radius: f32,
        pitch: Pitch,
        values: Vec<Announceable>,
    ) -> NodeId {
        let id = self.next_node_id;
        self.next_node_id += 1;
        self.nodes.push(NodeDef {
            id,
            center: center.into(),
            radius,
            pitch,
            values,
        });
        id
    }

    /// Add a pre-configured node, keeping its ID.
    pub fn add_node_def(&mut self, node: NodeDef) -> NodeId {
        let id = node.id;
        self.next_node_id = self.next_node_id.max(id + 1);
        self.nodes.push(node);
        id
    }

    /// Link two nodes, returning the link ID.
    pub fn add_link(&mut self, endpoint_a: NodeId, endpoint_b: NodeId, pitch: Pitch) -> LinkId {
        let id = self.next_link_id;
        self.next_link_id += 1;
        self.links.push(LinkDef {
            id,
            endpoint_a,
            endpoint_b,
            pitch,
        });
        id
    }

    /// Append a value to an existing node's cycle.
    pub fn push_value(&mut self, node_id: NodeId, value: impl Into<Announceable>) -> bool {
        match self.get_node_mut(node_id) {
            Some(node) => {
                node.values.push(value.into());
                true
            }
            None => false,
        }
    }

    pub fn get_node(&self, id: NodeId) -> Option<&NodeDef> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn get_node_mut(&mut self, id: NodeId) -> Option<&mut NodeDef> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    /// Links touching a specific node.
    pub fn links_of(&self, node_id: NodeId) -> impl Iterator<Item = &LinkDef> {
        self.links
            .iter()
            .filter(move |l| l.endpoint_a == node_id || l.endpoint_b == node_id)
    }
}
