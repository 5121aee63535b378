//! Node graph layout and per-node status projection.
//!
//! Nodes are never persisted: a [`PathMap`] is rebuilt from a layout kind,
//! the drawing bounds, and the session's current node whenever the client
//! (re)initializes its map.
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use crate::constants::{
    CIRCULAR_RADIUS_FRACTION, NODE_COUNT, NODE_HIT_RADIUS, WINDING_AMPLITUDE, WINDING_HALF_WAVES,
    WINDING_PADDING,
};

/// Shape of the path drawn across the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LayoutKind {
    /// Sinusoidal path running left to right.
    #[default]
    Winding,
    /// Nodes spaced evenly around an ellipse, starting at the top.
    Circular,
}

impl LayoutKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Winding => "winding",
            Self::Circular => "circular",
        }
    }
}

impl fmt::Display for LayoutKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LayoutKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "winding" => Ok(Self::Winding),
            "circular" => Ok(Self::Circular),
            _ => Err(()),
        }
    }
}

/// Available drawing area in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    #[must_use]
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[must_use]
    pub fn distance_to(self, other: Self) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Compute `count` node positions for the given layout.
///
/// Deterministic for identical inputs. Adding a layout kind only adds a
/// position formula here; the call contract stays the same.
#[must_use]
pub fn layout_path(kind: LayoutKind, count: u32, bounds: Bounds) -> Vec<Point> {
    (0..count)
        .map(|index| match kind {
            LayoutKind::Winding => winding_position(index, count, bounds),
            LayoutKind::Circular => circular_position(index, count, bounds),
        })
        .collect()
}

fn winding_position(index: u32, count: u32, bounds: Bounds) -> Point {
    let progress = if count > 1 {
        f64::from(index) / f64::from(count - 1)
    } else {
        0.0
    };
    let x = WINDING_PADDING + progress * (bounds.width - WINDING_PADDING * 2.0);
    let y = bounds.height / 2.0 + (progress * PI * WINDING_HALF_WAVES).sin() * WINDING_AMPLITUDE;
    Point::new(x, y)
}

// Spaced by `count` rather than `count - 1` so the last node does not sit on
// top of the first one.
fn circular_position(index: u32, count: u32, bounds: Bounds) -> Point {
    let progress = f64::from(index) / f64::from(count.max(1));
    let angle = progress * PI * 2.0 - PI / 2.0;
    let x = bounds.width / 2.0 + angle.cos() * (bounds.width * CIRCULAR_RADIUS_FRACTION);
    let y = bounds.height / 2.0 + angle.sin() * (bounds.height * CIRCULAR_RADIUS_FRACTION);
    Point::new(x, y)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    Locked,
    Current,
    Completed,
}

impl NodeStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Locked => "locked",
            Self::Current => "current",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of a node given the session's next unresolved node.
#[must_use]
pub const fn status_of(index: u32, current_node: u32) -> NodeStatus {
    if index < current_node {
        NodeStatus::Completed
    } else if index == current_node {
        NodeStatus::Current
    } else {
        NodeStatus::Locked
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapNode {
    pub id: u32,
    pub position: Point,
    pub status: NodeStatus,
}

/// Renderer-facing projection of a session's progress along its path.
#[derive(Debug, Clone, PartialEq)]
pub struct PathMap {
    kind: LayoutKind,
    bounds: Bounds,
    current_node: u32,
    nodes: Vec<MapNode>,
}

impl PathMap {
    /// Lay out the standard path and mark statuses for `current_node`.
    #[must_use]
    pub fn generate(kind: LayoutKind, bounds: Bounds, current_node: u32) -> Self {
        Self::with_count(kind, NODE_COUNT, bounds, current_node)
    }

    #[must_use]
    pub fn with_count(kind: LayoutKind, count: u32, bounds: Bounds, current_node: u32) -> Self {
        let current_node = current_node.min(count);
        let nodes = (0_u32..)
            .zip(layout_path(kind, count, bounds))
            .map(|(id, position)| MapNode {
                id,
                position,
                status: status_of(id, current_node),
            })
            .collect();
        Self {
            kind,
            bounds,
            current_node,
            nodes,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> LayoutKind {
        self.kind
    }

    #[must_use]
    pub const fn bounds(&self) -> Bounds {
        self.bounds
    }

    #[must_use]
    pub fn nodes(&self) -> &[MapNode] {
        &self.nodes
    }

    #[must_use]
    pub fn len(&self) -> u32 {
        u32::try_from(self.nodes.len()).unwrap_or(u32::MAX)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Re-derive every node status after the session moved.
    pub fn sync(&mut self, current_node: u32) {
        self.current_node = current_node.min(self.len());
        let current = self.current_node;
        for node in &mut self.nodes {
            node.status = status_of(node.id, current);
        }
    }

    /// Recompute positions for new bounds, keeping statuses.
    pub fn resize(&mut self, bounds: Bounds) {
        self.bounds = bounds;
        let positions = layout_path(self.kind, self.len(), bounds);
        for (node, position) in self.nodes.iter_mut().zip(positions) {
            node.position = position;
        }
    }

    #[must_use]
    pub fn position_of(&self, id: u32) -> Option<Point> {
        self.nodes
            .get(usize::try_from(id).ok()?)
            .map(|node| node.position)
    }

    /// The node awaiting a challenge, or `None` once the path is finished.
    #[must_use]
    pub fn current(&self) -> Option<&MapNode> {
        self.nodes
            .iter()
            .find(|node| node.status == NodeStatus::Current)
    }

    /// Where the character stands: the current node, or the last node after
    /// victory.
    #[must_use]
    pub fn character_anchor(&self) -> Option<Point> {
        self.current()
            .or_else(|| self.nodes.last())
            .map(|node| node.position)
    }

    /// Nearest node within the hit radius of `point`, whatever its status.
    #[must_use]
    pub fn node_at(&self, point: Point) -> Option<&MapNode> {
        self.nodes
            .iter()
            .map(|node| (node, node.position.distance_to(point)))
            .filter(|(_, distance)| *distance < NODE_HIT_RADIUS)
            .min_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(node, _)| node)
    }

    /// Id of the node a press at `point` may launch. Only the current node
    /// is actionable, so this is `None` for locked or completed hits and for
    /// every hit after victory.
    #[must_use]
    pub fn actionable_at(&self, point: Point) -> Option<u32> {
        self.node_at(point)
            .filter(|node| node.status == NodeStatus::Current)
            .map(|node| node.id)
    }
}
