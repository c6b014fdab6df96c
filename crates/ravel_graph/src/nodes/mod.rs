// SPDX-License-Identifier: MIT OR Apache-2.0
//! Built-in node variants.
//!
//! [`NodeKind`] is the closed set of behaviors; every scheduler hook is a
//! single `match` over it.

mod camera;
mod constant;
mod display;
mod function;
mod list;
mod list_ops;
mod math;
mod mesh;
mod path;
mod render;
mod time;

pub use camera::{CameraMode, CameraNode};
pub use constant::{ColorNode, ScalarType, ValueNode, VectorNode};
pub use display::{DisplayNode, FeedbackNode};
pub use function::FunctionNode;
pub use list::{ListDimension, ListElement, ListNode};
pub use list_ops::{ListAccessNode, ListJoinNode};
pub use math::{MathMode, MathNode};
pub use mesh::MeshNode;
pub use path::{ClosedSpline, PathMode, PathNode, WorldPosNode};
pub use render::RenderNode;
pub use time::TimeNode;

use crate::evaluation::NodeIo;
use crate::node::{NodeBehavior, NodeType, NodeView, ProducerInfo};
use crate::port::PortDirectory;
use crate::serialization::{ByteBuffer, SerializationError};

/// Behavior of one node, by variant
#[derive(Debug)]
pub enum NodeKind {
    /// Scalar constant
    Value(ValueNode),
    /// Fixed four-float array
    Vector(VectorNode),
    /// RGBA constant
    Color(ColorNode),
    /// Binary arithmetic
    Math(MathNode),
    /// Expression over x, y, z
    Function(FunctionNode),
    /// Expression-generated list
    List(ListNode),
    /// Single list element
    ListAccess(ListAccessNode),
    /// List concatenation
    ListJoin(ListJoinNode),
    /// Graph clock
    Time(TimeNode),
    /// Value inspector
    Display(DisplayNode),
    /// One-frame delay
    Feedback(FeedbackNode),
    /// OBJ mesh
    Mesh(MeshNode),
    /// Camera
    Camera(CameraNode),
    /// Render sink
    Render(RenderNode),
    /// Position along a line or closed spline
    Path(PathNode),
    /// World-position step
    WorldPos(WorldPosNode),
}

macro_rules! dispatch {
    ($kind:expr, $node:ident => $body:expr) => {
        match $kind {
            NodeKind::Value($node) => $body,
            NodeKind::Vector($node) => $body,
            NodeKind::Color($node) => $body,
            NodeKind::Math($node) => $body,
            NodeKind::Function($node) => $body,
            NodeKind::List($node) => $body,
            NodeKind::ListAccess($node) => $body,
            NodeKind::ListJoin($node) => $body,
            NodeKind::Time($node) => $body,
            NodeKind::Display($node) => $body,
            NodeKind::Feedback($node) => $body,
            NodeKind::Mesh($node) => $body,
            NodeKind::Camera($node) => $body,
            NodeKind::Render($node) => $body,
            NodeKind::Path($node) => $body,
            NodeKind::WorldPos($node) => $body,
        }
    };
}

impl NodeKind {
    /// Default behavior for `node_type`
    pub fn new(node_type: NodeType) -> Self {
        match node_type {
            NodeType::Value => Self::Value(ValueNode::default()),
            NodeType::Vector => Self::Vector(VectorNode::default()),
            NodeType::Color => Self::Color(ColorNode::default()),
            NodeType::Math => Self::Math(MathNode::default()),
            NodeType::Function => Self::Function(FunctionNode::default()),
            NodeType::List => Self::List(ListNode::default()),
            NodeType::ListAccess => Self::ListAccess(ListAccessNode::default()),
            NodeType::ListJoin => Self::ListJoin(ListJoinNode::default()),
            NodeType::Time => Self::Time(TimeNode::default()),
            NodeType::Display => Self::Display(DisplayNode::default()),
            NodeType::Feedback => Self::Feedback(FeedbackNode::default()),
            NodeType::Mesh => Self::Mesh(MeshNode::default()),
            NodeType::Camera => Self::Camera(CameraNode::default()),
            NodeType::Render => Self::Render(RenderNode::default()),
            NodeType::Path => Self::Path(PathNode::default()),
            NodeType::WorldPos => Self::WorldPos(WorldPosNode::default()),
        }
    }

    /// Variant tag
    pub fn node_type(&self) -> NodeType {
        match self {
            Self::Value(_) => NodeType::Value,
            Self::Vector(_) => NodeType::Vector,
            Self::Color(_) => NodeType::Color,
            Self::Math(_) => NodeType::Math,
            Self::Function(_) => NodeType::Function,
            Self::List(_) => NodeType::List,
            Self::ListAccess(_) => NodeType::ListAccess,
            Self::ListJoin(_) => NodeType::ListJoin,
            Self::Time(_) => NodeType::Time,
            Self::Display(_) => NodeType::Display,
            Self::Feedback(_) => NodeType::Feedback,
            Self::Mesh(_) => NodeType::Mesh,
            Self::Camera(_) => NodeType::Camera,
            Self::Render(_) => NodeType::Render,
            Self::Path(_) => NodeType::Path,
            Self::WorldPos(_) => NodeType::WorldPos,
        }
    }
}

impl NodeBehavior for NodeKind {
    fn initialize(&mut self, ports: &mut PortDirectory) {
        dispatch!(self, node => node.initialize(ports))
    }

    fn update(&mut self, io: &mut NodeIo<'_>) {
        dispatch!(self, node => node.update(io))
    }

    fn render(&self, ports: &PortDirectory, view: &mut NodeView) {
        dispatch!(self, node => node.render(ports, view))
    }

    fn on_connection(&mut self, input: &str, producer: &ProducerInfo) {
        dispatch!(self, node => node.on_connection(input, producer))
    }

    fn on_disconnect(&mut self, input: &str) {
        dispatch!(self, node => node.on_disconnect(input))
    }

    fn serialize_extra(&self, buffer: &mut ByteBuffer) -> Result<(), SerializationError> {
        dispatch!(self, node => node.serialize_extra(buffer))
    }

    fn deserialize_extra(&mut self, buffer: &mut ByteBuffer) -> Result<(), SerializationError> {
        dispatch!(self, node => node.deserialize_extra(buffer))
    }
}

/// Decode a `u8` enum field, reporting unknown values as a shape error
pub(crate) fn read_enum<T>(
    buffer: &mut ByteBuffer,
    what: &str,
    decode: impl FnOnce(u8) -> Option<T>,
) -> Result<T, SerializationError> {
    let raw: u8 = buffer.get()?;
    decode(raw).ok_or_else(|| SerializationError::Shape(format!("unknown {what} {raw}")))
}
