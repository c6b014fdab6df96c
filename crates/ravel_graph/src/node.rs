// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node definitions for the graph framework.

use crate::connection::Edge;
use crate::context::GraphContext;
use crate::evaluation::NodeIo;
use crate::nodes::NodeKind;
use crate::port::PortDirectory;
use crate::serialization::{ByteBuffer, SerializationError};
use crate::value::{Kind, ValueError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Never handed out by the id counter
    pub const UNALLOCATED: NodeId = NodeId(u32::MAX);
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Evaluation priority class. Lower classes run first each frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum Priority {
    /// Publishes last frame's value before anything else runs
    Feedback = 0,
    /// Ordinary nodes
    #[default]
    Normal = 1,
    /// Sinks that consume the fully updated frame
    Render = 2,
}

impl Priority {
    /// Decode a stored priority
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Feedback),
            1 => Some(Self::Normal),
            2 => Some(Self::Render),
            _ => None,
        }
    }
}

/// Node type category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeCategory {
    /// Constants and parameters
    Input,
    /// Arithmetic and expressions
    Math,
    /// List generation and access
    List,
    /// Geometry and camera
    Scene,
    /// Inspection and feedback
    Utility,
    /// Render sinks
    Output,
}

/// Closed set of node variants, with their scene tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum NodeType {
    /// Scalar constant
    Value = 0,
    /// RGBA constant
    Color = 1,
    /// Binary arithmetic
    Math = 2,
    /// Expression over x, y, z
    Function = 3,
    /// Graph clock
    Time = 4,
    /// Expression-generated list
    List = 5,
    /// Single list element
    ListAccess = 6,
    /// List concatenation
    ListJoin = 7,
    /// OBJ mesh
    Mesh = 8,
    /// Camera position and direction
    Camera = 9,
    /// Value inspector
    Display = 10,
    /// One-frame delay
    Feedback = 11,
    /// Fixed four-float array
    Vector = 12,
    /// Instanced render parameters
    Render = 13,
    /// Position along a line or closed spline
    Path = 14,
    /// World-position step
    WorldPos = 15,
}

impl NodeType {
    /// Every node type in tag order
    pub const ALL: [NodeType; 16] = [
        NodeType::Value,
        NodeType::Color,
        NodeType::Math,
        NodeType::Function,
        NodeType::Time,
        NodeType::List,
        NodeType::ListAccess,
        NodeType::ListJoin,
        NodeType::Mesh,
        NodeType::Camera,
        NodeType::Display,
        NodeType::Feedback,
        NodeType::Vector,
        NodeType::Render,
        NodeType::Path,
        NodeType::WorldPos,
    ];

    /// Scene tag
    pub const fn tag(self) -> u8 {
        self as u8
    }

    /// Look up a node type by scene tag
    pub fn from_tag(tag: u8) -> Option<Self> {
        Self::ALL.get(usize::from(tag)).copied()
    }

    /// Name used in default node titles
    pub fn display_name(self) -> &'static str {
        self.descriptor().name
    }

    /// Static description of this type's ports and behavior
    pub fn descriptor(self) -> &'static NodeDescriptor {
        match self {
            NodeType::Value => &VALUE,
            NodeType::Color => &COLOR,
            NodeType::Math => &MATH,
            NodeType::Function => &FUNCTION,
            NodeType::Time => &TIME,
            NodeType::List => &LIST,
            NodeType::ListAccess => &LIST_ACCESS,
            NodeType::ListJoin => &LIST_JOIN,
            NodeType::Mesh => &MESH,
            NodeType::Camera => &CAMERA,
            NodeType::Display => &DISPLAY,
            NodeType::Feedback => &FEEDBACK,
            NodeType::Vector => &VECTOR,
            NodeType::Render => &RENDER,
            NodeType::Path => &PATH,
            NodeType::WorldPos => &WORLD_POS,
        }
    }
}

/// A declared input port
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortSpec {
    /// Port name
    pub name: &'static str,
    /// Tooltip text
    pub description: &'static str,
}

const fn port(name: &'static str, description: &'static str) -> PortSpec {
    PortSpec { name, description }
}

/// Node type definition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeDescriptor {
    /// Type tag
    pub node_type: NodeType,
    /// Display name
    pub name: &'static str,
    /// Category
    pub category: NodeCategory,
    /// Description
    pub description: &'static str,
    /// Evaluation priority
    pub priority: Priority,
    /// Default input ports
    pub inputs: &'static [PortSpec],
    /// Output ports
    pub outputs: &'static [&'static str],
}

impl NodeDescriptor {
    /// Names of the default inputs
    pub fn input_names(&self) -> Vec<&'static str> {
        self.inputs.iter().map(|p| p.name).collect()
    }

    /// Tooltip for a default input
    pub fn input_description(&self, name: &str) -> Option<&'static str> {
        self.inputs.iter().find(|p| p.name == name).map(|p| p.description)
    }
}

static VALUE: NodeDescriptor = NodeDescriptor {
    node_type: NodeType::Value,
    name: "Value",
    category: NodeCategory::Input,
    description: "A float, int or uint constant",
    priority: Priority::Normal,
    inputs: &[],
    outputs: &["value"],
};

static VECTOR: NodeDescriptor = NodeDescriptor {
    node_type: NodeType::Vector,
    name: "Vector",
    category: NodeCategory::Input,
    description: "A fixed array of four floats",
    priority: Priority::Normal,
    inputs: &[],
    outputs: &["value"],
};

static COLOR: NodeDescriptor = NodeDescriptor {
    node_type: NodeType::Color,
    name: "Color",
    category: NodeCategory::Input,
    description: "An RGBA color",
    priority: Priority::Normal,
    inputs: &[],
    outputs: &["value"],
};

static MATH: NodeDescriptor = NodeDescriptor {
    node_type: NodeType::Math,
    name: "Math",
    category: NodeCategory::Math,
    description: "Add, subtract, multiply or divide two values",
    priority: Priority::Normal,
    inputs: &[
        port("A", "Left operand: a scalar or vector"),
        port("B", "Right operand: a scalar or vector"),
    ],
    outputs: &["result"],
};

static FUNCTION: NodeDescriptor = NodeDescriptor {
    node_type: NodeType::Function,
    name: "Function",
    category: NodeCategory::Math,
    description: "Evaluate an expression over x, y and z",
    priority: Priority::Normal,
    inputs: &[port("x", "Value bound to x")],
    outputs: &["result"],
};

static LIST: NodeDescriptor = NodeDescriptor {
    node_type: NodeType::List,
    name: "List",
    category: NodeCategory::List,
    description: "Generate a list from per-component expressions over i, j, k",
    priority: Priority::Normal,
    inputs: &[port("sizex", "Number of elements along i")],
    outputs: &["list"],
};

static LIST_ACCESS: NodeDescriptor = NodeDescriptor {
    node_type: NodeType::ListAccess,
    name: "List Access",
    category: NodeCategory::List,
    description: "Pick one element of a list",
    priority: Priority::Normal,
    inputs: &[
        port("index", "Element index, clamped to the list"),
        port("list", "Any list"),
    ],
    outputs: &["element"],
};

static LIST_JOIN: NodeDescriptor = NodeDescriptor {
    node_type: NodeType::ListJoin,
    name: "List Join",
    category: NodeCategory::List,
    description: "Concatenate two lists of the same kind",
    priority: Priority::Normal,
    inputs: &[port("List A", "First list"), port("List B", "Second list")],
    outputs: &["list"],
};

static TIME: NodeDescriptor = NodeDescriptor {
    node_type: NodeType::Time,
    name: "Time",
    category: NodeCategory::Input,
    description: "Seconds since the graph clock started",
    priority: Priority::Normal,
    inputs: &[],
    outputs: &["time"],
};

static DISPLAY: NodeDescriptor = NodeDescriptor {
    node_type: NodeType::Display,
    name: "Display",
    category: NodeCategory::Utility,
    description: "Show and forward any single value",
    priority: Priority::Normal,
    inputs: &[port("in", "Any non-list value")],
    outputs: &["out"],
};

static FEEDBACK: NodeDescriptor = NodeDescriptor {
    node_type: NodeType::Feedback,
    name: "Feedback",
    category: NodeCategory::Utility,
    description: "Republish the previous frame's value",
    priority: Priority::Feedback,
    inputs: &[port("in", "Scalar or vector to delay")],
    outputs: &["out"],
};

static MESH: NodeDescriptor = NodeDescriptor {
    node_type: NodeType::Mesh,
    name: "Mesh",
    category: NodeCategory::Scene,
    description: "Load an OBJ mesh in the background",
    priority: Priority::Normal,
    inputs: &[],
    outputs: &["mesh"],
};

static CAMERA: NodeDescriptor = NodeDescriptor {
    node_type: NodeType::Camera,
    name: "Camera",
    category: NodeCategory::Scene,
    description: "Orbit or free camera",
    priority: Priority::Normal,
    inputs: &[
        port("position", "Camera position"),
        port("lookAt", "Point the camera faces"),
    ],
    outputs: &["position", "forward"],
};

static RENDER: NodeDescriptor = NodeDescriptor {
    node_type: NodeType::Render,
    name: "Render",
    category: NodeCategory::Output,
    description: "Collect instanced render parameters",
    priority: Priority::Render,
    inputs: &[
        port("instanceCount", "Number of instances"),
        port("worldPosition", "Per-instance position list"),
        port("mesh", "Instanced mesh"),
        port("colors", "Per-instance color list"),
    ],
    outputs: &["render"],
};

static PATH: NodeDescriptor = NodeDescriptor {
    node_type: NodeType::Path,
    name: "Path",
    category: NodeCategory::Scene,
    description: "Move a position along a line or closed spline",
    priority: Priority::Normal,
    inputs: &[port("t", "Distance along a line, or lap fraction of the spline")],
    outputs: &["position"],
};

static WORLD_POS: NodeDescriptor = NodeDescriptor {
    node_type: NodeType::WorldPos,
    name: "World Position",
    category: NodeCategory::Input,
    description: "Per-step world position offset",
    priority: Priority::Normal,
    inputs: &[],
    outputs: &["delta"],
};

/// Position and size of a node in the editor
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RenderGeometry {
    /// Top-left corner
    pub position: [f32; 2],
    /// Width and height
    pub size: [f32; 2],
}

/// What a consumer learns about a producer when an edge is attached
#[derive(Debug, Clone, PartialEq)]
pub struct ProducerInfo {
    /// Producer node
    pub id: NodeId,
    /// Producer display name
    pub name: String,
    /// Producer output name
    pub output: String,
    /// Kind currently published on that output
    pub kind: Kind,
}

/// One labelled line of a node view
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewRow {
    /// Row label
    pub label: String,
    /// Formatted value
    pub value: String,
}

/// Display-independent snapshot of a node produced by `render()`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeView {
    /// Node identity
    pub id: NodeId,
    /// Node name
    pub title: String,
    /// Labelled values
    pub rows: Vec<ViewRow>,
    /// Current error, if any
    pub error: Option<String>,
}

impl NodeView {
    /// Create a view with no rows
    pub fn new(id: NodeId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            rows: Vec::new(),
            error: None,
        }
    }

    /// Append a row
    pub fn row(&mut self, label: impl Into<String>, value: impl fmt::Display) {
        self.rows.push(ViewRow {
            label: label.into(),
            value: value.to_string(),
        });
    }

    /// Set the error line
    pub fn set_error(&mut self, error: impl fmt::Display) {
        self.error = Some(error.to_string());
    }

    /// Value of the row labelled `label`
    pub fn value_of(&self, label: &str) -> Option<&str> {
        self.rows
            .iter()
            .find(|r| r.label == label)
            .map(|r| r.value.as_str())
    }
}

impl fmt::Display for NodeView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[{}] {}", self.id, self.title)?;
        for row in &self.rows {
            writeln!(f, "    {}: {}", row.label, row.value)?;
        }
        if let Some(error) = &self.error {
            writeln!(f, "    error: {error}")?;
        }
        Ok(())
    }
}

/// Per-variant node behavior driven by the scheduler
pub trait NodeBehavior {
    /// Set initial output values after construction
    fn initialize(&mut self, _ports: &mut PortDirectory) {}

    /// Per-frame step: clear own dirty flags, gate inputs, pull, recompute
    fn update(&mut self, io: &mut NodeIo<'_>);

    /// Describe the node for display
    fn render(&self, _ports: &PortDirectory, _view: &mut NodeView) {}

    /// An edge was attached to `input`
    fn on_connection(&mut self, _input: &str, _producer: &ProducerInfo) {}

    /// The edge on `input` was removed
    fn on_disconnect(&mut self, _input: &str) {}

    /// Append variant-specific fields
    fn serialize_extra(&self, _buffer: &mut ByteBuffer) -> Result<(), SerializationError> {
        Ok(())
    }

    /// Read back the fields written by [`serialize_extra`](Self::serialize_extra), in the same order
    fn deserialize_extra(&mut self, _buffer: &mut ByteBuffer) -> Result<(), SerializationError> {
        Ok(())
    }
}

/// A node instance in the graph
#[derive(Debug)]
pub struct Node {
    /// Unique instance ID
    pub id: NodeId,
    /// Display name
    pub name: String,
    /// Evaluation priority
    pub priority: Priority,
    /// Position in the graph UI
    pub geometry: RenderGeometry,
    pub(crate) ports: PortDirectory,
    pub(crate) kind: NodeKind,
}

impl Node {
    /// Create a node of `node_type`, allocating its identity and default
    /// name from `ctx`. Once the id space is used up the node gets
    /// [`NodeId::UNALLOCATED`].
    pub fn new(ctx: &mut GraphContext, node_type: NodeType) -> Self {
        let descriptor = node_type.descriptor();
        let mut ports = PortDirectory::new(&descriptor.input_names(), descriptor.outputs);
        let id = ctx
            .allocate_id(ports.input_count() + ports.output_count())
            .unwrap_or_else(|| {
                tracing::warn!(next_id = ctx.next_id(), "Node id space exhausted");
                NodeId::UNALLOCATED
            });
        let mut kind = NodeKind::new(node_type);
        kind.initialize(&mut ports);
        Self {
            id,
            name: ctx.default_name(node_type),
            priority: descriptor.priority,
            geometry: RenderGeometry::default(),
            ports,
            kind,
        }
    }

    /// Set the position
    pub fn with_position(mut self, x: f32, y: f32) -> Self {
        self.geometry.position = [x, y];
        self
    }

    /// Rename the node. Empty names are refused.
    pub fn rename(&mut self, name: impl Into<String>) -> bool {
        let name = name.into();
        if name.trim().is_empty() {
            return false;
        }
        self.name = name;
        true
    }

    /// Variant tag
    pub fn node_type(&self) -> NodeType {
        self.kind.node_type()
    }

    /// Variant behavior
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Mutable variant behavior, for configuration setters
    pub fn kind_mut(&mut self) -> &mut NodeKind {
        &mut self.kind
    }

    /// Port directory
    pub fn ports(&self) -> &PortDirectory {
        &self.ports
    }

    /// Get an input port by index
    pub fn input(&self, index: usize) -> Option<&crate::port::InputPort> {
        self.ports.input(index)
    }

    /// Get an output port by index
    pub fn output(&self, index: usize) -> Option<&crate::port::OutputPort> {
        self.ports.output(index)
    }

    /// Describe the node for display
    pub fn view(&self) -> NodeView {
        let mut view = NodeView::new(self.id, &self.name);
        self.kind.render(&self.ports, &mut view);
        view
    }

    /// Encode this node as a scene block. `outgoing` are the edges this
    /// node produces.
    pub fn serialize(&self, outgoing: impl IntoIterator<Item = Edge>) -> Result<ByteBuffer, SerializationError> {
        let mut buffer = ByteBuffer::new();
        buffer.add(&self.id)?;
        buffer.add(&self.name)?;
        buffer.add(&(self.priority as u8))?;
        buffer.add(&(self.ports.input_count() as u32))?;
        for input in self.ports.inputs() {
            buffer.add(&input.name)?;
        }
        buffer.add(&self.ports.input_padding())?;
        buffer.add(&self.ports.output_padding())?;

        let outgoing: Vec<Edge> = outgoing.into_iter().collect();
        buffer.add(&(outgoing.len() as u64))?;
        for edge in &outgoing {
            buffer.add(&edge.address.producer_output)?;
            buffer.add(&edge.address.consumer_input)?;
            buffer.add(&edge.consumer)?;
        }

        for output in self.ports.outputs() {
            let value = &output.value;
            let payload = value.to_raw()?;
            buffer.add(&(payload.len() as u64))?;
            buffer.add(&value.is_fixed_array())?;
            buffer.add(&value.is_list())?;
            buffer.add(&value.kind().tag())?;
            buffer.put_bytes(&payload);
        }

        self.kind.serialize_extra(&mut buffer)?;

        buffer.add(&self.geometry.position)?;
        buffer.add(&self.geometry.size)?;
        Ok(buffer)
    }

    /// Restore this node from a scene block. Outputs must already exist.
    /// Returns the edges this node produced, to be re-attached once every
    /// node is back.
    pub fn deserialize(&mut self, buffer: &mut ByteBuffer) -> Result<Vec<Edge>, SerializationError> {
        self.id = buffer.get()?;
        let name: String = buffer.get()?;
        self.rename(name);
        let priority: u8 = buffer.get()?;
        self.priority = Priority::from_u8(priority)
            .ok_or_else(|| SerializationError::Shape(format!("unknown priority {priority}")))?;

        let input_count: u32 = buffer.get()?;
        let names = (0..input_count)
            .map(|_| buffer.get::<String>())
            .collect::<Result<Vec<_>, _>>()?;
        self.ports.set_inputs_ordered(&names);
        let input_padding: f32 = buffer.get()?;
        let output_padding: f32 = buffer.get()?;
        self.ports.set_padding(input_padding, output_padding);

        let edge_count: u64 = buffer.get()?;
        let mut edges = Vec::new();
        for _ in 0..edge_count {
            let producer_output: u8 = buffer.get()?;
            let consumer_input: u8 = buffer.get()?;
            let consumer: NodeId = buffer.get()?;
            edges.push(Edge::new(self.id, producer_output, consumer, consumer_input));
        }

        for index in 0..self.ports.output_count() {
            let size: u64 = buffer.get()?;
            let is_fixed_array: bool = buffer.get()?;
            let is_list: bool = buffer.get()?;
            let tag: u8 = buffer.get()?;
            let kind = Kind::from_tag(tag).ok_or(ValueError::UnknownTag(tag))?;
            if kind.is_list() != is_list || (kind == Kind::FloatArray) != is_fixed_array {
                return Err(SerializationError::Shape(format!(
                    "output {index} of {} has flags inconsistent with kind {kind}",
                    self.id
                )));
            }
            let size = usize::try_from(size)
                .map_err(|_| SerializationError::Shape(format!("payload of {size} bytes")))?;
            let bytes = buffer.take(size)?;
            if let Some(output) = self.ports.output_mut(index) {
                output.value.set_raw(kind, bytes)?;
            }
        }

        self.kind.deserialize_extra(buffer)?;

        self.geometry.position = buffer.get()?;
        self.geometry.size = buffer.get()?;
        Ok(edges)
    }
}

/// Registry of available node types
pub struct NodeRegistry {
    /// Registered node types by tag
    types: indexmap::IndexMap<NodeType, &'static NodeDescriptor>,
}

impl NodeRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            types: indexmap::IndexMap::new(),
        }
    }

    /// Create a registry holding every built-in node type
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for node_type in NodeType::ALL {
            registry.register(node_type.descriptor());
        }
        registry
    }

    /// Register a node type
    pub fn register(&mut self, descriptor: &'static NodeDescriptor) {
        self.types.insert(descriptor.node_type, descriptor);
    }

    /// Get a node type by tag
    pub fn get(&self, node_type: NodeType) -> Option<&'static NodeDescriptor> {
        self.types.get(&node_type).copied()
    }

    /// Find a node type by display name, ignoring case
    pub fn find(&self, name: &str) -> Option<&'static NodeDescriptor> {
        self.types
            .values()
            .copied()
            .find(|d| d.name.eq_ignore_ascii_case(name))
    }

    /// Get all registered types
    pub fn types(&self) -> impl Iterator<Item = &'static NodeDescriptor> + '_ {
        self.types.values().copied()
    }

    /// Get types by category
    pub fn types_in_category(&self, category: NodeCategory) -> impl Iterator<Item = &'static NodeDescriptor> + '_ {
        self.types().filter(move |t| t.category == category)
    }

    /// Create a node from a registered type
    pub fn create_node(&self, ctx: &mut GraphContext, node_type: NodeType) -> Option<Node> {
        self.get(node_type).map(|d| Node::new(ctx, d.node_type))
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn test_type_tags_round_trip() {
        for node_type in NodeType::ALL {
            assert_eq!(NodeType::from_tag(node_type.tag()), Some(node_type));
            assert_eq!(node_type.descriptor().node_type, node_type);
            assert!(!node_type.descriptor().outputs.is_empty());
        }
        assert_eq!(NodeType::from_tag(16), None);
    }

    #[test]
    fn test_new_node_uses_descriptor() {
        let mut ctx = GraphContext::default();
        let node = Node::new(&mut ctx, NodeType::Math);
        assert_eq!(node.id, NodeId(0));
        assert_eq!(node.name, "Math Node #0");
        assert_eq!(node.ports().input_names(), vec!["A".to_string(), "B".to_string()]);
        assert_eq!(ctx.next_id(), 4);

        let render = Node::new(&mut ctx, NodeType::Render);
        assert_eq!(render.priority, Priority::Render);
    }

    #[test]
    fn test_rename_refuses_empty() {
        let mut ctx = GraphContext::default();
        let mut node = Node::new(&mut ctx, NodeType::Time);
        assert!(!node.rename("  "));
        assert!(node.rename("clock"));
        assert_eq!(node.name, "clock");
    }

    #[test]
    fn test_block_restores_header_outputs_and_edges() {
        let mut ctx = GraphContext::default();
        let mut node = Node::new(&mut ctx, NodeType::Value).with_position(12.0, -3.0);
        node.geometry.size = [120.0, 40.0];
        node.rename("seed");
        if let Some(output) = node.ports.output_mut(0) {
            output.value.set_value(Value::Int(-7));
        }
        let block = node
            .serialize([Edge::new(node.id, 0, NodeId(30), 1)])
            .unwrap();

        let mut restored = Node::new(&mut ctx, NodeType::Value);
        let mut reader = ByteBuffer::from_bytes(block.into_bytes());
        let edges = restored.deserialize(&mut reader).unwrap();

        assert!(reader.is_exhausted());
        assert_eq!(restored.id, node.id);
        assert_eq!(restored.name, "seed");
        assert_eq!(restored.geometry, node.geometry);
        assert_eq!(restored.output(0).unwrap().value.value(), &Value::Int(-7));
        assert_eq!(edges, vec![Edge::new(node.id, 0, NodeId(30), 1)]);
    }

    #[test]
    fn test_registry_lists_by_category() {
        let registry = NodeRegistry::builtin();
        let lists: Vec<_> = registry
            .types_in_category(NodeCategory::List)
            .map(|d| d.node_type)
            .collect();
        assert_eq!(lists, vec![NodeType::List, NodeType::ListAccess, NodeType::ListJoin]);
        assert_eq!(registry.find("list join").map(|d| d.node_type), Some(NodeType::ListJoin));

        let mut ctx = GraphContext::default();
        let node = registry.create_node(&mut ctx, NodeType::Camera).unwrap();
        assert_eq!(node.ports().output_count(), 2);
    }
}
