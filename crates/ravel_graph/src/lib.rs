// SPDX-License-Identifier: MIT OR Apache-2.0
//! Frame-stepped dataflow node graph.
//!
//! A [`Graph`] owns a set of nodes wired output-to-input by edges. Every
//! frame each node runs once, in priority order, pulling its inputs from
//! the outputs of the nodes that feed it and publishing new outputs.
//!
//! ## Architecture
//!
//! - [`value`]: runtime-typed values with a per-frame dirty flag
//! - [`port`]: named inputs gated by accepted kinds, and owned outputs
//! - [`connection`]: the edge table, at most one edge per input
//! - [`node`]: node identity, descriptors and the behavior trait
//! - [`nodes`]: the built-in node variants
//! - [`graph`]: node management and the scheduler
//! - [`scene`]: binary save and load

pub mod connection;
pub mod context;
pub mod evaluation;
pub mod expr;
pub mod graph;
pub mod loader;
pub mod node;
pub mod nodes;
pub mod port;
pub mod scene;
pub mod serialization;
pub mod value;

pub use connection::{Edge, EdgeAddress, EdgeTable};
pub use context::{FrameClock, GraphContext};
pub use evaluation::{EvaluationError, NodeIo};
pub use graph::{ConnectionError, Graph};
pub use loader::ResourceLoadError;
pub use node::{Node, NodeBehavior, NodeCategory, NodeId, NodeRegistry, NodeType, NodeView, Priority};
pub use nodes::NodeKind;
pub use port::{InputPort, OutputPort, PortDirection, PortDirectory};
pub use serialization::{ByteBuffer, SerializationError};
pub use value::{Kind, KindSet, MeshData, RenderData, TypedValue, Value, ValueError, Vector2, Vector3, Vector4};
