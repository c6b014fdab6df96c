// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph evaluation and execution.
//!
//! Each frame the graph hands every node, in priority order, a [`NodeIo`]:
//! mutable access to the node's own ports and read-only access to every
//! other node's outputs. Inputs are pulled through the edge addresses stored
//! on the node's input ports, so a node sees an upstream change from the
//! same frame only when the producer ran earlier in the order.

use crate::connection::{EdgeAddress, EdgeTable};
use crate::context::GraphContext;
use crate::expr::ExpressionEngine;
use crate::loader::ResourceLoadError;
use crate::node::{Node, NodeId, NodeView};
use crate::port::PortDirectory;
use crate::value::{Kind, KindSet, TypedValue, Value, ValueType};
use indexmap::map::Slice;
use std::path::Path;
use std::time::Duration;

/// A node's window onto the graph during its `update()`
pub struct NodeIo<'a> {
    node: NodeId,
    ports: &'a mut PortDirectory,
    before: &'a Slice<NodeId, Node>,
    after: &'a Slice<NodeId, Node>,
    upstream: Vec<Option<usize>>,
    edges: &'a mut EdgeTable,
    context: &'a GraphContext,
    detached: Vec<String>,
}

impl<'a> NodeIo<'a> {
    /// `before` and `after` are the nodes either side of this one in the
    /// arena; `upstream[i]` is the arena position of input `i`'s producer.
    pub(crate) fn new(
        node: NodeId,
        ports: &'a mut PortDirectory,
        before: &'a Slice<NodeId, Node>,
        after: &'a Slice<NodeId, Node>,
        upstream: Vec<Option<usize>>,
        edges: &'a mut EdgeTable,
        context: &'a GraphContext,
    ) -> Self {
        Self {
            node,
            ports,
            before,
            after,
            upstream,
            edges,
            context,
            detached: Vec::new(),
        }
    }

    /// Node being updated
    pub fn id(&self) -> NodeId {
        self.node
    }

    /// Own ports
    pub fn ports(&self) -> &PortDirectory {
        self.ports
    }

    /// Time since the graph clock started
    pub fn elapsed(&self) -> Duration {
        self.context.clock().elapsed()
    }

    /// Current frame number
    pub fn frame(&self) -> u64 {
        self.context.clock().frame()
    }

    /// Shared expression engine
    pub fn expressions(&self) -> &'a ExpressionEngine {
        self.context.expressions()
    }

    /// Root for relative resource paths
    pub fn assets_root(&self) -> Option<&'a Path> {
        self.context.assets_root()
    }

    /// Reset the change flag of every own output
    pub fn clear_output_dirty(&mut self) {
        self.ports.clear_output_dirty();
    }

    /// Own output value at `index`
    pub fn output(&self, index: usize) -> Option<&TypedValue> {
        self.ports.output(index).map(|o| &o.value)
    }

    /// Mutable own output value at `index`
    pub fn output_mut(&mut self, index: usize) -> Option<&mut TypedValue> {
        self.ports.output_mut(index).map(|o| &mut o.value)
    }

    /// Replace own output `index` with `value`
    pub fn set_output<T: ValueType>(&mut self, index: usize, value: T) {
        if let Some(output) = self.output_mut(index) {
            output.set(value);
        }
    }

    /// Replace own output `index` only if `value` differs from what it
    /// holds. Returns whether the output changed.
    pub fn publish(&mut self, index: usize, value: Value) -> bool {
        match self.output_mut(index) {
            Some(output) if output.value() != &value => {
                output.set_value(value);
                true
            }
            _ => false,
        }
    }

    /// Whether the input called `name` has an edge
    pub fn is_connected(&self, name: &str) -> bool {
        self.ports.input_named(name).is_some_and(|p| p.is_connected())
    }

    /// Upstream value feeding the input called `name`
    pub fn input(&self, name: &str) -> Option<&'a TypedValue> {
        let index = self.ports.input_index(name)?;
        self.input_at(index)
    }

    /// Upstream value feeding input `index`. A producer that has not
    /// published anything yet reads as no value.
    pub fn input_at(&self, index: usize) -> Option<&'a TypedValue> {
        let address = self.ports.input(index)?.source()?;
        let position = (*self.upstream.get(index)?)?;
        let before: &'a Slice<NodeId, Node> = self.before;
        let after: &'a Slice<NodeId, Node> = self.after;
        let (&id, producer) = if position < before.len() {
            before.get_index(position)?
        } else {
            after.get_index(position.checked_sub(before.len() + 1)?)?
        };
        if id != address.producer {
            return None;
        }
        producer
            .ports
            .output(usize::from(address.producer_output))
            .map(|o| &o.value)
            .filter(|v| !v.is_empty())
    }

    /// Upstream value of the input called `name`, if it holds a `T`
    pub fn input_as<T: ValueType + Clone>(&self, name: &str) -> Option<T> {
        self.input(name).and_then(|v| v.get::<T>().ok()).cloned()
    }

    /// Declare the kinds the input called `name` accepts. An attached
    /// producer of any other kind is detached. Returns whether a detachment
    /// occurred.
    pub fn ensure_input_type(&mut self, name: &str, accepted: KindSet) -> bool {
        let Some(index) = self.ports.input_index(name) else {
            return false;
        };
        let supplied = self.input_at(index).map(TypedValue::kind);
        if let Some(port) = self.ports.input_mut(index) {
            port.set_accepted(accepted);
        }
        match supplied {
            Some(kind) if !accepted.contains(kind) => {
                tracing::warn!(
                    node = %self.node,
                    input = name,
                    "This node requires an input with types: {}. Got {} instead",
                    accepted,
                    kind
                );
                self.detach_input(index);
                true
            }
            _ => false,
        }
    }

    /// Remove the edge feeding input `index`
    pub fn detach_input(&mut self, index: usize) -> Option<EdgeAddress> {
        let port = self.ports.input_mut(index)?;
        let address = port.detach()?;
        let name = port.name.clone();
        self.edges.remove(self.node, address.consumer_input);
        tracing::debug!(node = %self.node, input = %name, producer = %address.producer, "Edge removed");
        self.detached.push(name);
        Some(address)
    }

    /// Replace the input list, detaching edges on ports that move or vanish
    pub fn set_inputs_ordered<S: AsRef<str>>(&mut self, names: &[S]) {
        for (name, address) in self.ports.set_inputs_ordered(names) {
            self.edges.remove(self.node, address.consumer_input);
            tracing::debug!(node = %self.node, input = %name, "Edge removed with its port");
            self.detached.push(name);
        }
    }

    /// Inputs that lost their edge during this update
    pub(crate) fn finish(self) -> Vec<String> {
        self.detached
    }
}

/// Recoverable error raised while a node updates
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvaluationError {
    /// Missing required input
    #[error("Missing required input: {0}")]
    MissingInput(String),

    /// Producer kind not accepted by the input
    #[error("Input '{input}' requires {required}, got {supplied}")]
    TypeMismatch {
        /// Input name
        input: String,
        /// Accepted kinds
        required: KindSet,
        /// Kind supplied
        supplied: Kind,
    },

    /// Formula failed to parse or evaluate
    #[error("Expression error: {0}")]
    Expression(String),

    /// Background resource failed
    #[error("Resource load failed: {0}")]
    ResourceLoad(#[from] ResourceLoadError),

    /// Custom error
    #[error("{0}")]
    Custom(String),
}

impl EvaluationError {
    /// Log with the severity of this error class
    pub fn log(&self, node: NodeId) {
        match self {
            Self::MissingInput(_) => tracing::debug!(node = %node, "{}", self),
            Self::TypeMismatch { .. } | Self::Custom(_) => tracing::warn!(node = %node, "{}", self),
            Self::Expression(_) | Self::ResourceLoad(_) => tracing::error!(node = %node, "{}", self),
        }
    }
}

/// Last error a node reported. Logs only when the error changes so a
/// persistent failure does not flood the log every frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorState(Option<EvaluationError>);

impl ErrorState {
    /// Record `error`, logging it if it is new
    pub fn report(&mut self, node: NodeId, error: EvaluationError) {
        if self.0.as_ref() != Some(&error) {
            error.log(node);
        }
        self.0 = Some(error);
    }

    /// Forget the last error
    pub fn clear(&mut self) {
        self.0 = None;
    }

    /// Last error, if any
    pub fn get(&self) -> Option<&EvaluationError> {
        self.0.as_ref()
    }

    /// Copy the error line into a view
    pub fn render(&self, view: &mut NodeView) {
        if let Some(error) = &self.0 {
            view.set_error(error);
        }
    }
}
