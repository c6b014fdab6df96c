// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph data structure containing nodes and edges, and the frame scheduler.
//!
//! Nodes live in an insertion-ordered arena kept stably sorted by
//! [`Priority`](crate::node::Priority): a frame walks the arena front to back
//! so feedback nodes run first, sinks last, and everything else in the order
//! it was added.

use crate::connection::{Edge, EdgeTable};
use crate::context::GraphContext;
use crate::evaluation::NodeIo;
use crate::node::{Node, NodeBehavior, NodeId, NodeType, NodeView, ProducerInfo};
use crate::port::PortDirection;
use indexmap::IndexMap;
use std::time::Duration;

/// A node graph
#[derive(Debug)]
pub struct Graph {
    /// Graph name
    pub name: String,
    /// Nodes in evaluation order
    nodes: IndexMap<NodeId, Node>,
    /// Edges between nodes
    edges: EdgeTable,
    /// Identity allocation, clock and shared services
    context: GraphContext,
}

impl Graph {
    /// Create a new empty graph
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let context = GraphContext::new(&name);
        Self {
            name,
            nodes: IndexMap::new(),
            edges: EdgeTable::new(),
            context,
        }
    }

    /// Add a node to the graph. A node already present under the same id is
    /// removed first.
    pub fn add_node(&mut self, node: Node) -> NodeId {
        let id = node.id;
        if self.nodes.contains_key(&id) {
            tracing::warn!(node = %id, "Replacing node with duplicate id");
            self.remove_node(id);
        }
        tracing::debug!(node = %id, name = %node.name, "Node added");
        self.nodes.insert(id, node);
        self.nodes.sort_by(|_, a, _, b| a.priority.cmp(&b.priority));
        id
    }

    /// Create a node of `node_type` with a fresh id and default name. An id
    /// already taken in this graph is swapped for the lowest free one.
    pub fn create_node(&mut self, node_type: NodeType) -> NodeId {
        let mut node = Node::new(&mut self.context, node_type);
        if self.nodes.contains_key(&node.id) {
            if let Some(free) = (0..=u32::MAX).map(NodeId).find(|id| !self.nodes.contains_key(id)) {
                tracing::warn!(taken = %node.id, id = %free, "Node id already in use, reassigning");
                node.id = free;
            }
        }
        self.add_node(node)
    }

    /// Remove a node and every edge touching it. Consumers of its outputs
    /// are left unconnected.
    pub fn remove_node(&mut self, node_id: NodeId) -> Option<Node> {
        let node = self.nodes.shift_remove(&node_id)?;
        let (outgoing, incoming) = self.edges.remove_node(node_id);
        for edge in &outgoing {
            let Some(consumer) = self.nodes.get_mut(&edge.consumer) else {
                continue;
            };
            let Some(port) = consumer.ports.input_mut(usize::from(edge.address.consumer_input)) else {
                continue;
            };
            port.detach();
            let name = port.name.clone();
            consumer.kind.on_disconnect(&name);
        }
        tracing::debug!(
            node = %node_id,
            outgoing = outgoing.len(),
            incoming = incoming.len(),
            "Node removed"
        );
        Some(node)
    }

    /// Get a node by ID
    pub fn node(&self, node_id: NodeId) -> Option<&Node> {
        self.nodes.get(&node_id)
    }

    /// Get a mutable node by ID
    pub fn node_mut(&mut self, node_id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&node_id)
    }

    /// Get all nodes, in evaluation order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Get all node IDs, in evaluation order
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    /// Get the number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Feed input `input` of `consumer` from output `output` of `producer`.
    /// An edge already on that input is replaced.
    pub fn connect(
        &mut self,
        producer: NodeId,
        output: usize,
        consumer: NodeId,
        input: usize,
    ) -> Result<Edge, ConnectionError> {
        if producer == consumer {
            return Err(ConnectionError::SelfLoop);
        }

        let source = self.nodes.get(&producer).ok_or(ConnectionError::NodeNotFound(producer))?;
        let output_port = source.ports.output(output).ok_or(ConnectionError::PortNotFound {
            node: producer,
            direction: PortDirection::Output,
            index: output,
        })?;
        let info = ProducerInfo {
            id: producer,
            name: source.name.clone(),
            output: output_port.name.clone(),
            kind: output_port.value.kind(),
        };

        let target = self.nodes.get_mut(&consumer).ok_or(ConnectionError::NodeNotFound(consumer))?;
        let port_not_found = || ConnectionError::PortNotFound {
            node: consumer,
            direction: PortDirection::Input,
            index: input,
        };
        let input_slot = u8::try_from(input).map_err(|_| port_not_found())?;
        let output_slot = u8::try_from(output).map_err(|_| ConnectionError::PortNotFound {
            node: producer,
            direction: PortDirection::Output,
            index: output,
        })?;
        let port = target.ports.input_mut(input).ok_or_else(port_not_found)?;

        let edge = Edge::new(producer, output_slot, consumer, input_slot);
        let replaced = port.attach(edge.address);
        let name = port.name.clone();
        self.edges.insert(edge);

        if replaced.is_some() {
            target.kind.on_disconnect(&name);
        }
        target.kind.on_connection(&name, &info);
        tracing::debug!(
            producer = %producer,
            output = %info.output,
            consumer = %consumer,
            input = %name,
            "Edge added"
        );
        Ok(edge)
    }

    /// [`connect`](Self::connect) by port names
    pub fn connect_named(
        &mut self,
        producer: NodeId,
        output: &str,
        consumer: NodeId,
        input: &str,
    ) -> Result<Edge, ConnectionError> {
        let output_index = self
            .node(producer)
            .ok_or(ConnectionError::NodeNotFound(producer))?
            .ports
            .output_index(output)
            .ok_or_else(|| ConnectionError::PortNameNotFound {
                node: producer,
                name: output.to_string(),
            })?;
        let input_index = self
            .node(consumer)
            .ok_or(ConnectionError::NodeNotFound(consumer))?
            .ports
            .input_index(input)
            .ok_or_else(|| ConnectionError::PortNameNotFound {
                node: consumer,
                name: input.to_string(),
            })?;
        self.connect(producer, output_index, consumer, input_index)
    }

    /// Remove the edge feeding input `input` of `consumer`
    pub fn disconnect(&mut self, consumer: NodeId, input: usize) -> Option<Edge> {
        let slot = u8::try_from(input).ok()?;
        let node = self.nodes.get_mut(&consumer)?;
        let port = node.ports.input_mut(input)?;
        let address = port.detach()?;
        let name = port.name.clone();
        self.edges.remove(consumer, slot);
        node.kind.on_disconnect(&name);
        tracing::debug!(consumer = %consumer, input = %name, "Edge removed");
        Some(Edge { consumer, address })
    }

    /// All edges
    pub fn edges(&self) -> &EdgeTable {
        &self.edges
    }

    /// Advance the clock by real elapsed time and update every node once
    pub fn run_frame(&mut self) {
        self.context.clock_mut().tick();
        self.evaluate();
    }

    /// Advance the clock by `dt` and update every node once
    pub fn step(&mut self, dt: Duration) {
        self.context.clock_mut().step(dt);
        self.evaluate();
    }

    fn evaluate(&mut self) {
        let span = self.context.span().clone();
        let _entered = span.enter();

        for position in 0..self.nodes.len() {
            let Some((_, node)) = self.nodes.get_index(position) else {
                continue;
            };
            let upstream: Vec<Option<usize>> = node
                .ports
                .inputs()
                .iter()
                .map(|p| p.source().and_then(|a| self.nodes.get_index_of(&a.producer)))
                .collect();

            let (before, rest) = self.nodes.as_mut_slice().split_at_mut(position);
            let Some(((&id, node), after)) = rest.split_first_mut() else {
                continue;
            };
            let Node { ports, kind, .. } = node;
            let mut io = NodeIo::new(id, ports, before, after, upstream, &mut self.edges, &self.context);
            kind.update(&mut io);
            for input in io.finish() {
                kind.on_disconnect(&input);
            }
        }
    }

    /// Views of every node, in evaluation order
    pub fn render_frame(&self) -> Vec<NodeView> {
        self.nodes.values().map(Node::view).collect()
    }

    /// Shared context
    pub fn context(&self) -> &GraphContext {
        &self.context
    }

    /// Mutable shared context
    pub fn context_mut(&mut self) -> &mut GraphContext {
        &mut self.context
    }

    /// Remove every node and edge and reset identity allocation
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.edges.clear();
        self.context.reset();
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new("Untitled")
    }
}

/// Error when creating a connection
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConnectionError {
    /// Node not found
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// Port index out of range
    #[error("Node {node} has no {direction} port {index}")]
    PortNotFound {
        /// Node searched
        node: NodeId,
        /// Side searched
        direction: PortDirection,
        /// Requested index
        index: usize,
    },

    /// No port with that name
    #[error("Node {node} has no port named '{name}'")]
    PortNameNotFound {
        /// Node searched
        node: NodeId,
        /// Requested name
        name: String,
    },

    /// Self-loop not allowed
    #[error("Self-loop not allowed")]
    SelfLoop,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::{testing, NodeKind};
    use crate::node::Priority;
    use crate::value::Value;
    use proptest::prelude::*;

    fn value_node(graph: &mut Graph, value: f32) -> NodeId {
        let id = graph.create_node(NodeType::Value);
        if let Some(NodeKind::Value(node)) = graph.node_mut(id).map(|n| n.kind_mut()) {
            node.set_float(value);
        }
        id
    }

    #[test]
    fn test_value_plus_value_yields_dirty_sum() {
        let mut graph = Graph::default();
        let a = value_node(&mut graph, 1.0);
        let b = value_node(&mut graph, 2.0);
        let math = graph.create_node(NodeType::Math);
        graph.connect(a, 0, math, 0).unwrap();
        graph.connect(b, 0, math, 1).unwrap();
        testing::frame(&mut graph);

        let output = &graph.node(math).unwrap().output(0).unwrap().value;
        assert_eq!(output.value(), &Value::Float(3.0));
        assert!(output.is_dirty());
    }

    #[test]
    fn test_float_into_vector3_input_is_detached() {
        let mut graph = Graph::default();
        let a = value_node(&mut graph, 1.0);
        let camera = graph.create_node(NodeType::Camera);
        graph.connect(a, 0, camera, 0).unwrap();
        assert_eq!(graph.edges().len(), 1);

        testing::frame(&mut graph);
        assert!(graph.edges().is_empty());
        assert!(!graph.node(camera).unwrap().input(0).unwrap().is_connected());
    }

    #[test]
    fn test_removing_producer_detaches_consumers() {
        let mut graph = Graph::default();
        let a = value_node(&mut graph, 1.0);
        let math = graph.create_node(NodeType::Math);
        let display = graph.create_node(NodeType::Display);
        graph.connect(a, 0, math, 0).unwrap();
        graph.connect(a, 0, math, 1).unwrap();
        graph.connect(a, 0, display, 0).unwrap();
        graph.connect(math, 0, display, 0).unwrap();
        testing::frame(&mut graph);

        assert!(graph.remove_node(a).is_some());
        assert_eq!(graph.edges().len(), 1);
        let math_node = graph.node(math).unwrap();
        assert!(math_node.ports().inputs().iter().all(|p| !p.is_connected()));
        assert!(graph.node(display).unwrap().input(0).unwrap().is_connected());

        assert!(graph.remove_node(math).is_some());
        assert!(graph.edges().is_empty());
        assert!(!graph.node(display).unwrap().input(0).unwrap().is_connected());
        testing::frame(&mut graph);
    }

    #[test]
    fn test_connecting_twice_replaces_edge() {
        let mut graph = Graph::default();
        let a = value_node(&mut graph, 1.0);
        let b = value_node(&mut graph, 2.0);
        let display = graph.create_node(NodeType::Display);
        graph.connect(a, 0, display, 0).unwrap();
        graph.connect(b, 0, display, 0).unwrap();
        assert_eq!(graph.edges().len(), 1);
        assert_eq!(graph.edges().get(display, 0).map(|a| a.producer), Some(b));

        testing::frame(&mut graph);
        assert_eq!(testing::output(&graph, display, 0), Value::Float(2.0));
    }

    #[test]
    fn test_connect_rejects_bad_endpoints() {
        let mut graph = Graph::default();
        let a = value_node(&mut graph, 1.0);
        let math = graph.create_node(NodeType::Math);
        assert_eq!(graph.connect(math, 0, math, 0), Err(ConnectionError::SelfLoop));
        assert_eq!(
            graph.connect(NodeId(999), 0, math, 0),
            Err(ConnectionError::NodeNotFound(NodeId(999)))
        );
        assert!(matches!(
            graph.connect(a, 3, math, 0),
            Err(ConnectionError::PortNotFound { direction: PortDirection::Output, .. })
        ));
        assert!(matches!(
            graph.connect(a, 0, math, 2),
            Err(ConnectionError::PortNotFound { direction: PortDirection::Input, .. })
        ));
        assert!(matches!(
            graph.connect_named(a, "value", math, "C"),
            Err(ConnectionError::PortNameNotFound { .. })
        ));
        assert!(graph.edges().is_empty());
    }

    #[test]
    fn test_connect_named_and_disconnect() {
        let mut graph = Graph::default();
        let a = value_node(&mut graph, 4.0);
        let math = graph.create_node(NodeType::Math);
        let edge = graph.connect_named(a, "value", math, "B").unwrap();
        assert_eq!(edge.address.consumer_input, 1);

        assert_eq!(graph.disconnect(math, 1), Some(edge));
        assert_eq!(graph.disconnect(math, 1), None);
        assert!(graph.edges().is_empty());
    }

    #[test]
    fn test_nodes_run_in_priority_order() {
        let mut graph = Graph::default();
        let render = graph.create_node(NodeType::Render);
        let value = graph.create_node(NodeType::Value);
        let feedback = graph.create_node(NodeType::Feedback);
        let math = graph.create_node(NodeType::Math);
        let order: Vec<NodeId> = graph.node_ids().collect();
        assert_eq!(order, vec![feedback, value, math, render]);
        let priorities: Vec<Priority> = graph.nodes().map(|n| n.priority).collect();
        assert!(priorities.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_consumer_before_producer_sees_value_next_frame() {
        let mut graph = Graph::default();
        let display = graph.create_node(NodeType::Display);
        let a = value_node(&mut graph, 6.0);
        graph.connect(a, 0, display, 0).unwrap();

        testing::frame(&mut graph);
        assert_eq!(testing::output(&graph, display, 0), Value::Float(1.0));
        testing::frame(&mut graph);
        assert_eq!(testing::output(&graph, display, 0), Value::Float(6.0));
    }

    #[test]
    fn test_render_frame_lists_every_node() {
        let mut graph = Graph::new("views");
        value_node(&mut graph, 1.0);
        graph.create_node(NodeType::Math);
        testing::frame(&mut graph);
        let views = graph.render_frame();
        assert_eq!(views.len(), 2);
        assert_eq!(views[0].title, "Value Node #0");
        assert_eq!(views[1].title, "Math Node #0");
    }

    #[test]
    fn test_exhausted_ids_never_replace_nodes() {
        let mut graph = Graph::default();
        graph.context_mut().set_next_id(u32::MAX - 1);
        let first = graph.create_node(NodeType::Value);
        let second = graph.create_node(NodeType::Value);
        let third = graph.create_node(NodeType::Math);
        assert_eq!(first, NodeId::UNALLOCATED);
        assert_eq!(second, NodeId(0));
        assert_eq!(third, NodeId(1));
        assert_eq!(graph.node_count(), 3);
    }

    #[test]
    fn test_loaded_counter_near_limit_keeps_nodes_distinct() {
        let mut source = Graph::default();
        source.create_node(NodeType::Time);
        source.context_mut().set_next_id(u32::MAX - 1);
        let bytes = source.save_scene().unwrap();

        let mut graph = Graph::default();
        graph.load_scene(&bytes).unwrap();
        let ids: Vec<NodeId> = (0..4).map(|_| graph.create_node(NodeType::Display)).collect();
        assert_eq!(graph.node_count(), 5);
        let mut unique = ids.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), ids.len());
    }

    #[test]
    fn test_clear_resets_ids() {
        let mut graph = Graph::default();
        graph.create_node(NodeType::Value);
        graph.clear();
        assert_eq!(graph.node_count(), 0);
        assert_eq!(graph.create_node(NodeType::Value), NodeId(0));
    }

    proptest! {
        #[test]
        fn test_each_input_has_at_most_one_edge(
            wiring in prop::collection::vec((0usize..4, 0usize..4, 0usize..2), 0..24)
        ) {
            let mut graph = Graph::default();
            let ids: Vec<NodeId> = (0..4).map(|_| graph.create_node(NodeType::Math)).collect();
            for (producer, consumer, input) in wiring {
                let _ = graph.connect(ids[producer], 0, ids[consumer], input);
            }
            let connected: usize = graph
                .nodes()
                .map(|n| n.ports().inputs().iter().filter(|p| p.is_connected()).count())
                .sum();
            prop_assert_eq!(connected, graph.edges().len());
            for edge in graph.edges().iter() {
                let port = graph.node(edge.consumer).unwrap().input(usize::from(edge.address.consumer_input)).unwrap();
                prop_assert_eq!(port.source(), Some(edge.address));
            }
        }

        #[test]
        fn test_deleting_a_node_leaves_no_dangling_edges(
            wiring in prop::collection::vec((0usize..5, 0usize..5, 0usize..2), 0..30),
            victim in 0usize..5,
        ) {
            let mut graph = Graph::default();
            let ids: Vec<NodeId> = (0..5).map(|_| graph.create_node(NodeType::Math)).collect();
            for (producer, consumer, input) in wiring {
                let _ = graph.connect(ids[producer], 0, ids[consumer], input);
            }
            let outgoing = graph.edges().outgoing(ids[victim]).count();
            let connected_before: usize = graph
                .nodes()
                .filter(|n| n.id != ids[victim])
                .map(|n| n.ports().inputs().iter().filter(|p| p.is_connected()).count())
                .sum();

            graph.remove_node(ids[victim]);
            let connected_after: usize = graph
                .nodes()
                .map(|n| n.ports().inputs().iter().filter(|p| p.is_connected()).count())
                .sum();
            prop_assert_eq!(connected_before - connected_after, outgoing);
            prop_assert!(graph.edges().iter().all(|e| !e.involves_node(ids[victim])));
        }
    }
}
