// SPDX-License-Identifier: MIT OR Apache-2.0
//! Scene save and load.
//!
//! Layout: `u64` node count, `u32` next identity, one `u8` node-type tag per
//! node, then one length-prefixed block per node in the same order. Edges
//! are stored on their producer's block and re-attached once every node is
//! back, so forward references resolve.

use crate::connection::Edge;
use crate::graph::Graph;
use crate::node::{Node, NodeType};
use crate::serialization::{ByteBuffer, SerializationError};
use std::collections::HashSet;

impl Graph {
    /// Encode every node, edge and output value
    pub fn save_scene(&self) -> Result<Vec<u8>, SerializationError> {
        let mut buffer = ByteBuffer::new();
        buffer.add(&(self.node_count() as u64))?;
        buffer.add(&self.context().next_id())?;
        for node in self.nodes() {
            buffer.add(&node.node_type().tag())?;
        }
        for node in self.nodes() {
            let block = node.serialize(self.edges().outgoing(node.id))?;
            buffer.add_raw(block.as_bytes())?;
        }
        tracing::info!(
            graph = %self.name,
            nodes = self.node_count(),
            edges = self.edges().len(),
            bytes = buffer.len(),
            "Scene saved"
        );
        Ok(buffer.into_bytes())
    }

    /// Replace the graph's contents with a saved scene. On error the graph
    /// is left empty. Edges that no longer resolve are skipped.
    pub fn load_scene(&mut self, bytes: &[u8]) -> Result<(), SerializationError> {
        self.clear();
        let edges = match self.load_nodes(bytes) {
            Ok(edges) => edges,
            Err(error) => {
                self.clear();
                tracing::error!(graph = %self.name, "Failed to load scene: {}", error);
                return Err(error);
            }
        };

        let mut skipped = 0usize;
        for edge in &edges {
            let connected = self.connect(
                edge.producer(),
                usize::from(edge.address.producer_output),
                edge.consumer,
                usize::from(edge.address.consumer_input),
            );
            if let Err(error) = connected {
                skipped += 1;
                tracing::error!(
                    producer = %edge.producer(),
                    consumer = %edge.consumer,
                    "Skipping saved edge: {}",
                    error
                );
            }
        }

        tracing::info!(
            graph = %self.name,
            nodes = self.node_count(),
            edges = self.edges().len(),
            skipped,
            "Scene loaded"
        );
        Ok(())
    }

    fn load_nodes(&mut self, bytes: &[u8]) -> Result<Vec<Edge>, SerializationError> {
        let mut buffer = ByteBuffer::from_bytes(bytes);
        let count: u64 = buffer.get()?;
        let next_id: u32 = buffer.get()?;

        // One tag byte per node must follow
        let count = usize::try_from(count)
            .ok()
            .filter(|&c| c <= buffer.remaining())
            .ok_or(SerializationError::UnexpectedEnd {
                needed: usize::try_from(count).unwrap_or(usize::MAX),
                remaining: buffer.remaining(),
            })?;

        let node_types = (0..count)
            .map(|_| {
                let tag: u8 = buffer.get()?;
                NodeType::from_tag(tag).ok_or(SerializationError::UnknownNodeType(tag))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut nodes = Vec::with_capacity(count);
        let mut edges = Vec::new();
        let mut seen = HashSet::with_capacity(count);
        for node_type in node_types {
            let mut block = ByteBuffer::from_bytes(buffer.get_raw()?);
            let mut node = Node::new(self.context_mut(), node_type);
            edges.extend(node.deserialize(&mut block)?);
            if !block.is_exhausted() {
                return Err(SerializationError::Shape(format!(
                    "{} unread bytes in the block of node {}",
                    block.remaining(),
                    node.id
                )));
            }
            if !seen.insert(node.id) {
                return Err(SerializationError::Shape(format!("duplicate node id {}", node.id)));
            }
            nodes.push(node);
        }

        let floor = nodes.iter().map(|n| n.id.0.saturating_add(1)).max().unwrap_or(0);
        for node in nodes {
            self.add_node(node);
        }
        self.context_mut().set_next_id(next_id.max(floor));
        Ok(edges)
    }
}
