// SPDX-License-Identifier: MIT OR Apache-2.0
//! Connection (edge) definitions for the graph.
//!
//! The [`EdgeTable`] is the single record of which output feeds which input.
//! It is keyed by the consumer side, so an input can never have two sources,
//! and answers producer-side queries for deletion and serialization.

use crate::node::NodeId;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Where an input reads from: a producer node and one of its outputs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeAddress {
    /// Output index on the producer
    pub producer_output: u8,
    /// Input index on the consumer
    pub consumer_input: u8,
    /// Producer node
    pub producer: NodeId,
}

/// A connection from a producer output to a consumer input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Edge {
    /// Consumer node
    pub consumer: NodeId,
    /// Producer side and input index
    pub address: EdgeAddress,
}

impl Edge {
    /// Create a new edge
    pub fn new(producer: NodeId, producer_output: u8, consumer: NodeId, consumer_input: u8) -> Self {
        Self {
            consumer,
            address: EdgeAddress {
                producer_output,
                consumer_input,
                producer,
            },
        }
    }

    /// Producer node
    pub fn producer(&self) -> NodeId {
        self.address.producer
    }

    /// Check if this edge involves a specific node
    pub fn involves_node(&self, node_id: NodeId) -> bool {
        self.address.producer == node_id || self.consumer == node_id
    }
}

/// All edges of a graph, at most one per consumer input
#[derive(Debug, Clone, Default)]
pub struct EdgeTable {
    by_consumer: IndexMap<(NodeId, u8), EdgeAddress>,
}

impl EdgeTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `edge`, returning the address it replaced on that input
    pub fn insert(&mut self, edge: Edge) -> Option<EdgeAddress> {
        self.by_consumer
            .insert((edge.consumer, edge.address.consumer_input), edge.address)
    }

    /// Remove the edge feeding `consumer`'s input `input`
    pub fn remove(&mut self, consumer: NodeId, input: u8) -> Option<EdgeAddress> {
        self.by_consumer.shift_remove(&(consumer, input))
    }

    /// Source of `consumer`'s input `input`
    pub fn get(&self, consumer: NodeId, input: u8) -> Option<EdgeAddress> {
        self.by_consumer.get(&(consumer, input)).copied()
    }

    /// Whether exactly this edge is present
    pub fn contains(&self, edge: &Edge) -> bool {
        self.get(edge.consumer, edge.address.consumer_input) == Some(edge.address)
    }

    /// All edges in insertion order
    pub fn iter(&self) -> impl Iterator<Item = Edge> + '_ {
        self.by_consumer.iter().map(|(&(consumer, _), &address)| Edge { consumer, address })
    }

    /// Edges arriving at `consumer`
    pub fn incoming(&self, consumer: NodeId) -> impl Iterator<Item = Edge> + '_ {
        self.iter().filter(move |e| e.consumer == consumer)
    }

    /// Edges leaving `producer`, i.e. its dependents
    pub fn outgoing(&self, producer: NodeId) -> impl Iterator<Item = Edge> + '_ {
        self.iter().filter(move |e| e.address.producer == producer)
    }

    /// Remove every edge touching `node`, returning the ones it produced
    /// and the ones it consumed
    pub fn remove_node(&mut self, node: NodeId) -> (Vec<Edge>, Vec<Edge>) {
        let mut outgoing = Vec::new();
        let mut incoming = Vec::new();
        self.by_consumer.retain(|&(consumer, _), &mut address| {
            let edge = Edge { consumer, address };
            if address.producer == node {
                outgoing.push(edge);
                false
            } else if consumer == node {
                incoming.push(edge);
                false
            } else {
                true
            }
        });
        (outgoing, incoming)
    }

    /// Number of edges
    pub fn len(&self) -> usize {
        self.by_consumer.len()
    }

    /// Whether there are no edges
    pub fn is_empty(&self) -> bool {
        self.by_consumer.is_empty()
    }

    /// Remove every edge
    pub fn clear(&mut self) {
        self.by_consumer.clear();
    }
}
