// SPDX-License-Identifier: MIT OR Apache-2.0
//! Per-graph state shared by every node: identity allocation, default
//! naming, the frame clock, and the expression engine.

use crate::expr::ExpressionEngine;
use crate::node::{NodeId, NodeType};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Time source for a graph
#[derive(Debug, Clone)]
pub struct FrameClock {
    start: Instant,
    elapsed: Duration,
    delta: Duration,
    frame: u64,
}

impl FrameClock {
    /// Create a clock at time zero
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            elapsed: Duration::ZERO,
            delta: Duration::ZERO,
            frame: 0,
        }
    }

    /// Advance to the current wall-clock time
    pub fn tick(&mut self) {
        let now = self.start.elapsed();
        self.delta = now.saturating_sub(self.elapsed);
        self.elapsed = self.elapsed.max(now);
        self.frame += 1;
    }

    /// Advance by a fixed step
    pub fn step(&mut self, dt: Duration) {
        self.delta = dt;
        self.elapsed += dt;
        self.frame += 1;
    }

    /// Time since the clock started
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Length of the last frame
    pub fn delta(&self) -> Duration {
        self.delta
    }

    /// Frames advanced so far
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Reset to time zero
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared state owned by a [`Graph`](crate::graph::Graph)
#[derive(Debug)]
pub struct GraphContext {
    next_id: u32,
    name_counters: HashMap<NodeType, u32>,
    clock: FrameClock,
    expressions: ExpressionEngine,
    assets_root: Option<PathBuf>,
    span: tracing::Span,
}

impl GraphContext {
    /// Create a context for a graph called `graph_name`
    pub fn new(graph_name: &str) -> Self {
        Self {
            next_id: 0,
            name_counters: HashMap::new(),
            clock: FrameClock::new(),
            expressions: ExpressionEngine::new(),
            assets_root: None,
            span: tracing::info_span!("graph", name = %graph_name),
        }
    }

    /// Reserve an identity for a node with `port_count` ports. The counter
    /// skips one value per port so ids stay unique if ports are ever given
    /// their own. Returns `None` once the id space is used up; the counter
    /// then stays where it is.
    pub fn allocate_id(&mut self, port_count: usize) -> Option<NodeId> {
        let step = u32::try_from(port_count).ok()?.checked_add(1)?;
        let next_id = self.next_id.checked_add(step)?;
        let id = NodeId(self.next_id);
        self.next_id = next_id;
        Some(id)
    }

    /// Next identity that will be handed out
    pub fn next_id(&self) -> u32 {
        self.next_id
    }

    pub(crate) fn set_next_id(&mut self, next_id: u32) {
        self.next_id = next_id;
    }

    /// Default display name such as "Value Node #0"
    pub fn default_name(&mut self, node_type: NodeType) -> String {
        let counter = self.name_counters.entry(node_type).or_insert(0);
        let name = format!("{} Node #{}", node_type.display_name(), counter);
        *counter += 1;
        name
    }

    /// Frame clock
    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    /// Mutable frame clock
    pub fn clock_mut(&mut self) -> &mut FrameClock {
        &mut self.clock
    }

    /// Expression engine
    pub fn expressions(&self) -> &ExpressionEngine {
        &self.expressions
    }

    /// Directory relative resource paths resolve against
    pub fn assets_root(&self) -> Option<&Path> {
        self.assets_root.as_deref()
    }

    /// Set the directory relative resource paths resolve against
    pub fn set_assets_root(&mut self, root: Option<PathBuf>) {
        self.assets_root = root;
    }

    /// Tracing span entered while the graph runs
    pub fn span(&self) -> &tracing::Span {
        &self.span
    }

    /// Forget allocated ids, name counters and elapsed time
    pub fn reset(&mut self) {
        self.next_id = 0;
        self.name_counters.clear();
        self.clock.reset();
    }
}

impl Default for GraphContext {
    fn default() -> Self {
        Self::new("Untitled")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_skip_port_slots() {
        let mut ctx = GraphContext::default();
        assert_eq!(ctx.allocate_id(3), Some(NodeId(0)));
        assert_eq!(ctx.allocate_id(1), Some(NodeId(4)));
        assert_eq!(ctx.next_id(), 6);
    }

    #[test]
    fn test_exhausted_id_space_allocates_nothing() {
        let mut ctx = GraphContext::default();
        ctx.set_next_id(u32::MAX - 3);
        assert_eq!(ctx.allocate_id(1), Some(NodeId(u32::MAX - 3)));
        assert_eq!(ctx.allocate_id(1), None);
        assert_eq!(ctx.next_id(), u32::MAX - 1);
        assert_eq!(ctx.allocate_id(0), Some(NodeId(u32::MAX - 1)));
        assert_eq!(ctx.allocate_id(0), None);
    }

    #[test]
    fn test_default_names_count_per_type() {
        let mut ctx = GraphContext::default();
        assert_eq!(ctx.default_name(NodeType::Value), "Value Node #0");
        assert_eq!(ctx.default_name(NodeType::Value), "Value Node #1");
        assert_eq!(ctx.default_name(NodeType::Math), "Math Node #0");
    }

    #[test]
    fn test_fixed_steps_accumulate() {
        let mut clock = FrameClock::new();
        clock.step(Duration::from_millis(250));
        clock.step(Duration::from_millis(250));
        assert_eq!(clock.elapsed(), Duration::from_millis(500));
        assert_eq!(clock.delta(), Duration::from_millis(250));
        assert_eq!(clock.frame(), 2);
    }
}
