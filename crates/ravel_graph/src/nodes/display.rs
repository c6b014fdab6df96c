// SPDX-License-Identifier: MIT OR Apache-2.0
//! Pass-through nodes: value inspection and the one-frame delay.

use crate::evaluation::NodeIo;
use crate::node::{NodeBehavior, NodeView, ProducerInfo};
use crate::port::PortDirectory;
use crate::value::KindSet;

/// Mirrors a non-list input so it can be inspected
#[derive(Debug, Default)]
pub struct DisplayNode {
    producer: Option<String>,
    refresh: bool,
}

impl DisplayNode {
    /// Name of the producer feeding `in`
    pub fn producer(&self) -> Option<&str> {
        self.producer.as_deref()
    }
}

impl NodeBehavior for DisplayNode {
    fn update(&mut self, io: &mut NodeIo<'_>) {
        io.clear_output_dirty();
        io.ensure_input_type("in", KindSet::SINGLE);
        let Some(input) = io.input("in") else {
            return;
        };
        if input.is_dirty() || std::mem::take(&mut self.refresh) {
            io.publish(0, input.value().clone());
        }
    }

    fn render(&self, ports: &PortDirectory, view: &mut NodeView) {
        if let Some(producer) = &self.producer {
            view.row("from", producer);
        }
        if let Some(output) = ports.output(0) {
            view.row("kind", output.value.kind());
            view.row("value", output.value.value());
        }
    }

    fn on_connection(&mut self, _input: &str, producer: &ProducerInfo) {
        self.producer = Some(format!("{}.{}", producer.name, producer.output));
        self.refresh = true;
    }

    fn on_disconnect(&mut self, _input: &str) {
        self.producer = None;
    }
}

/// Republishes its input one frame late. Runs before every other node, so
/// it always reads what its producer published on the previous frame.
#[derive(Debug, Default)]
pub struct FeedbackNode {
    refresh: bool,
}

impl NodeBehavior for FeedbackNode {
    fn update(&mut self, io: &mut NodeIo<'_>) {
        io.clear_output_dirty();
        io.ensure_input_type("in", KindSet::NUMERIC);
        let Some(input) = io.input("in") else {
            return;
        };
        if input.is_dirty() || std::mem::take(&mut self.refresh) {
            io.publish(0, input.value().clone());
        }
    }

    fn render(&self, ports: &PortDirectory, view: &mut NodeView) {
        if let Some(output) = ports.output(0) {
            view.row("previous", output.value.value());
        }
    }

    fn on_connection(&mut self, _input: &str, _producer: &ProducerInfo) {
        self.refresh = true;
    }
}

#[cfg(test)]
mod tests {
    use crate::graph::Graph;
    use crate::node::NodeType;
    use crate::nodes::{testing, NodeKind};
    use crate::value::{Kind, KindSet, Value};

    #[test]
    fn test_display_mirrors_input_and_names_producer() {
        let mut graph = Graph::default();
        let source = graph.create_node(NodeType::Value);
        let display = graph.create_node(NodeType::Display);
        graph.connect(source, 0, display, 0).unwrap();
        testing::frame(&mut graph);
        assert_eq!(testing::output(&graph, display, 0), Value::Float(1.0));

        let Some(NodeKind::Display(node)) = graph.node(display).map(|n| n.kind()) else {
            panic!("not a display node");
        };
        assert_eq!(node.producer(), Some("Value Node #0.value"));
    }

    #[test]
    fn test_display_rejects_lists() {
        let mut graph = Graph::default();
        let list = testing::source(&mut graph, Value::FloatList(vec![1.0]));
        let display = graph.create_node(NodeType::Display);
        graph.connect(list, 0, display, 0).unwrap();
        testing::frame(&mut graph);
        assert!(graph.edges().is_empty());
        assert_eq!(graph.node(display).unwrap().input(0).unwrap().accepted(), KindSet::SINGLE);
        assert_eq!(graph.node(display).unwrap().output(0).unwrap().value.kind(), Kind::Empty);
    }

    #[test]
    fn test_feedback_lags_one_frame() {
        let mut graph = Graph::default();
        let source = graph.create_node(NodeType::Value);
        let feedback = graph.create_node(NodeType::Feedback);
        graph.connect(source, 0, feedback, 0).unwrap();
        testing::frame(&mut graph);
        assert_eq!(testing::output(&graph, feedback, 0), Value::Float(1.0));

        if let Some(NodeKind::Value(node)) = graph.node_mut(source).map(|n| n.kind_mut()) {
            node.set_float(5.0);
        }
        testing::frame(&mut graph);
        assert_eq!(testing::output(&graph, source, 0), Value::Float(5.0));
        assert_eq!(testing::output(&graph, feedback, 0), Value::Float(1.0));

        testing::frame(&mut graph);
        assert_eq!(testing::output(&graph, feedback, 0), Value::Float(5.0));
    }
}
