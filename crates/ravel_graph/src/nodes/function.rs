// SPDX-License-Identifier: MIT OR Apache-2.0
//! User formula over up to three float inputs.

use crate::evaluation::{ErrorState, NodeIo};
use crate::expr::CompiledExpression;
use crate::node::{NodeBehavior, NodeView};
use crate::port::PortDirectory;
use crate::serialization::{ByteBuffer, SerializationError};
use crate::value::{Kind, KindSet, Value};

const VARIABLES: [&str; 3] = ["x", "y", "z"];

/// Evaluates an expression over `x`, `y` and `z`
#[derive(Debug)]
pub struct FunctionNode {
    arity: u8,
    pending_arity: Option<u8>,
    source: String,
    pending_source: Option<String>,
    compiled: Option<CompiledExpression>,
    error: ErrorState,
}

impl Default for FunctionNode {
    fn default() -> Self {
        Self {
            arity: 1,
            pending_arity: None,
            source: "x".to_string(),
            pending_source: Some("x".to_string()),
            compiled: None,
            error: ErrorState::default(),
        }
    }
}

impl FunctionNode {
    /// Number of variables exposed as inputs
    pub fn arity(&self) -> u8 {
        self.arity
    }

    /// Expose 1, 2 or 3 variables as inputs. Takes effect on the next update.
    pub fn set_arity(&mut self, arity: u8) {
        self.pending_arity = Some(arity.clamp(1, 3));
    }

    /// Expression text
    pub fn expression(&self) -> &str {
        self.pending_source.as_deref().unwrap_or(&self.source)
    }

    /// Replace the expression. Compiled on the next update.
    pub fn set_expression(&mut self, source: impl Into<String>) {
        self.pending_source = Some(source.into());
    }
}

impl NodeBehavior for FunctionNode {
    fn update(&mut self, io: &mut NodeIo<'_>) {
        io.clear_output_dirty();

        if let Some(arity) = self.pending_arity.take() {
            self.arity = arity;
            io.set_inputs_ordered(&VARIABLES[..usize::from(arity)]);
        }

        if let Some(source) = self.pending_source.take() {
            match io.expressions().compile(&source) {
                Ok(compiled) => {
                    self.compiled = Some(compiled);
                    self.error.clear();
                }
                Err(error) => self.error.report(io.id(), error),
            }
            self.source = source;
        }

        let mut vars = [("x", 0.0), ("y", 0.0), ("z", 0.0)];
        for (name, value) in vars.iter_mut().take(usize::from(self.arity)) {
            io.ensure_input_type(*name, KindSet::from(Kind::Float));
            if let Some(input) = io.input_as::<f32>(*name) {
                *value = f64::from(input);
            }
        }

        let Some(compiled) = &self.compiled else {
            return;
        };
        match io.expressions().eval(compiled, &vars) {
            Ok(result) => {
                if self.compiled.as_ref().map(|c| c.source()) == Some(self.source.as_str()) {
                    self.error.clear();
                }
                io.publish(0, Value::Float(result as f32));
            }
            Err(error) => self.error.report(io.id(), error),
        }
    }

    fn render(&self, ports: &PortDirectory, view: &mut NodeView) {
        view.row("f", self.expression());
        if let Some(output) = ports.output(0) {
            view.row("result", output.value.value());
        }
        self.error.render(view);
    }

    fn serialize_extra(&self, buffer: &mut ByteBuffer) -> Result<(), SerializationError> {
        // The header carries the inputs of the applied arity
        buffer.add(&self.arity)?;
        buffer.add(&self.pending_arity)?;
        buffer.add(self.expression())
    }

    fn deserialize_extra(&mut self, buffer: &mut ByteBuffer) -> Result<(), SerializationError> {
        let check = |arity: u8| {
            if (1..=3).contains(&arity) {
                Ok(arity)
            } else {
                Err(SerializationError::Shape(format!("function arity {arity}")))
            }
        };
        self.arity = check(buffer.get()?)?;
        self.pending_arity = buffer.get::<Option<u8>>()?.map(check).transpose()?;
        self.pending_source = Some(buffer.get()?);
        self.compiled = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Graph;
    use crate::node::{NodeId, NodeType};
    use crate::nodes::{testing, NodeKind};

    fn function(graph: &mut Graph, id: NodeId) -> &mut FunctionNode {
        match graph.node_mut(id).map(|n| n.kind_mut()) {
            Some(NodeKind::Function(node)) => node,
            _ => panic!("not a function node"),
        }
    }

    #[test]
    fn test_default_expression_forwards_x() {
        let mut graph = Graph::default();
        let x = testing::source(&mut graph, Value::Float(2.5));
        let f = graph.create_node(NodeType::Function);
        graph.connect(x, 0, f, 0).unwrap();
        testing::frame(&mut graph);
        assert_eq!(testing::output(&graph, f, 0), Value::Float(2.5));
    }

    #[test]
    fn test_arity_resizes_inputs() {
        let mut graph = Graph::default();
        let x = testing::source(&mut graph, Value::Float(3.0));
        let y = testing::source(&mut graph, Value::Float(4.0));
        let f = graph.create_node(NodeType::Function);
        function(&mut graph, f).set_arity(2);
        function(&mut graph, f).set_expression("sqrt(x * x + y * y)");
        testing::frame(&mut graph);
        assert_eq!(graph.node(f).unwrap().ports().input_names(), vec!["x", "y"]);

        graph.connect(x, 0, f, 0).unwrap();
        graph.connect(y, 0, f, 1).unwrap();
        testing::frame(&mut graph);
        assert_eq!(testing::output(&graph, f, 0), Value::Float(5.0));

        function(&mut graph, f).set_arity(1);
        testing::frame(&mut graph);
        assert_eq!(graph.edges().len(), 1);
    }

    #[test]
    fn test_unconnected_variables_read_zero() {
        let mut graph = Graph::default();
        let f = graph.create_node(NodeType::Function);
        function(&mut graph, f).set_expression("x + 1.5");
        testing::frame(&mut graph);
        assert_eq!(testing::output(&graph, f, 0), Value::Float(1.5));
    }

    #[test]
    fn test_bad_expression_keeps_last_good_output() {
        let mut graph = Graph::default();
        let f = graph.create_node(NodeType::Function);
        function(&mut graph, f).set_expression("x + 2.0");
        testing::frame(&mut graph);

        function(&mut graph, f).set_expression("x +");
        testing::frame(&mut graph);
        assert_eq!(testing::output(&graph, f, 0), Value::Float(2.0));
        let view = graph.node(f).unwrap().view();
        assert_eq!(view.value_of("f"), Some("x +"));
        assert!(view.error.is_some());
    }

    #[test]
    fn test_pending_arity_and_expression_survive_save_and_load() {
        let mut graph = Graph::default();
        let f = graph.create_node(NodeType::Function);
        function(&mut graph, f).set_arity(2);
        function(&mut graph, f).set_expression("x - y");
        let bytes = graph.save_scene().unwrap();

        let mut loaded = Graph::default();
        loaded.load_scene(&bytes).unwrap();
        assert_eq!(loaded.node(f).unwrap().ports().input_names(), vec!["x"]);
        assert_eq!(function(&mut loaded, f).expression(), "x - y");

        let x = testing::source(&mut loaded, Value::Float(5.0));
        let y = testing::source(&mut loaded, Value::Float(2.0));
        testing::frame(&mut loaded);
        assert_eq!(loaded.node(f).unwrap().ports().input_names(), vec!["x", "y"]);
        assert_eq!(function(&mut loaded, f).arity(), 2);

        loaded.connect(x, 0, f, 0).unwrap();
        loaded.connect(y, 0, f, 1).unwrap();
        testing::frame(&mut loaded);
        testing::frame(&mut loaded);
        assert_eq!(testing::output(&loaded, f, 0), Value::Float(3.0));
    }

    #[test]
    fn test_invalid_saved_arity_is_rejected() {
        let mut block = ByteBuffer::new();
        block.add(&4u8).unwrap();
        block.add(&None::<u8>).unwrap();
        block.add("x").unwrap();
        let mut reader = ByteBuffer::from_bytes(block.into_bytes());
        let mut node = FunctionNode::default();
        assert!(matches!(
            node.deserialize_extra(&mut reader),
            Err(SerializationError::Shape(_))
        ));
    }
}
