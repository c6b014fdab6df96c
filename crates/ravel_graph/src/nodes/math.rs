// SPDX-License-Identifier: MIT OR Apache-2.0
//! Binary arithmetic over scalars and vectors.

use super::read_enum;
use crate::evaluation::{ErrorState, EvaluationError, NodeIo};
use crate::node::{NodeBehavior, NodeView};
use crate::port::PortDirectory;
use crate::serialization::{ByteBuffer, SerializationError};
use crate::value::{KindSet, TypedValue, Value};

/// Operation applied by a [`MathNode`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum MathMode {
    /// A + B
    #[default]
    Add = 0,
    /// A - B
    Sub = 1,
    /// A * B
    Mul = 2,
    /// A / B
    Div = 3,
}

impl MathMode {
    fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Add),
            1 => Some(Self::Sub),
            2 => Some(Self::Mul),
            3 => Some(Self::Div),
            _ => None,
        }
    }

    /// Operator label
    pub fn label(self) -> &'static str {
        match self {
            Self::Add => "A+B",
            Self::Sub => "A-B",
            Self::Mul => "A*B",
            Self::Div => "A/B",
        }
    }

    fn float(self, a: f32, b: f32) -> f32 {
        match self {
            Self::Add => a + b,
            Self::Sub => a - b,
            Self::Mul => a * b,
            Self::Div => a / b,
        }
    }

    fn int(self, a: i32, b: i32) -> Result<i32, EvaluationError> {
        match self {
            Self::Add => Ok(a.wrapping_add(b)),
            Self::Sub => Ok(a.wrapping_sub(b)),
            Self::Mul => Ok(a.wrapping_mul(b)),
            Self::Div => a.checked_div(b).ok_or_else(division_by_zero),
        }
    }

    fn uint(self, a: u32, b: u32) -> Result<u32, EvaluationError> {
        match self {
            Self::Add => Ok(a.wrapping_add(b)),
            Self::Sub => Ok(a.wrapping_sub(b)),
            Self::Mul => Ok(a.wrapping_mul(b)),
            Self::Div => a.checked_div(b).ok_or_else(division_by_zero),
        }
    }
}

fn division_by_zero() -> EvaluationError {
    EvaluationError::Expression("integer division by zero".to_string())
}

/// Combines inputs `A` and `B`
#[derive(Debug, Default)]
pub struct MathNode {
    mode: MathMode,
    error: ErrorState,
}

impl MathNode {
    /// Current operation
    pub fn mode(&self) -> MathMode {
        self.mode
    }

    /// Change the operation
    pub fn set_mode(&mut self, mode: MathMode) {
        self.mode = mode;
    }

    fn apply(&self, a: &Value, b: &Value) -> Result<Value, EvaluationError> {
        let m = self.mode;
        let f = |x: f32, y: f32| m.float(x, y);
        Ok(match (a, b) {
            (Value::Float(x), Value::Float(y)) => Value::Float(f(*x, *y)),
            (Value::Int(x), Value::Int(y)) => Value::Int(m.int(*x, *y)?),
            (Value::UInt(x), Value::UInt(y)) => Value::UInt(m.uint(*x, *y)?),
            (Value::Vector2(x), Value::Vector2(y)) => Value::Vector2(x.zip_with(*y, f)),
            (Value::Vector3(x), Value::Vector3(y)) => Value::Vector3(x.zip_with(*y, f)),
            (Value::Vector4(x), Value::Vector4(y)) => Value::Vector4(x.zip_with(*y, f)),
            (Value::Float(s), Value::Vector2(v)) => Value::Vector2(v.map(|c| f(*s, c))),
            (Value::Float(s), Value::Vector3(v)) => Value::Vector3(v.map(|c| f(*s, c))),
            (Value::Float(s), Value::Vector4(v)) => Value::Vector4(v.map(|c| f(*s, c))),
            (Value::Vector2(v), Value::Float(s)) => Value::Vector2(v.map(|c| f(c, *s))),
            (Value::Vector3(v), Value::Float(s)) => Value::Vector3(v.map(|c| f(c, *s))),
            (Value::Vector4(v), Value::Float(s)) => Value::Vector4(v.map(|c| f(c, *s))),
            _ => {
                return Err(EvaluationError::TypeMismatch {
                    input: "B".to_string(),
                    required: a.kind().into(),
                    supplied: b.kind(),
                })
            }
        })
    }
}

impl NodeBehavior for MathNode {
    fn update(&mut self, io: &mut NodeIo<'_>) {
        io.clear_output_dirty();
        io.ensure_input_type("A", KindSet::NUMERIC);
        io.ensure_input_type("B", KindSet::NUMERIC);

        let a = io.input("A").map(TypedValue::value);
        let b = io.input("B").map(TypedValue::value);
        let result = match (a, b) {
            (Some(a), Some(b)) => self.apply(a, b),
            (Some(single), None) | (None, Some(single)) => Ok(single.clone()),
            (None, None) => Err(EvaluationError::MissingInput("A".to_string())),
        };

        match result {
            Ok(value) => {
                self.error.clear();
                io.publish(0, value);
            }
            Err(error) => self.error.report(io.id(), error),
        }
    }

    fn render(&self, ports: &PortDirectory, view: &mut NodeView) {
        view.row("mode", self.mode.label());
        if let Some(output) = ports.output(0) {
            view.row("result", output.value.value());
        }
        self.error.render(view);
    }

    fn serialize_extra(&self, buffer: &mut ByteBuffer) -> Result<(), SerializationError> {
        buffer.add(&(self.mode as u8))
    }

    fn deserialize_extra(&mut self, buffer: &mut ByteBuffer) -> Result<(), SerializationError> {
        self.mode = read_enum(buffer, "math mode", MathMode::from_u8)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Graph;
    use crate::node::{NodeId, NodeType};
    use crate::nodes::{testing, NodeKind};
    use crate::value::{Vector3, Vector4};

    fn math_graph(a: Value, b: Value, mode: MathMode) -> (Graph, NodeId) {
        let mut graph = Graph::default();
        let a = testing::source(&mut graph, a);
        let b = testing::source(&mut graph, b);
        let math = graph.create_node(NodeType::Math);
        if let Some(NodeKind::Math(node)) = graph.node_mut(math).map(|n| n.kind_mut()) {
            node.set_mode(mode);
        }
        graph.connect(a, 0, math, 0).unwrap();
        graph.connect(b, 0, math, 1).unwrap();
        testing::frame(&mut graph);
        (graph, math)
    }

    #[test]
    fn test_vector_ops_are_component_wise() {
        let (graph, math) = math_graph(
            Value::Vector3(Vector3::new(1.0, 2.0, 3.0)),
            Value::Vector3(Vector3::new(4.0, 5.0, 6.0)),
            MathMode::Mul,
        );
        assert_eq!(
            testing::output(&graph, math, 0),
            Value::Vector3(Vector3::new(4.0, 10.0, 18.0))
        );
    }

    #[test]
    fn test_scalar_broadcasts_over_vector() {
        let (graph, math) = math_graph(
            Value::Vector4(Vector4::new(2.0, 4.0, 6.0, 8.0)),
            Value::Float(2.0),
            MathMode::Div,
        );
        assert_eq!(
            testing::output(&graph, math, 0),
            Value::Vector4(Vector4::new(1.0, 2.0, 3.0, 4.0))
        );

        let (graph, math) = math_graph(
            Value::Float(1.0),
            Value::Vector4(Vector4::new(2.0, 4.0, 6.0, 8.0)),
            MathMode::Sub,
        );
        assert_eq!(
            testing::output(&graph, math, 0),
            Value::Vector4(Vector4::new(-1.0, -3.0, -5.0, -7.0))
        );
    }

    #[test]
    fn test_int_and_float_do_not_mix() {
        let (graph, math) = math_graph(Value::Int(2), Value::Float(1.0), MathMode::Add);
        assert_eq!(testing::output(&graph, math, 0), Value::Empty);
        let view = graph.node(math).unwrap().view();
        assert!(view.error.unwrap().contains("requires int"));
    }

    #[test]
    fn test_integer_division_by_zero_keeps_last_output() {
        let (graph, math) = math_graph(Value::UInt(7), Value::UInt(0), MathMode::Div);
        assert_eq!(testing::output(&graph, math, 0), Value::Empty);
        assert!(graph.node(math).unwrap().view().error.is_some());
    }

    #[test]
    fn test_single_input_passes_through() {
        let mut graph = Graph::default();
        let a = testing::source(&mut graph, Value::Int(5));
        let math = graph.create_node(NodeType::Math);
        graph.connect(a, 0, math, 1).unwrap();
        testing::frame(&mut graph);
        assert_eq!(testing::output(&graph, math, 0), Value::Int(5));
    }

    #[test]
    fn test_list_input_is_detached() {
        let mut graph = Graph::default();
        let list = testing::source(&mut graph, Value::FloatList(vec![1.0]));
        let math = graph.create_node(NodeType::Math);
        graph.connect(list, 0, math, 0).unwrap();
        testing::frame(&mut graph);
        assert!(!graph.node(math).unwrap().input(0).unwrap().is_connected());
        assert!(graph.edges().is_empty());
    }
}
