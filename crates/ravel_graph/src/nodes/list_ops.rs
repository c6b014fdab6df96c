// SPDX-License-Identifier: MIT OR Apache-2.0
//! Element access and concatenation of lists.

use crate::evaluation::{ErrorState, EvaluationError, NodeIo};
use crate::node::{NodeBehavior, NodeView, ProducerInfo};
use crate::port::PortDirectory;
use crate::serialization::{ByteBuffer, SerializationError};
use crate::value::{Kind, KindSet, TypedValue, Value};

const INDEX_KINDS: KindSet = KindSet::of(&[Kind::UInt, Kind::Int]);

fn element_at(list: &Value, index: usize) -> Option<Value> {
    Some(match list {
        Value::FloatList(items) => Value::Float(*items.get(index)?),
        Value::IntList(items) => Value::Int(*items.get(index)?),
        Value::UIntList(items) => Value::UInt(*items.get(index)?),
        Value::Vector2List(items) => Value::Vector2(*items.get(index)?),
        Value::Vector3List(items) => Value::Vector3(*items.get(index)?),
        Value::Vector4List(items) => Value::Vector4(*items.get(index)?),
        _ => return None,
    })
}

fn concat(a: &Value, b: &Value) -> Option<Value> {
    fn join<T: Clone>(a: &[T], b: &[T]) -> Vec<T> {
        let mut joined = Vec::with_capacity(a.len() + b.len());
        joined.extend_from_slice(a);
        joined.extend_from_slice(b);
        joined
    }

    Some(match (a, b) {
        (Value::FloatList(a), Value::FloatList(b)) => Value::FloatList(join(a, b)),
        (Value::IntList(a), Value::IntList(b)) => Value::IntList(join(a, b)),
        (Value::UIntList(a), Value::UIntList(b)) => Value::UIntList(join(a, b)),
        (Value::Vector2List(a), Value::Vector2List(b)) => Value::Vector2List(join(a, b)),
        (Value::Vector3List(a), Value::Vector3List(b)) => Value::Vector3List(join(a, b)),
        (Value::Vector4List(a), Value::Vector4List(b)) => Value::Vector4List(join(a, b)),
        _ => return None,
    })
}

/// Picks one element out of a list
#[derive(Debug, Default)]
pub struct ListAccessNode {
    index: i32,
    error: ErrorState,
}

impl ListAccessNode {
    /// Index used while the `index` input is unconnected
    pub fn index(&self) -> i32 {
        self.index
    }

    /// Set the index used while the `index` input is unconnected
    pub fn set_index(&mut self, index: i32) {
        self.index = index;
    }
}

impl NodeBehavior for ListAccessNode {
    fn update(&mut self, io: &mut NodeIo<'_>) {
        io.clear_output_dirty();
        io.ensure_input_type("index", INDEX_KINDS);
        io.ensure_input_type("list", KindSet::LISTS);

        let requested = match io.input("index").map(TypedValue::value) {
            Some(Value::Int(i)) => i64::from(*i),
            Some(Value::UInt(u)) => i64::from(*u),
            _ => i64::from(self.index),
        };

        let Some(list) = io.input("list").map(TypedValue::value) else {
            self.error
                .report(io.id(), EvaluationError::MissingInput("list".to_string()));
            return;
        };
        let len = list.list_len().unwrap_or(0);
        if len == 0 {
            self.error
                .report(io.id(), EvaluationError::MissingInput("list".to_string()));
            return;
        }

        let index = usize::try_from(requested.max(0)).unwrap_or(usize::MAX).min(len - 1);
        if let Some(element) = element_at(list, index) {
            self.error.clear();
            io.publish(0, element);
        }
    }

    fn render(&self, ports: &PortDirectory, view: &mut NodeView) {
        if !ports.input_named("index").is_some_and(|p| p.is_connected()) {
            view.row("index", self.index);
        }
        if let Some(output) = ports.output(0) {
            view.row("element", output.value.value());
        }
        self.error.render(view);
    }

    fn serialize_extra(&self, buffer: &mut ByteBuffer) -> Result<(), SerializationError> {
        buffer.add(&self.index)
    }

    fn deserialize_extra(&mut self, buffer: &mut ByteBuffer) -> Result<(), SerializationError> {
        self.index = buffer.get()?;
        Ok(())
    }
}

/// Concatenates two lists of the same kind
#[derive(Debug, Default)]
pub struct ListJoinNode {
    refresh: bool,
    error: ErrorState,
}

impl NodeBehavior for ListJoinNode {
    fn update(&mut self, io: &mut NodeIo<'_>) {
        io.clear_output_dirty();
        let detached_a = io.ensure_input_type("List A", KindSet::LISTS);
        let detached_b = io.ensure_input_type("List B", KindSet::LISTS);

        let a = io.input("List A");
        let b = io.input("List B");
        let changed = a.is_some_and(TypedValue::is_dirty) || b.is_some_and(TypedValue::is_dirty);
        if !(changed || self.refresh || detached_a || detached_b) {
            return;
        }
        self.refresh = false;

        let joined = match (a.map(TypedValue::value), b.map(TypedValue::value)) {
            (Some(a), Some(b)) => concat(a, b).ok_or_else(|| EvaluationError::TypeMismatch {
                input: "List B".to_string(),
                required: a.kind().into(),
                supplied: b.kind(),
            }),
            (Some(single), None) | (None, Some(single)) => Ok(single.clone()),
            (None, None) => Ok(Value::Empty),
        };

        match joined {
            Ok(list) => {
                self.error.clear();
                io.publish(0, list);
            }
            Err(error) => self.error.report(io.id(), error),
        }
    }

    fn render(&self, ports: &PortDirectory, view: &mut NodeView) {
        if let Some(output) = ports.output(0) {
            view.row("length", output.value.list_len().unwrap_or(0));
        }
        self.error.render(view);
    }

    fn on_connection(&mut self, _input: &str, _producer: &ProducerInfo) {
        self.refresh = true;
    }

    fn on_disconnect(&mut self, _input: &str) {
        self.refresh = true;
    }
}
