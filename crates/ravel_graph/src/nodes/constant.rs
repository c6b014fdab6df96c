// SPDX-License-Identifier: MIT OR Apache-2.0
//! Constant sources: scalar values, fixed arrays and colors.

use super::read_enum;
use crate::evaluation::NodeIo;
use crate::node::{NodeBehavior, NodeView};
use crate::port::PortDirectory;
use crate::serialization::{ByteBuffer, SerializationError};
use crate::value::{Value, Vector4};

/// Scalar kind published by a [`ValueNode`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum ScalarType {
    /// 32-bit float
    #[default]
    Float = 0,
    /// 32-bit signed integer
    Int = 1,
    /// 32-bit unsigned integer
    UInt = 2,
}

impl ScalarType {
    fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Float),
            1 => Some(Self::Int),
            2 => Some(Self::UInt),
            _ => None,
        }
    }

    fn of(value: &Value) -> Option<Self> {
        match value {
            Value::Float(_) => Some(Self::Float),
            Value::Int(_) => Some(Self::Int),
            Value::UInt(_) => Some(Self::UInt),
            _ => None,
        }
    }

    fn one(self) -> Value {
        match self {
            Self::Float => Value::Float(1.0),
            Self::Int => Value::Int(1),
            Self::UInt => Value::UInt(1),
        }
    }

    fn bits(value: &Value) -> Option<u32> {
        match value {
            Value::Float(f) => Some(f.to_bits()),
            Value::Int(i) => Some(u32::from_ne_bytes(i.to_ne_bytes())),
            Value::UInt(u) => Some(*u),
            _ => None,
        }
    }

    fn from_bits(self, bits: u32) -> Value {
        match self {
            Self::Float => Value::Float(f32::from_bits(bits)),
            Self::Int => Value::Int(i32::from_ne_bytes(bits.to_ne_bytes())),
            Self::UInt => Value::UInt(bits),
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Float => "float",
            Self::Int => "int",
            Self::UInt => "uint",
        }
    }
}

/// Publishes a user-set float, int or uint
#[derive(Debug, Default)]
pub struct ValueNode {
    scalar: ScalarType,
    pending: Option<Value>,
}

impl ValueNode {
    /// Selected scalar kind
    pub fn scalar_type(&self) -> ScalarType {
        self.scalar
    }

    /// Switch the published kind; the value resets to one
    pub fn set_type(&mut self, scalar: ScalarType) {
        if scalar != self.scalar {
            self.scalar = scalar;
            self.pending = Some(scalar.one());
        }
    }

    /// Publish a float
    pub fn set_float(&mut self, value: f32) {
        self.set_value(Value::Float(value));
    }

    /// Publish a signed integer
    pub fn set_int(&mut self, value: i32) {
        self.set_value(Value::Int(value));
    }

    /// Publish an unsigned integer
    pub fn set_uint(&mut self, value: u32) {
        self.set_value(Value::UInt(value));
    }

    /// Publish any scalar value. Non-scalars are refused.
    pub fn set_value(&mut self, value: Value) -> bool {
        let Some(scalar) = ScalarType::of(&value) else {
            tracing::warn!("Value node only holds float, int or uint; ignoring {}", value.kind());
            return false;
        };
        self.scalar = scalar;
        self.pending = Some(value);
        true
    }
}

impl NodeBehavior for ValueNode {
    fn initialize(&mut self, ports: &mut PortDirectory) {
        if let Some(output) = ports.output_mut(0) {
            output.value.set_value(self.scalar.one());
        }
    }

    fn update(&mut self, io: &mut NodeIo<'_>) {
        io.clear_output_dirty();
        if let Some(value) = self.pending.take() {
            io.publish(0, value);
        }
    }

    fn render(&self, ports: &PortDirectory, view: &mut NodeView) {
        view.row("type", self.scalar.label());
        if let Some(output) = ports.output(0) {
            view.row("value", output.value.value());
        }
    }

    fn serialize_extra(&self, buffer: &mut ByteBuffer) -> Result<(), SerializationError> {
        buffer.add(&(self.scalar as u8))?;
        buffer.add(&self.pending.as_ref().and_then(ScalarType::bits))
    }

    fn deserialize_extra(&mut self, buffer: &mut ByteBuffer) -> Result<(), SerializationError> {
        self.scalar = read_enum(buffer, "scalar type", ScalarType::from_u8)?;
        self.pending = buffer.get::<Option<u32>>()?.map(|bits| self.scalar.from_bits(bits));
        Ok(())
    }
}

/// Publishes four floats as a fixed-size array
#[derive(Debug, Default)]
pub struct VectorNode {
    pending: Option<[f32; 4]>,
}

impl VectorNode {
    /// Replace the four components
    pub fn set_components(&mut self, components: [f32; 4]) {
        self.pending = Some(components);
    }
}

impl NodeBehavior for VectorNode {
    fn initialize(&mut self, ports: &mut PortDirectory) {
        if let Some(output) = ports.output_mut(0) {
            output.value.set_array(&[0.0; 4]);
        }
    }

    fn update(&mut self, io: &mut NodeIo<'_>) {
        io.clear_output_dirty();
        let Some(components) = self.pending.take() else {
            return;
        };
        if let Some(output) = io.output_mut(0) {
            output.set_array(&components);
        }
    }

    fn render(&self, ports: &PortDirectory, view: &mut NodeView) {
        if let Some(values) = ports.output(0).and_then(|o| o.value.get_array().ok()) {
            for (label, value) in ["x", "y", "z", "w"].iter().zip(values) {
                view.row(*label, format!("{value:.3}"));
            }
        }
    }

    fn serialize_extra(&self, buffer: &mut ByteBuffer) -> Result<(), SerializationError> {
        buffer.add(&self.pending)
    }

    fn deserialize_extra(&mut self, buffer: &mut ByteBuffer) -> Result<(), SerializationError> {
        self.pending = buffer.get()?;
        Ok(())
    }
}

/// Publishes an RGBA color
#[derive(Debug, Default)]
pub struct ColorNode {
    pending: Option<Vector4>,
}

impl ColorNode {
    /// Replace the color
    pub fn set_color(&mut self, color: Vector4) {
        self.pending = Some(color);
    }
}

impl NodeBehavior for ColorNode {
    fn initialize(&mut self, ports: &mut PortDirectory) {
        if let Some(output) = ports.output_mut(0) {
            output.value.set(Vector4::new(1.0, 1.0, 1.0, 1.0));
        }
    }

    fn update(&mut self, io: &mut NodeIo<'_>) {
        io.clear_output_dirty();
        if let Some(color) = self.pending.take() {
            io.publish(0, Value::Vector4(color));
        }
    }

    fn render(&self, ports: &PortDirectory, view: &mut NodeView) {
        if let Some(output) = ports.output(0) {
            view.row("rgba", output.value.value());
        }
    }

    fn serialize_extra(&self, buffer: &mut ByteBuffer) -> Result<(), SerializationError> {
        buffer.add(&self.pending)
    }

    fn deserialize_extra(&mut self, buffer: &mut ByteBuffer) -> Result<(), SerializationError> {
        self.pending = buffer.get()?;
        Ok(())
    }
}
