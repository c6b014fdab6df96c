// SPDX-License-Identifier: MIT OR Apache-2.0
//! Camera node: orbit around a target or fly along a direction.

use super::read_enum;
use crate::evaluation::NodeIo;
use crate::node::{NodeBehavior, NodeView};
use crate::port::PortDirectory;
use crate::serialization::{ByteBuffer, SerializationError};
use crate::value::{Kind, KindSet, Value, Vector3};

const DEFAULT_POSITION: Vector3 = Vector3::new(0.0, 0.0, 5.0);
const DEFAULT_FORWARD: Vector3 = Vector3::new(0.0, 0.0, -1.0);

/// How the second input is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum CameraMode {
    /// Second input is the point looked at
    #[default]
    Orbit = 0,
    /// Second input is the view direction
    Free = 1,
}

impl CameraMode {
    fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Orbit),
            1 => Some(Self::Free),
            _ => None,
        }
    }

    fn inputs(self) -> [&'static str; 2] {
        match self {
            Self::Orbit => ["position", "lookAt"],
            Self::Free => ["position", "forward"],
        }
    }
}

/// Publishes a camera position and a unit forward vector
#[derive(Debug)]
pub struct CameraNode {
    mode: CameraMode,
    pending_mode: Option<CameraMode>,
    position: Vector3,
    forward: Vector3,
}

impl Default for CameraNode {
    fn default() -> Self {
        Self {
            mode: CameraMode::Orbit,
            pending_mode: None,
            position: DEFAULT_POSITION,
            forward: DEFAULT_FORWARD,
        }
    }
}

impl CameraNode {
    /// Current mode
    pub fn mode(&self) -> CameraMode {
        self.pending_mode.unwrap_or(self.mode)
    }

    /// Switch mode. Inputs are renamed on the next update.
    pub fn set_mode(&mut self, mode: CameraMode) {
        self.pending_mode = Some(mode);
    }

    /// Position used while `position` is unconnected
    pub fn set_position(&mut self, position: Vector3) {
        self.position = position;
    }

    /// Direction used while the second input is unconnected
    pub fn set_forward(&mut self, forward: Vector3) {
        self.forward = forward;
    }
}

fn unit_or_default(direction: Vector3) -> Vector3 {
    if direction.length() > f32::EPSILON {
        direction.normalized()
    } else {
        DEFAULT_FORWARD
    }
}

impl NodeBehavior for CameraNode {
    fn update(&mut self, io: &mut NodeIo<'_>) {
        io.clear_output_dirty();

        if let Some(mode) = self.pending_mode.take() {
            if mode != self.mode {
                self.mode = mode;
                io.set_inputs_ordered(&mode.inputs());
            }
        }

        let [position_input, second_input] = self.mode.inputs();
        io.ensure_input_type(position_input, KindSet::from(Kind::Vector3));
        io.ensure_input_type(second_input, KindSet::from(Kind::Vector3));

        let position = io.input_as::<Vector3>(position_input).unwrap_or(self.position);
        let forward = match (self.mode, io.input_as::<Vector3>(second_input)) {
            (CameraMode::Orbit, Some(target)) => target - position,
            (CameraMode::Free, Some(direction)) => direction,
            (_, None) => self.forward,
        };

        io.publish(0, Value::Vector3(position));
        io.publish(1, Value::Vector3(unit_or_default(forward)));
    }

    fn render(&self, ports: &PortDirectory, view: &mut NodeView) {
        view.row(
            "mode",
            match self.mode {
                CameraMode::Orbit => "orbit",
                CameraMode::Free => "free",
            },
        );
        for output in ports.outputs() {
            view.row(output.name.as_str(), output.value.value());
        }
    }

    fn serialize_extra(&self, buffer: &mut ByteBuffer) -> Result<(), SerializationError> {
        // The header carries the inputs of the applied mode
        buffer.add(&(self.mode as u8))?;
        buffer.add(&self.pending_mode.map(|m| m as u8))?;
        buffer.add(&self.position)?;
        buffer.add(&self.forward)
    }

    fn deserialize_extra(&mut self, buffer: &mut ByteBuffer) -> Result<(), SerializationError> {
        self.mode = read_enum(buffer, "camera mode", CameraMode::from_u8)?;
        self.pending_mode = match buffer.get::<Option<u8>>()? {
            Some(raw) => Some(
                CameraMode::from_u8(raw)
                    .ok_or_else(|| SerializationError::Shape(format!("unknown camera mode {raw}")))?,
            ),
            None => None,
        };
        self.position = buffer.get()?;
        self.forward = buffer.get()?;
        Ok(())
    }
}
