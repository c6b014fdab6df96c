// SPDX-License-Identifier: MIT OR Apache-2.0
//! Port definitions for node inputs/outputs.

use crate::connection::EdgeAddress;
use crate::value::{KindSet, TypedValue};
use serde::{Deserialize, Serialize};

/// Approximate label glyph width used for port padding
const GLYPH_WIDTH: f32 = 7.0;
/// Space reserved around the widest label
const LABEL_MARGIN: f32 = 20.0;

/// Port direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortDirection {
    /// Input port
    Input,
    /// Output port
    Output,
}

impl std::fmt::Display for PortDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Input => f.write_str("input"),
            Self::Output => f.write_str("output"),
        }
    }
}

/// A named input slot. Holds no value, only the address of its source.
#[derive(Debug, Clone, PartialEq)]
pub struct InputPort {
    /// Port name, unique within the node
    pub name: String,
    accepted: KindSet,
    source: Option<EdgeAddress>,
}

impl InputPort {
    /// Create an unconnected input
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            accepted: KindSet::NONE,
            source: None,
        }
    }

    /// Kinds last declared acceptable by the owning node
    pub fn accepted(&self) -> KindSet {
        self.accepted
    }

    /// Record the kinds the owning node accepts
    pub fn set_accepted(&mut self, kinds: KindSet) {
        self.accepted = kinds;
    }

    /// Address of the producer feeding this input
    pub fn source(&self) -> Option<EdgeAddress> {
        self.source
    }

    /// Whether an edge is attached
    pub fn is_connected(&self) -> bool {
        self.source.is_some()
    }

    pub(crate) fn attach(&mut self, address: EdgeAddress) -> Option<EdgeAddress> {
        self.source.replace(address)
    }

    pub(crate) fn detach(&mut self) -> Option<EdgeAddress> {
        self.source.take()
    }
}

/// A named output slot owning the value it publishes
#[derive(Debug, Clone, PartialEq)]
pub struct OutputPort {
    /// Port name, unique within the node
    pub name: String,
    /// Published value
    pub value: TypedValue,
}

impl OutputPort {
    /// Create an output holding an empty value
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: TypedValue::default(),
        }
    }
}

/// Ordered input and output ports of a node, addressable by index or name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PortDirectory {
    inputs: Vec<InputPort>,
    outputs: Vec<OutputPort>,
    input_padding: f32,
    output_padding: f32,
}

impl PortDirectory {
    /// Create a directory with the given port names
    pub fn new(inputs: &[&str], outputs: &[&str]) -> Self {
        let mut ports = Self {
            inputs: inputs.iter().map(|name| InputPort::new(*name)).collect(),
            outputs: outputs.iter().map(|name| OutputPort::new(*name)).collect(),
            input_padding: 0.0,
            output_padding: 0.0,
        };
        ports.update_padding();
        ports
    }

    /// All inputs in index order
    pub fn inputs(&self) -> &[InputPort] {
        &self.inputs
    }

    /// All outputs in index order
    pub fn outputs(&self) -> &[OutputPort] {
        &self.outputs
    }

    /// Number of inputs
    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    /// Number of outputs
    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }

    /// Input at `index`
    pub fn input(&self, index: usize) -> Option<&InputPort> {
        self.inputs.get(index)
    }

    /// Mutable input at `index`
    pub fn input_mut(&mut self, index: usize) -> Option<&mut InputPort> {
        self.inputs.get_mut(index)
    }

    /// Index of the input called `name`
    pub fn input_index(&self, name: &str) -> Option<usize> {
        self.inputs.iter().position(|p| p.name == name)
    }

    /// Input called `name`
    pub fn input_named(&self, name: &str) -> Option<&InputPort> {
        self.inputs.iter().find(|p| p.name == name)
    }

    /// Output at `index`
    pub fn output(&self, index: usize) -> Option<&OutputPort> {
        self.outputs.get(index)
    }

    /// Mutable output at `index`
    pub fn output_mut(&mut self, index: usize) -> Option<&mut OutputPort> {
        self.outputs.get_mut(index)
    }

    /// Index of the output called `name`
    pub fn output_index(&self, name: &str) -> Option<usize> {
        self.outputs.iter().position(|p| p.name == name)
    }

    /// Output called `name`
    pub fn output_named(&self, name: &str) -> Option<&OutputPort> {
        self.outputs.iter().find(|p| p.name == name)
    }

    /// Input names in index order
    pub fn input_names(&self) -> Vec<String> {
        self.inputs.iter().map(|p| p.name.clone()).collect()
    }

    /// Reset the change flag of every output
    pub fn clear_output_dirty(&mut self) {
        for output in &mut self.outputs {
            output.value.clear_dirty();
        }
    }

    /// Label padding on the input side
    pub fn input_padding(&self) -> f32 {
        self.input_padding
    }

    /// Label padding on the output side
    pub fn output_padding(&self) -> f32 {
        self.output_padding
    }

    pub(crate) fn set_padding(&mut self, input: f32, output: f32) {
        self.input_padding = input;
        self.output_padding = output;
    }

    /// Replace the input list with `names`.
    ///
    /// A port keeps its source only when the same name sits at the same
    /// index afterwards. Every other attached source is detached and
    /// returned together with the name it was attached under.
    pub fn set_inputs_ordered<S: AsRef<str>>(&mut self, names: &[S]) -> Vec<(String, EdgeAddress)> {
        let mut previous = std::mem::take(&mut self.inputs).into_iter();
        let mut dropped = Vec::new();
        for name in names {
            let name = name.as_ref();
            match previous.next() {
                Some(port) if port.name == name => self.inputs.push(port),
                Some(mut port) => {
                    if let Some(address) = port.detach() {
                        dropped.push((port.name, address));
                    }
                    self.inputs.push(InputPort::new(name));
                }
                None => self.inputs.push(InputPort::new(name)),
            }
        }
        for mut port in previous {
            if let Some(address) = port.detach() {
                dropped.push((port.name, address));
            }
        }
        self.update_padding();
        dropped
    }

    fn update_padding(&mut self) {
        fn width<'a>(names: impl Iterator<Item = &'a str>) -> f32 {
            names
                .map(|n| n.chars().count() as f32 * GLYPH_WIDTH + LABEL_MARGIN)
                .fold(0.0, f32::max)
        }
        self.input_padding = width(self.inputs.iter().map(|p| p.name.as_str()));
        self.output_padding = width(self.outputs.iter().map(|p| p.name.as_str()));
    }
}
