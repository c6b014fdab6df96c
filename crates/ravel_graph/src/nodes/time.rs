// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph clock source.

use crate::evaluation::NodeIo;
use crate::node::{NodeBehavior, NodeView};
use crate::port::PortDirectory;
use crate::value::Value;

/// Publishes seconds since the graph clock started, rounded up to 1/100 s
#[derive(Debug, Default)]
pub struct TimeNode;

impl NodeBehavior for TimeNode {
    fn update(&mut self, io: &mut NodeIo<'_>) {
        io.clear_output_dirty();
        let seconds = (io.elapsed().as_secs_f64() * 100.0).ceil() / 100.0;
        io.publish(0, Value::Float(seconds as f32));
    }

    fn render(&self, ports: &PortDirectory, view: &mut NodeView) {
        if let Some(Value::Float(seconds)) = ports.output(0).map(|o| o.value.value()) {
            view.row("time", format!("{seconds:.2} s"));
        }
    }
}
