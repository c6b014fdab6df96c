// SPDX-License-Identifier: MIT OR Apache-2.0
//! Render sink. Runs last so it sees every producer's value from the
//! current frame.

use crate::evaluation::NodeIo;
use crate::node::{NodeBehavior, NodeView};
use crate::port::PortDirectory;
use crate::serialization::{ByteBuffer, SerializationError};
use crate::value::{Kind, KindSet, MeshData, RenderData, Value, Vector3, Vector4};

const WHITE: Vector4 = Vector4::new(1.0, 1.0, 1.0, 1.0);

/// Collects instancing inputs and fog settings into one [`RenderData`]
#[derive(Debug)]
pub struct RenderNode {
    fog_min: f32,
    fog_max: f32,
    fog_color: Vector3,
}

impl Default for RenderNode {
    fn default() -> Self {
        let defaults = RenderData::default();
        Self {
            fog_min: defaults.fog_min,
            fog_max: defaults.fog_max,
            fog_color: defaults.fog_color,
        }
    }
}

impl RenderNode {
    /// Set the fog range and color. `max` is raised to `min` if lower.
    pub fn set_fog(&mut self, min: f32, max: f32, color: Vector3) {
        self.fog_min = min;
        self.fog_max = max.max(min);
        self.fog_color = color;
    }
}

impl NodeBehavior for RenderNode {
    fn update(&mut self, io: &mut NodeIo<'_>) {
        io.clear_output_dirty();
        io.ensure_input_type("instanceCount", KindSet::from(Kind::UInt));
        io.ensure_input_type("worldPosition", KindSet::from(Kind::Vector3List));
        io.ensure_input_type("mesh", KindSet::from(Kind::Mesh));
        io.ensure_input_type("colors", KindSet::from(Kind::Vector4List));

        let data = RenderData {
            instance_count: io.input_as::<u32>("instanceCount").unwrap_or(1),
            positions: io.input_as::<Vec<Vector3>>("worldPosition").unwrap_or_default(),
            colors: io
                .input_as::<Vec<Vector4>>("colors")
                .unwrap_or_else(|| vec![WHITE]),
            mesh_vertex_count: io
                .input("mesh")
                .and_then(|v| v.get::<MeshData>().ok())
                .map_or(0, |m| m.vertex_count() as u32),
            fog_min: self.fog_min,
            fog_max: self.fog_max,
            fog_color: self.fog_color,
        };
        if io.publish(0, Value::Render(data)) {
            tracing::trace!(node = %io.id(), "Render parameters changed");
        }
    }

    fn render(&self, ports: &PortDirectory, view: &mut NodeView) {
        if let Some(Value::Render(data)) = ports.output(0).map(|o| o.value.value()) {
            view.row("instances", data.instance_count);
            view.row("positions", data.positions.len());
            view.row("colors", data.colors.len());
            view.row("mesh vertices", data.mesh_vertex_count);
        }
        view.row("fog", format!("{:.1}..{:.1} {}", self.fog_min, self.fog_max, self.fog_color));
    }

    fn serialize_extra(&self, buffer: &mut ByteBuffer) -> Result<(), SerializationError> {
        buffer.add(&self.fog_min)?;
        buffer.add(&self.fog_max)?;
        buffer.add(&self.fog_color)
    }

    fn deserialize_extra(&mut self, buffer: &mut ByteBuffer) -> Result<(), SerializationError> {
        self.fog_min = buffer.get()?;
        self.fog_max = buffer.get()?;
        self.fog_color = buffer.get()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Graph;
    use crate::node::NodeType;
    use crate::nodes::{testing, NodeKind};

    fn render_data(graph: &Graph, id: crate::node::NodeId) -> RenderData {
        match testing::output(graph, id, 0) {
            Value::Render(data) => data,
            other => panic!("expected render data, got {other}"),
        }
    }

    #[test]
    fn test_defaults_without_inputs() {
        let mut graph = Graph::default();
        let id = graph.create_node(NodeType::Render);
        testing::frame(&mut graph);
        let data = render_data(&graph, id);
        assert_eq!(data.instance_count, 1);
        assert!(data.positions.is_empty());
        assert_eq!(data.colors, vec![WHITE]);
        assert_eq!(data.fog_max, 50.0);
    }

    #[test]
    fn test_collects_connected_inputs() {
        let mut graph = Graph::default();
        let render = graph.create_node(NodeType::Render);
        let count = testing::source(&mut graph, Value::UInt(2));
        let positions = testing::source(
            &mut graph,
            Value::Vector3List(vec![Vector3::new(1.0, 0.0, 0.0), Vector3::new(2.0, 0.0, 0.0)]),
        );
        let mesh = testing::source(&mut graph, Value::Mesh(MeshData { vertices: vec![0.0; 18] }));
        graph.connect(count, 0, render, 0).unwrap();
        graph.connect(positions, 0, render, 1).unwrap();
        graph.connect(mesh, 0, render, 2).unwrap();
        if let Some(NodeKind::Render(node)) = graph.node_mut(render).map(|n| n.kind_mut()) {
            node.set_fog(5.0, 1.0, Vector3::new(0.0, 0.0, 0.0));
        }
        testing::frame(&mut graph);

        let data = render_data(&graph, render);
        assert_eq!(data.instance_count, 2);
        assert_eq!(data.positions.len(), 2);
        assert_eq!(data.mesh_vertex_count, 3);
        assert_eq!((data.fog_min, data.fog_max), (5.0, 5.0));
    }

    #[test]
    fn test_render_runs_after_producers_added_later() {
        let mut graph = Graph::default();
        let render = graph.create_node(NodeType::Render);
        let count = graph.create_node(NodeType::Value);
        if let Some(NodeKind::Value(node)) = graph.node_mut(count).map(|n| n.kind_mut()) {
            node.set_uint(7);
        }
        graph.connect(count, 0, render, 0).unwrap();
        testing::frame(&mut graph);
        assert_eq!(render_data(&graph, render).instance_count, 7);
    }
}
