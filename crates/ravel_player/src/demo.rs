// SPDX-License-Identifier: MIT OR Apache-2.0
//! Built-in demo scene: an animated row of instances.

use crate::error::PlayerError;
use ravel_graph::nodes::{ListElement, MathMode};
use ravel_graph::{Graph, NodeId, NodeKind, NodeType};

/// Instances in the demo row
pub const INSTANCES: u32 = 16;

fn configure(graph: &mut Graph, id: NodeId, apply: impl FnOnce(&mut NodeKind)) {
    if let Some(node) = graph.node_mut(id) {
        apply(node.kind_mut());
    }
}

/// Build the demo graph. `mesh` adds a Mesh node feeding the render sink.
pub fn build_demo(mesh: Option<&str>) -> Result<Graph, PlayerError> {
    let mut graph = Graph::new("demo");

    let time = graph.create_node(NodeType::Time);
    let count = graph.create_node(NodeType::Value);
    configure(&mut graph, count, |kind| {
        if let NodeKind::Value(node) = kind {
            node.set_uint(INSTANCES);
        }
    });

    let wave = graph.create_node(NodeType::Function);
    configure(&mut graph, wave, |kind| {
        if let NodeKind::Function(node) = kind {
            node.set_expression("sin(x * 2.0)");
        }
    });
    graph.connect_named(time, "time", wave, "x")?;

    let half = graph.create_node(NodeType::Value);
    configure(&mut graph, half, |kind| {
        if let NodeKind::Value(node) = kind {
            node.set_float(0.5);
        }
    });
    let scaled = graph.create_node(NodeType::Math);
    configure(&mut graph, scaled, |kind| {
        if let NodeKind::Math(node) = kind {
            node.set_mode(MathMode::Mul);
        }
    });
    graph.connect_named(wave, "result", scaled, "A")?;
    graph.connect_named(half, "value", scaled, "B")?;

    let positions = graph.create_node(NodeType::List);
    configure(&mut graph, positions, |kind| {
        if let NodeKind::List(node) = kind {
            node.set_element(ListElement::Vector3);
            node.set_extra_vars("t");
            node.set_expression(0, "i * 1.5");
            node.set_expression(1, "sin(i * 0.5 + t)");
            node.set_expression(2, "0.0");
        }
    });

    let colors = graph.create_node(NodeType::List);
    configure(&mut graph, colors, |kind| {
        if let NodeKind::List(node) = kind {
            node.set_element(ListElement::Vector4);
            node.set_expression(0, format!("i / {INSTANCES}.0"));
            node.set_expression(1, "0.5");
            node.set_expression(2, format!("1.0 - i / {INSTANCES}.0"));
            node.set_expression(3, "1.0");
        }
    });

    graph.create_node(NodeType::Camera);
    let display = graph.create_node(NodeType::Display);
    let previous = graph.create_node(NodeType::Feedback);
    let render = graph.create_node(NodeType::Render);

    graph.connect_named(count, "value", positions, "sizex")?;
    graph.connect_named(count, "value", colors, "sizex")?;
    graph.connect_named(count, "value", render, "instanceCount")?;
    graph.connect_named(positions, "list", render, "worldPosition")?;
    graph.connect_named(colors, "list", render, "colors")?;
    graph.connect_named(scaled, "result", display, "in")?;
    graph.connect_named(scaled, "result", previous, "in")?;

    if let Some(path) = mesh {
        let mesh_node = graph.create_node(NodeType::Mesh);
        configure(&mut graph, mesh_node, |kind| {
            if let NodeKind::Mesh(node) = kind {
                node.set_path(path);
            }
        });
        graph.connect_named(mesh_node, "mesh", render, "mesh")?;
    }

    // Extra-variable inputs appear after the first update
    graph.step(std::time::Duration::ZERO);
    graph.connect_named(time, "time", positions, "t")?;

    tracing::info!(nodes = graph.node_count(), edges = graph.edges().len(), "Demo graph built");
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ravel_graph::{RenderData, Value};
    use std::time::Duration;

    fn render_output(graph: &Graph) -> RenderData {
        let render = graph
            .nodes()
            .find(|n| n.node_type() == NodeType::Render)
            .unwrap();
        match render.output(0).unwrap().value.value() {
            Value::Render(data) => data.clone(),
            other => panic!("expected render data, got {other}"),
        }
    }

    #[test]
    fn test_demo_produces_render_data() {
        let mut graph = build_demo(None).unwrap();
        for _ in 0..3 {
            graph.step(Duration::from_millis(16));
        }
        let data = render_output(&graph);
        assert_eq!(data.instance_count, INSTANCES);
        assert_eq!(data.positions.len(), INSTANCES as usize);
        assert_eq!(data.colors.len(), INSTANCES as usize);
        assert!(graph.render_frame().iter().all(|v| v.error.is_none()));
    }

    #[test]
    fn test_demo_survives_save_and_load() {
        let graph = build_demo(None).unwrap();
        let bytes = graph.save_scene().unwrap();
        let mut loaded = Graph::new("demo");
        loaded.load_scene(&bytes).unwrap();
        assert_eq!(loaded.node_count(), graph.node_count());
        assert_eq!(loaded.edges().len(), graph.edges().len());

        for _ in 0..3 {
            loaded.step(Duration::from_millis(16));
        }
        assert_eq!(render_output(&loaded).positions.len(), INSTANCES as usize);
    }
}
