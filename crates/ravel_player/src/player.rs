// SPDX-License-Identifier: MIT OR Apache-2.0
//! Frame loop and scene inspection.

use crate::config::PlayerConfig;
use crate::error::PlayerError;
use ravel_graph::{Graph, Kind, NodeId, NodeType, NodeView, Priority};
use serde::Serialize;
use std::io::Write;

/// Run `config.frames` fixed steps, printing node views to `out`
pub fn run(graph: &mut Graph, config: &PlayerConfig, out: &mut impl Write) -> Result<(), PlayerError> {
    if let Some(root) = &config.assets_dir {
        graph.context_mut().set_assets_root(Some(root.clone()));
    }
    let dt = config.frame_dt();
    tracing::info!(
        graph = %graph.name,
        frames = config.frames,
        dt_ms = config.frame_dt_ms,
        "Running"
    );

    for frame in 1..=config.frames {
        graph.step(dt);
        if config.print_every > 0 && frame % config.print_every == 0 && frame != config.frames {
            print_views(out, frame, &graph.render_frame())?;
        }
    }
    print_views(out, config.frames, &graph.render_frame())
}

fn print_views(out: &mut impl Write, frame: u64, views: &[NodeView]) -> Result<(), PlayerError> {
    let stdout = |e| PlayerError::io("<stdout>", e);
    writeln!(out, "== frame {frame} ==").map_err(stdout)?;
    for view in views {
        write!(out, "{view}").map_err(stdout)?;
    }
    Ok(())
}

/// JSON-friendly description of a scene
#[derive(Debug, Serialize)]
pub struct SceneSummary {
    /// Graph name
    pub name: String,
    /// Nodes in evaluation order
    pub nodes: Vec<NodeSummary>,
    /// Edges
    pub edges: Vec<EdgeSummary>,
}

/// One node of a [`SceneSummary`]
#[derive(Debug, Serialize)]
pub struct NodeSummary {
    /// Node id
    pub id: NodeId,
    /// Display name
    pub name: String,
    /// Variant
    pub node_type: NodeType,
    /// Evaluation class
    pub priority: Priority,
    /// Input names
    pub inputs: Vec<String>,
    /// Output names with the kind they hold
    pub outputs: Vec<(String, Kind)>,
    /// Current view
    pub view: NodeView,
}

/// One edge of a [`SceneSummary`]
#[derive(Debug, Serialize)]
pub struct EdgeSummary {
    /// Producer node
    pub producer: NodeId,
    /// Producer output name
    pub output: String,
    /// Consumer node
    pub consumer: NodeId,
    /// Consumer input name
    pub input: String,
}

impl SceneSummary {
    /// Describe `graph` as it is now
    pub fn of(graph: &Graph) -> Self {
        let nodes = graph
            .nodes()
            .map(|node| NodeSummary {
                id: node.id,
                name: node.name.clone(),
                node_type: node.node_type(),
                priority: node.priority,
                inputs: node.ports().input_names(),
                outputs: node
                    .ports()
                    .outputs()
                    .iter()
                    .map(|o| (o.name.clone(), o.value.kind()))
                    .collect(),
                view: node.view(),
            })
            .collect();

        let port_name = |id: NodeId, index: u8, output: bool| -> String {
            let ports = graph.node(id).map(|n| n.ports());
            let name = if output {
                ports.and_then(|p| p.output(usize::from(index))).map(|o| o.name.clone())
            } else {
                ports.and_then(|p| p.input(usize::from(index))).map(|i| i.name.clone())
            };
            name.unwrap_or_else(|| index.to_string())
        };
        let edges = graph
            .edges()
            .iter()
            .map(|edge| EdgeSummary {
                producer: edge.producer(),
                output: port_name(edge.producer(), edge.address.producer_output, true),
                consumer: edge.consumer,
                input: port_name(edge.consumer, edge.address.consumer_input, false),
            })
            .collect();

        Self {
            name: graph.name.clone(),
            nodes,
            edges,
        }
    }

    /// Write as JSON
    pub fn write_json(&self, out: &mut impl Write, pretty: bool) -> Result<(), PlayerError> {
        if pretty {
            serde_json::to_writer_pretty(&mut *out, self)?;
        } else {
            serde_json::to_writer(&mut *out, self)?;
        }
        writeln!(out).map_err(|e| PlayerError::io("<stdout>", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demo::build_demo;

    #[test]
    fn test_run_prints_periodic_and_final_views() {
        let mut graph = build_demo(None).unwrap();
        let config = PlayerConfig {
            frames: 4,
            print_every: 2,
            ..PlayerConfig::default()
        };
        let mut out = Vec::new();
        run(&mut graph, &config, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("== frame 2 =="));
        assert!(text.contains("== frame 4 =="));
        assert_eq!(text.matches("== frame").count(), 2);
        assert!(text.contains("Render Node #0"));
    }

    #[test]
    fn test_summary_names_ports() {
        let mut graph = Graph::new("pair");
        let value = graph.create_node(NodeType::Value);
        let math = graph.create_node(NodeType::Math);
        graph.connect(value, 0, math, 1).unwrap();

        let mut out = Vec::new();
        SceneSummary::of(&graph).write_json(&mut out, false).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(json["name"], "pair");
        assert_eq!(json["nodes"].as_array().unwrap().len(), 2);
        assert_eq!(json["edges"][0]["output"], "value");
        assert_eq!(json["edges"][0]["input"], "B");
        assert_eq!(json["nodes"][0]["outputs"][0][1], "Float");
    }
}
