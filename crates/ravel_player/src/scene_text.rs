// SPDX-License-Identifier: MIT OR Apache-2.0
//! Scene files: the binary scene wrapped in standard base64 text.

use crate::error::PlayerError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use ravel_graph::Graph;
use std::path::Path;

/// Encode scene bytes as text
pub fn encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decode scene text, ignoring whitespace and line breaks
pub fn decode(text: &str) -> Result<Vec<u8>, PlayerError> {
    let compact: String = text.split_whitespace().collect();
    Ok(STANDARD.decode(compact)?)
}

/// Load a scene file into a new graph named after the file
pub fn read_scene(path: &Path) -> Result<Graph, PlayerError> {
    let text = std::fs::read_to_string(path).map_err(|e| PlayerError::io(path, e))?;
    let bytes = decode(&text)?;
    let name = path
        .file_stem()
        .map_or_else(|| "scene".to_string(), |s| s.to_string_lossy().into_owned());
    let mut graph = Graph::new(name);
    graph.load_scene(&bytes)?;
    Ok(graph)
}

/// Save a graph as a scene file
pub fn write_scene(path: &Path, graph: &Graph) -> Result<(), PlayerError> {
    let bytes = graph.save_scene()?;
    let mut text = encode(&bytes);
    text.push('\n');
    std::fs::write(path, text).map_err(|e| PlayerError::io(path, e))?;
    tracing::info!(path = %path.display(), bytes = bytes.len(), "Scene written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ravel_graph::NodeType;

    #[test]
    fn test_decode_ignores_line_breaks() {
        let text = encode(b"scene bytes");
        let (head, tail) = text.split_at(4);
        assert_eq!(decode(&format!("{head}\n  {tail}\n")).unwrap(), b"scene bytes");
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(decode("not*base64"), Err(PlayerError::SceneText(_))));
    }

    #[test]
    fn test_scene_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pair.ravel");
        let mut graph = Graph::default();
        let value = graph.create_node(NodeType::Value);
        let display = graph.create_node(NodeType::Display);
        graph.connect(value, 0, display, 0).unwrap();
        write_scene(&path, &graph).unwrap();

        let loaded = read_scene(&path).unwrap();
        assert_eq!(loaded.name, "pair");
        assert_eq!(loaded.node_count(), 2);
        assert_eq!(loaded.edges().len(), 1);
    }
}
