// SPDX-License-Identifier: MIT OR Apache-2.0
//! Background resource loading.
//!
//! Loads run on a dedicated worker thread and hand their result back through
//! a oneshot channel that the owning node polls once per frame. A load that
//! is no longer wanted is simply dropped; the worker finishes and its result
//! is discarded.

use crate::value::{MeshData, Vector3};
use std::path::{Path, PathBuf};
use tokio::sync::oneshot;

/// Errors that can occur while loading a resource
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ResourceLoadError {
    /// File not found
    #[error("File not found: {0}")]
    NotFound(String),
    /// IO error
    #[error("IO error: {0}")]
    Io(String),
    /// Content could not be decoded
    #[error("Failed to decode {path}: {message}")]
    Decode {
        /// Offending file
        path: String,
        /// What went wrong
        message: String,
    },
    /// Worker went away without reporting
    #[error("Background load ended without a result")]
    Abandoned,
}

/// Progress of a background load
#[derive(Debug)]
pub enum LoadPoll<T> {
    /// Still running
    Pending,
    /// Finished
    Ready(T),
    /// Worker exited without sending
    Failed(ResourceLoadError),
}

/// A value being produced on a worker thread
#[derive(Debug)]
pub struct BackgroundLoad<T> {
    label: String,
    result_rx: oneshot::Receiver<T>,
}

impl<T: Send + 'static> BackgroundLoad<T> {
    /// Run `job` on a new worker thread
    pub fn spawn<F>(label: impl Into<String>, job: F) -> Result<Self, ResourceLoadError>
    where
        F: FnOnce() -> T + Send + 'static,
    {
        let label = label.into();
        let (result_tx, result_rx) = oneshot::channel();
        std::thread::Builder::new()
            .name(format!("ravel-load-{label}"))
            .spawn(move || {
                // Receiver may already be gone
                let _ = result_tx.send(job());
            })
            .map_err(|e| ResourceLoadError::Io(e.to_string()))?;
        tracing::debug!("Started background load: {}", label);
        Ok(Self { label, result_rx })
    }

    /// Check for a result without blocking
    pub fn poll(&mut self) -> LoadPoll<T> {
        match self.result_rx.try_recv() {
            Ok(value) => LoadPoll::Ready(value),
            Err(oneshot::error::TryRecvError::Empty) => LoadPoll::Pending,
            Err(oneshot::error::TryRecvError::Closed) => LoadPoll::Failed(ResourceLoadError::Abandoned),
        }
    }

    /// Block until the worker reports
    pub fn wait(self) -> Result<T, ResourceLoadError> {
        self.result_rx
            .blocking_recv()
            .map_err(|_| ResourceLoadError::Abandoned)
    }

    /// What is being loaded
    pub fn label(&self) -> &str {
        &self.label
    }
}

/// Resolve `path` against `root` unless it is already absolute
pub fn resolve_asset_path(root: Option<&Path>, path: &str) -> PathBuf {
    let path = Path::new(path);
    match root {
        Some(root) if path.is_relative() => root.join(path),
        _ => path.to_path_buf(),
    }
}

/// Load a Wavefront OBJ file into an interleaved position/normal buffer.
///
/// Faces with more than three corners are fan-triangulated. Faces whose
/// corners carry no normal indices get a flat face normal.
pub fn load_obj(path: &Path) -> Result<MeshData, ResourceLoadError> {
    let path_str = path.display().to_string();
    let text = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ResourceLoadError::NotFound(path_str.clone()),
        _ => ResourceLoadError::Io(format!("{path_str}: {e}")),
    })?;
    let mesh = parse_obj(&text).map_err(|message| ResourceLoadError::Decode {
        path: path_str.clone(),
        message,
    })?;
    tracing::info!("Loaded mesh {} ({} vertices)", path_str, mesh.vertex_count());
    Ok(mesh)
}

fn parse_obj(text: &str) -> Result<MeshData, String> {
    let mut positions: Vec<Vector3> = Vec::new();
    let mut normals: Vec<Vector3> = Vec::new();
    let mut vertices = Vec::new();

    for (line_no, line) in text.lines().enumerate() {
        let line_no = line_no + 1;
        let mut tokens = line.split_whitespace();
        match tokens.next() {
            Some("v") => positions.push(parse_vec3(tokens, line_no)?),
            Some("vn") => normals.push(parse_vec3(tokens, line_no)?),
            Some("f") => {
                let corners = tokens
                    .map(|t| parse_corner(t, positions.len(), normals.len(), line_no))
                    .collect::<Result<Vec<_>, _>>()?;
                if corners.len() < 3 {
                    return Err(format!("line {line_no}: face needs at least three corners"));
                }
                for i in 1..corners.len() - 1 {
                    let triangle = [corners[0], corners[i], corners[i + 1]];
                    let p = triangle.map(|(v, _)| positions[v]);
                    let flat = face_normal(p);
                    for (v, n) in triangle {
                        let normal = n.map_or(flat, |n| normals[n]);
                        vertices.extend_from_slice(positions[v].as_slice());
                        vertices.extend_from_slice(normal.as_slice());
                    }
                }
            }
            _ => {}
        }
    }

    Ok(MeshData { vertices })
}

fn parse_vec3<'a>(mut tokens: impl Iterator<Item = &'a str>, line_no: usize) -> Result<Vector3, String> {
    let mut next = || -> Result<f32, String> {
        tokens
            .next()
            .ok_or_else(|| format!("line {line_no}: expected three components"))?
            .parse::<f32>()
            .map_err(|e| format!("line {line_no}: {e}"))
    };
    Ok(Vector3::new(next()?, next()?, next()?))
}

fn parse_corner(
    token: &str,
    position_count: usize,
    normal_count: usize,
    line_no: usize,
) -> Result<(usize, Option<usize>), String> {
    let mut parts = token.split('/');
    let position = parts
        .next()
        .ok_or_else(|| format!("line {line_no}: empty face corner"))?;
    let position = resolve_index(position, position_count, line_no)?;
    let normal = match parts.nth(1) {
        Some(n) if !n.is_empty() => Some(resolve_index(n, normal_count, line_no)?),
        _ => None,
    };
    Ok((position, normal))
}

/// OBJ indices are 1-based; negative values count back from the end
fn resolve_index(token: &str, count: usize, line_no: usize) -> Result<usize, String> {
    let index: i64 = token
        .parse()
        .map_err(|e| format!("line {line_no}: bad index '{token}': {e}"))?;
    let resolved = if index > 0 {
        index - 1
    } else {
        count as i64 + index
    };
    if index == 0 || resolved < 0 || resolved >= count as i64 {
        return Err(format!("line {line_no}: index {index} out of range"));
    }
    Ok(resolved as usize)
}

fn face_normal([a, b, c]: [Vector3; 3]) -> Vector3 {
    let u = b - a;
    let v = c - a;
    Vector3::new(u.y * v.z - u.z * v.y, u.z * v.x - u.x * v.z, u.x * v.y - u.y * v.x).normalized()
}
