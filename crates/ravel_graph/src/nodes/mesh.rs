// SPDX-License-Identifier: MIT OR Apache-2.0
//! OBJ mesh source backed by a background load.

use crate::evaluation::{ErrorState, EvaluationError, NodeIo};
use crate::loader::{self, BackgroundLoad, LoadPoll, ResourceLoadError};
use crate::node::{NodeBehavior, NodeView};
use crate::port::PortDirectory;
use crate::serialization::{ByteBuffer, SerializationError};
use crate::value::{MeshData, Value};

type MeshLoad = BackgroundLoad<Result<MeshData, ResourceLoadError>>;

#[derive(Debug, Default)]
enum MeshState {
    #[default]
    Empty,
    Loading(MeshLoad),
    Ready,
    Invalid,
}

impl MeshState {
    fn label(&self) -> &'static str {
        match self {
            Self::Empty => "no file",
            Self::Loading(_) => "loading",
            Self::Ready => "ready",
            Self::Invalid => "invalid",
        }
    }
}

/// Publishes the mesh stored in an OBJ file
#[derive(Debug, Default)]
pub struct MeshNode {
    path: String,
    pending_path: Option<String>,
    state: MeshState,
    error: ErrorState,
}

impl MeshNode {
    /// File path, relative paths resolving against the graph's assets root
    pub fn path(&self) -> &str {
        self.pending_path.as_deref().unwrap_or(&self.path)
    }

    /// Load a new file. The load starts on the next update.
    pub fn set_path(&mut self, path: impl Into<String>) {
        self.pending_path = Some(path.into());
    }

    /// Whether a load is in flight
    pub fn is_loading(&self) -> bool {
        matches!(self.state, MeshState::Loading(_))
    }

    fn start_load(&mut self, io: &NodeIo<'_>) -> Result<(), ResourceLoadError> {
        let resolved = loader::resolve_asset_path(io.assets_root(), &self.path);
        let load = BackgroundLoad::spawn(self.path.clone(), move || loader::load_obj(&resolved))?;
        self.state = MeshState::Loading(load);
        Ok(())
    }
}

impl NodeBehavior for MeshNode {
    fn update(&mut self, io: &mut NodeIo<'_>) {
        io.clear_output_dirty();

        if let Some(path) = self.pending_path.take() {
            // The previous file's mesh is withdrawn while the new one loads
            io.publish(0, Value::Empty);
            self.path = path;
            self.error.clear();
            self.state = MeshState::Empty;
            if !self.path.is_empty() {
                if let Err(error) = self.start_load(io) {
                    self.state = MeshState::Invalid;
                    self.error.report(io.id(), error.into());
                }
            }
        }

        let MeshState::Loading(load) = &mut self.state else {
            return;
        };
        let result = match load.poll() {
            LoadPoll::Pending => return,
            LoadPoll::Ready(result) => result,
            LoadPoll::Failed(error) => Err(error),
        };
        match result {
            Ok(mesh) => {
                tracing::debug!(node = %io.id(), path = %self.path, vertices = mesh.vertex_count(), "Mesh ready");
                self.state = MeshState::Ready;
                io.publish(0, Value::Mesh(mesh));
            }
            Err(error) => {
                self.state = MeshState::Invalid;
                io.publish(0, Value::Empty);
                self.error.report(io.id(), EvaluationError::ResourceLoad(error));
            }
        }
    }

    fn render(&self, ports: &PortDirectory, view: &mut NodeView) {
        view.row("file", self.path());
        view.row("status", self.state.label());
        if let Some(Value::Mesh(mesh)) = ports.output(0).map(|o| o.value.value()) {
            view.row("vertices", mesh.vertex_count());
        }
        self.error.render(view);
    }

    fn serialize_extra(&self, buffer: &mut ByteBuffer) -> Result<(), SerializationError> {
        buffer.add(self.path())
    }

    fn deserialize_extra(&mut self, buffer: &mut ByteBuffer) -> Result<(), SerializationError> {
        let path: String = buffer.get()?;
        self.pending_path = Some(path);
        Ok(())
    }
}
