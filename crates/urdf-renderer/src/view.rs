//! View runtime
//!
//! Receives host messages, rebuilds the robot model, applies display
//! configuration and runs the readiness-gated frame loop. Messages to the
//! host go through a [`MessageSink`]; nothing here waits on the host.

use std::sync::Arc;

use uuid::Uuid;

use urdf_core::{HostMessage, MessageSink, ProtocolError, ViewMessage, ViewState};

use crate::camera::OrbitCamera;
use crate::config_sync::ConfigSync;
use crate::context::RenderingContext;
use crate::gizmo::{
    GizmoAxis, GizmoError, GizmoInstance, GizmoKind, StatusLabel, TargetKind, ToggleOutcome,
};
use crate::grid::GridMaterial;
use crate::mesh::MeshLoader;
use crate::scene::Scene;

/// Toolbar buttons of the view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolbarCommand {
    JointAxis,
    LinkAxis,
    JointRotation,
    LinkRotation,
}

impl ToolbarCommand {
    pub const ALL: [ToolbarCommand; 4] = [
        ToolbarCommand::JointAxis,
        ToolbarCommand::LinkAxis,
        ToolbarCommand::JointRotation,
        ToolbarCommand::LinkRotation,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ToolbarCommand::JointAxis => "Joint Axis",
            ToolbarCommand::LinkAxis => "Link Axis",
            ToolbarCommand::JointRotation => "Joint Rotation",
            ToolbarCommand::LinkRotation => "Link Rotation",
        }
    }

    pub fn gizmo(self) -> (GizmoKind, TargetKind) {
        match self {
            ToolbarCommand::JointAxis => (GizmoKind::Translate, TargetKind::Joint),
            ToolbarCommand::LinkAxis => (GizmoKind::Translate, TargetKind::Link),
            ToolbarCommand::JointRotation => (GizmoKind::Rotate, TargetKind::Joint),
            ToolbarCommand::LinkRotation => (GizmoKind::Rotate, TargetKind::Link),
        }
    }
}

/// Everything one frame draws
pub struct Frame<'a> {
    pub scene: &'a Scene,
    /// The scene was modified since the previous frame
    pub scene_changed: bool,
    pub camera: &'a OrbitCamera,
    pub grid: &'a GridMaterial,
    pub clear_color: [f32; 4],
    pub gizmos: Vec<GizmoInstance>,
    pub status: &'a StatusLabel,
    pub debug_layer_visible: bool,
}

/// The rendering engine's per-frame hook
pub trait FrameRenderer {
    fn render(&mut self, frame: &Frame<'_>);
}

pub struct ViewRuntime {
    ctx: RenderingContext,
    loader: Arc<dyn MeshLoader>,
    host: Arc<dyn MessageSink<ViewMessage>>,
    preview_file: Option<String>,
}

impl ViewRuntime {
    pub fn new(loader: Arc<dyn MeshLoader>, host: Arc<dyn MessageSink<ViewMessage>>) -> Self {
        Self {
            ctx: RenderingContext::new(),
            loader,
            host,
            preview_file: None,
        }
    }

    /// Tell the host the view can receive content
    pub fn start(&self) {
        self.host.post(ViewMessage::Ready);
    }

    pub fn context(&self) -> &RenderingContext {
        &self.ctx
    }

    pub fn preview_file(&self) -> Option<&str> {
        self.preview_file.as_deref()
    }

    /// State to persist for revival
    pub fn persisted_state(&self) -> Option<ViewState> {
        self.preview_file.as_ref().map(|path| ViewState {
            preview_file: path.clone(),
        })
    }

    pub fn handle(&mut self, message: HostMessage) {
        match message {
            HostMessage::PreviewFile { preview_file } => {
                tracing::debug!("Previewing {}", preview_file);
                self.preview_file = Some(preview_file);
            }
            HostMessage::Urdf { urdf } => self.apply_urdf(&urdf),
            HostMessage::Colors(payload) => {
                if let Err(e) = ConfigSync::apply_payload(&mut self.ctx, &payload) {
                    tracing::warn!("Rejected display settings: {}", e);
                    self.host.post(ViewMessage::error(format!("Invalid display settings: {e}")));
                }
            }
        }
    }

    /// Decode and handle a JSON-encoded host message
    pub fn handle_json(&mut self, text: &str) -> Result<(), ProtocolError> {
        let message = HostMessage::from_json(text)?;
        self.handle(message);
        Ok(())
    }

    fn apply_urdf(&mut self, text: &str) {
        self.host.post(ViewMessage::trace("loading urdf"));
        match self.ctx.load_model(text, self.loader.as_ref()) {
            Ok(model) => {
                tracing::debug!("Loaded {} ({} links)", model.name(), model.links().len());
                self.host.post(ViewMessage::trace("loaded urdf"));
            }
            Err(e) => {
                tracing::warn!("Model build failed: {}", e);
                self.host.post(ViewMessage::error(format!("Could not render URDF due to: {e}")));
            }
        }
    }

    pub fn toolbar(&mut self, command: ToolbarCommand) -> ToggleOutcome {
        let (kind, target_kind) = command.gizmo();
        let (gizmos, robot, status, scene) = self.ctx.gizmo_parts();
        gizmos.toggle(kind, target_kind, robot, scene, status)
    }

    /// Pointer drag on a gizmo handle
    pub fn drag(&mut self, gizmo: Uuid, axis: GizmoAxis, amount: f32) -> Result<(), GizmoError> {
        let (gizmos, _, status, scene) = self.ctx.gizmo_parts();
        gizmos.drag(gizmo, axis, amount, scene, status)
    }

    /// Draw one frame; returns false when skipped for lack of configuration
    pub fn render_frame(&mut self, renderer: &mut dyn FrameRenderer) -> bool {
        if !self.ctx.is_ready() {
            return false;
        }

        let frame = Frame {
            scene: &self.ctx.scene,
            scene_changed: self.ctx.scene.is_dirty(),
            camera: &self.ctx.camera,
            grid: &self.ctx.grid,
            clear_color: self.ctx.clear_color,
            gizmos: self.ctx.gizmos.instances(&self.ctx.scene),
            status: &self.ctx.status,
            debug_layer_visible: self.ctx.debug_layer_visible,
        };
        renderer.render(&frame);

        self.ctx.scene.mark_clean();
        true
    }
}
