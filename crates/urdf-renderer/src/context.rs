//! Rendering context owned by the view
//!
//! Everything the view keeps between frames lives here and is passed
//! explicitly to the model builder, the gizmo controller and config sync.

use crate::camera::OrbitCamera;
use crate::gizmo::{GizmoController, StatusLabel};
use crate::grid::GridMaterial;
use crate::mesh::MeshLoader;
use crate::model::{BuildError, RobotModel, RobotModelBuilder};
use crate::scene::Scene;

/// Whether frames may be drawn yet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Readiness {
    /// No display configuration has arrived; frames are skipped
    #[default]
    AwaitingConfig,
    Ready,
}

#[derive(Debug)]
pub struct RenderingContext {
    pub scene: Scene,
    pub camera: OrbitCamera,
    pub grid: GridMaterial,
    pub clear_color: [f32; 4],
    pub debug_layer_visible: bool,
    pub status: StatusLabel,
    pub gizmos: GizmoController,
    robot: Option<RobotModel>,
    readiness: Readiness,
}

impl Default for RenderingContext {
    fn default() -> Self {
        Self {
            scene: Scene::new(),
            camera: OrbitCamera::default(),
            grid: GridMaterial::default(),
            clear_color: [0.0, 0.0, 0.0, 1.0],
            debug_layer_visible: false,
            status: StatusLabel::default(),
            gizmos: GizmoController::new(),
            robot: None,
            readiness: Readiness::AwaitingConfig,
        }
    }
}

impl RenderingContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn readiness(&self) -> Readiness {
        self.readiness
    }

    pub fn is_ready(&self) -> bool {
        self.readiness == Readiness::Ready
    }

    pub(crate) fn mark_ready(&mut self) {
        if self.readiness != Readiness::Ready {
            tracing::debug!("View ready to render");
        }
        self.readiness = Readiness::Ready;
    }

    pub fn robot(&self) -> Option<&RobotModel> {
        self.robot.as_ref()
    }

    /// Tear down the current model, then build a new one from `text`
    ///
    /// Gizmos are detached and the camera reset before the old model goes
    /// away. On failure the context is left without a model.
    pub fn load_model(
        &mut self,
        text: &str,
        loader: &dyn MeshLoader,
    ) -> Result<&RobotModel, BuildError> {
        self.gizmos.detach_all(&mut self.status);
        self.camera.reset();
        self.clear_model();

        let model = RobotModelBuilder::new(loader).build(text, &mut self.scene)?;
        Ok(&*self.robot.insert(model))
    }

    /// Dispose the current model, if any
    pub fn clear_model(&mut self) {
        if let Some(robot) = self.robot.take() {
            let removed = robot.dispose(&mut self.scene);
            tracing::debug!("Removed {} scene nodes", removed);
        }
    }

    /// Split borrow used by the gizmo toolbar
    pub(crate) fn gizmo_parts(
        &mut self,
    ) -> (
        &mut GizmoController,
        Option<&RobotModel>,
        &mut StatusLabel,
        &mut Scene,
    ) {
        (
            &mut self.gizmos,
            self.robot.as_ref(),
            &mut self.status,
            &mut self.scene,
        )
    }
}
