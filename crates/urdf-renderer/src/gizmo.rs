//! Translation and rotation gizmos
//!
//! Gizmos are grouped into sets keyed by `(GizmoKind, TargetKind)`. A set is
//! either attached to every eligible transform of the current model or empty;
//! [`GizmoController::toggle`] flips between the two.

use std::collections::HashMap;

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use uuid::Uuid;

use crate::model::RobotModel;
use crate::scene::{NodeId, Scene};

/// Size of a gizmo relative to its default screen size
pub const GIZMO_SCALE_RATIO: f32 = 0.5;

/// Vertical screen offset of the status readout from its anchor
pub const STATUS_OFFSET_Y: f32 = -100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GizmoKind {
    Translate,
    Rotate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetKind {
    /// Every joint transform
    Joint,
    /// Every visual transform of every link
    Link,
}

/// One of the three handles of a gizmo
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GizmoAxis {
    X,
    Y,
    Z,
}

impl GizmoAxis {
    pub fn unit(self) -> Vec3 {
        match self {
            GizmoAxis::X => Vec3::X,
            GizmoAxis::Y => Vec3::Y,
            GizmoAxis::Z => Vec3::Z,
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum GizmoError {
    #[error("No attached gizmo with id {0}")]
    UnknownGizmo(Uuid),

    #[error("Gizmo target is no longer in the scene")]
    TargetRemoved,
}

/// Per-gizmo instance data for the overlay pass
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct GizmoInstance {
    pub transform: [[f32; 4]; 4],
    pub scale: f32,
    /// 0 = translate, 1 = rotate
    pub kind: u32,
    pub _padding: [f32; 2],
}

/// Text readout anchored to a scene node
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusLabel {
    pub text: String,
    pub anchor: Option<NodeId>,
    pub offset_y: f32,
}

impl StatusLabel {
    pub fn show(&mut self, text: String, anchor: NodeId) {
        self.text = text;
        self.anchor = Some(anchor);
        self.offset_y = STATUS_OFFSET_Y;
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.anchor = None;
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// A manipulator attached to one transform
#[derive(Debug, Clone)]
pub struct Gizmo {
    id: Uuid,
    kind: GizmoKind,
    target: NodeId,
    scale_ratio: f32,
}

impl Gizmo {
    fn new(kind: GizmoKind, target: NodeId) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            target,
            scale_ratio: GIZMO_SCALE_RATIO,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn kind(&self) -> GizmoKind {
        self.kind
    }

    pub fn target(&self) -> NodeId {
        self.target
    }

    pub fn scale_ratio(&self) -> f32 {
        self.scale_ratio
    }

    /// Move or turn the target along one handle
    ///
    /// Translation is in the target's local frame; rotation adds to the
    /// roll/pitch/yaw component of the handle.
    fn apply_drag(
        &self,
        scene: &mut Scene,
        axis: GizmoAxis,
        amount: f32,
    ) -> Result<(), GizmoError> {
        let node = scene
            .node_mut(self.target)
            .ok_or(GizmoError::TargetRemoved)?;
        match self.kind {
            GizmoKind::Translate => node.position += axis.unit() * amount,
            GizmoKind::Rotate => node.rotation += axis.unit() * amount,
        }
        Ok(())
    }

    /// Current position or orientation of the target as display text
    pub fn readout(&self, scene: &Scene) -> Option<String> {
        let node = scene.node(self.target)?;
        let text = match self.kind {
            GizmoKind::Translate => format!(
                "{}\nX: {:.6}\nY: {:.6}\nZ: {:.6}",
                node.name, node.position.x, node.position.y, node.position.z
            ),
            GizmoKind::Rotate => format!(
                "{}\nR:{:.6}\nP:{:.6}\nY:{:.6}",
                node.name, node.rotation.x, node.rotation.y, node.rotation.z
            ),
        };
        Some(text)
    }

    fn instance(&self, scene: &Scene) -> Option<GizmoInstance> {
        if !scene.contains(self.target) {
            return None;
        }
        Some(GizmoInstance {
            transform: scene.world_transform(self.target).to_cols_array_2d(),
            scale: self.scale_ratio,
            kind: match self.kind {
                GizmoKind::Translate => 0,
                GizmoKind::Rotate => 1,
            },
            _padding: [0.0; 2],
        })
    }
}

/// Gizmos of one `(GizmoKind, TargetKind)` pair
#[derive(Debug, Default)]
pub struct GizmoSet {
    gizmos: Vec<Gizmo>,
}

impl GizmoSet {
    pub fn is_empty(&self) -> bool {
        self.gizmos.is_empty()
    }

    pub fn len(&self) -> usize {
        self.gizmos.len()
    }

    pub fn gizmos(&self) -> &[Gizmo] {
        &self.gizmos
    }
}

/// Result of a toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Attached(usize),
    Detached(usize),
}

/// Attaches and detaches gizmo sets and drives the status readout
#[derive(Debug, Default)]
pub struct GizmoController {
    sets: HashMap<(GizmoKind, TargetKind), GizmoSet>,
}

impl GizmoController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach to every eligible transform if the set is empty, otherwise
    /// detach the whole set and clear the status text
    ///
    /// Attaching is all-or-nothing: if any eligible transform is no longer
    /// in `scene`, nothing is attached.
    pub fn toggle(
        &mut self,
        kind: GizmoKind,
        target_kind: TargetKind,
        model: Option<&RobotModel>,
        scene: &Scene,
        status: &mut StatusLabel,
    ) -> ToggleOutcome {
        let set = self.sets.entry((kind, target_kind)).or_default();

        if !set.is_empty() {
            let count = set.gizmos.len();
            set.gizmos.clear();
            status.clear();
            tracing::debug!(
                "Detached {} {:?} gizmos from {:?} targets",
                count,
                kind,
                target_kind
            );
            return ToggleOutcome::Detached(count);
        }

        let Some(model) = model else {
            return ToggleOutcome::Attached(0);
        };

        let targets: Vec<NodeId> = match target_kind {
            TargetKind::Joint => model.joint_transforms().collect(),
            TargetKind::Link => model.visual_transforms().collect(),
        };
        if let Some(missing) = targets.iter().find(|t| !scene.contains(**t)) {
            tracing::warn!("Not attaching {:?} gizmos: {:?} is gone", kind, missing);
            return ToggleOutcome::Attached(0);
        }
        set.gizmos = targets.into_iter().map(|t| Gizmo::new(kind, t)).collect();

        tracing::debug!(
            "Attached {} {:?} gizmos to {:?} targets",
            set.gizmos.len(),
            kind,
            target_kind
        );
        ToggleOutcome::Attached(set.gizmos.len())
    }

    /// Detach every set and clear the status text
    pub fn detach_all(&mut self, status: &mut StatusLabel) {
        self.sets.clear();
        status.clear();
    }

    pub fn set(&self, kind: GizmoKind, target_kind: TargetKind) -> Option<&GizmoSet> {
        self.sets.get(&(kind, target_kind))
    }

    pub fn attached_count(&self, kind: GizmoKind, target_kind: TargetKind) -> usize {
        self.set(kind, target_kind).map_or(0, GizmoSet::len)
    }

    pub fn total_attached(&self) -> usize {
        self.sets.values().map(GizmoSet::len).sum()
    }

    pub fn find(&self, id: Uuid) -> Option<&Gizmo> {
        self.sets
            .values()
            .flat_map(|s| s.gizmos.iter())
            .find(|g| g.id == id)
    }

    /// Apply a drag on one handle and refresh the status readout
    pub fn drag(
        &self,
        id: Uuid,
        axis: GizmoAxis,
        amount: f32,
        scene: &mut Scene,
        status: &mut StatusLabel,
    ) -> Result<(), GizmoError> {
        let gizmo = self.find(id).ok_or(GizmoError::UnknownGizmo(id))?;
        gizmo.apply_drag(scene, axis, amount)?;

        let text = gizmo.readout(scene).ok_or(GizmoError::TargetRemoved)?;
        status.show(text, gizmo.target);
        Ok(())
    }

    /// Instance data for every attached gizmo whose target still exists
    pub fn instances(&self, scene: &Scene) -> Vec<GizmoInstance> {
        self.sets
            .values()
            .flat_map(|s| s.gizmos.iter())
            .filter_map(|g| g.instance(scene))
            .collect()
    }
}
