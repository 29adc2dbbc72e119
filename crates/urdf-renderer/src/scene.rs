//! Scene graph of transform nodes
//!
//! The scene is the single source of truth for node transforms. Robot
//! models, gizmos and the status label refer to nodes by [`NodeId`].

use std::collections::HashMap;

use glam::{EulerRot, Mat4, Quat, Vec3};
use uuid::Uuid;

use crate::mesh::MeshData;

/// Identifier of a node in the [`Scene`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(Uuid);

impl NodeId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

/// A named transform in the hierarchy
#[derive(Debug, Clone)]
pub struct TransformNode {
    pub id: NodeId,
    pub name: String,
    pub parent: Option<NodeId>,
    /// Local translation
    pub position: Vec3,
    /// Local roll/pitch/yaw in radians, applied as fixed X then Y then Z
    pub rotation: Vec3,
    pub scaling: Vec3,
    /// Geometry drawn at this node, if any
    pub mesh: Option<MeshData>,
}

impl TransformNode {
    /// Local transform relative to the parent
    pub fn local_transform(&self) -> Mat4 {
        let rotation = Quat::from_euler(
            EulerRot::ZYX,
            self.rotation.z,
            self.rotation.y,
            self.rotation.x,
        );
        Mat4::from_scale_rotation_translation(self.scaling, rotation, self.position)
    }
}

/// Scene containing all transform nodes
#[derive(Debug, Default)]
pub struct Scene {
    nodes: HashMap<NodeId, TransformNode>,
    dirty: bool,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node under `parent` with an identity transform
    pub fn create_node(&mut self, name: impl Into<String>, parent: Option<NodeId>) -> NodeId {
        let id = NodeId::new();
        self.nodes.insert(
            id,
            TransformNode {
                id,
                name: name.into(),
                parent,
                position: Vec3::ZERO,
                rotation: Vec3::ZERO,
                scaling: Vec3::ONE,
                mesh: None,
            },
        );
        self.dirty = true;
        id
    }

    pub fn node(&self, id: NodeId) -> Option<&TransformNode> {
        self.nodes.get(&id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut TransformNode> {
        self.dirty = true;
        self.nodes.get_mut(&id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Direct children of `id`
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.nodes
            .values()
            .filter(|n| n.parent == Some(id))
            .map(|n| n.id)
            .collect()
    }

    /// Remove a node and all of its descendants, returning how many were removed
    pub fn remove_subtree(&mut self, id: NodeId) -> usize {
        if !self.nodes.contains_key(&id) {
            return 0;
        }

        let mut pending = vec![id];
        let mut removed = 0;
        while let Some(current) = pending.pop() {
            pending.extend(self.children(current));
            if self.nodes.remove(&current).is_some() {
                removed += 1;
            }
        }
        self.dirty = true;
        removed
    }

    /// Whether `ancestor` is `node` or one of its parents
    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        let mut steps = 0;
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            steps += 1;
            if steps > self.nodes.len() {
                return false;
            }
            current = self.nodes.get(&id).and_then(|n| n.parent);
        }
        false
    }

    /// Transform from node space to world space
    pub fn world_transform(&self, id: NodeId) -> Mat4 {
        let mut transform = Mat4::IDENTITY;
        let mut current = self.nodes.get(&id);
        while let Some(node) = current {
            transform = node.local_transform() * transform;
            current = node.parent.and_then(|p| self.nodes.get(&p));
        }
        transform
    }

    pub fn world_position(&self, id: NodeId) -> Vec3 {
        self.world_transform(id).transform_point3(Vec3::ZERO)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &TransformNode> {
        self.nodes.values()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Marks the scene as clean (called after rendering)
    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }
}
