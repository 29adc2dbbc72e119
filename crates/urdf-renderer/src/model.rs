//! Robot model built into the scene graph
//!
//! [`RobotModelBuilder::build`] turns a resolved URDF description into a
//! hierarchy of transform nodes:
//!
//! ```text
//! robot root
//! └── root link
//!     ├── visual transforms
//!     └── joint transform
//!         └── child link
//!             └── ...
//! ```
//!
//! A failed build removes every node it created, leaving the scene without a
//! model rather than with a partial one.

use std::collections::{HashMap, HashSet};

use glam::Vec3;

use crate::mesh::{MeshError, MeshLoader};
use crate::scene::{NodeId, Scene};

/// Errors that can occur while building a robot model
#[derive(Debug, Clone, thiserror::Error)]
pub enum BuildError {
    #[error("Failed to parse URDF: {0}")]
    UrdfParse(String),

    #[error("Empty URDF: no links defined")]
    EmptyUrdf,

    #[error("Joint {joint} references unknown link {link}")]
    LinkNotFound { joint: String, link: String },

    #[error("Link {0} is the child of more than one joint")]
    MultipleParents(String),

    #[error("Joint {0} closes a kinematic loop")]
    Cycle(String),

    #[error("Failed to load mesh for link {link}: {source}")]
    Mesh {
        link: String,
        #[source]
        source: MeshError,
    },
}

/// Visual geometry attached to a visual transform
#[derive(Debug, Clone, PartialEq)]
pub enum VisualGeometry {
    Mesh { uri: String, triangles: usize },
    Box { size: [f32; 3] },
    Cylinder { radius: f32, length: f32 },
    Sphere { radius: f32 },
    Capsule { radius: f32, length: f32 },
}

#[derive(Debug, Clone)]
pub struct Visual {
    pub name: Option<String>,
    pub transform: NodeId,
    pub geometry: VisualGeometry,
    pub color: Option<[f32; 4]>,
}

#[derive(Debug, Clone)]
pub struct Link {
    pub name: String,
    pub transform: NodeId,
    pub visuals: Vec<Visual>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JointKind {
    Fixed,
    Revolute,
    Continuous,
    Prismatic,
    Floating,
    Planar,
    Spherical,
}

#[derive(Debug, Clone)]
pub struct Joint {
    pub name: String,
    pub kind: JointKind,
    pub parent: String,
    pub child: String,
    pub axis: Vec3,
    pub transform: NodeId,
}

/// A robot model that lives in a [`Scene`]
#[derive(Debug)]
pub struct RobotModel {
    name: String,
    root: NodeId,
    links: Vec<Link>,
    joints: Vec<Joint>,
}

impl RobotModel {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Links in document order
    pub fn links(&self) -> &[Link] {
        &self.links
    }

    /// Joints in document order
    pub fn joints(&self) -> &[Joint] {
        &self.joints
    }

    pub fn link(&self, name: &str) -> Option<&Link> {
        self.links.iter().find(|l| l.name == name)
    }

    pub fn joint(&self, name: &str) -> Option<&Joint> {
        self.joints.iter().find(|j| j.name == name)
    }

    /// Transforms owned by joints
    pub fn joint_transforms(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.joints.iter().map(|j| j.transform)
    }

    /// Visual transforms of every link
    pub fn visual_transforms(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.links
            .iter()
            .flat_map(|l| l.visuals.iter().map(|v| v.transform))
    }

    /// Remove every node of this model from the scene
    pub fn dispose(self, scene: &mut Scene) -> usize {
        tracing::debug!("Disposing robot {}", self.name);
        scene.remove_subtree(self.root)
    }
}

/// Builds [`RobotModel`]s using the engine's mesh loader
pub struct RobotModelBuilder<'a> {
    loader: &'a dyn MeshLoader,
}

impl<'a> RobotModelBuilder<'a> {
    pub fn new(loader: &'a dyn MeshLoader) -> Self {
        Self { loader }
    }

    /// Build a model from resolved URDF text into `scene`
    pub fn build(&self, text: &str, scene: &mut Scene) -> Result<RobotModel, BuildError> {
        let robot =
            urdf_rs::read_from_string(text).map_err(|e| BuildError::UrdfParse(e.to_string()))?;

        if robot.links.is_empty() {
            return Err(BuildError::EmptyUrdf);
        }

        let root = scene.create_node(robot_node_name(&robot.name), None);
        match self.populate(&robot, root, scene) {
            Ok((links, joints)) => {
                tracing::info!(
                    "Built robot {} with {} links and {} joints",
                    robot.name,
                    links.len(),
                    joints.len()
                );
                Ok(RobotModel {
                    name: robot.name,
                    root,
                    links,
                    joints,
                })
            }
            Err(e) => {
                scene.remove_subtree(root);
                Err(e)
            }
        }
    }

    fn populate(
        &self,
        robot: &urdf_rs::Robot,
        root: NodeId,
        scene: &mut Scene,
    ) -> Result<(Vec<Link>, Vec<Joint>), BuildError> {
        let material_colors: HashMap<&str, [f32; 4]> = robot
            .materials
            .iter()
            .filter_map(|m| {
                let color = m.color.as_ref()?;
                Some((m.name.as_str(), rgba(&color.rgba.0)))
            })
            .collect();

        // Every link gets a transform up front; parents are fixed after the
        // joints are known
        let mut links = Vec::with_capacity(robot.links.len());
        let mut link_nodes: HashMap<&str, NodeId> = HashMap::new();
        for urdf_link in &robot.links {
            let transform = scene.create_node(urdf_link.name.clone(), Some(root));
            link_nodes.insert(urdf_link.name.as_str(), transform);

            let visuals = urdf_link
                .visual
                .iter()
                .map(|v| self.build_visual(v, &urdf_link.name, transform, &material_colors, scene))
                .collect::<Result<Vec<_>, _>>()?;

            links.push(Link {
                name: urdf_link.name.clone(),
                transform,
                visuals,
            });
        }

        let mut joints = Vec::with_capacity(robot.joints.len());
        let mut parented: HashSet<&str> = HashSet::new();
        for urdf_joint in &robot.joints {
            let node_of = |link: &str| match link_nodes.get(link) {
                Some(node) => Ok(*node),
                None => Err(BuildError::LinkNotFound {
                    joint: urdf_joint.name.clone(),
                    link: link.to_string(),
                }),
            };
            let parent_node = node_of(&urdf_joint.parent.link)?;
            let child_node = node_of(&urdf_joint.child.link)?;
            if !parented.insert(urdf_joint.child.link.as_str()) {
                return Err(BuildError::MultipleParents(urdf_joint.child.link.clone()));
            }
            if scene.is_ancestor(child_node, parent_node) {
                return Err(BuildError::Cycle(urdf_joint.name.clone()));
            }

            let transform = scene.create_node(urdf_joint.name.clone(), Some(parent_node));
            apply_pose(scene, transform, &urdf_joint.origin);

            if let Some(child) = scene.node_mut(child_node) {
                child.parent = Some(transform);
            }

            joints.push(Joint {
                name: urdf_joint.name.clone(),
                kind: convert_joint_type(&urdf_joint.joint_type),
                parent: urdf_joint.parent.link.clone(),
                child: urdf_joint.child.link.clone(),
                axis: Vec3::from_array(urdf_joint.axis.xyz.0.map(|v| v as f32)),
                transform,
            });
        }

        Ok((links, joints))
    }

    fn build_visual(
        &self,
        visual: &urdf_rs::Visual,
        link_name: &str,
        link_node: NodeId,
        material_colors: &HashMap<&str, [f32; 4]>,
        scene: &mut Scene,
    ) -> Result<Visual, BuildError> {
        let node_name = visual
            .name
            .clone()
            .unwrap_or_else(|| format!("{link_name}_visual"));
        let transform = scene.create_node(node_name, Some(link_node));
        apply_pose(scene, transform, &visual.origin);

        let color = visual.material.as_ref().and_then(|m| {
            m.color
                .as_ref()
                .map(|c| rgba(&c.rgba.0))
                .or_else(|| material_colors.get(m.name.as_str()).copied())
        });

        let geometry = match &visual.geometry {
            urdf_rs::Geometry::Mesh { filename, scale } => {
                let loaded = self.loader.load(filename);
                let mut mesh = loaded.map_err(|source| BuildError::Mesh {
                    link: link_name.to_string(),
                    source,
                })?;
                if let Some(s) = scale {
                    mesh = mesh.scaled([s.0[0] as f32, s.0[1] as f32, s.0[2] as f32]);
                }
                let triangles = mesh.triangle_count();
                if let Some(node) = scene.node_mut(transform) {
                    node.mesh = Some(mesh);
                }
                VisualGeometry::Mesh {
                    uri: filename.clone(),
                    triangles,
                }
            }
            urdf_rs::Geometry::Box { size } => VisualGeometry::Box {
                size: [size.0[0] as f32, size.0[1] as f32, size.0[2] as f32],
            },
            urdf_rs::Geometry::Cylinder { radius, length } => VisualGeometry::Cylinder {
                radius: *radius as f32,
                length: *length as f32,
            },
            urdf_rs::Geometry::Sphere { radius } => VisualGeometry::Sphere {
                radius: *radius as f32,
            },
            urdf_rs::Geometry::Capsule { radius, length } => VisualGeometry::Capsule {
                radius: *radius as f32,
                length: *length as f32,
            },
        };

        Ok(Visual {
            name: visual.name.clone(),
            transform,
            geometry,
            color,
        })
    }
}

fn robot_node_name(name: &str) -> String {
    if name.is_empty() {
        "robot".to_string()
    } else {
        name.to_string()
    }
}

fn apply_pose(scene: &mut Scene, node: NodeId, pose: &urdf_rs::Pose) {
    if let Some(node) = scene.node_mut(node) {
        node.position = Vec3::from_array(pose.xyz.0.map(|v| v as f32));
        node.rotation = Vec3::from_array(pose.rpy.0.map(|v| v as f32));
    }
}

fn rgba(values: &[f64; 4]) -> [f32; 4] {
    [
        values[0] as f32,
        values[1] as f32,
        values[2] as f32,
        values[3] as f32,
    ]
}

fn convert_joint_type(urdf_type: &urdf_rs::JointType) -> JointKind {
    match urdf_type {
        urdf_rs::JointType::Fixed => JointKind::Fixed,
        urdf_rs::JointType::Revolute => JointKind::Revolute,
        urdf_rs::JointType::Continuous => JointKind::Continuous,
        urdf_rs::JointType::Prismatic => JointKind::Prismatic,
        urdf_rs::JointType::Floating => JointKind::Floating,
        urdf_rs::JointType::Planar => JointKind::Planar,
        urdf_rs::JointType::Spherical => JointKind::Spherical,
    }
}
