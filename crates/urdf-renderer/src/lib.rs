//! URDF Preview Renderer
//!
//! View side of the previewer. The rendering engine itself is external; this
//! crate owns what the view keeps between frames:
//! - Scene graph of transform nodes and the robot model built into it
//! - Translation/rotation gizmos with a live status readout
//! - Orbit camera, grid material and display configuration sync
//! - The message-driven view runtime with its readiness-gated frame loop

pub mod camera;
pub mod config_sync;
pub mod context;
pub mod gizmo;
pub mod grid;
pub mod mesh;
pub mod model;
pub mod scene;
pub mod view;

pub use camera::*;
pub use config_sync::*;
pub use context::*;
pub use gizmo::*;
pub use grid::*;
pub use mesh::*;
pub use model::*;
pub use scene::*;
pub use view::*;
