//! URDF Preview Core
//!
//! Host-independent pieces of the URDF previewer:
//! - Package lookup and per-pass package maps
//! - Macro (xacro) expansion collaborator
//! - Resource resolution: `package://` references to renderer URIs
//! - Host/view message protocol and display configuration

pub mod display;
pub mod document;
pub mod package;
pub mod protocol;
pub mod resolve;
pub mod settings;
pub mod uri;
pub mod xacro;

pub use display::*;
pub use document::*;
pub use package::*;
pub use protocol::*;
pub use resolve::*;
pub use settings::*;
pub use uri::*;
pub use xacro::*;
