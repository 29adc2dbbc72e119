//! URDF Preview Host
//!
//! Binds a robot description document to a view and keeps the view in sync
//! with saves, rebinds and settings changes.

pub mod dispose;
pub mod notifier;
pub mod session;
pub mod transport;
pub mod watch;

pub use dispose::*;
pub use notifier::*;
pub use session::*;
pub use transport::*;
pub use watch::*;
