//! Channels between a session and its view
//!
//! Host to view: a [`ViewHandle`] the session posts [`HostMessage`]s to.
//! View to host: a [`MessageSink`] that turns [`ViewMessage`]s into
//! [`SessionEvent`]s on the session's event channel.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

use urdf_core::{HostMessage, MessageSink, ViewMessage};
use urdf_renderer::{CameraUniform, Frame, FrameRenderer, MeshLoader, ViewRuntime};

use crate::session::SessionEvent;

/// The session's handle on its view
pub trait ViewHandle: MessageSink<HostMessage> {
    /// Free the view; later posts are dropped
    fn release(&self);
}

/// View reached through an unbounded channel
pub struct ChannelView {
    tx: Mutex<Option<UnboundedSender<HostMessage>>>,
}

impl ChannelView {
    pub fn channel() -> (Self, UnboundedReceiver<HostMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                tx: Mutex::new(Some(tx)),
            },
            rx,
        )
    }

    pub fn is_released(&self) -> bool {
        self.tx.lock().is_none()
    }
}

impl MessageSink<HostMessage> for ChannelView {
    fn post(&self, message: HostMessage) {
        match self.tx.lock().as_ref() {
            Some(tx) => tx.post(message),
            None => tracing::debug!("View released, dropping {:?}", message),
        }
    }
}

impl ViewHandle for ChannelView {
    fn release(&self) {
        self.tx.lock().take();
    }
}

/// Forwards view messages to a session's event channel
#[derive(Clone)]
pub struct ViewEventSink {
    events: UnboundedSender<SessionEvent>,
}

impl ViewEventSink {
    pub fn new(events: UnboundedSender<SessionEvent>) -> Self {
        Self { events }
    }
}

impl MessageSink<ViewMessage> for ViewEventSink {
    fn post(&self, message: ViewMessage) {
        self.events.post(SessionEvent::View(message));
    }
}

/// What a headless view drew before it was released
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeadlessSummary {
    pub frames: usize,
    pub robot: Option<String>,
    pub links: usize,
    pub joints: usize,
    /// Grid line vertices of the last frame
    pub grid_vertices: usize,
}

/// Aspect ratio of the headless viewport
const HEADLESS_ASPECT: f32 = 16.0 / 9.0;
/// Half-width of the drawn ground grid, in camera radii
const GRID_EXTENT_RADII: f32 = 10.0;

#[derive(Default)]
struct FrameLog {
    frames: usize,
    grid_vertices: usize,
    camera: CameraUniform,
}

impl FrameRenderer for FrameLog {
    fn render(&mut self, frame: &Frame<'_>) {
        self.frames += 1;
        self.grid_vertices = frame
            .grid
            .line_vertices(frame.camera.radius * GRID_EXTENT_RADII)
            .len();
        self.camera = frame.camera.uniform(HEADLESS_ASPECT);
        tracing::debug!(
            "Frame {}: {} nodes, {} gizmos, {} grid vertices, eye {:?}",
            self.frames,
            frame.scene.len(),
            frame.gizmos.len(),
            self.grid_vertices,
            &self.camera.eye[..3]
        );
    }
}

/// Run a view without a rendering surface
///
/// The view posts `ready` as soon as it starts and draws one frame per host
/// message. The task ends when the returned view handle is released.
pub fn spawn_headless_view(
    loader: Arc<dyn MeshLoader>,
    host: Arc<dyn MessageSink<ViewMessage>>,
) -> (Arc<ChannelView>, JoinHandle<HeadlessSummary>) {
    let (view, mut rx) = ChannelView::channel();

    let task = tokio::spawn(async move {
        let mut runtime = ViewRuntime::new(loader, host);
        let mut frames = FrameLog::default();
        runtime.start();

        while let Some(message) = rx.recv().await {
            runtime.handle(message);
            runtime.render_frame(&mut frames);
        }

        let robot = runtime.context().robot();
        HeadlessSummary {
            frames: frames.frames,
            robot: robot.map(|r| r.name().to_string()),
            links: robot.map_or(0, |r| r.links().len()),
            joints: robot.map_or(0, |r| r.joints().len()),
            grid_vertices: frames.grid_vertices,
        }
    });

    (Arc::new(view), task)
}
