//! Preview session: one document bound to one view
//!
//! ```text
//!            refresh()
//!   Idle ───────────────► Resolving ──► Ready
//!                            ▲   │
//!                            │   └────► Failed
//!                            └── refresh() from Ready or Failed
//! ```
//!
//! At most one resolution pass runs per session. A refresh requested while a
//! pass is in flight is a no-op. Every binding carries a generation number;
//! a pass whose binding was replaced while it ran discards its result and
//! resolves the current binding before the in-flight flag is released. A
//! pass that completes after disposal leaves the session `Idle`.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::watch;

use urdf_core::{
    DisplayConfig, DocumentError, HostMessage, PackageLookup, PackageResolver, ResolveError,
    ResourceDocument, ResourceResolver, SettingsStore, ViewMessage, ViewState,
};

use crate::dispose::{DisposeEmitter, Listener, Subscription};
use crate::notifier::{Notifier, TRACE_TARGET, missing_packages_message};
use crate::transport::ViewHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Resolving,
    Ready,
    Failed,
}

/// Errors that fail a refresh
#[derive(Debug, Clone, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Read(#[from] DocumentError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

#[derive(Debug, Clone)]
pub enum RefreshOutcome {
    /// Another pass was in flight, or the session is disposed
    Skipped,
    /// Content was pushed to the view
    Rendered { unresolved: Vec<String> },
    Failed(SessionError),
}

impl RefreshOutcome {
    pub fn is_skipped(&self) -> bool {
        matches!(self, RefreshOutcome::Skipped)
    }
}

/// Host events a session reacts to
#[derive(Debug, Clone)]
pub enum SessionEvent {
    DocumentSaved(PathBuf),
    ConfigurationChanged,
    View(ViewMessage),
    ViewClosed,
}

/// Collaborators a session works with
#[derive(Clone)]
pub struct SessionServices {
    pub resolver: Arc<ResourceResolver>,
    pub packages: Arc<dyn PackageLookup>,
    pub settings: Arc<dyn SettingsStore>,
    pub notifier: Arc<dyn Notifier>,
}

struct Binding {
    document: ResourceDocument,
    generation: u64,
}

/// Clears the in-flight flag when the pass ends, however it ends
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct PreviewSession {
    binding: Mutex<Binding>,
    state: watch::Sender<SessionState>,
    in_flight: AtomicBool,
    disposed: AtomicBool,
    services: SessionServices,
    view: Arc<dyn ViewHandle>,
    listeners: Mutex<Vec<Listener>>,
    on_dispose: DisposeEmitter,
}

impl PreviewSession {
    pub fn new(
        location: impl Into<PathBuf>,
        view: Arc<dyn ViewHandle>,
        services: SessionServices,
    ) -> Arc<Self> {
        let location = location.into();
        tracing::info!("Creating preview for {}", location.display());

        Arc::new(Self {
            binding: Mutex::new(Binding {
                document: ResourceDocument::new(location),
                generation: 0,
            }),
            state: watch::channel(SessionState::Idle).0,
            in_flight: AtomicBool::new(false),
            disposed: AtomicBool::new(false),
            services,
            view,
            listeners: Mutex::new(Vec::new()),
            on_dispose: DisposeEmitter::new(),
        })
    }

    /// Rebind a view restored after a host restart
    pub fn revive(
        state: &ViewState,
        view: Arc<dyn ViewHandle>,
        services: SessionServices,
    ) -> Arc<Self> {
        tracing::info!("Reviving preview for {}", state.preview_file);
        Self::new(&state.preview_file, view, services)
    }

    pub fn location(&self) -> PathBuf {
        self.binding.lock().document.location().to_path_buf()
    }

    /// The document as of the last successful pass for the current binding
    pub fn document(&self) -> ResourceDocument {
        self.binding.lock().document.clone()
    }

    pub fn generation(&self) -> u64 {
        self.binding.lock().generation
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Observe state transitions
    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Whether `path` is the previewed document
    pub fn matches_resource(&self, path: &Path) -> bool {
        self.binding.lock().document.is_document(path)
    }

    /// State the view persists for revival
    pub fn persisted_state(&self) -> ViewState {
        ViewState {
            preview_file: self.location().to_string_lossy().to_string(),
        }
    }

    /// Resolve the bound document and push it to the view
    pub async fn refresh(&self) -> RefreshOutcome {
        let mut outcome = RefreshOutcome::Skipped;
        loop {
            if self.is_disposed() {
                return outcome;
            }
            let Some(guard) = InFlight::acquire(&self.in_flight) else {
                tracing::debug!("Refresh already in flight, skipping");
                return outcome;
            };

            let (result, generation) = self.run_pass().await;
            drop(guard);
            outcome = result;

            // A rebind that landed after the pass committed had its own
            // refresh skipped
            if self.generation() == generation {
                return outcome;
            }
        }
    }

    /// Refresh if `path` is the previewed document
    pub async fn on_document_saved(&self, path: &Path) -> Option<RefreshOutcome> {
        if !self.matches_resource(path) {
            return None;
        }
        tracing::debug!("Document saved: {}", path.display());
        Some(self.refresh().await)
    }

    /// Bind to a different document and refresh
    pub async fn update(&self, location: impl Into<PathBuf>) -> RefreshOutcome {
        let location = location.into();
        {
            let mut binding = self.binding.lock();
            binding.generation += 1;
            binding.document = ResourceDocument::new(&location);
            tracing::info!(
                "Rebound preview to {} (generation {})",
                location.display(),
                binding.generation
            );
        }
        self.refresh().await
    }

    /// Push the current display configuration without re-resolving
    pub fn push_configuration(&self) {
        if self.is_disposed() {
            return;
        }
        let config = DisplayConfig::from_store(self.services.settings.as_ref());
        self.view.post(HostMessage::Colors(config.to_payload()));
    }

    pub async fn handle_view_message(&self, message: ViewMessage) {
        match message {
            ViewMessage::Ready => {
                self.refresh().await;
            }
            ViewMessage::Info { text } => self.services.notifier.info(&text),
            ViewMessage::Error { text } => self.services.notifier.error(&text),
            ViewMessage::Trace { text } => tracing::info!(target: TRACE_TARGET, "{}", text),
        }
    }

    /// Keep `listener` until the session is disposed
    pub fn register_listener(&self, mut listener: Listener) {
        if self.is_disposed() {
            listener.release();
            return;
        }
        self.listeners.lock().push(listener);
    }

    /// Observe disposal; delivered at most once
    pub fn on_dispose(&self, observer: impl FnOnce() + Send + 'static) -> Subscription {
        self.on_dispose.subscribe(observer)
    }

    /// Release listeners, notify disposal observers, then release the view
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        tracing::info!("Disposing preview for {}", self.location().display());

        let listeners = std::mem::take(&mut *self.listeners.lock());
        for mut listener in listeners.into_iter().rev() {
            listener.release();
        }
        self.on_dispose.fire();
        self.view.release();
    }

    /// Dispatch host events until the view closes or the channel ends
    pub async fn run(self: Arc<Self>, mut events: UnboundedReceiver<SessionEvent>) {
        while let Some(event) = events.recv().await {
            match event {
                SessionEvent::DocumentSaved(path) => {
                    let session = self.clone();
                    tokio::spawn(async move {
                        session.on_document_saved(&path).await;
                    });
                }
                SessionEvent::ConfigurationChanged => self.push_configuration(),
                SessionEvent::View(message) => {
                    let session = self.clone();
                    tokio::spawn(async move {
                        session.handle_view_message(message).await;
                    });
                }
                SessionEvent::ViewClosed => break,
            }
        }
        self.dispose();
    }

    fn set_state(&self, state: SessionState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            tracing::debug!("Session {:?} -> {:?}", previous, state);
        }
    }

    /// One pass, repeated until it completes for the current binding
    async fn run_pass(&self) -> (RefreshOutcome, u64) {
        self.set_state(SessionState::Resolving);
        loop {
            let (location, generation) = {
                let binding = self.binding.lock();
                (binding.document.location().to_path_buf(), binding.generation)
            };

            let result = self.resolve(&location).await;
            if !self.commit(generation, &result) {
                tracing::info!("Discarding stale resolution of {}", location.display());
                continue;
            }

            let outcome = match result {
                Ok(document) => self.publish(&document),
                Err(e) => self.fail(e),
            };
            return (outcome, generation);
        }
    }

    async fn resolve(&self, location: &Path) -> Result<ResourceDocument, SessionError> {
        let mut document = ResourceDocument::load(location).await?;
        let mut packages = PackageResolver::new(self.services.packages.clone());
        self.services
            .resolver
            .resolve_document(&mut document, &mut packages)
            .await?;
        Ok(document)
    }

    /// Store a successful result if its binding is still current
    fn commit(&self, generation: u64, result: &Result<ResourceDocument, SessionError>) -> bool {
        let mut binding = self.binding.lock();
        if binding.generation != generation {
            return false;
        }
        if let Ok(document) = result {
            binding.document = document.clone();
        }
        true
    }

    fn publish(&self, document: &ResourceDocument) -> RefreshOutcome {
        // Disposed while the pass ran
        if self.is_disposed() {
            self.set_state(SessionState::Idle);
            return RefreshOutcome::Skipped;
        }

        let preview_file = document.location().to_string_lossy().to_string();
        let text = document.resolved_text().unwrap_or_default();
        tracing::info!(target: TRACE_TARGET, "URDF previewing: {}", preview_file);
        tracing::trace!(target: TRACE_TARGET, "{}", text);

        self.view.post(HostMessage::PreviewFile { preview_file });
        self.view.post(HostMessage::Urdf {
            urdf: text.to_string(),
        });
        self.push_configuration();
        self.set_state(SessionState::Ready);

        let unresolved = document.unresolved_packages().to_vec();
        if !unresolved.is_empty() {
            self.services
                .notifier
                .warn(&missing_packages_message(&unresolved));
        }
        RefreshOutcome::Rendered { unresolved }
    }

    fn fail(&self, error: SessionError) -> RefreshOutcome {
        tracing::error!("Preview failed: {}", error);
        self.services.notifier.error(&error.to_string());
        self.set_state(SessionState::Failed);
        RefreshOutcome::Failed(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::ChannelView;
    use async_trait::async_trait;
    use parking_lot::RwLock;
    use std::collections::HashMap;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Notify;
    use urdf_core::{ExpandError, MacroExpander, PackageMap, Passthrough, ResourceBase, keys};

    #[derive(Default)]
    struct RecordingNotifier {
        entries: Mutex<Vec<(&'static str, String)>>,
    }

    impl RecordingNotifier {
        fn entries(&self) -> Vec<(&'static str, String)> {
            self.entries.lock().clone()
        }
    }

    impl Notifier for RecordingNotifier {
        fn info(&self, text: &str) {
            self.entries.lock().push(("info", text.to_string()));
        }

        fn warn(&self, text: &str) {
            self.entries.lock().push(("warn", text.to_string()));
        }

        fn error(&self, text: &str) {
            self.entries.lock().push(("error", text.to_string()));
        }
    }

    /// Counts expansions; the first one waits until released
    #[derive(Default)]
    struct GatedExpander {
        calls: AtomicUsize,
        entered: Notify,
        release: Notify,
        fail: AtomicBool,
    }

    #[async_trait]
    impl MacroExpander for GatedExpander {
        async fn expand(&self, location: &Path, raw_text: &str) -> Result<String, ExpandError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call == 0 {
                self.entered.notify_one();
                self.release.notified().await;
            }
            if self.fail.load(Ordering::SeqCst) {
                return Err(ExpandError::Failed {
                    path: location.to_string_lossy().to_string(),
                    stderr: "undefined macro".to_string(),
                });
            }
            Ok(raw_text.to_string())
        }
    }

    struct Harness {
        session: Arc<PreviewSession>,
        view: Arc<ChannelView>,
        rx: tokio::sync::mpsc::UnboundedReceiver<HostMessage>,
        notifier: Arc<RecordingNotifier>,
        settings: Arc<RwLock<HashMap<String, String>>>,
        dir: tempfile::TempDir,
    }

    impl Harness {
        fn drain(&mut self) -> Vec<HostMessage> {
            let mut messages = Vec::new();
            while let Ok(message) = self.rx.try_recv() {
                messages.push(message);
            }
            messages
        }
    }

    fn harness(
        files: &[(&str, &str)],
        expander: Arc<dyn MacroExpander>,
        packages: PackageMap,
    ) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        for (name, text) in files {
            std::fs::write(dir.path().join(name), text).unwrap();
        }

        let (view, rx) = ChannelView::channel();
        let view = Arc::new(view);
        let notifier = Arc::new(RecordingNotifier::default());
        let settings = Arc::new(RwLock::new(HashMap::new()));
        let services = SessionServices {
            resolver: Arc::new(ResourceResolver::new(expander, ResourceBase::default())),
            packages: Arc::new(packages),
            settings: settings.clone(),
            notifier: notifier.clone(),
        };

        let location = dir.path().join(files[0].0);
        let session = PreviewSession::new(location, view.clone(), services);
        Harness {
            session,
            view,
            rx,
            notifier,
            settings,
            dir,
        }
    }

    const SINGLE_LINK: &str = r#"<robot><link name="base"/></robot>"#;

    fn single_link(expander: Arc<dyn MacroExpander>) -> Harness {
        harness(&[("robot.urdf", SINGLE_LINK)], expander, PackageMap::new())
    }

    #[tokio::test]
    async fn test_refresh_pushes_preview_urdf_then_colors() {
        let mut h = single_link(Arc::new(Passthrough));

        let RefreshOutcome::Rendered { unresolved } = h.session.refresh().await else {
            panic!("expected a rendered pass");
        };
        assert!(unresolved.is_empty());
        assert_eq!(h.session.state(), SessionState::Ready);
        assert!(!h.session.is_in_flight());

        let messages = h.drain();
        assert_eq!(messages.len(), 3);
        let preview_file = h.session.location().to_string_lossy().to_string();
        assert_eq!(messages[0], HostMessage::PreviewFile { preview_file });
        let urdf = SINGLE_LINK.to_string();
        assert_eq!(messages[1], HostMessage::Urdf { urdf });
        assert_eq!(
            messages[2],
            HostMessage::Colors(DisplayConfig::default().to_payload())
        );
        assert!(h.notifier.entries().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_refresh_collapses() {
        let expander = Arc::new(GatedExpander::default());
        let h = single_link(expander.clone());

        let first = tokio::spawn({
            let session = h.session.clone();
            async move { session.refresh().await }
        });
        expander.entered.notified().await;
        assert!(h.session.is_in_flight());
        assert_eq!(h.session.state(), SessionState::Resolving);

        assert!(h.session.refresh().await.is_skipped());
        assert!(h.session.refresh().await.is_skipped());

        expander.release.notify_one();
        let outcome = first.await.unwrap();
        assert!(matches!(outcome, RefreshOutcome::Rendered { .. }));
        assert_eq!(expander.calls.load(Ordering::SeqCst), 1);
        assert!(!h.session.is_in_flight());
    }

    #[tokio::test]
    async fn test_failed_pass_clears_flag_and_retries() {
        let expander = Arc::new(GatedExpander::default());
        expander.calls.store(1, Ordering::SeqCst);
        expander.fail.store(true, Ordering::SeqCst);
        let mut h = harness(
            &[("robot.xacro", SINGLE_LINK)],
            expander.clone(),
            PackageMap::new(),
        );

        let outcome = h.session.refresh().await;
        assert!(matches!(outcome, RefreshOutcome::Failed(SessionError::Resolve(_))));
        assert_eq!(h.session.state(), SessionState::Failed);
        assert!(!h.session.is_in_flight());
        assert!(h.drain().is_empty());

        let entries = h.notifier.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0, "error");
        assert!(entries[0].1.contains("undefined macro"));

        expander.fail.store(false, Ordering::SeqCst);
        let outcome = h.session.refresh().await;
        assert!(matches!(outcome, RefreshOutcome::Rendered { .. }));
        assert_eq!(h.session.state(), SessionState::Ready);
    }

    #[tokio::test]
    async fn test_missing_file_fails() {
        let h = single_link(Arc::new(Passthrough));
        let outcome = h.session.update(h.dir.path().join("gone.urdf")).await;

        assert!(matches!(outcome, RefreshOutcome::Failed(SessionError::Read(_))));
        assert_eq!(h.session.state(), SessionState::Failed);
    }

    #[tokio::test]
    async fn test_unresolved_packages_warn_once() {
        let text = r#"<robot name="r">
  <link name="a"><visual><geometry><mesh filename="package://foo/meshes/a.stl"/></geometry></visual></link>
  <link name="b"><visual><geometry><mesh filename="package://bar/x.stl"/></geometry></visual></link>
  <link name="c"><visual><geometry><mesh filename="package://bar/y.stl"/></geometry></visual></link>
</robot>"#;
        let mut packages = PackageMap::new();
        packages.insert("foo", "/ws/foo");
        let mut h = harness(&[("robot.urdf", text)], Arc::new(Passthrough), packages);

        let RefreshOutcome::Rendered { unresolved } = h.session.refresh().await else {
            panic!("expected a rendered pass");
        };
        assert_eq!(unresolved, ["bar".to_string()]);
        assert_eq!(
            h.notifier.entries(),
            vec![("warn", missing_packages_message(&["bar".to_string()]))]
        );

        let urdf = h
            .drain()
            .into_iter()
            .find_map(|m| match m {
                HostMessage::Urdf { urdf } => Some(urdf),
                _ => None,
            })
            .unwrap();
        assert!(urdf.contains("urdf-resource:/ws/foo/meshes/a.stl"));
        assert!(urdf.contains("package://bar/x.stl"));
        assert_eq!(
            h.session.document().unresolved_packages(),
            ["bar".to_string()]
        );
    }

    #[tokio::test]
    async fn test_rebind_during_pass_discards_stale_result() {
        let expander = Arc::new(GatedExpander::default());
        let mut h = harness(
            &[
                ("old.urdf", r#"<robot name="old"><link name="a"/></robot>"#),
                ("new.urdf", r#"<robot name="new"><link name="b"/></robot>"#),
            ],
            expander.clone(),
            PackageMap::new(),
        );
        let new_location = h.dir.path().join("new.urdf");

        let first = tokio::spawn({
            let session = h.session.clone();
            async move { session.refresh().await }
        });
        expander.entered.notified().await;

        assert!(h.session.update(&new_location).await.is_skipped());
        expander.release.notify_one();
        first.await.unwrap();

        let messages = h.drain();
        let previews: Vec<_> = messages
            .iter()
            .filter_map(|m| match m {
                HostMessage::PreviewFile { preview_file } => Some(preview_file.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(previews, vec![new_location.to_string_lossy().to_string()]);
        let urdfs: Vec<_> = messages
            .iter()
            .filter_map(|m| match m {
                HostMessage::Urdf { urdf } => Some(urdf.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(urdfs.len(), 1);
        assert!(urdfs[0].contains("new"));
        assert_eq!(expander.calls.load(Ordering::SeqCst), 2);
        assert!(h.session.matches_resource(&new_location));
        assert!(!h.session.is_in_flight());
    }

    #[tokio::test]
    async fn test_configuration_change_pushes_colors_only() {
        let expander = Arc::new(GatedExpander::default());
        expander.calls.store(1, Ordering::SeqCst);
        let mut h = single_link(expander.clone());
        h.session.refresh().await;
        h.drain();

        h.settings
            .write()
            .insert(keys::BACKGROUND_COLOR.to_string(), "#123456".to_string());
        h.session.push_configuration();

        let messages = h.drain();
        assert_eq!(messages.len(), 1);
        match &messages[0] {
            HostMessage::Colors(payload) => assert_eq!(payload.background_color, "#123456"),
            other => panic!("unexpected message {other:?}"),
        }
        assert_eq!(expander.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_save_of_other_document_is_ignored() {
        let mut h = single_link(Arc::new(Passthrough));

        let elsewhere = Path::new("/elsewhere/robot.urdf");
        assert!(h.session.on_document_saved(elsewhere).await.is_none());
        assert!(h.drain().is_empty());

        let location = h.session.location();
        assert!(h.session.on_document_saved(&location).await.is_some());
        assert_eq!(h.drain().len(), 3);
    }

    #[tokio::test]
    async fn test_view_messages() {
        let mut h = single_link(Arc::new(Passthrough));

        for message in [
            ViewMessage::info("hello"),
            ViewMessage::error("Could not render URDF due to: x"),
            ViewMessage::trace("loaded urdf"),
        ] {
            h.session.handle_view_message(message).await;
        }
        assert_eq!(
            h.notifier.entries(),
            vec![
                ("info", "hello".to_string()),
                ("error", "Could not render URDF due to: x".to_string())
            ]
        );
        assert!(h.drain().is_empty());

        h.session.handle_view_message(ViewMessage::Ready).await;
        assert_eq!(h.drain().len(), 3);
    }

    #[tokio::test]
    async fn test_dispose_releases_everything_once() {
        let h = single_link(Arc::new(Passthrough));
        let released = Arc::new(AtomicUsize::new(0));
        let notified = Arc::new(AtomicUsize::new(0));

        for name in ["save events", "settings events"] {
            let released = released.clone();
            h.session.register_listener(Listener::new(name, move || {
                released.fetch_add(1, Ordering::SeqCst);
            }));
        }
        let _kept = h.session.on_dispose({
            let notified = notified.clone();
            move || {
                notified.fetch_add(1, Ordering::SeqCst);
            }
        });
        let dropped = h.session.on_dispose({
            let notified = notified.clone();
            move || {
                notified.fetch_add(100, Ordering::SeqCst);
            }
        });
        dropped.unsubscribe();

        h.session.dispose();
        h.session.dispose();

        assert_eq!(released.load(Ordering::SeqCst), 2);
        assert_eq!(notified.load(Ordering::SeqCst), 1);
        assert!(h.view.is_released());
        assert!(h.session.refresh().await.is_skipped());
    }

    #[tokio::test]
    async fn test_dispose_during_pass_returns_to_idle() {
        let expander = Arc::new(GatedExpander::default());
        let mut h = single_link(expander.clone());

        let pass = tokio::spawn({
            let session = h.session.clone();
            async move { session.refresh().await }
        });
        expander.entered.notified().await;
        assert_eq!(h.session.state(), SessionState::Resolving);

        h.session.dispose();
        expander.release.notify_one();

        assert!(pass.await.unwrap().is_skipped());
        assert_eq!(h.session.state(), SessionState::Idle);
        assert!(!h.session.is_in_flight());
        assert!(h.drain().is_empty());
        assert!(h.notifier.entries().is_empty());
    }

    #[tokio::test]
    async fn test_revive_from_persisted_state() {
        let h = single_link(Arc::new(Passthrough));
        let state = h.session.persisted_state();
        let preview_file = state.preview_file.clone();

        let (view, mut rx) = ChannelView::channel();
        let revived = PreviewSession::revive(&state, Arc::new(view), h.session.services.clone());
        assert!(revived.matches_resource(&h.session.location()));

        revived.refresh().await;
        assert_eq!(
            rx.recv().await,
            Some(HostMessage::PreviewFile { preview_file })
        );
    }

    #[tokio::test]
    async fn test_run_loop_until_view_closed() {
        let h = single_link(Arc::new(Passthrough));
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let mut states = h.session.subscribe_state();
        let runner = tokio::spawn(h.session.clone().run(rx));

        tx.send(SessionEvent::View(ViewMessage::Ready)).unwrap();
        states.wait_for(|s| *s == SessionState::Ready).await.unwrap();

        tx.send(SessionEvent::ViewClosed).unwrap();
        runner.await.unwrap();
        assert!(h.session.is_disposed());
        assert!(h.view.is_released());
    }
}
