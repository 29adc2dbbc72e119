//! File watching for live previews
//!
//! Saves of the document become [`SessionEvent::DocumentSaved`]. A change to
//! the settings file reloads the shared settings and becomes
//! [`SessionEvent::ConfigurationChanged`].

use std::path::{Path, PathBuf};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc::UnboundedSender;

use urdf_core::{SharedSettings, same_file_path};

use crate::session::SessionEvent;

/// Maps file-system events to session events
pub struct EventRouter {
    settings: SharedSettings,
    settings_path: PathBuf,
    events: UnboundedSender<SessionEvent>,
}

impl EventRouter {
    pub fn new(settings: SharedSettings, events: UnboundedSender<SessionEvent>) -> Self {
        let settings_path = settings.read().path().to_path_buf();
        Self {
            settings,
            settings_path,
            events,
        }
    }

    pub fn route(&self, event: &Event) {
        if !matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
            return;
        }

        for path in &event.paths {
            let session_event = if same_file_path(path, &self.settings_path) {
                if let Err(e) = self.settings.write().reload() {
                    tracing::warn!("Keeping previous settings: {}", e);
                    continue;
                }
                SessionEvent::ConfigurationChanged
            } else {
                SessionEvent::DocumentSaved(path.clone())
            };
            // The session is gone once the receiver closes
            let _ = self.events.send(session_event);
        }
    }
}

/// Watch the directories of `document` and of the settings file
pub fn watch_files(
    document: &Path,
    settings: SharedSettings,
    events: UnboundedSender<SessionEvent>,
) -> notify::Result<RecommendedWatcher> {
    let router = EventRouter::new(settings, events);
    let settings_dir = parent_dir(&router.settings_path).to_path_buf();

    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
        Ok(event) => router.route(&event),
        Err(e) => tracing::warn!("Watcher error: {}", e),
    })?;

    let document_dir = parent_dir(document);
    watcher.watch(document_dir, RecursiveMode::NonRecursive)?;
    tracing::info!("Watching {}", document_dir.display());

    if settings_dir != document_dir {
        // The settings directory may not exist yet
        match watcher.watch(&settings_dir, RecursiveMode::NonRecursive) {
            Ok(()) => tracing::info!("Watching settings in {}", settings_dir.display()),
            Err(e) => tracing::warn!("Not watching {}: {}", settings_dir.display(), e),
        }
    }
    Ok(watcher)
}

fn parent_dir(path: &Path) -> &Path {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, DataChange, ModifyKind};
    use tokio::sync::mpsc::unbounded_channel;
    use urdf_core::{SettingsStore, create_shared_settings, keys};

    fn modified(path: &Path) -> Event {
        Event::new(EventKind::Modify(ModifyKind::Data(DataChange::Content)))
            .add_path(path.to_path_buf())
    }

    #[test]
    fn test_settings_change_reloads_and_notifies() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.ron");
        let settings = create_shared_settings(&path);
        let (tx, mut rx) = unbounded_channel();
        let router = EventRouter::new(settings.clone(), tx);

        std::fs::write(&path, "(GridRatio: \"0.5\")").unwrap();
        router.route(&modified(&path));

        assert!(matches!(rx.try_recv(), Ok(SessionEvent::ConfigurationChanged)));
        assert!(rx.try_recv().is_err());
        assert_eq!(
            settings.read().get(keys::GRID_RATIO).as_deref(),
            Some("0.5")
        );
    }

    #[test]
    fn test_unparsable_settings_send_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.ron");
        let settings = create_shared_settings(&path);
        let (tx, mut rx) = unbounded_channel();
        let router = EventRouter::new(settings.clone(), tx);

        std::fs::write(&path, "not ron {").unwrap();
        router.route(&modified(&path));

        assert!(rx.try_recv().is_err());
        assert_eq!(
            settings.read().get(keys::GRID_RATIO).as_deref(),
            Some("0.1")
        );
    }

    #[test]
    fn test_document_changes_become_saves() {
        let dir = tempfile::tempdir().unwrap();
        let settings = create_shared_settings(dir.path().join("settings.ron"));
        let (tx, mut rx) = unbounded_channel();
        let router = EventRouter::new(settings, tx);
        let document = dir.path().join("robot.urdf");

        router.route(&modified(&document));
        let created = Event::new(EventKind::Create(CreateKind::File));
        router.route(&created.add_path(document.clone()));
        let read = Event::new(EventKind::Access(AccessKind::Read));
        router.route(&read.add_path(document.clone()));

        for _ in 0..2 {
            match rx.try_recv() {
                Ok(SessionEvent::DocumentSaved(path)) => assert_eq!(path, document),
                other => panic!("unexpected {other:?}"),
            }
        }
        assert!(rx.try_recv().is_err());
    }
}
