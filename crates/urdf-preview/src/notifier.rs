//! User-visible notifications

/// Host target for the preview's diagnostic output channel
pub const TRACE_TARGET: &str = "urdf_preview::trace";

/// Popup notifications shown by the host
pub trait Notifier: Send + Sync {
    fn info(&self, text: &str);
    fn warn(&self, text: &str);
    fn error(&self, text: &str);
}

/// Notifier for hosts without popups: everything goes to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn info(&self, text: &str) {
        tracing::info!("{}", text);
    }

    fn warn(&self, text: &str) {
        tracing::warn!("{}", text);
    }

    fn error(&self, text: &str) {
        tracing::error!("{}", text);
    }
}

const OUTSIDE_WORKSPACE_NOTE: &str =
    "NOTE: This version of the URDF Renderer will not look for packages outside the workspace.";

/// Single warning listing every package a load could not find
pub fn missing_packages_message(packages: &[String]) -> String {
    format!(
        "The following packages were not found in the workspace:\n{}\n\n{}",
        packages.join("\n"),
        OUTSIDE_WORKSPACE_NOTE
    )
}
