//! Resource resolution
//!
//! Expands the raw document and rewrites every `package://<name>` reference
//! whose package is known into a renderer-addressable URI. Resolution runs in
//! three steps over immutable text:
//!
//! 1. collect the distinct package names in order of first appearance
//! 2. resolve each name once against the pass's package map
//! 3. rewrite all references in a single replacement pass
//!
//! Unknown packages are a soft failure: their references stay as written and
//! the names are reported in [`Resolution::unresolved_packages`].

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, OnceLock};

use regex::{Captures, Regex};

use crate::document::ResourceDocument;
use crate::package::PackageResolver;
use crate::uri::ResourceBase;
use crate::xacro::{ExpandError, MacroExpander};

/// Output of a successful resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub resolved_text: String,
    /// Distinct unknown package names, in order of first appearance
    pub unresolved_packages: Vec<String>,
}

impl Resolution {
    pub fn is_complete(&self) -> bool {
        self.unresolved_packages.is_empty()
    }
}

/// Errors that abort a resolution attempt
#[derive(Debug, Clone, thiserror::Error)]
pub enum ResolveError {
    #[error(transparent)]
    Expand(#[from] ExpandError),
}

/// Turns raw documents into fully addressable scene descriptions
pub struct ResourceResolver {
    expander: Arc<dyn MacroExpander>,
    base: ResourceBase,
}

impl ResourceResolver {
    pub fn new(expander: Arc<dyn MacroExpander>, base: ResourceBase) -> Self {
        Self { expander, base }
    }

    pub fn base(&self) -> &ResourceBase {
        &self.base
    }

    /// Resolve `raw_text` read from `location`
    pub async fn resolve(
        &self,
        raw_text: &str,
        location: &Path,
        packages: &mut PackageResolver,
    ) -> Result<Resolution, ResolveError> {
        let expanded = self.expander.expand(location, raw_text).await?;

        let names = package_names(&expanded);
        if names.is_empty() {
            return Ok(Resolution {
                resolved_text: expanded,
                unresolved_packages: Vec::new(),
            });
        }

        packages.begin_pass();

        let mut replacements: HashMap<String, String> = HashMap::new();
        let mut unresolved = Vec::new();
        for name in names {
            match packages.resolve(&name).await {
                Some(path) => {
                    let uri = self.base.uri_for(&path);
                    tracing::debug!("package://{} -> {}", name, uri);
                    replacements.insert(name, uri);
                }
                None => {
                    tracing::warn!("Package {} not found in workspace.", name);
                    unresolved.push(name);
                }
            }
        }

        Ok(Resolution {
            resolved_text: rewrite_references(&expanded, &replacements),
            unresolved_packages: unresolved,
        })
    }

    /// Resolve a document in place, recording its resolved text and
    /// unresolved packages
    pub async fn resolve_document(
        &self,
        document: &mut ResourceDocument,
        packages: &mut PackageResolver,
    ) -> Result<(), ResolveError> {
        let resolution = self
            .resolve(document.raw_text(), document.location(), packages)
            .await?;
        document.apply_resolution(resolution);
        Ok(())
    }
}

fn reference_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"package://([^/\s"'<>]+)/"#).expect("package reference pattern is valid")
    })
}

/// Distinct package names referenced by `text`, in order of first appearance
pub fn package_names(text: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for caps in reference_pattern().captures_iter(text) {
        let name = &caps[1];
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

fn rewrite_references(text: &str, replacements: &HashMap<String, String>) -> String {
    if replacements.is_empty() {
        return text.to_string();
    }

    reference_pattern()
        .replace_all(text, |caps: &Captures| match replacements.get(&caps[1]) {
            Some(uri) => format!("{uri}/"),
            None => caps[0].to_string(),
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::PackageMap;
    use crate::xacro::Passthrough;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    struct FailingExpander;

    #[async_trait]
    impl MacroExpander for FailingExpander {
        async fn expand(&self, _location: &Path, _raw: &str) -> Result<String, ExpandError> {
            Err(ExpandError::Other("unknown macro".to_string()))
        }
    }

    /// Formatted log output shared with the test
    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn resolver() -> ResourceResolver {
        ResourceResolver::new(
            Arc::new(Passthrough),
            ResourceBase::new("vscode-webview-resource:"),
        )
    }

    fn packages(entries: &[(&str, &str)]) -> PackageResolver {
        let map: PackageMap = entries.iter().copied().collect();
        PackageResolver::new(Arc::new(map))
    }

    #[tokio::test]
    async fn test_every_occurrence_of_known_package_is_rewritten() {
        let text = r#"<robot name="r">
  <link name="a"><visual><geometry><mesh filename="package://foo/meshes/a.dae"/></geometry></visual></link>
  <link name="b"><visual><geometry><mesh filename="package://foo/meshes/b.dae"/></geometry></visual></link>
</robot>"#;
        let mut packages = packages(&[("foo", "/ws/foo")]);

        let resolution = resolver()
            .resolve(text, Path::new("r.urdf"), &mut packages)
            .await
            .unwrap();

        assert!(resolution.is_complete());
        assert!(!resolution.resolved_text.contains("package://"));
        let resolved = &resolution.resolved_text;
        assert!(resolved.contains(r#""vscode-webview-resource:/ws/foo/meshes/a.dae""#));
        assert!(resolved.contains(r#""vscode-webview-resource:/ws/foo/meshes/b.dae""#));
    }

    #[tokio::test]
    async fn test_unknown_package_is_reported_once_and_left_untouched() {
        let text = r#"<mesh filename="package://bar/x.dae"/>
<mesh filename="package://bar/y.dae"/>
<mesh filename="package://bar/x.dae"/>"#;
        let mut packages = packages(&[]);

        let resolution = resolver()
            .resolve(text, Path::new("r.urdf"), &mut packages)
            .await
            .unwrap();

        assert_eq!(resolution.resolved_text, text);
        assert_eq!(resolution.unresolved_packages, vec!["bar".to_string()]);
    }

    #[tokio::test]
    async fn test_each_missing_package_is_logged_once_per_attempt() {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let text = "package://bar/a.stl package://baz/b.stl package://bar/a.stl";
        let resolver = resolver();
        let mut packages = packages(&[]);
        for _ in 0..2 {
            let resolution = resolver
                .resolve(text, Path::new("r.urdf"), &mut packages)
                .await
                .unwrap();
            assert_eq!(resolution.unresolved_packages, vec!["bar", "baz"]);
        }

        let output = String::from_utf8(logs.0.lock().clone()).unwrap();
        assert_eq!(output.matches("Package bar not found").count(), 2);
        assert_eq!(output.matches("Package baz not found").count(), 2);
    }

    #[tokio::test]
    async fn test_mixed_known_and_unknown_packages() {
        let text =
            "package://bar/x.stl package://foo/y.stl package://baz/z.stl package://bar/w.stl";
        let mut packages = packages(&[("foo", "/ws/foo")]);

        let resolution = resolver()
            .resolve(text, Path::new("r.urdf"), &mut packages)
            .await
            .unwrap();

        assert_eq!(
            resolution.resolved_text,
            "package://bar/x.stl vscode-webview-resource:/ws/foo/y.stl package://baz/z.stl package://bar/w.stl"
        );
        assert_eq!(resolution.unresolved_packages, vec!["bar", "baz"]);
    }

    #[tokio::test]
    async fn test_package_name_prefix_does_not_bleed_into_longer_name() {
        let text = "package://foo/a.stl package://foo_description/b.stl";
        let mut packages = packages(&[("foo", "/ws/foo"), ("foo_description", "/ws/desc")]);

        let resolution = resolver()
            .resolve(text, Path::new("r.urdf"), &mut packages)
            .await
            .unwrap();

        assert_eq!(
            resolution.resolved_text,
            "vscode-webview-resource:/ws/foo/a.stl vscode-webview-resource:/ws/desc/b.stl"
        );
    }

    #[tokio::test]
    async fn test_document_without_references_is_unchanged() {
        let text = r#"<robot><link name="base"/></robot>"#;
        let mut packages = packages(&[]);

        let resolution = resolver()
            .resolve(text, Path::new("r.urdf"), &mut packages)
            .await
            .unwrap();

        assert_eq!(resolution.resolved_text, text);
        assert!(resolution.unresolved_packages.is_empty());
    }

    #[tokio::test]
    async fn test_expansion_failure_is_fatal() {
        let resolver = ResourceResolver::new(Arc::new(FailingExpander), ResourceBase::default());
        let mut packages = packages(&[]);

        let result = resolver
            .resolve("<robot/>", Path::new("r.xacro"), &mut packages)
            .await;

        assert!(matches!(result, Err(ResolveError::Expand(_))));
    }

    #[tokio::test]
    async fn test_resolve_document_records_results() {
        let mut document = ResourceDocument::with_text("r.urdf", "package://nope/a.stl");
        let mut packages = packages(&[]);

        resolver()
            .resolve_document(&mut document, &mut packages)
            .await
            .unwrap();

        assert_eq!(document.resolved_text(), Some("package://nope/a.stl"));
        assert_eq!(document.unresolved_packages(), ["nope".to_string()]);
    }

    #[test]
    fn test_package_names_in_order() {
        let names = package_names("package://b/x package://a/y package://b/z package:///bad");
        assert_eq!(names, vec!["b", "a"]);
    }
}
