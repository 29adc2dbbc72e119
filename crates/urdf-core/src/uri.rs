//! Renderer-addressable resource URIs

use std::path::{Path, PathBuf};

/// Base URI the view uses to fetch files from the local file system
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceBase {
    prefix: String,
}

impl Default for ResourceBase {
    fn default() -> Self {
        Self::new(Self::DEFAULT_PREFIX)
    }
}

impl ResourceBase {
    pub const DEFAULT_PREFIX: &'static str = "urdf-resource:";

    /// Create a base from a scheme prefix such as `urdf-resource:` or
    /// `https://file+.vscode-resource.vscode-cdn.net/`
    pub fn new(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        Self {
            prefix: prefix.trim_end_matches('/').to_string(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Build the URI for a package directory or file path.
    ///
    /// The leading separator of an absolute path is dropped before joining:
    /// the joiner adds exactly one `/` after the prefix, so keeping it would
    /// produce `scheme://home/...` and turn the first segment into a host.
    pub fn uri_for(&self, path: &Path) -> String {
        let normalized = normalize_path(&path.to_string_lossy());
        let relative = normalized.trim_start_matches('/');
        format!("{}/{}", self.prefix, relative)
    }

    /// Map a URI produced by [`ResourceBase::uri_for`] back to a file path
    pub fn path_for(&self, uri: &str) -> Option<PathBuf> {
        let rest = uri.strip_prefix(&self.prefix)?.strip_prefix('/')?;
        if rest.is_empty() {
            return None;
        }

        if has_drive_letter(rest) {
            Some(PathBuf::from(rest))
        } else {
            Some(PathBuf::from(format!("/{rest}")))
        }
    }
}

/// Lexically normalize a path: unify separators to `/`, drop `.` and empty
/// segments, and fold `..` into its parent.
pub fn normalize_path(path: &str) -> String {
    let unified = path.replace('\\', "/");
    let absolute = unified.starts_with('/');

    let mut parts: Vec<&str> = Vec::new();
    for segment in unified.split('/') {
        match segment {
            "" | "." => {}
            ".." => match parts.last() {
                Some(last) if *last != ".." => {
                    parts.pop();
                }
                _ if absolute => {}
                _ => parts.push(".."),
            },
            s => parts.push(s),
        }
    }

    let joined = parts.join("/");
    if absolute {
        format!("/{joined}")
    } else {
        joined
    }
}

fn has_drive_letter(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absolute_path_joins_with_single_separator() {
        let base = ResourceBase::new("vscode-webview-resource:");
        assert_eq!(
            base.uri_for(Path::new("/home/test/ros")),
            "vscode-webview-resource:/home/test/ros"
        );
    }

    #[test]
    fn test_trailing_slash_in_prefix_is_not_doubled() {
        let base = ResourceBase::new("https://file+.vscode-resource.vscode-cdn.net/");
        let uri = base.uri_for(Path::new("/home/test/ros"));
        assert_eq!(
            uri,
            "https://file+.vscode-resource.vscode-cdn.net/home/test/ros"
        );
        assert!(!uri.contains("net//"));
    }

    #[test]
    fn test_windows_separators_are_normalized() {
        let base = ResourceBase::default();
        assert_eq!(
            base.uri_for(Path::new("C:\\ros\\.\\pkg\\meshes\\..\\")),
            "urdf-resource:/C:/ros/pkg"
        );
    }

    #[test]
    fn test_path_for_inverts_uri_for() {
        let base = ResourceBase::default();
        let uri = base.uri_for(Path::new("/opt/ros/share/robot"));
        assert_eq!(
            base.path_for(&uri),
            Some(PathBuf::from("/opt/ros/share/robot"))
        );
        assert_eq!(
            base.path_for("urdf-resource:/C:/ros/pkg/a.stl"),
            Some(PathBuf::from("C:/ros/pkg/a.stl"))
        );
        assert_eq!(base.path_for("file:///x"), None);
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("/a//b/./c/../d"), "/a/b/d");
        assert_eq!(normalize_path("a/../../b"), "../b");
        assert_eq!(normalize_path("/../a"), "/a");
    }
}
