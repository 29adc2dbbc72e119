//! Package lookup
//!
//! A package lookup answers "where is package `<name>` on disk". The
//! [`PackageResolver`] fetches the full [`PackageMap`] lazily, once per
//! resolution pass, and serves every name from that snapshot.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use regex::Regex;

/// Mapping from package name to absolute directory path
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageMap {
    packages: BTreeMap<String, PathBuf>,
}

impl PackageMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a package; the first location registered for a name wins
    pub fn insert(&mut self, name: impl Into<String>, path: impl Into<PathBuf>) -> bool {
        let name = name.into();
        if self.packages.contains_key(&name) {
            return false;
        }
        self.packages.insert(name, path.into());
        true
    }

    pub fn get(&self, name: &str) -> Option<&Path> {
        self.packages.get(name).map(PathBuf::as_path)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.packages.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.packages
            .iter()
            .map(|(name, path)| (name.as_str(), path.as_path()))
    }
}

impl<N: Into<String>, P: Into<PathBuf>> FromIterator<(N, P)> for PackageMap {
    fn from_iter<T: IntoIterator<Item = (N, P)>>(iter: T) -> Self {
        let mut map = Self::new();
        for (name, path) in iter {
            map.insert(name, path);
        }
        map
    }
}

/// Errors raised while discovering packages
#[derive(Debug, Clone, thiserror::Error)]
pub enum PackageError {
    #[error("IO error while scanning {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("Package scan aborted: {0}")]
    Scan(String),
}

/// Black-box package discovery
#[async_trait]
pub trait PackageLookup: Send + Sync {
    /// Discover every package currently visible
    async fn packages(&self) -> Result<PackageMap, PackageError>;
}

#[async_trait]
impl PackageLookup for PackageMap {
    async fn packages(&self) -> Result<PackageMap, PackageError> {
        Ok(self.clone())
    }
}

/// Cached name-to-path view over a [`PackageLookup`]
pub struct PackageResolver {
    lookup: Arc<dyn PackageLookup>,
    cache: Option<PackageMap>,
}

impl PackageResolver {
    pub fn new(lookup: Arc<dyn PackageLookup>) -> Self {
        Self {
            lookup,
            cache: None,
        }
    }

    /// Drop the cached map so the next query asks the lookup again
    pub fn begin_pass(&mut self) {
        self.cache = None;
    }

    /// Resolve a package name to its directory
    ///
    /// A failing lookup is logged and treated as an empty map, so every
    /// reference in the pass ends up unresolved instead of aborting the load.
    pub async fn resolve(&mut self, name: &str) -> Option<PathBuf> {
        self.map().await.get(name).map(Path::to_path_buf)
    }

    /// The map for the current pass, fetched on first use
    pub async fn map(&mut self) -> &PackageMap {
        if self.cache.is_none() {
            let map = match self.lookup.packages().await {
                Ok(map) => {
                    tracing::debug!("Discovered {} packages", map.len());
                    map
                }
                Err(e) => {
                    tracing::warn!("Package lookup failed: {}", e);
                    PackageMap::new()
                }
            };
            self.cache = Some(map);
        }
        self.cache.get_or_insert_with(PackageMap::new)
    }
}

/// Finds packages by scanning directories for `package.xml` manifests
#[derive(Debug, Clone, Default)]
pub struct WorkspacePackageLookup {
    roots: Vec<PathBuf>,
}

impl WorkspacePackageLookup {
    /// Environment variable listing extra package search roots
    pub const PACKAGE_PATH_VAR: &'static str = "ROS_PACKAGE_PATH";

    pub fn new(roots: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            roots: roots.into_iter().collect(),
        }
    }

    /// Workspace roots followed by the entries of `ROS_PACKAGE_PATH`
    pub fn with_env(roots: impl IntoIterator<Item = PathBuf>) -> Self {
        let mut lookup = Self::new(roots);
        if let Some(paths) = std::env::var_os(Self::PACKAGE_PATH_VAR) {
            lookup.roots.extend(std::env::split_paths(&paths));
        }
        lookup
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Scan all roots synchronously
    pub fn scan(&self) -> Result<PackageMap, PackageError> {
        let mut map = PackageMap::new();
        let mut visited = HashSet::new();
        for root in &self.roots {
            if root.is_dir() {
                scan_dir(root, &mut map, &mut visited)?;
            } else {
                tracing::debug!("Skipping missing package root {:?}", root);
            }
        }
        Ok(map)
    }
}

#[async_trait]
impl PackageLookup for WorkspacePackageLookup {
    async fn packages(&self) -> Result<PackageMap, PackageError> {
        let lookup = self.clone();
        tokio::task::spawn_blocking(move || lookup.scan())
            .await
            .map_err(|e| PackageError::Scan(e.to_string()))?
    }
}

/// Walks `dir` depth-first. `visited` holds canonical paths so a symlinked
/// directory that points back up the tree is entered only once.
fn scan_dir(
    dir: &Path,
    map: &mut PackageMap,
    visited: &mut HashSet<PathBuf>,
) -> Result<(), PackageError> {
    let canonical = dir.canonicalize().map_err(|e| PackageError::Io {
        path: dir.to_string_lossy().to_string(),
        reason: e.to_string(),
    })?;
    if !visited.insert(canonical) {
        tracing::debug!("Skipping already scanned directory {:?}", dir);
        return Ok(());
    }

    let manifest = dir.join("package.xml");
    if manifest.is_file() {
        let fallback = || dir.file_name().and_then(|n| n.to_str()).map(String::from);
        if let Some(name) = read_manifest_name(&manifest).or_else(fallback) {
            if !map.insert(name.clone(), dir) {
                tracing::debug!("Ignoring duplicate package {} at {:?}", name, dir);
            }
        }
        // Packages do not nest
        return Ok(());
    }

    let entries = std::fs::read_dir(dir).map_err(|e| PackageError::Io {
        path: dir.to_string_lossy().to_string(),
        reason: e.to_string(),
    })?;

    let mut children: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_dir() && !is_hidden(path))
        .collect();
    children.sort();

    for child in children {
        if let Err(e) = scan_dir(&child, map, visited) {
            tracing::warn!("{}", e);
        }
    }
    Ok(())
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.'))
}

fn read_manifest_name(manifest: &Path) -> Option<String> {
    static NAME: OnceLock<Regex> = OnceLock::new();
    let pattern = NAME.get_or_init(|| {
        Regex::new(r"<name>\s*([^<\s]+)\s*</name>").expect("manifest name pattern is valid")
    });

    let content = std::fs::read_to_string(manifest).ok()?;
    pattern.captures(&content).map(|caps| caps[1].to_string())
}
