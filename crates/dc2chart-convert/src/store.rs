//! Source, sink and working stores
//!
//! The converter only reads and writes through these traits. The filesystem
//! implementations are the default; [`MemoryStore`] backs dry runs and tests.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::{ConvertError, Result};
use crate::source::SourceFile;

/// Where input manifests come from
pub trait SourceStore {
    /// Every source file, in a stable order
    fn list(&self) -> Result<Listing>;

    fn read(&self, path: &Path) -> Result<SourceFile>;
}

/// Where bundles and intermediate documents are written.
///
/// Paths are relative to the store root.
pub trait SinkStore {
    fn root(&self) -> &Path;

    fn exists(&self, relative: &Path) -> bool;

    fn write(&mut self, relative: &Path, content: &str) -> Result<()>;
}

/// Result of listing a source store
#[derive(Debug, Default)]
pub struct Listing {
    pub files: Vec<PathBuf>,
    /// Entries that could not be listed
    pub failures: Vec<ListFailure>,
}

#[derive(Debug, Clone)]
pub struct ListFailure {
    pub path: PathBuf,
    pub message: String,
}

// =============================================================================
// FILESYSTEM
// =============================================================================

/// Reads `.yaml`/`.yml` files from a file or a directory tree
#[derive(Debug, Clone)]
pub struct FsSource {
    input: PathBuf,
}

impl FsSource {
    pub fn new(input: impl Into<PathBuf>) -> Result<Self> {
        let input = input.into();
        if !input.exists() {
            return Err(ConvertError::InputNotFound(input));
        }
        Ok(Self { input })
    }
}

fn is_manifest(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    )
}

impl SourceStore for FsSource {
    fn list(&self) -> Result<Listing> {
        if self.input.is_file() {
            return Ok(Listing {
                files: vec![self.input.clone()],
                failures: Vec::new(),
            });
        }

        let mut listing = Listing::default();
        for entry in WalkDir::new(&self.input).follow_links(true) {
            match entry {
                Ok(entry) if entry.file_type().is_file() && is_manifest(entry.path()) => {
                    listing.files.push(entry.into_path());
                }
                Ok(_) => {}
                Err(e) => {
                    let path = e.path().unwrap_or(&self.input).to_path_buf();
                    tracing::warn!(path = %path.display(), error = %e, "cannot list entry");
                    listing.failures.push(ListFailure {
                        path,
                        message: e.to_string(),
                    });
                }
            }
        }
        listing.files.sort();
        Ok(listing)
    }

    fn read(&self, path: &Path) -> Result<SourceFile> {
        let content = fs::read_to_string(path).map_err(|e| ConvertError::Store {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Ok(SourceFile::new(path, content))
    }
}

/// Writes below a root directory, creating parents as needed
#[derive(Debug, Clone)]
pub struct FsSink {
    root: PathBuf,
}

impl FsSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl SinkStore for FsSink {
    fn root(&self) -> &Path {
        &self.root
    }

    fn exists(&self, relative: &Path) -> bool {
        self.root.join(relative).exists()
    }

    fn write(&mut self, relative: &Path, content: &str) -> Result<()> {
        let path = self.root.join(relative);
        let store_error = |e: std::io::Error| ConvertError::Store {
            path: path.clone(),
            message: e.to_string(),
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(store_error)?;
        }
        fs::write(&path, content).map_err(store_error)?;
        tracing::trace!(path = %path.display(), "wrote file");
        Ok(())
    }
}

// =============================================================================
// MEMORY
// =============================================================================

/// In-memory store keyed by relative path
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    root: PathBuf,
    files: BTreeMap<PathBuf, String>,
}

impl MemoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            files: BTreeMap::new(),
        }
    }

    /// Add a file; for memory-backed sources
    pub fn insert(&mut self, relative: impl Into<PathBuf>, content: impl Into<String>) {
        self.files.insert(relative.into(), content.into());
    }

    pub fn get(&self, relative: impl AsRef<Path>) -> Option<&str> {
        self.files.get(relative.as_ref()).map(String::as_str)
    }

    pub fn files(&self) -> impl Iterator<Item = (&PathBuf, &String)> {
        self.files.iter()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl SourceStore for MemoryStore {
    fn list(&self) -> Result<Listing> {
        Ok(Listing {
            files: self
                .files
                .keys()
                .filter(|path| is_manifest(path))
                .cloned()
                .collect(),
            failures: Vec::new(),
        })
    }

    fn read(&self, path: &Path) -> Result<SourceFile> {
        match self.files.get(path) {
            Some(content) => Ok(SourceFile::new(path, content.clone())),
            None => Err(ConvertError::Store {
                path: path.to_path_buf(),
                message: "no such file".to_string(),
            }),
        }
    }
}

impl SinkStore for MemoryStore {
    fn root(&self) -> &Path {
        &self.root
    }

    /// A path exists if it is a stored file or a prefix of one
    fn exists(&self, relative: &Path) -> bool {
        self.files.keys().any(|path| path.starts_with(relative))
    }

    fn write(&mut self, relative: &Path, content: &str) -> Result<()> {
        self.files.insert(relative.to_path_buf(), content.to_string());
        Ok(())
    }
}
