//! Filesystem collaborator
//!
//! The engine only checks, reads and writes through [`FileSystem`]. Paths
//! handed to it are project-relative; implementations decide where the
//! project root lives.

use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Path, PathBuf};

pub trait FileSystem {
    fn exists(&self, path: &Path) -> bool;

    /// File content, or `None` when the file does not exist
    fn read(&self, path: &Path) -> io::Result<Option<Vec<u8>>>;

    fn write(&mut self, path: &Path, bytes: &[u8]) -> io::Result<()>;

    fn mkdir_all(&mut self, path: &Path) -> io::Result<()>;
}

/// Disk-backed filesystem rooted at the output directory
#[derive(Debug, Clone)]
pub struct LocalFs {
    root: PathBuf,
    dry_run: bool,
}

impl LocalFs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            dry_run: false,
        }
    }

    /// Inspect and read the real tree but never touch it
    pub fn dry_run(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            dry_run: true,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn full(&self, path: &Path) -> PathBuf {
        self.root.join(path)
    }
}

impl FileSystem for LocalFs {
    fn exists(&self, path: &Path) -> bool {
        self.full(path).exists()
    }

    fn read(&self, path: &Path) -> io::Result<Option<Vec<u8>>> {
        match std::fs::read(self.full(path)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io::Error::new(
                e.kind(),
                format!("read {} failed: {}", path.display(), e),
            )),
        }
    }

    fn write(&mut self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        let full = self.full(path);
        if self.dry_run {
            tracing::debug!(path = %full.display(), bytes = bytes.len(), "dry run: skipping write");
            return Ok(());
        }
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&full, bytes).map_err(|e| {
            io::Error::new(e.kind(), format!("write {} failed: {}", full.display(), e))
        })
    }

    fn mkdir_all(&mut self, path: &Path) -> io::Result<()> {
        let full = self.full(path);
        if self.dry_run {
            tracing::debug!(path = %full.display(), "dry run: skipping mkdir");
            return Ok(());
        }
        std::fs::create_dir_all(&full).map_err(|e| {
            io::Error::new(
                e.kind(),
                format!("create directory {} failed: {}", full.display(), e),
            )
        })
    }
}

/// In-memory filesystem
#[derive(Debug, Clone, Default)]
pub struct MemoryFs {
    files: BTreeMap<PathBuf, Vec<u8>>,
    dirs: BTreeSet<PathBuf>,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a file (and its parent directories)
    pub fn with_file(mut self, path: impl AsRef<Path>, content: impl AsRef<[u8]>) -> Self {
        self.insert(path.as_ref(), content.as_ref());
        self
    }

    pub fn with_dir(mut self, path: impl AsRef<Path>) -> Self {
        self.add_dirs(path.as_ref());
        self
    }

    /// File content as UTF-8, if present
    pub fn get(&self, path: impl AsRef<Path>) -> Option<&str> {
        self.files
            .get(path.as_ref())
            .and_then(|b| std::str::from_utf8(b).ok())
    }

    pub fn files(&self) -> impl Iterator<Item = &Path> {
        self.files.keys().map(PathBuf::as_path)
    }

    fn add_dirs(&mut self, path: &Path) {
        for ancestor in path.ancestors() {
            if ancestor.as_os_str().is_empty() {
                break;
            }
            self.dirs.insert(ancestor.to_path_buf());
        }
    }

    fn insert(&mut self, path: &Path, bytes: &[u8]) {
        if let Some(parent) = path.parent() {
            self.add_dirs(parent);
        }
        self.files.insert(path.to_path_buf(), bytes.to_vec());
    }
}

impl FileSystem for MemoryFs {
    fn exists(&self, path: &Path) -> bool {
        self.files.contains_key(path) || self.dirs.contains(path)
    }

    fn read(&self, path: &Path) -> io::Result<Option<Vec<u8>>> {
        Ok(self.files.get(path).cloned())
    }

    fn write(&mut self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        if self.dirs.contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                format!("{} is a directory", path.display()),
            ));
        }
        self.insert(path, bytes);
        Ok(())
    }

    fn mkdir_all(&mut self, path: &Path) -> io::Result<()> {
        if self.files.contains_key(path) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} is a file", path.display()),
            ));
        }
        self.add_dirs(path);
        Ok(())
    }
}
