//! Asset lookup by logical name.
//!
//! Names are `/`-separated relative paths such as `shaders/SimpleVertex.wgsl`
//! or `textures/tile_floor.png`. Every read is synchronous and returns the
//! whole file.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::SetupError;

/// Source of raw asset bytes.
pub trait AssetSource {
    /// Reads the named asset fully into memory.
    ///
    /// Fails with [`SetupError::AssetNotFound`] when the name cannot be resolved
    /// and [`SetupError::AssetRead`] when it resolves but cannot be read.
    fn load(&self, name: &str) -> Result<Vec<u8>, SetupError>;
}

/// Assets read from a directory on disk.
#[derive(Debug, Clone)]
pub struct AssetDir {
    root: PathBuf,
}

impl AssetDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Maps a logical name to a path under the root.
    ///
    /// Absolute names and `..` components never resolve.
    pub fn resolve(&self, name: &str) -> Option<PathBuf> {
        let mut path = self.root.clone();
        for part in name.split('/') {
            match part {
                "" | "." => continue,
                ".." => return None,
                p if Path::new(p).is_absolute() => return None,
                p => path.push(p),
            }
        }
        Some(path)
    }
}

impl AssetSource for AssetDir {
    fn load(&self, name: &str) -> Result<Vec<u8>, SetupError> {
        let not_found = |path: PathBuf| SetupError::AssetNotFound {
            name: name.to_owned(),
            path,
        };

        let path = self.resolve(name).ok_or_else(|| not_found(self.root.clone()))?;
        match std::fs::read(&path) {
            Ok(bytes) => {
                log::debug!("loaded asset `{name}` ({} bytes)", bytes.len());
                Ok(bytes)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(not_found(path)),
            Err(source) => Err(SetupError::AssetRead {
                name: name.to_owned(),
                path,
                source,
            }),
        }
    }
}

/// Assets held in memory, e.g. embedded with `include_bytes!`.
#[derive(Debug, Clone, Default)]
pub struct MemoryAssets {
    entries: HashMap<String, Vec<u8>>,
}

impl MemoryAssets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> &mut Self {
        self.entries.insert(name.into(), bytes.into());
        self
    }

    pub fn with(mut self, name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(name, bytes);
        self
    }
}

impl AssetSource for MemoryAssets {
    fn load(&self, name: &str) -> Result<Vec<u8>, SetupError> {
        self.entries
            .get(name)
            .cloned()
            .ok_or_else(|| SetupError::AssetNotFound {
                name: name.to_owned(),
                path: PathBuf::from(name),
            })
    }
}
