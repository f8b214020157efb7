//! Fixture persistence.
//!
//! Captured bodies go under the saving directory at a collision-free path;
//! replacement fixtures are read from the rewriting directory by exact
//! relative path and are never written by the engine.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::info;

pub struct FixtureStore {
    saving_dir: PathBuf,
    rewriting_dir: PathBuf,
}

impl FixtureStore {
    pub fn new(saving_dir: impl Into<PathBuf>, rewriting_dir: impl Into<PathBuf>) -> Self {
        Self {
            saving_dir: saving_dir.into(),
            rewriting_dir: rewriting_dir.into(),
        }
    }

    /// Resolve a path under the saving directory that does not exist yet.
    ///
    /// `name.ext` probes as `name1.ext`, `name2.ext`, ... until a free slot
    /// is found. Parent directories are created. There is no atomic
    /// reservation: the path is only guaranteed free at the moment of the
    /// probe, which is fine for the engine's single-writer usage.
    pub fn free_path(&self, relative: &str) -> io::Result<PathBuf> {
        let target = self.saving_dir.join(relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }

        let stem = target
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let extension = target.extension().map(|e| e.to_string_lossy().into_owned());

        let mut counter: u32 = 1;
        loop {
            let file_name = match &extension {
                Some(ext) => format!("{stem}{counter}.{ext}"),
                None => format!("{stem}{counter}"),
            };
            let candidate = target.with_file_name(file_name);
            if !candidate.exists() {
                return Ok(candidate);
            }
            counter += 1;
        }
    }

    /// Capture `content` under the saving directory, returning the path written.
    pub fn save(&self, relative: &str, content: &str) -> io::Result<PathBuf> {
        let path = self.free_path(relative)?;
        fs::write(&path, content)?;
        info!("captured content to {}", path.display());
        Ok(path)
    }

    /// Read a replacement fixture from the rewriting directory.
    pub fn read(&self, relative: &str) -> io::Result<String> {
        fs::read_to_string(self.rewriting_dir.join(relative))
    }

    pub fn rewriting_path(&self, relative: &str) -> PathBuf {
        self.rewriting_dir.join(relative)
    }

    pub fn saving_dir(&self) -> &Path {
        &self.saving_dir
    }
}
