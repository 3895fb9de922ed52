//! Temporary files of a render pass and where they ended up.
//!
//! Every file the renderer writes goes into the [`ScratchSpace`] under a
//! random UUID name. The [`LocationMap`] remembers which key each file
//! belongs to; when the map is dropped, every file that was not promoted to
//! a user-chosen path is deleted.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{MailError, Result};

/// File name of the scratch HTML document handed to the HTML renderer.
const HTML_SCRATCH_NAME: &str = "message-chunk.html";

/// Directory for render temp files.
#[derive(Debug, Clone)]
pub struct ScratchSpace {
    dir: PathBuf,
}

impl ScratchSpace {
    /// Use (and create) `dir` for temp files.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| MailError::io(&dir, e))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// A fresh collision-free path, optionally with an extension.
    pub fn unique_path(&self, extension: Option<&str>) -> PathBuf {
        let name = Uuid::new_v4().simple().to_string();
        match extension {
            Some(ext) => self.dir.join(format!("{name}.{ext}")),
            None => self.dir.join(name),
        }
    }

    /// Write `bytes` to a fresh unique path and return it.
    pub fn write_unique(&self, bytes: &[u8], extension: Option<&str>) -> Result<PathBuf> {
        let path = self.unique_path(extension);
        fs::write(&path, bytes).map_err(|e| MailError::io(&path, e))?;
        Ok(path)
    }

    /// The fixed-name scratch HTML file.
    pub fn html_path(&self) -> PathBuf {
        self.dir.join(HTML_SCRATCH_NAME)
    }

    /// Remove the directory if nothing is left in it.
    pub fn remove_if_empty(&self) {
        if let Err(e) = fs::remove_dir(&self.dir) {
            debug!(dir = %self.dir.display(), error = %e, "Scratch directory kept");
        }
    }
}

/// Deletes a file when dropped.
#[derive(Debug)]
pub struct ScratchFile {
    path: PathBuf,
}

impl ScratchFile {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        remove_quietly(&self.path);
    }
}

/// Key → temp path map for one message's render pass.
#[derive(Debug, Default)]
pub struct LocationMap {
    entries: HashMap<String, PathBuf>,
    kept: HashSet<PathBuf>,
}

impl LocationMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track `path` under `key`. A previous file under the same key is deleted.
    pub fn insert(&mut self, key: impl Into<String>, path: PathBuf) {
        if let Some(old) = self.entries.insert(key.into(), path.clone()) {
            if old != path {
                remove_quietly(&old);
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&Path> {
        self.entries.get(key).map(PathBuf::as_path)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Move the file tracked under `key` to `destination` and keep it.
    ///
    /// Falls back to copy + delete when a rename crosses filesystems.
    pub fn promote(&mut self, key: &str, destination: &Path) -> Result<PathBuf> {
        let source = self
            .entries
            .remove(key)
            .ok_or_else(|| MailError::Resolution(key.to_string()))?;
        if let Err(e) = move_file(&source, destination) {
            // Still ours to clean up.
            self.entries.insert(key.to_string(), source);
            return Err(e);
        }
        debug!(key, to = %destination.display(), "Promoted temp file");
        self.kept.insert(destination.to_path_buf());
        Ok(destination.to_path_buf())
    }

    /// Delete the file tracked under `key` now.
    pub fn discard(&mut self, key: &str) {
        if let Some(path) = self.entries.remove(key) {
            remove_quietly(&path);
        }
    }

    /// Delete every tracked file that was not promoted.
    pub fn cleanup(&mut self) {
        for (key, path) in self.entries.drain() {
            if self.kept.contains(&path) {
                continue;
            }
            debug!(key = %key, path = %path.display(), "Removing temp file");
            remove_quietly(&path);
        }
    }
}

impl Drop for LocationMap {
    fn drop(&mut self) {
        self.cleanup();
    }
}

/// Rename `from` to `to`, copying across filesystems when needed.
pub fn move_file(from: &Path, to: &Path) -> Result<()> {
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }
    fs::copy(from, to).map_err(|e| MailError::io(to, e))?;
    fs::remove_file(from).map_err(|e| MailError::io(from, e))?;
    Ok(())
}

fn remove_quietly(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove temp file"),
    }
}
