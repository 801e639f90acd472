//! On-disk audio storage for PLEER.
//!
//! Layout of the uploads root:
//! ```text
//! {root}/
//! ├── 1700000000000.mp3        files at the root
//! ├── facts/
//! │   └── 1700000000001.ogg    one level of named directories
//! └── .incoming/               staging area for uploads in progress
//! ```

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rand::seq::IndexedRandom;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use super::naming::{validate_directory_name, FilePath, NameGenerator};
use crate::{PleerError, Result};

/// Staging directory for uploads that have not been committed yet.
pub const STAGING_DIR: &str = ".incoming";

/// Attempts at finding a free generated name before giving up.
const MAX_NAME_ATTEMPTS: usize = 16;

/// Filesystem-backed store for audio files.
#[derive(Debug, Clone)]
pub struct AudioStore {
    root: PathBuf,
    names: Arc<NameGenerator>,
}

impl AudioStore {
    /// Create a store rooted at the given directory.
    ///
    /// The root and its staging directory are created if they don't exist.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(root.join(STAGING_DIR))?;

        Ok(Self {
            root,
            names: Arc::new(NameGenerator::new()),
        })
    }

    /// Get the uploads root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn staging_path(&self) -> PathBuf {
        self.root.join(STAGING_DIR)
    }

    fn directory_path(&self, directory: Option<&str>) -> Result<PathBuf> {
        match directory {
            Some(dir) => {
                validate_directory_name(dir)?;
                Ok(self.root.join(dir))
            }
            None => Ok(self.root.clone()),
        }
    }

    /// Absolute on-disk path of a file.
    pub fn resolve(&self, path: &FilePath) -> PathBuf {
        self.root.join(path.relative_path())
    }

    /// Remove leftovers of uploads interrupted by a crash or restart.
    pub async fn purge_staging(&self) -> Result<usize> {
        let staging = self.staging_path();
        fs::create_dir_all(&staging).await?;

        let mut removed = 0;
        let mut entries = fs::read_dir(&staging).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() && fs::remove_file(entry.path()).await.is_ok() {
                removed += 1;
            }
        }

        if removed > 0 {
            warn!("Removed {} stale staged uploads", removed);
        }
        Ok(removed)
    }

    /// Create a directory (idempotent).
    pub async fn create_directory(&self, name: &str) -> Result<()> {
        let path = self.directory_path(Some(name))?;
        fs::create_dir_all(&path).await?;
        debug!("Created directory {:?}", path);
        Ok(())
    }

    /// Recursively delete a directory.
    ///
    /// Returns `false` if it did not exist.
    pub async fn delete_directory(&self, name: &str) -> Result<bool> {
        let path = self.directory_path(Some(name))?;
        if !is_directory(&path).await {
            return Ok(false);
        }
        match fs::remove_dir_all(&path).await {
            Ok(()) => {
                debug!("Deleted directory {:?}", path);
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Check whether a directory exists.
    pub async fn directory_exists(&self, name: &str) -> Result<bool> {
        let path = self.directory_path(Some(name))?;
        Ok(is_directory(&path).await)
    }

    /// Names of the directories under the root, sorted.
    ///
    /// Hidden entries and names that would not pass validation are skipped.
    pub async fn list_directories(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut entries = fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if validate_directory_name(name).is_ok() {
                    names.push(name.to_string());
                }
            }
        }

        names.sort();
        Ok(names)
    }

    async fn list_files_in(&self, directory: Option<&str>) -> Result<Vec<FilePath>> {
        let dir_path = self.directory_path(directory)?;
        if !is_directory(&dir_path).await {
            return Err(PleerError::NotFound("Directory".into()));
        }
        let mut entries = match fs::read_dir(&dir_path).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(PleerError::NotFound("Directory".into()));
            }
            Err(e) => return Err(e.into()),
        };

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if let Ok(path) = FilePath::new(directory, name) {
                    files.push(path);
                }
            }
        }

        files.sort();
        Ok(files)
    }

    /// Files directly inside a directory, or at the root for `None`.
    pub async fn list_directory_files(&self, directory: Option<&str>) -> Result<Vec<FilePath>> {
        self.list_files_in(directory).await
    }

    /// Every file in the tree (root plus one directory level), sorted by identifier.
    pub async fn list_all_files(&self) -> Result<Vec<FilePath>> {
        let mut files = self.list_files_in(None).await?;
        for dir in self.list_directories().await? {
            match self.list_files_in(Some(&dir)).await {
                Ok(mut inner) => files.append(&mut inner),
                // Removed between the two reads
                Err(PleerError::NotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }

        files.sort_by_key(|f| f.identifier());
        Ok(files)
    }

    /// Check whether a file exists.
    pub async fn file_exists(&self, path: &FilePath) -> bool {
        fs::metadata(self.resolve(path))
            .await
            .map(|m| m.is_file())
            .unwrap_or(false)
    }

    /// Size of a stored file in bytes.
    pub async fn file_size(&self, path: &FilePath) -> Result<u64> {
        match fs::metadata(self.resolve(path)).await {
            Ok(m) if m.is_file() => Ok(m.len()),
            Ok(_) => Err(PleerError::NotFound("File".into())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(PleerError::NotFound("File".into()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Find a bare file name inside any directory (one level).
    pub async fn find_in_directories(&self, name: &str) -> Result<Option<FilePath>> {
        for dir in self.list_directories().await? {
            let candidate = FilePath::new(Some(&dir), name)?;
            if self.file_exists(&candidate).await {
                return Ok(Some(candidate));
            }
        }
        Ok(None)
    }

    /// Delete a file.
    ///
    /// Returns `false` if it did not exist.
    pub async fn delete_file(&self, path: &FilePath) -> Result<bool> {
        match fs::remove_file(self.resolve(path)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Move a file into another directory (or the root), keeping its name.
    ///
    /// The target directory is created if needed. Fails with `NotFound` when
    /// the source is missing and `Conflict` when the destination exists.
    pub async fn move_file(&self, from: &FilePath, target: Option<&str>) -> Result<FilePath> {
        let to = from.with_directory(target)?;
        if &to == from {
            if !self.file_exists(from).await {
                return Err(PleerError::NotFound("File".into()));
            }
            return Ok(to);
        }

        if !self.file_exists(from).await {
            return Err(PleerError::NotFound("File".into()));
        }
        if let Some(dir) = to.directory() {
            self.create_directory(dir).await?;
        }
        if fs::try_exists(self.resolve(&to)).await? {
            return Err(PleerError::Conflict(format!(
                "A file named {} already exists in the target directory",
                to.name()
            )));
        }

        match fs::rename(self.resolve(from), self.resolve(&to)).await {
            Ok(()) => {
                debug!("Moved {} to {}", from, to);
                Ok(to)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(PleerError::NotFound("File".into()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Pick a uniformly random file from a directory.
    pub async fn random_file(&self, directory: &str) -> Result<FilePath> {
        let files = self.list_files_in(Some(directory)).await?;
        files
            .choose(&mut rand::rng())
            .cloned()
            .ok_or_else(|| PleerError::NotFound("Audio file".into()))
    }

    /// Open a new staged file for an upload.
    ///
    /// Writes are capped at `max_size` bytes.
    pub async fn stage(&self, original_name: &str, max_size: u64) -> Result<StagedFile> {
        let staging = self.staging_path();
        fs::create_dir_all(&staging).await?;

        for _ in 0..MAX_NAME_ATTEMPTS {
            let stored_name = self.names.stored_name(original_name);
            let path = staging.join(&stored_name);
            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => {
                    return Ok(StagedFile {
                        stored_name,
                        path,
                        file,
                        size: 0,
                        max_size,
                    });
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Err(PleerError::Conflict(
            "could not allocate a unique file name".into(),
        ))
    }

    /// Move a finished staged file into its directory.
    ///
    /// When the generated name is already taken there (for example after a
    /// clock change), a fresh name with the same extension is used.
    pub async fn commit(&self, staged: &StagedFile, directory: Option<&str>) -> Result<FilePath> {
        let dir_path = self.directory_path(directory)?;
        fs::create_dir_all(&dir_path).await?;

        let mut name = staged.stored_name.clone();
        for _ in 0..MAX_NAME_ATTEMPTS {
            let target = FilePath::new(directory, &name)?;
            let target_path = self.resolve(&target);
            if !fs::try_exists(&target_path).await? {
                fs::rename(&staged.path, &target_path).await?;
                return Ok(target);
            }
            name = self.names.stored_name(&staged.stored_name);
        }

        Err(PleerError::Conflict(
            "could not allocate a unique file name".into(),
        ))
    }
}

/// An upload being written into the staging area.
#[derive(Debug)]
pub struct StagedFile {
    stored_name: String,
    path: PathBuf,
    file: File,
    size: u64,
    max_size: u64,
}

impl StagedFile {
    /// Generated stored name.
    pub fn stored_name(&self) -> &str {
        &self.stored_name
    }

    /// Bytes written so far.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Append a chunk, enforcing the size limit.
    pub async fn write(&mut self, chunk: &[u8]) -> Result<()> {
        let size = self.size + chunk.len() as u64;
        if size > self.max_size {
            return Err(PleerError::Validation(format!(
                "File too large (max {}MB)",
                self.max_size / (1024 * 1024)
            )));
        }

        self.file.write_all(chunk).await?;
        self.size = size;
        Ok(())
    }

    /// Flush buffered bytes to disk.
    pub async fn finish(&mut self) -> Result<()> {
        self.file.flush().await?;
        self.file.sync_all().await?;
        Ok(())
    }

    /// Remove the staged file.
    pub async fn discard(self) {
        drop(self.file);
        if let Err(e) = fs::remove_file(&self.path).await {
            if e.kind() != io::ErrorKind::NotFound {
                warn!("Failed to remove staged upload {:?}: {}", self.path, e);
            }
        }
    }
}

/// Whether `path` exists and is a directory.
async fn is_directory(path: &Path) -> bool {
    fs::metadata(path)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false)
}
