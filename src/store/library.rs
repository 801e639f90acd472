//! High-level audio library operations.
//!
//! Combines the on-disk [`AudioStore`] with the metadata index and enforces
//! the upload limits.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use super::metadata::{AudioFileRepository, NewAudioFile};
use super::naming::{validate_directory_name, FilePath};
use super::storage::{AudioStore, StagedFile};
use super::{DEFAULT_MAX_FILES, DEFAULT_MAX_FILE_SIZE};
use crate::config::StorageConfig;
use crate::db::Database;
use crate::{PleerError, Result};

/// Limits applied to a single upload request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadLimits {
    /// Maximum size of one file in bytes.
    pub max_file_size: u64,
    /// Maximum number of files per request.
    pub max_files: usize,
    /// Reject anything that is not `audio/*`.
    pub audio_only: bool,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            max_files: DEFAULT_MAX_FILES,
            audio_only: true,
        }
    }
}

impl From<&StorageConfig> for UploadLimits {
    fn from(config: &StorageConfig) -> Self {
        Self {
            max_file_size: config.max_file_size_bytes(),
            max_files: config.max_files,
            audio_only: config.audio_only,
        }
    }
}

/// A committed upload.
#[derive(Debug, Clone)]
pub struct UploadedAudio {
    /// Where the file was stored.
    pub path: FilePath,
    /// Original file name.
    pub original_name: String,
    /// Size in bytes.
    pub size: u64,
    /// Accepted MIME type.
    pub mime_type: String,
}

/// A randomly picked track.
#[derive(Debug, Clone)]
pub struct Track {
    /// Location of the file.
    pub path: FilePath,
    /// Original upload name, or the stored name when unknown.
    pub display_name: String,
}

struct PendingFile {
    staged: StagedFile,
    original_name: String,
    mime_type: String,
}

/// Files of one upload request, staged until the request is complete.
///
/// Nothing becomes visible in the library until
/// [`AudioLibrary::finish_upload`] succeeds; [`UploadBatch::abort`] removes
/// everything written so far.
pub struct UploadBatch {
    store: AudioStore,
    limits: UploadLimits,
    directory: Option<String>,
    current: Option<PendingFile>,
    finished: Vec<PendingFile>,
}

impl UploadBatch {
    /// Set the target directory (empty for the root).
    pub fn set_directory(&mut self, directory: &str) -> Result<()> {
        let directory = directory.trim();
        if directory.is_empty() {
            self.directory = None;
        } else {
            validate_directory_name(directory)?;
            self.directory = Some(directory.to_string());
        }
        Ok(())
    }

    /// Target directory.
    pub fn directory(&self) -> Option<&str> {
        self.directory.as_deref()
    }

    /// Number of files started so far.
    pub fn file_count(&self) -> usize {
        self.finished.len() + usize::from(self.current.is_some())
    }

    /// Start a new file.
    pub async fn begin_file(&mut self, original_name: &str, content_type: Option<&str>) -> Result<()> {
        self.end_file().await?;

        if self.finished.len() >= self.limits.max_files {
            return Err(PleerError::Validation(format!(
                "Too many files (max {})",
                self.limits.max_files
            )));
        }

        let original_name = base_name(original_name);
        let mime_type = detect_mime_type(&original_name, content_type);
        if self.limits.audio_only && !mime_type.starts_with("audio/") {
            return Err(PleerError::Validation(
                "Only audio files are allowed".into(),
            ));
        }

        let staged = self
            .store
            .stage(&original_name, self.limits.max_file_size)
            .await?;
        self.current = Some(PendingFile {
            staged,
            original_name,
            mime_type,
        });
        Ok(())
    }

    /// Append bytes to the current file.
    pub async fn write(&mut self, chunk: &[u8]) -> Result<()> {
        let current = self
            .current
            .as_mut()
            .ok_or_else(|| PleerError::Validation("No file uploaded".into()))?;
        current.staged.write(chunk).await
    }

    /// Finish the current file, if any.
    pub async fn end_file(&mut self) -> Result<()> {
        if let Some(mut current) = self.current.take() {
            if let Err(e) = current.staged.finish().await {
                current.staged.discard().await;
                return Err(e);
            }
            self.finished.push(current);
        }
        Ok(())
    }

    /// Remove every staged file of this request.
    pub async fn abort(self) {
        if let Some(current) = self.current {
            current.staged.discard().await;
        }
        for file in self.finished {
            file.staged.discard().await;
        }
    }
}

/// Original name without any client-side path components.
fn base_name(original_name: &str) -> String {
    original_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim()
        .to_string()
}

/// MIME type from the declared content type, falling back to the file name.
fn detect_mime_type(original_name: &str, content_type: Option<&str>) -> String {
    match content_type.map(str::trim) {
        Some(ct) if !ct.is_empty() && ct != "application/octet-stream" => ct.to_ascii_lowercase(),
        _ => mime_guess::from_path(original_name)
            .first_or_octet_stream()
            .essence_str()
            .to_string(),
    }
}

/// Audio library service.
#[derive(Clone)]
pub struct AudioLibrary {
    store: AudioStore,
    db: Arc<Database>,
    limits: UploadLimits,
}

impl AudioLibrary {
    /// Create a new library.
    pub fn new(store: AudioStore, db: Arc<Database>, limits: UploadLimits) -> Self {
        Self { store, db, limits }
    }

    /// Open the library described by the storage configuration.
    pub async fn open(config: &StorageConfig, db: Arc<Database>) -> Result<Self> {
        let store = AudioStore::new(&config.uploads_path)?;
        store.purge_staging().await?;
        info!("Audio library at {:?}", store.root());

        Ok(Self::new(store, db, UploadLimits::from(config)))
    }

    /// Underlying store.
    pub fn store(&self) -> &AudioStore {
        &self.store
    }

    /// Metadata database.
    pub fn db(&self) -> &Database {
        &self.db
    }

    /// Upload limits.
    pub fn limits(&self) -> UploadLimits {
        self.limits
    }

    fn metadata(&self) -> AudioFileRepository<'_> {
        AudioFileRepository::new(self.db.pool())
    }

    /// Create a directory (idempotent).
    pub async fn create_directory(&self, name: &str) -> Result<()> {
        self.store.create_directory(name).await
    }

    /// Recursively delete a directory and its metadata.
    ///
    /// Returns `false` if it was already absent.
    pub async fn delete_directory(&self, name: &str) -> Result<bool> {
        let removed = self.store.delete_directory(name).await?;
        if let Err(e) = self.metadata().delete_directory(name).await {
            warn!("Failed to drop metadata of directory {}: {}", name, e);
        }
        Ok(removed)
    }

    /// Directory names, sorted.
    pub async fn list_directories(&self) -> Result<Vec<String>> {
        self.store.list_directories().await
    }

    /// File identifiers of one directory, or of the whole tree for `None`.
    pub async fn list_files(&self, directory: Option<&str>) -> Result<Vec<String>> {
        let files = match directory {
            Some(dir) => {
                validate_directory_name(dir)?;
                self.store.list_directory_files(Some(dir)).await?
            }
            None => self.store.list_all_files().await?,
        };

        Ok(files.iter().map(FilePath::identifier).collect())
    }

    /// Start an upload request.
    pub fn begin_upload(&self) -> UploadBatch {
        UploadBatch {
            store: self.store.clone(),
            limits: self.limits,
            directory: None,
            current: None,
            finished: Vec::new(),
        }
    }

    /// Commit every file of an upload request.
    ///
    /// Either all files land in the target directory or none do.
    pub async fn finish_upload(
        &self,
        mut batch: UploadBatch,
        uploader_id: Option<i64>,
    ) -> Result<Vec<UploadedAudio>> {
        if let Err(e) = batch.end_file().await {
            batch.abort().await;
            return Err(e);
        }
        if batch.finished.is_empty() {
            return Err(PleerError::Validation("No file uploaded".into()));
        }

        let directory = batch.directory.take();
        let mut pending = std::mem::take(&mut batch.finished).into_iter();
        let mut committed: Vec<(FilePath, PendingFile)> = Vec::new();

        while let Some(file) = pending.next() {
            match self.store.commit(&file.staged, directory.as_deref()).await {
                Ok(path) => committed.push((path, file)),
                Err(e) => {
                    file.staged.discard().await;
                    for rest in pending {
                        rest.staged.discard().await;
                    }
                    for (path, _) in &committed {
                        if let Err(e) = self.store.delete_file(path).await {
                            warn!("Failed to roll back upload {}: {}", path, e);
                        }
                    }
                    return Err(e);
                }
            }
        }

        let mut uploaded = Vec::with_capacity(committed.len());
        for (path, file) in committed {
            let size = file.staged.size();
            let record = NewAudioFile {
                directory: path.directory().unwrap_or_default().to_string(),
                stored_name: path.name().to_string(),
                original_name: file.original_name.clone(),
                size: size as i64,
                mime_type: file.mime_type.clone(),
                uploader_id,
            };
            if let Err(e) = self.metadata().create(&record).await {
                warn!("Failed to record metadata for {}: {}", path, e);
            }

            info!("Stored {} as {}", file.original_name, path);
            uploaded.push(UploadedAudio {
                path,
                original_name: file.original_name,
                size,
                mime_type: file.mime_type,
            });
        }

        Ok(uploaded)
    }

    /// Find a file by identifier.
    ///
    /// A directory-qualified identifier is used as is. A bare name is looked
    /// up at the root, then in the metadata index, then in every directory.
    pub async fn locate(&self, identifier: &str) -> Result<FilePath> {
        let path = FilePath::parse(identifier)?;
        if self.store.file_exists(&path).await {
            return Ok(path);
        }
        if path.directory().is_some() {
            return Err(PleerError::NotFound("File".into()));
        }

        match self.metadata().find_by_stored_name(path.name()).await {
            Ok(rows) => {
                for row in rows {
                    let dir = Some(row.directory.as_str()).filter(|d| !d.is_empty());
                    if let Ok(candidate) = FilePath::new(dir, &row.stored_name) {
                        if self.store.file_exists(&candidate).await {
                            return Ok(candidate);
                        }
                    }
                }
            }
            Err(e) => warn!("Metadata lookup for {} failed: {}", path, e),
        }

        self.store
            .find_in_directories(path.name())
            .await?
            .ok_or_else(|| PleerError::NotFound("File".into()))
    }

    /// On-disk path of an existing file.
    pub async fn resolve(&self, identifier: &str) -> Result<PathBuf> {
        let path = FilePath::parse(identifier)?;
        if !self.store.file_exists(&path).await {
            return Err(PleerError::NotFound("File".into()));
        }
        Ok(self.store.resolve(&path))
    }

    /// Delete a file and its metadata.
    pub async fn delete_file(&self, identifier: &str) -> Result<FilePath> {
        let path = self.locate(identifier).await?;
        if !self.store.delete_file(&path).await? {
            return Err(PleerError::NotFound("File".into()));
        }

        let dir = path.directory().unwrap_or_default();
        if let Err(e) = self.metadata().delete(dir, path.name()).await {
            warn!("Failed to drop metadata of {}: {}", path, e);
        }
        info!("Deleted {}", path);
        Ok(path)
    }

    /// Move a file between directories, keeping its stored name.
    ///
    /// `filename` may be directory-qualified, in which case its directory is
    /// the source. Empty directory strings mean the root.
    pub async fn move_file(
        &self,
        filename: &str,
        source: Option<&str>,
        target: Option<&str>,
    ) -> Result<FilePath> {
        let source = source.map(str::trim).filter(|d| !d.is_empty());
        let target = target.map(str::trim).filter(|d| !d.is_empty());

        let from = if filename.contains('/') {
            FilePath::parse(filename)?
        } else {
            FilePath::new(source, filename)?
        };
        let to = self.store.move_file(&from, target).await?;

        if to != from {
            let from_dir = from.directory().unwrap_or_default();
            let to_dir = to.directory().unwrap_or_default();
            if let Err(e) = self.metadata().relocate(from_dir, from.name(), to_dir).await {
                warn!("Failed to move metadata of {}: {}", from, e);
            }
            info!("Moved {} to {}", from, to);
        }
        Ok(to)
    }

    /// Display name of a stored file.
    pub async fn display_name(&self, path: &FilePath) -> String {
        let dir = path.directory().unwrap_or_default();
        match self.metadata().get(dir, path.name()).await {
            Ok(Some(row)) => row.original_name,
            Ok(None) => path.name().to_string(),
            Err(e) => {
                warn!("Metadata lookup for {} failed: {}", path, e);
                path.name().to_string()
            }
        }
    }

    /// Pick a random track from a directory.
    pub async fn random_track(&self, directory: &str) -> Result<Track> {
        validate_directory_name(directory)?;
        let path = self.store.random_file(directory).await?;
        let display_name = self.display_name(&path).await;

        Ok(Track { path, display_name })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn setup_with(limits: UploadLimits) -> (TempDir, AudioLibrary) {
        let temp_dir = TempDir::new().unwrap();
        let store = AudioStore::new(temp_dir.path().join("uploads")).unwrap();
        let db = Arc::new(Database::open_in_memory().await.unwrap());
        (temp_dir, AudioLibrary::new(store, db, limits))
    }

    async fn setup() -> (TempDir, AudioLibrary) {
        setup_with(UploadLimits::default()).await
    }

    async fn upload(
        library: &AudioLibrary,
        directory: &str,
        files: &[(&str, &str)],
    ) -> Result<Vec<UploadedAudio>> {
        let mut batch = library.begin_upload();
        let result = async {
            for (name, content) in files {
                batch.begin_file(name, None).await?;
                batch.write(content.as_bytes()).await?;
            }
            batch.set_directory(directory)
        }
        .await;

        match result {
            Ok(()) => library.finish_upload(batch, None).await,
            Err(e) => {
                batch.abort().await;
                Err(e)
            }
        }
    }

    fn staging_is_empty(library: &AudioLibrary) -> bool {
        std::fs::read_dir(library.store().root().join(crate::store::STAGING_DIR))
            .unwrap()
            .next()
            .is_none()
    }

    #[test]
    fn test_base_name() {
        assert_eq!(base_name("song.mp3"), "song.mp3");
        assert_eq!(base_name("C:\\Music\\song.mp3"), "song.mp3");
        assert_eq!(base_name("/home/me/song.mp3"), "song.mp3");
    }

    #[test]
    fn test_detect_mime_type() {
        assert_eq!(detect_mime_type("a.mp3", None), "audio/mpeg");
        assert_eq!(
            detect_mime_type("a.mp3", Some("application/octet-stream")),
            "audio/mpeg"
        );
        assert_eq!(detect_mime_type("a.bin", Some("audio/ogg")), "audio/ogg");
        assert_eq!(detect_mime_type("notes.txt", None), "text/plain");
    }

    #[tokio::test]
    async fn test_upload_creates_directory() {
        let (_temp, library) = setup().await;

        let uploaded = upload(&library, "facts", &[("a.mp3", "abc")]).await.unwrap();
        assert_eq!(uploaded.len(), 1);
        assert_eq!(uploaded[0].path.directory(), Some("facts"));
        assert_eq!(uploaded[0].original_name, "a.mp3");
        assert_eq!(uploaded[0].size, 3);
        assert_eq!(uploaded[0].mime_type, "audio/mpeg");

        assert_eq!(library.list_directories().await.unwrap(), vec!["facts"]);
        assert_eq!(
            library.list_files(Some("facts")).await.unwrap(),
            vec![uploaded[0].path.identifier()]
        );
        assert!(staging_is_empty(&library));
    }

    #[tokio::test]
    async fn test_upload_to_root() {
        let (_temp, library) = setup().await;

        let uploaded = upload(&library, "", &[("a.ogg", "x"), ("b.wav", "y")])
            .await
            .unwrap();
        assert_eq!(uploaded.len(), 2);
        assert!(uploaded.iter().all(|u| u.path.directory().is_none()));
        assert_ne!(uploaded[0].path, uploaded[1].path);
        assert_eq!(library.list_files(None).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_upload_without_files() {
        let (_temp, library) = setup().await;

        let result = upload(&library, "facts", &[]).await;
        assert_eq!(
            result.unwrap_err().to_string(),
            "validation error: No file uploaded"
        );
    }

    #[tokio::test]
    async fn test_upload_too_large_leaves_nothing() {
        let (_temp, library) = setup_with(UploadLimits {
            max_file_size: 4,
            ..UploadLimits::default()
        })
        .await;

        let result = upload(&library, "", &[("a.mp3", "12"), ("b.mp3", "12345")]).await;
        assert!(matches!(result, Err(PleerError::Validation(_))));
        assert!(library.list_files(None).await.unwrap().is_empty());
        assert!(staging_is_empty(&library));
    }

    #[tokio::test]
    async fn test_upload_too_many_files() {
        let (_temp, library) = setup_with(UploadLimits {
            max_files: 2,
            ..UploadLimits::default()
        })
        .await;

        let files = [("a.mp3", "1"), ("b.mp3", "2"), ("c.mp3", "3")];
        let err = upload(&library, "", &files).await.unwrap_err();
        assert_eq!(err.to_string(), "validation error: Too many files (max 2)");
        assert!(library.list_files(None).await.unwrap().is_empty());
        assert!(staging_is_empty(&library));
    }

    #[tokio::test]
    async fn test_upload_rejects_non_audio() {
        let (_temp, library) = setup().await;

        let err = upload(&library, "", &[("notes.txt", "hello")]).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "validation error: Only audio files are allowed"
        );

        let (_temp, open) = setup_with(UploadLimits {
            audio_only: false,
            ..UploadLimits::default()
        })
        .await;
        assert!(upload(&open, "", &[("notes.txt", "hello")]).await.is_ok());
    }

    #[tokio::test]
    async fn test_upload_invalid_directory() {
        let (_temp, library) = setup().await;

        let result = upload(&library, "../escape", &[("a.mp3", "1")]).await;
        assert!(matches!(result, Err(PleerError::Validation(_))));
        assert!(staging_is_empty(&library));
    }

    #[tokio::test]
    async fn test_delete_directory_removes_files_and_metadata() {
        let (_temp, library) = setup().await;

        let uploaded = upload(&library, "facts", &[("a.mp3", "1")]).await.unwrap();
        assert!(library.delete_directory("facts").await.unwrap());
        assert!(matches!(
            library.list_files(Some("facts")).await,
            Err(PleerError::NotFound(_))
        ));

        let repo = AudioFileRepository::new(library.db().pool());
        assert!(repo
            .get("facts", uploaded[0].path.name())
            .await
            .unwrap()
            .is_none());
        assert!(!library.delete_directory("facts").await.unwrap());
    }

    #[tokio::test]
    async fn test_locate_bare_name_in_directory() {
        let (_temp, library) = setup().await;

        let uploaded = upload(&library, "facts", &[("a.mp3", "1")]).await.unwrap();
        let name = uploaded[0].path.name();

        assert_eq!(library.locate(name).await.unwrap(), uploaded[0].path);

        // Without metadata the one-level scan still finds it.
        AudioFileRepository::new(library.db().pool())
            .delete("facts", name)
            .await
            .unwrap();
        assert_eq!(library.locate(name).await.unwrap(), uploaded[0].path);
    }

    #[tokio::test]
    async fn test_delete_file() {
        let (_temp, library) = setup().await;

        let uploaded = upload(&library, "facts", &[("a.mp3", "1")]).await.unwrap();
        let identifier = uploaded[0].path.identifier();

        let deleted = library.delete_file(&identifier).await.unwrap();
        assert_eq!(deleted, uploaded[0].path);
        assert!(matches!(
            library.delete_file(&identifier).await,
            Err(PleerError::NotFound(_))
        ));
        assert!(matches!(
            library.delete_file("missing.mp3").await,
            Err(PleerError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_move_file_keeps_metadata() {
        let (_temp, library) = setup().await;

        let uploaded = upload(&library, "", &[("Purr.mp3", "1")]).await.unwrap();
        let name = uploaded[0].path.name().to_string();

        let moved = library
            .move_file(&name, Some(""), Some("facts"))
            .await
            .unwrap();
        assert_eq!(moved.identifier(), format!("facts/{name}"));
        assert_eq!(library.display_name(&moved).await, "Purr.mp3");

        let back = library
            .move_file(&moved.identifier(), None, None)
            .await
            .unwrap();
        assert_eq!(back, uploaded[0].path);
        assert_eq!(library.list_files(None).await.unwrap(), vec![name]);
    }

    #[tokio::test]
    async fn test_random_track() {
        let (_temp, library) = setup().await;

        upload(&library, "facts", &[("Cats.mp3", "1")]).await.unwrap();
        let track = library.random_track("facts").await.unwrap();
        assert_eq!(track.display_name, "Cats.mp3");
        assert_eq!(track.path.directory(), Some("facts"));

        assert!(matches!(
            library.random_track("empty").await,
            Err(PleerError::NotFound(_))
        ));
    }
}
