//! Audio file store for PLEER.
//!
//! Files live under an uploads root with one level of named directories.
//! Each file is addressed by its directory-qualified relative path
//! (`facts/1700000000000.mp3`) and has a generated `<millis><.ext>` name.
//! Original upload names are kept in the `audio_files` table.

mod library;
mod metadata;
mod naming;
mod storage;

pub use library::{AudioLibrary, Track, UploadBatch, UploadLimits, UploadedAudio};
pub use metadata::{AudioFile, AudioFileRepository, NewAudioFile};
pub use naming::{
    extension_of, validate_directory_name, validate_file_name, FilePath, NameGenerator,
    MAX_DIRECTORY_NAME_LENGTH, MAX_FILE_NAME_LENGTH,
};
pub use storage::{AudioStore, StagedFile, STAGING_DIR};

/// Default maximum upload size per file (50 MB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;

/// Default maximum number of files per upload request.
pub const DEFAULT_MAX_FILES: usize = 100;
