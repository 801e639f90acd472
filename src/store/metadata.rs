//! Audio file metadata repository.
//!
//! The filesystem decides whether a file exists; rows here carry what the
//! filesystem cannot, such as the original upload name.

use crate::db::DbPool;
use crate::{PleerError, Result};

/// Stored metadata for an uploaded audio file.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AudioFile {
    /// Row ID.
    pub id: i64,
    /// Containing directory (`""` for the uploads root).
    pub directory: String,
    /// Generated stored name.
    pub stored_name: String,
    /// Original file name as uploaded.
    pub original_name: String,
    /// Size in bytes.
    pub size: i64,
    /// MIME type accepted at upload time.
    pub mime_type: String,
    /// Uploading user, if still present.
    pub uploader_id: Option<i64>,
    /// Upload timestamp.
    pub created_at: String,
}

/// Data for recording a new upload.
#[derive(Debug, Clone)]
pub struct NewAudioFile {
    /// Containing directory (`""` for the uploads root).
    pub directory: String,
    /// Generated stored name.
    pub stored_name: String,
    /// Original file name.
    pub original_name: String,
    /// Size in bytes.
    pub size: i64,
    /// MIME type.
    pub mime_type: String,
    /// Uploading user.
    pub uploader_id: Option<i64>,
}

const COLUMNS: &str =
    "id, directory, stored_name, original_name, size, mime_type, uploader_id, created_at";

/// Repository for audio file metadata.
pub struct AudioFileRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> AudioFileRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Record an upload.
    ///
    /// A stale row for the same location is replaced.
    pub async fn create(&self, file: &NewAudioFile) -> Result<AudioFile> {
        sqlx::query(
            "INSERT INTO audio_files
                 (directory, stored_name, original_name, size, mime_type, uploader_id)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT (directory, stored_name) DO UPDATE SET
                 original_name = excluded.original_name,
                 size = excluded.size,
                 mime_type = excluded.mime_type,
                 uploader_id = excluded.uploader_id,
                 created_at = datetime('now')",
        )
        .bind(&file.directory)
        .bind(&file.stored_name)
        .bind(&file.original_name)
        .bind(file.size)
        .bind(&file.mime_type)
        .bind(file.uploader_id)
        .execute(self.pool)
        .await?;

        self.get(&file.directory, &file.stored_name)
            .await?
            .ok_or_else(|| PleerError::NotFound("Audio file".into()))
    }

    /// Get metadata by location.
    pub async fn get(&self, directory: &str, stored_name: &str) -> Result<Option<AudioFile>> {
        let file = sqlx::query_as::<_, AudioFile>(&format!(
            "SELECT {COLUMNS} FROM audio_files WHERE directory = ? AND stored_name = ?"
        ))
        .bind(directory)
        .bind(stored_name)
        .fetch_optional(self.pool)
        .await?;

        Ok(file)
    }

    /// Find rows by stored name in any directory, root first.
    pub async fn find_by_stored_name(&self, stored_name: &str) -> Result<Vec<AudioFile>> {
        let files = sqlx::query_as::<_, AudioFile>(&format!(
            "SELECT {COLUMNS} FROM audio_files WHERE stored_name = ? ORDER BY directory"
        ))
        .bind(stored_name)
        .fetch_all(self.pool)
        .await?;

        Ok(files)
    }

    /// List metadata of a directory.
    pub async fn list_by_directory(&self, directory: &str) -> Result<Vec<AudioFile>> {
        let files = sqlx::query_as::<_, AudioFile>(&format!(
            "SELECT {COLUMNS} FROM audio_files WHERE directory = ? ORDER BY stored_name"
        ))
        .bind(directory)
        .fetch_all(self.pool)
        .await?;

        Ok(files)
    }

    /// Point a row at a new directory after a move.
    pub async fn relocate(&self, from: &str, stored_name: &str, to: &str) -> Result<bool> {
        if from == to {
            return Ok(self.get(from, stored_name).await?.is_some());
        }

        // A row left behind at the destination would block the update.
        sqlx::query("DELETE FROM audio_files WHERE directory = ? AND stored_name = ?")
            .bind(to)
            .bind(stored_name)
            .execute(self.pool)
            .await?;

        let result = sqlx::query(
            "UPDATE audio_files SET directory = ? WHERE directory = ? AND stored_name = ?",
        )
        .bind(to)
        .bind(from)
        .bind(stored_name)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete one row.
    pub async fn delete(&self, directory: &str, stored_name: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM audio_files WHERE directory = ? AND stored_name = ?")
            .bind(directory)
            .bind(stored_name)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete every row of a directory.
    pub async fn delete_directory(&self, directory: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM audio_files WHERE directory = ?")
            .bind(directory)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
