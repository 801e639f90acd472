//! Browse state of the upload screen.
//!
//! Listings are never patched locally: every mutation is followed by a
//! refetch of the authoritative lists from the server.

use std::path::PathBuf;

use tracing::warn;

use super::{ApiClient, ClientError};

/// Browse session over an [`ApiClient`].
#[derive(Debug)]
pub struct BrowseSession {
    client: ApiClient,
    directories: Vec<String>,
    files: Vec<String>,
    selected_directory: Option<String>,
    last_upload_url: Option<String>,
    error: Option<String>,
}

impl BrowseSession {
    /// Create an empty session. Call [`BrowseSession::load`] to populate it.
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            directories: Vec::new(),
            files: Vec::new(),
            selected_directory: None,
            last_upload_url: None,
            error: None,
        }
    }

    /// The underlying client.
    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// Mutable access to the client, e.g. to sign in.
    pub fn client_mut(&mut self) -> &mut ApiClient {
        &mut self.client
    }

    /// Known directories.
    pub fn directories(&self) -> &[String] {
        &self.directories
    }

    /// Files of the current listing.
    pub fn files(&self) -> &[String] {
        &self.files
    }

    /// Selected directory, `None` for all files.
    pub fn selected_directory(&self) -> Option<&str> {
        self.selected_directory.as_deref()
    }

    /// URL of the first file of the last successful upload.
    pub fn last_upload_url(&self) -> Option<&str> {
        self.last_upload_url.as_deref()
    }

    /// Last error message.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Fetch directories and files.
    pub async fn load(&mut self) -> bool {
        self.error = None;
        self.refresh().await
    }

    /// Select a directory (or `None` for all files) and refetch its listing.
    pub async fn select_directory(&mut self, directory: Option<&str>) -> bool {
        self.selected_directory = directory.filter(|d| !d.is_empty()).map(str::to_string);
        match self
            .client
            .list_files(self.selected_directory.as_deref())
            .await
        {
            Ok(files) => {
                self.files = files;
                self.error = None;
                true
            }
            Err(e) => {
                self.fail("Loading files", &e);
                false
            }
        }
    }

    /// Upload files into the selected directory.
    pub async fn upload(&mut self, files: &[PathBuf]) -> bool {
        if files.is_empty() {
            self.error = Some("Please select a file first".to_string());
            return false;
        }

        let result = self
            .client
            .upload(files, self.selected_directory.as_deref())
            .await;
        let ok = match result {
            Ok(response) => {
                self.last_upload_url = Some(response.audio_url);
                self.error = None;
                true
            }
            Err(e) => {
                self.fail("Upload", &e);
                false
            }
        };

        self.refresh().await;
        ok
    }

    /// Create a directory.
    pub async fn create_directory(&mut self, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() {
            self.error = Some("Please enter a directory name".to_string());
            return false;
        }

        let result = self.client.create_directory(name).await;
        let ok = self.settle("Create directory", result.map(|_| ()));
        self.refresh().await;
        ok
    }

    /// Delete a directory. Clears the selection if it pointed there.
    pub async fn delete_directory(&mut self, name: &str) -> bool {
        let result = self.client.delete_directory(name).await;
        let ok = self.settle("Delete directory", result.map(|_| ()));
        if ok && self.selected_directory.as_deref() == Some(name) {
            self.selected_directory = None;
        }
        self.refresh().await;
        ok
    }

    /// Delete a file by identifier.
    pub async fn delete_file(&mut self, identifier: &str) -> bool {
        let result = self.client.delete_file(identifier).await;
        let ok = self.settle("Delete", result.map(|_| ()));
        self.refresh().await;
        ok
    }

    /// Move a file. `None` directories mean the uploads root.
    pub async fn move_file(
        &mut self,
        filename: &str,
        source_directory: Option<&str>,
        target_directory: Option<&str>,
    ) -> bool {
        let result = self
            .client
            .move_file(filename, source_directory, target_directory)
            .await;
        let ok = self.settle("Move", result.map(|_| ()));
        self.refresh().await;
        ok
    }

    fn settle(&mut self, action: &str, result: Result<(), ClientError>) -> bool {
        match result {
            Ok(()) => {
                self.error = None;
                true
            }
            Err(e) => {
                self.fail(action, &e);
                false
            }
        }
    }

    fn fail(&mut self, action: &str, err: &ClientError) {
        warn!("{} failed: {}", action, err);
        self.error = Some(format!("{} failed: {}", action, err));
    }

    /// Refetch both listings. A failed refetch keeps the old list and only
    /// reports an error if none is pending.
    async fn refresh(&mut self) -> bool {
        let mut ok = true;

        match self.client.list_directories().await {
            Ok(directories) => self.directories = directories,
            Err(e) => {
                ok = false;
                if self.error.is_none() {
                    self.fail("Loading directories", &e);
                }
            }
        }

        match self
            .client
            .list_files(self.selected_directory.as_deref())
            .await
        {
            Ok(files) => self.files = files,
            Err(e) => {
                ok = false;
                if self.error.is_none() {
                    self.fail("Loading files", &e);
                }
            }
        }

        ok
    }
}
