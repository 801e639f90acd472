//! Name validation, file identifiers and stored-name generation.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;

use crate::{PleerError, Result};

/// Maximum length of a directory name.
pub const MAX_DIRECTORY_NAME_LENGTH: usize = 100;

/// Maximum length of a stored file name.
pub const MAX_FILE_NAME_LENGTH: usize = 255;

/// Maximum length of a kept file extension (without the dot).
const MAX_EXTENSION_LENGTH: usize = 10;

/// Validate a directory name directly under the uploads root.
///
/// # Examples
///
/// ```
/// use pleer::store::validate_directory_name;
///
/// assert!(validate_directory_name("facts").is_ok());
/// assert!(validate_directory_name("..").is_err());
/// assert!(validate_directory_name("a/b").is_err());
/// ```
pub fn validate_directory_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(PleerError::Validation("Directory name is required".into()));
    }
    validate_segment(name, MAX_DIRECTORY_NAME_LENGTH)
        .map_err(|_| PleerError::Validation(format!("Invalid directory name: {name}")))
}

/// Validate a file name inside a directory or the uploads root.
pub fn validate_file_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(PleerError::Validation("Filename is required".into()));
    }
    validate_segment(name, MAX_FILE_NAME_LENGTH)
        .map_err(|_| PleerError::Validation(format!("Invalid filename: {name}")))
}

fn validate_segment(name: &str, max_len: usize) -> std::result::Result<(), ()> {
    if name.chars().count() > max_len || name.starts_with('.') {
        return Err(());
    }
    if name
        .chars()
        .any(|c| c == '/' || c == '\\' || c.is_control())
    {
        return Err(());
    }
    Ok(())
}

/// Location of an audio file: the uploads root or one directory below it.
///
/// The canonical string form is the directory-qualified relative path,
/// `facts/1700000000000.mp3`, or just the name for files at the root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FilePath {
    directory: Option<String>,
    name: String,
}

impl FilePath {
    /// Build a path from an optional directory and a file name.
    pub fn new(directory: Option<&str>, name: &str) -> Result<Self> {
        let directory = match directory {
            Some(dir) if !dir.is_empty() => {
                validate_directory_name(dir)?;
                Some(dir.to_string())
            }
            _ => None,
        };
        validate_file_name(name)?;

        Ok(Self {
            directory,
            name: name.to_string(),
        })
    }

    /// Parse a directory-qualified identifier.
    ///
    /// # Examples
    ///
    /// ```
    /// use pleer::store::FilePath;
    ///
    /// let path = FilePath::parse("facts/1.mp3").unwrap();
    /// assert_eq!(path.directory(), Some("facts"));
    /// assert_eq!(path.name(), "1.mp3");
    ///
    /// assert!(FilePath::parse("../etc/passwd").is_err());
    /// ```
    pub fn parse(identifier: &str) -> Result<Self> {
        let identifier = identifier.trim_start_matches('/');
        match identifier.split_once('/') {
            Some((dir, name)) => Self::new(Some(dir), name),
            None => Self::new(None, identifier),
        }
    }

    /// Containing directory (`None` for the uploads root).
    pub fn directory(&self) -> Option<&str> {
        self.directory.as_deref()
    }

    /// Stored file name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The same file name in another directory.
    pub fn with_directory(&self, directory: Option<&str>) -> Result<Self> {
        Self::new(directory, &self.name)
    }

    /// Directory-qualified identifier.
    pub fn identifier(&self) -> String {
        match &self.directory {
            Some(dir) => format!("{dir}/{}", self.name),
            None => self.name.clone(),
        }
    }

    /// Path relative to the uploads root.
    pub fn relative_path(&self) -> PathBuf {
        match &self.directory {
            Some(dir) => Path::new(dir).join(&self.name),
            None => PathBuf::from(&self.name),
        }
    }
}

impl fmt::Display for FilePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.directory {
            Some(dir) => write!(f, "{dir}/{}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// Extension of an original file name, lowercased and with its dot.
///
/// Returns an empty string when the name has no usable extension.
///
/// # Examples
///
/// ```
/// use pleer::store::extension_of;
///
/// assert_eq!(extension_of("Song.MP3"), ".mp3");
/// assert_eq!(extension_of("README"), "");
/// assert_eq!(extension_of("x.m p3"), "");
/// ```
pub fn extension_of(original_name: &str) -> String {
    Path::new(original_name)
        .extension()
        .and_then(|s| s.to_str())
        .filter(|ext| {
            !ext.is_empty()
                && ext.len() <= MAX_EXTENSION_LENGTH
                && ext.chars().all(|c| c.is_ascii_alphanumeric())
        })
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_default()
}

/// Generator for `<millis><.ext>` stored names.
///
/// Never hands out the same millisecond value twice within a process: when
/// the clock has not advanced, the last value plus one is used instead.
#[derive(Debug, Default)]
pub struct NameGenerator {
    last: AtomicU64,
}

impl NameGenerator {
    /// Create a new generator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Next unique millisecond value.
    pub fn next_millis(&self) -> u64 {
        let now = Utc::now().timestamp_millis().max(0) as u64;
        let mut last = self.last.load(Ordering::Relaxed);
        loop {
            let next = now.max(last + 1);
            match self
                .last
                .compare_exchange_weak(last, next, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return next,
                Err(actual) => last = actual,
            }
        }
    }

    /// Generate a stored name for an uploaded file.
    pub fn stored_name(&self, original_name: &str) -> String {
        format!("{}{}", self.next_millis(), extension_of(original_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_validate_directory_name() {
        assert!(validate_directory_name("facts").is_ok());
        assert!(validate_directory_name("my music 2024").is_ok());
        assert!(validate_directory_name(&"a".repeat(100)).is_ok());

        assert!(validate_directory_name("").is_err());
        assert!(validate_directory_name(".").is_err());
        assert!(validate_directory_name("..").is_err());
        assert!(validate_directory_name(".hidden").is_err());
        assert!(validate_directory_name("a/b").is_err());
        assert!(validate_directory_name("a\\b").is_err());
        assert!(validate_directory_name("a\0b").is_err());
        assert!(validate_directory_name("tab\there").is_err());
        assert!(validate_directory_name(&"a".repeat(101)).is_err());
    }

    #[test]
    fn test_directory_name_error_messages() {
        let err = validate_directory_name("").unwrap_err();
        assert_eq!(err.to_string(), "validation error: Directory name is required");

        let err = validate_directory_name("..").unwrap_err();
        assert!(err.to_string().contains("Invalid directory name"));
    }

    #[test]
    fn test_file_path_parse() {
        let root = FilePath::parse("1.mp3").unwrap();
        assert_eq!(root.directory(), None);
        assert_eq!(root.identifier(), "1.mp3");

        let nested = FilePath::parse("facts/1.mp3").unwrap();
        assert_eq!(nested.directory(), Some("facts"));
        assert_eq!(nested.name(), "1.mp3");
        assert_eq!(nested.identifier(), "facts/1.mp3");
        assert_eq!(nested.to_string(), "facts/1.mp3");
        assert_eq!(nested.relative_path(), Path::new("facts").join("1.mp3"));

        let leading = FilePath::parse("/facts/1.mp3").unwrap();
        assert_eq!(leading, nested);
    }

    #[test]
    fn test_file_path_rejects_escapes() {
        assert!(FilePath::parse("").is_err());
        assert!(FilePath::parse("..").is_err());
        assert!(FilePath::parse("../secret").is_err());
        assert!(FilePath::parse("facts/../../x").is_err());
        assert!(FilePath::parse("a/b/c.mp3").is_err());
        assert!(FilePath::parse("facts/").is_err());
        assert!(FilePath::parse("facts/.hidden").is_err());
    }

    #[test]
    fn test_file_path_with_directory() {
        let path = FilePath::parse("1.mp3").unwrap();
        let moved = path.with_directory(Some("facts")).unwrap();
        assert_eq!(moved.identifier(), "facts/1.mp3");

        let back = moved.with_directory(None).unwrap();
        assert_eq!(back, path);

        let empty = moved.with_directory(Some("")).unwrap();
        assert_eq!(empty.directory(), None);
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("a.mp3"), ".mp3");
        assert_eq!(extension_of("Track.FLAC"), ".flac");
        assert_eq!(extension_of("archive.tar.ogg"), ".ogg");
        assert_eq!(extension_of("noext"), "");
        assert_eq!(extension_of(".mp3"), "");
        assert_eq!(extension_of("a.mp3/"), ".mp3");
        assert_eq!(extension_of("evil.m/p3"), "");
        assert_eq!(extension_of("long.abcdefghijk"), "");
    }

    #[test]
    fn test_name_generator_monotonic() {
        let generator = NameGenerator::new();
        let mut previous = generator.next_millis();
        for _ in 0..1000 {
            let next = generator.next_millis();
            assert!(next > previous);
            previous = next;
        }
    }

    #[test]
    fn test_name_generator_unique_across_threads() {
        let generator = Arc::new(NameGenerator::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let generator = Arc::clone(&generator);
                std::thread::spawn(move || {
                    (0..250)
                        .map(|_| generator.stored_name("a.mp3"))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for name in handle.join().unwrap() {
                assert!(name.ends_with(".mp3"));
                assert!(seen.insert(name));
            }
        }
        assert_eq!(seen.len(), 2000);
    }
}
