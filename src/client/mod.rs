//! Client for the PLEER REST API.
//!
//! [`ApiClient`] wraps every endpoint; [`BrowseSession`] keeps the browse
//! state of an upload screen and re-fetches listings after each mutation.

mod api;
mod session;

pub use api::ApiClient;
pub use session::BrowseSession;

use thiserror::Error;

/// Message used when the server gives no error text.
pub const UNKNOWN_ERROR: &str = "Unknown error";

/// Client error type.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Transport or decoding failure.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-2xx status.
    #[error("{message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// The server's `error` string.
        message: String,
    },

    /// Local file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid server URL.
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// Input rejected before any request was made.
    #[error("{0}")]
    Input(String),
}

impl ClientError {
    /// HTTP status of an API error.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Client-side route of the player page for a file identifier.
///
/// The whole identifier, `/` included, is encoded as one path segment.
///
/// # Examples
///
/// ```
/// use pleer::client::play_route;
///
/// assert_eq!(play_route("facts/1.mp3"), "/play/facts%2F1.mp3");
/// assert_eq!(play_route("1.mp3"), "/play/1.mp3");
/// ```
pub fn play_route(identifier: &str) -> String {
    format!("/play/{}", urlencoding::encode(identifier))
}
