//! API handlers.

pub mod auth;
pub mod directory;
pub mod file;
pub mod playback;

pub use auth::*;
pub use directory::*;
pub use file::*;
pub use playback::*;
