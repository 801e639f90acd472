//! Web API module for PLEER.
//!
//! REST endpoints over the audio library, token authentication and the
//! optional static client.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod openapi;
pub mod router;
pub mod server;

pub use error::ApiError;
pub use handlers::AppState;
pub use router::create_router;
pub use server::WebServer;
