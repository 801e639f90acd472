//! PLEER - audio file hosting service
//!
//! A REST file store for audio uploads organised in one level of
//! directories, plus a client library and CLI for uploading and browsing.

pub mod auth;
pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod store;
pub mod web;

pub use auth::{hash_password, validate_password, verify_password, PasswordError};
pub use config::Config;
pub use db::{Database, NewUser, Role, User, UserRepository};
pub use error::{PleerError, Result};
pub use store::{AudioLibrary, AudioStore, FilePath};
