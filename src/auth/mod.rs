//! Authentication module for PLEER.
//!
//! Password hashing and the administrator bootstrap. Token issuing lives in
//! the web layer.

mod bootstrap;
mod password;

pub use bootstrap::ensure_admin;
pub use password::{
    hash_password, validate_password, verify_password, PasswordError, MAX_PASSWORD_LENGTH,
    MIN_PASSWORD_LENGTH,
};
