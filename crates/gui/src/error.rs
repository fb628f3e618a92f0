//! Crate-wide error type.

use thiserror::Error;

use crate::scene::ObjectId;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Object not found: {0}")]
    ObjectNotFound(ObjectId),

    #[error("Rendering context is not initialized")]
    NotInitialized,

    #[error("Invalid geometry in '{name}': {reason}")]
    InvalidGeometry { name: String, reason: String },

    #[error("Unsupported scene format version {0}")]
    UnsupportedVersion(u32),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
