//! Error types.
//!
//! The training core never fails: setters clamp and empty inputs are no-ops.
//! `Error` only shows up where data crosses in from outside (dataset rows,
//! parameter snapshots, JSON configs).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("invalid shape: {0}")]
    InvalidShape(String),

    #[cfg(feature = "serde")]
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
