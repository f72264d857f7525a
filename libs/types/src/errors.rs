//! Error types for identifier parsing

use thiserror::Error;

/// Identifier construction and parsing errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IdError {
    #[error("Address must not be empty")]
    EmptyAddress,

    #[error("Invalid hex in project id: {0}")]
    InvalidHex(String),

    #[error("Invalid project id length: expected 32 bytes, got {len}")]
    InvalidLength { len: usize },
}
