pub mod downloads;
pub mod playlist;

use serde::Serialize;
use thiserror::Error;

/// Error shape returned by every command.
#[derive(Debug, Error, Serialize, PartialEq)]
#[serde(tag = "kind", content = "message")]
pub enum CommandError {
    #[error("task not found: {0}")]
    NotFound(String),
    #[error("{0}")]
    InvalidRequest(String),
    #[error("{0}")]
    Failed(String),
}
