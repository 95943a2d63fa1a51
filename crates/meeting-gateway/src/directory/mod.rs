//! Conference directory
//!
//! Resolves the digits a caller typed into the address of a conference room.
//! [`HttpDirectory`] talks to a conference mapper over HTTP; tests and
//! embedders can provide their own [`DirectoryLookup`].

mod http;

pub use http::HttpDirectory;

use async_trait::async_trait;
use thiserror::Error;

/// Successful answer from the directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The identifier maps to this conference address
    Resolved(String),
    /// The directory does not know the identifier
    NotFound,
}

/// Lookup failures that survived the retry policy
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectoryError {
    #[error("directory request timed out")]
    Timeout,

    #[error("directory transport error: {0}")]
    Transport(String),

    #[error("directory returned status {0}")]
    Status(u16),

    #[error("malformed directory response: {0}")]
    MalformedResponse(String),
}

/// Resolves meeting identifiers to conference addresses
#[async_trait]
pub trait DirectoryLookup: Send + Sync {
    async fn resolve(&self, identifier: &str) -> Result<Resolution, DirectoryError>;
}
