//! Error types for Bitbucket client operations.
//!
//! This module defines the error taxonomy used when talking to a Bitbucket
//! Server instance. Every failure a caller can observe is one of the variants
//! below, so callers pattern-match on kind instead of catching a broad
//! exception type.

use std::path::PathBuf;

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// Errors that can occur during Bitbucket client operations.
///
/// The variants split along the lines a caller actually cares about: bad
/// configuration and bad arguments fail before any network activity, transport
/// and protocol failures carry their underlying cause, and server-side
/// rejections carry the message the server resolved for display.
///
/// ## Examples
///
/// ```rust,ignore
/// use bitbucket_client::Error;
///
/// match client.create_tag("PROJ", "repo", &tag).await {
///     Ok(result) => println!("tag created: {result}"),
///     Err(Error::Validation { field, .. }) => eprintln!("missing argument: {field}"),
///     Err(Error::RequestFailed { status, message }) => {
///         eprintln!("server rejected the request ({status}): {message}")
///     }
///     Err(err) => eprintln!("other error: {err}"),
/// }
/// ```
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid or missing server connection parameters.
    ///
    /// Raised while constructing a [`crate::ServerConfig`], before any network
    /// activity. `field` names the offending parameter.
    #[error("invalid server configuration for '{field}': {message}")]
    Configuration {
        /// The configuration field that failed validation.
        field: &'static str,
        /// Why the value was rejected.
        message: String,
    },

    /// A required operation argument is missing or empty.
    ///
    /// Checked locally before any request is sent; when this error is raised
    /// no network call has been made.
    #[error("invalid argument '{field}': {message}")]
    Validation {
        /// The operation argument that failed validation.
        field: &'static str,
        /// Why the value was rejected.
        message: String,
    },

    /// A transport-level failure: connection refused, timeout, or I/O error.
    ///
    /// Never retried automatically; the underlying cause is preserved for
    /// diagnosis.
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    /// A local file could not be read for upload.
    ///
    /// Raised by `update_file` when the workspace-relative source file is
    /// missing or unreadable.
    #[error("failed to read file '{}' for upload: {source}", path.display())]
    FileRead {
        /// The path that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The server returned a non-empty body that is not valid JSON.
    #[error("malformed server response: {source}")]
    Protocol {
        /// The parse failure reported by the JSON decoder.
        #[source]
        source: serde_json::Error,
    },

    /// The server answered with a non-2xx status.
    ///
    /// `message` is resolved from the server's error envelope
    /// (`errors[0].message`) when present, otherwise it is the raw response
    /// body. Suitable for direct display.
    #[error("request failed with status {status}: {message}")]
    RequestFailed {
        /// The HTTP status code of the response.
        status: u16,
        /// The resolved human-readable error message.
        message: String,
    },

    /// A merge was refused because the server reports it cannot be performed.
    ///
    /// Raised when the pull request's advisory `canMerge` flag is `false`;
    /// the merge request itself is never sent in that case.
    #[error("{message}")]
    Conflict {
        /// Why the merge was refused.
        message: String,
    },
}

impl Error {
    pub(crate) fn empty_field(field: &'static str) -> Self {
        Error::Validation {
            field,
            message: format!("the {field} is null or empty"),
        }
    }
}
