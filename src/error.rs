//! Crate-wide error type for hard failures.
//!
//! Parse and validation problems are never represented here: they are
//! [`crate::diagnostics::Diagnostic`] values accumulated on a
//! [`crate::parse::ParseContext`] or [`crate::ast::Document`]. `CoreError`
//! is reserved for I/O failures and invariant violations that abort an
//! operation outright (missing namespace files, malformed IDR XML,
//! compiler bugs).

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("namespace {namespace} version {version} not found in any search path")]
    MissingNamespace { namespace: String, version: String },

    #[error("failed to read introspection file {}: {source}", .path.display())]
    IdrIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed introspection file {}: {message}", .path.display())]
    IdrXml { path: PathBuf, message: String },

    #[error("compiler bug: {message} (please report this)")]
    Internal { message: String },

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CoreError {
    pub fn internal(message: impl Into<String>) -> Self {
        CoreError::Internal {
            message: message.into(),
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
