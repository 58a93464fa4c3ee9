//! Error types for merge operations.
//!
//! All fallible functions in this crate return [`Result<T>`], which uses [`Error`]
//! as the error type. Component errors ([`DirectiveError`], [`HeaderError`]) are
//! wrapped together with the path of the file that raised them, so a failed run
//! always points at the offending source.

use crate::header::HeaderError;
use crate::preprocessor::DirectiveError;
use camino::Utf8PathBuf;
use std::path::PathBuf;
use thiserror::Error;
use ucm_settings::HashAlgorithm;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort a merge run.
#[derive(Error, Debug)]
pub enum Error {
    /// Filesystem I/O failed while reading a layer or writing the output tree.
    #[error("IO error at {path}: {source}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A directive in a script is malformed.
    #[error("{path}: {source}")]
    Preprocess {
        path: Utf8PathBuf,
        #[source]
        source: DirectiveError,
    },

    /// A script's class declaration could not be parsed.
    #[error("{path}: {source}")]
    Header {
        path: Utf8PathBuf,
        #[source]
        source: HeaderError,
    },

    /// A path handed to the script reader does not sit under a `Classes` directory.
    #[error("Not a script file: {0}")]
    NotAScript(Utf8PathBuf),

    /// A vanilla class does not hash to the configured value.
    #[error("{algorithm} mismatch for {class}: expected {expected}, got {actual}")]
    HashMismatch {
        class: String,
        algorithm: HashAlgorithm,
        expected: String,
        actual: String,
    },

    /// A hash check names a class that the vanilla layer does not contain.
    #[error("Hash check target not found in source layer: {0}")]
    MissingHashTarget(String),

    /// A layer produced fewer files than the configured minimum.
    #[error("Layer '{layer}' has only {found} files, expected at least {minimum}")]
    TooFewFiles {
        layer: String,
        found: usize,
        minimum: usize,
    },

    /// A walked path is not valid UTF-8.
    #[error("Invalid path: {}", .0.display())]
    InvalidPath(PathBuf),
}

impl Error {
    pub(crate) fn io(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}
