//! Error types for named-string registration and shader compilation.
//!
//! Include resolution itself never fails: malformed directives are reported
//! as [`IncludeWarning`](crate::IncludeWarning)s and the offending line is
//! dropped.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while populating a [`NamedStrings`](crate::NamedStrings)
/// registry.
#[derive(Debug, Error)]
pub enum NamedStringError {
    /// The key is not a usable include path.
    ///
    /// Paths must be non-empty, start with `/`, and must not contain `<`,
    /// `>` or line breaks, since none of those could be written inside an
    /// `#include <...>` directive.
    #[error("invalid named string path {path:?}: {reason}")]
    InvalidPath {
        /// The rejected key.
        path: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// A file could not be read while loading named strings from disk.
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        /// File or directory that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised while compiling or linking shaders through `glow`.
#[cfg(feature = "glow")]
#[derive(Debug, Error)]
pub enum ShaderError {
    /// The driver refused to allocate a shader or program object.
    #[error("failed to create GL object: {0}")]
    Create(String),

    /// A shader stage failed to compile.
    #[error("shader compile error: {log}")]
    Compile {
        /// Driver info log.
        log: String,
        /// The source handed to the driver, after include resolution.
        flattened: String,
    },

    /// A program failed to link.
    #[error("program link error: {log}")]
    Link {
        /// Driver info log.
        log: String,
    },
}
