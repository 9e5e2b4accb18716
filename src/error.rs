//! Centralized error handling for Pagepack.
//!
//! All failure conditions are propagated through the `Result` type; the
//! library never panics on malformed input or a misbehaving custom write
//! method (enforced by `#![deny(clippy::panic)]` and
//! `#![deny(clippy::unwrap_used)]`).
//!
//! ## Error Categories
//!
//! - **I/O Errors** ([`PagepackError::Io`]): failures of the underlying byte
//!   sink or source. These pass through the encoder and decoder unchanged.
//! - **Serialization Errors** ([`PagepackError::Serialization`]): a field,
//!   array element or custom write/read method failed. These carry an
//!   accumulating trace of the types and array dimensions that were being
//!   processed, appended frame by frame as the recursion unwinds, so a deep
//!   failure reports the full containment path from the failure point back to
//!   the root.
//! - **Protocol Errors** ([`PagepackError::Protocol`]): the decoder met an
//!   unexpected tag, a back-reference to a handle that was never registered,
//!   or a truncated stream. These signal corruption or version skew and are
//!   never retried.
//! - **Registry Errors** ([`PagepackError::Registry`]): a type or class id was
//!   not registered with the [`ClassRegistry`](crate::registry::ClassRegistry)
//!   shared by the encoder and decoder.
//!
//! ## Trace Example
//!
//! ```rust
//! use pagepack::PagepackError;
//!
//! let err = PagepackError::serialization("custom write failed")
//!     .with_frame("Inner")
//!     .with_frame("Inner[4]")
//!     .with_frame("Outer");
//! // Innermost frame first:
//! assert_eq!(err.to_string(),
//!     "Serialization Error: custom write failed [while processing Inner -> Inner[4] -> Outer]");
//! ```

use std::fmt;
use std::io;
use std::sync::Arc;

/// A specialized `Result` type for Pagepack operations.
pub type Result<T> = std::result::Result<T, PagepackError>;

/// The master error enum covering all failure domains in Pagepack.
///
/// I/O errors are wrapped in `Arc` so the type stays `Clone`, allowing errors
/// to be stored for later analysis or shared across threads.
#[derive(Debug, Clone)]
pub enum PagepackError {
    /// Low-level I/O failure of the byte sink or source.
    ///
    /// These are fatal to the session and are propagated unchanged: no trace
    /// frames are attached to them.
    Io(Arc<io::Error>),

    /// A value could not be written or read.
    ///
    /// `trace` lists the nesting path that was being processed when the
    /// failure occurred, innermost frame first. Each encode or decode
    /// recursion level appends one segment (a type name, or
    /// `component[length]` for arrays) as the error unwinds.
    Serialization {
        /// Human-readable description of the root failure.
        message: String,
        /// Containment path, innermost frame first.
        trace: Vec<String>,
    },

    /// The byte stream does not match the wire protocol.
    ///
    /// Unexpected tag, unknown class id, a handle referring to a slot that
    /// was never registered, invalid UTF-8, or a truncated stream. Indicates
    /// corruption or an encoder/decoder mismatch.
    Protocol(String),

    /// A type or class id has no entry in the shared class registry.
    Registry(String),
}

impl PagepackError {
    /// Creates a serialization error with an empty trace.
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
            trace: Vec::new(),
        }
    }

    /// Appends one containment frame to a serialization error.
    ///
    /// All other variants are returned untouched, so I/O and protocol
    /// failures keep their original shape while unwinding.
    #[must_use]
    pub fn with_frame(self, frame: impl Into<String>) -> Self {
        match self {
            Self::Serialization { message, mut trace } => {
                trace.push(frame.into());
                Self::Serialization { message, trace }
            }
            other => other,
        }
    }
}

impl fmt::Display for PagepackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O Error: {e}"),
            Self::Serialization { message, trace } => {
                write!(f, "Serialization Error: {message}")?;
                if !trace.is_empty() {
                    write!(f, " [while processing {}]", trace.join(" -> "))?;
                }
                Ok(())
            }
            Self::Protocol(s) => write!(f, "Protocol Error: {s}"),
            Self::Registry(s) => write!(f, "Registry Error: {s}"),
        }
    }
}

impl std::error::Error for PagepackError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for PagepackError {
    fn from(err: io::Error) -> Self {
        Self::Io(Arc::new(err))
    }
}
