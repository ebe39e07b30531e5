//! Error taxonomy for the serving stack.
//!
//! Every error inside a session loop is terminal for that session only:
//! it is logged and the connection closes, but nothing propagates to the
//! server. The server itself reports only fatal listener errors.

use std::io;

use thiserror::Error;

use epp_wire::FrameError;

/// Boxed error type for embedder-supplied callbacks (greeting, handlers).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors derived while routing a request to a handler.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RouteError {
    /// The request is not parseable XML.
    #[error("request is not well-formed XML: {0}")]
    BadRequest(String),

    /// The document root is not `<epp>` in the EPP namespace.
    #[error("document root is not an epp element in the EPP namespace")]
    MissingEppTag,

    /// The envelope structure is wrong: the root must contain exactly
    /// one element, and a classifying command element must contain the
    /// object element it acts on.
    #[error("malformed epp envelope")]
    MalformedEpp,

    /// No handler is registered for the derived dispatch path.
    #[error("no handler registered for {path}")]
    NoHandler {
        /// The dispatch path derived from the document.
        path: String,
    },
}

/// Schema validation failed. Carries every underlying violation so the
/// session can log them individually.
#[derive(Debug, Error)]
#[error("schema validation failed: {}", .violations.join("; "))]
pub struct ValidationError {
    /// The individual schema violations.
    pub violations: Vec<String>,
}

impl ValidationError {
    /// A validation error with a single violation.
    #[must_use]
    pub fn single(violation: impl Into<String>) -> Self {
        Self {
            violations: vec![violation.into()],
        }
    }
}

/// Terminal session failures. Any of these closes the connection.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    /// Frame-level transport failure: I/O, deadline, bad length.
    #[error("transport: {0}")]
    Frame(#[from] FrameError),

    /// An inbound or outbound document failed schema validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The greeting callback failed.
    #[error("greeting: {0}")]
    Greeting(#[source] BoxError),

    /// The handler failed (routing errors surface here as well).
    #[error("handler: {0}")]
    Handler(#[source] BoxError),
}

/// Fatal server-level failures.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ServerError {
    /// The listen address could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// The configured listen address.
        addr: String,
        #[source]
        source: io::Error,
    },

    /// The listener failed fatally while accepting.
    #[error("listener failed: {0}")]
    Accept(#[from] io::Error),

    /// TLS material or configuration was rejected.
    #[error(transparent)]
    Tls(#[from] crate::tls::TlsError),
}
