//! Per-connection session engine.
//!
//! A session owns one secured connection and drives it through the
//! protocol lifecycle:
//!
//! ```text
//! greet ──▶ idle ──▶ receive ──▶ validate-in ──▶ dispatch ──▶
//!            ▲                                       │
//!            └────── send ◀── validate-out ◀─────────┘
//! ```
//!
//! The idle state waits on four signals at once: the stop token, the
//! absolute session deadline (armed once at start), the idle deadline
//! (re-armed after every successful send), and the next inbound frame.
//! Whichever fires first wins. Any I/O, validation, or handler error is
//! terminal: it is logged and the connection closes. Requests on one
//! session are handled strictly in arrival order.
//!
//! A response carrying a connection-management result code (1500, 2500,
//! 2501, 2502) closes the session once it has been written.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::future::BoxFuture;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_rustls::rustls::pki_types::CertificateDer;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use epp_wire::{read_frame, terminal_result_code, write_frame};

use crate::error::{BoxError, SessionError, ValidationError};
use crate::validator::Validator;

/// Builds the greeting document for a freshly connected client.
pub type GreetingFn = Arc<dyn Fn(&SessionInfo) -> Result<Bytes, BoxError> + Send + Sync>;

/// Handles one validated request and produces the response document.
pub type HandlerFn =
    Arc<dyn Fn(Arc<SessionInfo>, Bytes) -> BoxFuture<'static, Result<Bytes, BoxError>> + Send + Sync>;

/// Observes a command before it is dispatched. Observers run for side
/// effects in registration order and cannot cancel the command.
pub type ObserverFn = Arc<dyn Fn(&SessionInfo) + Send + Sync>;

/// Wraps an async closure as a [`HandlerFn`].
pub fn handler_fn<F, Fut>(handler: F) -> HandlerFn
where
    F: Fn(Arc<SessionInfo>, Bytes) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = Result<Bytes, BoxError>> + Send + 'static,
{
    Arc::new(move |session, request| Box::pin(handler(session, request)))
}

/// Construction template applied to every session a server creates.
#[derive(Clone)]
pub struct SessionConfig {
    /// Maximum time with no inbound traffic before the session ends.
    /// Re-armed after every successful send.
    pub idle_timeout: Duration,

    /// Maximum session lifetime, measured from session start.
    pub session_timeout: Duration,

    /// Greeting builder, invoked exactly once before anything is read.
    pub greeting: GreetingFn,

    /// Request handler, typically [`Mux::into_handler`](crate::Mux::into_handler).
    pub handler: HandlerFn,

    /// Optional schema validator applied to all inbound and outbound
    /// documents. Shared across sessions.
    pub validator: Option<Arc<dyn Validator>>,

    /// Per-command observers, run before each dispatch.
    pub observers: Vec<ObserverFn>,
}

/// Immutable facts about a live session, shared with handlers.
#[derive(Debug)]
pub struct SessionInfo {
    id: String,
    peer_addr: Option<SocketAddr>,
    peer_certificates: Vec<CertificateDer<'static>>,
}

impl SessionInfo {
    /// Creates an info block with a fresh unique identifier.
    #[must_use]
    pub fn new(
        peer_addr: Option<SocketAddr>,
        peer_certificates: Vec<CertificateDer<'static>>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            peer_addr,
            peer_certificates,
        }
    }

    /// The session identifier, unique per server run.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The client's remote address, when known.
    #[must_use]
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer_addr
    }

    /// The certificates the client presented during the TLS handshake.
    /// Empty when the client sent none or the session runs off-TLS.
    #[must_use]
    pub fn peer_certificates(&self) -> &[CertificateDer<'static>] {
        &self.peer_certificates
    }
}

/// One active connection, generic over the secured stream it drives.
pub struct Session<S> {
    info: Arc<SessionInfo>,
    stream: S,
    config: SessionConfig,
    cancel: CancellationToken,
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates a session over an already-secured stream.
    pub fn new(stream: S, info: SessionInfo, config: SessionConfig, cancel: CancellationToken) -> Self {
        Self {
            info: Arc::new(info),
            stream,
            config,
            cancel,
        }
    }

    /// The session's shared info block.
    #[must_use]
    pub fn info(&self) -> &Arc<SessionInfo> {
        &self.info
    }

    /// Drives the session to completion.
    ///
    /// Returns `Ok(())` on every orderly exit: stop signal, idle or
    /// session timeout, or a bye response. Returns the terminal error
    /// otherwise; the connection is closed either way when the stream
    /// drops.
    ///
    /// # Errors
    ///
    /// Any transport, validation, greeting, or handler failure.
    pub async fn run(self) -> Result<(), SessionError> {
        let Self {
            info,
            mut stream,
            config,
            cancel,
        } = self;
        let session_id = info.id().to_owned();

        let greeting = (config.greeting)(&info).map_err(SessionError::Greeting)?;
        validate(config.validator.as_deref(), &greeting)?;
        write_frame(&mut stream, &greeting).await?;
        debug!(%session_id, "greeting sent");

        let session_deadline = tokio::time::sleep(config.session_timeout);
        tokio::pin!(session_deadline);
        let idle_deadline = tokio::time::sleep(config.idle_timeout);
        tokio::pin!(idle_deadline);

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    info!(%session_id, "stop signalled, ending session");
                    return Ok(());
                }
                () = &mut session_deadline => {
                    info!(
                        %session_id,
                        timeout = %humantime::format_duration(config.session_timeout),
                        "session lifetime reached, ending session"
                    );
                    return Ok(());
                }
                () = &mut idle_deadline => {
                    info!(
                        %session_id,
                        timeout = %humantime::format_duration(config.idle_timeout),
                        "session idle, ending session"
                    );
                    return Ok(());
                }
                request = read_frame(&mut stream) => {
                    let request = request?;
                    validate(config.validator.as_deref(), &request)?;

                    for observer in &config.observers {
                        observer(&info);
                    }

                    let response = (config.handler)(Arc::clone(&info), request)
                        .await
                        .map_err(SessionError::Handler)?;
                    validate(config.validator.as_deref(), &response)?;

                    write_frame(&mut stream, &response).await?;

                    if let Some(code) = terminal_result_code(&response) {
                        info!(%session_id, code = code.code(), "sent connection-management result, ending session");
                        return Ok(());
                    }

                    idle_deadline
                        .as_mut()
                        .reset(tokio::time::Instant::now() + config.idle_timeout);
                }
            }
        }
    }
}

/// Runs `document` through the validator, if one is installed, logging
/// each violation before the error propagates.
fn validate(validator: Option<&dyn Validator>, document: &[u8]) -> Result<(), ValidationError> {
    let Some(validator) = validator else {
        return Ok(());
    };
    validator.validate(document).inspect_err(|error| {
        for violation in &error.violations {
            warn!(%violation, "schema validation");
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_ids_are_unique() {
        let a = SessionInfo::new(None, Vec::new());
        let b = SessionInfo::new(None, Vec::new());
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn absent_validator_accepts_anything() {
        assert!(validate(None, b"not xml at all").is_ok());
    }
}
