//! The listener: accepting, securing, and tracking sessions.
//!
//! One task runs the accept loop; every accepted connection gets its own
//! task that performs the TLS handshake, registers the session, drives
//! it, and removes it again. Shutdown is a cancellation token shared
//! with every session and a task tracker that [`Server::serve`] awaits
//! before returning, so `serve` never returns with a session still
//! running.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use socket2::{SockRef, TcpKeepalive};
use tokio::net::{TcpListener, TcpStream};
use tokio_rustls::TlsAcceptor;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{info, warn};

use crate::error::ServerError;
use crate::registry::Registry;
use crate::session::{Session, SessionConfig, SessionInfo};
use crate::tls::TlsConfig;

/// TCP keep-alive probe period applied to every accepted connection.
const KEEPALIVE_PERIOD: Duration = Duration::from_secs(60);

/// Deadline for the TLS handshake of a freshly accepted connection.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Everything needed to construct a [`Server`].
pub struct ServerConfig {
    /// Address to listen on, e.g. `"0.0.0.0:700"`.
    pub listen_addr: String,

    /// Certificates, key, and client-auth policy.
    pub tls: TlsConfig,

    /// Template applied to every session.
    pub session: SessionConfig,

    /// Callbacks run once when serving starts.
    pub on_started: Vec<Arc<dyn Fn() + Send + Sync>>,
}

/// An EPP server instance.
///
/// Create one with [`Server::new`], start it with
/// [`listen_and_serve`](Server::listen_and_serve) (or
/// [`serve`](Server::serve) with a pre-bound listener), and stop it with
/// [`stop`](Server::stop) from any task.
pub struct Server {
    listen_addr: String,
    acceptor: TlsAcceptor,
    session_config: SessionConfig,
    on_started: Vec<Arc<dyn Fn() + Send + Sync>>,
    registry: Arc<Registry>,
    shutdown: CancellationToken,
    tracker: TaskTracker,
}

impl Server {
    /// Builds the server, constructing the TLS acceptor up front so
    /// configuration problems surface before any socket is opened.
    ///
    /// # Errors
    ///
    /// [`ServerError::Tls`] if the TLS material is rejected.
    pub fn new(config: ServerConfig) -> Result<Self, ServerError> {
        let acceptor = config.tls.into_acceptor()?;
        Ok(Self {
            listen_addr: config.listen_addr,
            acceptor,
            session_config: config.session,
            on_started: config.on_started,
            registry: Arc::new(Registry::new()),
            shutdown: CancellationToken::new(),
            tracker: TaskTracker::new(),
        })
    }

    /// The live-session registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Binds the configured address and serves until stopped.
    ///
    /// # Errors
    ///
    /// [`ServerError::Bind`] if the address cannot be bound, otherwise
    /// whatever [`serve`](Server::serve) reports.
    pub async fn listen_and_serve(&self) -> Result<(), ServerError> {
        let listener = TcpListener::bind(&self.listen_addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: self.listen_addr.clone(),
                source,
            })?;
        self.serve(listener).await
    }

    /// Serves connections from `listener` until [`stop`](Server::stop)
    /// is called, then waits for every session task to finish.
    ///
    /// Transient accept failures are logged and the loop continues;
    /// only listener-level I/O failure is fatal.
    ///
    /// # Errors
    ///
    /// [`ServerError::Accept`] if the listener fails fatally.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), ServerError> {
        if let Ok(local_addr) = listener.local_addr() {
            info!(addr = %local_addr, "server listening");
        }

        for callback in &self.on_started {
            callback();
        }

        loop {
            tokio::select! {
                () = self.shutdown.cancelled() => break,
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, peer_addr)) => self.spawn_session(stream, peer_addr),
                        Err(error) if is_transient_accept_error(&error) => {
                            warn!(%error, "accept failed, continuing");
                        }
                        Err(error) => {
                            self.tracker.close();
                            self.tracker.wait().await;
                            return Err(ServerError::Accept(error));
                        }
                    }
                }
            }
        }

        drop(listener);
        self.tracker.close();
        self.tracker.wait().await;
        info!("all sessions completed, server stopped");
        Ok(())
    }

    /// Signals shutdown: the accept loop exits and every live session
    /// observes its stop token. [`serve`](Server::serve) returns once
    /// the sessions have drained.
    pub fn stop(&self) {
        info!("stop requested");
        self.shutdown.cancel();
        self.registry.cancel_all();
    }

    fn spawn_session(&self, stream: TcpStream, peer_addr: SocketAddr) {
        if let Err(error) = enable_keepalive(&stream) {
            warn!(peer = %peer_addr, %error, "failed to enable TCP keep-alive");
        }

        let acceptor = self.acceptor.clone();
        let config = self.session_config.clone();
        let registry = Arc::clone(&self.registry);
        let cancel = self.shutdown.child_token();

        self.tracker.spawn(async move {
            let secured =
                match tokio::time::timeout(HANDSHAKE_TIMEOUT, acceptor.accept(stream)).await {
                    Ok(Ok(secured)) => secured,
                    Ok(Err(error)) => {
                        warn!(peer = %peer_addr, %error, "TLS handshake failed");
                        return;
                    }
                    Err(_) => {
                        warn!(peer = %peer_addr, "TLS handshake timed out");
                        return;
                    }
                };

            let peer_certificates = {
                let (_, connection) = secured.get_ref();
                connection
                    .peer_certificates()
                    .map(<[_]>::to_vec)
                    .unwrap_or_default()
            };

            let info = SessionInfo::new(Some(peer_addr), peer_certificates);
            let session_id = info.id().to_owned();
            registry.register(&session_id, cancel.clone(), Some(peer_addr));
            info!(%session_id, peer = %peer_addr, "session started");

            let session = Session::new(secured, info, config, cancel);
            match session.run().await {
                Ok(()) => info!(%session_id, "session completed"),
                Err(error) => warn!(%session_id, %error, "session ended with error"),
            }

            registry.unregister(&session_id);
        });
    }
}

/// Keeps long-lived idle registrar connections from being dropped by
/// middleboxes.
fn enable_keepalive(stream: &TcpStream) -> std::io::Result<()> {
    let keepalive = TcpKeepalive::new().with_time(KEEPALIVE_PERIOD);
    SockRef::from(stream).set_tcp_keepalive(&keepalive)
}

/// Per-connection accept failures (a peer resetting mid-handshake, file
/// descriptor pressure) recover on the next accept; anything else means
/// the listener itself is gone.
fn is_transient_accept_error(error: &std::io::Error) -> bool {
    use std::io::ErrorKind;
    matches!(
        error.kind(),
        ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::Interrupted
            | ErrorKind::WouldBlock
    )
}
