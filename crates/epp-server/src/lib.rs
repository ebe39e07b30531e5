//! Embeddable EPP server framework.
//!
//! This crate provides the serving stack of an RFC 5730/5734 registry
//! server: a TLS-terminated TCP listener that runs one session task per
//! connection, frames messages per RFC 5734 §4, validates them against
//! an injected schema validator, and routes each command to an embedder
//! handler by inspecting the document structure.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────┐   accept / TLS    ┌─────────┐   frames    ┌─────┐
//! │  Server  │ ────────────────▶ │ Session │ ──────────▶ │ Mux │
//! └──────────┘                   └─────────┘             └─────┘
//!      │                              │                     │
//!      │ stop token, wait-group       │ validator,          │ handlers keyed by
//!      │                              │ timeouts            │ command + namespace
//!      ▼                              ▼                     ▼
//! ┌──────────┐                  ┌───────────┐         ┌───────────┐
//! │ Registry │ ◀────────────────│ greeting /│         │ embedder  │
//! └──────────┘  register/remove │ responses │         │ handlers  │
//!                               └───────────┘         └───────────┘
//! ```
//!
//! # Module Overview
//!
//! - [`server`]: the listener ([`Server`]): accept loop, TLS upgrade,
//!   graceful shutdown
//! - [`session`]: the per-connection state machine ([`Session`],
//!   [`SessionConfig`], [`SessionInfo`])
//! - [`mux`]: the content-based router ([`Mux`])
//! - [`registry`]: the live-session map ([`Registry`])
//! - [`validator`]: the schema-validation contract ([`Validator`])
//! - [`tls`]: certificate loading and client-auth policy ([`TlsConfig`])
//! - [`config`]: TOML settings ([`Settings`])
//! - [`error`]: the error taxonomy
//!
//! # Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use epp_server::{handler_fn, Mux, Server, ServerConfig, SessionConfig};
//!
//! let mut mux = Mux::new();
//! mux.add_handler("command/login", handler_fn(|session, request| async move {
//!     // authenticate, then respond
//! }));
//! let mux = Arc::new(mux);
//!
//! let server = Server::new(ServerConfig {
//!     listen_addr: "0.0.0.0:700".into(),
//!     tls,
//!     session: SessionConfig { handler: mux.into_handler(), ..greeting_and_timeouts },
//!     on_started: Vec::new(),
//! })?;
//! server.listen_and_serve().await?;
//! ```

pub mod config;
pub mod error;
pub mod mux;
pub mod registry;
pub mod server;
pub mod session;
pub mod tls;
pub mod validator;

pub use config::{ConfigError, Settings};
pub use error::{BoxError, RouteError, ServerError, SessionError, ValidationError};
pub use mux::Mux;
pub use registry::Registry;
pub use server::{Server, ServerConfig};
pub use session::{
    handler_fn, GreetingFn, HandlerFn, ObserverFn, Session, SessionConfig, SessionInfo,
};
pub use tls::{ClientAuth, TlsConfig, TlsError};
pub use validator::{Validator, WellFormed};
