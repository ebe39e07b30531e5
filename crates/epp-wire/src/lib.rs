//! Wire-level building blocks for the Extensible Provisioning Protocol
//! (RFC 5730/5734).
//!
//! This crate holds the protocol leaves that have no dependency on any
//! session or server state:
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │          Payload types                   │  greeting / response
//! ├─────────────────────────────────────────┤
//! │          Envelope encoding               │  <epp> root + aliases
//! ├─────────────────────────────────────────┤
//! │          Framing                         │  length-prefixed (RFC 5734 §4)
//! ├─────────────────────────────────────────┤
//! │          TLS / TCP transport             │  provided by the caller
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Module Overview
//!
//! - [`framing`]: length-prefixed frame I/O ([`read_frame`], [`write_frame`])
//! - [`envelope`]: XML envelope encoding ([`encode`]) and the canonical
//!   `<epp>` root attribute sets
//! - [`aliases`]: namespace-to-alias registry ([`NamespaceAliases`]) consulted
//!   by both the envelope encoder and the content router
//! - [`result`]: RFC 5730 §3 result codes ([`ResultCode`]) and detection of
//!   connection-management ("bye") responses
//! - [`response`]: serializable greeting and response payloads
//!
//! # Wire Format
//!
//! Every message on the wire is a single frame:
//!
//! ```text
//! +----------------------------+------------------+
//! | Total length (4 bytes, BE) | UTF-8 XML        |
//! +----------------------------+------------------+
//! ```
//!
//! The length prefix counts itself, so the payload is `total - 4` bytes
//! and the largest representable frame is `u32::MAX` bytes.

pub mod aliases;
pub mod envelope;
pub mod error;
pub mod framing;
pub mod response;
pub mod result;

pub use aliases::{
    NamespaceAliases, NS_CONTACT, NS_DOMAIN, NS_EPP, NS_HOST, NS_IIS_12, NS_SECDNS_10,
    NS_SECDNS_11,
};
pub use envelope::{client_xml_attributes, encode, server_xml_attributes};
pub use error::{EnvelopeError, FrameError};
pub use framing::{read_frame, write_frame, HEADER_LEN, MAX_PAYLOAD_LEN};
pub use response::{CommandResult, ExternalValue, Greeting, Response, ServiceMenu, TransactionId};
pub use result::{terminal_result_code, ResultCode, UnknownResultCode};
