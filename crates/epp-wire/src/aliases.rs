//! Namespace alias registry.
//!
//! EPP object mappings are distinguished by XML namespace URI. Outgoing
//! documents decorate element names with a short prefix bound to that
//! URI (`domain:chkData`), and the content router uses the same prefixes
//! as dispatch-path segments (`command/check/domain`). Both consult one
//! [`NamespaceAliases`] table.

use std::collections::HashMap;

/// The EPP 1.0 envelope namespace.
pub const NS_EPP: &str = "urn:ietf:params:xml:ns:epp-1.0";

/// Domain object mapping namespace (RFC 5731).
pub const NS_DOMAIN: &str = "urn:ietf:params:xml:ns:domain-1.0";

/// Host object mapping namespace (RFC 5732).
pub const NS_HOST: &str = "urn:ietf:params:xml:ns:host-1.0";

/// Contact object mapping namespace (RFC 5733).
pub const NS_CONTACT: &str = "urn:ietf:params:xml:ns:contact-1.0";

/// DNSSEC extension namespace, version 1.0.
pub const NS_SECDNS_10: &str = "urn:ietf:params:xml:ns:secDNS-1.0";

/// DNSSEC extension namespace, version 1.1 (RFC 5910).
pub const NS_SECDNS_11: &str = "urn:ietf:params:xml:ns:secDNS-1.1";

/// The .SE registry vendor extension namespace.
pub const NS_IIS_12: &str = "urn:se:iis:xml:epp:iis-1.2";

/// Maps namespace URIs to the short prefixes used on outgoing elements
/// and in dispatch paths.
///
/// Several URIs may share one alias; registering an existing URI
/// overwrites its alias.
#[derive(Debug, Clone)]
pub struct NamespaceAliases {
    aliases: HashMap<String, String>,
}

impl Default for NamespaceAliases {
    /// Seeds the well-known object and extension namespaces.
    fn default() -> Self {
        let mut aliases = Self::empty();
        aliases.insert(NS_DOMAIN, "domain");
        aliases.insert(NS_HOST, "host");
        aliases.insert(NS_CONTACT, "contact");
        aliases.insert(NS_SECDNS_10, "sed");
        aliases.insert(NS_SECDNS_11, "sec");
        aliases.insert(NS_IIS_12, "iis");
        aliases
    }
}

impl NamespaceAliases {
    /// Creates a registry with no entries.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            aliases: HashMap::new(),
        }
    }

    /// Registers `alias` for `uri`, replacing any previous alias.
    pub fn insert(&mut self, uri: impl Into<String>, alias: impl Into<String>) {
        self.aliases.insert(uri.into(), alias.into());
    }

    /// Returns the alias registered for `uri`, if any.
    #[must_use]
    pub fn resolve(&self, uri: &str) -> Option<&str> {
        self.aliases.get(uri).map(String::as_str)
    }

    /// Returns the alias for `uri`, or the URI itself when none is
    /// registered. This is the form dispatch paths use.
    #[must_use]
    pub fn resolve_or_uri<'a>(&'a self, uri: &'a str) -> &'a str {
        self.resolve(uri).unwrap_or(uri)
    }
}
