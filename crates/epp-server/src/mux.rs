//! Content-based command router.
//!
//! EPP verbs like `check` or `create` apply to several object types that
//! differ only in the XML namespace of the inner object element, so the
//! router classifies each document by command name plus payload
//! namespace and looks the result up in a path table:
//!
//! ```text
//! hello                          <epp><hello/>
//! command/login                  <epp><command><login>…
//! command/check/domain           <epp><command><check><domain:check…
//! command/check/urn:example:x    unregistered namespaces route by URI
//! ```
//!
//! Handlers are registered before the server starts serving; the table
//! is read-only while serving.
//!
//! ```ignore
//! let mut mux = Mux::new();
//! mux.add_namespace_alias("urn:ietf:params:xml:ns:contact-1.0", "contact");
//! mux.add_handler("hello", handle_hello);
//! mux.add_handler("command/login", handle_login);
//! mux.add_handler("command/check/domain", handle_check_domain);
//! let handler = Arc::new(mux).into_handler();
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use tracing::debug;

use epp_wire::{NamespaceAliases, NS_EPP};

use crate::error::{BoxError, RouteError};
use crate::session::{HandlerFn, SessionInfo};

/// Routes inbound EPP documents to registered handlers.
pub struct Mux {
    handlers: HashMap<String, HandlerFn>,
    aliases: NamespaceAliases,
}

impl Default for Mux {
    fn default() -> Self {
        Self::new()
    }
}

impl Mux {
    /// Creates a router seeded with the well-known namespace aliases.
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            aliases: NamespaceAliases::default(),
        }
    }

    /// Registers `alias` for `uri` in dispatch paths, replacing any
    /// previous alias. Several namespaces may share one alias:
    ///
    /// ```ignore
    /// mux.add_namespace_alias("urn:ietf:params:xml:ns:host-1.0", "host-and-contact");
    /// mux.add_namespace_alias("urn:ietf:params:xml:ns:contact-1.0", "host-and-contact");
    /// ```
    pub fn add_namespace_alias(&mut self, uri: impl Into<String>, alias: impl Into<String>) {
        self.aliases.insert(uri, alias);
    }

    /// Registers `handler` for a dispatch path, replacing any previous
    /// handler at that path.
    pub fn add_handler(&mut self, path: impl Into<String>, handler: HandlerFn) {
        self.handlers.insert(path.into(), handler);
    }

    /// Routes one document to its handler.
    ///
    /// # Errors
    ///
    /// [`RouteError::BadRequest`] if the document does not parse,
    /// [`RouteError::MissingEppTag`] / [`RouteError::MalformedEpp`] if
    /// the envelope is wrong, [`RouteError::NoHandler`] if nothing is
    /// registered for the derived path, or whatever the handler fails
    /// with.
    pub async fn handle(
        &self,
        session: Arc<SessionInfo>,
        request: Bytes,
    ) -> Result<Bytes, BoxError> {
        let path = self.dispatch_path(&request)?;
        debug!(session_id = %session.id(), %path, "dispatching command");

        let handler = self
            .handlers
            .get(&path)
            .ok_or(RouteError::NoHandler { path })?;

        handler(session, request).await
    }

    /// Adapts the router into the session handler callback.
    #[must_use]
    pub fn into_handler(self: Arc<Self>) -> HandlerFn {
        Arc::new(move |session, request| {
            let mux = Arc::clone(&self);
            Box::pin(async move { mux.handle(session, request).await })
        })
    }

    /// Derives the dispatch path for a document.
    ///
    /// The root must be `{epp-1.0}epp` with exactly one child element.
    /// A non-`command` child routes by its local name. For commands, the
    /// first child that is not `extension` or `clTRID` classifies:
    /// `login`/`logout`/`poll` route by name alone, every other verb
    /// appends the alias (or URI) of its first child's namespace.
    fn dispatch_path(&self, request: &[u8]) -> Result<String, RouteError> {
        let text = std::str::from_utf8(request)
            .map_err(|error| RouteError::BadRequest(error.to_string()))?;
        let document = roxmltree::Document::parse(text)
            .map_err(|error| RouteError::BadRequest(error.to_string()))?;

        let root = document.root_element();
        if root.tag_name().name() != "epp" || root.tag_name().namespace() != Some(NS_EPP) {
            return Err(RouteError::MissingEppTag);
        }

        let mut elements = root.children().filter(roxmltree::Node::is_element);
        let command = elements.next().ok_or(RouteError::MalformedEpp)?;
        if elements.next().is_some() {
            return Err(RouteError::MalformedEpp);
        }

        let verb = command.tag_name().name();
        if verb != "command" {
            return Ok(verb.to_string());
        }

        let mut path = String::from("command");
        for child in command.children().filter(roxmltree::Node::is_element) {
            let name = child.tag_name().name();
            match name {
                // Present on any command, never classifying.
                "extension" | "clTRID" => continue,
                // Session-management commands defined by eppcom itself.
                "login" | "logout" | "poll" => {
                    path.push('/');
                    path.push_str(name);
                }
                // Object commands route by the namespace of the element
                // they act on.
                _ => {
                    let object = child
                        .children()
                        .find(roxmltree::Node::is_element)
                        .ok_or(RouteError::MalformedEpp)?;
                    let uri = object.tag_name().namespace().unwrap_or("");
                    path.push('/');
                    path.push_str(name);
                    path.push('/');
                    path.push_str(self.aliases.resolve_or_uri(uri));
                }
            }
            break;
        }

        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::session::handler_fn;
    use epp_wire::{NS_CONTACT, NS_DOMAIN, NS_HOST};

    fn session() -> Arc<SessionInfo> {
        Arc::new(SessionInfo::new(None, Vec::new()))
    }

    fn counting_handler(counter: Arc<AtomicUsize>) -> HandlerFn {
        handler_fn(move |_session, _request| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(Bytes::from_static(b"<ok/>"))
            }
        })
    }

    fn login_document() -> Bytes {
        Bytes::from(format!(
            "<epp xmlns=\"{NS_EPP}\"><command><login><clID>reg</clID></login>\
             <clTRID>T-1</clTRID></command></epp>"
        ))
    }

    fn check_document(namespace: &str) -> Bytes {
        Bytes::from(format!(
            "<epp xmlns=\"{NS_EPP}\"><command><check>\
             <obj:check xmlns:obj=\"{namespace}\"><obj:name>x.example</obj:name></obj:check>\
             </check><clTRID>T-2</clTRID></command></epp>"
        ))
    }

    #[tokio::test]
    async fn hello_routes_by_local_name() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut mux = Mux::new();
        mux.add_handler("hello", counting_handler(Arc::clone(&counter)));

        let request = Bytes::from(format!("<epp xmlns=\"{NS_EPP}\"><hello/></epp>"));
        mux.handle(session(), request).await.unwrap();

        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn login_routes_to_registered_handler_exactly_once() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut mux = Mux::new();
        mux.add_handler("command/login", counting_handler(Arc::clone(&counter)));

        mux.handle(session(), login_document()).await.unwrap();

        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn check_commands_route_by_inner_namespace() {
        let domain_hits = Arc::new(AtomicUsize::new(0));
        let host_hits = Arc::new(AtomicUsize::new(0));
        let mut mux = Mux::new();
        mux.add_handler("command/check/domain", counting_handler(Arc::clone(&domain_hits)));
        mux.add_handler("command/check/host", counting_handler(Arc::clone(&host_hits)));

        mux.handle(session(), check_document(NS_DOMAIN)).await.unwrap();

        assert_eq!(domain_hits.load(Ordering::SeqCst), 1);
        assert_eq!(host_hits.load(Ordering::SeqCst), 0);

        mux.handle(session(), check_document(NS_HOST)).await.unwrap();

        assert_eq!(domain_hits.load(Ordering::SeqCst), 1);
        assert_eq!(host_hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unregistered_namespace_routes_by_uri_literal() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut mux = Mux::new();
        // Strip the seeded aliases so the URI itself becomes the segment.
        mux.aliases = NamespaceAliases::empty();
        mux.add_handler(
            format!("command/check/{NS_CONTACT}"),
            counting_handler(Arc::clone(&counter)),
        );

        mux.handle(session(), check_document(NS_CONTACT)).await.unwrap();

        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn missing_epp_root_is_rejected() {
        let mux = Mux::new();
        let request = Bytes::from_static(b"<hello xmlns=\"urn:example:na\"/>");

        let error = mux.handle(session(), request).await.unwrap_err();
        let route = error.downcast::<RouteError>().unwrap();
        assert!(matches!(*route, RouteError::MissingEppTag));
    }

    #[tokio::test]
    async fn envelope_with_two_children_is_malformed() {
        let mux = Mux::new();
        let request = Bytes::from(format!(
            "<epp xmlns=\"{NS_EPP}\"><hello/><hello/></epp>"
        ));

        let error = mux.handle(session(), request).await.unwrap_err();
        let route = error.downcast::<RouteError>().unwrap();
        assert!(matches!(*route, RouteError::MalformedEpp));
    }

    #[tokio::test]
    async fn classifying_verb_without_object_is_malformed() {
        let mux = Mux::new();
        let request = Bytes::from(format!(
            "<epp xmlns=\"{NS_EPP}\"><command><check/></command></epp>"
        ));

        let error = mux.handle(session(), request).await.unwrap_err();
        let route = error.downcast::<RouteError>().unwrap();
        assert!(matches!(*route, RouteError::MalformedEpp));
    }

    #[tokio::test]
    async fn unroutable_path_reports_no_handler() {
        let mux = Mux::new();

        let error = mux.handle(session(), login_document()).await.unwrap_err();
        let route = error.downcast::<RouteError>().unwrap();
        assert!(matches!(*route, RouteError::NoHandler { ref path } if path == "command/login"));
    }

    #[tokio::test]
    async fn unparseable_document_is_bad_request() {
        let mux = Mux::new();
        let request = Bytes::from_static(b"<epp><unclosed></epp>");

        let error = mux.handle(session(), request).await.unwrap_err();
        let route = error.downcast::<RouteError>().unwrap();
        assert!(matches!(*route, RouteError::BadRequest(_)));
    }

    #[tokio::test]
    async fn extension_and_cltrid_do_not_classify() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut mux = Mux::new();
        mux.add_handler("command/login", counting_handler(Arc::clone(&counter)));

        let request = Bytes::from(format!(
            "<epp xmlns=\"{NS_EPP}\"><command><extension><x/></extension>\
             <login><clID>reg</clID></login><clTRID>T-9</clTRID></command></epp>"
        ));
        mux.handle(session(), request).await.unwrap();

        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
