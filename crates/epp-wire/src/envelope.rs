//! XML envelope encoding.
//!
//! Outgoing EPP documents share one shape: an `<epp>` root element
//! carrying the protocol namespace declarations, with the payload as its
//! single child and object-mapping elements rewritten to alias-prefixed
//! names (`domain:chkData`) so the result validates against the schemas.
//!
//! [`encode`] produces that shape in three steps: the payload is
//! serialized to a provisional document, parsed back into a
//! namespace-resolved tree, and re-emitted under a fresh `<epp>` root
//! while aliased names and `xmlns:` declarations are injected on the
//! way out. Each alias is declared on the topmost element of its
//! subtree; descendants on the same path reuse the declaration.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use serde::Serialize;

use crate::aliases::{NamespaceAliases, NS_EPP};
use crate::error::EnvelopeError;

/// Root attributes for server-originated documents: the EPP namespace
/// plus the XML Schema instance declarations.
#[must_use]
pub fn server_xml_attributes() -> [(&'static str, &'static str); 3] {
    [
        ("xmlns", NS_EPP),
        ("xmlns:xsi", "http://www.w3.org/2001/XMLSchema-instance"),
        (
            "xsi:schemaLocation",
            "urn:ietf:params:xml:ns:epp-1.0 epp-1.0.xsd",
        ),
    ]
}

/// Root attributes for client-originated documents: the EPP namespace
/// only.
#[must_use]
pub fn client_xml_attributes() -> [(&'static str, &'static str); 1] {
    [("xmlns", NS_EPP)]
}

/// Encodes `payload` as a complete EPP document.
///
/// The payload is serialized structurally, then wrapped in an `<epp>`
/// root carrying `root_attributes` (one of [`server_xml_attributes`] or
/// [`client_xml_attributes`] for the canonical sets). Elements whose
/// namespace is registered in `aliases` are renamed to
/// `alias:localName`, with the `xmlns:alias` declaration emitted on the
/// first such element of each root-to-leaf path. Elements in an
/// unregistered namespace keep their name and their default-namespace
/// declaration.
///
/// The output is indented with two spaces and preceded by an XML
/// declaration.
///
/// # Errors
///
/// Returns [`EnvelopeError`] if the payload cannot be serialized or the
/// provisional document is not well-formed.
pub fn encode<T: Serialize>(
    payload: &T,
    root_attributes: &[(&str, &str)],
    aliases: &NamespaceAliases,
) -> Result<Vec<u8>, EnvelopeError> {
    let provisional = quick_xml::se::to_string(payload)?;
    let document = roxmltree::Document::parse(&provisional)?;

    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut root = BytesStart::new("epp");
    for (name, value) in root_attributes {
        root.push_attribute((*name, *value));
    }
    writer.write_event(Event::Start(root))?;

    let mut declared = Vec::new();
    write_element(
        &mut writer,
        document.root_element(),
        aliases,
        &mut declared,
        "",
    )?;

    writer.write_event(Event::End(BytesEnd::new("epp")))?;

    let mut output = writer.into_inner();
    output.push(b'\n');
    Ok(output)
}

/// Re-emits `node` and its subtree, applying alias decoration.
///
/// `declared` is the stack of aliases already declared on the current
/// root-to-leaf path; `inherited_default` is the default namespace in
/// scope from unaliased ancestors.
fn write_element(
    writer: &mut Writer<Vec<u8>>,
    node: roxmltree::Node<'_, '_>,
    aliases: &NamespaceAliases,
    declared: &mut Vec<String>,
    inherited_default: &str,
) -> Result<(), EnvelopeError> {
    let local = node.tag_name().name();
    let uri = node.tag_name().namespace().unwrap_or("");

    let mut namespace_attr: Option<(String, &str)> = None;
    let mut pushed_alias = false;
    let mut default_for_children = inherited_default;

    let name = if uri.is_empty() {
        local.to_string()
    } else if let Some(alias) = aliases.resolve(uri) {
        if !declared.iter().any(|seen| seen == alias) {
            namespace_attr = Some((format!("xmlns:{alias}"), uri));
            declared.push(alias.to_string());
            pushed_alias = true;
        }
        format!("{alias}:{local}")
    } else {
        if uri != inherited_default {
            namespace_attr = Some(("xmlns".to_string(), uri));
        }
        default_for_children = uri;
        local.to_string()
    };

    let mut start = BytesStart::new(name.as_str());
    if let Some((attr_name, attr_value)) = &namespace_attr {
        start.push_attribute((attr_name.as_str(), *attr_value));
    }
    for attribute in node.attributes() {
        start.push_attribute((attribute.name(), attribute.value()));
    }

    let children: Vec<_> = node.children().filter(roxmltree::Node::is_element).collect();
    let text = node
        .children()
        .find_map(|child| if child.is_text() { child.text() } else { None })
        .map(str::trim)
        .filter(|text| !text.is_empty());

    if children.is_empty() && text.is_none() {
        writer.write_event(Event::Empty(start))?;
    } else {
        writer.write_event(Event::Start(start))?;
        if let Some(text) = text {
            writer.write_event(Event::Text(BytesText::new(text)))?;
        }
        for child in children {
            write_element(writer, child, aliases, declared, default_for_children)?;
        }
        writer.write_event(Event::End(BytesEnd::new(name.as_str())))?;
    }

    if pushed_alias {
        declared.pop();
    }

    Ok(())
}
