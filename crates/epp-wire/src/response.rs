//! Serializable greeting and response payloads.
//!
//! These are the envelope-level message bodies every server emits
//! regardless of which object mappings it implements. They serialize to
//! the exact element shapes of the EPP schema and are fed to
//! [`encode`](crate::envelope::encode) for wrapping.

use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use crate::result::ResultCode;

/// The server greeting sent immediately after connection (RFC 5730 §2.4).
#[derive(Debug, Clone, Serialize)]
#[serde(rename = "greeting")]
pub struct Greeting {
    #[serde(rename = "svID")]
    pub server_id: String,
    /// Server time in RFC 3339 form.
    #[serde(rename = "svDate")]
    pub server_date: String,
    #[serde(rename = "svcMenu")]
    pub service_menu: ServiceMenu,
    #[serde(rename = "dcp")]
    pub data_collection_policy: DataCollectionPolicy,
}

impl Greeting {
    /// Creates a greeting stamped with the current time, announcing
    /// protocol version 1.0, language `en`, and the given object URIs.
    #[must_use]
    pub fn new(server_id: impl Into<String>, object_uris: Vec<String>) -> Self {
        Self {
            server_id: server_id.into(),
            server_date: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            service_menu: ServiceMenu {
                versions: vec!["1.0".into()],
                languages: vec!["en".into()],
                object_uris,
            },
            data_collection_policy: DataCollectionPolicy::default(),
        }
    }
}

/// The `<svcMenu>` block of a greeting.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceMenu {
    #[serde(rename = "version")]
    pub versions: Vec<String>,
    #[serde(rename = "lang")]
    pub languages: Vec<String>,
    #[serde(rename = "objURI")]
    pub object_uris: Vec<String>,
}

/// The `<dcp>` block of a greeting.
///
/// A minimal, truthful default: all data is accessible, collected for
/// administrative and provisioning purposes, shared with this operator
/// only, and retained as stated in the service agreement.
#[derive(Debug, Clone, Serialize)]
pub struct DataCollectionPolicy {
    pub access: DcpAccess,
    pub statement: DcpStatement,
}

impl Default for DataCollectionPolicy {
    fn default() -> Self {
        Self {
            access: DcpAccess { all: () },
            statement: DcpStatement {
                purpose: DcpPurpose {
                    admin: (),
                    prov: (),
                },
                recipient: DcpRecipient { ours: () },
                retention: DcpRetention { stated: () },
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DcpAccess {
    pub all: (),
}

#[derive(Debug, Clone, Serialize)]
pub struct DcpStatement {
    pub purpose: DcpPurpose,
    pub recipient: DcpRecipient,
    pub retention: DcpRetention,
}

#[derive(Debug, Clone, Serialize)]
pub struct DcpPurpose {
    pub admin: (),
    pub prov: (),
}

#[derive(Debug, Clone, Serialize)]
pub struct DcpRecipient {
    pub ours: (),
}

#[derive(Debug, Clone, Serialize)]
pub struct DcpRetention {
    pub stated: (),
}

/// A command response: one or more results plus the transaction IDs.
#[derive(Debug, Clone, Serialize)]
#[serde(rename = "response")]
pub struct Response {
    #[serde(rename = "result")]
    pub results: Vec<CommandResult>,
    #[serde(rename = "trID")]
    pub transaction_id: TransactionId,
}

impl Response {
    /// A single-result response with the code's standard message.
    #[must_use]
    pub fn from_code(code: ResultCode) -> Self {
        Self {
            results: vec![CommandResult {
                code: code.code(),
                message: code.message().to_string(),
                external_value: None,
            }],
            transaction_id: TransactionId::default(),
        }
    }

    /// An error response carrying `reason` as the external value.
    #[must_use]
    pub fn error(code: ResultCode, reason: impl Into<String>) -> Self {
        Self {
            results: vec![CommandResult {
                code: code.code(),
                message: code.message().to_string(),
                external_value: Some(ExternalValue {
                    reason: reason.into(),
                }),
            }],
            transaction_id: TransactionId::default(),
        }
    }

    /// Sets the client and server transaction identifiers.
    #[must_use]
    pub fn with_transaction(
        mut self,
        client: Option<String>,
        server: impl Into<String>,
    ) -> Self {
        self.transaction_id = TransactionId {
            client,
            server: server.into(),
        };
        self
    }
}

/// A single `<result>` element.
#[derive(Debug, Clone, Serialize)]
pub struct CommandResult {
    #[serde(rename = "@code")]
    pub code: u16,
    #[serde(rename = "msg")]
    pub message: String,
    #[serde(rename = "extValue", skip_serializing_if = "Option::is_none")]
    pub external_value: Option<ExternalValue>,
}

/// The `<extValue>` block carrying a server-specific reason.
#[derive(Debug, Clone, Serialize)]
pub struct ExternalValue {
    pub reason: String,
}

/// The `<trID>` block correlating a response to its command.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TransactionId {
    #[serde(rename = "clTRID", skip_serializing_if = "Option::is_none")]
    pub client: Option<String>,
    #[serde(rename = "svTRID")]
    pub server: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aliases::NamespaceAliases;
    use crate::envelope::{encode, server_xml_attributes};
    use crate::result::terminal_result_code;

    #[test]
    fn greeting_encodes_with_service_menu() {
        let greeting = Greeting::new(
            "epp.example.test",
            vec![crate::aliases::NS_DOMAIN.to_string()],
        );
        let output = encode(
            &greeting,
            &server_xml_attributes(),
            &NamespaceAliases::default(),
        )
        .unwrap();
        let text = String::from_utf8(output).unwrap();

        assert!(text.contains("<greeting>"));
        assert!(text.contains("<svID>epp.example.test</svID>"));
        assert!(text.contains("<version>1.0</version>"));
        assert!(text.contains("<objURI>urn:ietf:params:xml:ns:domain-1.0</objURI>"));
        assert!(text.contains("<dcp>"));
    }

    #[test]
    fn response_carries_code_message_and_transaction_ids() {
        let response = Response::from_code(ResultCode::Ok)
            .with_transaction(Some("ABC-123".into()), "SV-1");
        let output = encode(
            &response,
            &server_xml_attributes(),
            &NamespaceAliases::default(),
        )
        .unwrap();
        let text = String::from_utf8(output).unwrap();

        assert!(text.contains("<result code=\"1000\">"));
        assert!(text.contains("<msg>Command completed successfully</msg>"));
        assert!(text.contains("<clTRID>ABC-123</clTRID>"));
        assert!(text.contains("<svTRID>SV-1</svTRID>"));
    }

    #[test]
    fn error_response_carries_reason() {
        let response = Response::error(ResultCode::SyntaxError, "unexpected element");
        let output = encode(
            &response,
            &server_xml_attributes(),
            &NamespaceAliases::default(),
        )
        .unwrap();
        let text = String::from_utf8(output).unwrap();

        assert!(text.contains("<result code=\"2001\">"));
        assert!(text.contains("<reason>unexpected element</reason>"));
    }

    #[test]
    fn bye_response_is_detected_as_terminal() {
        let response = Response::from_code(ResultCode::OkBye).with_transaction(None, "SV-2");
        let output = encode(
            &response,
            &server_xml_attributes(),
            &NamespaceAliases::default(),
        )
        .unwrap();

        assert_eq!(terminal_result_code(&output), Some(ResultCode::OkBye));
    }

    #[test]
    fn ordinary_response_is_not_terminal() {
        let response = Response::from_code(ResultCode::Ok).with_transaction(None, "SV-3");
        let output = encode(
            &response,
            &server_xml_attributes(),
            &NamespaceAliases::default(),
        )
        .unwrap();

        assert_eq!(terminal_result_code(&output), None);
    }
}
