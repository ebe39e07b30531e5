//! EPP result codes per RFC 5730 §3.
//!
//! Four of the codes are connection-management ("bye") codes: a response
//! carrying 1500, 2500, 2501 or 2502 obliges the server to close the
//! session once the response has been written. [`terminal_result_code`]
//! inspects an outgoing document for that obligation.

use crate::aliases::NS_EPP;

/// A result code carried in an EPP `<result>` element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ResultCode {
    Ok = 1000,
    OkPending = 1001,
    OkNoMessages = 1300,
    OkMessages = 1301,
    OkBye = 1500,
    UnknownCommand = 2000,
    SyntaxError = 2001,
    UseError = 2002,
    MissingParam = 2003,
    ParamRangeError = 2004,
    ParamSyntaxError = 2005,
    UnimplementedVersion = 2100,
    UnimplementedCommand = 2101,
    UnimplementedOption = 2102,
    UnimplementedExtension = 2103,
    BillingFailure = 2104,
    NotRenewable = 2105,
    NotTransferrable = 2106,
    AuthenticationError = 2200,
    AuthorisationError = 2201,
    InvalidAuthInfo = 2202,
    ObjectPendingTransfer = 2300,
    ObjectNotPendingTransfer = 2301,
    ObjectExists = 2302,
    ObjectDoesNotExist = 2303,
    StatusProhibitsOp = 2304,
    AssocProhibitsOp = 2305,
    ParamPolicyError = 2306,
    UnimplementedObjectService = 2307,
    DataMgmtPolicyViolation = 2308,
    CommandFailed = 2400,
    CommandFailedBye = 2500,
    AuthFailedBye = 2501,
    SessionLimitExceededBye = 2502,
}

impl ResultCode {
    /// The numeric code as carried on the wire.
    #[must_use]
    pub const fn code(self) -> u16 {
        self as u16
    }

    /// The human-readable message defined for this code.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::Ok => "Command completed successfully",
            Self::OkPending => "Command completed successfully; action pending",
            Self::OkNoMessages => "Command completed successfully; no messages",
            Self::OkMessages => "Command completed successfully; ack to dequeue",
            Self::OkBye => "Command completed successfully; ending session",
            Self::UnknownCommand => "Unknown command",
            Self::SyntaxError => "Command syntax error",
            Self::UseError => "Command use error",
            Self::MissingParam => "Required parameter missing",
            Self::ParamRangeError => "Parameter value range error",
            Self::ParamSyntaxError => "Parameter value syntax error",
            Self::UnimplementedVersion => "Unimplemented protocol version",
            Self::UnimplementedCommand => "Unimplemented command",
            Self::UnimplementedOption => "Unimplemented option",
            Self::UnimplementedExtension => "Unimplemented extension",
            Self::BillingFailure => "Billing failure",
            Self::NotRenewable => "Object is not eligible for renewal",
            Self::NotTransferrable => "Object is not eligible for transfer",
            Self::AuthenticationError => "Authentication error",
            Self::AuthorisationError => "Authorization error",
            Self::InvalidAuthInfo => "Invalid authorization information",
            Self::ObjectPendingTransfer => "Object pending transfer",
            Self::ObjectNotPendingTransfer => "Object not pending transfer",
            Self::ObjectExists => "Object exists",
            Self::ObjectDoesNotExist => "Object does not exist",
            Self::StatusProhibitsOp => "Object status prohibits operation",
            Self::AssocProhibitsOp => "Object association prohibits operation",
            Self::ParamPolicyError => "Parameter value policy error",
            Self::UnimplementedObjectService => "Unimplemented object service",
            Self::DataMgmtPolicyViolation => "Data management policy violation",
            Self::CommandFailed => "Command failed",
            Self::CommandFailedBye => "Command failed; server closing connection",
            Self::AuthFailedBye => "Authentication error; server closing connection",
            Self::SessionLimitExceededBye => "Session limit exceeded; server closing connection",
        }
    }

    /// Returns `true` for the connection-management codes that oblige the
    /// server to close the session after responding.
    #[must_use]
    pub const fn is_bye(self) -> bool {
        matches!(
            self,
            Self::OkBye | Self::CommandFailedBye | Self::AuthFailedBye | Self::SessionLimitExceededBye
        )
    }
}

impl std::fmt::Display for ResultCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.code(), self.message())
    }
}

/// Error returned when a numeric code is not an RFC 5730 result code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{0} is not an EPP result code")]
pub struct UnknownResultCode(pub u16);

impl TryFrom<u16> for ResultCode {
    type Error = UnknownResultCode;

    fn try_from(code: u16) -> Result<Self, Self::Error> {
        let known = match code {
            1000 => Self::Ok,
            1001 => Self::OkPending,
            1300 => Self::OkNoMessages,
            1301 => Self::OkMessages,
            1500 => Self::OkBye,
            2000 => Self::UnknownCommand,
            2001 => Self::SyntaxError,
            2002 => Self::UseError,
            2003 => Self::MissingParam,
            2004 => Self::ParamRangeError,
            2005 => Self::ParamSyntaxError,
            2100 => Self::UnimplementedVersion,
            2101 => Self::UnimplementedCommand,
            2102 => Self::UnimplementedOption,
            2103 => Self::UnimplementedExtension,
            2104 => Self::BillingFailure,
            2105 => Self::NotRenewable,
            2106 => Self::NotTransferrable,
            2200 => Self::AuthenticationError,
            2201 => Self::AuthorisationError,
            2202 => Self::InvalidAuthInfo,
            2300 => Self::ObjectPendingTransfer,
            2301 => Self::ObjectNotPendingTransfer,
            2302 => Self::ObjectExists,
            2303 => Self::ObjectDoesNotExist,
            2304 => Self::StatusProhibitsOp,
            2305 => Self::AssocProhibitsOp,
            2306 => Self::ParamPolicyError,
            2307 => Self::UnimplementedObjectService,
            2308 => Self::DataMgmtPolicyViolation,
            2400 => Self::CommandFailed,
            2500 => Self::CommandFailedBye,
            2501 => Self::AuthFailedBye,
            2502 => Self::SessionLimitExceededBye,
            other => return Err(UnknownResultCode(other)),
        };
        Ok(known)
    }
}

/// Returns the first connection-management result code carried by an
/// outgoing document, if any.
///
/// The document is expected to be a complete `<epp>` envelope; anything
/// that does not parse, or carries no bye code, yields `None`. The
/// session engine consults this after every successful send.
#[must_use]
pub fn terminal_result_code(document: &[u8]) -> Option<ResultCode> {
    let text = std::str::from_utf8(document).ok()?;
    let parsed = roxmltree::Document::parse(text).ok()?;

    parsed
        .descendants()
        .filter(|node| {
            node.is_element()
                && node.tag_name().name() == "result"
                && node.tag_name().namespace() == Some(NS_EPP)
        })
        .find_map(|node| {
            let code = node.attribute("code")?.parse::<u16>().ok()?;
            let code = ResultCode::try_from(code).ok()?;
            code.is_bye().then_some(code)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bye_codes_are_exactly_the_connection_management_set() {
        let bye: Vec<u16> = (1000..=2502)
            .filter_map(|code| ResultCode::try_from(code).ok())
            .filter(|code| code.is_bye())
            .map(ResultCode::code)
            .collect();
        assert_eq!(bye, vec![1500, 2500, 2501, 2502]);
    }

    #[test]
    fn code_round_trips_through_try_from() {
        for code in [1000, 1001, 1300, 1301, 1500, 2000, 2308, 2400, 2502] {
            assert_eq!(ResultCode::try_from(code).unwrap().code(), code);
        }
        assert_eq!(ResultCode::try_from(1999), Err(UnknownResultCode(1999)));
    }

    #[test]
    fn messages_match_rfc_5730() {
        assert_eq!(ResultCode::Ok.message(), "Command completed successfully");
        assert_eq!(
            ResultCode::OkBye.message(),
            "Command completed successfully; ending session"
        );
        assert_eq!(
            ResultCode::AuthFailedBye.message(),
            "Authentication error; server closing connection"
        );
    }

    #[test]
    fn terminal_code_detected_in_response_document() {
        let document = format!(
            "<epp xmlns=\"{NS_EPP}\"><response><result code=\"1500\">\
             <msg>Command completed successfully; ending session</msg>\
             </result></response></epp>"
        );
        assert_eq!(
            terminal_result_code(document.as_bytes()),
            Some(ResultCode::OkBye)
        );
    }

    #[test]
    fn non_terminal_and_unparseable_documents_yield_none() {
        let ok = format!(
            "<epp xmlns=\"{NS_EPP}\"><response><result code=\"1000\"/></response></epp>"
        );
        assert_eq!(terminal_result_code(ok.as_bytes()), None);
        assert_eq!(terminal_result_code(b"<greeting"), None);
        assert_eq!(terminal_result_code(b""), None);
    }

    #[test]
    fn result_outside_the_epp_namespace_is_ignored() {
        let document =
            "<epp xmlns=\"urn:example:other\"><response><result code=\"1500\"/></response></epp>";
        assert_eq!(terminal_result_code(document.as_bytes()), None);
    }
}
