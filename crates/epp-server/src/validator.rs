//! Schema validation contract.
//!
//! Validation is an injected capability: the server never bundles an XSD
//! engine. When a validator is configured, every inbound and outbound
//! document passes through it and any failure is terminal for the
//! session. When none is configured, validation is a no-op.
//!
//! One validator instance is shared across all sessions of a server, so
//! implementations must be safe for concurrent callers. Native
//! resources are released by `Drop` when the last owner goes away.

use crate::error::ValidationError;

/// Validates documents against an installed schema.
pub trait Validator: Send + Sync {
    /// Succeeds iff `document` conforms to the schema.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] listing every violation.
    fn validate(&self, document: &[u8]) -> Result<(), ValidationError>;
}

/// A validator that only checks XML well-formedness.
///
/// Useful where no XSD back-end is wired up: it still rejects documents
/// an XML parser cannot read, which is the minimum any EPP endpoint
/// must enforce.
#[derive(Debug, Clone, Copy, Default)]
pub struct WellFormed;

impl Validator for WellFormed {
    fn validate(&self, document: &[u8]) -> Result<(), ValidationError> {
        let text = std::str::from_utf8(document)
            .map_err(|error| ValidationError::single(format!("document is not UTF-8: {error}")))?;
        roxmltree::Document::parse(text)
            .map(|_| ())
            .map_err(|error| ValidationError::single(error.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_formed_document_passes() {
        assert!(WellFormed.validate(b"<epp><hello/></epp>").is_ok());
    }

    #[test]
    fn malformed_document_fails_with_violation() {
        let error = WellFormed.validate(b"<epp><hello></epp>").unwrap_err();
        assert_eq!(error.violations.len(), 1);
    }

    #[test]
    fn non_utf8_document_fails() {
        assert!(WellFormed.validate(&[0xff, 0xfe, 0x00]).is_err());
    }
}
