//! Error types and handling for lint engine operations

use std::any::Any;
use thiserror::Error;

/// Main error type for lint engine operations
#[derive(Debug, Error)]
pub enum LintError {
    /// A rule definition failed structural validation
    #[error("Invalid rule definition: field '{field}': {message}")]
    InvalidRule { field: String, message: String },

    /// A listener map returned by a rule factory failed validation
    #[error("Invalid listener for '{key}': {message}")]
    InvalidListener { key: String, message: String },

    /// A listener-map key does not name a member of the closed node-type set
    #[error("Unknown node type '{name}'")]
    UnknownNodeType { name: String },

    /// A rule id collided with an existing registration
    #[error("Rule '{rule_id}' is already registered")]
    DuplicateRule { rule_id: String },

    /// Rule registration or execution errors attributed to a specific rule
    #[error("Rule error in '{rule_id}': {message}")]
    RuleError { rule_id: String, message: String },

    /// A source range or fix range was malformed or out of bounds
    #[error("Range error: {message}")]
    RangeError { message: String },

    /// Generic internal errors
    #[error("Internal error: {message}")]
    InternalError { message: String },
}

/// Error kind enumeration for categorizing errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Definition,
    Registry,
    Rule,
    Range,
    Internal,
}

impl LintError {
    /// Get the error kind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            LintError::InvalidRule { .. } => ErrorKind::Definition,
            LintError::InvalidListener { .. } => ErrorKind::Definition,
            LintError::UnknownNodeType { .. } => ErrorKind::Definition,
            LintError::DuplicateRule { .. } => ErrorKind::Registry,
            LintError::RuleError { .. } => ErrorKind::Rule,
            LintError::RangeError { .. } => ErrorKind::Range,
            LintError::InternalError { .. } => ErrorKind::Internal,
        }
    }

    /// Check if this error is recoverable (can continue with other rules/files)
    pub fn is_recoverable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Rule | ErrorKind::Range)
    }

    /// Create an invalid-rule error naming the offending field
    pub fn invalid_rule(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidRule {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an invalid-listener error naming the offending key
    pub fn invalid_listener(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidListener {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Create an unknown-node-type error
    pub fn unknown_node_type(name: impl Into<String>) -> Self {
        Self::UnknownNodeType { name: name.into() }
    }

    /// Create a duplicate-registration error
    pub fn duplicate_rule(rule_id: impl Into<String>) -> Self {
        Self::DuplicateRule {
            rule_id: rule_id.into(),
        }
    }

    /// Create a rule error
    pub fn rule_error(rule_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RuleError {
            rule_id: rule_id.into(),
            message: message.into(),
        }
    }

    /// Create a range error
    pub fn range_error(message: impl Into<String>) -> Self {
        Self::RangeError {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::InternalError {
            message: message.into(),
        }
    }
}

/// Extract a human-readable message from a panic payload
pub(crate) fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            LintError::invalid_rule("id", "cannot be empty").kind(),
            ErrorKind::Definition
        );
        assert_eq!(
            LintError::duplicate_rule("logical/no-unused").kind(),
            ErrorKind::Registry
        );
        assert_eq!(
            LintError::range_error("inverted range").kind(),
            ErrorKind::Range
        );
    }

    #[test]
    fn test_recoverability() {
        assert!(LintError::rule_error("logical/no-unused", "boom").is_recoverable());
        assert!(!LintError::invalid_rule("create", "missing").is_recoverable());
    }

    #[test]
    fn test_error_messages_name_fields() {
        let err = LintError::invalid_rule("docs_url", "cannot be empty");
        assert!(err.to_string().contains("docs_url"));

        let err = LintError::invalid_listener("IfStatement", "enter and exit both absent");
        assert!(err.to_string().contains("IfStatement"));
    }

    #[test]
    fn test_panic_message_extraction() {
        let payload: Box<dyn Any + Send> = Box::new("static message");
        assert_eq!(panic_message(payload), "static message");

        let payload: Box<dyn Any + Send> = Box::new(String::from("owned message"));
        assert_eq!(panic_message(payload), "owned message");

        let payload: Box<dyn Any + Send> = Box::new(42_u32);
        assert_eq!(panic_message(payload), "unknown panic");
    }
}
