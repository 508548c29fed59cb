//! Error taxonomy for query generation.
//!
//! Every failure here is a contract violation by the builder layer or a
//! dialect limitation. Generation is deterministic, so the same input always
//! fails the same way and no partial output is ever returned.

/// Errors raised while rendering a query.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerateError {
    /// The construct needs a dialect feature that is not available and no
    /// fallback encoding exists.
    #[error("Unsupported by {dialect}: {message}")]
    UnsupportedShape { dialect: String, message: String },

    /// The builder supplied a structurally impossible combination.
    #[error("Invalid query shape: {0}")]
    InvalidQueryShape(String),

    /// A parameter or alias is missing metadata required for rendering.
    #[error("Unresolved reference: {0}")]
    UnresolvedReference(String),

    /// The operation is not available for this builder variant.
    #[error("Operation '{operation}' is not supported for {variant}")]
    UnsupportedForVariant {
        variant: &'static str,
        operation: &'static str,
    },
}

impl GenerateError {
    pub fn unsupported(dialect: &str, message: impl Into<String>) -> Self {
        GenerateError::UnsupportedShape {
            dialect: dialect.to_string(),
            message: message.into(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        GenerateError::InvalidQueryShape(message.into())
    }
}

pub type GenerateResult<T> = Result<T, GenerateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GenerateError::unsupported("openjpa", "Unknown function [ADD_DAYS] is used!");
        assert_eq!(
            err.to_string(),
            "Unsupported by openjpa: Unknown function [ADD_DAYS] is used!"
        );

        let err = GenerateError::UnsupportedForVariant {
            variant: "DeleteCollectionQuery",
            operation: "copy",
        };
        assert_eq!(
            err.to_string(),
            "Operation 'copy' is not supported for DeleteCollectionQuery"
        );
    }
}
