//! Error types for the proposal builder
//!
//! Errors are raised synchronously by the pure builder paths (encoding,
//! arity, authority validation) or passed through unchanged from the
//! transport collaborator. Nothing here is retried locally.

use crate::address::AddressError;
use crate::transport::TransportError;
use thiserror::Error;

/// Error type for all builder operations
#[derive(Error, Debug)]
pub enum TransactionBuilderError {
    /// An index did not fit its fixed-width PDA seed
    #[error("Encoding error: {0}")]
    Encoding(#[from] AddressError),

    /// Per-operation authority list is shorter than the operation list
    ///
    /// Raised before any builder is produced, so the caller keeps the
    /// previous builder intact.
    #[error("Authority list covers {authorities} of {instructions} instructions")]
    Arity {
        instructions: usize,
        authorities: usize,
    },

    /// A custom authority descriptor without its index or bump
    #[error("Invalid authority: {0}")]
    InvalidAuthority(String),

    /// A finalized bundle is not `[create, add_1, ..., add_N]`
    #[error("Invalid instruction order: {0}")]
    InvalidInstructionOrder(String),

    /// Submission or confirmation failed in the transport collaborator
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

impl TransactionBuilderError {
    /// Whether the same call might succeed if repeated.
    ///
    /// A transport failure may or may not have advanced the multisig's
    /// transaction index, so the caller must refresh the multisig snapshot
    /// and rebuild rather than resubmit the same bundle.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(err) => err.is_retryable(),
            Self::Encoding(_)
            | Self::Arity { .. }
            | Self::InvalidAuthority(_)
            | Self::InvalidInstructionOrder(_) => false,
        }
    }

    /// Get the error category for logging fields
    pub fn category(&self) -> &'static str {
        match self {
            Self::Encoding(_) => "encoding",
            Self::Arity { .. } => "arity",
            Self::InvalidAuthority(_) => "authority",
            Self::InvalidInstructionOrder(_) => "validation",
            Self::Transport(_) => "transport",
        }
    }
}

// Convenience constructors
impl TransactionBuilderError {
    pub fn arity(instructions: usize, authorities: usize) -> Self {
        Self::Arity {
            instructions,
            authorities,
        }
    }

    pub fn invalid_order(reason: impl Into<String>) -> Self {
        Self::InvalidInstructionOrder(reason.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::AddressRole;

    #[test]
    fn test_error_display() {
        let err = TransactionBuilderError::arity(3, 2);
        assert_eq!(err.to_string(), "Authority list covers 2 of 3 instructions");

        let err = TransactionBuilderError::from(AddressError::Encoding {
            role: AddressRole::Instruction,
            index: 300,
            width: 1,
        });
        assert_eq!(
            err.to_string(),
            "Encoding error: index 300 does not fit the 1-byte instruction seed"
        );
    }

    #[test]
    fn test_error_retryability() {
        assert!(!TransactionBuilderError::arity(1, 0).is_retryable());
        assert!(!TransactionBuilderError::InvalidAuthority("x".into()).is_retryable());
        assert!(TransactionBuilderError::Transport(TransportError::Rpc("down".into())).is_retryable());
        assert!(!TransactionBuilderError::Transport(TransportError::ProtocolRejection {
            code: Some(6001),
            message: "InvalidTransactionState".into(),
        })
        .is_retryable());
    }

    #[test]
    fn test_error_categories() {
        assert_eq!(TransactionBuilderError::arity(1, 0).category(), "arity");
        assert_eq!(
            TransactionBuilderError::invalid_order("x").category(),
            "validation"
        );
        assert_eq!(
            TransactionBuilderError::Transport(TransportError::Timeout("t".into())).category(),
            "transport"
        );
    }
}
