//! Error types for key generation, signing, verification, and codecs.

use std::error::Error;
use std::fmt;

/// Everything that can go wrong in the scheme. All failures are surfaced to
/// the caller; nothing is swallowed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmssError {
    /// Seed is not exactly 32 bytes.
    InvalidSeedLength { expected: usize, actual: usize },
    /// Requested activation window does not fit the key lifetime.
    InvalidActivationParameters {
        activation_epoch: u64,
        num_active_epochs: u64,
        lifetime: u64,
    },
    /// Expanded window covers fewer than two bottom trees.
    InsufficientBottomTrees { available: u64 },
    /// Signing epoch outside the activation window.
    KeyNotActive {
        epoch: u32,
        activation_epoch: u64,
        num_active_epochs: u64,
    },
    /// Signing epoch outside the two cached bottom trees.
    EpochNotPrepared {
        epoch: u32,
        prepared_start: u64,
        prepared_end: u64,
    },
    /// Verification epoch beyond the key lifetime.
    EpochTooLarge { epoch: u32, lifetime: u64 },
    /// Target-sum or final-layer constraint not satisfied.
    EncodingFailure,
    /// Authentication path does not reconstruct the public root.
    PathMismatch,
    /// Malformed bincode or SSZ input.
    DeserializationFailure { reason: String },
}

impl fmt::Display for XmssError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSeedLength { expected, actual } => {
                write!(f, "invalid seed length {} (expected {})", actual, expected)
            }
            Self::InvalidActivationParameters {
                activation_epoch,
                num_active_epochs,
                lifetime,
            } => write!(
                f,
                "activation window [{}, {}) exceeds key lifetime {}",
                activation_epoch,
                activation_epoch + num_active_epochs,
                lifetime
            ),
            Self::InsufficientBottomTrees { available } => {
                write!(f, "expanded window covers {} bottom trees (need 2)", available)
            }
            Self::KeyNotActive {
                epoch,
                activation_epoch,
                num_active_epochs,
            } => write!(
                f,
                "epoch {} is outside the activation window [{}, {})",
                epoch,
                activation_epoch,
                activation_epoch + num_active_epochs
            ),
            Self::EpochNotPrepared {
                epoch,
                prepared_start,
                prepared_end,
            } => write!(
                f,
                "epoch {} is outside the prepared window [{}, {})",
                epoch, prepared_start, prepared_end
            ),
            Self::EpochTooLarge { epoch, lifetime } => {
                write!(f, "epoch {} is beyond the key lifetime {}", epoch, lifetime)
            }
            Self::EncodingFailure => write!(f, "message encoding constraints not satisfied"),
            Self::PathMismatch => {
                write!(f, "authentication path does not match the public root")
            }
            Self::DeserializationFailure { reason } => {
                write!(f, "deserialization failed: {}", reason)
            }
        }
    }
}

impl Error for XmssError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_context() {
        let err = XmssError::KeyNotActive {
            epoch: 110,
            activation_epoch: 100,
            num_active_epochs: 10,
        };
        assert_eq!(
            err.to_string(),
            "epoch 110 is outside the activation window [100, 110)"
        );

        let err = XmssError::InvalidSeedLength {
            expected: 32,
            actual: 31,
        };
        assert_eq!(err.to_string(), "invalid seed length 31 (expected 32)");
    }

    #[test]
    fn error_trait_object() {
        let err: Box<dyn Error> = Box::new(XmssError::PathMismatch);
        assert!(err.to_string().contains("authentication path"));
    }
}
