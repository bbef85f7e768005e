//! Oblivious transfer over secp256k1.
//!
//! [`base`] is a single 1-out-of-2 OT in the "simplest OT" style (sender
//! point `A = a*G`, receiver point `B = b*G` or `B = b*G + A`), and
//! [`correlated`] runs [`BIT_LENGTH`](crate::BIT_LENGTH) of them in parallel
//! with correlated payloads.

use thiserror::Error;

pub mod base;
pub mod correlated;

/// Errors raised by the curve, masking and OT layers.
///
/// They never leave the correlated batch: [`correlated::COTSender`] turns
/// them into a failed result object.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ErrorOT {
    #[error("invalid point encoding: {0}")]
    InvalidPointEncoding(String),
    #[error("peer point is not a valid secp256k1 point")]
    InvalidPeerPoint,
    #[error("invalid key material of length {0}")]
    InvalidKeyMaterial(usize),
    #[error("OT encryption failed: {0}")]
    EncryptionFailed(Box<ErrorOT>),
}

impl ErrorOT {
    #[must_use]
    pub fn encoding(description: &str) -> ErrorOT {
        ErrorOT::InvalidPointEncoding(String::from(description))
    }
}
