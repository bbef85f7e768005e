//! The MTA protocol on Alice's side and the machinery to run it over a byte stream.

use thiserror::Error;

pub mod client;
pub mod config;
pub mod framing;
pub mod messages;
pub mod mta;
pub mod schema;

/// Errors that end a protocol run.
///
/// Cryptographic failures do not appear here directly: the MTA layer
/// reports them as unsuccessful results, which the client turns into
/// [`ProtocolError::ResponseFailed`] or [`ProtocolError::FinalizeFailed`].
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed frame: {0}")]
    MalformedFrame(String),
    #[error("peer reported a failure in {0}")]
    PeerReportedFailure(&'static str),
    #[error("connection closed before the protocol completed")]
    PrematureDisconnect,
    #[error("could not prepare the response to the peer setup")]
    ResponseFailed,
    #[error("could not compute the additive share")]
    FinalizeFailed,
    #[error("could not encode or decode {message}: {reason}")]
    Schema {
        message: &'static str,
        reason: String,
    },
    #[error("a protocol run was already started on this client")]
    AlreadyStarted,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
