//! Alice's side of a two-party multiplication-to-addition (MTA) protocol.
//!
//! Alice holds a multiplicative share `x` and the peer (Bob) holds `y`. The
//! parties run 32 instances of 1-out-of-2 oblivious transfer over secp256k1,
//! arranged as a correlated OT batch, and end up with additive shares of
//! `x * y` modulo `2^32`.
//!
//! The crate is split as follows:
//! - [`utilities`] has the cryptographic building blocks (curve arithmetic,
//!   masking, the single OT leg and the correlated batch).
//! - [`protocols`] has the MTA orchestration, the binary layouts exchanged
//!   with the peer and the client state machine that drives a run over a
//!   byte stream.

pub mod protocols;
pub mod utilities;

// Number of bits in the multiplicative share, hence number of OT instances.
pub const BIT_LENGTH: usize = 32;

// Uncompressed SEC1 encoding: tag 0x04, 32 bytes of X and 32 bytes of Y.
pub const POINT_SIZE: usize = 65;

// Length of keys and of each (padded) OT payload.
pub const KEY_SIZE: usize = 32;
