//! Fixed binary layouts exchanged between the protocol layer and the batch layer.
//!
//! Every integer is little-endian and every layout starts with a one-byte
//! success flag (`1` for true). These layouts are shared with the peer's
//! implementation, so field order and sizes must not change.
//!
//! Decoding never fails loudly: a buffer that is too short (or, for the
//! 5-byte layouts, of the wrong size) gives the `failure()` value of the type.
//! A short `AliceMessages` keeps the masked share read from its header.

use serde::{Deserialize, Serialize};

use crate::utilities::ot::correlated::{CIPHERS_SIZE, POINTS_SIZE};

const HEADER_SIZE: usize = 5;

/// Alice's batch setup: her points and the echoed correlation value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CotSetup {
    pub success: bool,
    pub correlation_x: u32,
    #[serde(with = "serde_bytes")]
    pub points_a: Vec<u8>,
}

/// The peer's OT points.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BobSetup {
    pub success: bool,
    pub correlation_delta: u32,
    #[serde(with = "serde_bytes")]
    pub points_b: Vec<u8>,
}

/// Alice's answer: blinded share, her points and both ciphertext arrays.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliceMessages {
    pub success: bool,
    pub masked_share: u32,
    #[serde(with = "serde_bytes")]
    pub points_a: Vec<u8>,
    #[serde(with = "serde_bytes")]
    pub encrypted_m0: Vec<u8>,
    #[serde(with = "serde_bytes")]
    pub encrypted_m1: Vec<u8>,
}

/// The peer's final message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BobMessages {
    pub success: bool,
    pub masked_share: u32,
}

/// Outcome of a run. It is kept locally and never sent to the peer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MtaResult {
    pub success: bool,
    pub additive_share: u32,
}

impl CotSetup {
    #[must_use]
    pub fn failure() -> CotSetup {
        CotSetup::default()
    }

    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buffer = header(self.success, self.correlation_x, self.points_a.len());
        buffer.extend_from_slice(&self.points_a);
        buffer
    }

    #[must_use]
    pub fn from_bytes(buffer: &[u8]) -> CotSetup {
        if buffer.len() < HEADER_SIZE + POINTS_SIZE {
            return CotSetup::failure();
        }

        let (success, correlation_x) = read_header(buffer);
        CotSetup {
            success,
            correlation_x,
            points_a: buffer[HEADER_SIZE..HEADER_SIZE + POINTS_SIZE].to_vec(),
        }
    }
}

impl BobSetup {
    /// Smallest buffer that holds a full setup.
    pub const MIN_SIZE: usize = HEADER_SIZE + POINTS_SIZE;

    #[must_use]
    pub fn failure() -> BobSetup {
        BobSetup::default()
    }

    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buffer = header(self.success, self.correlation_delta, self.points_b.len());
        buffer.extend_from_slice(&self.points_b);
        buffer
    }

    /// Reads the header and the first `32 * 65` bytes of points.
    #[must_use]
    pub fn from_bytes(buffer: &[u8]) -> BobSetup {
        if buffer.len() < BobSetup::MIN_SIZE {
            return BobSetup::failure();
        }

        let (success, correlation_delta) = read_header(buffer);
        BobSetup {
            success,
            correlation_delta,
            points_b: buffer[HEADER_SIZE..BobSetup::MIN_SIZE].to_vec(),
        }
    }
}

impl AliceMessages {
    /// Size of a successful message.
    pub const SIZE: usize = HEADER_SIZE + POINTS_SIZE + 2 * CIPHERS_SIZE;

    #[must_use]
    pub fn failure() -> AliceMessages {
        AliceMessages::default()
    }

    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let body = self.points_a.len() + self.encrypted_m0.len() + self.encrypted_m1.len();
        let mut buffer = header(self.success, self.masked_share, body);
        buffer.extend_from_slice(&self.points_a);
        buffer.extend_from_slice(&self.encrypted_m0);
        buffer.extend_from_slice(&self.encrypted_m1);
        buffer
    }

    /// A buffer too short for the OT material still gives its masked share,
    /// with `success = false` and empty buffers.
    #[must_use]
    pub fn from_bytes(buffer: &[u8]) -> AliceMessages {
        if buffer.len() < HEADER_SIZE {
            return AliceMessages::failure();
        }

        let (success, masked_share) = read_header(buffer);
        if buffer.len() < AliceMessages::SIZE {
            return AliceMessages {
                masked_share,
                ..AliceMessages::failure()
            };
        }

        let points_end = HEADER_SIZE + POINTS_SIZE;
        let m0_end = points_end + CIPHERS_SIZE;
        let m1_end = m0_end + CIPHERS_SIZE;

        AliceMessages {
            success,
            masked_share,
            points_a: buffer[HEADER_SIZE..points_end].to_vec(),
            encrypted_m0: buffer[points_end..m0_end].to_vec(),
            encrypted_m1: buffer[m0_end..m1_end].to_vec(),
        }
    }
}

impl BobMessages {
    pub const SIZE: usize = HEADER_SIZE;

    #[must_use]
    pub fn failure() -> BobMessages {
        BobMessages::default()
    }

    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        header(self.success, self.masked_share, 0)
    }

    #[must_use]
    pub fn from_bytes(buffer: &[u8]) -> BobMessages {
        if buffer.len() != BobMessages::SIZE {
            return BobMessages::failure();
        }

        let (success, masked_share) = read_header(buffer);
        BobMessages {
            success,
            masked_share,
        }
    }
}

impl MtaResult {
    pub const SIZE: usize = HEADER_SIZE;

    #[must_use]
    pub fn failure() -> MtaResult {
        MtaResult::default()
    }

    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        header(self.success, self.additive_share, 0)
    }

    #[must_use]
    pub fn from_bytes(buffer: &[u8]) -> MtaResult {
        if buffer.len() != MtaResult::SIZE {
            return MtaResult::failure();
        }

        let (success, additive_share) = read_header(buffer);
        MtaResult {
            success,
            additive_share,
        }
    }
}

// Flag byte followed by a little-endian u32, with room for `body` more bytes.
fn header(success: bool, value: u32, body: usize) -> Vec<u8> {
    let mut buffer = Vec::with_capacity(HEADER_SIZE + body);
    buffer.push(u8::from(success));
    buffer.extend_from_slice(&value.to_le_bytes());
    buffer
}

// The caller guarantees that `buffer` has at least HEADER_SIZE bytes.
fn read_header(buffer: &[u8]) -> (bool, u32) {
    let success = buffer[0] == 1;
    let value = u32::from_le_bytes([buffer[1], buffer[2], buffer[3], buffer[4]]);
    (success, value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::KEY_SIZE;

    fn pattern(length: usize, seed: u8) -> Vec<u8> {
        (0..length).map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed)).collect()
    }

    #[test]
    fn test_alice_messages_layout() {
        let messages = AliceMessages {
            success: true,
            masked_share: 0xDEAD_BEEF,
            points_a: pattern(POINTS_SIZE, 1),
            encrypted_m0: pattern(CIPHERS_SIZE, 2),
            encrypted_m1: pattern(CIPHERS_SIZE, 3),
        };

        let bytes = messages.to_bytes();
        assert_eq!(bytes.len(), 1 + 4 + 32 * 65 + 32 * 32 + 32 * 32);
        assert_eq!(&bytes[..5], &[1, 0xEF, 0xBE, 0xAD, 0xDE]);
        assert_eq!(&bytes[5..5 + POINTS_SIZE], messages.points_a.as_slice());
        assert_eq!(
            &bytes[5 + POINTS_SIZE + CIPHERS_SIZE..],
            messages.encrypted_m1.as_slice()
        );

        assert_eq!(AliceMessages::from_bytes(&bytes), messages);
    }

    #[test]
    fn test_bob_setup_round_trip() {
        let setup = BobSetup {
            success: true,
            correlation_delta: 123_456,
            points_b: pattern(POINTS_SIZE, 9),
        };

        let bytes = setup.to_bytes();
        assert_eq!(bytes.len(), BobSetup::MIN_SIZE);
        assert_eq!(BobSetup::from_bytes(&bytes), setup);

        // Extra trailing bytes are ignored.
        let mut longer = bytes.clone();
        longer.extend_from_slice(&[0xFF; KEY_SIZE]);
        assert_eq!(BobSetup::from_bytes(&longer), setup);
    }

    #[test]
    fn test_cot_setup_round_trip() {
        let setup = CotSetup {
            success: true,
            correlation_x: 7,
            points_a: pattern(POINTS_SIZE, 4),
        };
        assert_eq!(CotSetup::from_bytes(&setup.to_bytes()), setup);
        assert_eq!(CotSetup::from_bytes(&[1, 7, 0, 0, 0]), CotSetup::failure());
    }

    #[test]
    fn test_five_byte_layouts() {
        for (success, value) in [(true, 0), (true, u32::MAX), (false, 42)] {
            let messages = BobMessages {
                success,
                masked_share: value,
            };
            let bytes = messages.to_bytes();
            assert_eq!(bytes.len(), 5);
            assert_eq!(BobMessages::from_bytes(&bytes), messages);

            let result = MtaResult {
                success,
                additive_share: value,
            };
            assert_eq!(MtaResult::from_bytes(&result.to_bytes()), result);
        }
    }

    #[test]
    fn test_malformed_buffers_decode_to_failure() {
        // One byte short of a full setup.
        let short_setup = vec![1u8; BobSetup::MIN_SIZE - 1];
        let decoded = BobSetup::from_bytes(&short_setup);
        assert!(!decoded.success);
        assert!(decoded.points_b.is_empty());
        assert_eq!(decoded.correlation_delta, 0);

        assert_eq!(BobSetup::from_bytes(&[]), BobSetup::failure());

        assert_eq!(BobMessages::from_bytes(&[1, 2, 3, 4]), BobMessages::failure());
        assert_eq!(BobMessages::from_bytes(&[1, 2, 3, 4, 5, 6]), BobMessages::failure());
        assert_eq!(MtaResult::from_bytes(&[1]), MtaResult::failure());

        assert_eq!(AliceMessages::from_bytes(&[1, 2, 3]), AliceMessages::failure());
    }

    #[test]
    fn test_short_alice_messages_keep_the_masked_share() {
        let mut bytes = AliceMessages {
            success: true,
            masked_share: 0x0102_0304,
            points_a: pattern(POINTS_SIZE, 1),
            encrypted_m0: pattern(CIPHERS_SIZE, 2),
            encrypted_m1: pattern(CIPHERS_SIZE, 3),
        }
        .to_bytes();
        bytes.pop();

        let decoded = AliceMessages::from_bytes(&bytes);
        assert!(!decoded.success);
        assert_eq!(decoded.masked_share, 0x0102_0304);
        assert!(decoded.points_a.is_empty());
        assert!(decoded.encrypted_m0.is_empty());
        assert!(decoded.encrypted_m1.is_empty());

        // A failed response serializes to its header only.
        let header_only = AliceMessages::from_bytes(&[0, 9, 0, 0, 0]);
        assert_eq!(header_only.masked_share, 9);
        assert!(!header_only.success);
    }

    #[test]
    fn test_flag_other_than_one_is_false() {
        let decoded = BobMessages::from_bytes(&[2, 1, 0, 0, 0]);
        assert!(!decoded.success);
        assert_eq!(decoded.masked_share, 1);
    }
}
