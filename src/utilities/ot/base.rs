/// This file implements a single 1-out-of-2 oblivious transfer over secp256k1.
///
/// The sender samples `a` and publishes `A = a * G`. The receiver, holding a
/// choice bit `c` and a secret `b`, answers with `B = b * G` (if `c = 0`) or
/// `B = b * G + A` (if `c = 1`). The sender then derives
///
///   `key0 = x(a * B)` and `key1 = x(a * (B - A))`
///
/// and masks its two messages with them. Only the key for the chosen bit
/// equals the receiver's `x(b * A)`, so the receiver learns exactly one
/// message and the sender learns nothing about `c`.
///
/// These formulas must match the peer's implementation byte for byte.
use k256::NonZeroScalar;

use crate::utilities::curve::{self, EncodedPoint};
use crate::utilities::mask;
use crate::utilities::ot::ErrorOT;

// SENDER

/// Sender leg of one OT instance (this is Alice's role).
///
/// A fresh scalar is drawn every time a value is built, and the type is
/// neither `Clone` nor reusable across batches.
pub struct OTSender {
    a: NonZeroScalar,
}

impl OTSender {
    #[must_use]
    pub fn init() -> OTSender {
        OTSender {
            a: curve::random_scalar(),
        }
    }

    /// Computes `A = a * G`.
    ///
    /// Nothing is cached: every call recomputes the same point.
    #[must_use]
    pub fn point_a(&self) -> EncodedPoint {
        curve::scalar_multiply_generator(&self.a)
    }

    /// Masks `message0` and `message1` for the receiver who sent `point_b`.
    ///
    /// # Errors
    ///
    /// Will return `Err` if `point_b` is not on the curve
    /// ([`ErrorOT::InvalidPeerPoint`]) or if one of the keys cannot
    /// be derived ([`ErrorOT::EncryptionFailed`]).
    pub fn encrypt_branches(
        &self,
        point_b: &[u8],
        message0: &[u8],
        message1: &[u8],
    ) -> Result<(Vec<u8>, Vec<u8>), ErrorOT> {
        if !curve::is_on_curve(point_b) {
            return Err(ErrorOT::InvalidPeerPoint);
        }

        let (key0, key1) = self
            .derive_keys(point_b)
            .map_err(|error| ErrorOT::EncryptionFailed(Box::new(error)))?;

        let cipher0 = mask::mask(message0, &key0);
        let cipher1 = mask::mask(message1, &key1);

        Ok((cipher0, cipher1))
    }

    fn derive_keys(&self, point_b: &[u8]) -> Result<(mask::Key, mask::Key), ErrorOT> {
        // key0 = x(a * B). If c = 0, this is x(a * b * G).
        let key0 = mask::derive_key(&curve::scalar_multiply_shared(&self.a, point_b)?)?;

        // key1 = x(a * (B - A)). If c = 1, B - A = b * G and we get the same value.
        let b_minus_a = curve::subtract(point_b, &self.point_a())?;
        let key1 = mask::derive_key(&curve::scalar_multiply_shared(&self.a, &b_minus_a)?)?;

        Ok((key0, key1))
    }
}

// RECEIVER

/// Receiver leg of one OT instance (the peer's role).
///
/// Alice never plays this role in a real run. We keep it here so that the
/// sender can be exercised against an honest counterpart.
pub struct OTReceiver {
    b: NonZeroScalar,
}

impl OTReceiver {
    #[must_use]
    pub fn init() -> OTReceiver {
        OTReceiver {
            b: curve::random_scalar(),
        }
    }

    /// Encodes the choice bit: `b * G` for `false`, `b * G + A` for `true`.
    ///
    /// # Errors
    ///
    /// Will return `Err` if `point_a` does not decode.
    pub fn choose(&self, point_a: &[u8], choice: bool) -> Result<EncodedPoint, ErrorOT> {
        let b_times_g = curve::scalar_multiply_generator(&self.b);
        if choice {
            curve::add(&b_times_g, point_a)
        } else {
            Ok(b_times_g)
        }
    }

    /// Recovers the message selected by `choice`.
    ///
    /// # Errors
    ///
    /// Will return `Err` if `point_a` does not decode.
    pub fn decrypt(
        &self,
        point_a: &[u8],
        cipher0: &[u8],
        cipher1: &[u8],
        choice: bool,
    ) -> Result<Vec<u8>, ErrorOT> {
        // x(b * A) = x(a * b * G).
        let key = mask::derive_key(&curve::scalar_multiply_shared(&self.b, point_a)?)?;

        let cipher = if choice { cipher1 } else { cipher0 };
        Ok(mask::unmask(cipher, &key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::KEY_SIZE;
    use rand::Rng;

    use crate::utilities::rng;

    fn random_message() -> [u8; KEY_SIZE] {
        rng::get_rng().gen()
    }

    #[test]
    fn test_ot_base() {
        for choice in [false, true] {
            let sender = OTSender::init();
            let receiver = OTReceiver::init();

            let message0 = random_message();
            let message1 = random_message();

            // The sender publishes A.
            let point_a = sender.point_a();

            // The receiver answers with B.
            let point_b = receiver.choose(&point_a, choice).unwrap();

            // The sender masks both messages.
            let result_sender = sender.encrypt_branches(&point_b, &message0, &message1);
            if let Err(error) = result_sender {
                panic!("OT error: {error}");
            }
            let (cipher0, cipher1) = result_sender.unwrap();

            // The receiver gets exactly the chosen message.
            let received = receiver.decrypt(&point_a, &cipher0, &cipher1, choice).unwrap();
            let other = receiver.decrypt(&point_a, &cipher0, &cipher1, !choice).unwrap();

            if choice {
                assert_eq!(received, message1.to_vec());
                assert_ne!(other, message0.to_vec());
            } else {
                assert_eq!(received, message0.to_vec());
                assert_ne!(other, message1.to_vec());
            }
        }
    }

    #[test]
    fn test_point_a_is_deterministic() {
        let sender = OTSender::init();
        assert_eq!(sender.point_a(), sender.point_a());
        assert!(curve::is_on_curve(&sender.point_a()));

        // Different instances use different scalars.
        #[cfg(not(feature = "insecure-rng"))]
        assert_ne!(sender.point_a(), OTSender::init().point_a());
    }

    #[test]
    fn test_encrypt_rejects_invalid_peer_point() {
        let sender = OTSender::init();
        let message = random_message();

        let mut point_b = OTReceiver::init().choose(&sender.point_a(), false).unwrap();
        point_b[40] ^= 0x01;

        assert_eq!(
            sender.encrypt_branches(&point_b, &message, &message),
            Err(ErrorOT::InvalidPeerPoint)
        );
        assert_eq!(
            sender.encrypt_branches(&point_b[..64], &message, &message),
            Err(ErrorOT::InvalidPeerPoint)
        );
    }

    #[test]
    fn test_encrypt_fails_when_peer_echoes_point_a() {
        // B = A gives B - A = identity, so key1 cannot be derived.
        let sender = OTSender::init();
        let message = random_message();

        let result = sender.encrypt_branches(&sender.point_a(), &message, &message);
        assert!(matches!(result, Err(ErrorOT::EncryptionFailed(_))));
    }
}
