/// This file implements a correlated oblivious transfer (COT) batch of
/// `BIT_LENGTH` instances, as used for multiplication to addition.
///
/// For each bit position `i`, the sender samples a uniform `U_i` and offers
/// the pair `(U_i, U_i + x)`. The receiver selects with the `i`-th bit of its
/// input `y` and obtains `U_i + y_i * x`. Weighting by `2^i` and summing:
///
///   `V = sum 2^i * (U_i + y_i * x) = U + x * y`, where `U = sum 2^i * U_i`.
///
/// All arithmetic is modulo `2^32`.
use serde::{Deserialize, Serialize};

use crate::utilities::curve::EncodedPoint;
use crate::utilities::ot::base::{OTReceiver, OTSender};
use crate::utilities::ot::ErrorOT;
use crate::utilities::rng;
use crate::{BIT_LENGTH, KEY_SIZE, POINT_SIZE};

/// Size of the concatenated points of a batch.
pub const POINTS_SIZE: usize = BIT_LENGTH * POINT_SIZE;

/// Size of the concatenated ciphertexts of a batch (for one branch).
pub const CIPHERS_SIZE: usize = BIT_LENGTH * KEY_SIZE;

/// Sender's answer to the peer's points.
///
/// When `success` is false, every buffer is empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CotMessages {
    pub success: bool,
    #[serde(with = "serde_bytes")]
    pub points_a: Vec<u8>,
    #[serde(with = "serde_bytes")]
    pub encrypted_m0: Vec<u8>,
    #[serde(with = "serde_bytes")]
    pub encrypted_m1: Vec<u8>,
}

impl CotMessages {
    #[must_use]
    pub fn failure() -> CotMessages {
        CotMessages::default()
    }
}

// SENDER

/// Sender side of the batch (Alice).
///
/// A value holds the scalars and pads of exactly one run. They are drawn
/// in [`COTSender::init`] and there is no way to draw them again, so a new
/// run always needs a new value.
pub struct COTSender {
    x: u32,
    ot_instances: Vec<OTSender>,
    random_u: [u32; BIT_LENGTH],
}

impl COTSender {
    /// Samples `BIT_LENGTH` OT instances and pads for the input `x`.
    #[must_use]
    pub fn init(x: u32) -> COTSender {
        let ot_instances = (0..BIT_LENGTH).map(|_| OTSender::init()).collect();
        let random_u = std::array::from_fn(|_| rng::random_u32());

        COTSender {
            x,
            ot_instances,
            random_u,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_pads(x: u32, random_u: [u32; BIT_LENGTH]) -> COTSender {
        COTSender {
            random_u,
            ..COTSender::init(x)
        }
    }

    #[must_use]
    pub fn input(&self) -> u32 {
        self.x
    }

    /// Concatenates the points `A_i` in index order.
    ///
    /// The order matters: the peer answers point `i` with its own point `i`.
    #[must_use]
    pub fn build_outgoing_points(&self) -> Vec<u8> {
        let mut points = Vec::with_capacity(POINTS_SIZE);
        for instance in &self.ot_instances {
            points.extend_from_slice(&instance.point_a());
        }
        points
    }

    /// Masks the pairs `(U_i, U_i + x)` for the peer's points `B_i`.
    ///
    /// Any failure aborts the whole batch: the result has `success = false`
    /// and empty buffers. We never report a partial batch.
    #[must_use]
    pub fn process_peer_setup(&self, points_b: &[u8]) -> CotMessages {
        match self.try_process_peer_setup(points_b) {
            Ok(messages) => messages,
            Err((index, error)) => {
                tracing::warn!(index, %error, "OT encryption failed, aborting the batch");
                CotMessages::failure()
            }
        }
    }

    fn try_process_peer_setup(&self, points_b: &[u8]) -> Result<CotMessages, (usize, ErrorOT)> {
        if points_b.len() != POINTS_SIZE {
            return Err((
                0,
                ErrorOT::encoding("peer points do not have the expected length"),
            ));
        }

        let mut encrypted_m0 = vec![0u8; CIPHERS_SIZE];
        let mut encrypted_m1 = vec![0u8; CIPHERS_SIZE];

        for (i, (instance, point_b)) in self
            .ot_instances
            .iter()
            .zip(points_b.chunks_exact(POINT_SIZE))
            .enumerate()
        {
            let (m0, m1) = self.cot_messages(i);

            let (cipher0, cipher1) = instance
                .encrypt_branches(point_b, &m0, &m1)
                .map_err(|error| (i, error))?;

            // Each ciphertext occupies exactly KEY_SIZE bytes.
            copy_padded(&cipher0, &mut encrypted_m0[i * KEY_SIZE..(i + 1) * KEY_SIZE]);
            copy_padded(&cipher1, &mut encrypted_m1[i * KEY_SIZE..(i + 1) * KEY_SIZE]);
        }

        Ok(CotMessages {
            success: true,
            points_a: self.build_outgoing_points(),
            encrypted_m0,
            encrypted_m1,
        })
    }

    /// Messages for position `i`: `m0 = U_i` and `m1 = U_i + x`.
    fn cot_messages(&self, i: usize) -> ([u8; KEY_SIZE], [u8; KEY_SIZE]) {
        let u_i = self.random_u[i];
        let correlated = u_i.wrapping_add(self.x);
        (encode_u32(u_i), encode_u32(correlated))
    }

    /// Computes `U = sum 2^i * U_i (mod 2^32)`.
    #[must_use]
    pub fn additive_share(&self) -> u32 {
        weighted_sum(&self.random_u)
    }
}

// RECEIVER

/// Receiver side of the batch (the peer).
///
/// It selects with the bits of `y`. As for [`OTReceiver`], Alice never
/// runs this: it is the honest counterpart used to check the sender.
pub struct COTReceiver {
    y: u32,
    ot_instances: Vec<OTReceiver>,
}

impl COTReceiver {
    #[must_use]
    pub fn init(y: u32) -> COTReceiver {
        COTReceiver {
            y,
            ot_instances: (0..BIT_LENGTH).map(|_| OTReceiver::init()).collect(),
        }
    }

    fn choice(&self, i: usize) -> bool {
        (self.y >> i) & 1 == 1
    }

    /// Computes the points `B_i` for the sender's points `A_i`.
    ///
    /// # Errors
    ///
    /// Will return `Err` if `points_a` has the wrong length or one point does not decode.
    pub fn points_b(&self, points_a: &[u8]) -> Result<Vec<u8>, ErrorOT> {
        if points_a.len() != POINTS_SIZE {
            return Err(ErrorOT::encoding("sender points do not have the expected length"));
        }

        let mut points_b = Vec::with_capacity(POINTS_SIZE);
        for (i, (instance, point_a)) in self
            .ot_instances
            .iter()
            .zip(points_a.chunks_exact(POINT_SIZE))
            .enumerate()
        {
            let point_b: EncodedPoint = instance.choose(point_a, self.choice(i))?;
            points_b.extend_from_slice(&point_b);
        }

        Ok(points_b)
    }

    /// Computes `V = sum 2^i * (U_i + y_i * x) (mod 2^32)`.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the buffers have the wrong length or one point does not decode.
    pub fn additive_share(
        &self,
        points_a: &[u8],
        encrypted_m0: &[u8],
        encrypted_m1: &[u8],
    ) -> Result<u32, ErrorOT> {
        if points_a.len() != POINTS_SIZE
            || encrypted_m0.len() != CIPHERS_SIZE
            || encrypted_m1.len() != CIPHERS_SIZE
        {
            return Err(ErrorOT::encoding("sender messages do not have the expected length"));
        }

        let mut received = [0u32; BIT_LENGTH];
        for (i, instance) in self.ot_instances.iter().enumerate() {
            let point_a = &points_a[i * POINT_SIZE..(i + 1) * POINT_SIZE];
            let cipher0 = &encrypted_m0[i * KEY_SIZE..(i + 1) * KEY_SIZE];
            let cipher1 = &encrypted_m1[i * KEY_SIZE..(i + 1) * KEY_SIZE];

            let message = instance.decrypt(point_a, cipher0, cipher1, self.choice(i))?;
            received[i] = decode_u32(&message);
        }

        Ok(weighted_sum(&received))
    }
}

// HELPERS

/// Little-endian encoding of `value` in a 32-byte buffer (28 zero bytes of padding).
#[must_use]
pub fn encode_u32(value: u32) -> [u8; KEY_SIZE] {
    let mut buffer = [0u8; KEY_SIZE];
    buffer[..4].copy_from_slice(&value.to_le_bytes());
    buffer
}

/// Reads the little-endian value in the first 4 bytes (missing bytes count as zero).
#[must_use]
pub fn decode_u32(buffer: &[u8]) -> u32 {
    let mut bytes = [0u8; 4];
    let length = buffer.len().min(4);
    bytes[..length].copy_from_slice(&buffer[..length]);
    u32::from_le_bytes(bytes)
}

/// Computes `sum 2^i * values[i]` with wrapping arithmetic at every step.
#[must_use]
pub fn weighted_sum(values: &[u32; BIT_LENGTH]) -> u32 {
    values
        .iter()
        .enumerate()
        .fold(0u32, |sum, (i, value)| sum.wrapping_add(value.wrapping_shl(i as u32)))
}

// Copies `source` into `destination`, truncating or zero-padding.
fn copy_padded(source: &[u8], destination: &mut [u8]) {
    let length = source.len().min(destination.len());
    destination[..length].copy_from_slice(&source[..length]);
    destination[length..].fill(0);
}
