//! XOR masking keyed by Diffie-Hellman secrets.
//!
//! The key is cycled over the payload, so payloads of any length can be
//! masked. Masking twice with the same key gives back the payload.

use crate::utilities::ot::ErrorOT;
use crate::{KEY_SIZE, POINT_SIZE};

pub type Key = [u8; KEY_SIZE];

/// Computes `payload[i] ^ key[i % 32]` for every byte.
#[must_use]
pub fn mask(payload: &[u8], key: &Key) -> Vec<u8> {
    payload
        .iter()
        .zip(key.iter().cycle())
        .map(|(byte, key_byte)| byte ^ key_byte)
        .collect()
}

/// Inverse of [`mask`] (which is the same operation).
#[must_use]
pub fn unmask(masked: &[u8], key: &Key) -> Vec<u8> {
    mask(masked, key)
}

/// Extracts a key from an uncompressed point or a bare shared secret.
///
/// For a 65-byte point we take its X-coordinate. A 32-byte value is
/// already an X-coordinate and is returned unchanged.
///
/// # Errors
///
/// Will return `Err` for any other length.
pub fn derive_key(material: &[u8]) -> Result<Key, ErrorOT> {
    let x_coordinate = match material.len() {
        POINT_SIZE => &material[1..=KEY_SIZE],
        KEY_SIZE => material,
        length => return Err(ErrorOT::InvalidKeyMaterial(length)),
    };

    let mut key = [0u8; KEY_SIZE];
    key.copy_from_slice(x_coordinate);
    Ok(key)
}
