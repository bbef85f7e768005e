//! Point arithmetic on secp256k1 over SEC1 byte encodings.
//!
//! The peer exchanges points as 65-byte uncompressed encodings, so every
//! operation here takes and returns bytes. Internally we rely on `k256`.
//!
//! The point at infinity has no uncompressed encoding. Whenever an
//! operation would produce it (for example `add(P, negate(P))`), we return
//! [`ErrorOT::InvalidPointEncoding`].

use k256::ecdh::diffie_hellman;
use k256::elliptic_curve::sec1::{FromEncodedPoint, ToEncodedPoint};
use k256::{AffinePoint, NonZeroScalar, ProjectivePoint, PublicKey};

use crate::utilities::ot::ErrorOT;
use crate::utilities::rng;
use crate::{KEY_SIZE, POINT_SIZE};

/// Uncompressed SEC1 encoding of a point.
pub type EncodedPoint = [u8; POINT_SIZE];

/// X-coordinate of a Diffie-Hellman product.
pub type SharedSecret = [u8; KEY_SIZE];

const UNCOMPRESSED_TAG: u8 = 0x04;

// Field prime p = 2^256 - 2^32 - 977, big-endian.
const FIELD_PRIME: [u8; 32] = [
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFE, 0xFF, 0xFF, 0xFC, 0x2F,
];

/// Samples a secret scalar in `[1, n)`.
#[must_use]
pub fn random_scalar() -> NonZeroScalar {
    NonZeroScalar::random(&mut rng::get_rng())
}

/// Decodes a 65-byte uncompressed point and checks that it lies on the curve.
///
/// # Errors
///
/// Will return `Err` if the length or the tag is wrong, or if the
/// coordinates do not satisfy the curve equation.
pub fn decode(bytes: &[u8]) -> Result<AffinePoint, ErrorOT> {
    if bytes.len() != POINT_SIZE || bytes[0] != UNCOMPRESSED_TAG {
        return Err(ErrorOT::encoding(
            "expected a 65-byte uncompressed point",
        ));
    }

    let encoded = k256::EncodedPoint::from_bytes(bytes)
        .map_err(|_| ErrorOT::encoding("malformed SEC1 encoding"))?;

    Option::<AffinePoint>::from(AffinePoint::from_encoded_point(&encoded))
        .ok_or_else(|| ErrorOT::encoding("point is not on secp256k1"))
}

/// Encodes a point in uncompressed form.
///
/// # Errors
///
/// Will return `Err` if `point` is the point at infinity.
pub fn encode_uncompressed(point: &AffinePoint) -> Result<EncodedPoint, ErrorOT> {
    let encoded = point.to_encoded_point(false);
    EncodedPoint::try_from(encoded.as_bytes())
        .map_err(|_| ErrorOT::encoding("the point at infinity has no uncompressed encoding"))
}

/// Computes `p + q`.
///
/// # Errors
///
/// Will return `Err` if one of the inputs does not decode or if the sum
/// is the point at infinity.
pub fn add(p: &[u8], q: &[u8]) -> Result<EncodedPoint, ErrorOT> {
    let sum = ProjectivePoint::from(decode(p)?) + ProjectivePoint::from(decode(q)?);
    encode_uncompressed(&sum.to_affine())
}

/// Computes `-p`, that is `(x, p - y)`.
///
/// The subtraction is done directly on the big-endian bytes of `y`.
/// Only the shape of the encoding is checked here: an off-curve input
/// gives an off-curve output, which [`decode`] will reject later.
///
/// # Errors
///
/// Will return `Err` if `point` is not 65 bytes long with the `0x04` tag.
pub fn negate(point: &[u8]) -> Result<EncodedPoint, ErrorOT> {
    if point.len() != POINT_SIZE || point[0] != UNCOMPRESSED_TAG {
        return Err(ErrorOT::encoding("invalid point format for negation"));
    }

    let mut negated = [0u8; POINT_SIZE];
    negated[..33].copy_from_slice(&point[..33]);

    let y = &point[33..];
    let mut borrow = false;
    for i in (0..32).rev() {
        let (difference, borrow_prime) = FIELD_PRIME[i].overflowing_sub(y[i]);
        let (difference, borrow_carry) = difference.overflowing_sub(u8::from(borrow));
        negated[33 + i] = difference;
        borrow = borrow_prime || borrow_carry;
    }

    Ok(negated)
}

/// Computes `p - q = p + (-q)`.
///
/// # Errors
///
/// Will return `Err` under the same conditions as [`add`] and [`negate`].
pub fn subtract(p: &[u8], q: &[u8]) -> Result<EncodedPoint, ErrorOT> {
    add(p, &negate(q)?)
}

/// Computes `scalar * G`.
#[must_use]
pub fn scalar_multiply_generator(scalar: &NonZeroScalar) -> EncodedPoint {
    // A nonzero scalar times the generator is never the identity,
    // so the uncompressed encoding always has 65 bytes.
    let encoded = PublicKey::from_secret_scalar(scalar).to_encoded_point(false);
    let mut point = [0u8; POINT_SIZE];
    point.copy_from_slice(encoded.as_bytes());
    point
}

/// Computes the X-coordinate of `scalar * point` (ECDH shared secret).
///
/// # Errors
///
/// Will return `Err` if `point` does not decode.
pub fn scalar_multiply_shared(
    scalar: &NonZeroScalar,
    point: &[u8],
) -> Result<SharedSecret, ErrorOT> {
    let point = decode(point)?;
    let shared = diffie_hellman(scalar, point);

    let mut secret = [0u8; KEY_SIZE];
    secret.copy_from_slice(shared.raw_secret_bytes());
    Ok(secret)
}

/// Checks if `point` is a valid uncompressed point on secp256k1.
#[must_use]
pub fn is_on_curve(point: &[u8]) -> bool {
    decode(point).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use k256::elliptic_curve::point::AffineCoordinates;
    use k256::Scalar;

    #[test]
    fn test_diffie_hellman_symmetry() {
        for _ in 0..20 {
            let a = random_scalar();
            let b = random_scalar();

            let point_a = scalar_multiply_generator(&a);
            let point_b = scalar_multiply_generator(&b);

            let secret_ab = scalar_multiply_shared(&a, &point_b).unwrap();
            let secret_ba = scalar_multiply_shared(&b, &point_a).unwrap();

            assert_eq!(secret_ab, secret_ba);
        }
    }

    #[test]
    fn test_shared_secret_is_x_coordinate() {
        let a = random_scalar();
        let b = random_scalar();
        let point_b = scalar_multiply_generator(&b);

        let product = (ProjectivePoint::GENERATOR * (*a * *b)).to_affine();

        let secret = scalar_multiply_shared(&a, &point_b).unwrap();
        assert_eq!(secret.as_slice(), product.x().as_slice());
    }

    #[test]
    fn test_generator_encoding() {
        let one = NonZeroScalar::new(Scalar::ONE).unwrap();
        let point = scalar_multiply_generator(&one);

        let expected = hex::decode(
            "0479be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798\
             483ada7726a3c4655da4fbfc0e1108a8fd17b448a68554199c47d08ffb10d4b8",
        )
        .unwrap();

        assert_eq!(point.to_vec(), expected);
    }

    #[test]
    fn test_double_negation() {
        for _ in 0..20 {
            let point = scalar_multiply_generator(&random_scalar());
            let negated = negate(&point).unwrap();

            assert_ne!(negated, point);
            assert!(is_on_curve(&negated));
            assert_eq!(negate(&negated).unwrap(), point);
        }
    }

    #[test]
    fn test_negation_agrees_with_group_negation() {
        let scalar = random_scalar();
        let point = scalar_multiply_generator(&scalar);

        let expected = (ProjectivePoint::GENERATOR * -(*scalar)).to_affine();

        assert_eq!(negate(&point).unwrap(), encode_uncompressed(&expected).unwrap());
    }

    #[test]
    fn test_point_plus_its_negation_is_identity() {
        for _ in 0..10 {
            let point = scalar_multiply_generator(&random_scalar());
            let negated = negate(&point).unwrap();

            assert!(matches!(
                add(&point, &negated),
                Err(ErrorOT::InvalidPointEncoding(_))
            ));
            assert!(matches!(
                subtract(&point, &point),
                Err(ErrorOT::InvalidPointEncoding(_))
            ));
        }

        assert!(encode_uncompressed(&AffinePoint::IDENTITY).is_err());
    }

    #[test]
    fn test_add_and_subtract() {
        let a = random_scalar();
        let b = random_scalar();
        let point_a = scalar_multiply_generator(&a);
        let point_b = scalar_multiply_generator(&b);

        let sum = add(&point_a, &point_b).unwrap();
        let expected = (ProjectivePoint::GENERATOR * (*a + *b)).to_affine();
        assert_eq!(sum, encode_uncompressed(&expected).unwrap());

        assert_eq!(subtract(&sum, &point_b).unwrap(), point_a);
    }

    #[test]
    fn test_decode_rejects_malformed_points() {
        let point = scalar_multiply_generator(&random_scalar());

        // Wrong length.
        assert!(decode(&point[..64]).is_err());
        assert!(decode(&[]).is_err());

        // Compressed tag.
        let mut compressed_tag = point;
        compressed_tag[0] = 0x02;
        assert!(decode(&compressed_tag).is_err());

        // Off-curve: we perturb y.
        let mut off_curve = point;
        off_curve[64] ^= 0x01;
        assert!(!is_on_curve(&off_curve));
        assert!(matches!(
            decode(&off_curve),
            Err(ErrorOT::InvalidPointEncoding(_))
        ));

        assert!(negate(&point[..33]).is_err());
    }
}
