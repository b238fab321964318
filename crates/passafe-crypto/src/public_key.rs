use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::pkcs8::DecodePublicKey;
use p256::PublicKey;
use passafe_types::{PassafeError, PassafeResult, Uint256};

/// Affine coordinates of a P-256 credential key, as the module stores them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct P256PublicKey {
    pub x: Uint256,
    pub y: Uint256,
}

/// Accepts SubjectPublicKeyInfo DER (what browsers expose through
/// `getPublicKey()`) or a SEC1 encoded point.
pub fn decode_public_key(bytes: &[u8]) -> PassafeResult<P256PublicKey> {
    let key = PublicKey::from_public_key_der(bytes)
        .or_else(|_| PublicKey::from_sec1_bytes(bytes))
        .map_err(|_| PassafeError::InvalidKey("not a P-256 public key".into()))?;

    let point = key.to_encoded_point(false);
    let (x, y) = match (point.x(), point.y()) {
        (Some(x), Some(y)) => (x, y),
        _ => return Err(PassafeError::InvalidKey("public key is the identity point".into())),
    };

    Ok(P256PublicKey {
        x: Uint256::from_be_slice(x)?,
        y: Uint256::from_be_slice(y)?,
    })
}
