use crate::public_key::P256PublicKey;
use p256::ecdsa::signature::Verifier;
use p256::ecdsa::{Signature, VerifyingKey};
use p256::{EncodedPoint, FieldBytes};
use passafe_types::{PassafeError, PassafeResult, SignatureTuple, P256_RAW_SIGNATURE_SIZE};
use sha2::{Digest, Sha256};

/// Checks a tuple the way the module does on chain: ECDSA-SHA256 over
/// `authenticatorData || sha256(clientDataJSON)`, with the client data rebuilt
/// around `challenge`.
pub fn verify_signature_tuple(
    tuple: &SignatureTuple,
    challenge: &str,
    key: &P256PublicKey,
) -> PassafeResult<()> {
    let point = EncodedPoint::from_affine_coordinates(
        FieldBytes::from_slice(key.x.as_bytes()),
        FieldBytes::from_slice(key.y.as_bytes()),
        false,
    );
    let verifying_key = VerifyingKey::from_encoded_point(&point)
        .map_err(|_| PassafeError::InvalidKey("public key is not on P-256".into()))?;

    let mut scalars = Vec::with_capacity(P256_RAW_SIGNATURE_SIZE);
    scalars.extend_from_slice(tuple.r.as_bytes());
    scalars.extend_from_slice(tuple.s.as_bytes());
    let signature = Signature::from_slice(&scalars)
        .map_err(|e| PassafeError::InvalidSignatureEncoding(format!("r or s out of range: {e}")))?;

    let client_data = tuple.client_data_json(challenge);
    let mut message = tuple.authenticator_data.clone();
    message.extend_from_slice(&Sha256::digest(client_data.as_bytes()));

    verifying_key
        .verify(&message, &signature)
        .map_err(|_| PassafeError::AuthenticationFailed("passkey signature does not verify".into()))
}
