#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod assertion;
pub mod authenticator_data;
pub mod codec;
pub mod credential;
pub mod public_key;
pub mod verify;

pub use assertion::{decode_authenticator_data, decode_client_data, parse_signature, split_client_data};
pub use authenticator_data::AuthenticatorData;
pub use codec::{
    challenge_from_payload, decode_base64url, encode_base64url, encode_signature_tuple, hash,
    keccak256,
};
pub use credential::{authenticator_label, credential_from_registration};
pub use public_key::{decode_public_key, P256PublicKey};
pub use verify::verify_signature_tuple;

use passafe_types::CHALLENGE_SIZE;

pub fn random_bytes<const N: usize>() -> [u8; N] {
    use rand::RngCore;
    let mut bytes = [0u8; N];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes
}

/// Fresh base64url challenge for ceremonies not tied to an on-chain operation.
pub fn random_challenge() -> String {
    encode_base64url(&random_bytes::<CHALLENGE_SIZE>())
}
