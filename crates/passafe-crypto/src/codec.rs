use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use ethers::abi::{self, Token};
use ethers::types::U256;
use passafe_types::{PassafeError, PassafeResult, SignatureTuple, Uint256, HASH_SIZE};
use sha3::{Digest, Keccak256};

pub fn encode_base64url(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Decodes unpadded base64url. Padding characters are rejected, not skipped.
pub fn decode_base64url(encoded: &str) -> PassafeResult<Vec<u8>> {
    if encoded.contains('=') {
        return Err(PassafeError::MalformedEncoding(
            "base64url input must not be padded".into(),
        ));
    }
    URL_SAFE_NO_PAD
        .decode(encoded)
        .map_err(|e| PassafeError::MalformedEncoding(e.to_string()))
}

pub fn keccak256(bytes: &[u8]) -> [u8; HASH_SIZE] {
    Keccak256::digest(bytes).into()
}

/// Digest used for key hashes and operation challenges.
pub fn hash(bytes: &[u8]) -> [u8; HASH_SIZE] {
    keccak256(bytes)
}

/// Base64url challenge string for an operation payload, typically the 32-byte
/// exec hash returned by the module.
pub fn challenge_from_payload(payload: &[u8]) -> String {
    encode_base64url(payload).trim_end_matches('=').to_string()
}

fn uint_token(value: &Uint256) -> Token {
    Token::Uint(U256::from_big_endian(value.as_bytes()))
}

/// ABI-encodes the tuple as `(uint256,uint256,uint256,bytes,string,string)`,
/// the layout the module's `executeWithPasskeys` decodes.
pub fn encode_signature_tuple(signature: &SignatureTuple) -> Vec<u8> {
    abi::encode(&[
        uint_token(&signature.id),
        uint_token(&signature.r),
        uint_token(&signature.s),
        Token::Bytes(signature.authenticator_data.clone()),
        Token::String(signature.client_data_prefix.clone()),
        Token::String(signature.client_data_suffix.clone()),
    ])
}
