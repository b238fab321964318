use crate::constants::{HASH_SIZE, WORD_SIZE};
use crate::error::{PassafeError, PassafeResult};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha3::{Digest, Keccak256};
use std::fmt;

/// Unsigned 256-bit integer held as 32 big-endian bytes, the layout the
/// on-chain verifier reads for `uint256` fields.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Uint256(pub [u8; WORD_SIZE]);

impl Uint256 {
    pub fn from_bytes(bytes: [u8; WORD_SIZE]) -> Self {
        Self(bytes)
    }

    /// Left-pads a big-endian byte string shorter than a word.
    pub fn from_be_slice(bytes: &[u8]) -> PassafeResult<Self> {
        let significant = match bytes.iter().position(|b| *b != 0) {
            Some(start) => &bytes[start..],
            None => &[],
        };
        if significant.len() > WORD_SIZE {
            return Err(PassafeError::MalformedEncoding(format!(
                "integer of {} bytes does not fit in 256 bits",
                significant.len()
            )));
        }
        let mut arr = [0u8; WORD_SIZE];
        arr[WORD_SIZE - significant.len()..].copy_from_slice(significant);
        Ok(Self(arr))
    }

    pub fn from_u64(value: u64) -> Self {
        let mut arr = [0u8; WORD_SIZE];
        arr[WORD_SIZE - 8..].copy_from_slice(&value.to_be_bytes());
        Self(arr)
    }

    pub fn as_bytes(&self) -> &[u8; WORD_SIZE] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    pub fn from_hex(s: &str) -> PassafeResult<Self> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s).map_err(|e| PassafeError::MalformedEncoding(e.to_string()))?;
        Self::from_be_slice(&bytes)
    }

    pub fn zero() -> Self {
        Self([0u8; WORD_SIZE])
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; WORD_SIZE]
    }
}

impl fmt::Debug for Uint256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Uint256({})", self.to_hex())
    }
}

impl fmt::Display for Uint256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Serialize for Uint256 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Uint256 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

impl Default for Uint256 {
    fn default() -> Self {
        Self::zero()
    }
}

/// keccak-256 fingerprint of a credential id; the module's on-chain key id.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyHash(pub [u8; HASH_SIZE]);

impl KeyHash {
    pub fn of(credential_id: &[u8]) -> Self {
        Self(Keccak256::digest(credential_id).into())
    }

    pub fn as_bytes(&self) -> &[u8; HASH_SIZE] {
        &self.0
    }

    pub fn as_uint(&self) -> Uint256 {
        Uint256(self.0)
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for KeyHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyHash({})", self.to_hex())
    }
}

impl fmt::Display for KeyHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TxHash(pub [u8; HASH_SIZE]);

impl TxHash {
    pub fn from_bytes(bytes: [u8; HASH_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    pub fn from_hex(s: &str) -> PassafeResult<Self> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s).map_err(|e| PassafeError::MalformedEncoding(e.to_string()))?;
        let arr: [u8; HASH_SIZE] = bytes
            .try_into()
            .map_err(|_| PassafeError::MalformedEncoding("transaction hash must be 32 bytes".into()))?;
        Ok(Self(arr))
    }
}

impl Serialize for TxHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for TxHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

impl fmt::Debug for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxHash({})", self.to_hex())
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uint_left_pads() {
        let value = Uint256::from_be_slice(&[0x01, 0x02]).unwrap();
        assert_eq!(value.0[30], 0x01);
        assert_eq!(value.0[31], 0x02);
        assert_eq!(value, Uint256::from_u64(0x0102));
    }

    #[test]
    fn test_uint_strips_sign_padding() {
        let mut padded = vec![0u8];
        padded.extend_from_slice(&[0xff; 32]);
        let value = Uint256::from_be_slice(&padded).unwrap();
        assert_eq!(value.0, [0xff; 32]);

        let mut too_wide = vec![0x01];
        too_wide.extend_from_slice(&[0u8; 32]);
        assert!(Uint256::from_be_slice(&too_wide).is_err());
    }

    #[test]
    fn test_key_hash_is_keccak() {
        // keccak256("") is a well-known constant.
        assert_eq!(
            KeyHash::of(b"").to_hex(),
            "0xc5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }
}
