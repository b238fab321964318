pub const ETH_ADDRESS_SIZE: usize = 20;

pub const HASH_SIZE: usize = 32;

/// ABI word width.
pub const WORD_SIZE: usize = 32;

pub const P256_COORDINATE_SIZE: usize = 32;

pub const P256_RAW_SIGNATURE_SIZE: usize = 2 * P256_COORDINATE_SIZE;

pub const CHALLENGE_SIZE: usize = 32;

pub const ETH_DECIMALS: u8 = 18;

/// COSE algorithm identifier for ES256.
pub const COSE_ALG_ES256: i64 = -7;
