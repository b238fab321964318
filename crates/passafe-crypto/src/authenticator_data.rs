use passafe_types::{PassafeError, PassafeResult};

const RP_ID_HASH_LEN: usize = 32;
const FLAGS_OFFSET: usize = RP_ID_HASH_LEN;
const SIGN_COUNT_OFFSET: usize = FLAGS_OFFSET + 1;
const AAGUID_OFFSET: usize = SIGN_COUNT_OFFSET + 4;
const AAGUID_LEN: usize = 16;

const FLAG_USER_PRESENT: u8 = 0x01;
const FLAG_USER_VERIFIED: u8 = 0x04;
const FLAG_ATTESTED_CREDENTIAL: u8 = 0x40;

/// Fixed header of WebAuthn authenticator data. Only read for metadata; the
/// raw bytes go to the verifier untouched.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthenticatorData {
    pub rp_id_hash: [u8; RP_ID_HASH_LEN],
    pub flags: u8,
    pub sign_count: u32,
    pub aaguid: Option<[u8; AAGUID_LEN]>,
}

impl AuthenticatorData {
    pub fn parse(bytes: &[u8]) -> PassafeResult<Self> {
        if bytes.len() < AAGUID_OFFSET {
            return Err(PassafeError::MalformedEncoding(format!(
                "authenticator data too short: {} bytes",
                bytes.len()
            )));
        }

        let mut rp_id_hash = [0u8; RP_ID_HASH_LEN];
        rp_id_hash.copy_from_slice(&bytes[..RP_ID_HASH_LEN]);
        let flags = bytes[FLAGS_OFFSET];
        let mut counter = [0u8; 4];
        counter.copy_from_slice(&bytes[SIGN_COUNT_OFFSET..AAGUID_OFFSET]);

        let aaguid = if flags & FLAG_ATTESTED_CREDENTIAL != 0 {
            let end = AAGUID_OFFSET + AAGUID_LEN;
            if bytes.len() < end {
                return Err(PassafeError::MalformedEncoding(
                    "attested credential data truncated".into(),
                ));
            }
            let mut aaguid = [0u8; AAGUID_LEN];
            aaguid.copy_from_slice(&bytes[AAGUID_OFFSET..end]);
            Some(aaguid)
        } else {
            None
        };

        Ok(Self {
            rp_id_hash,
            flags,
            sign_count: u32::from_be_bytes(counter),
            aaguid,
        })
    }

    pub fn user_present(&self) -> bool {
        self.flags & FLAG_USER_PRESENT != 0
    }

    pub fn user_verified(&self) -> bool {
        self.flags & FLAG_USER_VERIFIED != 0
    }

    /// AAGUID in the canonical 8-4-4-4-12 form, `None` when absent or all zero.
    pub fn aaguid_string(&self) -> Option<String> {
        let aaguid = self.aaguid?;
        if aaguid == [0u8; AAGUID_LEN] {
            return None;
        }
        let hex = hex::encode(aaguid);
        Some(format!(
            "{}-{}-{}-{}-{}",
            &hex[0..8],
            &hex[8..12],
            &hex[12..16],
            &hex[16..20],
            &hex[20..32]
        ))
    }
}
