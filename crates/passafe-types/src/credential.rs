use crate::crypto::{KeyHash, Uint256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Credential id exactly as the platform reports it (base64url text). The
/// module contract is seeded with this string, so it is hashed as UTF-8.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CredentialId(String);

impl CredentialId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn key_hash(&self) -> KeyHash {
        KeyHash::of(self.as_bytes())
    }
}

impl fmt::Debug for CredentialId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CredentialId({})", self.0)
    }
}

impl fmt::Display for CredentialId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A registered passkey. Immutable once built; re-registering produces a
/// new record rather than editing this one.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StoredCredential", into = "StoredCredential")]
pub struct CredentialRecord {
    credential_id: CredentialId,
    key_hash: KeyHash,
    public_key_x: Uint256,
    public_key_y: Uint256,
    name: String,
    authenticator_label: String,
    registered_at: DateTime<Utc>,
}

impl CredentialRecord {
    pub fn new(
        credential_id: CredentialId,
        public_key_x: Uint256,
        public_key_y: Uint256,
        name: impl Into<String>,
        authenticator_label: impl Into<String>,
        registered_at: DateTime<Utc>,
    ) -> Self {
        let key_hash = credential_id.key_hash();
        Self {
            credential_id,
            key_hash,
            public_key_x,
            public_key_y,
            name: name.into(),
            authenticator_label: authenticator_label.into(),
            registered_at,
        }
    }

    /// Record for a credential seen only through an authentication ceremony,
    /// where the public key is not disclosed.
    pub fn authentication_only(
        credential_id: CredentialId,
        name: impl Into<String>,
        authenticator_label: impl Into<String>,
        registered_at: DateTime<Utc>,
    ) -> Self {
        Self::new(
            credential_id,
            Uint256::zero(),
            Uint256::zero(),
            name,
            authenticator_label,
            registered_at,
        )
    }

    pub fn credential_id(&self) -> &CredentialId {
        &self.credential_id
    }

    pub fn key_hash(&self) -> KeyHash {
        self.key_hash
    }

    pub fn public_key_x(&self) -> &Uint256 {
        &self.public_key_x
    }

    pub fn public_key_y(&self) -> &Uint256 {
        &self.public_key_y
    }

    pub fn has_public_key(&self) -> bool {
        !self.public_key_x.is_zero() || !self.public_key_y.is_zero()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn authenticator_label(&self) -> &str {
        &self.authenticator_label
    }

    pub fn registered_at(&self) -> DateTime<Utc> {
        self.registered_at
    }
}

// Persisted form; the key hash is recomputed on load.
#[derive(Serialize, Deserialize)]
struct StoredCredential {
    credential_id: CredentialId,
    public_key_x: Uint256,
    public_key_y: Uint256,
    name: String,
    authenticator_label: String,
    registered_at: DateTime<Utc>,
}

impl From<StoredCredential> for CredentialRecord {
    fn from(stored: StoredCredential) -> Self {
        CredentialRecord::new(
            stored.credential_id,
            stored.public_key_x,
            stored.public_key_y,
            stored.name,
            stored.authenticator_label,
            stored.registered_at,
        )
    }
}

impl From<CredentialRecord> for StoredCredential {
    fn from(record: CredentialRecord) -> Self {
        Self {
            credential_id: record.credential_id,
            public_key_x: record.public_key_x,
            public_key_y: record.public_key_y,
            name: record.name,
            authenticator_label: record.authenticator_label,
            registered_at: record.registered_at,
        }
    }
}
