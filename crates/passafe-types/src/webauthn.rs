use crate::credential::CredentialId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UserVerification {
    #[default]
    Required,
    Preferred,
    Discouraged,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthenticatorType {
    Platform,
    CrossPlatform,
    #[default]
    Both,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CeremonyOptions {
    pub user_verification: UserVerification,
    pub authenticator_type: AuthenticatorType,
}

/// Output of a registration ceremony. Binary fields are base64url text as the
/// platform hands them over.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationAssertion {
    pub credential_id: CredentialId,
    /// SubjectPublicKeyInfo DER or a raw SEC1 point.
    pub public_key: String,
    pub algorithm: i64,
    pub authenticator_data: String,
    pub client_data: String,
    pub authenticator_name: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticationAssertion {
    pub credential_id: CredentialId,
    pub authenticator_data: String,
    pub client_data: String,
    pub signature: String,
    pub user_handle: Option<String>,
    pub authenticator_name: Option<String>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CeremonyError {
    #[error("ceremony cancelled by the user")]
    Cancelled,

    #[error("ceremony failed: {0}")]
    Failed(String),
}
