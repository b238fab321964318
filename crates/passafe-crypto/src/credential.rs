use crate::assertion::{decode_authenticator_data, decode_client_data, split_client_data};
use crate::authenticator_data::AuthenticatorData;
use crate::codec::decode_base64url;
use crate::public_key::decode_public_key;
use chrono::{DateTime, Utc};
use passafe_types::{
    CredentialRecord, PassafeError, PassafeResult, RegistrationAssertion, COSE_ALG_ES256,
};
use tracing::debug;

const UNKNOWN_AUTHENTICATOR: &str = "unknown authenticator";

/// Display label for an authenticator: the platform-reported name when it is
/// non-empty, then the AAGUID, then a generic placeholder.
pub fn authenticator_label(name: Option<&str>, aaguid: Option<String>) -> String {
    name.filter(|name| !name.is_empty())
        .map(str::to_string)
        .or(aaguid)
        .unwrap_or_else(|| UNKNOWN_AUTHENTICATOR.to_string())
}

/// Builds a [`CredentialRecord`] from a registration ceremony result.
///
/// The registration client data must embed `challenge`; otherwise the
/// assertion answers some other request and is rejected with `ChallengeNotFound`.
pub fn credential_from_registration(
    assertion: &RegistrationAssertion,
    name: &str,
    challenge: &str,
    registered_at: DateTime<Utc>,
) -> PassafeResult<CredentialRecord> {
    if assertion.algorithm != COSE_ALG_ES256 {
        return Err(PassafeError::InvalidKey(format!(
            "unsupported credential algorithm {}",
            assertion.algorithm
        )));
    }

    let client_data = decode_client_data(&assertion.client_data)?;
    split_client_data(&client_data, challenge)?;

    let public_key = decode_public_key(&decode_base64url(&assertion.public_key)?)?;

    let authenticator_data = decode_authenticator_data(&assertion.authenticator_data)?;
    let aaguid = AuthenticatorData::parse(&authenticator_data)?.aaguid_string();

    let label = authenticator_label(assertion.authenticator_name.as_deref(), aaguid);

    let record = CredentialRecord::new(
        assertion.credential_id.clone(),
        public_key.x,
        public_key.y,
        name,
        label,
        registered_at,
    );
    debug!(key_hash = %record.key_hash(), "Derived credential from registration");
    Ok(record)
}
