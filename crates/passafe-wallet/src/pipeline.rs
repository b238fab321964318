use crate::gateway::WebAuthnGateway;
use chrono::Utc;
use passafe_crypto::{
    authenticator_label, challenge_from_payload, decode_authenticator_data, decode_base64url,
    decode_client_data, parse_signature, random_challenge, split_client_data,
    verify_signature_tuple, AuthenticatorData, P256PublicKey,
};
use passafe_types::{
    AuthenticationAssertion, CeremonyError, CeremonyOptions, CredentialId, CredentialRecord,
    PassafeError, PassafeResult, SignatureTuple, UserVerification,
};
use std::sync::Arc;
use tracing::{debug, info};

fn classify(error: CeremonyError) -> PassafeError {
    match error {
        CeremonyError::Cancelled => PassafeError::Cancelled("authentication prompt dismissed".into()),
        CeremonyError::Failed(reason) => PassafeError::AuthenticationFailed(reason),
    }
}

/// Turns a WebAuthn authentication into a verifier-ready [`SignatureTuple`].
#[derive(Clone)]
pub struct SignaturePipeline {
    webauthn: Arc<dyn WebAuthnGateway>,
    options: CeremonyOptions,
}

impl SignaturePipeline {
    pub fn new(webauthn: Arc<dyn WebAuthnGateway>, options: CeremonyOptions) -> Self {
        Self { webauthn, options }
    }

    /// Signs `challenge_payload` (usually a module exec hash) with `credential`.
    ///
    /// The authenticator must embed exactly the challenge issued here. If it
    /// does not, this fails with `ChallengeNotFound` and nothing is repaired.
    /// When the credential's public key is known the tuple is verified locally
    /// before it is handed back. User verification is always required here,
    /// whatever the configured ceremony options say.
    pub async fn sign(
        &self,
        challenge_payload: &[u8],
        credential: &CredentialRecord,
    ) -> PassafeResult<SignatureTuple> {
        let challenge = challenge_from_payload(challenge_payload);
        debug!(key_hash = %credential.key_hash(), "Requesting passkey signature");

        let options = CeremonyOptions {
            user_verification: UserVerification::Required,
            ..self.options
        };
        let assertion = self
            .webauthn
            .authenticate(
                &challenge,
                std::slice::from_ref(credential.credential_id()),
                &options,
            )
            .await
            .map_err(classify)?;

        if &assertion.credential_id != credential.credential_id() {
            return Err(PassafeError::AuthenticationFailed(format!(
                "authenticator answered with credential {} instead of {}",
                assertion.credential_id,
                credential.credential_id()
            )));
        }

        let tuple = build_signature_tuple(&assertion, &challenge, credential)?;
        if credential.has_public_key() {
            let key = P256PublicKey {
                x: *credential.public_key_x(),
                y: *credential.public_key_y(),
            };
            verify_signature_tuple(&tuple, &challenge, &key)?;
        }
        info!(key_hash = %credential.key_hash(), "Passkey signature ready");
        Ok(tuple)
    }

    /// Signs in with an already registered passkey. Authentication does not
    /// disclose the public key, so the returned record carries a zero key.
    pub async fn discover_credential(&self, allowed: &[CredentialId]) -> PassafeResult<CredentialRecord> {
        let challenge = random_challenge();
        let assertion = self
            .webauthn
            .authenticate(&challenge, allowed, &self.options)
            .await
            .map_err(classify)?;

        if !allowed.is_empty() && !allowed.contains(&assertion.credential_id) {
            return Err(PassafeError::AuthenticationFailed(format!(
                "credential {} was not offered",
                assertion.credential_id
            )));
        }

        let client_data = decode_client_data(&assertion.client_data)?;
        split_client_data(&client_data, &challenge)?;
        parse_signature(&decode_base64url(&assertion.signature)?)?;

        let authenticator_data = decode_authenticator_data(&assertion.authenticator_data)?;
        let aaguid = AuthenticatorData::parse(&authenticator_data)
            .ok()
            .and_then(|data| data.aaguid_string());
        let label = authenticator_label(assertion.authenticator_name.as_deref(), aaguid);
        let name = assertion.user_handle.clone().unwrap_or_default();

        let record = CredentialRecord::authentication_only(
            assertion.credential_id.clone(),
            name,
            label,
            Utc::now(),
        );
        info!(key_hash = %record.key_hash(), "Signed in with existing passkey");
        Ok(record)
    }
}

fn build_signature_tuple(
    assertion: &AuthenticationAssertion,
    challenge: &str,
    credential: &CredentialRecord,
) -> PassafeResult<SignatureTuple> {
    let (r, s) = parse_signature(&decode_base64url(&assertion.signature)?)?;
    let client_data = decode_client_data(&assertion.client_data)?;
    let (client_data_prefix, client_data_suffix) = split_client_data(&client_data, challenge)?;
    let authenticator_data = decode_authenticator_data(&assertion.authenticator_data)?;

    Ok(SignatureTuple {
        id: credential.key_hash().as_uint(),
        r,
        s,
        authenticator_data,
        client_data_prefix,
        client_data_suffix,
    })
}
