use crate::crypto::Uint256;
use std::fmt;

/// Verifier-ready passkey signature over one challenge. Built fresh for every
/// authorization and never persisted.
///
/// The verifier rebuilds `client_data_prefix + challenge + client_data_suffix`,
/// so the two halves must be the exact bytes the authenticator signed.
#[derive(Clone, PartialEq, Eq)]
pub struct SignatureTuple {
    pub id: Uint256,
    pub r: Uint256,
    pub s: Uint256,
    pub authenticator_data: Vec<u8>,
    pub client_data_prefix: String,
    pub client_data_suffix: String,
}

impl SignatureTuple {
    /// The client data JSON the verifier will reconstruct for `challenge`.
    pub fn client_data_json(&self, challenge: &str) -> String {
        let mut json = String::with_capacity(
            self.client_data_prefix.len() + challenge.len() + self.client_data_suffix.len(),
        );
        json.push_str(&self.client_data_prefix);
        json.push_str(challenge);
        json.push_str(&self.client_data_suffix);
        json
    }
}

impl fmt::Debug for SignatureTuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignatureTuple")
            .field("id", &self.id)
            .field("authenticator_data_len", &self.authenticator_data.len())
            .field("client_data_prefix", &self.client_data_prefix)
            .field("client_data_suffix", &self.client_data_suffix)
            .finish_non_exhaustive()
    }
}
