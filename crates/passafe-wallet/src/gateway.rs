use async_trait::async_trait;
use passafe_types::{
    AuthenticationAssertion, CeremonyError, CeremonyOptions, CredentialId, CredentialRecord,
    EthAddress, KeyHash, PassafeResult, RegistrationAssertion, TxHash, Uint256,
};

/// Platform WebAuthn API. Implementations suspend for as long as the user
/// takes; no timeout is applied on this side.
#[async_trait]
pub trait WebAuthnGateway: Send + Sync {
    async fn register(
        &self,
        challenge: &str,
        name: &str,
        options: &CeremonyOptions,
    ) -> Result<RegistrationAssertion, CeremonyError>;

    /// An empty `allowed` list lets the user pick any discoverable credential.
    async fn authenticate(
        &self,
        challenge: &str,
        allowed: &[CredentialId],
        options: &CeremonyOptions,
    ) -> Result<AuthenticationAssertion, CeremonyError>;
}

/// Constructor arguments of the passkey module.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModuleKey {
    pub key_id: CredentialId,
    pub key_hash: KeyHash,
    pub public_key_x: Uint256,
    pub public_key_y: Uint256,
}

impl ModuleKey {
    pub fn from_credential(credential: &CredentialRecord) -> Self {
        Self {
            key_id: credential.credential_id().clone(),
            key_hash: credential.key_hash(),
            public_key_x: *credential.public_key_x(),
            public_key_y: *credential.public_key_y(),
        }
    }
}

/// Module exec hash for one pending call, plus the nonce it commits to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExecHash {
    pub hash: [u8; 32],
    pub nonce: Uint256,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthorizedCall {
    pub module: EthAddress,
    pub wallet: EthAddress,
    pub target: EthAddress,
    pub value: Uint256,
    pub nonce: Uint256,
    pub calldata: Vec<u8>,
    pub signature: Vec<u8>,
}

/// Chain access. Errors come back as `Network` or `Contract`; the state
/// machine reclassifies them per step.
#[async_trait]
pub trait ChainGateway: Send + Sync {
    /// Account that pays for and relays every transaction.
    fn relayer_address(&self) -> EthAddress;

    async fn predict_wallet_address(
        &self,
        owners: &[EthAddress],
        threshold: u32,
        salt: &KeyHash,
    ) -> PassafeResult<EthAddress>;

    /// Returns after the creation transaction is mined without reverting.
    async fn deploy_wallet(
        &self,
        owners: &[EthAddress],
        threshold: u32,
        salt: &KeyHash,
    ) -> PassafeResult<EthAddress>;

    async fn is_wallet_deployed(&self, wallet: &EthAddress) -> PassafeResult<bool>;

    async fn predict_module_address(&self, key: &ModuleKey) -> PassafeResult<EthAddress>;

    async fn is_module_deployed(&self, module: &EthAddress) -> PassafeResult<bool>;

    async fn deploy_module(&self, key: &ModuleKey) -> PassafeResult<EthAddress>;

    async fn is_module_enabled(&self, wallet: &EthAddress, module: &EthAddress) -> PassafeResult<bool>;

    async fn enable_module(&self, wallet: &EthAddress, module: &EthAddress) -> PassafeResult<TxHash>;

    async fn exec_hash(
        &self,
        module: &EthAddress,
        wallet: &EthAddress,
        target: &EthAddress,
        value: &Uint256,
    ) -> PassafeResult<ExecHash>;

    async fn submit_authorized_call(&self, call: &AuthorizedCall) -> PassafeResult<TxHash>;
}
