#![allow(dead_code)]

use async_trait::async_trait;
use p256::ecdsa::signature::{Signer, Verifier};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use p256::pkcs8::EncodePublicKey;
use passafe_crypto::{encode_base64url, keccak256};
use passafe_types::{
    AuthenticationAssertion, CeremonyError, CeremonyOptions, CredentialId, EthAddress, KeyHash,
    PassafeError, PassafeResult, RegistrationAssertion, SignatureTuple, TxHash, Uint256,
    COSE_ALG_ES256,
};
use passafe_wallet::{
    AuthorizedCall, ChainGateway, ExecHash, MemoryOnboardingStore, ModuleKey, OnboardingStore,
    PassafeContext, WebAuthnGateway,
};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};

pub const ORIGIN: &str = "https://passafe.app";
pub const AAGUID: [u8; 16] = [
    0xad, 0xce, 0x00, 0x02, 0x35, 0xbc, 0xc6, 0x0a, 0x64, 0x8b, 0x0b, 0x25, 0xf1, 0xf0, 0x55, 0x03,
];

/// How the next ceremony behaves.
#[derive(Clone, Debug)]
pub enum Script {
    Cancel,
    Fail(String),
    /// Signs a challenge other than the one requested.
    WrongChallenge,
    /// Never completes, like a prompt the user leaves open.
    Hang,
    /// Answers with a credential other than the one requested.
    WrongCredential,
    /// Reports an empty authenticator name.
    Unnamed,
}

/// In-process authenticator holding a real P-256 key.
pub struct MockAuthenticator {
    signing_key: SigningKey,
    script: Mutex<VecDeque<Script>>,
    calls: Mutex<HashMap<&'static str, usize>>,
    options: Mutex<HashMap<&'static str, CeremonyOptions>>,
    sign_count: Mutex<u32>,
}

impl MockAuthenticator {
    pub fn new() -> Self {
        Self {
            signing_key: SigningKey::random(&mut rand::rngs::OsRng),
            script: Mutex::new(VecDeque::new()),
            calls: Mutex::new(HashMap::new()),
            options: Mutex::new(HashMap::new()),
            sign_count: Mutex::new(0),
        }
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        *self.signing_key.verifying_key()
    }

    pub fn push(&self, script: Script) {
        self.script.lock().unwrap().push_back(script);
    }

    pub fn calls(&self, ceremony: &str) -> usize {
        self.calls.lock().unwrap().get(ceremony).copied().unwrap_or(0)
    }

    /// Options passed to the most recent `ceremony` call.
    pub fn last_options(&self, ceremony: &str) -> Option<CeremonyOptions> {
        self.options.lock().unwrap().get(ceremony).copied()
    }

    pub fn credential_id_for(name: &str) -> CredentialId {
        CredentialId::new(encode_base64url(&Sha256::digest(name.as_bytes())[..16]))
    }

    async fn next(&self, ceremony: &'static str, options: &CeremonyOptions) -> Option<Script> {
        *self.calls.lock().unwrap().entry(ceremony).or_insert(0) += 1;
        self.options.lock().unwrap().insert(ceremony, *options);
        let script = self.script.lock().unwrap().pop_front();
        if let Some(Script::Hang) = script {
            futures::future::pending::<()>().await;
        }
        script
    }

    fn authenticator_data(&self, attested: bool) -> Vec<u8> {
        let mut data = Sha256::digest(b"passafe.app").to_vec();
        let mut count = self.sign_count.lock().unwrap();
        *count += 1;
        if attested {
            data.push(0x45);
            data.extend_from_slice(&count.to_be_bytes());
            data.extend_from_slice(&AAGUID);
        } else {
            data.push(0x05);
            data.extend_from_slice(&count.to_be_bytes());
        }
        data
    }

    fn client_data(kind: &str, challenge: &str) -> String {
        format!(
            r#"{{"type":"{kind}","challenge":"{challenge}","origin":"{ORIGIN}","crossOrigin":false}}"#
        )
    }
}

#[async_trait]
impl WebAuthnGateway for MockAuthenticator {
    async fn register(
        &self,
        challenge: &str,
        name: &str,
        options: &CeremonyOptions,
    ) -> Result<RegistrationAssertion, CeremonyError> {
        let challenge = match self.next("register", options).await {
            Some(Script::Cancel) => return Err(CeremonyError::Cancelled),
            Some(Script::Fail(reason)) => return Err(CeremonyError::Failed(reason)),
            Some(Script::WrongChallenge) => "c3RhbGU".to_string(),
            _ => challenge.to_string(),
        };

        let spki = self
            .signing_key
            .verifying_key()
            .to_public_key_der()
            .map_err(|e| CeremonyError::Failed(e.to_string()))?;

        Ok(RegistrationAssertion {
            credential_id: Self::credential_id_for(name),
            public_key: encode_base64url(spki.as_bytes()),
            algorithm: COSE_ALG_ES256,
            authenticator_data: encode_base64url(&self.authenticator_data(true)),
            client_data: encode_base64url(Self::client_data("webauthn.create", &challenge).as_bytes()),
            authenticator_name: None,
        })
    }

    async fn authenticate(
        &self,
        challenge: &str,
        allowed: &[CredentialId],
        options: &CeremonyOptions,
    ) -> Result<AuthenticationAssertion, CeremonyError> {
        let script = self.next("authenticate", options).await;
        let authenticator_name = match script {
            Some(Script::Unnamed) => String::new(),
            _ => "Mock Authenticator".to_string(),
        };
        let mut credential_id = allowed
            .first()
            .cloned()
            .unwrap_or_else(|| Self::credential_id_for("discovered"));
        let challenge = match script {
            Some(Script::Cancel) => return Err(CeremonyError::Cancelled),
            Some(Script::Fail(reason)) => return Err(CeremonyError::Failed(reason)),
            Some(Script::WrongChallenge) => "c3RhbGU".to_string(),
            Some(Script::WrongCredential) => {
                credential_id = Self::credential_id_for("someone-else");
                challenge.to_string()
            }
            _ => challenge.to_string(),
        };

        let authenticator_data = self.authenticator_data(false);
        let client_data = Self::client_data("webauthn.get", &challenge);

        let mut message = authenticator_data.clone();
        message.extend_from_slice(&Sha256::digest(client_data.as_bytes()));
        let signature: Signature = self.signing_key.sign(&message);

        Ok(AuthenticationAssertion {
            credential_id,
            authenticator_data: encode_base64url(&authenticator_data),
            client_data: encode_base64url(client_data.as_bytes()),
            signature: encode_base64url(signature.to_der().as_bytes()),
            user_handle: Some("alice".into()),
            authenticator_name: Some(authenticator_name),
        })
    }
}

/// Checks a tuple the way the on-chain verifier does.
pub fn verify_tuple(key: &VerifyingKey, tuple: &SignatureTuple, challenge: &str) -> bool {
    let client_data = tuple.client_data_json(challenge);
    let mut message = tuple.authenticator_data.clone();
    message.extend_from_slice(&Sha256::digest(client_data.as_bytes()));

    let mut scalars = tuple.r.as_bytes().to_vec();
    scalars.extend_from_slice(tuple.s.as_bytes());
    match Signature::from_slice(&scalars) {
        Ok(signature) => key.verify(&message, &signature).is_ok(),
        Err(_) => false,
    }
}

fn derived_address(parts: &[&[u8]]) -> EthAddress {
    let mut preimage = Vec::new();
    for part in parts {
        preimage.extend_from_slice(part);
    }
    let digest = keccak256(&preimage);
    let mut address = [0u8; 20];
    address.copy_from_slice(&digest[12..]);
    EthAddress(address)
}

#[derive(Default)]
struct ChainState {
    wallets: HashSet<EthAddress>,
    pending_confirmations: usize,
    lost_deployments: usize,
    modules: HashSet<EthAddress>,
    enabled: HashSet<(EthAddress, EthAddress)>,
    failures: HashMap<&'static str, usize>,
    hang: HashSet<&'static str>,
    calls: HashMap<&'static str, usize>,
    submitted: Vec<AuthorizedCall>,
    exec_hashes: Vec<[u8; 32]>,
    nonce: u64,
}

/// Chain double that counts every call.
pub struct MockChain {
    relayer: EthAddress,
    state: Mutex<ChainState>,
}

impl MockChain {
    pub fn new() -> Self {
        Self {
            relayer: EthAddress::from_bytes([0x11; 20]),
            state: Mutex::new(ChainState::default()),
        }
    }

    /// The deployed wallet reports "not deployed" for this many polls first.
    pub fn confirm_after(&self, polls: usize) {
        self.state.lock().unwrap().pending_confirmations = polls;
    }

    /// The next `deployments` wallet deployments report success but never land.
    pub fn lose_deployments(&self, deployments: usize) {
        self.state.lock().unwrap().lost_deployments = deployments;
    }

    pub fn fail(&self, op: &'static str, times: usize) {
        self.state.lock().unwrap().failures.insert(op, times);
    }

    pub fn hang(&self, op: &'static str) {
        self.state.lock().unwrap().hang.insert(op);
    }

    pub fn release(&self, op: &'static str) {
        self.state.lock().unwrap().hang.remove(op);
    }

    pub fn preexisting_wallet(&self, wallet: EthAddress) {
        self.state.lock().unwrap().wallets.insert(wallet);
    }

    pub fn calls(&self, op: &str) -> usize {
        self.state.lock().unwrap().calls.get(op).copied().unwrap_or(0)
    }

    pub fn submitted(&self) -> Vec<AuthorizedCall> {
        self.state.lock().unwrap().submitted.clone()
    }

    pub fn exec_hashes(&self) -> Vec<[u8; 32]> {
        self.state.lock().unwrap().exec_hashes.clone()
    }

    async fn enter(&self, op: &'static str) -> PassafeResult<()> {
        let hang = {
            let mut state = self.state.lock().unwrap();
            *state.calls.entry(op).or_insert(0) += 1;
            if let Some(remaining) = state.failures.get_mut(op) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(PassafeError::Network(format!("{op}: rpc unavailable")));
                }
            }
            state.hang.contains(op)
        };
        if hang {
            futures::future::pending::<()>().await;
        }
        Ok(())
    }

    fn wallet_for(owners: &[EthAddress], threshold: u32, salt: &KeyHash) -> EthAddress {
        let mut parts: Vec<&[u8]> = vec![&b"wallet"[..], &salt.as_bytes()[..]];
        for owner in owners {
            parts.push(&owner.as_bytes()[..]);
        }
        let threshold = threshold.to_be_bytes();
        parts.push(&threshold[..]);
        derived_address(&parts)
    }

    fn module_for(key: &ModuleKey) -> EthAddress {
        derived_address(&[
            &b"module"[..],
            &key.key_hash.as_bytes()[..],
            &key.public_key_x.as_bytes()[..],
            &key.public_key_y.as_bytes()[..],
        ])
    }

    fn tx(op: &str, n: usize) -> TxHash {
        TxHash(keccak256(format!("{op}-{n}").as_bytes()))
    }
}

#[async_trait]
impl ChainGateway for MockChain {
    fn relayer_address(&self) -> EthAddress {
        self.relayer
    }

    async fn predict_wallet_address(
        &self,
        owners: &[EthAddress],
        threshold: u32,
        salt: &KeyHash,
    ) -> PassafeResult<EthAddress> {
        self.enter("predict_wallet_address").await?;
        Ok(Self::wallet_for(owners, threshold, salt))
    }

    async fn deploy_wallet(
        &self,
        owners: &[EthAddress],
        threshold: u32,
        salt: &KeyHash,
    ) -> PassafeResult<EthAddress> {
        self.enter("deploy_wallet").await?;
        let wallet = Self::wallet_for(owners, threshold, salt);
        let mut state = self.state.lock().unwrap();
        if state.lost_deployments > 0 {
            state.lost_deployments -= 1;
        } else {
            state.wallets.insert(wallet);
        }
        Ok(wallet)
    }

    async fn is_wallet_deployed(&self, wallet: &EthAddress) -> PassafeResult<bool> {
        self.enter("is_wallet_deployed").await?;
        let mut state = self.state.lock().unwrap();
        if !state.wallets.contains(wallet) {
            return Ok(false);
        }
        if state.pending_confirmations > 0 {
            state.pending_confirmations -= 1;
            return Ok(false);
        }
        Ok(true)
    }

    async fn predict_module_address(&self, key: &ModuleKey) -> PassafeResult<EthAddress> {
        self.enter("predict_module_address").await?;
        Ok(Self::module_for(key))
    }

    async fn is_module_deployed(&self, module: &EthAddress) -> PassafeResult<bool> {
        self.enter("is_module_deployed").await?;
        Ok(self.state.lock().unwrap().modules.contains(module))
    }

    async fn deploy_module(&self, key: &ModuleKey) -> PassafeResult<EthAddress> {
        self.enter("deploy_module").await?;
        let module = Self::module_for(key);
        self.state.lock().unwrap().modules.insert(module);
        Ok(module)
    }

    async fn is_module_enabled(&self, wallet: &EthAddress, module: &EthAddress) -> PassafeResult<bool> {
        self.enter("is_module_enabled").await?;
        Ok(self.state.lock().unwrap().enabled.contains(&(*wallet, *module)))
    }

    async fn enable_module(&self, wallet: &EthAddress, module: &EthAddress) -> PassafeResult<TxHash> {
        self.enter("enable_module").await?;
        let mut state = self.state.lock().unwrap();
        state.enabled.insert((*wallet, *module));
        Ok(Self::tx("enable_module", state.enabled.len()))
    }

    async fn exec_hash(
        &self,
        module: &EthAddress,
        wallet: &EthAddress,
        target: &EthAddress,
        value: &Uint256,
    ) -> PassafeResult<ExecHash> {
        self.enter("exec_hash").await?;
        let nonce = Uint256::from_u64(self.state.lock().unwrap().nonce);
        let mut preimage = Vec::new();
        preimage.extend_from_slice(module.as_bytes());
        preimage.extend_from_slice(wallet.as_bytes());
        preimage.extend_from_slice(target.as_bytes());
        preimage.extend_from_slice(value.as_bytes());
        preimage.extend_from_slice(nonce.as_bytes());
        let hash = keccak256(&preimage);
        self.state.lock().unwrap().exec_hashes.push(hash);
        Ok(ExecHash { hash, nonce })
    }

    async fn submit_authorized_call(&self, call: &AuthorizedCall) -> PassafeResult<TxHash> {
        self.enter("submit_authorized_call").await?;
        let mut state = self.state.lock().unwrap();
        state.nonce += 1;
        state.submitted.push(call.clone());
        Ok(Self::tx("submit", state.submitted.len()))
    }
}

pub struct Harness {
    pub authenticator: Arc<MockAuthenticator>,
    pub chain: Arc<MockChain>,
    pub store: Arc<MemoryOnboardingStore>,
    pub context: PassafeContext,
}

impl Harness {
    pub fn new() -> Self {
        let authenticator = Arc::new(MockAuthenticator::new());
        let chain = Arc::new(MockChain::new());
        let store = Arc::new(MemoryOnboardingStore::new());
        let context = PassafeContext::new(chain.clone(), authenticator.clone(), store.clone());
        Self {
            authenticator,
            chain,
            store,
            context,
        }
    }

    pub fn persisted(&self, session: &passafe_types::SessionId) -> Option<passafe_types::OnboardingState> {
        self.store.load(session).unwrap()
    }
}
