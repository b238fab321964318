use crate::config::WalletPolicy;
use crate::gateway::{ChainGateway, WebAuthnGateway};
use crate::storage::OnboardingStore;
use passafe_types::{CeremonyOptions, PassafeResult};
use std::sync::Arc;

/// Explicitly constructed collaborators shared by the state machine, the
/// signature pipeline and the authorizer. Cloning shares the same gateways.
#[derive(Clone)]
pub struct PassafeContext {
    pub chain: Arc<dyn ChainGateway>,
    pub webauthn: Arc<dyn WebAuthnGateway>,
    pub store: Arc<dyn OnboardingStore>,
    pub policy: WalletPolicy,
    pub ceremony: CeremonyOptions,
}

impl PassafeContext {
    pub fn new(
        chain: Arc<dyn ChainGateway>,
        webauthn: Arc<dyn WebAuthnGateway>,
        store: Arc<dyn OnboardingStore>,
    ) -> Self {
        Self {
            chain,
            webauthn,
            store,
            policy: WalletPolicy::default(),
            ceremony: CeremonyOptions::default(),
        }
    }

    pub fn with_policy(mut self, policy: WalletPolicy) -> PassafeResult<Self> {
        policy.validate()?;
        self.policy = policy;
        Ok(self)
    }

    pub fn with_ceremony_options(mut self, options: CeremonyOptions) -> Self {
        self.ceremony = options;
        self
    }
}
