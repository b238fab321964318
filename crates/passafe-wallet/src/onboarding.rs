use crate::context::PassafeContext;
use crate::gateway::ModuleKey;
use crate::pipeline::SignaturePipeline;
use chrono::Utc;
use passafe_crypto::{credential_from_registration, random_challenge};
use passafe_types::{
    CeremonyError, CredentialId, CredentialRecord, EthAddress, OnboardingState, OnboardingStep,
    PassafeError, PassafeResult, RegistrationAssertion, SessionId, TxHash,
};
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

fn deployment_failed(error: PassafeError) -> PassafeError {
    PassafeError::DeploymentFailed(error.to_string())
}

fn activation_failed(error: PassafeError) -> PassafeError {
    PassafeError::ActivationFailed(error.to_string())
}

/// Drives one session from passkey creation to an enabled module.
///
/// Every transition holds the session lock for its full duration, works on a
/// copy of the state and only swaps the copy in after it has been persisted.
/// A failed or dropped (cancelled) transition therefore leaves the previous
/// state in place. Completed transitions return their cached result when
/// invoked again.
pub struct OnboardingMachine {
    session: SessionId,
    context: PassafeContext,
    pipeline: SignaturePipeline,
    state: Mutex<OnboardingState>,
}

impl OnboardingMachine {
    /// Loads the session's persisted state, or starts from `NoCredential`.
    pub fn resume(context: PassafeContext, session: SessionId) -> PassafeResult<Self> {
        let state = context.store.load(&session)?.unwrap_or_default();
        info!(%session, step = %state.step(), "Resumed onboarding session");

        let pipeline = SignaturePipeline::new(context.webauthn.clone(), context.ceremony);
        Ok(Self {
            session,
            context,
            pipeline,
            state: Mutex::new(state),
        })
    }

    pub fn session(&self) -> &SessionId {
        &self.session
    }

    pub fn context(&self) -> &PassafeContext {
        &self.context
    }

    pub fn pipeline(&self) -> &SignaturePipeline {
        &self.pipeline
    }

    /// Waits for any in-flight transition, then copies the state.
    pub async fn snapshot(&self) -> OnboardingState {
        self.state.lock().await.clone()
    }

    pub async fn step(&self) -> OnboardingStep {
        self.state.lock().await.step()
    }

    fn commit(&self, guard: &mut MutexGuard<'_, OnboardingState>, next: OnboardingState) -> PassafeResult<()> {
        self.context.store.save(&self.session, &next)?;
        let from = guard.step();
        **guard = next;
        if from != guard.step() {
            info!(session = %self.session, %from, to = %guard.step(), "Onboarding advanced");
        }
        Ok(())
    }

    /// Runs the registration ceremony for `name`.
    pub async fn register(&self, name: &str) -> PassafeResult<CredentialRecord> {
        let mut state = self.state.lock().await;
        if let Some(existing) = &state.credential {
            debug!(session = %self.session, "Passkey already registered");
            return Ok(existing.clone());
        }
        if name.trim().is_empty() {
            return Err(PassafeError::PreconditionNotMet("a display name is required".into()));
        }

        let challenge = random_challenge();
        info!(session = %self.session, "Starting passkey registration");
        let assertion = self
            .context
            .webauthn
            .register(&challenge, name, &self.context.ceremony)
            .await
            .map_err(|e| match e {
                CeremonyError::Cancelled => {
                    PassafeError::Cancelled("registration prompt dismissed".into())
                }
                CeremonyError::Failed(reason) => PassafeError::CredentialRegistrationFailed(reason),
            })?;

        self.apply_registration(&mut state, &assertion, name, &challenge)
    }

    /// Records a registration produced outside [`register`](Self::register),
    /// for front-ends that drive the ceremony themselves.
    pub async fn complete_registration(
        &self,
        assertion: &RegistrationAssertion,
        name: &str,
        challenge: &str,
    ) -> PassafeResult<CredentialRecord> {
        let mut state = self.state.lock().await;
        self.apply_registration(&mut state, assertion, name, challenge)
    }

    fn apply_registration(
        &self,
        state: &mut MutexGuard<'_, OnboardingState>,
        assertion: &RegistrationAssertion,
        name: &str,
        challenge: &str,
    ) -> PassafeResult<CredentialRecord> {
        if let Some(existing) = &state.credential {
            return self.same_credential(existing, &assertion.credential_id);
        }

        let record = credential_from_registration(assertion, name, challenge, Utc::now())?;
        let mut next = (**state).clone();
        next.credential = Some(record.clone());
        self.commit(state, next)?;
        info!(session = %self.session, key_hash = %record.key_hash(), "Passkey registered");
        Ok(record)
    }

    fn same_credential(&self, existing: &CredentialRecord, id: &CredentialId) -> PassafeResult<CredentialRecord> {
        if existing.credential_id() == id {
            Ok(existing.clone())
        } else {
            Err(PassafeError::PreconditionNotMet(
                "a different passkey is already registered; reset the session first".into(),
            ))
        }
    }

    /// Signs in with a passkey registered earlier. The record has no public
    /// key, so a module cannot be deployed for it from this session.
    pub async fn sign_in(&self, allowed: &[CredentialId]) -> PassafeResult<CredentialRecord> {
        let mut state = self.state.lock().await;
        let record = self.pipeline.discover_credential(allowed).await?;

        if let Some(existing) = &state.credential {
            return self.same_credential(existing, record.credential_id());
        }

        let mut next = state.clone();
        next.credential = Some(record.clone());
        self.commit(&mut state, next)?;
        Ok(record)
    }

    /// Deploys the Safe. The address is predicted from the credential, so a
    /// wallet left behind by an interrupted attempt is adopted, not duplicated.
    ///
    /// Once the wallet is confirmed the cached address is returned. Before
    /// that, a recorded address is re-checked on chain and the deployment is
    /// sent again if the earlier transaction never produced the contract.
    pub async fn deploy_wallet(&self) -> PassafeResult<EthAddress> {
        let mut state = self.state.lock().await;
        if let (Some(address), true) = (state.wallet_address, state.wallet_deployed) {
            return Ok(address);
        }
        let credential = state.credential.clone().ok_or_else(|| {
            PassafeError::PreconditionNotMet("register a passkey before creating a wallet".into())
        })?;

        let chain = &self.context.chain;
        let (owners, threshold) = self
            .context
            .policy
            .resolve(chain.relayer_address())
            .map_err(|e| PassafeError::PreconditionNotMet(e.to_string()))?;
        let salt = credential.key_hash();

        let predicted = match state.wallet_address {
            Some(recorded) => recorded,
            None => chain
                .predict_wallet_address(&owners, threshold, &salt)
                .await
                .map_err(deployment_failed)?,
        };

        let mut next = state.clone();
        if chain.is_wallet_deployed(&predicted).await.map_err(deployment_failed)? {
            info!(session = %self.session, wallet = %predicted, "Adopting already deployed wallet");
            next.wallet_deployed = true;
            next.wallet_address = Some(predicted);
        } else {
            if state.wallet_address.is_some() {
                warn!(session = %self.session, wallet = %predicted, "Recorded wallet has no code, deploying again");
            }
            info!(session = %self.session, owners = owners.len(), threshold, "Deploying wallet");
            let address = chain
                .deploy_wallet(&owners, threshold, &salt)
                .await
                .map_err(deployment_failed)?;
            if address != predicted {
                warn!(predicted = %predicted, actual = %address, "Wallet address differs from prediction");
            }
            next.wallet_address = Some(address);
        }

        let address = next.wallet_address.unwrap_or(predicted);
        self.commit(&mut state, next)?;
        Ok(address)
    }

    /// Deploys the passkey module seeded with the credential's public key.
    pub async fn deploy_module(&self) -> PassafeResult<EthAddress> {
        let mut state = self.state.lock().await;
        if let Some(address) = state.module_address {
            return Ok(address);
        }
        let credential = state.credential.clone().ok_or_else(|| {
            PassafeError::PreconditionNotMet("register a passkey before deploying the module".into())
        })?;
        if state.wallet_address.is_none() {
            return Err(PassafeError::PreconditionNotMet(
                "create the wallet before deploying the module".into(),
            ));
        }
        if !credential.has_public_key() {
            return Err(PassafeError::PreconditionNotMet(
                "the passkey's public key is unknown; register it on this device".into(),
            ));
        }

        let chain = &self.context.chain;
        let key = ModuleKey::from_credential(&credential);
        let predicted = chain.predict_module_address(&key).await.map_err(deployment_failed)?;

        let address = if chain.is_module_deployed(&predicted).await.map_err(deployment_failed)? {
            info!(session = %self.session, module = %predicted, "Adopting already deployed module");
            predicted
        } else {
            info!(session = %self.session, key_hash = %key.key_hash, "Deploying passkey module");
            chain.deploy_module(&key).await.map_err(deployment_failed)?
        };

        let mut next = state.clone();
        next.module_address = Some(address);
        self.commit(&mut state, next)?;
        Ok(address)
    }

    /// Polls for the wallet deployment. `Ok(false)` means "not yet"; if it
    /// stays false the deployment was lost and [`deploy_wallet`](Self::deploy_wallet)
    /// can be invoked again to resend it.
    pub async fn check_deployment(&self) -> PassafeResult<bool> {
        let mut state = self.state.lock().await;
        if state.wallet_deployed && state.module_address.is_some() {
            return Ok(true);
        }
        let wallet = match (state.wallet_address, state.module_address) {
            (Some(wallet), Some(_)) => wallet,
            _ => {
                return Err(PassafeError::PreconditionNotMet(
                    "deploy the wallet and module before checking confirmation".into(),
                ))
            }
        };

        if !self.context.chain.is_wallet_deployed(&wallet).await? {
            debug!(session = %self.session, %wallet, "Wallet deployment not confirmed yet");
            return Ok(false);
        }

        let mut next = state.clone();
        next.wallet_deployed = true;
        self.commit(&mut state, next)?;
        Ok(true)
    }

    /// Enables the module on the wallet. Rejected locally, without touching
    /// the chain, until the deployment is confirmed. Returns the activation
    /// transaction, or `None` when the module was found already enabled.
    pub async fn enable_module(&self) -> PassafeResult<Option<TxHash>> {
        let mut state = self.state.lock().await;
        if state.module_enabled {
            return Ok(state.activation_tx);
        }
        let step = state.step();
        let (wallet, module) = match (step, state.wallet_address, state.module_address) {
            (OnboardingStep::ModuleConfirmed, Some(wallet), Some(module)) => (wallet, module),
            _ => {
                return Err(PassafeError::PreconditionNotMet(format!(
                    "module activation requires a confirmed deployment (current step: {})",
                    step
                )))
            }
        };

        let chain = &self.context.chain;
        let mut next = state.clone();
        if chain
            .is_module_enabled(&wallet, &module)
            .await
            .map_err(activation_failed)?
        {
            info!(session = %self.session, %module, "Module already enabled on wallet");
        } else {
            info!(session = %self.session, %wallet, %module, "Enabling module");
            let tx = chain.enable_module(&wallet, &module).await.map_err(activation_failed)?;
            next.activation_tx = Some(tx);
        }
        next.module_enabled = true;

        let activation = next.activation_tx;
        self.commit(&mut state, next)?;
        Ok(activation)
    }

    /// Start over: the only operation that clears populated fields.
    pub async fn reset(&self) -> PassafeResult<()> {
        let mut state = self.state.lock().await;
        self.context.store.delete(&self.session)?;
        *state = OnboardingState::default();
        info!(session = %self.session, "Onboarding reset");
        Ok(())
    }
}
