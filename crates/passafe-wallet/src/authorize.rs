use crate::context::PassafeContext;
use crate::gateway::AuthorizedCall;
use crate::pipeline::SignaturePipeline;
use crate::transaction::ContractCall;
use passafe_crypto::encode_signature_tuple;
use passafe_types::{OnboardingState, PassafeError, PassafeResult, TxHash};
use tracing::info;

/// Executes calls from a connected wallet through the passkey module.
pub struct Authorizer {
    context: PassafeContext,
    pipeline: SignaturePipeline,
}

impl Authorizer {
    pub fn new(context: PassafeContext) -> Self {
        let pipeline = SignaturePipeline::new(context.webauthn.clone(), context.ceremony);
        Self { context, pipeline }
    }

    pub async fn execute(&self, state: &OnboardingState, call: &ContractCall) -> PassafeResult<TxHash> {
        let (credential, wallet, module) = match (&state.credential, state.wallet_address, state.module_address) {
            (Some(credential), Some(wallet), Some(module)) if state.is_connected() => (credential, wallet, module),
            _ => {
                return Err(PassafeError::PreconditionNotMet(format!(
                    "wallet is not connected (current step: {})",
                    state.step()
                )))
            }
        };

        let chain = &self.context.chain;
        let exec = chain
            .exec_hash(&module, &wallet, &call.target, &call.value)
            .await
            .map_err(|e| PassafeError::SubmissionFailed(e.to_string()))?;

        let signature = self.pipeline.sign(&exec.hash, credential).await?;

        let authorized = AuthorizedCall {
            module,
            wallet,
            target: call.target,
            value: call.value,
            nonce: exec.nonce,
            calldata: call.calldata.clone(),
            signature: encode_signature_tuple(&signature),
        };

        let tx = chain
            .submit_authorized_call(&authorized)
            .await
            .map_err(|e| PassafeError::SubmissionFailed(e.to_string()))?;
        info!(%wallet, target = %call.target, tx = %tx, "Authorized call submitted");
        Ok(tx)
    }
}
