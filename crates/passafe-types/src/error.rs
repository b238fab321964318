use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PassafeError {
    #[error("Malformed encoding: {0}")]
    MalformedEncoding(String),

    #[error("Invalid signature encoding: {0}")]
    InvalidSignatureEncoding(String),

    #[error("Challenge not found in client data: {0}")]
    ChallengeNotFound(String),

    #[error("Credential registration failed: {0}")]
    CredentialRegistrationFailed(String),

    #[error("Deployment failed: {0}")]
    DeploymentFailed(String),

    #[error("Activation failed: {0}")]
    ActivationFailed(String),

    #[error("Precondition not met: {0}")]
    PreconditionNotMet(String),

    #[error("Ceremony cancelled: {0}")]
    Cancelled(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Submission failed: {0}")]
    SubmissionFailed(String),

    #[error("Invalid key format: {0}")]
    InvalidKey(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Contract error: {0}")]
    Contract(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type PassafeResult<T> = Result<T, PassafeError>;

/// What the user (or the front-end on their behalf) should do after a failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecoveryAction {
    /// Re-invoke the same operation.
    Retry,
    /// Run a fresh WebAuthn ceremony.
    Reauthenticate,
    /// Poll again later; the chain has not caught up yet.
    WaitForConfirmation,
    /// Complete the earlier onboarding step first.
    SatisfyPrecondition,
    /// The input itself is wrong; retrying unchanged will fail again.
    FixInput,
    /// Local state is unusable; start over.
    Reset,
}

impl PassafeError {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.recovery(),
            RecoveryAction::Retry | RecoveryAction::Reauthenticate | RecoveryAction::WaitForConfirmation
        )
    }

    pub fn recovery(&self) -> RecoveryAction {
        match self {
            PassafeError::CredentialRegistrationFailed(_)
            | PassafeError::DeploymentFailed(_)
            | PassafeError::ActivationFailed(_)
            | PassafeError::SubmissionFailed(_) => RecoveryAction::Retry,
            PassafeError::Network(_) | PassafeError::Contract(_) => RecoveryAction::WaitForConfirmation,
            PassafeError::Cancelled(_)
            | PassafeError::AuthenticationFailed(_)
            | PassafeError::ChallengeNotFound(_) => RecoveryAction::Reauthenticate,
            PassafeError::PreconditionNotMet(_) => RecoveryAction::SatisfyPrecondition,
            PassafeError::MalformedEncoding(_)
            | PassafeError::InvalidSignatureEncoding(_)
            | PassafeError::InvalidKey(_)
            | PassafeError::InvalidAddress(_)
            | PassafeError::Config(_) => RecoveryAction::FixInput,
            PassafeError::Storage(_) | PassafeError::Serialization(_) => RecoveryAction::Reset,
        }
    }
}
