#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod address;
pub mod amount;
pub mod constants;
pub mod credential;
pub mod crypto;
pub mod error;
pub mod onboarding;
pub mod signature;
pub mod webauthn;

pub use address::EthAddress;
pub use amount::TokenAmount;
pub use constants::*;
pub use credential::{CredentialId, CredentialRecord};
pub use crypto::{KeyHash, TxHash, Uint256};
pub use error::{PassafeError, PassafeResult, RecoveryAction};
pub use onboarding::{OnboardingState, OnboardingStep, SessionId};
pub use signature::SignatureTuple;
pub use webauthn::{
    AuthenticationAssertion, AuthenticatorType, CeremonyError, CeremonyOptions,
    RegistrationAssertion, UserVerification,
};
