use crate::address::EthAddress;
use crate::credential::CredentialRecord;
use crate::crypto::TxHash;
use crate::error::{PassafeError, PassafeResult};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::str::FromStr for SessionId {
    type Err = PassafeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(PassafeError::Config("Session id cannot be empty".into()));
        }
        Ok(Self(s.to_string()))
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionId({})", self.0)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OnboardingStep {
    NoCredential,
    CredentialReady,
    WalletDeployed,
    ModulePending,
    ModuleConfirmed,
    Connected,
}

impl fmt::Display for OnboardingStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OnboardingStep::NoCredential => "no-credential",
            OnboardingStep::CredentialReady => "credential-ready",
            OnboardingStep::WalletDeployed => "wallet-deployed",
            OnboardingStep::ModulePending => "module-pending",
            OnboardingStep::ModuleConfirmed => "module-confirmed",
            OnboardingStep::Connected => "connected",
        };
        f.write_str(name)
    }
}

/// Per-session onboarding progress. Fields only ever go from unset to set;
/// clearing happens by replacing the whole state on reset.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OnboardingState {
    pub credential: Option<CredentialRecord>,
    pub wallet_address: Option<EthAddress>,
    pub module_address: Option<EthAddress>,
    pub wallet_deployed: bool,
    pub module_enabled: bool,
    pub activation_tx: Option<TxHash>,
}

impl OnboardingState {
    pub fn step(&self) -> OnboardingStep {
        if self.credential.is_none() {
            OnboardingStep::NoCredential
        } else if self.wallet_address.is_none() {
            OnboardingStep::CredentialReady
        } else if self.module_address.is_none() {
            OnboardingStep::WalletDeployed
        } else if !self.wallet_deployed {
            OnboardingStep::ModulePending
        } else if !self.module_enabled {
            OnboardingStep::ModuleConfirmed
        } else {
            OnboardingStep::Connected
        }
    }

    pub fn is_connected(&self) -> bool {
        self.step() == OnboardingStep::Connected
    }

    /// Checks the implication chain `module_enabled => module_address and
    /// wallet_deployed => credential`. Rejects states restored from a corrupted store.
    pub fn validate(&self) -> PassafeResult<()> {
        if self.module_enabled && (self.module_address.is_none() || !self.wallet_deployed) {
            return Err(PassafeError::Storage(
                "module marked enabled without a confirmed wallet and module".into(),
            ));
        }
        if self.wallet_deployed && self.wallet_address.is_none() {
            return Err(PassafeError::Storage("wallet marked deployed without an address".into()));
        }
        if (self.wallet_address.is_some() || self.module_address.is_some()) && self.credential.is_none() {
            return Err(PassafeError::Storage("contracts recorded without a credential".into()));
        }
        if self.module_address.is_some() && self.wallet_address.is_none() {
            return Err(PassafeError::Storage("module recorded without a wallet".into()));
        }
        Ok(())
    }
}
