#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod authorize;
pub mod chain;
pub mod config;
pub mod context;
pub mod gateway;
pub mod logging;
pub mod onboarding;
pub mod pipeline;
pub mod session;
pub mod storage;
pub mod transaction;

pub use authorize::Authorizer;
pub use chain::{EthersChainGateway, ModuleArtifact};
pub use config::{LogLevel, LoggingConfig, Network, NetworkConfig, PassafeConfig, WalletPolicy};
pub use context::PassafeContext;
pub use gateway::{AuthorizedCall, ChainGateway, ExecHash, ModuleKey, WebAuthnGateway};
pub use logging::init_logging;
pub use onboarding::OnboardingMachine;
pub use pipeline::SignaturePipeline;
pub use session::OnboardingSessions;
pub use storage::{MemoryOnboardingStore, OnboardingStore, SledOnboardingStore};
pub use transaction::{ContractCall, Erc20Call};
