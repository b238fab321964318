mod artifact;
mod bindings;
mod client;

pub use artifact::ModuleArtifact;
pub use bindings::{GnosisSafe, PasskeyModule, SafeProxyFactory};
pub use client::EthersChainGateway;
