use passafe_types::{CeremonyOptions, EthAddress, PassafeError, PassafeResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;
use zeroize::Zeroizing;

pub const SAFE_SINGLETON_L2: &str = "0x3E5c63644E683549055b9Be8653de26E0B4CD36E";

pub const SAFE_PROXY_FACTORY: &str = "0xa6B71E26C5e0845f74c812102Ca7114b6a896AB2";

pub const SAFE_FALLBACK_HANDLER: &str = "0xf48f2B2d2a534e402487b3ee7C18c33Aec0Fe5e4";

/// Deterministic deployment proxy, present at this address on every EVM chain.
pub const CREATE2_DEPLOYER: &str = "0x4e59b44847b379578588920ca78fbf26c0b4956c";

pub const RELAYER_KEY_ENV: &str = "PASSAFE_RELAYER_KEY";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Base,
    Optimism,
}

impl std::str::FromStr for Network {
    type Err = PassafeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "base" => Ok(Network::Base),
            "op" | "optimism" => Ok(Network::Optimism),
            other => Err(PassafeError::Config(format!("Unknown network: {}", other))),
        }
    }
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Network::Base => write!(f, "base"),
            Network::Optimism => write!(f, "optimism"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub rpc_url: String,
    pub chain_id: u64,
    pub safe_singleton: EthAddress,
    pub proxy_factory: EthAddress,
    pub fallback_handler: EthAddress,
    pub create2_deployer: EthAddress,
    pub tx_service_url: String,
}

impl NetworkConfig {
    fn with_canonical_contracts(rpc_url: &str, chain_id: u64, tx_service_url: &str) -> Self {
        Self {
            rpc_url: rpc_url.to_string(),
            chain_id,
            safe_singleton: canonical(SAFE_SINGLETON_L2),
            proxy_factory: canonical(SAFE_PROXY_FACTORY),
            fallback_handler: canonical(SAFE_FALLBACK_HANDLER),
            create2_deployer: canonical(CREATE2_DEPLOYER),
            tx_service_url: tx_service_url.to_string(),
        }
    }

    pub fn base_goerli() -> Self {
        Self::with_canonical_contracts(
            "https://goerli.base.org",
            84531,
            "https://safe-transaction-base-testnet.safe.global/",
        )
    }

    pub fn optimism() -> Self {
        Self::with_canonical_contracts(
            "https://mainnet-sequencer.optimism.io/",
            10,
            "https://safe-transaction-optimism.safe.global/",
        )
    }

    fn validate(&self, name: &str) -> PassafeResult<()> {
        if self.rpc_url.is_empty() {
            return Err(PassafeError::Config(format!("{} rpc_url is empty", name)));
        }
        if self.chain_id == 0 {
            return Err(PassafeError::Config(format!("{} chain_id cannot be 0", name)));
        }
        for (field, address) in [
            ("safe_singleton", &self.safe_singleton),
            ("proxy_factory", &self.proxy_factory),
            ("create2_deployer", &self.create2_deployer),
        ] {
            if address.is_zero() {
                return Err(PassafeError::Config(format!("{} {} is not set", name, field)));
            }
        }
        Ok(())
    }
}

// Compile-time constants; a parse failure means the literal itself is wrong.
fn canonical(hex: &str) -> EthAddress {
    EthAddress::from_hex(hex).unwrap_or_default()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworksConfig {
    pub base: NetworkConfig,
    pub optimism: NetworkConfig,
}

impl Default for NetworksConfig {
    fn default() -> Self {
        Self {
            base: NetworkConfig::base_goerli(),
            optimism: NetworkConfig::optimism(),
        }
    }
}

/// Safe ownership. The relayer is always the first owner.
///
/// The module is enabled through `execTransaction` signed by the relayer
/// alone, so only a threshold of 1 can reach `Connected`. Extra owners may
/// still be listed as co-owners of the Safe.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletPolicy {
    pub additional_owners: Vec<EthAddress>,
    pub threshold: u32,
}

impl Default for WalletPolicy {
    fn default() -> Self {
        Self {
            additional_owners: Vec::new(),
            threshold: 1,
        }
    }
}

impl WalletPolicy {
    /// Relayer first, then the additional owners without duplicates.
    pub fn owners(&self, relayer: EthAddress) -> Vec<EthAddress> {
        let mut owners = vec![relayer];
        for owner in &self.additional_owners {
            if !owners.contains(owner) {
                owners.push(*owner);
            }
        }
        owners
    }

    pub fn validate(&self) -> PassafeResult<()> {
        if self.additional_owners.iter().any(EthAddress::is_zero) {
            return Err(PassafeError::Config("Safe owner cannot be the zero address".into()));
        }
        if self.threshold != 1 {
            return Err(PassafeError::Config(format!(
                "Threshold {} is not supported: module activation is relayed with a single owner signature",
                self.threshold
            )));
        }
        Ok(())
    }

    /// Owner list and threshold exactly as they go to the Safe factory.
    /// Checked against the deduplicated owners, which may be fewer than listed
    /// when the relayer or a repeated address appears in `additional_owners`.
    pub fn resolve(&self, relayer: EthAddress) -> PassafeResult<(Vec<EthAddress>, u32)> {
        self.validate()?;
        if relayer.is_zero() {
            return Err(PassafeError::Config("Relayer address is not set".into()));
        }
        let owners = self.owners(relayer);
        if self.threshold as usize > owners.len() {
            return Err(PassafeError::Config(format!(
                "Threshold {} exceeds the {} distinct owners",
                self.threshold,
                owners.len()
            )));
        }
        Ok((owners, self.threshold))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Error => write!(f, "error"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Trace => write!(f, "trace"),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: LogLevel,
    pub file: Option<PathBuf>,
    pub json: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PassafeConfig {
    pub network: Network,
    pub data_dir: PathBuf,
    pub networks: NetworksConfig,
    /// Compiled passkey module artifact (`{"abi": .., "bytecode": ..}`).
    pub module_artifact: Option<PathBuf>,
    pub policy: WalletPolicy,
    pub ceremony: CeremonyOptions,
    pub logging: LoggingConfig,
}

impl Default for PassafeConfig {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            network: Network::default(),
            data_dir: home.join(".passafe"),
            networks: NetworksConfig::default(),
            module_artifact: None,
            policy: WalletPolicy::default(),
            ceremony: CeremonyOptions::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl PassafeConfig {
    pub fn load(path: impl AsRef<Path>) -> PassafeResult<Self> {
        let path = path.as_ref();

        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)
                .map_err(|e| PassafeError::Config(format!("Failed to read config: {}", e)))?;

            toml::from_str(&contents)
                .map_err(|e| PassafeError::Config(format!("Failed to parse config: {}", e)))?
        } else {
            info!("Config file not found, using defaults");
            Self::default()
        };

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> PassafeResult<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| PassafeError::Config(format!("Failed to serialize config: {}", e)))?;

        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| PassafeError::Config(format!("Failed to create config dir: {}", e)))?;
        }

        std::fs::write(path.as_ref(), contents)
            .map_err(|e| PassafeError::Config(format!("Failed to write config: {}", e)))?;

        info!("Configuration saved to {:?}", path.as_ref());
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(network) = var("PASSAFE_NETWORK") {
            if let Ok(network) = network.parse() {
                self.network = network;
            }
        }

        if let Some(dir) = var("PASSAFE_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }

        if let Some(rpc) = var("PASSAFE_BASE_RPC_URL") {
            self.networks.base.rpc_url = rpc;
        }

        if let Some(rpc) = var("PASSAFE_OP_RPC_URL") {
            self.networks.optimism.rpc_url = rpc;
        }

        if let Some(artifact) = var("PASSAFE_MODULE_ARTIFACT") {
            self.module_artifact = Some(PathBuf::from(artifact));
        }

        if let Some(level) = var("PASSAFE_LOG_LEVEL") {
            self.logging.level = match level.to_lowercase().as_str() {
                "error" => LogLevel::Error,
                "warn" => LogLevel::Warn,
                "info" => LogLevel::Info,
                "debug" => LogLevel::Debug,
                "trace" => LogLevel::Trace,
                _ => LogLevel::Info,
            };
        }

        if var("PASSAFE_LOG_JSON").is_some() {
            self.logging.json = true;
        }
    }

    pub fn validate(&self) -> PassafeResult<()> {
        self.networks.base.validate("base")?;
        self.networks.optimism.validate("optimism")?;
        self.policy.validate()?;

        if self.data_dir.as_os_str().is_empty() {
            return Err(PassafeError::Config("data_dir cannot be empty".into()));
        }
        Ok(())
    }

    pub fn active_network(&self) -> &NetworkConfig {
        match self.network {
            Network::Base => &self.networks.base,
            Network::Optimism => &self.networks.optimism,
        }
    }

    pub fn storage_path(&self) -> PathBuf {
        self.data_dir.join("onboarding")
    }
}

/// Relayer private key from the environment. Never persisted in the config file.
pub fn relayer_key() -> PassafeResult<Zeroizing<String>> {
    std::env::var(RELAYER_KEY_ENV)
        .map(Zeroizing::new)
        .map_err(|_| PassafeError::Config(format!("{} is not set", RELAYER_KEY_ENV)))
}
