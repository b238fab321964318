use super::artifact::ModuleArtifact;
use super::bindings::{GnosisSafe, PasskeyModule, SafeProxyFactory};
use crate::config::{relayer_key, NetworkConfig, PassafeConfig};
use crate::gateway::{AuthorizedCall, ChainGateway, ExecHash, ModuleKey};
use async_trait::async_trait;
use ethers::{
    abi::{self, Token},
    middleware::SignerMiddleware,
    providers::{Http, Middleware, Provider},
    signers::{LocalWallet, Signer},
    types::{Address, Bytes, TransactionReceipt, TransactionRequest, U256, U64},
    utils::{get_create2_address, keccak256},
};
use passafe_types::{EthAddress, KeyHash, PassafeError, PassafeResult, TxHash, Uint256};
use std::sync::Arc;
use tracing::{debug, info};

type RelayerClient = SignerMiddleware<Provider<Http>, LocalWallet>;

fn to_address(address: &EthAddress) -> Address {
    Address::from_slice(address.as_bytes())
}

fn to_u256(value: &Uint256) -> U256 {
    U256::from_big_endian(value.as_bytes())
}

fn from_u256(value: U256) -> Uint256 {
    let mut bytes = [0u8; 32];
    value.to_big_endian(&mut bytes);
    Uint256(bytes)
}

/// Safe v1.3.0 proxy salt: `keccak256(keccak256(initializer) ++ saltNonce)`.
fn proxy_salt(initializer: &[u8], salt_nonce: &KeyHash) -> [u8; 32] {
    let mut preimage = keccak256(initializer).to_vec();
    preimage.extend_from_slice(salt_nonce.as_bytes());
    keccak256(preimage)
}

/// `proxyCreationCode ++ uint256(singleton)`.
fn proxy_init_code(creation_code: &[u8], singleton: &EthAddress) -> Vec<u8> {
    let mut code = creation_code.to_vec();
    code.extend_from_slice(&[0u8; 12]);
    code.extend_from_slice(singleton.as_bytes());
    code
}

fn module_init_code(bytecode: &[u8], key: &ModuleKey) -> Vec<u8> {
    let mut code = bytecode.to_vec();
    code.extend(abi::encode(&[
        Token::String(key.key_id.as_str().to_string()),
        Token::Uint(to_u256(&key.public_key_x)),
        Token::Uint(to_u256(&key.public_key_y)),
    ]));
    code
}

/// Owner signature accepted by `execTransaction` when the owner is also the
/// sender: `r = owner`, `s = 0`, `v = 1`.
fn prevalidated_signature(owner: &EthAddress) -> Bytes {
    let mut signature = vec![0u8; 12];
    signature.extend_from_slice(owner.as_bytes());
    signature.extend_from_slice(&[0u8; 32]);
    signature.push(1);
    Bytes::from(signature)
}

fn check_receipt(receipt: Option<TransactionReceipt>, what: &str) -> PassafeResult<TxHash> {
    let receipt = receipt.ok_or_else(|| PassafeError::Contract(format!("No receipt for {}", what)))?;
    if receipt.status != Some(U64::from(1)) {
        return Err(PassafeError::Contract(format!(
            "{} reverted in {:?}",
            what, receipt.transaction_hash
        )));
    }
    Ok(TxHash(receipt.transaction_hash.0))
}

/// [`ChainGateway`] over JSON-RPC. Every transaction is signed and paid for
/// by the relayer key.
pub struct EthersChainGateway {
    client: Arc<RelayerClient>,
    relayer: EthAddress,
    network: NetworkConfig,
    module_bytecode: Bytes,
}

impl EthersChainGateway {
    pub async fn connect(
        network: NetworkConfig,
        relayer_key: &str,
        artifact: ModuleArtifact,
    ) -> PassafeResult<Self> {
        info!("Connecting to RPC: {}", network.rpc_url);

        let provider = Provider::<Http>::try_from(network.rpc_url.as_str())
            .map_err(|e| PassafeError::Network(format!("Failed to create provider: {}", e)))?;

        let chain_id = provider
            .get_chainid()
            .await
            .map_err(|e| PassafeError::Network(format!("Failed to get chain ID: {}", e)))?;

        if chain_id.as_u64() != network.chain_id {
            return Err(PassafeError::Network(format!(
                "Chain ID mismatch: expected {}, got {}",
                network.chain_id,
                chain_id.as_u64()
            )));
        }

        let wallet: LocalWallet = relayer_key
            .parse()
            .map_err(|e| PassafeError::InvalidKey(format!("Invalid relayer key: {}", e)))?;
        let wallet = wallet.with_chain_id(network.chain_id);
        let relayer = EthAddress(wallet.address().0);

        let client = SignerMiddleware::new(provider, wallet);
        info!("Connected to chain {} with relayer {}", network.chain_id, relayer);

        Ok(Self {
            client: Arc::new(client),
            relayer,
            network,
            module_bytecode: artifact.bytecode,
        })
    }

    /// Connects to the configured network with the relayer key from the
    /// environment and the configured module artifact.
    pub async fn from_config(config: &PassafeConfig) -> PassafeResult<Self> {
        let artifact_path = config
            .module_artifact
            .as_ref()
            .ok_or_else(|| PassafeError::Config("module_artifact is not configured".into()))?;
        let artifact = ModuleArtifact::load(artifact_path)?;
        let key = relayer_key()?;
        Self::connect(config.active_network().clone(), key.as_str(), artifact).await
    }

    pub fn network(&self) -> &NetworkConfig {
        &self.network
    }

    async fn has_code(&self, address: &EthAddress) -> PassafeResult<bool> {
        let code = self
            .client
            .get_code(to_address(address), None)
            .await
            .map_err(|e| PassafeError::Network(format!("Failed to get code: {}", e)))?;
        Ok(!code.is_empty())
    }

    fn safe_initializer(&self, owners: &[EthAddress], threshold: u32) -> PassafeResult<Bytes> {
        let singleton = GnosisSafe::new(to_address(&self.network.safe_singleton), self.client.clone());
        singleton
            .setup(
                owners.iter().map(to_address).collect(),
                U256::from(threshold),
                Address::zero(),
                Bytes::new(),
                to_address(&self.network.fallback_handler),
                Address::zero(),
                U256::zero(),
                Address::zero(),
            )
            .calldata()
            .ok_or_else(|| PassafeError::Contract("Failed to encode Safe setup".into()))
    }
}

#[async_trait]
impl ChainGateway for EthersChainGateway {
    fn relayer_address(&self) -> EthAddress {
        self.relayer
    }

    async fn predict_wallet_address(
        &self,
        owners: &[EthAddress],
        threshold: u32,
        salt: &KeyHash,
    ) -> PassafeResult<EthAddress> {
        let initializer = self.safe_initializer(owners, threshold)?;
        let factory = SafeProxyFactory::new(to_address(&self.network.proxy_factory), self.client.clone());

        let creation_code = factory
            .proxy_creation_code()
            .call()
            .await
            .map_err(|e| PassafeError::Contract(format!("Failed to get proxy creation code: {}", e)))?;

        let address = get_create2_address(
            to_address(&self.network.proxy_factory),
            proxy_salt(&initializer, salt),
            proxy_init_code(&creation_code, &self.network.safe_singleton),
        );
        Ok(EthAddress(address.0))
    }

    async fn deploy_wallet(
        &self,
        owners: &[EthAddress],
        threshold: u32,
        salt: &KeyHash,
    ) -> PassafeResult<EthAddress> {
        let predicted = self.predict_wallet_address(owners, threshold, salt).await?;
        let initializer = self.safe_initializer(owners, threshold)?;
        let factory = SafeProxyFactory::new(to_address(&self.network.proxy_factory), self.client.clone());

        let call = factory.create_proxy_with_nonce(
            to_address(&self.network.safe_singleton),
            initializer,
            U256::from_big_endian(salt.as_bytes()),
        );
        let pending = call
            .send()
            .await
            .map_err(|e| PassafeError::Contract(format!("Failed to deploy Safe: {}", e)))?;
        debug!("Safe deployment broadcast: {:?} -> {}", pending.tx_hash(), predicted);

        let receipt = pending
            .await
            .map_err(|e| PassafeError::Contract(format!("Safe deployment failed: {}", e)))?;
        let tx_hash = check_receipt(receipt, "Safe deployment")?;

        info!("Safe deployed at {} in {}", predicted, tx_hash);
        Ok(predicted)
    }

    async fn is_wallet_deployed(&self, wallet: &EthAddress) -> PassafeResult<bool> {
        self.has_code(wallet).await
    }

    async fn predict_module_address(&self, key: &ModuleKey) -> PassafeResult<EthAddress> {
        let address = get_create2_address(
            to_address(&self.network.create2_deployer),
            key.key_hash.as_bytes(),
            module_init_code(&self.module_bytecode, key),
        );
        Ok(EthAddress(address.0))
    }

    async fn is_module_deployed(&self, module: &EthAddress) -> PassafeResult<bool> {
        self.has_code(module).await
    }

    async fn deploy_module(&self, key: &ModuleKey) -> PassafeResult<EthAddress> {
        let predicted = self.predict_module_address(key).await?;

        let mut data = key.key_hash.as_bytes().to_vec();
        data.extend(module_init_code(&self.module_bytecode, key));
        let tx = TransactionRequest::new()
            .to(to_address(&self.network.create2_deployer))
            .data(data);

        let pending = self
            .client
            .send_transaction(tx, None)
            .await
            .map_err(|e| PassafeError::Contract(format!("Failed to deploy module: {}", e)))?;
        let receipt = pending
            .await
            .map_err(|e| PassafeError::Contract(format!("Module deployment failed: {}", e)))?;
        let tx_hash = check_receipt(receipt, "module deployment")?;

        if !self.has_code(&predicted).await? {
            return Err(PassafeError::Contract(format!(
                "No code at predicted module address {} after {}",
                predicted, tx_hash
            )));
        }

        info!("Module deployed at {} in {}", predicted, tx_hash);
        Ok(predicted)
    }

    async fn is_module_enabled(&self, wallet: &EthAddress, module: &EthAddress) -> PassafeResult<bool> {
        let safe = GnosisSafe::new(to_address(wallet), self.client.clone());
        safe.is_module_enabled(to_address(module))
            .call()
            .await
            .map_err(|e| PassafeError::Contract(format!("Failed to query module: {}", e)))
    }

    async fn enable_module(&self, wallet: &EthAddress, module: &EthAddress) -> PassafeResult<TxHash> {
        let safe = GnosisSafe::new(to_address(wallet), self.client.clone());

        let threshold = safe
            .get_threshold()
            .call()
            .await
            .map_err(|e| PassafeError::Contract(format!("Failed to get threshold: {}", e)))?;
        if threshold > U256::one() {
            return Err(PassafeError::Contract(format!(
                "Safe threshold {} needs co-owner signatures to enable a module",
                threshold
            )));
        }

        let data = safe
            .enable_module(to_address(module))
            .calldata()
            .ok_or_else(|| PassafeError::Contract("Failed to encode enableModule".into()))?;

        let call = safe.exec_transaction(
            to_address(wallet),
            U256::zero(),
            data,
            0,
            U256::zero(),
            U256::zero(),
            U256::zero(),
            Address::zero(),
            Address::zero(),
            prevalidated_signature(&self.relayer),
        );
        let pending = call
            .send()
            .await
            .map_err(|e| PassafeError::Contract(format!("Failed to enable module: {}", e)))?;
        let receipt = pending
            .await
            .map_err(|e| PassafeError::Contract(format!("Enable module transaction failed: {}", e)))?;

        let tx_hash = check_receipt(receipt, "enableModule")?;
        info!("Module {} enabled on {}: {}", module, wallet, tx_hash);
        Ok(tx_hash)
    }

    async fn exec_hash(
        &self,
        module: &EthAddress,
        wallet: &EthAddress,
        target: &EthAddress,
        value: &Uint256,
    ) -> PassafeResult<ExecHash> {
        let nonce = self
            .client
            .get_transaction_count(self.client.address(), None)
            .await
            .map_err(|e| PassafeError::Network(format!("Failed to get nonce: {}", e)))?;

        let passkey_module = PasskeyModule::new(to_address(module), self.client.clone());
        let hash = passkey_module
            .generate_exec_hash(to_address(wallet), to_address(target), to_u256(value), nonce)
            .call()
            .await
            .map_err(|e| PassafeError::Contract(format!("Failed to get exec hash: {}", e)))?;

        debug!("Exec hash 0x{} at nonce {}", hex::encode(hash), nonce);
        Ok(ExecHash {
            hash,
            nonce: from_u256(nonce),
        })
    }

    async fn submit_authorized_call(&self, call: &AuthorizedCall) -> PassafeResult<TxHash> {
        let passkey_module = PasskeyModule::new(to_address(&call.module), self.client.clone());
        let execute = passkey_module.execute_with_passkeys(
            to_address(&call.wallet),
            to_address(&call.target),
            to_u256(&call.value),
            to_u256(&call.nonce),
            Bytes::from(call.calldata.clone()),
            Bytes::from(call.signature.clone()),
        );

        let pending = execute
            .send()
            .await
            .map_err(|e| PassafeError::Contract(format!("Failed to submit call: {}", e)))?;
        let receipt = pending
            .await
            .map_err(|e| PassafeError::Contract(format!("Authorized call failed: {}", e)))?;

        check_receipt(receipt, "executeWithPasskeys")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use passafe_types::CredentialId;

    #[test]
    fn test_prevalidated_signature_layout() {
        let owner = EthAddress::from_bytes([0xaa; 20]);
        let signature = prevalidated_signature(&owner);
        assert_eq!(signature.len(), 65);
        assert_eq!(&signature[..12], &[0u8; 12]);
        assert_eq!(&signature[12..32], owner.as_bytes());
        assert_eq!(&signature[32..64], &[0u8; 32]);
        assert_eq!(signature[64], 1);
    }

    #[test]
    fn test_module_address_depends_on_key() {
        let deployer = Address::from_slice(&[0x4e; 20]);
        let key = |id: &str| {
            let key_id = CredentialId::new(id);
            ModuleKey {
                key_hash: key_id.key_hash(),
                key_id,
                public_key_x: Uint256::from_u64(1),
                public_key_y: Uint256::from_u64(2),
            }
        };
        let a = key("a");
        let b = key("b");
        let predict = |k: &ModuleKey| {
            get_create2_address(deployer, k.key_hash.as_bytes(), module_init_code(&[0x60, 0x80], k))
        };

        assert_eq!(predict(&a), predict(&a));
        assert_ne!(predict(&a), predict(&b));
    }

    #[test]
    fn test_module_constructor_encoding() {
        let key_id = CredentialId::new("abc");
        let key = ModuleKey {
            key_hash: key_id.key_hash(),
            key_id,
            public_key_x: Uint256::from_u64(7),
            public_key_y: Uint256::from_u64(9),
        };
        let code = module_init_code(&[0xfe], &key);
        assert_eq!(code[0], 0xfe);
        let args = &code[1..];
        // (string offset, x, y, string length, string data)
        assert_eq!(args.len(), 5 * 32);
        assert_eq!(args[31], 0x60);
        assert_eq!(args[63], 7);
        assert_eq!(args[95], 9);
        assert_eq!(args[127], 3);
        assert_eq!(&args[128..131], b"abc");
    }

    #[test]
    fn test_proxy_salt_binds_initializer_and_nonce() {
        let nonce = KeyHash::of(b"cred");
        assert_ne!(proxy_salt(b"init-a", &nonce), proxy_salt(b"init-b", &nonce));
        assert_ne!(proxy_salt(b"init-a", &nonce), proxy_salt(b"init-a", &KeyHash::of(b"other")));

        let code = proxy_init_code(&[0x60], &EthAddress::from_bytes([0x3e; 20]));
        assert_eq!(code.len(), 1 + 32);
        assert_eq!(&code[13..], &[0x3e; 20]);
    }

    #[test]
    fn test_u256_conversions() {
        let value = Uint256::from_u64(0xdead_beef);
        assert_eq!(to_u256(&value), U256::from(0xdead_beefu64));
        assert_eq!(from_u256(to_u256(&value)), value);
    }
}
