use ethers::abi::{self, ParamType, Token};
use ethers::types::{Address, U256};
use passafe_types::{EthAddress, TokenAmount, Uint256};

/// A call the wallet should make, before authorization.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContractCall {
    pub target: EthAddress,
    pub value: Uint256,
    pub calldata: Vec<u8>,
}

impl ContractCall {
    pub fn new(target: EthAddress, value: Uint256, calldata: Vec<u8>) -> Self {
        Self { target, value, calldata }
    }

    pub fn native_transfer(recipient: EthAddress, amount: &TokenAmount) -> Self {
        Self::new(recipient, amount.to_uint(), Vec::new())
    }
}

pub struct Erc20Call;

impl Erc20Call {
    /// `transfer(address,uint256)` on `token`, moving no native value.
    pub fn transfer(token: EthAddress, recipient: EthAddress, amount: &TokenAmount) -> ContractCall {
        let selector = abi::short_signature("transfer", &[ParamType::Address, ParamType::Uint(256)]);
        let args = abi::encode(&[
            Token::Address(Address::from_slice(recipient.as_bytes())),
            Token::Uint(U256::from(amount.raw)),
        ]);

        let mut calldata = selector.to_vec();
        calldata.extend(args);
        ContractCall::new(token, Uint256::zero(), calldata)
    }
}
