use ethers::contract::abigen;

abigen!(
    GnosisSafe,
    r#"[
        function setup(address[] _owners, uint256 _threshold, address to, bytes data, address fallbackHandler, address paymentToken, uint256 payment, address paymentReceiver) external
        function enableModule(address module) external
        function isModuleEnabled(address module) external view returns (bool)
        function execTransaction(address to, uint256 value, bytes data, uint8 operation, uint256 safeTxGas, uint256 baseGas, uint256 gasPrice, address gasToken, address refundReceiver, bytes signatures) external payable returns (bool)
        function getOwners() external view returns (address[])
        function getThreshold() external view returns (uint256)
        event EnabledModule(address module)
    ]"#
);

abigen!(
    SafeProxyFactory,
    r#"[
        function createProxyWithNonce(address _singleton, bytes initializer, uint256 saltNonce) external returns (address)
        function proxyCreationCode() external pure returns (bytes)
        event ProxyCreation(address proxy, address singleton)
    ]"#
);

abigen!(
    PasskeyModule,
    r#"[
        function generateExecHash(address safe, address to, uint256 value, uint256 nonce) external view returns (bytes32)
        function executeWithPasskeys(address safe, address to, uint256 value, uint256 nonce, bytes data, bytes signature) external returns (bool)
    ]"#
);
