use ethers::contract::abigen;

abigen!(
    AppHubAPI,
    r#"[
        function userClaimed(address user, address token) external view returns (bool)
        function faucetTokens(address token) external view returns (bool enabled, uint256 amount)
        function faucet(address token) external
        function transferToken(address token, address to, uint256 amount) external
        event FaucetClaimed(address indexed user, address indexed token, uint256 amount)
        event TransferExecuted(address indexed token, address indexed from, address indexed to, uint256 amount)
    ]"#
);

abigen!(
    TokenAPI,
    r#"[
        function balanceOf(address account) external view returns (uint256)
        function approve(address spender, uint256 amount) external returns (bool)
        function transfer(address to, uint256 amount) external returns (bool)
        event Transfer(address indexed from, address indexed to, uint256 value)
        event Approval(address indexed owner, address indexed spender, uint256 value)
    ]"#
);

abigen!(
    AccountAPI,
    r#"[
        function executeBatch(address[] calldata dest, uint256[] calldata value, bytes[] calldata func) external
    ]"#
);

abigen!(
    AccountFactoryAPI,
    r#"[
        function createAccount(address owner, bytes32 salt) external returns (address)
        function getAddress(address owner, bytes32 salt) external view returns (address)
    ]"#
);

abigen!(
    EntryPointAPI,
    r#"[
        function getNonce(address sender, uint192 key) external view returns (uint256 nonce)
        function balanceOf(address account) external view returns (uint256)
    ]"#
);
