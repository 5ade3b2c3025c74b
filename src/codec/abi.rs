//! Solidity ABI declarations for the execution router, its adapters and ERC-20

use alloy::sol;

sol! {
    /// One adapter call inside a plan
    #[derive(Debug, PartialEq, Eq)]
    struct Action {
        uint8 actionType;
        address adapter;
        bytes data;
    }

    /// Unit of execution signed by the user or relayed through a session
    #[derive(Debug, PartialEq, Eq)]
    struct Plan {
        address user;
        uint256 nonce;
        uint256 deadline;
        Action[] actions;
    }

    #[derive(Debug, PartialEq, Eq)]
    struct SwapParams {
        address tokenIn;
        address tokenOut;
        uint24 fee;
        uint256 amountIn;
        uint256 amountOutMin;
        address recipient;
    }

    #[derive(Debug, PartialEq, Eq)]
    struct WrapParams {
        uint256 amount;
        address recipient;
    }

    #[derive(Debug, PartialEq, Eq)]
    struct PullParams {
        address token;
        uint256 amount;
    }

    #[derive(Debug, PartialEq, Eq)]
    struct SupplyParams {
        address asset;
        uint256 amount;
        address onBehalfOf;
    }

    #[derive(Debug, PartialEq, Eq)]
    struct PerpParams {
        bytes32 market;
        bool isLong;
        uint256 margin;
        uint16 leverage;
    }

    #[derive(Debug, PartialEq, Eq)]
    struct EventParams {
        bytes32 marketId;
        bool outcome;
        uint256 stake;
    }

    #[derive(Debug, PartialEq, Eq)]
    interface ExecutionRouter {
        function executeBySender(Plan calldata plan) external payable;
        function executeWithSession(bytes32 sessionId, Plan calldata plan) external payable;

        function createSession(
            bytes32 sessionId,
            address executor,
            uint64 expiresAt,
            uint256 maxSpend,
            address[] calldata allowedAdapters
        ) external;
        function revokeSession(bytes32 sessionId) external;

        function sessions(bytes32 sessionId) external view returns (
            address owner,
            address executor,
            uint64 expiresAt,
            uint256 maxSpend,
            uint256 spent,
            bool active
        );
        function nonces(address user) external view returns (uint256);
        function isAdapterAllowed(address adapter) external view returns (bool);

        error SessionExpired(bytes32 sessionId);
        error SessionNotActive(bytes32 sessionId);
        error SpendLimitExceeded(uint256 requested, uint256 remaining);
        error InsufficientBalance(address token, uint256 required, uint256 available);
        error SlippageExceeded(uint256 amountOut, uint256 amountOutMin);
        error AdapterNotAllowed(address adapter);
        error DeadlineExpired(uint256 deadline);
        error InvalidNonce(uint256 expected, uint256 provided);
        error UnauthorizedExecutor(address executor);
    }

    #[derive(Debug, PartialEq, Eq)]
    interface IERC20 {
        function approve(address spender, uint256 amount) external returns (bool);
        function allowance(address owner, address spender) external view returns (uint256);
        function balanceOf(address account) external view returns (uint256);

        error ERC20InsufficientBalance(address sender, uint256 balance, uint256 needed);
        error ERC20InsufficientAllowance(address spender, uint256 allowance, uint256 needed);
    }
}
