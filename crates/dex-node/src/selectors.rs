//! DEX predeploy contract bindings and selectors.

use alloy_sol_macro::sol;

sol! {
    /// ABI of the DEX predeploy.
    ///
    /// Governance actions travel as `(actionKind, actionValue)`:
    /// 0 = fee bps, 1 = proposal threshold, 2 = quorum, 3 = voting period.
    /// A vote `weight` of zero casts the voter's full snapshot balance.
    #[derive(Debug, PartialEq, Eq)]
    interface IDex {
        event PairCreated(address indexed token0, address indexed token1, bytes32 pool, uint256 pairCount);
        event Mint(bytes32 indexed pool, address indexed provider, uint256 amount0, uint256 amount1, uint256 shares);
        event Burn(bytes32 indexed pool, address indexed provider, uint256 amount0, uint256 amount1, uint256 shares);
        event Swap(bytes32 indexed pool, address indexed sender, address tokenIn, address tokenOut, uint256 amountIn, uint256 amountOut);
        event ProposalCreated(uint256 indexed id, address indexed proposer, uint8 actionKind, uint256 actionValue, uint64 deadline, string description);
        event VoteCast(uint256 indexed id, address indexed voter, bool support, uint256 weight);
        event ProposalExecuted(uint256 indexed id);
        event ConfigUpdated(uint8 actionKind, uint256 actionValue);
        event Transfer(address indexed from, address indexed to, uint256 amount);

        function createPair(address tokenA, address tokenB) external returns (bytes32 pool);
        function getPair(address tokenA, address tokenB) external view returns (bytes32 pool);
        function addLiquidity(bytes32 pool, uint256 amount0, uint256 amount1) external returns (uint256 shares);
        function removeLiquidity(bytes32 pool, uint256 shares) external returns (uint256 amount0, uint256 amount1);
        function swap(bytes32 pool, uint256 amountIn, bool tokenInIsFirst, uint256 minAmountOut) external returns (uint256 amountOut);
        function getAmountsOut(uint256 amountIn, address[] path) external view returns (uint256[] amounts);
        function getAmountsIn(uint256 amountOut, address[] path) external view returns (uint256[] amounts);
        function swapExactTokensForTokens(uint256 amountIn, uint256 amountOutMin, address[] path, uint64 deadline) external returns (uint256[] amounts);
        function swapTokensForExactTokens(uint256 amountOut, uint256 amountInMax, address[] path, uint64 deadline) external returns (uint256[] amounts);
        function propose(string description, uint8 actionKind, uint256 actionValue) external returns (uint256 id);
        function vote(uint256 id, bool support, uint256 weight) external;
        function execute(uint256 id) external;
        function transfer(address to, uint256 amount) external returns (bool);
    }
}

pub mod selectors {
    use super::IDex;
    use alloy_sol_types::SolCall;

    pub const CREATE_PAIR: [u8; 4] = IDex::createPairCall::SELECTOR;
    pub const GET_PAIR: [u8; 4] = IDex::getPairCall::SELECTOR;
    pub const ADD_LIQUIDITY: [u8; 4] = IDex::addLiquidityCall::SELECTOR;
    pub const REMOVE_LIQUIDITY: [u8; 4] = IDex::removeLiquidityCall::SELECTOR;
    pub const SWAP: [u8; 4] = IDex::swapCall::SELECTOR;
    pub const GET_AMOUNTS_OUT: [u8; 4] = IDex::getAmountsOutCall::SELECTOR;
    pub const GET_AMOUNTS_IN: [u8; 4] = IDex::getAmountsInCall::SELECTOR;
    pub const SWAP_EXACT_TOKENS_FOR_TOKENS: [u8; 4] =
        IDex::swapExactTokensForTokensCall::SELECTOR;
    pub const SWAP_TOKENS_FOR_EXACT_TOKENS: [u8; 4] =
        IDex::swapTokensForExactTokensCall::SELECTOR;
    pub const PROPOSE: [u8; 4] = IDex::proposeCall::SELECTOR;
    pub const VOTE: [u8; 4] = IDex::voteCall::SELECTOR;
    pub const EXECUTE: [u8; 4] = IDex::executeCall::SELECTOR;
    pub const TRANSFER: [u8; 4] = IDex::transferCall::SELECTOR;
}
