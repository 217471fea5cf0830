//! Constants used in the deploy and operations scripts

use std::time::Duration;

// ---------------------
// | Address book keys |
// ---------------------

/// The address book key of the USDC token
pub const USDC_TOKEN_KEY: &str = "usdc";

/// The address book key of the ARB token
pub const ARB_TOKEN_KEY: &str = "arb";

/// The address book key of the PLP token
pub const PLP_TOKEN_KEY: &str = "plp";

/// The address book key of the ConfigStorage proxy
pub const CONFIG_STORAGE_KEY: &str = "config";

/// The address book key of the VaultStorage proxy
pub const VAULT_STORAGE_KEY: &str = "vault";

/// The address book key of the LiquidityHandler proxy
pub const LIQUIDITY_HANDLER_KEY: &str = "liquidity";

/// The address book key of the ERC20 approve strategy
pub const ERC20_APPROVE_STRATEGY_KEY: &str = "erc20Approve";

/// The extension of address book files
pub const ADDRESS_BOOK_EXTENSION: &str = "json";

/// The default directory holding the address books
pub const DEFAULT_CONFIG_DIR: &str = "configs";

// -------------
// | Gas & fees |
// -------------

/// The gas limit ceiling attached to liquidity order creation
pub const CREATE_ORDER_GAS_LIMIT: u64 = 30_000_000;

/// The gas limit ceiling attached to order execution, which
/// verifies and stores a full price update
pub const EXECUTE_ORDER_GAS_LIMIT: u64 = 200_000_000;

/// The gas limit ceiling attached to owner configuration calls
pub const CONFIG_CALL_GAS_LIMIT: u64 = 5_000_000;

/// The gas limit ceiling attached to token approvals
pub const APPROVE_GAS_LIMIT: u64 = 1_000_000;

/// The gas limit ceiling attached to contract deployments
pub const DEPLOY_GAS_LIMIT: u64 = 30_000_000;

// ----------
// | Prices |
// ----------

/// The base of the logarithmic tick scale used to encode prices
pub const TICK_BASE: f64 = 1.0001;

/// The number of bytes in a single encoded price update or publish time diff
pub const NUM_BYTES_PRICE_ENTRY: usize = 3;

/// The number of encoded entries packed into a single `bytes32` word
pub const ENTRIES_PER_WORD: usize = 10;

/// The smallest tick representable as an `int24`
pub const MIN_TICK: i32 = -(1 << 23);

/// The largest tick representable as an `int24`
pub const MAX_TICK: i32 = (1 << 23) - 1;

/// The largest publish time diff representable as a `uint24`
pub const MAX_PUBLISH_TIME_DIFF: u32 = (1 << 24) - 1;

/// The default Pyth Hermes endpoint
pub const DEFAULT_HERMES_URL: &str = "https://hermes.pyth.network";

/// The default maximum age of a Hermes quote
pub const DEFAULT_MAX_PRICE_AGE: Duration = Duration::from_secs(60);

// ------------
// | Timeouts |
// ------------

/// The default bound on every upstream call, in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

// ------------
// | Multisig |
// ------------

/// The Safe Transaction Service for Arbitrum One
pub const SAFE_SERVICE_ARBITRUM: &str = "https://safe-transaction-arbitrum.safe.global";

/// The Safe Transaction Service for Arbitrum Sepolia
pub const SAFE_SERVICE_ARBITRUM_SEPOLIA: &str =
    "https://safe-transaction-arbitrum-sepolia.safe.global";

/// The chain ID of Arbitrum One
pub const ARBITRUM_CHAIN_ID: u64 = 42161;

/// The chain ID of Arbitrum Sepolia
pub const ARBITRUM_SEPOLIA_CHAIN_ID: u64 = 421614;

/// Pick the Safe Transaction Service for a chain
pub fn default_safe_service_url(chain_id: u64) -> Option<&'static str> {
    match chain_id {
        ARBITRUM_CHAIN_ID => Some(SAFE_SERVICE_ARBITRUM),
        ARBITRUM_SEPOLIA_CHAIN_ID => Some(SAFE_SERVICE_ARBITRUM_SEPOLIA),
        _ => None,
    }
}
