//! Definitions of CLI arguments and commands for the PLP scripts

use std::path::PathBuf;

use alloy::primitives::U256;
use clap::{Args, Parser, Subcommand};

use crate::{
    commands::{
        add_liquidity, deploy_config_storage, deploy_plp_token, execute_liquidity_order,
        get_configs, set_strategy_allowance,
    },
    constants::{
        ARB_TOKEN_KEY, DEFAULT_CONFIG_DIR, DEFAULT_HERMES_URL, DEFAULT_MAX_PRICE_AGE,
        DEFAULT_TIMEOUT_SECS, ERC20_APPROVE_STRATEGY_KEY, USDC_TOKEN_KEY,
    },
    errors::ScriptError,
    oracle::PriceSymbol,
    utils::{parse_symbol_pair, ScriptContext},
};

/// Deploy and operate the PLP liquidity contracts
#[derive(Parser)]
pub struct Cli {
    /// The chain to operate on, selecting its address book
    #[arg(long)]
    pub chain_id: u64,

    /// Private key of the deployer
    #[arg(short, long, env = "PKEY", hide_env_values = true)]
    pub priv_key: String,

    /// Network RPC URL
    #[arg(short, long, env = "RPC_URL")]
    pub rpc_url: String,

    /// Directory holding one address book per chain
    #[arg(long, default_value = DEFAULT_CONFIG_DIR)]
    pub config_dir: PathBuf,

    /// Bound on each RPC and HTTP round trip, in seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout_secs: u64,

    /// Safe Transaction Service URL, overriding the chain's default
    #[arg(long, env = "SAFE_TX_SERVICE_URL")]
    pub safe_service_url: Option<String>,

    /// The command to run
    #[command(subcommand)]
    pub command: Command,
}

/// The commands the scripts support
#[derive(Subcommand)]
pub enum Command {
    /// Deploy the PLP token
    DeployPlpToken(DeployPlpTokenArgs),
    /// Deploy the ConfigStorage behind an upgradeable proxy
    DeployConfigStorage(DeployConfigStorageArgs),
    /// Create an add liquidity order
    AddLiquidity(AddLiquidityArgs),
    /// Execute pending liquidity orders
    ExecuteLiquidityOrder(ExecuteLiquidityOrderArgs),
    /// Set a vault strategy allowance
    SetStrategyAllowance(SetStrategyAllowanceArgs),
    /// Print the liquidity config
    GetConfigs,
}

impl Command {
    /// Run the command against the loaded context
    pub async fn run(self, context: &ScriptContext) -> Result<(), ScriptError> {
        match self {
            Command::DeployPlpToken(args) => deploy_plp_token(args, context).await,
            Command::DeployConfigStorage(args) => deploy_config_storage(args, context).await,
            Command::AddLiquidity(args) => add_liquidity(args, context).await,
            Command::ExecuteLiquidityOrder(args) => execute_liquidity_order(args, context).await,
            Command::SetStrategyAllowance(args) => set_strategy_allowance(args, context).await,
            Command::GetConfigs => get_configs(context).await,
        }
    }
}

/// Deploy the PLP token and record it under `tokens.plp`
#[derive(Args)]
pub struct DeployPlpTokenArgs {
    /// Path to the compiled PLPv2 artifact
    #[arg(short, long)]
    pub artifact: PathBuf,
}

/// Deploy the ConfigStorage behind a `TransparentUpgradeableProxy`
///
/// The proxy is initialized with `initialize()` and owned by the deployer.
/// The proxy address is recorded under `storages.config`.
#[derive(Args)]
pub struct DeployConfigStorageArgs {
    /// Path to the compiled ConfigStorage artifact
    #[arg(short, long)]
    pub artifact: PathBuf,

    /// Path to the compiled TransparentUpgradeableProxy artifact
    #[arg(long)]
    pub proxy_artifact: PathBuf,
}

/// Create an order depositing tokens into the PLP pool
#[derive(Args)]
pub struct AddLiquidityArgs {
    /// The token to deposit, by its address book name
    #[arg(short, long, default_value = USDC_TOKEN_KEY)]
    pub token: String,

    /// The amount to deposit, in whole tokens
    #[arg(short, long)]
    pub amount: String,

    /// The minimum PLP to receive, in whole tokens
    #[arg(long, default_value = "0")]
    pub min_out: String,

    /// Wrap native ETH sent with the order
    #[arg(long)]
    pub wrap: bool,
}

/// Execute pending liquidity orders, publishing fresh prices
#[derive(Args)]
pub struct ExecuteLiquidityOrderArgs {
    /// The index up to which orders are executed, all pending orders if unset
    #[arg(long)]
    pub end_index: Option<U256>,

    /// A fixed price for an asset, as `SYMBOL=PRICE`
    ///
    /// Prices are read from Pyth Hermes unless at least one is given, in
    /// which case unlisted assets take their default price.
    #[arg(long = "price", value_parser = parse_symbol_pair::<f64>)]
    pub prices: Vec<(PriceSymbol, f64)>,

    /// A publish time diff for an asset, as `SYMBOL=SECONDS`
    ///
    /// Overrides the diff of the observed price, whichever source served it.
    #[arg(long = "publish-time-diff", value_parser = parse_symbol_pair::<u32>)]
    pub publish_time_diffs: Vec<(PriceSymbol, u32)>,

    /// The Pyth Hermes endpoint
    #[arg(long, default_value = DEFAULT_HERMES_URL)]
    pub hermes_url: String,

    /// The maximum age of a Hermes quote, in seconds
    #[arg(long, default_value_t = DEFAULT_MAX_PRICE_AGE.as_secs())]
    pub max_price_age_secs: u64,
}

/// Allow a vault strategy to call a target on behalf of a token
#[derive(Args)]
pub struct SetStrategyAllowanceArgs {
    /// The token, by its address book name
    #[arg(long, default_value = ARB_TOKEN_KEY)]
    pub token: String,

    /// The strategy, by its address book name
    #[arg(long, default_value = ERC20_APPROVE_STRATEGY_KEY)]
    pub strategy: String,

    /// The target the strategy may call, by its token name in the address book
    #[arg(long, default_value = ARB_TOKEN_KEY)]
    pub target: String,
}
