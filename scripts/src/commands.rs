//! Implementations of the PLP scripts

use std::time::Duration;

use alloy::primitives::{
    utils::{parse_units, ParseUnits},
    Address, B256, U256,
};
use itertools::Itertools;
use tracing::info;

use crate::{
    actions::{
        Action, AddLiquidityOrder, Deployment, ExecuteLiquidityOrder, SetStrategyAllowance,
    },
    address_book::AddressCategory,
    cli::{
        AddLiquidityArgs, DeployConfigStorageArgs, DeployPlpTokenArgs, ExecuteLiquidityOrderArgs,
        SetStrategyAllowanceArgs,
    },
    constants::{CONFIG_STORAGE_KEY, LIQUIDITY_HANDLER_KEY, PLP_TOKEN_KEY, VAULT_STORAGE_KEY},
    errors::{ActionStep, ScriptError},
    ledger::Ledger,
    oracle::{FixedPriceOracle, HermesPriceOracle, PriceOracle, PriceSymbol},
    price::PriceObservation,
    solidity::{IConfigStorage, ILiquidityHandler, IERC20},
    types::ActionOutcome,
    utils::{read_artifact_bytecode, ScriptContext},
};

/// The decimals of PLP, against which the minimum output is scaled
const PLP_DECIMALS: u8 = 18;

/// Deploy the PLP token
pub async fn deploy_plp_token(
    args: DeployPlpTokenArgs,
    context: &ScriptContext,
) -> Result<(), ScriptError> {
    let init_code = read_artifact_bytecode(&args.artifact)?;
    let deployment = Deployment::contract(AddressCategory::Tokens, PLP_TOKEN_KEY, init_code);

    let outcome = context.orchestrator.run(&Action::Deploy(deployment)).await?;
    report(&outcome);
    Ok(())
}

/// Deploy the ConfigStorage behind an initialized proxy
pub async fn deploy_config_storage(
    args: DeployConfigStorageArgs,
    context: &ScriptContext,
) -> Result<(), ScriptError> {
    let implementation_code = read_artifact_bytecode(&args.artifact)?;
    let proxy_code = read_artifact_bytecode(&args.proxy_artifact)?;
    let deployment = Deployment::initialized_proxy(
        AddressCategory::Storages,
        CONFIG_STORAGE_KEY,
        implementation_code,
        proxy_code,
    );

    let outcome = context.orchestrator.run(&Action::Deploy(deployment)).await?;
    report(&outcome);
    Ok(())
}

/// Create an order adding liquidity to the PLP pool
pub async fn add_liquidity(
    args: AddLiquidityArgs,
    context: &ScriptContext,
) -> Result<(), ScriptError> {
    let handler_address = context.address_book.handler(LIQUIDITY_HANDLER_KEY)?;
    let token = context.address_book.token(&args.token)?;

    let ledger = context.orchestrator.ledger();
    let erc20 = IERC20::new(token, ledger.provider());
    let decimals = ledger
        .bounded("decimals query", erc20.decimals().call())
        .await?
        .map_err(|e| ScriptError::ContractInteraction(e.to_string()))?;

    let handler = ILiquidityHandler::new(handler_address, ledger.provider());
    let execution_fee = ledger
        .bounded("execution fee query", handler.minExecutionOrderFee().call())
        .await?
        .map_err(|e| ScriptError::ContractInteraction(e.to_string()))?;

    let amount_in = parse_amount(&args.amount, decimals)?;
    let min_out = parse_amount(&args.min_out, PLP_DECIMALS)?;
    info!(
        "depositing {} {} ({} base units), execution fee {}",
        args.amount, args.token, amount_in, execution_fee
    );

    let order = AddLiquidityOrder {
        handler: handler_address,
        token,
        amount_in,
        min_out,
        execution_fee,
        should_wrap: args.wrap,
    };
    let outcome = context
        .orchestrator
        .run(&Action::CreateAddLiquidityOrder(order))
        .await?;
    report(&outcome);
    Ok(())
}

/// Execute pending liquidity orders against fresh prices
pub async fn execute_liquidity_order(
    args: ExecuteLiquidityOrderArgs,
    context: &ScriptContext,
) -> Result<(), ScriptError> {
    let handler = context.address_book.handler(LIQUIDITY_HANDLER_KEY)?;
    let symbols = PriceSymbol::ALL;

    let mut observations = if args.prices.is_empty() {
        info!("reading prices of {} from {}", symbols.iter().join(", "), args.hermes_url);
        let max_age = Duration::from_secs(args.max_price_age_secs);
        HermesPriceOracle::new(&args.hermes_url, context.timeout, max_age)?
            .observe(&symbols)
            .await
    } else {
        let oracle = args
            .prices
            .iter()
            .fold(FixedPriceOracle::new(), |oracle, (sym, price)| {
                oracle.with_price(*sym, *price)
            });
        oracle.observe(&symbols).await
    }
    .map_err(|e| e.at(ActionStep::PayloadAssembly))?;
    override_publish_time_diffs(&mut observations, &args.publish_time_diffs);

    let order = ExecuteLiquidityOrder {
        handler,
        end_index: args.end_index.unwrap_or(U256::MAX),
        fee_receiver: context.orchestrator.ledger().caller(),
        observations,
        encoded_vaas: B256::ZERO,
    };
    let outcome = context
        .orchestrator
        .run(&Action::ExecuteLiquidityOrder(order))
        .await?;
    report(&outcome);
    Ok(())
}

/// Allow a vault strategy to call a target
pub async fn set_strategy_allowance(
    args: SetStrategyAllowanceArgs,
    context: &ScriptContext,
) -> Result<(), ScriptError> {
    let book = &context.address_book;
    let allowance = SetStrategyAllowance {
        vault_storage: book.storage(VAULT_STORAGE_KEY)?,
        token: book.token(&args.token)?,
        strategy: book.strategy(&args.strategy)?,
        target: book.token(&args.target)?,
    };

    let outcome = context
        .orchestrator
        .run(&Action::SetStrategyAllowance(allowance))
        .await?;
    report(&outcome);
    Ok(())
}

/// Print the liquidity config held by the ConfigStorage
pub async fn get_configs(context: &ScriptContext) -> Result<(), ScriptError> {
    let config_address: Address = context.address_book.storage(CONFIG_STORAGE_KEY)?;
    let ledger = context.orchestrator.ledger();
    let config_storage = IConfigStorage::new(config_address, ledger.provider());

    let liquidity_config = ledger
        .bounded("liquidity config query", config_storage.getLiquidityConfig().call())
        .await?
        .map_err(|e| ScriptError::ContractInteraction(e.to_string()))?;

    println!("Liquidity config of {:#x}:", config_address);
    println!("{:#?}", liquidity_config);
    Ok(())
}

/// Scale a decimal amount to the token's base units
fn parse_amount(amount: &str, decimals: u8) -> Result<U256, ScriptError> {
    let units = parse_units(amount, decimals).map_err(|e| {
        ScriptError::CalldataConstruction(format!("invalid amount `{amount}`: {e}"))
    })?;

    match units {
        ParseUnits::U256(value) => Ok(value),
        ParseUnits::I256(_) => Err(ScriptError::CalldataConstruction(format!(
            "amount `{amount}` is negative"
        ))),
    }
}

/// Replace the publish time diffs of the given assets, whichever oracle observed them
fn override_publish_time_diffs(
    observations: &mut [PriceObservation],
    diffs: &[(PriceSymbol, u32)],
) {
    for (symbol, diff) in diffs {
        observations
            .iter_mut()
            .filter(|obs| obs.symbol_index == symbol.index())
            .for_each(|obs| obs.publish_time_diff = *diff);
    }
}

/// Print the outcome of an action
fn report(outcome: &ActionOutcome) {
    match outcome {
        ActionOutcome::Executed { receipt, deployed } => {
            println!("Executed in tx {:#x}", receipt.tx_hash);
            if let Some(address) = deployed {
                println!("Deployed at {:#x}", address);
            }
        }
        ActionOutcome::Proposed { proposal_id } => {
            println!(
                "Proposed to the multisig as {:#x}, awaiting signatures",
                proposal_id
            );
        }
    }
}
