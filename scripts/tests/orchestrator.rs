//! Tests for running actions end to end against an in-memory ledger

mod common;

use alloy::primitives::{Address, Bytes, B256, U256};
use common::{setup_orchestrator, CALLER, MULTISIG, TEST_CHAIN_ID};
use eyre::Result;
use plp_scripts::{
    actions::{
        Action, AddLiquidityOrder, Deployment, ExecuteLiquidityOrder, SetStrategyAllowance,
    },
    address_book::AddressCategory,
    constants::{
        CONFIG_STORAGE_KEY, CREATE_ORDER_GAS_LIMIT, EXECUTE_ORDER_GAS_LIMIT, PLP_TOKEN_KEY,
    },
    errors::{ActionStep, ScriptError},
    price::PriceObservation,
    types::ActionOutcome,
};

/// The LiquidityHandler used by the tests
const HANDLER: Address = Address::repeat_byte(0x11);

/// The token deposited by the tests
const USDC: Address = Address::repeat_byte(0x22);

/// The VaultStorage used by the tests
const VAULT: Address = Address::repeat_byte(0x33);

/// An add liquidity order of 100 USDC
fn add_liquidity_order() -> Action {
    Action::CreateAddLiquidityOrder(AddLiquidityOrder {
        handler: HANDLER,
        token: USDC,
        amount_in: U256::from(100_000_000u64),
        min_out: U256::ZERO,
        execution_fee: U256::from(1_000_000_000_000_000u64),
        should_wrap: false,
    })
}

/// A strategy allowance on the test vault
fn strategy_allowance() -> Action {
    Action::SetStrategyAllowance(SetStrategyAllowance {
        vault_storage: VAULT,
        token: Address::repeat_byte(0x44),
        strategy: Address::repeat_byte(0x55),
        target: Address::repeat_byte(0x44),
    })
}

/// Order execution publishing the given observations
fn execute_order(observations: Vec<PriceObservation>) -> Action {
    Action::ExecuteLiquidityOrder(ExecuteLiquidityOrder {
        handler: HANDLER,
        end_index: U256::MAX,
        fee_receiver: CALLER,
        observations,
        encoded_vaas: B256::ZERO,
    })
}

// ------------------
// | PRECONDITIONS |
// ------------------

#[tokio::test]
async fn test_allowance_approved_once() -> Result<()> {
    let (orchestrator, _config_dir) = setup_orchestrator(false);
    let action = add_liquidity_order();

    let first = orchestrator.run(&action).await?;
    let second = orchestrator.run(&action).await?;
    assert!(first.is_final() && second.is_final());

    // One approval, then one order per run
    let submitted = orchestrator.ledger().submitted();
    assert_eq!(submitted.len(), 3);
    assert_eq!(submitted[0].target(), Some(USDC));
    assert!(submitted[1..].iter().all(|req| req.target() == Some(HANDLER)));
    assert_eq!(submitted[1].gas_limit(), CREATE_ORDER_GAS_LIMIT);
    assert_eq!(submitted[1].value(), U256::from(1_000_000_000_000_000u64));
    Ok(())
}

#[tokio::test]
async fn test_sufficient_allowance_skips_approval() -> Result<()> {
    let (orchestrator, _config_dir) = setup_orchestrator(false);
    orchestrator
        .ledger()
        .set_allowance(USDC, CALLER, HANDLER, U256::from(100_000_000u64));

    orchestrator.run(&add_liquidity_order()).await?;

    let submitted = orchestrator.ledger().submitted();
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].target(), Some(HANDLER));
    Ok(())
}

// -----------------
// | PRICE PAYLOAD |
// -----------------

#[tokio::test]
async fn test_execute_order_with_prices() -> Result<()> {
    let (orchestrator, _config_dir) = setup_orchestrator(false);
    let observations = vec![
        PriceObservation::new(0, 1900.02, 0),
        PriceObservation::new(1, 20000.29, 0),
        PriceObservation::new(2, 1.0, 0),
    ];

    let outcome = orchestrator.run(&execute_order(observations)).await?;
    assert!(outcome.is_final());

    let submitted = orchestrator.ledger().submitted();
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].target(), Some(HANDLER));
    assert_eq!(submitted[0].gas_limit(), EXECUTE_ORDER_GAS_LIMIT);
    Ok(())
}

#[tokio::test]
async fn test_empty_observations_fail_payload_assembly() -> Result<()> {
    let (orchestrator, _config_dir) = setup_orchestrator(false);

    let err = orchestrator.run(&execute_order(vec![])).await.unwrap_err();

    assert_eq!(err.step(), Some(ActionStep::PayloadAssembly));
    assert!(matches!(err.root_cause(), ScriptError::EmptyObservationSet));
    assert!(orchestrator.ledger().submitted().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_invalid_price_fails_payload_assembly() -> Result<()> {
    let (orchestrator, _config_dir) = setup_orchestrator(false);
    let observations = vec![PriceObservation::new(0, -1.0, 0)];

    let err = orchestrator.run(&execute_order(observations)).await.unwrap_err();

    assert_eq!(err.step(), Some(ActionStep::PayloadAssembly));
    assert!(matches!(err.root_cause(), ScriptError::InvalidPrice(_)));
    Ok(())
}

// -------------
// | AUTHORITY |
// -------------

#[tokio::test]
async fn test_caller_owned_privileged_action_executes() -> Result<()> {
    let (orchestrator, _config_dir) = setup_orchestrator(true);
    orchestrator.ledger().set_owner(VAULT, CALLER);

    let outcome = orchestrator.run(&strategy_allowance()).await?;

    assert!(matches!(outcome, ActionOutcome::Executed { deployed: None, .. }));
    assert_eq!(orchestrator.ledger().submitted().len(), 1);
    assert!(orchestrator.multisig().unwrap().proposals().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_multisig_owned_privileged_action_is_proposed() -> Result<()> {
    let (orchestrator, _config_dir) = setup_orchestrator(true);
    orchestrator.ledger().set_owner(VAULT, MULTISIG);

    let outcome = orchestrator.run(&strategy_allowance()).await?;

    assert!(!outcome.is_final());
    assert!(orchestrator.ledger().submitted().is_empty());

    let proposals = orchestrator.multisig().unwrap().proposals();
    assert_eq!(proposals.len(), 1);
    let (target, value, data) = &proposals[0];
    assert_eq!(*target, VAULT);
    assert_eq!(*value, U256::ZERO);

    let expected = strategy_allowance().encode(None)?;
    assert_eq!(data, expected.data());
    Ok(())
}

#[tokio::test]
async fn test_foreign_owned_privileged_action_fails() -> Result<()> {
    let (orchestrator, _config_dir) = setup_orchestrator(true);
    orchestrator
        .ledger()
        .set_owner(VAULT, Address::repeat_byte(0x99));

    let err = orchestrator.run(&strategy_allowance()).await.unwrap_err();

    assert_eq!(err.step(), Some(ActionStep::AuthorityResolution));
    assert!(matches!(err.root_cause(), ScriptError::UnauthorizedTarget { .. }));
    assert!(orchestrator.ledger().submitted().is_empty());
    assert!(orchestrator.multisig().unwrap().proposals().is_empty());
    Ok(())
}

// ---------------
// | DEPLOYMENTS |
// ---------------

#[tokio::test]
async fn test_deployment_is_recorded() -> Result<()> {
    let (orchestrator, _config_dir) = setup_orchestrator(false);
    let deploy = Action::Deploy(Deployment::contract(
        AddressCategory::Tokens,
        PLP_TOKEN_KEY,
        Bytes::from_static(&[0x60, 0x80]),
    ));

    let outcome = orchestrator.run(&deploy).await?;
    let deployed = match outcome {
        ActionOutcome::Executed {
            deployed: Some(address),
            ..
        } => address,
        other => panic!("expected a deployment, got {other}"),
    };

    let book = orchestrator.store().load(TEST_CHAIN_ID)?;
    assert_eq!(book.token(PLP_TOKEN_KEY)?, deployed);

    // Redeploying points the name at the new contract
    orchestrator.run(&deploy).await?;
    let book = orchestrator.store().load(TEST_CHAIN_ID)?;
    assert_ne!(book.token(PLP_TOKEN_KEY)?, deployed);
    assert_eq!(book.tokens.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_proxy_deployment_records_proxy() -> Result<()> {
    let (orchestrator, _config_dir) = setup_orchestrator(false);
    let deploy = Action::Deploy(Deployment::initialized_proxy(
        AddressCategory::Storages,
        CONFIG_STORAGE_KEY,
        Bytes::from_static(&[0xaa]),
        Bytes::from_static(&[0xbb]),
    ));

    orchestrator.run(&deploy).await?;

    // The implementation is created first, then the proxy in front of it
    let submitted = orchestrator.ledger().submitted();
    assert_eq!(submitted.len(), 2);
    assert!(submitted.iter().all(|req| req.target().is_none()));
    assert_eq!(submitted[1].data()[0], 0xbb);

    let book = orchestrator.store().load(TEST_CHAIN_ID)?;
    assert_eq!(book.storage(CONFIG_STORAGE_KEY)?, Address::with_last_byte(2));
    Ok(())
}

#[tokio::test]
async fn test_reverted_deployment_is_not_recorded() -> Result<()> {
    let (orchestrator, _config_dir) = setup_orchestrator(false);
    orchestrator.ledger().revert_submissions();
    let deploy = Action::Deploy(Deployment::contract(
        AddressCategory::Tokens,
        PLP_TOKEN_KEY,
        Bytes::from_static(&[0x60, 0x80]),
    ));

    let err = orchestrator.run(&deploy).await.unwrap_err();

    assert_eq!(err.step(), Some(ActionStep::Dispatch));
    assert!(matches!(err.root_cause(), ScriptError::RevertedExecution(_)));
    assert!(matches!(
        orchestrator.store().load(TEST_CHAIN_ID),
        Err(ScriptError::ConfigNotFound(TEST_CHAIN_ID))
    ));
    Ok(())
}
