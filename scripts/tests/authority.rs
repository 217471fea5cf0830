//! Tests for resolving the execution path of privileged actions

mod common;

use alloy::primitives::Address;
use common::{MockLedger, CALLER, MULTISIG};
use eyre::Result;
use plp_scripts::{
    authority::{AuthorityResolver, ExecutionPath},
    errors::ScriptError,
};

/// The contract targeted by the tests
const TARGET: Address = Address::repeat_byte(0x77);

#[tokio::test]
async fn test_caller_owned_target() -> Result<()> {
    let ledger = MockLedger::new();
    ledger.set_owner(TARGET, CALLER);

    let decision = AuthorityResolver::new(Some(MULTISIG))
        .resolve(&ledger, TARGET, CALLER)
        .await?;

    assert_eq!(decision.path, ExecutionPath::DirectExecution);
    assert_eq!(decision.target, TARGET);
    assert_eq!(decision.caller, CALLER);
    Ok(())
}

#[tokio::test]
async fn test_multisig_owned_target() -> Result<()> {
    let ledger = MockLedger::new();
    ledger.set_owner(TARGET, MULTISIG);

    let decision = AuthorityResolver::new(Some(MULTISIG))
        .resolve(&ledger, TARGET, CALLER)
        .await?;

    assert_eq!(decision.path, ExecutionPath::MultisigProposal);
    Ok(())
}

#[tokio::test]
async fn test_foreign_owned_target() -> Result<()> {
    let stranger = Address::repeat_byte(0x99);
    let ledger = MockLedger::new();
    ledger.set_owner(TARGET, stranger);

    let res = AuthorityResolver::new(Some(MULTISIG))
        .resolve(&ledger, TARGET, CALLER)
        .await;

    match res {
        Err(ScriptError::UnauthorizedTarget {
            target,
            owner,
            caller,
        }) => {
            assert_eq!(target, TARGET);
            assert_eq!(owner, stranger);
            assert_eq!(caller, CALLER);
        }
        other => panic!("expected an unauthorized target, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn test_multisig_owned_target_without_multisig() -> Result<()> {
    let ledger = MockLedger::new();
    ledger.set_owner(TARGET, MULTISIG);

    let res = AuthorityResolver::new(None)
        .resolve(&ledger, TARGET, CALLER)
        .await;

    assert!(matches!(res, Err(ScriptError::UnauthorizedTarget { .. })));
    Ok(())
}

#[tokio::test]
async fn test_ownership_is_reread() -> Result<()> {
    let ledger = MockLedger::new();
    let resolver = AuthorityResolver::new(Some(MULTISIG));

    ledger.set_owner(TARGET, CALLER);
    let before = resolver.resolve(&ledger, TARGET, CALLER).await?;
    ledger.set_owner(TARGET, MULTISIG);
    let after = resolver.resolve(&ledger, TARGET, CALLER).await?;

    assert_eq!(before.path, ExecutionPath::DirectExecution);
    assert_eq!(after.path, ExecutionPath::MultisigProposal);
    Ok(())
}
