//! Resolution of the path through which a privileged action is dispatched

use alloy::primitives::Address;
use tracing::info;

use crate::{errors::ScriptError, ledger::Ledger};

/// How an action reaches its target contract
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionPath {
    /// The caller signs and submits the call itself
    DirectExecution,
    /// The call is proposed to the multisig owning the target
    MultisigProposal,
}

/// An execution path bound to the target and caller it was resolved for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthorityDecision {
    /// The chosen execution path
    pub path: ExecutionPath,
    /// The contract the action targets
    pub target: Address,
    /// The address invoking the action
    pub caller: Address,
}

impl AuthorityDecision {
    /// A direct execution by the caller
    pub fn direct(target: Address, caller: Address) -> Self {
        Self {
            path: ExecutionPath::DirectExecution,
            target,
            caller,
        }
    }
}

/// Decides whether the caller or the multisig may act on a contract
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthorityResolver {
    /// The multisig configured for the chain
    multisig: Option<Address>,
}

impl AuthorityResolver {
    /// Create a resolver for a chain with the given multisig, if any
    pub fn new(multisig: Option<Address>) -> Self {
        Self { multisig }
    }

    /// Resolve the execution path for the caller against the target's current owner
    ///
    /// The owner is read on every call, since ownership may be transferred
    /// between invocations.
    pub async fn resolve<L: Ledger>(
        &self,
        ledger: &L,
        target: Address,
        caller: Address,
    ) -> Result<AuthorityDecision, ScriptError> {
        let owner = ledger.owner_of(target).await?;

        let path = if owner == caller {
            ExecutionPath::DirectExecution
        } else if self.multisig == Some(owner) {
            ExecutionPath::MultisigProposal
        } else {
            return Err(ScriptError::UnauthorizedTarget {
                target,
                owner,
                caller,
            });
        };

        info!("{:#x} is owned by {:#x}, using {:?}", target, owner, path);
        Ok(AuthorityDecision {
            path,
            target,
            caller,
        })
    }
}
