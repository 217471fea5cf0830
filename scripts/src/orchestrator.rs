//! The workflow shared by every action the scripts take
//!
//! An action runs through a fixed sequence of steps: satisfy its allowance
//! precondition, assemble its price payload, resolve the authority under which
//! it is dispatched, dispatch it, then record any deployed address. A failure
//! at any step ends the workflow with the step attached to the error; nothing
//! is retried, and re-running the workflow re-validates every step.

use std::time::SystemTime;

use alloy::primitives::Address;
use tracing::{info, warn};

use crate::{
    actions::{Action, ActionClass, AllowancePrecondition, Deployment},
    address_book::ConfigStore,
    authority::{AuthorityDecision, AuthorityResolver, ExecutionPath},
    errors::{ActionStep, ScriptError},
    ledger::Ledger,
    multisig::MultisigWrapper,
    price::PricePayload,
    types::{ActionOutcome, ActionRequest, Receipt},
};

/// Runs actions against the chain, recording deployments in the address book
pub struct ActionOrchestrator<L, M> {
    /// The ledger client
    ledger: L,
    /// The multisig owning privileged contracts, if the chain has one
    multisig: Option<M>,
    /// The resolver choosing between direct execution and proposal
    resolver: AuthorityResolver,
    /// The address book store
    store: ConfigStore,
    /// The chain the actions run on
    chain_id: u64,
}

impl<L: Ledger, M: MultisigWrapper> ActionOrchestrator<L, M> {
    /// Create an orchestrator
    ///
    /// Privileged actions on contracts owned by `multisig` are proposed to it.
    pub fn new(ledger: L, multisig: Option<M>, store: ConfigStore, chain_id: u64) -> Self {
        let resolver = AuthorityResolver::new(multisig.as_ref().map(|m| m.address()));
        Self {
            ledger,
            multisig,
            resolver,
            store,
            chain_id,
        }
    }

    /// The ledger client
    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// The multisig client, if the chain has one
    pub fn multisig(&self) -> Option<&M> {
        self.multisig.as_ref()
    }

    /// The address book store
    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    /// Run an action to completion
    pub async fn run(&self, action: &Action) -> Result<ActionOutcome, ScriptError> {
        info!("{action}: starting");

        if let Some(precondition) = action.precondition() {
            self.ensure_allowance(&precondition)
                .await
                .map_err(|e| e.at(ActionStep::Precondition))?;
        }

        let payload = match action.observations() {
            Some(observations) => Some(
                PricePayload::build(observations, SystemTime::now())
                    .map_err(|e| e.at(ActionStep::PayloadAssembly))?,
            ),
            None => None,
        };
        let request = action
            .encode(payload.as_ref())
            .map_err(|e| e.at(ActionStep::PayloadAssembly))?;

        let outcome = match action {
            Action::Deploy(deployment) => {
                let (receipt, deployed) = self
                    .dispatch_deployment(deployment, &request)
                    .await
                    .map_err(|e| e.at(ActionStep::Dispatch))?;
                self.record_deployment(deployment, deployed)
                    .map_err(|e| e.at(ActionStep::PostAction))?;

                ActionOutcome::Executed {
                    receipt,
                    deployed: Some(deployed),
                }
            }
            _ => {
                let decision = self
                    .resolve_authority(action, &request)
                    .await
                    .map_err(|e| e.at(ActionStep::AuthorityResolution))?;
                self.dispatch(decision, request)
                    .await
                    .map_err(|e| e.at(ActionStep::Dispatch))?
            }
        };

        match &outcome {
            ActionOutcome::Executed { .. } => info!("{action}: {outcome}"),
            ActionOutcome::Proposed { .. } => warn!("{action}: {outcome}"),
        }
        Ok(outcome)
    }

    /// Approve the spender if the caller's allowance is below the required amount
    ///
    /// Returns the approval's receipt, or `None` if the allowance already sufficed.
    pub async fn ensure_allowance(
        &self,
        precondition: &AllowancePrecondition,
    ) -> Result<Option<Receipt>, ScriptError> {
        let caller = self.ledger.caller();
        let allowance = self
            .ledger
            .allowance(precondition.token, caller, precondition.spender)
            .await?;

        if allowance >= precondition.amount {
            info!(
                "allowance of {:#x} for {:#x} is sufficient",
                precondition.spender, precondition.token
            );
            return Ok(None);
        }

        info!(
            "approving {:#x} to spend {:#x}",
            precondition.spender, precondition.token
        );
        let receipt = self.ledger.submit(&precondition.approval_request()).await?;
        Ok(Some(receipt))
    }

    /// Resolve how a call reaches its target
    async fn resolve_authority(
        &self,
        action: &Action,
        request: &ActionRequest,
    ) -> Result<AuthorityDecision, ScriptError> {
        let caller = self.ledger.caller();
        let target = request.target().ok_or_else(|| {
            ScriptError::CalldataConstruction(format!("{action} has no target contract"))
        })?;

        match action.class() {
            ActionClass::Privileged => self.resolver.resolve(&self.ledger, target, caller).await,
            _ => Ok(AuthorityDecision::direct(target, caller)),
        }
    }

    /// Execute or propose a call according to the resolved authority
    async fn dispatch(
        &self,
        decision: AuthorityDecision,
        request: ActionRequest,
    ) -> Result<ActionOutcome, ScriptError> {
        match decision.path {
            ExecutionPath::DirectExecution => {
                let receipt = self.ledger.submit(&request).await?;
                Ok(ActionOutcome::Executed {
                    receipt,
                    deployed: None,
                })
            }
            ExecutionPath::MultisigProposal => {
                let multisig = self.multisig.as_ref().ok_or_else(|| {
                    ScriptError::ProposalRejected("no multisig client configured".to_string())
                })?;
                let proposal_id = multisig
                    .propose_transaction(decision.target, request.value(), request.data().clone())
                    .await?;
                Ok(ActionOutcome::Proposed { proposal_id })
            }
        }
    }

    /// Deploy a contract, and its proxy if it has one, returning the address to record
    async fn dispatch_deployment(
        &self,
        deployment: &Deployment,
        request: &ActionRequest,
    ) -> Result<(Receipt, Address), ScriptError> {
        let receipt = self.ledger.submit(request).await?;
        let created = created_address(&receipt)?;

        match deployment.proxy_request(created, self.ledger.caller()) {
            None => Ok((receipt, created)),
            Some(proxy_request) => {
                info!("implementation deployed at {:#x}, deploying proxy", created);
                let receipt = self.ledger.submit(&proxy_request).await?;
                let proxy = created_address(&receipt)?;
                Ok((receipt, proxy))
            }
        }
    }

    /// Point the deployment's logical name at the deployed address
    fn record_deployment(
        &self,
        deployment: &Deployment,
        address: Address,
    ) -> Result<(), ScriptError> {
        self.store.update(self.chain_id, |book| {
            if let Some(previous) = book.set(deployment.category, &deployment.name, address) {
                warn!(
                    "replacing {}.{} = {:#x}",
                    deployment.category, deployment.name, previous
                );
            }
        })?;

        info!(
            "recorded {}.{} = {:#x} in {}",
            deployment.category,
            deployment.name,
            address,
            self.store.path_for(self.chain_id).display()
        );
        Ok(())
    }
}

/// The contract created by a deployment transaction
fn created_address(receipt: &Receipt) -> Result<Address, ScriptError> {
    receipt.contract_address.ok_or_else(|| {
        ScriptError::Submission(format!(
            "tx {:#x} did not create a contract",
            receipt.tx_hash
        ))
    })
}
