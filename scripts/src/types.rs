//! Type definitions used throughout the scripts

use std::fmt::{self, Display};

use alloy::primitives::{Address, Bytes, TxHash, B256, U256};

/// The identifier of a multisig proposal, i.e. the Safe transaction hash
pub type ProposalId = B256;

/// A fully encoded transaction, consumed once by either dispatch path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRequest {
    /// The contract to call, `None` for a contract creation
    target: Option<Address>,
    /// The calldata, or the init code for a contract creation
    data: Bytes,
    /// The value to attach
    value: U256,
    /// The execution fee paid to the order executor, if the action carries one
    execution_fee: Option<U256>,
    /// The gas limit ceiling
    gas_limit: u64,
}

impl ActionRequest {
    /// A call to an existing contract
    pub fn call(target: Address, data: impl Into<Bytes>, gas_limit: u64) -> Self {
        Self {
            target: Some(target),
            data: data.into(),
            value: U256::ZERO,
            execution_fee: None,
            gas_limit,
        }
    }

    /// A contract creation
    pub fn create(init_code: impl Into<Bytes>, gas_limit: u64) -> Self {
        Self {
            target: None,
            data: init_code.into(),
            value: U256::ZERO,
            execution_fee: None,
            gas_limit,
        }
    }

    /// Attach an execution fee, which is also sent as the call's value
    pub fn with_execution_fee(mut self, fee: U256) -> Self {
        self.execution_fee = Some(fee);
        self.value = fee;
        self
    }

    /// The contract to call, `None` for a contract creation
    pub fn target(&self) -> Option<Address> {
        self.target
    }

    /// The calldata or init code
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// The value to attach
    pub fn value(&self) -> U256 {
        self.value
    }

    /// The execution fee, if any
    pub fn execution_fee(&self) -> Option<U256> {
        self.execution_fee
    }

    /// The gas limit ceiling
    pub fn gas_limit(&self) -> u64 {
        self.gas_limit
    }
}

/// The parts of a transaction receipt the scripts care about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Receipt {
    /// The hash of the included transaction
    pub tx_hash: TxHash,
    /// The address of the created contract, for contract creations
    pub contract_address: Option<Address>,
}

/// The terminal state of a successful action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// The action was included on-chain and is final
    Executed {
        /// The receipt of the final transaction
        receipt: Receipt,
        /// The deployed address, for deployments
        deployed: Option<Address>,
    },
    /// The action was proposed to the multisig and awaits approval
    Proposed {
        /// The multisig proposal
        proposal_id: ProposalId,
    },
}

impl ActionOutcome {
    /// Whether the action has executed, as opposed to pending approval
    pub fn is_final(&self) -> bool {
        matches!(self, ActionOutcome::Executed { .. })
    }
}

impl Display for ActionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionOutcome::Executed {
                receipt,
                deployed: Some(address),
            } => write!(f, "deployed at {:#x} (tx {:#x})", address, receipt.tx_hash),
            ActionOutcome::Executed { receipt, .. } => {
                write!(f, "executed in tx {:#x}", receipt.tx_hash)
            }
            ActionOutcome::Proposed { proposal_id } => {
                write!(f, "proposed as {:#x}, pending approval", proposal_id)
            }
        }
    }
}
