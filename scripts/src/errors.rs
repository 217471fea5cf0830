//! Definitions of errors that can occur during the execution of the contract management scripts

use std::{
    error::Error,
    fmt::{self, Display, Formatter},
};

use alloy::primitives::Address;

/// The step of an action workflow in which a failure occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionStep {
    /// Satisfying the action's precondition, e.g. a token allowance
    Precondition,
    /// Building the oracle price update payload
    PayloadAssembly,
    /// Deciding between direct execution and a multisig proposal
    AuthorityResolution,
    /// Submitting the transaction or the proposal
    Dispatch,
    /// Recording the outcome, e.g. persisting a deployed address
    PostAction,
}

impl Display for ActionStep {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ActionStep::Precondition => write!(f, "precondition"),
            ActionStep::PayloadAssembly => write!(f, "payload assembly"),
            ActionStep::AuthorityResolution => write!(f, "authority resolution"),
            ActionStep::Dispatch => write!(f, "dispatch"),
            ActionStep::PostAction => write!(f, "post action"),
        }
    }
}

/// Errors that can occur during the execution of the contract management scripts
#[derive(Debug)]
pub enum ScriptError {
    /// No address book exists for the given chain ID
    ConfigNotFound(u64),
    /// Error reading or writing the address book
    Persistence(String),
    /// A logical name is not present in the address book
    MissingAddress {
        /// The category that was searched
        category: &'static str,
        /// The logical name that was not found
        name: String,
    },
    /// The caller has no path to act on the target contract
    UnauthorizedTarget {
        /// The contract that was targeted
        target: Address,
        /// The current owner of the target
        owner: Address,
        /// The address attempting to act
        caller: Address,
    },
    /// A price payload was requested without any observations
    EmptyObservationSet,
    /// A price or publish time diff cannot be encoded
    InvalidPrice(String),
    /// An upstream call did not return within the configured timeout
    UpstreamTimeout(String),
    /// Error submitting a transaction to the ledger
    Submission(String),
    /// A transaction was included but reverted
    RevertedExecution(String),
    /// The multisig service refused a proposal
    ProposalRejected(String),
    /// An identical proposal is already pending approval
    DuplicateProposal(String),
    /// The price oracle could not provide prices
    OracleUnavailable(String),
    /// Error initializing the RPC client
    ClientInitialization(String),
    /// Error constructing calldata for a contract method
    CalldataConstruction(String),
    /// Error parsing a compilation artifact
    ArtifactParsing(String),
    /// Error calling a read-only contract method
    ContractInteraction(String),
    /// An action failed at the given step
    ActionFailed {
        /// The step that failed
        step: ActionStep,
        /// The underlying collaborator error
        cause: Box<ScriptError>,
    },
}

impl ScriptError {
    /// Wrap the error with the action step it occurred in
    pub fn at(self, step: ActionStep) -> Self {
        ScriptError::ActionFailed {
            step,
            cause: Box::new(self),
        }
    }

    /// The innermost error, unwrapping any step annotations
    pub fn root_cause(&self) -> &ScriptError {
        match self {
            ScriptError::ActionFailed { cause, .. } => cause.root_cause(),
            e => e,
        }
    }

    /// The step the error was annotated with, if any
    pub fn step(&self) -> Option<ActionStep> {
        match self {
            ScriptError::ActionFailed { step, .. } => Some(*step),
            _ => None,
        }
    }
}

impl Display for ScriptError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ScriptError::ConfigNotFound(chain_id) => {
                write!(f, "no address book found for chain {}", chain_id)
            }
            ScriptError::Persistence(s) => write!(f, "error persisting address book: {}", s),
            ScriptError::MissingAddress { category, name } => {
                write!(f, "no address for `{}` in {}", name, category)
            }
            ScriptError::UnauthorizedTarget {
                target,
                owner,
                caller,
            } => write!(
                f,
                "{:#x} cannot act on {:#x}: owned by {:#x}",
                caller, target, owner
            ),
            ScriptError::EmptyObservationSet => write!(f, "no price observations provided"),
            ScriptError::InvalidPrice(s) => write!(f, "invalid price: {}", s),
            ScriptError::UpstreamTimeout(s) => write!(f, "upstream call timed out: {}", s),
            ScriptError::Submission(s) => write!(f, "error submitting transaction: {}", s),
            ScriptError::RevertedExecution(s) => write!(f, "transaction reverted: {}", s),
            ScriptError::ProposalRejected(s) => write!(f, "proposal rejected: {}", s),
            ScriptError::DuplicateProposal(s) => {
                write!(f, "identical proposal already pending: {}", s)
            }
            ScriptError::OracleUnavailable(s) => write!(f, "price oracle unavailable: {}", s),
            ScriptError::ClientInitialization(s) => write!(f, "error initializing client: {}", s),
            ScriptError::CalldataConstruction(s) => write!(f, "error constructing calldata: {}", s),
            ScriptError::ArtifactParsing(s) => write!(f, "error parsing artifact: {}", s),
            ScriptError::ContractInteraction(s) => {
                write!(f, "error interacting with contract: {}", s)
            }
            ScriptError::ActionFailed { step, cause } => write!(f, "{} failed: {}", step, cause),
        }
    }
}

impl Error for ScriptError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ScriptError::ActionFailed { cause, .. } => Some(cause.as_ref()),
            _ => None,
        }
    }
}
