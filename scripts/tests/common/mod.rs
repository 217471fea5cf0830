//! In-memory ledger and multisig doubles shared by the integration tests

#![allow(dead_code)]

use std::{collections::HashMap, sync::Mutex};

use alloy::{
    primitives::{keccak256, Address, Bytes, B256, U256},
    sol,
    sol_types::SolCall,
};
use plp_scripts::{
    address_book::ConfigStore,
    errors::ScriptError,
    ledger::Ledger,
    multisig::MultisigWrapper,
    orchestrator::ActionOrchestrator,
    types::{ActionRequest, ProposalId, Receipt},
};
use tempfile::{tempdir, TempDir};

sol! {
    function approve(address spender, uint256 amount) external returns (bool);
}

/// The chain the tests run against
pub const TEST_CHAIN_ID: u64 = 421614;

/// The address signing the tests' transactions
pub const CALLER: Address = Address::repeat_byte(0xca);

/// The address of the test multisig
pub const MULTISIG: Address = Address::repeat_byte(0x5a);

/// The mutable chain state behind a [`MockLedger`]
#[derive(Default)]
struct LedgerState {
    /// Contract owners
    owners: HashMap<Address, Address>,
    /// Allowances, keyed by (token, owner, spender)
    allowances: HashMap<(Address, Address, Address), U256>,
    /// Every request submitted, in submission order
    submitted: Vec<ActionRequest>,
    /// The number of contracts created so far
    created: u8,
    /// Whether submitted transactions revert
    reverting: bool,
}

/// A ledger keeping its state in memory
pub struct MockLedger {
    /// The address signing transactions
    caller: Address,
    /// The chain state
    state: Mutex<LedgerState>,
}

impl MockLedger {
    /// A ledger signing as [`CALLER`]
    pub fn new() -> Self {
        Self {
            caller: CALLER,
            state: Mutex::new(LedgerState::default()),
        }
    }

    /// Set the owner of a contract
    pub fn set_owner(&self, target: Address, owner: Address) {
        self.state.lock().unwrap().owners.insert(target, owner);
    }

    /// Set an allowance
    pub fn set_allowance(&self, token: Address, owner: Address, spender: Address, amount: U256) {
        self.state
            .lock()
            .unwrap()
            .allowances
            .insert((token, owner, spender), amount);
    }

    /// Make every subsequent submission revert
    pub fn revert_submissions(&self) {
        self.state.lock().unwrap().reverting = true;
    }

    /// The requests submitted so far
    pub fn submitted(&self) -> Vec<ActionRequest> {
        self.state.lock().unwrap().submitted.clone()
    }
}

impl Ledger for MockLedger {
    fn caller(&self) -> Address {
        self.caller
    }

    async fn owner_of(&self, target: Address) -> Result<Address, ScriptError> {
        self.state
            .lock()
            .unwrap()
            .owners
            .get(&target)
            .copied()
            .ok_or_else(|| ScriptError::ContractInteraction(format!("{target:#x} is not ownable")))
    }

    async fn allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256, ScriptError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .allowances
            .get(&(token, owner, spender))
            .copied()
            .unwrap_or_default())
    }

    async fn submit(&self, request: &ActionRequest) -> Result<Receipt, ScriptError> {
        let mut state = self.state.lock().unwrap();
        state.submitted.push(request.clone());
        let tx_hash = B256::left_padding_from(&[state.submitted.len() as u8]);

        if state.reverting {
            return Err(ScriptError::RevertedExecution(format!(
                "tx {tx_hash:#x} reverted"
            )));
        }

        let contract_address = match request.target() {
            Some(token) => {
                if let Ok(call) = approveCall::abi_decode(request.data()) {
                    state
                        .allowances
                        .insert((token, self.caller, call.spender), call.amount);
                }
                None
            }
            None => {
                state.created += 1;
                let address = Address::with_last_byte(state.created);
                state.owners.insert(address, self.caller);
                Some(address)
            }
        };

        Ok(Receipt {
            tx_hash,
            contract_address,
        })
    }
}

/// A multisig recording the transactions proposed to it
pub struct MockMultisig {
    /// The address of the multisig
    address: Address,
    /// Every proposal made, as (target, value, calldata)
    proposals: Mutex<Vec<(Address, U256, Bytes)>>,
}

impl MockMultisig {
    /// A multisig at [`MULTISIG`]
    pub fn new() -> Self {
        Self {
            address: MULTISIG,
            proposals: Mutex::new(Vec::new()),
        }
    }

    /// The proposals made so far
    pub fn proposals(&self) -> Vec<(Address, U256, Bytes)> {
        self.proposals.lock().unwrap().clone()
    }
}

impl MultisigWrapper for MockMultisig {
    fn address(&self) -> Address {
        self.address
    }

    async fn propose_transaction(
        &self,
        target: Address,
        value: U256,
        data: Bytes,
    ) -> Result<ProposalId, ScriptError> {
        let id = keccak256(&data);
        self.proposals.lock().unwrap().push((target, value, data));
        Ok(id)
    }
}

/// The orchestrator under test
pub type TestOrchestrator = ActionOrchestrator<MockLedger, MockMultisig>;

/// An orchestrator over a fresh ledger and an empty address book directory
///
/// The directory is removed when the returned [`TempDir`] is dropped, so
/// callers hold it for the life of the test.
pub fn setup_orchestrator(with_multisig: bool) -> (TestOrchestrator, TempDir) {
    let config_dir = tempdir().expect("failed to create config dir");
    let multisig = with_multisig.then(MockMultisig::new);
    let orchestrator = ActionOrchestrator::new(
        MockLedger::new(),
        multisig,
        ConfigStore::new(config_dir.path().join("configs")),
        TEST_CHAIN_ID,
    );

    (orchestrator, config_dir)
}
