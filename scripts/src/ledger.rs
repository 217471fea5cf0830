//! The ledger client through which the scripts read and write chain state

use std::{future::IntoFuture, time::Duration};

use alloy::{
    network::{Ethereum, TransactionBuilder},
    primitives::{Address, U256},
    providers::{DynProvider, Provider, ProviderBuilder},
    rpc::types::TransactionRequest,
    signers::local::PrivateKeySigner,
    transports::http::reqwest::Url,
};
use tracing::info;

use crate::{
    errors::ScriptError,
    solidity::{IOwnable, IERC20},
    types::{ActionRequest, Receipt},
};

/// The provider type used by the scripts
pub type Wallet = DynProvider<Ethereum>;

/// The chain operations the orchestrator depends on
#[allow(async_fn_in_trait)]
pub trait Ledger {
    /// The address signing transactions
    fn caller(&self) -> Address;

    /// The current owner of an `Ownable` contract
    async fn owner_of(&self, target: Address) -> Result<Address, ScriptError>;

    /// The amount of `token` that `spender` may move on behalf of `owner`
    async fn allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256, ScriptError>;

    /// Sign and submit a request, waiting for its inclusion
    ///
    /// Fails with [`ScriptError::RevertedExecution`] if the transaction was
    /// included but reverted.
    async fn submit(&self, request: &ActionRequest) -> Result<Receipt, ScriptError>;
}

/// A ledger client over a JSON-RPC endpoint, signing with a local key
#[derive(Clone)]
pub struct RpcLedger {
    /// The signing provider
    provider: Wallet,
    /// The address of the signer
    caller: Address,
    /// The bound on every RPC round trip
    timeout: Duration,
}

impl RpcLedger {
    /// Connect to the RPC endpoint, signing with the given key
    pub fn connect(
        signer: PrivateKeySigner,
        rpc_url: &str,
        timeout: Duration,
    ) -> Result<Self, ScriptError> {
        let url =
            Url::parse(rpc_url).map_err(|e| ScriptError::ClientInitialization(e.to_string()))?;
        let caller = signer.address();

        let provider = ProviderBuilder::new().wallet(signer).connect_http(url);

        Ok(Self {
            provider: DynProvider::new(provider),
            caller,
            timeout,
        })
    }

    /// The underlying provider, for contract-specific reads
    pub fn provider(&self) -> &Wallet {
        &self.provider
    }

    /// The chain ID reported by the endpoint
    pub async fn chain_id(&self) -> Result<u64, ScriptError> {
        self.bounded("get chain id", self.provider.get_chain_id())
            .await?
            .map_err(|e| ScriptError::ClientInitialization(e.to_string()))
    }

    /// Run a future under the ledger's timeout
    pub async fn bounded<F: IntoFuture>(
        &self,
        what: &str,
        fut: F,
    ) -> Result<F::Output, ScriptError> {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| ScriptError::UpstreamTimeout(format!("{what} after {:?}", self.timeout)))
    }
}

impl Ledger for RpcLedger {
    fn caller(&self) -> Address {
        self.caller
    }

    async fn owner_of(&self, target: Address) -> Result<Address, ScriptError> {
        let ownable = IOwnable::new(target, &self.provider);
        self.bounded("owner query", ownable.owner().call())
            .await?
            .map_err(|e| ScriptError::ContractInteraction(e.to_string()))
    }

    async fn allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256, ScriptError> {
        let erc20 = IERC20::new(token, &self.provider);
        self.bounded("allowance query", erc20.allowance(owner, spender).call())
            .await?
            .map_err(|e| ScriptError::ContractInteraction(e.to_string()))
    }

    async fn submit(&self, request: &ActionRequest) -> Result<Receipt, ScriptError> {
        let mut tx = TransactionRequest::default()
            .with_from(self.caller)
            .with_value(request.value())
            .with_gas_limit(request.gas_limit());
        tx = match request.target() {
            Some(target) => tx.with_to(target).with_input(request.data().clone()),
            None => tx.with_deploy_code(request.data().clone()),
        };

        let pending = self
            .bounded("transaction submission", self.provider.send_transaction(tx))
            .await?
            .map_err(|e| ScriptError::Submission(e.to_string()))?;
        let tx_hash = *pending.tx_hash();
        info!("submitted tx {:#x}, waiting for inclusion", tx_hash);

        let receipt = self
            .bounded("transaction inclusion", pending.get_receipt())
            .await?
            .map_err(|e| ScriptError::Submission(e.to_string()))?;

        if !receipt.status() {
            return Err(ScriptError::RevertedExecution(format!(
                "tx {:#x} reverted",
                tx_hash
            )));
        }

        Ok(Receipt {
            tx_hash,
            contract_address: receipt.contract_address,
        })
    }
}
