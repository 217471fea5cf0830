//! Proposal of transactions to a Safe multisig
//!
//! Proposals are signed by the deployer as one of the Safe's owners and
//! submitted to the Safe Transaction Service, where the remaining owners
//! collect signatures before execution.

use std::{str::FromStr, time::Duration};

use alloy::{
    primitives::{Address, Bytes, B256, U256},
    signers::{local::PrivateKeySigner, Signer},
    sol_types::{Eip712Domain, SolStruct},
    transports::http::reqwest::{header::CONTENT_TYPE, Client, Error as ReqwestError, Url},
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    errors::ScriptError,
    ledger::Wallet,
    solidity::{ISafe, SafeTx},
    types::ProposalId,
};

/// The number of pending transactions requested per page
const PENDING_PAGE_LIMIT: usize = 100;

/// A multisig through which privileged actions are proposed
#[allow(async_fn_in_trait)]
pub trait MultisigWrapper {
    /// The address of the multisig
    fn address(&self) -> Address;

    /// Propose a call from the multisig, returning the proposal's ID
    ///
    /// Success means the proposal awaits approval, not that the call executed.
    async fn propose_transaction(
        &self,
        target: Address,
        value: U256,
        data: Bytes,
    ) -> Result<ProposalId, ScriptError>;
}

/// A pending transaction as listed by the Safe Transaction Service
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PendingSafeTx {
    /// The Safe transaction hash
    safe_tx_hash: B256,
    /// The call target
    to: Address,
    /// The attached value, as a decimal string
    value: String,
    /// The calldata, absent for plain transfers
    data: Option<Bytes>,
    /// The Safe nonce the transaction is queued at
    nonce: u64,
}

impl PendingSafeTx {
    /// Whether the pending transaction makes the given call
    fn matches(&self, target: Address, value: U256, data: &Bytes) -> bool {
        let same_value = U256::from_str(&self.value).is_ok_and(|v| v == value);
        let pending_data = self.data.clone().unwrap_or_default();
        self.to == target && same_value && pending_data == *data
    }
}

/// A page of pending transactions
#[derive(Debug, Deserialize)]
struct PendingSafeTxPage {
    /// The URL of the following page, absent on the last page
    #[serde(default)]
    next: Option<String>,
    /// The transactions on the page
    results: Vec<PendingSafeTx>,
}

/// The nonce of the next proposal, queued behind every pending transaction
fn next_nonce(onchain_nonce: u64, pending: &[PendingSafeTx]) -> u64 {
    pending
        .iter()
        .map(|tx| tx.nonce + 1)
        .max()
        .map_or(onchain_nonce, |next| next.max(onchain_nonce))
}

/// The body of a proposal to the Safe Transaction Service
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProposalBody {
    /// The call target, checksummed
    to: String,
    /// The attached value, as a decimal string
    value: String,
    /// The calldata
    data: Bytes,
    /// The operation, zero for `CALL`
    operation: u8,
    /// Gas forwarded to the call, zero to forward all
    safe_tx_gas: String,
    /// Gas paid for outside the call
    base_gas: String,
    /// The refund gas price
    gas_price: String,
    /// The refund token, checksummed
    gas_token: String,
    /// The refund receiver, checksummed
    refund_receiver: String,
    /// The Safe nonce of the proposal
    nonce: u64,
    /// The EIP-712 hash of the Safe transaction
    contract_transaction_hash: B256,
    /// The proposing owner, checksummed
    sender: String,
    /// The proposer's signature over the transaction hash
    signature: Bytes,
}

/// Proposes transactions to a Safe through the Safe Transaction Service
#[derive(Clone)]
pub struct SafeWrapper {
    /// The chain the Safe is deployed on
    chain_id: u64,
    /// The address of the Safe
    safe: Address,
    /// The owner proposing transactions
    signer: PrivateKeySigner,
    /// The provider used to read the Safe's nonce
    provider: Wallet,
    /// The HTTP client, carrying the request timeout
    client: Client,
    /// The base URL of the Safe Transaction Service
    service_url: Url,
    /// The bound on on-chain reads
    timeout: Duration,
}

impl SafeWrapper {
    /// Create a wrapper for the given Safe
    pub fn new(
        chain_id: u64,
        safe: Address,
        signer: PrivateKeySigner,
        provider: Wallet,
        service_url: &str,
        timeout: Duration,
    ) -> Result<Self, ScriptError> {
        let service_url = Url::parse(service_url)
            .map_err(|e| ScriptError::ClientInitialization(e.to_string()))?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ScriptError::ClientInitialization(e.to_string()))?;

        Ok(Self {
            chain_id,
            safe,
            signer,
            provider,
            client,
            service_url,
            timeout,
        })
    }

    /// The service endpoint listing and accepting the Safe's transactions
    fn transactions_url(&self) -> Result<Url, ScriptError> {
        let path = format!(
            "api/v1/safes/{}/multisig-transactions/",
            self.safe.to_checksum(None)
        );
        self.service_url
            .join(&path)
            .map_err(|e| ScriptError::ProposalRejected(e.to_string()))
    }

    /// The EIP-712 domain of the Safe
    fn domain(&self) -> Eip712Domain {
        Eip712Domain::new(
            None,
            None,
            Some(U256::from(self.chain_id)),
            Some(self.safe),
            None,
        )
    }

    /// The Safe's on-chain nonce, i.e. the nonce of the next executable transaction
    async fn onchain_nonce(&self) -> Result<u64, ScriptError> {
        let safe = ISafe::new(self.safe, &self.provider);
        let nonce = tokio::time::timeout(self.timeout, safe.nonce().call())
            .await
            .map_err(|_| ScriptError::UpstreamTimeout("safe nonce query".to_string()))?
            .map_err(|e| ScriptError::ContractInteraction(e.to_string()))?;
        u64::try_from(nonce)
            .map_err(|_| ScriptError::ContractInteraction("safe nonce exceeds u64".to_string()))
    }

    /// The unexecuted transactions queued at or above the given nonce, across all pages
    async fn pending_transactions(
        &self,
        from_nonce: u64,
    ) -> Result<Vec<PendingSafeTx>, ScriptError> {
        let mut url = self.transactions_url()?;
        url.query_pairs_mut()
            .append_pair("executed", "false")
            .append_pair("nonce__gte", &from_nonce.to_string())
            .append_pair("limit", &PENDING_PAGE_LIMIT.to_string());

        let mut pending = Vec::new();
        let mut next = Some(url);
        while let Some(url) = next {
            let page = self.pending_page(url).await?;
            pending.extend(page.results);
            next = page
                .next
                .map(|next| Url::parse(&next))
                .transpose()
                .map_err(|e| ScriptError::ProposalRejected(e.to_string()))?;
        }

        Ok(pending)
    }

    /// Fetch a single page of pending transactions
    async fn pending_page(&self, url: Url) -> Result<PendingSafeTxPage, ScriptError> {
        let resp = self.client.get(url).send().await.map_err(service_error)?;
        if !resp.status().is_success() {
            return Err(ScriptError::ProposalRejected(format!(
                "listing pending transactions failed with {}",
                resp.status()
            )));
        }

        let body = resp.text().await.map_err(service_error)?;
        serde_json::from_str(&body).map_err(|e| ScriptError::ProposalRejected(e.to_string()))
    }
}

impl MultisigWrapper for SafeWrapper {
    fn address(&self) -> Address {
        self.safe
    }

    async fn propose_transaction(
        &self,
        target: Address,
        value: U256,
        data: Bytes,
    ) -> Result<ProposalId, ScriptError> {
        let onchain_nonce = self.onchain_nonce().await?;
        let pending = self.pending_transactions(onchain_nonce).await?;
        if let Some(dup) = pending.iter().find(|tx| tx.matches(target, value, &data)) {
            return Err(ScriptError::DuplicateProposal(format!(
                "{:#x} at nonce {}",
                dup.safe_tx_hash, dup.nonce
            )));
        }

        let nonce = next_nonce(onchain_nonce, &pending);

        let safe_tx = SafeTx {
            to: target,
            value,
            data: data.clone(),
            operation: 0,
            safeTxGas: U256::ZERO,
            baseGas: U256::ZERO,
            gasPrice: U256::ZERO,
            gasToken: Address::ZERO,
            refundReceiver: Address::ZERO,
            nonce: U256::from(nonce),
        };
        let safe_tx_hash = safe_tx.eip712_signing_hash(&self.domain());
        let signature = self
            .signer
            .sign_hash(&safe_tx_hash)
            .await
            .map_err(|e| ScriptError::ProposalRejected(e.to_string()))?;

        let body = ProposalBody {
            to: target.to_checksum(None),
            value: value.to_string(),
            data,
            operation: 0,
            safe_tx_gas: "0".to_string(),
            base_gas: "0".to_string(),
            gas_price: "0".to_string(),
            gas_token: Address::ZERO.to_checksum(None),
            refund_receiver: Address::ZERO.to_checksum(None),
            nonce,
            contract_transaction_hash: safe_tx_hash,
            sender: self.signer.address().to_checksum(None),
            signature: Bytes::from(signature.as_bytes().to_vec()),
        };
        let body = serde_json::to_string(&body)
            .map_err(|e| ScriptError::ProposalRejected(e.to_string()))?;

        info!("proposing {:#x} to safe {:#x} at nonce {}", safe_tx_hash, self.safe, nonce);
        let resp = self
            .client
            .post(self.transactions_url()?)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(service_error)?;

        if !resp.status().is_success() {
            let status = resp.status();
            let reason = resp.text().await.unwrap_or_default();
            return Err(ScriptError::ProposalRejected(format!("{status}: {reason}")));
        }

        Ok(safe_tx_hash)
    }
}

/// Map a transport error from the Safe Transaction Service
fn service_error(e: ReqwestError) -> ScriptError {
    if e.is_timeout() {
        ScriptError::UpstreamTimeout(format!("safe transaction service: {e}"))
    } else {
        ScriptError::ProposalRejected(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_tx_matching() {
        let json = r#"{
            "count": 1,
            "results": [{
                "safeTxHash": "0x1111111111111111111111111111111111111111111111111111111111111111",
                "to": "0x2222222222222222222222222222222222222222",
                "value": "0",
                "data": "0xdeadbeef",
                "nonce": 4
            }]
        }"#;
        let page: PendingSafeTxPage = serde_json::from_str(json).unwrap();
        let tx = &page.results[0];

        let target = Address::repeat_byte(0x22);
        let data = Bytes::from_static(&[0xde, 0xad, 0xbe, 0xef]);
        assert!(tx.matches(target, U256::ZERO, &data));
        assert!(!tx.matches(target, U256::from(1), &data));
        assert!(!tx.matches(Address::repeat_byte(0x33), U256::ZERO, &data));
        assert!(!tx.matches(target, U256::ZERO, &Bytes::new()));
    }

    #[test]
    fn test_pending_transfer_without_data() {
        let json = r#"{
            "results": [{
                "safeTxHash": "0x1111111111111111111111111111111111111111111111111111111111111111",
                "to": "0x2222222222222222222222222222222222222222",
                "value": "100",
                "data": null,
                "nonce": 0
            }]
        }"#;
        let page: PendingSafeTxPage = serde_json::from_str(json).unwrap();
        assert!(page.next.is_none());

        let tx = &page.results[0];
        assert!(tx.matches(Address::repeat_byte(0x22), U256::from(100), &Bytes::new()));
    }

    #[test]
    fn test_page_with_next() {
        let json = r#"{
            "count": 150,
            "next": "https://safe-transaction-arbitrum.safe.global/api/v1/?limit=100&offset=100",
            "previous": null,
            "results": []
        }"#;
        let page: PendingSafeTxPage = serde_json::from_str(json).unwrap();
        assert!(page.next.unwrap().ends_with("offset=100"));
    }

    /// A pending transaction queued at the given nonce
    fn pending_at(nonce: u64) -> PendingSafeTx {
        PendingSafeTx {
            safe_tx_hash: B256::repeat_byte(nonce as u8),
            to: Address::repeat_byte(0x22),
            value: "0".to_string(),
            data: None,
            nonce,
        }
    }

    #[test]
    fn test_next_nonce_without_pending() {
        assert_eq!(next_nonce(7, &[]), 7);
    }

    #[test]
    fn test_next_nonce_ignores_stale_pending() {
        let pending = [pending_at(3), pending_at(5)];
        assert_eq!(next_nonce(7, &pending), 7);
    }

    #[test]
    fn test_next_nonce_queues_behind_pending() {
        // A gap at 8 does not get filled, the proposal goes after the highest
        let pending = [pending_at(7), pending_at(9)];
        assert_eq!(next_nonce(7, &pending), 10);
    }
}
