//! Utilities for the deploy and operations scripts.

use std::{fmt::Display, fs, path::Path, str::FromStr, time::Duration};

use alloy::{primitives::Bytes, signers::local::PrivateKeySigner};
use serde_json::Value;
use tracing::info;

use crate::{
    address_book::ConfigStore,
    constants::default_safe_service_url,
    errors::ScriptError,
    ledger::RpcLedger,
    multisig::SafeWrapper,
    oracle::PriceSymbol,
    orchestrator::ActionOrchestrator,
};

/// Everything a command needs, loaded once by the entry point
pub struct ScriptContext {
    /// The address book of the chain, as loaded at startup
    pub address_book: crate::address_book::AddressBook,
    /// The orchestrator running the command's actions
    pub orchestrator: ActionOrchestrator<RpcLedger, SafeWrapper>,
    /// The bound on every upstream call
    pub timeout: Duration,
}

/// Parse the deployer's private key
pub fn parse_signer(priv_key: &str) -> Result<PrivateKeySigner, ScriptError> {
    PrivateKeySigner::from_str(priv_key)
        .map_err(|e| ScriptError::ClientInitialization(e.to_string()))
}

/// Load the chain's address book and connect the ledger and multisig clients
///
/// Fails if the RPC endpoint serves a different chain than `chain_id`.
pub async fn setup_context(
    chain_id: u64,
    priv_key: &str,
    rpc_url: &str,
    config_dir: &Path,
    timeout: Duration,
    safe_service_url: Option<&str>,
) -> Result<ScriptContext, ScriptError> {
    let store = ConfigStore::new(config_dir);
    let address_book = store.load(chain_id)?;

    let signer = parse_signer(priv_key)?;
    let ledger = RpcLedger::connect(signer.clone(), rpc_url, timeout)?;
    let rpc_chain_id = ledger.chain_id().await?;
    if rpc_chain_id != chain_id {
        return Err(ScriptError::ClientInitialization(format!(
            "RPC endpoint serves chain {rpc_chain_id}, expected {chain_id}"
        )));
    }

    let multisig = match address_book.safe {
        Some(safe) => {
            let service_url = safe_service_url
                .or_else(|| default_safe_service_url(chain_id))
                .ok_or_else(|| {
                    ScriptError::ClientInitialization(format!(
                        "no Safe Transaction Service known for chain {chain_id}"
                    ))
                })?;
            let wrapper = SafeWrapper::new(
                chain_id,
                safe,
                signer,
                ledger.provider().clone(),
                service_url,
                timeout,
            )?;
            Some(wrapper)
        }
        None => None,
    };

    info!(
        "running on chain {} as {:#x}",
        chain_id,
        crate::ledger::Ledger::caller(&ledger)
    );
    Ok(ScriptContext {
        address_book,
        orchestrator: ActionOrchestrator::new(ledger, multisig, store, chain_id),
        timeout,
    })
}

/// Read the creation bytecode from a Hardhat or Foundry compilation artifact
///
/// Hardhat stores the bytecode as a hex string under `bytecode`, Foundry as
/// `bytecode.object`.
pub fn read_artifact_bytecode(path: &Path) -> Result<Bytes, ScriptError> {
    let contents =
        fs::read_to_string(path).map_err(|e| ScriptError::ArtifactParsing(e.to_string()))?;
    let artifact: Value =
        serde_json::from_str(&contents).map_err(|e| ScriptError::ArtifactParsing(e.to_string()))?;

    let bytecode = match &artifact["bytecode"] {
        Value::String(hex) => hex.as_str(),
        Value::Object(obj) => obj.get("object").and_then(Value::as_str).unwrap_or_default(),
        _ => "",
    };
    if bytecode.is_empty() || bytecode == "0x" {
        return Err(ScriptError::ArtifactParsing(format!(
            "no bytecode in {}",
            path.display()
        )));
    }

    Bytes::from_str(bytecode).map_err(|e| ScriptError::ArtifactParsing(e.to_string()))
}

/// Parse a `SYMBOL=VALUE` pair given on the command line
pub fn parse_symbol_pair<T>(s: &str) -> Result<(PriceSymbol, T), String>
where
    T: FromStr,
    T::Err: Display,
{
    let (symbol, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected SYMBOL=VALUE, got `{s}`"))?;
    let symbol = symbol.trim().parse::<PriceSymbol>()?;
    let value = value
        .trim()
        .parse::<T>()
        .map_err(|e| format!("invalid value for {symbol}: {e}"))?;

    Ok((symbol, value))
}
