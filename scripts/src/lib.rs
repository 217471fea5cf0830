//! Scripts for deploying and operating the PLP liquidity contracts.
//!
//! Every on-chain action runs through the [`orchestrator::ActionOrchestrator`],
//! which routes privileged calls to the owning multisig and records deployed
//! contracts in the chain's address book.

#![deny(missing_docs)]
#![deny(clippy::missing_docs_in_private_items)]

pub mod actions;
pub mod address_book;
pub mod authority;
pub mod cli;
mod commands;
pub mod constants;
pub mod errors;
pub mod ledger;
pub mod multisig;
pub mod oracle;
pub mod orchestrator;
pub mod price;
mod solidity;
pub mod types;
pub mod utils;
