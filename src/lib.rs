//! ethdash - a terminal dashboard for an Ethereum wallet.
//!
//! This library provides:
//! - Wallet sessions over a JSON-RPC provider or an in-process simulated chain
//! - A confirmation tracker that follows submitted transfers to a final status
//! - A chain watcher reporting new blocks and wallet account/chain changes
//! - Ether amount and address handling

pub mod config;
pub mod domain;
pub mod infra;
