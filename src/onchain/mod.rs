//! On-chain reads for the risk-gated swap dashboard.
//!
//! Architecture:
//! - `ReadTransport`: the one shared read client (JSON-RPC `eth_call` plus
//!   HTTP GET), injected everywhere a read happens
//! - `RiskSignalReader`: polls `getTier()` / `getEffectiveTier()` and builds an
//!   `OnChainState` snapshot
//! - `TokenReader`: ERC-20 balance and allowance lookups
//! - `abi`: selectors, calldata builders, word and revert decoding

pub mod abi;
pub mod state;
pub mod tokens;
pub mod transport;
pub mod types;

pub use state::RiskSignalReader;
pub use tokens::TokenReader;
pub use transport::{HttpTransport, ReadTransport, TransportError};
pub use types::{OnChainState, RiskTier};
