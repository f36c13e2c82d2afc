//! Risk-gated swap dashboard.
//!
//! Polls an on-chain risk signal and a Polymarket "Yes" price, and gates
//! USDC/WETH swaps through a hooked router on the effective risk tier.

pub mod config;
pub mod dashboard;
pub mod feeds;
pub mod onchain;
pub mod swap;
pub mod units;
pub mod wallet;
