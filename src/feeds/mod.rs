//! Off-chain signal feeds.

pub mod polymarket;

pub use polymarket::{FeedError, PredictionFetcher};
