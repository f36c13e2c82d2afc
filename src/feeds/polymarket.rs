//! Polymarket CLOB price for a single condition.
//!
//! Reads `GET {clob}/markets/{condition_id}` and returns the price of the
//! token labelled exactly "Yes". No retries: a failed poll just leaves the
//! previous value on screen until the next one succeeds.

use crate::onchain::transport::{ReadTransport, TransportError};
use alloy::primitives::B256;
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

const YES_OUTCOME: &str = "Yes";

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("request failed: {0}")]
    Transport(#[from] TransportError),
    #[error("malformed market body: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("no \"Yes\" outcome in market")]
    NoYesToken,
    #[error("price out of range: {0}")]
    OutOfRange(f64),
}

/// CLOB market response (subset of fields we need).
#[derive(Debug, Deserialize)]
struct ClobMarket {
    #[serde(default)]
    tokens: Vec<ClobToken>,
}

#[derive(Debug, Deserialize)]
struct ClobToken {
    #[serde(default)]
    outcome: String,
    #[serde(default)]
    price: Option<f64>,
}

#[derive(Clone)]
pub struct PredictionFetcher {
    transport: Arc<dyn ReadTransport>,
    clob_url: String,
    condition_id: B256,
}

impl PredictionFetcher {
    pub fn new(transport: Arc<dyn ReadTransport>, clob_url: String, condition_id: B256) -> Self {
        Self {
            transport,
            clob_url,
            condition_id,
        }
    }

    pub fn market_url(&self) -> String {
        format!("{}/markets/{}", self.clob_url, self.condition_id)
    }

    /// Probability in `[0, 1]` that the market resolves "Yes".
    pub async fn fetch_probability(&self) -> Result<f64, FeedError> {
        let body = self.transport.get_json(&self.market_url()).await?;
        let market: ClobMarket = serde_json::from_value(body)?;
        let prob = yes_price(&market)?;
        debug!(condition = %self.condition_id, prob, "prediction market polled");
        Ok(prob)
    }
}

fn yes_price(market: &ClobMarket) -> Result<f64, FeedError> {
    let price = market
        .tokens
        .iter()
        .find(|t| t.outcome == YES_OUTCOME)
        .and_then(|t| t.price)
        .ok_or(FeedError::NoYesToken)?;

    if !price.is_finite() || !(0.0..=1.0).contains(&price) {
        return Err(FeedError::OutOfRange(price));
    }
    Ok(price)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::onchain::transport::mock::MockTransport;
    use serde_json::json;
    use std::str::FromStr;

    fn fetcher(mock: Arc<MockTransport>) -> PredictionFetcher {
        PredictionFetcher::new(
            mock,
            "https://clob.example".to_string(),
            B256::from_str("0xa2e0e21aab2d6dbdae148134b816c461b6582d216fdc2a783a107b44018713ee")
                .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_yes_price_extracted() {
        let mock = Arc::new(MockTransport::new());
        let f = fetcher(mock.clone());
        mock.set_json(
            &f.market_url(),
            json!({ "tokens": [
                { "outcome": "No", "price": 0.97 },
                { "outcome": "Yes", "price": 0.03 }
            ]}),
        );
        assert_eq!(f.fetch_probability().await.unwrap(), 0.03);
    }

    #[tokio::test]
    async fn test_label_must_match_exactly() {
        let mock = Arc::new(MockTransport::new());
        let f = fetcher(mock.clone());
        mock.set_json(
            &f.market_url(),
            json!({ "tokens": [{ "outcome": "YES", "price": 0.4 }] }),
        );
        assert!(matches!(f.fetch_probability().await, Err(FeedError::NoYesToken)));
    }

    #[tokio::test]
    async fn test_unavailable_paths() {
        let mock = Arc::new(MockTransport::new());
        let f = fetcher(mock.clone());
        assert!(matches!(f.fetch_probability().await, Err(FeedError::Transport(_))));

        mock.set_json(&f.market_url(), json!({ "tokens": "nope" }));
        assert!(matches!(f.fetch_probability().await, Err(FeedError::Parse(_))));

        mock.set_json(&f.market_url(), json!({ "tokens": [{ "outcome": "Yes", "price": 1.7 }] }));
        assert!(matches!(f.fetch_probability().await, Err(FeedError::OutOfRange(_))));
    }

    #[test]
    fn test_market_url() {
        let f = fetcher(Arc::new(MockTransport::new()));
        assert_eq!(
            f.market_url(),
            "https://clob.example/markets/0xa2e0e21aab2d6dbdae148134b816c461b6582d216fdc2a783a107b44018713ee"
        );
    }
}
