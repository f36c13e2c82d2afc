//! Risk-signal aggregator: two reads, one snapshot.

use crate::onchain::abi;
use crate::onchain::transport::{ReadTransport, TransportError};
use crate::onchain::types::OnChainState;
use alloy::primitives::Address;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum StateError {
    #[error("getTier() unavailable: {0}")]
    Tier(TransportError),
    #[error("getEffectiveTier() unavailable: {0}")]
    EffectiveTier(TransportError),
    #[error("short return data from risk signal")]
    ShortReturn,
}

#[derive(Clone)]
pub struct RiskSignalReader {
    transport: Arc<dyn ReadTransport>,
    risk_signal: Address,
}

impl RiskSignalReader {
    pub fn new(transport: Arc<dyn ReadTransport>, risk_signal: Address) -> Self {
        Self {
            transport,
            risk_signal,
        }
    }

    /// Read both tier views concurrently. Either failing makes the whole
    /// snapshot unavailable; there is no partial result and no retry.
    pub async fn fetch(&self) -> Result<OnChainState, StateError> {
        let (tier, effective) = tokio::join!(
            self.transport
                .eth_call(self.risk_signal, abi::get_tier_call()),
            self.transport
                .eth_call(self.risk_signal, abi::get_effective_tier_call()),
        );

        let tier = tier.map_err(StateError::Tier)?;
        let effective = effective.map_err(StateError::EffectiveTier)?;

        let state = OnChainState::decode(&tier, &effective).ok_or_else(|| {
            warn!(
                tier_len = tier.len(),
                effective_len = effective.len(),
                "risk signal returned short data"
            );
            StateError::ShortReturn
        })?;

        debug!(
            raw = state.raw_tier,
            effective = state.effective_tier,
            confidence = state.confidence,
            stale = state.is_stale,
            "risk signal polled"
        );
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::onchain::transport::mock::MockTransport;
    use crate::onchain::types::{encode_words, RiskTier};
    use std::str::FromStr;

    fn signal() -> Address {
        Address::from_str("0x7EA6F46b1005B1356524148CDDE4567192301B6e").unwrap()
    }

    #[tokio::test]
    async fn test_fetch_both_present() {
        let mock = Arc::new(MockTransport::new());
        mock.set_call(signal(), abi::get_tier_call(), encode_words(&[0, 1_700_000_000, 5000]));
        mock.set_call(signal(), abi::get_effective_tier_call(), encode_words(&[2, 1]));

        let reader = RiskSignalReader::new(mock.clone(), signal());
        let state = reader.fetch().await.unwrap();
        assert_eq!(state.raw_tier, 0);
        assert_eq!(state.tier(), RiskTier::Red);
        assert!(state.is_stale);
        assert_eq!(mock.calls(), 2);
    }

    #[tokio::test]
    async fn test_fetch_missing_effective() {
        let mock = Arc::new(MockTransport::new());
        mock.set_call(signal(), abi::get_tier_call(), encode_words(&[1, 1, 1]));

        let reader = RiskSignalReader::new(mock, signal());
        assert!(matches!(
            reader.fetch().await,
            Err(StateError::EffectiveTier(_))
        ));
    }

    #[tokio::test]
    async fn test_fetch_short_return() {
        let mock = Arc::new(MockTransport::new());
        mock.set_call(signal(), abi::get_tier_call(), encode_words(&[1]));
        mock.set_call(signal(), abi::get_effective_tier_call(), encode_words(&[1, 0]));

        let reader = RiskSignalReader::new(mock, signal());
        assert!(matches!(reader.fetch().await, Err(StateError::ShortReturn)));
    }
}
