//! Risk-signal snapshot types.

use crate::onchain::abi;

/// Risk tier as the hook sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RiskTier {
    Green,
    Amber,
    Red,
}

impl RiskTier {
    /// Anything above 2 fails closed to Red.
    pub fn from_index(index: u64) -> Self {
        match index {
            0 => RiskTier::Green,
            1 => RiskTier::Amber,
            _ => RiskTier::Red,
        }
    }

    pub fn index(self) -> usize {
        match self {
            RiskTier::Green => 0,
            RiskTier::Amber => 1,
            RiskTier::Red => 2,
        }
    }

    pub fn blocks_swaps(self) -> bool {
        self == RiskTier::Red
    }
}

impl std::fmt::Display for RiskTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskTier::Green => write!(f, "Green"),
            RiskTier::Amber => write!(f, "Amber"),
            RiskTier::Red => write!(f, "Red"),
        }
    }
}

/// One poll's worth of risk-signal state. Replaced wholesale, never merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OnChainState {
    /// Tier last written by the updater.
    pub raw_tier: u64,
    /// Tier after the contract's staleness escalation. Gate on this one.
    pub effective_tier: u64,
    /// Unix seconds of the last update; 0 = never updated.
    pub updated_at: u64,
    /// Basis points, 0..=10000.
    pub confidence: u64,
    pub is_stale: bool,
}

impl OnChainState {
    /// Decode the `getTier()` and `getEffectiveTier()` return payloads.
    ///
    /// `None` if either payload is short.
    pub fn decode(tier_data: &[u8], effective_data: &[u8]) -> Option<Self> {
        Some(Self {
            raw_tier: abi::word_u64(tier_data, 0)?,
            updated_at: abi::word_u64(tier_data, 1)?,
            confidence: abi::word_u64(tier_data, 2)?,
            effective_tier: abi::word_u64(effective_data, 0)?,
            is_stale: abi::word_u64(effective_data, 1)? == 1,
        })
    }

    pub fn tier(&self) -> RiskTier {
        RiskTier::from_index(self.effective_tier)
    }

    pub fn has_update(&self) -> bool {
        self.updated_at > 0
    }

    /// Seconds since the last update, or `None` if it never happened.
    pub fn age_secs(&self, now: u64) -> Option<u64> {
        self.has_update()
            .then(|| now.saturating_sub(self.updated_at))
    }
}

impl std::fmt::Display for OnChainState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "OnChainState(tier={}, raw={}, conf={}bps, stale={})",
            self.tier(),
            self.raw_tier,
            self.confidence,
            self.is_stale
        )
    }
}

#[cfg(test)]
pub(crate) fn encode_words(words: &[u64]) -> Vec<u8> {
    words
        .iter()
        .flat_map(|w| alloy::primitives::U256::from(*w).to_be_bytes::<32>())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_snapshot() {
        let tier = encode_words(&[1, 1_700_000_000, 8000]);
        let eff = encode_words(&[1, 0]);
        let state = OnChainState::decode(&tier, &eff).unwrap();
        assert_eq!(state.raw_tier, 1);
        assert_eq!(state.updated_at, 1_700_000_000);
        assert_eq!(state.confidence, 8000);
        assert_eq!(state.tier(), RiskTier::Amber);
        assert!(!state.is_stale);

        // same bytes, same answer
        assert_eq!(OnChainState::decode(&tier, &eff), Some(state));
    }

    #[test]
    fn test_effective_tier_wins() {
        let tier = encode_words(&[0, 1_700_000_000, 9000]);
        let eff = encode_words(&[2, 1]);
        let state = OnChainState::decode(&tier, &eff).unwrap();
        assert_eq!(state.raw_tier, 0);
        assert_eq!(state.tier(), RiskTier::Red);
        assert!(state.tier().blocks_swaps());
        assert!(state.is_stale);
    }

    #[test]
    fn test_short_payload() {
        let tier = encode_words(&[1, 2]);
        let eff = encode_words(&[1, 0]);
        assert_eq!(OnChainState::decode(&tier, &eff), None);
        assert_eq!(OnChainState::decode(&encode_words(&[1, 2, 3]), &[]), None);
    }

    #[test]
    fn test_age_never_updated() {
        let state = OnChainState {
            raw_tier: 0,
            effective_tier: 0,
            updated_at: 0,
            confidence: 0,
            is_stale: false,
        };
        assert_eq!(state.age_secs(1_700_000_000), None);

        let updated = OnChainState {
            updated_at: 1_000,
            ..state
        };
        assert_eq!(updated.age_secs(1_120), Some(120));
    }

    #[test]
    fn test_tier_from_index() {
        assert_eq!(RiskTier::from_index(0), RiskTier::Green);
        assert_eq!(RiskTier::from_index(7), RiskTier::Red);
        assert_eq!(RiskTier::Amber.index(), 1);
    }
}
