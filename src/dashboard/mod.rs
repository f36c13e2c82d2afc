//! Dashboard view model.
//!
//! Turns a `SwapState` snapshot into the strings and tones the dashboard
//! renders: tier card, on-chain details card, prediction card, fee policy
//! table, contracts card and the swap card's balances and primary action. Everything here is
//! pure; the caller supplies the clock.

use crate::config::{Deployment, TokenSpec};
use crate::onchain::{OnChainState, RiskTier};
use crate::swap::SwapState;
use crate::units::format_fixed;
use alloy::primitives::Address;
use chrono::{DateTime, Utc};
use serde::Serialize;

pub const PLACEHOLDER: &str = "\u{2014}";

/// One row of the fee policy card.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct FeePolicyRow {
    pub tier: &'static str,
    pub fee: &'static str,
    pub threshold: &'static str,
}

/// Fee per tier and the prediction-probability band that maps to it.
pub const FEE_POLICY: [FeePolicyRow; 3] = [
    FeePolicyRow {
        tier: "Green",
        fee: "0.30%",
        threshold: "< 10%",
    },
    FeePolicyRow {
        tier: "Amber",
        fee: "1.00%",
        threshold: "10\u{2013}24%",
    },
    FeePolicyRow {
        tier: "Red",
        fee: "Blocked",
        threshold: "\u{2265} 25%",
    },
];

pub fn tier_name(tier: Option<RiskTier>) -> &'static str {
    match tier {
        Some(t) => FEE_POLICY[t.index()].tier,
        None => PLACEHOLDER,
    }
}

pub fn tier_label(tier: Option<RiskTier>) -> &'static str {
    match tier {
        Some(RiskTier::Green) => "Low Risk",
        Some(RiskTier::Amber) => "Medium Risk",
        Some(RiskTier::Red) => "High Risk",
        None => "Loading...",
    }
}

pub fn fee_label(tier: Option<RiskTier>) -> &'static str {
    match tier {
        Some(t) => FEE_POLICY[t.index()].fee,
        None => PLACEHOLDER,
    }
}

pub fn tier_description(tier: Option<RiskTier>) -> &'static str {
    match tier {
        Some(RiskTier::Green) => "Swaps allowed \u{2014} Normal fees (0.30%)",
        Some(RiskTier::Amber) => "Swaps allowed \u{2014} Elevated fees (1.00%)",
        Some(RiskTier::Red) => "Swaps Blocked \u{2014} Risk level too high",
        None => "Reading risk signal...",
    }
}

/// Suffix on the tier card when the effective tier came from stale-signal
/// escalation rather than a fresh update.
pub fn effective_note(state: Option<&OnChainState>) -> &'static str {
    match state {
        Some(s) if s.is_stale => " (escalated from stale signal)",
        _ => "",
    }
}

pub fn confidence_text(state: Option<&OnChainState>) -> String {
    match state {
        Some(s) => format!("{} bps ({:.2}%)", s.confidence, s.confidence as f64 / 100.0),
        None => PLACEHOLDER.to_string(),
    }
}

pub fn updated_at_text(state: Option<&OnChainState>) -> String {
    let Some(s) = state else {
        return PLACEHOLDER.to_string();
    };
    if !s.has_update() {
        return "Never".to_string();
    }
    i64::try_from(s.updated_at)
        .ok()
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| PLACEHOLDER.to_string())
}

/// "1h 2m 3s ago", hours dropped when zero and minutes dropped when both are.
pub fn format_age(age_secs: u64) -> String {
    let hrs = age_secs / 3600;
    let mins = (age_secs % 3600) / 60;
    let secs = age_secs % 60;

    let mut parts = Vec::with_capacity(3);
    if hrs > 0 {
        parts.push(format!("{hrs}h"));
    }
    if mins > 0 || hrs > 0 {
        parts.push(format!("{mins}m"));
    }
    parts.push(format!("{secs}s"));
    format!("{} ago", parts.join(" "))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Tone {
    Fresh,
    Stale,
    Neutral,
}

pub fn staleness_text(state: Option<&OnChainState>, now: u64) -> (String, Tone) {
    let Some(s) = state else {
        return (PLACEHOLDER.to_string(), Tone::Neutral);
    };
    match s.age_secs(now) {
        Some(age) => {
            let tone = if s.is_stale { Tone::Stale } else { Tone::Fresh };
            (format_age(age), tone)
        }
        None => ("N/A".to_string(), Tone::Neutral),
    }
}

/// Bar color of the prediction card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FillClass {
    Emerald,
    Amber,
    Red,
    Muted,
}

pub fn probability_fill(prob: Option<f64>) -> FillClass {
    match prob {
        None => FillClass::Muted,
        Some(p) if p < 0.10 => FillClass::Emerald,
        Some(p) if p < 0.25 => FillClass::Amber,
        Some(_) => FillClass::Red,
    }
}

pub fn probability_text(prob: Option<f64>) -> String {
    match prob {
        Some(p) => format!("{:.1}%", p * 100.0),
        None => PLACEHOLDER.to_string(),
    }
}

/// "0x7EA6...1B6e"
pub fn shorten_address(address: &Address) -> String {
    let full = address.to_string();
    format!("{}...{}", &full[..6], &full[full.len() - 4..])
}

/// One line of the contracts card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContractRow {
    pub label: &'static str,
    pub short: String,
    pub url: String,
}

pub fn contract_rows(deployment: &Deployment) -> Vec<ContractRow> {
    deployment
        .contracts()
        .into_iter()
        .map(|(label, address)| ContractRow {
            label,
            short: shorten_address(&address),
            url: deployment.address_url(&address),
        })
        .collect()
}

/// What the swap card's button does right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SwapAction {
    Blocked,
    Connect,
    EnterAmount,
    Approve,
    Swap,
}

pub fn swap_action(state: &SwapState) -> SwapAction {
    if state.tier().is_some_and(RiskTier::blocks_swaps) {
        SwapAction::Blocked
    } else if state.session().is_none() {
        SwapAction::Connect
    } else if !state.has_amount() {
        SwapAction::EnterAmount
    } else if !state.approved {
        SwapAction::Approve
    } else {
        SwapAction::Swap
    }
}

/// Everything rendered at one instant.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub tier: &'static str,
    pub tier_label: &'static str,
    pub tier_description: &'static str,
    pub effective_note: &'static str,
    pub fee: &'static str,
    pub raw_tier: Option<u64>,
    pub confidence: String,
    pub updated_at: String,
    pub staleness: String,
    pub staleness_tone: Tone,
    pub probability: String,
    pub probability_fill: FillClass,
    pub market_title: String,
    pub market_url: String,
    pub contracts: Vec<ContractRow>,
    pub account: Option<String>,
    pub network_ok: bool,
    pub sell: String,
    pub buy: String,
    pub sell_balance: String,
    pub buy_balance: String,
    pub action: SwapAction,
    pub status: String,
    pub tx_url: Option<String>,
}

impl DashboardView {
    pub fn build(state: &SwapState, deployment: &Deployment, now: u64) -> Self {
        let tier = state.tier();
        let on_chain = state.on_chain.as_ref();
        let (staleness, staleness_tone) = staleness_text(on_chain, now);
        let session = state.session();

        let sell = state.direction.sell_token(deployment);
        let buy = state.direction.buy_token(deployment);
        let balance = |token: TokenSpec| {
            let places = if token == deployment.usdc { 2 } else { 6 };
            let raw = state.balances.of(&token, deployment);
            format!("{} {}", format_fixed(raw, token.decimals, places), token.symbol)
        };

        Self {
            tier: tier_name(tier),
            tier_label: tier_label(tier),
            tier_description: tier_description(tier),
            effective_note: effective_note(on_chain),
            fee: fee_label(tier),
            raw_tier: on_chain.map(|s| s.raw_tier),
            confidence: confidence_text(on_chain),
            updated_at: updated_at_text(on_chain),
            staleness,
            staleness_tone,
            probability: probability_text(state.probability),
            probability_fill: probability_fill(state.probability),
            market_title: deployment.market_title.clone(),
            market_url: deployment.market_page_url.clone(),
            contracts: contract_rows(deployment),
            account: session.map(|s| s.address.to_string()),
            network_ok: session.is_some_and(|s| s.network_matches),
            sell: sell.symbol.to_string(),
            buy: buy.symbol.to_string(),
            sell_balance: balance(sell),
            buy_balance: balance(buy),
            action: swap_action(state),
            status: state.status.text.clone(),
            tx_url: state.status.tx_hash.map(|h| deployment.tx_url(&h)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::onchain::types::encode_words;
    use crate::swap::{Balances, ConnectionState, SwapDirection, SwapStatus, WalletSession};
    use alloy::primitives::{Address, B256, U256};

    const NOW: u64 = 1_700_000_000;

    fn snapshot(raw: u64, effective: u64, updated_at: u64, confidence: u64, stale: bool) -> OnChainState {
        OnChainState::decode(
            &encode_words(&[raw, updated_at, confidence]),
            &encode_words(&[effective, stale as u64]),
        )
        .unwrap()
    }

    #[test]
    fn test_amber_card() {
        let s = snapshot(1, 1, NOW - 120, 8000, false);
        let tier = Some(s.tier());
        assert_eq!(tier_name(tier), "Amber");
        assert_eq!(tier_label(tier), "Medium Risk");
        assert_eq!(fee_label(tier), "1.00%");
        assert_eq!(confidence_text(Some(&s)), "8000 bps (80.00%)");
        assert_eq!(
            staleness_text(Some(&s), NOW),
            ("2m 0s ago".to_string(), Tone::Fresh)
        );
    }

    #[test]
    fn test_never_updated() {
        let s = snapshot(0, 0, 0, 0, false);
        assert_eq!(updated_at_text(Some(&s)), "Never");
        assert_eq!(staleness_text(Some(&s), NOW), ("N/A".to_string(), Tone::Neutral));
        assert_eq!(updated_at_text(None), PLACEHOLDER);
        assert_eq!(fee_label(None), PLACEHOLDER);
    }

    #[test]
    fn test_updated_at_is_utc() {
        let s = snapshot(0, 0, NOW, 0, false);
        assert_eq!(updated_at_text(Some(&s)), "2023-11-14 22:13:20 UTC");
    }

    #[test]
    fn test_effective_note_only_when_stale() {
        let fresh = snapshot(1, 1, NOW - 120, 8000, false);
        assert_eq!(effective_note(Some(&fresh)), "");
        assert_eq!(effective_note(None), "");
    }

    #[test]
    fn test_contracts_card() {
        let d = Deployment::arbitrum_sepolia().unwrap();
        let rows = contract_rows(&d);
        assert_eq!(rows.len(), 4);

        assert_eq!(rows[0].label, "RiskSignal");
        assert_eq!(rows[0].short.to_lowercase(), "0x7ea6...1b6e");
        assert_eq!(
            rows[0].url.to_lowercase(),
            "https://sepolia.arbiscan.io/address/0x7ea6f46b1005b1356524148cdde4567192301b6e"
        );

        assert_eq!(rows[1].label, "PredictionHook");
        assert_eq!(rows[1].short.to_lowercase(), "0x5cd3...4080");
        assert_eq!(rows[2].label, "PredictionRouter");
        assert_eq!(rows[2].short.to_lowercase(), "0xa2f8...c152");
        assert_eq!(rows[3].label, "Receiver");
        assert_eq!(rows[3].short.to_lowercase(), "0x0cdb...4433");
    }

    #[test]
    fn test_age_formatting() {
        assert_eq!(format_age(0), "0s ago");
        assert_eq!(format_age(59), "59s ago");
        assert_eq!(format_age(3600), "1h 0m 0s ago");
        assert_eq!(format_age(3725), "1h 2m 5s ago");
    }

    #[test]
    fn test_stale_tone() {
        let s = snapshot(0, 2, NOW - 7200, 5000, true);
        assert_eq!(staleness_text(Some(&s), NOW).1, Tone::Stale);
        assert_eq!(effective_note(Some(&s)), " (escalated from stale signal)");
        assert_eq!(tier_name(Some(s.tier())), "Red");
        assert_eq!(fee_label(Some(s.tier())), "Blocked");
    }

    #[test]
    fn test_probability_bands() {
        assert_eq!(probability_fill(Some(0.03)), FillClass::Emerald);
        assert_eq!(probability_fill(Some(0.10)), FillClass::Amber);
        assert_eq!(probability_fill(Some(0.2499)), FillClass::Amber);
        assert_eq!(probability_fill(Some(0.25)), FillClass::Red);
        assert_eq!(probability_fill(None), FillClass::Muted);
        assert_eq!(probability_text(Some(0.03)), "3.0%");
    }

    #[test]
    fn test_swap_action_order() {
        let mut state = SwapState::default();
        assert_eq!(swap_action(&state), SwapAction::Connect);

        state.connection = ConnectionState::Connected(WalletSession {
            address: Address::repeat_byte(1),
            network_matches: true,
        });
        assert_eq!(swap_action(&state), SwapAction::EnterAmount);

        state.sell_amount = "5".to_string();
        assert_eq!(swap_action(&state), SwapAction::Approve);

        state.approved = true;
        assert_eq!(swap_action(&state), SwapAction::Swap);

        state.on_chain = Some(snapshot(0, 2, NOW, 0, true));
        assert_eq!(swap_action(&state), SwapAction::Blocked);
    }

    #[test]
    fn test_view_balances_follow_direction() {
        let d = Deployment::arbitrum_sepolia().unwrap();
        let mut state = SwapState {
            balances: Balances {
                usdc: U256::from(1_234_567u64),
                weth: U256::from(1_500_000_000_000_000_000u64),
            },
            ..Default::default()
        };

        let view = DashboardView::build(&state, &d, NOW);
        assert_eq!(view.sell_balance, "1.23 USDC");
        assert_eq!(view.buy_balance, "1.500000 WETH");
        assert_eq!(view.tier, PLACEHOLDER);
        assert_eq!(view.action, SwapAction::Connect);
        assert_eq!(view.contracts.len(), 4);
        assert_eq!(view.market_title, "Will ETH dip to $1,600?");
        assert!(view.market_url.starts_with("https://polymarket.com/event/"));
        assert_eq!(view.effective_note, "");

        state.direction = SwapDirection::SELL_WETH;
        state.status = SwapStatus::success("Swap confirmed!").with_hash(B256::repeat_byte(0x22));
        let view = DashboardView::build(&state, &d, NOW);
        assert_eq!(view.sell, "WETH");
        assert_eq!(view.sell_balance, "1.500000 WETH");
        assert_eq!(view.status, "Swap confirmed!");
        assert!(view.tx_url.unwrap().starts_with("https://sepolia.arbiscan.io/tx/0x2222"));
    }
}
