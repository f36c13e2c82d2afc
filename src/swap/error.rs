use crate::onchain::abi::{self, SWAP_BLOCKED_RED_TIER};
use crate::units::UnitsError;
use crate::wallet::{WalletError, USER_REJECTED};
use thiserror::Error;

pub const BLOCKED_MESSAGE: &str = "Swap blocked \u{2014} Red tier active";

#[derive(Error, Debug)]
pub enum SwapError {
    #[error("no wallet provider injected")]
    ProviderMissing,
    #[error("wallet not connected")]
    WalletNotConnected,
    #[error("wallet connection failed: {0}")]
    ConnectionFailed(String),
    #[error("wallet on wrong network (want chain {expected})")]
    NetworkMismatch { expected: u64 },
    #[error("read unavailable: {0}")]
    ReadUnavailable(String),
    #[error(transparent)]
    InvalidAmount(#[from] UnitsError),
    #[error("allowance below requested amount")]
    InsufficientAllowance,
    #[error("swaps blocked while effective tier is Red")]
    TierBlocked,
    #[error("rejected: {0}")]
    Rejected(String),
    #[error("reverted: {0}")]
    RevertReason(String),
    #[error("transaction reverted")]
    Reverted,
}

impl SwapError {
    /// Text for the status line.
    pub fn user_message(&self) -> String {
        match self {
            SwapError::ProviderMissing => "Install a wallet to swap".to_string(),
            SwapError::WalletNotConnected => "Connect wallet first".to_string(),
            SwapError::ConnectionFailed(_) => "Wallet connection failed".to_string(),
            SwapError::NetworkMismatch { expected } => {
                format!("Wrong network \u{2014} switch to chain {expected}")
            }
            SwapError::ReadUnavailable(reason) => format!("Could not read allowance: {reason}"),
            SwapError::InvalidAmount(e) => e.to_string(),
            SwapError::InsufficientAllowance => "Approve tokens first".to_string(),
            SwapError::TierBlocked => BLOCKED_MESSAGE.to_string(),
            SwapError::RevertReason(reason) if reason == SWAP_BLOCKED_RED_TIER => {
                BLOCKED_MESSAGE.to_string()
            }
            SwapError::RevertReason(reason) => reason.clone(),
            SwapError::Rejected(message) => message.clone(),
            SwapError::Reverted => "Transaction reverted".to_string(),
        }
    }
}

impl From<WalletError> for SwapError {
    fn from(err: WalletError) -> Self {
        match err {
            WalletError::Rpc { code, message, .. } if code == USER_REJECTED => {
                SwapError::Rejected(message)
            }
            WalletError::Rpc { message, data, .. } => {
                if let Some(reason) = data.as_ref().and_then(|d| abi::decode_revert(d)) {
                    return SwapError::RevertReason(reason);
                }
                match message.strip_prefix("execution reverted: ") {
                    Some(reason) => {
                        // custom errors come back as "Name()"
                        let reason = reason.trim();
                        let reason = reason.strip_suffix("()").unwrap_or(reason);
                        SwapError::RevertReason(reason.to_string())
                    }
                    None => SwapError::Rejected(message),
                }
            }
            other => SwapError::Rejected(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::Bytes;

    fn rpc(code: i64, message: &str, data: Option<Vec<u8>>) -> WalletError {
        WalletError::Rpc {
            code,
            message: message.to_string(),
            data: data.map(Bytes::from),
        }
    }

    #[test]
    fn test_blocked_revert_maps() {
        let data = abi::selector("SwapBlockedRedTier()").to_vec();
        let err = SwapError::from(rpc(3, "execution reverted", Some(data)));
        assert!(matches!(err, SwapError::RevertReason(ref r) if r == SWAP_BLOCKED_RED_TIER));
        assert_eq!(err.user_message(), BLOCKED_MESSAGE);

        let err = SwapError::from(rpc(-32000, "execution reverted: SwapBlockedRedTier", None));
        assert_eq!(err.user_message(), BLOCKED_MESSAGE);
    }

    #[test]
    fn test_blocked_custom_error_in_message() {
        let err = SwapError::from(rpc(
            -32000,
            "execution reverted: SwapBlockedRedTier()",
            None,
        ));
        assert!(matches!(err, SwapError::RevertReason(ref r) if r == SWAP_BLOCKED_RED_TIER));
        assert_eq!(err.user_message(), BLOCKED_MESSAGE);
    }

    #[test]
    fn test_other_reasons_pass_through() {
        let err = SwapError::from(rpc(-32000, "execution reverted: STF", None));
        assert_eq!(err.user_message(), "STF");

        let err = SwapError::from(rpc(USER_REJECTED, "User denied transaction signature", None));
        assert!(matches!(err, SwapError::Rejected(_)));
        assert_eq!(err.user_message(), "User denied transaction signature");

        let err = SwapError::from(rpc(-32603, "insufficient funds for gas", None));
        assert_eq!(err.user_message(), "insufficient funds for gas");
    }

    #[test]
    fn test_blocked_match_is_exact() {
        let err = SwapError::RevertReason("SwapBlockedRedTierV2".to_string());
        assert_eq!(err.user_message(), "SwapBlockedRedTierV2");
    }
}
