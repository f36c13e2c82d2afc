//! Call selectors, calldata encoding and result-word decoding.
//!
//! The contracts we talk to have tiny, fixed interfaces, so calldata is
//! assembled by hand from 4-byte selectors and 32-byte words instead of
//! pulling in a full ABI codec.

use alloy::primitives::{keccak256, Address, Bytes, I256, U256};

/// getTier() -> (uint8 tier, uint256 updatedAt, uint256 confidence)
pub const GET_TIER_SELECTOR: [u8; 4] = [0x5a, 0xd7, 0x01, 0xc2];

/// getEffectiveTier() -> (uint8 tier, bool stale)
pub const GET_EFFECTIVE_TIER_SELECTOR: [u8; 4] = [0x16, 0x2e, 0x55, 0x15];

/// balanceOf(address)
pub const BALANCE_OF_SELECTOR: [u8; 4] = [0x70, 0xa0, 0x82, 0x31];

/// allowance(address,address)
pub const ALLOWANCE_SELECTOR: [u8; 4] = [0xdd, 0x62, 0xed, 0x3e];

/// approve(address,uint256)
pub const APPROVE_SELECTOR: [u8; 4] = [0x09, 0x5e, 0xa7, 0xb3];

/// Error(string), the standard revert payload.
pub const ERROR_STRING_SELECTOR: [u8; 4] = [0x08, 0xc3, 0x79, 0xa0];

pub const SWAP_SIGNATURE: &str = "swap(bool,int256,uint160,uint256)";

/// Custom error the hook raises when the effective tier is Red.
pub const SWAP_BLOCKED_RED_TIER: &str = "SwapBlockedRedTier";

pub const WORD: usize = 32;

/// MIN_SQRT_PRICE + 1 (4295128740).
pub const MIN_SQRT_PRICE_PLUS_1: U256 = U256::from_limbs([4_295_128_740, 0, 0, 0]);

/// MAX_SQRT_PRICE - 1 (1461446703485210103287273052203988822378723970341).
pub const MAX_SQRT_PRICE_MINUS_1: U256 =
    U256::from_limbs([0x5d95_1d52_6398_8d25, 0xefd1_fc6a_5064_8849, 0xfffd_8963, 0]);

/// First four bytes of keccak256(signature).
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Read the `index`-th 32-byte big-endian word, if the payload is long enough.
pub fn word(data: &[u8], index: usize) -> Option<U256> {
    let start = index.checked_mul(WORD)?;
    let end = start.checked_add(WORD)?;
    data.get(start..end).map(U256::from_be_slice)
}

/// Word as u64, saturating on values that don't fit.
pub fn word_u64(data: &[u8], index: usize) -> Option<u64> {
    word(data, index).map(|w| u64::try_from(w).unwrap_or(u64::MAX))
}

fn address_word(addr: Address) -> [u8; 32] {
    let mut out = [0u8; 32];
    out[12..].copy_from_slice(addr.as_slice());
    out
}

struct CallBuilder(Vec<u8>);

impl CallBuilder {
    fn new(selector: [u8; 4]) -> Self {
        let mut buf = Vec::with_capacity(4 + 4 * WORD);
        buf.extend_from_slice(&selector);
        Self(buf)
    }

    fn address(mut self, addr: Address) -> Self {
        self.0.extend_from_slice(&address_word(addr));
        self
    }

    fn uint(mut self, value: U256) -> Self {
        self.0.extend_from_slice(&value.to_be_bytes::<32>());
        self
    }

    fn boolean(self, value: bool) -> Self {
        self.uint(U256::from(value as u8))
    }

    fn int(self, value: I256) -> Self {
        // two's complement is the raw word
        self.uint(value.into_raw())
    }

    fn build(self) -> Bytes {
        Bytes::from(self.0)
    }
}

pub fn get_tier_call() -> Bytes {
    CallBuilder::new(GET_TIER_SELECTOR).build()
}

pub fn get_effective_tier_call() -> Bytes {
    CallBuilder::new(GET_EFFECTIVE_TIER_SELECTOR).build()
}

pub fn balance_of_call(owner: Address) -> Bytes {
    CallBuilder::new(BALANCE_OF_SELECTOR).address(owner).build()
}

pub fn allowance_call(owner: Address, spender: Address) -> Bytes {
    CallBuilder::new(ALLOWANCE_SELECTOR)
        .address(owner)
        .address(spender)
        .build()
}

pub fn approve_call(spender: Address, amount: U256) -> Bytes {
    CallBuilder::new(APPROVE_SELECTOR)
        .address(spender)
        .uint(amount)
        .build()
}

pub fn swap_call(
    zero_for_one: bool,
    amount_specified: I256,
    sqrt_price_limit: U256,
    deadline: U256,
) -> Bytes {
    CallBuilder::new(selector(SWAP_SIGNATURE))
        .boolean(zero_for_one)
        .int(amount_specified)
        .uint(sqrt_price_limit)
        .uint(deadline)
        .build()
}

/// Decode a revert payload into a reason.
///
/// Handles `Error(string)` and the router's `SwapBlockedRedTier()` custom
/// error; anything else is opaque.
pub fn decode_revert(data: &[u8]) -> Option<String> {
    let (sel, body) = (data.get(..4)?, data.get(4..)?);

    if sel == ERROR_STRING_SELECTOR {
        let offset = usize::try_from(word(body, 0)?).ok()?;
        let len_word = body.get(offset..)?;
        let len = usize::try_from(word(len_word, 0)?).ok()?;
        let bytes = len_word.get(WORD..WORD.checked_add(len)?)?;
        return Some(String::from_utf8_lossy(bytes).into_owned());
    }

    let blocked = format!("{SWAP_BLOCKED_RED_TIER}()");
    if sel == selector(&blocked) {
        return Some(SWAP_BLOCKED_RED_TIER.to_string());
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_selectors_match_signatures() {
        assert_eq!(selector("balanceOf(address)"), BALANCE_OF_SELECTOR);
        assert_eq!(selector("allowance(address,address)"), ALLOWANCE_SELECTOR);
        assert_eq!(selector("approve(address,uint256)"), APPROVE_SELECTOR);
        assert_eq!(selector("Error(string)"), ERROR_STRING_SELECTOR);
    }

    #[test]
    fn test_sqrt_price_bounds() {
        assert_eq!(MIN_SQRT_PRICE_PLUS_1.to_string(), "4295128740");
        assert_eq!(
            MAX_SQRT_PRICE_MINUS_1.to_string(),
            "1461446703485210103287273052203988822378723970341"
        );
        assert!(MAX_SQRT_PRICE_MINUS_1 < U256::from(1u8) << 160usize);
    }

    #[test]
    fn test_word_decoding() {
        let mut data = vec![0u8; 64];
        data[31] = 2;
        data[62] = 0x01;
        data[63] = 0x00;
        assert_eq!(word(&data, 0), Some(U256::from(2u8)));
        assert_eq!(word_u64(&data, 1), Some(256));
        assert_eq!(word(&data, 2), None);
    }

    #[test]
    fn test_word_u64_saturates() {
        let data = [0xffu8; 32];
        assert_eq!(word_u64(&data, 0), Some(u64::MAX));
    }

    #[test]
    fn test_allowance_calldata_layout() {
        let owner = Address::from_str("0x1111111111111111111111111111111111111111").unwrap();
        let spender = Address::from_str("0x2222222222222222222222222222222222222222").unwrap();
        let call = allowance_call(owner, spender);
        assert_eq!(call.len(), 4 + 64);
        assert_eq!(&call[..4], &ALLOWANCE_SELECTOR);
        assert!(call[4..16].iter().all(|b| *b == 0));
        assert_eq!(&call[16..36], owner.as_slice());
        assert_eq!(&call[48..68], spender.as_slice());
    }

    #[test]
    fn test_swap_calldata_negative_amount() {
        let amount = I256::try_from(U256::from(1_000_000u64)).unwrap();
        let call = swap_call(true, -amount, MIN_SQRT_PRICE_PLUS_1, U256::from(99u8));
        assert_eq!(call.len(), 4 + 4 * WORD);
        assert_eq!(&call[..4], &selector(SWAP_SIGNATURE));

        let body = &call[4..];
        assert_eq!(word(body, 0), Some(U256::from(1u8)));
        // -1_000_000 as two's complement
        assert_eq!(
            word(body, 1),
            Some(U256::ZERO.wrapping_sub(U256::from(1_000_000u64)))
        );
        assert_eq!(word(body, 2), Some(MIN_SQRT_PRICE_PLUS_1));
        assert_eq!(word(body, 3), Some(U256::from(99u8)));
    }

    #[test]
    fn test_decode_error_string() {
        let reason = "SwapBlockedRedTier";
        let mut data = ERROR_STRING_SELECTOR.to_vec();
        data.extend_from_slice(&U256::from(32u8).to_be_bytes::<32>());
        data.extend_from_slice(&U256::from(reason.len()).to_be_bytes::<32>());
        let mut padded = reason.as_bytes().to_vec();
        padded.resize(32, 0);
        data.extend_from_slice(&padded);

        assert_eq!(decode_revert(&data).as_deref(), Some(reason));
    }

    #[test]
    fn test_decode_custom_error() {
        let data = selector("SwapBlockedRedTier()");
        assert_eq!(decode_revert(&data).as_deref(), Some(SWAP_BLOCKED_RED_TIER));
        assert_eq!(decode_revert(&[0xde, 0xad, 0xbe, 0xef]), None);
        assert_eq!(decode_revert(&[0x01]), None);
    }
}
