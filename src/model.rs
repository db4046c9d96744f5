//! Definition of most types used by the client.

use derive_more::Display;
use serde::{Deserialize, Serialize};

pub mod nft;
pub mod units;

pub use alloy_primitives::{Address, U256, U512};
pub use nft::NftItem;

/// Decimals of the gold-pegged token (GOF).
pub const GOF_DECIMALS: u32 = 18;
/// Decimals of the collateral token.
pub const COLLATERAL_DECIMALS: u32 = 6;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, Hash, Display)]
pub struct TxHash(pub String);

impl From<&str> for TxHash {
    fn from(s: &str) -> Self {
        TxHash(s.into())
    }
}

/// Full `0x`-prefixed lowercase hex, as expected by JSON-RPC nodes.
pub fn address_hex(address: &Address) -> String {
    format!("0x{}", hex::encode(address.as_slice()))
}
