//! Boolean gates deciding which actions are available.

use crate::model::U256;

/// True only when both values are known and the allowance covers the requirement.
/// An unresolved requirement never reads as "nothing to approve".
pub fn can_mint(required: Option<U256>, allowance: Option<U256>) -> bool {
    match (required, allowance) {
        (Some(required), Some(allowance)) => allowance >= required,
        _ => false,
    }
}

/// What the user can currently trigger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActionAvailability {
    pub approve: bool,
    pub mint: bool,
    pub redeem: bool,
    pub nft_approve: bool,
    pub nft_mint: bool,
}
