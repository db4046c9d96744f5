//! Estimation of the collateral received when redeeming GOF.
//!
//! Every step truncates toward zero, in a fixed order, so the figure shown to the user
//! matches the integer arithmetic the GOF contract performs on `redeem`.

use alloy_primitives::ruint::UintTryFrom;

use crate::model::{
    units::{exp10, format_units, parse_units},
    COLLATERAL_DECIMALS, GOF_DECIMALS, U256, U512,
};

/// Digits shown for a redeem estimate.
pub const ESTIMATE_DISPLAY_DECIMALS: u32 = 4;

const PERCENT: u64 = 100;
const BPS: u64 = 10_000;

/// The on-chain values a redeem estimate depends on. `None` means the query has not
/// resolved yet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RedeemQuote {
    /// Gold price scaled by 1e18.
    pub gold_price: Option<U256>,
    /// Share of the gross value backed by collateral, in percent.
    pub collateral_ratio_pct: Option<U256>,
    /// Redeem fee in basis points.
    pub redeem_fee_bps: Option<U256>,
}

/// Intermediate values of the estimate, in computation order. Only the amount and the
/// final estimate have to fit 256 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedeemBreakdown {
    pub amount_wei: U256,
    pub gross_value: U512,
    pub collateral18: U512,
    pub collateral6: U512,
    pub fee6: U512,
    pub estimate: U256,
}

impl RedeemQuote {
    pub fn is_complete(&self) -> bool {
        self.gold_price.is_some()
            && self.collateral_ratio_pct.is_some()
            && self.redeem_fee_bps.is_some()
    }

    /// Runs the computation step by step. `None` when an input is missing, the amount
    /// does not parse or is zero, a product does not fit 512 bits, or the estimate does
    /// not fit 256 bits.
    pub fn breakdown(&self, redeem_amount: &str) -> Option<RedeemBreakdown> {
        let price = self.gold_price?;
        let ratio = self.collateral_ratio_pct?;
        let fee_bps = self.redeem_fee_bps?;

        let amount_wei = parse_units(redeem_amount, GOF_DECIMALS)?;
        if amount_wei.is_zero() {
            return None;
        }

        let wide = |v: U256| U512::from(v);

        let gross_value = wide(amount_wei).checked_mul(wide(price))? / wide(exp10(GOF_DECIMALS));
        let collateral18 = gross_value.checked_mul(wide(ratio))? / U512::from(PERCENT);
        let collateral6 = collateral18 / wide(exp10(GOF_DECIMALS - COLLATERAL_DECIMALS));
        let fee6 = collateral6.checked_mul(wide(fee_bps))? / U512::from(BPS);
        let estimate = U256::uint_try_from(collateral6.saturating_sub(fee6)).ok()?;

        Some(RedeemBreakdown {
            amount_wei,
            gross_value,
            collateral18,
            collateral6,
            fee6,
            estimate,
        })
    }

    /// Collateral received for `redeem_amount`, in collateral-token units. Never fails:
    /// anything that prevents the computation yields zero.
    pub fn estimate(&self, redeem_amount: &str) -> U256 {
        self.breakdown(redeem_amount)
            .map(|b| b.estimate)
            .unwrap_or_default()
    }
}

/// Human readable estimate, e.g. `1592.0000`.
pub fn format_estimate(estimate: U256) -> String {
    format_units(estimate, COLLATERAL_DECIMALS, ESTIMATE_DISPLAY_DECIMALS)
}
