//! NAV-driven valuation math shared by the ledger and the vault.
//!
//! All values are integers:
//! - NAV and USD values are 1e18 fixed point ("wad")
//! - CSV amounts have 18 decimals
//! - The stable asset has 6 decimals
//!
//! Division always rounds down, so every conversion favours the protocol.

use odra::casper_types::U256;
use crate::errors::ProtocolError;

/// Fixed-point scale (1e18)
pub const WAD: u128 = 1_000_000_000_000_000_000;

/// Basis points scale (100% = 10000 bps)
pub const BPS_SCALE: u64 = 10_000;

/// Factor between stable-asset units (6 decimals) and wad (18 decimals)
pub const STABLE_TO_WAD: u128 = 1_000_000_000_000;

fn mul(a: U256, b: U256) -> Result<U256, ProtocolError> {
    a.checked_mul(b).ok_or(ProtocolError::InvalidAmount)
}

/// USD value (wad) of `amount` CSV at `nav`.
pub fn wad_value(amount: U256, nav: U256) -> Result<U256, ProtocolError> {
    Ok(mul(amount, nav)? / U256::from(WAD))
}

/// Value of `amount` CSV at `nav`, in stable-asset units.
pub fn stable_value(amount: U256, nav: U256) -> Result<U256, ProtocolError> {
    Ok(wad_value(amount, nav)? / U256::from(STABLE_TO_WAD))
}

/// CSV minted for a stable deposit: `stable * 1e12 * 1e18 / nav`.
pub fn tokens_for_deposit(stable_amount: U256, nav: U256) -> Result<U256, ProtocolError> {
    if nav.is_zero() {
        return Err(ProtocolError::StaleOracle);
    }
    let deposit_wad = mul(stable_amount, U256::from(STABLE_TO_WAD))?;
    Ok(mul(deposit_wad, U256::from(WAD))? / nav)
}

/// Portfolio collateral a cash deposit represents at the attested portfolio LTV.
///
/// `collateral = deposit_wad * 10000 / ltv_bps`
pub fn collateral_for_deposit(deposit_wad: U256, ltv_bps: u32) -> Result<U256, ProtocolError> {
    if ltv_bps == 0 {
        return Err(ProtocolError::InvalidParameter);
    }
    Ok(mul(deposit_wad, U256::from(BPS_SCALE))? / U256::from(ltv_bps))
}

/// Loan-to-value in bps: `supply * nav * 10000 / (1e18 * collateral)`.
///
/// Zero when either supply or collateral is zero.
pub fn ltv_bps(supply: U256, nav: U256, collateral: U256) -> Result<U256, ProtocolError> {
    if supply.is_zero() || collateral.is_zero() {
        return Ok(U256::zero());
    }
    let numerator = mul(mul(supply, nav)?, U256::from(BPS_SCALE))?;
    let denominator = mul(collateral, U256::from(WAD))?;
    Ok(numerator / denominator)
}

/// LTV after minting `amount` against `added_collateral`, evaluated on the new totals.
///
/// Minting with no collateral at all has unbounded LTV and returns `U256::MAX`.
pub fn post_mint_ltv_bps(
    supply: U256,
    amount: U256,
    nav: U256,
    collateral: U256,
    added_collateral: U256,
) -> Result<U256, ProtocolError> {
    let new_supply = supply.checked_add(amount).ok_or(ProtocolError::InvalidAmount)?;
    let new_collateral = collateral
        .checked_add(added_collateral)
        .ok_or(ProtocolError::InvalidAmount)?;
    if new_collateral.is_zero() && !new_supply.is_zero() {
        return Ok(U256::MAX);
    }
    ltv_bps(new_supply, nav, new_collateral)
}

/// Settlement pays the lesser of the locked-in value and the current value.
pub fn settlement_value(
    value_at_request: U256,
    csv_amount: U256,
    nav_now: U256,
) -> Result<U256, ProtocolError> {
    let current = stable_value(csv_amount, nav_now)?;
    Ok(value_at_request.min(current))
}
