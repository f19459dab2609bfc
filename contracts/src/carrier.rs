//! Carrier Exposures
//!
//! Per-carrier exposure registry embedded in the vault. An exposure becomes
//! active on its first nonzero update and drops out of the active list when
//! it returns to zero; its value and policy count persist at zero.
//!
//! The vault performs role and pause checks and supplies the ledger
//! collateral the concentration cap is measured against.

use odra::prelude::*;
use odra::casper_types::U256;
use crate::errors::ProtocolError;
use crate::types::{CarrierExposure, MAX_BPS};

/// Default single-carrier concentration cap (25%)
pub const DEFAULT_CONCENTRATION_CAP_BPS: u32 = 2500;
/// Default earliest accepted policy vintage
pub const DEFAULT_MIN_VINTAGE: u32 = 1980;
/// Default latest accepted policy vintage
pub const DEFAULT_MAX_VINTAGE: u32 = 2100;

#[odra::event]
pub struct CarrierExposureUpdated {
    pub carrier: String,
    pub total_value: U256,
    pub policy_count: u32,
    pub vintage_year: u32,
    pub is_active: bool,
}

#[odra::event]
pub struct ConcentrationCapUpdated {
    pub old_cap_bps: u32,
    pub new_cap_bps: u32,
}

#[odra::event]
pub struct VintageBoundsUpdated {
    pub old_min: u32,
    pub old_max: u32,
    pub new_min: u32,
    pub new_max: u32,
}

/// Whether `total_value` fits within `cap_bps` of `collateral`.
pub fn within_concentration_cap(
    total_value: U256,
    cap_bps: u32,
    collateral: U256,
) -> Result<bool, ProtocolError> {
    if total_value.is_zero() {
        return Ok(true);
    }
    let scaled_value = total_value
        .checked_mul(U256::from(MAX_BPS))
        .ok_or(ProtocolError::InvalidParameter)?;
    let limit = collateral
        .checked_mul(U256::from(cap_bps))
        .ok_or(ProtocolError::InvalidParameter)?;
    Ok(scaled_value <= limit)
}

#[odra::module(events = [CarrierExposureUpdated, ConcentrationCapUpdated, VintageBoundsUpdated])]
pub struct CarrierExposures {
    /// Exposure per carrier
    exposures: Mapping<String, CarrierExposure>,
    /// Active list: index -> carrier
    active: Mapping<u32, String>,
    /// Position in the active list, 1-based (0 = inactive)
    positions: Mapping<String, u32>,
    /// Number of active carriers
    active_count: Var<u32>,
    /// Concentration cap in bps of ledger collateral
    concentration_cap_bps: Var<u32>,
    min_vintage: Var<u32>,
    max_vintage: Var<u32>,
}

#[odra::module]
impl CarrierExposures {
    pub fn carrier_exposure(&self, carrier: String) -> CarrierExposure {
        self.exposures.get(&carrier).unwrap_or_default()
    }

    /// Active carriers in list order
    pub fn active_carriers(&self) -> Vec<String> {
        let count = self.active_count.get().unwrap_or(0);
        let mut list = Vec::new();
        for i in 0..count {
            if let Some(carrier) = self.active.get(&i) {
                list.push(carrier);
            }
        }
        list
    }

    pub fn concentration_cap(&self) -> u32 {
        self.concentration_cap_bps
            .get()
            .unwrap_or(DEFAULT_CONCENTRATION_CAP_BPS)
    }

    /// `(min, max)` accepted vintage years, inclusive
    pub fn vintage_bounds(&self) -> (u32, u32) {
        (
            self.min_vintage.get().unwrap_or(DEFAULT_MIN_VINTAGE),
            self.max_vintage.get().unwrap_or(DEFAULT_MAX_VINTAGE),
        )
    }
}

impl CarrierExposures {
    pub(crate) fn update(
        &mut self,
        carrier: String,
        total_value: U256,
        policy_count: u32,
        vintage_year: u32,
        ledger_collateral: U256,
    ) -> Result<(), ProtocolError> {
        if carrier.is_empty() {
            return Err(ProtocolError::InvalidParameter);
        }
        let (min_vintage, max_vintage) = self.vintage_bounds();
        if vintage_year < min_vintage || vintage_year > max_vintage {
            return Err(ProtocolError::InvalidParameter);
        }
        if !within_concentration_cap(total_value, self.concentration_cap(), ledger_collateral)? {
            return Err(ProtocolError::ExcessiveConcentration);
        }

        let mut exposure = match self.exposures.get(&carrier) {
            Some(existing) => existing,
            // Unknown carriers get a record on their first nonzero report
            None if total_value.is_zero() => return Ok(()),
            None => CarrierExposure::default(),
        };
        exposure.total_value = total_value;
        exposure.policy_count = policy_count;

        if total_value.is_zero() {
            if exposure.is_active {
                self.deactivate(&carrier);
            }
            exposure.is_active = false;
        } else if !exposure.is_active {
            self.activate(&carrier);
            exposure.is_active = true;
        }

        let is_active = exposure.is_active;
        self.exposures.set(&carrier, exposure);

        self.env().emit_event(CarrierExposureUpdated {
            carrier,
            total_value,
            policy_count,
            vintage_year,
            is_active,
        });
        Ok(())
    }

    pub(crate) fn set_concentration_cap(&mut self, cap_bps: u32) -> Result<(), ProtocolError> {
        if cap_bps == 0 || cap_bps > MAX_BPS {
            return Err(ProtocolError::InvalidParameter);
        }
        let old_cap_bps = self.concentration_cap();
        self.concentration_cap_bps.set(cap_bps);
        self.env().emit_event(ConcentrationCapUpdated {
            old_cap_bps,
            new_cap_bps: cap_bps,
        });
        Ok(())
    }

    pub(crate) fn set_vintage_bounds(&mut self, min: u32, max: u32) -> Result<(), ProtocolError> {
        if min > max {
            return Err(ProtocolError::InvalidParameter);
        }
        let (old_min, old_max) = self.vintage_bounds();
        self.min_vintage.set(min);
        self.max_vintage.set(max);
        self.env().emit_event(VintageBoundsUpdated {
            old_min,
            old_max,
            new_min: min,
            new_max: max,
        });
        Ok(())
    }

    fn activate(&mut self, carrier: &String) {
        let count = self.active_count.get().unwrap_or(0);
        self.active.set(&count, carrier.clone());
        self.positions.set(carrier, count + 1);
        self.active_count.set(count + 1);
    }

    fn deactivate(&mut self, carrier: &String) {
        let position = self.positions.get(carrier).unwrap_or(0);
        if position == 0 {
            return;
        }
        let count = self.active_count.get().unwrap_or(0);
        let index = position - 1;
        let last_index = count - 1;
        if index != last_index {
            if let Some(last) = self.active.get(&last_index) {
                self.positions.set(&last, index + 1);
                self.active.set(&index, last);
            }
        }
        self.positions.set(carrier, 0);
        self.active_count.set(last_index);
    }
}
