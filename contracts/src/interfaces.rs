//! Cross-contract interfaces for the CSV protocol.
//!
//! Each contract talks to its collaborators through these traits, so it only
//! depends on the entry points it actually calls. The compliance registry and
//! the stable asset are external collaborators; the rest are implemented in
//! this crate.

use odra::prelude::*;
use odra::casper_types::U256;
use crate::types::OracleData;

/// Capability table and pause switch (`AccessControl`)
#[odra::external_contract]
pub trait Roles {
    fn has_role(&self, role_id: u8, account: Address) -> bool;
    fn is_paused(&self) -> bool;
}

/// Read side of the oracle (`CsvOracle`)
#[odra::external_contract]
pub trait OracleFeed {
    /// Latest NAV and whether it is stale
    fn get_nav(&self) -> (U256, bool);
    fn latest_data(&self) -> Option<OracleData>;
}

/// Collateral ledger and custody surface of the CSV token (`CsvToken`)
#[odra::external_contract]
pub trait CollateralToken {
    fn balance_of(&self, account: Address) -> U256;
    fn total_collateral_value(&self) -> U256;
    fn mint(&mut self, to: Address, amount: U256, collateral_value: U256);
    fn burn(&mut self, from: Address, amount: U256);
    fn custody_transfer(&mut self, from: Address, to: Address, amount: U256);
}

/// Stable asset used for deposits and settlement (CEP-18)
#[odra::external_contract]
pub trait StableToken {
    fn balance_of(&self, account: Address) -> U256;
    fn transfer(&mut self, recipient: Address, amount: U256) -> bool;
    fn transfer_from(&mut self, owner: Address, recipient: Address, amount: U256) -> bool;
}

/// Compliance registry consulted on CSV transfers
#[odra::external_contract]
pub trait ComplianceRegistry {
    fn is_transfer_allowed(&self, from: Address, to: Address, amount: U256) -> bool;
}
