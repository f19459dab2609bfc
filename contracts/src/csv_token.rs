//! CSV Token Contract
//!
//! CEP-18 compatible token backed by insurance portfolio collateral, with the
//! collateral ledger built in. Only the operator (the vault) can mint and burn.
//!
//! ## Collateral ledger
//!
//! - `total_collateral_value` is the reported portfolio collateral (1e18 USD)
//! - Minting is gated on a fresh oracle NAV and on the post-mint LTV
//!   (new supply and new collateral) staying at or below `ltv_cap_bps`
//! - Burning releases `amount * nav` of collateral, floored at zero
//! - Guardians can override the collateral figure when the oracle itself is
//!   compromised; the override is recorded as an event
//!
//! Transfers, custody moves and mints are blocked while the system is paused
//! and, when a compliance registry is configured, whenever it answers `false`
//! (mints are checked as a move from the zero address).

use odra::prelude::*;
use odra::casper_types::{U256, Key};
use odra::casper_types::bytesrepr::ToBytes;
use crate::access_control::{zero_address, ROLE_GOVERNOR, ROLE_GUARDIAN, ROLE_OPERATOR};
use crate::errors::ProtocolError;
use crate::guard::ReentrancyGuard;
use crate::interfaces::{ComplianceRegistryContractRef, OracleFeedContractRef, RolesContractRef};
use crate::valuation;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;

/// Absolute ceiling on the LTV cap (80%)
pub const MAX_LTV_CAP_BPS: u32 = 8000;
/// Default LTV cap
pub const DEFAULT_LTV_CAP_BPS: u32 = 8000;

const TOKEN_NAME: &str = "CSV";
const TOKEN_SYMBOL: &str = "CSV";
const TOKEN_DECIMALS: u8 = 18;
const CEP18_NAME_KEY: &str = "name";
const CEP18_SYMBOL_KEY: &str = "symbol";
const CEP18_DECIMALS_KEY: &str = "decimals";
const CEP18_TOTAL_SUPPLY_KEY: &str = "total_supply";
const CEP18_BALANCES_DICT: &str = "balances";
const CEP18_ALLOWANCES_DICT: &str = "allowances";

#[odra::event]
pub struct Minted {
    pub to: Address,
    pub amount: U256,
    pub collateral_value: U256,
    pub ltv_bps: U256,
}

#[odra::event]
pub struct Burned {
    pub from: Address,
    pub amount: U256,
    pub collateral_released: U256,
}

#[odra::event]
pub struct LtvCapUpdated {
    pub old_cap_bps: u32,
    pub new_cap_bps: u32,
}

#[odra::event]
pub struct CollateralOverridden {
    pub old_value: U256,
    pub new_value: U256,
    pub guardian: Address,
}

#[odra::event]
pub struct ComplianceRegistryUpdated {
    pub old_registry: Option<Address>,
    pub new_registry: Option<Address>,
}

/// CSV Token Contract
#[odra::module(events = [Minted, Burned, LtvCapUpdated, CollateralOverridden, ComplianceRegistryUpdated])]
pub struct CsvToken {
    /// Total supply
    total_supply: Var<U256>,
    /// Balance mapping
    balances: Mapping<Address, U256>,
    /// Allowance mapping (owner -> spender -> amount)
    allowances: Mapping<(Address, Address), U256>,
    /// AccessControl contract address
    access_control: Var<Address>,
    /// Oracle contract address
    oracle: Var<Address>,
    /// Optional compliance registry consulted on transfers
    compliance: Var<Option<Address>>,
    /// Reported collateral backing the supply (1e18 USD)
    total_collateral_value: Var<U256>,
    /// Maximum post-mint LTV in bps
    ltv_cap_bps: Var<u32>,
    /// Call-in-progress guard
    guard: SubModule<ReentrancyGuard>,
}

#[odra::module]
impl CsvToken {
    /// Initialize the token
    pub fn init(&mut self, access_control: Address, oracle: Address) {
        self.access_control.set(access_control);
        self.oracle.set(oracle);
        self.compliance.set(None);
        self.total_supply.set(U256::zero());
        self.total_collateral_value.set(U256::zero());
        self.ltv_cap_bps.set(DEFAULT_LTV_CAP_BPS);
        self.env().init_dictionary(CEP18_BALANCES_DICT);
        self.env().init_dictionary(CEP18_ALLOWANCES_DICT);
        self.env().set_named_value(CEP18_NAME_KEY, String::from(TOKEN_NAME));
        self.env().set_named_value(CEP18_SYMBOL_KEY, String::from(TOKEN_SYMBOL));
        self.env().set_named_value(CEP18_DECIMALS_KEY, TOKEN_DECIMALS);
        self.env().set_named_value(CEP18_TOTAL_SUPPLY_KEY, U256::zero());
    }

    // ========== CEP-18 Standard Functions ==========

    /// Get token name
    pub fn name(&self) -> String {
        String::from(TOKEN_NAME)
    }

    /// Get token symbol
    pub fn symbol(&self) -> String {
        String::from(TOKEN_SYMBOL)
    }

    /// Get decimals
    pub fn decimals(&self) -> u8 {
        TOKEN_DECIMALS
    }

    /// Get total supply
    pub fn total_supply(&self) -> U256 {
        self.total_supply.get().unwrap_or(U256::zero())
    }

    /// Get balance of an account
    pub fn balance_of(&self, account: Address) -> U256 {
        self.balances.get(&account).unwrap_or(U256::zero())
    }

    /// Get allowance for spender
    pub fn allowance(&self, owner: Address, spender: Address) -> U256 {
        self.allowances.get(&(owner, spender)).unwrap_or(U256::zero())
    }

    /// Transfer tokens to recipient
    pub fn transfer(&mut self, recipient: Address, amount: U256) -> bool {
        self.require_not_paused();
        self.guard.enter();
        let sender = self.env().caller();
        self.require_transfer_allowed(sender, recipient, amount);
        self.transfer_internal(sender, recipient, amount);
        self.guard.exit();
        true
    }

    /// Approve spender to spend tokens
    pub fn approve(&mut self, spender: Address, amount: U256) -> bool {
        self.require_not_paused();
        let owner = self.env().caller();
        self.approve_internal(owner, spender, amount);
        true
    }

    /// Transfer tokens from owner to recipient (requires allowance)
    pub fn transfer_from(&mut self, owner: Address, recipient: Address, amount: U256) -> bool {
        self.require_not_paused();
        self.guard.enter();
        let spender = self.env().caller();

        let current_allowance = self.allowance(owner, spender);
        if current_allowance < amount {
            self.env().revert(ProtocolError::InsufficientAllowance);
        }

        self.require_transfer_allowed(owner, recipient, amount);
        self.transfer_internal(owner, recipient, amount);
        self.approve_internal(owner, spender, current_allowance - amount);
        self.guard.exit();
        true
    }

    // ========== Collateral Ledger (Operator) ==========

    /// Mint against additional collateral; post-mint LTV must stay within the cap
    pub fn mint(&mut self, to: Address, amount: U256, collateral_value: U256) {
        self.require_not_paused();
        self.require_role(ROLE_OPERATOR);
        self.guard.enter();

        if amount.is_zero() {
            self.env().revert(ProtocolError::InvalidAmount);
        }
        if to == zero_address() {
            self.env().revert(ProtocolError::ZeroAddress);
        }
        self.require_transfer_allowed(zero_address(), to, amount);

        let nav = self.fresh_nav();
        let supply = self.total_supply();
        let collateral = self.total_collateral_value();

        let ltv = self.unwrap_or_revert(valuation::post_mint_ltv_bps(
            supply,
            amount,
            nav,
            collateral,
            collateral_value,
        ));
        if ltv > U256::from(self.ltv_cap_bps()) {
            self.env().revert(ProtocolError::ExcessiveConcentration);
        }

        self.total_collateral_value.set(collateral + collateral_value);
        let to_balance = self.balance_of(to);
        self.set_balance(to, to_balance + amount);
        self.set_total_supply(supply + amount);

        self.env().emit_event(Minted {
            to,
            amount,
            collateral_value,
            ltv_bps: ltv,
        });
        self.guard.exit();
    }

    /// Burn and release `amount * nav` of collateral (floored at zero)
    pub fn burn(&mut self, from: Address, amount: U256) {
        self.require_not_paused();
        self.require_role(ROLE_OPERATOR);
        self.guard.enter();

        if amount.is_zero() {
            self.env().revert(ProtocolError::InvalidAmount);
        }

        let nav = self.fresh_nav();
        let released = self.unwrap_or_revert(valuation::wad_value(amount, nav));

        self.burn_from_internal(from, amount);
        let collateral = self.total_collateral_value();
        self.total_collateral_value.set(collateral.saturating_sub(released));

        self.env().emit_event(Burned {
            from,
            amount,
            collateral_released: released.min(collateral),
        });
        self.guard.exit();
    }

    /// Protocol move between accounts (operator only), used for redemption custody
    pub fn custody_transfer(&mut self, from: Address, to: Address, amount: U256) {
        self.require_not_paused();
        self.require_role(ROLE_OPERATOR);
        self.guard.enter();
        self.require_transfer_allowed(from, to, amount);
        self.transfer_internal(from, to, amount);
        self.guard.exit();
    }

    /// Reported collateral backing the supply
    pub fn total_collateral_value(&self) -> U256 {
        self.total_collateral_value.get().unwrap_or(U256::zero())
    }

    /// Current LTV in bps (0 when supply or collateral is zero)
    pub fn current_ltv(&self) -> U256 {
        let (nav, _) = self.oracle_ref().get_nav();
        valuation::ltv_bps(self.total_supply(), nav, self.total_collateral_value())
            .unwrap_or(U256::MAX)
    }

    /// LTV cap in bps
    pub fn ltv_cap_bps(&self) -> u32 {
        self.ltv_cap_bps.get().unwrap_or(DEFAULT_LTV_CAP_BPS)
    }

    // ========== Governance Functions ==========

    /// Set the LTV cap, at most 80% (governor only)
    pub fn update_ltv_cap(&mut self, cap_bps: u32) {
        self.require_role(ROLE_GOVERNOR);
        if cap_bps > MAX_LTV_CAP_BPS {
            self.env().revert(ProtocolError::InvalidParameter);
        }
        let old_cap_bps = self.ltv_cap_bps();
        self.ltv_cap_bps.set(cap_bps);
        self.env().emit_event(LtvCapUpdated {
            old_cap_bps,
            new_cap_bps: cap_bps,
        });
    }

    /// Break-glass collateral override for a compromised or divergent oracle (guardian only)
    pub fn emergency_override_collateral(&mut self, value: U256) {
        self.require_role(ROLE_GUARDIAN);
        let old_value = self.total_collateral_value();
        self.total_collateral_value.set(value);
        self.env().emit_event(CollateralOverridden {
            old_value,
            new_value: value,
            guardian: self.env().caller(),
        });
    }

    /// Set or clear the compliance registry (governor only)
    pub fn set_compliance_registry(&mut self, registry: Option<Address>) {
        self.require_role(ROLE_GOVERNOR);
        let old_registry = self.compliance.get().flatten();
        self.compliance.set(registry);
        self.env().emit_event(ComplianceRegistryUpdated {
            old_registry,
            new_registry: registry,
        });
    }

    /// Get compliance registry
    pub fn get_compliance_registry(&self) -> Option<Address> {
        self.compliance.get().flatten()
    }

    /// Get oracle address
    pub fn get_oracle(&self) -> Option<Address> {
        self.oracle.get()
    }
}

impl CsvToken {
    fn transfer_internal(&mut self, from: Address, to: Address, amount: U256) {
        let from_balance = self.balance_of(from);
        if from_balance < amount {
            self.env().revert(ProtocolError::InsufficientBalance);
        }
        self.set_balance(from, from_balance - amount);
        let to_balance = self.balance_of(to);
        self.set_balance(to, to_balance + amount);
    }

    fn approve_internal(&mut self, owner: Address, spender: Address, amount: U256) {
        self.allowances.set(&(owner, spender), amount);
        let key = Self::cep18_allowance_key(owner, spender);
        self.env().set_dictionary_value(CEP18_ALLOWANCES_DICT, key.as_bytes(), amount);
    }

    fn burn_from_internal(&mut self, from: Address, amount: U256) {
        let current_balance = self.balance_of(from);
        if current_balance < amount {
            self.env().revert(ProtocolError::InsufficientBalance);
        }
        self.set_balance(from, current_balance - amount);
        let supply = self.total_supply();
        self.set_total_supply(supply - amount);
    }

    fn set_balance(&mut self, owner: Address, amount: U256) {
        self.balances.set(&owner, amount);
        let key = Self::cep18_balance_key(owner);
        self.env().set_dictionary_value(CEP18_BALANCES_DICT, key.as_bytes(), amount);
    }

    fn set_total_supply(&mut self, amount: U256) {
        self.total_supply.set(amount);
        self.env().set_named_value(CEP18_TOTAL_SUPPLY_KEY, amount);
    }

    fn cep18_balance_key(owner: Address) -> String {
        let key = Key::from(owner);
        let bytes = key.to_bytes().unwrap_or_default();
        BASE64_STANDARD.encode(bytes)
    }

    fn cep18_allowance_key(owner: Address, spender: Address) -> String {
        let owner_key = Key::from(owner);
        let spender_key = Key::from(spender);
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&owner_key.to_bytes().unwrap_or_default());
        bytes.extend_from_slice(&spender_key.to_bytes().unwrap_or_default());
        BASE64_STANDARD.encode(bytes)
    }

    fn oracle_ref(&self) -> OracleFeedContractRef {
        let oracle = self.oracle.get_or_revert_with(ProtocolError::InvalidParameter);
        OracleFeedContractRef::new(self.env(), oracle)
    }

    fn fresh_nav(&self) -> U256 {
        let (nav, is_stale) = self.oracle_ref().get_nav();
        if is_stale || nav.is_zero() {
            self.env().revert(ProtocolError::StaleOracle);
        }
        nav
    }

    fn unwrap_or_revert<T>(&self, result: Result<T, ProtocolError>) -> T {
        match result {
            Ok(value) => value,
            Err(error) => self.env().revert(error),
        }
    }

    fn require_transfer_allowed(&self, from: Address, to: Address, amount: U256) {
        if let Some(registry) = self.compliance.get().flatten() {
            let compliance = ComplianceRegistryContractRef::new(self.env(), registry);
            if !compliance.is_transfer_allowed(from, to, amount) {
                self.env().revert(ProtocolError::TransferBlocked);
            }
        }
    }

    fn roles(&self) -> RolesContractRef {
        let access_control = self
            .access_control
            .get_or_revert_with(ProtocolError::InvalidParameter);
        RolesContractRef::new(self.env(), access_control)
    }

    fn require_role(&self, role_id: u8) {
        if !self.roles().has_role(role_id, self.env().caller()) {
            self.env().revert(ProtocolError::UnauthorizedRole);
        }
    }

    fn require_not_paused(&self) {
        if self.roles().is_paused() {
            self.env().revert(ProtocolError::SystemPaused);
        }
    }
}
