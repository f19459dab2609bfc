//! Access Control Contract
//!
//! Capability table and global circuit breaker for the CSV protocol.
//! Every other contract consults this one (through `interfaces::Roles`)
//! before a privileged or mutating operation.
//!
//! Roles:
//! - GOVERNOR: grants/revokes roles, changes parameters, lifts the pause
//! - GUARDIAN: pauses the system, emergency collateral override
//! - OPERATOR: mints/burns CSV and moves custody (the vault)
//! - ORACLE: reports carrier exposures
//!
//! Pausing is asymmetric: guardians (or governors) can halt, only governors resume.

use odra::prelude::*;
use odra::casper_types::account::AccountHash;
use crate::errors::ProtocolError;

/// Role constants (u8 for efficient storage)
pub const ROLE_GOVERNOR: u8 = 0;
pub const ROLE_GUARDIAN: u8 = 1;
pub const ROLE_OPERATOR: u8 = 2;
pub const ROLE_ORACLE: u8 = 3;

/// Number of defined roles
const ROLE_COUNT: u8 = 4;

#[odra::event]
pub struct RoleGranted {
    pub role: u8,
    pub account: Address,
    pub sender: Address,
}

#[odra::event]
pub struct RoleRevoked {
    pub role: u8,
    pub account: Address,
    pub sender: Address,
}

#[odra::event]
pub struct Paused {
    pub by: Address,
}

#[odra::event]
pub struct Unpaused {
    pub by: Address,
}

/// Null-equivalent account
pub fn zero_address() -> Address {
    Address::Account(AccountHash::new([0u8; 32]))
}

/// Access Control Contract
#[odra::module(events = [RoleGranted, RoleRevoked, Paused, Unpaused])]
pub struct AccessControl {
    /// Role assignments: (role, account) -> bool
    roles: Mapping<(u8, Address), bool>,
    /// Number of accounts with each role
    role_count: Mapping<u8, u32>,
    /// Global pause switch
    paused: Var<bool>,
    /// Whether the contract is initialized
    initialized: Var<bool>,
}

#[odra::module]
impl AccessControl {
    /// Initialize access control with the first governor and guardian
    pub fn init(&mut self, governor: Address, guardian: Address) {
        if self.initialized.get().unwrap_or(false) {
            self.env().revert(ProtocolError::InvalidParameter);
        }
        if governor == zero_address() || guardian == zero_address() {
            self.env().revert(ProtocolError::ZeroAddress);
        }

        self.set_role_internal(ROLE_GOVERNOR, governor, true);
        self.set_role_internal(ROLE_GUARDIAN, guardian, true);
        self.paused.set(false);
        self.initialized.set(true);
    }

    // ========== Role Query Functions ==========

    /// Check if account has a specific role
    pub fn has_role(&self, role_id: u8, account: Address) -> bool {
        self.roles.get(&(role_id, account)).unwrap_or(false)
    }

    /// Get the number of accounts with a role
    pub fn role_member_count(&self, role_id: u8) -> u32 {
        self.role_count.get(&role_id).unwrap_or(0)
    }

    /// Whether the system is paused
    pub fn is_paused(&self) -> bool {
        self.paused.get().unwrap_or(false)
    }

    // ========== Role Management Functions ==========

    /// Grant a role to an account (governor only)
    pub fn grant_role(&mut self, role_id: u8, account: Address) {
        self.require_caller_role(ROLE_GOVERNOR);
        if role_id >= ROLE_COUNT {
            self.env().revert(ProtocolError::InvalidParameter);
        }
        if account == zero_address() {
            self.env().revert(ProtocolError::ZeroAddress);
        }

        if self.has_role(role_id, account) {
            return;
        }

        self.set_role_internal(role_id, account, true);
        self.env().emit_event(RoleGranted {
            role: role_id,
            account,
            sender: self.env().caller(),
        });
    }

    /// Revoke a role from an account (governor only)
    pub fn revoke_role(&mut self, role_id: u8, account: Address) {
        self.require_caller_role(ROLE_GOVERNOR);

        if !self.has_role(role_id, account) {
            return;
        }
        self.require_not_last_governor(role_id);

        self.set_role_internal(role_id, account, false);
        self.env().emit_event(RoleRevoked {
            role: role_id,
            account,
            sender: self.env().caller(),
        });
    }

    /// Renounce a role (caller gives up their own role)
    pub fn renounce_role(&mut self, role_id: u8) {
        let caller = self.env().caller();

        if !self.has_role(role_id, caller) {
            return;
        }
        self.require_not_last_governor(role_id);

        self.set_role_internal(role_id, caller, false);
        self.env().emit_event(RoleRevoked {
            role: role_id,
            account: caller,
            sender: caller,
        });
    }

    // ========== Circuit Breaker ==========

    /// Halt every mutating entry point (guardian or governor)
    pub fn pause(&mut self) {
        let caller = self.env().caller();
        if !self.has_role(ROLE_GUARDIAN, caller) && !self.has_role(ROLE_GOVERNOR, caller) {
            self.env().revert(ProtocolError::UnauthorizedRole);
        }
        if self.is_paused() {
            return;
        }
        self.paused.set(true);
        self.env().emit_event(Paused { by: caller });
    }

    /// Resume operation (governor only)
    pub fn unpause(&mut self) {
        self.require_caller_role(ROLE_GOVERNOR);
        if !self.is_paused() {
            return;
        }
        self.paused.set(false);
        self.env().emit_event(Unpaused { by: self.env().caller() });
    }

    // ========== Internal Functions ==========

    fn set_role_internal(&mut self, role_id: u8, account: Address, value: bool) {
        let had_role = self.roles.get(&(role_id, account)).unwrap_or(false);

        self.roles.set(&(role_id, account), value);

        let current_count = self.role_count.get(&role_id).unwrap_or(0);
        if value && !had_role {
            self.role_count.set(&role_id, current_count + 1);
        } else if !value && had_role && current_count > 0 {
            self.role_count.set(&role_id, current_count - 1);
        }
    }

    fn require_caller_role(&self, role_id: u8) {
        if !self.has_role(role_id, self.env().caller()) {
            self.env().revert(ProtocolError::UnauthorizedRole);
        }
    }

    fn require_not_last_governor(&self, role_id: u8) {
        if role_id == ROLE_GOVERNOR && self.role_member_count(ROLE_GOVERNOR) <= 1 {
            self.env().revert(ProtocolError::InvalidParameter);
        }
    }
}
