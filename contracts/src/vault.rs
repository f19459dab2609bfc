//! CSV Vault Contract
//!
//! Stable-asset deposits and the delayed redemption queue, plus the carrier
//! exposure registry.
//!
//! ## Design
//!
//! - "Quote at request time" model: the stable value is fixed when the request
//!   is created, and settlement never pays more than the current value
//! - CSV is moved into vault custody at request time, burned at settlement
//! - Settlement is permissionless and retryable: with too little stable
//!   liquidity the request simply stays pending
//!
//! ## Flow
//!
//! 1. User approves the vault on the stable asset and calls `deposit`
//! 2. Vault pulls the stable asset and mints CSV through the token's ledger
//! 3. User calls `request_redemption(csv_amount)`; CSV moves to custody
//! 4. After `REDEMPTION_DELAY`, anyone calls `process_redemption(id)`
//! 5. Vault burns the custodied CSV and pays `min(locked, current)` value

use odra::prelude::*;
use odra::casper_types::U256;
use crate::access_control::{ROLE_GOVERNOR, ROLE_ORACLE};
use crate::carrier::CarrierExposures;
use crate::errors::ProtocolError;
use crate::guard::ReentrancyGuard;
use crate::interfaces::{
    CollateralTokenContractRef, OracleFeedContractRef, RolesContractRef, StableTokenContractRef,
};
use crate::types::{block_time_secs, CarrierExposure, OracleData, RedemptionRequest};
use crate::valuation::{self, STABLE_TO_WAD};

/// Delay between request and settlement (7 days)
pub const REDEMPTION_DELAY: u64 = 7 * 24 * 60 * 60;

#[odra::event]
pub struct Deposited {
    pub user: Address,
    pub stable_amount: U256,
    pub tokens_minted: U256,
    pub collateral_value: U256,
    pub nav_per_token: U256,
}

#[odra::event]
pub struct RedemptionRequested {
    pub request_id: u64,
    pub user: Address,
    pub csv_amount: U256,
    pub value_at_request: U256,
    pub nav_per_token: U256,
}

#[odra::event]
pub struct RedemptionProcessed {
    pub request_id: u64,
    pub user: Address,
    pub csv_amount: U256,
    pub settlement: U256,
    pub nav_per_token: U256,
}

/// CSV Vault Contract
#[odra::module(events = [Deposited, RedemptionRequested, RedemptionProcessed])]
pub struct CsvVault {
    /// AccessControl contract address
    access_control: Var<Address>,
    /// Oracle contract address
    oracle: Var<Address>,
    /// CSV token contract address
    token: Var<Address>,
    /// Stable asset contract address
    stable: Var<Address>,
    /// Next request ID
    next_request_id: Var<u64>,
    /// Request ID -> Request
    requests: Mapping<u64, RedemptionRequest>,
    /// User -> list of request IDs (stored as index -> id)
    user_requests: Mapping<(Address, u32), u64>,
    /// User -> request count
    user_request_count: Mapping<Address, u32>,
    /// Stable value locked by unprocessed requests
    pending_redemptions: Var<U256>,
    /// Carrier exposure registry
    carriers: SubModule<CarrierExposures>,
    /// Call-in-progress guard
    guard: SubModule<ReentrancyGuard>,
}

#[odra::module]
impl CsvVault {
    /// Initialize the vault
    pub fn init(&mut self, access_control: Address, oracle: Address, token: Address, stable: Address) {
        self.access_control.set(access_control);
        self.oracle.set(oracle);
        self.token.set(token);
        self.stable.set(stable);
        self.next_request_id.set(1);
        self.pending_redemptions.set(U256::zero());
    }

    // ========== User Operations ==========

    /// Deposit the stable asset and mint CSV at the current NAV.
    ///
    /// The caller must have approved the vault for `stable_amount`.
    pub fn deposit(&mut self, stable_amount: U256, min_tokens_out: U256) -> U256 {
        self.require_not_paused();
        self.guard.enter();

        if stable_amount.is_zero() {
            self.env().revert(ProtocolError::InvalidAmount);
        }

        let snapshot = self.fresh_snapshot();
        let nav = snapshot.nav_per_token;
        let tokens = self.unwrap_or_revert(valuation::tokens_for_deposit(stable_amount, nav));
        if tokens < min_tokens_out {
            self.env().revert(ProtocolError::InsufficientCollateral);
        }

        let deposit_wad = stable_amount * U256::from(STABLE_TO_WAD);
        let collateral_value = self.unwrap_or_revert(valuation::collateral_for_deposit(
            deposit_wad,
            snapshot.ltv_bps,
        ));

        let caller = self.env().caller();
        let vault = self.env().self_address();
        if !self.stable_ref().transfer_from(caller, vault, stable_amount) {
            self.env().revert(ProtocolError::InsufficientBalance);
        }
        self.token_ref().mint(caller, tokens, collateral_value);

        self.env().emit_event(Deposited {
            user: caller,
            stable_amount,
            tokens_minted: tokens,
            collateral_value,
            nav_per_token: nav,
        });
        self.guard.exit();
        tokens
    }

    /// Queue a redemption, locking its stable value at the current NAV.
    ///
    /// Returns the request ID.
    pub fn request_redemption(&mut self, csv_amount: U256) -> u64 {
        self.require_not_paused();
        self.guard.enter();

        if csv_amount.is_zero() {
            self.env().revert(ProtocolError::InvalidAmount);
        }

        let nav = self.fresh_snapshot().nav_per_token;
        let caller = self.env().caller();
        if self.token_ref().balance_of(caller) < csv_amount {
            self.env().revert(ProtocolError::InsufficientCollateral);
        }

        let value_at_request = self.unwrap_or_revert(valuation::stable_value(csv_amount, nav));

        // Generate request ID
        let request_id = self.next_request_id.get().unwrap_or(1);
        self.next_request_id.set(request_id + 1);

        let request = RedemptionRequest {
            user: caller,
            csv_amount,
            request_time: block_time_secs(&self.env()),
            value_at_request,
            processed: false,
        };
        self.requests.set(&request_id, request);

        let user_count = self.user_request_count.get(&caller).unwrap_or(0);
        self.user_requests.set(&(caller, user_count), request_id);
        self.user_request_count.set(&caller, user_count + 1);

        let pending = self.pending_redemptions();
        self.pending_redemptions.set(pending + value_at_request);

        let vault = self.env().self_address();
        self.token_ref().custody_transfer(caller, vault, csv_amount);

        self.env().emit_event(RedemptionRequested {
            request_id,
            user: caller,
            csv_amount,
            value_at_request,
            nav_per_token: nav,
        });
        self.guard.exit();
        request_id
    }

    /// Settle a matured request (anyone may call)
    pub fn process_redemption(&mut self, request_id: u64) {
        self.require_not_paused();
        self.guard.enter();

        let mut request = match self.requests.get(&request_id) {
            Some(r) => r,
            None => self.env().revert(ProtocolError::NoRedemptionFound),
        };
        if request.processed {
            self.env().revert(ProtocolError::RedemptionAlreadyProcessed);
        }
        let now = block_time_secs(&self.env());
        if now < request.request_time + REDEMPTION_DELAY {
            self.env().revert(ProtocolError::RedemptionNotReady);
        }

        let nav = self.fresh_snapshot().nav_per_token;
        let settlement = self.unwrap_or_revert(valuation::settlement_value(
            request.value_at_request,
            request.csv_amount,
            nav,
        ));
        if self.available_liquidity() < settlement {
            self.env().revert(ProtocolError::InsufficientLiquidity);
        }

        request.processed = true;
        self.requests.set(&request_id, request.clone());

        let pending = self.pending_redemptions();
        self.pending_redemptions
            .set(pending.saturating_sub(request.value_at_request));

        let vault = self.env().self_address();
        self.token_ref().burn(vault, request.csv_amount);
        if !self.stable_ref().transfer(request.user, settlement) {
            self.env().revert(ProtocolError::InsufficientLiquidity);
        }

        self.env().emit_event(RedemptionProcessed {
            request_id,
            user: request.user,
            csv_amount: request.csv_amount,
            settlement,
            nav_per_token: nav,
        });
        self.guard.exit();
    }

    // ========== Queue Reads ==========

    /// Get request details
    pub fn get_request(&self, request_id: u64) -> Option<RedemptionRequest> {
        self.requests.get(&request_id)
    }

    /// Get user's request count
    pub fn user_request_count(&self, user: Address) -> u32 {
        self.user_request_count.get(&user).unwrap_or(0)
    }

    /// Get user's request at index
    pub fn user_request_at(&self, user: Address, index: u32) -> Option<u64> {
        self.user_requests.get(&(user, index))
    }

    /// Get all unprocessed request IDs for a user
    pub fn user_pending_requests(&self, user: Address) -> Vec<u64> {
        let count = self.user_request_count(user);
        let mut pending = Vec::new();

        for i in 0..count {
            if let Some(request_id) = self.user_requests.get(&(user, i)) {
                if let Some(request) = self.requests.get(&request_id) {
                    if !request.processed {
                        pending.push(request_id);
                    }
                }
            }
        }

        pending
    }

    /// Whether a request has matured and is still unprocessed
    pub fn is_ready(&self, request_id: u64) -> bool {
        match self.requests.get(&request_id) {
            Some(request) => {
                !request.processed
                    && block_time_secs(&self.env()) >= request.request_time + REDEMPTION_DELAY
            }
            None => false,
        }
    }

    /// Stable value locked by unprocessed requests
    pub fn pending_redemptions(&self) -> U256 {
        self.pending_redemptions.get().unwrap_or(U256::zero())
    }

    /// Stable asset held by the vault
    pub fn available_liquidity(&self) -> U256 {
        self.stable_ref().balance_of(self.env().self_address())
    }

    // ========== Carrier Exposures ==========

    /// Report a carrier's exposure (oracle role)
    pub fn update_carrier_exposure(
        &mut self,
        carrier: String,
        total_value: U256,
        policy_count: u32,
        vintage_year: u32,
    ) {
        self.require_not_paused();
        self.require_role(ROLE_ORACLE);
        self.guard.enter();

        let ledger_collateral = self.token_ref().total_collateral_value();
        let result = self
            .carriers
            .update(carrier, total_value, policy_count, vintage_year, ledger_collateral);
        self.unwrap_or_revert(result);

        self.guard.exit();
    }

    pub fn carrier_exposure(&self, carrier: String) -> CarrierExposure {
        self.carriers.carrier_exposure(carrier)
    }

    pub fn active_carriers(&self) -> Vec<String> {
        self.carriers.active_carriers()
    }

    pub fn concentration_cap(&self) -> u32 {
        self.carriers.concentration_cap()
    }

    pub fn vintage_bounds(&self) -> (u32, u32) {
        self.carriers.vintage_bounds()
    }

    // ========== Governance Functions ==========

    /// Set the single-carrier concentration cap, 1..=10000 bps (governor only)
    pub fn update_concentration_cap(&mut self, cap_bps: u32) {
        self.require_role(ROLE_GOVERNOR);
        let result = self.carriers.set_concentration_cap(cap_bps);
        self.unwrap_or_revert(result);
    }

    /// Set the accepted vintage range, inclusive (governor only)
    pub fn update_vintage_bounds(&mut self, min: u32, max: u32) {
        self.require_role(ROLE_GOVERNOR);
        let result = self.carriers.set_vintage_bounds(min, max);
        self.unwrap_or_revert(result);
    }

    // ========== Contract Addresses ==========

    pub fn get_token(&self) -> Option<Address> {
        self.token.get()
    }

    pub fn get_stable(&self) -> Option<Address> {
        self.stable.get()
    }

    pub fn get_oracle(&self) -> Option<Address> {
        self.oracle.get()
    }
}

impl CsvVault {
    fn fresh_snapshot(&self) -> OracleData {
        let oracle = OracleFeedContractRef::new(
            self.env(),
            self.oracle.get_or_revert_with(ProtocolError::InvalidParameter),
        );
        let (nav, is_stale) = oracle.get_nav();
        if is_stale || nav.is_zero() {
            self.env().revert(ProtocolError::StaleOracle);
        }
        match oracle.latest_data() {
            Some(data) => data,
            None => self.env().revert(ProtocolError::StaleOracle),
        }
    }

    fn token_ref(&self) -> CollateralTokenContractRef {
        let token = self.token.get_or_revert_with(ProtocolError::InvalidParameter);
        CollateralTokenContractRef::new(self.env(), token)
    }

    fn stable_ref(&self) -> StableTokenContractRef {
        let stable = self.stable.get_or_revert_with(ProtocolError::InvalidParameter);
        StableTokenContractRef::new(self.env(), stable)
    }

    fn unwrap_or_revert<T>(&self, result: Result<T, ProtocolError>) -> T {
        match result {
            Ok(value) => value,
            Err(error) => self.env().revert(error),
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
