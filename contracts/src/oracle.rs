//! CSV Oracle Contract
//!
//! Holds the single latest attested snapshot of the insurance portfolio.
//! Implements:
//! - Threshold-signed submission through the embedded attestation registry
//! - Anti-replay via single-use nonces, marked in the same call as the commit
//! - Freshness window and timestamp monotonicity on commit
//! - Lazy freshness on read (no background expiry)
//!
//! Consumers (ledger, vault) read `get_nav()` and decide policy themselves:
//! a stale NAV is still returned, flagged as stale.

use odra::prelude::*;
use odra::casper_types::bytesrepr::Bytes;
use odra::casper_types::U256;
use crate::access_control::ROLE_GOVERNOR;
use crate::attestation::AttestationRegistry;
use crate::errors::ProtocolError;
use crate::guard::ReentrancyGuard;
use crate::interfaces::RolesContractRef;
use crate::signature;
use crate::types::{block_time_secs, AttestorSignature, OracleData, MAX_BPS};

/// Default freshness window in seconds (1 hour)
pub const DEFAULT_FRESHNESS_TIMEOUT: u64 = 3600;

/// Lower bound on the freshness window (5 minutes)
pub const MIN_FRESHNESS_TIMEOUT: u64 = 300;

/// Upper bound on the freshness window (24 hours)
pub const MAX_FRESHNESS_TIMEOUT: u64 = 86_400;

#[odra::event]
pub struct OracleUpdated {
    pub nav_per_token: U256,
    pub timestamp: u64,
    pub nonce: U256,
    pub data_cid: String,
}

#[odra::event]
pub struct FreshnessTimeoutUpdated {
    pub old_timeout: u64,
    pub new_timeout: u64,
}

/// Whether a snapshot taken at `timestamp` is still usable at `now`.
pub fn is_fresh_at(timestamp: u64, now: u64, timeout: u64) -> bool {
    timestamp <= now && now - timestamp <= timeout
}

/// Commit preconditions that depend only on the payload and the clock.
pub fn validate_snapshot(
    data: &OracleData,
    previous_timestamp: Option<u64>,
    now: u64,
    timeout: u64,
) -> Result<(), ProtocolError> {
    if data.timestamp > now {
        return Err(ProtocolError::InvalidParameter);
    }
    if now - data.timestamp > timeout {
        return Err(ProtocolError::StaleData);
    }
    if let Some(previous) = previous_timestamp {
        if data.timestamp < previous {
            return Err(ProtocolError::StaleData);
        }
    }
    if data.nav_per_token.is_zero() {
        return Err(ProtocolError::InvalidParameter);
    }
    if data.utilization_bps > MAX_BPS || data.ltv_bps > MAX_BPS {
        return Err(ProtocolError::InvalidParameter);
    }
    Ok(())
}

/// CSV Oracle Contract
#[odra::module(events = [OracleUpdated, FreshnessTimeoutUpdated])]
pub struct CsvOracle {
    /// AccessControl contract address
    access_control: Var<Address>,
    /// Attestor set, threshold and used nonces
    registry: SubModule<AttestationRegistry>,
    /// Call-in-progress guard
    guard: SubModule<ReentrancyGuard>,
    /// Latest committed snapshot
    latest: Var<OracleData>,
    /// Freshness window in seconds
    freshness_timeout: Var<u64>,
    /// Chain name bound into the signing domain
    chain_name: Var<String>,
}

#[odra::module]
impl CsvOracle {
    /// Initialize the oracle with its attestor set
    pub fn init(
        &mut self,
        access_control: Address,
        chain_name: String,
        attestors: Vec<Address>,
        threshold: u32,
        freshness_timeout: u64,
    ) {
        if !(MIN_FRESHNESS_TIMEOUT..=MAX_FRESHNESS_TIMEOUT).contains(&freshness_timeout) {
            self.env().revert(ProtocolError::InvalidParameter);
        }
        self.access_control.set(access_control);
        self.chain_name.set(chain_name);
        self.freshness_timeout.set(freshness_timeout);
        self.registry.seed(attestors, threshold);
    }

    // ========== Attestation Submission ==========

    /// Verify a threshold-signed snapshot and commit it.
    ///
    /// Anyone may submit; the signatures are the authorization.
    pub fn submit_attestation(&mut self, data: OracleData, signatures: Vec<AttestorSignature>) {
        self.require_not_paused();
        self.guard.enter();

        if let Err(error) = self.commit(data, &signatures) {
            self.env().revert(error);
        }

        self.guard.exit();
    }

    // ========== Read Accessors ==========

    /// Whether the latest snapshot is within the freshness window
    pub fn is_fresh(&self) -> bool {
        match self.latest.get() {
            Some(data) => is_fresh_at(
                data.timestamp,
                block_time_secs(&self.env()),
                self.freshness_timeout(),
            ),
            None => false,
        }
    }

    /// Latest NAV and whether it is stale.
    ///
    /// Returns `(0, true)` before the first commit.
    pub fn get_nav(&self) -> (U256, bool) {
        match self.latest.get() {
            Some(data) => (data.nav_per_token, !self.is_fresh()),
            None => (U256::zero(), true),
        }
    }

    /// Latest committed snapshot
    pub fn latest_data(&self) -> Option<OracleData> {
        self.latest.get()
    }

    /// Freshness window in seconds
    pub fn freshness_timeout(&self) -> u64 {
        self.freshness_timeout.get().unwrap_or(DEFAULT_FRESHNESS_TIMEOUT)
    }

    /// Chain name bound into the signing domain
    pub fn chain_name(&self) -> String {
        self.chain_name.get().unwrap_or_default()
    }

    /// Domain separator attestors must sign under
    pub fn domain_separator(&self) -> Bytes {
        Bytes::from(self.domain().to_vec())
    }

    /// Digest attestors sign for `data`
    pub fn digest_of(&self, data: OracleData) -> Bytes {
        Bytes::from(signature::oracle_data_digest(&self.domain(), &data).to_vec())
    }

    /// Whether a nonce has been consumed
    pub fn is_nonce_used(&self, nonce: U256) -> bool {
        self.registry.is_nonce_used(nonce)
    }

    /// Current attestor set
    pub fn attestors(&self) -> Vec<Address> {
        self.registry.attestors()
    }

    /// Check if an address is an attestor
    pub fn is_attestor(&self, account: Address) -> bool {
        self.registry.is_attestor(account)
    }

    /// Current signature threshold
    pub fn threshold(&self) -> u32 {
        self.registry.threshold()
    }

    /// AccessControl contract address
    pub fn get_access_control(&self) -> Option<Address> {
        self.access_control.get()
    }

    // ========== Governance Functions ==========

    /// Add an attestor (governor only)
    pub fn add_attestor(&mut self, attestor: Address) {
        self.require_role(ROLE_GOVERNOR);
        self.registry.add_attestor(attestor);
    }

    /// Remove an attestor, clamping the threshold if needed (governor only)
    pub fn remove_attestor(&mut self, attestor: Address) {
        self.require_role(ROLE_GOVERNOR);
        self.registry.remove_attestor(attestor);
    }

    /// Set the signature threshold (governor only)
    pub fn update_threshold(&mut self, threshold: u32) {
        self.require_role(ROLE_GOVERNOR);
        self.registry.update_threshold(threshold);
    }

    /// Set the freshness window, bounded to [5 min, 24 h] (governor only)
    pub fn update_freshness_timeout(&mut self, timeout: u64) {
        self.require_role(ROLE_GOVERNOR);
        if !(MIN_FRESHNESS_TIMEOUT..=MAX_FRESHNESS_TIMEOUT).contains(&timeout) {
            self.env().revert(ProtocolError::InvalidParameter);
        }
        let old_timeout = self.freshness_timeout();
        self.freshness_timeout.set(timeout);
        self.env().emit_event(FreshnessTimeoutUpdated {
            old_timeout,
            new_timeout: timeout,
        });
    }
}

impl CsvOracle {
    fn commit(
        &mut self,
        data: OracleData,
        signatures: &[AttestorSignature],
    ) -> Result<(), ProtocolError> {
        if self.registry.is_nonce_used(data.nonce) {
            return Err(ProtocolError::InvalidNonce);
        }

        let now = block_time_secs(&self.env());
        let previous = self.latest.get().map(|latest| latest.timestamp);
        validate_snapshot(&data, previous, now, self.freshness_timeout())?;

        let digest = signature::oracle_data_digest(&self.domain(), &data);
        self.registry.verify_batch(&digest, signatures)?;
        self.registry.consume_nonce(data.nonce)?;

        self.env().emit_event(OracleUpdated {
            nav_per_token: data.nav_per_token,
            timestamp: data.timestamp,
            nonce: data.nonce,
            data_cid: data.data_cid.clone(),
        });
        self.latest.set(data);
        Ok(())
    }

    fn domain(&self) -> [u8; 32] {
        match signature::domain_separator(&self.chain_name(), &self.env().self_address()) {
            Ok(domain) => domain,
            Err(error) => self.env().revert(error),
        }
    }

    fn access_control(&self) -> Address {
        self.access_control
            .get_or_revert_with(ProtocolError::InvalidParameter)
    }

    fn require_role(&self, role_id: u8) {
        let roles = RolesContractRef::new(self.env(), self.access_control());
        if !roles.has_role(role_id, self.env().caller()) {
            self.env().revert(ProtocolError::UnauthorizedRole);
        }
    }

    fn require_not_paused(&self) {
        let roles = RolesContractRef::new(self.env(), self.access_control());
        if roles.is_paused() {
            self.env().revert(ProtocolError::SystemPaused);
        }
    }
}
