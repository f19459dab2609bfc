//! Common types used across the CSV protocol.

use odra::prelude::*;
use odra::casper_types::bytesrepr::Bytes;
use odra::casper_types::U256;

/// Maximum value of any basis-point field (100%)
pub const MAX_BPS: u32 = 10_000;

/// Attested oracle snapshot.
///
/// Committed wholesale by the oracle; never partially updated.
#[odra::odra_type]
pub struct OracleData {
    /// NAV per CSV token, 1e18 fixed point (USD)
    pub nav_per_token: U256,
    /// CSV supply the attestors valued
    pub total_supply: U256,
    /// Portfolio utilization in bps (0-10000)
    pub utilization_bps: u32,
    /// Portfolio loan-to-value in bps (0-10000)
    pub ltv_bps: u32,
    /// Observation time in seconds
    pub timestamp: u64,
    /// Block height the attestors observed
    pub block_number: u64,
    /// Content address of the detailed backing data
    pub data_cid: String,
    /// Single-use nonce
    pub nonce: U256,
}

/// One attestor's signature over an `OracleData` digest.
#[odra::odra_type]
pub struct AttestorSignature {
    /// Identity the submitter claims produced the signature
    pub attestor: Address,
    /// 65-byte `r || s || v` secp256k1 signature
    pub signature: Bytes,
}

/// Aggregate exposure to a single insurance carrier.
#[odra::odra_type]
#[derive(Default)]
pub struct CarrierExposure {
    /// Total cash surrender value attributed to the carrier (1e18 USD)
    pub total_value: U256,
    /// Number of policies issued by the carrier
    pub policy_count: u32,
    /// Whether the carrier is in the active list
    pub is_active: bool,
}

/// Redemption request record.
///
/// Only `processed` changes after creation. Records are never deleted.
#[odra::odra_type]
pub struct RedemptionRequest {
    /// Requester, and recipient of the settlement
    pub user: Address,
    /// CSV locked in vault custody
    pub csv_amount: U256,
    /// Request time in seconds
    pub request_time: u64,
    /// Stable-asset value locked at request time
    pub value_at_request: U256,
    /// Set once the request is settled
    pub processed: bool,
}

/// Current block time in seconds.
///
/// Odra reports block time in milliseconds.
pub fn block_time_secs(env: &odra::ContractEnv) -> u64 {
    env.get_block_time() / 1000
}
