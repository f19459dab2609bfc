//! CSV Protocol Contracts
//!
//! Casper-native tokenization of an insurance portfolio (CSV) whose NAV is
//! reported by a threshold of off-chain attestors.
//!
//! ## Architecture
//!
//! - **AccessControl**: Role table and global pause switch
//! - **CsvOracle**: k-of-n signed NAV snapshots with replay and freshness checks
//! - **CsvToken**: CEP-18 token with the built-in collateral ledger (LTV cap)
//! - **CsvVault**: Stable deposits, 7-day redemption queue, carrier exposures
//!
//! ## Circuit Breaker
//!
//! One pause switch in AccessControl, checked first in every operational
//! entry point: attestation submission, deposit, redemption request and
//! settlement, CEP-18 transfer/approve, mint, burn, custody moves and carrier
//! reporting.
//!
//! Governance entry points are exempt so the governor can repair parameters
//! before resuming: attestor set, threshold and freshness timeout on the
//! oracle, LTV cap and compliance registry on the token, concentration cap and
//! vintage bounds on the vault, role grants and `unpause` itself. The
//! guardian's collateral override is exempt as well.

#![cfg_attr(target_arch = "wasm32", no_std)]

#[cfg(target_arch = "wasm32")]
extern crate alloc;

// Re-export odra for downstream usage
pub use odra;

// Core module declarations
pub mod types;
pub mod errors;
pub mod interfaces;
pub mod valuation;
pub mod signature;
pub mod guard;

// Contract modules
pub mod access_control;
pub mod attestation;
pub mod oracle;
pub mod csv_token;
pub mod carrier;
pub mod vault;
