//! Attestation Registry
//!
//! Authorized attestor set, k-of-n threshold and the used-nonce set.
//! Embedded in the oracle contract as a submodule; the oracle enforces the
//! governor role before calling the mutating functions here.
//!
//! ## Batch rules
//!
//! Signatures are processed in order. Each processed signature must recover
//! to the identity it claims, be strictly greater than the previous accepted
//! signer (ascending and duplicate-free), and belong to an attestor.
//! Scanning stops at `threshold` valid signatures.

use odra::prelude::*;
use odra::casper_types::U256;
use crate::access_control::zero_address;
use crate::errors::ProtocolError;
use crate::signature;
use crate::types::AttestorSignature;

/// Maximum size of the attestor set
pub const MAX_ATTESTORS: u32 = 10;

#[odra::event]
pub struct AttestorAdded {
    pub attestor: Address,
}

#[odra::event]
pub struct AttestorRemoved {
    pub attestor: Address,
}

#[odra::event]
pub struct ThresholdUpdated {
    pub old_threshold: u32,
    pub new_threshold: u32,
}

#[odra::module(events = [AttestorAdded, AttestorRemoved, ThresholdUpdated])]
pub struct AttestationRegistry {
    /// Attestor list: index -> attestor
    attestors: Mapping<u32, Address>,
    /// Attestor position in the list, 1-based (0 = not an attestor)
    positions: Mapping<Address, u32>,
    /// Number of attestors
    attestor_count: Var<u32>,
    /// Signatures required per update
    threshold: Var<u32>,
    /// Consumed nonces, never pruned
    used_nonces: Mapping<U256, bool>,
}

#[odra::module]
impl AttestationRegistry {
    /// Check if an address is an attestor
    pub fn is_attestor(&self, account: Address) -> bool {
        self.positions.get(&account).unwrap_or(0) > 0
    }

    /// Number of attestors
    pub fn attestor_count(&self) -> u32 {
        self.attestor_count.get().unwrap_or(0)
    }

    /// Current signature threshold
    pub fn threshold(&self) -> u32 {
        self.threshold.get().unwrap_or(0)
    }

    /// All attestors in list order
    pub fn attestors(&self) -> Vec<Address> {
        let count = self.attestor_count();
        let mut list = Vec::new();
        for i in 0..count {
            if let Some(attestor) = self.attestors.get(&i) {
                list.push(attestor);
            }
        }
        list
    }

    /// Whether a nonce has been consumed
    pub fn is_nonce_used(&self, nonce: U256) -> bool {
        self.used_nonces.get(&nonce).unwrap_or(false)
    }
}

impl AttestationRegistry {
    /// Seed the attestor set and threshold at deployment.
    pub(crate) fn seed(&mut self, attestors: Vec<Address>, threshold: u32) {
        for attestor in attestors {
            self.add_attestor(attestor);
        }
        self.update_threshold(threshold);
    }

    pub(crate) fn add_attestor(&mut self, attestor: Address) {
        if attestor == zero_address() {
            self.env().revert(ProtocolError::ZeroAddress);
        }
        let count = self.attestor_count();
        if self.is_attestor(attestor) || count >= MAX_ATTESTORS {
            self.env().revert(ProtocolError::InvalidParameter);
        }

        self.attestors.set(&count, attestor);
        self.positions.set(&attestor, count + 1);
        self.attestor_count.set(count + 1);

        self.env().emit_event(AttestorAdded { attestor });
    }

    /// Swap-remove an attestor, clamping the threshold to the new set size.
    pub(crate) fn remove_attestor(&mut self, attestor: Address) {
        let position = self.positions.get(&attestor).unwrap_or(0);
        if position == 0 {
            self.env().revert(ProtocolError::UnauthorizedAttestor);
        }
        let count = self.attestor_count();
        // The threshold could not stay >= 1
        if count <= 1 {
            self.env().revert(ProtocolError::InvalidParameter);
        }

        let index = position - 1;
        let last_index = count - 1;
        if index != last_index {
            if let Some(last) = self.attestors.get(&last_index) {
                self.attestors.set(&index, last);
                self.positions.set(&last, index + 1);
            }
        }
        self.positions.set(&attestor, 0);
        let new_count = count - 1;
        self.attestor_count.set(new_count);

        self.env().emit_event(AttestorRemoved { attestor });

        let threshold = self.threshold();
        if threshold > new_count {
            self.threshold.set(new_count);
            self.env().emit_event(ThresholdUpdated {
                old_threshold: threshold,
                new_threshold: new_count,
            });
        }
    }

    pub(crate) fn update_threshold(&mut self, new_threshold: u32) {
        if new_threshold < 1 || new_threshold > self.attestor_count() {
            self.env().revert(ProtocolError::InvalidParameter);
        }
        let old_threshold = self.threshold();
        self.threshold.set(new_threshold);
        self.env().emit_event(ThresholdUpdated {
            old_threshold,
            new_threshold,
        });
    }

    /// Count valid signatures over `digest`, stopping at the threshold.
    ///
    /// Returns the number of accepted signatures (always `threshold` on success).
    pub(crate) fn verify_batch(
        &self,
        digest: &[u8; 32],
        signatures: &[AttestorSignature],
    ) -> Result<u32, ProtocolError> {
        let threshold = self.threshold();
        if threshold == 0 {
            return Err(ProtocolError::InsufficientAttestors);
        }

        let mut accepted = 0u32;
        let mut previous: Option<Address> = None;

        for entry in signatures {
            let signer = signature::recover(digest, &entry.signature)?;
            if signer != entry.attestor {
                return Err(ProtocolError::InvalidSignature);
            }
            if let Some(prev) = previous {
                if signer <= prev {
                    return Err(ProtocolError::InvalidSignature);
                }
            }
            if !self.is_attestor(signer) {
                return Err(ProtocolError::UnauthorizedAttestor);
            }

            previous = Some(signer);
            accepted += 1;
            if accepted == threshold {
                return Ok(accepted);
            }
        }

        Err(ProtocolError::InsufficientAttestors)
    }

    /// Mark a nonce as consumed.
    pub(crate) fn consume_nonce(&mut self, nonce: U256) -> Result<(), ProtocolError> {
        if self.is_nonce_used(nonce) {
            return Err(ProtocolError::InvalidNonce);
        }
        self.used_nonces.set(&nonce, true);
        Ok(())
    }
}
