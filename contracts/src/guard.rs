//! Call-in-progress guard.
//!
//! Embedded as a submodule in every contract that moves value or makes
//! outgoing calls. `enter` reverts if the flag is already set; `exit` clears
//! it. A revert discards the whole call's writes, so a failing call can never
//! leave the flag set.

use odra::prelude::*;
use crate::errors::ProtocolError;

#[odra::module]
pub struct ReentrancyGuard {
    locked: Var<bool>,
}

#[odra::module]
impl ReentrancyGuard {
    /// Whether a guarded call is in progress
    pub fn is_locked(&self) -> bool {
        self.locked.get().unwrap_or(false)
    }
}

impl ReentrancyGuard {
    pub(crate) fn enter(&mut self) {
        if self.is_locked() {
            self.env().revert(ProtocolError::ReentrantCall);
        }
        self.locked.set(true);
    }

    pub(crate) fn exit(&mut self) {
        self.locked.set(false);
    }
}
