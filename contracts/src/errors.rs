//! Protocol error definitions.

use odra::prelude::*;

/// CSV protocol errors
#[repr(u16)]
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ProtocolError {
    // Oracle errors (1xx)
    StaleData = 100,
    StaleOracle = 101,
    InsufficientAttestors = 102,
    InvalidSignature = 103,
    UnauthorizedAttestor = 104,
    InvalidNonce = 105,

    // Input errors (2xx)
    ZeroAddress = 200,
    InvalidParameter = 201,
    InvalidAmount = 202,

    // Collateral errors (3xx)
    InsufficientCollateral = 300,
    ExcessiveConcentration = 301,
    InsufficientLiquidity = 302,

    // Redemption errors (4xx)
    RedemptionNotReady = 400,
    RedemptionAlreadyProcessed = 401,
    NoRedemptionFound = 402,

    // Access control errors (5xx)
    SystemPaused = 500,
    UnauthorizedRole = 501,
    ReentrantCall = 502,
    TransferBlocked = 503,

    // Token errors (6xx)
    InsufficientBalance = 600,
    InsufficientAllowance = 601,
}

impl ProtocolError {
    pub const fn message(&self) -> &'static str {
        match self {
            // Oracle
            ProtocolError::StaleData => "Oracle data outside freshness window",
            ProtocolError::StaleOracle => "Oracle NAV is stale",
            ProtocolError::InsufficientAttestors => "Not enough valid attestor signatures",
            ProtocolError::InvalidSignature => "Invalid signature or signer order",
            ProtocolError::UnauthorizedAttestor => "Signer is not an attestor",
            ProtocolError::InvalidNonce => "Nonce already used",

            // Input
            ProtocolError::ZeroAddress => "Zero address",
            ProtocolError::InvalidParameter => "Invalid parameter",
            ProtocolError::InvalidAmount => "Invalid amount",

            // Collateral
            ProtocolError::InsufficientCollateral => "Insufficient collateral",
            ProtocolError::ExcessiveConcentration => "LTV or concentration cap exceeded",
            ProtocolError::InsufficientLiquidity => "Insufficient liquidity for settlement",

            // Redemption
            ProtocolError::RedemptionNotReady => "Redemption delay not elapsed",
            ProtocolError::RedemptionAlreadyProcessed => "Redemption already processed",
            ProtocolError::NoRedemptionFound => "Redemption not found",

            // Access control
            ProtocolError::SystemPaused => "Operation blocked: system paused",
            ProtocolError::UnauthorizedRole => "Unauthorized: missing role",
            ProtocolError::ReentrantCall => "Reentrant call",
            ProtocolError::TransferBlocked => "Transfer rejected by compliance registry",

            // Token
            ProtocolError::InsufficientBalance => "Insufficient token balance",
            ProtocolError::InsufficientAllowance => "Insufficient allowance",
        }
    }
}

impl core::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.message())
    }
}

impl From<ProtocolError> for OdraError {
    fn from(error: ProtocolError) -> Self {
        #[cfg(target_arch = "wasm32")]
        {
            OdraError::user(error as u16)
        }

        #[cfg(not(target_arch = "wasm32"))]
        {
            OdraError::user(error as u16, error.message())
        }
    }
}
