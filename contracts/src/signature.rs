//! Attestor signature recovery and the oracle data digest.
//!
//! Attestors sign a 32-byte digest with secp256k1 ECDSA. The digest is an
//! EIP-712 style structured hash: every `OracleData` field is bound, and the
//! domain separator binds the protocol name, version, chain name and the
//! oracle contract address so a signature cannot be replayed on another
//! deployment.
//!
//! Signer identity is the Casper account hash of the recovered public key.

use odra::prelude::*;
use odra::casper_types::account::AccountHash;
use odra::casper_types::bytesrepr::ToBytes;
use odra::casper_types::{PublicKey, U256};
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use sha3::{Digest, Keccak256};
use crate::errors::ProtocolError;
use crate::types::OracleData;

/// Protocol name bound into the domain separator
pub const DOMAIN_NAME: &str = "CSV Oracle";

/// Protocol version bound into the domain separator
pub const DOMAIN_VERSION: &str = "1";

/// Length of an `r || s || v` signature
pub const SIGNATURE_LENGTH: usize = 65;

const DOMAIN_TYPE: &[u8] =
    b"CsvOracleDomain(string name,string version,string chainName,bytes verifyingContract)";

const ORACLE_DATA_TYPE: &[u8] = b"OracleData(uint256 navPerToken,uint256 totalSupply,uint16 utilizationBps,uint16 ltvBps,uint64 timestamp,uint64 blockNumber,string dataCID,uint256 nonce)";

/// Keccak-256 of `data`.
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

fn u256_word(value: U256) -> [u8; 32] {
    let mut word = [0u8; 32];
    value.to_big_endian(&mut word);
    word
}

fn u64_word(value: u64) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[24..].copy_from_slice(&value.to_be_bytes());
    word
}

/// Domain separator for one oracle deployment.
pub fn domain_separator(
    chain_name: &str,
    verifying_contract: &Address,
) -> Result<[u8; 32], ProtocolError> {
    let contract_bytes = verifying_contract
        .to_bytes()
        .map_err(|_| ProtocolError::InvalidParameter)?;

    let mut encoded = Vec::with_capacity(32 * 5);
    encoded.extend_from_slice(&keccak256(DOMAIN_TYPE));
    encoded.extend_from_slice(&keccak256(DOMAIN_NAME.as_bytes()));
    encoded.extend_from_slice(&keccak256(DOMAIN_VERSION.as_bytes()));
    encoded.extend_from_slice(&keccak256(chain_name.as_bytes()));
    encoded.extend_from_slice(&keccak256(&contract_bytes));
    Ok(keccak256(&encoded))
}

/// Struct hash over every `OracleData` field.
///
/// Basis-point fields are encoded as `uint16`; callers validate the range first.
pub fn oracle_data_hash(data: &OracleData) -> [u8; 32] {
    let mut encoded = Vec::with_capacity(32 * 9);
    encoded.extend_from_slice(&keccak256(ORACLE_DATA_TYPE));
    encoded.extend_from_slice(&u256_word(data.nav_per_token));
    encoded.extend_from_slice(&u256_word(data.total_supply));
    encoded.extend_from_slice(&u64_word(u64::from(data.utilization_bps as u16)));
    encoded.extend_from_slice(&u64_word(u64::from(data.ltv_bps as u16)));
    encoded.extend_from_slice(&u64_word(data.timestamp));
    encoded.extend_from_slice(&u64_word(data.block_number));
    encoded.extend_from_slice(&keccak256(data.data_cid.as_bytes()));
    encoded.extend_from_slice(&u256_word(data.nonce));
    keccak256(&encoded)
}

/// Digest attestors sign: `keccak(0x19 0x01 || domain || struct_hash)`.
pub fn oracle_data_digest(domain: &[u8; 32], data: &OracleData) -> [u8; 32] {
    let mut encoded = Vec::with_capacity(2 + 64);
    encoded.extend_from_slice(&[0x19, 0x01]);
    encoded.extend_from_slice(domain);
    encoded.extend_from_slice(&oracle_data_hash(data));
    keccak256(&encoded)
}

fn parse_recovery_id(v: u8) -> Result<RecoveryId, ProtocolError> {
    let id = match v {
        0 | 27 => 0,
        1 | 28 => 1,
        _ => return Err(ProtocolError::InvalidSignature),
    };
    RecoveryId::from_byte(id).ok_or(ProtocolError::InvalidSignature)
}

/// Signer identity for a secp256k1 verifying key.
pub fn address_from_verifying_key(key: &VerifyingKey) -> Result<Address, ProtocolError> {
    let encoded = key.to_encoded_point(true);
    let public_key = PublicKey::secp256k1_from_bytes(encoded.as_bytes())
        .map_err(|_| ProtocolError::InvalidSignature)?;
    Ok(Address::Account(AccountHash::from(&public_key)))
}

/// Recover the signer of `message_hash`.
///
/// Rejects anything but a 65-byte low-s signature with a valid recovery byte.
pub fn recover(message_hash: &[u8; 32], signature: &[u8]) -> Result<Address, ProtocolError> {
    if signature.len() != SIGNATURE_LENGTH {
        return Err(ProtocolError::InvalidSignature);
    }

    let recovery_id = parse_recovery_id(signature[64])?;
    let sig = Signature::from_slice(&signature[..64]).map_err(|_| ProtocolError::InvalidSignature)?;

    // High-s would give a second valid encoding of the same signature
    if sig.normalize_s().is_some() {
        return Err(ProtocolError::InvalidSignature);
    }

    let key = VerifyingKey::recover_from_prehash(message_hash, &sig, recovery_id)
        .map_err(|_| ProtocolError::InvalidSignature)?;
    address_from_verifying_key(&key)
}
