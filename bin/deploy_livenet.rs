//! Deploy the CSV protocol to Casper livenet/testnet using Odra livenet environment.
//!
//! Usage:
//!   cargo run --bin deploy_livenet --release
//!
//! Requires .env file with:
//!   ODRA_CASPER_LIVENET_SECRET_KEY_PATH=/path/to/secret_key.pem
//!   ODRA_CASPER_LIVENET_NODE_ADDRESS=https://node.testnet.casper.network
//!   ODRA_CASPER_LIVENET_CHAIN_NAME=casper-test
//!   ODRA_CASPER_LIVENET_PAYMENT_AMOUNT=200000000000
//!   CSV_STABLE_TOKEN=hash-...                          (6-decimal stable asset)
//!   CSV_ATTESTORS=account-hash-...,account-hash-...    (comma separated)
//!   CSV_THRESHOLD=2
//!
//! Optional:
//!   CSV_CHAIN_NAME (defaults to ODRA_CASPER_LIVENET_CHAIN_NAME)
//!   CSV_GUARDIAN   (defaults to the deployer)
//!   CSV_FRESHNESS_TIMEOUT (seconds, defaults to 3600)

use std::str::FromStr;

use odra::casper_types::Key;
use odra::host::Deployer;
use odra::prelude::*;
use serde::Serialize;
use thiserror::Error;

use csv_protocol_contracts::access_control::{
    AccessControl, AccessControlInitArgs, ROLE_OPERATOR,
};
use csv_protocol_contracts::csv_token::{CsvToken, CsvTokenInitArgs};
use csv_protocol_contracts::oracle::{CsvOracle, CsvOracleInitArgs, DEFAULT_FRESHNESS_TIMEOUT};
use csv_protocol_contracts::vault::{CsvVault, CsvVaultInitArgs};

/// Where the deployed addresses are recorded
const DEPLOYMENT_FILE: &str = "deployment.json";

#[derive(Debug, Error)]
enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("{0} contains an invalid address: {1}")]
    InvalidAddress(&'static str, String),
    #[error("{0} must be a number: {1}")]
    InvalidNumber(&'static str, String),
    #[error("CSV_THRESHOLD must be between 1 and the number of attestors ({0})")]
    InvalidThreshold(usize),
}

/// Deployment parameters read from the environment
struct DeployConfig {
    chain_name: String,
    stable_token: Address,
    attestors: Vec<Address>,
    threshold: u32,
    freshness_timeout: u64,
    guardian: Option<Address>,
}

impl DeployConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let chain_name = std::env::var("CSV_CHAIN_NAME")
            .or_else(|_| std::env::var("ODRA_CASPER_LIVENET_CHAIN_NAME"))
            .unwrap_or_else(|_| String::from("casper-test"));
        let stable_token = parse_address("CSV_STABLE_TOKEN", &required_var("CSV_STABLE_TOKEN")?)?;
        let attestors = required_var("CSV_ATTESTORS")?
            .split(',')
            .filter(|entry| !entry.trim().is_empty())
            .map(|entry| parse_address("CSV_ATTESTORS", entry))
            .collect::<Result<Vec<_>, _>>()?;

        let raw_threshold = required_var("CSV_THRESHOLD")?;
        let threshold: u32 = raw_threshold
            .parse()
            .map_err(|_| ConfigError::InvalidNumber("CSV_THRESHOLD", raw_threshold))?;
        if threshold == 0 || threshold as usize > attestors.len() {
            return Err(ConfigError::InvalidThreshold(attestors.len()));
        }

        let freshness_timeout = match std::env::var("CSV_FRESHNESS_TIMEOUT") {
            Ok(value) => value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidNumber("CSV_FRESHNESS_TIMEOUT", value))?,
            Err(_) => DEFAULT_FRESHNESS_TIMEOUT,
        };
        let guardian = match std::env::var("CSV_GUARDIAN") {
            Ok(value) => Some(parse_address("CSV_GUARDIAN", &value)?),
            Err(_) => None,
        };

        Ok(Self {
            chain_name,
            stable_token,
            attestors,
            threshold,
            freshness_timeout,
            guardian,
        })
    }
}

#[derive(Serialize)]
struct DeploymentRecord {
    chain_name: String,
    deployer: String,
    access_control: String,
    oracle: String,
    token: String,
    vault: String,
    stable_token: String,
    attestors: Vec<String>,
    threshold: u32,
}

fn required_var(name: &'static str) -> Result<String, ConfigError> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => Err(ConfigError::Missing(name)),
    }
}

fn parse_address(name: &'static str, value: &str) -> Result<Address, ConfigError> {
    Address::from_str(value.trim())
        .map_err(|_| ConfigError::InvalidAddress(name, value.trim().to_string()))
}

/// `account-hash-...` / `hash-...` form of an address
fn formatted(address: Address) -> String {
    Key::from(address).to_formatted_string()
}

fn main() {
    // Load environment from .env file
    dotenv::dotenv().ok();

    println!("=== CSV Protocol Livenet Deployment ===");
    println!();

    let config = match DeployConfig::from_env() {
        Ok(config) => config,
        Err(error) => {
            eprintln!("Configuration error: {}", error);
            std::process::exit(1);
        }
    };

    // Initialize Odra livenet environment
    let env = odra_casper_livenet_env::env();

    // Configure payment amount for deployments/calls (required for Casper 2.0 txs)
    let payment_amount: u64 = std::env::var("ODRA_CASPER_LIVENET_PAYMENT_AMOUNT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(200_000_000_000);
    env.set_gas(payment_amount);

    let deployer = env.caller();
    println!("Deployer: {:?}", deployer);

    let DeployConfig {
        chain_name,
        stable_token,
        attestors,
        threshold,
        freshness_timeout,
        guardian,
    } = config;
    let guardian = guardian.unwrap_or(deployer);

    println!("Chain name:  {}", chain_name);
    println!("Attestors:   {} (threshold {})", attestors.len(), threshold);
    println!();

    // ==================== Phase 1: Contracts ====================
    println!("=== Phase 1: Deploying Contracts ===");
    println!();

    // 1. AccessControl
    println!("Deploying AccessControl...");
    let mut access_control = AccessControl::deploy(
        &env,
        AccessControlInitArgs {
            governor: deployer,
            guardian,
        },
    );
    let access_control_addr = access_control.address().clone();
    println!("AccessControl deployed at: {:?}", access_control_addr);

    // 2. CsvOracle
    println!("Deploying CsvOracle...");
    let oracle = CsvOracle::deploy(
        &env,
        CsvOracleInitArgs {
            access_control: access_control_addr,
            chain_name: chain_name.clone(),
            attestors: attestors.clone(),
            threshold,
            freshness_timeout,
        },
    );
    let oracle_addr = oracle.address().clone();
    println!("CsvOracle deployed at: {:?}", oracle_addr);

    // 3. CsvToken
    println!("Deploying CsvToken...");
    let token = CsvToken::deploy(
        &env,
        CsvTokenInitArgs {
            access_control: access_control_addr,
            oracle: oracle_addr,
        },
    );
    let token_addr = token.address().clone();
    println!("CsvToken deployed at: {:?}", token_addr);

    // 4. CsvVault
    println!("Deploying CsvVault...");
    let vault = CsvVault::deploy(
        &env,
        CsvVaultInitArgs {
            access_control: access_control_addr,
            oracle: oracle_addr,
            token: token_addr,
            stable: stable_token,
        },
    );
    let vault_addr = vault.address().clone();
    println!("CsvVault deployed at: {:?}", vault_addr);

    println!();

    // ==================== Phase 2: Role Configuration ====================
    println!("=== Phase 2: Role Configuration ===");
    println!();

    // The vault mints, burns and takes redemption custody
    println!("Granting OPERATOR to CsvVault...");
    access_control.grant_role(ROLE_OPERATOR, vault_addr);
    println!("Done.");

    println!();
    println!("=== Deployment Complete ===");
    println!();
    println!("Contract Addresses:");
    println!("  AccessControl:  {:?}", access_control_addr);
    println!("  CsvOracle:      {:?}", oracle_addr);
    println!("  CsvToken:       {:?}", token_addr);
    println!("  CsvVault:       {:?}", vault_addr);
    println!("  Stable asset:   {:?}", stable_token);

    let record = DeploymentRecord {
        chain_name,
        deployer: formatted(deployer),
        access_control: formatted(access_control_addr),
        oracle: formatted(oracle_addr),
        token: formatted(token_addr),
        vault: formatted(vault_addr),
        stable_token: formatted(stable_token),
        attestors: attestors.iter().copied().map(formatted).collect(),
        threshold,
    };
    match serde_json::to_string_pretty(&record) {
        Ok(json) => match std::fs::write(DEPLOYMENT_FILE, json) {
            Ok(()) => println!("Deployment record written to {}", DEPLOYMENT_FILE),
            Err(error) => eprintln!("Could not write {}: {}", DEPLOYMENT_FILE, error),
        },
        Err(error) => eprintln!("Could not serialize deployment record: {}", error),
    }
}
