use odra::casper_types::U256;
use odra::host::{Deployer, HostRef, NoArgs};
use odra::prelude::*;
use pretty_assertions::assert_eq;

use csv_protocol_contracts::access_control::ROLE_OPERATOR;
use csv_protocol_contracts::errors::ProtocolError;
use csv_protocol_contracts::types::RedemptionRequest;
use csv_protocol_contracts::vault::{
    CsvVault, CsvVaultInitArgs, RedemptionProcessed, REDEMPTION_DELAY,
};

use crate::fixtures::{csv, nav_tenths, usd, Protocol};
use crate::mocks::{MockCompliance, ReentrantStable};

/// Attested portfolio LTV used by most scenarios
const LTV: u32 = 7000;

fn funded_protocol() -> Protocol {
    let mut p = Protocol::deploy();
    p.commit(nav_tenths(10), LTV);
    let user = p.user;
    p.deposit_as(user, usd(1000));
    p
}

#[test]
fn test_deposit_redeem_scenario() {
    let mut p = Protocol::deploy();
    p.commit(nav_tenths(10), LTV);

    let user = p.user;
    let minted = p.deposit_as(user, usd(1000));
    assert_eq!(minted, csv(1000));
    assert_eq!(p.token.balance_of(user), csv(1000));
    assert_eq!(p.vault.available_liquidity(), usd(1000));
    assert!(p.token.current_ltv() <= U256::from(8000u64));

    p.env.set_caller(user);
    let request_id = p.vault.request_redemption(csv(500));
    assert_eq!(request_id, 1);

    let request_time = p.now();
    assert_eq!(
        p.vault.get_request(request_id),
        Some(RedemptionRequest {
            user,
            csv_amount: csv(500),
            request_time,
            value_at_request: usd(500),
            processed: false,
        })
    );
    assert_eq!(p.token.balance_of(user), csv(500));
    assert_eq!(p.token.balance_of(p.vault.address().clone()), csv(500));
    assert_eq!(p.vault.pending_redemptions(), usd(500));

    // NAV moves up while the request matures
    p.advance_secs(REDEMPTION_DELAY);
    p.env.set_caller(p.governor);
    p.commit(nav_tenths(15), LTV);

    p.env.set_caller(p.other);
    p.vault.process_redemption(request_id);

    assert_eq!(p.stable.balance_of(user), usd(500));
    assert_eq!(p.vault.available_liquidity(), usd(500));
    assert_eq!(p.vault.pending_redemptions(), U256::zero());
    assert_eq!(p.token.total_supply(), csv(500));
    assert_eq!(p.token.balance_of(p.vault.address().clone()), U256::zero());
    assert!(p.env.emitted_event(
        &p.vault,
        RedemptionProcessed {
            request_id,
            user,
            csv_amount: csv(500),
            settlement: usd(500),
            nav_per_token: nav_tenths(15),
        }
    ));
}

#[test]
fn test_settlement_follows_nav_down() {
    let mut p = funded_protocol();
    p.env.set_caller(p.user);
    let request_id = p.vault.request_redemption(csv(100));

    p.advance_secs(REDEMPTION_DELAY);
    p.commit(nav_tenths(8), LTV);
    p.vault.process_redemption(request_id);

    assert_eq!(p.stable.balance_of(p.user), usd(80));
}

#[test]
fn test_processing_is_idempotent() {
    let mut p = funded_protocol();
    p.env.set_caller(p.user);
    let request_id = p.vault.request_redemption(csv(100));
    p.advance_secs(REDEMPTION_DELAY);
    p.commit(nav_tenths(10), LTV);

    p.vault.process_redemption(request_id);
    assert_eq!(
        p.vault.try_process_redemption(request_id),
        Err(ProtocolError::RedemptionAlreadyProcessed.into())
    );
    assert_eq!(p.stable.balance_of(p.user), usd(100));
    assert!(p.vault.user_pending_requests(p.user).is_empty());
}

#[test]
fn test_redemption_delay_is_enforced() {
    let mut p = funded_protocol();
    p.env.set_caller(p.user);
    let request_id = p.vault.request_redemption(csv(100));
    assert!(!p.vault.is_ready(request_id));

    p.advance_secs(REDEMPTION_DELAY - 1);
    p.commit(nav_tenths(10), LTV);
    assert_eq!(
        p.vault.try_process_redemption(request_id),
        Err(ProtocolError::RedemptionNotReady.into())
    );

    p.advance_secs(1);
    assert!(p.vault.is_ready(request_id));
    p.vault.process_redemption(request_id);
}

#[test]
fn test_unknown_request() {
    let mut p = funded_protocol();
    assert_eq!(
        p.vault.try_process_redemption(42),
        Err(ProtocolError::NoRedemptionFound.into())
    );
    assert_eq!(p.vault.get_request(42), None);
    assert!(!p.vault.is_ready(42));
}

#[test]
fn test_processing_requires_fresh_nav() {
    let mut p = funded_protocol();
    p.env.set_caller(p.user);
    let request_id = p.vault.request_redemption(csv(100));

    p.advance_secs(REDEMPTION_DELAY);
    assert_eq!(
        p.vault.try_process_redemption(request_id),
        Err(ProtocolError::StaleOracle.into())
    );
}

#[test]
fn test_insufficient_liquidity_is_retryable() {
    let mut p = funded_protocol();
    p.env.set_caller(p.user);
    let request_id = p.vault.request_redemption(csv(500));

    let vault = p.vault.address().clone();
    p.stable.burn(vault, usd(900));

    p.advance_secs(REDEMPTION_DELAY);
    p.commit(nav_tenths(10), LTV);
    assert_eq!(
        p.vault.try_process_redemption(request_id),
        Err(ProtocolError::InsufficientLiquidity.into())
    );
    assert_eq!(p.vault.user_pending_requests(p.user), vec![request_id]);
    assert_eq!(p.vault.pending_redemptions(), usd(500));

    p.stable.mint(vault, usd(400));
    p.vault.process_redemption(request_id);
    assert_eq!(p.stable.balance_of(p.user), usd(500));
}

#[test]
fn test_request_validation() {
    let mut p = funded_protocol();
    p.env.set_caller(p.user);

    assert_eq!(
        p.vault.try_request_redemption(U256::zero()),
        Err(ProtocolError::InvalidAmount.into())
    );
    assert_eq!(
        p.vault.try_request_redemption(csv(1001)),
        Err(ProtocolError::InsufficientCollateral.into())
    );

    p.advance_secs(3601);
    assert_eq!(
        p.vault.try_request_redemption(csv(1)),
        Err(ProtocolError::StaleOracle.into())
    );
}

#[test]
fn test_user_request_index() {
    let mut p = funded_protocol();
    p.env.set_caller(p.user);
    let first = p.vault.request_redemption(csv(100));
    let second = p.vault.request_redemption(csv(200));
    assert_eq!((first, second), (1, 2));

    assert_eq!(p.vault.user_request_count(p.user), 2);
    assert_eq!(p.vault.user_request_at(p.user, 0), Some(first));
    assert_eq!(p.vault.user_request_at(p.user, 1), Some(second));
    assert_eq!(p.vault.user_request_at(p.user, 2), None);
    assert_eq!(p.vault.user_pending_requests(p.user), vec![first, second]);
    assert_eq!(p.vault.pending_redemptions(), usd(300));

    p.advance_secs(REDEMPTION_DELAY);
    p.commit(nav_tenths(10), LTV);
    p.vault.process_redemption(first);
    assert_eq!(p.vault.user_pending_requests(p.user), vec![second]);
    assert_eq!(p.vault.pending_redemptions(), usd(200));
}

#[test]
fn test_deposit_validation() {
    let mut p = Protocol::deploy();
    let user = p.user;
    p.stable.mint(user, usd(1000));
    p.env.set_caller(user);
    p.stable.approve(p.vault.address().clone(), usd(1000));

    // No snapshot yet
    assert_eq!(
        p.vault.try_deposit(usd(1000), U256::zero()),
        Err(ProtocolError::StaleOracle.into())
    );

    p.commit(nav_tenths(10), LTV);
    assert_eq!(
        p.vault.try_deposit(U256::zero(), U256::zero()),
        Err(ProtocolError::InvalidAmount.into())
    );
    assert_eq!(
        p.vault.try_deposit(usd(1000), csv(1001)),
        Err(ProtocolError::InsufficientCollateral.into())
    );
    assert_eq!(p.vault.deposit(usd(1000), csv(1000)), csv(1000));
}

#[test]
fn test_deposit_at_premium_nav() {
    let mut p = Protocol::deploy();
    p.commit(nav_tenths(20), LTV);
    let user = p.user;
    assert_eq!(p.deposit_as(user, usd(1000)), csv(500));
}

#[test]
fn test_deposit_requires_nonzero_attested_ltv() {
    let mut p = Protocol::deploy();
    p.commit(nav_tenths(10), 0);
    let user = p.user;
    p.stable.mint(user, usd(10));
    p.env.set_caller(user);
    p.stable.approve(p.vault.address().clone(), usd(10));
    assert_eq!(
        p.vault.try_deposit(usd(10), U256::zero()),
        Err(ProtocolError::InvalidParameter.into())
    );
}

#[test]
fn test_repeated_small_deposits_stay_within_cap() {
    let mut p = Protocol::deploy();
    p.commit(nav_tenths(10), 8000);
    let user = p.user;
    for _ in 0..5 {
        p.deposit_as(user, U256::from(1_000_001u64));
        let ltv = p.token.current_ltv();
        assert!(ltv <= U256::from(8000u64));
        assert!(ltv >= U256::from(7999u64));
    }
}

#[test]
fn test_operations_blocked_while_paused() {
    let mut p = funded_protocol();
    p.env.set_caller(p.user);
    let request_id = p.vault.request_redemption(csv(100));

    p.env.set_caller(p.guardian);
    p.access_control.pause();

    p.env.set_caller(p.user);
    assert_eq!(
        p.vault.try_deposit(usd(1), U256::zero()),
        Err(ProtocolError::SystemPaused.into())
    );
    assert_eq!(
        p.vault.try_request_redemption(csv(1)),
        Err(ProtocolError::SystemPaused.into())
    );
    assert_eq!(
        p.vault.try_process_redemption(request_id),
        Err(ProtocolError::SystemPaused.into())
    );

    // Pending requests survive the pause
    assert_eq!(p.vault.user_pending_requests(p.user), vec![request_id]);
}

#[test]
fn test_blocked_holder_cannot_queue_or_mint() {
    let mut p = funded_protocol();
    let mut compliance = MockCompliance::deploy(&p.env, NoArgs);
    p.token.set_compliance_registry(Some(compliance.address().clone()));
    compliance.set_blocked(p.user, true);

    let user = p.user;
    p.env.set_caller(user);
    assert_eq!(
        p.vault.try_request_redemption(csv(100)),
        Err(ProtocolError::TransferBlocked.into())
    );
    assert_eq!(p.token.balance_of(user), csv(1000));
    assert_eq!(p.vault.pending_redemptions(), U256::zero());
    assert_eq!(p.vault.user_request_count(user), 0);

    p.stable.mint(user, usd(10));
    p.stable.approve(p.vault.address().clone(), usd(10));
    assert_eq!(
        p.vault.try_deposit(usd(10), U256::zero()),
        Err(ProtocolError::TransferBlocked.into())
    );
    assert_eq!(p.stable.balance_of(user), usd(10));

    compliance.set_blocked(user, false);
    assert_eq!(p.vault.request_redemption(csv(100)), 1);
}

#[test]
fn test_reentrant_payout_is_rejected() {
    let mut p = Protocol::deploy();
    p.commit(nav_tenths(10), LTV);

    let mut stable = ReentrantStable::deploy(&p.env, NoArgs);
    let mut vault = CsvVault::deploy(
        &p.env,
        CsvVaultInitArgs {
            access_control: p.access_control.address().clone(),
            oracle: p.oracle.address().clone(),
            token: p.token.address().clone(),
            stable: stable.address().clone(),
        },
    );
    p.access_control.grant_role(ROLE_OPERATOR, vault.address().clone());

    let user = p.user;
    stable.mint(user, usd(1000));
    p.env.set_caller(user);
    stable.approve(vault.address().clone(), usd(1000));
    vault.deposit(usd(1000), U256::zero());
    let request_id = vault.request_redemption(csv(500));

    p.advance_secs(REDEMPTION_DELAY);
    p.env.set_caller(p.governor);
    p.commit(nav_tenths(10), LTV);
    stable.arm(vault.address().clone(), request_id);

    assert_eq!(
        vault.try_process_redemption(request_id),
        Err(ProtocolError::ReentrantCall.into())
    );
    assert!(!vault.get_request(request_id).unwrap().processed);
    assert_eq!(vault.pending_redemptions(), usd(500));
    assert_eq!(stable.balance_of(user), U256::zero());
    assert_eq!(p.token.balance_of(vault.address().clone()), csv(500));

    // A well-behaved payout settles the same request
    stable.disarm();
    vault.process_redemption(request_id);
    assert_eq!(stable.balance_of(user), usd(500));
    assert_eq!(vault.pending_redemptions(), U256::zero());
}
