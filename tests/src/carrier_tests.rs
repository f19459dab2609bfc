use odra::casper_types::U256;
use pretty_assertions::assert_eq;

use csv_protocol_contracts::access_control::ROLE_ORACLE;
use csv_protocol_contracts::carrier::{ConcentrationCapUpdated, VintageBoundsUpdated};
use csv_protocol_contracts::errors::ProtocolError;
use csv_protocol_contracts::types::CarrierExposure;

use crate::fixtures::{csv, nav_tenths, usd, Protocol};

/// Deposit 700 USD at 70% LTV, giving 1000 of ledger collateral
fn reporting_protocol() -> Protocol {
    let mut p = Protocol::deploy();
    p.commit(nav_tenths(10), 7000);
    let user = p.user;
    p.deposit_as(user, usd(700));
    p.access_control.grant_role(ROLE_ORACLE, p.reporter);
    p.env.set_caller(p.reporter);
    p
}

fn carrier(name: &str) -> String {
    String::from(name)
}

#[test]
fn test_defaults() {
    let p = Protocol::deploy();
    assert_eq!(p.vault.concentration_cap(), 2500);
    assert_eq!(p.vault.vintage_bounds(), (1980, 2100));
    assert!(p.vault.active_carriers().is_empty());
    assert_eq!(p.vault.carrier_exposure(carrier("none")), CarrierExposure::default());
}

#[test]
fn test_exposure_lifecycle() {
    let mut p = reporting_protocol();
    assert_eq!(p.token.total_collateral_value(), csv(1000));

    p.vault.update_carrier_exposure(carrier("Lincoln"), csv(200), 12, 2005);
    assert_eq!(p.vault.active_carriers(), vec![carrier("Lincoln")]);
    assert_eq!(
        p.vault.carrier_exposure(carrier("Lincoln")),
        CarrierExposure {
            total_value: csv(200),
            policy_count: 12,
            is_active: true,
        }
    );

    // Returning to zero deactivates; the count persists
    p.vault.update_carrier_exposure(carrier("Lincoln"), U256::zero(), 12, 2005);
    assert!(p.vault.active_carriers().is_empty());
    assert_eq!(
        p.vault.carrier_exposure(carrier("Lincoln")),
        CarrierExposure {
            total_value: U256::zero(),
            policy_count: 12,
            is_active: false,
        }
    );

    p.vault.update_carrier_exposure(carrier("Lincoln"), csv(100), 13, 2006);
    assert_eq!(p.vault.active_carriers(), vec![carrier("Lincoln")]);
}

#[test]
fn test_zero_report_for_unknown_carrier_creates_nothing() {
    let mut p = reporting_protocol();
    p.vault.update_carrier_exposure(carrier("Lincoln"), U256::zero(), 12, 2005);
    assert!(p.vault.active_carriers().is_empty());
    assert_eq!(p.vault.carrier_exposure(carrier("Lincoln")), CarrierExposure::default());
}

#[test]
fn test_deactivation_swaps_last_into_place() {
    let mut p = reporting_protocol();
    for name in ["A", "B", "C"] {
        p.vault.update_carrier_exposure(carrier(name), csv(100), 1, 2000);
    }
    p.vault.update_carrier_exposure(carrier("A"), U256::zero(), 1, 2000);
    assert_eq!(p.vault.active_carriers(), vec![carrier("C"), carrier("B")]);

    p.vault.update_carrier_exposure(carrier("B"), U256::zero(), 1, 2000);
    assert_eq!(p.vault.active_carriers(), vec![carrier("C")]);
}

#[test]
fn test_concentration_cap() {
    let mut p = reporting_protocol();
    p.vault.update_carrier_exposure(carrier("Lincoln"), csv(250), 1, 2000);
    assert_eq!(
        p.vault.try_update_carrier_exposure(carrier("Lincoln"), csv(251), 1, 2000),
        Err(ProtocolError::ExcessiveConcentration.into())
    );

    p.env.set_caller(p.governor);
    p.vault.update_concentration_cap(3000);
    assert!(p.env.emitted_event(
        &p.vault,
        ConcentrationCapUpdated {
            old_cap_bps: 2500,
            new_cap_bps: 3000,
        }
    ));
    p.env.set_caller(p.reporter);
    p.vault.update_carrier_exposure(carrier("Lincoln"), csv(300), 1, 2000);
}

#[test]
fn test_input_validation() {
    let mut p = reporting_protocol();
    assert_eq!(
        p.vault.try_update_carrier_exposure(String::new(), csv(1), 1, 2000),
        Err(ProtocolError::InvalidParameter.into())
    );
    assert_eq!(
        p.vault.try_update_carrier_exposure(carrier("Lincoln"), csv(1), 1, 1979),
        Err(ProtocolError::InvalidParameter.into())
    );
    assert_eq!(
        p.vault.try_update_carrier_exposure(carrier("Lincoln"), csv(1), 1, 2101),
        Err(ProtocolError::InvalidParameter.into())
    );
}

#[test]
fn test_reporting_requires_oracle_role() {
    let mut p = reporting_protocol();
    p.env.set_caller(p.user);
    assert_eq!(
        p.vault.try_update_carrier_exposure(carrier("Lincoln"), csv(1), 1, 2000),
        Err(ProtocolError::UnauthorizedRole.into())
    );
}

#[test]
fn test_reporting_blocked_while_paused() {
    let mut p = reporting_protocol();
    p.env.set_caller(p.guardian);
    p.access_control.pause();
    p.env.set_caller(p.reporter);
    assert_eq!(
        p.vault.try_update_carrier_exposure(carrier("Lincoln"), csv(1), 1, 2000),
        Err(ProtocolError::SystemPaused.into())
    );
}

#[test]
fn test_parameter_governance() {
    let mut p = reporting_protocol();
    assert_eq!(
        p.vault.try_update_concentration_cap(3000),
        Err(ProtocolError::UnauthorizedRole.into())
    );

    p.env.set_caller(p.governor);
    assert_eq!(
        p.vault.try_update_concentration_cap(0),
        Err(ProtocolError::InvalidParameter.into())
    );
    assert_eq!(
        p.vault.try_update_concentration_cap(10_001),
        Err(ProtocolError::InvalidParameter.into())
    );
    assert_eq!(
        p.vault.try_update_vintage_bounds(2010, 2000),
        Err(ProtocolError::InvalidParameter.into())
    );

    p.vault.update_vintage_bounds(1990, 2030);
    assert_eq!(p.vault.vintage_bounds(), (1990, 2030));
    assert!(p.env.emitted_event(
        &p.vault,
        VintageBoundsUpdated {
            old_min: 1980,
            old_max: 2100,
            new_min: 1990,
            new_max: 2030,
        }
    ));
}
