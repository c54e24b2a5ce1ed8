//! Program-level orchestration tests: table joining, structural support,
//! `run()` idempotence, and opt-in flux integration.

use std::sync::Arc;

use hifitime::Epoch;

use roguepath::attitude::{attitude, tel_to_sky};
use roguepath::catalog::{Catalog, Source};
use roguepath::constants::{ARCSEC_PER_DEG, Degree};
use roguepath::flux::{
    BackgroundModel, DateWindow, FluxConfig, FluxDomain, FluxIntegrator, FluxStatistic,
};
use roguepath::program::{Program, ProgramConfig};
use roguepath::roguepath_errors::RoguePathError;
use roguepath::susceptibility::{NircamModule, SusceptibilityRegion};
use roguepath::tables::ProposalTables;

fn proposal_tables() -> ProposalTables {
    ProposalTables::from_json_str(
        r#"{
            "observations": [
                {"observation": 1, "ra": 50.0, "dec": 0.0, "template": "NIRCam Imaging"},
                {"observation": 2, "ra": 51.0, "dec": 1.0, "template": "MIRI Imaging"}
            ],
            "exposures": [
                {"observation": 1, "exposure": 1, "modules": "A"},
                {"observation": 2, "exposure": 1, "modules": "A"}
            ]
        }"#,
    )
    .unwrap()
}

/// A bright source parked on the module A zone centroid at roll angle 0
/// for observation 1's pointing.
fn contaminating_source() -> Source {
    let region = SusceptibilityRegion::new(NircamModule::A, false);
    let [c2, c3] = region.centroid();
    let att = attitude(0.0, 0.0, 50.0, 0.0, 0.0);
    let (ra, dec) = tel_to_sky(&att, c2 * ARCSEC_PER_DEG, c3 * ARCSEC_PER_DEG);
    Source { ra, dec, magnitude: 5.0 }
}

fn window() -> DateWindow {
    // One year starting 2025-06-01.
    DateWindow {
        start: Epoch::from_mjd_utc(60827.0),
        end: Epoch::from_mjd_utc(61192.0),
    }
}

#[test]
fn test_sweep_excludes_unsupported_observations() {
    let catalog = Catalog::from_sources(vec![contaminating_source()]);
    let mut program = Program::from_tables(
        "1234",
        &proposal_tables(),
        catalog,
        ProgramConfig::new(1.0, 14.0).unwrap(),
    )
    .unwrap();

    assert_eq!(program.unsupported_observations(), vec![(2, "MIRI Imaging")]);
    program.run();

    // Supported observation: swept, angle 0 contaminated by the planted source.
    let set = program.supported_angles(1).unwrap();
    assert!(!set.is_empty());
    assert!(!set.contains(0.0), "planted source must contaminate angle 0");
    assert!(set.len() < 360);

    let obs1 = program.observation(1).unwrap();
    let sweep = obs1.exposures[0].sweep.as_ref().unwrap();
    assert!(sweep.results[0].contaminated);
    assert_eq!(sweep.results[0].offenders.as_slice(), &[0]);

    // Contaminated and valid angles partition the sweep.
    let contaminated = sweep.results.iter().filter(|r| r.contaminated).count();
    assert_eq!(sweep.valid_count() + contaminated, 360);
    assert_eq!(set.len(), 360 - contaminated);

    // Unsupported observation: excluded entirely, no derived state.
    let obs2 = program.observation(2).unwrap();
    assert!(obs2.supported_angles.is_none());
    assert!(obs2.exposures[0].sweep.is_none());
    assert!(matches!(
        program.supported_angles(2),
        Err(RoguePathError::ObservationNotSwept(2))
    ));
}

#[test]
fn test_run_is_idempotent() {
    let catalog = Catalog::from_sources(vec![contaminating_source()]);
    let mut program = Program::from_tables(
        "1234",
        &proposal_tables(),
        catalog,
        ProgramConfig::new(1.0, 14.0).unwrap(),
    )
    .unwrap();

    program.run();
    let first_set = program.supported_angles(1).unwrap().clone();
    let first_sweep = program.observation(1).unwrap().exposures[0]
        .sweep
        .clone()
        .unwrap();

    program.run();
    assert_eq!(program.supported_angles(1).unwrap(), &first_set);
    assert_eq!(
        program.observation(1).unwrap().exposures[0].sweep.as_ref().unwrap(),
        &first_sweep
    );
}

#[test]
fn test_empty_catalog_validates_every_angle() {
    let mut program = Program::from_tables(
        "1234",
        &proposal_tables(),
        Catalog::from_sources(vec![]),
        ProgramConfig::new(1.0, 14.0).unwrap(),
    )
    .unwrap();
    program.run();

    let set = program.supported_angles(1).unwrap();
    assert_eq!(set.len(), 360);
    assert_eq!(set.ranges().len(), 1);
    assert_eq!(set.ranges()[0].start, 0.0);
    assert_eq!(set.ranges()[0].end, 359.0);
}

struct RampModel;

impl BackgroundModel for RampModel {
    fn flux_series(
        &self,
        _ra: Degree,
        _dec: Degree,
        angle: Degree,
        _window: &DateWindow,
    ) -> Result<Vec<f64>, RoguePathError> {
        Ok(vec![angle, angle + 2.0])
    }
}

#[test]
fn test_flux_integration_is_opt_in_and_domain_aware() {
    let catalog = Catalog::from_sources(vec![contaminating_source()]);
    let mut program = Program::from_tables(
        "1234",
        &proposal_tables(),
        catalog,
        ProgramConfig::new(1.0, 14.0).unwrap(),
    )
    .unwrap();

    let integrator = FluxIntegrator::new(Arc::new(RampModel), window());
    let configs = [FluxConfig {
        statistic: FluxStatistic::Mean,
        threshold_fraction: 2.0,
    }];

    // Valid-only flux needs a sweep first.
    assert!(matches!(
        program.flux_curves(1, &integrator, FluxDomain::ValidOnly, &configs),
        Err(RoguePathError::ObservationNotSwept(1))
    ));

    // The full sweep works regardless.
    let curves = program
        .flux_curves(1, &integrator, FluxDomain::FullSweep, &configs)
        .unwrap();
    assert_eq!(curves.len(), 1);
    assert_eq!(curves[0].samples.len(), 360);
    assert_eq!(curves[0].samples[10].value, Some(11.0));
    assert_eq!(curves[0].missing_count(), 0);

    program.run();
    let valid = program.supported_angles(1).unwrap().len();
    let curves = program
        .flux_curves(1, &integrator, FluxDomain::ValidOnly, &configs)
        .unwrap();
    assert_eq!(curves[0].samples.len(), valid);

    // Every valid-domain sample angle is itself a valid angle.
    let set = program.supported_angles(1).unwrap();
    assert!(curves[0].samples.iter().all(|s| set.contains(s.angle)));
}
