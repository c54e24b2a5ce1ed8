//! # Angle sweep: exposure evaluation and observation aggregation
//!
//! The detection core. [`evaluate_exposure`] runs the attitude transform for
//! every candidate angle and tests each sufficiently bright catalog source
//! against the exposure's susceptibility zones; an angle is contaminated as
//! soon as **any** source lands inside a zone. [`aggregate_observation`]
//! then intersects the per-exposure valid sets: an angle is valid for the
//! observation only when every exposure is clean there.
//!
//! Both stages are pure with respect to their inputs — re-running them on
//! unchanged data reproduces identical results — and the per-exposure stage
//! carries no shared state, so callers may fan evaluations out freely.

use smallvec::SmallVec;
use tracing::debug;

use crate::attitude::{attitude, sky_to_tel};
use crate::catalog::Catalog;
use crate::constants::{Degree, ARCSEC_PER_DEG};
use crate::observation::{AngleResult, ExposureSweep, Observation, SupportedAngleSet};

/// Sweep one exposure across all candidate angles.
///
/// Arguments
/// ---------
/// * `exposure`: the exposure under test (aperture reference + zones).
/// * `ra`, `dec`: the observation's reference pointing, degrees.
/// * `angles`: candidate attitude angles, degrees in `[0, 360)`.
/// * `catalog`: the full source catalog (indices in results refer to it).
/// * `candidates`: catalog indices that survived the annulus pre-filter.
/// * `brightness_threshold`: faint limit in magnitudes; sources fainter
///   (numerically larger) are excluded from the containment test.
///
/// Return
/// ------
/// * One [`AngleResult`] per candidate angle, in sweep order.
///
/// A catalog with no source above threshold yields every angle clean; that
/// is a legal outcome, not an error. Evaluation order is irrelevant to the
/// result: contamination can only be caused, never cured, by adding sources.
pub fn evaluate_exposure(
    exposure: &crate::observation::Exposure,
    ra: Degree,
    dec: Degree,
    angles: &[Degree],
    catalog: &Catalog,
    candidates: &[usize],
    brightness_threshold: f64,
) -> ExposureSweep {
    let bright: Vec<usize> = candidates
        .iter()
        .copied()
        .filter(|&idx| catalog.sources()[idx].magnitude <= brightness_threshold)
        .collect();

    let results = angles
        .iter()
        .map(|&angle| {
            let att = attitude(exposure.v2_ref, exposure.v3_ref, ra, dec, angle);

            let mut offenders: SmallVec<[usize; 4]> = SmallVec::new();
            for &idx in &bright {
                let source = &catalog.sources()[idx];
                let (v2, v3) = sky_to_tel(&att, source.ra, source.dec);
                let (v2, v3) = (v2 / ARCSEC_PER_DEG, v3 / ARCSEC_PER_DEG);
                if exposure.regions.iter().any(|r| r.contains(v2, v3)) {
                    offenders.push(idx);
                }
            }

            AngleResult {
                angle,
                contaminated: !offenders.is_empty(),
                offenders,
            }
        })
        .collect();

    ExposureSweep { results }
}

/// Intersect the per-exposure valid sets of one observation.
///
/// An angle is valid for the observation iff it is clean in **every**
/// exposure. An observation with zero exposures, or where no angle survives
/// the intersection, yields an empty set — a legal state, distinct from
/// structural unsupport. An exposure that has not been swept contributes no
/// valid angles, so a partially swept observation also yields an empty set
/// rather than silently treating the missing sweep as all-clean.
///
/// Arguments
/// ---------
/// * `observation`: the observation, with exposures already swept.
/// * `angles`: the candidate angles the exposures were swept over.
/// * `step`: sweep step, used to fold angles into contiguous ranges.
pub fn aggregate_observation(
    observation: &Observation,
    angles: &[Degree],
    step: Degree,
) -> SupportedAngleSet {
    if observation.exposures.is_empty()
        || observation.exposures.iter().any(|e| e.sweep.is_none())
    {
        return SupportedAngleSet::default();
    }

    let valid: Vec<Degree> = angles
        .iter()
        .enumerate()
        .filter(|&(idx, _)| {
            observation
                .exposures
                .iter()
                .filter_map(|e| e.sweep.as_ref())
                .all(|sweep| sweep.is_valid(idx))
        })
        .map(|(_, &angle)| angle)
        .collect();

    debug!(
        observation = observation.number,
        valid = valid.len(),
        swept = angles.len(),
        "aggregated exposure sweeps"
    );

    SupportedAngleSet::from_valid_angles(valid, step)
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::catalog::Source;
    use crate::observation::{Exposure, ExposureTemplate, ModuleSelection};
    use crate::susceptibility::SusceptibilityRegion;

    fn test_exposure() -> Exposure {
        Exposure::new(1, ModuleSelection::A, 0.0, 0.0, false)
    }

    fn sweep_from_valid(angles: &[Degree], valid: impl Fn(Degree) -> bool) -> ExposureSweep {
        ExposureSweep {
            results: angles
                .iter()
                .map(|&angle| AngleResult {
                    angle,
                    contaminated: !valid(angle),
                    offenders: SmallVec::new(),
                })
                .collect(),
        }
    }

    fn observation_with_sweeps(sweeps: Vec<ExposureSweep>) -> Observation {
        let exposures = sweeps
            .into_iter()
            .enumerate()
            .map(|(i, sweep)| {
                let mut exposure = Exposure::new(
                    i as u32 + 1,
                    ModuleSelection::A,
                    0.0,
                    0.0,
                    false,
                );
                exposure.sweep = Some(sweep);
                exposure
            })
            .collect();

        Observation {
            number: 7,
            ra: 0.0,
            dec: 0.0,
            template_name: "NIRCam Imaging".into(),
            template: Some(ExposureTemplate::NircamImaging),
            angle_subset: None,
            exposures,
            supported_angles: None,
        }
    }

    #[test]
    fn test_empty_catalog_leaves_all_angles_clean() {
        let catalog = Catalog::from_sources(vec![]);
        let angles: Vec<Degree> = (0..360).map(f64::from).collect();
        let sweep = evaluate_exposure(&test_exposure(), 10.0, 20.0, &angles, &catalog, &[], 14.0);
        assert_eq!(sweep.valid_count(), 360);
    }

    #[test]
    fn test_faint_sources_cannot_contaminate() {
        // A source parked on the module A zone centroid for angle 0.
        let region = SusceptibilityRegion::new(crate::susceptibility::NircamModule::A, false);
        let [c2, c3] = region.centroid();
        let att = crate::attitude::attitude(0.0, 0.0, 50.0, -30.0, 0.0);
        let (ra, dec) = crate::attitude::tel_to_sky(&att, c2 * 3600.0, c3 * 3600.0);

        let catalog = Catalog::from_sources(vec![Source { ra, dec, magnitude: 20.0 }]);
        let angles = [0.0];
        let sweep =
            evaluate_exposure(&test_exposure(), 50.0, -30.0, &angles, &catalog, &[0], 14.0);
        assert!(!sweep.results[0].contaminated, "faint source must be ignored");

        let catalog = Catalog::from_sources(vec![Source { ra, dec, magnitude: 5.0 }]);
        let sweep =
            evaluate_exposure(&test_exposure(), 50.0, -30.0, &angles, &catalog, &[0], 14.0);
        assert!(sweep.results[0].contaminated);
        assert_eq!(sweep.results[0].offenders.as_slice(), &[0]);
    }

    #[test]
    fn test_intersection_law() {
        let angles: Vec<Degree> = (0..360).map(f64::from).collect();

        // Exposure A valid on [0, 90], exposure B valid on [45, 180].
        let a = sweep_from_valid(&angles, |t| (0.0..=90.0).contains(&t));
        let b = sweep_from_valid(&angles, |t| (45.0..=180.0).contains(&t));

        let observation = observation_with_sweeps(vec![a, b]);
        let set = aggregate_observation(&observation, &angles, 1.0);

        assert_eq!(set.ranges().len(), 1);
        assert_eq!(set.ranges()[0].start, 45.0);
        assert_eq!(set.ranges()[0].end, 90.0);
        assert_eq!(set.len(), 46);
        assert!(set.contains(45.0) && set.contains(90.0));
        assert!(!set.contains(44.0) && !set.contains(91.0));
    }

    #[test]
    fn test_disjoint_exposures_yield_empty_set() {
        let angles: Vec<Degree> = (0..360).map(f64::from).collect();
        let a = sweep_from_valid(&angles, |t| t < 90.0);
        let b = sweep_from_valid(&angles, |t| t >= 180.0);

        let observation = observation_with_sweeps(vec![a, b]);
        let set = aggregate_observation(&observation, &angles, 1.0);
        assert!(set.is_empty());
    }

    #[test]
    fn test_unswept_exposure_yields_empty_set() {
        let angles: Vec<Degree> = (0..360).map(f64::from).collect();
        let clean = sweep_from_valid(&angles, |_| true);

        // Second exposure never swept: it must not pass as all-clean.
        let mut observation = observation_with_sweeps(vec![clean]);
        observation.exposures.push(Exposure::new(2, ModuleSelection::A, 0.0, 0.0, false));

        let set = aggregate_observation(&observation, &angles, 1.0);
        assert!(set.is_empty());
    }

    #[test]
    fn test_zero_exposures_yield_empty_set() {
        let angles: Vec<Degree> = (0..360).map(f64::from).collect();
        let observation = observation_with_sweeps(vec![]);
        let set = aggregate_observation(&observation, &angles, 1.0);
        assert!(set.is_empty());
    }
}
