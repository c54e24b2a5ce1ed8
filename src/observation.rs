//! # Program data model: observations and exposures
//!
//! The Program → Observation → Exposure hierarchy built from the proposal
//! tables, together with the per-angle result types the sweep writes back
//! onto it.
//!
//! Structural support is decided here, at model-construction time: an
//! observation is **supported** iff its template is one of the closed
//! [`ExposureTemplate`] set for which a focal-plane mapping exists.
//! Unsupported observations are kept in the model (and queryable) but the
//! sweep never touches them.
//!
//! Angle sets
//! -----------------
//! Valid angles are exposed both as the flat ordered list of candidate
//! angles and as minimal contiguous [`AngleRange`]s over the circular
//! domain `[0, 360)`. A range with `start > end` wraps through 360°→0°.

use itertools::Itertools;
use smallvec::SmallVec;

use crate::constants::{ArcSec, Degree, ObsNumber, EPS};
use crate::susceptibility::{NircamModule, SusceptibilityRegion};

/// Closed set of instrument templates the sweep knows how to evaluate.
///
/// Anything outside this set has no defined focal-plane mapping and is
/// structurally unsupported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExposureTemplate {
    NircamImaging,
    NircamEngineeringImaging,
    NircamWfss,
}

impl ExposureTemplate {
    /// Resolve a proposal template name, `None` for unsupported templates.
    pub fn from_template_name(name: &str) -> Option<Self> {
        match name.trim() {
            "NIRCam Imaging" => Some(ExposureTemplate::NircamImaging),
            "NIRCam Engineering Imaging" => Some(ExposureTemplate::NircamEngineeringImaging),
            "NIRCam Wide Field Slitless Spectroscopy" => Some(ExposureTemplate::NircamWfss),
            _ => None,
        }
    }
}

/// Which NIRCam modules an exposure reads out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModuleSelection {
    A,
    B,
    /// Both modules; also the conservative fallback when the proposal does
    /// not say (testing both zones can only add contamination flags).
    #[default]
    All,
}

impl ModuleSelection {
    /// Parse the proposal `modules` field.
    pub fn from_field(field: &str) -> Option<Self> {
        match field.trim().to_ascii_uppercase().as_str() {
            "A" => Some(ModuleSelection::A),
            "B" => Some(ModuleSelection::B),
            "ALL" | "BOTH" => Some(ModuleSelection::All),
            _ => None,
        }
    }

    /// The concrete modules to test.
    pub fn modules(&self) -> &'static [NircamModule] {
        match self {
            ModuleSelection::A => &[NircamModule::A],
            ModuleSelection::B => &[NircamModule::B],
            ModuleSelection::All => &[NircamModule::A, NircamModule::B],
        }
    }
}

/// Per-exposure, per-angle sweep outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct AngleResult {
    /// Candidate attitude angle, degrees in `[0, 360)`
    pub angle: Degree,
    /// Whether any sufficiently bright source fell inside a zone
    pub contaminated: bool,
    /// Catalog indices of the offending sources (diagnostics)
    pub offenders: SmallVec<[usize; 4]>,
}

/// All per-angle results of one exposure, in sweep order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExposureSweep {
    pub results: Vec<AngleResult>,
}

impl ExposureSweep {
    /// Whether the i-th candidate angle is clean for this exposure.
    pub fn is_valid(&self, angle_idx: usize) -> bool {
        !self.results[angle_idx].contaminated
    }

    pub fn valid_count(&self) -> usize {
        self.results.iter().filter(|r| !r.contaminated).count()
    }
}

/// One exposure: aperture configuration plus its derived sweep results.
///
/// Owned exclusively by its [`Observation`]; never shared.
#[derive(Debug, Clone)]
pub struct Exposure {
    pub exposure_id: u32,
    pub modules: ModuleSelection,
    /// Aperture reference point relative to the observation pointing, arcsec
    pub v2_ref: ArcSec,
    /// Aperture reference point relative to the observation pointing, arcsec
    pub v3_ref: ArcSec,
    /// Susceptibility zones for the selected modules, loaded at construction
    pub regions: Vec<SusceptibilityRegion>,
    /// Sweep results; `None` until `run()` has been invoked
    pub sweep: Option<ExposureSweep>,
}

impl Exposure {
    pub fn new(
        exposure_id: u32,
        modules: ModuleSelection,
        v2_ref: ArcSec,
        v3_ref: ArcSec,
        small_regions: bool,
    ) -> Self {
        let regions = modules
            .modules()
            .iter()
            .map(|&m| SusceptibilityRegion::new(m, small_regions))
            .collect();
        Exposure {
            exposure_id,
            modules,
            v2_ref,
            v3_ref,
            regions,
            sweep: None,
        }
    }
}

/// A contiguous range of valid angles over the circular domain `[0, 360)`.
///
/// Endpoints are themselves valid candidate angles (inclusive on both
/// sides). `start > end` denotes a range that wraps through 360°→0°.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AngleRange {
    pub start: Degree,
    pub end: Degree,
}

impl AngleRange {
    /// Whether an angle (degrees, `[0, 360)`) lies within the range.
    pub fn contains(&self, angle: Degree) -> bool {
        if self.start <= self.end {
            self.start - EPS <= angle && angle <= self.end + EPS
        } else {
            angle >= self.start - EPS || angle <= self.end + EPS
        }
    }

    /// Whether the range wraps through 360°→0°.
    pub fn wraps(&self) -> bool {
        self.start > self.end
    }
}

/// The angles valid across every exposure of one observation.
///
/// An empty set is a legal state: the observation simply has no safe
/// angle, which is distinct from being structurally unsupported.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SupportedAngleSet {
    angles: Vec<Degree>,
    ranges: Vec<AngleRange>,
}

impl SupportedAngleSet {
    /// Build the set from the ordered valid candidate angles.
    ///
    /// Consecutive angles separated by exactly one sweep `step` fold into a
    /// single range; a leading range touching 0° and a trailing range
    /// touching `360 - step` merge into one wrapping range.
    pub fn from_valid_angles(angles: Vec<Degree>, step: Degree) -> Self {
        let mut ranges: Vec<AngleRange> = Vec::new();

        for &angle in &angles {
            match ranges.last_mut() {
                Some(last) if angle - last.end <= step + EPS => last.end = angle,
                _ => ranges.push(AngleRange {
                    start: angle,
                    end: angle,
                }),
            }
        }

        // Merge across the 360°→0° seam: the first and last range are one
        // contiguous circular range when the gap through 360° is at most
        // one step.
        if ranges.len() > 1 {
            let seam_gap = (360.0 - ranges.last().unwrap().end) + ranges[0].start;
            if seam_gap <= step + EPS {
                let last = ranges.pop().unwrap();
                ranges[0].start = last.start;
            }
        }

        SupportedAngleSet { angles, ranges }
    }

    /// The flat ordered list of valid candidate angles.
    pub fn angles(&self) -> &[Degree] {
        &self.angles
    }

    /// Minimal contiguous ranges (wrapping range first if present).
    pub fn ranges(&self) -> &[AngleRange] {
        &self.ranges
    }

    /// Range start angles, in range order.
    pub fn starts(&self) -> Vec<Degree> {
        self.ranges.iter().map(|r| r.start).collect()
    }

    /// Range end angles, in range order.
    pub fn ends(&self) -> Vec<Degree> {
        self.ranges.iter().map(|r| r.end).collect()
    }

    pub fn contains(&self, angle: Degree) -> bool {
        self.ranges.iter().any(|r| r.contains(angle))
    }

    pub fn len(&self) -> usize {
        self.angles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.angles.is_empty()
    }
}

/// One numbered observation of the proposal.
#[derive(Debug, Clone)]
pub struct Observation {
    pub number: ObsNumber,
    /// Reference pointing right ascension, degrees
    pub ra: Degree,
    /// Reference pointing declination, degrees
    pub dec: Degree,
    /// Proposal template name as delivered by the loader
    pub template_name: String,
    /// Resolved template; `None` marks the observation structurally
    /// unsupported and excludes it from the sweep
    pub template: Option<ExposureTemplate>,
    /// Candidate angles restricted to a caller-supplied subset, if any
    pub angle_subset: Option<Vec<Degree>>,
    pub exposures: Vec<Exposure>,
    /// Aggregated valid angles; `None` until `run()` has been invoked
    pub supported_angles: Option<SupportedAngleSet>,
}

impl Observation {
    /// Whether the sweep can structurally evaluate this observation.
    pub fn is_supported(&self) -> bool {
        self.template.is_some()
    }

    /// The candidate attitude angles for this observation.
    ///
    /// Either the supplied subset (normalized into `[0, 360)`, sorted,
    /// deduplicated) or the uniform sweep `k · step` over `[0, 360)`.
    pub fn candidate_angles(&self, step: Degree) -> Vec<Degree> {
        if let Some(subset) = &self.angle_subset {
            return subset
                .iter()
                .map(|&a| crate::attitude::normalize_angle(a))
                .sorted_by(f64::total_cmp)
                .dedup_by(|a, b| (a - b).abs() <= EPS)
                .collect();
        }

        let mut angles = Vec::with_capacity((360.0 / step).ceil() as usize);
        let mut k = 0u32;
        loop {
            let angle = f64::from(k) * step;
            if angle >= 360.0 - EPS {
                break;
            }
            angles.push(angle);
            k += 1;
        }
        angles
    }
}
