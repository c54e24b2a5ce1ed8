//! # Program: model construction and sweep orchestration
//!
//! This module defines the [`Program`](crate::program::Program) struct, the central façade that
//! wires together:
//!
//! 1. **Immutable configuration** ([`ProgramConfig`]) — sweep step, brightness threshold,
//!    catalog annulus, region variant; validated once, fail fast.
//! 2. **The observation model** — Observations and Exposures joined from the external
//!    loader's [`ProposalTables`](crate::tables::ProposalTables).
//! 3. **The sweep** — [`run`](crate::program::Program::run) drives the exposure evaluator and
//!    angle aggregator over every structurally supported observation.
//! 4. **Flux integration** — opt-in per observation, since it calls the external
//!    background collaborator.
//!
//! The design separates configuration from derived state: `run()` recomputes every
//! `AngleResult`/`SupportedAngleSet` from scratch and overwrites the previous ones, so
//! re-running an unmodified program reproduces identical results.
//!
//! ## Typical usage
//!
//! ```rust, no_run
//! use camino::Utf8Path;
//! use roguepath::catalog::Catalog;
//! use roguepath::program::{Program, ProgramConfig};
//! use roguepath::tables::ProposalTables;
//!
//! let tables = ProposalTables::from_json_path(Utf8Path::new("proposal_1234.json")).unwrap();
//! let catalog = Catalog::from_csv_path(Utf8Path::new("two_mass.csv")).unwrap();
//! let config = ProgramConfig::new(1.0, 14.0).unwrap();
//!
//! let mut program = Program::from_tables("1234", &tables, catalog, config).unwrap();
//! program.run();
//!
//! for observation in program.supported_observations() {
//!     let ranges = observation.supported_angles.as_ref().unwrap();
//!     println!("obs {}: {:?}", observation.number, ranges.ranges());
//! }
//! ```

use std::collections::BTreeMap;

use rayon::prelude::*;
use tracing::{debug, warn};

use crate::catalog::Catalog;
use crate::constants::{
    Degree, ObsNumber, DEFAULT_ANGULAR_STEP, DEFAULT_BRIGHTNESS_THRESHOLD, DEFAULT_INNER_RADIUS,
    DEFAULT_OUTER_RADIUS,
};
use crate::flux::{FluxConfig, FluxCurve, FluxDomain, FluxIntegrator};
use crate::observation::{
    Exposure, ExposureTemplate, ModuleSelection, Observation, SupportedAngleSet,
};
use crate::roguepath_errors::RoguePathError;
use crate::sweep::{aggregate_observation, evaluate_exposure};
use crate::tables::{ProposalTables, Record};

/// Immutable sweep configuration, validated at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgramConfig {
    /// Sweep step in degrees; candidate angles are `k · step` over `[0, 360)`
    pub angular_step: Degree,
    /// Faint limit in magnitudes; fainter sources are ignored
    pub brightness_threshold: f64,
    /// Inner radius of the catalog annulus, degrees
    pub inner_radius: Degree,
    /// Outer radius of the catalog annulus, degrees
    pub outer_radius: Degree,
    /// Use the core-only susceptibility zone variant
    pub small_regions: bool,
    /// Ordered flux-reduction configurations applied by
    /// [`configured_flux_curves`](Program::configured_flux_curves)
    pub flux_configs: Vec<FluxConfig>,
}

impl ProgramConfig {
    /// Build and validate a configuration.
    ///
    /// A degenerate step would silently produce a misleading sweep, so a
    /// non-positive, non-finite, or ≥360° step is rejected here, before any
    /// sweep work begins.
    pub fn new(angular_step: Degree, brightness_threshold: f64) -> Result<Self, RoguePathError> {
        if !angular_step.is_finite() || angular_step <= 0.0 || angular_step >= 360.0 {
            return Err(RoguePathError::InvalidAngularStep(angular_step));
        }
        Ok(ProgramConfig {
            angular_step,
            brightness_threshold,
            inner_radius: DEFAULT_INNER_RADIUS,
            outer_radius: DEFAULT_OUTER_RADIUS,
            small_regions: false,
            flux_configs: Vec::new(),
        })
    }

    /// Override the catalog annulus radii (degrees).
    pub fn with_annulus(mut self, inner: Degree, outer: Degree) -> Result<Self, RoguePathError> {
        if !(inner >= 0.0 && outer > inner) {
            return Err(RoguePathError::InvalidAnnulus { inner, outer });
        }
        self.inner_radius = inner;
        self.outer_radius = outer;
        Ok(self)
    }

    /// Use the tighter core-only susceptibility zones.
    pub fn with_small_regions(mut self) -> Self {
        self.small_regions = true;
        self
    }

    /// Attach the ordered `(statistic, threshold fraction)` flux-reduction
    /// configurations.
    pub fn with_flux_configs(mut self, configs: Vec<FluxConfig>) -> Self {
        self.flux_configs = configs;
        self
    }
}

impl Default for ProgramConfig {
    fn default() -> Self {
        ProgramConfig {
            angular_step: DEFAULT_ANGULAR_STEP,
            brightness_threshold: DEFAULT_BRIGHTNESS_THRESHOLD,
            inner_radius: DEFAULT_INNER_RADIUS,
            outer_radius: DEFAULT_OUTER_RADIUS,
            small_regions: false,
            flux_configs: Vec::new(),
        }
    }
}

/// The top-level aggregate for one proposal.
///
/// Immutable configuration plus the Observation → Exposure hierarchy;
/// [`run`](Program::run) populates the derived per-observation state.
#[derive(Debug, Clone)]
pub struct Program {
    pub id: String,
    config: ProgramConfig,
    catalog: Catalog,
    observations: BTreeMap<ObsNumber, Observation>,
}

impl Program {
    /// Build the observation model from the loader's tables.
    ///
    /// Joins the `observations` and `exposures` tables on the observation
    /// number. Observations whose template is outside the supported set are
    /// retained but marked structurally unsupported (queryable via
    /// [`unsupported_observations`](Program::unsupported_observations));
    /// exposures referencing an unknown observation are dropped with a
    /// warning.
    ///
    /// Arguments
    /// ---------
    /// * `id`: proposal identifier.
    /// * `tables`: the loader's named tables; `observations` and
    ///   `exposures` are required.
    /// * `catalog`: bright-source catalog shared by all observations.
    /// * `config`: validated sweep configuration.
    pub fn from_tables(
        id: impl Into<String>,
        tables: &ProposalTables,
        catalog: Catalog,
        config: ProgramConfig,
    ) -> Result<Self, RoguePathError> {
        let mut observations: BTreeMap<ObsNumber, Observation> = BTreeMap::new();

        for record in tables.table("observations")?.iter() {
            let number = require_u32(record, "observations", "observation")?;
            let ra = require_f64(record, "observations", "ra")?;
            let dec = require_f64(record, "observations", "dec")?;

            let template_name = record.str_field("template").unwrap_or("").to_string();
            let template = ExposureTemplate::from_template_name(&template_name);
            if template.is_none() {
                debug!(observation = number, template = %template_name, "unsupported template");
            }

            observations.insert(
                number,
                Observation {
                    number,
                    ra,
                    dec,
                    template_name,
                    template,
                    angle_subset: None,
                    exposures: Vec::new(),
                    supported_angles: None,
                },
            );
        }

        for record in tables.table("exposures")?.iter() {
            let number = require_u32(record, "exposures", "observation")?;
            let exposure_id = require_u32(record, "exposures", "exposure")?;

            let Some(observation) = observations.get_mut(&number) else {
                warn!(observation = number, exposure = exposure_id, "exposure references unknown observation");
                continue;
            };

            let modules = record
                .str_field("modules")
                .and_then(ModuleSelection::from_field)
                .unwrap_or_default();
            let v2_ref = record.f64_field("v2_ref").unwrap_or(0.0);
            let v3_ref = record.f64_field("v3_ref").unwrap_or(0.0);

            observation.exposures.push(Exposure::new(
                exposure_id,
                modules,
                v2_ref,
                v3_ref,
                config.small_regions,
            ));
        }

        Ok(Program {
            id: id.into(),
            config,
            catalog,
            observations,
        })
    }

    pub fn config(&self) -> &ProgramConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// All observations, ordered by observation number.
    pub fn observations(&self) -> impl Iterator<Item = &Observation> {
        self.observations.values()
    }

    /// One observation by number.
    pub fn observation(&self, number: ObsNumber) -> Result<&Observation, RoguePathError> {
        self.observations
            .get(&number)
            .ok_or(RoguePathError::ObservationNotFound(number))
    }

    /// Observations the sweep evaluates.
    pub fn supported_observations(&self) -> impl Iterator<Item = &Observation> {
        self.observations.values().filter(|o| o.is_supported())
    }

    /// Structurally unsupported observations, as `(number, template name)`.
    /// A named, non-fatal category: reported, never raised.
    pub fn unsupported_observations(&self) -> Vec<(ObsNumber, &str)> {
        self.observations
            .values()
            .filter(|o| !o.is_supported())
            .map(|o| (o.number, o.template_name.as_str()))
            .collect()
    }

    /// Run the angle sweep over every supported observation.
    ///
    /// Recomputes and overwrites all derived state (`AngleResult`s and
    /// `SupportedAngleSet`s); calling it twice on an unchanged program
    /// reproduces identical results. Observations are independent, so they
    /// are processed in parallel. Flux integration is **not** invoked here;
    /// it is opt-in per observation via [`flux_curves`](Program::flux_curves).
    pub fn run(&mut self) {
        let config = self.config.clone();
        let catalog = &self.catalog;

        self.observations.par_iter_mut().for_each(|(_, observation)| {
            if !observation.is_supported() {
                // Keep derived state absent so the category stays unambiguous.
                for exposure in &mut observation.exposures {
                    exposure.sweep = None;
                }
                observation.supported_angles = None;
                return;
            }

            let angles = observation.candidate_angles(config.angular_step);
            let candidates = catalog.in_annulus(
                observation.ra,
                observation.dec,
                config.inner_radius,
                config.outer_radius,
            );

            for exposure in &mut observation.exposures {
                let sweep = evaluate_exposure(
                    exposure,
                    observation.ra,
                    observation.dec,
                    &angles,
                    catalog,
                    &candidates,
                    config.brightness_threshold,
                );
                exposure.sweep = Some(sweep);
            }

            let aggregated = aggregate_observation(observation, &angles, config.angular_step);
            observation.supported_angles = Some(aggregated);
        });
    }

    /// Aggregated valid angles of one observation.
    pub fn supported_angles(
        &self,
        number: ObsNumber,
    ) -> Result<&SupportedAngleSet, RoguePathError> {
        let observation = self.observation(number)?;
        observation
            .supported_angles
            .as_ref()
            .ok_or(RoguePathError::ObservationNotSwept(number))
    }

    /// Integrate background-flux curves for one observation.
    ///
    /// One curve per configuration, fetched from the collaborator in a
    /// single pass over the angles. With [`FluxDomain::ValidOnly`] the
    /// observation must have been swept first; [`FluxDomain::FullSweep`]
    /// works on any observation, including one with an empty supported set.
    pub fn flux_curves(
        &self,
        number: ObsNumber,
        integrator: &FluxIntegrator,
        domain: FluxDomain,
        configs: &[FluxConfig],
    ) -> Result<Vec<FluxCurve>, RoguePathError> {
        let observation = self.observation(number)?;

        let angles: Vec<Degree> = match domain {
            FluxDomain::ValidOnly => observation
                .supported_angles
                .as_ref()
                .ok_or(RoguePathError::ObservationNotSwept(number))?
                .angles()
                .to_vec(),
            FluxDomain::FullSweep => observation.candidate_angles(self.config.angular_step),
        };

        Ok(integrator.integrate_configs(observation.ra, observation.dec, &angles, configs))
    }

    /// [`flux_curves`](Program::flux_curves) with the configurations carried
    /// by the program configuration.
    pub fn configured_flux_curves(
        &self,
        number: ObsNumber,
        integrator: &FluxIntegrator,
        domain: FluxDomain,
    ) -> Result<Vec<FluxCurve>, RoguePathError> {
        self.flux_curves(number, integrator, domain, &self.config.flux_configs)
    }
}

fn require_u32(record: &Record, table: &str, column: &str) -> Result<u32, RoguePathError> {
    record
        .u32_field(column)
        .ok_or_else(|| RoguePathError::MissingColumn {
            table: table.to_string(),
            column: column.to_string(),
        })
}

fn require_f64(record: &Record, table: &str, column: &str) -> Result<f64, RoguePathError> {
    record
        .f64_field(column)
        .ok_or_else(|| RoguePathError::MissingColumn {
            table: table.to_string(),
            column: column.to_string(),
        })
}
