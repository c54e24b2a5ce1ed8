//! # Constants and type definitions for roguepath
//!
//! This module centralizes the **unit conversions**, **numeric epsilons**, and **common type
//! definitions** used throughout the `roguepath` library, together with the default sweep
//! parameters applied when the caller does not override them.
//!
//! ## Overview
//!
//! - Angle unit conversions (degrees ↔ radians ↔ arcseconds)
//! - Core type aliases used across the crate
//! - Default angle-sweep and catalog-filtering parameters
//!
//! These definitions are used by all main modules, including the attitude transform,
//! the susceptibility region, and the program orchestration.

// -------------------------------------------------------------------------------------------------
// Unit conversions
// -------------------------------------------------------------------------------------------------

/// Conversion factor from degrees to radians
pub const RADEG: f64 = std::f64::consts::PI / 180.0;

/// Number of arcseconds in one degree
pub const ARCSEC_PER_DEG: f64 = 3600.0;

/// Numerical epsilon used for floating-point angle comparisons (degrees)
pub const EPS: f64 = 1e-9;

// -------------------------------------------------------------------------------------------------
// Sweep defaults
// -------------------------------------------------------------------------------------------------

/// Default attitude sweep step in degrees
pub const DEFAULT_ANGULAR_STEP: Degree = 1.0;

/// Default faint limit: catalog sources fainter than this magnitude cannot
/// cause rogue-path contamination and are excluded from the containment test
pub const DEFAULT_BRIGHTNESS_THRESHOLD: f64 = 14.0;

/// Default inner radius of the catalog annulus around the pointing (degrees)
pub const DEFAULT_INNER_RADIUS: Degree = 8.0;

/// Default outer radius of the catalog annulus around the pointing (degrees)
pub const DEFAULT_OUTER_RADIUS: Degree = 12.0;

// -------------------------------------------------------------------------------------------------
// Type aliases
// -------------------------------------------------------------------------------------------------

/// Angle in degrees
pub type Degree = f64;

/// Angle in arcseconds (the native unit of focal-plane V2/V3 coordinates)
pub type ArcSec = f64;

/// Observation number within a proposal (unique key within a Program)
pub type ObsNumber = u32;
