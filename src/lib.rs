//! # roguepath: angle-sweep susceptibility detection for JWST observations
//!
//! For each planned observation of a proposal, determine which telescope
//! roll (attitude) angles would place bright background sources inside the
//! NIRCam rogue-path **susceptibility region** — the focal-plane zone where
//! stray-light "claws" originate — and rank the clean angles by background
//! flux.
//!
//! Pipeline, leaf to root:
//!
//! 1. [`attitude`] — pure sky ↔ focal-plane (V2/V3) frame transforms.
//! 2. [`susceptibility`] — fixed per-module zones with a boundary-inclusive
//!    containment test.
//! 3. [`sweep`] — per-exposure angle evaluation and per-observation
//!    aggregation (intersection across exposures, circular ranges).
//! 4. [`flux`] — per-angle background-flux curves via an external
//!    collaborator, with per-angle fault isolation.
//! 5. [`program`] — the owning Program → Observation → Exposure model and
//!    the `run()` orchestration.
//!
//! Proposal parsing and plotting stay outside the crate: tables come in
//! through [`tables`], results go out as angle ranges and flux curves.

pub mod attitude;
pub mod catalog;
pub mod constants;
pub mod flux;
pub mod observation;
pub mod program;
pub mod roguepath_errors;
pub mod susceptibility;
pub mod sweep;
pub mod tables;
