//! # Source catalogs
//!
//! In-memory model of the bright-source catalog tested against the
//! susceptibility region: one [`Source`] per star (sky position plus a
//! brightness proxy, by convention the 2MASS K magnitude).
//!
//! Catalogs can be built from an in-memory list, from a proposal table
//! delivered by the loader, or from a 2MASS-style CSV export. Records with
//! missing or unparsable position/brightness fields are **skipped, not
//! fatal**; the number of skipped records is retained for diagnostics.

use camino::Utf8Path;
use serde::Deserialize;
use tracing::warn;

use crate::attitude::angular_separation;
use crate::constants::Degree;
use crate::roguepath_errors::RoguePathError;
use crate::tables::Table;

/// One catalog star: sky position and brightness proxy.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Source {
    /// Right ascension, degrees
    pub ra: Degree,
    /// Declination, degrees
    pub dec: Degree,
    /// Brightness proxy (2MASS K magnitude; larger is fainter)
    #[serde(rename = "k_mag")]
    pub magnitude: f64,
}

/// An ordered collection of catalog sources.
///
/// Source indices are stable: diagnostics (offending-source lists) refer to
/// positions in this collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    sources: Vec<Source>,
    skipped: usize,
}

impl Catalog {
    /// Wrap an in-memory source list.
    pub fn from_sources(sources: Vec<Source>) -> Self {
        Catalog {
            sources,
            skipped: 0,
        }
    }

    /// Build a catalog from a proposal table with `ra`, `dec` and `k_mag`
    /// columns.
    ///
    /// Records missing any of the three fields are skipped and counted; the
    /// remaining records keep their relative order.
    pub fn from_table(table: &Table) -> Self {
        let mut sources = Vec::with_capacity(table.len());
        let mut skipped = 0usize;

        for record in table.iter() {
            match (
                record.f64_field("ra"),
                record.f64_field("dec"),
                record.f64_field("k_mag"),
            ) {
                (Some(ra), Some(dec), Some(magnitude)) => {
                    sources.push(Source { ra, dec, magnitude })
                }
                _ => skipped += 1,
            }
        }

        if skipped > 0 {
            warn!(skipped, "catalog records dropped for missing position or magnitude");
        }
        Catalog { sources, skipped }
    }

    /// Read a 2MASS-style CSV catalog with `ra`, `dec` and `k_mag` columns.
    ///
    /// Rows that fail to deserialize are skipped and counted. An unreadable
    /// file is an error.
    pub fn from_csv_path(path: &Utf8Path) -> Result<Self, RoguePathError> {
        let mut reader = csv::Reader::from_path(path.as_std_path())?;
        let mut sources = Vec::new();
        let mut skipped = 0usize;

        for row in reader.deserialize::<Source>() {
            match row {
                Ok(source) => sources.push(source),
                Err(err) => {
                    skipped += 1;
                    warn!(%err, "skipping malformed catalog row");
                }
            }
        }

        Ok(Catalog { sources, skipped })
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Number of records dropped during ingestion.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Indices of sources inside an annulus around a pointing.
    ///
    /// The rogue path only admits light from a ring around the boresight, so
    /// the containment test can ignore everything else up front.
    ///
    /// Arguments
    /// ---------
    /// * `ra`, `dec`: annulus center (the observation pointing), degrees.
    /// * `inner`, `outer`: annulus radii, degrees.
    pub fn in_annulus(
        &self,
        ra: Degree,
        dec: Degree,
        inner: Degree,
        outer: Degree,
    ) -> Vec<usize> {
        self.sources
            .iter()
            .enumerate()
            .filter(|(_, s)| {
                let sep = angular_separation(ra, dec, s.ra, s.dec);
                sep > inner && sep < outer
            })
            .map(|(idx, _)| idx)
            .collect()
    }
}
