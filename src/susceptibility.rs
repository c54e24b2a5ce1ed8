//! # Rogue-path susceptibility regions
//!
//! Fixed polygonal zones of the NIRCam focal plane, expressed in V2/V3
//! **degrees**, inside which a sufficiently bright out-of-field source
//! produces rogue-path stray light ("claws"). One zone exists per NIRCam
//! module (A and B); a tighter `small` alternative covers only the zone
//! core and is useful when the default footprint is considered too
//! pessimistic.
//!
//! The vertex tables are loaded once at first use and shared; a
//! [`SusceptibilityRegion`] is cheap to construct from them.
//!
//! Boundary policy
//! -----------------
//! A point exactly **on** the polygon boundary is classified as inside.
//! The test must err on the side of flagging contamination, so boundary
//! grazes count as hits.

use once_cell::sync::Lazy;

use crate::constants::{Degree, EPS};
use crate::roguepath_errors::RoguePathError;

/// NIRCam module served by a susceptibility zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NircamModule {
    A,
    B,
}

/// Default susceptibility zone of module A, (V2, V3) vertices in degrees.
static MODULE_A_VERTICES: Lazy<Vec<[Degree; 2]>> = Lazy::new(|| {
    vec![
        [2.64057, 10.00277],
        [2.31386, 10.82593],
        [0.47891, 11.67800],
        [-0.22935, 11.62000],
        [-0.04966, 10.64000],
        [0.87240, 10.13000],
        [1.57000, 9.96000],
    ]
});

/// Default susceptibility zone of module B, mirrored across V2 = 0.
static MODULE_B_VERTICES: Lazy<Vec<[Degree; 2]>> = Lazy::new(|| {
    MODULE_A_VERTICES.iter().map(|[v2, v3]| [-v2, *v3]).collect()
});

/// Core-only ("small") zone of module A.
static MODULE_A_SMALL_VERTICES: Lazy<Vec<[Degree; 2]>> = Lazy::new(|| {
    vec![
        [2.28483, 10.48440],
        [0.69605, 10.48183],
        [0.43254, 10.25245],
        [0.57463, 10.12101],
        [0.89239, 10.07204],
        [1.02414, 9.95349],
        [1.70874, 10.03854],
        [2.28483, 10.33652],
    ]
});

/// Core-only ("small") zone of module B.
static MODULE_B_SMALL_VERTICES: Lazy<Vec<[Degree; 2]>> = Lazy::new(|| {
    vec![
        [-0.96179, 10.03871],
        [-1.10382, 10.15554],
        [-2.41445, 10.15554],
        [-2.54651, 10.04368],
        [-2.54153, 9.90945],
        [-2.28987, 9.82741],
        [-1.69435, 9.76030],
        [-1.46262, 9.64347],
        [-1.11130, 9.62855],
        [-0.95681, 9.77273],
        [-0.59551, 9.88459],
        [-0.58306, 10.07848],
    ]
});

/// A closed polygonal susceptibility zone in V2/V3 degrees.
///
/// The polygon is implicitly closed: the last vertex connects back to the
/// first. Construct per-module zones with [`SusceptibilityRegion::new`], or
/// arbitrary polygons with [`SusceptibilityRegion::from_vertices`].
#[derive(Debug, Clone, PartialEq)]
pub struct SusceptibilityRegion {
    vertices: Vec<[Degree; 2]>,
}

impl SusceptibilityRegion {
    /// Susceptibility zone of one NIRCam module.
    ///
    /// Arguments
    /// ---------
    /// * `module`: which module the zone covers.
    /// * `small`: use the tighter core-only vertex set.
    pub fn new(module: NircamModule, small: bool) -> Self {
        let vertices = match (module, small) {
            (NircamModule::A, false) => MODULE_A_VERTICES.clone(),
            (NircamModule::B, false) => MODULE_B_VERTICES.clone(),
            (NircamModule::A, true) => MODULE_A_SMALL_VERTICES.clone(),
            (NircamModule::B, true) => MODULE_B_SMALL_VERTICES.clone(),
        };
        SusceptibilityRegion { vertices }
    }

    /// Build a zone from an arbitrary vertex list, (V2, V3) in degrees.
    ///
    /// Return
    /// ------
    /// * The region, or [`RoguePathError::DegeneratePolygon`] for fewer than
    ///   3 vertices.
    pub fn from_vertices(vertices: Vec<[Degree; 2]>) -> Result<Self, RoguePathError> {
        if vertices.len() < 3 {
            return Err(RoguePathError::DegeneratePolygon(vertices.len()));
        }
        Ok(SusceptibilityRegion { vertices })
    }

    /// The polygon vertices, (V2, V3) in degrees.
    pub fn vertices(&self) -> &[[Degree; 2]] {
        &self.vertices
    }

    /// Arithmetic centroid of the vertices, (V2, V3) in degrees.
    pub fn centroid(&self) -> [Degree; 2] {
        let n = self.vertices.len() as f64;
        let (sum_v2, sum_v3) = self
            .vertices
            .iter()
            .fold((0.0, 0.0), |(a, b), [v2, v3]| (a + v2, b + v3));
        [sum_v2 / n, sum_v3 / n]
    }

    /// Point-in-region test, boundary inclusive.
    ///
    /// Arguments
    /// ---------
    /// * `v2`: V2 coordinate in degrees.
    /// * `v3`: V3 coordinate in degrees.
    ///
    /// Return
    /// ------
    /// * `true` if the point lies inside the polygon or on its boundary.
    pub fn contains(&self, v2: Degree, v3: Degree) -> bool {
        let n = self.vertices.len();

        // Boundary first: a graze counts as a hit.
        for i in 0..n {
            let p = self.vertices[i];
            let q = self.vertices[(i + 1) % n];
            if on_segment(p, q, [v2, v3]) {
                return true;
            }
        }

        // Standard even-odd ray cast for the interior.
        let mut inside = false;
        for i in 0..n {
            let [px, py] = self.vertices[i];
            let [qx, qy] = self.vertices[(i + 1) % n];
            if (py > v3) != (qy > v3) {
                let x_cross = (qx - px) * (v3 - py) / (qy - py) + px;
                if v2 < x_cross {
                    inside = !inside;
                }
            }
        }
        inside
    }
}

/// Whether `pt` lies on the closed segment `p`–`q`, within [`EPS`] degrees.
fn on_segment(p: [Degree; 2], q: [Degree; 2], pt: [Degree; 2]) -> bool {
    let (dx, dy) = (q[0] - p[0], q[1] - p[1]);
    let (ex, ey) = (pt[0] - p[0], pt[1] - p[1]);

    let cross = dx * ey - dy * ex;
    let len = (dx * dx + dy * dy).sqrt();
    if len == 0.0 {
        return ex.hypot(ey) <= EPS;
    }
    // Perpendicular distance from the carrier line, then projection bounds.
    if (cross / len).abs() > EPS {
        return false;
    }
    let t = (ex * dx + ey * dy) / (len * len);
    (-EPS..=1.0 + EPS).contains(&t)
}
