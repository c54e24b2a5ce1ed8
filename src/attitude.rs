//! # Attitude and focal-plane frame transforms
//!
//! Pure geometric routines mapping between sky coordinates (RA/Dec) and the
//! telescope focal-plane frame (V2/V3). The central object is the **attitude
//! matrix**: the 3×3 rotation that carries a unit vector expressed in the
//! focal-plane frame into the sky frame for a given pointing and roll angle.
//!
//! All routines are deterministic and stateless. Roll angles are normalized
//! into `[0, 360)` before any trigonometry, so `θ` and `θ + 360` produce
//! bit-identical matrices.
//!
//! Conventions
//! -----------------
//! * V2/V3 are expressed in **arcseconds**, RA/Dec and roll in **degrees**.
//! * The attitude matrix `A` satisfies `u_sky = A · u_tel`; the inverse
//!   transform uses `Aᵀ` (rotations are orthogonal).

use nalgebra::{Matrix3, Rotation3, Vector3};

use crate::constants::{ArcSec, Degree, ARCSEC_PER_DEG, RADEG};

/// Elementary rotation matrix about one of the frame axes.
///
/// Arguments
/// ---------
/// * `alpha`: rotation angle in radians.
/// * `k`: axis index (0 = X, 1 = Y, 2 = Z).
///
/// Return
/// ------
/// * The 3×3 right-handed rotation matrix about the requested axis.
pub(crate) fn rotmt(alpha: f64, k: usize) -> Matrix3<f64> {
    let axis = match k {
        0 => Vector3::x_axis(),
        1 => Vector3::y_axis(),
        2 => Vector3::z_axis(),
        _ => panic!("**** ROTMT: invalid axis index {k} (must be 0,1,2) ****"),
    };

    Rotation3::from_axis_angle(&axis, alpha).into()
}

/// Normalize an angle in degrees into the half-open interval `[0, 360)`.
///
/// `360.0` itself maps to `0.0`, so the attitude built for `θ` and for
/// `θ + 360` is identical down to the last bit.
pub fn normalize_angle(angle: Degree) -> Degree {
    let a = angle.rem_euclid(360.0);
    if a == 360.0 {
        0.0
    } else {
        a
    }
}

/// Unit vector of a sky position.
///
/// Arguments
/// ---------
/// * `ra`: right ascension in degrees.
/// * `dec`: declination in degrees.
///
/// Return
/// ------
/// * The corresponding unit vector `[cos δ cos α, cos δ sin α, sin δ]`.
pub fn unit_vector(ra: Degree, dec: Degree) -> Vector3<f64> {
    let (ra_r, dec_r) = (ra * RADEG, dec * RADEG);
    Vector3::new(
        dec_r.cos() * ra_r.cos(),
        dec_r.cos() * ra_r.sin(),
        dec_r.sin(),
    )
}

/// Build the attitude matrix for a pointing and roll angle.
///
/// The matrix carries focal-plane unit vectors into sky unit vectors such
/// that the aperture reference point `(v2_ref, v3_ref)` lands exactly on
/// `(ra, dec)` with the focal plane rolled by `pa` about the line of sight.
///
/// Arguments
/// ---------
/// * `v2_ref`: V2 of the aperture reference point, arcseconds.
/// * `v3_ref`: V3 of the aperture reference point, arcseconds.
/// * `ra`: right ascension of the pointing, degrees.
/// * `dec`: declination of the pointing, degrees.
/// * `pa`: roll (position angle of V3 at the reference point), degrees;
///   normalized into `[0, 360)` before use.
///
/// Return
/// ------
/// * The attitude matrix `A` with `u_sky = A · u_tel`.
///
/// See also
/// ------------
/// * [`sky_to_tel`] – Catalog source into the focal-plane frame.
/// * [`tel_to_sky`] – Focal-plane point (e.g. a region vertex) onto the sky.
pub fn attitude(
    v2_ref: ArcSec,
    v3_ref: ArcSec,
    ra: Degree,
    dec: Degree,
    pa: Degree,
) -> Matrix3<f64> {
    let pa = normalize_angle(pa);

    let m_v2 = rotmt(-v2_ref / ARCSEC_PER_DEG * RADEG, 2);
    let m_v3 = rotmt(v3_ref / ARCSEC_PER_DEG * RADEG, 1);
    let m_ra = rotmt(ra * RADEG, 2);
    let m_dec = rotmt(-dec * RADEG, 1);
    let m_pa = rotmt(-pa * RADEG, 0);

    m_ra * m_dec * m_pa * m_v3 * m_v2
}

/// Transform a sky position into the focal-plane frame.
///
/// Arguments
/// ---------
/// * `att`: attitude matrix from [`attitude`].
/// * `ra`: source right ascension, degrees.
/// * `dec`: source declination, degrees.
///
/// Return
/// ------
/// * `(v2, v3)` in arcseconds.
pub fn sky_to_tel(att: &Matrix3<f64>, ra: Degree, dec: Degree) -> (ArcSec, ArcSec) {
    let u_tel = att.transpose() * unit_vector(ra, dec);
    let v2 = u_tel.y.atan2(u_tel.x) / RADEG * ARCSEC_PER_DEG;
    let v3 = u_tel.z.clamp(-1.0, 1.0).asin() / RADEG * ARCSEC_PER_DEG;
    (v2, v3)
}

/// Transform a focal-plane point onto the sky.
///
/// Arguments
/// ---------
/// * `att`: attitude matrix from [`attitude`].
/// * `v2`: V2 coordinate, arcseconds.
/// * `v3`: V3 coordinate, arcseconds.
///
/// Return
/// ------
/// * `(ra, dec)` in degrees, with RA wrapped into `[0, 360)`.
pub fn tel_to_sky(att: &Matrix3<f64>, v2: ArcSec, v3: ArcSec) -> (Degree, Degree) {
    let (v2_r, v3_r) = (v2 / ARCSEC_PER_DEG * RADEG, v3 / ARCSEC_PER_DEG * RADEG);
    let u_tel = Vector3::new(
        v3_r.cos() * v2_r.cos(),
        v3_r.cos() * v2_r.sin(),
        v3_r.sin(),
    );
    let u_sky = att * u_tel;
    let ra = normalize_angle(u_sky.y.atan2(u_sky.x) / RADEG);
    let dec = u_sky.z.clamp(-1.0, 1.0).asin() / RADEG;
    (ra, dec)
}

/// Angular separation between two sky positions, in degrees.
///
/// Uses the haversine form, which stays accurate for small separations.
pub fn angular_separation(ra1: Degree, dec1: Degree, ra2: Degree, dec2: Degree) -> Degree {
    let (ra1, dec1) = (ra1 * RADEG, dec1 * RADEG);
    let (ra2, dec2) = (ra2 * RADEG, dec2 * RADEG);

    let sin_ddec = ((dec2 - dec1) / 2.0).sin();
    let sin_dra = ((ra2 - ra1) / 2.0).sin();
    let h = sin_ddec * sin_ddec + dec1.cos() * dec2.cos() * sin_dra * sin_dra;
    2.0 * h.sqrt().clamp(-1.0, 1.0).asin() / RADEG
}
