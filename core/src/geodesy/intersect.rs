//! Forward intersection of two lines of bearing on the ellipsoid.
//!
//! The crossing is seeded in a local tangent plane centred on the first site,
//! then refined with Newton steps along both geodesics until the two running
//! points coincide.

use super::ellipsoid::{angle_difference, Ellipsoid};
use crate::prelude::{Coordinate, GeoResult, Intersection};

/// Below this separation, in meters, two sites are treated as one point.
const COINCIDENT_M: f64 = 1e-3;
/// Sine of the angle under which two rays are treated as parallel.
const PARALLEL_SINE: f64 = 1e-9;
/// Angular tolerance, in degrees, for rays lying along the joining geodesic.
const COLLINEAR_DEG: f64 = 1e-7;
const CLOSURE_M: f64 = 1e-4;
const MAX_REFINEMENTS: usize = 30;

/// Direction vector (east, north) for a bearing in degrees.
fn heading(bearing: f64) -> (f64, f64) {
    let (sin, cos) = bearing.to_radians().sin_cos();
    (sin, cos)
}

fn cross(u: (f64, f64), v: (f64, f64)) -> f64 {
    u.0 * v.1 - u.1 * v.0
}

/// Solves `s_a * u_a - s_b * u_b = w` for the two ray lengths.
fn solve(u_a: (f64, f64), u_b: (f64, f64), w: (f64, f64)) -> Option<(f64, f64)> {
    let det = cross(u_a, u_b);
    if det.abs() < PARALLEL_SINE {
        return None;
    }
    Some((cross(w, u_b) / det, cross(w, u_a) / det))
}

pub fn ray_intersect(
    ellipsoid: &Ellipsoid,
    origin_a: Coordinate,
    bearing_a: f64,
    origin_b: Coordinate,
    bearing_b: f64,
    max_range_m: f64,
) -> GeoResult<Intersection> {
    let baseline = ellipsoid.inverse(origin_a, origin_b)?;
    if baseline.distance_m < COINCIDENT_M {
        return Ok(Intersection::Ambiguous);
    }

    // both rays run along the geodesic joining the sites, facing each other
    let a_faces_b = angle_difference(bearing_a, baseline.initial_azimuth).abs() < COLLINEAR_DEG;
    let b_faces_a =
        angle_difference(bearing_b, baseline.final_azimuth + 180.0).abs() < COLLINEAR_DEG;
    if a_faces_b && b_faces_a {
        return Ok(Intersection::Ambiguous);
    }

    let u_a = heading(bearing_a);
    let u_b = heading(bearing_b);
    let (east, north) = heading(baseline.initial_azimuth);
    let offset = (east * baseline.distance_m, north * baseline.distance_m);

    let Some((mut range_a, mut range_b)) = solve(u_a, u_b, offset) else {
        return Ok(Intersection::Infinite);
    };
    if range_a < 0.0 || range_b < 0.0 {
        return Ok(Intersection::Invalid);
    }
    if range_a > max_range_m || range_b > max_range_m {
        return Ok(Intersection::Infinite);
    }

    for _ in 0..MAX_REFINEMENTS {
        let along_a = ellipsoid.direct(origin_a, bearing_a, range_a)?;
        let along_b = ellipsoid.direct(origin_b, bearing_b, range_b)?;
        let gap = ellipsoid.inverse(along_a.destination, along_b.destination)?;
        if gap.distance_m < CLOSURE_M {
            if range_a < 0.0 || range_b < 0.0 {
                return Ok(Intersection::Invalid);
            }
            if range_a > max_range_m || range_b > max_range_m {
                return Ok(Intersection::Infinite);
            }
            return Ok(Intersection::Valid(along_a.destination));
        }

        let (east, north) = heading(gap.initial_azimuth);
        let w = (east * gap.distance_m, north * gap.distance_m);
        let Some((step_a, step_b)) = solve(
            heading(along_a.final_azimuth),
            heading(along_b.final_azimuth),
            w,
        ) else {
            return Ok(Intersection::Infinite);
        };
        range_a += step_a;
        range_b += step_b;
    }

    Ok(Intersection::Ambiguous)
}
