//! Flat-plane geodesy used to give the engine exact, hand-checkable inputs.
//!
//! Locations are `"x,y"` in meters (x east, y north); a coordinate stores y as
//! `lat` and x as `lon`.

use crate::prelude::{Coordinate, GeoError, GeoResult, Geodesy, Intersection};
use crate::soi::Site;
use chrono::{TimeZone, Utc};

pub struct FlatGeodesy;

fn heading(bearing: f64) -> (f64, f64) {
    let (sin, cos) = bearing.to_radians().sin_cos();
    (sin, cos)
}

fn cross(u: (f64, f64), v: (f64, f64)) -> f64 {
    u.0 * v.1 - u.1 * v.0
}

fn dot(u: (f64, f64), v: (f64, f64)) -> f64 {
    u.0 * v.0 + u.1 * v.1
}

impl Geodesy for FlatGeodesy {
    fn ray_intersect(
        &self,
        origin_a: Coordinate,
        bearing_a: f64,
        origin_b: Coordinate,
        bearing_b: f64,
    ) -> GeoResult<Intersection> {
        let w = (origin_b.lon - origin_a.lon, origin_b.lat - origin_a.lat);
        let baseline = w.0.hypot(w.1);
        if baseline < 1e-9 {
            return Ok(Intersection::Ambiguous);
        }
        let u_a = heading(bearing_a);
        let u_b = heading(bearing_b);
        let det = cross(u_a, u_b);
        if det.abs() < 1e-12 {
            let on_baseline = cross(w, u_a).abs() < 1e-9 * baseline;
            if on_baseline && dot(w, u_a) > 0.0 && dot(w, u_b) < 0.0 {
                return Ok(Intersection::Ambiguous);
            }
            return Ok(Intersection::Infinite);
        }
        let range_a = cross(w, u_b) / det;
        let range_b = cross(w, u_a) / det;
        if range_a < 0.0 || range_b < 0.0 {
            return Ok(Intersection::Invalid);
        }
        Ok(Intersection::Valid(Coordinate::new(
            origin_a.lat + range_a * u_a.1,
            origin_a.lon + range_a * u_a.0,
        )))
    }

    fn distance(&self, from: Coordinate, to: Coordinate) -> GeoResult<f64> {
        Ok((to.lon - from.lon).hypot(to.lat - from.lat))
    }

    fn to_geographic(&self, grid: &str) -> GeoResult<Coordinate> {
        let invalid = || GeoError::InvalidGrid(grid.to_string());
        let (x, y) = grid.split_once(',').ok_or_else(invalid)?;
        let x: f64 = x.trim().parse().map_err(|_| invalid())?;
        let y: f64 = y.trim().parse().map_err(|_| invalid())?;
        Ok(Coordinate::new(y, x))
    }

    fn to_grid(&self, position: Coordinate) -> GeoResult<String> {
        Ok(format!("{:.1},{:.1}", position.lon, position.lat))
    }
}

pub fn site(name: &str, location: &str, bearing: f64) -> Site {
    let time = Utc.with_ymd_and_hms(2013, 12, 1, 14, 30, 0).unwrap();
    Site::new(name, time, location, bearing)
}
