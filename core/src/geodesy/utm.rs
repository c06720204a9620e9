//! Universal Transverse Mercator projection using the Krüger series.

use super::ellipsoid::Ellipsoid;
use crate::prelude::{Coordinate, GeoError, GeoResult};

const SCALE_FACTOR: f64 = 0.9996;
const FALSE_EASTING: f64 = 500_000.0;
const FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;

/// Position on the UTM grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UtmPoint {
    pub zone: u8,
    pub north: bool,
    pub easting: f64,
    pub northing: f64,
}

struct Series {
    rectifying_radius: f64,
    alpha: [f64; 3],
    beta: [f64; 3],
    delta: [f64; 3],
    conformal: f64,
}

impl Series {
    fn new(ellipsoid: &Ellipsoid) -> Self {
        let n = ellipsoid.third_flattening();
        let (n2, n3) = (n * n, n * n * n);
        Self {
            rectifying_radius: ellipsoid.semi_major_m / (1.0 + n)
                * (1.0 + n2 / 4.0 + n2 * n2 / 64.0),
            alpha: [
                n / 2.0 - 2.0 * n2 / 3.0 + 5.0 * n3 / 16.0,
                13.0 * n2 / 48.0 - 3.0 * n3 / 5.0,
                61.0 * n3 / 240.0,
            ],
            beta: [
                n / 2.0 - 2.0 * n2 / 3.0 + 37.0 * n3 / 96.0,
                n2 / 48.0 + n3 / 15.0,
                17.0 * n3 / 480.0,
            ],
            delta: [
                2.0 * n - 2.0 * n2 / 3.0 - 2.0 * n3,
                7.0 * n2 / 3.0 - 8.0 * n3 / 5.0,
                56.0 * n3 / 15.0,
            ],
            conformal: 2.0 * n.sqrt() / (1.0 + n),
        }
    }
}

pub fn central_meridian(zone: u8) -> f64 {
    f64::from(zone) * 6.0 - 183.0
}

/// Standard zone for a position, honouring the Norway and Svalbard exceptions.
pub fn zone_for(position: Coordinate) -> u8 {
    let Coordinate { lat, lon } = position;
    let lon = if lon >= 180.0 { lon - 360.0 } else { lon };
    let mut zone = (((lon + 180.0) / 6.0).floor() as i32 + 1).clamp(1, 60) as u8;
    if (56.0..64.0).contains(&lat) && (3.0..12.0).contains(&lon) {
        zone = 32;
    }
    if (72.0..=84.0).contains(&lat) && lon >= 0.0 && lon < 42.0 {
        zone = match lon {
            l if l < 9.0 => 31,
            l if l < 21.0 => 33,
            l if l < 33.0 => 35,
            _ => 37,
        };
    }
    zone
}

/// Projects a position into its standard zone.
pub fn forward(ellipsoid: &Ellipsoid, position: Coordinate) -> GeoResult<UtmPoint> {
    forward_in_zone(ellipsoid, position, zone_for(position))
}

/// Projects a position into the given zone (which may be outside the standard one).
pub fn forward_in_zone(
    ellipsoid: &Ellipsoid,
    position: Coordinate,
    zone: u8,
) -> GeoResult<UtmPoint> {
    if !(-80.0..=84.0).contains(&position.lat) {
        return Err(GeoError::OutOfRange(format!(
            "latitude {:.6} outside UTM coverage",
            position.lat
        )));
    }
    if !(1..=60).contains(&zone) {
        return Err(GeoError::OutOfRange(format!("UTM zone {}", zone)));
    }

    let series = Series::new(ellipsoid);
    let phi = position.lat.to_radians();
    let lambda = (position.lon - central_meridian(zone)).to_radians();

    let t = (phi.sin().atanh() - series.conformal * (series.conformal * phi.sin()).atanh()).sinh();
    let xi_prime = t.atan2(lambda.cos());
    let eta_prime = (lambda.sin() / (1.0 + t * t).sqrt()).atanh();

    let mut xi = xi_prime;
    let mut eta = eta_prime;
    for (j, alpha) in series.alpha.iter().enumerate() {
        let k = 2.0 * (j as f64 + 1.0);
        xi += alpha * (k * xi_prime).sin() * (k * eta_prime).cosh();
        eta += alpha * (k * xi_prime).cos() * (k * eta_prime).sinh();
    }

    let north = position.lat >= 0.0;
    let mut northing = SCALE_FACTOR * series.rectifying_radius * xi;
    if !north {
        northing += FALSE_NORTHING_SOUTH;
    }

    Ok(UtmPoint {
        zone,
        north,
        easting: FALSE_EASTING + SCALE_FACTOR * series.rectifying_radius * eta,
        northing,
    })
}

pub fn inverse(ellipsoid: &Ellipsoid, point: UtmPoint) -> GeoResult<Coordinate> {
    if !(1..=60).contains(&point.zone) {
        return Err(GeoError::OutOfRange(format!("UTM zone {}", point.zone)));
    }

    let series = Series::new(ellipsoid);
    let northing = if point.north {
        point.northing
    } else {
        point.northing - FALSE_NORTHING_SOUTH
    };
    let xi = northing / (SCALE_FACTOR * series.rectifying_radius);
    let eta = (point.easting - FALSE_EASTING) / (SCALE_FACTOR * series.rectifying_radius);

    let mut xi_prime = xi;
    let mut eta_prime = eta;
    for (j, beta) in series.beta.iter().enumerate() {
        let k = 2.0 * (j as f64 + 1.0);
        xi_prime -= beta * (k * xi).sin() * (k * eta).cosh();
        eta_prime -= beta * (k * xi).cos() * (k * eta).sinh();
    }

    let chi = (xi_prime.sin() / eta_prime.cosh()).asin();
    let mut phi = chi;
    for (j, delta) in series.delta.iter().enumerate() {
        let k = 2.0 * (j as f64 + 1.0);
        phi += delta * (k * chi).sin();
    }
    let lambda = eta_prime.sinh().atan2(xi_prime.cos());

    Ok(Coordinate::new(
        phi.to_degrees(),
        central_meridian(point.zone) + lambda.to_degrees(),
    ))
}
