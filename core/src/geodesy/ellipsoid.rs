//! Reference ellipsoids and Vincenty's direct and inverse geodesic solutions.

use crate::prelude::{Coordinate, GeoError, GeoResult};
use serde::{Deserialize, Serialize};

const MAX_ITERATIONS: usize = 200;
const CONVERGENCE: f64 = 1e-12;

/// Oblate reference ellipsoid described by its semi-major axis and flattening.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ellipsoid {
    pub semi_major_m: f64,
    pub flattening: f64,
}

/// Solution of the inverse geodesic problem.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Inverse {
    pub distance_m: f64,
    /// Azimuth of the geodesic at the start point, degrees from north.
    pub initial_azimuth: f64,
    /// Azimuth of the geodesic at the end point, degrees from north.
    pub final_azimuth: f64,
}

/// Solution of the direct geodesic problem.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Direct {
    pub destination: Coordinate,
    pub final_azimuth: f64,
}

impl Ellipsoid {
    pub const WGS84: Ellipsoid = Ellipsoid {
        semi_major_m: 6_378_137.0,
        flattening: 1.0 / 298.257_223_563,
    };

    pub const GRS80: Ellipsoid = Ellipsoid {
        semi_major_m: 6_378_137.0,
        flattening: 1.0 / 298.257_222_101,
    };

    pub const CLARKE1866: Ellipsoid = Ellipsoid {
        semi_major_m: 6_378_206.4,
        flattening: 1.0 / 294.978_698_2,
    };

    pub fn from_name(name: &str) -> GeoResult<Self> {
        match name.trim().to_ascii_uppercase().as_str() {
            "WGS84" | "WGS-84" => Ok(Self::WGS84),
            "GRS80" | "GRS-80" => Ok(Self::GRS80),
            "CLARKE1866" | "CLRK66" => Ok(Self::CLARKE1866),
            _ => Err(GeoError::UnknownEllipsoid(name.to_string())),
        }
    }

    pub fn semi_minor_m(&self) -> f64 {
        self.semi_major_m * (1.0 - self.flattening)
    }

    /// Third flattening `n = f / (2 - f)`.
    pub fn third_flattening(&self) -> f64 {
        self.flattening / (2.0 - self.flattening)
    }

    fn series(&self, cos_sq_alpha: f64) -> (f64, f64) {
        let a = self.semi_major_m;
        let b = self.semi_minor_m();
        let u_sq = cos_sq_alpha * (a * a - b * b) / (b * b);
        let big_a =
            1.0 + u_sq / 16384.0 * (4096.0 + u_sq * (-768.0 + u_sq * (320.0 - 175.0 * u_sq)));
        let big_b = u_sq / 1024.0 * (256.0 + u_sq * (-128.0 + u_sq * (74.0 - 47.0 * u_sq)));
        (big_a, big_b)
    }

    /// Distance and azimuths between two points.
    ///
    /// Fails with [`GeoError::NoConvergence`] for nearly antipodal points.
    pub fn inverse(&self, from: Coordinate, to: Coordinate) -> GeoResult<Inverse> {
        let f = self.flattening;
        let l = (to.lon - from.lon).to_radians();
        let u1 = ((1.0 - f) * from.lat.to_radians().tan()).atan();
        let u2 = ((1.0 - f) * to.lat.to_radians().tan()).atan();
        let (sin_u1, cos_u1) = u1.sin_cos();
        let (sin_u2, cos_u2) = u2.sin_cos();

        let mut lambda = l;
        let mut converged = false;
        let (mut sin_sigma, mut cos_sigma, mut sigma) = (0.0, 1.0, 0.0);
        let (mut cos_sq_alpha, mut cos_2sigma_m) = (1.0, 0.0);
        let (mut sin_lambda, mut cos_lambda) = (0.0, 1.0);

        for _ in 0..MAX_ITERATIONS {
            (sin_lambda, cos_lambda) = lambda.sin_cos();
            let term = cos_u1 * sin_u2 - sin_u1 * cos_u2 * cos_lambda;
            sin_sigma = ((cos_u2 * sin_lambda).powi(2) + term * term).sqrt();
            if sin_sigma == 0.0 {
                return Ok(Inverse {
                    distance_m: 0.0,
                    initial_azimuth: 0.0,
                    final_azimuth: 0.0,
                });
            }
            cos_sigma = sin_u1 * sin_u2 + cos_u1 * cos_u2 * cos_lambda;
            sigma = sin_sigma.atan2(cos_sigma);
            let sin_alpha = cos_u1 * cos_u2 * sin_lambda / sin_sigma;
            cos_sq_alpha = 1.0 - sin_alpha * sin_alpha;
            // equatorial line
            cos_2sigma_m = if cos_sq_alpha != 0.0 {
                cos_sigma - 2.0 * sin_u1 * sin_u2 / cos_sq_alpha
            } else {
                0.0
            };
            let c = f / 16.0 * cos_sq_alpha * (4.0 + f * (4.0 - 3.0 * cos_sq_alpha));
            let previous = lambda;
            lambda = l
                + (1.0 - c)
                    * f
                    * sin_alpha
                    * (sigma
                        + c * sin_sigma
                            * (cos_2sigma_m
                                + c * cos_sigma * (-1.0 + 2.0 * cos_2sigma_m * cos_2sigma_m)));
            if (lambda - previous).abs() < CONVERGENCE {
                converged = true;
                break;
            }
        }

        if !converged {
            return Err(GeoError::NoConvergence(format!(
                "inverse {} -> {}",
                from, to
            )));
        }

        let (big_a, big_b) = self.series(cos_sq_alpha);
        let delta_sigma = big_b
            * sin_sigma
            * (cos_2sigma_m
                + big_b / 4.0
                    * (cos_sigma * (-1.0 + 2.0 * cos_2sigma_m * cos_2sigma_m)
                        - big_b / 6.0
                            * cos_2sigma_m
                            * (-3.0 + 4.0 * sin_sigma * sin_sigma)
                            * (-3.0 + 4.0 * cos_2sigma_m * cos_2sigma_m)));
        let distance_m = self.semi_minor_m() * big_a * (sigma - delta_sigma);

        let initial = (cos_u2 * sin_lambda)
            .atan2(cos_u1 * sin_u2 - sin_u1 * cos_u2 * cos_lambda)
            .to_degrees();
        let final_ = (cos_u1 * sin_lambda)
            .atan2(-sin_u1 * cos_u2 + cos_u1 * sin_u2 * cos_lambda)
            .to_degrees();

        Ok(Inverse {
            distance_m,
            initial_azimuth: normalize_degrees(initial),
            final_azimuth: normalize_degrees(final_),
        })
    }

    /// Point reached by travelling `distance_m` along the geodesic leaving
    /// `origin` at `azimuth`. Negative distances travel backwards.
    pub fn direct(&self, origin: Coordinate, azimuth: f64, distance_m: f64) -> GeoResult<Direct> {
        let f = self.flattening;
        let b = self.semi_minor_m();
        let (sin_alpha1, cos_alpha1) = azimuth.to_radians().sin_cos();
        let tan_u1 = (1.0 - f) * origin.lat.to_radians().tan();
        let cos_u1 = 1.0 / (1.0 + tan_u1 * tan_u1).sqrt();
        let sin_u1 = tan_u1 * cos_u1;
        let sigma1 = tan_u1.atan2(cos_alpha1);
        let sin_alpha = cos_u1 * sin_alpha1;
        let cos_sq_alpha = 1.0 - sin_alpha * sin_alpha;
        let (big_a, big_b) = self.series(cos_sq_alpha);

        let mut sigma = distance_m / (b * big_a);
        let mut converged = false;
        for _ in 0..MAX_ITERATIONS {
            let cos_2sigma_m = (2.0 * sigma1 + sigma).cos();
            let (sin_sigma, cos_sigma) = sigma.sin_cos();
            let delta_sigma = big_b
                * sin_sigma
                * (cos_2sigma_m
                    + big_b / 4.0
                        * (cos_sigma * (-1.0 + 2.0 * cos_2sigma_m * cos_2sigma_m)
                            - big_b / 6.0
                                * cos_2sigma_m
                                * (-3.0 + 4.0 * sin_sigma * sin_sigma)
                                * (-3.0 + 4.0 * cos_2sigma_m * cos_2sigma_m)));
            let previous = sigma;
            sigma = distance_m / (b * big_a) + delta_sigma;
            if (sigma - previous).abs() < CONVERGENCE {
                converged = true;
                break;
            }
        }

        if !converged {
            return Err(GeoError::NoConvergence(format!(
                "direct from {} at {:.4} for {:.1} m",
                origin, azimuth, distance_m
            )));
        }

        let cos_2sigma_m = (2.0 * sigma1 + sigma).cos();
        let (sin_sigma, cos_sigma) = sigma.sin_cos();
        let x = sin_u1 * sin_sigma - cos_u1 * cos_sigma * cos_alpha1;
        let lat = (sin_u1 * cos_sigma + cos_u1 * sin_sigma * cos_alpha1)
            .atan2((1.0 - f) * (sin_alpha * sin_alpha + x * x).sqrt());
        let lambda =
            (sin_sigma * sin_alpha1).atan2(cos_u1 * cos_sigma - sin_u1 * sin_sigma * cos_alpha1);
        let c = f / 16.0 * cos_sq_alpha * (4.0 + f * (4.0 - 3.0 * cos_sq_alpha));
        let series = cos_2sigma_m + c * cos_sigma * (-1.0 + 2.0 * cos_2sigma_m * cos_2sigma_m);
        let l = lambda - (1.0 - c) * f * sin_alpha * (sigma + c * sin_sigma * series);

        Ok(Direct {
            destination: Coordinate::new(
                lat.to_degrees(),
                normalize_longitude(origin.lon + l.to_degrees()),
            ),
            final_azimuth: normalize_degrees(sin_alpha.atan2(-x).to_degrees()),
        })
    }
}

impl Default for Ellipsoid {
    fn default() -> Self {
        Self::WGS84
    }
}

/// Wraps an angle into `[0, 360)`.
pub fn normalize_degrees(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(360.0);
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Wraps a longitude into `[-180, 180)`.
pub fn normalize_longitude(lon: f64) -> f64 {
    (lon + 180.0).rem_euclid(360.0) - 180.0
}

/// Signed smallest difference `a - b` in `(-180, 180]`.
pub fn angle_difference(a: f64, b: f64) -> f64 {
    let diff = (a - b).rem_euclid(360.0);
    if diff > 180.0 {
        diff - 360.0
    } else {
        diff
    }
}
