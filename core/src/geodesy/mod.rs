pub mod azimuth;
pub mod ellipsoid;
pub mod intersect;
pub mod mgrs;
pub mod utm;

pub use azimuth::{Declination, DeclinationDirection, NorthReference};
pub use ellipsoid::{Ellipsoid, Inverse};
pub use mgrs::GridReference;

use crate::prelude::{Coordinate, GeoError, GeoResult, Geodesy, Intersection};
use serde::{Deserialize, Serialize};

/// Default precision of formatted grid references (1 m cells).
pub const DEFAULT_GRID_PRECISION: usize = 5;
/// Crossings farther than this from either site are reported as infinite.
pub const DEFAULT_MAX_RANGE_M: f64 = 1_000_000.0;

/// Ellipsoidal earth model backed by MGRS grid references.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EarthModel {
    pub ellipsoid: Ellipsoid,
    pub grid_precision: usize,
    pub max_range_m: f64,
}

impl Default for EarthModel {
    fn default() -> Self {
        Self {
            ellipsoid: Ellipsoid::WGS84,
            grid_precision: DEFAULT_GRID_PRECISION,
            max_range_m: DEFAULT_MAX_RANGE_M,
        }
    }
}

impl EarthModel {
    pub fn new(ellipsoid: Ellipsoid) -> Self {
        Self {
            ellipsoid,
            ..Default::default()
        }
    }

    pub fn named(ellipsoid: &str) -> GeoResult<Self> {
        Ok(Self::new(Ellipsoid::from_name(ellipsoid)?))
    }

    pub fn with_grid_precision(mut self, precision: usize) -> GeoResult<Self> {
        if precision > mgrs::MAX_PRECISION {
            return Err(GeoError::OutOfRange(format!("grid precision {}", precision)));
        }
        self.grid_precision = precision;
        Ok(self)
    }

    pub fn with_max_range(mut self, max_range_m: f64) -> Self {
        self.max_range_m = max_range_m;
        self
    }

    /// Distance plus forward and back azimuths between two points.
    pub fn inverse(&self, from: Coordinate, to: Coordinate) -> GeoResult<Inverse> {
        self.ellipsoid.inverse(from, to)
    }

    /// Destination after travelling `distance_m` on `azimuth`.
    pub fn project(
        &self,
        origin: Coordinate,
        azimuth: f64,
        distance_m: f64,
    ) -> GeoResult<Coordinate> {
        Ok(self.ellipsoid.direct(origin, azimuth, distance_m)?.destination)
    }
}

impl Geodesy for EarthModel {
    fn ray_intersect(
        &self,
        origin_a: Coordinate,
        bearing_a: f64,
        origin_b: Coordinate,
        bearing_b: f64,
    ) -> GeoResult<Intersection> {
        intersect::ray_intersect(
            &self.ellipsoid,
            origin_a,
            bearing_a,
            origin_b,
            bearing_b,
            self.max_range_m,
        )
    }

    fn distance(&self, from: Coordinate, to: Coordinate) -> GeoResult<f64> {
        Ok(self.ellipsoid.inverse(from, to)?.distance_m)
    }

    fn to_geographic(&self, grid: &str) -> GeoResult<Coordinate> {
        GridReference::parse(grid)?.to_coordinate(&self.ellipsoid)
    }

    fn to_grid(&self, position: Coordinate) -> GeoResult<String> {
        let reference =
            GridReference::from_coordinate(&self.ellipsoid, position, self.grid_precision)?;
        Ok(reference.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_round_trip_through_trait() {
        let model = EarthModel::default();
        let position = model.to_geographic("42SUA6545360394").unwrap();
        assert_eq!(model.to_grid(position).unwrap(), "42SUA6545360394");
    }

    #[test]
    fn coarser_precision_truncates() {
        let model = EarthModel::default().with_grid_precision(3).unwrap();
        let position = model.to_geographic("42SUA6545360394").unwrap();
        assert_eq!(model.to_grid(position).unwrap(), "42SUA654603");
    }

    #[test]
    fn invalid_grid_is_reported() {
        let model = EarthModel::default();
        assert!(matches!(model.to_geographic("not a grid"), Err(GeoError::InvalidGrid(_))));
    }

    #[test]
    fn projected_point_lies_at_requested_distance() {
        let model = EarthModel::default();
        let origin = Coordinate::new(32.17, 67.56);
        let target = model.project(origin, 36.0, 1_500.0).unwrap();
        assert!((model.distance(origin, target).unwrap() - 1_500.0).abs() < 1e-6);
    }
}
