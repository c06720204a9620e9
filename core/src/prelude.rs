use serde::{Deserialize, Serialize};
use std::fmt;

/// Default maximum mean cut-to-centroid distance, in meters, for a fix.
pub const DEFAULT_CUT_THRESHOLD_M: f64 = 100.0;

/// Geographic position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6},{:.6}", self.lat, self.lon)
    }
}

/// Outcome of intersecting two forward lines of bearing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "at", rename_all = "snake_case")]
pub enum Intersection {
    /// The rays meet in front of both origins.
    Valid(Coordinate),
    /// Parallel rays, or a crossing at effectively infinite range.
    Infinite,
    /// Degenerate solve: coincident origins or rays overlapping head-on.
    Ambiguous,
    /// The lines cross behind one or both origins.
    Invalid,
}

impl Intersection {
    pub fn is_valid(&self) -> bool {
        matches!(self, Intersection::Valid(_))
    }

    pub fn point(&self) -> Option<Coordinate> {
        match self {
            Intersection::Valid(point) => Some(*point),
            _ => None,
        }
    }

    /// Short label used in status lines for the sentinel outcomes.
    pub fn label(&self) -> &'static str {
        match self {
            Intersection::Valid(_) => "Cut",
            Intersection::Infinite => "Inf",
            Intersection::Ambiguous => "Amb",
            Intersection::Invalid => "None",
        }
    }
}

/// How invalid cuts participate in the average cut-to-centroid distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Denominator {
    /// Divide by every cut; invalid cuts dilute the average.
    #[default]
    AllCuts,
    /// Divide by the valid cuts only.
    ValidCuts,
}

/// Parameters for one deconfliction pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DfConfig {
    pub threshold_m: f64,
    pub denominator: Denominator,
}

impl Default for DfConfig {
    fn default() -> Self {
        Self {
            threshold_m: DEFAULT_CUT_THRESHOLD_M,
            denominator: Denominator::AllCuts,
        }
    }
}

impl DfConfig {
    pub fn with_threshold(threshold_m: f64) -> Self {
        Self {
            threshold_m,
            ..Default::default()
        }
    }
}

/// Failures raised by the geodesy collaborator.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum GeoError {
    #[error("invalid grid reference: {0}")]
    InvalidGrid(String),
    #[error("coordinate out of range: {0}")]
    OutOfRange(String),
    #[error("geodesic solution did not converge: {0}")]
    NoConvergence(String),
    #[error("unknown ellipsoid: {0}")]
    UnknownEllipsoid(String),
}

pub type GeoResult<T> = Result<T, GeoError>;

/// Failures raised while editing a signal of interest.
#[derive(thiserror::Error, Debug)]
pub enum SoiError {
    #[error("duplicate site: {0}")]
    DuplicateSite(String),
    #[error("unknown site: {0}")]
    UnknownSite(String),
    #[error(transparent)]
    Geo(#[from] GeoError),
}

pub type SoiResult<T> = Result<T, SoiError>;

/// Geodesic primitives consumed by the deconfliction engine.
///
/// Bearings are degrees from true north in `[0, 360)` and distances are meters.
pub trait Geodesy {
    fn ray_intersect(
        &self,
        origin_a: Coordinate,
        bearing_a: f64,
        origin_b: Coordinate,
        bearing_b: f64,
    ) -> GeoResult<Intersection>;
    fn distance(&self, from: Coordinate, to: Coordinate) -> GeoResult<f64>;
    fn to_geographic(&self, grid: &str) -> GeoResult<Coordinate>;
    fn to_grid(&self, position: Coordinate) -> GeoResult<String>;
}
