//! Line-of-bearing triangulation core for LOBster.
//!
//! Sites report bearings to one emitter; every pair of bearings is crossed on
//! the ellipsoid and the resulting cuts are deconflicted into a DF state. The
//! registry keeps signals and the conversations that group them.

pub mod df;
pub mod geodesy;
pub mod prelude;
pub mod registry;
pub mod soi;
pub mod telemetry;

#[cfg(test)]
mod testing;

pub use df::{Cut, Df, DfState, DfStatus};
pub use geodesy::EarthModel;
pub use prelude::{Coordinate, DfConfig, GeoError, Geodesy, Intersection, SoiError};
pub use registry::{Record, RecordId, SignalLog};
pub use soi::{Site, Soi};
