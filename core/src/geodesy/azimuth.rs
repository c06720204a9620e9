use super::ellipsoid::normalize_degrees;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// North reference an azimuth is measured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NorthReference {
    #[default]
    True,
    Grid,
    Magnetic,
}

impl NorthReference {
    /// Column suffix used when labelling bearings (`LOB (MN)`).
    pub fn abbreviation(&self) -> &'static str {
        match self {
            NorthReference::True => "TN",
            NorthReference::Grid => "GN",
            NorthReference::Magnetic => "MN",
        }
    }
}

impl fmt::Display for NorthReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NorthReference::True => "true",
            NorthReference::Grid => "grid",
            NorthReference::Magnetic => "magnetic",
        };
        f.write_str(name)
    }
}

impl FromStr for NorthReference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "true" => Ok(NorthReference::True),
            "grid" => Ok(NorthReference::Grid),
            "magnetic" => Ok(NorthReference::Magnetic),
            other => Err(format!("unknown north reference: {}", other)),
        }
    }
}

/// Side of grid north on which true and magnetic north lie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeclinationDirection {
    #[default]
    Easterly,
    Westerly,
}

/// Declination diagram: grid-to-magnetic and grid-to-true angles in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Declination {
    pub direction: DeclinationDirection,
    pub grid_to_magnetic: f64,
    pub grid_to_true: f64,
}

impl Default for Declination {
    fn default() -> Self {
        Self {
            direction: DeclinationDirection::Easterly,
            grid_to_magnetic: 3.0,
            grid_to_true: 1.0,
        }
    }
}

impl Declination {
    /// Clockwise angle from grid north to the given north.
    fn offset(&self, reference: NorthReference) -> f64 {
        let angle = match reference {
            NorthReference::Grid => 0.0,
            NorthReference::Magnetic => self.grid_to_magnetic,
            NorthReference::True => self.grid_to_true,
        };
        match self.direction {
            DeclinationDirection::Easterly => angle,
            DeclinationDirection::Westerly => -angle,
        }
    }
}

/// Re-references `bearing` from one north to another, normalized to `[0, 360)`.
pub fn convert(
    from: NorthReference,
    to: NorthReference,
    bearing: f64,
    declination: &Declination,
) -> f64 {
    if from == to {
        return normalize_degrees(bearing);
    }
    normalize_degrees(bearing + declination.offset(from) - declination.offset(to))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn easterly() -> Declination {
        Declination::default()
    }

    #[test]
    fn magnetic_to_grid_adds_easterly_angle() {
        let grid = convert(NorthReference::Magnetic, NorthReference::Grid, 100.0, &easterly());
        assert_eq!(grid, 103.0);
    }

    #[test]
    fn grid_to_magnetic_subtracts_easterly_angle() {
        let magnetic = convert(NorthReference::Grid, NorthReference::Magnetic, 1.0, &easterly());
        assert_eq!(magnetic, 358.0);
    }

    #[test]
    fn westerly_declination_reverses_sign() {
        let declination = Declination {
            direction: DeclinationDirection::Westerly,
            grid_to_magnetic: 4.0,
            grid_to_true: 2.0,
        };
        let true_bearing = convert(
            NorthReference::Magnetic,
            NorthReference::True,
            90.0,
            &declination,
        );
        assert_eq!(true_bearing, 88.0);
    }

    #[test]
    fn conversion_round_trips() {
        let declination = easterly();
        let there = convert(NorthReference::True, NorthReference::Magnetic, 359.5, &declination);
        let back = convert(NorthReference::Magnetic, NorthReference::True, there, &declination);
        assert!((back - 359.5).abs() < 1e-9);
    }

    #[test]
    fn parses_reference_names() {
        assert_eq!("Magnetic".parse::<NorthReference>().unwrap(), NorthReference::Magnetic);
        assert!("compass".parse::<NorthReference>().is_err());
    }
}
