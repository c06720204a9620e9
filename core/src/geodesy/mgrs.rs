//! Military Grid Reference System references on top of the UTM grid.
//!
//! References decode to the south-west corner of the cell they name, so a
//! position formatted and parsed again lands within one cell of itself.

use super::ellipsoid::Ellipsoid;
use super::utm::{self, UtmPoint};
use crate::prelude::{Coordinate, GeoError, GeoResult};

const BANDS: &[u8; 20] = b"CDEFGHJKLMNPQRSTUVWX";
const COLUMN_SETS: [&[u8; 8]; 3] = [b"ABCDEFGH", b"JKLMNPQR", b"STUVWXYZ"];
const ROWS: &[u8; 20] = b"ABCDEFGHJKLMNPQRSTUV";
const SQUARE_M: f64 = 100_000.0;
const NORTHING_CYCLE_M: f64 = 2_000_000.0;

pub const MAX_PRECISION: usize = 5;

/// A decoded grid reference.
///
/// Only built by [`GridReference::parse`] and [`GridReference::from_coordinate`],
/// so the zone and precision always lie in range.
#[derive(Debug, Clone, PartialEq)]
pub struct GridReference {
    zone: u8,
    band: char,
    column: char,
    row: char,
    /// Digits per axis, 0 through 5.
    precision: usize,
    easting: u32,
    northing: u32,
}

impl GridReference {
    pub fn parse(text: &str) -> GeoResult<Self> {
        let compact: String = text
            .chars()
            .filter(|c| !c.is_whitespace())
            .map(|c| c.to_ascii_uppercase())
            .collect();
        let invalid = || GeoError::InvalidGrid(text.to_string());

        let zone_len = compact.chars().take_while(|c| c.is_ascii_digit()).count();
        if !(1..=2).contains(&zone_len) {
            return Err(invalid());
        }
        let zone: u8 = compact[..zone_len].parse().map_err(|_| invalid())?;
        if !(1..=60).contains(&zone) {
            return Err(invalid());
        }

        let rest = compact[zone_len..].as_bytes();
        if rest.len() < 3 {
            return Err(invalid());
        }
        let (band, column, row) = (rest[0], rest[1], rest[2]);
        if !BANDS.contains(&band)
            || !column_set(zone).contains(&column)
            || !ROWS.contains(&row)
        {
            return Err(invalid());
        }

        let digits = &rest[3..];
        if digits.len() % 2 != 0
            || digits.len() > 2 * MAX_PRECISION
            || !digits.iter().all(u8::is_ascii_digit)
        {
            return Err(invalid());
        }
        let precision = digits.len() / 2;
        let parse_axis = |axis: &[u8]| -> GeoResult<u32> {
            if axis.is_empty() {
                return Ok(0);
            }
            std::str::from_utf8(axis)
                .ok()
                .and_then(|s| s.parse().ok())
                .ok_or_else(invalid)
        };

        Ok(Self {
            zone,
            band: band as char,
            column: column as char,
            row: row as char,
            precision,
            easting: parse_axis(&digits[..precision])?,
            northing: parse_axis(&digits[precision..])?,
        })
    }

    pub fn zone(&self) -> u8 {
        self.zone
    }

    pub fn precision(&self) -> usize {
        self.precision
    }

    fn cell_m(&self) -> f64 {
        10f64.powi((MAX_PRECISION - self.precision) as i32)
    }

    pub fn to_utm(&self, ellipsoid: &Ellipsoid) -> GeoResult<UtmPoint> {
        let invalid = || GeoError::InvalidGrid(self.to_string());
        let column = column_set(self.zone)
            .iter()
            .position(|&c| c == self.column as u8)
            .ok_or_else(invalid)?;
        let mut row = ROWS
            .iter()
            .position(|&c| c == self.row as u8)
            .ok_or_else(invalid)?;
        if self.zone % 2 == 0 {
            row = (row + ROWS.len() - 5) % ROWS.len();
        }
        let band = BANDS
            .iter()
            .position(|&c| c == self.band as u8)
            .ok_or_else(invalid)?;

        let easting = (column as f64 + 1.0) * SQUARE_M + f64::from(self.easting) * self.cell_m();
        let partial_northing = row as f64 * SQUARE_M + f64::from(self.northing) * self.cell_m();

        let north = self.band >= 'N';
        let band_floor = -80.0 + 8.0 * band as f64;
        let meridian = utm::central_meridian(self.zone);
        let mut floor_northing =
            utm::forward_in_zone(ellipsoid, Coordinate::new(band_floor, meridian), self.zone)?
                .northing;
        if !north {
            // southern parallels bow toward the pole away from the meridian
            let edge = utm::forward_in_zone(
                ellipsoid,
                Coordinate::new(band_floor, meridian + 3.0),
                self.zone,
            )?;
            floor_northing = floor_northing.min(edge.northing);
        }

        // squares straddling the band floor still belong to this band
        floor_northing = (floor_northing / SQUARE_M).floor() * SQUARE_M;

        let mut northing = partial_northing;
        while northing < floor_northing {
            northing += NORTHING_CYCLE_M;
        }

        Ok(UtmPoint {
            zone: self.zone,
            north,
            easting,
            northing,
        })
    }

    pub fn to_coordinate(&self, ellipsoid: &Ellipsoid) -> GeoResult<Coordinate> {
        utm::inverse(ellipsoid, self.to_utm(ellipsoid)?)
    }

    pub fn from_coordinate(
        ellipsoid: &Ellipsoid,
        position: Coordinate,
        precision: usize,
    ) -> GeoResult<Self> {
        if precision > MAX_PRECISION {
            return Err(GeoError::OutOfRange(format!("grid precision {}", precision)));
        }
        let point = utm::forward(ellipsoid, position)?;
        let band = (((position.lat + 80.0) / 8.0).floor() as i64).clamp(0, 19) as usize;

        let column = (point.easting / SQUARE_M).floor() as i64 - 1;
        if !(0..8).contains(&column) {
            return Err(GeoError::OutOfRange(format!(
                "easting {:.1} outside zone {}",
                point.easting, point.zone
            )));
        }
        let mut row = ((point.northing / SQUARE_M).floor() as i64).rem_euclid(20) as usize;
        if point.zone % 2 == 0 {
            row = (row + 5) % ROWS.len();
        }

        let cell = 10f64.powi((MAX_PRECISION - precision) as i32);
        let cells = 10u32.pow(precision as u32);
        let truncate = |value: f64| -> u32 {
            let within = value.rem_euclid(SQUARE_M) + 1e-6;
            ((within / cell).floor() as u32).min(cells.saturating_sub(1))
        };

        Ok(Self {
            zone: point.zone,
            band: BANDS[band] as char,
            column: column_set(point.zone)[column as usize] as char,
            row: ROWS[row] as char,
            precision,
            easting: truncate(point.easting),
            northing: truncate(point.northing),
        })
    }
}

impl std::fmt::Display for GridReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}{}{}{}", self.zone, self.band, self.column, self.row)?;
        if self.precision > 0 {
            write!(
                f,
                "{:0width$}{:0width$}",
                self.easting,
                self.northing,
                width = self.precision
            )?;
        }
        Ok(())
    }
}

fn column_set(zone: u8) -> &'static [u8; 8] {
    COLUMN_SETS[(usize::from(zone) - 1) % 3]
}

/// True when `text` parses as a grid reference.
pub fn is_valid(text: &str) -> bool {
    GridReference::parse(text).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_compact_and_spaced_references() {
        let compact = GridReference::parse("42SUA64216070").unwrap();
        let spaced = GridReference::parse("42s ua 6421 6070").unwrap();
        assert_eq!(compact, spaced);
        assert_eq!(compact.precision, 4);
        assert_eq!(compact.easting, 6421);
        assert_eq!(compact.northing, 6070);
    }

    #[test]
    fn decodes_known_reference() {
        let position = GridReference::parse("42SUA64216070")
            .unwrap()
            .to_coordinate(&Ellipsoid::WGS84)
            .unwrap();
        assert!((position.lat - 32.174_618).abs() < 1e-5);
        assert!((position.lon - 67.559_719).abs() < 1e-5);
    }

    #[test]
    fn formatting_round_trips_at_each_precision() {
        let ellipsoid = Ellipsoid::WGS84;
        for text in ["42SUA6545360394", "42SUA69986398", "42SUA699639", "42SUA6963"] {
            let reference = GridReference::parse(text).unwrap();
            let position = reference.to_coordinate(&ellipsoid).unwrap();
            let again = GridReference::from_coordinate(&ellipsoid, position, reference.precision)
                .unwrap();
            assert_eq!(again.to_string(), text);
        }
    }

    #[test]
    fn square_straddling_band_floor_stays_in_cycle() {
        let position = GridReference::parse("42SUA6421")
            .unwrap()
            .to_coordinate(&Ellipsoid::WGS84)
            .unwrap();
        assert!(position.lat > 31.0 && position.lat < 33.0);
    }

    #[test]
    fn southern_hemisphere_round_trips() {
        let ellipsoid = Ellipsoid::WGS84;
        let position = Coordinate::new(-33.924_87, 18.424_055);
        let reference = GridReference::from_coordinate(&ellipsoid, position, 5).unwrap();
        assert!(reference.to_string().starts_with("34H"));
        let back = reference.to_coordinate(&ellipsoid).unwrap();
        assert!((back.lat - position.lat).abs() < 2e-5);
        assert!((back.lon - position.lon).abs() < 2e-5);
    }

    #[test]
    fn rejects_malformed_references() {
        for text in [
            "",
            "42",
            "42SUA123",
            "61SUA1234",
            "42IUA1234",
            "42SAA1234",
            "42SUW1234",
            "42SUA12x4",
        ] {
            assert!(!is_valid(text), "{text} should be rejected");
        }
    }

    #[test]
    fn precision_never_exceeds_one_meter() {
        assert!(!is_valid("42SUA123456123456"));
        let ellipsoid = Ellipsoid::WGS84;
        let position = GridReference::parse("42SUA6421660701")
            .unwrap()
            .to_coordinate(&ellipsoid)
            .unwrap();
        assert!(GridReference::from_coordinate(&ellipsoid, position, MAX_PRECISION + 1).is_err());
        let finest = GridReference::from_coordinate(&ellipsoid, position, MAX_PRECISION).unwrap();
        assert_eq!(finest.precision(), MAX_PRECISION);
        assert_eq!(finest.zone(), 42);
        assert_eq!(finest.cell_m(), 1.0);
    }
}
