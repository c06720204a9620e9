//! Deconfliction of pairwise cuts into a single direction-finding result.

pub mod cut;

pub use cut::{Cut, CutEnd};

use crate::prelude::{Coordinate, Denominator, DfConfig, GeoResult, Geodesy, Intersection};
use crate::soi::Site;
use crate::telemetry::LogManager;
use serde::{Deserialize, Serialize};
use std::fmt;

const LOGGER: LogManager = LogManager::new("lobcore::df");

/// Overall quality of a set of lines of bearing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DfState {
    /// No sites were given.
    #[default]
    Invalid,
    /// Three or more sites but not one usable cut.
    None,
    /// One site, or two sites without a usable cut.
    SingleLob,
    /// Two sites with a usable cut.
    Cut,
    /// Cuts that do not agree closely enough for a fix.
    AmbiguousCut,
    Fix,
}

impl fmt::Display for DfState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DfState::Invalid => "invalid",
            DfState::None => "none",
            DfState::SingleLob => "lob",
            DfState::Cut => "cut",
            DfState::AmbiguousCut => "ambiguous cut",
            DfState::Fix => "fix",
        };
        f.write_str(name)
    }
}

/// Human-readable summary of a result, rendered with `Display`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DfStatus {
    #[default]
    Empty,
    Lob { site: String, bearing: f64 },
    Lobs,
    Cut { site_a: String, site_b: String, grid: String },
    NoCuts,
    Cuts,
    Fix { grid: String },
}

impl fmt::Display for DfStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DfStatus::Empty => f.write_str("None"),
            DfStatus::Lob { site, bearing } => write!(f, "LOB {}->{:.0}", site, bearing),
            DfStatus::Lobs => f.write_str("LOB(s)"),
            DfStatus::Cut {
                site_a,
                site_b,
                grid,
            } => write!(f, "CUT {}<->{} {}", site_a, site_b, grid),
            DfStatus::NoCuts => f.write_str("No Cuts"),
            DfStatus::Cuts => f.write_str("CUT(s)"),
            DfStatus::Fix { grid } => write!(f, "FIX {}", grid),
        }
    }
}

/// Cuts and classification for one set of sites.
///
/// A `Df` is always rebuilt from scratch by [`Df::find`]; nothing patches it
/// in place.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Df {
    cuts: Vec<Cut>,
    centroid: Option<Coordinate>,
    fix: Option<Coordinate>,
    distances: Vec<Option<f64>>,
    average_distance: Option<f64>,
    state: DfState,
    status: DfStatus,
}

impl Df {
    /// Computes every cut between `sites` and classifies them.
    ///
    /// Degenerate geometry never fails; only collaborator errors (unreadable
    /// grid references, geodesics that do not converge) are returned.
    pub fn find<G: Geodesy + ?Sized>(
        sites: &[Site],
        config: &DfConfig,
        geodesy: &G,
    ) -> GeoResult<Self> {
        let mut df = Df {
            cuts: cut::pairwise(sites, geodesy)?,
            ..Default::default()
        };
        for cut in &df.cuts {
            LOGGER.detail(&format!(
                "cut {}<->{}: {}",
                cut.a.name,
                cut.b.name,
                cut.intersection.label()
            ));
        }

        df.deconflict(sites, config, geodesy)?;
        LOGGER.record(&format!(
            "DF of {} site(s) -> {} ({})",
            sites.len(),
            df.state,
            df.status
        ));
        Ok(df)
    }

    fn deconflict<G: Geodesy + ?Sized>(
        &mut self,
        sites: &[Site],
        config: &DfConfig,
        geodesy: &G,
    ) -> GeoResult<()> {
        match sites {
            [] => {
                self.state = DfState::Invalid;
                self.status = DfStatus::Empty;
            }
            [only] => {
                self.state = DfState::SingleLob;
                self.status = DfStatus::Lob {
                    site: only.name().to_string(),
                    bearing: only.bearing(),
                };
            }
            [first, second] => match self.cuts[0].intersection {
                Intersection::Valid(point) => {
                    self.state = DfState::Cut;
                    self.status = DfStatus::Cut {
                        site_a: first.name().to_string(),
                        site_b: second.name().to_string(),
                        grid: grid_label(geodesy, point),
                    };
                }
                _ => {
                    self.state = DfState::SingleLob;
                    self.status = DfStatus::Lobs;
                }
            },
            _ => self.classify_cluster(config, geodesy)?,
        }
        Ok(())
    }

    fn classify_cluster<G: Geodesy + ?Sized>(
        &mut self,
        config: &DfConfig,
        geodesy: &G,
    ) -> GeoResult<()> {
        let Some(centroid) = centroid(&self.cuts) else {
            self.distances = vec![None; self.cuts.len()];
            self.state = DfState::None;
            self.status = DfStatus::NoCuts;
            return Ok(());
        };
        self.centroid = Some(centroid);

        self.distances = self
            .cuts
            .iter()
            .map(|cut| {
                cut.intersection
                    .point()
                    .map(|point| geodesy.distance(point, centroid))
                    .transpose()
            })
            .collect::<GeoResult<_>>()?;

        let total: f64 = self.distances.iter().flatten().sum();
        let count = match config.denominator {
            Denominator::AllCuts => self.distances.len(),
            Denominator::ValidCuts => self.distances.iter().flatten().count(),
        };
        let average = total / count as f64;
        self.average_distance = Some(average);

        if average < config.threshold_m {
            self.fix = Some(centroid);
            self.state = DfState::Fix;
            self.status = DfStatus::Fix {
                grid: grid_label(geodesy, centroid),
            };
        } else {
            self.state = DfState::AmbiguousCut;
            self.status = DfStatus::Cuts;
        }
        Ok(())
    }

    pub fn cuts(&self) -> &[Cut] {
        &self.cuts
    }

    /// Outcome of the cut between two named sites, in either order.
    pub fn cut(&self, first: &str, second: &str) -> Option<Intersection> {
        self.cuts
            .iter()
            .find(|cut| cut.joins(first, second))
            .map(|cut| cut.intersection)
    }

    pub fn valid_cuts(&self) -> impl Iterator<Item = &Cut> {
        self.cuts.iter().filter(|cut| cut.intersection.is_valid())
    }

    /// Mean of the valid cut positions, kept even when it is not a fix.
    pub fn centroid(&self) -> Option<Coordinate> {
        self.centroid
    }

    pub fn fix(&self) -> Option<Coordinate> {
        self.fix
    }

    /// Per-cut distance to the centroid; `None` for cuts with no crossing.
    pub fn distances(&self) -> &[Option<f64>] {
        &self.distances
    }

    pub fn average_distance(&self) -> Option<f64> {
        self.average_distance
    }

    pub fn state(&self) -> DfState {
        self.state
    }

    pub fn status(&self) -> &DfStatus {
        &self.status
    }
}

/// Unweighted mean latitude and longitude of the valid cuts.
fn centroid(cuts: &[Cut]) -> Option<Coordinate> {
    let points: Vec<Coordinate> = cuts.iter().filter_map(|cut| cut.intersection.point()).collect();
    if points.is_empty() {
        return None;
    }
    let n = points.len() as f64;
    let lat = points.iter().map(|p| p.lat).sum::<f64>() / n;
    let lon = points.iter().map(|p| p.lon).sum::<f64>() / n;
    Some(Coordinate::new(lat, lon))
}

fn grid_label<G: Geodesy + ?Sized>(geodesy: &G, point: Coordinate) -> String {
    geodesy.to_grid(point).unwrap_or_else(|err| {
        LOGGER.caution(&format!("no grid reference for {}: {}", point, err));
        point.to_string()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{site, FlatGeodesy};

    fn find(sites: &[Site], threshold_m: f64) -> Df {
        Df::find(sites, &DfConfig::with_threshold(threshold_m), &FlatGeodesy).unwrap()
    }

    #[test]
    fn cut_count_is_pair_count() {
        let bearings = [10.0, 80.0, 150.0, 220.0, 290.0, 330.0];
        for n in 0..=bearings.len() {
            let sites: Vec<Site> = (0..n)
                .map(|i| site(&format!("S{}", i), &format!("{},{}", i * 100, i * 37), bearings[i]))
                .collect();
            let df = find(&sites, 100.0);
            assert_eq!(df.cuts().len(), n * n.saturating_sub(1) / 2);
        }
    }

    #[test]
    fn no_sites_is_invalid() {
        let df = find(&[], 100.0);
        assert_eq!(df.state(), DfState::Invalid);
        assert!(df.cuts().is_empty());
        assert_eq!(df.fix(), None);
    }

    #[test]
    fn one_site_is_a_single_lob() {
        let df = find(&[site("V", "0,0", 36.0)], 100.0);
        assert_eq!(df.state(), DfState::SingleLob);
        assert!(df.cuts().is_empty());
        assert_eq!(df.status().to_string(), "LOB V->36");
    }

    #[test]
    fn two_crossing_sites_make_a_cut() {
        let df = find(&[site("A", "0,0", 45.0), site("B", "1000,0", 315.0)], 100.0);
        assert_eq!(df.state(), DfState::Cut);
        let point = df.cut("A", "B").and_then(|cut| cut.point()).unwrap();
        assert!((point.lon - 500.0).abs() < 1e-9);
        assert!((point.lat - 500.0).abs() < 1e-9);
        assert_eq!(df.status().to_string(), "CUT A<->B 500.0,500.0");
        assert_eq!(df.fix(), None);
    }

    #[test]
    fn two_parallel_sites_degrade_to_lob() {
        let df = find(&[site("W", "0,0", 90.0), site("E", "1000,0", 90.0)], 100.0);
        assert_eq!(df.cut("W", "E"), Some(Intersection::Infinite));
        assert_eq!(df.state(), DfState::SingleLob);
        assert_eq!(df.status(), &DfStatus::Lobs);
    }

    #[test]
    fn no_valid_cuts_is_none() {
        let sites = [
            site("A", "0,0", 0.0),
            site("B", "100,0", 0.0),
            site("C", "200,0", 0.0),
        ];
        let df = find(&sites, 100.0);
        assert_eq!(df.state(), DfState::None);
        assert_eq!(df.status().to_string(), "No Cuts");
        assert_eq!(df.fix(), None);
        assert_eq!(df.distances(), &[None, None, None]);
    }

    #[test]
    fn tight_cluster_is_a_fix_at_the_centroid() {
        // three rays that all pass through (500, 500)
        let sites = [
            site("A", "0,0", 45.0),
            site("B", "1000,0", 315.0),
            site("C", "500,-1000", 0.0),
        ];
        let df = find(&sites, 1.0);
        assert_eq!(df.state(), DfState::Fix);
        let fix = df.fix().unwrap();
        assert_eq!(Some(fix), df.centroid());
        assert!((fix.lon - 500.0).abs() < 1e-6);
        assert!((fix.lat - 500.0).abs() < 1e-6);
        assert!(df.average_distance().unwrap() < 1e-6);
        assert_eq!(df.status().to_string(), "FIX 500.0,500.0");
    }

    #[test]
    fn spread_cluster_is_ambiguous_without_fix() {
        // A-B cross at (500,500), A-C at (600,600), B-C at (600,400)
        let sites = [
            site("A", "0,0", 45.0),
            site("B", "1000,0", 315.0),
            site("C", "600,-1000", 0.0),
        ];
        let df = find(&sites, 50.0);
        assert_eq!(df.state(), DfState::AmbiguousCut);
        assert_eq!(df.fix(), None);

        let centroid = df.centroid().unwrap();
        assert!((centroid.lon - 1700.0 / 3.0).abs() < 1e-6);
        assert!((centroid.lat - 500.0).abs() < 1e-6);
        assert!(df.average_distance().unwrap() >= 50.0);
        assert_eq!(df.status(), &DfStatus::Cuts);
    }

    #[test]
    fn threshold_is_strict() {
        let sites = [
            site("A", "0,0", 45.0),
            site("B", "1000,0", 315.0),
            site("C", "600,-1000", 0.0),
        ];
        let average = find(&sites, 1e9).average_distance().unwrap();
        assert_eq!(find(&sites, average).state(), DfState::AmbiguousCut);
        assert_eq!(find(&sites, average + 1e-6).state(), DfState::Fix);
    }

    #[test]
    fn invalid_cuts_dilute_the_average_by_default() {
        // A, B and C meet at (500,500); D points away from everything
        let sites = [
            site("A", "0,0", 45.0),
            site("B", "1000,0", 315.0),
            site("C", "600,-1000", 0.0),
            site("D", "5000,5000", 45.0),
        ];
        let all = Df::find(&sites, &DfConfig::with_threshold(1e9), &FlatGeodesy).unwrap();
        let valid_only = Df::find(
            &sites,
            &DfConfig {
                threshold_m: 1e9,
                denominator: Denominator::ValidCuts,
            },
            &FlatGeodesy,
        )
        .unwrap();

        assert_eq!(all.cuts().len(), 6);
        assert_eq!(all.valid_cuts().count(), 3);
        assert_eq!(all.distances().iter().filter(|d| d.is_none()).count(), 3);
        let ratio = valid_only.average_distance().unwrap() / all.average_distance().unwrap();
        assert!((ratio - 2.0).abs() < 1e-9);
        assert_eq!(all.centroid(), valid_only.centroid());
    }

    #[test]
    fn lookup_is_commutative() {
        let sites = [
            site("A", "0,0", 45.0),
            site("B", "1000,0", 315.0),
            site("C", "500,-1000", 0.0),
        ];
        let df = find(&sites, 100.0);
        for a in ["A", "B", "C", "Z"] {
            for b in ["A", "B", "C", "Z"] {
                assert_eq!(df.cut(a, b), df.cut(b, a));
            }
        }
        assert_eq!(df.cut("A", "Z"), None);
        assert_eq!(df.cut("A", "A"), None);
    }

    #[test]
    fn duplicate_locations_degrade_quietly() {
        let sites = [
            site("A", "0,0", 45.0),
            site("B", "0,0", 90.0),
            site("C", "0,0", 10.0),
        ];
        let df = find(&sites, 100.0);
        assert!(df.cuts().iter().all(|cut| cut.intersection == Intersection::Ambiguous));
        assert_eq!(df.state(), DfState::None);
    }

    #[test]
    fn antipodal_bearings_degrade_quietly() {
        let df = find(&[site("A", "0,0", 90.0), site("B", "1000,0", 270.0)], 100.0);
        assert_eq!(df.cut("A", "B"), Some(Intersection::Ambiguous));
        assert_eq!(df.state(), DfState::SingleLob);
    }
}
