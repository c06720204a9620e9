use crate::prelude::{GeoResult, Geodesy, Intersection};
use crate::soi::Site;
use serde::{Deserialize, Serialize};

/// The site half of a cut, copied so the cut outlives edits to its signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CutEnd {
    pub name: String,
    pub location: String,
    pub bearing: f64,
}

impl From<&Site> for CutEnd {
    fn from(site: &Site) -> Self {
        Self {
            name: site.name().to_string(),
            location: site.location().to_string(),
            bearing: site.bearing(),
        }
    }
}

/// Intersection of the lines of bearing from two sites.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cut {
    pub a: CutEnd,
    pub b: CutEnd,
    pub intersection: Intersection,
    /// Meters from site A to the crossing; present only for valid cuts.
    pub distance_a: Option<f64>,
    pub distance_b: Option<f64>,
}

impl Cut {
    pub fn compute<G: Geodesy + ?Sized>(a: &Site, b: &Site, geodesy: &G) -> GeoResult<Self> {
        let origin_a = geodesy.to_geographic(a.location())?;
        let origin_b = geodesy.to_geographic(b.location())?;
        let intersection = geodesy.ray_intersect(origin_a, a.bearing(), origin_b, b.bearing())?;

        let (distance_a, distance_b) = match intersection {
            Intersection::Valid(point) => (
                Some(geodesy.distance(origin_a, point)?),
                Some(geodesy.distance(origin_b, point)?),
            ),
            _ => (None, None),
        };

        Ok(Self {
            a: CutEnd::from(a),
            b: CutEnd::from(b),
            intersection,
            distance_a,
            distance_b,
        })
    }

    /// True when this cut joins the two named sites, in either order.
    pub fn joins(&self, first: &str, second: &str) -> bool {
        (self.a.name == first && self.b.name == second)
            || (self.a.name == second && self.b.name == first)
    }
}

/// Cuts for every unordered pair of `sites`, in combination order.
pub fn pairwise<G: Geodesy + ?Sized>(sites: &[Site], geodesy: &G) -> GeoResult<Vec<Cut>> {
    let mut cuts = Vec::with_capacity(sites.len() * sites.len().saturating_sub(1) / 2);
    for (idx, a) in sites.iter().enumerate() {
        for b in &sites[idx + 1..] {
            cuts.push(Cut::compute(a, b, geodesy)?);
        }
    }
    Ok(cuts)
}
