use crate::config::TimeBase;
use crate::workflow::sheet::{SignalEntry, SiteEntry, Sheet};
use anyhow::{bail, Context};
use chrono::NaiveDate;
use lobcore::geodesy::ellipsoid::normalize_degrees;
use lobcore::geodesy::{EarthModel, NorthReference};
use lobcore::prelude::Geodesy;
use lobcore::soi::is_valid_name;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioSite {
    pub name: String,
    pub grid: String,
}

/// Configuration for generating a synthetic observation sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    /// Grid reference of the emitter every site is listening to.
    pub emitter: String,
    pub sites: Vec<ScenarioSite>,
    pub date: NaiveDate,
    pub time: String,
    pub frequency: f64,
    /// Half-width, in degrees, of the uniform error added to each bearing.
    pub noise_deg: f64,
    pub seed: u64,
    pub description: Option<String>,
    pub scenario: Option<String>,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        let site = |name: &str, grid: &str| ScenarioSite {
            name: name.to_string(),
            grid: grid.to_string(),
        };
        Self {
            emitter: "42SUA6516461962".to_string(),
            sites: vec![
                site("V", "42SUA64216070"),
                site("B", "42SUA71356353"),
                site("C", "42SUA66566130"),
            ],
            date: NaiveDate::from_ymd_opt(2013, 12, 1).unwrap_or(NaiveDate::MIN),
            time: "1430".to_string(),
            frequency: 43.125,
            noise_deg: 1.0,
            seed: 0,
            description: None,
            scenario: None,
        }
    }
}

/// Builds a one-signal sheet whose true bearings point from each site at the
/// emitter, jittered by seeded noise.
pub fn build_sheet(config: &ScenarioConfig, model: &EarthModel) -> anyhow::Result<Sheet> {
    if !(config.noise_deg.is_finite() && config.noise_deg >= 0.0) {
        bail!("noise_deg must be zero or positive");
    }
    let emitter = model
        .to_geographic(&config.emitter)
        .with_context(|| format!("emitter {}", config.emitter))?;

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut sites = Vec::with_capacity(config.sites.len());
    for site in &config.sites {
        if !is_valid_name(&site.name) {
            bail!("site name {:?} must be 1 to 5 letters or digits", site.name);
        }
        let origin = model
            .to_geographic(&site.grid)
            .with_context(|| format!("site {} at {}", site.name, site.grid))?;
        let path = model.inverse(origin, emitter)?;
        if path.distance_m < 1.0 {
            bail!("site {} sits on the emitter", site.name);
        }
        let jitter = rng.gen_range(-config.noise_deg..=config.noise_deg);
        sites.push(SiteEntry {
            name: site.name.clone(),
            time: config.time.clone(),
            grid: site.grid.clone(),
            bearing: normalize_degrees(path.initial_azimuth + jitter),
        });
    }

    Ok(Sheet {
        reference: Some(NorthReference::True),
        clock: Some(TimeBase::Zulu),
        signals: vec![SignalEntry {
            date: config.date,
            time: config.time.clone(),
            frequency: config.frequency,
            summary: config.description.clone().unwrap_or_default(),
            note: config.scenario.clone().unwrap_or_default(),
            callsigns: Vec::new(),
            sites,
        }],
        merges: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Preferences;
    use crate::workflow::runner::Runner;
    use lobcore::df::DfState;

    #[test]
    fn noiseless_scenario_fixes_on_emitter() {
        let model = EarthModel::default();
        let config = ScenarioConfig {
            noise_deg: 0.0,
            ..Default::default()
        };
        let sheet = build_sheet(&config, &model).unwrap();
        let runner = Runner::new(Preferences::default()).unwrap();
        let result = runner.ingest(&sheet).unwrap();
        assert_eq!(result.outcomes[0].state, Some(DfState::Fix));

        let (_, soi) = result.log.signals().next().unwrap();
        let fix = soi.df().and_then(|df| df.fix()).unwrap();
        let emitter = model.to_geographic(&config.emitter).unwrap();
        assert!(model.distance(fix, emitter).unwrap() < 1.0);
    }

    #[test]
    fn same_seed_same_sheet() {
        let model = EarthModel::default();
        let config = ScenarioConfig {
            seed: 42,
            ..Default::default()
        };
        assert_eq!(
            build_sheet(&config, &model).unwrap(),
            build_sheet(&config, &model).unwrap()
        );
    }

    #[test]
    fn noise_stays_within_bound() {
        let model = EarthModel::default();
        let exact = build_sheet(
            &ScenarioConfig {
                noise_deg: 0.0,
                ..Default::default()
            },
            &model,
        )
        .unwrap();
        let noisy = build_sheet(
            &ScenarioConfig {
                noise_deg: 2.0,
                seed: 7,
                ..Default::default()
            },
            &model,
        )
        .unwrap();
        for (a, b) in exact.signals[0].sites.iter().zip(&noisy.signals[0].sites) {
            let diff = lobcore::geodesy::ellipsoid::angle_difference(a.bearing, b.bearing);
            assert!(diff.abs() <= 2.0 + 1e-9);
        }
    }

    #[test]
    fn bad_inputs_are_rejected() {
        let model = EarthModel::default();
        let mut config = ScenarioConfig::default();
        config.sites[0].grid = config.emitter.clone();
        assert!(build_sheet(&config, &model).is_err());

        let mut config = ScenarioConfig::default();
        config.sites[1].name = "BRAVO6".into();
        assert!(build_sheet(&config, &model).is_err());

        let config = ScenarioConfig {
            emitter: "nowhere".into(),
            ..Default::default()
        };
        assert!(build_sheet(&config, &model).is_err());
    }
}
