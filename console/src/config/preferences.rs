use anyhow::{bail, Context};
use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};
use lobcore::geodesy::{
    Declination, EarthModel, NorthReference, DEFAULT_GRID_PRECISION, DEFAULT_MAX_RANGE_M,
};
use lobcore::prelude::{Denominator, DfConfig, DEFAULT_CUT_THRESHOLD_M};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Clock that entered or displayed times are expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeBase {
    Local,
    #[default]
    Zulu,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeoPreferences {
    pub ellipsoid: String,
    /// Meters; the mean cut spread must fall below this for a fix.
    pub cut_threshold: f64,
    pub denominator: Denominator,
    pub grid_precision: usize,
    pub max_range_m: f64,
}

impl Default for GeoPreferences {
    fn default() -> Self {
        Self {
            ellipsoid: "WGS84".to_string(),
            cut_threshold: DEFAULT_CUT_THRESHOLD_M,
            denominator: Denominator::AllCuts,
            grid_precision: DEFAULT_GRID_PRECISION,
            max_range_m: DEFAULT_MAX_RANGE_M,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiPreferences {
    /// North reference that sheet bearings are entered in.
    pub azimuth: NorthReference,
    /// Hours local time runs ahead of zulu.
    pub local_diff: f64,
    pub display_time: TimeBase,
}

impl Default for UiPreferences {
    fn default() -> Self {
        Self {
            azimuth: NorthReference::True,
            local_diff: 4.5,
            display_time: TimeBase::Zulu,
        }
    }
}

/// Operator preferences persisted as YAML.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub declination: Declination,
    pub geo: GeoPreferences,
    pub ui: UiPreferences,
}

impl Preferences {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading preferences {}", path_ref.display()))?;
        let prefs: Preferences = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing preferences {}", path_ref.display()))?;
        prefs
            .validate()
            .with_context(|| format!("validating preferences {}", path_ref.display()))?;
        Ok(prefs)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let path_ref = path.as_ref();
        self.validate()?;
        let contents = serde_yaml::to_string(self).context("serializing preferences")?;
        if let Some(parent) = path_ref.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        fs::write(path_ref, contents)
            .with_context(|| format!("writing preferences {}", path_ref.display()))
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let in_circle = |angle: f64| (0.0..360.0).contains(&angle);
        if !in_circle(self.declination.grid_to_magnetic) {
            bail!("declination.grid_to_magnetic must be in [0, 360)");
        }
        if !in_circle(self.declination.grid_to_true) {
            bail!("declination.grid_to_true must be in [0, 360)");
        }
        if !(self.geo.cut_threshold.is_finite() && self.geo.cut_threshold > 0.0) {
            bail!("geo.cut_threshold must be a positive number of meters");
        }
        if !(self.geo.max_range_m.is_finite() && self.geo.max_range_m > 0.0) {
            bail!("geo.max_range_m must be a positive number of meters");
        }
        if !self.ui.local_diff.is_finite() || self.ui.local_diff.abs() > 24.0 {
            bail!("ui.local_diff must be within 24 hours of zulu");
        }
        self.earth_model().context("geo")?;
        Ok(())
    }

    pub fn df_config(&self) -> DfConfig {
        DfConfig {
            threshold_m: self.geo.cut_threshold,
            denominator: self.geo.denominator,
        }
    }

    pub fn earth_model(&self) -> anyhow::Result<EarthModel> {
        Ok(EarthModel::named(&self.geo.ellipsoid)?
            .with_grid_precision(self.geo.grid_precision)?
            .with_max_range(self.geo.max_range_m))
    }

    fn local_offset(&self) -> Duration {
        Duration::seconds((self.ui.local_diff * 3600.0).round() as i64)
    }

    /// Interprets a wall-clock reading taken on `base` as UTC.
    pub fn to_zulu(&self, reading: NaiveDateTime, base: TimeBase) -> DateTime<Utc> {
        let reading = match base {
            TimeBase::Zulu => reading,
            TimeBase::Local => reading - self.local_offset(),
        };
        Utc.from_utc_datetime(&reading)
    }

    /// Formats a UTC time on the preferred display clock.
    pub fn display_time(&self, time: DateTime<Utc>) -> String {
        match self.ui.display_time {
            TimeBase::Zulu => time.format("%Y-%m-%d %H%MZ").to_string(),
            TimeBase::Local => format!("{}L", (time + self.local_offset()).format("%Y-%m-%d %H%M")),
        }
    }
}
