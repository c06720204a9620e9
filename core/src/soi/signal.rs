use super::callsign::Callsign;
use super::site::Site;
use crate::df::Df;
use crate::prelude::{DfConfig, Geodesy, SoiError, SoiResult};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// Signal of interest: the sites that heard one emitter plus what was heard.
///
/// Sites keep their insertion order, which is both their display priority and
/// the order cuts are enumerated in.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Soi {
    sites: Vec<Site>,
    time: Option<DateTime<Utc>>,
    frequency: Option<f64>,
    summary: String,
    note: String,
    callsigns: Vec<Callsign>,
    df: Option<Df>,
}

impl Soi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a site; names must be unique within the signal.
    pub fn add_site(
        &mut self,
        name: impl Into<String>,
        time: DateTime<Utc>,
        location: impl Into<String>,
        bearing: f64,
    ) -> SoiResult<()> {
        let name = name.into();
        if self.has_site(&name) {
            return Err(SoiError::DuplicateSite(name));
        }
        self.sites.push(Site::new(name, time, location, bearing));
        Ok(())
    }

    pub fn has_site(&self, name: &str) -> bool {
        self.sites.iter().any(|site| site.name() == name)
    }

    pub fn site(&self, name: &str) -> SoiResult<&Site> {
        self.sites
            .iter()
            .find(|site| site.name() == name)
            .ok_or_else(|| SoiError::UnknownSite(name.to_string()))
    }

    /// Sites in priority order.
    pub fn sites(&self) -> &[Site] {
        &self.sites
    }

    pub fn priority(&self) -> impl Iterator<Item = &str> {
        self.sites.iter().map(Site::name)
    }

    pub fn set_time(&mut self, time: DateTime<Utc>) {
        self.time = Some(time);
    }

    pub fn set_frequency(&mut self, frequency: f64) {
        self.frequency = Some(frequency);
    }

    pub fn set_summary(&mut self, summary: impl Into<String>) {
        self.summary = summary.into();
    }

    pub fn set_note(&mut self, note: impl Into<String>) {
        self.note = note.into();
    }

    pub fn time(&self) -> Option<DateTime<Utc>> {
        self.time
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.time.map(|time| time.date_naive())
    }

    pub fn time_up(&self) -> Option<NaiveTime> {
        self.time.map(|time| time.time())
    }

    pub fn frequency(&self) -> Option<f64> {
        self.frequency
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn note(&self) -> &str {
        &self.note
    }

    pub fn add_callsign(&mut self, label: impl Into<String>, start: usize, end: usize) {
        self.callsigns.push(Callsign::new(label, start, end));
    }

    pub fn callsigns(&self) -> &[Callsign] {
        &self.callsigns
    }

    /// Every tagged label, repeats included, in tag order.
    pub fn callsign_labels(&self) -> Vec<&str> {
        self.callsigns.iter().map(|cs| cs.label.as_str()).collect()
    }

    /// Tagged labels without repeats, in first-seen order.
    pub fn unique_callsigns(&self) -> Vec<&str> {
        let mut unique: Vec<&str> = Vec::new();
        for callsign in &self.callsigns {
            if !unique.contains(&callsign.label.as_str()) {
                unique.push(&callsign.label);
            }
        }
        unique
    }

    /// Rebuilds the DF from the current sites.
    ///
    /// On error the previous DF is left as it was.
    pub fn triangulate<G: Geodesy + ?Sized>(
        &mut self,
        config: &DfConfig,
        geodesy: &G,
    ) -> SoiResult<&Df> {
        let df = Df::find(&self.sites, config, geodesy)?;
        Ok(self.df.insert(df))
    }

    pub fn df(&self) -> Option<&Df> {
        self.df.as_ref()
    }
}
