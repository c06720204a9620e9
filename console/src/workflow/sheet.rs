use crate::config::{Preferences, TimeBase};
use anyhow::{bail, Context};
use chrono::{NaiveDate, NaiveTime};
use lobcore::geodesy::{azimuth, NorthReference};
use lobcore::prelude::Geodesy;
use lobcore::registry::{RecordId, SignalLog};
use lobcore::soi::{is_valid_name, Callsign, Soi};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteEntry {
    pub name: String,
    /// Four-digit `HHMM` reading on the sheet's clock.
    pub time: String,
    pub grid: String,
    pub bearing: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallsignEntry {
    pub label: String,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalEntry {
    pub date: NaiveDate,
    pub time: String,
    pub frequency: f64,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub callsigns: Vec<CallsignEntry>,
    pub sites: Vec<SiteEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeMember {
    /// Index into the sheet's signals.
    pub signal: usize,
    #[serde(default)]
    pub callsign: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeEntry {
    pub sender: usize,
    pub members: Vec<MergeMember>,
}

/// A batch of observations as an operator would log them.
///
/// `reference` and `clock` override the preferences for sheets produced by
/// tools that already work in true north and zulu.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Sheet {
    pub reference: Option<NorthReference>,
    pub clock: Option<TimeBase>,
    pub signals: Vec<SignalEntry>,
    pub merges: Vec<MergeEntry>,
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

impl Sheet {
    /// Reads a sheet as JSON when the extension says so, YAML otherwise.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading sheet {}", path_ref.display()))?;
        let sheet = if is_json(path_ref) {
            serde_json::from_str(&contents)
                .with_context(|| format!("parsing sheet {}", path_ref.display()))?
        } else {
            serde_yaml::from_str(&contents)
                .with_context(|| format!("parsing sheet {}", path_ref.display()))?
        };
        Ok(sheet)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let path_ref = path.as_ref();
        let contents = if is_json(path_ref) {
            serde_json::to_string_pretty(self).context("serializing sheet")?
        } else {
            serde_yaml::to_string(self).context("serializing sheet")?
        };
        fs::write(path_ref, contents)
            .with_context(|| format!("writing sheet {}", path_ref.display()))
    }

    /// Validates every entry and loads the signals and merges into a fresh log.
    ///
    /// Bearings leave here referenced to true north and times in UTC.
    pub fn to_log<G: Geodesy + ?Sized>(
        &self,
        prefs: &Preferences,
        geodesy: &G,
    ) -> anyhow::Result<SignalLog> {
        let reference = self.reference.unwrap_or(prefs.ui.azimuth);
        let clock = self.clock.unwrap_or(prefs.ui.display_time);

        let mut log = SignalLog::new();
        let mut ids = Vec::with_capacity(self.signals.len());
        for (idx, entry) in self.signals.iter().enumerate() {
            let soi = build_signal(entry, reference, clock, prefs, geodesy)
                .with_context(|| format!("signal {}", idx + 1))?;
            ids.push(log.insert_signal(soi));
        }

        let id_at = |idx: usize| -> anyhow::Result<RecordId> {
            ids.get(idx).copied().with_context(|| {
                format!("merge names signal {} but the sheet has {}", idx, ids.len())
            })
        };
        for merge in &self.merges {
            let members = merge
                .members
                .iter()
                .map(|member| Ok((id_at(member.signal)?, member.callsign.clone())))
                .collect::<anyhow::Result<Vec<_>>>()?;
            log.merge(id_at(merge.sender)?, members)
                .context("merging signals into a conversation")?;
        }
        Ok(log)
    }
}

fn parse_clock(reading: &str) -> anyhow::Result<NaiveTime> {
    if reading.len() != 4 {
        bail!("time {:?} is not HHMM", reading);
    }
    NaiveTime::parse_from_str(reading, "%H%M")
        .with_context(|| format!("time {:?} is not HHMM", reading))
}

fn check_site<G: Geodesy + ?Sized>(site: &SiteEntry, geodesy: &G) -> Result<NaiveTime, String> {
    if !is_valid_name(&site.name) {
        return Err("name must be 1 to 5 letters or digits".into());
    }
    if !(0.0..360.0).contains(&site.bearing) {
        return Err("bearing must be in [0, 360)".into());
    }
    if geodesy.to_geographic(&site.grid).is_err() {
        return Err(format!("invalid location {:?}", site.grid));
    }
    parse_clock(&site.time).map_err(|err| err.to_string())
}

/// Builds one signal, skipping sites that fail validation.
pub fn build_signal<G: Geodesy + ?Sized>(
    entry: &SignalEntry,
    reference: NorthReference,
    clock: TimeBase,
    prefs: &Preferences,
    geodesy: &G,
) -> anyhow::Result<Soi> {
    let mut soi = Soi::new();
    for site in &entry.sites {
        let time = match check_site(site, geodesy) {
            Ok(time) => time,
            Err(reason) => {
                warn!("skipping site {:?}: {}", site.name, reason);
                continue;
            }
        };
        let bearing = azimuth::convert(
            reference,
            NorthReference::True,
            site.bearing,
            &prefs.declination,
        );
        let observed = prefs.to_zulu(entry.date.and_time(time), clock);
        match soi.add_site(site.name.as_str(), observed, site.grid.as_str(), bearing) {
            Ok(()) => debug!(
                "site {} {} {:.1} {} -> {:.1} {}",
                site.name,
                site.grid,
                site.bearing,
                reference.abbreviation(),
                bearing,
                NorthReference::True.abbreviation()
            ),
            Err(err) => warn!("{}, skipping", err),
        }
    }
    if soi.sites().is_empty() {
        bail!("there must be at least one valid site");
    }

    let time = parse_clock(&entry.time)?;
    soi.set_time(prefs.to_zulu(entry.date.and_time(time), clock));
    soi.set_frequency(entry.frequency);
    soi.set_summary(entry.summary.as_str());
    soi.set_note(entry.note.as_str());
    for tag in &entry.callsigns {
        let callsign = Callsign::new(tag.label.as_str(), tag.start, tag.end);
        match callsign.excerpt(&entry.summary) {
            Some(text) => {
                debug!("callsign {} tags {:?}", tag.label, text);
                soi.add_callsign(callsign.label, callsign.start, callsign.end);
            }
            None => warn!(
                "callsign {} span {}..{} lies outside the summary, skipping",
                tag.label, tag.start, tag.end
            ),
        }
    }
    Ok(soi)
}
