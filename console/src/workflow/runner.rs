use crate::config::Preferences;
use crate::workflow::sheet::Sheet;
use anyhow::Context;
use lobcore::df::DfState;
use lobcore::geodesy::EarthModel;
use lobcore::prelude::DfConfig;
use lobcore::registry::{RecordId, SignalLog};
use lobcore::telemetry::{MetricsRecorder, TriangulationTally};
use log::{info, warn};
use serde::Serialize;
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// One line of the batch summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalOutcome {
    pub id: RecordId,
    pub state: Option<DfState>,
    pub status: String,
}

pub struct RunResult {
    pub log: SignalLog,
    pub outcomes: Vec<SignalOutcome>,
    /// Counts for this run only; [`Runner::tally`] keeps the running total.
    pub tally: TriangulationTally,
}

#[derive(Serialize)]
struct Report<'a> {
    tally: TriangulationTally,
    outcomes: &'a [SignalOutcome],
    records: &'a SignalLog,
}

#[derive(Clone)]
pub struct Runner {
    prefs: Preferences,
    config: DfConfig,
    model: EarthModel,
    metrics: Arc<MetricsRecorder>,
}

impl Runner {
    pub fn new(prefs: Preferences) -> anyhow::Result<Self> {
        let model = prefs.earth_model().context("building earth model")?;
        Ok(Self {
            config: prefs.df_config(),
            prefs,
            model,
            metrics: Arc::new(MetricsRecorder::new()),
        })
    }

    pub fn preferences(&self) -> &Preferences {
        &self.prefs
    }

    pub fn model(&self) -> &EarthModel {
        &self.model
    }

    /// Outcome counts across every run this runner has made.
    pub fn tally(&self) -> TriangulationTally {
        self.metrics.snapshot()
    }

    /// Triangulates every signal in `log`.
    ///
    /// A signal whose DF cannot be computed is counted and reported but does
    /// not stop the batch.
    pub fn execute(&self, log: &mut SignalLog) -> Vec<SignalOutcome> {
        let mut outcomes = Vec::new();
        for (id, soi) in log.signals_mut() {
            let outcome = match soi.triangulate(&self.config, &self.model) {
                Ok(df) => {
                    self.metrics.record_outcome(df.state());
                    SignalOutcome {
                        id,
                        state: Some(df.state()),
                        status: df.status().to_string(),
                    }
                }
                Err(err) => {
                    warn!("signal {} not triangulated: {}", id, err);
                    self.metrics.record_error();
                    SignalOutcome {
                        id,
                        state: None,
                        status: format!("error: {}", err),
                    }
                }
            };
            outcomes.push(outcome);
        }
        outcomes
    }

    pub fn ingest(&self, sheet: &Sheet) -> anyhow::Result<RunResult> {
        let mut log = sheet
            .to_log(&self.prefs, &self.model)
            .context("loading observation sheet")?;
        let outcomes = self.execute(&mut log);
        info!(
            "triangulated {} signal(s), {} fix(es)",
            outcomes.len(),
            outcomes
                .iter()
                .filter(|o| o.state == Some(DfState::Fix))
                .count()
        );
        let mut tally = TriangulationTally::default();
        for outcome in &outcomes {
            tally.record(outcome.state);
        }
        Ok(RunResult {
            log,
            outcomes,
            tally,
        })
    }

    /// Human-readable line for one outcome, with the signal time on the
    /// preferred clock.
    pub fn describe(&self, log: &SignalLog, outcome: &SignalOutcome) -> String {
        let time = log
            .signal(outcome.id)
            .ok()
            .and_then(|soi| soi.time())
            .map(|time| self.prefs.display_time(time))
            .unwrap_or_else(|| "-".to_string());
        format!("#{} {} {}", outcome.id, time, outcome.status)
    }
}

impl RunResult {
    pub fn write_report<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let path_ref = path.as_ref();
        let report = Report {
            tally: self.tally,
            outcomes: &self.outcomes,
            records: &self.log,
        };
        let contents = serde_json::to_string_pretty(&report).context("serializing report")?;
        if let Some(parent) = path_ref.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        fs::write(path_ref, contents)
            .with_context(|| format!("writing report {}", path_ref.display()))
    }
}
