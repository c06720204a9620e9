use crate::df::DfState;
use serde::Serialize;
use std::sync::Mutex;

/// Running count of triangulation outcomes, shareable across threads.
pub struct MetricsRecorder {
    inner: Mutex<TriangulationTally>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TriangulationTally {
    pub invalid: usize,
    pub none: usize,
    pub single_lob: usize,
    pub cut: usize,
    pub ambiguous_cut: usize,
    pub fix: usize,
    pub errors: usize,
}

impl TriangulationTally {
    /// Counts one outcome; `None` stands for a signal that failed to triangulate.
    pub fn record(&mut self, state: Option<DfState>) {
        match state {
            Some(DfState::Invalid) => self.invalid += 1,
            Some(DfState::None) => self.none += 1,
            Some(DfState::SingleLob) => self.single_lob += 1,
            Some(DfState::Cut) => self.cut += 1,
            Some(DfState::AmbiguousCut) => self.ambiguous_cut += 1,
            Some(DfState::Fix) => self.fix += 1,
            None => self.errors += 1,
        }
    }

    pub fn processed(&self) -> usize {
        self.invalid + self.none + self.single_lob + self.cut + self.ambiguous_cut + self.fix
    }
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(TriangulationTally::default()),
        }
    }

    pub fn record_outcome(&self, state: DfState) {
        if let Ok(mut tally) = self.inner.lock() {
            tally.record(Some(state));
        }
    }

    pub fn record_error(&self) {
        if let Ok(mut tally) = self.inner.lock() {
            tally.record(None);
        }
    }

    pub fn snapshot(&self) -> TriangulationTally {
        self.inner
            .lock()
            .map(|tally| *tally)
            .unwrap_or_default()
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}
