use crate::workflow::runner::{RunResult, Runner};
use lobcore::df::DfState;
use lobcore::prelude::Geodesy;
use lobcore::registry::{Record, RecordId};
use lobcore::telemetry::TriangulationTally;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalView {
    pub id: RecordId,
    pub time: Option<String>,
    pub frequency: Option<f64>,
    pub sites: Vec<String>,
    pub state: Option<DfState>,
    pub status: String,
    /// Grid reference of the fix, when there is one.
    pub fix: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversationView {
    pub id: RecordId,
    pub sender: RecordId,
    /// Member signal ids; removed signals are left out.
    pub members: Vec<RecordId>,
    pub callsigns: Vec<Option<String>>,
}

/// What the bridge serves on `GET /signals`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DisplayModel {
    pub signals: Vec<SignalView>,
    pub conversations: Vec<ConversationView>,
    pub tally: TriangulationTally,
}

impl DisplayModel {
    pub fn from_run(runner: &Runner, result: &RunResult) -> Self {
        let prefs = runner.preferences();
        let mut model = DisplayModel {
            tally: result.tally,
            ..Default::default()
        };

        for outcome in &result.outcomes {
            let Ok(soi) = result.log.signal(outcome.id) else {
                continue;
            };
            let fix = soi
                .df()
                .and_then(|df| df.fix())
                .and_then(|fix| runner.model().to_grid(fix).ok());
            model.signals.push(SignalView {
                id: outcome.id,
                time: soi.time().map(|time| prefs.display_time(time)),
                frequency: soi.frequency(),
                sites: soi.priority().map(str::to_string).collect(),
                state: outcome.state,
                status: outcome.status.clone(),
                fix,
            });
        }

        for (id, record) in result.log.iter() {
            let Record::Conversation(conversation) = record else {
                continue;
            };
            let live: Vec<_> = conversation
                .members
                .iter()
                .filter(|member| result.log.signal(member.signal).is_ok())
                .collect();
            model.conversations.push(ConversationView {
                id,
                sender: conversation.sender,
                members: live.iter().map(|member| member.signal).collect(),
                callsigns: live.iter().map(|member| member.callsign.clone()).collect(),
            });
        }
        model
    }
}
