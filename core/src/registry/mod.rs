//! Central log of signals and the conversations grouping them.

pub mod conversation;

pub use conversation::{Conversation, Member};

use crate::soi::{Site, Soi};
use crate::telemetry::LogManager;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

const LOGGER: LogManager = LogManager::new("lobcore::registry");

/// Key of a record in a [`SignalLog`]. Ids are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub u64);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Record {
    Signal(Soi),
    Conversation(Conversation),
}

impl Record {
    pub fn as_signal(&self) -> Option<&Soi> {
        match self {
            Record::Signal(soi) => Some(soi),
            Record::Conversation(_) => None,
        }
    }

    pub fn as_conversation(&self) -> Option<&Conversation> {
        match self {
            Record::Conversation(conversation) => Some(conversation),
            Record::Signal(_) => None,
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("no record with id {0}")]
    UnknownRecord(RecordId),
    #[error("record {0} is not a signal")]
    NotASignal(RecordId),
    #[error("record {0} is not a conversation")]
    NotAConversation(RecordId),
    #[error("a conversation needs at least two signals, got {0}")]
    EmptyConversation(usize),
    #[error("signal {signal} carries no callsign {callsign}")]
    UnknownCallsign { signal: RecordId, callsign: String },
    #[error("sender {0} is not among the merged signals")]
    SenderNotMember(RecordId),
}

pub type RegistryResult<T> = Result<T, RegistryError>;

/// Owns every signal and conversation under a monotonically assigned id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalLog {
    records: BTreeMap<RecordId, Record>,
    next_id: u64,
}

impl SignalLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_signal(&mut self, soi: Soi) -> RecordId {
        self.insert(Record::Signal(soi))
    }

    fn insert(&mut self, record: Record) -> RecordId {
        let id = RecordId(self.next_id);
        self.next_id += 1;
        self.records.insert(id, record);
        id
    }

    /// Groups signals into a conversation.
    ///
    /// `members` pairs each record with the callsign it used, if known. A
    /// conversation among the members contributes its own signals and their
    /// callsigns. Repeated signals collapse into one member. The sender goes
    /// first and the rest follow in signal time order.
    pub fn merge(
        &mut self,
        sender: RecordId,
        members: Vec<(RecordId, Option<String>)>,
    ) -> RegistryResult<RecordId> {
        let mut flattened: Vec<Member> = Vec::with_capacity(members.len());
        for (id, callsign) in members {
            match self.records.get(&id) {
                Some(Record::Signal(_)) => Self::join(&mut flattened, Member::new(id, callsign)),
                Some(Record::Conversation(conversation)) => {
                    if let Some(label) = callsign {
                        return Err(RegistryError::UnknownCallsign {
                            signal: id,
                            callsign: label,
                        });
                    }
                    for member in &conversation.members {
                        Self::join(&mut flattened, member.clone());
                    }
                }
                None => return Err(RegistryError::UnknownRecord(id)),
            }
        }
        if flattened.len() < 2 {
            return Err(RegistryError::EmptyConversation(flattened.len()));
        }
        if !flattened.iter().any(|member| member.signal == sender) {
            return Err(RegistryError::SenderNotMember(sender));
        }

        let mut timed = Vec::with_capacity(flattened.len());
        for member in flattened {
            let soi = self.signal(member.signal)?;
            if let Some(label) = &member.callsign {
                if !soi.unique_callsigns().contains(&label.as_str()) {
                    return Err(RegistryError::UnknownCallsign {
                        signal: member.signal,
                        callsign: label.clone(),
                    });
                }
            }
            timed.push((member.signal != sender, soi.time().is_none(), soi.time(), member));
        }
        timed.sort_by_key(|(not_sender, untimed, time, _)| (*not_sender, *untimed, *time));

        let id = self.insert(Record::Conversation(Conversation {
            sender,
            members: timed.into_iter().map(|(_, _, _, member)| member).collect(),
        }));
        LOGGER.record(&format!("conversation {} merged from sender {}", id, sender));
        Ok(id)
    }

    /// Adds `member` unless its signal is already present, in which case a
    /// missing callsign is filled in.
    fn join(members: &mut Vec<Member>, member: Member) {
        match members.iter_mut().find(|known| known.signal == member.signal) {
            Some(known) => {
                if known.callsign.is_none() {
                    known.callsign = member.callsign;
                }
            }
            None => members.push(member),
        }
    }

    pub fn get(&self, id: RecordId) -> Option<&Record> {
        self.records.get(&id)
    }

    pub fn signal(&self, id: RecordId) -> RegistryResult<&Soi> {
        match self.records.get(&id) {
            Some(Record::Signal(soi)) => Ok(soi),
            Some(Record::Conversation(_)) => Err(RegistryError::NotASignal(id)),
            None => Err(RegistryError::UnknownRecord(id)),
        }
    }

    pub fn signal_mut(&mut self, id: RecordId) -> RegistryResult<&mut Soi> {
        match self.records.get_mut(&id) {
            Some(Record::Signal(soi)) => Ok(soi),
            Some(Record::Conversation(_)) => Err(RegistryError::NotASignal(id)),
            None => Err(RegistryError::UnknownRecord(id)),
        }
    }

    pub fn conversation(&self, id: RecordId) -> RegistryResult<&Conversation> {
        match self.records.get(&id) {
            Some(Record::Conversation(conversation)) => Ok(conversation),
            Some(Record::Signal(_)) => Err(RegistryError::NotAConversation(id)),
            None => Err(RegistryError::UnknownRecord(id)),
        }
    }

    /// Stores an edited signal in place of `id`.
    ///
    /// Returns the conversations that include the signal. Any of their member
    /// callsigns the edited signal no longer carries are cleared.
    pub fn replace_signal(&mut self, id: RecordId, soi: Soi) -> RegistryResult<Vec<RecordId>> {
        *self.signal_mut(id)? = soi;
        let labels: Vec<String> = self
            .signal(id)?
            .unique_callsigns()
            .into_iter()
            .map(str::to_string)
            .collect();

        let mut affected = Vec::new();
        for (conversation_id, record) in self.records.iter_mut() {
            let Record::Conversation(conversation) = record else {
                continue;
            };
            if !conversation.involves(id) {
                continue;
            }
            affected.push(*conversation_id);
            for member in conversation.members.iter_mut().filter(|m| m.signal == id) {
                if member.callsign.as_ref().is_some_and(|cs| !labels.contains(cs)) {
                    LOGGER.caution(&format!(
                        "conversation {} lost callsign {:?} of signal {}",
                        conversation_id, member.callsign, id
                    ));
                    member.callsign = None;
                }
            }
        }
        if !affected.is_empty() {
            LOGGER.record(&format!("signal {} is part of conversations {:?}", id, affected));
        }
        Ok(affected)
    }

    /// Deletes a record. Conversations naming a removed signal keep its id and
    /// [`resolve`](Self::resolve) reports it as absent.
    pub fn remove(&mut self, id: RecordId) -> RegistryResult<Record> {
        self.records
            .remove(&id)
            .ok_or(RegistryError::UnknownRecord(id))
    }

    /// Looks up each member of a conversation; removed signals come back `None`.
    pub fn resolve(&self, id: RecordId) -> RegistryResult<Vec<(RecordId, Option<&Soi>)>> {
        let conversation = self.conversation(id)?;
        Ok(conversation
            .signal_ids()
            .map(|signal| (signal, self.signal(signal).ok()))
            .collect())
    }

    /// Sites of every surviving member, tagged by their signal, in member order.
    pub fn conversation_sites(&self, id: RecordId) -> RegistryResult<Vec<(RecordId, &Site)>> {
        Ok(self
            .resolve(id)?
            .into_iter()
            .filter_map(|(signal, soi)| soi.map(|soi| (signal, soi)))
            .flat_map(|(signal, soi)| soi.sites().iter().map(move |site| (signal, site)))
            .collect())
    }

    pub fn iter(&self) -> impl Iterator<Item = (RecordId, &Record)> {
        self.records.iter().map(|(id, record)| (*id, record))
    }

    pub fn signals(&self) -> impl Iterator<Item = (RecordId, &Soi)> {
        self.iter()
            .filter_map(|(id, record)| record.as_signal().map(|soi| (id, soi)))
    }

    pub fn signals_mut(&mut self) -> impl Iterator<Item = (RecordId, &mut Soi)> {
        self.records.iter_mut().filter_map(|(id, record)| match record {
            Record::Signal(soi) => Some((*id, soi)),
            Record::Conversation(_) => None,
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn signal(callsigns: &[&str], sites: &[&str]) -> Soi {
        let time = Utc.with_ymd_and_hms(2013, 12, 1, 14, 30, 0).unwrap();
        let mut soi = Soi::new();
        for (idx, label) in callsigns.iter().enumerate() {
            soi.add_callsign(*label, idx * 2, idx * 2 + 1);
        }
        for name in sites {
            soi.add_site(*name, time, "0,0", 0.0).unwrap();
        }
        soi
    }

    fn log_with_two() -> (SignalLog, RecordId, RecordId) {
        let mut log = SignalLog::new();
        let first = log.insert_signal(signal(&["A", "B"], &["V", "B"]));
        let second = log.insert_signal(signal(&["C"], &["C"]));
        (log, first, second)
    }

    #[test]
    fn ids_are_monotonic_and_never_reused() {
        let (mut log, first, second) = log_with_two();
        assert!(second > first);
        log.remove(second).unwrap();
        let third = log.insert_signal(Soi::new());
        assert!(third > second);
    }

    #[test]
    fn merge_puts_sender_first() {
        let (mut log, first, second) = log_with_two();
        let id = log
            .merge(second, vec![(first, Some("A".into())), (second, None)])
            .unwrap();
        let conversation = log.conversation(id).unwrap();
        assert_eq!(conversation.sender, second);
        assert_eq!(conversation.signal_ids().collect::<Vec<_>>(), vec![second, first]);
        assert!(matches!(log.get(id), Some(Record::Conversation(_))));
    }

    #[test]
    fn merge_rejects_bad_members() {
        let (mut log, first, second) = log_with_two();
        assert_eq!(
            log.merge(first, vec![(first, None)]),
            Err(RegistryError::EmptyConversation(1))
        );
        assert_eq!(
            log.merge(RecordId(99), vec![(first, None), (second, None)]),
            Err(RegistryError::SenderNotMember(RecordId(99)))
        );
        assert_eq!(
            log.merge(first, vec![(first, None), (RecordId(42), None)]),
            Err(RegistryError::UnknownRecord(RecordId(42)))
        );
        assert_eq!(
            log.merge(first, vec![(first, Some("Z".into())), (second, None)]),
            Err(RegistryError::UnknownCallsign {
                signal: first,
                callsign: "Z".into()
            })
        );
        assert_eq!(
            log.merge(first, vec![(first, None), (first, None)]),
            Err(RegistryError::EmptyConversation(1))
        );
    }

    fn timed(hour: u32) -> Soi {
        let mut soi = signal(&[], &["V"]);
        soi.set_time(Utc.with_ymd_and_hms(2013, 12, 1, hour, 0, 0).unwrap());
        soi
    }

    #[test]
    fn merge_orders_members_by_time_after_sender() {
        let mut log = SignalLog::new();
        let a = log.insert_signal(timed(10));
        let b = log.insert_signal(timed(14));
        let c = log.insert_signal(timed(12));
        let convo = log.merge(a, vec![(a, None), (b, None), (c, None)]).unwrap();
        assert_eq!(
            log.conversation(convo).unwrap().signal_ids().collect::<Vec<_>>(),
            vec![a, c, b]
        );

        let late_sender = log.merge(b, vec![(c, None), (a, None), (b, None)]).unwrap();
        assert_eq!(
            log.conversation(late_sender).unwrap().signal_ids().collect::<Vec<_>>(),
            vec![b, a, c]
        );
    }

    #[test]
    fn merge_flattens_conversations_into_signals() {
        let mut log = SignalLog::new();
        let a = log.insert_signal(timed(10));
        let b = log.insert_signal(timed(14));
        let first = log.merge(a, vec![(a, None), (b, None)]).unwrap();
        let d = log.insert_signal(timed(12));

        let second = log.merge(d, vec![(first, None), (d, None), (a, None)]).unwrap();
        let conversation = log.conversation(second).unwrap();
        assert_eq!(conversation.signal_ids().collect::<Vec<_>>(), vec![d, a, b]);
        assert_eq!(
            log.conversation_sites(second).unwrap().len(),
            3,
            "each signal contributes its sites once"
        );
        assert_eq!(
            log.merge(a, vec![(first, Some("A".into())), (d, None)]),
            Err(RegistryError::UnknownCallsign {
                signal: first,
                callsign: "A".into()
            })
        );
    }

    #[test]
    fn merge_keeps_callsigns_from_flattened_conversation() {
        let (mut log, first, second) = log_with_two();
        let convo = log
            .merge(first, vec![(first, Some("B".into())), (second, None)])
            .unwrap();
        let third = log.insert_signal(signal(&["Q"], &["D"]));
        let merged = log
            .merge(third, vec![(convo, None), (second, Some("C".into())), (third, None)])
            .unwrap();
        let conversation = log.conversation(merged).unwrap();
        assert_eq!(conversation.member(first).unwrap().callsign.as_deref(), Some("B"));
        assert_eq!(conversation.member(second).unwrap().callsign.as_deref(), Some("C"));
        assert_eq!(conversation.member(third).unwrap().callsign, None);
    }

    #[test]
    fn replace_signal_reports_and_clears_callsigns() {
        let (mut log, first, second) = log_with_two();
        let convo = log
            .merge(first, vec![(first, Some("B".into())), (second, Some("C".into()))])
            .unwrap();
        let unrelated = log.insert_signal(Soi::new());

        let affected = log.replace_signal(first, signal(&["A"], &["V"])).unwrap();
        assert_eq!(affected, vec![convo]);
        let conversation = log.conversation(convo).unwrap();
        assert_eq!(conversation.member(first).unwrap().callsign, None);
        assert_eq!(conversation.member(second).unwrap().callsign.as_deref(), Some("C"));

        assert!(log.replace_signal(unrelated, Soi::new()).unwrap().is_empty());
        assert_eq!(
            log.replace_signal(convo, Soi::new()),
            Err(RegistryError::NotASignal(convo))
        );
    }

    #[test]
    fn removed_signal_resolves_to_absent() {
        let (mut log, first, second) = log_with_two();
        let convo = log.merge(first, vec![(first, None), (second, None)]).unwrap();
        log.remove(second).unwrap();

        let resolved = log.resolve(convo).unwrap();
        assert_eq!(resolved.len(), 2);
        assert!(resolved[0].1.is_some());
        assert_eq!(resolved[1], (second, None));

        let names: Vec<&str> = log
            .conversation_sites(convo)
            .unwrap()
            .into_iter()
            .map(|(_, site)| site.name())
            .collect();
        assert_eq!(names, vec!["V", "B"]);
    }

    #[test]
    fn conversation_sites_follow_member_order() {
        let (mut log, first, second) = log_with_two();
        let convo = log.merge(second, vec![(first, None), (second, None)]).unwrap();
        let tagged: Vec<(RecordId, &str)> = log
            .conversation_sites(convo)
            .unwrap()
            .into_iter()
            .map(|(id, site)| (id, site.name()))
            .collect();
        assert_eq!(tagged, vec![(second, "C"), (first, "V"), (first, "B")]);
    }

    #[test]
    fn signals_skip_conversations() {
        let (mut log, first, second) = log_with_two();
        log.merge(first, vec![(first, None), (second, None)]).unwrap();
        assert_eq!(log.len(), 3);
        assert_eq!(log.signals().count(), 2);
        for (_, soi) in log.signals_mut() {
            soi.set_note("seen");
        }
        assert_eq!(log.signal(first).unwrap().note(), "seen");
    }

    #[test]
    fn log_round_trips_through_json() {
        let (mut log, first, second) = log_with_two();
        log.merge(first, vec![(first, None), (second, None)]).unwrap();
        let json = serde_json::to_string(&log).unwrap();
        assert!(json.contains("\"type\":\"conversation\""));
        let restored: SignalLog = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, log);
    }
}
