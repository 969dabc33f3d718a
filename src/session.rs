use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::chart::TabularDataset;
use crate::chat::Talk;
use crate::document::ExtractedDocument;
use crate::table::SanitizedTable;
use crate::text::StructuredSection;

/// One analysis request and the model's answer.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub query: String,
    pub answer: String,
}

/// Everything derived from the current upload, plus the chat history.
#[derive(Debug)]
pub struct Session {
    id: Uuid,
    last_active: DateTime<Utc>,
    pub document: Option<ExtractedDocument>,
    pub sections: Vec<StructuredSection>,
    pub tables: Vec<SanitizedTable>,
    pub dataset: Option<TabularDataset>,
    pub analyses: Vec<Analysis>,
    pub suggestions: Option<String>,
    pub conversation: Vec<Talk>,
}

impl Session {
    fn new(now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            last_active: now,
            document: None,
            sections: Vec::new(),
            tables: Vec::new(),
            dataset: None,
            analyses: Vec::new(),
            suggestions: None,
            conversation: Vec::new(),
        }
    }

    /// Replaces the current upload and discards everything derived from the
    /// previous one.
    pub fn load_document(&mut self, document: ExtractedDocument) {
        self.clear();
        self.dataset = document.dataset.clone();
        self.document = Some(document);
    }

    /// Replaces only the charting dataset.
    pub fn load_dataset(&mut self, dataset: TabularDataset) {
        self.suggestions = None;
        self.dataset = Some(dataset);
    }

    pub fn clear(&mut self) {
        self.document = None;
        self.sections.clear();
        self.tables.clear();
        self.dataset = None;
        self.analyses.clear();
        self.suggestions = None;
        self.conversation.clear();
    }
}

/// Owns all live sessions. Sessions idle for longer than the TTL are dropped
/// by `expire_idle`.
#[derive(Debug)]
pub struct SessionStore {
    sessions: HashMap<Uuid, Session>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl_secs: u64) -> Self {
        let secs = i64::try_from(ttl_secs).unwrap_or(i64::MAX).min(i64::MAX / 1000);
        Self {
            sessions: HashMap::new(),
            ttl: Duration::seconds(secs),
        }
    }

    pub fn create(&mut self) -> Uuid {
        self.create_at(Utc::now())
    }

    fn create_at(&mut self, now: DateTime<Utc>) -> Uuid {
        let session = Session::new(now);
        let id = session.id;
        self.sessions.insert(id, session);
        log::debug!("session {} created", id);
        id
    }

    pub fn get(&self, id: &Uuid) -> Option<&Session> {
        self.sessions.get(id)
    }

    /// Returns the session and marks it active.
    pub fn get_mut(&mut self, id: &Uuid) -> Option<&mut Session> {
        self.touch_at(id, Utc::now())
    }

    fn touch_at(&mut self, id: &Uuid, now: DateTime<Utc>) -> Option<&mut Session> {
        let session = self.sessions.get_mut(id)?;
        session.last_active = now;
        Some(session)
    }

    /// Tears a session down. Returns whether it existed.
    pub fn clear(&mut self, id: &Uuid) -> bool {
        let removed = self.sessions.remove(id).is_some();
        if removed {
            log::debug!("session {} cleared", id);
        }
        removed
    }

    pub fn expire_idle(&mut self) -> usize {
        self.expire_at(Utc::now())
    }

    fn expire_at(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.sessions.len();
        let ttl = self.ttl;
        self.sessions.retain(|id, session| {
            let keep = now - session.last_active <= ttl;
            if !keep {
                log::info!("session {} expired", id);
            }
            keep
        });
        before - self.sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::dataset::sample;
    use crate::chat::Role;
    use crate::document::FileKind;

    fn document(with_dataset: bool) -> ExtractedDocument {
        ExtractedDocument {
            name: "q3.csv".into(),
            kind: FileKind::Csv,
            text: "CSV File Contents".into(),
            tables: Vec::new(),
            dataset: with_dataset.then(|| sample(&[("region", &["N", "S"])])),
        }
    }

    #[test]
    fn test_sessions_are_isolated() {
        let mut store = SessionStore::new(60);
        let a = store.create();
        let b = store.create();
        assert_ne!(a, b);

        store.get_mut(&a).unwrap().load_document(document(true));
        assert!(store.get(&a).unwrap().dataset.is_some());
        assert!(store.get(&b).unwrap().document.is_none());
        assert_eq!(store.sessions.len(), 2);
    }

    #[test]
    fn test_new_upload_discards_derived_state() {
        let mut store = SessionStore::new(60);
        let id = store.create();
        let session = store.get_mut(&id).unwrap();
        session.load_document(document(true));
        session.suggestions = Some("sum by region".into());
        session.conversation.push(Talk::new(Role::User, "hi".into()));
        session.analyses.push(Analysis { query: "Summarize".into(), answer: "...".into() });

        session.load_document(document(false));
        assert!(session.suggestions.is_none());
        assert!(session.conversation.is_empty());
        assert!(session.analyses.is_empty());
        assert!(session.dataset.is_none());
        assert_eq!(session.document.as_ref().map(|d| d.name.as_str()), Some("q3.csv"));
    }

    #[test]
    fn test_clear_and_expire() {
        let mut store = SessionStore::new(30);
        let start = Utc::now();
        let idle = store.create_at(start);
        let busy = store.create_at(start);

        store.touch_at(&busy, start + Duration::seconds(25));
        assert_eq!(store.expire_at(start + Duration::seconds(40)), 1);
        assert!(store.get(&idle).is_none());
        assert!(store.get(&busy).is_some());

        assert!(store.clear(&busy));
        assert!(!store.clear(&busy));
        assert!(store.sessions.is_empty());
    }
}
