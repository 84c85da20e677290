//! Document store - the single owner of the live CV
//!
//! Every mutation goes through [`CvStore::dispatch`], which runs the reducer
//! and schedules a debounced write. The store is an ordinary value handed to
//! whoever needs it; there is no global instance.

use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::Config;
use crate::document::{
    Certification, CvDocument, Education, EntryId, Experience, Language, Project, Reference,
    Skill,
};
use crate::hashing::document_hash;
use crate::ids::{IdGenerator, TimeRandomIds};
use crate::persistence::{self, ImportError, KeyValueStore, LoadOutcome};
use crate::reducer::{reduce, CvAction};
use crate::scheduler::Debouncer;
use crate::templates::{RenderedCv, TemplateError, TemplateRegistry};
use crate::validation::{completion_report, CompletionReport, ValidationReport, Validator};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Hash of the last document that reached storage.
type LastWritten = Arc<Mutex<Option<String>>>;

fn lock(last: &Mutex<Option<String>>) -> MutexGuard<'_, Option<String>> {
    last.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Writes `doc` unless storage already holds identical content.
fn persist(storage: &dyn KeyValueStore, key: &str, doc: &CvDocument, last: &Mutex<Option<String>>) -> bool {
    let hash = document_hash(doc).ok();
    if hash.is_some() && *lock(last) == hash {
        debug!("CV {} unchanged since last write, skipping save", doc.id);
        return true;
    }
    let saved = persistence::save_document(storage, key, doc);
    if saved {
        *lock(last) = hash;
    }
    saved
}

pub struct CvStore<S: KeyValueStore + 'static> {
    doc: CvDocument,
    storage: Arc<S>,
    key: String,
    ids: Box<dyn IdGenerator>,
    clock: Box<dyn Clock>,
    saver: Debouncer,
    last_written: LastWritten,
    load_outcome: LoadOutcome,
    validator: Validator,
}

impl<S: KeyValueStore + 'static> CvStore<S> {
    /// Loads the document from `storage` using the configured key and debounce.
    pub fn open(config: &Config, storage: S) -> Self {
        Self::open_with(
            storage,
            &config.storage_key,
            config.save_debounce,
            Box::new(TimeRandomIds::new()),
            Box::new(SystemClock),
        )
    }

    pub fn open_with(
        storage: S,
        key: &str,
        debounce: Duration,
        ids: Box<dyn IdGenerator>,
        clock: Box<dyn Clock>,
    ) -> Self {
        let storage = Arc::new(storage);
        let (doc, load_outcome) = persistence::load_document(storage.as_ref(), key, ids.as_ref(), clock.now());
        let last_written = match load_outcome {
            LoadOutcome::Restored => document_hash(&doc).ok(),
            LoadOutcome::Fresh | LoadOutcome::Recovered => None,
        };

        Self {
            doc,
            storage,
            key: key.to_string(),
            ids,
            clock,
            saver: Debouncer::new(debounce),
            last_written: Arc::new(Mutex::new(last_written)),
            load_outcome,
            validator: Validator::new(),
        }
    }

    pub fn document(&self) -> &CvDocument {
        &self.doc
    }

    pub fn load_outcome(&self) -> LoadOutcome {
        self.load_outcome
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_key(&self) -> &str {
        &self.key
    }

    /// The identifier source used for new entries.
    pub fn ids(&self) -> &dyn IdGenerator {
        self.ids.as_ref()
    }

    /// Whether a debounced write is still waiting.
    pub fn has_pending_save(&self) -> bool {
        self.saver.is_pending()
    }

    /// Applies `action` and schedules a save. Outside a tokio runtime the save
    /// happens immediately instead.
    pub fn dispatch(&mut self, action: CvAction) -> &CvDocument {
        let name = action.name();
        let next = reduce(&self.doc, action, self.clock.now());
        if next == self.doc {
            debug!("{name} left CV {} unchanged", self.doc.id);
            return &self.doc;
        }
        debug!("{name} applied to CV {}", next.id);
        self.doc = next;
        self.schedule_save();
        &self.doc
    }

    fn schedule_save(&mut self) {
        let storage = Arc::clone(&self.storage);
        let key = self.key.clone();
        let doc = self.doc.clone();
        let last = Arc::clone(&self.last_written);
        // Storage backends block, so the write leaves the async workers.
        let scheduled = self.saver.schedule(async move {
            let write = tokio::task::spawn_blocking(move || {
                persist(storage.as_ref(), &key, &doc, &last);
            });
            if let Err(e) = write.await {
                warn!("Debounced CV save did not complete: {e}");
            }
        });
        if scheduled.is_none() {
            warn!("No async runtime for a debounced save, writing CV {} now", self.doc.id);
            persist(self.storage.as_ref(), &self.key, &self.doc, &self.last_written);
        }
    }

    /// Cancels the pending timer and writes the current document now.
    pub fn flush(&mut self) -> bool {
        self.saver.cancel();
        persist(self.storage.as_ref(), &self.key, &self.doc, &self.last_written)
    }

    /// Replaces the document with a fresh one under a new identifier.
    pub fn reset(&mut self) -> &CvDocument {
        let id = self.ids.next_id();
        self.dispatch(CvAction::ResetDocument { id })
    }

    pub fn add_experience(&mut self, company: &str, position: &str) -> EntryId {
        let id = self.ids.next_id();
        self.dispatch(CvAction::AddExperience(Experience {
            id: id.clone(),
            company: company.to_string(),
            position: position.to_string(),
            ..Default::default()
        }));
        id
    }

    pub fn add_education(&mut self, institution: &str, degree: &str) -> EntryId {
        let id = self.ids.next_id();
        self.dispatch(CvAction::AddEducation(Education {
            id: id.clone(),
            institution: institution.to_string(),
            degree: degree.to_string(),
            ..Default::default()
        }));
        id
    }

    pub fn add_skill(&mut self, name: &str) -> EntryId {
        let id = self.ids.next_id();
        self.dispatch(CvAction::AddSkill(Skill {
            id: id.clone(),
            name: name.to_string(),
            ..Default::default()
        }));
        id
    }

    pub fn add_project(&mut self, name: &str) -> EntryId {
        let id = self.ids.next_id();
        self.dispatch(CvAction::AddProject(Project {
            id: id.clone(),
            name: name.to_string(),
            ..Default::default()
        }));
        id
    }

    pub fn add_language(&mut self, name: &str) -> EntryId {
        let id = self.ids.next_id();
        self.dispatch(CvAction::AddLanguage(Language {
            id: id.clone(),
            name: name.to_string(),
            ..Default::default()
        }));
        id
    }

    pub fn add_certification(&mut self, name: &str, issuer: &str) -> EntryId {
        let id = self.ids.next_id();
        self.dispatch(CvAction::AddCertification(Certification {
            id: id.clone(),
            name: name.to_string(),
            issuer: issuer.to_string(),
            ..Default::default()
        }));
        id
    }

    pub fn add_reference(&mut self, name: &str) -> EntryId {
        let id = self.ids.next_id();
        self.dispatch(CvAction::AddReference(Reference {
            id: id.clone(),
            name: name.to_string(),
            ..Default::default()
        }));
        id
    }

    /// Loads an uploaded export in place of the current document, generating
    /// any identifiers it lacks. On error the current document is kept.
    pub fn import_json(&mut self, text: &str) -> Result<&CvDocument, ImportError> {
        let doc = persistence::import_json(text, self.ids.as_ref(), self.clock.now())?;
        Ok(self.dispatch(CvAction::LoadDocument(Box::new(doc))))
    }

    pub fn export_json(&self) -> Result<String, serde_json::Error> {
        persistence::export_json(&self.doc)
    }

    pub fn validate(&self) -> ValidationReport {
        self.validator.validate(&self.doc)
    }

    pub fn completion(&self) -> CompletionReport {
        completion_report(&self.doc)
    }

    /// Renders with the document's selected template.
    pub fn render(&self, registry: &TemplateRegistry) -> Result<RenderedCv, TemplateError> {
        registry.render(&self.doc, &self.doc.template)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::SequentialIds;
    use crate::persistence::MemoryStore;
    use crate::reducer::PersonalPatch;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicI64, Ordering};

    /// Advances one second per reading.
    struct TickingClock(AtomicI64);

    impl Clock for TickingClock {
        fn now(&self) -> DateTime<Utc> {
            let secs = self.0.fetch_add(1, Ordering::SeqCst);
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + chrono::Duration::seconds(secs)
        }
    }

    fn store_over(storage: MemoryStore) -> CvStore<MemoryStore> {
        CvStore::open_with(
            storage,
            "cv",
            Duration::from_millis(1000),
            Box::new(SequentialIds::new("id")),
            Box::new(TickingClock(AtomicI64::new(0))),
        )
    }

    fn named(first: &str) -> CvAction {
        CvAction::UpdatePersonal(PersonalPatch {
            first_name: Some(first.to_string()),
            ..Default::default()
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_of_dispatches_writes_once() {
        let mut store = store_over(MemoryStore::new());
        assert_eq!(store.load_outcome(), LoadOutcome::Fresh);

        store.dispatch(named("A"));
        tokio::time::sleep(Duration::from_millis(500)).await;
        store.dispatch(named("B"));
        tokio::time::sleep(Duration::from_millis(900)).await;
        assert!(store.storage().get("cv").unwrap().is_none());

        tokio::time::sleep(Duration::from_millis(200)).await;
        let saved = persistence::parse_document(&store.storage().get("cv").unwrap().unwrap()).unwrap();
        assert_eq!(saved.personal.first_name, "B");
        assert!(!store.has_pending_save());
    }

    #[tokio::test(start_paused = true)]
    async fn test_noop_dispatch_schedules_nothing() {
        let mut store = store_over(MemoryStore::new());
        store.dispatch(CvAction::DeleteSkill { id: "missing".into() });
        assert!(!store.has_pending_save());
    }

    #[tokio::test]
    async fn test_flush_writes_immediately_and_dedupes() {
        let mut store = store_over(MemoryStore::new());
        store.add_skill("Rust");
        assert!(store.has_pending_save());
        assert!(store.flush());
        assert!(!store.has_pending_save());
        let first = store.storage().get("cv").unwrap();

        store.storage().remove("cv").unwrap();
        // Same content as the last write, so nothing is rewritten.
        assert!(store.flush());
        assert!(store.storage().get("cv").unwrap().is_none());
        assert!(first.is_some());
    }

    #[test]
    fn test_dispatch_outside_runtime_saves_immediately() {
        let mut store = store_over(MemoryStore::new());
        store.add_skill("Rust");
        assert!(!store.has_pending_save());

        let saved = persistence::parse_document(&store.storage().get("cv").unwrap().unwrap()).unwrap();
        assert_eq!(saved.skills[0].name, "Rust");
        assert_eq!(&saved, store.document());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_debounced_save_lands_on_multi_thread_runtime() {
        let mut store = CvStore::open_with(
            MemoryStore::new(),
            "cv",
            Duration::from_millis(20),
            Box::new(SequentialIds::new("id")),
            Box::new(TickingClock(AtomicI64::new(0))),
        );
        store.add_language("German");
        tokio::time::sleep(Duration::from_millis(300)).await;

        let saved = persistence::parse_document(&store.storage().get("cv").unwrap().unwrap()).unwrap();
        assert_eq!(saved.languages[0].name, "German");
        assert!(!store.has_pending_save());
    }

    #[tokio::test]
    async fn test_failed_save_keeps_editing() {
        let mut store = store_over(MemoryStore::with_quota(16));
        store.add_experience("Acme", "Engineer");
        assert!(!store.flush());
        assert_eq!(store.document().experience.len(), 1);
    }

    #[tokio::test]
    async fn test_reopen_restores_document() {
        let mut store = store_over(MemoryStore::new());
        store.add_education("MIT", "BSc");
        store.flush();
        let raw = store.storage().get("cv").unwrap().unwrap();

        let backing = MemoryStore::new();
        backing.set("cv", &raw).unwrap();
        let reopened = store_over(backing);
        assert_eq!(reopened.load_outcome(), LoadOutcome::Restored);
        assert_eq!(reopened.document(), store.document());
    }

    #[tokio::test]
    async fn test_reset_assigns_new_id() {
        let mut store = store_over(MemoryStore::new());
        let before = store.document().id.clone();
        store.add_skill("Go");
        store.reset();
        assert_ne!(store.document().id, before);
        assert!(store.document().skills.is_empty());
    }

    #[tokio::test]
    async fn test_bad_import_keeps_document() {
        let mut store = store_over(MemoryStore::new());
        store.add_skill("Go");
        assert!(store.import_json("{\"hello\": 1}").is_err());
        assert_eq!(store.document().skills.len(), 1);

        let exported = store.export_json().unwrap();
        store.reset();
        store.import_json(&exported).unwrap();
        assert_eq!(store.document().skills[0].name, "Go");
    }

    #[tokio::test]
    async fn test_import_fills_missing_ids() {
        let mut store = store_over(MemoryStore::new());
        store
            .import_json(r#"{"personal":{"firstName":"Ada"},"experience":[{"company":"Acme"}],"skills":[{"name":"Go"}]}"#)
            .unwrap();

        let doc = store.document();
        assert_eq!(doc.personal.first_name, "Ada");
        assert!(!doc.id.is_empty());
        assert!(!doc.experience[0].id.is_empty());
        assert!(!doc.skills[0].id.is_empty());
        assert_ne!(doc.experience[0].id, doc.skills[0].id);
    }
}
