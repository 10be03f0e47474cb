//! Sled-backed incident store with a hot cache of sealed records.
//!
//! Every write goes through [`IncidentRecord::seal_sensitive_fields`], so the tree and the
//! cache only ever hold ciphertext for encrypted records. Plaintext exists only in the
//! [`DecryptedIncident`] values handed back to callers.

use super::analysis::IncidentAnalysis;
use super::patterns::{analyze_patterns, PatternReport};
use super::record::{DecryptedIncident, IncidentRecord};
use crate::config::{CoreConfig, EncryptionKey, KeyState};
use crate::error::{ConfigError, StoreError, StoreResult};
use crate::guidance::{self, GuidanceTemplate, SchoolLevel};
use crate::shared::Requester;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

const INCIDENTS_TREE: &str = "incidents";
const DEFAULT_STUDENT_ID: &str = "unknown";
const DEFAULT_INCIDENT_TYPE: &str = "기타";

/// Raw incident input from a teacher, before analysis results are attached.
#[derive(Debug, Clone, Default)]
pub struct IncidentSubmission {
    pub teacher_id: String,
    pub student_id: Option<String>,
    pub involved_student_ids: Vec<String>,
    pub raw_text: String,
    pub incident_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitOutcome {
    pub incident_id: String,
    pub template: &'static GuidanceTemplate,
    pub neis_record: String,
    pub analysis: IncidentAnalysis,
}

/// Edit request. `None` leaves the field untouched; `content` replaces the NEIS record.
#[derive(Debug, Clone, Default)]
pub struct IncidentUpdate {
    pub content: Option<String>,
    pub incident_date: Option<DateTime<Utc>>,
    pub incident_type: Option<String>,
}

pub struct IncidentStore {
    db: sled::Db,
    incidents: sled::Tree,
    /// Hot cache: incident id -> sealed record. Checked before sled, bounded by `cache_capacity`.
    cache: Arc<DashMap<String, IncidentRecord>>,
    cache_capacity: usize,
    key: KeyState,
    history_limit: usize,
    pattern_window: usize,
}

impl IncidentStore {
    /// Opens the store at `path`, reading the key from `ENCRYPTION_KEY`.
    pub fn open_path<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        Self::open_with_state(path, KeyState::from_env())
    }

    /// Opens the store with an explicit key. Without a key, encrypted records can be neither
    /// saved nor decrypted.
    pub fn open_with_key<P: AsRef<Path>>(path: P, key: Option<EncryptionKey>) -> StoreResult<Self> {
        Self::open_with_state(path, key.into())
    }

    fn open_with_state<P: AsRef<Path>>(path: P, key: KeyState) -> StoreResult<Self> {
        let defaults = CoreConfig::default();
        let db = sled::open(path)?;
        let incidents = db.open_tree(INCIDENTS_TREE)?;
        Ok(Self {
            db,
            incidents,
            cache: Arc::new(DashMap::new()),
            cache_capacity: defaults.cache_capacity,
            key,
            history_limit: defaults.history_limit,
            pattern_window: defaults.pattern_window,
        })
    }

    pub fn from_config(config: &CoreConfig) -> StoreResult<Self> {
        let mut store = Self::open_path(config.incidents_path())?;
        store.history_limit = config.history_limit;
        store.pattern_window = config.pattern_window;
        store.cache_capacity = config.cache_capacity;
        Ok(store)
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    pub fn has_key(&self) -> bool {
        self.key.is_loaded()
    }

    /// Key for a record. Encrypted records need a usable key; the error says whether it was
    /// missing or rejected at load time.
    fn key_for(&self, is_encrypted: bool) -> Result<Option<&EncryptionKey>, ConfigError> {
        if is_encrypted {
            self.key.require().map(Some)
        } else {
            Ok(None)
        }
    }

    /// Inserts into the hot cache, evicting an arbitrary entry when full.
    fn remember(&self, record: &IncidentRecord) {
        if self.cache_capacity == 0 {
            return;
        }
        if self.cache.len() >= self.cache_capacity && !self.cache.contains_key(&record.id) {
            let victim = self.cache.iter().next().map(|e| e.key().clone());
            if let Some(victim) = victim {
                self.cache.remove(&victim);
            }
        }
        self.cache.insert(record.id.clone(), record.clone());
    }

    /// Seals the record's sensitive fields and writes it. Fails with a config error (and
    /// writes nothing) when the record is encrypted and no usable key is loaded.
    pub fn save(&self, record: &mut IncidentRecord) -> StoreResult<()> {
        let key = self.key_for(record.is_encrypted)?;
        record.seal_sensitive_fields(key)?;
        record.updated_at = Utc::now();

        let bytes = serde_json::to_vec(&*record)?;
        let prev = self.incidents.insert(record.id.as_bytes(), bytes.as_slice())?;
        self.remember(record);

        tracing::info!(
            target: "neis::incident",
            incident_id = %record.id,
            teacher_id = %record.teacher_id,
            bytes = bytes.len(),
            action = if prev.is_some() { "UPDATE" } else { "INSERT" },
            "incident saved"
        );
        Ok(())
    }

    /// Full submission pipeline: select a template for the teacher's level, synthesize the
    /// NEIS record, attach steps and record to the analysis, and save the sealed incident.
    pub fn submit(
        &self,
        submission: IncidentSubmission,
        mut analysis: IncidentAnalysis,
        level: SchoolLevel,
    ) -> StoreResult<SubmitOutcome> {
        let outcome = guidance::guide(&analysis, level);

        analysis.extra.insert(
            "guidanceSteps".to_string(),
            serde_json::to_value(outcome.template.steps())?,
        );
        analysis.extra.insert(
            "neisRecord".to_string(),
            serde_json::Value::String(outcome.neis_record.clone()),
        );

        let incident_type = IncidentAnalysis::known(&analysis.incident_type)
            .unwrap_or(DEFAULT_INCIDENT_TYPE)
            .to_string();
        let student_id = submission
            .student_id
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_STUDENT_ID.to_string());

        let mut record = IncidentRecord::new(
            submission.teacher_id,
            student_id,
            incident_type,
            submission.raw_text,
            outcome.neis_record.clone(),
        )
        .with_involved(submission.involved_student_ids)
        .with_analysis(analysis.clone());
        if let Some(date) = submission.incident_date {
            record = record.with_incident_date(date);
        }

        self.save(&mut record)?;
        tracing::info!(
            target: "neis::guidance",
            incident_id = %record.id,
            template = outcome.template.id,
            level = %level,
            "incident submitted"
        );

        Ok(SubmitOutcome {
            incident_id: record.id,
            template: outcome.template,
            neis_record: outcome.neis_record,
            analysis,
        })
    }

    fn load(&self, id: &str) -> StoreResult<Option<IncidentRecord>> {
        if let Some(r) = self.cache.get(id) {
            return Ok(Some(r.clone()));
        }
        match self.incidents.get(id.as_bytes())? {
            Some(bytes) => {
                let record: IncidentRecord = serde_json::from_slice(&bytes)?;
                self.remember(&record);
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// Stored (sealed) record, if it exists and the requester may see it.
    pub fn get(&self, id: &str, requester: &Requester) -> StoreResult<Option<IncidentRecord>> {
        Ok(self.load(id)?.filter(|r| requester.owns(&r.teacher_id)))
    }

    pub fn get_decrypted(&self, id: &str, requester: &Requester) -> StoreResult<Option<DecryptedIncident>> {
        match self.get(id, requester)? {
            Some(r) => Ok(Some(self.decrypt(&r)?)),
            None => Ok(None),
        }
    }

    fn scan<F>(&self, keep: F, limit: usize) -> StoreResult<Vec<IncidentRecord>>
    where
        F: Fn(&IncidentRecord) -> bool,
    {
        let mut out = Vec::new();
        for item in self.incidents.iter() {
            let (k, v) = item?;
            match serde_json::from_slice::<IncidentRecord>(&v) {
                Ok(r) if keep(&r) => out.push(r),
                Ok(_) => {}
                Err(e) => tracing::warn!(
                    target: "neis::incident",
                    key = %String::from_utf8_lossy(&k),
                    error = %e,
                    "skipping unreadable incident"
                ),
            }
        }
        out.sort_by(|a, b| b.incident_date.cmp(&a.incident_date));
        out.truncate(limit);
        Ok(out)
    }

    /// Teacher's incidents, newest first, capped at the history limit.
    pub fn list_for_teacher(&self, teacher_id: &str) -> StoreResult<Vec<IncidentRecord>> {
        self.scan(|r| r.teacher_id == teacher_id, self.history_limit)
    }

    /// One student's incidents recorded by this teacher, newest first.
    pub fn list_for_student(&self, teacher_id: &str, student_id: &str) -> StoreResult<Vec<IncidentRecord>> {
        self.scan(
            |r| r.teacher_id == teacher_id && r.student_id == student_id,
            self.history_limit,
        )
    }

    pub fn list_decrypted_for_teacher(&self, teacher_id: &str) -> StoreResult<Vec<DecryptedIncident>> {
        self.decrypt_all(self.list_for_teacher(teacher_id)?)
    }

    pub fn list_decrypted_for_student(
        &self,
        teacher_id: &str,
        student_id: &str,
    ) -> StoreResult<Vec<DecryptedIncident>> {
        self.decrypt_all(self.list_for_student(teacher_id, student_id)?)
    }

    fn decrypt(&self, record: &IncidentRecord) -> Result<DecryptedIncident, ConfigError> {
        record.decrypt_fields(self.key_for(record.is_encrypted)?)
    }

    fn decrypt_all(&self, records: Vec<IncidentRecord>) -> StoreResult<Vec<DecryptedIncident>> {
        records
            .iter()
            .map(|r| self.decrypt(r).map_err(StoreError::from))
            .collect()
    }

    /// Applies an edit and re-saves. A new `content` goes back through the encryption gate.
    pub fn update(
        &self,
        id: &str,
        requester: &Requester,
        update: IncidentUpdate,
    ) -> StoreResult<DecryptedIncident> {
        let mut record = self
            .get(id, requester)?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        if let Some(content) = update.content {
            record.set_teacher_note(content);
        }
        if let Some(date) = update.incident_date {
            record.incident_date = date;
        }
        if let Some(incident_type) = update.incident_type {
            record.incident_type = incident_type;
        }

        self.save(&mut record)?;
        Ok(self.decrypt(&record)?)
    }

    /// Hard delete. Returns `false` when nothing the requester owns matched.
    pub fn delete(&self, id: &str, requester: &Requester) -> StoreResult<bool> {
        if self.get(id, requester)?.is_none() {
            return Ok(false);
        }
        let removed = self.incidents.remove(id.as_bytes())?.is_some();
        self.cache.remove(id);
        tracing::info!(
            target: "neis::incident",
            incident_id = id,
            teacher_id = %requester.teacher_id,
            action = "DELETE",
            "incident deleted"
        );
        Ok(removed)
    }

    /// Pattern report over the student's latest incidents, or `None` with no history.
    pub fn student_patterns(&self, teacher_id: &str, student_id: &str) -> StoreResult<Option<PatternReport>> {
        let recent = self.scan(
            |r| r.teacher_id == teacher_id && r.student_id == student_id,
            self.pattern_window,
        )?;
        if recent.is_empty() {
            return Ok(None);
        }
        Ok(Some(analyze_patterns(&recent)))
    }

    pub fn flush(&self) -> StoreResult<()> {
        self.db.flush()?;
        Ok(())
    }
}
