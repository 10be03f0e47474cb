//! Persistent incident record and its encryption lifecycle.
//!
//! `rawData` and `teacherNote` are sealed before every save ([`IncidentRecord::seal_sensitive_fields`])
//! and opened into a separate [`DecryptedIncident`] view on read. The stored record itself is never
//! turned back into plaintext.

use super::analysis::AiAnalysis;
use crate::config::EncryptionKey;
use crate::crypto::{self, DECRYPTION_FAILED};
use crate::error::ConfigError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Which sensitive fields were assigned since the record was loaded or last saved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct DirtyFields {
    raw_data: bool,
    teacher_note: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentRecord {
    pub id: String,
    pub student_id: String,
    #[serde(default)]
    pub involved_student_ids: BTreeSet<String>,
    pub incident_date: DateTime<Utc>,
    pub incident_type: String,
    #[serde(default)]
    raw_data: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_analysis: Option<AiAnalysis>,
    #[serde(default)]
    teacher_note: String,
    pub teacher_id: String,
    #[serde(default = "default_true")]
    pub is_encrypted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    dirty: DirtyFields,
}

impl IncidentRecord {
    /// New encrypted record owned by `teacher_id`. Both sensitive fields start dirty.
    pub fn new(
        teacher_id: impl Into<String>,
        student_id: impl Into<String>,
        incident_type: impl Into<String>,
        raw_data: impl Into<String>,
        teacher_note: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            student_id: student_id.into(),
            involved_student_ids: BTreeSet::new(),
            incident_date: now,
            incident_type: incident_type.into(),
            raw_data: raw_data.into(),
            ai_analysis: None,
            teacher_note: teacher_note.into(),
            teacher_id: teacher_id.into(),
            is_encrypted: true,
            created_at: now,
            updated_at: now,
            dirty: DirtyFields {
                raw_data: true,
                teacher_note: true,
            },
        }
    }

    pub fn with_analysis(mut self, analysis: impl Into<AiAnalysis>) -> Self {
        self.ai_analysis = Some(analysis.into());
        self
    }

    pub fn with_involved<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.involved_student_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_incident_date(mut self, date: DateTime<Utc>) -> Self {
        self.incident_date = date;
        self
    }

    /// Stored value of `rawData`: ciphertext once saved, unless the record is not encrypted.
    pub fn raw_data(&self) -> &str {
        &self.raw_data
    }

    /// Stored value of `teacherNote` (the NEIS record).
    pub fn teacher_note(&self) -> &str {
        &self.teacher_note
    }

    pub fn set_raw_data(&mut self, value: impl Into<String>) {
        self.raw_data = value.into();
        self.dirty.raw_data = true;
    }

    pub fn set_teacher_note(&mut self, value: impl Into<String>) {
        self.teacher_note = value.into();
        self.dirty.teacher_note = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.raw_data || self.dirty.teacher_note
    }

    /// Pre-save hook.
    ///
    /// Unencrypted records are left as they are. Otherwise the key is required even when neither
    /// sensitive field changed, and each modified, non-empty field that is not already
    /// ciphertext is encrypted in place. Clears the dirty flags on success.
    pub fn seal_sensitive_fields(&mut self, key: Option<&EncryptionKey>) -> Result<(), ConfigError> {
        if !self.is_encrypted {
            self.dirty = DirtyFields::default();
            return Ok(());
        }
        let key = key.ok_or(ConfigError::MissingKey)?;

        if self.dirty.raw_data && !self.raw_data.is_empty() {
            self.raw_data = crypto::seal_field(&self.raw_data, key);
        }
        if self.dirty.teacher_note && !self.teacher_note.is_empty() {
            self.teacher_note = crypto::seal_field(&self.teacher_note, key);
        }
        self.dirty = DirtyFields::default();
        Ok(())
    }

    /// Post-load transform into a plaintext view.
    ///
    /// Unencrypted records are copied through. For encrypted ones a missing key is an error;
    /// a field that fails to decrypt is logged and replaced by [`DECRYPTION_FAILED`] without
    /// affecting the other field.
    pub fn decrypt_fields(&self, key: Option<&EncryptionKey>) -> Result<DecryptedIncident, ConfigError> {
        if !self.is_encrypted {
            return Ok(DecryptedIncident::from_parts(self, self.raw_data.clone(), self.teacher_note.clone()));
        }
        let key = key.ok_or(ConfigError::MissingKey)?;

        let raw_data = self.open(&self.raw_data, "rawData", key);
        let teacher_note = self.open(&self.teacher_note, "teacherNote", key);
        Ok(DecryptedIncident::from_parts(self, raw_data, teacher_note))
    }

    fn open(&self, value: &str, field: &'static str, key: &EncryptionKey) -> String {
        if value.is_empty() {
            return String::new();
        }
        match crypto::open_field(value, key) {
            Ok(plain) => plain,
            Err(e) => {
                tracing::error!(
                    target: "neis::vault",
                    incident_id = %self.id,
                    field,
                    error = %e,
                    "failed to decrypt incident field"
                );
                DECRYPTION_FAILED.to_string()
            }
        }
    }
}

/// Plaintext view of an [`IncidentRecord`]. Never written back to storage.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecryptedIncident {
    pub id: String,
    pub student_id: String,
    pub involved_student_ids: BTreeSet<String>,
    pub incident_date: DateTime<Utc>,
    pub incident_type: String,
    pub raw_data: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_analysis: Option<AiAnalysis>,
    pub teacher_note: String,
    pub teacher_id: String,
    pub is_encrypted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DecryptedIncident {
    fn from_parts(record: &IncidentRecord, raw_data: String, teacher_note: String) -> Self {
        Self {
            id: record.id.clone(),
            student_id: record.student_id.clone(),
            involved_student_ids: record.involved_student_ids.clone(),
            incident_date: record.incident_date,
            incident_type: record.incident_type.clone(),
            raw_data,
            ai_analysis: record.ai_analysis.clone(),
            teacher_note,
            teacher_id: record.teacher_id.clone(),
            is_encrypted: record.is_encrypted,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }

    pub fn has_failed_field(&self) -> bool {
        self.raw_data == DECRYPTION_FAILED || self.teacher_note == DECRYPTION_FAILED
    }
}
