//! neis-core: incident documentation core for school guidance records.
//!
//! Field encryption at rest for incident notes, the guidance template catalog and selector,
//! NEIS record synthesis, and the sled-backed incident and roster stores.

mod config;
mod error;
mod shared;
pub mod crypto;
pub mod guidance;
pub mod incident;
pub mod roster;

pub use config::{CoreConfig, EncryptionKey, ENV_ENCRYPTION_KEY};
pub use error::{CipherError, ConfigError, StoreError, StoreResult};
pub use shared::Requester;

// Cipher + ciphertext shape guard
pub use crypto::{decrypt, encrypt, generate_key, looks_encrypted, DECRYPTION_FAILED};

// Template catalog, selection, record synthesis
pub use guidance::{
    guide, search_text, select_guidance, select_template, synthesize, Catalog, GuidanceOutcome,
    GuidanceStep, GuidanceTemplate, RecordFields, SchoolLevel, StepContent,
};

// Incidents
pub use incident::{
    analyze_patterns, AiAnalysis, DecryptedIncident, IncidentAnalysis, IncidentRecord, IncidentStore,
    IncidentSubmission, IncidentUpdate, PatternReport, SubmitOutcome, UNKNOWN_MARKER,
};

// Roster + attendance
pub use roster::{
    Attendance, AttendanceMark, AttendanceStatus, BulkAddSummary, NewStudent, PromoteSummary, Promotion,
    RosterStore, Student,
};
