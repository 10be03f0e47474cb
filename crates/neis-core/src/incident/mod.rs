//! Incident records: analysis payload, encrypted persistence, history queries, and patterns.

pub mod analysis;
pub mod patterns;
pub mod record;
pub mod store;

pub use analysis::{AiAnalysis, IncidentAnalysis, UNKNOWN_MARKER};
pub use patterns::{analyze_patterns, PatternInsight, PatternReport, Severity, Tally};
pub use record::{DecryptedIncident, IncidentRecord};
pub use store::{IncidentStore, IncidentSubmission, IncidentUpdate, SubmitOutcome};
