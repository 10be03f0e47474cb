//! Guidance templates: catalog, keyword selection, and NEIS record synthesis.

pub mod catalog;
pub mod record;
pub mod select;
pub mod steps;

pub use catalog::{Catalog, GuidanceTemplate, RecordGenerator, SchoolLevel};
pub use record::{synthesize, RecordFields};
pub use select::{search_text, select_guidance, select_template};
pub use steps::{steps_for, ContentSection, GuidanceStep, SectionItem, StepContent, StructuredContent};

use crate::incident::IncidentAnalysis;
use serde::Serialize;

/// Selected template plus the record text generated from it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GuidanceOutcome {
    pub template: &'static GuidanceTemplate,
    pub neis_record: String,
}

/// Select from the built-in catalog and synthesize the record in one step.
pub fn guide(analysis: &IncidentAnalysis, level: SchoolLevel) -> GuidanceOutcome {
    let template = select_guidance(analysis, level);
    GuidanceOutcome {
        template,
        neis_record: synthesize(template, analysis),
    }
}
