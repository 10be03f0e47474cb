//! Keyword-based template selection.

use super::catalog::{Catalog, GuidanceTemplate, SchoolLevel};
use crate::incident::IncidentAnalysis;

/// Text the keywords are matched against: incident type, what, why, how joined by spaces.
/// Missing fields contribute an empty string.
pub fn search_text(analysis: &IncidentAnalysis) -> String {
    let part = |f: &Option<String>| f.as_deref().unwrap_or("").to_string();
    format!(
        "{} {} {} {}",
        part(&analysis.incident_type),
        part(&analysis.what),
        part(&analysis.why),
        part(&analysis.how)
    )
}

/// First template in catalog order that is level-compatible, passes its incident-type gate,
/// and matches a keyword. Falls back to the catalog default; never fails.
pub fn select_template<'c>(
    catalog: &'c Catalog,
    analysis: &IncidentAnalysis,
    level: SchoolLevel,
) -> &'c GuidanceTemplate {
    let text = search_text(analysis);
    let incident_type = analysis.incident_type.as_deref().unwrap_or("");

    let chosen = catalog
        .templates()
        .iter()
        .filter(|t| level.admits(t.school_level))
        .filter(|t| t.incident_type_gate.map_or(true, |gate| incident_type.contains(gate)))
        .find(|t| t.matches(&text));

    match chosen {
        Some(t) => {
            tracing::debug!(target: "neis::guidance", template = t.id, level = %level, "template matched");
            t
        }
        None => {
            tracing::debug!(target: "neis::guidance", level = %level, "no keyword match, using fallback");
            catalog.fallback()
        }
    }
}

/// [`select_template`] against the built-in catalog.
pub fn select_guidance(analysis: &IncidentAnalysis, level: SchoolLevel) -> &'static GuidanceTemplate {
    select_template(Catalog::builtin(), analysis, level)
}
