//! Structured 5W1H analysis attached to an incident.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Literal an upstream extractor writes when it could not determine a field.
pub const UNKNOWN_MARKER: &str = "미확인";

/// Who/when/where/what/how/why plus the incident type. Every field is optional and
/// any of them may hold [`UNKNOWN_MARKER`]. Extra keys from the extractor are kept.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IncidentAnalysis {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub who: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when: Option<String>,
    #[serde(rename = "where", default, skip_serializing_if = "Option::is_none")]
    pub place: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub what: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub how: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub why: Option<String>,
    #[serde(rename = "incidentType", default, skip_serializing_if = "Option::is_none")]
    pub incident_type: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl IncidentAnalysis {
    /// `Some(value)` only when the field is present, non-blank, and not the unknown marker.
    pub fn known(field: &Option<String>) -> Option<&str> {
        field
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty() && *v != UNKNOWN_MARKER)
    }

    pub fn with_incident_type(mut self, incident_type: impl Into<String>) -> Self {
        self.incident_type = Some(incident_type.into());
        self
    }
}

/// Analysis payload as stored: the typed 5W1H shape when it parses, otherwise the raw JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AiAnalysis {
    Structured(IncidentAnalysis),
    Opaque(Value),
}

impl AiAnalysis {
    pub fn structured(&self) -> Option<&IncidentAnalysis> {
        match self {
            Self::Structured(a) => Some(a),
            Self::Opaque(_) => None,
        }
    }
}

impl From<IncidentAnalysis> for AiAnalysis {
    fn from(a: IncidentAnalysis) -> Self {
        Self::Structured(a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_wire_names_and_keeps_extras() {
        let json = r#"{"who":"김철수","where":"운동장","incidentType":"또래 갈등","confidence":0.8}"#;
        let a: IncidentAnalysis = serde_json::from_str(json).unwrap();
        assert_eq!(a.place.as_deref(), Some("운동장"));
        assert_eq!(a.incident_type.as_deref(), Some("또래 갈등"));
        assert!(a.extra.contains_key("confidence"));

        let back = serde_json::to_value(&a).unwrap();
        assert_eq!(back["where"], "운동장");
        assert_eq!(back["incidentType"], "또래 갈등");
        assert!(back.get("how").is_none());
    }

    #[test]
    fn known_filters_blank_and_marker() {
        assert_eq!(IncidentAnalysis::known(&None), None);
        assert_eq!(IncidentAnalysis::known(&Some("  ".into())), None);
        assert_eq!(IncidentAnalysis::known(&Some(UNKNOWN_MARKER.into())), None);
        assert_eq!(IncidentAnalysis::known(&Some(" 교실 ".into())), Some("교실"));
    }

    #[test]
    fn non_object_analysis_is_opaque() {
        let a: AiAnalysis = serde_json::from_str(r#""free text""#).unwrap();
        assert!(a.structured().is_none());
        let b: AiAnalysis = serde_json::from_str(r#"{"what":"다툼"}"#).unwrap();
        assert_eq!(b.structured().and_then(|a| a.what.as_deref()), Some("다툼"));
    }
}
