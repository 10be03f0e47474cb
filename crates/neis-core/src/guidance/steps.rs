//! Guidance step content shown alongside a selected template.
//!
//! The step text is declarative data kept in `data/guidance_steps.json` and keyed by
//! template id. Matching and record synthesis never look inside it.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const STEPS_JSON: &str = include_str!("../../data/guidance_steps.json");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuidanceStep {
    pub step: u32,
    pub title: String,
    pub icon: String,
    pub content: StepContent,
}

/// Body of a step: a flat paragraph, a tree of sections, or anything else kept verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StepContent {
    Text(String),
    Structured(StructuredContent),
    Opaque(serde_json::Value),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuredContent {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub highlights: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sections: Vec<ContentSection>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentSection {
    pub title: String,
    pub icon: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<SectionItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SectionItem {
    Plain(String),
    Labeled { label: String, text: String },
}

static STEP_LIBRARY: Lazy<HashMap<String, Vec<GuidanceStep>>> =
    Lazy::new(|| match serde_json::from_str(STEPS_JSON) {
        Ok(map) => map,
        Err(e) => {
            tracing::error!(target: "neis::guidance", error = %e, "guidance step data failed to parse");
            HashMap::new()
        }
    });

/// Steps for the template with the given id; empty when the id has no step data.
pub fn steps_for(template_id: &str) -> &'static [GuidanceStep] {
    STEP_LIBRARY
        .get(template_id)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}
