use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A student on a teacher's roster. `student_number` (the school's 학번) is unique per teacher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    pub name: String,
    #[serde(rename = "studentId")]
    pub student_number: String,
    /// Attendance mileage; one point per PRESENT day.
    #[serde(default)]
    pub mileage: u32,
    pub teacher_id: String,
    pub created_at: DateTime<Utc>,
}

/// Registration input; both fields are trimmed before use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStudent {
    pub name: String,
    #[serde(rename = "studentId")]
    pub student_number: String,
}

impl NewStudent {
    pub fn new(name: impl Into<String>, student_number: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            student_number: student_number.into(),
        }
    }

    /// Trimmed `(name, number)`, or `None` when either is blank.
    pub(crate) fn normalized(&self) -> Option<(String, String)> {
        let name = self.name.trim();
        let number = self.student_number.trim();
        if name.is_empty() || number.is_empty() {
            None
        } else {
            Some((name.to_string(), number.to_string()))
        }
    }
}

/// Renumbering request for year-end promotion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Promotion {
    /// Internal student id.
    pub id: String,
    #[serde(rename = "newStudentId")]
    pub new_student_number: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkAddSummary {
    pub added: usize,
    /// Duplicates and invalid rows.
    pub skipped: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PromoteSummary {
    pub success: usize,
    pub unchanged: usize,
    pub failed: usize,
}
