//! Types shared by the incident and roster stores.

use serde::{Deserialize, Serialize};

/// Caller identity for ownership checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requester {
    /// Teacher the request is made on behalf of.
    pub teacher_id: String,
    /// Admins bypass per-teacher ownership.
    #[serde(default)]
    pub is_admin: bool,
}

impl Requester {
    pub fn teacher(id: impl Into<String>) -> Self {
        Self {
            teacher_id: id.into(),
            is_admin: false,
        }
    }

    pub fn admin(id: impl Into<String>) -> Self {
        Self {
            teacher_id: id.into(),
            is_admin: true,
        }
    }

    /// True when the requester may act on something owned by `owner_teacher_id`.
    pub fn owns(&self, owner_teacher_id: &str) -> bool {
        self.is_admin || self.teacher_id == owner_teacher_id
    }
}
