use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttendanceStatus {
    #[default]
    Present,
    Late,
    Absent,
    EarlyLeave,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Present => "PRESENT",
            Self::Late => "LATE",
            Self::Absent => "ABSENT",
            Self::EarlyLeave => "EARLY_LEAVE",
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, Self::Present)
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttendanceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PRESENT" => Ok(Self::Present),
            "LATE" => Ok(Self::Late),
            "ABSENT" => Ok(Self::Absent),
            "EARLY_LEAVE" => Ok(Self::EarlyLeave),
            other => Err(format!("unknown attendance status: {other}")),
        }
    }
}

/// One day's attendance for one student. `date` serializes as `YYYY-MM-DD`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attendance {
    pub id: String,
    pub student_id: String,
    pub teacher_id: String,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub created_at: DateTime<Utc>,
}

/// Mileage delta for a status transition. `previous` is `None` for a new day.
pub fn mileage_delta(previous: Option<AttendanceStatus>, next: AttendanceStatus) -> i64 {
    let was = previous.map_or(false, |p| p.is_present());
    match (was, next.is_present()) {
        (false, true) => 1,
        (true, false) => -1,
        _ => 0,
    }
}

/// Result of marking attendance: the stored row and the student's mileage afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceMark {
    pub attendance: Attendance,
    pub current_mileage: u32,
}
