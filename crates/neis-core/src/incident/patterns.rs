//! Recurring-behaviour analysis over a student's incident history.

use super::analysis::UNKNOWN_MARKER;
use super::record::IncidentRecord;
use chrono::{Datelike, Local};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

const SUBJECTS: [&str; 8] = ["수학", "국어", "영어", "과학", "사회", "체육", "음악", "미술"];
const TIMES: [&str; 5] = ["아침", "점심", "쉬는시간", "수업시간", "방과후"];
const DAY_NAMES: [&str; 7] = ["일요일", "월요일", "화요일", "수요일", "목요일", "금요일", "토요일"];
const OTHER_INCIDENT_TYPE: &str = "기타";

/// Minimum count before a category produces an insight.
const INSIGHT_THRESHOLD: usize = 2;
const HIGH_SEVERITY_THRESHOLD: usize = 3;

/// Occurrence counts in first-seen order. Serializes as a JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tally(Vec<(String, usize)>);

impl Tally {
    pub fn bump(&mut self, key: &str) {
        match self.0.iter_mut().find(|(k, _)| k == key) {
            Some((_, n)) => *n += 1,
            None => self.0.push((key.to_string(), 1)),
        }
    }

    pub fn get(&self, key: &str) -> usize {
        self.0.iter().find(|(k, _)| k == key).map_or(0, |(_, n)| *n)
    }

    /// Highest count; the earliest-inserted entry wins ties.
    pub fn top(&self) -> Option<(&str, usize)> {
        self.0.iter().fold(None, |best, (k, n)| match best {
            Some((_, m)) if m >= *n => best,
            _ => Some((k.as_str(), *n)),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for Tally {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, n) in &self.0 {
            map.serialize_entry(k, n)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternTallies {
    pub by_subject: Tally,
    pub by_time: Tally,
    pub by_location: Tally,
    pub by_day_of_week: Tally,
    pub by_incident_type: Tally,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum InsightKind {
    Subject,
    Time,
    Location,
    DayOfWeek,
    IncidentType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatternInsight {
    #[serde(rename = "type")]
    pub kind: InsightKind,
    pub pattern: String,
    pub severity: Severity,
    pub recommendation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternReport {
    pub patterns: PatternTallies,
    pub insights: Vec<PatternInsight>,
    pub total_incidents: usize,
}

/// Tallies subject, time of day, location, weekday, and incident type across `incidents`
/// and turns each category's most frequent entry into an insight when it recurs.
pub fn analyze_patterns(incidents: &[IncidentRecord]) -> PatternReport {
    let mut t = PatternTallies::default();

    for incident in incidents {
        let analysis = incident.ai_analysis.as_ref().and_then(|a| a.structured());
        let when = analysis.and_then(|a| a.when.as_deref()).unwrap_or("");
        let what = analysis.and_then(|a| a.what.as_deref()).unwrap_or("");
        let place = analysis.and_then(|a| a.place.as_deref()).unwrap_or("");

        for subject in SUBJECTS {
            if when.contains(subject) || what.contains(subject) {
                t.by_subject.bump(subject);
            }
        }
        for time in TIMES {
            if when.contains(time) {
                t.by_time.bump(time);
            }
        }
        if !place.is_empty() && place != UNKNOWN_MARKER {
            t.by_location.bump(place);
        }

        let weekday = incident.incident_date.with_timezone(&Local).weekday();
        t.by_day_of_week
            .bump(DAY_NAMES[weekday.num_days_from_sunday() as usize]);

        let incident_type = if incident.incident_type.is_empty() {
            OTHER_INCIDENT_TYPE
        } else {
            incident.incident_type.as_str()
        };
        t.by_incident_type.bump(incident_type);
    }

    let mut insights = Vec::new();
    let categories: [(InsightKind, &Tally); 5] = [
        (InsightKind::Subject, &t.by_subject),
        (InsightKind::Time, &t.by_time),
        (InsightKind::Location, &t.by_location),
        (InsightKind::DayOfWeek, &t.by_day_of_week),
        (InsightKind::IncidentType, &t.by_incident_type),
    ];
    for (kind, tally) in categories {
        if let Some((key, n)) = tally.top().filter(|(_, n)| *n >= INSIGHT_THRESHOLD) {
            insights.push(insight(kind, key, n));
        }
    }

    PatternReport {
        patterns: t,
        insights,
        total_incidents: incidents.len(),
    }
}

fn insight(kind: InsightKind, key: &str, n: usize) -> PatternInsight {
    let (pattern, recommendation) = match kind {
        InsightKind::Subject => (
            format!("{key} 시간에 {n}회 반복됨"),
            format!("{key} 수업 시 특별한 관심과 지도가 필요합니다."),
        ),
        InsightKind::Time => (
            format!("{key}에 {n}회 반복됨"),
            format!("{key} 동안 학생의 행동을 주의 깊게 관찰하세요."),
        ),
        InsightKind::Location => (
            format!("{key}에서 {n}회 반복됨"),
            format!("{key} 환경에서의 행동 패턴을 분석하고 개선 방안을 모색하세요."),
        ),
        InsightKind::DayOfWeek => (
            format!("{key}에 {n}회 발생"),
            format!("{key} 시간표나 활동을 검토하여 원인을 파악하세요."),
        ),
        InsightKind::IncidentType => (
            format!("{key} 유형이 {n}회 반복됨"),
            format!("{key} 문제에 대한 체계적인 상담과 지도가 필요합니다."),
        ),
    };
    PatternInsight {
        kind,
        pattern,
        severity: if n >= HIGH_SEVERITY_THRESHOLD {
            Severity::High
        } else {
            Severity::Medium
        },
        recommendation,
    }
}
