//! NEIS cumulative-record narrative synthesis.
//!
//! Each template owns a generator that fills a fixed Korean narrative from the normalized
//! 5W1H fields. Generators are pure: same fields in, same text out. Missing fields are
//! replaced with placeholders before any generator runs.

use super::catalog::GuidanceTemplate;
use crate::incident::IncidentAnalysis;
use serde::{Deserialize, Serialize};

pub const UNKNOWN_WHEN: &str = "일시 미상";
pub const UNKNOWN_WHERE: &str = "장소 미상";
pub const DEFAULT_WHO: &str = "학생";
pub const DEFAULT_WHAT: &str = "사안";
pub const DEFAULT_INCIDENT_TYPE: &str = "생활지도";

const DEFAULT_VICTIM: &str = "피해 학생";

/// Placeholder-filled view of an analysis; every field is non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordFields {
    pub date: String,
    pub place: String,
    pub who: String,
    pub what: String,
    pub incident_type: String,
}

impl RecordFields {
    pub fn from_analysis(analysis: &IncidentAnalysis) -> Self {
        let or = |f: &Option<String>, fallback: &str| {
            IncidentAnalysis::known(f).unwrap_or(fallback).to_string()
        };
        Self {
            date: or(&analysis.when, UNKNOWN_WHEN),
            place: or(&analysis.place, UNKNOWN_WHERE),
            who: or(&analysis.who, DEFAULT_WHO),
            what: or(&analysis.what, DEFAULT_WHAT),
            incident_type: or(&analysis.incident_type, DEFAULT_INCIDENT_TYPE),
        }
    }

    fn parties(&self) -> Vec<&str> {
        self.who.split(',').map(str::trim).collect()
    }
}

/// Runs the template's generator over the normalized analysis.
pub fn synthesize(template: &GuidanceTemplate, analysis: &IncidentAnalysis) -> String {
    template.generate(&RecordFields::from_analysis(analysis))
}

/// First party containing any marker, else the party at `fallback_index`.
fn find_party<'a>(parties: &[&'a str], markers: &[&str], fallback_index: usize) -> Option<&'a str> {
    parties
        .iter()
        .find(|p| markers.iter().any(|m| p.contains(m)))
        .or_else(|| parties.get(fallback_index))
        .copied()
        .filter(|p| !p.is_empty())
}

/// Name part of a party descriptor: `"김철수(A, 밀침)"` -> `"김철수"`.
fn given_name(party: &str) -> &str {
    let name = party.split('(').next().unwrap_or("").trim();
    if name.is_empty() {
        DEFAULT_WHO
    } else {
        name
    }
}

pub(crate) fn middle_bullying_violence(f: &RecordFields) -> String {
    let parties = f.parties();
    let victim = find_party(&parties, &["피해"], 1).unwrap_or(DEFAULT_VICTIM);
    let (date, place, who) = (&f.date, &f.place, &f.who);

    format!(
        "{date} {place}에서 {who} 간에 일방적 괴롭힘 및 폭력 사안이 발생함. 피해 학생 안전 확보 후 \
         삼자 대면을 통한 사건 조사를 실시하고, AI 기록 도구를 활용하여 음성/텍스트 및 비언어적 증거를 \
         객관적으로 확보함. 학교폭력 구성 요건(피해 사실, 가해 행위, 고의성, 지속성)을 분석한 결과, \
         학폭법 위반 및 인권 침해 사안으로 판단되어 즉시 분리 조치 및 보호자 통보를 실시함. 가해 \
         학생에게는 폭력의 심각성과 인권 침해에 대한 책임 인식 교육을 실시하고, 피해 학생에게는 심리적 \
         지원 및 전문가 상담 연계를 제공함. 학폭위 절차 안내 및 재발 방지를 위한 지속적인 상담 및 \
         관찰을 실시하기로 함. [누가기록] 가해 학생: \"{date} {victim}에게 지속적인 무시성 발언 및 \
         신체적 위해를 가한 사실이 확인됨. 피해 학생 즉시 분리 조치 및 보호자 통보함. 사안의 중대성 \
         교육과 관련하여 지속적 지도할 예정임.\" 피해 학생: \"{date} 또래 학생으로부터 지속적인 \
         정서적/신체적 괴롭힘을 당한 사실이 확인되어, wee클래스 전문 상담 및 심리 지원에 연계함. 현재 \
         안전한 교육 환경 조성을 위해 학교가 노력하고 있으며, 학생은 회복에 집중하는 중.\""
    )
}

pub(crate) fn middle_emotional_crisis(f: &RecordFields) -> String {
    let name = given_name(&f.who);
    format!(
        "{} {}에서 {name}이 또래 관계의 어려움으로 정서적 위축을 경험하였으나, 전문가의 심층 상담을 \
         통해 자기 이해를 높이고 자발적으로 새로운 학습 공동체에 참여하는 등 긍정적 변화를 위해 꾸준히 \
         노력하는 모습을 보였음.",
        f.date, f.place
    )
}

pub(crate) fn middle_classroom_disruption(f: &RecordFields) -> String {
    format!(
        "{} 수업 중 관심 끌기 행동으로 지도받았으나, 교사와의 정기적인 면담을 통해 스스로 행동의 변화를 \
         다짐하고 협력적인 과제 활동에 적극 참여하며 긍정적 관계를 형성해 나감.",
        f.date
    )
}

pub(crate) fn high_smoking_suspicion(f: &RecordFields) -> String {
    let parties = f.parties();
    let reporter = find_party(&parties, &["신고", "A"], 0).unwrap_or(DEFAULT_WHO);
    let suspect = find_party(&parties, &["의심", "B"], 1).unwrap_or(DEFAULT_WHO);

    format!(
        "[B학생 누가기록] {suspect}은(는) {} {}에서 흡연 관련 상황에 연루되어 교사의 지도를 받았으며, \
         본인은 흡연 사실을 부인하였으나, 평소 교우 관계 및 생활 습관을 돌아보며 반성하는 태도를 보임. \
         보건교사 연계 금연 예방 교육 이수 예정임. [A학생 누가기록] {reporter}은(는) 흡연 의심 상황을 \
         인지하고 교사에게 신고하여 학교의 질서 유지에 기여하였으며, 흡연 예방 교육에 적극적으로 참여함.",
        f.date, f.place
    )
}

pub(crate) fn high_attendance_issue(f: &RecordFields) -> String {
    let name = given_name(&f.who);
    format!(
        "{name}은(는) 최근 잦은 지각·결석을 보였으나 담임과의 면담 및 자기 관리 계획 수립 후 스스로 아침 \
         루틴을 조정하고 등교 태도 개선을 위해 꾸준히 노력하고 있음. 책임감과 성실성을 향상시키기 위해 \
         멘토교사 프로그램에 적극 참여함."
    )
}

pub(crate) fn high_cyber_bullying(f: &RecordFields) -> String {
    let parties = f.parties();
    let name = given_name(find_party(&parties, &["가해", "D"], 0).unwrap_or(DEFAULT_WHO));
    format!(
        "{name}은(는) 온라인 단체 채팅방에서 친구에게 부적절한 발언을 하였으며, 담임의 지도 및 디지털 \
         시민의식 교육 이수 후 진심으로 사과하고 온라인 예절의 중요성 및 책임감을 깊이 인식하게 되었음. \
         이후 온라인상에서 긍정적인 언행을 위해 노력하고 있음."
    )
}

pub(crate) fn elementary_peer_conflict(f: &RecordFields) -> String {
    let parties = f.parties();
    let a = given_name(find_party(&parties, &["A", "밀"], 0).unwrap_or(DEFAULT_WHO));
    let b = given_name(find_party(&parties, &["B", "뺏"], 1).unwrap_or(DEFAULT_WHO));

    format!(
        "[A학생 누가기록] {a}은(는) 쉬는 시간 공 문제로 친구를 밀치는 행동을 보였으나, 교사의 지도 후 \
         자신의 행동을 즉시 반성하고 친구에게 먼저 사과하는 성숙한 모습을 보였으며, 갈등 상황에서 말로 \
         표현하는 연습을 통해 긍정적인 변화를 기대함. [B학생 누가기록] {b}은(는) 공 문제로 친구와 다툼이 \
         발생했을 때, 자신의 입장을 명확히 설명하면서도 친구의 사과를 너그럽게 받아들이는 포용력 있는 \
         태도를 보임. 갈등 상황에서 친구에게 먼저 요청하는 의사소통 기술을 훈련하여 사회성을 함양함."
    )
}

pub(crate) fn elementary_classroom_disruption(f: &RecordFields) -> String {
    let name = given_name(&f.who);
    format!(
        "{name}은(는) 특정 과목 시간에 집중력 저하로 지도를 받았으나, 흥미 유도 활동에 참여하며 수업 참여 \
         태도가 점차 개선되는 긍정적 변화를 보였으며, 자기 주도 학습 능력 향상을 위해 꾸준히 노력할 것으로 \
         기대됨."
    )
}

pub(crate) fn elementary_parent_complaint(f: &RecordFields) -> String {
    let name = given_name(&f.who);
    format!(
        "{name}은(는) 친구 관계에서 일시적 소외감을 느꼈으나, 담임교사와의 상담을 통해 오해를 해소하고 교우 \
         관계를 개선하기 위해 노력함. 친구의 감정을 공감하고 배려하는 태도를 함양할 것으로 기대됨."
    )
}

pub(crate) fn peer_conflict_misunderstanding(f: &RecordFields) -> String {
    format!(
        "{} {}에서 {} 간에 오해로 인한 다툼이 발생함. 양측의 이야기를 경청하고 사실관계를 확인하여 오해임을 \
         인지시킴. 서로 사과하고 화해하도록 지도하였으며, 추후 유사한 갈등이 발생하지 않도록 의사소통 교육을 \
         실시함.",
        f.date, f.place, f.who
    )
}

pub(crate) fn peer_conflict_competition(f: &RecordFields) -> String {
    format!(
        "{} {}에서 {} 간에 놀이(활동) 중 승패와 관련한 갈등이 발생함. 과열된 경쟁심을 진정시키고 규칙 준수와 \
         스포츠맨십의 중요성을 지도함. 서로의 감정을 인정하고 화해하도록 이끌었으며, 협동의 가치를 재교육함.",
        f.date, f.place, f.who
    )
}

pub(crate) fn peer_conflict_bullying(f: &RecordFields) -> String {
    format!(
        "{} {}에서 {} 간에 부적절한 언행으로 인한 갈등이 발생함. 피해 학생의 심정을 헤아리도록 역지사지 교육을 \
         실시하고, 타인을 존중하는 태도의 중요성을 지도함. 가해 학생은 잘못을 인정하고 사과하였으며, 재발 \
         방지를 위해 지속적으로 상담 및 관찰하기로 함.",
        f.date, f.place, f.who
    )
}

pub(crate) fn general_guidance(f: &RecordFields) -> String {
    format!(
        "{} {}에서 {} 사안이 발생함. 학생과의 면담을 통해 사실관계를 확인하고 {}에 대한 올바른 태도를 지도함. \
         학생은 자신의 행동을 돌아보고 추후 유사한 일이 발생하지 않도록 노력하겠다고 다짐함.",
        f.date, f.place, f.what, f.incident_type
    )
}
