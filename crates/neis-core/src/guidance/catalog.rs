//! Guidance template catalog.
//!
//! The built-in catalog is an ordered list: position is priority. Severe safety categories
//! (bullying, violence, emotional crisis) sit ahead of milder ones so an overlapping keyword
//! resolves to the more serious template. The catalog is built once and never mutated.

use super::record::{self, RecordFields};
use super::steps::{steps_for, GuidanceStep};
use once_cell::sync::Lazy;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// School level of a teacher or a template. `All` on a template means "applies everywhere";
/// `All` on a request means "accept templates of every level".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchoolLevel {
    Elementary,
    Middle,
    High,
    #[default]
    All,
}

impl SchoolLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Elementary => "elementary",
            Self::Middle => "middle",
            Self::High => "high",
            Self::All => "all",
        }
    }

    /// Whether a requester at `self` may use a template tagged `template_level`.
    pub fn admits(self, template_level: SchoolLevel) -> bool {
        self == Self::All || template_level == Self::All || self == template_level
    }
}

impl fmt::Display for SchoolLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SchoolLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "elementary" => Ok(Self::Elementary),
            "middle" => Ok(Self::Middle),
            "high" => Ok(Self::High),
            "all" | "" => Ok(Self::All),
            other => Err(format!("unknown school level: {other}")),
        }
    }
}

/// Pure narrative generator bound to a template.
pub type RecordGenerator = fn(&RecordFields) -> String;

/// One catalog entry: trigger keywords, school level, and the record generator.
#[derive(Clone, Copy)]
pub struct GuidanceTemplate {
    pub id: &'static str,
    /// Category label (`type` in the wire format).
    pub kind: &'static str,
    /// Finer label (`subType` in the wire format).
    pub sub_kind: &'static str,
    pub school_level: SchoolLevel,
    /// Case-sensitive substrings. Empty means the template matches any text.
    pub keywords: &'static [&'static str],
    /// When set, the template is only considered if the incident type contains this text.
    pub incident_type_gate: Option<&'static str>,
    pub generator: RecordGenerator,
}

impl GuidanceTemplate {
    /// True when any keyword occurs in `text`, or unconditionally for an empty keyword set.
    pub fn matches(&self, text: &str) -> bool {
        self.keywords.is_empty() || self.keywords.iter().any(|k| text.contains(k))
    }

    pub fn steps(&self) -> &'static [GuidanceStep] {
        steps_for(self.id)
    }

    pub fn generate(&self, fields: &RecordFields) -> String {
        (self.generator)(fields)
    }
}

impl fmt::Debug for GuidanceTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GuidanceTemplate")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("sub_kind", &self.sub_kind)
            .field("school_level", &self.school_level)
            .field("keywords", &self.keywords)
            .field("incident_type_gate", &self.incident_type_gate)
            .finish_non_exhaustive()
    }
}

impl PartialEq for GuidanceTemplate {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Serialize for GuidanceTemplate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("GuidanceTemplate", 6)?;
        s.serialize_field("id", self.id)?;
        s.serialize_field("type", self.kind)?;
        s.serialize_field("subType", self.sub_kind)?;
        s.serialize_field("schoolLevel", &self.school_level)?;
        s.serialize_field("keywords", self.keywords)?;
        s.serialize_field("steps", self.steps())?;
        s.end()
    }
}

/// Ordered template list plus the unconditional fallback.
#[derive(Debug, Clone)]
pub struct Catalog {
    templates: Vec<GuidanceTemplate>,
    fallback: GuidanceTemplate,
}

impl Catalog {
    pub fn new(templates: Vec<GuidanceTemplate>, fallback: GuidanceTemplate) -> Self {
        Self { templates, fallback }
    }

    /// The process-wide built-in catalog.
    pub fn builtin() -> &'static Catalog {
        &BUILTIN
    }

    /// Templates in priority order (fallback excluded).
    pub fn templates(&self) -> &[GuidanceTemplate] {
        &self.templates
    }

    pub fn fallback(&self) -> &GuidanceTemplate {
        &self.fallback
    }

    pub fn get(&self, id: &str) -> Option<&GuidanceTemplate> {
        self.templates
            .iter()
            .chain(std::iter::once(&self.fallback))
            .find(|t| t.id == id)
    }
}

static BUILTIN: Lazy<Catalog> = Lazy::new(|| Catalog::new(BUILTIN_TEMPLATES.to_vec(), DEFAULT_TEMPLATE));

/// Built-in templates in priority order.
pub static BUILTIN_TEMPLATES: [GuidanceTemplate; 12] = [
    GuidanceTemplate {
        id: "middle_bullying_violence",
        kind: "학교폭력",
        sub_kind: "일방적 괴롭힘/폭력",
        school_level: SchoolLevel::Middle,
        keywords: &[
            "괴롭힘", "폭력", "일방적", "가해", "피해", "따돌림", "폭행", "신체적 위해", "인권 침해",
        ],
        incident_type_gate: None,
        generator: record::middle_bullying_violence,
    },
    GuidanceTemplate {
        id: "middle_emotional_crisis",
        kind: "정서 위기",
        sub_kind: "우울/정서적 위축",
        school_level: SchoolLevel::Middle,
        keywords: &[
            "우울", "정서", "위기", "자해", "자살", "따돌림", "관계 어려움", "위축", "혼자", "외로움",
            "정서적 따돌림", "정서적 괴롭힘",
        ],
        incident_type_gate: None,
        generator: record::middle_emotional_crisis,
    },
    GuidanceTemplate {
        id: "middle_classroom_disruption",
        kind: "교권침해",
        sub_kind: "수업 방해",
        school_level: SchoolLevel::Middle,
        keywords: &[
            "수업 방해", "교권", "교권침해", "수업 통제", "모욕", "무시", "관심 끌기", "장난", "재밌어서",
            "불손", "책임 회피",
        ],
        incident_type_gate: None,
        generator: record::middle_classroom_disruption,
    },
    GuidanceTemplate {
        id: "high_smoking_suspicion",
        kind: "흡연 의심",
        sub_kind: "교내 흡연 의심",
        school_level: SchoolLevel::High,
        keywords: &[
            "흡연", "담배", "화장실", "흡연 의심", "흡연물", "금연", "흡연 친구", "흡연 관여", "흡연 유혹",
        ],
        incident_type_gate: None,
        generator: record::high_smoking_suspicion,
    },
    GuidanceTemplate {
        id: "high_attendance_issue",
        kind: "출결 문제",
        sub_kind: "지속적 지각/결석",
        school_level: SchoolLevel::High,
        keywords: &[
            "출결", "지각", "결석", "무단지각", "무단결석", "출석", "등교", "아침", "일어나기",
            "학교 재미없어", "학습 동기", "출결 문제",
        ],
        incident_type_gate: None,
        generator: record::high_attendance_issue,
    },
    GuidanceTemplate {
        id: "high_cyber_bullying",
        kind: "사이버 폭력",
        sub_kind: "온라인 폭언/단체 대화방",
        school_level: SchoolLevel::High,
        keywords: &[
            "온라인", "사이버", "폭언", "단체채팅방", "단체 대화방", "SNS", "비방", "조롱", "디지털",
            "온라인 폭력", "사이버 폭력", "채팅방", "메시지",
        ],
        incident_type_gate: None,
        generator: record::high_cyber_bullying,
    },
    GuidanceTemplate {
        id: "elementary_peer_conflict",
        kind: "또래 갈등",
        sub_kind: "단순 생활지도",
        school_level: SchoolLevel::Elementary,
        keywords: &[
            "또래 갈등", "다툼", "밀침", "공 뺏음", "친구", "싸움", "갈등", "충동", "의사소통", "초등",
            "생활지도",
        ],
        incident_type_gate: None,
        generator: record::elementary_peer_conflict,
    },
    GuidanceTemplate {
        id: "elementary_classroom_disruption",
        kind: "수업 방해",
        sub_kind: "반복적 수업 방해",
        school_level: SchoolLevel::Elementary,
        keywords: &[
            "수업 방해", "집중력", "학습 부진", "흥미 저하", "수업 질서", "대화 시도", "학습지", "수학 시간",
            "참여", "초등",
        ],
        incident_type_gate: None,
        generator: record::elementary_classroom_disruption,
    },
    GuidanceTemplate {
        id: "elementary_parent_complaint",
        kind: "학부모 민원",
        sub_kind: "민원성 학부모 상담",
        school_level: SchoolLevel::Elementary,
        keywords: &[
            "민원", "학부모", "따돌림", "소외감", "상담", "민원 대응", "학부모 연락", "학부모 주장", "오해",
            "초등",
        ],
        incident_type_gate: None,
        generator: record::elementary_parent_complaint,
    },
    GuidanceTemplate {
        id: "peer_conflict_misunderstanding",
        kind: "또래 갈등",
        sub_kind: "오해",
        school_level: SchoolLevel::All,
        keywords: &["오해", "착각", "잘못 알고", "모르고"],
        incident_type_gate: Some(PEER_CONFLICT_GATE),
        generator: record::peer_conflict_misunderstanding,
    },
    GuidanceTemplate {
        id: "peer_conflict_competition",
        kind: "또래 갈등",
        sub_kind: "경쟁",
        school_level: SchoolLevel::All,
        keywords: &["게임", "시합", "경기", "승패", "졌다", "이겼다", "반칙"],
        incident_type_gate: Some(PEER_CONFLICT_GATE),
        generator: record::peer_conflict_competition,
    },
    GuidanceTemplate {
        id: "peer_conflict_bullying",
        kind: "또래 갈등",
        sub_kind: "괴롭힘",
        school_level: SchoolLevel::All,
        keywords: &["놀림", "괴롭힘", "따돌림", "지속적", "반복", "장난"],
        incident_type_gate: Some(PEER_CONFLICT_GATE),
        generator: record::peer_conflict_bullying,
    },
];

/// Incident-type marker that opens the shared peer-conflict templates.
const PEER_CONFLICT_GATE: &str = "갈등";

/// Fallback template: no keywords, every level, always matches.
pub static DEFAULT_TEMPLATE: GuidanceTemplate = GuidanceTemplate {
    id: "default",
    kind: "생활지도",
    sub_kind: "일반",
    school_level: SchoolLevel::All,
    keywords: &[],
    incident_type_gate: None,
    generator: record::general_guidance,
};
