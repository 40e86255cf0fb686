//! Counselling domain model: profiles, catalog rows, shortlist entries, tasks.
//!
//! Field names follow the persisted JSON shapes (`academic_data`,
//! `readiness_data.englishTest`, ...) so rows written by the dashboard
//! deserialize without translation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Advisory workflow position stored on the profile.
///
/// Nothing enforces ordering; any writer may set any value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    #[default]
    Profile,
    Discovery,
    Shortlist,
    Application,
}

impl Stage {
    pub const ALL: [Stage; 4] = [
        Stage::Profile,
        Stage::Discovery,
        Stage::Shortlist,
        Stage::Application,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Profile => "PROFILE",
            Stage::Discovery => "DISCOVERY",
            Stage::Shortlist => "SHORTLIST",
            Stage::Application => "APPLICATION",
        }
    }

    /// The stage the dashboard's "proceed" action moves to. `None` at the end.
    pub fn next(&self) -> Option<Stage> {
        match self {
            Stage::Profile => Some(Stage::Discovery),
            Stage::Discovery => Some(Stage::Shortlist),
            Stage::Shortlist => Some(Stage::Application),
            Stage::Application => None,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Stage::ALL
            .into_iter()
            .find(|stage| stage.as_str() == s)
            .ok_or_else(|| format!("unknown stage '{s}' (expected PROFILE, DISCOVERY, SHORTLIST or APPLICATION)"))
    }
}

/// Shortlist tag. Fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Safe,
    Target,
    Dream,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Safe => "SAFE",
            Category::Target => "TARGET",
            Category::Dream => "DREAM",
        }
    }

    /// Discovery-grid heuristic: easy admits are SAFE, selective schools DREAM.
    pub fn from_acceptance_rate(rate: f64) -> Self {
        if rate > 60.0 {
            Category::Safe
        } else if rate < 20.0 {
            Category::Dream
        } else {
            Category::Target
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SAFE" => Ok(Category::Safe),
            "TARGET" => Ok(Category::Target),
            "DREAM" => Ok(Category::Dream),
            other => Err(format!("unknown category '{other}' (expected SAFE, TARGET or DREAM)")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskType {
    Manual,
    System,
    AiGenerated,
    Application,
}

impl TaskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::Manual => "MANUAL",
            TaskType::System => "SYSTEM",
            TaskType::AiGenerated => "AI_GENERATED",
            TaskType::Application => "APPLICATION",
        }
    }
}

impl FromStr for TaskType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MANUAL" => Ok(TaskType::Manual),
            "SYSTEM" => Ok(TaskType::System),
            "AI_GENERATED" => Ok(TaskType::AiGenerated),
            "APPLICATION" => Ok(TaskType::Application),
            other => Err(format!("unknown task type '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    #[default]
    Pending,
    Done,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "PENDING",
            TaskStatus::Done => "DONE",
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            TaskStatus::Pending => TaskStatus::Done,
            TaskStatus::Done => TaskStatus::Pending,
        }
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(TaskStatus::Pending),
            "DONE" => Ok(TaskStatus::Done),
            other => Err(format!("unknown task status '{other}'")),
        }
    }
}

/// A scalar the dashboard stores either as a JSON number or as a string
/// (`"20000"` vs `20000`). Rendered exactly as given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlexValue {
    Number(f64),
    Text(String),
}

impl FlexValue {
    /// Blank strings count as missing.
    pub fn is_blank(&self) -> bool {
        match self {
            FlexValue::Number(_) => false,
            FlexValue::Text(s) => s.trim().is_empty(),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FlexValue::Number(n) => Some(*n),
            FlexValue::Text(s) => s.trim().trim_start_matches('$').replace(',', "").parse().ok(),
        }
    }
}

impl fmt::Display for FlexValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlexValue::Number(n) => write!(f, "{n}"),
            FlexValue::Text(s) => f.write_str(s.trim()),
        }
    }
}

impl From<f64> for FlexValue {
    fn from(n: f64) -> Self {
        FlexValue::Number(n)
    }
}

impl From<&str> for FlexValue {
    fn from(s: &str) -> Self {
        FlexValue::Text(s.to_string())
    }
}

/// Class 10 / class 12 record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchoolRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub board: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<FlexValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percentage: Option<FlexValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BachelorsRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<FlexValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<FlexValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AcademicHistory {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenth: Option<SchoolRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twelfth: Option<SchoolRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bachelors: Option<BachelorsRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcademicData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub degree: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub major: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpa: Option<FlexValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grad_year: Option<FlexValue>,
    #[serde(default)]
    pub history: AcademicHistory,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget: Option<FlexValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intake: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadinessData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub english_test: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub english_score: Option<FlexValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sop_status: Option<String>,
}

/// A student's academic and preference record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,

    #[serde(default)]
    pub academic_data: AcademicData,

    #[serde(default)]
    pub preferences: Preferences,

    #[serde(default)]
    pub readiness_data: ReadinessData,

    #[serde(default)]
    pub current_stage: Stage,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locked_university_id: Option<String>,

    #[serde(default)]
    pub onboarding_completed: bool,
}

impl Profile {
    /// An empty profile; every context field resolves to its sentinel.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }
}

/// A catalog entry. Read-only from the agent's perspective.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct University {
    pub id: String,
    pub name: String,
    pub country: String,
    pub tuition_fee: f64,
    pub acceptance_rate: f64,
}

/// A user's association to a university.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShortlistEntry {
    pub id: String,
    pub user_id: String,
    pub university_id: String,
    pub category: Category,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_notes: Option<String>,
    #[serde(default)]
    pub is_locked: bool,
    pub created_at: DateTime<Utc>,
}

/// Shortlist entry joined with its catalog row, for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShortlistView {
    #[serde(flatten)]
    pub entry: ShortlistEntry,
    #[serde(rename = "universities")]
    pub university: Option<University>,
}

/// A checklist item for the APPLICATION stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub user_id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One exchange of the dashboard chat, as resubmitted by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}
