//! Profile context block — the fixed-shape text summary of a student's
//! profile that is injected into the system prompt.
//!
//! Every line is always present; missing values render as sentinels so the
//! prompt keeps the same shape whatever the profile holds.

use unipath_core::domain::{BachelorsRecord, FlexValue, Profile, SchoolRecord};

pub const NOT_AVAILABLE: &str = "N/A";
pub const ANY: &str = "Any";
pub const UNDECIDED: &str = "Undecided";
pub const NO_BUDGET: &str = "0";
pub const NOT_PROVIDED: &str = "Not provided";
pub const NO_BACHELORS: &str = "None — undergraduate applicant";

/// Render the context block for `profile`.
pub fn build_profile_context(profile: &Profile) -> String {
    let sections = [
        student_section(profile),
        academic_section(profile),
        preferences_section(profile),
        readiness_section(profile),
    ];
    sections.join("\n\n")
}

fn student_section(profile: &Profile) -> String {
    format!(
        "STUDENT:\n- ID: {}\n- Name: {}",
        profile.id,
        text(profile.full_name.as_deref(), NOT_AVAILABLE)
    )
}

fn academic_section(profile: &Profile) -> String {
    let academic = &profile.academic_data;
    let history = &academic.history;
    format!(
        "ACADEMIC HISTORY:\n\
         - Target Major: {}\n\
         - Overall Score (Summary): {}\n\
         - Class 10th: {}\n\
         - Class 12th: {}\n\
         - Bachelors: {}",
        text(academic.major.as_deref(), UNDECIDED),
        flex(academic.gpa.as_ref(), NOT_AVAILABLE),
        school(history.tenth.as_ref()),
        school(history.twelfth.as_ref()),
        bachelors(history.bachelors.as_ref())
    )
}

fn preferences_section(profile: &Profile) -> String {
    let preferences = &profile.preferences;
    format!(
        "PREFERENCES:\n\
         - Budget: ${}\n\
         - Target Country: {}\n\
         - Target Intake: {}",
        flex(preferences.budget.as_ref(), NO_BUDGET),
        text(preferences.country.as_deref(), ANY),
        target_intake(profile)
    )
}

fn readiness_section(profile: &Profile) -> String {
    let readiness = &profile.readiness_data;
    format!(
        "READINESS:\n\
         - English Test: {} (Score: {})\n\
         - SOP Status: {}",
        text(readiness.english_test.as_deref(), NOT_AVAILABLE),
        flex(readiness.english_score.as_ref(), NOT_AVAILABLE),
        text(readiness.sop_status.as_deref(), NOT_AVAILABLE)
    )
}

/// The intake as rendered in the context block (`Any` when unset).
pub fn target_intake(profile: &Profile) -> &str {
    text(profile.preferences.intake.as_deref(), ANY)
}

fn text<'a>(value: Option<&'a str>, sentinel: &'a str) -> &'a str {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(sentinel)
}

fn flex(value: Option<&FlexValue>, sentinel: &str) -> String {
    match value {
        Some(v) if !v.is_blank() => v.to_string(),
        _ => sentinel.to_string(),
    }
}

fn school(record: Option<&SchoolRecord>) -> String {
    let Some(record) = record.filter(|r| !school_is_blank(r)) else {
        return NOT_PROVIDED.to_string();
    };
    format!(
        "{}% ({}, {})",
        flex(record.percentage.as_ref(), NOT_AVAILABLE),
        text(record.board.as_deref(), NOT_AVAILABLE),
        flex(record.year.as_ref(), NOT_AVAILABLE)
    )
}

fn bachelors(record: Option<&BachelorsRecord>) -> String {
    let Some(record) = record.filter(|r| !bachelors_is_blank(r)) else {
        return NO_BACHELORS.to_string();
    };
    format!(
        "{} ({}) - Score: {}",
        text(record.course.as_deref(), NOT_AVAILABLE),
        flex(record.year.as_ref(), NOT_AVAILABLE),
        flex(record.score.as_ref(), NOT_AVAILABLE)
    )
}

fn is_blank_str(value: Option<&str>) -> bool {
    value.is_none_or(|s| s.trim().is_empty())
}

fn is_blank_flex(value: Option<&FlexValue>) -> bool {
    value.is_none_or(FlexValue::is_blank)
}

// The onboarding form submits empty objects for skipped sections.
fn school_is_blank(record: &SchoolRecord) -> bool {
    is_blank_str(record.board.as_deref())
        && is_blank_flex(record.year.as_ref())
        && is_blank_flex(record.percentage.as_ref())
}

fn bachelors_is_blank(record: &BachelorsRecord) -> bool {
    is_blank_str(record.course.as_deref())
        && is_blank_flex(record.year.as_ref())
        && is_blank_flex(record.score.as_ref())
}
