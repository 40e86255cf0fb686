//! CounselStore trait — the relational store behind profiles, the university
//! catalog, shortlists and tasks.
//!
//! A handle is constructed once at startup and injected (as
//! `Arc<dyn CounselStore>`) into the tools and the gateway. Each method is a
//! single statement (or one batch insert); nothing spans methods in a
//! transaction, so concurrent writers resolve last-write-wins per row.
//!
//! Implementations: SQLite (production), in-memory (tests, demos).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{
    AcademicData, Category, Preferences, Profile, ReadinessData, ShortlistEntry, ShortlistView,
    Stage, Task, TaskType, University,
};
use crate::error::StoreError;

/// Row filter for catalog searches. Absent fields do not filter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UniversityFilter {
    /// Case-insensitive substring of the university name
    pub name_contains: Option<String>,
    /// Inclusive upper bound on `tuition_fee`
    pub max_tuition: Option<f64>,
    /// Exact country match
    pub country: Option<String>,
    pub limit: usize,
}

impl UniversityFilter {
    pub fn matches(&self, university: &University) -> bool {
        if let Some(country) = &self.country {
            if &university.country != country {
                return false;
            }
        }
        if let Some(max) = self.max_tuition {
            if university.tuition_fee > max {
                return false;
            }
        }
        if let Some(needle) = &self.name_contains {
            if !university.name.to_lowercase().contains(&needle.to_lowercase()) {
                return false;
            }
        }
        true
    }
}

/// Fields written by the onboarding wizard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OnboardingUpdate {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub academic_data: AcademicData,
    #[serde(default)]
    pub preferences: Preferences,
    #[serde(default)]
    pub readiness_data: ReadinessData,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewShortlistEntry {
    pub user_id: String,
    pub university_id: String,
    pub category: Category,
    pub ai_notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewTask {
    pub user_id: String,
    pub title: String,
    pub task_type: TaskType,
}

#[async_trait]
pub trait CounselStore: Send + Sync {
    /// Backend name for diagnostics ("sqlite", "in_memory").
    fn name(&self) -> &str;

    // --- profiles ---

    async fn get_profile(&self, user_id: &str) -> Result<Option<Profile>, StoreError>;

    /// Create a profile row (signup). Fails with `Constraint` on a duplicate id.
    async fn insert_profile(&self, profile: Profile) -> Result<(), StoreError>;

    /// Write the onboarding answers, mark onboarding complete and reset the
    /// stage to PROFILE. Creates the row if it does not exist.
    async fn upsert_onboarding(
        &self,
        user_id: &str,
        update: OnboardingUpdate,
    ) -> Result<Profile, StoreError>;

    /// Plain stage write. `NotFound` if the profile does not exist.
    async fn set_stage(&self, user_id: &str, stage: Stage) -> Result<(), StoreError>;

    /// Set `locked_university_id` and `current_stage = APPLICATION` in one
    /// update. `NotFound` if the profile does not exist.
    async fn lock_profile(&self, user_id: &str, university_id: &str) -> Result<(), StoreError>;

    // --- catalog ---

    /// Insert a catalog row, replacing any row with the same id.
    async fn insert_university(&self, university: University) -> Result<(), StoreError>;

    async fn get_university(&self, id: &str) -> Result<Option<University>, StoreError>;

    async fn search_universities(
        &self,
        filter: &UniversityFilter,
    ) -> Result<Vec<University>, StoreError>;

    // --- shortlists ---

    /// Insert one entry. No dedup: identical calls create distinct rows.
    /// `Constraint` if the user or university does not exist.
    async fn insert_shortlist_entry(
        &self,
        entry: NewShortlistEntry,
    ) -> Result<ShortlistEntry, StoreError>;

    /// Flip `is_locked` on the user's entries for this university.
    /// Returns the number of rows updated.
    async fn lock_shortlist_entries(
        &self,
        user_id: &str,
        university_id: &str,
    ) -> Result<u64, StoreError>;

    async fn list_shortlist(&self, user_id: &str) -> Result<Vec<ShortlistView>, StoreError>;

    // --- tasks ---

    /// Insert a batch of PENDING tasks; all or nothing.
    async fn insert_tasks(&self, tasks: Vec<NewTask>) -> Result<Vec<Task>, StoreError>;

    /// The user's tasks, oldest first.
    async fn list_tasks(&self, user_id: &str) -> Result<Vec<Task>, StoreError>;

    /// Flip a task between PENDING and DONE and return the updated row.
    async fn toggle_task(&self, task_id: &str) -> Result<Task, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uni(name: &str, country: &str, fee: f64) -> University {
        University {
            id: name.to_lowercase().replace(' ', "-"),
            name: name.into(),
            country: country.into(),
            tuition_fee: fee,
            acceptance_rate: 40.0,
        }
    }

    #[test]
    fn empty_filter_matches_everything() {
        let filter = UniversityFilter::default();
        assert!(filter.matches(&uni("University of Toronto", "Canada", 45000.0)));
    }

    #[test]
    fn budget_is_inclusive_upper_bound() {
        let filter = UniversityFilter {
            max_tuition: Some(15000.0),
            ..Default::default()
        };
        assert!(filter.matches(&uni("A", "UK", 15000.0)));
        assert!(!filter.matches(&uni("B", "UK", 15000.01)));
    }

    #[test]
    fn country_is_exact() {
        let filter = UniversityFilter {
            country: Some("UK".into()),
            ..Default::default()
        };
        assert!(filter.matches(&uni("A", "UK", 1.0)));
        assert!(!filter.matches(&uni("B", "uk", 1.0)));
        assert!(!filter.matches(&uni("C", "UKraine", 1.0)));
    }

    #[test]
    fn name_is_case_insensitive_substring() {
        let filter = UniversityFilter {
            name_contains: Some("TORONTO".into()),
            ..Default::default()
        };
        assert!(filter.matches(&uni("University of Toronto", "Canada", 1.0)));
        assert!(!filter.matches(&uni("McGill University", "Canada", 1.0)));
    }
}
