//! Dashboard-side effects: stage moves, onboarding, manual tasks, discovery
//! listing and manual shortlisting.
//!
//! Stage writes are plain: nothing checks that the previous stage's work is
//! done. The only coupling between shortlist locks and the APPLICATION stage
//! lives in the `lockUniversity` tool.

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tracing::info;
use unipath_core::domain::{Category, Profile, ShortlistEntry, Stage, Task, TaskType, University};
use unipath_core::error::StoreError;
use unipath_core::event::{DomainEvent, EventBus};
use unipath_core::store::{
    CounselStore, NewShortlistEntry, NewTask, OnboardingUpdate, UniversityFilter,
};

pub use unipath_tools::application_checklist;

/// Cards shown on the discovery grid.
pub const DISCOVERY_LIMIT: usize = 6;

pub const MANUAL_SHORTLIST_NOTE: &str = "Added manually from discovery grid.";

#[derive(Debug, Error)]
pub enum StageError {
    #[error("Invalid request: {0}")]
    Invalid(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A catalog row tagged for the discovery grid.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscoveryCard {
    #[serde(flatten)]
    pub university: University,
    #[serde(rename = "match")]
    pub tag: Category,
}

/// Set the user's stage to `target`, whatever it was before.
pub async fn advance(
    store: &dyn CounselStore,
    bus: &EventBus,
    user_id: &str,
    target: Stage,
) -> Result<(), StageError> {
    store.set_stage(user_id, target).await?;
    info!(user_id, stage = %target, "Stage changed");
    publish_stage(bus, user_id, target);
    Ok(())
}

/// Save onboarding answers; the profile lands in PROFILE with onboarding
/// marked complete.
pub async fn complete_onboarding(
    store: &dyn CounselStore,
    bus: &EventBus,
    user_id: &str,
    update: OnboardingUpdate,
) -> Result<Profile, StageError> {
    let profile = store.upsert_onboarding(user_id, update).await?;
    info!(user_id, "Onboarding completed");
    publish_stage(bus, user_id, profile.current_stage);
    Ok(profile)
}

pub async fn add_manual_task(
    store: &dyn CounselStore,
    user_id: &str,
    title: &str,
) -> Result<Task, StageError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(StageError::Invalid("task title must not be empty".into()));
    }

    let mut created = store
        .insert_tasks(vec![NewTask {
            user_id: user_id.to_string(),
            title: title.to_string(),
            task_type: TaskType::Manual,
        }])
        .await?;
    created
        .pop()
        .ok_or_else(|| StageError::Store(StoreError::Query("task insert returned no row".into())))
}

/// Flip a task between PENDING and DONE.
pub async fn toggle_task(store: &dyn CounselStore, task_id: &str) -> Result<Task, StageError> {
    Ok(store.toggle_task(task_id).await?)
}

/// Discovery grid: up to six catalog rows, tagged by acceptance rate.
///
/// `Any`/`Global` (or no country) skips the country filter; a budget only
/// filters when it is positive.
pub async fn discovery_listing(
    store: &dyn CounselStore,
    country: Option<&str>,
    max_budget: Option<f64>,
) -> Result<Vec<DiscoveryCard>, StageError> {
    let country = country
        .map(str::trim)
        .filter(|c| !c.is_empty() && *c != "Any" && *c != "Global")
        .map(str::to_string);
    let filter = UniversityFilter {
        name_contains: None,
        max_tuition: max_budget.filter(|b| *b > 0.0),
        country,
        limit: DISCOVERY_LIMIT,
    };

    let rows = store.search_universities(&filter).await?;
    Ok(rows
        .into_iter()
        .map(|university| DiscoveryCard {
            tag: Category::from_acceptance_rate(university.acceptance_rate),
            university,
        })
        .collect())
}

/// Shortlist a university from the discovery grid.
pub async fn shortlist_manually(
    store: &dyn CounselStore,
    user_id: &str,
    university_id: &str,
    category: Category,
    notes: Option<String>,
) -> Result<ShortlistEntry, StageError> {
    let university_id = university_id.trim();
    if university_id.is_empty() {
        return Err(StageError::Invalid("universityId must not be empty".into()));
    }
    if store.get_university(university_id).await?.is_none() {
        return Err(StoreError::NotFound {
            entity: "university",
            id: university_id.to_string(),
        }
        .into());
    }
    let notes = notes
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| MANUAL_SHORTLIST_NOTE.to_string());

    Ok(store
        .insert_shortlist_entry(NewShortlistEntry {
            user_id: user_id.to_string(),
            university_id: university_id.to_string(),
            category,
            ai_notes: Some(notes),
        })
        .await?)
}

fn publish_stage(bus: &EventBus, user_id: &str, stage: Stage) {
    bus.publish(DomainEvent::StageChanged {
        user_id: user_id.to_string(),
        stage,
        timestamp: Utc::now(),
    });
}
