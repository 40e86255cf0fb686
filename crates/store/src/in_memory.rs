//! In-memory store — for tests, demos and ephemeral sessions.
//!
//! Mirrors the SQLite store's constraint behaviour (unknown users and
//! universities are rejected) and can be told to fail specific writes so
//! callers' degraded paths can be exercised.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use unipath_core::domain::{
    Profile, ShortlistEntry, ShortlistView, Stage, Task, TaskStatus, University,
};
use unipath_core::error::StoreError;
use unipath_core::store::{CounselStore, NewShortlistEntry, NewTask, OnboardingUpdate, UniversityFilter};
use uuid::Uuid;

/// Most recent search filters kept for inspection.
const SEARCH_LOG_CAPACITY: usize = 32;

#[derive(Default)]
struct State {
    profiles: HashMap<String, Profile>,
    universities: Vec<University>,
    shortlists: Vec<ShortlistEntry>,
    tasks: Vec<Task>,
}

pub struct InMemoryStore {
    state: Arc<RwLock<State>>,
    searches: Arc<RwLock<VecDeque<UniversityFilter>>>,
    fail_profile_locks: AtomicBool,
    fail_task_inserts: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(State::default())),
            searches: Arc::new(RwLock::new(VecDeque::with_capacity(SEARCH_LOG_CAPACITY))),
            fail_profile_locks: AtomicBool::new(false),
            fail_task_inserts: AtomicBool::new(false),
        }
    }

    /// Make `lock_profile` fail with a connection error.
    pub fn fail_profile_locks(&self, fail: bool) {
        self.fail_profile_locks.store(fail, Ordering::SeqCst);
    }

    /// Make `insert_tasks` fail with a connection error.
    pub fn fail_task_inserts(&self, fail: bool) {
        self.fail_task_inserts.store(fail, Ordering::SeqCst);
    }

    /// The latest filters `search_universities` has received, oldest first.
    /// Only the last 32 are kept.
    pub async fn searches(&self) -> Vec<UniversityFilter> {
        self.searches.read().await.iter().cloned().collect()
    }

    fn injected(flag: &AtomicBool, operation: &str) -> Result<(), StoreError> {
        if flag.load(Ordering::SeqCst) {
            return Err(StoreError::Connection(format!("{operation}: store unavailable")));
        }
        Ok(())
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn profile_not_found(user_id: &str) -> StoreError {
    StoreError::NotFound {
        entity: "profile",
        id: user_id.to_string(),
    }
}

#[async_trait]
impl CounselStore for InMemoryStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn get_profile(&self, user_id: &str) -> Result<Option<Profile>, StoreError> {
        Ok(self.state.read().await.profiles.get(user_id).cloned())
    }

    async fn insert_profile(&self, profile: Profile) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        if state.profiles.contains_key(&profile.id) {
            return Err(StoreError::Constraint(format!(
                "profile {} already exists",
                profile.id
            )));
        }
        state.profiles.insert(profile.id.clone(), profile);
        Ok(())
    }

    async fn upsert_onboarding(
        &self,
        user_id: &str,
        update: OnboardingUpdate,
    ) -> Result<Profile, StoreError> {
        let mut state = self.state.write().await;
        let profile = state
            .profiles
            .entry(user_id.to_string())
            .or_insert_with(|| Profile::new(user_id));

        if update.full_name.is_some() {
            profile.full_name = update.full_name;
        }
        profile.academic_data = update.academic_data;
        profile.preferences = update.preferences;
        profile.readiness_data = update.readiness_data;
        profile.current_stage = Stage::Profile;
        profile.onboarding_completed = true;
        Ok(profile.clone())
    }

    async fn set_stage(&self, user_id: &str, stage: Stage) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let profile = state
            .profiles
            .get_mut(user_id)
            .ok_or_else(|| profile_not_found(user_id))?;
        profile.current_stage = stage;
        Ok(())
    }

    async fn lock_profile(&self, user_id: &str, university_id: &str) -> Result<(), StoreError> {
        Self::injected(&self.fail_profile_locks, "lock profile")?;
        let mut state = self.state.write().await;
        let profile = state
            .profiles
            .get_mut(user_id)
            .ok_or_else(|| profile_not_found(user_id))?;
        profile.locked_university_id = Some(university_id.to_string());
        profile.current_stage = Stage::Application;
        Ok(())
    }

    async fn insert_university(&self, university: University) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        match state.universities.iter_mut().find(|u| u.id == university.id) {
            Some(existing) => *existing = university,
            None => state.universities.push(university),
        }
        Ok(())
    }

    async fn get_university(&self, id: &str) -> Result<Option<University>, StoreError> {
        let state = self.state.read().await;
        Ok(state.universities.iter().find(|u| u.id == id).cloned())
    }

    async fn search_universities(
        &self,
        filter: &UniversityFilter,
    ) -> Result<Vec<University>, StoreError> {
        {
            let mut log = self.searches.write().await;
            if log.len() == SEARCH_LOG_CAPACITY {
                log.pop_front();
            }
            log.push_back(filter.clone());
        }
        let state = self.state.read().await;
        Ok(state
            .universities
            .iter()
            .filter(|u| filter.matches(u))
            .take(filter.limit)
            .cloned()
            .collect())
    }

    async fn insert_shortlist_entry(
        &self,
        entry: NewShortlistEntry,
    ) -> Result<ShortlistEntry, StoreError> {
        let mut state = self.state.write().await;
        if !state.profiles.contains_key(&entry.user_id) {
            return Err(StoreError::Constraint(format!(
                "shortlist entry references unknown user {}",
                entry.user_id
            )));
        }
        if !state.universities.iter().any(|u| u.id == entry.university_id) {
            return Err(StoreError::Constraint(format!(
                "shortlist entry references unknown university {}",
                entry.university_id
            )));
        }

        let row = ShortlistEntry {
            id: Uuid::new_v4().to_string(),
            user_id: entry.user_id,
            university_id: entry.university_id,
            category: entry.category,
            ai_notes: entry.ai_notes,
            is_locked: false,
            created_at: Utc::now(),
        };
        state.shortlists.push(row.clone());
        Ok(row)
    }

    async fn lock_shortlist_entries(
        &self,
        user_id: &str,
        university_id: &str,
    ) -> Result<u64, StoreError> {
        let mut state = self.state.write().await;
        let mut updated = 0;
        for entry in state
            .shortlists
            .iter_mut()
            .filter(|e| e.user_id == user_id && e.university_id == university_id)
        {
            entry.is_locked = true;
            updated += 1;
        }
        Ok(updated)
    }

    async fn list_shortlist(&self, user_id: &str) -> Result<Vec<ShortlistView>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .shortlists
            .iter()
            .filter(|e| e.user_id == user_id)
            .map(|entry| ShortlistView {
                university: state
                    .universities
                    .iter()
                    .find(|u| u.id == entry.university_id)
                    .cloned(),
                entry: entry.clone(),
            })
            .collect())
    }

    async fn insert_tasks(&self, tasks: Vec<NewTask>) -> Result<Vec<Task>, StoreError> {
        Self::injected(&self.fail_task_inserts, "insert tasks")?;
        let mut state = self.state.write().await;
        if let Some(orphan) = tasks.iter().find(|t| !state.profiles.contains_key(&t.user_id)) {
            return Err(StoreError::Constraint(format!(
                "task references unknown user {}",
                orphan.user_id
            )));
        }

        let created_at = Utc::now();
        let rows: Vec<Task> = tasks
            .into_iter()
            .map(|t| Task {
                id: Uuid::new_v4().to_string(),
                user_id: t.user_id,
                title: t.title,
                task_type: t.task_type,
                status: TaskStatus::Pending,
                created_at,
            })
            .collect();
        state.tasks.extend(rows.iter().cloned());
        Ok(rows)
    }

    async fn list_tasks(&self, user_id: &str) -> Result<Vec<Task>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .tasks
            .iter()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn toggle_task(&self, task_id: &str) -> Result<Task, StoreError> {
        let mut state = self.state.write().await;
        let task = state
            .tasks
            .iter_mut()
            .find(|t| t.id == task_id)
            .ok_or_else(|| StoreError::NotFound {
                entity: "task",
                id: task_id.to_string(),
            })?;
        task.status = task.status.toggled();
        Ok(task.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use unipath_core::domain::{Category, TaskType};

    async fn store_with_user() -> InMemoryStore {
        let store = InMemoryStore::new();
        store.insert_profile(Profile::new("u1")).await.unwrap();
        store
            .insert_university(University {
                id: "leeds".into(),
                name: "University of Leeds".into(),
                country: "UK".into(),
                tuition_fee: 28000.0,
                acceptance_rate: 65.0,
            })
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn searches_are_recorded() {
        let store = store_with_user().await;
        let filter = UniversityFilter {
            country: Some("UK".into()),
            max_tuition: Some(15000.0),
            name_contains: None,
            limit: 5,
        };
        let results = store.search_universities(&filter).await.unwrap();
        assert!(results.is_empty());
        assert_eq!(store.searches().await, vec![filter]);
    }

    #[tokio::test]
    async fn search_log_keeps_only_the_latest_filters() {
        let store = InMemoryStore::new();
        for limit in 1..=(SEARCH_LOG_CAPACITY + 8) {
            let filter = UniversityFilter {
                limit,
                ..Default::default()
            };
            store.search_universities(&filter).await.unwrap();
        }

        let searches = store.searches().await;
        assert_eq!(searches.len(), SEARCH_LOG_CAPACITY);
        assert_eq!(searches[0].limit, 9);
        assert_eq!(searches.last().unwrap().limit, SEARCH_LOG_CAPACITY + 8);
    }

    #[tokio::test]
    async fn duplicate_profile_is_constraint_error() {
        let store = store_with_user().await;
        let err = store.insert_profile(Profile::new("u1")).await.unwrap_err();
        assert!(matches!(err, StoreError::Constraint(_)));
    }

    #[tokio::test]
    async fn injected_task_failure_leaves_no_rows() {
        let store = store_with_user().await;
        store.fail_task_inserts(true);
        let err = store
            .insert_tasks(vec![NewTask {
                user_id: "u1".into(),
                title: "Book Visa Appointment".into(),
                task_type: TaskType::System,
            }])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Connection(_)));
        assert!(store.list_tasks("u1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn shortlist_rejects_unknown_user() {
        let store = store_with_user().await;
        let err = store
            .insert_shortlist_entry(NewShortlistEntry {
                user_id: "ghost".into(),
                university_id: "leeds".into(),
                category: Category::Safe,
                ai_notes: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Constraint(_)));
    }

    #[tokio::test]
    async fn shortlist_view_joins_university() {
        let store = store_with_user().await;
        store
            .insert_shortlist_entry(NewShortlistEntry {
                user_id: "u1".into(),
                university_id: "leeds".into(),
                category: Category::Target,
                ai_notes: None,
            })
            .await
            .unwrap();
        let views = store.list_shortlist("u1").await.unwrap();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].university.as_ref().unwrap().country, "UK");
    }
}
