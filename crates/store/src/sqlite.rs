//! SQLite store.
//!
//! One database file with four tables:
//! - `profiles` — one row per student; academic/preference/readiness blobs
//!   are JSON text
//! - `universities` — the read-only catalog
//! - `shortlists` — user ↔ university associations
//! - `tasks` — application checklist items
//!
//! Foreign keys are enforced, so shortlist and task rows for unknown users
//! (or unknown universities) fail with [`StoreError::Constraint`].

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::error::ErrorKind;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info};
use unipath_core::domain::{
    Category, Profile, ShortlistEntry, ShortlistView, Stage, Task, TaskStatus, TaskType,
    University,
};
use unipath_core::error::StoreError;
use unipath_core::store::{CounselStore, NewShortlistEntry, NewTask, OnboardingUpdate, UniversityFilter};
use uuid::Uuid;

const PROFILE_COLUMNS: &str = "id, full_name, academic_data, preferences, readiness_data, \
     current_stage, locked_university_id, onboarding_completed";

const TASK_COLUMNS: &str = "id, user_id, title, type, status, created_at";

/// A production SQLite store.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) the database at `url` and run migrations.
    ///
    /// Accepts sqlx connection strings: `sqlite://unipath.db`,
    /// `sqlite::memory:` for an ephemeral database (tests, demos).
    pub async fn new(url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| StoreError::Connection(format!("Invalid SQLite URL: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .pragma("foreign_keys", "ON");

        // Every connection to `:memory:` is its own database
        let in_memory = url.contains(":memory:");
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(4)
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Connection(format!("Failed to open SQLite: {e}")))?;

        let store = Self { pool };
        store.run_migrations().await?;
        info!(url, "SQLite store initialized");
        Ok(store)
    }

    /// Create from an existing pool.
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), StoreError> {
        let statements: [(&str, &str); 6] = [
            (
                "profiles table",
                r#"
                CREATE TABLE IF NOT EXISTS profiles (
                    id                   TEXT PRIMARY KEY NOT NULL,
                    full_name            TEXT,
                    academic_data        TEXT NOT NULL DEFAULT '{}',
                    preferences          TEXT NOT NULL DEFAULT '{}',
                    readiness_data       TEXT NOT NULL DEFAULT '{}',
                    current_stage        TEXT NOT NULL DEFAULT 'PROFILE',
                    locked_university_id TEXT,
                    onboarding_completed INTEGER NOT NULL DEFAULT 0,
                    updated_at           TEXT NOT NULL
                )
                "#,
            ),
            (
                "universities table",
                r#"
                CREATE TABLE IF NOT EXISTS universities (
                    id              TEXT PRIMARY KEY NOT NULL,
                    name            TEXT NOT NULL,
                    country         TEXT NOT NULL,
                    tuition_fee     REAL NOT NULL,
                    acceptance_rate REAL NOT NULL
                )
                "#,
            ),
            (
                "shortlists table",
                r#"
                CREATE TABLE IF NOT EXISTS shortlists (
                    iid           INTEGER PRIMARY KEY AUTOINCREMENT,
                    id            TEXT UNIQUE NOT NULL,
                    user_id       TEXT NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
                    university_id TEXT NOT NULL REFERENCES universities(id),
                    category      TEXT NOT NULL CHECK (category IN ('SAFE', 'TARGET', 'DREAM')),
                    ai_notes      TEXT,
                    is_locked     INTEGER NOT NULL DEFAULT 0,
                    created_at    TEXT NOT NULL
                )
                "#,
            ),
            (
                "tasks table",
                r#"
                CREATE TABLE IF NOT EXISTS tasks (
                    iid        INTEGER PRIMARY KEY AUTOINCREMENT,
                    id         TEXT UNIQUE NOT NULL,
                    user_id    TEXT NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
                    title      TEXT NOT NULL,
                    type       TEXT NOT NULL,
                    status     TEXT NOT NULL DEFAULT 'PENDING'
                               CHECK (status IN ('PENDING', 'DONE')),
                    created_at TEXT NOT NULL
                )
                "#,
            ),
            (
                "shortlists index",
                "CREATE INDEX IF NOT EXISTS idx_shortlists_user ON shortlists(user_id, created_at)",
            ),
            (
                "tasks index",
                "CREATE INDEX IF NOT EXISTS idx_tasks_user ON tasks(user_id, created_at)",
            ),
        ];

        for (label, sql) in statements {
            sqlx::query(sql)
                .execute(&self.pool)
                .await
                .map_err(|e| StoreError::Migration(format!("{label}: {e}")))?;
        }

        debug!("SQLite migrations complete");
        Ok(())
    }

    fn row_to_profile(row: &sqlx::sqlite::SqliteRow) -> Result<Profile, StoreError> {
        let academic: String = column(row, "academic_data")?;
        let preferences: String = column(row, "preferences")?;
        let readiness: String = column(row, "readiness_data")?;
        let stage: String = column(row, "current_stage")?;

        Ok(Profile {
            id: column(row, "id")?,
            full_name: column(row, "full_name")?,
            academic_data: parse_json("academic_data", &academic)?,
            preferences: parse_json("preferences", &preferences)?,
            readiness_data: parse_json("readiness_data", &readiness)?,
            current_stage: stage.parse::<Stage>().map_err(StoreError::Query)?,
            locked_university_id: column(row, "locked_university_id")?,
            onboarding_completed: column(row, "onboarding_completed")?,
        })
    }

    fn row_to_university(row: &sqlx::sqlite::SqliteRow) -> Result<University, StoreError> {
        Ok(University {
            id: column(row, "id")?,
            name: column(row, "name")?,
            country: column(row, "country")?,
            tuition_fee: column(row, "tuition_fee")?,
            acceptance_rate: column(row, "acceptance_rate")?,
        })
    }

    fn row_to_shortlist(row: &sqlx::sqlite::SqliteRow) -> Result<ShortlistEntry, StoreError> {
        let category: String = column(row, "category")?;
        let created_at: String = column(row, "created_at")?;
        Ok(ShortlistEntry {
            id: column(row, "id")?,
            user_id: column(row, "user_id")?,
            university_id: column(row, "university_id")?,
            category: category.parse::<Category>().map_err(StoreError::Query)?,
            ai_notes: column(row, "ai_notes")?,
            is_locked: column(row, "is_locked")?,
            created_at: parse_timestamp(&created_at),
        })
    }

    fn row_to_task(row: &sqlx::sqlite::SqliteRow) -> Result<Task, StoreError> {
        let task_type: String = column(row, "type")?;
        let status: String = column(row, "status")?;
        let created_at: String = column(row, "created_at")?;
        Ok(Task {
            id: column(row, "id")?,
            user_id: column(row, "user_id")?,
            title: column(row, "title")?,
            task_type: task_type.parse::<TaskType>().map_err(StoreError::Query)?,
            status: status.parse::<TaskStatus>().map_err(StoreError::Query)?,
            created_at: parse_timestamp(&created_at),
        })
    }
}

fn column<'r, T>(row: &'r sqlx::sqlite::SqliteRow, name: &str) -> Result<T, StoreError>
where
    T: sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get(name)
        .map_err(|e| StoreError::Query(format!("{name} column: {e}")))
}

fn parse_json<T: serde::de::DeserializeOwned>(name: &str, raw: &str) -> Result<T, StoreError> {
    serde_json::from_str(raw).map_err(|e| StoreError::Query(format!("{name} is not valid JSON: {e}")))
}

fn to_json<T: serde::Serialize>(name: &str, value: &T) -> Result<String, StoreError> {
    serde_json::to_string(value).map_err(|e| StoreError::Query(format!("{name} serialization: {e}")))
}

/// Fixed-width UTC timestamps so text ordering matches time ordering.
fn timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn query_error(context: &str, e: sqlx::Error) -> StoreError {
    if matches!(
        e,
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)
    ) {
        return StoreError::Connection(format!("{context}: {e}"));
    }

    match e.as_database_error().map(|d| d.kind()) {
        Some(
            ErrorKind::ForeignKeyViolation
            | ErrorKind::UniqueViolation
            | ErrorKind::CheckViolation
            | ErrorKind::NotNullViolation,
        ) => StoreError::Constraint(format!("{context}: {e}")),
        _ => StoreError::Query(format!("{context}: {e}")),
    }
}

#[async_trait]
impl CounselStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn get_profile(&self, user_id: &str) -> Result<Option<Profile>, StoreError> {
        let sql = format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| query_error("get profile", e))?;

        row.as_ref().map(Self::row_to_profile).transpose()
    }

    async fn insert_profile(&self, profile: Profile) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO profiles (id, full_name, academic_data, preferences, readiness_data,
                                  current_stage, locked_university_id, onboarding_completed, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&profile.id)
        .bind(&profile.full_name)
        .bind(to_json("academic_data", &profile.academic_data)?)
        .bind(to_json("preferences", &profile.preferences)?)
        .bind(to_json("readiness_data", &profile.readiness_data)?)
        .bind(profile.current_stage.as_str())
        .bind(&profile.locked_university_id)
        .bind(profile.onboarding_completed)
        .bind(timestamp(Utc::now()))
        .execute(&self.pool)
        .await
        .map_err(|e| query_error("insert profile", e))?;

        debug!(user_id = %profile.id, "Profile created");
        Ok(())
    }

    async fn upsert_onboarding(
        &self,
        user_id: &str,
        update: OnboardingUpdate,
    ) -> Result<Profile, StoreError> {
        sqlx::query(
            r#"
            INSERT INTO profiles (id, full_name, academic_data, preferences, readiness_data,
                                  current_stage, onboarding_completed, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, 'PROFILE', 1, ?6)
            ON CONFLICT(id) DO UPDATE SET
                full_name = COALESCE(excluded.full_name, profiles.full_name),
                academic_data = excluded.academic_data,
                preferences = excluded.preferences,
                readiness_data = excluded.readiness_data,
                current_stage = 'PROFILE',
                onboarding_completed = 1,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(user_id)
        .bind(&update.full_name)
        .bind(to_json("academic_data", &update.academic_data)?)
        .bind(to_json("preferences", &update.preferences)?)
        .bind(to_json("readiness_data", &update.readiness_data)?)
        .bind(timestamp(Utc::now()))
        .execute(&self.pool)
        .await
        .map_err(|e| query_error("upsert onboarding", e))?;

        self.get_profile(user_id)
            .await?
            .ok_or_else(|| StoreError::NotFound {
                entity: "profile",
                id: user_id.to_string(),
            })
    }

    async fn set_stage(&self, user_id: &str, stage: Stage) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE profiles SET current_stage = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(user_id)
            .bind(stage.as_str())
            .bind(timestamp(Utc::now()))
            .execute(&self.pool)
            .await
            .map_err(|e| query_error("set stage", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: "profile",
                id: user_id.to_string(),
            });
        }
        Ok(())
    }

    async fn lock_profile(&self, user_id: &str, university_id: &str) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE profiles
            SET locked_university_id = ?2, current_stage = 'APPLICATION', updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(user_id)
        .bind(university_id)
        .bind(timestamp(Utc::now()))
        .execute(&self.pool)
        .await
        .map_err(|e| query_error("lock profile", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: "profile",
                id: user_id.to_string(),
            });
        }
        Ok(())
    }

    async fn insert_university(&self, university: University) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO universities (id, name, country, tuition_fee, acceptance_rate)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                country = excluded.country,
                tuition_fee = excluded.tuition_fee,
                acceptance_rate = excluded.acceptance_rate
            "#,
        )
        .bind(&university.id)
        .bind(&university.name)
        .bind(&university.country)
        .bind(university.tuition_fee)
        .bind(university.acceptance_rate)
        .execute(&self.pool)
        .await
        .map_err(|e| query_error("insert university", e))?;
        Ok(())
    }

    async fn get_university(&self, id: &str) -> Result<Option<University>, StoreError> {
        let row = sqlx::query(
            "SELECT id, name, country, tuition_fee, acceptance_rate FROM universities WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| query_error("get university", e))?;

        row.as_ref().map(Self::row_to_university).transpose()
    }

    async fn search_universities(
        &self,
        filter: &UniversityFilter,
    ) -> Result<Vec<University>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, country, tuition_fee, acceptance_rate
            FROM universities
            WHERE (?1 IS NULL OR country = ?1)
              AND (?2 IS NULL OR tuition_fee <= ?2)
              AND (?3 IS NULL OR instr(LOWER(name), LOWER(?3)) > 0)
            ORDER BY rowid
            LIMIT ?4
            "#,
        )
        .bind(&filter.country)
        .bind(filter.max_tuition)
        .bind(&filter.name_contains)
        .bind(filter.limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| query_error("search universities", e))?;

        debug!(
            country = ?filter.country,
            max_tuition = ?filter.max_tuition,
            query = ?filter.name_contains,
            hits = rows.len(),
            "Catalog search"
        );

        rows.iter().map(Self::row_to_university).collect()
    }

    async fn insert_shortlist_entry(
        &self,
        entry: NewShortlistEntry,
    ) -> Result<ShortlistEntry, StoreError> {
        let row = ShortlistEntry {
            id: Uuid::new_v4().to_string(),
            user_id: entry.user_id,
            university_id: entry.university_id,
            category: entry.category,
            ai_notes: entry.ai_notes,
            is_locked: false,
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO shortlists (id, user_id, university_id, category, ai_notes, is_locked, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)
            "#,
        )
        .bind(&row.id)
        .bind(&row.user_id)
        .bind(&row.university_id)
        .bind(row.category.as_str())
        .bind(&row.ai_notes)
        .bind(timestamp(row.created_at))
        .execute(&self.pool)
        .await
        .map_err(|e| query_error("insert shortlist entry", e))?;

        Ok(row)
    }

    async fn lock_shortlist_entries(
        &self,
        user_id: &str,
        university_id: &str,
    ) -> Result<u64, StoreError> {
        let result = sqlx::query(
            "UPDATE shortlists SET is_locked = 1 WHERE user_id = ?1 AND university_id = ?2",
        )
        .bind(user_id)
        .bind(university_id)
        .execute(&self.pool)
        .await
        .map_err(|e| query_error("lock shortlist entries", e))?;

        Ok(result.rows_affected())
    }

    async fn list_shortlist(&self, user_id: &str) -> Result<Vec<ShortlistView>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT s.id, s.user_id, s.university_id, s.category, s.ai_notes, s.is_locked, s.created_at,
                   u.name AS u_name, u.country AS u_country,
                   u.tuition_fee AS u_tuition_fee, u.acceptance_rate AS u_acceptance_rate
            FROM shortlists s
            LEFT JOIN universities u ON u.id = s.university_id
            WHERE s.user_id = ?1
            ORDER BY s.created_at ASC, s.iid ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| query_error("list shortlist", e))?;

        rows.iter()
            .map(|row| {
                let entry = Self::row_to_shortlist(row)?;
                let name: Option<String> = column(row, "u_name")?;
                let university = match name {
                    Some(name) => Some(University {
                        id: entry.university_id.clone(),
                        name,
                        country: column(row, "u_country")?,
                        tuition_fee: column(row, "u_tuition_fee")?,
                        acceptance_rate: column(row, "u_acceptance_rate")?,
                    }),
                    None => None,
                };
                Ok(ShortlistView { entry, university })
            })
            .collect()
    }

    async fn insert_tasks(&self, tasks: Vec<NewTask>) -> Result<Vec<Task>, StoreError> {
        if tasks.is_empty() {
            return Ok(Vec::new());
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

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| query_error("begin task batch", e))?;

        for task in &rows {
            sqlx::query(
                r#"
                INSERT INTO tasks (id, user_id, title, type, status, created_at)
                VALUES (?1, ?2, ?3, ?4, 'PENDING', ?5)
                "#,
            )
            .bind(&task.id)
            .bind(&task.user_id)
            .bind(&task.title)
            .bind(task.task_type.as_str())
            .bind(timestamp(task.created_at))
            .execute(&mut *tx)
            .await
            .map_err(|e| query_error("insert task", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| query_error("commit task batch", e))?;

        debug!(count = rows.len(), "Tasks inserted");
        Ok(rows)
    }

    async fn list_tasks(&self, user_id: &str) -> Result<Vec<Task>, StoreError> {
        let sql = format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE user_id = ?1 ORDER BY created_at ASC, iid ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| query_error("list tasks", e))?;

        rows.iter().map(Self::row_to_task).collect()
    }

    async fn toggle_task(&self, task_id: &str) -> Result<Task, StoreError> {
        let sql = format!(
            "UPDATE tasks \
             SET status = CASE status WHEN 'PENDING' THEN 'DONE' ELSE 'PENDING' END \
             WHERE id = ?1 RETURNING {TASK_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(task_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| query_error("toggle task", e))?;

        match row {
            Some(row) => Self::row_to_task(&row),
            None => Err(StoreError::NotFound {
                entity: "task",
                id: task_id.to_string(),
            }),
        }
    }
}
