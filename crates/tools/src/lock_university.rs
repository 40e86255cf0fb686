//! `lockUniversity` — commit to a final choice and seed the application
//! checklist.
//!
//! Three writes, none transactional with the others:
//! 1. profile: `locked_university_id` + stage APPLICATION (failure aborts)
//! 2. matching shortlist rows flagged `is_locked` (best effort)
//! 3. the fixed checklist batch (failure leaves step 1 in place)

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use unipath_core::domain::TaskType;
use unipath_core::error::ToolError;
use unipath_core::store::{CounselStore, NewTask};
use unipath_core::tool::{Tool, ToolResult, parse_arguments};

use crate::require;

pub const LOCKED_REPLY: &str =
    "University locked! I have generated your Application Checklist. Check the dashboard.";

pub const TASKS_FAILED_REPLY: &str = "University locked, but failed to create tasks.";

/// Checklist seeded when a university is locked, in display order.
pub const APPLICATION_CHECKLIST: [(&str, TaskType); 4] = [
    ("Draft Statement of Purpose (SOP)", TaskType::AiGenerated),
    ("Request Letter of Recommendations", TaskType::AiGenerated),
    ("Prepare Financial Documents", TaskType::System),
    ("Book Visa Appointment", TaskType::System),
];

/// The checklist batch for `user_id`.
pub fn application_checklist(user_id: &str) -> Vec<NewTask> {
    APPLICATION_CHECKLIST
        .iter()
        .map(|&(title, task_type)| NewTask {
            user_id: user_id.to_string(),
            title: title.to_string(),
            task_type,
        })
        .collect()
}

pub struct LockUniversityTool {
    store: Arc<dyn CounselStore>,
}

impl LockUniversityTool {
    pub fn new(store: Arc<dyn CounselStore>) -> Self {
        Self { store }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LockArgs {
    user_id: String,
    university_id: String,
}

#[async_trait]
impl Tool for LockUniversityTool {
    fn name(&self) -> &str {
        "lockUniversity"
    }

    fn description(&self) -> &str {
        "Lock the student's final university choice and generate their application checklist. \
         Use ONLY when the student explicitly confirms a final decision."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "userId": {
                    "type": "string",
                    "description": "The student's id from the profile context"
                },
                "universityId": {
                    "type": "string",
                    "description": "The id of the chosen university"
                }
            },
            "required": ["userId", "universityId"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let args: LockArgs = parse_arguments(self.name(), arguments)?;
        let user_id = require("userId", args.user_id)?;
        let university_id = require("universityId", args.university_id)?;

        if let Err(e) = self.store.lock_profile(&user_id, &university_id).await {
            tracing::warn!(%user_id, %university_id, error = %e, "Profile lock failed");
            return Ok(ToolResult::failed(format!("Error locking: {e}")));
        }
        tracing::info!(%user_id, %university_id, "University locked");

        match self.store.lock_shortlist_entries(&user_id, &university_id).await {
            Ok(count) => tracing::debug!(count, "Shortlist entries flagged locked"),
            Err(e) => tracing::warn!(error = %e, "Could not flag shortlist entries as locked"),
        }

        let data = serde_json::json!({ "lockedUniversityId": university_id });
        match self.store.insert_tasks(application_checklist(&user_id)).await {
            Ok(tasks) => {
                tracing::info!(%user_id, count = tasks.len(), "Application checklist created");
                Ok(ToolResult::ok(LOCKED_REPLY).with_data(data))
            }
            Err(e) => {
                tracing::warn!(%user_id, error = %e, "Checklist creation failed after lock");
                Ok(ToolResult::ok(TASKS_FAILED_REPLY).with_data(data))
            }
        }
    }
}
