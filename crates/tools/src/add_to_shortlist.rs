//! `addToShortlist` — record the student's interest in a university.
//!
//! No dedup: the same call twice creates two rows.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use unipath_core::domain::Category;
use unipath_core::error::ToolError;
use unipath_core::store::{CounselStore, NewShortlistEntry};
use unipath_core::tool::{Tool, ToolResult, parse_arguments};

use crate::{non_blank, require};

pub struct AddToShortlistTool {
    store: Arc<dyn CounselStore>,
}

impl AddToShortlistTool {
    pub fn new(store: Arc<dyn CounselStore>) -> Self {
        Self { store }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ShortlistArgs {
    user_id: String,
    university_id: String,
    category: String,
    #[serde(default)]
    reason: Option<String>,
}

#[async_trait]
impl Tool for AddToShortlistTool {
    fn name(&self) -> &str {
        "addToShortlist"
    }

    fn description(&self) -> &str {
        "Add a university to the student's shortlist, tagged SAFE, TARGET or DREAM. \
         Use when the student expresses interest in a specific university."
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
                    "description": "The id of a university returned by searchUniversities"
                },
                "category": {
                    "type": "string",
                    "enum": ["DREAM", "TARGET", "SAFE"],
                    "description": "Admission likelihood given the student's profile"
                },
                "reason": {
                    "type": "string",
                    "description": "Short note on why this university fits"
                }
            },
            "required": ["userId", "universityId", "category", "reason"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let args: ShortlistArgs = parse_arguments(self.name(), arguments)?;
        let user_id = require("userId", args.user_id)?;
        let university_id = require("universityId", args.university_id)?;
        let category: Category = args
            .category
            .parse()
            .map_err(ToolError::InvalidArguments)?;

        let entry = NewShortlistEntry {
            user_id,
            university_id,
            category,
            ai_notes: non_blank(args.reason),
        };

        match self.store.insert_shortlist_entry(entry).await {
            Ok(row) => {
                tracing::info!(
                    user_id = %row.user_id,
                    university_id = %row.university_id,
                    category = %row.category,
                    "Shortlist entry added"
                );
                Ok(ToolResult::ok("Added to shortlist.")
                    .with_data(serde_json::json!({ "shortlistId": row.id })))
            }
            Err(e) => {
                tracing::warn!(error = %e, "Shortlist insert failed");
                Ok(ToolResult::failed(format!("Error: {e}")))
            }
        }
    }
}
