//! `searchUniversities` — read-only catalog search.
//!
//! Filters combine with AND: exact country, inclusive tuition ceiling,
//! case-insensitive name substring. An empty result is a normal outcome and
//! comes back as [`NO_RESULTS_MARKER`], never as an error.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use unipath_core::domain::FlexValue;
use unipath_core::error::ToolError;
use unipath_core::store::{CounselStore, UniversityFilter};
use unipath_core::tool::{Tool, ToolResult, parse_arguments};

use crate::non_blank;

/// Returned to the model when no catalog row matches.
pub const NO_RESULTS_MARKER: &str =
    "No universities found. Do not invent universities; tell the student nothing matched.";

pub struct SearchUniversitiesTool {
    store: Arc<dyn CounselStore>,
    limit: usize,
}

impl SearchUniversitiesTool {
    pub fn new(store: Arc<dyn CounselStore>, limit: usize) -> Self {
        Self {
            store,
            limit: limit.max(1),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchArgs {
    #[serde(default)]
    query: Option<String>,
    /// Models send this as a number or a numeric string
    #[serde(default)]
    max_budget: Option<FlexValue>,
    #[serde(default)]
    country: Option<String>,
}

impl SearchArgs {
    fn into_filter(self, limit: usize) -> Result<UniversityFilter, ToolError> {
        let max_tuition = match self.max_budget.filter(|b| !b.is_blank()) {
            None => None,
            Some(budget) => {
                let value = budget.as_f64().ok_or_else(|| {
                    ToolError::InvalidArguments(format!("maxBudget '{budget}' is not a number"))
                })?;
                if value < 0.0 || !value.is_finite() {
                    return Err(ToolError::InvalidArguments(format!(
                        "maxBudget must be a non-negative number, got {value}"
                    )));
                }
                // Zero means "no budget given", as in the discovery listing
                (value > 0.0).then_some(value)
            }
        };

        Ok(UniversityFilter {
            name_contains: non_blank(self.query),
            max_tuition,
            country: non_blank(self.country),
            limit,
        })
    }
}

#[async_trait]
impl Tool for SearchUniversitiesTool {
    fn name(&self) -> &str {
        "searchUniversities"
    }

    fn description(&self) -> &str {
        "Search the university catalog by name, maximum annual tuition budget (USD), or country. \
         Only universities returned by this tool may be recommended."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Part of the university name, e.g. 'Toronto'"
                },
                "maxBudget": {
                    "type": "number",
                    "description": "Maximum annual tuition fee in USD (inclusive)"
                },
                "country": {
                    "type": "string",
                    "description": "Exact country name, e.g. 'UK', 'Canada', 'USA'"
                }
            }
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let args: SearchArgs = parse_arguments(self.name(), arguments)?;
        let filter = args.into_filter(self.limit)?;

        match self.store.search_universities(&filter).await {
            Ok(rows) if rows.is_empty() => {
                tracing::debug!(?filter, "Catalog search returned nothing");
                Ok(ToolResult::ok(NO_RESULTS_MARKER))
            }
            Ok(rows) => {
                let data = serde_json::to_value(&rows)
                    .map_err(|e| ToolError::ExecutionFailed {
                        tool_name: self.name().into(),
                        reason: e.to_string(),
                    })?;
                let output = serde_json::to_string_pretty(&rows).unwrap_or_default();
                Ok(ToolResult::ok(output).with_data(data))
            }
            Err(e) => {
                tracing::warn!(error = %e, "Catalog search failed");
                Ok(ToolResult::failed(format!("Error: {e}")))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use unipath_core::domain::University;
    use unipath_store::InMemoryStore;

    async fn catalog() -> Arc<InMemoryStore> {
        let store = Arc::new(InMemoryStore::new());
        for (id, name, country, fee) in [
            ("coventry", "Coventry University", "UK", 14500.0),
            ("hallam", "Sheffield Hallam University", "UK", 15000.0),
            ("leeds", "University of Leeds", "UK", 28000.0),
            ("uoft", "University of Toronto", "Canada", 45000.0),
            ("dal", "Dalhousie University", "Canada", 22000.0),
        ] {
            store
                .insert_university(University {
                    id: id.into(),
                    name: name.into(),
                    country: country.into(),
                    tuition_fee: fee,
                    acceptance_rate: 50.0,
                })
                .await
                .unwrap();
        }
        store
    }

    fn rows(result: &ToolResult) -> Vec<University> {
        serde_json::from_value(result.data.clone().unwrap()).unwrap()
    }

    #[tokio::test]
    async fn tool_definition() {
        let tool = SearchUniversitiesTool::new(catalog().await, 5);
        assert_eq!(tool.name(), "searchUniversities");
        let schema = tool.parameters_schema();
        assert!(schema["properties"]["maxBudget"].is_object());
        assert!(schema.get("required").is_none());
    }

    #[tokio::test]
    async fn budget_is_an_inclusive_ceiling() {
        let tool = SearchUniversitiesTool::new(catalog().await, 5);
        let result = tool
            .execute(serde_json::json!({"maxBudget": 15000}))
            .await
            .unwrap();
        assert!(result.success);
        let found = rows(&result);
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|u| u.tuition_fee <= 15000.0));
    }

    #[tokio::test]
    async fn country_matches_exactly() {
        let tool = SearchUniversitiesTool::new(catalog().await, 5);
        let result = tool
            .execute(serde_json::json!({"country": "Canada"}))
            .await
            .unwrap();
        assert!(rows(&result).iter().all(|u| u.country == "Canada"));

        let result = tool
            .execute(serde_json::json!({"country": "canada"}))
            .await
            .unwrap();
        assert_eq!(result.output, NO_RESULTS_MARKER);
    }

    #[tokio::test]
    async fn empty_country_returns_marker_not_error() {
        let tool = SearchUniversitiesTool::new(catalog().await, 5);
        let result = tool
            .execute(serde_json::json!({"country": "Germany"}))
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.output, NO_RESULTS_MARKER);
        assert!(result.data.is_none());
    }

    #[tokio::test]
    async fn name_query_is_case_insensitive() {
        let tool = SearchUniversitiesTool::new(catalog().await, 5);
        let result = tool
            .execute(serde_json::json!({"query": "TORONTO"}))
            .await
            .unwrap();
        assert_eq!(rows(&result)[0].id, "uoft");
    }

    #[tokio::test]
    async fn limit_caps_results() {
        let tool = SearchUniversitiesTool::new(catalog().await, 3);
        let result = tool.execute(serde_json::json!({})).await.unwrap();
        assert_eq!(rows(&result).len(), 3);
    }

    #[tokio::test]
    async fn blank_strings_and_numeric_strings_are_normalised() {
        let store = catalog().await;
        let tool = SearchUniversitiesTool::new(store.clone(), 5);
        tool.execute(serde_json::json!({"query": "  ", "country": "UK", "maxBudget": "15000"}))
            .await
            .unwrap();

        let searches = store.searches().await;
        assert_eq!(
            searches[0],
            UniversityFilter {
                name_contains: None,
                max_tuition: Some(15000.0),
                country: Some("UK".into()),
                limit: 5,
            }
        );
    }

    #[tokio::test]
    async fn zero_budget_means_no_ceiling() {
        let store = catalog().await;
        let tool = SearchUniversitiesTool::new(store.clone(), 5);
        let result = tool
            .execute(serde_json::json!({"country": "UK", "maxBudget": 0}))
            .await
            .unwrap();

        assert_eq!(rows(&result).len(), 3);
        assert_eq!(store.searches().await[0].max_tuition, None);
    }

    #[tokio::test]
    async fn negative_budget_is_invalid() {
        let tool = SearchUniversitiesTool::new(catalog().await, 5);
        let err = tool
            .execute(serde_json::json!({"maxBudget": -1}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn non_numeric_budget_is_invalid() {
        let tool = SearchUniversitiesTool::new(catalog().await, 5);
        let err = tool
            .execute(serde_json::json!({"maxBudget": "cheap"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}
