//! The counselling tools the model can call.
//!
//! Every tool talks to the injected [`CounselStore`]; none holds state of its
//! own. Wire names (`searchUniversities`, `addToShortlist`, `lockUniversity`)
//! are what the model sees.

pub mod add_to_shortlist;
pub mod lock_university;
pub mod search_universities;

pub use add_to_shortlist::AddToShortlistTool;
pub use lock_university::{LockUniversityTool, application_checklist};
pub use search_universities::{NO_RESULTS_MARKER, SearchUniversitiesTool};

use std::sync::Arc;
use unipath_core::error::ToolError;
use unipath_core::store::CounselStore;
use unipath_core::tool::ToolRegistry;

pub const DEFAULT_SEARCH_LIMIT: usize = 5;

/// Registry with the three counselling tools, in schema order.
pub fn counsel_registry(store: Arc<dyn CounselStore>, search_limit: usize) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(SearchUniversitiesTool::new(
        store.clone(),
        search_limit,
    )));
    registry.register(Box::new(AddToShortlistTool::new(store.clone())));
    registry.register(Box::new(LockUniversityTool::new(store)));
    registry
}

/// Trimmed value, or `None` when blank.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

pub(crate) fn require(field: &str, value: String) -> Result<String, ToolError> {
    non_blank(Some(value))
        .ok_or_else(|| ToolError::InvalidArguments(format!("{field} must not be empty")))
}
