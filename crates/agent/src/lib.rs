//! The counselling agent.
//!
//! One chat turn runs a **profile → prompt → model ⇄ tools** cycle:
//!
//! 1. **Load** the student's profile (missing profile → empty one)
//! 2. **Render** the profile context block and assemble the system prompt
//! 3. **Trim** the client-submitted history to the most recent turns
//! 4. **Ask the model**; if it requests tools, run them in order, append the
//!    results and ask again
//! 5. **Return** the first plain-text answer
//!
//! The loop stops early with a give-up reply once the iteration cap is hit.
//! [`stage`] holds the dashboard's non-conversational writes.

pub mod history;
pub mod loop_runner;
pub mod profile_context;
pub mod prompt;
pub mod stage;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use history::{HISTORY_LIMIT, truncate_history};
pub use loop_runner::{CounselAgent, DEFAULT_MAX_ITERATIONS, ITERATION_LIMIT_REPLY, TurnOutcome};
pub use profile_context::build_profile_context;
pub use prompt::assemble_system_prompt;
pub use stage::{DiscoveryCard, StageError};
