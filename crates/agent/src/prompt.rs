//! System prompt assembly.
//!
//! Role line, the profile context block, then the counselling rules. The
//! rules are delivered verbatim on every turn; only the context block and the
//! intake in the gap-analysis rule vary with the profile.

use unipath_core::domain::Profile;

use crate::profile_context::{build_profile_context, target_intake};

pub const ROLE_LINE: &str = "You are an expert study-abroad counsellor.";

pub const TONE_LINE: &str = "Tone: Be concise, supportive, and action-oriented.";

/// Build the system prompt for one turn. Pure: the same profile always
/// yields the same prompt.
pub fn assemble_system_prompt(profile: &Profile) -> String {
    let context = build_profile_context(profile);
    let intake = target_intake(profile);

    format!(
        "{ROLE_LINE}

USER PROFILE CONTEXT:
{context}

RULES:
1. **Eligibility Check:** Always check whether the student's own scores (12th grade marks, English test score, or Bachelors CGPA) meet a university's requirements before recommending it.
2. **Course Level:**
   - If the student has a Bachelors record, recommend **Master's/Post-Graduate** programs.
   - If the student only has school (12th) details, recommend **Undergraduate/Bachelor's** programs.
3. **Gap Analysis:** If there is a significant gap between their last passing year and the target intake ({intake}), ask about their work experience or activities during that gap.
4. **Search Strategy:** Every university you recommend must come from a 'searchUniversities' result. Categorize results as SAFE, TARGET, or DREAM based on the student's profile strength. Never invent or mention universities that a search did not return; if a search finds nothing, say so plainly.
5. **CRITICAL OVERRIDE:** If the student explicitly states a budget, country, or major in their current message, YOU MUST OVERRIDE the profile context and use their stated values for that search.
6. **Action Taking:**
   - Use 'addToShortlist' when the student expresses interest in a specific university.
   - Use 'lockUniversity' ONLY when the student explicitly and unambiguously confirms a final choice. Never lock speculatively.
   - Pass the student ID from the profile context as 'userId' and the university 'id' from search results as 'universityId'.

{TONE_LINE}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use unipath_core::domain::{BachelorsRecord, FlexValue};

    #[test]
    fn prompt_contains_role_context_rules_and_tone() {
        let prompt = assemble_system_prompt(&Profile::new("u1"));
        assert!(prompt.starts_with(ROLE_LINE));
        assert!(prompt.contains("USER PROFILE CONTEXT:\nSTUDENT:\n- ID: u1"));
        for n in 1..=6 {
            assert!(prompt.contains(&format!("\n{n}. **")), "missing rule {n}");
        }
        assert!(prompt.contains("CRITICAL OVERRIDE"));
        assert!(prompt.contains("Never invent"));
        assert!(prompt.ends_with(TONE_LINE));
    }

    #[test]
    fn intake_is_interpolated_into_gap_rule() {
        let mut profile = Profile::new("u1");
        profile.preferences.intake = Some("Spring 2027".into());
        let prompt = assemble_system_prompt(&profile);
        assert!(prompt.contains("the target intake (Spring 2027)"));

        let prompt = assemble_system_prompt(&Profile::new("u1"));
        assert!(prompt.contains("the target intake (Any)"));
    }

    #[test]
    fn assembly_is_deterministic() {
        let mut profile = Profile::new("u1");
        profile.academic_data.history.bachelors = Some(BachelorsRecord {
            course: Some("B.Com".into()),
            year: Some(FlexValue::from(2022.0)),
            score: Some(FlexValue::from("7.9")),
        });
        assert_eq!(
            assemble_system_prompt(&profile),
            assemble_system_prompt(&profile)
        );
    }

    #[test]
    fn rules_do_not_depend_on_profile() {
        let rules = |p: &str| p.split("RULES:").nth(1).unwrap_or_default().to_string();
        let mut other = Profile::new("u2");
        other.preferences.country = Some("UK".into());
        assert_eq!(
            rules(&assemble_system_prompt(&Profile::new("u1"))),
            rules(&assemble_system_prompt(&other))
        );
    }
}
