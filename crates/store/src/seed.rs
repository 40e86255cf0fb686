//! Starter university catalog and demo profile.
//!
//! Fees are annual international tuition in USD; acceptance rates are
//! percentages.

use unipath_core::domain::{
    AcademicData, AcademicHistory, BachelorsRecord, Preferences, Profile, ReadinessData,
    SchoolRecord, University,
};
use unipath_core::error::StoreError;
use unipath_core::store::{CounselStore, OnboardingUpdate};

const CATALOG: &[(&str, &str, &str, f64, f64)] = &[
    ("uoft", "University of Toronto", "Canada", 45000.0, 43.0),
    ("ubc", "University of British Columbia", "Canada", 42000.0, 52.0),
    ("uwaterloo", "University of Waterloo", "Canada", 38000.0, 53.0),
    ("mcgill", "McGill University", "Canada", 30000.0, 46.0),
    ("dalhousie", "Dalhousie University", "Canada", 22000.0, 72.0),
    ("oxford", "University of Oxford", "UK", 48000.0, 15.0),
    ("imperial", "Imperial College London", "UK", 45000.0, 14.0),
    ("manchester", "University of Manchester", "UK", 32000.0, 59.0),
    ("leeds", "University of Leeds", "UK", 28000.0, 65.0),
    ("coventry", "Coventry University", "UK", 14500.0, 80.0),
    ("sheffield-hallam", "Sheffield Hallam University", "UK", 15000.0, 77.0),
    ("mit", "Massachusetts Institute of Technology", "USA", 60000.0, 4.0),
    ("stanford", "Stanford University", "USA", 62000.0, 4.0),
    ("purdue", "Purdue University", "USA", 29000.0, 53.0),
    ("asu", "Arizona State University", "USA", 32000.0, 88.0),
    ("unimelb", "University of Melbourne", "Australia", 38000.0, 70.0),
    ("monash", "Monash University", "Australia", 35000.0, 75.0),
    ("tcd", "Trinity College Dublin", "Ireland", 26000.0, 33.0),
    ("ucd", "University College Dublin", "Ireland", 24000.0, 40.0),
    ("nus", "National University of Singapore", "Singapore", 30000.0, 5.0),
];

pub fn default_catalog() -> Vec<University> {
    CATALOG
        .iter()
        .map(|&(id, name, country, tuition_fee, acceptance_rate)| University {
            id: id.into(),
            name: name.into(),
            country: country.into(),
            tuition_fee,
            acceptance_rate,
        })
        .collect()
}

/// Upsert the starter catalog. Returns the number of rows written.
pub async fn seed_catalog(store: &dyn CounselStore) -> Result<usize, StoreError> {
    let catalog = default_catalog();
    let count = catalog.len();
    for university in catalog {
        store.insert_university(university).await?;
    }
    tracing::info!(count, backend = store.name(), "Catalog seeded");
    Ok(count)
}

/// Onboarding answers for a typical postgraduate applicant.
pub fn demo_onboarding() -> OnboardingUpdate {
    let school = |board: &str, year: &str, percentage: &str| SchoolRecord {
        board: Some(board.into()),
        year: Some(year.into()),
        percentage: Some(percentage.into()),
    };

    OnboardingUpdate {
        full_name: Some("Demo Student".into()),
        academic_data: AcademicData {
            major: Some("Computer Science".into()),
            gpa: Some("8.1 CGPA".into()),
            history: AcademicHistory {
                tenth: Some(school("CBSE", "2016", "91")),
                twelfth: Some(school("CBSE", "2018", "87")),
                bachelors: Some(BachelorsRecord {
                    course: Some("B.Tech Computer Science".into()),
                    year: Some("2022".into()),
                    score: Some("8.1".into()),
                }),
            },
            ..Default::default()
        },
        preferences: Preferences {
            budget: Some("40000".into()),
            country: Some("Canada".into()),
            intake: Some("Fall 2026".into()),
        },
        readiness_data: ReadinessData {
            english_test: Some("IELTS".into()),
            english_score: Some("7.5".into()),
            sop_status: Some("Drafting".into()),
        },
    }
}

/// Create (or refresh) the demo profile under `user_id`.
pub async fn seed_demo_profile(
    store: &dyn CounselStore,
    user_id: &str,
) -> Result<Profile, StoreError> {
    store.upsert_onboarding(user_id, demo_onboarding()).await
}
