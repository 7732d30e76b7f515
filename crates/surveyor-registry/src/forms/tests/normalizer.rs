use crate::forms::domain::SurveyorProfile;
use crate::forms::normalizer::normalize_other_fields;

fn profile() -> SurveyorProfile {
    SurveyorProfile {
        discipline: "hull".to_string(),
        discipline_other: Some("Marine Surveyor".to_string()),
        rank: "Other".to_string(),
        rank_other: Some("  Harbour pilot  ".to_string()),
        qualifications: vec!["Master Mariner".to_string(), "Other".to_string()],
        qualifications_other: Some(" Tug master ".to_string()),
        vessel_types: vec!["Tanker".to_string(), "other".to_string()],
        vessel_types_other: Some("Dredger".to_string()),
        accreditations_other: Some("IIMS".to_string()),
        ..SurveyorProfile::default()
    }
}

#[test]
fn scalar_companions_follow_their_selection() {
    let mut profile = profile();
    normalize_other_fields(&mut profile);

    assert_eq!(profile.discipline_other, None);
    assert_eq!(profile.rank_other.as_deref(), Some("Harbour pilot"));
}

#[test]
fn multi_select_companions_need_the_exact_other_member() {
    let mut profile = profile();
    normalize_other_fields(&mut profile);

    assert_eq!(profile.qualifications_other.as_deref(), Some("Tug master"));
    assert_eq!(profile.vessel_types_other, None, "lowercase member does not count");
    assert_eq!(profile.accreditations_other, None);
}

#[test]
fn blank_companions_become_absent() {
    let mut profile = SurveyorProfile {
        discipline: "other".to_string(),
        discipline_other: Some("   ".to_string()),
        ..SurveyorProfile::default()
    };
    normalize_other_fields(&mut profile);
    assert_eq!(profile.discipline_other, None);
}

#[test]
fn normalization_is_idempotent() {
    let mut once = profile();
    normalize_other_fields(&mut once);
    let mut twice = once.clone();
    normalize_other_fields(&mut twice);
    assert_eq!(once, twice);
}

#[test]
fn discarded_text_never_survives_any_non_other_selection() {
    for discipline in ["hull", "machinery", "cargo", "", "others", "other surveyor"] {
        let mut profile = SurveyorProfile {
            discipline: discipline.to_string(),
            discipline_other: Some("stale".to_string()),
            ..SurveyorProfile::default()
        };
        normalize_other_fields(&mut profile);
        assert_eq!(profile.discipline_other, None, "discipline {discipline:?}");
    }
}
