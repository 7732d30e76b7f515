//! Clears free-text "other" companions whose selection no longer asks for them.
//!
//! Discipline and rank compare against `other` case-insensitively. Multi-select
//! fields keep the exact member `Other`, which is what the registration form sends.

use super::domain::SurveyorProfile;

const SCALAR_OTHER: &str = "other";
const MULTI_SELECT_OTHER: &str = "Other";

/// Trims every companion field and blanks those whose trigger is absent.
/// Pure and idempotent.
pub fn normalize_other_fields(profile: &mut SurveyorProfile) {
    for (value, other) in profile.scalar_pairs_mut() {
        let keep = value.trim().eq_ignore_ascii_case(SCALAR_OTHER);
        settle(other, keep);
    }

    for (selection, other) in profile.multi_select_pairs_mut() {
        let keep = selection.iter().any(|item| item == MULTI_SELECT_OTHER);
        settle(other, keep);
    }
}

fn settle(other: &mut Option<String>, keep: bool) {
    *other = match other.take() {
        Some(text) if keep => {
            let trimmed = text.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        _ => None,
    };
}
