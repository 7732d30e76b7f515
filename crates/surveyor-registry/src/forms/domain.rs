use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Database-assigned identifier of a surveyor submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormId(pub i64);

impl FormId {
    /// Parses a path segment; ids are positive integers.
    pub fn parse(raw: &str) -> Option<Self> {
        raw.trim()
            .parse::<i64>()
            .ok()
            .filter(|id| *id > 0)
            .map(Self)
    }
}

impl fmt::Display for FormId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Time served per qualification. Values are kept as entered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperienceEntry {
    #[serde(default, deserialize_with = "lenient_text")]
    pub years: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub months: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub days: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub contact: String,
}

/// Accepts strings, numbers, or null where the form sends free text.
fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::String(text) => Ok(text),
        serde_json::Value::Number(number) => Ok(number.to_string()),
        serde_json::Value::Null => Ok(String::new()),
        other => Err(serde::de::Error::custom(format!(
            "expected text, found {other}"
        ))),
    }
}

/// Applicant-supplied registration details after validation and normalization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SurveyorProfile {
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub mobile_number: Option<String>,
    pub nationality: String,
    pub employment_status: String,
    pub company_name: Option<String>,
    pub email: String,
    pub dob_dd: String,
    pub dob_mm: String,
    pub dob_yyyy: String,
    pub year_started: Option<String>,
    pub heard_about: String,

    pub street1: String,
    pub street2: Option<String>,
    pub city: String,
    pub postal_code: String,
    pub country: String,
    pub state_region: String,

    pub discipline: String,
    pub discipline_other: Option<String>,
    pub rank: String,
    pub rank_other: Option<String>,

    pub qualifications: Vec<String>,
    pub qualifications_other: Option<String>,
    pub vessel_types: Vec<String>,
    pub vessel_types_other: Option<String>,
    pub shoreside_experience: Vec<String>,
    pub shoreside_experience_other: Option<String>,
    pub surveying_experience: Vec<String>,
    pub surveying_experience_other: Option<String>,
    pub vessel_type_surveying_experience: Vec<String>,
    pub vessel_type_surveying_experience_other: Option<String>,
    pub accreditations: Vec<String>,
    pub accreditations_other: Option<String>,
    pub courses_completed: Vec<String>,
    pub courses_completed_other: Option<String>,

    pub experience_by_qualification: BTreeMap<String, ExperienceEntry>,
    pub references: Vec<Reference>,

    pub inspection_cost: String,
    pub marketing_consent: bool,
}

impl SurveyorProfile {
    /// Multi-select selections paired with their free-text companion.
    pub(crate) fn multi_select_pairs_mut(&mut self) -> [(&[String], &mut Option<String>); 7] {
        [
            (self.qualifications.as_slice(), &mut self.qualifications_other),
            (self.vessel_types.as_slice(), &mut self.vessel_types_other),
            (self.shoreside_experience.as_slice(), &mut self.shoreside_experience_other),
            (self.surveying_experience.as_slice(), &mut self.surveying_experience_other),
            (
                self.vessel_type_surveying_experience.as_slice(),
                &mut self.vessel_type_surveying_experience_other,
            ),
            (self.accreditations.as_slice(), &mut self.accreditations_other),
            (self.courses_completed.as_slice(), &mut self.courses_completed_other),
        ]
    }

    pub(crate) fn scalar_pairs_mut(&mut self) -> [(&str, &mut Option<String>); 2] {
        [
            (self.discipline.as_str(), &mut self.discipline_other),
            (self.rank.as_str(), &mut self.rank_other),
        ]
    }
}

/// Where a stored file lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FileReference {
    /// Written by the server into the upload directory.
    LocalPath(String),
    /// Uploaded by the client straight to object storage.
    ObjectKey(String),
}

/// The two reference columns per file slot; one of each pair is populated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredFiles {
    pub photo_path: Option<String>,
    pub cv_path: Option<String>,
    pub photo_s3_key: Option<String>,
    pub cv_s3_key: Option<String>,
}

impl StoredFiles {
    pub fn from_references(photo: FileReference, cv: FileReference) -> Self {
        let mut files = StoredFiles::default();
        match photo {
            FileReference::LocalPath(path) => files.photo_path = Some(path),
            FileReference::ObjectKey(key) => files.photo_s3_key = Some(key),
        }
        match cv {
            FileReference::LocalPath(path) => files.cv_path = Some(path),
            FileReference::ObjectKey(key) => files.cv_s3_key = Some(key),
        }
        files
    }

    /// Every populated reference, object keys first.
    pub fn references(&self) -> Vec<FileReference> {
        let keys = [&self.photo_s3_key, &self.cv_s3_key]
            .into_iter()
            .flatten()
            .map(|key| FileReference::ObjectKey(key.clone()));
        let paths = [&self.photo_path, &self.cv_path]
            .into_iter()
            .flatten()
            .map(|path| FileReference::LocalPath(path.clone()));
        keys.chain(paths).collect()
    }
}

/// Insert payload handed to the repository.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewSurveyorForm {
    #[serde(flatten)]
    pub profile: SurveyorProfile,
    #[serde(flatten)]
    pub files: StoredFiles,
}

impl NewSurveyorForm {
    /// Joins a normalized profile with its resolved files and canonicalizes phone numbers.
    pub fn assemble(mut profile: SurveyorProfile, files: StoredFiles) -> Self {
        profile.phone_number = normalize_phone(&profile.phone_number).unwrap_or_default();
        profile.mobile_number = profile.mobile_number.as_deref().and_then(normalize_phone);
        Self { profile, files }
    }
}

/// Strips everything except digits, keeping a single leading `+`.
pub fn normalize_phone(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let mut normalized = String::with_capacity(trimmed.len());
    if trimmed.starts_with('+') {
        normalized.push('+');
    }
    normalized.extend(trimmed.chars().filter(char::is_ascii_digit));

    if normalized.is_empty() {
        None
    } else {
        Some(normalized)
    }
}

/// One persisted submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SurveyorForm {
    pub id: FormId,
    #[serde(flatten)]
    pub profile: SurveyorProfile,
    #[serde(flatten)]
    pub files: StoredFiles,
    pub reviewed: bool,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub approved: bool,
    pub approved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl SurveyorForm {
    pub fn review_state(&self) -> ReviewState {
        ReviewState::from_flags(self.reviewed, self.approved)
    }
}

/// Position of a submission in the one-way review workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewState {
    Unreviewed,
    Reviewed,
    Approved,
}

impl ReviewState {
    pub const fn from_flags(reviewed: bool, approved: bool) -> Self {
        match (reviewed, approved) {
            (_, true) => ReviewState::Approved,
            (true, false) => ReviewState::Reviewed,
            (false, false) => ReviewState::Unreviewed,
        }
    }

    /// Approval is only reachable from the reviewed state.
    pub const fn can_approve(self) -> bool {
        matches!(self, ReviewState::Reviewed)
    }

    pub const fn label(self) -> &'static str {
        match self {
            ReviewState::Unreviewed => "unreviewed",
            ReviewState::Reviewed => "reviewed",
            ReviewState::Approved => "approved",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewStamp {
    pub id: FormId,
    pub reviewed: bool,
    pub reviewed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApprovalStamp {
    pub id: FormId,
    pub approved: bool,
    pub approved_at: DateTime<Utc>,
}

/// File columns of one row, fetched ahead of deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormFileKeys {
    pub id: FormId,
    #[serde(flatten)]
    pub files: StoredFiles,
}

/// Dashboard counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormStats {
    pub total: i64,
    pub pending: i64,
    pub approved: i64,
    pub new_today: i64,
}

/// Page window for listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListWindow {
    pub limit: i64,
    pub offset: i64,
}

impl ListWindow {
    pub const DEFAULT_LIMIT: i64 = 25;

    /// Applies defaults to missing or non-positive values and caps the limit.
    pub fn bounded(limit: Option<i64>, offset: Option<i64>, max_limit: i64) -> Self {
        let limit = match limit {
            Some(limit) if limit > 0 => limit.min(max_limit.max(1)),
            _ => Self::DEFAULT_LIMIT.min(max_limit.max(1)),
        };
        let offset = offset.filter(|offset| *offset > 0).unwrap_or(0);
        Self { limit, offset }
    }
}

impl Default for ListWindow {
    fn default() -> Self {
        Self {
            limit: Self::DEFAULT_LIMIT,
            offset: 0,
        }
    }
}
