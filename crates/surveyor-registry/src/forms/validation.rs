use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use super::domain::{ExperienceEntry, Reference, SurveyorProfile};

/// Untyped submission fields, as received from a JSON body or multipart text parts.
pub type SubmissionFields = Map<String, Value>;

/// Aggregated per-field failures for one submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    fields: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.fields
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    pub fn merge(&mut self, other: ValidationErrors) {
        for (field, messages) in other.fields {
            self.fields.entry(field).or_default().extend(messages);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn messages(&self, field: &str) -> &[String] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn into_result<T>(self, value: T) -> Result<T, ValidationErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.fields().collect();
        write!(f, "validation failed for: {}", names.join(", "))
    }
}

impl std::error::Error for ValidationErrors {}

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?)*\.[A-Za-z]{2,}$")
            .expect("email pattern compiles")
    })
}

fn strict_phone_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\+?[0-9]{7,15}$").expect("phone pattern compiles"))
}

/// Checks a submission against the registration schema.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubmissionValidator {
    strict_phone: bool,
}

impl SubmissionValidator {
    pub fn new(strict_phone: bool) -> Self {
        Self { strict_phone }
    }

    /// Produces a typed profile or every field-level failure at once. Companion
    /// "other" fields are carried through untouched; see `normalizer`.
    pub fn validate(&self, fields: &SubmissionFields) -> Result<SurveyorProfile, ValidationErrors> {
        let mut reader = FieldReader {
            fields,
            errors: ValidationErrors::new(),
            strict_phone: self.strict_phone,
        };

        let profile = SurveyorProfile {
            first_name: reader.person_name("firstName"),
            last_name: reader.person_name("lastName"),
            phone_number: reader.phone("phoneNumber"),
            mobile_number: reader.optional_phone("mobileNumber"),
            nationality: reader.required("nationality"),
            employment_status: reader.required("employmentStatus"),
            company_name: reader.optional("companyName"),
            email: reader.email("email"),
            dob_dd: reader.required("dobDD"),
            dob_mm: reader.required("dobMM"),
            dob_yyyy: reader.required("dobYYYY"),
            year_started: reader.optional("yearStarted"),
            heard_about: reader.required("heardAbout"),

            street1: reader.required("street1"),
            street2: reader.optional("street2"),
            city: reader.required("city"),
            postal_code: reader.required("postalCode"),
            country: reader.required("country"),
            state_region: reader.required("stateRegion"),

            discipline: reader.required("discipline"),
            discipline_other: reader.optional("disciplineOther"),
            rank: reader.required("rank"),
            rank_other: reader.optional("rankOther"),

            qualifications: reader.json_or_default("qualifications"),
            qualifications_other: reader.optional("qualificationsOther"),
            vessel_types: reader.json_or_default("vesselTypes"),
            vessel_types_other: reader.optional("vesselTypesOther"),
            shoreside_experience: reader.json_or_default("shoresideExperience"),
            shoreside_experience_other: reader.optional("shoresideExperienceOther"),
            surveying_experience: reader.json_or_default("surveyingExperience"),
            surveying_experience_other: reader.optional("surveyingExperienceOther"),
            vessel_type_surveying_experience: reader
                .json_or_default("vesselTypeSurveyingExperience"),
            vessel_type_surveying_experience_other: reader
                .optional("vesselTypeSurveyingExperienceOther"),
            accreditations: reader.json_or_default("accreditations"),
            accreditations_other: reader.optional("accreditationsOther"),
            courses_completed: reader.json_or_default("coursesCompleted"),
            courses_completed_other: reader.optional("coursesCompletedOther"),

            experience_by_qualification: reader
                .json_or_default::<BTreeMap<String, ExperienceEntry>>("experienceByQualification"),
            references: reader.json_or_default::<Vec<Reference>>("references"),

            inspection_cost: reader.required("inspectionCost"),
            marketing_consent: reader.consent("marketingConsent"),
        };

        reader.errors.into_result(profile)
    }
}

struct FieldReader<'a> {
    fields: &'a SubmissionFields,
    errors: ValidationErrors,
    strict_phone: bool,
}

impl FieldReader<'_> {
    /// Text value of a field; numbers are accepted as their decimal rendering.
    fn text(&mut self, name: &str) -> Option<String> {
        match self.fields.get(name) {
            None | Some(Value::Null) => None,
            Some(Value::String(text)) => Some(text.trim().to_string()),
            Some(Value::Number(number)) => Some(number.to_string()),
            Some(_) => {
                self.errors.add(name, "must be a string");
                None
            }
        }
    }

    fn required(&mut self, name: &str) -> String {
        match self.text(name) {
            Some(text) if !text.is_empty() => text,
            Some(_) => {
                self.errors.add(name, "must not be empty");
                String::new()
            }
            None => {
                if !self.errors.contains(name) {
                    self.errors.add(name, "is required");
                }
                String::new()
            }
        }
    }

    fn optional(&mut self, name: &str) -> Option<String> {
        self.text(name).filter(|text| !text.is_empty())
    }

    fn person_name(&mut self, name: &str) -> String {
        let value = self.required(name);
        let letters_only = value
            .chars()
            .all(|ch| ch.is_ascii_alphabetic() || ch.is_whitespace());
        if !value.is_empty() && !letters_only {
            self.errors.add(name, "must contain letters only");
        }
        value
    }

    fn email(&mut self, name: &str) -> String {
        let value = self.required(name);
        if !value.is_empty() && !email_pattern().is_match(&value) {
            self.errors.add(name, "must be a valid email address");
        }
        value
    }

    fn check_phone(&mut self, name: &str, value: &str) {
        if !self.strict_phone {
            return;
        }
        let compact: String = value
            .chars()
            .filter(|ch| !matches!(ch, ' ' | '-' | '(' | ')' | '.'))
            .collect();
        if !strict_phone_pattern().is_match(&compact) {
            self.errors
                .add(name, "must contain 7 to 15 digits with an optional leading +");
        }
    }

    fn phone(&mut self, name: &str) -> String {
        let value = self.required(name);
        if !value.is_empty() {
            self.check_phone(name, &value);
        }
        value
    }

    fn optional_phone(&mut self, name: &str) -> Option<String> {
        let value = self.optional(name)?;
        self.check_phone(name, &value);
        Some(value)
    }

    /// Booleans pass through; only the literal string "true" counts as consent.
    fn consent(&mut self, name: &str) -> bool {
        match self.fields.get(name) {
            Some(Value::Bool(flag)) => *flag,
            Some(Value::String(text)) => text.trim() == "true",
            _ => false,
        }
    }

    /// Sequences and mappings may arrive pre-serialized as JSON text (multipart)
    /// or as structured JSON. Anything unparseable degrades to the empty value.
    fn json_or_default<T>(&mut self, name: &str) -> T
    where
        T: DeserializeOwned + Default,
    {
        match self.fields.get(name) {
            None | Some(Value::Null) => T::default(),
            Some(Value::String(text)) if text.trim().is_empty() => T::default(),
            Some(Value::String(text)) => serde_json::from_str(text).unwrap_or_default(),
            Some(value) => serde_json::from_value(value.clone()).unwrap_or_default(),
        }
    }
}
