//! Surveyor registration intake and the admin review workflow.
//!
//! A submission passes validation, "other" field cleanup, and file reference
//! resolution before a single insert. Review and approval are one-way gates;
//! approval is applied as a conditional update so concurrent calls cannot both win.

pub mod domain;
pub mod files;
pub mod intake;
pub mod memory;
pub mod normalizer;
pub mod postgres;
pub mod repository;
pub mod router;
pub mod service;
pub mod validation;

#[cfg(test)]
mod tests;

pub use domain::{
    ApprovalStamp, ExperienceEntry, FileReference, FormFileKeys, FormId, FormStats, ListWindow,
    NewSurveyorForm, Reference, ReviewStamp, ReviewState, StoredFiles, SurveyorForm,
    SurveyorProfile,
};
pub use files::{
    FileIntake, FilePolicy, FileReferenceResolver, FileSlot, UploadedFile, UPLOAD_MOUNT,
};
pub use intake::SubmissionInput;
pub use memory::InMemoryFormRepository;
pub use normalizer::normalize_other_fields;
pub use postgres::PgFormRepository;
pub use repository::{FormRepository, RepositoryError};
pub use router::form_router;
pub use service::{FormService, FormServiceError};
pub use validation::{SubmissionFields, SubmissionValidator, ValidationErrors};
