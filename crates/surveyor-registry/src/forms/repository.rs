use async_trait::async_trait;

use super::domain::{
    ApprovalStamp, FormFileKeys, FormId, FormStats, ListWindow, NewSurveyorForm, ReviewStamp,
    SurveyorForm,
};

/// Storage abstraction over the single `surveyor_forms` table. Every method maps
/// to one statement; absent rows come back as `None` rather than errors.
#[async_trait]
pub trait FormRepository: Send + Sync {
    async fn create(&self, form: NewSurveyorForm) -> Result<FormId, RepositoryError>;

    /// Newest first by creation time.
    async fn list(&self, window: ListWindow) -> Result<Vec<SurveyorForm>, RepositoryError>;

    async fn stats(&self) -> Result<FormStats, RepositoryError>;

    /// Sets `reviewed` and refreshes `reviewed_at`, whatever the current state.
    async fn mark_reviewed(&self, id: FormId) -> Result<Option<ReviewStamp>, RepositoryError>;

    /// Conditional update: applies only while `reviewed AND NOT approved`, in the
    /// same statement that writes the row.
    async fn approve(&self, id: FormId) -> Result<Option<ApprovalStamp>, RepositoryError>;

    async fn file_keys(&self, id: FormId) -> Result<Option<FormFileKeys>, RepositoryError>;

    async fn delete(&self, id: FormId) -> Result<Option<FormId>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("stored value could not be encoded: {0}")]
    Encoding(#[from] serde_json::Error),
    #[error("constraint violated: {0}")]
    Constraint(String),
}
