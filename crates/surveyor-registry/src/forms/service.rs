use std::io::ErrorKind;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::domain::{
    ApprovalStamp, FileReference, FormId, FormStats, ListWindow, NewSurveyorForm, ReviewStamp,
    StoredFiles, SurveyorForm,
};
use super::files::FileReferenceResolver;
use super::intake::SubmissionInput;
use super::normalizer::normalize_other_fields;
use super::repository::{FormRepository, RepositoryError};
use super::validation::{SubmissionValidator, ValidationErrors};
use crate::config::FormConfig;
use crate::error::AppError;
use crate::storage::{SharedStorage, StorageError};

/// Submission pipeline and admin workflow over one repository and one object store.
pub struct FormService<R> {
    repository: Arc<R>,
    storage: SharedStorage,
    validator: SubmissionValidator,
    resolver: FileReferenceResolver,
    config: FormConfig,
}

impl<R> FormService<R>
where
    R: FormRepository + 'static,
{
    pub fn new(
        repository: Arc<R>,
        storage: SharedStorage,
        resolver: FileReferenceResolver,
        config: FormConfig,
    ) -> Self {
        Self {
            repository,
            storage,
            validator: SubmissionValidator::new(config.strict_phone),
            resolver,
            config,
        }
    }

    pub fn repository(&self) -> &Arc<R> {
        &self.repository
    }

    pub fn storage(&self) -> &SharedStorage {
        &self.storage
    }

    pub fn resolver(&self) -> &FileReferenceResolver {
        &self.resolver
    }

    /// Validates fields and files together so the caller sees every problem at
    /// once; nothing touches disk or the table until both pass.
    pub async fn submit(&self, input: SubmissionInput) -> Result<FormId, FormServiceError> {
        let SubmissionInput { fields, files } = input;
        let direct_upload = files.has_uploads();

        let (mut profile, plan) = match (self.validator.validate(&fields), self.resolver.plan(files))
        {
            (Ok(profile), Ok(plan)) => (profile, plan),
            (profile, plan) => {
                let mut errors = ValidationErrors::new();
                if let Err(field_errors) = profile {
                    errors.merge(field_errors);
                }
                if let Err(file_errors) = plan {
                    errors.merge(file_errors);
                }
                debug!(fields = %errors, "submission rejected");
                return Err(FormServiceError::Validation(errors));
            }
        };

        normalize_other_fields(&mut profile);
        let files = self.resolver.commit(plan).await?;
        let id = self
            .repository
            .create(NewSurveyorForm::assemble(profile, files))
            .await?;

        info!(%id, direct_upload, "surveyor form submitted");
        Ok(id)
    }

    pub async fn list(
        &self,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<SurveyorForm>, FormServiceError> {
        let window = ListWindow::bounded(limit, offset, self.config.list_max_limit);
        Ok(self.repository.list(window).await?)
    }

    pub async fn stats(&self) -> Result<FormStats, FormServiceError> {
        Ok(self.repository.stats().await?)
    }

    pub async fn mark_reviewed(&self, id: FormId) -> Result<ReviewStamp, FormServiceError> {
        let stamp = self
            .repository
            .mark_reviewed(id)
            .await?
            .ok_or(FormServiceError::NotFound(id))?;
        info!(%id, "form marked reviewed");
        Ok(stamp)
    }

    pub async fn approve(&self, id: FormId) -> Result<ApprovalStamp, FormServiceError> {
        match self.repository.approve(id).await? {
            Some(stamp) => {
                info!(%id, "form approved");
                Ok(stamp)
            }
            None => {
                debug!(%id, "approval guard not satisfied");
                Err(FormServiceError::ApprovalRejected(id))
            }
        }
    }

    /// Removes stored files first, then the row. Cleanup failures are logged
    /// and never block the row deletion.
    pub async fn delete(&self, id: FormId) -> Result<FormId, FormServiceError> {
        let keys = self
            .repository
            .file_keys(id)
            .await?
            .ok_or(FormServiceError::NotFound(id))?;

        self.discard_files(id, &keys.files).await;

        let deleted = self
            .repository
            .delete(id)
            .await?
            .ok_or(FormServiceError::NotFound(id))?;
        info!(%id, "form deleted");
        Ok(deleted)
    }

    async fn discard_files(&self, id: FormId, files: &StoredFiles) {
        for reference in files.references() {
            match reference {
                FileReference::ObjectKey(key) => {
                    if let Err(err) = self.storage.delete_object(&key).await {
                        warn!(%id, %key, error = %err, "stored object cleanup failed");
                    }
                }
                FileReference::LocalPath(reference) => {
                    let path = self.resolver.disk_path(&reference);
                    match tokio::fs::remove_file(&path).await {
                        Ok(()) => {}
                        Err(err) if err.kind() == ErrorKind::NotFound => {
                            debug!(%id, %reference, "uploaded file already gone");
                        }
                        Err(err) => {
                            warn!(%id, %reference, error = %err, "uploaded file cleanup failed");
                        }
                    }
                }
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FormServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    #[error("form {0} not found")]
    NotFound(FormId),
    #[error("form {0} is not awaiting approval")]
    ApprovalRejected(FormId),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<FormServiceError> for AppError {
    fn from(value: FormServiceError) -> Self {
        match value {
            FormServiceError::Validation(errors) => AppError::Validation(errors),
            FormServiceError::NotFound(_) => AppError::not_found("Form not found"),
            FormServiceError::ApprovalRejected(_) => AppError::ApprovalRejected,
            FormServiceError::Repository(err) => AppError::Repository(err),
            FormServiceError::Storage(err) => AppError::Storage(err),
        }
    }
}
