use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, Utc};

use super::domain::{
    ApprovalStamp, FormFileKeys, FormId, FormStats, ListWindow, NewSurveyorForm, ReviewStamp,
    SurveyorForm,
};
use super::repository::{FormRepository, RepositoryError};

#[derive(Debug, Default)]
struct Table {
    next_id: i64,
    rows: BTreeMap<FormId, SurveyorForm>,
}

/// Process-local table used for development runs without Postgres and in tests.
/// Each operation holds the lock for its whole read-modify-write, which gives
/// the approval guard the same atomicity as the SQL conditional update.
#[derive(Debug, Default, Clone)]
pub struct InMemoryFormRepository {
    table: Arc<Mutex<Table>>,
}

impl InMemoryFormRepository {
    pub fn get(&self, id: FormId) -> Option<SurveyorForm> {
        let guard = self.table.lock().expect("repository mutex poisoned");
        guard.rows.get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.table.lock().expect("repository mutex poisoned").rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl FormRepository for InMemoryFormRepository {
    async fn create(&self, form: NewSurveyorForm) -> Result<FormId, RepositoryError> {
        let files = &form.files;
        if files.photo_path.is_none() && files.photo_s3_key.is_none() {
            return Err(RepositoryError::Constraint(
                "photo reference is required".to_string(),
            ));
        }
        if files.cv_path.is_none() && files.cv_s3_key.is_none() {
            return Err(RepositoryError::Constraint(
                "cv reference is required".to_string(),
            ));
        }

        let mut guard = self.table.lock().expect("repository mutex poisoned");
        guard.next_id += 1;
        let id = FormId(guard.next_id);
        guard.rows.insert(
            id,
            SurveyorForm {
                id,
                profile: form.profile,
                files: form.files,
                reviewed: false,
                reviewed_at: None,
                approved: false,
                approved_at: None,
                created_at: Utc::now(),
            },
        );
        Ok(id)
    }

    async fn list(&self, window: ListWindow) -> Result<Vec<SurveyorForm>, RepositoryError> {
        let guard = self.table.lock().expect("repository mutex poisoned");
        let mut rows: Vec<SurveyorForm> = guard.rows.values().cloned().collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(rows
            .into_iter()
            .skip(usize::try_from(window.offset).unwrap_or(0))
            .take(usize::try_from(window.limit).unwrap_or(0))
            .collect())
    }

    async fn stats(&self) -> Result<FormStats, RepositoryError> {
        let guard = self.table.lock().expect("repository mutex poisoned");
        let since = Utc::now() - Duration::hours(24);
        let mut stats = FormStats::default();
        for row in guard.rows.values() {
            stats.total += 1;
            if !row.reviewed {
                stats.pending += 1;
            }
            if row.approved {
                stats.approved += 1;
            }
            if row.created_at >= since {
                stats.new_today += 1;
            }
        }
        Ok(stats)
    }

    async fn mark_reviewed(&self, id: FormId) -> Result<Option<ReviewStamp>, RepositoryError> {
        let mut guard = self.table.lock().expect("repository mutex poisoned");
        Ok(guard.rows.get_mut(&id).map(|row| {
            let now = Utc::now();
            row.reviewed = true;
            row.reviewed_at = Some(now);
            ReviewStamp {
                id,
                reviewed: true,
                reviewed_at: now,
            }
        }))
    }

    async fn approve(&self, id: FormId) -> Result<Option<ApprovalStamp>, RepositoryError> {
        let mut guard = self.table.lock().expect("repository mutex poisoned");
        Ok(guard
            .rows
            .get_mut(&id)
            .filter(|row| row.review_state().can_approve())
            .map(|row| {
                let now = Utc::now();
                row.approved = true;
                row.approved_at = Some(now);
                ApprovalStamp {
                    id,
                    approved: true,
                    approved_at: now,
                }
            }))
    }

    async fn file_keys(&self, id: FormId) -> Result<Option<FormFileKeys>, RepositoryError> {
        let guard = self.table.lock().expect("repository mutex poisoned");
        Ok(guard.rows.get(&id).map(|row| FormFileKeys {
            id,
            files: row.files.clone(),
        }))
    }

    async fn delete(&self, id: FormId) -> Result<Option<FormId>, RepositoryError> {
        let mut guard = self.table.lock().expect("repository mutex poisoned");
        Ok(guard.rows.remove(&id).map(|row| row.id))
    }
}
