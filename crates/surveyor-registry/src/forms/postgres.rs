use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use tracing::info;

use super::domain::{
    ApprovalStamp, ExperienceEntry, FormFileKeys, FormId, FormStats, ListWindow,
    NewSurveyorForm, Reference, ReviewStamp, StoredFiles, SurveyorForm, SurveyorProfile,
};
use super::repository::{FormRepository, RepositoryError};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

const FORM_COLUMNS: &str = "id, first_name, last_name, phone_number, mobile_number, \
    nationality, employment_status, company_name, email, dob_dd, dob_mm, dob_yyyy, \
    year_started, heard_about, street1, street2, city, postal_code, country, state_region, \
    discipline, rank, discipline_other, rank_other, qualifications_other, vessel_types_other, \
    shoreside_experience_other, surveying_experience_other, \
    vessel_type_surveying_experience_other, accreditations_other, courses_completed_other, \
    qualifications, experience_by_qualification, vessel_types, shoreside_experience, \
    surveying_experience, vessel_type_surveying_experience, accreditations, courses_completed, \
    refs, inspection_cost, marketing_consent, photo_path, cv_path, photo_s3_key, cv_s3_key, \
    reviewed, reviewed_at, approved, approved_at, created_at";

const INSERT_FORM: &str = "INSERT INTO surveyor_forms (
    first_name, last_name, phone_number, mobile_number, nationality, employment_status, company_name,
    email, dob_dd, dob_mm, dob_yyyy, year_started, heard_about,
    street1, street2, city, postal_code, country, state_region,
    discipline, rank,
    discipline_other, rank_other, qualifications_other,
    vessel_types_other, shoreside_experience_other,
    surveying_experience_other, vessel_type_surveying_experience_other,
    accreditations_other, courses_completed_other,
    qualifications, experience_by_qualification,
    vessel_types, shoreside_experience, surveying_experience, vessel_type_surveying_experience,
    accreditations, courses_completed, refs,
    inspection_cost, marketing_consent,
    photo_path, cv_path, photo_s3_key, cv_s3_key
) VALUES (
    $1, $2, $3, $4, $5, $6, $7,
    $8, $9, $10, $11, $12, $13,
    $14, $15, $16, $17, $18, $19,
    $20, $21,
    $22, $23, $24,
    $25, $26,
    $27, $28,
    $29, $30,
    $31, $32,
    $33, $34, $35, $36,
    $37, $38, $39,
    $40, $41,
    $42, $43, $44, $45
)
RETURNING id";

/// `FormRepository` backed by a shared Postgres pool.
#[derive(Debug, Clone)]
pub struct PgFormRepository {
    pool: PgPool,
}

impl PgFormRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(db_url: &str, max_connections: u32) -> Result<Self, RepositoryError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(CONNECT_TIMEOUT)
            .connect(db_url)
            .await?;
        Ok(Self::new(pool))
    }

    pub async fn migrate(&self) -> Result<(), RepositoryError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|err| RepositoryError::Database(err.into()))?;
        info!("surveyor_forms migrations applied");
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl FormRepository for PgFormRepository {
    async fn create(&self, form: NewSurveyorForm) -> Result<FormId, RepositoryError> {
        let NewSurveyorForm { profile: p, files } = form;

        let id: i64 = sqlx::query_scalar(INSERT_FORM)
            .bind(&p.first_name)
            .bind(&p.last_name)
            .bind(&p.phone_number)
            .bind(&p.mobile_number)
            .bind(&p.nationality)
            .bind(&p.employment_status)
            .bind(&p.company_name)
            .bind(&p.email)
            .bind(&p.dob_dd)
            .bind(&p.dob_mm)
            .bind(&p.dob_yyyy)
            .bind(&p.year_started)
            .bind(&p.heard_about)
            .bind(&p.street1)
            .bind(&p.street2)
            .bind(&p.city)
            .bind(&p.postal_code)
            .bind(&p.country)
            .bind(&p.state_region)
            .bind(&p.discipline)
            .bind(&p.rank)
            .bind(&p.discipline_other)
            .bind(&p.rank_other)
            .bind(&p.qualifications_other)
            .bind(&p.vessel_types_other)
            .bind(&p.shoreside_experience_other)
            .bind(&p.surveying_experience_other)
            .bind(&p.vessel_type_surveying_experience_other)
            .bind(&p.accreditations_other)
            .bind(&p.courses_completed_other)
            .bind(Json(&p.qualifications))
            .bind(Json(&p.experience_by_qualification))
            .bind(Json(&p.vessel_types))
            .bind(Json(&p.shoreside_experience))
            .bind(Json(&p.surveying_experience))
            .bind(Json(&p.vessel_type_surveying_experience))
            .bind(Json(&p.accreditations))
            .bind(Json(&p.courses_completed))
            .bind(Json(&p.references))
            .bind(&p.inspection_cost)
            .bind(p.marketing_consent)
            .bind(&files.photo_path)
            .bind(&files.cv_path)
            .bind(&files.photo_s3_key)
            .bind(&files.cv_s3_key)
            .fetch_one(&self.pool)
            .await?;

        Ok(FormId(id))
    }

    async fn list(&self, window: ListWindow) -> Result<Vec<SurveyorForm>, RepositoryError> {
        let sql = format!(
            "SELECT {FORM_COLUMNS} FROM surveyor_forms ORDER BY created_at DESC, id DESC LIMIT $1 OFFSET $2"
        );
        let rows = sqlx::query(&sql)
            .bind(window.limit)
            .bind(window.offset)
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(form_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(RepositoryError::from)
    }

    async fn stats(&self) -> Result<FormStats, RepositoryError> {
        let row = sqlx::query(
            "SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE COALESCE(reviewed, false) = false) AS pending,
                COUNT(*) FILTER (WHERE COALESCE(approved, false) = true) AS approved,
                COUNT(*) FILTER (WHERE created_at >= NOW() - INTERVAL '24 hours') AS new_today
             FROM surveyor_forms",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(FormStats {
            total: row.try_get("total")?,
            pending: row.try_get("pending")?,
            approved: row.try_get("approved")?,
            new_today: row.try_get("new_today")?,
        })
    }

    async fn mark_reviewed(&self, id: FormId) -> Result<Option<ReviewStamp>, RepositoryError> {
        let row = sqlx::query(
            "UPDATE surveyor_forms
             SET reviewed = true, reviewed_at = NOW()
             WHERE id = $1
             RETURNING id, reviewed, reviewed_at",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| -> Result<ReviewStamp, RepositoryError> {
            Ok(ReviewStamp {
                id: FormId(row.try_get("id")?),
                reviewed: row.try_get("reviewed")?,
                reviewed_at: row.try_get("reviewed_at")?,
            })
        })
        .transpose()
    }

    async fn approve(&self, id: FormId) -> Result<Option<ApprovalStamp>, RepositoryError> {
        let row = sqlx::query(
            "UPDATE surveyor_forms
             SET approved = true, approved_at = NOW()
             WHERE id = $1 AND reviewed = true AND approved = false
             RETURNING id, approved, approved_at",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| -> Result<ApprovalStamp, RepositoryError> {
            Ok(ApprovalStamp {
                id: FormId(row.try_get("id")?),
                approved: row.try_get("approved")?,
                approved_at: row.try_get("approved_at")?,
            })
        })
        .transpose()
    }

    async fn file_keys(&self, id: FormId) -> Result<Option<FormFileKeys>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, photo_path, cv_path, photo_s3_key, cv_s3_key
             FROM surveyor_forms
             WHERE id = $1",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| -> Result<FormFileKeys, RepositoryError> {
            Ok(FormFileKeys {
                id: FormId(row.try_get("id")?),
                files: files_from_row(&row)?,
            })
        })
        .transpose()
    }

    async fn delete(&self, id: FormId) -> Result<Option<FormId>, RepositoryError> {
        let deleted: Option<i64> =
            sqlx::query_scalar("DELETE FROM surveyor_forms WHERE id = $1 RETURNING id")
                .bind(id.0)
                .fetch_optional(&self.pool)
                .await?;
        Ok(deleted.map(FormId))
    }
}

fn files_from_row(row: &PgRow) -> Result<StoredFiles, sqlx::Error> {
    Ok(StoredFiles {
        photo_path: row.try_get("photo_path")?,
        cv_path: row.try_get("cv_path")?,
        photo_s3_key: row.try_get("photo_s3_key")?,
        cv_s3_key: row.try_get("cv_s3_key")?,
    })
}

fn list_column(row: &PgRow, column: &str) -> Result<Vec<String>, sqlx::Error> {
    let Json(values): Json<Vec<String>> = row.try_get(column)?;
    Ok(values)
}

fn form_from_row(row: &PgRow) -> Result<SurveyorForm, sqlx::Error> {
    let Json(experience_by_qualification): Json<BTreeMap<String, ExperienceEntry>> =
        row.try_get("experience_by_qualification")?;
    let Json(references): Json<Vec<Reference>> = row.try_get("refs")?;

    let profile = SurveyorProfile {
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        phone_number: row.try_get("phone_number")?,
        mobile_number: row.try_get("mobile_number")?,
        nationality: row.try_get("nationality")?,
        employment_status: row.try_get("employment_status")?,
        company_name: row.try_get("company_name")?,
        email: row.try_get("email")?,
        dob_dd: row.try_get("dob_dd")?,
        dob_mm: row.try_get("dob_mm")?,
        dob_yyyy: row.try_get("dob_yyyy")?,
        year_started: row.try_get("year_started")?,
        heard_about: row.try_get("heard_about")?,
        street1: row.try_get("street1")?,
        street2: row.try_get("street2")?,
        city: row.try_get("city")?,
        postal_code: row.try_get("postal_code")?,
        country: row.try_get("country")?,
        state_region: row.try_get("state_region")?,
        discipline: row.try_get("discipline")?,
        discipline_other: row.try_get("discipline_other")?,
        rank: row.try_get("rank")?,
        rank_other: row.try_get("rank_other")?,
        qualifications: list_column(row, "qualifications")?,
        qualifications_other: row.try_get("qualifications_other")?,
        vessel_types: list_column(row, "vessel_types")?,
        vessel_types_other: row.try_get("vessel_types_other")?,
        shoreside_experience: list_column(row, "shoreside_experience")?,
        shoreside_experience_other: row.try_get("shoreside_experience_other")?,
        surveying_experience: list_column(row, "surveying_experience")?,
        surveying_experience_other: row.try_get("surveying_experience_other")?,
        vessel_type_surveying_experience: list_column(row, "vessel_type_surveying_experience")?,
        vessel_type_surveying_experience_other: row
            .try_get("vessel_type_surveying_experience_other")?,
        accreditations: list_column(row, "accreditations")?,
        accreditations_other: row.try_get("accreditations_other")?,
        courses_completed: list_column(row, "courses_completed")?,
        courses_completed_other: row.try_get("courses_completed_other")?,
        experience_by_qualification,
        references,
        inspection_cost: row.try_get("inspection_cost")?,
        marketing_consent: row.try_get("marketing_consent")?,
    };

    let reviewed_at: Option<DateTime<Utc>> = row.try_get("reviewed_at")?;
    let approved_at: Option<DateTime<Utc>> = row.try_get("approved_at")?;

    Ok(SurveyorForm {
        id: FormId(row.try_get("id")?),
        profile,
        files: files_from_row(row)?,
        reviewed: row.try_get("reviewed")?,
        reviewed_at,
        approved: row.try_get("approved")?,
        approved_at,
        created_at: row.try_get("created_at")?,
    })
}
