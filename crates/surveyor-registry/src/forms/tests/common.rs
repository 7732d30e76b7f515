use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::body::to_bytes;
use axum::response::Response;
use bytes::Bytes;
use serde_json::{json, Value};

use crate::auth::{AdminGate, TokenSigner};
use crate::config::FormConfig;
use crate::forms::files::{FileIntake, FilePolicy, FileReferenceResolver, UploadedFile};
use crate::forms::intake::SubmissionInput;
use crate::forms::memory::InMemoryFormRepository;
use crate::forms::service::FormService;
use crate::forms::validation::SubmissionFields;
use crate::storage::InMemoryObjectStorage;

pub(super) const JWT_SECRET: &str = "forms-test-secret";
pub(super) const MAX_FILE_BYTES: usize = 3 * 1024 * 1024;

pub(super) fn valid_fields() -> SubmissionFields {
    let value = json!({
        "firstName": "Grace",
        "lastName": "Hopper",
        "phoneNumber": "+44 (0) 20 7946 0958",
        "mobileNumber": "07700 900123",
        "nationality": "British",
        "employmentStatus": "Self-employed",
        "companyName": "Hopper Marine",
        "email": "grace@example.com",
        "dobDD": "09",
        "dobMM": "12",
        "dobYYYY": "1986",
        "yearStarted": "2010",
        "heardAbout": "Referral",
        "street1": "1 Dock Road",
        "city": "Southampton",
        "postalCode": "SO14 2AQ",
        "country": "United Kingdom",
        "stateRegion": "Hampshire",
        "discipline": "hull",
        "rank": "senior",
        "qualifications": "[\"Master Mariner\",\"Chief Engineer\"]",
        "experienceByQualification": "{\"Master Mariner\":{\"years\":\"5\",\"months\":\"2\",\"days\":\"0\"}}",
        "vesselTypes": "[\"Bulk Carrier\",\"Tanker\"]",
        "shoresideExperience": "[]",
        "surveyingExperience": "[\"Condition\"]",
        "vesselTypeSurveyingExperience": "[]",
        "accreditations": "[]",
        "coursesCompleted": "[]",
        "references": "[{\"name\":\"Ada\",\"contact\":\"ada@example.com\"}]",
        "inspectionCost": "450 GBP",
        "marketingConsent": "true",
    });
    match value {
        Value::Object(map) => map,
        _ => unreachable!("literal is an object"),
    }
}

pub(super) fn upload(name: &str, content_type: &str, len: usize) -> UploadedFile {
    UploadedFile {
        file_name: Some(name.to_string()),
        content_type: Some(content_type.to_string()),
        bytes: Bytes::from(vec![7u8; len]),
    }
}

pub(super) fn direct_upload_files() -> FileIntake {
    FileIntake {
        photo_file: Some(upload("portrait.png", "image/png", 2048)),
        cv_file: Some(upload("resume.pdf", "application/pdf", 1024)),
        ..FileIntake::default()
    }
}

pub(super) fn presigned_files() -> FileIntake {
    FileIntake {
        photo_key: Some("photos/portrait.png".to_string()),
        cv_key: Some("cvs/resume.pdf".to_string()),
        ..FileIntake::default()
    }
}

pub(super) fn submission(files: FileIntake) -> SubmissionInput {
    SubmissionInput {
        fields: valid_fields(),
        files,
    }
}

pub(super) struct Harness {
    pub(super) service: Arc<FormService<InMemoryFormRepository>>,
    pub(super) repository: InMemoryFormRepository,
    pub(super) storage: InMemoryObjectStorage,
}

pub(super) fn build_service(upload_dir: &Path) -> Harness {
    let repository = InMemoryFormRepository::default();
    let storage = InMemoryObjectStorage::default();
    let resolver = FileReferenceResolver::new(
        upload_dir,
        FilePolicy {
            max_file_bytes: MAX_FILE_BYTES,
        },
    );
    let service = Arc::new(FormService::new(
        Arc::new(repository.clone()),
        Arc::new(storage.clone()),
        resolver,
        FormConfig::default(),
    ));
    Harness {
        service,
        repository,
        storage,
    }
}

pub(super) fn admin_gate() -> AdminGate {
    AdminGate::new(Some(TokenSigner::new(JWT_SECRET)), "admin_token")
}

pub(super) fn bearer() -> String {
    let token = TokenSigner::new(JWT_SECRET)
        .issue("admin", Duration::from_secs(600))
        .expect("token signs");
    format!("Bearer {token}")
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body readable");
    serde_json::from_slice(&bytes).expect("json body")
}
