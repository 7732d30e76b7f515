//! Reads a submission body in either of its two wire shapes: multipart with
//! string fields and file parts, or a JSON object carrying object-storage keys.

use axum::extract::{FromRequest, Multipart, Request};
use axum::http::header;
use axum::Json;
use serde_json::Value;

use super::files::{FileIntake, FileSlot, UploadedFile};
use super::validation::{SubmissionFields, ValidationErrors};
use crate::error::AppError;

/// Untyped fields plus whatever the request offered for the two file slots.
#[derive(Debug, Clone, Default)]
pub struct SubmissionInput {
    pub fields: SubmissionFields,
    pub files: FileIntake,
}

impl SubmissionInput {
    /// Key fields are lifted out of the map; everything else stays for validation.
    pub fn from_fields(mut fields: SubmissionFields) -> Result<Self, ValidationErrors> {
        let mut files = FileIntake::default();
        let mut errors = ValidationErrors::new();

        for slot in FileSlot::ALL {
            match fields.remove(slot.key_field()) {
                None | Some(Value::Null) => {}
                Some(Value::String(key)) => files.set_key(slot, key),
                Some(_) => errors.add(slot.key_field(), "must be a string"),
            }
        }

        errors.into_result(Self { fields, files })
    }

    pub fn from_json(body: Value) -> Result<Self, AppError> {
        match body {
            Value::Object(fields) => Ok(Self::from_fields(fields)?),
            _ => Err(AppError::bad_request("Submission body must be a JSON object")),
        }
    }

    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut fields = SubmissionFields::new();
        let mut files = FileIntake::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|err| AppError::bad_request(err.body_text()))?
        {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            let slot = FileSlot::ALL
                .into_iter()
                .find(|slot| slot.file_field() == name);

            if let Some(slot) = slot {
                let file_name = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|err| AppError::bad_request(err.body_text()))?;
                files.set_file(
                    slot,
                    UploadedFile {
                        file_name,
                        content_type,
                        bytes,
                    },
                );
            } else if field.file_name().is_some() {
                // Unexpected file parts are drained and dropped.
                field
                    .bytes()
                    .await
                    .map_err(|err| AppError::bad_request(err.body_text()))?;
            } else {
                let text = field
                    .text()
                    .await
                    .map_err(|err| AppError::bad_request(err.body_text()))?;
                fields.insert(name, Value::String(text));
            }
        }

        let mut input = Self::from_fields(fields)?;
        input.files.photo_file = files.photo_file;
        input.files.cv_file = files.cv_file;
        Ok(input)
    }

    /// Dispatches on `Content-Type`.
    pub async fn read(request: Request) -> Result<Self, AppError> {
        let content_type = request
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<mime::Mime>().ok());

        match content_type {
            Some(mime) if mime.essence_str() == mime::MULTIPART_FORM_DATA.essence_str() => {
                let multipart = Multipart::from_request(request, &())
                    .await
                    .map_err(|rejection| AppError::bad_request(rejection.body_text()))?;
                Self::from_multipart(multipart).await
            }
            Some(mime) if mime.subtype() == mime::JSON || mime.suffix() == Some(mime::JSON) => {
                let Json(body) = Json::<Value>::from_request(request, &())
                    .await
                    .map_err(|rejection| AppError::bad_request(rejection.body_text()))?;
                Self::from_json(body)
            }
            _ => Err(AppError::bad_request(
                "Submissions must be multipart/form-data or application/json",
            )),
        }
    }
}
