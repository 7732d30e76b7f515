use std::path::{Path, PathBuf};

use bytes::Bytes;
use mime::Mime;
use tracing::debug;
use uuid::Uuid;

use super::domain::{FileReference, StoredFiles};
use super::validation::ValidationErrors;
use crate::storage::StorageError;

/// Public mount of the upload directory; stored local references start with it.
pub const UPLOAD_MOUNT: &str = "uploads";

const CV_CONTENT_TYPES: [&str; 3] = [
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
];

/// The two documents every submission carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileSlot {
    Photo,
    Cv,
}

impl FileSlot {
    pub const ALL: [FileSlot; 2] = [FileSlot::Photo, FileSlot::Cv];

    /// Multipart part name for a direct upload.
    pub const fn file_field(self) -> &'static str {
        match self {
            FileSlot::Photo => "photoFile",
            FileSlot::Cv => "cvFile",
        }
    }

    /// Field carrying a pre-signed object key.
    pub const fn key_field(self) -> &'static str {
        match self {
            FileSlot::Photo => "photoS3Key",
            FileSlot::Cv => "cvS3Key",
        }
    }

    pub const fn key_prefix(self) -> &'static str {
        match self {
            FileSlot::Photo => "photos",
            FileSlot::Cv => "cvs",
        }
    }

    pub fn from_kind(kind: &str) -> Option<Self> {
        match kind.trim().to_ascii_lowercase().as_str() {
            "photo" => Some(FileSlot::Photo),
            "cv" => Some(FileSlot::Cv),
            _ => None,
        }
    }

    /// Photos take any `image/*`; CVs take PDF, DOC, or DOCX.
    pub fn accepts(self, content_type: &Mime) -> bool {
        match self {
            FileSlot::Photo => content_type.type_() == mime::IMAGE,
            FileSlot::Cv => CV_CONTENT_TYPES.contains(&content_type.essence_str()),
        }
    }

    pub const fn expected_types(self) -> &'static str {
        match self {
            FileSlot::Photo => "an image/* file",
            FileSlot::Cv => "a PDF, DOC, or DOCX file",
        }
    }
}

/// A file part received in a multipart submission.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl UploadedFile {
    /// Declared content type, falling back to a guess from the file name.
    pub fn mime(&self) -> Option<Mime> {
        self.content_type
            .as_deref()
            .and_then(|raw| raw.parse::<Mime>().ok())
            .or_else(|| {
                self.file_name
                    .as_deref()
                    .and_then(|name| mime_guess::from_path(name).first())
            })
    }

    fn extension(&self) -> Option<String> {
        let from_name = self
            .file_name
            .as_deref()
            .and_then(|name| Path::new(name).extension())
            .and_then(|ext| ext.to_str())
            .filter(|ext| ext.len() <= 10 && ext.chars().all(|ch| ch.is_ascii_alphanumeric()))
            .map(str::to_ascii_lowercase);

        from_name.or_else(|| {
            self.mime()
                .and_then(|mime| mime_guess::get_mime_extensions(&mime))
                .and_then(|exts| exts.first())
                .map(|ext| ext.to_string())
        })
    }
}

/// Everything a request offered for the two file slots.
#[derive(Debug, Clone, Default)]
pub struct FileIntake {
    pub photo_key: Option<String>,
    pub cv_key: Option<String>,
    pub photo_file: Option<UploadedFile>,
    pub cv_file: Option<UploadedFile>,
}

impl FileIntake {
    pub fn set_key(&mut self, slot: FileSlot, key: String) {
        match slot {
            FileSlot::Photo => self.photo_key = Some(key),
            FileSlot::Cv => self.cv_key = Some(key),
        }
    }

    pub fn set_file(&mut self, slot: FileSlot, file: UploadedFile) {
        match slot {
            FileSlot::Photo => self.photo_file = Some(file),
            FileSlot::Cv => self.cv_file = Some(file),
        }
    }

    fn take(&mut self, slot: FileSlot) -> (Option<String>, Option<UploadedFile>) {
        match slot {
            FileSlot::Photo => (self.photo_key.take(), self.photo_file.take()),
            FileSlot::Cv => (self.cv_key.take(), self.cv_file.take()),
        }
    }

    /// True when either slot relies on a server-side upload.
    pub fn has_uploads(&self) -> bool {
        self.photo_file.is_some() || self.cv_file.is_some()
    }
}

/// Resolution chosen for one slot.
#[derive(Debug, Clone)]
pub enum SlotPlan {
    ObjectKey(String),
    Upload(UploadedFile),
}

/// Validated per-slot decisions; nothing has been written yet.
#[derive(Debug, Clone)]
pub struct ResolutionPlan {
    pub photo: SlotPlan,
    pub cv: SlotPlan,
}

/// Direct-upload constraints.
#[derive(Debug, Clone, Copy)]
pub struct FilePolicy {
    pub max_file_bytes: usize,
}

impl FilePolicy {
    /// Room for both files plus the text fields of the form.
    pub fn max_request_bytes(&self) -> usize {
        self.max_file_bytes.saturating_mul(2).saturating_add(1024 * 1024)
    }
}

/// Decides, per slot, between a pre-signed object key and a direct upload, and
/// writes accepted uploads under collision-free names.
#[derive(Debug, Clone)]
pub struct FileReferenceResolver {
    upload_dir: PathBuf,
    policy: FilePolicy,
}

impl FileReferenceResolver {
    pub fn new(upload_dir: impl Into<PathBuf>, policy: FilePolicy) -> Self {
        Self {
            upload_dir: upload_dir.into(),
            policy,
        }
    }

    pub fn policy(&self) -> FilePolicy {
        self.policy
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    /// Reference recorded for a file written under the upload directory,
    /// e.g. `uploads/cvFile-<uuid>.pdf`, whatever the directory is on disk.
    pub fn mounted_reference(name: &str) -> String {
        format!("{UPLOAD_MOUNT}/{name}")
    }

    /// Disk location of a stored local reference. Only the final path component
    /// of a mounted reference is used, so a reference cannot leave the upload
    /// directory. Anything else is taken as a literal path.
    pub fn disk_path(&self, reference: &str) -> PathBuf {
        match reference.strip_prefix(UPLOAD_MOUNT).and_then(|rest| rest.strip_prefix('/')) {
            Some(rest) => match Path::new(rest).file_name() {
                Some(name) => self.upload_dir.join(name),
                None => self.upload_dir.clone(),
            },
            None => PathBuf::from(reference),
        }
    }

    /// A non-empty key wins over an uploaded file for the same slot; otherwise
    /// the upload is mandatory and must satisfy the content-type and size policy.
    pub fn plan(&self, mut intake: FileIntake) -> Result<ResolutionPlan, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let mut plans = Vec::with_capacity(2);

        for slot in FileSlot::ALL {
            let (key, file) = intake.take(slot);
            let key = key
                .map(|key| key.trim().to_string())
                .filter(|key| !key.is_empty());

            let plan = match (key, file) {
                (Some(key), _) => Some(SlotPlan::ObjectKey(key)),
                (None, Some(file)) => self
                    .check_upload(slot, &file, &mut errors)
                    .then_some(SlotPlan::Upload(file)),
                (None, None) => {
                    errors.add(
                        slot.file_field(),
                        format!("{} or {} is required", slot.file_field(), slot.key_field()),
                    );
                    None
                }
            };
            plans.push(plan);
        }

        match (plans.pop().flatten(), plans.pop().flatten()) {
            (Some(cv), Some(photo)) if errors.is_empty() => Ok(ResolutionPlan { photo, cv }),
            _ => Err(errors),
        }
    }

    fn check_upload(
        &self,
        slot: FileSlot,
        file: &UploadedFile,
        errors: &mut ValidationErrors,
    ) -> bool {
        let mut ok = true;
        match file.mime() {
            Some(mime) if slot.accepts(&mime) => {}
            Some(mime) => {
                errors.add(
                    slot.file_field(),
                    format!(
                        "must be {} (received {})",
                        slot.expected_types(),
                        mime.essence_str()
                    ),
                );
                ok = false;
            }
            None => {
                errors.add(slot.file_field(), format!("must be {}", slot.expected_types()));
                ok = false;
            }
        }

        if file.bytes.is_empty() {
            errors.add(slot.file_field(), "must not be empty");
            ok = false;
        } else if file.bytes.len() > self.policy.max_file_bytes {
            errors.add(
                slot.file_field(),
                format!("exceeds the {} byte limit", self.policy.max_file_bytes),
            );
            ok = false;
        }
        ok
    }

    /// Writes planned uploads to disk. A failure after the first write leaves an
    /// orphan file behind; no cleanup is attempted.
    pub async fn commit(&self, plan: ResolutionPlan) -> Result<StoredFiles, StorageError> {
        let photo = self.commit_slot(FileSlot::Photo, plan.photo).await?;
        let cv = self.commit_slot(FileSlot::Cv, plan.cv).await?;
        Ok(StoredFiles::from_references(photo, cv))
    }

    async fn commit_slot(
        &self,
        slot: FileSlot,
        plan: SlotPlan,
    ) -> Result<FileReference, StorageError> {
        match plan {
            SlotPlan::ObjectKey(key) => Ok(FileReference::ObjectKey(key)),
            SlotPlan::Upload(file) => {
                let name = match file.extension() {
                    Some(ext) => format!("{}-{}.{}", slot.file_field(), Uuid::new_v4(), ext),
                    None => format!("{}-{}", slot.file_field(), Uuid::new_v4()),
                };
                tokio::fs::create_dir_all(&self.upload_dir).await?;
                let path = self.upload_dir.join(&name);
                tokio::fs::write(&path, &file.bytes).await?;
                debug!(
                    slot = slot.file_field(),
                    path = %path.display(),
                    bytes = file.bytes.len(),
                    "stored direct upload"
                );
                Ok(FileReference::LocalPath(Self::mounted_reference(&name)))
            }
        }
    }
}
