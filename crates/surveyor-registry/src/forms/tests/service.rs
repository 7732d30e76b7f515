use serde_json::json;

use super::common::{build_service, direct_upload_files, presigned_files, submission};
use crate::forms::domain::{FormId, ReviewState};
use crate::forms::service::FormServiceError;

#[tokio::test]
async fn submission_runs_the_whole_pipeline() {
    let dir = tempfile::tempdir().expect("temp dir");
    let harness = build_service(dir.path());

    let mut input = submission(direct_upload_files());
    input.fields.insert("discipline".to_string(), json!("other"));
    input
        .fields
        .insert("disciplineOther".to_string(), json!("Marine Surveyor"));
    input
        .fields
        .insert("vesselTypesOther".to_string(), json!("Dredger"));

    let id = harness.service.submit(input).await.expect("submission stored");
    let row = harness.repository.get(id).expect("row exists");

    assert_eq!(row.profile.discipline_other.as_deref(), Some("Marine Surveyor"));
    assert_eq!(row.profile.vessel_types_other, None);
    assert_eq!(row.profile.phone_number, "+4402079460958");
    assert_eq!(row.profile.mobile_number.as_deref(), Some("07700900123"));
    assert!(row.files.photo_path.is_some());
    assert_eq!(row.review_state(), ReviewState::Unreviewed);
}

#[tokio::test]
async fn field_and_file_errors_are_reported_together() {
    let dir = tempfile::tempdir().expect("temp dir");
    let harness = build_service(dir.path());

    let mut input = submission(Default::default());
    input.fields.remove("email");

    match harness.service.submit(input).await {
        Err(FormServiceError::Validation(errors)) => {
            assert!(errors.contains("email"));
            assert!(errors.contains("photoFile"));
            assert!(errors.contains("cvFile"));
        }
        other => panic!("expected validation failure, got {other:?}"),
    }
    assert!(harness.repository.is_empty());
    assert_eq!(
        std::fs::read_dir(dir.path()).expect("dir readable").count(),
        0,
        "nothing written for a rejected submission"
    );
}

#[tokio::test]
async fn approval_requires_a_prior_review() {
    let dir = tempfile::tempdir().expect("temp dir");
    let harness = build_service(dir.path());
    let id = harness
        .service
        .submit(submission(presigned_files()))
        .await
        .expect("submission stored");

    assert!(matches!(
        harness.service.approve(id).await,
        Err(FormServiceError::ApprovalRejected(_))
    ));
    assert!(!harness.repository.get(id).expect("row").approved);

    harness.service.mark_reviewed(id).await.expect("reviewed");
    let stamp = harness.service.approve(id).await.expect("approved");
    assert!(stamp.approved);

    assert!(matches!(
        harness.service.approve(id).await,
        Err(FormServiceError::ApprovalRejected(_))
    ));
    let row = harness.repository.get(id).expect("row");
    assert_eq!(row.approved_at, Some(stamp.approved_at));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_approvals_apply_once() {
    let dir = tempfile::tempdir().expect("temp dir");
    let harness = build_service(dir.path());
    let id = harness
        .service
        .submit(submission(presigned_files()))
        .await
        .expect("submission stored");
    harness.service.mark_reviewed(id).await.expect("reviewed");

    let attempts: Vec<_> = (0..8)
        .map(|_| {
            let service = harness.service.clone();
            tokio::spawn(async move { service.approve(id).await })
        })
        .collect();

    let mut stamps = Vec::new();
    for attempt in attempts {
        match attempt.await.expect("task completes") {
            Ok(stamp) => stamps.push(stamp),
            Err(FormServiceError::ApprovalRejected(_)) => {}
            Err(other) => panic!("unexpected error {other:?}"),
        }
    }

    assert_eq!(stamps.len(), 1, "exactly one approval wins");
    let row = harness.repository.get(id).expect("row");
    assert!(row.approved);
    assert_eq!(row.approved_at, Some(stamps[0].approved_at));
}

#[tokio::test]
async fn review_is_idempotent_and_refreshes_the_timestamp() {
    let dir = tempfile::tempdir().expect("temp dir");
    let harness = build_service(dir.path());
    let id = harness
        .service
        .submit(submission(presigned_files()))
        .await
        .expect("submission stored");

    let first = harness.service.mark_reviewed(id).await.expect("reviewed");
    let second = harness.service.mark_reviewed(id).await.expect("reviewed again");
    assert!(second.reviewed);
    assert!(second.reviewed_at >= first.reviewed_at);

    assert!(matches!(
        harness.service.mark_reviewed(FormId(9999)).await,
        Err(FormServiceError::NotFound(_))
    ));
}

#[tokio::test]
async fn delete_survives_missing_objects() {
    let dir = tempfile::tempdir().expect("temp dir");
    let harness = build_service(dir.path());
    harness
        .storage
        .insert("cvs/resume.pdf", &b"%PDF"[..], Some("application/pdf"));

    let id = harness
        .service
        .submit(submission(presigned_files()))
        .await
        .expect("submission stored");

    let deleted = harness.service.delete(id).await.expect("row deleted");
    assert_eq!(deleted, id);
    assert!(harness.repository.get(id).is_none());
    assert!(!harness.storage.contains("cvs/resume.pdf"));
    assert_eq!(
        harness.storage.deleted_keys(),
        vec!["photos/portrait.png", "cvs/resume.pdf"]
    );

    assert!(matches!(
        harness.service.delete(id).await,
        Err(FormServiceError::NotFound(_))
    ));
}

#[tokio::test]
async fn delete_removes_direct_uploads_from_disk() {
    let dir = tempfile::tempdir().expect("temp dir");
    let harness = build_service(dir.path());
    let id = harness
        .service
        .submit(submission(direct_upload_files()))
        .await
        .expect("submission stored");
    let photo = harness
        .repository
        .get(id)
        .and_then(|row| row.files.photo_path)
        .expect("photo path");
    let on_disk = harness.service.resolver().disk_path(&photo);
    assert!(on_disk.exists());

    harness.service.delete(id).await.expect("row deleted");
    assert!(!on_disk.exists());
}

#[tokio::test]
async fn listing_is_newest_first_and_bounded() {
    let dir = tempfile::tempdir().expect("temp dir");
    let harness = build_service(dir.path());
    let mut ids = Vec::new();
    for _ in 0..3 {
        ids.push(
            harness
                .service
                .submit(submission(presigned_files()))
                .await
                .expect("submission stored"),
        );
    }

    let all = harness.service.list(None, None).await.expect("list");
    let listed: Vec<FormId> = all.iter().map(|row| row.id).collect();
    assert_eq!(listed, vec![ids[2], ids[1], ids[0]]);
    assert_eq!(all[0].profile.vessel_types, vec!["Bulk Carrier", "Tanker"]);

    let page = harness.service.list(Some(1), Some(1)).await.expect("page");
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].id, ids[1]);

    let stats = harness.service.stats().await.expect("stats");
    assert_eq!(stats.total, 3);
    assert_eq!(stats.pending, 3);
    assert_eq!(stats.new_today, 3);
}
