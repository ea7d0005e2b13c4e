use super::*;

#[tokio::test]
async fn test_search_lists_every_file_of_the_submitter() {
    let (provider, _runtime, _temp_dir) = create_test_provider(ExecutionMode::Sync).await;
    provider
        .submit(submission("a@x.com", "SDY61"))
        .await
        .unwrap();
    provider
        .submit(submission("a@x.com", "SDY269"))
        .await
        .unwrap();
    provider
        .submit(submission("b@x.com", "SDY61"))
        .await
        .unwrap();

    let entries = provider.search("a@x.com").await.unwrap();
    assert_eq!(entries.len(), 4);
    assert!(entries.iter().all(|e| e.submitter_id == "a@x.com"));
    assert!(entries.iter().all(|e| e.status == JobStatus::Finished));

    let json = serde_json::to_value(&entries).unwrap();
    assert!(json[0].get("apikey").is_none());
    assert_eq!(json[0]["file_name"], "geneBySampleMatrix.csv");
}

#[tokio::test]
async fn test_search_without_records_is_not_found() {
    let (provider, _runtime, _temp_dir) = create_test_provider(ExecutionMode::Sync).await;
    let err = provider.search("nobody@x.com").await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn test_status_reports_record_state() {
    let (provider, _runtime, _temp_dir) = create_test_provider(ExecutionMode::Sync).await;
    let descriptor = provider
        .submit(submission("a@x.com", "SDY61"))
        .await
        .unwrap();

    let status = provider
        .status(descriptor.download_id.as_str())
        .await
        .unwrap();
    assert_eq!(status.download_id, descriptor.download_id);
    assert_eq!(status.status, JobStatus::Finished);

    let err = provider.status("ffffffff").await.unwrap_err();
    assert!(matches!(err, Error::Download(DownloadError::NotFound { .. })));
}
