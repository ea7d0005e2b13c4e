use super::*;
use crate::types::FileType;

fn key<'a>(submitter: &'a str, accession: &'a str, file_type: FileType) -> RecordKey<'a> {
    RecordKey {
        submitter_id: submitter,
        accession_id: accession,
        apikey: "k1",
        file_type: file_type.as_str(),
    }
}

#[tokio::test]
async fn test_insert_and_find_by_key() {
    let (db, _file) = open_test_db().await;
    let download_id = new_download_id();
    let object_ids = insert_download(&db, &download_id, "a@x.com", "G1").await;

    let found = db
        .find_by_key(&key("a@x.com", "G1", FileType::DatasetGeneExpression))
        .await
        .unwrap()
        .expect("record for gene expression");
    assert_eq!(found.download_id, download_id);
    assert_eq!(found.object_id, object_ids[0]);
    assert_eq!(found.file_name, "geneBySampleMatrix.csv");
    assert_eq!(found.job_status(), JobStatus::Queued);
    assert_eq!(found.size_bytes, 0);
    assert!(found.dimensions.is_none());

    let properties = db
        .find_by_key(&key("a@x.com", "G1", FileType::DatasetProperties))
        .await
        .unwrap()
        .expect("record for properties");
    assert_eq!(properties.download_id, download_id);
    assert_eq!(properties.object_id, object_ids[1]);

    let missing = db
        .find_by_key(&key("a@x.com", "G2", FileType::DatasetGeneExpression))
        .await
        .unwrap();
    assert!(missing.is_none());

    db.close().await;
}

#[tokio::test]
async fn test_object_ids_are_unique() {
    let (db, _file) = open_test_db().await;
    let download_id = new_download_id();
    let object_ids = insert_download(&db, &download_id, "a@x.com", "G1").await;

    let duplicate = NewDownloadRecord {
        download_id: new_download_id(),
        object_id: object_ids[0].clone(),
        submitter_id: "b@x.com".to_string(),
        accession_id: "G9".to_string(),
        apikey: "k9".to_string(),
        data_type: "geneExpression".to_string(),
        file_type: "datasetGeneExpression".to_string(),
        file_name: "geneBySampleMatrix.csv".to_string(),
        status: JobStatus::Queued,
    };
    assert!(db.insert_record(&duplicate).await.is_err());

    db.close().await;
}

#[tokio::test]
async fn test_complete_and_fail_update_records() {
    let (db, _file) = open_test_db().await;
    let download_id = new_download_id();
    let object_ids = insert_download(&db, &download_id, "a@x.com", "G1").await;

    assert_eq!(db.mark_started(&download_id).await.unwrap(), 2);
    let started = db.find_by_object_id(&object_ids[0]).await.unwrap().unwrap();
    assert_eq!(started.job_status(), JobStatus::Started);
    assert!(started.started_at.is_some());

    let completion = Completion {
        size_bytes: 2048,
        dimensions: "10x4".to_string(),
        stderr: "groups ok\nmapper ok\n".to_string(),
    };
    assert_eq!(db.complete_record(&object_ids[0], &completion).await.unwrap(), 1);

    let done = db.find_by_object_id(&object_ids[0]).await.unwrap().unwrap();
    assert_eq!(done.job_status(), JobStatus::Finished);
    assert_eq!(done.size_bytes, 2048);
    assert_eq!(done.dimensions.as_deref(), Some("10x4"));
    assert_eq!(done.stderr.as_deref(), Some("groups ok\nmapper ok\n"));
    assert!(done.completed_at.is_some());

    assert_eq!(db.fail_download(&download_id, "boom").await.unwrap(), 2);
    for record in db.list_by_download_id(&download_id).await.unwrap() {
        assert_eq!(record.job_status(), JobStatus::Failed);
        assert_eq!(record.stderr.as_deref(), Some("boom"));
    }

    db.close().await;
}

#[tokio::test]
async fn test_search_by_submitter() {
    let (db, _file) = open_test_db().await;
    insert_download(&db, &new_download_id(), "a@x.com", "G1").await;
    insert_download(&db, &new_download_id(), "a@x.com", "G2").await;
    insert_download(&db, &new_download_id(), "b@x.com", "G1").await;

    let hits = db.search_by_submitter("a@x.com").await.unwrap();
    assert_eq!(hits.len(), 4);
    assert!(hits.iter().all(|r| r.submitter_id == "a@x.com"));

    assert!(db.search_by_submitter("nobody@x.com").await.unwrap().is_empty());

    db.close().await;
}

#[tokio::test]
async fn test_list_download_ids_with_status() {
    let (db, _file) = open_test_db().await;
    let queued = new_download_id();
    let started = new_download_id();
    let finished = new_download_id();
    insert_download(&db, &queued, "a@x.com", "G1").await;
    insert_download(&db, &started, "a@x.com", "G2").await;
    insert_download(&db, &finished, "a@x.com", "G3").await;
    db.mark_started(&started).await.unwrap();
    db.set_status(&finished, JobStatus::Finished).await.unwrap();

    let active = db
        .list_download_ids_with_status(&[JobStatus::Queued, JobStatus::Started])
        .await
        .unwrap();
    assert_eq!(active, vec![queued, started]);

    assert!(db.list_download_ids_with_status(&[]).await.unwrap().is_empty());

    db.close().await;
}

#[tokio::test]
async fn test_delete_by_download_id_reports_count() {
    let (db, _file) = open_test_db().await;
    let download_id = new_download_id();
    let other = new_download_id();
    insert_download(&db, &download_id, "a@x.com", "G1").await;
    insert_download(&db, &other, "a@x.com", "G2").await;

    assert_eq!(db.delete_by_download_id(&download_id).await.unwrap(), 2);
    assert_eq!(db.delete_by_download_id(&download_id).await.unwrap(), 0);
    assert_eq!(db.count_by_download_id(&download_id).await.unwrap(), 0);
    assert_eq!(db.count_by_download_id(&other).await.unwrap(), 2);

    db.close().await;
}

#[tokio::test]
async fn test_mirror_job_status_keeps_ended_records() {
    let (db, _file) = open_test_db().await;
    let running = new_download_id();
    let finished = new_download_id();
    let failed = new_download_id();
    insert_download(&db, &running, "a@x.com", "G1").await;
    insert_download(&db, &finished, "a@x.com", "G2").await;
    insert_download(&db, &failed, "a@x.com", "G3").await;
    db.set_status(&finished, JobStatus::Finished).await.unwrap();
    db.fail_download(&failed, "boom").await.unwrap();

    assert_eq!(db.mirror_job_status(&running, JobStatus::Started).await.unwrap(), 2);
    assert_eq!(db.mirror_job_status(&finished, JobStatus::Started).await.unwrap(), 0);
    assert_eq!(db.mirror_job_status(&failed, JobStatus::Started).await.unwrap(), 0);

    let records = db.list_by_download_id(&finished).await.unwrap();
    assert!(records.iter().all(|r| r.job_status() == JobStatus::Finished));
    let records = db.list_by_download_id(&running).await.unwrap();
    assert!(records.iter().all(|r| r.job_status() == JobStatus::Started));

    db.close().await;
}
