use super::*;
use crate::naming::{new_download_id, new_object_id};
use tempfile::NamedTempFile;

mod records;

/// Open a fresh database backed by a temp file (kept alive by the caller)
async fn open_test_db() -> (Database, NamedTempFile) {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();
    (db, temp_file)
}

/// Insert the two records of one download and return their object ids
async fn insert_download(
    db: &Database,
    download_id: &DownloadId,
    submitter_id: &str,
    accession_id: &str,
) -> Vec<ObjectId> {
    let mut object_ids = Vec::new();
    for file_type in crate::types::FileType::ALL {
        let object_id = new_object_id();
        db.insert_record(&NewDownloadRecord {
            download_id: download_id.clone(),
            object_id: object_id.clone(),
            submitter_id: submitter_id.to_string(),
            accession_id: accession_id.to_string(),
            apikey: "k1".to_string(),
            data_type: "geneExpression".to_string(),
            file_type: file_type.as_str().to_string(),
            file_name: file_type.file_name().to_string(),
            status: JobStatus::Queued,
        })
        .await
        .unwrap();
        object_ids.push(object_id);
    }
    object_ids
}

#[tokio::test]
async fn test_helpers_insert_one_record_per_file_type() {
    let (db, _file) = open_test_db().await;
    let download_id = new_download_id();
    let object_ids = insert_download(&db, &download_id, "a@x.com", "G1").await;
    assert_eq!(object_ids.len(), 2);
    assert_eq!(db.count_by_download_id(&download_id).await.unwrap(), 2);
    db.close().await;
}
