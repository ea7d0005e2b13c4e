//! Object descriptors and access to the files of finished downloads.

use crate::db::DownloadRecord;
use crate::error::{DownloadError, Error, Result};
use crate::naming::{is_safe_file_name, is_safe_identifier};
use crate::types::{DownloadId, FileType, JobStatus, ObjectDescriptor, ObjectId};
use std::io::Write;
use std::path::{Path, PathBuf};

use super::ImmunespaceProvider;

/// Name of the lazily built archive inside a working directory
pub const BUNDLE_FILE_NAME: &str = "data.zip";

/// Content type of single-file responses
pub const CSV_CONTENT_TYPE: &str = "text/csv";

/// Content type of bundle responses
pub const ZIP_CONTENT_TYPE: &str = "application/zip";

/// A file opened for streaming
#[derive(Debug)]
pub struct OpenedFile {
    /// Open handle positioned at the start
    pub file: tokio::fs::File,
    /// Name to present in `Content-Disposition`
    pub file_name: String,
    /// Media type of the body
    pub content_type: &'static str,
    /// Size in bytes
    pub len: u64,
}

impl ImmunespaceProvider {
    /// Descriptor of one object, with its size read from disk
    pub async fn object(&self, object_id: &str) -> Result<ObjectDescriptor> {
        let record = self.find_object(object_id).await?.ok_or_else(|| {
            Error::Download(DownloadError::NotFound {
                id: object_id.to_string(),
            })
        })?;

        let path = self.working_dir(&record.download_id).join(&record.file_name);
        let size = match tokio::fs::metadata(&path).await {
            Ok(metadata) => metadata.len(),
            Err(_) => u64::try_from(record.size_bytes).unwrap_or(0),
        };

        Ok(self.descriptor(&record, size))
    }

    /// Open a single file or the bundle of a download
    ///
    /// - `id` is an object id and `file_name` is `None`: that object's CSV
    /// - `id` is a download id and `file_name` is `None`: the zipped bundle
    /// - `file_name` is set: that file of the download `id` belongs to; a
    ///   missing `.csv` extension is added
    pub async fn open(&self, id: &str, file_name: Option<&str>) -> Result<OpenedFile> {
        if !is_safe_identifier(id) {
            return Err(not_found(id));
        }

        match file_name {
            Some(name) => self.open_named(id, name).await,
            None => {
                if let Some(record) = self.find_object(id).await? {
                    return self.open_record(&record).await;
                }
                self.open_bundle(&DownloadId::from(id)).await
            }
        }
    }

    async fn open_named(&self, id: &str, name: &str) -> Result<OpenedFile> {
        if !is_safe_file_name(name) {
            return Err(not_found(name));
        }
        let file_name = if name.ends_with(".csv") {
            name.to_string()
        } else {
            format!("{}.csv", name)
        };

        let download_id = match self.find_object(id).await? {
            Some(record) => record.download_id,
            None => DownloadId::from(id),
        };

        let record = self
            .db
            .list_by_download_id(&download_id)
            .await?
            .into_iter()
            .find(|record| record.file_name == file_name)
            .ok_or_else(|| not_found(&format!("{}/{}", download_id, file_name)))?;

        self.open_record(&record).await
    }

    async fn open_record(&self, record: &DownloadRecord) -> Result<OpenedFile> {
        ensure_finished(&record.download_id, record.job_status())?;
        let path = self.working_dir(&record.download_id).join(&record.file_name);
        open_file(&record.download_id, &path, &record.file_name, CSV_CONTENT_TYPE).await
    }

    async fn open_bundle(&self, download_id: &DownloadId) -> Result<OpenedFile> {
        let records = self.db.list_by_download_id(download_id).await?;
        let Some(first) = records.first() else {
            return Err(not_found(download_id.as_str()));
        };
        ensure_finished(download_id, first.job_status())?;

        let dir = self.working_dir(download_id);
        let bundle = dir.join(BUNDLE_FILE_NAME);
        if tokio::fs::metadata(&bundle).await.is_err() {
            let sources: Vec<PathBuf> = FileType::ALL
                .iter()
                .map(|file_type| dir.join(file_type.file_name()))
                .collect();
            for source in &sources {
                if tokio::fs::metadata(source).await.is_err() {
                    return Err(Error::Download(DownloadError::FilesNotFound {
                        id: download_id.to_string(),
                        path: source.clone(),
                    }));
                }
            }

            tracing::info!(download_id = %download_id, "Building bundle");
            let target = bundle.clone();
            tokio::task::spawn_blocking(move || build_bundle(&sources, &target))
                .await
                .map_err(|e| Error::Other(format!("bundle task failed: {}", e)))??;
        }

        open_file(download_id, &bundle, BUNDLE_FILE_NAME, ZIP_CONTENT_TYPE).await
    }

    /// Look up an object record, treating malformed ids as unknown
    async fn find_object(&self, object_id: &str) -> Result<Option<DownloadRecord>> {
        if !is_safe_identifier(object_id) {
            return Ok(None);
        }
        self.db.find_by_object_id(&ObjectId::from(object_id)).await
    }
}

fn not_found(id: &str) -> Error {
    Error::Download(DownloadError::NotFound { id: id.to_string() })
}

fn ensure_finished(download_id: &DownloadId, status: JobStatus) -> Result<()> {
    if status == JobStatus::Finished {
        Ok(())
    } else {
        Err(Error::Download(DownloadError::NotFinished {
            id: download_id.to_string(),
            status: status.to_string(),
        }))
    }
}

async fn open_file(
    download_id: &DownloadId,
    path: &Path,
    file_name: &str,
    content_type: &'static str,
) -> Result<OpenedFile> {
    let file = match tokio::fs::File::open(path).await {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::Download(DownloadError::FilesNotFound {
                id: download_id.to_string(),
                path: path.to_path_buf(),
            }));
        }
        Err(e) => return Err(Error::Io(e)),
    };
    let len = file.metadata().await?.len();

    Ok(OpenedFile {
        file,
        file_name: file_name.to_string(),
        content_type,
        len,
    })
}

/// Write `sources` into a stored (uncompressed) zip at `target`
///
/// The archive is written under a unique temporary name and renamed into
/// place, so readers never see a partial bundle.
pub(crate) fn build_bundle(sources: &[PathBuf], target: &Path) -> Result<()> {
    let partial = target.with_extension(format!("{}.partial", uuid::Uuid::new_v4().simple()));

    let result = (|| -> Result<()> {
        let file = std::fs::File::create(&partial)?;
        let mut zip = zip::ZipWriter::new(file);
        let options = zip::write::FileOptions::default()
            .compression_method(zip::CompressionMethod::Stored);

        for source in sources {
            let name = source
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| Error::Other(format!("invalid bundle source {}", source.display())))?;
            zip.start_file(name, options)
                .map_err(|e| Error::Other(format!("failed to add {} to bundle: {}", source.display(), e)))?;
            let mut input = std::fs::File::open(source)?;
            std::io::copy(&mut input, &mut zip)?;
        }

        let mut file = zip
            .finish()
            .map_err(|e| Error::Other(format!("failed to finish bundle: {}", e)))?;
        file.flush()?;
        std::fs::rename(&partial, target)?;
        Ok(())
    })();

    if result.is_err() {
        let _ = std::fs::remove_file(&partial);
    }
    result
}
