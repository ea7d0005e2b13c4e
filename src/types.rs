//! Core types for immunespace-provider

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{Error, Result};

/// Short token identifying one download and its working directory
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct DownloadId(pub String);

/// Identifier for one retrievable derived file
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct ObjectId(pub String);

// Both identifiers are stored as TEXT and behave like their inner string
macro_rules! string_identifier {
    ($name:ident) => {
        impl $name {
            /// Borrow the identifier as a string slice
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl sqlx::Type<sqlx::Sqlite> for $name {
            fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
                <String as sqlx::Type<sqlx::Sqlite>>::type_info()
            }

            fn compatible(ty: &sqlx::sqlite::SqliteTypeInfo) -> bool {
                <String as sqlx::Type<sqlx::Sqlite>>::compatible(ty)
            }
        }

        impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut Vec<sqlx::sqlite::SqliteArgumentValue<'q>>,
            ) -> std::result::Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>>
            {
                sqlx::Encode::<sqlx::Sqlite>::encode_by_ref(&self.0, buf)
            }
        }

        impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for $name {
            fn decode(
                value: sqlx::sqlite::SqliteValueRef<'r>,
            ) -> std::result::Result<Self, sqlx::error::BoxDynError> {
                let id = <String as sqlx::Decode<sqlx::Sqlite>>::decode(value)?;
                Ok(Self(id))
            }
        }
    };
}

string_identifier!(DownloadId);
string_identifier!(ObjectId);

/// Kind of derived file produced by a download
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum FileType {
    /// Gene-by-sample expression matrix
    #[default]
    #[serde(rename = "datasetGeneExpression")]
    DatasetGeneExpression,
    /// Phenotype/sample properties matrix
    #[serde(rename = "datasetProperties")]
    DatasetProperties,
}

impl FileType {
    /// Every file a completed download is expected to contain, in record order
    pub const ALL: [FileType; 2] = [FileType::DatasetGeneExpression, FileType::DatasetProperties];

    /// Wire name of the file type
    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::DatasetGeneExpression => "datasetGeneExpression",
            FileType::DatasetProperties => "datasetProperties",
        }
    }

    /// Name of the CSV file the groups tool writes for this type
    pub fn file_name(&self) -> &'static str {
        match self {
            FileType::DatasetGeneExpression => "geneBySampleMatrix.csv",
            FileType::DatasetProperties => "phenoDataMatrix.csv",
        }
    }
}

impl std::str::FromStr for FileType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "datasetGeneExpression" => Ok(FileType::DatasetGeneExpression),
            "datasetProperties" => Ok(FileType::DatasetProperties),
            other => Err(Error::Validation(format!("unknown file_type '{}'", other))),
        }
    }
}

/// Kind of data a download holds
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum DataType {
    /// Gene expression data
    #[default]
    #[serde(rename = "geneExpression")]
    GeneExpression,
}

impl DataType {
    /// Wire name of the data type
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::GeneExpression => "geneExpression",
        }
    }
}

impl std::str::FromStr for DataType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "geneExpression" => Ok(DataType::GeneExpression),
            other => Err(Error::Validation(format!("unknown data_type '{}'", other))),
        }
    }
}

/// Lifecycle state of a download job, mirrored into every record of the download
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Waiting for a worker
    Queued,
    /// Tool stages are running
    Started,
    /// Both stages completed and statistics were recorded
    Finished,
    /// A stage or the statistics step failed
    Failed,
    /// Cancelled through the deletion workflow
    Deleted,
}

impl JobStatus {
    /// Stored/wire name of the status
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Started => "started",
            JobStatus::Finished => "finished",
            JobStatus::Failed => "failed",
            JobStatus::Deleted => "deleted",
        }
    }

    /// Parse a stored status. Unknown values are treated as failed.
    pub fn from_db(value: &str) -> Self {
        match value {
            "queued" => JobStatus::Queued,
            "started" => JobStatus::Started,
            "finished" => JobStatus::Finished,
            "deleted" => JobStatus::Deleted,
            _ => JobStatus::Failed,
        }
    }

    /// Whether a job in this state still owns its working directory
    pub fn is_active(&self) -> bool {
        matches!(self, JobStatus::Queued | JobStatus::Started)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Overall outcome of a deletion request
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DeleteStatus {
    /// Nothing matched the identifier
    Done,
    /// Job, records and files were removed as expected
    Deleted,
    /// A step completed but did not remove what was expected
    Failed,
    /// A step raised an error
    Exception,
}

impl DeleteStatus {
    /// Combine two step outcomes; the more severe one wins
    pub fn escalate(self, other: DeleteStatus) -> DeleteStatus {
        self.max(other)
    }
}

/// Content entry of an object descriptor
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ContentsObject {
    /// Object identifier of the file
    pub id: String,
    /// File name on disk
    pub name: String,
    /// URI that streams the file
    pub drs_uri: String,
}

/// DRS-style description of one derived file
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ObjectDescriptor {
    /// Same as `object_id`
    pub id: ObjectId,
    /// Object identifier of the file
    pub object_id: ObjectId,
    /// Download this file belongs to
    pub download_id: DownloadId,
    /// Submitter email
    pub submitter_id: String,
    /// File name
    pub name: String,
    /// URI of this descriptor
    pub self_uri: String,
    /// Size in bytes
    pub size: u64,
    /// `"{rows}x{cols}"` for tabular files
    pub dimensions: Option<String>,
    /// Data type of the download
    pub data_type: String,
    /// File type of this record
    pub file_type: String,
    /// When the download was requested
    pub created_time: DateTime<Utc>,
    /// Media type of the file
    pub mime_type: String,
    /// Current job status
    pub status: JobStatus,
    /// Files addressable through this descriptor
    pub contents: Vec<ContentsObject>,
    /// Diagnostics captured from the tool stages
    pub stderr: Option<String>,
}

/// One search hit; credentials are never echoed back
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct SearchEntry {
    /// Download this file belongs to
    pub download_id: DownloadId,
    /// Object identifier of the file
    pub object_id: ObjectId,
    /// Submitter email
    pub submitter_id: String,
    /// ImmunoSpace accession or group
    pub accession_id: String,
    /// Data type
    pub data_type: String,
    /// File type
    pub file_type: String,
    /// File name
    pub file_name: String,
    /// Size in bytes
    pub size: u64,
    /// `"{rows}x{cols}"`
    pub dimensions: Option<String>,
    /// Current job status
    pub status: JobStatus,
    /// When the download was requested
    pub date_downloaded: DateTime<Utc>,
}

/// Response of the status endpoint
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct StatusResult {
    /// The download that was queried
    pub download_id: DownloadId,
    /// Its current state
    pub status: JobStatus,
}

/// Response of the deletion endpoint
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DeleteResult {
    /// Aggregated outcome
    pub status: DeleteStatus,
    /// What each step did
    pub info: String,
    /// Errors raised by any step
    pub stderr: String,
}

/// Raw submission parameters as they arrive from a query string or form
///
/// Every field is optional here so that query and form values can be merged
/// before validation.
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct SubmitParameters {
    /// Submitter email
    #[serde(default, alias = "email")]
    pub submitter_id: Option<String>,
    /// ImmunoSpace accession or group identifier
    #[serde(default, alias = "group")]
    pub accession_id: Option<String>,
    /// ImmunoSpace API key
    #[serde(default)]
    pub apikey: Option<String>,
    /// Data type (default: geneExpression)
    #[serde(default)]
    pub data_type: Option<String>,
    /// File type to describe in the response (default: datasetGeneExpression)
    #[serde(default)]
    pub file_type: Option<String>,
}

/// Validated submission
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Submission {
    /// Submitter email
    pub submitter_id: String,
    /// Accession or group identifier
    pub accession_id: String,
    /// API key handed to the groups tool
    pub apikey: String,
    /// Requested data type
    pub data_type: DataType,
    /// File type whose record is returned
    pub file_type: FileType,
}

impl SubmitParameters {
    /// Fill fields missing from `self` with the values in `other`
    pub fn merge(self, other: SubmitParameters) -> SubmitParameters {
        SubmitParameters {
            submitter_id: self.submitter_id.or(other.submitter_id),
            accession_id: self.accession_id.or(other.accession_id),
            apikey: self.apikey.or(other.apikey),
            data_type: self.data_type.or(other.data_type),
            file_type: self.file_type.or(other.file_type),
        }
    }

    /// Validate required fields and parse the optional ones
    pub fn validate(self) -> Result<Submission> {
        let submitter_id = required(self.submitter_id, "submitter_id (or email)")?;
        let accession_id = required(self.accession_id, "accession_id (or group)")?;
        let apikey = required(self.apikey, "apikey")?;

        let data_type = match non_blank(self.data_type) {
            Some(value) => value.parse()?,
            None => DataType::default(),
        };
        let file_type = match non_blank(self.file_type) {
            Some(value) => value.parse()?,
            None => FileType::default(),
        };

        Ok(Submission {
            submitter_id,
            accession_id,
            apikey,
            data_type,
            file_type,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required(value: Option<String>, name: &str) -> Result<String> {
    non_blank(value).ok_or_else(|| Error::Validation(format!("{} is required", name)))
}
