use super::*;
use crate::config::ExecutionMode;
use crate::error::{DownloadError, ToolError};
use crate::types::{FileType, JobStatus, Submission};

use super::test_helpers::{
    FakeBehavior, GENE_MATRIX, PHENO_MATRIX, create_test_provider, wait_for_status,
};

mod search;

fn submission(submitter_id: &str, accession_id: &str) -> Submission {
    Submission {
        submitter_id: submitter_id.to_string(),
        accession_id: accession_id.to_string(),
        apikey: "apikey|0123456789abcdef".to_string(),
        data_type: crate::types::DataType::GeneExpression,
        file_type: FileType::DatasetGeneExpression,
    }
}

fn with_file_type(mut submission: Submission, file_type: FileType) -> Submission {
    submission.file_type = file_type;
    submission
}
