//! Size and shape statistics for the CSV files produced by the tools.
//!
//! Rows are counted as lines (a header line counts as a row, and a final line
//! without a trailing newline still counts). Columns are the comma-separated
//! fields of the first line minus the leading row-label column.

use std::path::Path;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

use crate::error::Result;

/// Statistics of one CSV file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableStats {
    /// File size in bytes
    pub size: u64,
    /// Number of lines
    pub rows: u64,
    /// Number of data columns
    pub cols: u64,
}

impl TableStats {
    /// `"{rows}x{cols}"`
    pub fn dimensions(&self) -> String {
        format!("{}x{}", self.rows, self.cols)
    }
}

/// Compute statistics for the CSV file at `path`, reading it in chunks
pub async fn table_stats(path: &Path) -> Result<TableStats> {
    let file = tokio::fs::File::open(path).await?;
    let size = file.metadata().await?.len();
    let (rows, cols) = count_shape(BufReader::new(file)).await?;
    Ok(TableStats { size, rows, cols })
}

/// Count lines and first-line columns of a CSV stream
pub async fn count_shape<R: AsyncBufRead + Unpin>(mut reader: R) -> std::io::Result<(u64, u64)> {
    let mut rows = 0u64;
    let mut cols = None;
    let mut line = Vec::new();

    loop {
        line.clear();
        let read = reader.read_until(b'\n', &mut line).await?;
        if read == 0 {
            break;
        }
        if cols.is_none() {
            cols = Some(column_count(&line));
        }
        rows += 1;
    }

    Ok((rows, cols.unwrap_or(0)))
}

fn column_count(first_line: &[u8]) -> u64 {
    let text = String::from_utf8_lossy(first_line);
    let fields = text.trim_end().split(',').count() as u64;
    fields.saturating_sub(1)
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn counts_header_and_data_rows() {
        let csv = b"gene,s1,s2,s3\nA,1,2,3\nB,4,5,6\n";
        assert_eq!(count_shape(&csv[..]).await.unwrap(), (3, 3));
    }

    #[tokio::test]
    async fn last_line_without_newline_still_counts() {
        let csv = b"id,age\np1,30\np2,41";
        assert_eq!(count_shape(&csv[..]).await.unwrap(), (3, 1));
    }

    #[tokio::test]
    async fn trailing_whitespace_does_not_add_columns() {
        let csv = b"id,a,b  \r\nx,1,2\r\n";
        assert_eq!(count_shape(&csv[..]).await.unwrap(), (2, 2));
    }

    #[tokio::test]
    async fn empty_input_has_no_rows_or_columns() {
        assert_eq!(count_shape(&b""[..]).await.unwrap(), (0, 0));
    }

    #[tokio::test]
    async fn stats_match_an_independent_recount() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("geneBySampleMatrix.csv");
        let mut content = String::from("gene,s1,s2,s3,s4\n");
        for i in 0..250 {
            content.push_str(&format!("G{i},{i},{i},{i},{i}\n"));
        }
        std::fs::write(&path, &content).unwrap();

        let stats = table_stats(&path).await.unwrap();

        let expected_rows = content.lines().count() as u64;
        let expected_cols = content.lines().next().unwrap().split(',').count() as u64 - 1;
        assert_eq!(stats.size, content.len() as u64);
        assert_eq!(stats.rows, expected_rows);
        assert_eq!(stats.cols, expected_cols);
        assert_eq!(stats.dimensions(), "251x4");
    }

    #[tokio::test]
    async fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = table_stats(&dir.path().join("nope.csv")).await.unwrap_err();
        assert!(matches!(err, crate::Error::Io(_)));
    }
}
