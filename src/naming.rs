//! Identifier allocation for downloads and derived objects

use crate::types::{DownloadId, ObjectId};

/// Length of a download identifier
pub const DOWNLOAD_ID_LEN: usize = 8;

/// Allocate a short download identifier (first eight hex digits of a v4 UUID)
pub fn new_download_id() -> DownloadId {
    let uuid = uuid::Uuid::new_v4().simple().to_string();
    DownloadId(uuid[..DOWNLOAD_ID_LEN].to_string())
}

/// Allocate an object identifier (a full hyphenated v4 UUID)
pub fn new_object_id() -> ObjectId {
    ObjectId(uuid::Uuid::new_v4().to_string())
}

/// Whether `id` can safely be joined onto the data root as a single path component
///
/// Caller-supplied identifiers never contain separators or dots, so anything
/// else cannot name a record and is rejected before touching the filesystem.
pub fn is_safe_identifier(id: &str) -> bool {
    !id.is_empty() && id.len() <= 64 && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

/// Whether `name` is a plain file name with no directory components
pub fn is_safe_file_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 255
        && name != "."
        && name != ".."
        && !name.starts_with('.')
        && !name.contains(['/', '\\', '\0'])
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn download_ids_are_short_hex_tokens() {
        let id = new_download_id();
        assert_eq!(id.as_str().len(), DOWNLOAD_ID_LEN);
        assert!(id.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert!(is_safe_identifier(id.as_str()));
    }

    #[test]
    fn object_ids_are_unique_uuids() {
        let ids: HashSet<_> = (0..100).map(|_| new_object_id()).collect();
        assert_eq!(ids.len(), 100);
        for id in &ids {
            assert!(uuid::Uuid::parse_str(id.as_str()).is_ok());
            assert!(is_safe_identifier(id.as_str()));
        }
    }

    #[test]
    fn identifiers_with_path_components_are_rejected() {
        assert!(!is_safe_identifier(""));
        assert!(!is_safe_identifier(".."));
        assert!(!is_safe_identifier("ab/cd"));
        assert!(!is_safe_identifier("ab12cd34.zip"));
        assert!(is_safe_identifier("ab12cd34"));
    }

    #[test]
    fn file_names_must_be_plain() {
        assert!(is_safe_file_name("geneBySampleMatrix.csv"));
        assert!(is_safe_file_name("phenoDataMatrix"));
        assert!(!is_safe_file_name("../secret.csv"));
        assert!(!is_safe_file_name(".hidden"));
        assert!(!is_safe_file_name("a/b.csv"));
    }
}
