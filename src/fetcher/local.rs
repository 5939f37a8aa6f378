//! Local filesystem fetcher

use std::path::Path;

use crate::utils::error::FetchError;

/// Read a regular file.
///
/// Missing paths, directories and other non-regular entries are `NotFound`.
pub async fn read_file(path: &Path) -> Result<Vec<u8>, FetchError> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() => {}
        _ => {
            return Err(FetchError::NotFound {
                path: path.display().to_string(),
            })
        }
    }

    tokio::fs::read(path).await.map_err(|source| FetchError::Io {
        path: path.display().to_string(),
        source,
    })
}
