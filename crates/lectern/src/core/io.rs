//! File I/O utilities.

use crate::types::{InputDocument, Origin};
use crate::{LecternError, Result};
use std::path::Path;
use tokio::fs;

/// Read a file asynchronously.
///
/// # Errors
///
/// Returns `LecternError::Io` for I/O errors (these always bubble up).
pub async fn read_file_async(path: impl AsRef<Path>) -> Result<Vec<u8>> {
    fs::read(path.as_ref()).await.map_err(LecternError::Io)
}

/// Read a file into an [`InputDocument`] named after the file.
pub async fn document_from_path(path: impl AsRef<Path>, origin: Origin) -> Result<InputDocument> {
    let path = path.as_ref();
    let content = read_file_async(path).await?;

    let mut document = InputDocument::new(origin, content);
    if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
        document = document.with_file_name(name);
    }
    Ok(document)
}
