//! Outbound file staging for `queue-telegram-file` (spec §4.I, §6: the
//! source path must resolve inside `ottoHome`; the staged copy always lands
//! under `data/telegram-outbox/`).

use std::path::{Path, PathBuf};

use otto_core::OttoError;

pub const MAX_STAGED_FILE_BYTES: u64 = 20 * 1024 * 1024;

pub async fn stage_outbound_file(
    otto_home: &Path,
    source: &str,
    staged_id: &str,
    file_name: Option<&str>,
) -> Result<PathBuf, OttoError> {
    stage_outbound_file_with_limit(otto_home, source, staged_id, file_name, MAX_STAGED_FILE_BYTES).await
}

async fn stage_outbound_file_with_limit(
    otto_home: &Path,
    source: &str,
    staged_id: &str,
    file_name: Option<&str>,
    max_bytes: u64,
) -> Result<PathBuf, OttoError> {
    let canonical_home = tokio::fs::canonicalize(otto_home)
        .await
        .map_err(|e| OttoError::Internal(format!("resolving otto home: {e}")))?;
    let canonical_source = tokio::fs::canonicalize(source)
        .await
        .map_err(|_| OttoError::InvalidFilePath(format!("file not found: {source}")))?;

    if !canonical_source.starts_with(&canonical_home) {
        return Err(OttoError::InvalidFilePath(format!("path escapes otto home: {source}")));
    }

    let metadata = tokio::fs::metadata(&canonical_source)
        .await
        .map_err(|e| OttoError::Internal(format!("reading file metadata: {e}")))?;
    if metadata.len() > max_bytes {
        return Err(OttoError::FileTooLarge);
    }

    let outbox_dir = otto_home.join("data").join("telegram-outbox");
    tokio::fs::create_dir_all(&outbox_dir)
        .await
        .map_err(|e| OttoError::Internal(format!("creating outbox dir: {e}")))?;

    let suffix =
        file_name.unwrap_or_else(|| canonical_source.file_name().and_then(|n| n.to_str()).unwrap_or("file"));
    let staged_path = outbox_dir.join(format!("{staged_id}-{suffix}"));

    tokio::fs::copy(&canonical_source, &staged_path)
        .await
        .map_err(|e| OttoError::Internal(format!("staging file: {e}")))?;

    Ok(staged_path)
}
