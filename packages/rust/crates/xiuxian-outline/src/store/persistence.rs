use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::OutlineError;
use crate::models::PageRecord;

const FALLBACK_FILE_NAME: &str = "pages.json";

fn store_error(action: &str, path: &Path, err: &std::io::Error) -> OutlineError {
    OutlineError::Store(format!("{action} {}: {err}", path.display()))
}

fn temp_path_for(path: &Path) -> PathBuf {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .filter(|name| !name.is_empty())
        .unwrap_or(FALLBACK_FILE_NAME);
    parent.join(format!(".{file_name}.{}.tmp", uuid::Uuid::new_v4()))
}

fn write_synced(temp_path: &Path, payload: &[u8]) -> Result<(), OutlineError> {
    let mut file =
        File::create(temp_path).map_err(|err| store_error("cannot create", temp_path, &err))?;
    file.write_all(payload)
        .map_err(|err| store_error("cannot write", temp_path, &err))?;
    file.sync_all()
        .map_err(|err| store_error("cannot sync", temp_path, &err))
}

/// Replace the page table file at `path` with `records` as pretty JSON.
///
/// Readers see either the old table or the new one: the payload goes to a
/// synced sibling temp file that is then renamed over `path`. A failed write
/// leaves no temp file behind.
pub(crate) fn persist_records(path: &Path, records: &[PageRecord]) -> Result<(), OutlineError> {
    let payload = serde_json::to_vec_pretty(records)?;
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent).map_err(|err| store_error("cannot create", parent, &err))?;

    let temp_path = temp_path_for(path);
    let written = write_synced(&temp_path, &payload).and_then(|()| {
        std::fs::rename(&temp_path, path).map_err(|err| store_error("cannot replace", path, &err))
    });
    if written.is_err() {
        let _ = std::fs::remove_file(&temp_path);
    }
    written
}
