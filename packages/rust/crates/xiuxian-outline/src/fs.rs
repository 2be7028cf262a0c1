//! Directory access collaborator.
//!
//! The core only reads: it lists entries, stats and reads files, and opens
//! subdirectories. `LocalDirectory` implements this over `tokio::fs`.

use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::fs as tokio_fs;

use crate::error::OutlineError;

/// Kind of a directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// Regular file.
    File,
    /// Directory.
    Directory,
}

/// One entry returned by [`DirectoryAccess::list_entries`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// Entry name (no path separators).
    pub name: String,
    /// Entry kind.
    pub kind: EntryKind,
}

/// File metadata returned without reading content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileInfo {
    /// Size in bytes.
    pub size: u64,
    /// Last modification time, unix milliseconds.
    pub last_modified: i64,
}

/// Read-only access to a tree of directories.
#[async_trait]
pub trait DirectoryAccess: Send + Sync {
    /// Opaque directory handle.
    type Dir: Clone + Send + Sync + std::fmt::Debug;

    /// List the entries of `dir`.
    async fn list_entries(&self, dir: &Self::Dir) -> Result<Vec<DirEntry>, OutlineError>;

    /// Stat the file `name` in `dir`; `NotFound` when absent or not a file.
    async fn get_file(&self, dir: &Self::Dir, name: &str) -> Result<FileInfo, OutlineError>;

    /// Read the bytes of the file `name` in `dir`.
    async fn read_file(&self, dir: &Self::Dir, name: &str) -> Result<Vec<u8>, OutlineError>;

    /// Open the subdirectory `name` of `dir`, if it exists.
    async fn get_subdirectory(&self, dir: &Self::Dir, name: &str) -> Option<Self::Dir>;

    /// Human-readable locator for logs and CLI output.
    fn describe(&self, dir: &Self::Dir, name: &str) -> String;
}

/// Local filesystem directory access; handles are absolute-or-relative paths.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalDirectory;

impl LocalDirectory {
    /// Create a local directory accessor.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

fn system_time_to_unix_millis(ts: SystemTime) -> i64 {
    ts.duration_since(UNIX_EPOCH)
        .ok()
        .and_then(|d| i64::try_from(d.as_millis()).ok())
        .unwrap_or(0)
}

/// Reject names that would escape `dir` or address more than one level.
fn checked_entry_path(dir: &Path, name: &str) -> Result<PathBuf, OutlineError> {
    let candidate = Path::new(name);
    let mut components = candidate.components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(dir.join(candidate)),
        _ => Err(OutlineError::InvalidName(name.to_string())),
    }
}

#[async_trait]
impl DirectoryAccess for LocalDirectory {
    type Dir = PathBuf;

    async fn list_entries(&self, dir: &PathBuf) -> Result<Vec<DirEntry>, OutlineError> {
        let mut reader = tokio_fs::read_dir(dir).await?;
        let mut out = Vec::new();
        while let Some(entry) = reader.next_entry().await? {
            let Ok(file_type) = entry.file_type().await else {
                continue;
            };
            let kind = if file_type.is_dir() {
                EntryKind::Directory
            } else if file_type.is_file() {
                EntryKind::File
            } else {
                continue;
            };
            out.push(DirEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                kind,
            });
        }
        out.sort_by(|left, right| left.name.cmp(&right.name));
        Ok(out)
    }

    async fn get_file(&self, dir: &PathBuf, name: &str) -> Result<FileInfo, OutlineError> {
        let path = checked_entry_path(dir, name)?;
        let metadata = tokio_fs::metadata(&path)
            .await
            .map_err(|_| OutlineError::NotFound(path.display().to_string()))?;
        if !metadata.is_file() {
            return Err(OutlineError::NotFound(path.display().to_string()));
        }
        Ok(FileInfo {
            size: metadata.len(),
            last_modified: metadata
                .modified()
                .map(system_time_to_unix_millis)
                .unwrap_or(0),
        })
    }

    async fn read_file(&self, dir: &PathBuf, name: &str) -> Result<Vec<u8>, OutlineError> {
        let path = checked_entry_path(dir, name)?;
        Ok(tokio_fs::read(&path).await?)
    }

    async fn get_subdirectory(&self, dir: &PathBuf, name: &str) -> Option<PathBuf> {
        let path = checked_entry_path(dir, name).ok()?;
        let metadata = tokio_fs::metadata(&path).await.ok()?;
        metadata.is_dir().then_some(path)
    }

    fn describe(&self, dir: &PathBuf, name: &str) -> String {
        dir.join(name).display().to_string()
    }
}

/// Decode file bytes as text; invalid UTF-8 sequences are replaced.
#[must_use]
pub fn decode_text(bytes: &[u8]) -> String {
    let without_bom = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes);
    String::from_utf8_lossy(without_bom).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_local_directory_lists_and_reads() {
        let tmp = tempfile::TempDir::new().unwrap();
        tokio_fs::write(tmp.path().join("b.md"), "- hello").await.unwrap();
        tokio_fs::create_dir(tmp.path().join("journals")).await.unwrap();

        let access = LocalDirectory::new();
        let root = tmp.path().to_path_buf();
        let entries = access.list_entries(&root).await.unwrap();
        assert_eq!(
            entries,
            vec![
                DirEntry {
                    name: "b.md".to_string(),
                    kind: EntryKind::File
                },
                DirEntry {
                    name: "journals".to_string(),
                    kind: EntryKind::Directory
                },
            ]
        );

        let info = access.get_file(&root, "b.md").await.unwrap();
        assert_eq!(info.size, 7);
        assert!(info.last_modified > 0);
        assert_eq!(access.read_file(&root, "b.md").await.unwrap(), b"- hello");
        assert!(access.get_subdirectory(&root, "journals").await.is_some());
        assert!(access.get_subdirectory(&root, "b.md").await.is_none());
    }

    #[tokio::test]
    async fn test_missing_and_escaping_names() {
        let tmp = tempfile::TempDir::new().unwrap();
        let access = LocalDirectory::new();
        let root = tmp.path().to_path_buf();
        assert!(access.get_file(&root, "nope.md").await.unwrap_err().is_not_found());
        assert!(matches!(
            access.get_file(&root, "../etc/passwd").await,
            Err(OutlineError::InvalidName(_))
        ));
    }

    #[test]
    fn test_decode_text_strips_bom() {
        assert_eq!(decode_text(b"\xEF\xBB\xBF- a"), "- a");
        assert_eq!(decode_text(b"- \xFF"), "- \u{FFFD}");
    }
}
