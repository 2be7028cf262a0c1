use log::debug;
use std::collections::HashSet;

use super::encoding::decode_page_name;
use crate::fs::{DirectoryAccess, EntryKind, FileInfo};

/// File extensions probed for every candidate, in order.
pub const PROBE_EXTENSIONS: &[&str] = &[".md", ".org"];

/// A page name resolved to a concrete backing file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFile<H> {
    /// Directory that directly contains the file.
    pub dir: H,
    /// File name inside `dir`, extension included.
    pub file_name: String,
    /// Candidate base name that matched.
    pub picked_name: String,
    /// File metadata captured while probing.
    pub info: FileInfo,
}

/// Resolution knobs.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolveOptions {
    /// Enumerate directory entries when no exact probe hits (O(entries)).
    pub scan_fallback: bool,
}

/// Split a file name into `(base, extension)` when the extension is a known
/// outline extension.
#[must_use]
pub fn split_outline_file_name(file_name: &str) -> Option<(&str, &str)> {
    let lower = file_name.to_ascii_lowercase();
    PROBE_EXTENSIONS.iter().find_map(|ext| {
        if lower.ends_with(ext) && file_name.len() > ext.len() {
            let cut = file_name.len() - ext.len();
            Some((&file_name[..cut], &file_name[cut..]))
        } else {
            None
        }
    })
}

async fn probe_candidate<D: DirectoryAccess>(
    access: &D,
    dir: &D::Dir,
    candidate: &str,
) -> Option<ResolvedFile<D::Dir>> {
    let segments: Vec<&str> = candidate.split('/').collect();
    if segments.iter().any(|segment| segment.trim().is_empty()) {
        return None;
    }
    let (leaf, parents) = segments.split_last()?;
    let mut current = dir.clone();
    for parent in parents {
        current = access.get_subdirectory(&current, parent).await?;
    }
    for ext in PROBE_EXTENSIONS {
        let file_name = format!("{leaf}{ext}");
        if let Ok(info) = access.get_file(&current, &file_name).await {
            return Some(ResolvedFile {
                dir: current,
                file_name,
                picked_name: candidate.to_string(),
                info,
            });
        }
    }
    None
}

async fn scan_directory<D: DirectoryAccess>(
    access: &D,
    dir: &D::Dir,
    wanted: &HashSet<&str>,
) -> Option<ResolvedFile<D::Dir>> {
    let entries = match access.list_entries(dir).await {
        Ok(entries) => entries,
        Err(err) => {
            debug!("resolver scan skipped {dir:?}: {err}");
            return None;
        }
    };
    for entry in entries {
        if entry.kind != EntryKind::File {
            continue;
        }
        let Some((base, _ext)) = split_outline_file_name(&entry.name) else {
            continue;
        };
        let decoded = decode_page_name(base);
        let picked = if wanted.contains(base) {
            base.to_string()
        } else if wanted.contains(decoded.as_str()) {
            decoded
        } else {
            continue;
        };
        if let Ok(info) = access.get_file(dir, &entry.name).await {
            return Some(ResolvedFile {
                dir: dir.clone(),
                file_name: entry.name,
                picked_name: picked,
                info,
            });
        }
    }
    None
}

/// Probe `dirs` (in priority order) for the first candidate with a backing
/// `.md`/`.org` file. Absence is `None`, never an error.
pub async fn resolve<D: DirectoryAccess>(
    access: &D,
    dirs: &[D::Dir],
    candidates: &[String],
    options: ResolveOptions,
) -> Option<ResolvedFile<D::Dir>> {
    for dir in dirs {
        for candidate in candidates {
            if let Some(found) = probe_candidate(access, dir, candidate).await {
                return Some(found);
            }
        }
    }
    if !options.scan_fallback {
        return None;
    }
    let wanted: HashSet<&str> = candidates.iter().map(String::as_str).collect();
    for dir in dirs {
        if let Some(found) = scan_directory(access, dir, &wanted).await {
            debug!("resolver scan fallback matched {}", found.file_name);
            return Some(found);
        }
    }
    None
}
