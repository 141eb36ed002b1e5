//! Case-insensitive path resolution
//!
//! Game data is usually authored on case-insensitive filesystems, so a request for
//! `img/Pictures/Title.PNG` has to find `img/pictures/title.png` on disk as well.
//! Every segment of the path is matched against the real directory entries.

use std::ffi::OsStr;
use std::io;
use std::path::{Component, Path, PathBuf};
use tokio::fs;

/// Lookup strategy for a single path segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Use the segment exactly as requested
    Literal,
    /// Scan the parent directory for an entry equal under case folding
    CaseInsensitive,
}

/// Strategies in priority order, the first hit wins
pub const STRATEGIES: [Strategy; 2] = [Strategy::Literal, Strategy::CaseInsensitive];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryKind {
    Dir,
    File,
}

/// Resolve `path` to an existing regular file, ignoring case differences.
///
/// Returns `Ok(None)` when no such file exists (including when the path names a
/// directory). Only unexpected I/O faults such as permission errors are returned as `Err`.
///
/// When several entries of one directory are equal under case folding, the first one
/// reported by the directory listing is used.
pub async fn resolve(path: &Path) -> io::Result<Option<PathBuf>> {
    // Fast path for correctly-cased requests
    if has_kind(path, EntryKind::File).await? {
        return Ok(Some(path.to_path_buf()));
    }

    let mut current = PathBuf::new();
    let mut components = path.components().peekable();
    let mut resolved_file = false;

    while let Some(component) = components.next() {
        let Component::Normal(name) = component else {
            current.push(component.as_os_str());
            resolved_file = false;
            continue;
        };

        let kind = if components.peek().is_some() {
            EntryKind::Dir
        } else {
            EntryKind::File
        };

        match resolve_segment(&current, name, kind).await? {
            Some(found) => current = found,
            None => return Ok(None),
        }
        resolved_file = kind == EntryKind::File;
    }

    Ok(resolved_file.then_some(current))
}

/// Find the child of `parent` named `name` with the wanted kind
async fn resolve_segment(
    parent: &Path,
    name: &OsStr,
    kind: EntryKind,
) -> io::Result<Option<PathBuf>> {
    for strategy in STRATEGIES {
        let found = match strategy {
            Strategy::Literal => {
                let candidate = parent.join(name);
                has_kind(&candidate, kind).await?.then_some(candidate)
            }
            Strategy::CaseInsensitive => find_case_insensitive(parent, name, kind).await?,
        };
        if found.is_some() {
            return Ok(found);
        }
    }
    Ok(None)
}

async fn find_case_insensitive(
    parent: &Path,
    name: &OsStr,
    kind: EntryKind,
) -> io::Result<Option<PathBuf>> {
    // Names that are not valid UTF-8 can only match literally
    let Some(wanted) = name.to_str().map(str::to_lowercase) else {
        return Ok(None);
    };

    let mut entries = match fs::read_dir(parent).await {
        Ok(entries) => entries,
        Err(e) if is_missing(&e) => return Ok(None),
        Err(e) => return Err(e),
    };

    while let Some(entry) = entries.next_entry().await? {
        let matches = entry
            .file_name()
            .to_str()
            .is_some_and(|n| n.to_lowercase() == wanted);
        if matches {
            let candidate = entry.path();
            if has_kind(&candidate, kind).await? {
                return Ok(Some(candidate));
            }
        }
    }

    Ok(None)
}

/// Check that `path` exists and is of the wanted kind (symlinks are followed)
async fn has_kind(path: &Path, kind: EntryKind) -> io::Result<bool> {
    match fs::metadata(path).await {
        Ok(meta) => Ok(match kind {
            EntryKind::Dir => meta.is_dir(),
            EntryKind::File => meta.is_file(),
        }),
        Err(e) if is_missing(&e) => Ok(false),
        Err(e) => Err(e),
    }
}

/// Errors that simply mean "nothing there"
pub fn is_missing(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::NotFound | io::ErrorKind::NotADirectory
    )
}
