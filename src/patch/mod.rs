//! Content-addressed patch substitution
//!
//! A patch replaces the target script (`main.js`) only for the exact release it was
//! written against. Releases are told apart by a fingerprint of the script content,
//! and the patch file carries that fingerprint in its name:
//! `main.<fingerprint>.patch.js`.

use crate::resolve::is_missing;
use sha2::{Digest, Sha256};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Number of digest bytes kept (8 hex characters)
const FINGERPRINT_BYTES: usize = 4;

/// Short SHA-256 digest of line-ending-normalized content
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Fingerprint `content` with every carriage return removed, so CRLF and LF
    /// checkouts of the same script share one fingerprint.
    pub fn of(content: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        for chunk in content.split(|&b| b == b'\r') {
            hasher.update(chunk);
        }
        let digest = hasher.finalize();
        Self(hex::encode(&digest[..FINGERPRINT_BYTES]))
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Looks up replacement files for the target script
#[derive(Debug, Clone)]
pub struct PatchMatcher {
    patches_dir: PathBuf,
    target_file: String,
}

impl PatchMatcher {
    pub fn new(patches_dir: PathBuf, target_file: impl Into<String>) -> Self {
        Self {
            patches_dir,
            target_file: target_file.into(),
        }
    }

    pub fn patches_dir(&self) -> &Path {
        &self.patches_dir
    }

    /// Whether `file` is the target script. Compared against the on-disk name, case-sensitively.
    pub fn applies_to(&self, file: &Path) -> bool {
        file.file_name()
            .is_some_and(|name| name == self.target_file.as_str())
    }

    /// Patch file name for a fingerprint, e.g. `main.1a2b3c4d.patch.js`
    pub fn patch_file_name(&self, fingerprint: &Fingerprint) -> String {
        let target = Path::new(&self.target_file);
        let stem = target
            .file_stem()
            .map_or_else(|| self.target_file.clone(), |s| s.to_string_lossy().into_owned());

        match target.extension() {
            Some(ext) => format!("{stem}.{fingerprint}.patch.{}", ext.to_string_lossy()),
            None => format!("{stem}.{fingerprint}.patch"),
        }
    }

    /// Find the patch for the current content of `file`.
    ///
    /// Returns `Ok(None)` when `file` is not the target script or no patch exists for
    /// its fingerprint; the original file is then served byte-for-byte.
    pub async fn match_patch(&self, file: &Path) -> io::Result<Option<PathBuf>> {
        if !self.applies_to(file) {
            return Ok(None);
        }

        let content = fs::read(file).await?;
        let fingerprint = Fingerprint::of(&content);
        let candidate = self.patches_dir.join(self.patch_file_name(&fingerprint));

        match fs::metadata(&candidate).await {
            Ok(meta) if meta.is_file() => Ok(Some(candidate)),
            Ok(_) => Ok(None),
            Err(e) if is_missing(&e) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
