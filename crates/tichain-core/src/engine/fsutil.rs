//! Filesystem primitives: atomic file replacement and the filtered tree copy.

use super::error::EngineError;
use std::fs;
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

/// Writes `contents` to a sibling temporary file, then atomically renames it
/// over `path`. A crashed run can leave a `.tichain-tmp` sibling behind, but
/// never a half-written file under the final name.
pub fn write_atomic(path: &Path, contents: &str) -> Result<(), EngineError> {
    let mut tmp_name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    tmp_name.push(".tichain-tmp");
    let tmp = path.with_file_name(tmp_name);
    fs::write(&tmp, contents).map_err(|e| EngineError::io(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| EngineError::io(path, e))
}

/// Returns true if `file_name` matches any `*.<suffix>` deny pattern.
fn is_denied(file_name: &str, deny_patterns: &[&str]) -> bool {
    deny_patterns.iter().any(|pattern| {
        pattern
            .strip_prefix('*')
            .map_or(file_name == *pattern, |suffix| file_name.ends_with(suffix))
    })
}

/// Recursively copies `src` into `dst`, skipping files that match a deny
/// pattern. Directories are always recreated (even empty ones, so trial output
/// directories survive the copy). Returns the number of files copied.
pub fn copy_tree(src: &Path, dst: &Path, deny_patterns: &[&str]) -> Result<usize, EngineError> {
    let mut copied = 0;
    for entry in WalkDir::new(src) {
        let entry = entry.map_err(|e| {
            let path = e
                .path()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| src.to_path_buf());
            EngineError::io(path, e.into())
        })?;
        let Ok(relative) = entry.path().strip_prefix(src) else {
            continue;
        };
        let target = dst.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(|e| EngineError::io(&target, e))?;
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if is_denied(&name, deny_patterns) {
            debug!(file = %entry.path().display(), "skipping transient artifact");
            continue;
        }
        fs::copy(entry.path(), &target).map_err(|e| EngineError::io(&target, e))?;
        copied += 1;
    }
    Ok(copied)
}
