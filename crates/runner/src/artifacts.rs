//! Per-job artifact directories.
//!
//! Each attempt writes into `<private_data_dir>/artifacts/<ident>/`. Only the
//! newest `keep` attempt directories are retained per job.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::debug;

/// Create a directory (and parents) readable only by the owner.
pub fn create_private_dir(path: &Path) -> io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        fs::DirBuilder::new().recursive(true).mode(0o700).create(path)
    }
    #[cfg(not(unix))]
    {
        fs::create_dir_all(path)
    }
}

/// Remove the oldest attempt directories so that at most `keep - 1` remain,
/// leaving room for the attempt about to start.
///
/// Returns how many directories were removed. A missing artifacts directory
/// is not an error.
pub fn rotate(artifacts_dir: &Path, keep: usize) -> io::Result<usize> {
    let entries = match fs::read_dir(artifacts_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e),
    };

    let mut dirs: Vec<(SystemTime, PathBuf)> = Vec::new();
    for entry in entries {
        let entry = entry?;
        let meta = entry.metadata()?;
        if meta.is_dir() {
            let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            dirs.push((modified, entry.path()));
        }
    }

    let allowed = keep.saturating_sub(1);
    if dirs.len() <= allowed {
        return Ok(0);
    }
    dirs.sort();
    let excess = dirs.len() - allowed;
    for (_, path) in dirs.iter().take(excess) {
        debug!(path = %path.display(), "removing old artifacts");
        fs::remove_dir_all(path)?;
    }
    Ok(excess)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn make_dirs(root: &Path, names: &[&str]) {
        for name in names {
            fs::create_dir_all(root.join(name)).unwrap();
            // Distinct mtimes on coarse-grained filesystems.
            std::thread::sleep(Duration::from_millis(20));
        }
    }

    #[test]
    fn missing_dir_is_fine() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(rotate(&dir.path().join("nope"), 3).unwrap(), 0);
    }

    #[test]
    fn keeps_newest_leaving_room_for_one() {
        let dir = tempfile::tempdir().unwrap();
        make_dirs(dir.path(), &["functional_1_0", "functional_2_0", "functional_3_0"]);

        assert_eq!(rotate(dir.path(), 3).unwrap(), 1);
        assert!(!dir.path().join("functional_1_0").exists());
        assert!(dir.path().join("functional_2_0").exists());
        assert!(dir.path().join("functional_3_0").exists());
    }

    #[test]
    fn under_limit_untouched() {
        let dir = tempfile::tempdir().unwrap();
        make_dirs(dir.path(), &["ha_1_0"]);
        assert_eq!(rotate(dir.path(), 5).unwrap(), 0);
        assert!(dir.path().join("ha_1_0").exists());
    }

    #[test]
    fn plain_files_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("notes.txt"), "x").unwrap();
        make_dirs(dir.path(), &["ha_1_0"]);
        assert_eq!(rotate(dir.path(), 1).unwrap(), 1);
        assert!(dir.path().join("notes.txt").exists());
    }

    #[cfg(unix)]
    #[test]
    fn private_dir_mode() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("a/b");
        create_private_dir(&target).unwrap();
        let mode = fs::metadata(&target).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o700);
    }
}
