use extdiff_common::{ChangedEntry, ExtdiffError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// The transient root holding the two parallel staging subtrees.
///
/// Exclusively owned by one comparison session. The underlying temporary
/// directory is removed when this value is dropped, so every exit path,
/// including panics, releases the staging state; `close` is the explicit
/// variant that reports removal errors instead of swallowing them.
pub struct StagingArea {
    temp: tempfile::TempDir,
    left_root: PathBuf,
    right_root: PathBuf,
}

impl StagingArea {
    /// Create a fresh, uniquely named staging root with empty `a` and `b`
    /// subtrees. Concurrent invocations never collide.
    pub fn create() -> Result<Self> {
        let temp = tempfile::Builder::new().prefix("extdiff").tempdir()?;
        let left_root = temp.path().join("a");
        let right_root = temp.path().join("b");
        fs::create_dir(&left_root)?;
        fs::create_dir(&right_root)?;

        debug!("Created staging root {:?}", temp.path());
        Ok(Self {
            temp,
            left_root,
            right_root,
        })
    }

    pub fn left_root(&self) -> &Path {
        &self.left_root
    }

    pub fn right_root(&self) -> &Path {
        &self.right_root
    }

    /// Where a changed entry's left/right copy lives inside the staging area.
    pub fn staged_left(&self, entry: &ChangedEntry) -> PathBuf {
        self.left_root.join(&entry.left_rel)
    }

    pub fn staged_right(&self, entry: &ChangedEntry) -> PathBuf {
        self.right_root.join(&entry.right_rel)
    }

    /// Copy every changed pair into the corresponding staging subtree,
    /// recreating the relative layout. The first unreadable source or
    /// unwritable destination fails the whole operation.
    pub fn materialize(&self, entries: &[ChangedEntry]) -> Result<()> {
        for entry in entries {
            stage_copy(&entry.left_abs, &self.staged_left(entry))?;
            stage_copy(&entry.right_abs, &self.staged_right(entry))?;
        }

        info!(
            "Staged {} file pair(s) under {:?}",
            entries.len(),
            self.temp.path()
        );
        Ok(())
    }

    /// Remove the transient root, reporting failure instead of ignoring it.
    pub fn close(self) -> Result<()> {
        let path = self.temp.path().to_path_buf();
        self.temp
            .close()
            .map_err(|e| ExtdiffError::Cleanup(format!("{}: {}", path.display(), e)))
    }
}

/// Copy one original file to its staging location, creating parent
/// directories as needed. Intermediate directories shared between entries
/// already exist on later copies; that is not an error.
fn stage_copy(source: &Path, dest: &Path) -> Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }

    debug!("Staging {} -> {}", source.display(), dest.display());
    fs::copy(source, dest)?;

    // Carry the mtime so tools that key off timestamps see the original
    if let Ok(metadata) = fs::metadata(source) {
        if let Ok(modified) = metadata.modified() {
            let _ = filetime::set_file_mtime(dest, filetime::FileTime::from_system_time(modified));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn entry(left: &Path, right: &Path, rel: &str) -> ChangedEntry {
        ChangedEntry {
            left_abs: left.join(rel),
            right_abs: right.join(rel),
            left_rel: PathBuf::from(rel),
            right_rel: PathBuf::from(rel),
        }
    }

    #[test]
    fn test_create_makes_empty_subtrees() {
        let staging = StagingArea::create().unwrap();
        assert!(staging.left_root().is_dir());
        assert!(staging.right_root().is_dir());
        assert_eq!(staging.left_root().file_name().unwrap(), "a");
        assert_eq!(staging.right_root().file_name().unwrap(), "b");
        assert_eq!(fs::read_dir(staging.left_root()).unwrap().count(), 0);
    }

    #[test]
    fn test_concurrent_areas_do_not_collide() {
        let first = StagingArea::create().unwrap();
        let second = StagingArea::create().unwrap();
        assert_ne!(first.temp.path(), second.temp.path());
    }

    #[test]
    fn test_materialize_recreates_nested_layout() {
        let temp = TempDir::new().unwrap();
        let left = temp.path().join("A");
        let right = temp.path().join("B");
        fs::create_dir_all(left.join("y")).unwrap();
        fs::create_dir_all(right.join("y")).unwrap();
        fs::write(left.join("y/z.txt"), b"bar").unwrap();
        fs::write(right.join("y/z.txt"), b"baz").unwrap();

        let staging = StagingArea::create().unwrap();
        let entries = vec![entry(&left, &right, "y/z.txt")];
        staging.materialize(&entries).unwrap();

        assert_eq!(
            fs::read(staging.left_root().join("y/z.txt")).unwrap(),
            b"bar"
        );
        assert_eq!(
            fs::read(staging.right_root().join("y/z.txt")).unwrap(),
            b"baz"
        );
    }

    #[test]
    fn test_materialize_shared_parent_directories() {
        let temp = TempDir::new().unwrap();
        let left = temp.path().join("A");
        let right = temp.path().join("B");
        fs::create_dir_all(left.join("sub")).unwrap();
        fs::create_dir_all(right.join("sub")).unwrap();
        for name in ["sub/one.txt", "sub/two.txt"] {
            fs::write(left.join(name), b"l").unwrap();
            fs::write(right.join(name), b"r").unwrap();
        }

        let staging = StagingArea::create().unwrap();
        let entries = vec![
            entry(&left, &right, "sub/one.txt"),
            entry(&left, &right, "sub/two.txt"),
        ];
        staging.materialize(&entries).unwrap();

        assert!(staging.left_root().join("sub/one.txt").exists());
        assert!(staging.left_root().join("sub/two.txt").exists());
    }

    #[test]
    fn test_materialize_missing_source_fails() {
        let temp = TempDir::new().unwrap();
        let left = temp.path().join("A");
        let right = temp.path().join("B");

        let staging = StagingArea::create().unwrap();
        let entries = vec![entry(&left, &right, "ghost.txt")];
        assert!(staging.materialize(&entries).is_err());
    }

    #[test]
    fn test_close_removes_root() {
        let staging = StagingArea::create().unwrap();
        let root = staging.temp.path().to_path_buf();
        staging.close().unwrap();
        assert!(!root.exists());
    }

    #[test]
    fn test_drop_removes_root() {
        let root;
        {
            let staging = StagingArea::create().unwrap();
            root = staging.temp.path().to_path_buf();
            assert!(root.exists());
        }
        assert!(!root.exists());
    }
}
