use extdiff_common::{ChangedEntry, CommandTemplate, ExtdiffError, Result, SyncBackFailure};
use std::fs;
use std::path::Path;
use std::process::{Command, ExitStatus};
use tracing::{debug, info, warn};

/// Substitute the staging roots into the template and run the external tool
/// as a blocking foreground command, stdio inherited.
///
/// The exit status is returned but never interpreted: interactive tools like
/// editors legitimately exit non-zero, and `diff` itself exits 1 when the
/// staged trees differ.
pub fn invoke(
    template: &CommandTemplate,
    left_root: &Path,
    right_root: &Path,
) -> Result<ExitStatus> {
    let argv = template.render(left_root, right_root);
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| ExtdiffError::Config("empty command template".to_string()))?;

    info!("Invoking external tool: {}", argv.join(" "));
    let status = Command::new(program).args(args).status().map_err(|e| {
        ExtdiffError::Comparison(format!("failed to run '{}': {}", program, e))
    })?;

    info!("External tool exited with {}", status);
    Ok(status)
}

/// Copy every staged file back over its original absolute location.
///
/// The harness cannot know which files the tool edited, so every staged copy
/// overwrites its original. A per-file failure does not stop the remaining
/// copies; all failures are collected and surfaced together, so a partially
/// completed edit session loses as little as possible.
pub fn sync_back(
    entries: &[ChangedEntry],
    left_root: &Path,
    right_root: &Path,
) -> Result<()> {
    let mut failures = Vec::new();

    for entry in entries {
        copy_back(&left_root.join(&entry.left_rel), &entry.left_abs, &mut failures);
        copy_back(&right_root.join(&entry.right_rel), &entry.right_abs, &mut failures);
    }

    if failures.is_empty() {
        info!("Synced {} file pair(s) back to their originals", entries.len());
        Ok(())
    } else {
        Err(ExtdiffError::SyncBack { failures })
    }
}

fn copy_back(staged: &Path, original: &Path, failures: &mut Vec<SyncBackFailure>) {
    debug!("Syncing {} -> {}", staged.display(), original.display());
    if let Err(e) = fs::copy(staged, original) {
        warn!(
            "Failed to sync {} back to {}: {}",
            staged.display(),
            original.display(),
            e
        );
        failures.push(SyncBackFailure {
            original: original.to_path_buf(),
            cause: e.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
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
    #[cfg(unix)]
    fn test_invoke_returns_uninterpreted_status() {
        let template = CommandTemplate::new(["false"]);
        let status = invoke(&template, Path::new("/tmp"), Path::new("/tmp")).unwrap();
        assert!(!status.success());
    }

    #[test]
    #[cfg(unix)]
    fn test_invoke_substitutes_roots() {
        let temp = TempDir::new().unwrap();
        let marker = temp.path().join("marker");
        let script = format!("echo \"$0 $1\" > {}", marker.display());
        let template = CommandTemplate::new(["sh", "-c", script.as_str(), "{a}", "{b}"]);

        let status = invoke(&template, Path::new("/left"), Path::new("/right")).unwrap();
        assert!(status.success());
        let recorded = fs::read_to_string(&marker).unwrap();
        assert_eq!(recorded.trim(), "/left /right");
    }

    #[test]
    fn test_invoke_empty_template_is_config_error() {
        let template = CommandTemplate::new(Vec::<String>::new());
        let err = invoke(&template, Path::new("/a"), Path::new("/b")).unwrap_err();
        assert!(matches!(err, ExtdiffError::Config(_)));
    }

    #[test]
    fn test_invoke_missing_program_is_comparison_error() {
        let template = CommandTemplate::new(["definitely-not-a-real-binary-xyz"]);
        let err = invoke(&template, Path::new("/a"), Path::new("/b")).unwrap_err();
        assert!(matches!(err, ExtdiffError::Comparison(_)));
    }

    #[test]
    fn test_sync_back_overwrites_originals() {
        let temp = TempDir::new().unwrap();
        let left = temp.path().join("L");
        let right = temp.path().join("R");
        let staged_left = temp.path().join("a");
        let staged_right = temp.path().join("b");
        for dir in [&left, &right, &staged_left, &staged_right] {
            fs::create_dir(dir).unwrap();
        }

        fs::write(left.join("f.txt"), b"old left").unwrap();
        fs::write(right.join("f.txt"), b"old right").unwrap();
        fs::write(staged_left.join("f.txt"), b"edited left").unwrap();
        fs::write(staged_right.join("f.txt"), b"old right").unwrap();

        let entries = vec![entry(&left, &right, "f.txt")];
        sync_back(&entries, &staged_left, &staged_right).unwrap();

        assert_eq!(fs::read(left.join("f.txt")).unwrap(), b"edited left");
        assert_eq!(fs::read(right.join("f.txt")).unwrap(), b"old right");
    }

    #[test]
    fn test_sync_back_attempts_all_files_before_failing() {
        let temp = TempDir::new().unwrap();
        let left = temp.path().join("L");
        let right = temp.path().join("R");
        let staged_left = temp.path().join("a");
        let staged_right = temp.path().join("b");
        for dir in [&left, &right, &staged_left, &staged_right] {
            fs::create_dir(dir).unwrap();
        }

        // first entry's staged copies are missing, second entry is intact
        fs::write(left.join("good.txt"), b"old").unwrap();
        fs::write(right.join("good.txt"), b"old").unwrap();
        fs::write(staged_left.join("good.txt"), b"new").unwrap();
        fs::write(staged_right.join("good.txt"), b"new").unwrap();
        fs::write(left.join("bad.txt"), b"old").unwrap();
        fs::write(right.join("bad.txt"), b"old").unwrap();

        let entries = vec![
            entry(&left, &right, "bad.txt"),
            entry(&left, &right, "good.txt"),
        ];
        let err = sync_back(&entries, &staged_left, &staged_right).unwrap_err();

        // the intact pair was still synced
        assert_eq!(fs::read(left.join("good.txt")).unwrap(), b"new");
        assert_eq!(fs::read(right.join("good.txt")).unwrap(), b"new");

        match err {
            ExtdiffError::SyncBack { failures } => {
                assert_eq!(failures.len(), 2);
                assert!(failures
                    .iter()
                    .all(|f| f.original.to_string_lossy().contains("bad.txt")));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
