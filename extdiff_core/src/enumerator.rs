use crate::scanner::{ScannedFile, TreeScanner};
use extdiff_common::{AppConfig, Blake3Hash, ChangedEntry, ExtdiffError, Result};
use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// The output of change enumeration: the file pairs to stage, plus
/// informational lines about paths that exist on only one side.
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    pub entries: Vec<ChangedEntry>,
    pub notes: Vec<String>,
}

/// Computes the set of differing file pairs between two roots.
///
/// Directory trees are walked directly and paired files are compared by
/// content hash; no external comparison program is involved, so there is no
/// output format to parse and no ambiguity with unusual file names.
pub struct ChangeEnumerator {
    scanner: TreeScanner,
}

impl ChangeEnumerator {
    pub fn new(config: AppConfig) -> Self {
        Self {
            scanner: TreeScanner::new(config),
        }
    }

    /// Enumerate the changed file pairs between `left` and `right`.
    ///
    /// Both roots must be plain files or both must be directories; a mixed
    /// pair fails here, before any staging state exists.
    pub fn enumerate(&self, left: &Path, right: &Path) -> Result<ChangeSet> {
        let left_meta = std::fs::metadata(left)?;
        let right_meta = std::fs::metadata(right)?;

        match (left_meta.is_file(), right_meta.is_file()) {
            (true, true) => Self::enumerate_file_pair(left, right),
            (true, false) => Err(ExtdiffError::RootKindMismatch {
                file: left.to_path_buf(),
                dir: right.to_path_buf(),
            }),
            (false, true) => Err(ExtdiffError::RootKindMismatch {
                file: right.to_path_buf(),
                dir: left.to_path_buf(),
            }),
            (false, false) => self.enumerate_trees(left, right),
        }
    }

    /// Two plain files form a single changed pair; the relative paths are
    /// the bare file names.
    fn enumerate_file_pair(left: &Path, right: &Path) -> Result<ChangeSet> {
        let left_abs = absolute(left)?;
        let right_abs = absolute(right)?;

        let left_rel = file_name_of(&left_abs)?;
        let right_rel = file_name_of(&right_abs)?;

        Ok(ChangeSet {
            entries: vec![ChangedEntry {
                left_abs,
                right_abs,
                left_rel,
                right_rel,
            }],
            notes: Vec::new(),
        })
    }

    fn enumerate_trees(&self, left: &Path, right: &Path) -> Result<ChangeSet> {
        let left_map = to_map(self.scanner.scan(left)?);
        let right_map = to_map(self.scanner.scan(right)?);

        info!(
            "Comparing {} left entries with {} right entries",
            left_map.len(),
            right_map.len()
        );

        let mut set = ChangeSet::default();

        // Union of both sides, in relative-path order. When a whole
        // directory exists on one side only, report it once and skip its
        // descendants.
        let mut skip_prefix: Option<PathBuf> = None;
        let all_paths: Vec<&PathBuf> = {
            let mut paths: Vec<&PathBuf> = left_map.keys().chain(right_map.keys()).collect();
            paths.sort();
            paths.dedup();
            paths
        };

        for path in all_paths {
            if let Some(ref prefix) = skip_prefix {
                if path.starts_with(prefix) {
                    continue;
                }
                skip_prefix = None;
            }

            match (left_map.get(path), right_map.get(path)) {
                (Some(l), Some(r)) => {
                    if l.is_dir && r.is_dir {
                        continue;
                    }
                    if l.is_dir != r.is_dir {
                        let (file_root, dir_root) =
                            if l.is_dir { (right, left) } else { (left, right) };
                        set.notes.push(format!(
                            "File {} is a regular file while file {} is a directory",
                            file_root.join(path).display(),
                            dir_root.join(path).display()
                        ));
                        skip_prefix = Some(path.clone());
                        continue;
                    }
                    if self.files_differ(left, right, path, l, r)? {
                        set.entries.push(ChangedEntry {
                            left_abs: absolute(&left.join(path))?,
                            right_abs: absolute(&right.join(path))?,
                            left_rel: path.clone(),
                            right_rel: path.clone(),
                        });
                    }
                }
                (Some(l), None) => {
                    set.notes.push(only_in_note(left, path));
                    if l.is_dir {
                        skip_prefix = Some(path.clone());
                    }
                }
                (None, Some(r)) => {
                    set.notes.push(only_in_note(right, path));
                    if r.is_dir {
                        skip_prefix = Some(path.clone());
                    }
                }
                (None, None) => continue,
            }
        }

        debug!(
            "Found {} changed pair(s), {} note(s)",
            set.entries.len(),
            set.notes.len()
        );
        Ok(set)
    }

    /// Compare one paired file by size, then full content hash.
    fn files_differ(
        &self,
        left_root: &Path,
        right_root: &Path,
        rel: &Path,
        left: &ScannedFile,
        right: &ScannedFile,
    ) -> Result<bool> {
        if left.size != right.size {
            return Ok(true);
        }

        let left_hash = hash_file(&left_root.join(rel))?;
        let right_hash = hash_file(&right_root.join(rel))?;
        Ok(left_hash != right_hash)
    }
}

fn to_map(entries: Vec<ScannedFile>) -> BTreeMap<PathBuf, ScannedFile> {
    entries.into_iter().map(|e| (e.path.clone(), e)).collect()
}

/// The classic one-sided report line, e.g. `Only in left/sub: name`.
fn only_in_note(root: &Path, rel: &Path) -> String {
    let dir = match rel.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => root.join(parent),
        _ => root.to_path_buf(),
    };
    let name = rel
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("Only in {}: {}", dir.display(), name)
}

/// Compute hash for a file
pub fn hash_file(path: &Path) -> Result<Blake3Hash> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = blake3::Hasher::new();
    let mut buffer = vec![0; 64 * 1024]; // 64KB buffer

    loop {
        let n = file.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(hasher.finalize().into())
}

/// Resolve a possibly-relative path against the current directory without
/// touching symlinks.
fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    Ok(std::env::current_dir()?.join(path))
}

fn file_name_of(path: &Path) -> Result<PathBuf> {
    path.file_name()
        .map(PathBuf::from)
        .ok_or_else(|| ExtdiffError::Path(format!("{} has no file name", path.display())))
}
