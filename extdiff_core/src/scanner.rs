use extdiff_common::{AppConfig, ExtdiffError, Result};
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use jwalk::WalkDir;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A file or directory found during enumeration, addressed relative to the
/// scanned root.
#[derive(Debug, Clone)]
pub struct ScannedFile {
    pub path: PathBuf,
    pub size: u64,
    pub is_dir: bool,
}

/// Recursive walker over one comparison root.
pub struct TreeScanner {
    config: AppConfig,
    custom_ignore: Option<Gitignore>,
}

impl TreeScanner {
    pub fn new(config: AppConfig) -> Self {
        let custom_ignore = Self::build_custom_ignore(&config);
        Self {
            config,
            custom_ignore,
        }
    }

    /// Build a Gitignore from custom ignore patterns in config
    fn build_custom_ignore(config: &AppConfig) -> Option<Gitignore> {
        if config.ignore_patterns.is_empty() {
            return None;
        }

        let mut builder = GitignoreBuilder::new("");
        for pattern in &config.ignore_patterns {
            if let Err(err) = builder.add_line(None, pattern) {
                debug!("Failed to add ignore pattern '{}': {}", pattern, err);
            }
        }

        match builder.build() {
            Ok(ignore) => Some(ignore),
            Err(e) => {
                debug!("Failed to build custom ignore: {}", e);
                None
            }
        }
    }

    /// Walk a root and return every file and subdirectory under it, sorted
    /// by relative path. The root itself is not included.
    pub fn scan(&self, root: &Path) -> Result<Vec<ScannedFile>> {
        let mut entries = Vec::new();

        let walker = WalkDir::new(root)
            .follow_links(self.config.follow_symlinks)
            .skip_hidden(false);

        for entry in walker {
            let entry = entry.map_err(|e| {
                ExtdiffError::Io(std::io::Error::other(format!("Walk error: {}", e)))
            })?;

            let path = entry.path();
            let relative_path = path
                .strip_prefix(root)
                .map_err(|e| ExtdiffError::Path(e.to_string()))?
                .to_path_buf();

            // Skip the synthetic root entry (empty path)
            if relative_path.as_os_str().is_empty() {
                continue;
            }

            let is_dir = entry.file_type().is_dir();

            if self.should_ignore_with_parents(&relative_path, is_dir) {
                continue;
            }

            let metadata = entry.metadata().map_err(|e| {
                ExtdiffError::Io(std::io::Error::other(format!("Metadata error: {}", e)))
            })?;

            entries.push(ScannedFile {
                path: relative_path,
                size: metadata.len(),
                is_dir: metadata.is_dir(),
            });
        }

        entries.sort_by(|a, b| a.path.cmp(&b.path));

        debug!("Scanned {} entries from {:?}", entries.len(), root);
        Ok(entries)
    }

    /// Check if a path or any of its parent directories should be ignored
    fn should_ignore_with_parents(&self, path: &Path, is_dir: bool) -> bool {
        let Some(ref custom_ignore) = self.custom_ignore else {
            return false;
        };

        if custom_ignore.matched(path, is_dir).is_ignore() {
            return true;
        }

        let mut current = path;
        while let Some(parent) = current.parent() {
            if !parent.as_os_str().is_empty()
                && custom_ignore.matched(parent, true).is_ignore()
            {
                return true;
            }
            current = parent;
        }
        false
    }
}
