use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Marker substituted with the left staging subtree path.
pub const LEFT_MARKER: &str = "{a}";
/// Marker substituted with the right staging subtree path.
pub const RIGHT_MARKER: &str = "{b}";

/// One file that differs between the two roots.
///
/// The relative paths are computed once against the original roots and are
/// used verbatim to rebuild the same layout inside the staging area, and
/// later to copy the staged file back over the recorded absolute path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangedEntry {
    pub left_abs: PathBuf,
    pub right_abs: PathBuf,
    pub left_rel: PathBuf,
    pub right_rel: PathBuf,
}

/// An ordered external-tool argument list with placeholder tokens for the
/// two staging subtree paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandTemplate {
    pub args: Vec<String>,
}

impl CommandTemplate {
    pub fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// Substitute the staging subtree paths into every token. This is done
    /// exactly once per invocation, after staging completes; the original
    /// roots are never substituted.
    pub fn render(&self, left_root: &Path, right_root: &Path) -> Vec<String> {
        let left = left_root.to_string_lossy();
        let right = right_root.to_string_lossy();
        self.args
            .iter()
            .map(|arg| arg.replace(LEFT_MARKER, &left).replace(RIGHT_MARKER, &right))
            .collect()
    }
}

/// Named external-tool templates. Built as explicit configuration and passed
/// into the session, so tests and config files can extend it without shared
/// mutable state.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, CommandTemplate>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in tools: a plain unified diff (the default), the emacs
    /// ediff directory session, and a color-highlighted diff.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.insert("diff", CommandTemplate::new(["diff", "-u", "{a}", "{b}"]));
        registry.insert(
            "ediff",
            CommandTemplate::new(["emacs", "--eval", "(ediff-directories \"{a}\" \"{b}\" \"\")"]),
        );
        registry.insert(
            "colordiff",
            CommandTemplate::new(["colordiff", "-u", "{a}", "{b}"]),
        );
        registry
    }

    pub fn insert(&mut self, name: impl Into<String>, template: CommandTemplate) {
        self.tools.insert(name.into(), template);
    }

    pub fn get(&self, name: &str) -> Option<&CommandTemplate> {
        self.tools.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tools.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CommandTemplate)> {
        self.tools.iter().map(|(name, t)| (name.as_str(), t))
    }
}

/// BLAKE3 hash value (32 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Blake3Hash(pub [u8; 32]);

impl Blake3Hash {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl From<blake3::Hash> for Blake3Hash {
    fn from(hash: blake3::Hash) -> Self {
        Self(*hash.as_bytes())
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Ignore patterns applied while enumerating changes (e.g., "*.o")
    #[serde(default)]
    pub ignore_patterns: Vec<String>,

    /// Whether to follow symbolic links during enumeration
    #[serde(default)]
    pub follow_symlinks: bool,

    /// User-defined tool templates, merged over the built-in registry
    #[serde(default)]
    pub tools: BTreeMap<String, Vec<String>>,

    /// Enable portable mode (config alongside binary)
    #[serde(default)]
    pub portable_mode: bool,
}

impl AppConfig {
    /// The built-in registry extended with the user-defined templates from
    /// this configuration.
    pub fn tool_registry(&self) -> ToolRegistry {
        let mut registry = ToolRegistry::builtin();
        for (name, args) in &self.tools {
            registry.insert(name.clone(), CommandTemplate::new(args.clone()));
        }
        registry
    }
}
