//! Literal ignore rules read from a directory's pattern file.
//!
//! Every non-blank line that does not start with `#` names one path relative
//! to the directory holding the pattern file. There is no glob or negation
//! support: a path matches a rule only if it is exactly `base/rule`.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};

pub const PATTERN_FILE: &str = ".gitignore";

#[derive(Debug, thiserror::Error)]
pub enum IgnoreError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IgnoreRule(PathBuf);

impl IgnoreRule {
    /// Number of path segments below the base directory.
    fn depth(&self) -> usize {
        self.0
            .components()
            .filter(|c| matches!(c, Component::Normal(_)))
            .count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IgnoreRules {
    base: PathBuf,
    rules: Vec<IgnoreRule>,
}

impl IgnoreRules {
    pub fn empty(base: &Path) -> Self {
        IgnoreRules {
            base: base.to_path_buf(),
            rules: Vec::new(),
        }
    }

    pub fn parse(base: &Path, content: &str) -> Self {
        let rules = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .filter_map(parse_rule)
            .collect();

        IgnoreRules {
            base: base.to_path_buf(),
            rules,
        }
    }

    /// Load the rules for `dir` from `dir/<pattern_file>`.
    ///
    /// A missing pattern file is an empty rule set.
    pub fn load(dir: &Path, pattern_file: &str) -> Result<Self, IgnoreError> {
        let path = dir.join(pattern_file);

        match std::fs::read_to_string(&path) {
            Ok(content) => {
                let rules = Self::parse(dir, &content);
                debug!("Loaded {} rules from {}", rules.len(), path.display());
                Ok(rules)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Self::empty(dir)),
            Err(source) => Err(IgnoreError::Read { path, source }),
        }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Whether `path` is exactly `base/rule` for one of the rules.
    ///
    /// Comparison is by path components, so `./dist` and `dist/` both match
    /// `base/dist`.
    pub fn matches(&self, path: &Path) -> bool {
        self.rules.iter().any(|rule| self.base.join(&rule.0) == path)
    }

    /// How many levels below the base the deepest rule reaches. A walk
    /// bounded by this depth sees every path a rule can match.
    pub fn max_depth(&self) -> usize {
        self.rules.iter().map(IgnoreRule::depth).max().unwrap_or(0)
    }
}

/// Turn one pattern line into a rule, refusing anything that could resolve
/// outside the base directory.
fn parse_rule(line: &str) -> Option<IgnoreRule> {
    // gitignore's anchored form still means "relative to this directory".
    let relative = Path::new(line.trim_start_matches('/'));

    let escapes = relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));

    let names_entry = relative
        .components()
        .any(|c| matches!(c, Component::Normal(_)));

    if escapes || !names_entry {
        warn!("Ignoring pattern that does not name a path below its directory: {line}");
        return None;
    }

    Some(IgnoreRule(relative.to_path_buf()))
}
