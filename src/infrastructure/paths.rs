//! # Module Path Resolver
//!
//! Picks the bot module location from an ordered list of lazily evaluated
//! candidate suppliers: the first positional CLI argument, then the `jar`
//! key of a `key=value` `config.properties` file next to the executable.
//! The first candidate denoting an existing regular file wins.

use crate::domain::error::ConfigurationError;
use std::path::{Path, PathBuf};

type Candidate = Box<dyn Fn() -> Option<PathBuf> + Send + Sync>;

#[derive(Default)]
pub struct PathResolver {
    candidates: Vec<Candidate>,
}

fn is_usable(path: &Path) -> bool {
    path.is_file()
}

impl PathResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Candidate: a path given directly on the command line.
    pub fn check_arg(mut self, arg: Option<PathBuf>) -> Self {
        self.candidates.push(Box::new(move || {
            let path = arg.clone()?;
            is_usable(&path).then_some(path)
        }));
        self
    }

    /// Candidate: the `jar` key of a properties file.
    pub fn check_config(mut self, config_file: PathBuf) -> Self {
        self.candidates.push(Box::new(move || {
            if !is_usable(&config_file) {
                return None;
            }
            let content = match std::fs::read_to_string(&config_file) {
                Ok(content) => content,
                Err(err) => {
                    tracing::warn!("failed to read {}: {err}", config_file.display());
                    return None;
                }
            };
            let path = PathBuf::from(read_property(&content, "jar")?);
            is_usable(&path).then_some(path)
        }));
        self
    }

    /// Evaluate candidates in order and return the first usable file. The
    /// caller decides whether a miss is fatal; here it never is.
    pub fn resolve(&self) -> Result<PathBuf, ConfigurationError> {
        for candidate in &self.candidates {
            if let Some(path) = candidate() {
                return Ok(path);
            }
        }
        tracing::warn!("failed to locate a bot module archive; the bot may not work correctly");
        Err(ConfigurationError)
    }
}

/// Minimal `key=value` properties lookup. Lines starting with `#` or `!`
/// are comments.
fn read_property(content: &str, key: &str) -> Option<String> {
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
            continue;
        }
        if let Some((k, v)) = line.split_once('=') {
            if k.trim() == key {
                return Some(v.trim().to_string());
            }
        }
    }
    None
}
