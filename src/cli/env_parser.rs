//! `.env` file reading and writing.
//!
//! Values may be stored in plaintext or as `envx:` encrypted values; the
//! latter are decrypted with the workspace master key as they are loaded.
//! `EnvFile` edits a file line by line so comments and ordering survive a
//! `set`, `delete`, or `rotate`.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::crypto::value::VALUE_PREFIX;
use crate::crypto::{reveal, KeyStrategy};
use crate::errors::{EnvxError, Result};

/// Parse a single `.env` line into a (key, value) pair.
///
/// Returns `None` for blank lines, comments, and lines without `=`.
/// Handles: `export` prefix, double/single quotes, values with `=`.
pub fn parse_env_line(line: &str) -> Option<(&str, &str)> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }

    let trimmed = trimmed.strip_prefix("export ").unwrap_or(trimmed);

    let (key, value) = trimmed.split_once('=')?;
    let key = key.trim();
    let value = value.trim();

    let value = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
        .unwrap_or(value);

    if key.is_empty() {
        return None;
    }

    Some((key, value))
}

/// Parse a `.env` file into a key-value map of raw (possibly encrypted) values.
///
/// Later duplicates win.
pub fn parse_env_file(path: &Path) -> Result<HashMap<String, String>> {
    let content = fs::read_to_string(path).map_err(|e| {
        EnvxError::CommandFailed(format!("failed to read {}: {e}", path.display()))
    })?;

    Ok(content
        .lines()
        .filter_map(parse_env_line)
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect())
}

/// Load the `scope` subset of the env file at `path`, decrypting `envx:`
/// values.
///
/// Names not present in the file are left out so the envelope layer can
/// report them.  The master key is only derived if a scoped value is
/// actually encrypted.
pub fn load_secrets(
    path: &Path,
    scope: &[String],
    keys: &KeyStrategy,
) -> Result<HashMap<String, String>> {
    let raw = parse_env_file(path)?;
    let mut secrets = HashMap::with_capacity(scope.len());

    for name in scope {
        let Some(value) = raw.get(name) else {
            continue;
        };
        secrets.insert(name.clone(), reveal_raw(name, value, keys)?);
    }

    Ok(secrets)
}

/// Check that `name` is usable as an environment variable name.
pub fn validate_name(name: &str) -> Result<()> {
    let mut bytes = name.bytes();
    let valid_start = bytes
        .next()
        .is_some_and(|b| b.is_ascii_alphabetic() || b == b'_');

    if valid_start && bytes.all(|b| b.is_ascii_alphanumeric() || b == b'_') {
        Ok(())
    } else {
        Err(EnvxError::InvalidName(name.to_string()))
    }
}

/// A `.env` file held as its lines, edited in place and saved atomically.
pub struct EnvFile {
    path: PathBuf,
    lines: Vec<String>,
}

impl EnvFile {
    /// Read the file at `path`.  A missing file is an empty one.
    pub fn load(path: &Path) -> Result<Self> {
        let lines = match fs::read_to_string(path) {
            Ok(content) => content.lines().map(str::to_string).collect(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                return Err(EnvxError::CommandFailed(format!(
                    "failed to read {}: {e}",
                    path.display()
                )))
            }
        };

        Ok(Self {
            path: path.to_path_buf(),
            lines,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The raw stored value for `name`; the last assignment wins.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.lines
            .iter()
            .rev()
            .filter_map(|line| parse_env_line(line))
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value)
    }

    /// Every variable with its raw value, in file order, one per name.
    pub fn entries(&self) -> Vec<(&str, &str)> {
        let mut entries: Vec<(&str, &str)> = Vec::new();
        for (key, value) in self.lines.iter().filter_map(|line| parse_env_line(line)) {
            match entries.iter_mut().find(|(k, _)| *k == key) {
                Some(existing) => existing.1 = value,
                None => entries.push((key, value)),
            }
        }
        entries
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Assign `value` to `name`.
    ///
    /// An existing assignment is rewritten where it stands and earlier
    /// duplicates are dropped; a new name is appended.  Returns whether the
    /// name already existed.
    pub fn set(&mut self, name: &str, value: &str) -> Result<bool> {
        validate_name(name)?;
        if value.contains(['\n', '\r']) {
            return Err(EnvxError::CommandFailed(format!(
                "value for '{name}' spans multiple lines, which .env files cannot hold"
            )));
        }

        let line = format_line(name, value);
        let positions = self.positions(name);

        match positions.split_last() {
            Some((&last, earlier)) => {
                self.lines[last] = line;
                for &i in earlier.iter().rev() {
                    self.lines.remove(i);
                }
                Ok(true)
            }
            None => {
                self.lines.push(line);
                Ok(false)
            }
        }
    }

    /// Remove every assignment of `name`.  Returns whether any existed.
    pub fn remove(&mut self, name: &str) -> bool {
        let positions = self.positions(name);
        for &i in positions.iter().rev() {
            self.lines.remove(i);
        }
        !positions.is_empty()
    }

    /// Write the file through a temp file in the same directory, then rename.
    pub fn save(&self) -> Result<()> {
        let parent = self.path.parent().unwrap_or(Path::new("."));
        let tmp_path = parent.join(format!(
            ".{}.tmp",
            self.path.file_name().unwrap_or_default().to_string_lossy()
        ));

        let mut content = self.lines.join("\n");
        if !content.is_empty() {
            content.push('\n');
        }

        fs::write(&tmp_path, content)?;
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    /// The plaintext of `name`, decrypting an `envx:` value.
    pub fn reveal(&self, name: &str, keys: &KeyStrategy) -> Result<String> {
        let value = self
            .get(name)
            .ok_or_else(|| EnvxError::SecretNotFound(name.to_string()))?;
        reveal_raw(name, value, keys)
    }

    /// Plaintext of every variable, in file order.
    pub fn reveal_all(&self, keys: &KeyStrategy) -> Result<Vec<(String, String)>> {
        self.entries()
            .into_iter()
            .map(|(name, value)| Ok((name.to_string(), reveal_raw(name, value, keys)?)))
            .collect()
    }

    fn positions(&self, name: &str) -> Vec<usize> {
        self.lines
            .iter()
            .enumerate()
            .filter(|(_, line)| parse_env_line(line).is_some_and(|(key, _)| key == name))
            .map(|(i, _)| i)
            .collect()
    }
}

/// Malformed `envx:` values go through `reveal` too, so they error.
fn reveal_raw(name: &str, value: &str, keys: &KeyStrategy) -> Result<String> {
    if value.starts_with(VALUE_PREFIX) {
        tracing::debug!(secret = %name, "decrypting envx value");
        Ok(reveal(keys.master_key()?, value, name)?.to_string())
    } else {
        Ok(value.to_string())
    }
}

/// Quote values that `parse_env_line` would otherwise trim or unquote.
fn format_line(name: &str, value: &str) -> String {
    let needs_quotes = value
        .chars()
        .any(|c| c.is_whitespace() || matches!(c, '#' | '"' | '\''));

    if needs_quotes {
        format!("{name}=\"{value}\"")
    } else {
        format!("{name}={value}")
    }
}
