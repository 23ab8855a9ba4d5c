//! The in-memory environment and its backing file.
//!
//! An [`Env`] holds the variables of one scope, either a single app or the
//! global scope. Variables are stored unordered; every read that exposes an
//! order ([`Env::keys`], serialization, bundles) sorts keys byte-wise.

use std::collections::HashMap;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[cfg(feature = "tracing")]
use tracing::debug;

use crate::error::EnvError;
use crate::layout::{Layout, Target};
use crate::parse::{is_valid_key, parse_str};

/// Informational name of the global environment.
pub const GLOBAL_NAME: &str = "global";

const UNKNOWN_NAME: &str = "<unknown>";

/// A named set of environment variables, optionally bound to a file.
///
/// Equality compares variables only; the name, backing path and formatting
/// flag are ignored.
#[derive(Debug, Clone)]
pub struct Env {
  name: String,
  vars: HashMap<String, String>,
  path: Option<PathBuf>,
  escape_newlines: bool,
}

impl Env {
  /// Creates an empty environment that is not bound to any file.
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      vars: HashMap::new(),
      path: None,
      escape_newlines: false,
    }
  }

  /// Parses an environment from its file representation without binding it to a file.
  pub fn from_string(rep: &str) -> Result<Self, EnvError> {
    let mut env = Self::new(UNKNOWN_NAME);
    env.vars = parse_str(rep)?;
    Ok(env)
  }

  /// Loads the environment stored at `path` and binds it to that file.
  ///
  /// A missing file yields an empty environment that is still bound, so the
  /// first [`write`](Env::write) creates it.
  pub fn load_file(name: impl Into<String>, path: impl Into<PathBuf>) -> Result<Self, EnvError> {
    let path = path.into();

    #[cfg(feature = "tracing")]
    debug!(?path, "Loading environment file");

    let contents = match std::fs::read_to_string(&path) {
      Ok(contents) => contents,
      Err(err) if err.kind() == ErrorKind::NotFound => {
        #[cfg(feature = "tracing")]
        debug!(?path, "Environment file does not exist yet");
        String::new()
      }
      Err(source) => return Err(EnvError::Read { path, source }),
    };

    let mut env = Self::new(name);
    env.vars = parse_str(&contents)?;
    env.path = Some(path);
    Ok(env)
  }

  /// Loads the environment of the given target.
  pub fn load<L: Layout + ?Sized>(layout: &L, target: &Target) -> Result<Self, EnvError> {
    match target {
      Target::Global => Self::load_global(layout),
      Target::App(app) => Self::load_app(layout, app),
    }
  }

  /// Loads an environment from a target argument, either `--global` or an app name.
  pub fn new_from_target<L: Layout + ?Sized>(layout: &L, target: &str) -> Result<Self, EnvError> {
    Self::load(layout, &Target::from(target))
  }

  /// Loads the environment of `app`, validating the name before touching the filesystem.
  pub fn load_app<L: Layout + ?Sized>(layout: &L, app: &str) -> Result<Self, EnvError> {
    let path = layout.app_file(app)?;
    Self::load_file(app, path)
  }

  /// Loads the global environment.
  pub fn load_global<L: Layout + ?Sized>(layout: &L) -> Result<Self, EnvError> {
    let path = layout.global_file()?;
    Self::load_file(GLOBAL_NAME, path)
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  /// The file this environment was loaded from, if any.
  pub fn path(&self) -> Option<&Path> {
    self.path.as_deref()
  }

  /// Whether newlines in values are written as `$'\n'` so each entry stays on one line.
  pub fn escape_newlines(&self) -> bool {
    self.escape_newlines
  }

  pub fn set_escape_newlines(&mut self, escape: bool) {
    self.escape_newlines = escape;
  }

  /// Sets a variable, overwriting any previous value.
  pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
    self.vars.insert(key.into(), value.into());
  }

  /// Removes a variable, returning its previous value if it was set.
  pub fn unset(&mut self, key: &str) -> Option<String> {
    self.vars.remove(key)
  }

  pub fn get(&self, key: &str) -> Option<&str> {
    self.vars.get(key).map(String::as_str)
  }

  /// Gets a variable or `default` if it is not set.
  pub fn get_default<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
    self.get(key).unwrap_or(default)
  }

  /// Gets a variable as a boolean, or `default` if it is not set.
  ///
  /// Only the exact value `"0"` is false. Every other value, including
  /// `"false"` and the empty string, is true.
  pub fn get_bool_default(&self, key: &str, default: bool) -> bool {
    match self.get(key) {
      Some(value) => value != "0",
      None => default,
    }
  }

  /// All variable names in ascending byte-wise order.
  pub fn keys(&self) -> Vec<String> {
    self.sorted().into_iter().map(|(k, _)| k.clone()).collect()
  }

  pub fn len(&self) -> usize {
    self.vars.len()
  }

  pub fn is_empty(&self) -> bool {
    self.vars.is_empty()
  }

  pub fn map(&self) -> &HashMap<String, String> {
    &self.vars
  }

  /// Mutable access to the underlying variables.
  ///
  /// Changes made through this view are changes to the environment itself.
  /// Use [`to_map`](Env::to_map) for a detached copy.
  pub fn map_mut(&mut self) -> &mut HashMap<String, String> {
    &mut self.vars
  }

  /// A copy of the variables that can be changed without affecting this environment.
  pub fn to_map(&self) -> HashMap<String, String> {
    self.vars.clone()
  }

  /// Sets every variable of `other` on this environment.
  ///
  /// Variables only present here are kept; shared ones take `other`'s value.
  pub fn merge(&mut self, other: &Env) {
    for (key, value) in &other.vars {
      self.vars.insert(key.clone(), value.clone());
    }
  }

  /// Replaces the backing file with the export format of this environment.
  ///
  /// The contents are staged in a temporary file next to the target and
  /// renamed over it, so the file is either fully replaced or left untouched.
  /// A symlinked backing file is followed and its target replaced. An existing
  /// file keeps its permission bits, but the new file is owned by the writing
  /// user. A new file is created with mode `0600`.
  ///
  /// Fails with [`EnvError::InvalidKey`] before touching the filesystem if a
  /// key could not be read back, such as one containing whitespace or `=`.
  pub fn write(&self) -> Result<(), EnvError> {
    let path = self.path.as_deref().ok_or(EnvError::Unbound)?;
    if let Some((key, _)) = self.sorted().into_iter().find(|(k, _)| !is_valid_key(k)) {
      return Err(EnvError::InvalidKey {
        key: key.clone(),
        reason: "key cannot be written as KEY='value'",
      });
    }
    let write_err = |source: std::io::Error| EnvError::Write {
      path: path.to_path_buf(),
      source,
    };

    #[cfg(feature = "tracing")]
    debug!(?path, vars = self.vars.len(), "Writing environment file");

    let target = match std::fs::canonicalize(path) {
      Ok(target) => target,
      Err(err) if err.kind() == ErrorKind::NotFound => path.to_path_buf(),
      Err(source) => return Err(write_err(source)),
    };
    let dir = match target.parent() {
      Some(dir) if !dir.as_os_str().is_empty() => dir,
      _ => Path::new("."),
    };
    let mut staged = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
    if let Ok(metadata) = std::fs::metadata(&target) {
      staged
        .as_file()
        .set_permissions(metadata.permissions())
        .map_err(write_err)?;
    }
    staged
      .write_all(self.exportfile_string().as_bytes())
      .map_err(write_err)?;
    staged.as_file().sync_all().map_err(write_err)?;
    staged.persist(&target).map_err(|err| write_err(err.error))?;

    Ok(())
  }

  /// Variables sorted by key.
  pub(crate) fn sorted(&self) -> Vec<(&String, &String)> {
    let mut entries: Vec<_> = self.vars.iter().collect();
    entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
    entries
  }
}

impl PartialEq for Env {
  fn eq(&self, other: &Self) -> bool {
    self.vars == other.vars
  }
}

impl Eq for Env {}

impl FromStr for Env {
  type Err = EnvError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::from_string(s)
  }
}

impl Extend<(String, String)> for Env {
  fn extend<T: IntoIterator<Item = (String, String)>>(&mut self, iter: T) {
    self.vars.extend(iter);
  }
}

impl FromIterator<(String, String)> for Env {
  fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
    let mut env = Self::new(UNKNOWN_NAME);
    env.extend(iter);
    env
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn env_of(pairs: &[(&str, &str)]) -> Env {
    pairs
      .iter()
      .map(|(k, v)| (k.to_string(), v.to_string()))
      .collect()
  }

  #[test]
  fn test_set_overwrites() {
    let mut env = Env::new("app");
    env.set("KEY", "one");
    env.set("KEY", "two");

    assert_eq!(env.get("KEY"), Some("two"));
    assert_eq!(env.len(), 1);
  }

  #[test]
  fn test_set_accepts_anything() {
    let mut env = Env::new("app");
    env.set("", "");
    env.set("weird key!", "");

    assert_eq!(env.get(""), Some(""));
    assert_eq!(env.get("weird key!"), Some(""));
  }

  #[test]
  fn test_unset() {
    let mut env = env_of(&[("A", "1")]);

    assert_eq!(env.unset("A"), Some("1".to_string()));
    assert_eq!(env.unset("A"), None);
    assert_eq!(env.get("A"), None);
    assert!(env.is_empty());
  }

  #[test]
  fn test_get_default() {
    let env = env_of(&[("A", "1"), ("EMPTY", "")]);

    assert_eq!(env.get_default("A", "x"), "1");
    assert_eq!(env.get_default("EMPTY", "x"), "");
    assert_eq!(env.get_default("MISSING", "x"), "x");
  }

  #[test]
  fn test_get_bool_default() {
    let env = env_of(&[("ZERO", "0"), ("EMPTY", ""), ("FALSE", "false"), ("NO", "no")]);

    assert!(!env.get_bool_default("ZERO", true));
    assert!(env.get_bool_default("EMPTY", false));
    assert!(env.get_bool_default("FALSE", false));
    assert!(env.get_bool_default("NO", false));
    assert!(env.get_bool_default("MISSING", true));
    assert!(!env.get_bool_default("MISSING", false));
  }

  #[test]
  fn test_keys_sorted() {
    let mut env = Env::new("app");
    for key in ["b", "B", "a", "_x", "A10", "A2"] {
      env.set(key, "v");
    }

    assert_eq!(env.keys(), vec!["A10", "A2", "B", "_x", "a", "b"]);
  }

  #[test]
  fn test_merge_overrides_and_keeps() {
    let mut env = env_of(&[("A", "1"), ("B", "2")]);
    let other = env_of(&[("B", "9"), ("C", "3")]);

    env.merge(&other);

    assert_eq!(env, env_of(&[("A", "1"), ("B", "9"), ("C", "3")]));
    assert_eq!(other.len(), 2);
  }

  #[test]
  fn test_map_mut_aliases_state() {
    let mut env = env_of(&[("A", "1")]);
    env.map_mut().insert("B".to_string(), "2".to_string());
    assert_eq!(env.get("B"), Some("2"));

    let mut copy = env.to_map();
    copy.remove("A");
    assert_eq!(env.get("A"), Some("1"));
    assert_eq!(env.map().len(), 2);
  }

  #[test]
  fn test_equality_ignores_name() {
    let mut a = Env::new("one");
    let mut b = Env::new("two");
    a.set("K", "v");
    b.set("K", "v");
    b.set_escape_newlines(true);

    assert_eq!(a, b);
  }

  #[test]
  fn test_from_string_is_unbound() {
    let env: Env = "A='1'".parse().unwrap();

    assert_eq!(env.name(), "<unknown>");
    assert!(env.path().is_none());
    assert_eq!(env.get("A"), Some("1"));
  }

  #[test]
  fn test_write_rejects_unreadable_keys() {
    for key in [" L", "export X", "A=B", "it's", ""] {
      let mut env = env_of(&[("A", "1")]);
      env.path = Some(PathBuf::from("/nonexistent/dir/ENV"));
      env.set(key, "v");

      match env.write() {
        Err(EnvError::InvalidKey { key: bad, .. }) => assert_eq!(bad, key),
        other => panic!("Expected InvalidKey for {key:?}, got {other:?}"),
      }
    }
  }

  #[test]
  fn test_write_unbound() {
    let env = env_of(&[("A", "1")]);

    assert!(matches!(env.write(), Err(EnvError::Unbound)));
  }
}
