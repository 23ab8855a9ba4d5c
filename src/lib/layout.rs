//! Where environments live on disk.
//!
//! The global environment is `<root>/ENV` and an app's environment is
//! `<root>/<app>/ENV`. The root is supplied through the [`Layout`] trait so
//! callers decide how it is configured.

use std::path::PathBuf;

use crate::error::EnvError;

/// Target argument that selects the global environment.
pub const GLOBAL_TARGET: &str = "--global";

/// File name of every environment file.
pub const ENV_FILENAME: &str = "ENV";

/// Environment variable read by [`EnvRoot::from_env`].
pub const ROOT_VAR: &str = "ENVSTORE_ROOT";

/// The scope an environment belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
  Global,
  App(String),
}

impl From<&str> for Target {
  fn from(target: &str) -> Self {
    if target == GLOBAL_TARGET {
      Target::Global
    } else {
      Target::App(target.to_string())
    }
  }
}

/// Resolves the storage root and validates app names.
pub trait Layout {
  /// The directory holding the global environment and one directory per app.
  fn root(&self) -> Result<PathBuf, EnvError>;

  fn validate_name(&self, name: &str) -> Result<(), EnvError> {
    validate_app_name(name)
  }

  fn global_file(&self) -> Result<PathBuf, EnvError> {
    Ok(self.root()?.join(ENV_FILENAME))
  }

  /// Path of an app's environment file. The name is validated first.
  fn app_file(&self, app: &str) -> Result<PathBuf, EnvError> {
    self.validate_name(app)?;
    Ok(self.root()?.join(app).join(ENV_FILENAME))
  }
}

/// A [`Layout`] rooted at a fixed directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvRoot {
  root: PathBuf,
}

impl EnvRoot {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  /// Reads the root directory from `ENVSTORE_ROOT`.
  pub fn from_env() -> Result<Self, EnvError> {
    match std::env::var_os(ROOT_VAR) {
      Some(root) if !root.is_empty() => Ok(Self::new(root)),
      _ => Err(EnvError::RootNotConfigured(ROOT_VAR)),
    }
  }
}

impl Layout for EnvRoot {
  fn root(&self) -> Result<PathBuf, EnvError> {
    Ok(self.root.clone())
  }
}

/// Checks that `name` is a usable app name.
///
/// Names start with a lowercase ASCII letter or digit and otherwise contain
/// only lowercase ASCII letters, digits and dashes.
pub fn validate_app_name(name: &str) -> Result<(), EnvError> {
  let invalid = |reason| {
    Err(EnvError::InvalidName {
      name: name.to_string(),
      reason,
    })
  };

  let Some(first) = name.chars().next() else {
    return invalid("name must not be empty");
  };
  if !(first.is_ascii_lowercase() || first.is_ascii_digit()) {
    return invalid("name must begin with a lowercase letter or digit");
  }
  if !name
    .chars()
    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
  {
    return invalid("name may only contain lowercase letters, digits and dashes");
  }

  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::path::Path;

  #[test]
  fn test_target_from_str() {
    assert_eq!(Target::from("--global"), Target::Global);
    assert_eq!(Target::from("my-app"), Target::App("my-app".to_string()));
    assert_eq!(Target::from("global"), Target::App("global".to_string()));
  }

  #[test]
  fn test_validate_app_name() {
    for name in ["app", "my-app", "2048", "a-1-b"] {
      assert!(validate_app_name(name).is_ok(), "{name} should be valid");
    }
    for name in ["", "-app", "App", "my_app", "my app", "../etc", "a/b", "café"] {
      assert!(
        matches!(validate_app_name(name), Err(EnvError::InvalidName { .. })),
        "{name} should be invalid"
      );
    }
  }

  #[test]
  fn test_file_paths() {
    let layout = EnvRoot::new("/srv/root");

    assert_eq!(layout.global_file().unwrap(), Path::new("/srv/root/ENV"));
    assert_eq!(
      layout.app_file("web").unwrap(),
      Path::new("/srv/root/web/ENV")
    );
    assert!(layout.app_file("../web").is_err());
  }
}
