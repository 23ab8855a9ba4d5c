//! Errors produced while loading, editing and persisting environments.

use std::path::PathBuf;

use crate::parse::ParseError;

/// Errors that can occur while working with an [`Env`](crate::env::Env).
#[derive(Debug, thiserror::Error)]
pub enum EnvError {
  /// The application name failed syntactic validation
  #[error("Invalid app name {name:?}: {reason}")]
  InvalidName { name: String, reason: &'static str },
  /// A key cannot be represented in the requested output
  #[error("Invalid key {key:?}: {reason}")]
  InvalidKey { key: String, reason: &'static str },
  /// `write` was called on an environment that was not loaded from a file
  #[error("This environment was created unbound to a file")]
  Unbound,
  /// The storage root could not be resolved
  #[error("Storage root is not configured, set {0}")]
  RootNotConfigured(&'static str),
  /// Error opening or reading the backing file
  #[error("Failed to read {path}: {source}")]
  Read {
    path: PathBuf,
    source: std::io::Error,
  },
  /// Error creating or writing the backing file
  #[error("Failed to write {path}: {source}")]
  Write {
    path: PathBuf,
    source: std::io::Error,
  },
  /// Error streaming the archive bundle
  #[error("Bundle error: {0}")]
  Bundle(std::io::Error),
  /// The environment file contained a malformed line
  #[error("Parse error: {0}")]
  Parse(#[from] ParseError),
}
