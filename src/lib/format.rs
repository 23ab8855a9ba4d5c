//! Serialization of an [`Env`] into shell-quoted `KEY='value'` lines.

use std::fmt;

use crate::env::Env;

/// Escapes `value` for use inside single quotes, so `it's` becomes `it'\''s`.
pub fn single_quote_escape(value: &str) -> String {
  value.replace('\'', r"'\''")
}

impl Env {
  /// The plain format, one `KEY='value'` per line.
  pub fn envfile_string(&self) -> String {
    self.string_with_prefix_and_separator("", "\n")
  }

  /// The shell-sourceable format, one `export KEY='value'` per line.
  pub fn exportfile_string(&self) -> String {
    self.string_with_prefix_and_separator("export ", "\n")
  }

  /// Formats every variable as `{prefix}KEY='value'` in key order, joined by `separator`.
  ///
  /// When [`escape_newlines`](Env::escape_newlines) is set, newlines inside a
  /// value are written as `'$'\n''` and each entry stays on one line.
  pub fn string_with_prefix_and_separator(&self, prefix: &str, separator: &str) -> String {
    self
      .sorted()
      .into_iter()
      .map(|(key, value)| {
        let mut value = single_quote_escape(value);
        if self.escape_newlines() {
          value = value.replace('\n', r"'$'\n''");
        }
        format!("{prefix}{key}='{value}'")
      })
      .collect::<Vec<_>>()
      .join(separator)
  }
}

impl fmt::Display for Env {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.envfile_string())
  }
}
