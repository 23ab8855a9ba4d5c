//! Tar export of an environment, one file per variable.

use std::io::Write;

#[cfg(feature = "tracing")]
use tracing::debug;

use crate::env::Env;
use crate::error::EnvError;

/// Mode of every bundle entry, read-write for the owner only.
pub const BUNDLE_ENTRY_MODE: u32 = 0o600;

impl Env {
  /// Writes the environment to `dest` as a tar archive.
  ///
  /// Each variable becomes a regular file named after its key holding the raw,
  /// unquoted value. Entries follow key order. Keys that would not come out
  /// of the archive under the same name, such as `./A`, `../A` or `/A`, fail
  /// with [`EnvError::InvalidKey`] before anything is written.
  pub fn export_bundle<W: Write>(&self, dest: W) -> Result<(), EnvError> {
    #[cfg(feature = "tracing")]
    debug!(name = self.name(), vars = self.len(), "Exporting bundle");

    let entries = self.sorted();
    if let Some((key, _)) = entries.iter().find(|(k, _)| !is_entry_name(k)) {
      return Err(EnvError::InvalidKey {
        key: key.to_string(),
        reason: "key is not a normalized relative archive path",
      });
    }

    let mut archive = tar::Builder::new(dest);
    for (key, value) in entries {
      let mut header = tar::Header::new_gnu();
      header.set_entry_type(tar::EntryType::Regular);
      header.set_mode(BUNDLE_ENTRY_MODE);
      header.set_mtime(0);
      header.set_size(value.len() as u64);
      archive
        .append_data(&mut header, key, value.as_bytes())
        .map_err(EnvError::Bundle)?;
    }
    archive.finish().map_err(EnvError::Bundle)
  }
}

fn is_entry_name(key: &str) -> bool {
  !key.contains('\0')
    && !key.starts_with('/')
    && key.split('/').all(|part| !matches!(part, "" | "." | ".."))
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::io::Read;

  fn read_bundle(bytes: &[u8]) -> Vec<(String, u32, u64, String)> {
    let mut archive = tar::Archive::new(bytes);
    archive
      .entries()
      .unwrap()
      .map(|entry| {
        let mut entry = entry.unwrap();
        let name = entry.path().unwrap().to_string_lossy().into_owned();
        let mode = entry.header().mode().unwrap();
        let size = entry.header().size().unwrap();
        let mut content = String::new();
        entry.read_to_string(&mut content).unwrap();
        (name, mode, size, content)
      })
      .collect()
  }

  #[test]
  fn test_export_bundle() {
    let mut env = Env::new("app");
    env.set("B", "y");
    env.set("A", "x");

    let mut buf = Vec::new();
    env.export_bundle(&mut buf).unwrap();

    assert_eq!(
      read_bundle(&buf),
      vec![
        ("A".to_string(), 0o600, 1, "x".to_string()),
        ("B".to_string(), 0o600, 1, "y".to_string()),
      ]
    );
  }

  #[test]
  fn test_export_bundle_raw_values() {
    let mut env = Env::new("app");
    env.set("CERT", "it's\nmultiline ✓");
    env.set("EMPTY", "");
    env.set_escape_newlines(true);

    let mut buf = Vec::new();
    env.export_bundle(&mut buf).unwrap();

    let entries = read_bundle(&buf);
    assert_eq!(entries[0].0, "CERT");
    assert_eq!(entries[0].2, "it's\nmultiline ✓".len() as u64);
    assert_eq!(entries[0].3, "it's\nmultiline ✓");
    assert_eq!(entries[1], ("EMPTY".to_string(), 0o600, 0, String::new()));
  }

  #[test]
  fn test_export_bundle_keeps_nested_names() {
    let mut env = Env::new("app");
    env.set("dir/KEY", "v");

    let mut buf = Vec::new();
    env.export_bundle(&mut buf).unwrap();

    assert_eq!(read_bundle(&buf)[0].0, "dir/KEY");
  }

  #[test]
  fn test_export_bundle_rejects_renamed_keys() {
    for key in ["./A", "../A", "/A", "A/", "A//B", "A/./B", ""] {
      let mut env = Env::new("app");
      env.set("OK", "1");
      env.set(key, "v");

      let mut buf = Vec::new();
      match env.export_bundle(&mut buf) {
        Err(EnvError::InvalidKey { key: bad, .. }) => assert_eq!(bad, key),
        other => panic!("Expected InvalidKey for {key:?}, got {other:?}"),
      }
      assert!(buf.is_empty());
    }
  }

  #[test]
  fn test_export_bundle_empty() {
    let mut buf = Vec::new();
    Env::new("app").export_bundle(&mut buf).unwrap();

    assert!(read_bundle(&buf).is_empty());
  }
}
