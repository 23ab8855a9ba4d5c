//! Parser for the `[export ]KEY='value'` environment file format.
//!
//! A value is a run of adjacent shell-quoted segments with nothing in between:
//!
//! - `'...'` a single-quoted segment, taken verbatim (may span lines)
//! - `\'` an escaped literal single quote
//! - `$'...'` an ANSI-C quoted segment, as written for escaped newlines
//!
//! Blank lines are skipped. Any other line that does not start directly with
//! `KEY=` or `export KEY=` is rejected with the line it was found on, so keys
//! are never silently renamed or dropped. There is no comment syntax: a line
//! starting with `#` is an assignment to a key starting with `#`.

use std::collections::HashMap;

#[cfg(feature = "tracing")]
use tracing::trace;

/// Parses environment file contents into a key/value mapping.
///
/// Later assignments to the same key overwrite earlier ones. Empty input
/// yields an empty mapping.
pub fn parse_str(input: &str) -> Result<HashMap<String, String>, ParseError> {
  let mut vars = HashMap::new();
  let mut cursor = Cursor::new(input);

  loop {
    cursor.skip_blanks();
    match cursor.peek() {
      None => break,
      Some('\n') => {
        cursor.bump();
      }
      Some(_) if cursor.pos != cursor.line_start => {
        return Err(cursor.error("whitespace before key"));
      }
      Some(_) => {
        let (key, value) = cursor.assignment()?;
        #[cfg(feature = "tracing")]
        trace!("Parsed variable: {}", key);
        vars.insert(key, value);
      }
    }
  }

  Ok(vars)
}

/// Whether `key` can be written as `KEY='value'` and read back unchanged.
pub fn is_valid_key(key: &str) -> bool {
  !key.is_empty()
    && !key.contains(|c: char| c.is_whitespace() || matches!(c, '=' | '\'' | '"'))
}

/// Errors produced by [`parse_str`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
  #[error("Invalid line {line} ({reason}): {content}")]
  InvalidLine {
    /// 1-based line number
    line: usize,
    /// Text of the offending line
    content: String,
    reason: &'static str,
  },
}

struct Cursor<'a> {
  input: &'a str,
  pos: usize,
  line: usize,
  line_start: usize,
}

impl<'a> Cursor<'a> {
  fn new(input: &'a str) -> Self {
    Self {
      input,
      pos: 0,
      line: 1,
      line_start: 0,
    }
  }

  fn rest(&self) -> &'a str {
    &self.input[self.pos..]
  }

  fn peek(&self) -> Option<char> {
    self.rest().chars().next()
  }

  fn bump(&mut self) -> Option<char> {
    let c = self.peek()?;
    self.pos += c.len_utf8();
    if c == '\n' {
      self.line += 1;
      self.line_start = self.pos;
    }
    Some(c)
  }

  fn skip_blanks(&mut self) {
    while let Some(' ' | '\t' | '\r') = self.peek() {
      self.bump();
    }
  }

  fn error(&self, reason: &'static str) -> ParseError {
    let line = &self.input[self.line_start..];
    let content = line.split('\n').next().unwrap_or_default();
    ParseError::InvalidLine {
      line: self.line,
      content: content.trim_end_matches('\r').to_string(),
      reason,
    }
  }

  fn assignment(&mut self) -> Result<(String, String), ParseError> {
    if let Some(after) = self.rest().strip_prefix("export")
      && after.starts_with([' ', '\t'])
    {
      self.pos += "export".len();
      self.skip_blanks();
    }

    let key = self.key()?;
    if self.peek() != Some('=') {
      return Err(self.error("expected '=' after key"));
    }
    self.bump();
    let value = self.value()?;

    self.skip_blanks();
    match self.peek() {
      None | Some('\n') => Ok((key, value)),
      Some(_) => Err(self.error("unexpected characters after value")),
    }
  }

  fn key(&mut self) -> Result<String, ParseError> {
    let rest = self.rest();
    let end = rest.find(['=', '\n']).unwrap_or(rest.len());
    let key = &rest[..end];

    if key.is_empty() {
      return Err(self.error("missing key"));
    }
    if !is_valid_key(key) {
      return Err(self.error("invalid key"));
    }

    self.pos += end;
    Ok(key.to_string())
  }

  fn value(&mut self) -> Result<String, ParseError> {
    let mut value = String::new();
    let mut segments = 0;

    loop {
      match self.peek() {
        Some('\'') => {
          self.bump();
          self.single_quoted(&mut value)?;
        }
        Some('\\') => {
          self.bump();
          if self.peek() != Some('\'') {
            return Err(self.error("unsupported escape outside quotes"));
          }
          self.bump();
          value.push('\'');
        }
        Some('$') if self.rest().starts_with("$'") => {
          self.pos += 2;
          self.ansi_c_quoted(&mut value)?;
        }
        _ => break,
      }
      segments += 1;
    }

    if segments == 0 {
      return Err(self.error("value must be single-quoted"));
    }
    Ok(value)
  }

  fn single_quoted(&mut self, value: &mut String) -> Result<(), ParseError> {
    loop {
      match self.bump() {
        Some('\'') => return Ok(()),
        Some(c) => value.push(c),
        None => return Err(self.error("unterminated single quote")),
      }
    }
  }

  fn ansi_c_quoted(&mut self, value: &mut String) -> Result<(), ParseError> {
    loop {
      match self.bump() {
        Some('\'') => return Ok(()),
        Some('\\') => {
          let unescaped = match self.peek() {
            Some('n') => '\n',
            Some('t') => '\t',
            Some('r') => '\r',
            Some('\\') => '\\',
            Some('\'') => '\'',
            Some('"') => '"',
            Some(_) => return Err(self.error("unsupported escape in $'...'")),
            None => return Err(self.error("unterminated $'...' quote")),
          };
          self.bump();
          value.push(unescaped);
        }
        Some(c) => value.push(c),
        None => return Err(self.error("unterminated $'...' quote")),
      }
    }
  }
}
