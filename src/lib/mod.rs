//! File-backed application and global environments.
//!
//! This library reads environment files made of shell-quoted
//! `[export ]KEY='value'` lines, lets callers edit the variables, and writes
//! them back out as plain or shell-sourceable text, or as a tar bundle with
//! one file per variable.
//!
//! # Features
//!
//! - **Lossless quoting**: values with quotes, newlines or nothing at all
//!   survive a write and re-read unchanged
//! - **Deterministic output**: variables are always written in key order
//! - **Pluggable storage root**: file locations come from a [`Layout`]
//! - **Optional tracing**: Detailed logging when the `tracing` feature is enabled
//!
//! # Example
//!
//! ```rust,no_run
//! use envstore::{Env, EnvRoot};
//!
//! let layout = EnvRoot::new("/var/lib/envstore");
//! let mut env = Env::new_from_target(&layout, "my-app").unwrap();
//! env.set("DATABASE_URL", "postgres://localhost/app");
//! env.write().unwrap();
//! ```

pub mod bundle;
pub mod env;
pub mod error;
pub mod format;
pub mod layout;
pub mod parse;

pub use env::Env;
pub use error::EnvError;
pub use format::single_quote_escape;
pub use layout::{EnvRoot, Layout, Target};
pub use parse::{ParseError, parse_str};
