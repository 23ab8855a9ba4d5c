use clap::{Parser, Subcommand, ValueEnum};
use envstore::{Env, EnvRoot, Target};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(
  name = "envstore",
  about = "Read, edit and export app and global environments",
  version,
  author
)]
struct Cli {
  /// Root directory holding the environment files
  #[arg(long, env = envstore::layout::ROOT_VAR)]
  root: PathBuf,

  /// App whose environment to use, the global environment if omitted
  #[arg(short, long)]
  app: Option<String>,

  /// Verbose output (-v for verbose, -vv for very verbose)
  #[arg(short, long, action = clap::ArgAction::Count, global = true)]
  verbose: u8,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Print the value of a variable
  Get { key: String },
  /// Set one or more variables
  Set {
    /// Assignments in KEY=VALUE form
    #[arg(required = true, value_parser = parse_assignment)]
    assignments: Vec<(String, String)>,
  },
  /// Remove one or more variables
  Unset {
    #[arg(required = true)]
    keys: Vec<String>,
  },
  /// List variable names
  Keys,
  /// Print the whole environment
  Show {
    #[arg(long, value_enum, default_value_t = Format::Plain)]
    format: Format,

    /// Keep every variable on a single line
    #[arg(long)]
    escape_newlines: bool,
  },
  /// Write the environment to stdout as a tar archive
  Bundle,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
  Plain,
  Export,
}

fn parse_assignment(s: &str) -> Result<(String, String), String> {
  match s.split_once('=') {
    Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
    _ => Err(format!("expected KEY=VALUE, got {s:?}")),
  }
}

fn setup_tracing(verbose: u8) {
  use tracing_subscriber::fmt;
  use tracing_subscriber::prelude::*;

  let log_level = match verbose {
    0 => "warn",
    1 => "debug",
    _ => "trace",
  };

  tracing_subscriber::registry()
    .with(fmt::layer().with_writer(std::io::stderr))
    .with(tracing_subscriber::EnvFilter::new(
      std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.into()),
    ))
    .init();
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
  let cli = Cli::parse();

  setup_tracing(cli.verbose);

  let layout = EnvRoot::new(cli.root);
  let target = cli.app.map_or(Target::Global, Target::App);
  let mut env = Env::load(&layout, &target)?;

  match cli.command {
    Command::Get { key } => match env.get(&key) {
      Some(value) => println!("{value}"),
      None => return Ok(ExitCode::FAILURE),
    },
    Command::Set { assignments } => {
      for (key, value) in assignments {
        env.set(key, value);
      }
      env.write()?;
    }
    Command::Unset { keys } => {
      for key in &keys {
        env.unset(key);
      }
      env.write()?;
    }
    Command::Keys => {
      for key in env.keys() {
        println!("{key}");
      }
    }
    Command::Show {
      format,
      escape_newlines,
    } => {
      env.set_escape_newlines(escape_newlines);
      let rendered = match format {
        Format::Plain => env.envfile_string(),
        Format::Export => env.exportfile_string(),
      };
      if !rendered.is_empty() {
        println!("{rendered}");
      }
    }
    Command::Bundle => env.export_bundle(std::io::stdout().lock())?,
  }

  Ok(ExitCode::SUCCESS)
}
