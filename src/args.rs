//! These structs provide the CLI interface for the konstruktor CLI.

use clap::{Parser, Subcommand};
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::error;
use tracing_subscriber::filter::LevelFilter;

/// konstruktor: the admin backend of the Konstruktor site.
///
/// Project cashout entries are kept in month blocks inside a Google spreadsheet, one tab per
/// project. This program serves a JSON API that writes new entries into the right block, lists
/// and summarizes them, manages project metadata and copies the spreadsheet to Google Drive for
/// backups.
///
/// You will need an OAuth client for a Google Cloud project with the Sheets and Drive APIs
/// enabled, and a refresh token for the account that owns the spreadsheet.
#[derive(Debug, Parser, Clone)]
pub struct Args {
    #[clap(flatten)]
    common: Common,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    pub fn new(common: Common, command: Command) -> Self {
        Self { common, command }
    }

    pub fn common(&self) -> &Common {
        &self.common
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create the home directory and initialize the configuration files.
    ///
    /// This writes `config.json`, moves the OAuth client secret into `.secrets` and generates the
    /// admin credentials in `.secrets/admin.json`. The generated password is printed once.
    ///
    /// Afterwards, put the OAuth token JSON with a refresh token at `.secrets/token.json`.
    Init(InitArgs),
    /// Run the HTTP API.
    Serve(ServeArgs),
    /// Copy the spreadsheet into the configured Google Drive backup folder.
    Backup(BackupArgs),
}

/// Arguments common to all subcommands.
#[derive(Debug, Parser, Clone)]
pub struct Common {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG.
    #[arg(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// The directory where konstruktor configuration and secrets are held. Defaults to
    /// ~/konstruktor
    #[arg(long, env = "KONSTRUKTOR_HOME", default_value_t = default_konstruktor_home())]
    konstruktor_home: DisplayPath,
}

impl Common {
    pub fn new(log_level: LevelFilter, konstruktor_home: PathBuf) -> Self {
        Self {
            log_level,
            konstruktor_home: konstruktor_home.into(),
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn konstruktor_home(&self) -> &DisplayPath {
        &self.konstruktor_home
    }
}

/// (Not shown): Args for the `konstruktor init` command.
#[derive(Debug, Parser, Clone)]
pub struct InitArgs {
    /// The URL of the Google sheet. It looks like this:
    /// https://docs.google.com/spreadsheets/d/1a7Km9FxQwRbPt82JvN4LzYpH5OcGnWsT6iDuE3VhMjX
    #[arg(long)]
    sheet_url: String,

    /// The path to your downloaded OAuth client credentials. This file will be moved to the
    /// secrets location in the home directory.
    #[arg(long)]
    client_secret: PathBuf,
}

impl InitArgs {
    pub fn new(sheet_url: impl Into<String>, client_secret: impl Into<PathBuf>) -> Self {
        Self {
            sheet_url: sheet_url.into(),
            client_secret: client_secret.into(),
        }
    }

    pub fn sheet_url(&self) -> &str {
        &self.sheet_url
    }

    pub fn client_secret(&self) -> &Path {
        &self.client_secret
    }
}

/// (Not shown): Args for the `konstruktor serve` command.
#[derive(Debug, Parser, Clone)]
pub struct ServeArgs {
    /// The port to listen on. Defaults to `port` in config.json.
    #[arg(long)]
    port: Option<u16>,
}

impl ServeArgs {
    pub fn new(port: Option<u16>) -> Self {
        Self { port }
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }
}

/// (Not shown): Args for the `konstruktor backup` command.
#[derive(Debug, Parser, Clone)]
pub struct BackupArgs {
    /// The first part of the copy's name. Defaults to "backup".
    #[arg(long)]
    name_prefix: Option<String>,
}

impl BackupArgs {
    pub fn new(name_prefix: Option<String>) -> Self {
        Self { name_prefix }
    }

    pub fn name_prefix(&self) -> Option<&str> {
        self.name_prefix.as_deref()
    }
}

fn default_konstruktor_home() -> DisplayPath {
    DisplayPath(match dirs::home_dir() {
        Some(home) => home.join("konstruktor"),
        None => {
            error!(
                "There was an error when trying to get your home directory. You can get around \
                this by providing --konstruktor-home or KONSTRUKTOR_HOME instead of relying on \
                the default home directory.",
            );
            PathBuf::from("konstruktor")
        }
    })
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DisplayPath(PathBuf);

impl From<PathBuf> for DisplayPath {
    fn from(value: PathBuf) -> Self {
        DisplayPath(value)
    }
}

impl Deref for DisplayPath {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<Path> for DisplayPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl Display for DisplayPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_string_lossy())
    }
}

impl FromStr for DisplayPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(PathBuf::from(s)))
    }
}

impl DisplayPath {
    pub fn path(&self) -> &Path {
        &self.0
    }
}
