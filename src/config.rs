use clap::Parser;
use log::debug;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::RunError;

pub const DEFAULT_DRIVER: &str = "mysql";
pub const DEFAULT_DSN: &str = "root@tcp(127.0.0.1:12830)/customers?charset=utf8";
pub const DEFAULT_QUERY: &str = "call template.foo";

/// Run one stored-procedure call and print its single text value.
#[derive(Debug, Parser)]
#[command(name = "proc-runner", version)]
pub struct Args {
    /// Statement to execute, e.g. "call template.foo"
    #[arg(value_name = "QUERY", env = "PROC_RUNNER_QUERY")]
    pub query: Option<String>,

    /// Backend used to open the connection
    #[arg(long, value_name = "NAME", env = "PROC_RUNNER_DRIVER")]
    pub driver: Option<String>,

    /// Connection descriptor, either `user[:pass]@tcp(host:port)/db?charset=utf8`
    /// or a `mysql://` URL
    #[arg(long, value_name = "DESCRIPTOR", env = "PROC_RUNNER_DSN")]
    pub dsn: Option<String>,

    /// Configuration file (defaults to ~/.config/proc-runner/config.toml)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub driver: Option<String>,
    pub dsn: Option<String>,
    pub query: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub driver: String,
    pub dsn: String,
    pub query: String,
}

impl Settings {
    /// Command line wins over the file, the file wins over built-in defaults.
    pub fn resolve(args: Args, file: Option<FileConfig>) -> Result<Self, RunError> {
        let file = file.unwrap_or_default();

        let driver = args
            .driver
            .or(file.driver)
            .unwrap_or_else(|| DEFAULT_DRIVER.to_string());
        let dsn = args.dsn.or(file.dsn).unwrap_or_else(|| DEFAULT_DSN.to_string());
        let query = args
            .query
            .or(file.query)
            .unwrap_or_else(|| DEFAULT_QUERY.to_string());

        if query.trim().is_empty() {
            return Err(RunError::Config("query must not be empty".into()));
        }
        if driver.trim().is_empty() {
            return Err(RunError::Config("driver must not be empty".into()));
        }

        Ok(Settings { driver, dsn, query })
    }
}

/// Default config file location, or `None` when `HOME` is unset.
pub fn config_path() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| config_path_under(Path::new(&home)))
}

fn config_path_under(home: &Path) -> PathBuf {
    home.join(".config").join("proc-runner").join("config.toml")
}

/// Reads a config file. A missing file is only an error when `required` is set.
pub fn load_file(path: &Path, required: bool) -> Result<Option<FileConfig>, RunError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if !required && e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(RunError::Config(format!(
                "Failed to read config file {}: {e}",
                path.display()
            )))
        }
    };
    parse(&content)
        .map(Some)
        .map_err(|e| RunError::Config(format!("Failed to parse {}: {e}", path.display())))
}

fn parse(content: &str) -> Result<FileConfig, toml::de::Error> {
    toml::from_str(content)
}

/// Loads the file layer selected by `args` and merges it with the command line.
pub fn load(args: Args) -> Result<Settings, RunError> {
    let file = file_layer(args.config.as_deref(), config_path())?;
    Settings::resolve(args, file)
}

fn file_layer(
    explicit: Option<&Path>,
    default: Option<PathBuf>,
) -> Result<Option<FileConfig>, RunError> {
    match (explicit, default) {
        (Some(path), _) => load_file(path, true),
        (None, Some(path)) => load_file(&path, false),
        (None, None) => {
            debug!("HOME is not set; skipping the config file");
            Ok(None)
        }
    }
}
