
use std::ffi::OsStr;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::str::FromStr;

use tracing::debug;

use super::error::{Error, Result};


/// External program together with the arguments placed before the ones
/// supplied by the caller, ex. `python3 -m pyglossary`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl ToolCommand {
    #[cfg(test)]
    pub fn new(program: &str, args: &[&str]) -> ToolCommand {
        ToolCommand {
            program: String::from(program),
            args: args.iter().map(|s| String::from(*s)).collect(),
        }
    }
}

impl FromStr for ToolCommand {
    type Err = Error;

    /// Splits a command line on whitespace. No shell quoting is understood.
    fn from_str(s: &str) -> Result<ToolCommand> {
        let mut parts = s.split_whitespace().map(String::from);
        let program = parts.next().ok_or(Error::EmptyCommand)?;
        Ok(ToolCommand {
            program,
            args: parts.collect(),
        })
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Execute command with additional arguments and wait until finished.
/// A non-zero exit status is an error.
pub fn command_wait<I, S>(cmd: &ToolCommand, extra: I) -> Result<()>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut command = Command::new(&cmd.program);
    command.args(&cmd.args).args(extra);
    debug!("running {:?}", command);

    let status = command.status().map_err(|source| Error::Spawn {
        program: cmd.program.clone(),
        source,
    })?;
    if !status.success() {
        return Err(Error::CommandFailed {
            program: cmd.to_string(),
            status,
        });
    }
    Ok(())
}

/// Returns the last path segment of the URL, query and fragment removed.
pub fn file_name_from_url(url: &str) -> &str {
    let url = url.split(&['?', '#'][..]).next().unwrap_or(url);
    url.rsplit('/').next().unwrap_or(url)
}

/// Replaces the extension of the file, `dict.idx` -> `dict.ifo`.
pub fn sibling_file(path: &Path, ext: &str) -> PathBuf {
    path.with_extension(ext)
}

/// Strips a known Stardict extension so that `out.ifo` and `out` name the same package.
pub fn stardict_base(path: &Path) -> PathBuf {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ifo") | Some("idx") | Some("dict") | Some("syn") | Some("stardict") => {
            path.with_extension("")
        }
        _ => path.to_path_buf(),
    }
}
