//! Resource checks layered on [`Connection::run_command`].

use std::fmt;
use std::str::FromStr;

use crate::command;
use crate::connection::Connection;
use crate::errors::{TransportError, TransportResult};
use crate::selector::SelectorOverride;

/// Directories searched for helper utilities, in order; the bare name
/// (resolved through `$PATH`) is tried last.
const UTILITY_DIRS: &[&str] = &["/usr/sbin", "/sbin", "/usr/bin", "/bin"];

/// Kind of access tested by [`ResourceProbe::check_file_permission_by_user`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileAccess {
    Read,
    Write,
    Execute,
}

impl FileAccess {
    /// Flag passed to `test(1)`.
    pub fn flag(self) -> char {
        match self {
            FileAccess::Read => 'r',
            FileAccess::Write => 'w',
            FileAccess::Execute => 'x',
        }
    }
}

impl FromStr for FileAccess {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "read" => Ok(FileAccess::Read),
            "write" => Ok(FileAccess::Write),
            "execute" => Ok(FileAccess::Execute),
            other => Err(TransportError::ResourceFailed(format!(
                "invalid access type '{other}', expected read, write or execute"
            ))),
        }
    }
}

impl fmt::Display for FileAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FileAccess::Read => "read",
            FileAccess::Write => "write",
            FileAccess::Execute => "execute",
        })
    }
}

/// Runs resource checks in one target.
pub struct ResourceProbe<'c> {
    conn: &'c Connection,
    overrides: SelectorOverride,
}

impl<'c> ResourceProbe<'c> {
    pub fn new(conn: &'c Connection, overrides: SelectorOverride) -> Self {
        Self { conn, overrides }
    }

    /// Whether `user` has `access` to `path`, evaluated by `test` under `su`.
    pub fn check_file_permission_by_user(&self, access: FileAccess, user: &str, path: &str) -> bool {
        let cmd = command::test_as_user(access.flag(), user, path);
        self.conn.run_command(&cmd, &self.overrides).success()
    }

    /// First location of `utility` that the container can run.
    pub fn find_utility(&self, utility: &str) -> TransportResult<String> {
        let candidates = UTILITY_DIRS
            .iter()
            .map(|dir| format!("{dir}/{utility}"))
            .chain(std::iter::once(utility.to_string()));

        for candidate in candidates {
            let probe = self
                .conn
                .run_command(&command::probe_utility(&candidate), &self.overrides);
            if probe.success() {
                return Ok(candidate);
            }
        }

        Err(TransportError::ResourceFailed(format!(
            "could not find `{utility}`"
        )))
    }

    /// Whether `path` carries the ext2-style immutable attribute.
    pub fn is_immutable(&self, path: &str) -> TransportResult<bool> {
        let utility = self.find_utility("lsattr")?;
        let result = self
            .conn
            .run_command(&command::lsattr(&utility, path), &self.overrides);
        if !result.success() {
            return Err(TransportError::ResourceFailed(format!(
                "executing {utility} {path} failed: {}",
                result.stderr().trim()
            )));
        }
        Ok(has_immutable_flag(result.stdout()))
    }
}

/// `lsattr` prints `<flags> <name>`; the fifth flag column is `i`.
fn has_immutable_flag(lsattr_output: &str) -> bool {
    let line = lsattr_output.trim();
    let Some((flags, _name)) = line.split_once(char::is_whitespace) else {
        return false;
    };
    flags.chars().nth(4) == Some('i')
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
