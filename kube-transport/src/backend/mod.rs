//! Command execution capability.
//!
//! A [`CommandExecutor`] runs one shell command against a
//! [`TargetSelector`] and reports what came back.  Nothing above this layer
//! knows how the command reaches the container; the only implementation
//! shipped here is [`exec::KubectlExecutor`], which shells out to
//! `kubectl exec` through a [`runner::CommandRunner`].

use async_trait::async_trait;

use crate::errors::TransportResult;
use crate::selector::TargetSelector;

pub mod exec;
pub mod runner;

// ---------------------------------------------------------------------------
// CommandResult
// ---------------------------------------------------------------------------

/// Output of one command execution.  Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    stdout: String,
    stderr: String,
    exit_status: i32,
}

impl CommandResult {
    pub fn new(stdout: impl Into<String>, stderr: impl Into<String>, exit_status: i32) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
            exit_status,
        }
    }

    /// A result standing in for a command that never ran.
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::new(String::new(), reason, -1)
    }

    pub fn stdout(&self) -> &str {
        &self.stdout
    }

    pub fn stderr(&self) -> &str {
        &self.stderr
    }

    pub fn exit_status(&self) -> i32 {
        self.exit_status
    }

    pub fn success(&self) -> bool {
        self.exit_status == 0
    }
}

// ---------------------------------------------------------------------------
// CommandExecutor trait
// ---------------------------------------------------------------------------

/// Runs a shell command inside a pod/container.
///
/// No caching and no retries: every call reaches the container.  An `Err`
/// means the command could not be dispatched at all; a command that ran and
/// failed is an `Ok` result with a nonzero exit status.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn run(&self, command: &str, target: &TargetSelector) -> TransportResult<CommandResult>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_result_has_negative_status() {
        let r = CommandResult::failed("kubectl: not found");
        assert_eq!(r.exit_status(), -1);
        assert_eq!(r.stdout(), "");
        assert_eq!(r.stderr(), "kubectl: not found");
        assert!(!r.success());
    }

    #[test]
    fn success_tracks_exit_status() {
        assert!(CommandResult::new("ok", "", 0).success());
        assert!(!CommandResult::new("", "", 1).success());
    }
}
