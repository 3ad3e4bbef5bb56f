//! Local process execution.
//!
//! The [`CommandRunner`] trait runs a program with arguments and collects its
//! output.  [`LocalRunner`] does that on the local machine via
//! [`tokio::process::Command`]; it is what carries `kubectl` invocations for
//! both the executor and the cluster client.

use async_trait::async_trait;
use std::process::Stdio;

use super::CommandResult;
use crate::errors::{TransportError, TransportResult};

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// A provider capable of executing programs and returning their output.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Execute `program` with `args` and collect stdout/stderr.
    async fn run(&self, program: &str, args: &[&str]) -> TransportResult<CommandResult>;
}

// ---------------------------------------------------------------------------
// LocalRunner — execute on the local machine
// ---------------------------------------------------------------------------

/// Executes programs on the local machine.
pub struct LocalRunner;

#[async_trait]
impl CommandRunner for LocalRunner {
    async fn run(&self, program: &str, args: &[&str]) -> TransportResult<CommandResult> {
        let output = tokio::process::Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| TransportError::Internal(format!("failed to execute `{program}`: {e}")))?;

        Ok(CommandResult::new(
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr),
            output.status.code().unwrap_or(-1),
        ))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
