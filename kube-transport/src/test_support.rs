//! Scripted collaborators for unit tests.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use crate::backend::{CommandExecutor, CommandResult};
use crate::client::ClusterClient;
use crate::connection::Connection;
use crate::errors::{TransportError, TransportResult};
use crate::selector::TargetSelector;

/// Answers commands from a fixed table and records every call.
pub struct ScriptedExecutor {
    rules: Mutex<Vec<(String, CommandResult)>>,
    calls: Mutex<Vec<(String, TargetSelector)>>,
    fail_dispatch: bool,
}

impl ScriptedExecutor {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            rules: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            fail_dispatch: false,
        })
    }

    /// An executor whose every dispatch fails, as if `kubectl` were missing.
    pub fn unreachable() -> Arc<Self> {
        Arc::new(Self {
            rules: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            fail_dispatch: true,
        })
    }

    pub fn on(self: Arc<Self>, command: &str, stdout: &str, exit_status: i32) -> Arc<Self> {
        self.rules
            .lock()
            .unwrap()
            .push((command.to_string(), CommandResult::new(stdout, "", exit_status)));
        self
    }

    pub fn on_with_stderr(
        self: Arc<Self>,
        command: &str,
        stdout: &str,
        stderr: &str,
        exit_status: i32,
    ) -> Arc<Self> {
        self.rules
            .lock()
            .unwrap()
            .push((command.to_string(), CommandResult::new(stdout, stderr, exit_status)));
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn commands(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(c, _)| c.clone()).collect()
    }

    pub fn targets(&self) -> Vec<TargetSelector> {
        self.calls.lock().unwrap().iter().map(|(_, t)| t.clone()).collect()
    }
}

#[async_trait]
impl CommandExecutor for ScriptedExecutor {
    async fn run(&self, command: &str, target: &TargetSelector) -> TransportResult<CommandResult> {
        self.calls
            .lock()
            .unwrap()
            .push((command.to_string(), target.clone()));
        if self.fail_dispatch {
            return Err(TransportError::Internal(
                "failed to execute `kubectl`: No such file or directory".into(),
            ));
        }
        let rules = self.rules.lock().unwrap();
        Ok(rules
            .iter()
            .find(|(c, _)| c == command)
            .map(|(_, r)| r.clone())
            .unwrap_or_else(|| CommandResult::new("", format!("unscripted: {command}"), 127)))
    }
}

/// A cluster client with a fixed server address.
pub struct StaticClient {
    pub server: String,
    pub reachable: bool,
}

#[async_trait]
impl ClusterClient for StaticClient {
    async fn prime_capabilities(&self) -> TransportResult<()> {
        if self.reachable {
            Ok(())
        } else {
            Err(TransportError::TransportConnect {
                server: self.server.clone(),
                reason: "connection refused".into(),
            })
        }
    }

    fn server_address(&self) -> String {
        self.server.clone()
    }
}

pub fn mock_selector() -> TargetSelector {
    TargetSelector::new("mock-pod")
        .unwrap()
        .with_namespace("mock-namespace")
        .with_container("mock-container")
}

/// A connection to `https://test-server` backed by `exec`.
pub fn connection_with(exec: Arc<ScriptedExecutor>) -> Connection {
    Connection::from_parts(
        Box::new(StaticClient {
            server: "https://test-server".into(),
            reachable: true,
        }),
        exec,
        mock_selector(),
    )
    .unwrap()
}
