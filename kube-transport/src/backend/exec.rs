//! `kubectl exec` command executor.
//!
//! The [`KubectlExecutor`] implements [`CommandExecutor`] by wrapping every
//! command as:
//!
//! ```text
//! kubectl [--kubeconfig <path>] exec [--stdin] [--tty] <pod> -n <namespace> [-c <container>] -- sh -c <command>
//! ```
//!
//! The command string is handed to `sh -c` as a single argument, so pipes,
//! `||` and redirections built by [`crate::command`] are interpreted inside
//! the container and never by a local shell.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::runner::CommandRunner;
use super::{CommandExecutor, CommandResult};
use crate::errors::TransportResult;
use crate::selector::TargetSelector;

/// Namespace used when neither the selector nor the connection names one.
pub const DEFAULT_NAMESPACE: &str = "default";

// ---------------------------------------------------------------------------
// KubectlExecutor
// ---------------------------------------------------------------------------

pub struct KubectlExecutor {
    /// Runs the `kubectl` process.
    runner: Arc<dyn CommandRunner>,
    /// Passed as `--kubeconfig` when set.
    kubeconfig: Option<PathBuf>,
    /// Applied when a selector carries no namespace.
    default_namespace: String,
    /// Attach stdin (`--stdin`).
    stdin: bool,
    /// Allocate a TTY (`--tty`).
    tty: bool,
}

impl KubectlExecutor {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            runner,
            kubeconfig: None,
            default_namespace: DEFAULT_NAMESPACE.into(),
            stdin: false,
            tty: false,
        }
    }

    pub fn with_kubeconfig(mut self, path: impl AsRef<Path>) -> Self {
        self.kubeconfig = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn with_default_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.default_namespace = namespace.into();
        self
    }

    /// Toggle `--stdin` / `--tty`.  Both are off by default since the
    /// executor never feeds input and a TTY merges stderr into stdout.
    pub fn with_stdio(mut self, stdin: bool, tty: bool) -> Self {
        self.stdin = stdin;
        self.tty = tty;
        self
    }

    /// Namespace a command for `target` will run in.
    pub fn namespace_for<'a>(&'a self, target: &'a TargetSelector) -> &'a str {
        target
            .namespace
            .as_deref()
            .filter(|ns| !ns.is_empty())
            .unwrap_or(&self.default_namespace)
    }

    /// Arguments passed to `kubectl` (the program name itself excluded).
    fn build_args(&self, command: &str, target: &TargetSelector) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(ref kc) = self.kubeconfig {
            args.push("--kubeconfig".into());
            args.push(kc.to_string_lossy().into_owned());
        }
        args.push("exec".into());
        if self.stdin {
            args.push("--stdin".into());
        }
        if self.tty {
            args.push("--tty".into());
        }
        args.push(target.pod().into());
        args.push("-n".into());
        args.push(self.namespace_for(target).into());
        if let Some(ref c) = target.container {
            args.push("-c".into());
            args.push(c.clone());
        }
        args.push("--".into());
        args.push("sh".into());
        args.push("-c".into());
        args.push(command.into());
        args
    }
}

#[async_trait]
impl CommandExecutor for KubectlExecutor {
    async fn run(&self, command: &str, target: &TargetSelector) -> TransportResult<CommandResult> {
        let args = self.build_args(command, target);
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        self.runner.run("kubectl", &arg_refs).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::runner::LocalRunner;
    use std::sync::Mutex;

    /// Records every invocation and answers with a fixed result.
    struct RecordingRunner {
        calls: Mutex<Vec<(String, Vec<String>)>>,
    }

    #[async_trait]
    impl CommandRunner for RecordingRunner {
        async fn run(&self, program: &str, args: &[&str]) -> TransportResult<CommandResult> {
            self.calls.lock().unwrap().push((
                program.to_string(),
                args.iter().map(|a| a.to_string()).collect(),
            ));
            Ok(CommandResult::new("out", "", 0))
        }
    }

    fn target() -> TargetSelector {
        TargetSelector::new("mypod").unwrap()
    }

    // -- Argument construction ----------------------------------------------

    #[test]
    fn args_with_default_namespace() {
        let exec = KubectlExecutor::new(Arc::new(LocalRunner));
        assert_eq!(
            exec.build_args("ls /", &target()),
            ["exec", "mypod", "-n", "default", "--", "sh", "-c", "ls /"]
        );
    }

    #[test]
    fn args_with_namespace_and_container() {
        let exec = KubectlExecutor::new(Arc::new(LocalRunner));
        let t = target().with_namespace("prod").with_container("sidecar");
        assert_eq!(
            exec.build_args("id", &t),
            ["exec", "mypod", "-n", "prod", "-c", "sidecar", "--", "sh", "-c", "id"]
        );
    }

    #[test]
    fn args_with_kubeconfig_and_stdio() {
        let exec = KubectlExecutor::new(Arc::new(LocalRunner))
            .with_kubeconfig("/tmp/kc")
            .with_stdio(true, true);
        assert_eq!(
            exec.build_args("true", &target()),
            [
                "--kubeconfig",
                "/tmp/kc",
                "exec",
                "--stdin",
                "--tty",
                "mypod",
                "-n",
                "default",
                "--",
                "sh",
                "-c",
                "true"
            ]
        );
    }

    #[test]
    fn configured_default_namespace_applies() {
        let exec = KubectlExecutor::new(Arc::new(LocalRunner)).with_default_namespace("team-a");
        assert_eq!(exec.namespace_for(&target()), "team-a");
        let explicit = target().with_namespace("prod");
        assert_eq!(exec.namespace_for(&explicit), "prod");
    }

    #[test]
    fn empty_namespace_falls_back_to_default() {
        let exec = KubectlExecutor::new(Arc::new(LocalRunner));
        let t = target().with_namespace("");
        assert_eq!(exec.namespace_for(&t), DEFAULT_NAMESPACE);
    }

    // -- Execution -----------------------------------------------------------

    #[tokio::test]
    async fn run_invokes_kubectl_with_command_as_single_argument() {
        let runner = Arc::new(RecordingRunner {
            calls: Mutex::new(Vec::new()),
        });
        let exec = KubectlExecutor::new(runner.clone());
        let result = exec
            .run("cat /etc/hosts || echo -n", &target())
            .await
            .unwrap();
        assert_eq!(result.stdout(), "out");

        let calls = runner.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "kubectl");
        assert_eq!(calls[0].1.last().unwrap(), "cat /etc/hosts || echo -n");
    }
}
