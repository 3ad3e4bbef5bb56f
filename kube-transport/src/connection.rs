//! Connection to a Kubernetes cluster.
//!
//! A [`Connection`] owns the cluster client, the command executor and the
//! default [`TargetSelector`].  Its API is synchronous: it owns a tokio
//! runtime and blocks on the async executor for each command, so it must not
//! be driven from inside another tokio runtime.

use std::sync::Arc;

use crate::backend::exec::{DEFAULT_NAMESPACE, KubectlExecutor};
use crate::backend::runner::{CommandRunner, LocalRunner};
use crate::backend::{CommandExecutor, CommandResult};
use crate::client::{ClusterClient, KubectlClusterClient};
use crate::config::{self, LoadedKubeconfig, TransportOptions};
use crate::errors::{TransportError, TransportResult};
use crate::file::LinuxFile;
use crate::platform::Platform;
use crate::selector::{SelectorOverride, TargetSelector};

const URI_SCHEME: &str = "kubernetes://";

pub struct Connection {
    runtime: tokio::runtime::Runtime,
    client: Box<dyn ClusterClient>,
    executor: Arc<dyn CommandExecutor>,
    selector: TargetSelector,
}

impl Connection {
    /// Load the kubeconfig named by `options`, build the client and executor
    /// and verify the API server is reachable.
    ///
    /// No connection is returned unless every step succeeds.
    pub fn new(options: &TransportOptions) -> TransportResult<Self> {
        let kubeconfig = Self::configure(options)?;
        let selector = options.selector()?;

        let runner: Arc<dyn CommandRunner> = Arc::new(LocalRunner);
        let executor = KubectlExecutor::new(Arc::clone(&runner))
            .with_kubeconfig(&kubeconfig.path)
            .with_default_namespace(
                kubeconfig
                    .namespace
                    .clone()
                    .unwrap_or_else(|| DEFAULT_NAMESPACE.into()),
            );
        let client = KubectlClusterClient::new(kubeconfig, runner);

        let conn = Self::from_parts(Box::new(client), Arc::new(executor), selector)?;
        conn.connect()?;
        Ok(conn)
    }

    /// Validate and load the configuration source named by `options`.
    pub fn configure(options: &TransportOptions) -> TransportResult<LoadedKubeconfig> {
        config::load_kubeconfig(options.kubeconfig.as_deref())
    }

    /// Assemble a connection from already-built collaborators.  Does not
    /// contact the cluster; call [`Connection::connect`] for that.
    pub fn from_parts(
        client: Box<dyn ClusterClient>,
        executor: Arc<dyn CommandExecutor>,
        selector: TargetSelector,
    ) -> TransportResult<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| TransportError::Internal(format!("failed to create tokio runtime: {e}")))?;

        Ok(Self {
            runtime,
            client,
            executor,
            selector,
        })
    }

    /// Prime the client's API cache.  A failure is logged and returned; the
    /// connection must then be discarded.
    pub fn connect(&self) -> TransportResult<()> {
        self.runtime
            .block_on(self.client.prime_capabilities())
            .inspect_err(|e| log::error!("{e}"))
    }

    pub fn client(&self) -> &dyn ClusterClient {
        self.client.as_ref()
    }

    pub fn selector(&self) -> &TargetSelector {
        &self.selector
    }

    pub fn platform(&self) -> Platform {
        Platform::kubernetes()
    }

    pub fn uri(&self) -> String {
        format!("{URI_SCHEME}{}", self.unique_identifier())
    }

    /// The server address without its `http://` / `https://` scheme, or
    /// `"default"` when nothing is left.
    pub fn unique_identifier(&self) -> String {
        let server = self.client.server_address();
        let host = server
            .strip_prefix("https://")
            .or_else(|| server.strip_prefix("http://"))
            .unwrap_or(&server);
        if host.is_empty() {
            "default".into()
        } else {
            host.to_string()
        }
    }

    /// Run `command` in the default target with `overrides` applied.
    pub fn run_command(&self, command: &str, overrides: &SelectorOverride) -> CommandResult {
        let target = self.selector.merged(overrides);
        self.execute(command, &target)
    }

    /// Run `command` in exactly `target`.  A command that cannot be
    /// dispatched comes back as a failed result rather than an error.
    pub(crate) fn execute(&self, command: &str, target: &TargetSelector) -> CommandResult {
        log::debug!("{target}: {command}");
        match self.runtime.block_on(self.executor.run(command, target)) {
            Ok(result) => {
                log::trace!(
                    "{target}: exit {} ({} bytes stdout, {} bytes stderr)",
                    result.exit_status(),
                    result.stdout().len(),
                    result.stderr().len()
                );
                result
            }
            Err(e) => {
                log::warn!("{target}: could not run command: {e}");
                CommandResult::failed(e.to_string())
            }
        }
    }

    /// A symlink-following remote file for `path` in the default target
    /// with `overrides` applied.
    pub fn open_file(&self, path: &str, overrides: &SelectorOverride) -> LinuxFile<'_> {
        self.open_file_with(path, true, overrides)
    }

    pub fn open_file_with(
        &self,
        path: &str,
        follow_symlink: bool,
        overrides: &SelectorOverride,
    ) -> LinuxFile<'_> {
        LinuxFile::new(self, path, self.selector.merged(overrides), follow_symlink)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
