//! Cluster client capability.
//!
//! The connection needs very little from the cluster API: a way to verify the
//! API server is reachable (priming the client's view of the served API
//! groups) and the server address it reports, from which the connection URI
//! is derived.

use async_trait::async_trait;
use std::sync::{Arc, OnceLock};

use crate::backend::runner::CommandRunner;
use crate::config::LoadedKubeconfig;
use crate::errors::{TransportError, TransportResult};

#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Contact the API server and cache what it serves.  Any failure here
    /// means the connection must not be used.
    async fn prime_capabilities(&self) -> TransportResult<()>;

    /// The server address as configured, scheme included.
    fn server_address(&self) -> String;
}

// ---------------------------------------------------------------------------
// KubectlClusterClient
// ---------------------------------------------------------------------------

/// A client described by a kubeconfig and reached through `kubectl`.
pub struct KubectlClusterClient {
    kubeconfig: LoadedKubeconfig,
    runner: Arc<dyn CommandRunner>,
    api_versions: OnceLock<Vec<String>>,
}

impl KubectlClusterClient {
    pub fn new(kubeconfig: LoadedKubeconfig, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            kubeconfig,
            runner,
            api_versions: OnceLock::new(),
        }
    }

    /// API group versions served by the cluster, once primed.
    pub fn api_versions(&self) -> Option<&[String]> {
        self.api_versions.get().map(Vec::as_slice)
    }
}

#[async_trait]
impl ClusterClient for KubectlClusterClient {
    async fn prime_capabilities(&self) -> TransportResult<()> {
        if self.api_versions.get().is_some() {
            return Ok(());
        }

        let path = self.kubeconfig.path.to_string_lossy().into_owned();
        let args = [
            "--kubeconfig",
            path.as_str(),
            "--context",
            self.kubeconfig.context.as_str(),
            "api-versions",
        ];
        log::debug!("priming API groups from {}", self.kubeconfig.server);

        let server = &self.kubeconfig.server;
        let result = self
            .runner
            .run("kubectl", &args)
            .await
            .map_err(|e| TransportError::TransportConnect {
                server: server.clone(),
                reason: e.to_string(),
            })?;

        if !result.success() {
            return Err(TransportError::from_kubectl(server, result.stderr()));
        }

        let versions: Vec<String> = result
            .stdout()
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect();
        log::trace!("{} API group versions served", versions.len());
        let _ = self.api_versions.set(versions);
        Ok(())
    }

    fn server_address(&self) -> String {
        self.kubeconfig.server.clone()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::CommandResult;
    use std::path::PathBuf;
    use std::sync::Mutex;

    struct FixedRunner {
        result: TransportResult<CommandResult>,
        calls: Mutex<Vec<Vec<String>>>,
    }

    impl FixedRunner {
        fn new(result: TransportResult<CommandResult>) -> Arc<Self> {
            Arc::new(Self {
                result,
                calls: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl CommandRunner for FixedRunner {
        async fn run(&self, _program: &str, args: &[&str]) -> TransportResult<CommandResult> {
            self.calls
                .lock()
                .unwrap()
                .push(args.iter().map(|a| a.to_string()).collect());
            match &self.result {
                Ok(r) => Ok(r.clone()),
                Err(e) => Err(TransportError::Internal(e.to_string())),
            }
        }
    }

    fn loaded() -> LoadedKubeconfig {
        LoadedKubeconfig {
            path: PathBuf::from("/home/me/.kube/config"),
            context: "minikube".into(),
            server: "https://10.0.0.5:6443".into(),
            namespace: None,
        }
    }

    fn block_on<F: std::future::Future>(f: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
            .block_on(f)
    }

    #[test]
    fn prime_caches_api_versions() {
        let runner = FixedRunner::new(Ok(CommandResult::new("apps/v1\nv1\n", "", 0)));
        let client = KubectlClusterClient::new(loaded(), runner.clone());
        block_on(client.prime_capabilities()).unwrap();
        block_on(client.prime_capabilities()).unwrap();

        assert_eq!(client.api_versions().unwrap(), ["apps/v1", "v1"]);
        let calls = runner.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0],
            [
                "--kubeconfig",
                "/home/me/.kube/config",
                "--context",
                "minikube",
                "api-versions"
            ]
        );
    }

    #[test]
    fn prime_nonzero_exit_is_connect_error() {
        let runner = FixedRunner::new(Ok(CommandResult::new(
            "",
            "Unable to connect to the server: dial tcp 10.0.0.5:6443: connect: connection refused",
            1,
        )));
        let client = KubectlClusterClient::new(loaded(), runner);
        let err = block_on(client.prime_capabilities()).unwrap_err();
        assert!(matches!(err, TransportError::TransportConnect { ref server, .. } if server == "https://10.0.0.5:6443"));
        assert!(client.api_versions().is_none());
    }

    #[test]
    fn prime_spawn_failure_is_connect_error() {
        let runner = FixedRunner::new(Err(TransportError::Internal(
            "failed to execute `kubectl`".into(),
        )));
        let client = KubectlClusterClient::new(loaded(), runner);
        let err = block_on(client.prime_capabilities()).unwrap_err();
        assert!(matches!(err, TransportError::TransportConnect { .. }));
    }

    #[test]
    fn server_address_comes_from_kubeconfig() {
        let runner = FixedRunner::new(Ok(CommandResult::new("", "", 0)));
        let client = KubectlClusterClient::new(loaded(), runner);
        assert_eq!(client.server_address(), "https://10.0.0.5:6443");
    }
}
