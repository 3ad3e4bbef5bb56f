use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    /// Missing, unreadable or malformed kubeconfig.  The payload is the full
    /// user-facing diagnostic.
    #[error("{0}")]
    Configuration(String),

    #[error("k8s: could not connect to {server}: {reason}")]
    TransportConnect { server: String, reason: String },

    #[error("remote: `{tool}` not found on {target}, cannot write file content")]
    ToolMissing { tool: String, target: String },

    #[error("invalid k8s target: {0}")]
    InvalidTarget(String),

    #[error("resource check failed: {0}")]
    ResourceFailed(String),

    #[error("k8s: {0}")]
    Internal(String),
}

impl TransportError {
    /// Build a connect error from a failed `kubectl` call against the API
    /// server, keeping the most telling line of its diagnostic.
    pub fn from_kubectl(server: &str, err: impl std::fmt::Display) -> Self {
        let msg = err.to_string();
        let lines: Vec<&str> = msg.lines().map(str::trim).filter(|l| !l.is_empty()).collect();

        let reason = lines
            .iter()
            .find(|l| {
                l.contains("connection refused")
                    || l.contains("i/o timeout")
                    || l.contains("no such host")
                    || l.contains("Unable to connect")
            })
            .or_else(|| lines.first())
            .map(|l| l.to_string())
            .unwrap_or_else(|| "kubectl exited with an error".into());

        TransportError::TransportConnect {
            server: server.to_string(),
            reason,
        }
    }

    /// Process exit code for this error class, used by `kube-inspect`.
    pub fn exit_code(&self) -> i32 {
        match self {
            TransportError::Configuration(_) | TransportError::InvalidTarget(_) => 2,
            TransportError::TransportConnect { .. } => 3,
            _ => 1,
        }
    }
}

pub type TransportResult<T> = Result<T, TransportError>;
