//! Transport options and kubeconfig loading.
//!
//! Only the parts of a kubeconfig needed to identify the cluster are read:
//! the current context, the cluster it points at (for the server address)
//! and the context's namespace.  Credentials are left to `kubectl`.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::errors::{TransportError, TransportResult};
use crate::selector::{self, TargetSelector};

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Connection options.  `Default` takes the kubeconfig location from
/// `$KUBECONFIG`, falling back to `~/.kube/config`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportOptions {
    pub kubeconfig: Option<String>,
    pub pod: Option<String>,
    pub container: Option<String>,
    pub namespace: Option<String>,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            kubeconfig: Some(default_kubeconfig()),
            pod: None,
            container: None,
            namespace: None,
        }
    }
}

fn default_kubeconfig() -> String {
    std::env::var("KUBECONFIG")
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "~/.kube/config".into())
}

impl TransportOptions {
    /// Options from a `k8s://<namespace>/<pod>[/<container>]` target.
    pub fn from_target(uri: &str) -> TransportResult<Self> {
        let target = selector::parse_target(uri)?;
        Ok(Self {
            pod: target.pod,
            container: target.container,
            namespace: target.namespace,
            ..Self::default()
        })
    }

    /// The default selector described by these options.
    pub fn selector(&self) -> TransportResult<TargetSelector> {
        let mut sel = TargetSelector::new(self.pod.clone().unwrap_or_default())?;
        sel.container = self.container.clone().filter(|c| !c.is_empty());
        sel.namespace = self.namespace.clone().filter(|n| !n.is_empty());
        Ok(sel)
    }
}

// ---------------------------------------------------------------------------
// Kubeconfig model
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Kubeconfig {
    #[serde(default)]
    pub clusters: Vec<NamedCluster>,
    #[serde(default)]
    pub contexts: Vec<NamedContext>,
    #[serde(default)]
    pub users: Vec<NamedUser>,
    pub current_context: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NamedCluster {
    pub name: String,
    pub cluster: Cluster,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Cluster {
    #[serde(default)]
    pub server: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NamedContext {
    pub name: String,
    pub context: Context,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Context {
    pub cluster: String,
    pub user: Option<String>,
    pub namespace: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NamedUser {
    pub name: String,
}

/// A validated kubeconfig together with where it came from.
#[derive(Debug, Clone)]
pub struct LoadedKubeconfig {
    pub path: PathBuf,
    pub context: String,
    pub server: String,
    pub namespace: Option<String>,
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Expand a leading `~` to the home directory and anchor relative paths at
/// the current directory.
pub fn expand_path(path: &str) -> PathBuf {
    let expanded = match path.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => match dirs::home_dir() {
            Some(home) => home.join(rest.trim_start_matches('/')),
            None => PathBuf::from(path),
        },
        _ => PathBuf::from(path),
    };

    if expanded.is_relative() {
        if let Ok(cwd) = std::env::current_dir() {
            return cwd.join(expanded);
        }
    }
    expanded
}

/// Locate, read and validate the kubeconfig named by `source`.
pub fn load_kubeconfig(source: Option<&str>) -> TransportResult<LoadedKubeconfig> {
    let source = source.filter(|s| !s.trim().is_empty()).ok_or_else(|| {
        TransportError::Configuration(
            "No configuration source specified. Please provide a kubeconfig path.".into(),
        )
    })?;

    let path = expand_path(source);
    if !path.exists() {
        return Err(TransportError::Configuration(format!(
            "Configuration file not found at '{}'. Please check the path and try again.",
            path.display()
        )));
    }

    load_file(&path)
}

fn load_file(path: &Path) -> TransportResult<LoadedKubeconfig> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        TransportError::Configuration(format!(
            "Failed to load configuration file '{}': {e}",
            path.display()
        ))
    })?;

    let invalid = |detail: String| {
        TransportError::Configuration(format!(
            "Invalid configuration file '{}': {detail}",
            path.display()
        ))
    };

    if text.trim().is_empty() {
        return Err(invalid("file is empty".into()));
    }

    let value: serde_yaml::Value = serde_yaml::from_str(&text).map_err(|e| {
        TransportError::Configuration(format!(
            "Invalid syntax in configuration file '{}': {e}",
            path.display()
        ))
    })?;

    let config: Kubeconfig =
        serde_yaml::from_value(value).map_err(|e| invalid(e.to_string()))?;

    let context_name = config
        .current_context
        .clone()
        .filter(|c| !c.is_empty())
        .ok_or_else(|| invalid("current-context is not set".into()))?;

    let context = config
        .contexts
        .iter()
        .find(|c| c.name == context_name)
        .ok_or_else(|| invalid(format!("context '{context_name}' is not defined")))?;

    let cluster = config
        .clusters
        .iter()
        .find(|c| c.name == context.context.cluster)
        .ok_or_else(|| {
            invalid(format!(
                "cluster '{}' referenced by context '{context_name}' is not defined",
                context.context.cluster
            ))
        })?;

    if let Some(user) = context.context.user.as_deref().filter(|u| !u.is_empty()) {
        if !config.users.iter().any(|u| u.name == user) {
            return Err(invalid(format!(
                "user '{user}' referenced by context '{context_name}' is not defined"
            )));
        }
    }

    if cluster.cluster.server.trim().is_empty() {
        return Err(invalid(format!("cluster '{}' has no server", cluster.name)));
    }

    log::debug!(
        "loaded kubeconfig {} (context {context_name}, server {})",
        path.display(),
        cluster.cluster.server
    );

    Ok(LoadedKubeconfig {
        path: path.to_path_buf(),
        context: context_name.clone(),
        server: cluster.cluster.server.clone(),
        namespace: context.context.namespace.clone().filter(|n| !n.is_empty()),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
