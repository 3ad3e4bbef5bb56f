//! Target selectors and target URI parsing.
//!
//! A [`TargetSelector`] names the pod, container and namespace a command runs
//! in.  Targets can also be written as URIs:
//!
//! ```text
//! k8s://<namespace>/<pod>[/<container>]
//! kubernetes://<namespace>/<pod>[/<container>]
//! ```
//!
//! The namespace is left unset on the selector when absent; the default
//! namespace is applied by the executor, not here.

use crate::errors::{TransportError, TransportResult};
use std::fmt;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Where a command executes inside the cluster.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TargetSelector {
    pod: String,
    pub container: Option<String>,
    pub namespace: Option<String>,
}

/// Per-field overrides applied on top of a connection's default selector.
///
/// Unset fields keep the default's value; the override never replaces the
/// whole selector.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectorOverride {
    pub pod: Option<String>,
    pub container: Option<String>,
    pub namespace: Option<String>,
}

/// A parsed `k8s://` target URI.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetUri {
    pub namespace: Option<String>,
    pub pod: Option<String>,
    pub container: Option<String>,
}

// ---------------------------------------------------------------------------
// TargetSelector
// ---------------------------------------------------------------------------

impl TargetSelector {
    /// Create a selector for `pod`.  The pod name must be non-empty.
    pub fn new(pod: impl Into<String>) -> TransportResult<Self> {
        let pod = pod.into();
        if pod.trim().is_empty() {
            return Err(TransportError::InvalidTarget(
                "no pod specified; a target pod is required".into(),
            ));
        }
        Ok(Self {
            pod,
            container: None,
            namespace: None,
        })
    }

    pub fn with_container(mut self, container: impl Into<String>) -> Self {
        self.container = Some(container.into());
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn pod(&self) -> &str {
        &self.pod
    }

    /// Apply `overrides` field by field.  Empty overrides are ignored, so the
    /// pod invariant holds and `kubectl` never sees `-c ""` or `-n ""`.
    pub fn merged(&self, overrides: &SelectorOverride) -> Self {
        fn pick(over: &Option<String>, base: &Option<String>) -> Option<String> {
            over.clone()
                .filter(|v| !v.trim().is_empty())
                .or_else(|| base.clone())
        }

        let pod = match overrides.pod.as_deref() {
            Some(p) if !p.trim().is_empty() => p.to_string(),
            _ => self.pod.clone(),
        };
        Self {
            pod,
            container: pick(&overrides.container, &self.container),
            namespace: pick(&overrides.namespace, &self.namespace),
        }
    }
}

impl fmt::Display for TargetSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref ns) = self.namespace {
            write!(f, "{ns}/")?;
        }
        write!(f, "{}", self.pod)?;
        if let Some(ref c) = self.container {
            write!(f, "/{c}")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// SelectorOverride
// ---------------------------------------------------------------------------

impl SelectorOverride {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn pod(pod: impl Into<String>) -> Self {
        Self {
            pod: Some(pod.into()),
            ..Self::default()
        }
    }

    pub fn with_container(mut self, container: impl Into<String>) -> Self {
        self.container = Some(container.into());
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }
}

// ---------------------------------------------------------------------------
// Target URI parsing
// ---------------------------------------------------------------------------

/// Known URI schemes.
const KNOWN_SCHEMES: &[&str] = &["k8s://", "kubernetes://"];

/// Strip a known scheme (case-insensitively) from the front of `s`.
fn strip_scheme(s: &str) -> Option<&str> {
    KNOWN_SCHEMES.iter().find_map(|scheme| {
        s.get(..scheme.len())
            .filter(|prefix| prefix.eq_ignore_ascii_case(scheme))
            .map(|_| &s[scheme.len()..])
    })
}

/// Returns `true` if `s` starts with a known target scheme.
pub fn is_target_uri(s: &str) -> bool {
    strip_scheme(s).is_some()
}

/// Parse a `k8s://<namespace>/<pod>[/<container>]` URI.
///
/// Every segment is optional so that `k8s://` alone (all defaults) and
/// `k8s:///pod` (default namespace) are accepted; missing pieces are filled
/// in from explicit options.
pub fn parse_target(input: &str) -> TransportResult<TargetUri> {
    let rest = strip_scheme(input)
        .ok_or_else(|| TransportError::InvalidTarget(format!("unknown scheme in '{input}'")))?;

    let (host, path) = match rest.find('/') {
        Some(idx) => (&rest[..idx], &rest[idx + 1..]),
        None => (rest, ""),
    };

    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.len() > 2 {
        return Err(TransportError::InvalidTarget(format!(
            "too many path segments in '{input}', expected k8s://<namespace>/<pod>[/<container>]"
        )));
    }

    Ok(TargetUri {
        namespace: (!host.is_empty()).then(|| host.to_string()),
        pod: segments.first().map(|s| s.to_string()),
        container: segments.get(1).map(|s| s.to_string()),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
