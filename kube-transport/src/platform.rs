//! Platform identity reported for a Kubernetes connection.

/// Name under which the transport is registered.
pub const PLATFORM_NAME: &str = "k8s";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    pub name: &'static str,
    pub families: &'static [&'static str],
    pub release: &'static str,
}

impl Platform {
    pub fn kubernetes() -> Self {
        Self {
            name: PLATFORM_NAME,
            families: &["cloud"],
            release: env!("CARGO_PKG_VERSION"),
        }
    }
}
