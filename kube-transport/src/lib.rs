//! Treat a container in a Kubernetes pod as a remote host.
//!
//! A [`Connection`] runs shell commands inside a pod/container through
//! `kubectl exec`; [`LinuxFile`] builds file-system queries (existence,
//! stat, content, symlinks, mounts) on top of those commands by parsing
//! their text output.

pub mod backend;
pub mod client;
pub mod command;
pub mod config;
pub mod connection;
pub mod errors;
pub mod file;
pub mod platform;
pub mod resources;
pub mod selector;
pub mod stat;

#[cfg(test)]
pub(crate) mod test_support;

pub use backend::{CommandExecutor, CommandResult};
pub use client::ClusterClient;
pub use config::TransportOptions;
pub use connection::Connection;
pub use errors::{TransportError, TransportResult};
pub use file::{LinuxFile, RemoteFile};
pub use selector::{SelectorOverride, TargetSelector};
pub use stat::{FileMetadata, FileType};
