//! Remote file facade.
//!
//! A [`LinuxFile`] answers file-system questions about one path inside one
//! container purely by running shell commands through its [`Connection`]
//! and interpreting their output.  Each facet (existence, stat, content,
//! mount lookup, link targets) is computed on first access and cached for
//! the lifetime of the instance; build a new instance to observe changes.
//!
//! All commands address the path exactly as given.  With `follow_symlink`
//! set, `stat` dereferences links and [`RemoteFile::canonical_path`] reports
//! the link's final target.

use sha2::{Digest, Sha256};
use std::sync::OnceLock;

use crate::backend::CommandResult;
use crate::command;
use crate::connection::Connection;
use crate::errors::{TransportError, TransportResult};
use crate::selector::TargetSelector;
use crate::stat::{self, FileMetadata, FileType};

// ---------------------------------------------------------------------------
// RemoteFile trait
// ---------------------------------------------------------------------------

/// File-system queries answered by a remote shell.
pub trait RemoteFile {
    /// `true` iff the existence test exits zero.
    fn exists(&self) -> bool;

    /// Parsed stat output, or `None` when stat output was unusable.
    fn metadata(&self) -> Option<&FileMetadata>;

    /// File content, or `None` when the read evidently did not retrieve it.
    fn content(&self) -> Option<&str>;

    /// Replace the file content.  Fails only when the container has no
    /// base64 decoder; the write's own outcome is returned as its result.
    fn set_content(&mut self, content: &str) -> TransportResult<CommandResult>;

    /// `true` when the path shows up as a mount point.
    fn is_mounted(&self) -> bool;

    /// One-hop symlink target, or `None` when the path is not a symlink.
    fn link_target(&self) -> Option<&str>;

    /// The path, resolved to its final target when following a symlink.
    /// An empty string means the link could not be resolved (a cycle).
    fn canonical_path(&self) -> &str;
}

// ---------------------------------------------------------------------------
// LinuxFile
// ---------------------------------------------------------------------------

pub struct LinuxFile<'c> {
    conn: &'c Connection,
    path: String,
    selector: TargetSelector,
    follow_symlink: bool,

    content: OnceLock<Option<String>>,
    stat: OnceLock<Option<FileMetadata>>,
    exists: OnceLock<bool>,
    mounted: OnceLock<CommandResult>,
    resolved_path: OnceLock<String>,
    shallow_link: OnceLock<Option<String>>,
    source: OnceLock<Box<LinuxFile<'c>>>,
}

impl<'c> LinuxFile<'c> {
    pub fn new(
        conn: &'c Connection,
        path: impl Into<String>,
        selector: TargetSelector,
        follow_symlink: bool,
    ) -> Self {
        Self {
            conn,
            path: path.into(),
            selector,
            follow_symlink,
            content: OnceLock::new(),
            stat: OnceLock::new(),
            exists: OnceLock::new(),
            mounted: OnceLock::new(),
            resolved_path: OnceLock::new(),
            shallow_link: OnceLock::new(),
            source: OnceLock::new(),
        }
    }

    fn run(&self, cmd: &str) -> CommandResult {
        self.conn.execute(cmd, &self.selector)
    }

    pub fn selector(&self) -> &TargetSelector {
        &self.selector
    }

    pub fn follows_symlinks(&self) -> bool {
        self.follow_symlink
    }

    /// The path as given, before any symlink resolution.
    pub fn source_path(&self) -> &str {
        &self.path
    }

    /// Final path component.
    pub fn basename(&self) -> &str {
        let trimmed = self.path.trim_end_matches('/');
        if trimmed.is_empty() {
            return if self.path.is_empty() { "" } else { "/" };
        }
        trimmed.rsplit('/').next().unwrap_or(trimmed)
    }

    /// A non-following view of the same path, used to inspect the link
    /// itself.  Without `follow_symlink` this is `self`.
    pub fn source(&self) -> &LinuxFile<'c> {
        if !self.follow_symlink {
            return self;
        }
        self.source.get_or_init(|| {
            Box::new(LinuxFile::new(
                self.conn,
                self.path.clone(),
                self.selector.clone(),
                false,
            ))
        })
    }

    // -- Metadata accessors -------------------------------------------------

    pub fn file_type(&self) -> Option<FileType> {
        self.metadata().map(|m| m.file_type)
    }

    pub fn mode(&self) -> Option<u32> {
        self.metadata().map(|m| m.mode)
    }

    pub fn owner(&self) -> Option<&str> {
        self.metadata().map(|m| m.owner.as_str())
    }

    pub fn group(&self) -> Option<&str> {
        self.metadata().map(|m| m.group.as_str())
    }

    pub fn uid(&self) -> Option<u32> {
        self.metadata().map(|m| m.uid)
    }

    pub fn gid(&self) -> Option<u32> {
        self.metadata().map(|m| m.gid)
    }

    pub fn mtime(&self) -> Option<i64> {
        self.metadata().map(|m| m.mtime)
    }

    pub fn size(&self) -> Option<u64> {
        self.metadata().map(|m| m.size)
    }

    pub fn selinux_label(&self) -> Option<&str> {
        self.metadata().and_then(|m| m.selinux_label.as_deref())
    }

    // -- Predicates ----------------------------------------------------------

    pub fn is_file(&self) -> bool {
        self.file_type() == Some(FileType::File)
    }

    pub fn is_directory(&self) -> bool {
        self.file_type() == Some(FileType::Directory)
    }

    /// Whether the path itself (not its target) is a symlink.
    pub fn is_symlink(&self) -> bool {
        self.source().file_type() == Some(FileType::Symlink)
    }

    pub fn is_socket(&self) -> bool {
        self.file_type() == Some(FileType::Socket)
    }

    pub fn is_pipe(&self) -> bool {
        self.file_type() == Some(FileType::Pipe)
    }

    pub fn is_block_device(&self) -> bool {
        self.file_type() == Some(FileType::BlockDevice)
    }

    pub fn is_character_device(&self) -> bool {
        self.file_type() == Some(FileType::CharDevice)
    }

    pub fn is_setuid(&self) -> bool {
        self.metadata().is_some_and(FileMetadata::is_setuid)
    }

    pub fn is_setgid(&self) -> bool {
        self.metadata().is_some_and(FileMetadata::is_setgid)
    }

    pub fn is_sticky(&self) -> bool {
        self.metadata().is_some_and(FileMetadata::is_sticky)
    }

    pub fn is_mode(&self, mode: u32) -> bool {
        self.mode() == Some(mode)
    }

    pub fn is_owned_by(&self, owner: &str) -> bool {
        self.owner() == Some(owner)
    }

    pub fn is_grouped_into(&self, group: &str) -> bool {
        self.group() == Some(group)
    }

    pub fn is_linked_to(&self, target: &str) -> bool {
        self.link_path() == Some(target)
    }

    // -- Links ---------------------------------------------------------------

    /// The resolved target when the path is a symlink.
    pub fn link_path(&self) -> Option<&str> {
        if self.is_symlink() {
            Some(self.resolved_target())
        } else {
            None
        }
    }

    /// Immediate (one-hop) symlink target.
    pub fn shallow_link_path(&self) -> Option<&str> {
        if !self.is_symlink() {
            return None;
        }
        self.shallow_link
            .get_or_init(|| {
                let result = self.run(&command::readlink(&self.path));
                Some(result.stdout().trim_end_matches('\n').to_string())
            })
            .as_deref()
    }

    fn resolved_target(&self) -> &str {
        self.resolved_path.get_or_init(|| self.read_target_path())
    }

    /// Fully dereference the link.  Relative answers are taken relative to
    /// the directory holding the link; an empty answer (a cycle) stays empty.
    fn read_target_path(&self) -> String {
        let result = self.run(&command::readlink_canonical(&self.path));
        let target = result.stdout();
        if target.is_empty() {
            log::warn!(
                "{}: readlink returned nothing for {}, symlink cycle?",
                self.selector,
                self.path
            );
            return String::new();
        }
        if target.starts_with('/') {
            return target.to_string();
        }
        expand_relative(&self.path, target)
    }

    // -- Mounts --------------------------------------------------------------

    /// Raw result of the mount table lookup.
    pub fn mounted(&self) -> &CommandResult {
        self.mounted
            .get_or_init(|| self.run(&command::mount_lookup(&self.path)))
    }

    // -- Content -------------------------------------------------------------

    /// Hex SHA-256 of the content.
    pub fn sha256sum(&self) -> Option<String> {
        self.content()
            .map(|c| hex::encode(Sha256::digest(c.as_bytes())))
    }

    /// Decide what empty read output means.  Only a regular file that stat
    /// reports as zero bytes is genuinely empty; without usable stat output
    /// the content is treated as unavailable.
    fn interpret_content(&self, stdout: &str) -> Option<String> {
        if !stdout.is_empty() {
            return Some(stdout.to_string());
        }
        match self.metadata() {
            Some(md) if md.file_type == FileType::File && md.size == 0 => Some(String::new()),
            _ => None,
        }
    }
}

impl RemoteFile for LinuxFile<'_> {
    fn exists(&self) -> bool {
        *self.exists.get_or_init(|| {
            self.run(&command::exists(&self.path, self.follow_symlink))
                .success()
        })
    }

    fn metadata(&self) -> Option<&FileMetadata> {
        self.stat
            .get_or_init(|| {
                let result = self.run(&command::stat(&self.path, self.follow_symlink));
                stat::parse(result.stdout())
            })
            .as_ref()
    }

    fn content(&self) -> Option<&str> {
        self.content
            .get_or_init(|| {
                let result = self.run(&command::read_content(&self.path));
                self.interpret_content(result.stdout())
            })
            .as_deref()
    }

    fn set_content(&mut self, content: &str) -> TransportResult<CommandResult> {
        let probe = self.run(command::BASE64_PROBE);
        if !probe.success() {
            return Err(TransportError::ToolMissing {
                tool: "base64".into(),
                target: self.selector.to_string(),
            });
        }

        let result = self.run(&command::write_content(&self.path, content.as_bytes()));
        if result.success() {
            self.content = OnceLock::from(Some(content.to_string()));
        } else {
            log::warn!(
                "{}: writing {} exited with {}: {}",
                self.selector,
                self.path,
                result.exit_status(),
                result.stderr().trim()
            );
            self.content = OnceLock::new();
        }
        Ok(result)
    }

    fn is_mounted(&self) -> bool {
        !self.mounted().stdout().is_empty()
    }

    fn link_target(&self) -> Option<&str> {
        self.shallow_link_path()
    }

    fn canonical_path(&self) -> &str {
        if self.follow_symlink && self.is_symlink() {
            self.resolved_target()
        } else {
            &self.path
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Resolve `target` against the directory containing `link`, collapsing
/// `.` and `..` segments.
fn expand_relative(link: &str, target: &str) -> String {
    let absolute = link.starts_with('/');
    let mut parts: Vec<&str> = link.split('/').filter(|s| !s.is_empty()).collect();
    // Drop the link's own name.
    parts.pop();

    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            s => parts.push(s),
        }
    }

    let joined = parts.join("/");
    if absolute {
        format!("/{joined}")
    } else {
        joined
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
