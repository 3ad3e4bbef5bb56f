//! Parser for the output of [`crate::command::stat`].
//!
//! The stat command prints nine fields, one per line:
//!
//! ```text
//! 0 size   1 raw mode (hex)   2 owner   3 uid   4 group   5 gid
//! 6 atime (unused)   7 mtime   8 SELinux context
//! ```
//!
//! Anything other than exactly nine fields yields no metadata at all; a
//! half-filled record is never produced.

use std::fmt;

/// Number of fields printed by the stat command.
pub const STAT_FIELDS: usize = 9;

const S_IFMT: u32 = 0o170000;
const S_IFSOCK: u32 = 0o140000;
const S_IFLNK: u32 = 0o120000;
const S_IFREG: u32 = 0o100000;
const S_IFBLK: u32 = 0o060000;
const S_IFDIR: u32 = 0o040000;
const S_IFCHR: u32 = 0o020000;
const S_IFIFO: u32 = 0o010000;

/// Permission, setuid/setgid and sticky bits.
const MODE_MASK: u32 = 0o7777;

const S_ISUID: u32 = 0o4000;
const S_ISGID: u32 = 0o2000;
const S_ISVTX: u32 = 0o1000;

/// SELinux context values meaning "no label".
const SELINUX_SENTINELS: &[&str] = &["?", "(null)", "C"];

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileType {
    File,
    Directory,
    Symlink,
    Socket,
    Pipe,
    BlockDevice,
    CharDevice,
    #[default]
    Unknown,
}

impl FileType {
    /// Decode the type from a raw `st_mode` word.
    pub fn from_mode(raw: u32) -> Self {
        match raw & S_IFMT {
            S_IFSOCK => FileType::Socket,
            S_IFLNK => FileType::Symlink,
            S_IFREG => FileType::File,
            S_IFBLK => FileType::BlockDevice,
            S_IFDIR => FileType::Directory,
            S_IFCHR => FileType::CharDevice,
            S_IFIFO => FileType::Pipe,
            _ => FileType::Unknown,
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FileType::File => "file",
            FileType::Directory => "directory",
            FileType::Symlink => "symlink",
            FileType::Socket => "socket",
            FileType::Pipe => "pipe",
            FileType::BlockDevice => "block_device",
            FileType::CharDevice => "character_device",
            FileType::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Metadata for a remote path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetadata {
    pub file_type: FileType,
    /// Low twelve bits of the mode word.
    pub mode: u32,
    pub owner: String,
    pub uid: u32,
    pub group: String,
    pub gid: u32,
    /// Modification time, seconds since the epoch.
    pub mtime: i64,
    pub size: u64,
    pub selinux_label: Option<String>,
}

impl FileMetadata {
    pub fn is_setuid(&self) -> bool {
        self.mode & S_ISUID != 0
    }

    pub fn is_setgid(&self) -> bool {
        self.mode & S_ISGID != 0
    }

    pub fn is_sticky(&self) -> bool {
        self.mode & S_ISVTX != 0
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse raw stat output.  Returns `None` when the output does not have
/// exactly [`STAT_FIELDS`] fields or a numeric field does not parse.
pub fn parse(stdout: &str) -> Option<FileMetadata> {
    // stat terminates its output with one newline; an empty last field
    // before it is still a field.
    let fields: Vec<&str> = stdout
        .strip_suffix('\n')
        .unwrap_or(stdout)
        .split('\n')
        .collect();

    if fields.len() != STAT_FIELDS {
        log::warn!(
            "stat produced {} fields instead of {STAT_FIELDS}; metadata unavailable",
            fields.len()
        );
        return None;
    }

    let fields: Vec<&str> = fields.iter().map(|f| f.trim_end_matches('\r')).collect();

    let size = fields[0].trim().parse::<u64>().ok()?;
    let raw_mode = u32::from_str_radix(fields[1].trim(), 16).ok()?;
    let uid = fields[3].trim().parse::<u32>().ok()?;
    let gid = fields[5].trim().parse::<u32>().ok()?;
    let mtime = fields[7].trim().parse::<i64>().ok()?;

    let selinux = fields[8].trim();
    let selinux_label = (!selinux.is_empty() && !SELINUX_SENTINELS.contains(&selinux))
        .then(|| selinux.to_string());

    Some(FileMetadata {
        file_type: FileType::from_mode(raw_mode),
        mode: raw_mode & MODE_MASK,
        owner: fields[2].to_string(),
        uid,
        group: fields[4].to_string(),
        gid,
        mtime,
        size,
        selinux_label,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
