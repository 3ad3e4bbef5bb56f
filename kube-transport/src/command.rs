//! Shell command construction.
//!
//! Every command the remote file layer sends into a container is built here,
//! and every path or user name interpolated into one goes through
//! [`shell_escape`] (or [`escape_within_single_quotes`] when the value lands
//! inside an existing single-quoted word).  No other module formats shell
//! text around caller-supplied strings.

use base64::Engine;

/// `stat` format: size, raw hex mode, owner, uid, group, gid, atime, mtime,
/// SELinux context.  One field per line; the layout is shared with
/// [`crate::stat::parse`].
pub const STAT_FORMAT: &str = "%s\n%f\n%U\n%u\n%G\n%g\n%X\n%Y\n%C";

/// Probe used before writing file content.
pub const BASE64_PROBE: &str = "base64 --help";

// ---------------------------------------------------------------------------
// Quoting
// ---------------------------------------------------------------------------

fn is_shell_safe(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | ',' | ':' | '+' | '/' | '@')
}

/// Quote `s` as a single POSIX shell word.
///
/// Words made only of unambiguous characters are returned unchanged, so
/// ordinary paths read naturally in the generated commands; anything else is
/// wrapped in single quotes with embedded quotes spelled `'\''`.
pub fn shell_escape(s: &str) -> String {
    if s.is_empty() {
        return "''".into();
    }
    if s.chars().all(is_shell_safe) {
        return s.into();
    }
    format!("'{}'", escape_within_single_quotes(s))
}

/// Escape `s` for embedding inside a word that is already single-quoted.
pub fn escape_within_single_quotes(s: &str) -> String {
    s.replace('\'', "'\\''")
}

// ---------------------------------------------------------------------------
// File commands
// ---------------------------------------------------------------------------

/// Existence test.  Without `follow_symlink` a dangling link still counts.
pub fn exists(path: &str, follow_symlink: bool) -> String {
    let p = shell_escape(path);
    if follow_symlink {
        format!("test -e {p}")
    } else {
        format!("test -e {p} || test -L {p}")
    }
}

/// `stat` invocation printing [`STAT_FORMAT`].  Stderr is discarded; callers
/// ignore the exit status because platforms without SELinux exit nonzero
/// while still printing every other field.
pub fn stat(path: &str, follow_symlink: bool) -> String {
    let deref = if follow_symlink { " -L" } else { "" };
    format!(
        "stat{deref} -c '{STAT_FORMAT}' {} 2>/dev/null",
        shell_escape(path)
    )
}

/// One-hop symlink target.
pub fn readlink(path: &str) -> String {
    format!("readlink {}", shell_escape(path))
}

/// Fully dereferenced symlink target, without trailing newline.
pub fn readlink_canonical(path: &str) -> String {
    format!("readlink -n {} -f", shell_escape(path))
}

/// Mount table lookup for `path` as a mount point.
pub fn mount_lookup(path: &str) -> String {
    format!(
        "mount | grep -- ' on {} '",
        escape_within_single_quotes(path)
    )
}

/// Content read that exits zero even when `path` is unreadable.
pub fn read_content(path: &str) -> String {
    format!("cat {} || echo -n", shell_escape(path))
}

/// Replace the content of `path` with `content`, shipped base64-encoded.
pub fn write_content(path: &str, content: &[u8]) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(content);
    format!(
        "echo '{encoded}' | base64 --decode > {}",
        shell_escape(path)
    )
}

// ---------------------------------------------------------------------------
// Resource check commands
// ---------------------------------------------------------------------------

/// Run `test -<flag> <path>` as `user`.
pub fn test_as_user(flag: char, user: &str, path: &str) -> String {
    let inner = format!("test -{flag} {}", shell_escape(path));
    format!(
        "su -s /bin/sh -c {} {}",
        shell_escape(&inner),
        shell_escape(user)
    )
}

/// Check whether `utility` resolves to a runnable command.
pub fn probe_utility(utility: &str) -> String {
    let inner = format!("type {}", shell_escape(utility));
    format!("sh -c {}", shell_escape(&inner))
}

/// List ext2-style attributes of `path`.
pub fn lsattr(utility: &str, path: &str) -> String {
    format!("{} {}", shell_escape(utility), shell_escape(path))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // -- Quoting -------------------------------------------------------------

    #[test]
    fn shell_escape_plain_path_is_unchanged() {
        assert_eq!(shell_escape("/etc/config"), "/etc/config");
        assert_eq!(shell_escape("/var/lib/app-1.2_x,y:z+w@host"), "/var/lib/app-1.2_x,y:z+w@host");
    }

    #[test]
    fn shell_escape_empty() {
        assert_eq!(shell_escape(""), "''");
    }

    #[test]
    fn shell_escape_with_spaces() {
        assert_eq!(shell_escape("/tmp/hello world"), "'/tmp/hello world'");
    }

    #[test]
    fn shell_escape_with_quotes() {
        assert_eq!(shell_escape("it's"), "'it'\\''s'");
    }

    #[test]
    fn shell_escape_neutralizes_metacharacters() {
        assert_eq!(shell_escape("/tmp/x; rm -rf /"), "'/tmp/x; rm -rf /'");
        assert_eq!(shell_escape("$(id)"), "'$(id)'");
        assert_eq!(shell_escape("a\nb"), "'a\nb'");
    }

    // -- File commands -------------------------------------------------------

    #[test]
    fn exists_following() {
        assert_eq!(exists("/mock/path", true), "test -e /mock/path");
    }

    #[test]
    fn exists_not_following_accepts_dangling_links() {
        assert_eq!(
            exists("/mock/path", false),
            "test -e /mock/path || test -L /mock/path"
        );
    }

    #[test]
    fn stat_command_layout() {
        assert_eq!(
            stat("/mock/path", false),
            "stat -c '%s\n%f\n%U\n%u\n%G\n%g\n%X\n%Y\n%C' /mock/path 2>/dev/null"
        );
        assert!(stat("/mock/path", true).starts_with("stat -L -c "));
    }

    #[test]
    fn stat_format_has_nine_fields() {
        assert_eq!(STAT_FORMAT.split('\n').count(), 9);
    }

    #[test]
    fn readlink_variants() {
        assert_eq!(readlink("/a/b/link"), "readlink /a/b/link");
        assert_eq!(readlink_canonical("/a/b/link"), "readlink -n /a/b/link -f");
    }

    #[test]
    fn mount_lookup_plain() {
        assert_eq!(
            mount_lookup("/mock/path"),
            "mount | grep -- ' on /mock/path '"
        );
    }

    #[test]
    fn mount_lookup_escapes_quotes() {
        assert_eq!(
            mount_lookup("/mnt/it's"),
            "mount | grep -- ' on /mnt/it'\\''s '"
        );
    }

    #[test]
    fn read_content_falls_back_to_empty() {
        assert_eq!(read_content("/mock/path"), "cat /mock/path || echo -n");
    }

    #[test]
    fn write_content_encodes_base64() {
        assert_eq!(
            write_content("/mock/path", b"New file content"),
            "echo 'TmV3IGZpbGUgY29udGVudA==' | base64 --decode > /mock/path"
        );
    }

    #[test]
    fn write_content_quotes_path() {
        assert_eq!(
            write_content("/tmp/a b", b""),
            "echo '' | base64 --decode > '/tmp/a b'"
        );
    }

    // -- Resource commands ---------------------------------------------------

    #[test]
    fn test_as_user_command() {
        assert_eq!(
            test_as_user('r', "nobody", "/etc/shadow"),
            "su -s /bin/sh -c 'test -r /etc/shadow' nobody"
        );
    }

    #[test]
    fn test_as_user_nested_quoting() {
        assert_eq!(
            test_as_user('w', "app", "/tmp/a b"),
            "su -s /bin/sh -c 'test -w '\\''/tmp/a b'\\''' app"
        );
    }

    #[test]
    fn probe_and_lsattr_commands() {
        assert_eq!(probe_utility("/usr/bin/lsattr"), "sh -c 'type /usr/bin/lsattr'");
        assert_eq!(lsattr("lsattr", "/etc/hosts"), "lsattr /etc/hosts");
    }
}
