//! kube-inspect: inspect a container in a Kubernetes pod over `kubectl exec`
//!
//! The target is either a pod name or a `k8s://<namespace>/<pod>[/<container>]`
//! URI; `--namespace` and `--container` override what the URI says.
//!
//! Exit codes: 0 success, 1 the operation reported failure, 2 configuration
//! error, 3 the API server could not be reached.

use std::io::Write;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use kube_transport::selector::{self, SelectorOverride};
use kube_transport::{Connection, RemoteFile, TransportError, TransportOptions};

const EXIT_SUCCESS: u8 = 0;
const EXIT_FAILURE: u8 = 1;

/// Inspect a container in a Kubernetes pod
#[derive(Parser, Debug)]
#[command(name = "kube-inspect", version, about)]
struct Cli {
    /// Path to the kubeconfig file
    #[arg(long, env = "KUBECONFIG", default_value = "~/.kube/config")]
    kubeconfig: String,

    /// Namespace of the pod
    #[arg(short, long)]
    namespace: Option<String>,

    /// Container within the pod
    #[arg(short, long)]
    container: Option<String>,

    /// Pod name or k8s://<namespace>/<pod>[/<container>] URI
    target: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the connection URI
    Uri,
    /// Run a shell command in the container
    Exec {
        /// Command line, passed to `sh -c`
        command: String,
    },
    /// Print metadata for a path
    Stat {
        path: String,
        /// Describe the link itself instead of its target
        #[arg(long)]
        no_follow: bool,
    },
    /// Print the content of a file
    Cat { path: String },
    /// Exit 0 if a path exists
    Exists {
        path: String,
        /// Count dangling symlinks as existing
        #[arg(long)]
        no_follow: bool,
    },
    /// Print the resolved target of a symlink
    Readlink { path: String },
}

fn options(cli: &Cli) -> Result<TransportOptions, TransportError> {
    let mut opts = if selector::is_target_uri(&cli.target) {
        TransportOptions::from_target(&cli.target)?
    } else {
        TransportOptions {
            pod: Some(cli.target.clone()),
            ..TransportOptions::default()
        }
    };
    opts.kubeconfig = Some(cli.kubeconfig.clone());
    if cli.namespace.is_some() {
        opts.namespace = cli.namespace.clone();
    }
    if cli.container.is_some() {
        opts.container = cli.container.clone();
    }
    Ok(opts)
}

/// Flush what was printed and map the remote exit status onto ours.  Output
/// that cannot be written is a failure whatever the command returned.
fn exit_after_output(out: &mut impl Write, status: i32) -> u8 {
    if let Err(e) = out.flush() {
        eprintln!("kube-inspect: failed to write output: {e}");
        return EXIT_FAILURE;
    }
    u8::try_from(status).unwrap_or(EXIT_FAILURE)
}

fn run(cli: &Cli) -> Result<u8, TransportError> {
    let conn = Connection::new(&options(cli)?)?;
    let none = SelectorOverride::none();

    let code = match &cli.command {
        Command::Uri => {
            println!("{}", conn.uri());
            EXIT_SUCCESS
        }
        Command::Exec { command } => {
            let result = conn.run_command(command, &none);
            print!("{}", result.stdout());
            eprint!("{}", result.stderr());
            exit_after_output(&mut std::io::stdout(), result.exit_status())
        }
        Command::Stat { path, no_follow } => {
            let file = conn.open_file_with(path, !no_follow, &none);
            match file.metadata() {
                Some(md) => {
                    println!("path:    {}", file.canonical_path());
                    println!("type:    {}", md.file_type);
                    println!("mode:    {:04o}", md.mode);
                    println!("owner:   {} ({})", md.owner, md.uid);
                    println!("group:   {} ({})", md.group, md.gid);
                    println!("size:    {}", md.size);
                    println!("mtime:   {}", md.mtime);
                    if let Some(ref label) = md.selinux_label {
                        println!("selinux: {label}");
                    }
                    EXIT_SUCCESS
                }
                None => {
                    eprintln!("kube-inspect: no metadata available for {path}");
                    EXIT_FAILURE
                }
            }
        }
        Command::Cat { path } => {
            let file = conn.open_file(path, &none);
            match file.content() {
                Some(content) => {
                    print!("{content}");
                    EXIT_SUCCESS
                }
                None => {
                    eprintln!("kube-inspect: could not read {path}");
                    EXIT_FAILURE
                }
            }
        }
        Command::Exists { path, no_follow } => {
            if conn.open_file_with(path, !no_follow, &none).exists() {
                EXIT_SUCCESS
            } else {
                EXIT_FAILURE
            }
        }
        Command::Readlink { path } => {
            let file = conn.open_file(path, &none);
            match file.link_path() {
                Some("") => {
                    eprintln!("kube-inspect: {path}: symlink target could not be resolved");
                    EXIT_FAILURE
                }
                Some(target) => {
                    println!("{target}");
                    EXIT_SUCCESS
                }
                None => EXIT_FAILURE,
            }
        }
    };
    Ok(code)
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("kube-inspect: {e}");
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("kube-inspect").chain(args.iter().copied()))
    }

    #[test]
    fn target_uri_sets_selector_fields() {
        let c = cli(&["--kubeconfig", "/tmp/kc", "k8s://prod/web-0/app", "uri"]);
        let opts = options(&c).unwrap();
        assert_eq!(opts.kubeconfig.as_deref(), Some("/tmp/kc"));
        assert_eq!(opts.namespace.as_deref(), Some("prod"));
        assert_eq!(opts.pod.as_deref(), Some("web-0"));
        assert_eq!(opts.container.as_deref(), Some("app"));
    }

    #[test]
    fn flags_override_uri() {
        let c = cli(&[
            "--kubeconfig",
            "/tmp/kc",
            "-n",
            "staging",
            "k8s://prod/web-0",
            "cat",
            "/etc/hosts",
        ]);
        let opts = options(&c).unwrap();
        assert_eq!(opts.namespace.as_deref(), Some("staging"));
        assert_eq!(opts.pod.as_deref(), Some("web-0"));
    }

    #[test]
    fn bare_pod_name() {
        let c = cli(&["--kubeconfig", "/tmp/kc", "web-0", "exec", "id"]);
        let opts = options(&c).unwrap();
        assert_eq!(opts.pod.as_deref(), Some("web-0"));
        assert_eq!(opts.namespace, None);
        assert!(matches!(c.command, Command::Exec { ref command } if command == "id"));
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Err(std::io::ErrorKind::BrokenPipe.into())
        }
    }

    #[test]
    fn exit_status_passes_through_after_flush() {
        assert_eq!(exit_after_output(&mut Vec::<u8>::new(), 0), EXIT_SUCCESS);
        assert_eq!(exit_after_output(&mut Vec::<u8>::new(), 42), 42);
        assert_eq!(exit_after_output(&mut Vec::<u8>::new(), -1), EXIT_FAILURE);
    }

    #[test]
    fn unflushable_output_is_a_failure() {
        assert_eq!(exit_after_output(&mut BrokenPipe, 0), EXIT_FAILURE);
    }

    #[test]
    fn missing_kubeconfig_exits_with_configuration_code() {
        let c = cli(&["--kubeconfig", "/no/such/path", "web-0", "uri"]);
        let err = run(&c).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("not found"));
    }
}
