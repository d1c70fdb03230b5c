//! External actions a session can trigger.
//!
//! Everything that touches the host system lives here: running the
//! configured script, reading the public key file and launching the typing
//! command. Failures are returned as [`ActionResult`] values, never as
//! errors, so a broken script cannot take a session down.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info, warn};

use yoshimi_core::{ActionResult, MenuSettings, ScriptSettings};

/// Runs the notification script for a submitted form.
#[async_trait]
pub trait ScriptInvoker: Send + Sync {
    /// Run the script with `title` and `body` as its two arguments.
    async fn invoke(&self, title: &str, body: &str) -> ActionResult;
}

/// [`ScriptInvoker`] that spawns a local executable.
///
/// Arguments are passed directly to the process (no shell), stdin is
/// closed, and stdout followed by stderr becomes the result output.
#[derive(Debug, Clone)]
pub struct ProcessInvoker {
    program: PathBuf,
    timeout: Option<Duration>,
}

impl ProcessInvoker {
    /// Create an invoker for `program` with an optional per-run bound.
    pub fn new(program: impl Into<PathBuf>, timeout: Option<Duration>) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    /// Create an invoker from script settings.
    pub fn from_settings(settings: &ScriptSettings) -> Self {
        Self::new(settings.path.clone(), settings.timeout())
    }

    /// Path of the executable.
    pub fn program(&self) -> &Path {
        &self.program
    }
}

#[async_trait]
impl ScriptInvoker for ProcessInvoker {
    async fn invoke(&self, title: &str, body: &str) -> ActionResult {
        let started = Instant::now();
        let result = run_captured(&self.program, &[title, body], self.timeout).await;
        match result.error() {
            None => info!(
                "Script {} finished in {:?}",
                self.program.display(),
                started.elapsed()
            ),
            Some(err) => warn!("Script {} failed: {}", self.program.display(), err),
        }
        result
    }
}

/// Run `program args...` and capture its output.
///
/// The child is killed if the bound elapses or the calling future is dropped.
pub async fn run_captured(
    program: &Path,
    args: &[&str],
    timeout: Option<Duration>,
) -> ActionResult {
    debug!("Spawning {} with {} args", program.display(), args.len());

    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn();
    let child = match child {
        Ok(child) => child,
        Err(e) => {
            return ActionResult::failure(
                String::new(),
                format!("failed to start {}: {}", program.display(), e),
            )
        }
    };

    let output = match timeout {
        Some(limit) => match tokio::time::timeout(limit, child.wait_with_output()).await {
            Ok(output) => output,
            Err(_) => {
                return ActionResult::failure(
                    String::new(),
                    format!("timed out after {}s", limit.as_secs()),
                )
            }
        },
        None => child.wait_with_output().await,
    };

    match output {
        Ok(output) => {
            let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
            combined.push_str(&String::from_utf8_lossy(&output.stderr));
            if output.status.success() {
                ActionResult::success(combined)
            } else {
                ActionResult::failure(combined, output.status.to_string())
            }
        }
        Err(e) => ActionResult::failure(String::new(), format!("failed to collect output: {e}")),
    }
}

/// Menu actions other than the form.
#[derive(Debug, Clone)]
pub struct LocalActions {
    public_key_path: Option<PathBuf>,
    typing_command: String,
}

impl LocalActions {
    /// Create actions reading `public_key_path` and running `typing_command`.
    pub fn new(public_key_path: Option<PathBuf>, typing_command: impl Into<String>) -> Self {
        Self {
            public_key_path,
            typing_command: typing_command.into(),
        }
    }

    /// Create actions from menu settings.
    pub fn from_settings(settings: &MenuSettings) -> Self {
        Self::new(settings.public_key_path(), settings.typing_command.clone())
    }

    /// Read the public key file; its contents become the output.
    pub async fn read_public_key(&self) -> ActionResult {
        let Some(path) = &self.public_key_path else {
            return ActionResult::failure(String::new(), "no public key path configured");
        };
        match tokio::fs::read_to_string(path).await {
            Ok(contents) => ActionResult::success(contents),
            Err(e) => ActionResult::failure(String::new(), format!("{}: {}", path.display(), e)),
        }
    }

    /// Run the typing command to completion without a terminal attached.
    pub async fn launch_typing(&self) -> ActionResult {
        let program = Path::new(&self.typing_command);
        let result = run_captured(program, &[], None).await;
        match result.error() {
            None => ActionResult::success("Exited typing."),
            Some(err) => ActionResult::failure(
                String::new(),
                format!("running {}: {}", self.typing_command, err),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_program_is_failure() {
        let invoker = ProcessInvoker::new("/nonexistent/yoshimi-script", None);
        let result = invoker.invoke("t", "b").await;
        let err = result.error().unwrap();
        assert!(err.starts_with("failed to start /nonexistent/yoshimi-script"));
        assert!(result.output.is_empty());
    }

    #[tokio::test]
    async fn test_read_public_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("id_ed25519.pub");
        std::fs::write(&path, "ssh-ed25519 AAAATEST user@host\n").unwrap();

        let actions = LocalActions::new(Some(path), "true");
        let result = actions.read_public_key().await;
        assert_eq!(result.error(), None);
        assert_eq!(result.output, "ssh-ed25519 AAAATEST user@host\n");
    }

    #[tokio::test]
    async fn test_read_public_key_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let actions = LocalActions::new(Some(dir.path().join("missing.pub")), "true");
        let result = actions.read_public_key().await;
        assert!(result.error().unwrap().contains("missing.pub"));
    }

    #[tokio::test]
    async fn test_read_public_key_unconfigured() {
        let actions = LocalActions::new(None, "true");
        assert!(actions.read_public_key().await.error().is_some());
    }

    #[test]
    fn test_from_settings() {
        let settings = ScriptSettings {
            path: PathBuf::from("/bin/notify"),
            timeout_secs: 5,
        };
        let invoker = ProcessInvoker::from_settings(&settings);
        assert_eq!(invoker.program(), Path::new("/bin/notify"));
        assert_eq!(invoker.timeout, Some(Duration::from_secs(5)));
    }

    #[cfg(unix)]
    mod unix {
        use std::os::unix::fs::PermissionsExt;

        use super::*;

        fn script(dir: &Path, body: &str) -> PathBuf {
            let path = dir.join("script.sh");
            std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            path
        }

        #[tokio::test]
        async fn test_script_receives_arguments_verbatim() {
            let dir = tempfile::tempdir().unwrap();
            let path = script(dir.path(), r#"printf '%s|%s' "$1" "$2""#);
            let invoker = ProcessInvoker::new(path, None);

            let result = invoker.invoke("a title; rm -rf /", "$HOME `x`").await;
            assert_eq!(result.error(), None);
            assert_eq!(result.output, "a title; rm -rf /|$HOME `x`");
        }

        #[tokio::test]
        async fn test_stdout_then_stderr() {
            let dir = tempfile::tempdir().unwrap();
            let path = script(dir.path(), "echo err >&2\necho out");
            let result = ProcessInvoker::new(path, None).invoke("", "").await;
            assert_eq!(result.output, "out\nerr\n");
        }

        #[tokio::test]
        async fn test_nonzero_exit_keeps_output() {
            let dir = tempfile::tempdir().unwrap();
            let path = script(dir.path(), "echo partial\nexit 3");
            let result = ProcessInvoker::new(path, None).invoke("", "").await;
            assert_eq!(result.output, "partial\n");
            assert!(result.error().unwrap().contains('3'));
        }

        #[tokio::test]
        async fn test_timeout() {
            let dir = tempfile::tempdir().unwrap();
            let path = script(dir.path(), "sleep 5");
            let invoker = ProcessInvoker::new(path, Some(Duration::from_millis(100)));

            let started = Instant::now();
            let result = invoker.invoke("", "").await;
            assert!(started.elapsed() < Duration::from_secs(4));
            assert!(result.error().unwrap().starts_with("timed out"));
        }

        #[tokio::test]
        async fn test_launch_typing() {
            let dir = tempfile::tempdir().unwrap();
            let ok = script(dir.path(), "exit 0");
            let actions = LocalActions::new(None, ok.to_string_lossy());
            assert_eq!(actions.launch_typing().await.output, "Exited typing.");

            let actions = LocalActions::new(None, "/nonexistent/typing");
            let result = actions.launch_typing().await;
            assert!(result
                .error()
                .unwrap()
                .starts_with("running /nonexistent/typing"));
        }
    }
}
