//! Single-process supervisor.
//!
//! At most one external program runs at a time. Starting a new one stops the
//! previous one first. All state sits behind one async mutex so lifecycle
//! operations are mutually exclusive.

use std::process::{ExitStatus, Stdio};

use proto::{LaunchMode, LaunchRequest, ProcessError};
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::relay::{OutputSender, RelayStats, spawn_reader};
use crate::template::CommandTemplate;

/// Environment forced on every child so it does not block-buffer its output.
const UNBUFFERED_ENV: [(&str, &str); 2] = [("PYTHONUNBUFFERED", "1"), ("LLAMA_UNBUFFERED", "1")];

/// The two configured command templates.
#[derive(Debug, Clone)]
pub struct Templates {
    pub server: CommandTemplate,
    pub interactive: CommandTemplate,
}

impl Templates {
    pub fn for_mode(&self, mode: LaunchMode) -> &CommandTemplate {
        match mode {
            LaunchMode::Server => &self.server,
            LaunchMode::Interactive => &self.interactive,
        }
    }
}

/// Read ends of the child's stdout and stderr.
#[derive(Debug)]
pub struct OutputStreams {
    pub stdout: ChildStdout,
    pub stderr: ChildStderr,
}

/// Summary returned by a successful start.
#[derive(Debug, Clone)]
pub struct StartedProcess {
    pub pid: Option<u32>,
    pub argv: Vec<String>,
}

#[derive(Debug)]
struct ProcessHandle {
    child: Child,
    pid: Option<u32>,
    mode: LaunchMode,
    stdin: Option<ChildStdin>,
    streams: Option<OutputStreams>,
    relays: Vec<JoinHandle<RelayStats>>,
}

/// Owns the lifecycle of the single running external program.
#[derive(Debug)]
pub struct ProcessSupervisor {
    templates: Templates,
    current: Mutex<Option<ProcessHandle>>,
}

impl ProcessSupervisor {
    pub fn new(templates: Templates) -> Self {
        Self {
            templates,
            current: Mutex::new(None),
        }
    }

    #[cfg(test)]
    pub fn templates(&self) -> &Templates {
        &self.templates
    }

    /// Stops any previous process, then resolves the template for `request`
    /// and spawns it. On failure the supervisor is left idle.
    pub async fn start(&self, request: &LaunchRequest) -> Result<StartedProcess, ProcessError> {
        let mut current = self.current.lock().await;
        if let Some(previous) = current.take() {
            debug!(pid = ?previous.pid, "stopping previous process before start");
            shutdown(previous).await;
        }

        let argv = self
            .templates
            .for_mode(request.mode)
            .resolve(&request.target, request.overrides)?;

        let (program, args) = argv.split_first().ok_or(ProcessError::EmptyCommand)?;
        let wants_stdin = request.mode.wants_stdin();
        let mut command = Command::new(program);
        command
            .args(args)
            .envs(UNBUFFERED_ENV)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(if wants_stdin {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .kill_on_drop(true);

        let mut child = command
            .spawn()
            .map_err(|e| ProcessError::Spawn(format!("{program}: {e}")))?;
        let pid = child.id();

        let streams = match (child.stdout.take(), child.stderr.take()) {
            (Some(stdout), Some(stderr)) => OutputStreams { stdout, stderr },
            _ => {
                discard(child).await;
                return Err(ProcessError::Spawn("output pipes unavailable".to_string()));
            }
        };
        let stdin = if wants_stdin {
            match child.stdin.take() {
                Some(stdin) => Some(stdin),
                None => {
                    discard(child).await;
                    return Err(ProcessError::Spawn("stdin pipe unavailable".to_string()));
                }
            }
        } else {
            None
        };

        info!(
            pid = ?pid,
            mode = %request.mode,
            target = %request.target.label(),
            "process started"
        );
        *current = Some(ProcessHandle {
            child,
            pid,
            mode: request.mode,
            stdin,
            streams: Some(streams),
            relays: Vec::new(),
        });

        Ok(StartedProcess { pid, argv })
    }

    /// Terminates the current process, if any, and waits for it. Idempotent.
    pub async fn stop(&self) {
        let mut current = self.current.lock().await;
        if let Some(handle) = current.take() {
            shutdown(handle).await;
        }
    }

    /// True while a process is held and has not exited.
    pub async fn is_running(&self) -> bool {
        let mut current = self.current.lock().await;
        match current.as_mut() {
            Some(handle) => matches!(handle.child.try_wait(), Ok(None)),
            None => false,
        }
    }

    /// Mode of the held process.
    #[cfg(test)]
    pub async fn mode(&self) -> Option<LaunchMode> {
        self.current.lock().await.as_ref().map(|h| h.mode)
    }

    #[cfg(test)]
    pub async fn pid(&self) -> Option<u32> {
        self.current.lock().await.as_ref().and_then(|h| h.pid)
    }

    /// Writes `text` verbatim to the child's stdin and flushes it.
    pub async fn write_input(&self, text: &str) -> Result<(), ProcessError> {
        let mut current = self.current.lock().await;
        let stdin = current
            .as_mut()
            .and_then(|h| h.stdin.as_mut())
            .ok_or(ProcessError::NoInputStream)?;
        stdin.write_all(text.as_bytes()).await?;
        stdin.flush().await?;
        Ok(())
    }

    /// Hands out the output pipes once per process.
    pub async fn take_output_streams(&self) -> Option<OutputStreams> {
        self.current
            .lock()
            .await
            .as_mut()
            .and_then(|h| h.streams.take())
    }

    /// Starts relay readers for the current process's output pipes. Returns
    /// `false` when there is no process or the pipes were already taken.
    pub async fn attach_relay(&self, tx: &OutputSender) -> bool {
        let Some(streams) = self.take_output_streams().await else {
            return false;
        };
        let relays = vec![
            spawn_reader("stdout", streams.stdout, tx.clone()),
            spawn_reader("stderr", streams.stderr, tx.clone()),
        ];
        match self.current.lock().await.as_mut() {
            Some(handle) => handle.relays = relays,
            None => relays.iter().for_each(|relay| relay.abort()),
        }
        true
    }

    /// Releases a process that exited on its own and returns its status.
    /// Relay readers are detached so they can drain what the child wrote.
    pub async fn reap(&self) -> Option<ExitStatus> {
        let mut current = self.current.lock().await;
        let handle = current.as_mut()?;
        match handle.child.try_wait() {
            Ok(Some(status)) => {
                info!(pid = ?handle.pid, %status, "process exited");
                current.take();
                Some(status)
            }
            Ok(None) => None,
            Err(e) => {
                warn!(pid = ?handle.pid, "failed to poll process status: {e}");
                None
            }
        }
    }
}

async fn shutdown(mut handle: ProcessHandle) {
    drop(handle.stdin.take());
    match handle.child.try_wait() {
        Ok(Some(status)) => debug!(pid = ?handle.pid, %status, "process already exited"),
        _ => {
            if let Err(e) = handle.child.kill().await {
                warn!(pid = ?handle.pid, "failed to kill process: {e}");
            } else {
                info!(pid = ?handle.pid, "process stopped");
            }
        }
    }
    for relay in handle.relays {
        relay.abort();
    }
}

async fn discard(mut child: Child) {
    if let Err(e) = child.kill().await {
        warn!("failed to kill half-started process: {e}");
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::relay::output_channel;
    use proto::{LaunchOverrides, LaunchTarget};
    use std::path::PathBuf;
    use std::time::Duration;

    fn supervisor(server: &str, interactive: &str) -> ProcessSupervisor {
        ProcessSupervisor::new(Templates {
            server: CommandTemplate::new(server),
            interactive: CommandTemplate::new(interactive),
        })
    }

    fn request(mode: LaunchMode) -> LaunchRequest {
        LaunchRequest {
            target: LaunchTarget::Local {
                path: PathBuf::from("/models/tiny.gguf"),
                name: "tiny.gguf".to_string(),
            },
            mode,
            overrides: LaunchOverrides { ngl: 7, ctx_size: 0 },
        }
    }

    async fn collect_until(rx: &mut crate::relay::OutputReceiver, needle: &str) -> String {
        let mut seen = String::new();
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while !seen.contains(needle) {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            match tokio::time::timeout(remaining, rx.recv()).await {
                Ok(Some(chunk)) => seen.push_str(&chunk),
                _ => break,
            }
        }
        seen
    }

    #[tokio::test]
    async fn server_output_reaches_the_queue() {
        let sup = supervisor("echo serving {model_name} ngl={ngl}", "cat");
        let started = sup.start(&request(LaunchMode::Server)).await.expect("start");
        assert_eq!(started.argv[0], "echo");

        let (tx, mut rx) = output_channel();
        assert!(sup.attach_relay(&tx).await);
        let seen = collect_until(&mut rx, "ngl=7").await;
        assert!(seen.contains("serving tiny.gguf ngl=7"), "got {seen:?}");
        sup.stop().await;
    }

    #[tokio::test]
    async fn children_get_unbuffered_environment() {
        let sup = supervisor("env", "cat");
        sup.start(&request(LaunchMode::Server)).await.expect("start");
        let (tx, mut rx) = output_channel();
        sup.attach_relay(&tx).await;
        let seen = collect_until(&mut rx, "LLAMA_UNBUFFERED=1").await;
        assert!(seen.contains("PYTHONUNBUFFERED=1"));
        assert!(seen.contains("LLAMA_UNBUFFERED=1"));
        sup.stop().await;
    }

    #[tokio::test]
    async fn interactive_input_round_trips_through_cat() {
        let sup = supervisor("true", "cat");
        sup.start(&request(LaunchMode::Interactive))
            .await
            .expect("start");
        let (tx, mut rx) = output_channel();
        sup.attach_relay(&tx).await;

        sup.write_input("ping\n").await.expect("write");
        let seen = collect_until(&mut rx, "ping\n").await;
        assert_eq!(seen, "ping\n");
        assert!(sup.is_running().await);

        sup.stop().await;
        assert!(!sup.is_running().await);
    }

    #[tokio::test]
    async fn write_input_without_stdin_fails() {
        let sup = supervisor("sleep 30", "cat");
        let err = sup.write_input("x").await.expect_err("idle");
        assert!(matches!(err, ProcessError::NoInputStream));

        sup.start(&request(LaunchMode::Server)).await.expect("start");
        let err = sup.write_input("x").await.expect_err("server mode");
        assert!(matches!(err, ProcessError::NoInputStream));
        sup.stop().await;
    }

    #[tokio::test]
    async fn spawn_failure_leaves_supervisor_idle() {
        let sup = supervisor("lload-test-no-such-binary -m {model_path}", "cat");
        let err = sup
            .start(&request(LaunchMode::Server))
            .await
            .expect_err("missing binary");
        assert!(matches!(err, ProcessError::Spawn(_)));
        assert!(!sup.is_running().await);
        assert!(sup.pid().await.is_none());
    }

    #[tokio::test]
    async fn failed_start_still_stops_the_previous_process() {
        let sup = supervisor("sleep 30", "");
        sup.start(&request(LaunchMode::Server)).await.expect("start");
        assert!(sup.is_running().await);

        let err = sup
            .start(&request(LaunchMode::Interactive))
            .await
            .expect_err("blank interactive template");
        assert!(matches!(err, ProcessError::EmptyCommand));
        assert!(!sup.is_running().await);
        assert!(sup.pid().await.is_none());
        assert!(sup.mode().await.is_none());
    }

    #[test]
    fn templates_are_kept_per_mode() {
        let sup = supervisor("srv -m {model_path}", "cli -m {model_path}");
        assert_eq!(sup.templates().for_mode(LaunchMode::Server).as_str(), "srv -m {model_path}");
        assert_eq!(
            sup.templates().for_mode(LaunchMode::Interactive).as_str(),
            "cli -m {model_path}"
        );
    }

    #[tokio::test]
    async fn starting_again_replaces_the_running_process() {
        let sup = supervisor("sleep 30", "cat");
        let first = sup.start(&request(LaunchMode::Server)).await.expect("first");
        let second = sup
            .start(&request(LaunchMode::Interactive))
            .await
            .expect("second");
        assert_ne!(first.pid, second.pid);
        assert_eq!(sup.mode().await, Some(LaunchMode::Interactive));
        assert!(sup.is_running().await);
        sup.stop().await;
    }

    #[tokio::test]
    async fn stop_is_idempotent() {
        let sup = supervisor("sleep 30", "cat");
        sup.stop().await;
        sup.start(&request(LaunchMode::Server)).await.expect("start");
        sup.stop().await;
        sup.stop().await;
        assert!(!sup.is_running().await);
        assert!(sup.take_output_streams().await.is_none());
    }

    #[tokio::test]
    async fn output_streams_are_handed_out_once() {
        let sup = supervisor("sleep 30", "cat");
        sup.start(&request(LaunchMode::Server)).await.expect("start");
        assert!(sup.take_output_streams().await.is_some());
        assert!(sup.take_output_streams().await.is_none());
        let (tx, _rx) = output_channel();
        assert!(!sup.attach_relay(&tx).await);
        sup.stop().await;
    }

    #[tokio::test]
    async fn reap_reports_natural_exit_once() {
        let sup = supervisor("true", "cat");
        sup.start(&request(LaunchMode::Server)).await.expect("start");

        let mut status = None;
        for _ in 0..100 {
            if let Some(s) = sup.reap().await {
                status = Some(s);
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        let status = status.expect("process should exit");
        assert!(status.success());
        assert!(sup.reap().await.is_none());
        assert!(!sup.is_running().await);
    }
}
