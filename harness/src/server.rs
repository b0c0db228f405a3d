//! Lifecycle of the service under test: spawn, readiness poll, teardown.
//!
//! [`ServerHandle`] owns the spawned process. Dropping it stops the process
//! (SIGTERM to its process group, then SIGKILL once the grace period runs
//! out), so the service is torn down on every exit path of the block that
//! started it, including a panicking test.

use crate::client::ApiClient;
use crate::config::{ReadinessConfig, ServerConfig};
use std::fs::File;
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, info, warn};

const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Error, Debug)]
pub enum ServerError {
    /// The service process could not be started
    #[error("Failed to start server '{command}': {reason}")]
    SpawnFailed { command: String, reason: String },

    /// The readiness poll ran out of attempts
    #[error("Service at {url} did not become ready after {attempts} attempts ({waited_secs:.1}s)")]
    NotReady {
        url: String,
        attempts: u32,
        waited_secs: f64,
    },

    /// The process could not be stopped, even forcefully
    #[error("Failed to terminate server process {pid}: {reason}")]
    TerminateFailed { pid: u32, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ServerResult<T> = Result<T, ServerError>;

/// Handle for a running service process.
#[derive(Debug)]
pub struct ServerHandle {
    child: Option<Child>,
    command: String,
    shutdown_grace: Duration,
}

impl ServerHandle {
    /// Start the configured command in its own process group.
    pub fn spawn(config: &ServerConfig) -> ServerResult<Self> {
        let mut cmd = Command::new(&config.command);
        cmd.args(&config.args)
            .envs(&config.env)
            .stdin(Stdio::null());

        if let Some(dir) = &config.working_dir {
            cmd.current_dir(dir);
        }

        match &config.log_file {
            Some(path) => {
                let log = File::create(path)?;
                cmd.stdout(log.try_clone()?).stderr(log);
            }
            None => {
                cmd.stdout(Stdio::null()).stderr(Stdio::null());
            }
        }

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        let command_line = std::iter::once(config.command.as_str())
            .chain(config.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ");

        let child = cmd.spawn().map_err(|e| ServerError::SpawnFailed {
            command: command_line.clone(),
            reason: e.to_string(),
        })?;

        info!("Started server '{}' (pid {})", command_line, child.id());

        Ok(Self {
            child: Some(child),
            command: command_line,
            shutdown_grace: config.shutdown_grace(),
        })
    }

    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().map(Child::id)
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    /// Whether the process is still alive. Reaps it if it has exited.
    pub fn is_running(&mut self) -> bool {
        match self.child.as_mut() {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }

    /// Stop the process now and report failures. Dropping the handle does the
    /// same but can only log them.
    pub fn shutdown(mut self) -> ServerResult<()> {
        self.terminate()
    }

    fn terminate(&mut self) -> ServerResult<()> {
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };
        let pid = child.id();

        if let Ok(Some(status)) = child.try_wait() {
            debug!("Server process {} already exited with {}", pid, status);
            return Ok(());
        }

        request_stop(&mut child)?;
        if wait_for_exit(&mut child, self.shutdown_grace)? {
            info!("Server process {} stopped", pid);
            return Ok(());
        }

        warn!(
            "Server process {} ignored SIGTERM for {:?}; killing it",
            pid, self.shutdown_grace
        );
        force_kill(&mut child)?;
        child.wait()?;
        Ok(())
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        if let Err(e) = self.terminate() {
            warn!("{}", e);
        }
    }
}

/// `true` once the child has exited, `false` if `grace` ran out first.
///
/// Blocks the calling thread, since `Drop` cannot await. The harness runs on
/// a current-thread runtime with no other task in flight during teardown.
fn wait_for_exit(child: &mut Child, grace: Duration) -> ServerResult<bool> {
    let deadline = Instant::now() + grace;
    loop {
        if child.try_wait()?.is_some() {
            return Ok(true);
        }
        if Instant::now() >= deadline {
            return Ok(false);
        }
        std::thread::sleep(EXIT_POLL_INTERVAL);
    }
}

#[cfg(unix)]
fn signal_group(child: &Child, signal: nix::sys::signal::Signal) -> ServerResult<()> {
    use nix::errno::Errno;
    use nix::sys::signal::killpg;
    use nix::unistd::Pid;

    let pid = child.id();
    match killpg(Pid::from_raw(pid as i32), signal) {
        Ok(()) | Err(Errno::ESRCH) => Ok(()),
        Err(e) => Err(ServerError::TerminateFailed {
            pid,
            reason: format!("{:?}: {}", signal, e),
        }),
    }
}

#[cfg(unix)]
fn request_stop(child: &mut Child) -> ServerResult<()> {
    match signal_group(child, nix::sys::signal::Signal::SIGTERM) {
        Ok(()) => Ok(()),
        Err(e) => {
            warn!("{}; falling back to SIGKILL", e);
            force_kill(child)
        }
    }
}

#[cfg(unix)]
fn force_kill(child: &mut Child) -> ServerResult<()> {
    if signal_group(child, nix::sys::signal::Signal::SIGKILL).is_ok() {
        return Ok(());
    }
    kill_child(child)
}

#[cfg(not(unix))]
fn request_stop(child: &mut Child) -> ServerResult<()> {
    kill_child(child)
}

#[cfg(not(unix))]
fn force_kill(child: &mut Child) -> ServerResult<()> {
    kill_child(child)
}

fn kill_child(child: &mut Child) -> ServerResult<()> {
    match child.kill() {
        Ok(()) => Ok(()),
        // already exited
        Err(e) if e.kind() == std::io::ErrorKind::InvalidInput => Ok(()),
        Err(e) => Err(ServerError::TerminateFailed {
            pid: child.id(),
            reason: e.to_string(),
        }),
    }
}

/// Poll the readiness probe until it answers with an accepted status.
///
/// Returns the number of attempts used. Gives up with
/// [`ServerError::NotReady`] after `max_attempts` probes.
pub async fn wait_until_ready(
    client: &ApiClient,
    readiness: &ReadinessConfig,
) -> ServerResult<u32> {
    let started = Instant::now();
    let url = format!("{}{}", client.api_base(), readiness.probe_path);
    debug!(
        "Waiting up to {:?} for {} ({} attempts)",
        readiness.max_wait(),
        url,
        readiness.max_attempts
    );

    for attempt in 1..=readiness.max_attempts {
        match client
            .probe(&readiness.probe_path, readiness.probe_timeout())
            .await
        {
            Ok(status) if readiness.accepted_statuses.contains(&status.as_u16()) => {
                info!(
                    "Service ready at {} after {} attempt(s) (status {})",
                    url, attempt, status
                );
                return Ok(attempt);
            }
            Ok(status) => debug!("Readiness probe {}: unexpected status {}", attempt, status),
            Err(e) => debug!("Readiness probe {}: {}", attempt, e),
        }

        if attempt < readiness.max_attempts {
            sleep(readiness.interval()).await;
        }
    }

    Err(ServerError::NotReady {
        url,
        attempts: readiness.max_attempts,
        waited_secs: started.elapsed().as_secs_f64(),
    })
}
