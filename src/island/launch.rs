//! Starting workers and owning their channels.
//!
//! A [`Launcher`] turns "start worker `i`" into a [`WorkerLink`]: a
//! connected private channel plus a handle for tearing the worker down.
//! The coordinator never touches process creation directly.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::net::Shutdown;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use super::config::IslandConfig;
use super::wire::{read_schedule, write_schedule};
use super::worker::{run_worker, WorkerSummary};
use crate::error::{IslandError, WireError};
use crate::schedule::Schedule;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Grace period for a worker to exit after its channel is closed.
const EXIT_GRACE: Duration = Duration::from_secs(10);

/// Command-line flag that switches the binary into worker mode.
pub const WORKER_FLAG: &str = "--worker";

type WorkerOutcome = Result<WorkerSummary, IslandError>;

/// How a launched worker is torn down.
pub enum WorkerHandle {
    /// A separate OS process.
    Process(Child),
    /// An in-process thread.
    Thread(JoinHandle<WorkerOutcome>),
}

/// The coordinator's end of one worker: its private channel and handle.
pub struct WorkerLink {
    id: usize,
    channel: UnixStream,
    handle: WorkerHandle,
}

impl WorkerLink {
    pub fn new(id: usize, channel: UnixStream, handle: WorkerHandle) -> Self {
        Self {
            id,
            channel,
            handle,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// Sends one schedule to the worker.
    pub fn send(&mut self, schedule: &Schedule) -> Result<(), IslandError> {
        write_schedule(&mut self.channel, schedule).map_err(|source| self.protocol(source))
    }

    /// Blocks until the worker's next schedule arrives.
    pub fn receive(&mut self) -> Result<Schedule, IslandError> {
        read_schedule(&mut self.channel).map_err(|source| self.protocol(source))
    }

    fn protocol(&self, source: WireError) -> IslandError {
        IslandError::Protocol {
            worker: self.id,
            source,
        }
    }

    /// Closes the channel and waits for the worker to exit on its own.
    pub fn close(self) {
        let _ = self.channel.shutdown(Shutdown::Both);
        let id = self.id;
        match self.handle {
            WorkerHandle::Process(child) => reap(id, child, EXIT_GRACE),
            WorkerHandle::Thread(handle) => join(id, handle),
        }
    }

    /// Closes the channel and stops the worker without waiting for it to
    /// finish its work.
    pub fn abort(self) {
        let _ = self.channel.shutdown(Shutdown::Both);
        let id = self.id;
        match self.handle {
            WorkerHandle::Process(child) => reap(id, child, Duration::ZERO),
            // A thread cannot be killed; the closed channel makes its next
            // read or write fail.
            WorkerHandle::Thread(handle) => join(id, handle),
        }
    }
}

fn reap(id: usize, mut child: Child, grace: Duration) {
    let deadline = Instant::now() + grace;
    loop {
        match child.try_wait() {
            Ok(Some(status)) if status.success() => {
                tracing::debug!(worker = id, "worker process exited");
                return;
            }
            Ok(Some(status)) => {
                tracing::warn!(worker = id, %status, "worker process exited with failure");
                return;
            }
            Ok(None) if Instant::now() < deadline => thread::sleep(POLL_INTERVAL),
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(worker = id, error = %e, "cannot poll worker process");
                break;
            }
        }
    }
    if grace > Duration::ZERO {
        tracing::warn!(worker = id, "worker process did not exit in time, killing it");
    }
    let _ = child.kill();
    let _ = child.wait();
}

fn join(id: usize, handle: JoinHandle<WorkerOutcome>) {
    match handle.join() {
        Ok(Ok(summary)) => {
            tracing::debug!(worker = id, rounds = summary.rounds, "worker thread finished");
        }
        Ok(Err(e)) => tracing::warn!(worker = id, error = %e, "worker thread failed"),
        Err(_) => tracing::warn!(worker = id, "worker thread panicked"),
    }
}

/// Applies the configured read/write timeout to a channel end.
pub fn configure_channel(stream: &UnixStream, timeout: Option<Duration>) -> io::Result<()> {
    stream.set_read_timeout(timeout)?;
    stream.set_write_timeout(timeout)
}

/// Starts workers one at a time.
pub trait Launcher {
    /// Starts worker `id` and returns its connected link.
    fn launch(&mut self, id: usize) -> Result<WorkerLink, IslandError>;
}

/// The filesystem endpoint workers connect to. Removed before binding and
/// again when dropped.
pub struct Rendezvous {
    path: PathBuf,
    listener: UnixListener,
}

impl Rendezvous {
    pub fn bind(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        remove_stale(&path)?;
        let listener = UnixListener::bind(&path)?;
        listener.set_nonblocking(true)?;
        Ok(Self { path, listener })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for Rendezvous {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            if e.kind() != io::ErrorKind::NotFound {
                tracing::warn!(path = %self.path.display(), error = %e, "cannot remove rendezvous socket");
            }
        }
    }
}

fn remove_stale(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => {
            tracing::debug!(path = %path.display(), "removed stale rendezvous socket");
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Launches workers as child processes of a program that understands
/// [`WORKER_FLAG`], typically the current executable.
pub struct ProcessLauncher {
    rendezvous: Rendezvous,
    program: PathBuf,
    args: Vec<OsString>,
    connect_timeout: Duration,
    io_timeout: Option<Duration>,
}

impl ProcessLauncher {
    /// Binds the rendezvous endpoint. Each worker runs
    /// `program args... --worker <id>`.
    pub fn bind(
        config: &IslandConfig,
        program: impl Into<PathBuf>,
        args: Vec<OsString>,
    ) -> Result<Self, IslandError> {
        let rendezvous =
            Rendezvous::bind(&config.socket_path).map_err(|e| IslandError::Spawn {
                worker: 0,
                reason: format!(
                    "cannot bind rendezvous socket {}: {e}",
                    config.socket_path.display()
                ),
            })?;
        Ok(Self {
            rendezvous,
            program: program.into(),
            args,
            connect_timeout: config.connect_timeout,
            io_timeout: config.io_timeout,
        })
    }

    pub fn socket_path(&self) -> &Path {
        self.rendezvous.path()
    }

    fn accept(&self, child: &mut Child) -> Result<UnixStream, String> {
        let deadline = Instant::now() + self.connect_timeout;
        loop {
            match self.rendezvous.listener.accept() {
                Ok((stream, _)) => {
                    stream
                        .set_nonblocking(false)
                        .and_then(|()| configure_channel(&stream, self.io_timeout))
                        .map_err(|e| format!("cannot configure channel: {e}"))?;
                    return Ok(stream);
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    if let Some(status) = child
                        .try_wait()
                        .map_err(|e| format!("cannot poll process: {e}"))?
                    {
                        return Err(format!("exited with {status} before connecting"));
                    }
                    if Instant::now() >= deadline {
                        return Err(format!(
                            "did not connect within {:?}",
                            self.connect_timeout
                        ));
                    }
                    thread::sleep(POLL_INTERVAL);
                }
                Err(e) => return Err(format!("accept failed: {e}")),
            }
        }
    }
}

impl Launcher for ProcessLauncher {
    fn launch(&mut self, id: usize) -> Result<WorkerLink, IslandError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(WORKER_FLAG)
            .arg(id.to_string())
            .stdin(Stdio::null())
            .spawn()
            .map_err(|e| IslandError::Spawn {
                worker: id,
                reason: format!("cannot start {}: {e}", self.program.display()),
            })?;

        match self.accept(&mut child) {
            Ok(channel) => {
                tracing::debug!(worker = id, pid = child.id(), "worker connected");
                Ok(WorkerLink::new(id, channel, WorkerHandle::Process(child)))
            }
            Err(reason) => {
                let _ = child.kill();
                let _ = child.wait();
                Err(IslandError::Spawn { worker: id, reason })
            }
        }
    }
}

/// Connects a worker process to the coordinator's rendezvous endpoint.
pub fn connect_worker(id: usize, config: &IslandConfig) -> Result<UnixStream, IslandError> {
    let stream = UnixStream::connect(&config.socket_path).map_err(|e| IslandError::Spawn {
        worker: id,
        reason: format!("cannot connect to {}: {e}", config.socket_path.display()),
    })?;
    configure_channel(&stream, config.io_timeout)?;
    Ok(stream)
}

type WorkerBody = dyn Fn(usize, UnixStream) -> WorkerOutcome + Send + Sync;

/// Launches workers as threads of the current process, each on its own
/// socket pair. No filesystem endpoint is involved.
pub struct ThreadLauncher {
    io_timeout: Option<Duration>,
    body: Arc<WorkerBody>,
}

impl ThreadLauncher {
    /// Threads running the regular worker loop.
    pub fn new(config: &IslandConfig) -> Self {
        let shared = config.clone();
        Self::with_body(config, move |id, channel| run_worker(id, channel, &shared))
    }

    /// Threads running `body` instead of the regular worker loop.
    pub fn with_body<F>(config: &IslandConfig, body: F) -> Self
    where
        F: Fn(usize, UnixStream) -> WorkerOutcome + Send + Sync + 'static,
    {
        Self {
            io_timeout: config.io_timeout,
            body: Arc::new(body),
        }
    }
}

impl Launcher for ThreadLauncher {
    fn launch(&mut self, id: usize) -> Result<WorkerLink, IslandError> {
        let spawn_error = |e: io::Error| IslandError::Spawn {
            worker: id,
            reason: e.to_string(),
        };
        let (coordinator_end, worker_end) = UnixStream::pair().map_err(spawn_error)?;
        configure_channel(&coordinator_end, self.io_timeout).map_err(spawn_error)?;
        configure_channel(&worker_end, self.io_timeout).map_err(spawn_error)?;

        let body = Arc::clone(&self.body);
        let handle = thread::Builder::new()
            .name(format!("island-worker-{id}"))
            .spawn(move || body(id, worker_end))
            .map_err(spawn_error)?;
        Ok(WorkerLink::new(id, coordinator_end, WorkerHandle::Thread(handle)))
    }
}
