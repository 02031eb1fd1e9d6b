//! Transcoder lifecycle: spawn, observe, terminate, collect segments.
//!
//! Every job gets one observer task that owns the child process. The
//! observer waits for the process to exit on its own or for the job to be
//! cancelled, then drops the registry entry and deletes the job's segments.
//! Observers run on a [`TaskTracker`] so shutdown can await them.

use crate::application::registry::StreamRegistry;
use crate::domain::error::RestreamError;
use crate::domain::jobs::{StreamId, StreamJob, TranscodeRequest};
use crate::ports::storage::StagingStore;
use crate::ports::transcoder::TranscoderPort;
use chrono::Utc;
use std::io;
use std::process::ExitStatus;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStderr};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// How long a terminated transcoder gets to flush before it is killed.
const TERMINATE_GRACE: Duration = Duration::from_secs(5);
const READY_POLL: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// The output playlist has been written.
    Ready,
    /// Still running when the timeout ran out, but nothing written yet.
    Alive,
    /// The job is gone: the process exited or was cleaned up.
    Exited,
}

pub struct TranscodeSupervisor<T, S> {
    transcoder: T,
    store: Arc<S>,
    registry: Arc<StreamRegistry>,
    tracker: TaskTracker,
}

impl<T, S> TranscodeSupervisor<T, S>
where
    T: TranscoderPort,
    S: StagingStore + 'static,
{
    pub fn new(transcoder: T, store: Arc<S>, registry: Arc<StreamRegistry>) -> Self {
        Self {
            transcoder,
            store,
            registry,
            tracker: TaskTracker::new(),
        }
    }

    pub fn registry(&self) -> &Arc<StreamRegistry> {
        &self.registry
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Start a transcoder for `source_url` under a fresh id and register it.
    ///
    /// Returns as soon as the process is spawned. A source that turns out to
    /// be unreachable only shows up later as the process exiting.
    pub fn start_stream(&self, title: &str, source_url: &str) -> Result<StreamId, RestreamError> {
        let id = StreamId::generate();
        let request = TranscodeRequest::new(id.clone(), source_url.to_string(), self.store.root());

        let mut child = self
            .transcoder
            .spawn(&request)
            .map_err(|source| RestreamError::Spawn {
                binary: self.transcoder.name(),
                source,
            })?;
        let pid = child.id();
        let stderr = child.stderr.take();
        let cancel = CancellationToken::new();

        self.registry.insert_with(id.clone(), || {
            let observer = self.tracker.spawn(observe(
                id.clone(),
                child,
                cancel.clone(),
                self.registry.clone(),
                self.store.clone(),
            ));
            StreamJob {
                id: id.clone(),
                title: title.to_string(),
                source_url: source_url.to_string(),
                pid,
                started_at: Utc::now(),
                cancel,
                observer,
            }
        });

        if let Some(stderr) = stderr {
            self.tracker.spawn(forward_stderr(id.clone(), stderr));
        }

        tracing::info!(stream_id = %id, source = %source_url, pid = ?pid, "transcoder started");
        Ok(id)
    }

    /// Stop a job and collect its segments. A no-op for unknown ids.
    ///
    /// Does not wait for the process to go away; await the returned handle
    /// for that.
    pub fn cleanup(&self, id: &StreamId) -> Option<JoinHandle<()>> {
        let job = self.registry.remove(id)?;
        job.cancel.cancel();
        tracing::info!(stream_id = %id, "stream cleanup requested");
        Some(job.observer)
    }

    /// Clean up every tracked job. The registry is empty on return.
    pub fn cleanup_all(&self) -> Vec<JoinHandle<()>> {
        let jobs = self.registry.drain();
        if !jobs.is_empty() {
            tracing::info!(count = jobs.len(), "cleaning up active streams");
        }
        jobs.into_iter()
            .map(|job| {
                job.cancel.cancel();
                job.observer
            })
            .collect()
    }

    /// Poll until the job's output playlist appears, the job goes away, or
    /// `timeout` elapses.
    pub async fn wait_ready(&self, id: &StreamId, timeout: Duration) -> Readiness {
        let output = id.output_file_name();
        let deadline = Instant::now() + timeout;
        loop {
            if !self.registry.contains(id) {
                return Readiness::Exited;
            }
            if self.store.exists(&output).await {
                return Readiness::Ready;
            }
            let now = Instant::now();
            if now >= deadline {
                return Readiness::Alive;
            }
            tokio::time::sleep(READY_POLL.min(deadline - now)).await;
        }
    }

    /// Terminate everything and wait for all observers to finish their cleanup.
    pub async fn shutdown(&self) {
        futures::future::join_all(self.cleanup_all()).await;
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }
}

async fn observe<S: StagingStore>(
    id: StreamId,
    mut child: Child,
    cancel: CancellationToken,
    registry: Arc<StreamRegistry>,
    store: Arc<S>,
) {
    let exited = tokio::select! {
        status = child.wait() => Some(status),
        _ = cancel.cancelled() => None,
    };
    let status = match exited {
        Some(status) => status,
        None => terminate(&id, &mut child).await,
    };

    match status {
        Ok(status) => tracing::info!(stream_id = %id, %status, "transcoder exited"),
        Err(e) => tracing::warn!(stream_id = %id, error = %e, "lost track of transcoder"),
    }

    registry.remove(&id);

    match store.purge_segments(&id).await {
        Ok(removed) => tracing::debug!(stream_id = %id, removed, "segments collected"),
        Err(e) => tracing::warn!(stream_id = %id, error = %e, "segment cleanup failed"),
    }
}

async fn terminate(id: &StreamId, child: &mut Child) -> io::Result<ExitStatus> {
    send_sigterm(child);
    match tokio::time::timeout(TERMINATE_GRACE, child.wait()).await {
        Ok(status) => status,
        Err(_) => {
            tracing::warn!(stream_id = %id, "transcoder ignored SIGTERM, killing");
            child.kill().await?;
            child.wait().await
        }
    }
}

#[cfg(unix)]
fn send_sigterm(child: &mut Child) {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let Some(pid) = child.id() else {
        return;
    };
    if let Err(e) = kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
        tracing::debug!(pid, error = %e, "SIGTERM failed, killing");
        let _ = child.start_kill();
    }
}

#[cfg(not(unix))]
fn send_sigterm(child: &mut Child) {
    let _ = child.start_kill();
}

async fn forward_stderr(id: StreamId, stderr: ChildStderr) {
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        tracing::warn!(stream_id = %id, "ffmpeg: {}", line);
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::adapters::fs::FsAdapter;
    use crate::ports::transcoder::MockTranscoderPort;
    use std::process::Stdio;
    use tempfile::{tempdir, TempDir};
    use tokio::process::Command;

    fn command(program: &str, args: &[&str]) -> io::Result<Child> {
        Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
    }

    fn write_segments(request: &TranscodeRequest, count: usize) {
        let dir = request.output_path.parent().unwrap();
        for i in 0..count {
            std::fs::write(dir.join(format!("{}_{:03}.ts", request.id, i)), b"ts").unwrap();
        }
    }

    fn supervisor(
        transcoder: MockTranscoderPort,
    ) -> (TempDir, TranscodeSupervisor<MockTranscoderPort, FsAdapter>) {
        let dir = tempdir().unwrap();
        let store = Arc::new(FsAdapter::new(dir.path()));
        let supervisor = TranscodeSupervisor::new(transcoder, store, Arc::new(StreamRegistry::new()));
        (dir, supervisor)
    }

    fn segment_count(dir: &TempDir, id: &StreamId) -> usize {
        std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| id.owns_segment(e.file_name().to_str().unwrap()))
            .count()
    }

    #[tokio::test]
    async fn test_start_registers_and_cleanup_collects_segments() {
        let mut transcoder = MockTranscoderPort::new();
        transcoder
            .expect_spawn()
            .withf(|req| req.source_url == "http://x/a.m3u8")
            .times(1)
            .returning(|req| {
                write_segments(req, 6);
                command("sleep", &["30"])
            });
        let (dir, supervisor) = supervisor(transcoder);

        let id = supervisor.start_stream("Channel A", "http://x/a.m3u8").unwrap();
        assert!(supervisor.registry().contains(&id));
        assert_eq!(segment_count(&dir, &id), 6);

        let handle = supervisor.cleanup(&id).expect("job was registered");
        tokio::time::timeout(Duration::from_secs(10), handle)
            .await
            .expect("observer finished")
            .unwrap();

        assert!(!supervisor.registry().contains(&id));
        assert_eq!(segment_count(&dir, &id), 0);
        for i in 0..6 {
            assert!(!dir.path().join(format!("{}_{:03}.ts", id, i)).exists());
        }
    }

    #[tokio::test]
    async fn test_cleanup_is_idempotent() {
        let mut transcoder = MockTranscoderPort::new();
        transcoder
            .expect_spawn()
            .returning(|_| command("sleep", &["30"]));
        let (_dir, supervisor) = supervisor(transcoder);

        let id = supervisor.start_stream("A", "http://x/a.m3u8").unwrap();
        let first = supervisor.cleanup(&id);
        let second = supervisor.cleanup(&id);
        assert!(first.is_some());
        assert!(second.is_none());
        assert!(supervisor.cleanup(&StreamId::from("stream_0_never")).is_none());

        first.unwrap().await.unwrap();
        assert!(supervisor.registry().is_empty());
    }

    #[tokio::test]
    async fn test_spawn_failure_registers_nothing() {
        let mut transcoder = MockTranscoderPort::new();
        transcoder
            .expect_spawn()
            .returning(|_| Err(io::Error::new(io::ErrorKind::NotFound, "ffmpeg not found")));
        transcoder.expect_name().returning(|| "ffmpeg".to_string());
        let (_dir, supervisor) = supervisor(transcoder);

        let err = supervisor.start_stream("A", "http://x/a.m3u8").unwrap_err();
        assert!(matches!(err, RestreamError::Spawn { ref binary, .. } if binary == "ffmpeg"));
        assert!(supervisor.registry().is_empty());
    }

    #[tokio::test]
    async fn test_process_exit_triggers_cleanup() {
        let mut transcoder = MockTranscoderPort::new();
        transcoder.expect_spawn().returning(|req| {
            write_segments(req, 3);
            command("sh", &["-c", "exit 3"])
        });
        let (dir, supervisor) = supervisor(transcoder);

        let id = supervisor.start_stream("A", "http://x/dead.m3u8").unwrap();

        let deadline = Instant::now() + Duration::from_secs(10);
        while supervisor.registry().contains(&id) && Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(!supervisor.registry().contains(&id));

        supervisor.shutdown().await;
        assert_eq!(segment_count(&dir, &id), 0);
    }

    #[tokio::test]
    async fn test_wait_ready() {
        let mut transcoder = MockTranscoderPort::new();
        let mut seq = mockall::Sequence::new();
        transcoder
            .expect_spawn()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|req| {
                std::fs::write(&req.output_path, "#EXTM3U\n").unwrap();
                command("sleep", &["30"])
            });
        transcoder
            .expect_spawn()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| command("sleep", &["30"]));
        transcoder
            .expect_spawn()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| command("true", &[]));
        let (_dir, supervisor) = supervisor(transcoder);

        let ready = supervisor.start_stream("ready", "http://x/1.m3u8").unwrap();
        assert_eq!(
            supervisor.wait_ready(&ready, Duration::from_secs(2)).await,
            Readiness::Ready
        );

        let silent = supervisor.start_stream("silent", "http://x/2.m3u8").unwrap();
        assert_eq!(
            supervisor.wait_ready(&silent, Duration::from_millis(300)).await,
            Readiness::Alive
        );

        let dead = supervisor.start_stream("dead", "http://x/3.m3u8").unwrap();
        assert_eq!(
            supervisor.wait_ready(&dead, Duration::from_secs(10)).await,
            Readiness::Exited
        );

        supervisor.shutdown().await;
        assert!(supervisor.registry().is_empty());
    }

    #[tokio::test]
    async fn test_cleanup_all_empties_registry() {
        let mut transcoder = MockTranscoderPort::new();
        transcoder
            .expect_spawn()
            .times(3)
            .returning(|_| command("sleep", &["30"]));
        let (_dir, supervisor) = supervisor(transcoder);

        for i in 0..3 {
            supervisor
                .start_stream(&format!("ch{}", i), "http://x/same.m3u8")
                .unwrap();
        }
        assert_eq!(supervisor.registry().len(), 3);

        let handles = supervisor.cleanup_all();
        assert_eq!(handles.len(), 3);
        assert!(supervisor.registry().is_empty());
        futures::future::join_all(handles).await;
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<parking_lot::Mutex<Vec<(tracing::Level, String)>>>);

    impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for Captured {
        fn on_event(
            &self,
            event: &tracing::Event<'_>,
            _ctx: tracing_subscriber::layer::Context<'_, S>,
        ) {
            let mut message = String::new();
            event.record(
                &mut |field: &tracing::field::Field, value: &dyn std::fmt::Debug| {
                    if field.name() == "message" {
                        message = format!("{:?}", value);
                    }
                },
            );
            self.0.lock().push((*event.metadata().level(), message));
        }
    }

    #[tokio::test]
    async fn test_stderr_is_logged_at_warn() {
        use tracing_subscriber::layer::SubscriberExt;

        let captured = Captured::default();
        let _guard =
            tracing::subscriber::set_default(tracing_subscriber::registry().with(captured.clone()));

        let mut child = command("sh", &["-c", "echo 'Connection refused' >&2"]).unwrap();
        let stderr = child.stderr.take().unwrap();
        forward_stderr(StreamId::from("stream_1_abcde"), stderr).await;
        child.wait().await.unwrap();

        let events = captured.0.lock().clone();
        assert!(events
            .iter()
            .any(|(level, message)| *level == tracing::Level::WARN
                && message == "ffmpeg: Connection refused"));
    }
}
