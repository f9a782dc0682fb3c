//! Line-delimited transports.
//!
//! `LineTransport` speaks newline-delimited JSON over any async reader/writer pair.
//! `StdioTransport` wraps it around a spawned server process and owns that process's lifecycle.

use std::{
    collections::VecDeque,
    ffi::OsStr,
    process::{ExitStatus, Stdio},
    sync::Arc,
    time::Duration,
};

use async_trait::async_trait;
use serde::Serialize;
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader},
    process::{Child, ChildStderr, ChildStdin, ChildStdout, Command},
    sync::Mutex,
    task::JoinHandle,
    time::Instant,
};
use tracing::{debug, info, warn};

use crate::client::envelope::{JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};
use crate::client::error::ClientError;
use crate::client::Transport;

const STDERR_TAIL_BYTES: usize = 8 * 1024;
const EXIT_PROBE: Duration = Duration::from_millis(500);

pub struct LineTransport<R, W> {
    reader: R,
    writer: W,
    timeout: Duration,
    /// Bytes of a line whose read was cut short by a timeout.
    pending: Vec<u8>,
}

impl<R, W> LineTransport<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(reader: R, writer: W, timeout: Duration) -> Self {
        Self {
            reader,
            writer,
            timeout,
            pending: Vec::new(),
        }
    }

    pub fn into_parts(self) -> (R, W) {
        (self.reader, self.writer)
    }

    async fn write_line<T: Serialize>(&mut self, message: &T) -> Result<(), ClientError> {
        let mut encoded = serde_json::to_vec(message)
            .map_err(|err| ClientError::Transport(format!("failed to encode message: {err}")))?;
        encoded.push(b'\n');
        self.writer.write_all(&encoded).await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Reads the next non-blank line before `deadline`.
    ///
    /// `read_until` appends into `pending`, so a line interrupted by the deadline is
    /// completed by the next call instead of being lost.
    async fn read_line(&mut self, deadline: Instant, method: &str) -> Result<String, ClientError> {
        let timeout = self.timeout;
        loop {
            let read = tokio::time::timeout_at(
                deadline,
                self.reader.read_until(b'\n', &mut self.pending),
            )
            .await
            .map_err(|_| ClientError::Timeout {
                method: method.to_string(),
                timeout,
            })??;

            if read == 0 {
                return Err(ClientError::ConnectionClosed);
            }
            if self.pending.last() != Some(&b'\n') {
                continue;
            }

            let line = std::mem::take(&mut self.pending);
            let trimmed = String::from_utf8_lossy(&line).trim().to_string();
            if !trimmed.is_empty() {
                return Ok(trimmed);
            }
        }
    }
}

#[async_trait]
impl<R, W> Transport for LineTransport<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    /// Replies to earlier, abandoned requests are skipped while waiting for this one.
    async fn exchange(&mut self, request: &JsonRpcRequest) -> Result<JsonRpcResponse, ClientError> {
        self.write_line(request).await?;
        let deadline = Instant::now() + self.timeout;

        loop {
            let line = self.read_line(deadline, &request.method).await?;
            let response: JsonRpcResponse = serde_json::from_str(&line).map_err(|err| {
                warn!(method = %request.method, raw = %line, "undecodable response line");
                ClientError::MalformedResponse(err)
            })?;

            if response.precedes(request.id) {
                debug!(id = %response.id, awaiting = request.id, "discarding late response");
                continue;
            }
            return Ok(response);
        }
    }

    async fn notify(&mut self, notification: &JsonRpcNotification) -> Result<(), ClientError> {
        self.write_line(notification).await
    }
}

/// Rolling capture of the last few kilobytes a child wrote to stderr.
///
/// Draining continuously keeps a chatty server from blocking on a full pipe.
#[derive(Clone, Default)]
struct StderrTail {
    buffer: Arc<Mutex<VecDeque<u8>>>,
}

impl StderrTail {
    fn capture(stderr: ChildStderr) -> (Self, JoinHandle<()>) {
        let tail = Self::default();
        let buffer = Arc::clone(&tail.buffer);
        let task = tokio::spawn(async move {
            let mut stderr = stderr;
            let mut chunk = [0u8; 1024];
            loop {
                match stderr.read(&mut chunk).await {
                    Ok(0) | Err(_) => break,
                    Ok(read) => {
                        let mut buffer = buffer.lock().await;
                        buffer.extend(&chunk[..read]);
                        let overflow = buffer.len().saturating_sub(STDERR_TAIL_BYTES);
                        buffer.drain(..overflow);
                    }
                }
            }
        });
        (tail, task)
    }

    async fn snapshot(&self) -> String {
        let buffer = self.buffer.lock().await;
        let bytes = buffer.iter().copied().collect::<Vec<_>>();
        String::from_utf8_lossy(&bytes).trim().to_string()
    }
}

/// A server subprocess reached over its stdin/stdout.
///
/// The child is spawned with `kill_on_drop`, so it never outlives the transport.
pub struct StdioTransport {
    child: Child,
    lines: LineTransport<BufReader<ChildStdout>, ChildStdin>,
    stderr: StderrTail,
    stderr_task: Option<JoinHandle<()>>,
}

impl StdioTransport {
    pub fn spawn<I, S>(
        program: impl AsRef<OsStr>,
        args: I,
        timeout: Duration,
    ) -> Result<Self, ClientError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut command = Command::new(program);
        command.args(args);
        Self::from_command(command, timeout)
    }

    pub fn from_command(mut command: Command, timeout: Duration) -> Result<Self, ClientError> {
        let mut child = command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| ClientError::Transport(format!("failed to spawn server: {err}")))?;

        info!(pid = child.id(), "spawned MCP server process");

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ClientError::Transport("failed to capture server stdin".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ClientError::Transport("failed to capture server stdout".to_string()))?;
        let (stderr, stderr_task) = match child.stderr.take() {
            Some(stderr) => {
                let (tail, task) = StderrTail::capture(stderr);
                (tail, Some(task))
            }
            None => (StderrTail::default(), None),
        };

        Ok(Self {
            child,
            lines: LineTransport::new(BufReader::new(stdout), stdin, timeout),
            stderr,
            stderr_task,
        })
    }

    /// Replaces connection-level failures with `ProcessTerminated` when the child has exited.
    async fn diagnose(&mut self, err: ClientError) -> ClientError {
        let exited = match &err {
            ClientError::ConnectionClosed | ClientError::Io(_) => {
                tokio::time::timeout(EXIT_PROBE, self.child.wait())
                    .await
                    .ok()
                    .and_then(Result::ok)
            }
            ClientError::Timeout { .. } => self.child.try_wait().ok().flatten(),
            _ => None,
        };

        match exited {
            Some(status) => ClientError::ProcessTerminated {
                status: status.to_string(),
                stderr: self.collect_stderr().await,
            },
            None => err,
        }
    }

    async fn collect_stderr(&mut self) -> String {
        if let Some(task) = self.stderr_task.take() {
            let _ = tokio::time::timeout(EXIT_PROBE, task).await;
        }
        self.stderr.snapshot().await
    }

    /// Closes the server's stdin, waits up to `grace` for it to exit, then kills it.
    pub async fn shutdown(self, grace: Duration) -> Result<ExitStatus, ClientError> {
        let Self {
            mut child, lines, ..
        } = self;
        let (_stdout, stdin) = lines.into_parts();
        drop(stdin);

        match tokio::time::timeout(grace, child.wait()).await {
            Ok(status) => {
                let status = status?;
                info!(%status, "MCP server exited");
                Ok(status)
            }
            Err(_) => {
                warn!(grace_ms = grace.as_millis(), "MCP server ignored shutdown, killing");
                child.kill().await?;
                Ok(child.wait().await?)
            }
        }
    }
}

#[async_trait]
impl Transport for StdioTransport {
    async fn exchange(&mut self, request: &JsonRpcRequest) -> Result<JsonRpcResponse, ClientError> {
        debug!(method = %request.method, id = request.id, "stdio request");
        match self.lines.exchange(request).await {
            Ok(response) => Ok(response),
            Err(err) => Err(self.diagnose(err).await),
        }
    }

    async fn notify(&mut self, notification: &JsonRpcNotification) -> Result<(), ClientError> {
        match self.lines.notify(notification).await {
            Ok(()) => Ok(()),
            Err(err) => Err(self.diagnose(err).await),
        }
    }
}
