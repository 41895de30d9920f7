//! Byte sources feeding the aggregator.
//!
//! A [`ByteSource`] yields the raw telemetry stream in arbitrary chunks.
//! Chunk boundaries carry no meaning; frames may be split across them.

use std::collections::VecDeque;
use std::process::Stdio;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::{Child, ChildStdout, Command};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// Bytes requested from the child per read.
const READ_CHUNK: usize = 4096;

/// A stream of raw telemetry bytes.
#[async_trait]
pub trait ByteSource: Send {
    /// Wait for the next chunk.
    ///
    /// Returns `Ok(None)` once the source has ended cleanly.
    async fn next_chunk(&mut self) -> Result<Option<Bytes>>;
}

/// Reads the stdout of a measuring process.
///
/// The child is killed when the source is dropped. Its stderr is forwarded
/// line by line to the log.
#[derive(Debug)]
pub struct ProcessSource {
    command: String,
    child: Child,
    stdout: ChildStdout,
    buf: BytesMut,
    stderr_task: Option<JoinHandle<()>>,
}

impl ProcessSource {
    /// Spawn `command` with `args`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<I, S>(command: &str, args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<std::ffi::OsStr>,
    {
        let mut child = Command::new(command)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| Error::Spawn {
                command: command.to_string(),
                source,
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::MissingStdout(command.to_string()))?;

        let stderr_task = child.stderr.take().map(|stderr| {
            let command = command.to_string();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    warn!(command = %command, "stderr: {}", line);
                }
            })
        });

        info!(command, pid = ?child.id(), "Started measuring process");

        Ok(Self {
            command: command.to_string(),
            child,
            stdout,
            buf: BytesMut::with_capacity(READ_CHUNK),
            stderr_task,
        })
    }

    /// The command this source runs.
    pub fn command(&self) -> &str {
        &self.command
    }
}

#[async_trait]
impl ByteSource for ProcessSource {
    async fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        self.buf.reserve(READ_CHUNK);
        let n = self.stdout.read_buf(&mut self.buf).await?;
        if n > 0 {
            return Ok(Some(self.buf.split().freeze()));
        }

        let status = self.child.wait().await?;
        if let Some(task) = self.stderr_task.take() {
            // stderr closes with the process; let the last lines drain.
            let _ = task.await;
        }
        debug!(command = %self.command, %status, "Measuring process exited");

        if status.success() {
            Ok(None)
        } else {
            Err(Error::SourceExited {
                command: self.command.clone(),
                code: status.code(),
            })
        }
    }
}

/// Replays a fixed list of chunks, then ends.
#[derive(Debug, Clone, Default)]
pub struct ReplaySource {
    chunks: VecDeque<Bytes>,
}

impl ReplaySource {
    /// Create a source yielding `chunks` in order.
    pub fn new<I, B>(chunks: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        Self {
            chunks: chunks.into_iter().map(Into::into).collect(),
        }
    }

    /// Number of chunks not yet yielded.
    pub fn remaining(&self) -> usize {
        self.chunks.len()
    }
}

#[async_trait]
impl ByteSource for ReplaySource {
    async fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        Ok(self.chunks.pop_front())
    }
}
