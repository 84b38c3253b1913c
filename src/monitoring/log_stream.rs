//! Container log streams
//!
//! A log source is not a snapshot: `open` hands back a lazy line stream that ends when
//! the container stops or the connection drops. Streams cannot be rewound; callers
//! reconnect by calling `open` again.

use crate::utils::SourceError;
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, info, instrument};

/// Stream of raw log lines
pub type LineStream = BoxStream<'static, Result<String, SourceError>>;

/// Produces a fresh log stream on every `open`
#[async_trait]
pub trait LogSource: Send + Sync {
    /// Human-readable source name (container name)
    fn name(&self) -> &str;

    /// Start following the log. `SourceError::Unavailable` means "try again later".
    async fn open(&self) -> Result<LineStream, SourceError>;
}

/// Follows `docker logs` for a named container
#[derive(Debug, Clone)]
pub struct DockerLogSource {
    container: String,
    docker_bin: String,
}

impl DockerLogSource {
    pub fn new(container: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            docker_bin: "docker".to_string(),
        }
    }

    /// Use a different docker executable
    pub fn with_docker_bin(mut self, docker_bin: impl Into<String>) -> Self {
        self.docker_bin = docker_bin.into();
        self
    }

    fn unavailable(&self, reason: impl Into<String>) -> SourceError {
        SourceError::Unavailable {
            source_name: self.container.clone(),
            reason: reason.into(),
        }
    }

    /// Fails with `Unavailable` if no container with this name exists
    async fn ensure_exists(&self) -> Result<(), SourceError> {
        let output = Command::new(&self.docker_bin)
            .args([
                "inspect",
                "--type",
                "container",
                "--format",
                "{{.State.Status}}",
                self.container.as_str(),
            ])
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| self.unavailable(format!("failed to run {}: {}", self.docker_bin, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(self.unavailable(stderr.trim()));
        }

        debug!(
            container = %self.container,
            state = %String::from_utf8_lossy(&output.stdout).trim(),
            "Container found"
        );
        Ok(())
    }
}

#[async_trait]
impl LogSource for DockerLogSource {
    fn name(&self) -> &str {
        &self.container
    }

    #[instrument(skip(self), fields(container = %self.container))]
    async fn open(&self) -> Result<LineStream, SourceError> {
        self.ensure_exists().await?;

        let mut child = Command::new(&self.docker_bin)
            .args(["logs", "--follow", "--tail", "0", self.container.as_str()])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.unavailable(format!("failed to start docker logs: {}", e)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| SourceError::Io("docker logs stdout was not captured".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| SourceError::Io("docker logs stderr was not captured".to_string()))?;

        info!("Following container logs");

        // The child moves into the stream so `docker logs` is killed when the stream is dropped.
        let merged = stream::select(read_lines(stdout), read_lines(stderr)).map(move |line| {
            let _child = &child;
            line
        });

        Ok(merged.boxed())
    }
}

/// Lines of `reader` until EOF.
///
/// Invalid UTF-8 is replaced rather than treated as an error. An I/O error is yielded
/// once and ends the stream.
pub fn read_lines<R>(reader: R) -> impl futures::Stream<Item = Result<String, SourceError>> + Send
where
    R: AsyncRead + Unpin + Send + 'static,
{
    stream::unfold(Some(BufReader::new(reader)), |state| async move {
        let Some(mut reader) = state else {
            return None;
        };
        let mut buf = Vec::new();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => None,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                let line = line.trim_end_matches('\n').trim_end_matches('\r').to_string();
                Some((Ok(line), Some(reader)))
            }
            Err(e) => Some((Err(SourceError::from(e)), None)),
        }
    })
}
