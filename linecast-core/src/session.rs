//! Capture session and connection state machine
//!
//! The session owns the single live connection and the incremental cache.
//! Host events are fed in as [`Trigger`]s; each one runs the whole
//! build → encode → write sequence and returns only when it has completed
//! or failed.
//!
//! ```text
//!                connect() ok
//!  Disconnected ─────────────▶ Connected ──┐ handle(trigger)
//!       ▲                          │  ▲    │
//!       │   close() / send error   │  └────┘
//!       └──────────────────────────┘
//! ```

use std::io;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use crate::builder::FrameBuilder;
use crate::cache::ObjectCache;
use crate::codec::{gpla, json, Protocol, CLOSE_SENTINEL};
use crate::config::SessionConfig;
use crate::error::{LinecastError, Result};
use crate::source::GeometrySource;
use crate::types::Frame;

/// Byte sink the session writes to (socket, file, or test double)
type Sink = Box<dyn AsyncWrite + Unpin + Send>;

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No transport
    Disconnected,
    /// Transport open, host events are captured and sent
    Connected,
}

/// Why a capture was requested
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Immediate send right after connecting
    Connect,
    /// Host timeline is about to change frame
    FrameChange,
    /// Host scene graph changed
    SceneUpdate,
    /// Explicit user resend
    Manual,
}

impl Trigger {
    /// Host events may fire twice for one logical frame
    fn is_host_event(&self) -> bool {
        matches!(self, Self::FrameChange | Self::SceneUpdate)
    }
}

impl std::fmt::Display for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connect => write!(f, "connect"),
            Self::FrameChange => write!(f, "frame-change"),
            Self::SceneUpdate => write!(f, "scene-update"),
            Self::Manual => write!(f, "manual"),
        }
    }
}

/// Result of one trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Frame written to the transport
    Sent { bytes: usize },
    /// Same frame as the last successful send; nothing written
    Unchanged,
    /// Session is disconnected; nothing captured
    NotConnected,
}

/// Running counters for a session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Frames written successfully
    pub frames_sent: u64,
    /// Duplicate host events skipped
    pub frames_skipped: u64,
    /// Writes that failed and tore the connection down
    pub send_failures: u64,
    /// Payload bytes written, close sentinels excluded
    pub bytes_written: u64,
}

struct Connection {
    sink: Sink,
    port: Option<u16>,
}

async fn write_message(sink: &mut Sink, bytes: &[u8]) -> io::Result<()> {
    sink.write_all(bytes).await?;
    sink.flush().await
}

/// Capture-and-send session
pub struct Session {
    config: SessionConfig,
    builder: FrameBuilder,
    connection: Option<Connection>,
    cache: ObjectCache,
    last_sent: Option<Frame>,
    stats: SessionStats,
    shut_down: bool,
}

impl Session {
    /// Create a disconnected session
    pub fn new(config: SessionConfig) -> Self {
        let builder = FrameBuilder::new(config.focal_scale);
        Self {
            config,
            builder,
            connection: None,
            cache: ObjectCache::new(),
            last_sent: None,
            stats: SessionStats::default(),
            shut_down: false,
        }
    }

    /// Current state
    pub fn state(&self) -> SessionState {
        if self.connection.is_some() {
            SessionState::Connected
        } else {
            SessionState::Disconnected
        }
    }

    /// Whether a transport is open
    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Port of the live connection, if it was opened by [`Session::connect`]
    pub fn port(&self) -> Option<u16> {
        self.connection.as_ref().and_then(|c| c.port)
    }

    /// Session configuration
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Incremental cache for the current connection
    pub fn cache(&self) -> &ObjectCache {
        &self.cache
    }

    /// Running counters
    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// Connect to the configured consumer and send the current frame
    ///
    /// A no-op while already connected. Any error leaves the session
    /// disconnected: an unreachable consumer gives
    /// [`LinecastError::Connection`], and a failed first capture (no camera,
    /// degenerate camera) closes the fresh connection and returns that
    /// error. Nothing is retried.
    pub async fn connect(&mut self, source: &dyn GeometrySource) -> Result<()> {
        if self.connection.is_some() {
            debug!("Already connected, ignoring connect");
            return Ok(());
        }
        self.ensure_open()?;

        let address = self.config.address();
        let stream = match tokio::time::timeout(self.config.connect_timeout, TcpStream::connect(&address)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                let err = LinecastError::connection(format!("Failed to connect to {}: {}", address, e));
                warn!("{}", err);
                return Err(err);
            }
            Err(_) => {
                let err = LinecastError::connection(format!(
                    "Timed out connecting to {} after {:?}",
                    address, self.config.connect_timeout
                ));
                warn!("{}", err);
                return Err(err);
            }
        };

        if let Err(e) = stream.set_nodelay(true) {
            debug!("Could not disable Nagle on consumer socket: {}", e);
        }

        info!("Connected to consumer at {}", address);
        let port = self.config.port;
        self.open(Box::new(stream), Some(port), source).await
    }

    /// Use an already-open byte sink (a file, a pipe) as the transport
    ///
    /// Behaves like [`Session::connect`] after the transport is established.
    pub async fn attach<W>(&mut self, sink: W, source: &dyn GeometrySource) -> Result<()>
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        if self.connection.is_some() {
            debug!("Already connected, ignoring attach");
            return Ok(());
        }
        self.ensure_open()?;
        self.open(Box::new(sink), None, source).await
    }

    fn ensure_open(&self) -> Result<()> {
        if self.shut_down {
            return Err(LinecastError::connection("session has been shut down"));
        }
        Ok(())
    }

    async fn open(&mut self, sink: Sink, port: Option<u16>, source: &dyn GeometrySource) -> Result<()> {
        self.connection = Some(Connection { sink, port });
        // the remote end starts with no state
        self.cache.clear();
        self.last_sent = None;

        if let Err(e) = self.capture_and_send(Trigger::Connect, source).await {
            warn!("Initial frame not sent, closing connection: {}", e);
            self.close().await;
            return Err(e);
        }
        Ok(())
    }

    /// React to a host event
    ///
    /// Does nothing while disconnected. A precondition failure (no camera,
    /// degenerate camera) sends nothing and keeps the connection; a
    /// transport failure tears the connection down.
    pub async fn handle(&mut self, trigger: Trigger, source: &dyn GeometrySource) -> Result<SendOutcome> {
        if self.connection.is_none() {
            return Ok(SendOutcome::NotConnected);
        }
        self.capture_and_send(trigger, source).await
    }

    async fn capture_and_send(&mut self, trigger: Trigger, source: &dyn GeometrySource) -> Result<SendOutcome> {
        let frame = self.builder.build(source)?;

        if trigger.is_host_event() && self.last_sent.as_ref() == Some(&frame) {
            debug!("Skipping {} trigger, frame unchanged", trigger);
            self.stats.frames_skipped += 1;
            return Ok(SendOutcome::Unchanged);
        }

        let (payload, committed) = match self.config.protocol {
            Protocol::Json => {
                let line = json::encode_line(&frame, self.config.json_schema, &mut self.cache)?;
                (line.bytes, line.committed)
            }
            Protocol::Gpla => (gpla::encode_snapshot_line(&frame, source.frame_rate()), Vec::new()),
        };

        let Some(connection) = self.connection.as_mut() else {
            self.cache.rollback(&committed);
            return Ok(SendOutcome::NotConnected);
        };

        let written = write_message(&mut connection.sink, &payload).await;
        if let Err(e) = written {
            self.cache.rollback(&committed);
            self.connection = None;
            self.last_sent = None;
            self.stats.send_failures += 1;
            let err = LinecastError::transport(format!("Failed to send {} frame: {}", trigger, e));
            warn!("{}, disconnected", err);
            return Err(err);
        }

        self.stats.frames_sent += 1;
        self.stats.bytes_written += payload.len() as u64;
        self.last_sent = Some(frame);
        debug!("Sent {} byte {} frame ({})", payload.len(), self.config.protocol, trigger);
        Ok(SendOutcome::Sent { bytes: payload.len() })
    }

    /// Send the close sentinel best-effort and release the transport
    ///
    /// Errors while sending the sentinel are logged, never returned; the
    /// session ends up disconnected either way.
    pub async fn close(&mut self) {
        let Some(mut connection) = self.connection.take() else {
            return;
        };

        if let Err(e) = write_message(&mut connection.sink, CLOSE_SENTINEL).await {
            warn!("Failed to send close sentinel (ignored): {}", e);
        }
        if let Err(e) = connection.sink.shutdown().await {
            debug!("Transport shutdown failed (ignored): {}", e);
        }

        self.last_sent = None;
        info!("Connection closed");
    }

    /// Process exit path; runs [`Session::close`] at most once
    pub async fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        self.close().await;
        info!(
            "Session finished: {} frames sent, {} skipped, {} failures",
            self.stats.frames_sent, self.stats.frames_skipped, self.stats.send_failures
        );
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.connection.is_some() {
            warn!("Session dropped while connected; close sentinel not sent");
        }
    }
}
