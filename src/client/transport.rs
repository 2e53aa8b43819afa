//! Frame transport for one connection.
//!
//! The transport owns both halves of the socket. Writers are serialized by an
//! async mutex so every frame goes out whole. A single read task decodes
//! inbound frames and hands each one to the first pending handler that
//! accepts it.
//!
//! Handlers are registered inside the write critical section before the
//! frame is flushed. The read task never takes the write lock, so a reply can
//! never arrive ahead of its handler.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use futures::SinkExt;
use parking_lot::Mutex;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, trace, warn};

use super::error::{ClientError, ClientResult};
use super::handler::{PendingHandler, PromiseHandler};
use super::promise::Promise;
use crate::bee::{BeeError, Frame, FrameCodec, Message};

type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Socket established, handshake not yet accepted
    Connecting,
    /// Handshake accepted
    Open,
    /// Closed locally or by the peer; never reopens
    Closed,
}

struct Registry {
    state: ConnectionState,
    handlers: VecDeque<Arc<dyn PendingHandler>>,
}

struct Shared {
    registry: Mutex<Registry>,
}

impl Shared {
    fn register(&self, handler: Arc<dyn PendingHandler>) -> ClientResult<()> {
        let mut registry = self.registry.lock();
        if registry.state == ConnectionState::Closed {
            drop(registry);
            handler.abandon(ClientError::ConnectionClosed);
            return Err(ClientError::ConnectionClosed);
        }
        registry.handlers.push_back(handler);
        Ok(())
    }

    /// Put a multi-frame handler back at the head of the queue.
    fn requeue(&self, handler: Arc<dyn PendingHandler>) {
        let mut registry = self.registry.lock();
        if registry.state == ConnectionState::Closed {
            drop(registry);
            handler.abandon(ClientError::ConnectionClosed);
            return;
        }
        registry.handlers.push_front(handler);
    }

    /// Remove the oldest handler that accepts `frame`.
    fn take_match(&self, frame: &Frame) -> Option<Arc<dyn PendingHandler>> {
        let mut registry = self.registry.lock();
        let index = registry.handlers.iter().position(|h| {
            h.frame_type() == frame.frame_type && h.is_candidate(&frame.payload)
        })?;
        registry.handlers.remove(index)
    }

    /// Hand `frame` to the oldest pending handler that accepts it.
    async fn dispatch(&self, frame: Frame) {
        let handler = match self.take_match(&frame) {
            Some(handler) => handler,
            None => {
                debug!(
                    frame_type = frame.frame_type,
                    len = frame.payload.len(),
                    "discarding frame with no pending handler"
                );
                return;
            }
        };

        trace!(frame_type = frame.frame_type, len = frame.payload.len(), "dispatching frame");
        handler.decode(frame.payload).await;
        handler.on_complete();
        if handler.is_multi_frame() && !handler.is_terminal() {
            self.requeue(handler);
        }
    }

    /// Mark the connection closed and fail every pending handler.
    ///
    /// Returns `false` if it was already closed.
    fn shutdown(&self) -> bool {
        let drained = {
            let mut registry = self.registry.lock();
            if registry.state == ConnectionState::Closed {
                return false;
            }
            registry.state = ConnectionState::Closed;
            std::mem::take(&mut registry.handlers)
        };

        if !drained.is_empty() {
            debug!(pending = drained.len(), "failing pending handlers");
        }
        for handler in drained {
            handler.abandon(ClientError::ConnectionClosed);
        }
        true
    }
}

async fn read_loop<R>(shared: Arc<Shared>, mut frames: FramedRead<R, FrameCodec>)
where
    R: AsyncRead + Unpin,
{
    loop {
        match frames.next().await {
            Some(Ok(frame)) => shared.dispatch(frame).await,
            Some(Err(err)) => {
                warn!(error = %err, "read failed, closing connection");
                break;
            }
            None => {
                debug!("connection closed by peer");
                break;
            }
        }
    }
    shared.shutdown();
}

// ============================================================================
// Transport
// ============================================================================

/// Serialized writer plus demultiplexing reader over one byte stream.
pub struct Transport {
    shared: Arc<Shared>,
    writer: tokio::sync::Mutex<FramedWrite<BoxedWriter, FrameCodec>>,
    read_task: Mutex<Option<JoinHandle<()>>>,
    max_frame_size: usize,
}

impl Transport {
    /// Start a transport over a reader and writer pair.
    ///
    /// Spawns the read task, so this must run inside a Tokio runtime.
    pub fn new<R, W>(reader: R, writer: W, max_frame_size: usize) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let shared = Arc::new(Shared {
            registry: Mutex::new(Registry {
                state: ConnectionState::Connecting,
                handlers: VecDeque::new(),
            }),
        });

        let codec = FrameCodec::with_max_size(max_frame_size);
        let max_frame_size = codec.max_frame_size();
        let frames = FramedRead::new(reader, codec);
        let read_task = tokio::spawn(read_loop(Arc::clone(&shared), frames));

        let writer: BoxedWriter = Box::new(writer);
        Self {
            shared,
            writer: tokio::sync::Mutex::new(FramedWrite::new(
                writer,
                FrameCodec::with_max_size(max_frame_size),
            )),
            read_task: Mutex::new(Some(read_task)),
            max_frame_size,
        }
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.shared.registry.lock().state
    }

    /// Check if the connection is closed.
    pub fn is_closed(&self) -> bool {
        self.state() == ConnectionState::Closed
    }

    /// Move from `Connecting` to `Open`.
    pub fn mark_open(&self) {
        let mut registry = self.shared.registry.lock();
        if registry.state == ConnectionState::Connecting {
            registry.state = ConnectionState::Open;
        }
    }

    /// Number of handlers waiting for frames.
    pub fn pending_count(&self) -> usize {
        self.shared.registry.lock().handlers.len()
    }

    /// Write one frame, registering `handler` for its reply first.
    ///
    /// A write failure closes the connection.
    pub async fn send(
        &self,
        frame: Frame,
        handler: Option<Arc<dyn PendingHandler>>,
    ) -> ClientResult<()> {
        if frame.payload.len() > self.max_frame_size {
            return Err(BeeError::FrameTooLarge {
                size: frame.payload.len(),
                max: self.max_frame_size,
            }
            .into());
        }

        let mut writer = self.writer.lock().await;
        match handler {
            Some(handler) => self.shared.register(handler)?,
            None if self.is_closed() => return Err(ClientError::ConnectionClosed),
            None => {}
        }

        let frame_type = frame.frame_type;
        if let Err(err) = writer.send(frame).await {
            drop(writer);
            warn!(frame_type, error = %err, "write failed, closing connection");
            self.fail();
            return Err(err.into());
        }
        trace!(frame_type, "frame written");
        Ok(())
    }

    /// Send a single-reply request and wait up to `timeout` for the reply.
    pub async fn request<Q, R>(&self, request: &Q, timeout: Duration) -> ClientResult<R>
    where
        Q: Message,
        R: Message + Clone + Send + Sync + 'static,
    {
        let frame = request.to_frame()?;
        let promise = Promise::new();
        let handler: Arc<dyn PendingHandler> = Arc::new(PromiseHandler::<R>::new(promise.clone()));

        // Unregisters on every exit, including cancellation.
        let _registered = Registered {
            transport: self,
            handler: Arc::clone(&handler),
        };
        self.send(frame, Some(handler)).await?;
        promise.wait_timeout(timeout).await
    }

    /// Drop a handler that no longer expects a reply.
    fn remove(&self, handler: &Arc<dyn PendingHandler>) {
        let target = Arc::as_ptr(handler) as *const ();
        self.shared
            .registry
            .lock()
            .handlers
            .retain(|h| Arc::as_ptr(h) as *const () != target);
    }

    fn fail(&self) {
        self.shared.shutdown();
        if let Some(task) = self.read_task.lock().take() {
            task.abort();
        }
    }

    /// Close the connection. Pending handlers fail with
    /// [`ClientError::ConnectionClosed`]. Calling it again does nothing.
    pub async fn close(&self) {
        if self.shared.shutdown() {
            debug!("closing connection");
        }
        if let Some(task) = self.read_task.lock().take() {
            task.abort();
        }

        let mut writer = self.writer.lock().await;
        if let Err(err) = writer.get_mut().shutdown().await {
            trace!(error = %err, "socket shutdown failed");
        }
    }
}

/// Unregisters a single-reply handler when dropped.
struct Registered<'a> {
    transport: &'a Transport,
    handler: Arc<dyn PendingHandler>,
}

impl Drop for Registered<'_> {
    fn drop(&mut self) {
        self.transport.remove(&self.handler);
    }
}

impl Drop for Transport {
    fn drop(&mut self) {
        self.fail();
    }
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("state", &self.state())
            .field("pending", &self.pending_count())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
