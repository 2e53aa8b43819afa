//! Bee connection.
//!
//! A [`Connection`] owns one socket for its whole life. It never reconnects:
//! once closed, every call fails with [`ClientError::ConnectionClosed`].

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::config::ConnectionConfig;
use super::error::{ClientError, ClientResult};
use super::response::{statement_channel, StreamingResponse};
use super::transport::{ConnectionState, Transport};
use crate::bee::{ConnectRequest, ConnectResponse, Message, PingRequest, StatementRequest};

/// Statement ids stay below this value and wrap to 0.
pub const STATEMENT_ID_LIMIT: u32 = 65535;

/// Client connection to a Bee server.
pub struct Connection {
    transport: Arc<Transport>,
    config: ConnectionConfig,
    statement_id: AtomicU32,
    keep_alive: Mutex<Option<JoinHandle<()>>>,
}

impl Connection {
    /// Open a TCP connection with default settings.
    ///
    /// No handshake is performed; call [`handshake`](Self::handshake) next.
    pub async fn open(host: &str, port: u16, connect_timeout: Duration) -> ClientResult<Self> {
        let config = ConnectionConfig::builder(host, port)
            .with_connect_timeout(connect_timeout)
            .build();
        Self::open_with(config).await
    }

    /// Open a TCP connection and perform the handshake.
    pub async fn connect(config: ConnectionConfig) -> ClientResult<Self> {
        let application = config.application.clone();
        let url = config.url.clone();
        let connection = Self::open_with(config).await?;
        connection.handshake(&application, &url).await?;
        Ok(connection)
    }

    async fn open_with(config: ConnectionConfig) -> ClientResult<Self> {
        let address = config.address();
        let stream = match tokio::time::timeout(config.connect_timeout, TcpStream::connect(&address))
            .await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                return Err(ClientError::connection(format!(
                    "Failed to connect to {}: {}",
                    address, e
                )))
            }
            Err(_) => {
                return Err(ClientError::connection(format!(
                    "Connect to {} timed out after {:?}",
                    address, config.connect_timeout
                )))
            }
        };
        stream.set_nodelay(true).ok();
        debug!(%address, "connected");

        let (reader, writer) = stream.into_split();
        Ok(Self::with_io(reader, writer, config))
    }

    /// Run a connection over an existing byte stream pair.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn with_io<R, W>(reader: R, writer: W, config: ConnectionConfig) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let transport = Transport::new(reader, writer, config.max_frame_size);
        Self {
            transport: Arc::new(transport),
            config,
            statement_id: AtomicU32::new(0),
            keep_alive: Mutex::new(None),
        }
    }

    /// Identify the client to the server.
    ///
    /// Fails with [`ClientError::Application`] when the server rejects it.
    pub async fn handshake(&self, application: &str, url: &str) -> ClientResult<()> {
        let request = ConnectRequest::new(url, application);
        let response: ConnectResponse = self
            .transport
            .request(&request, self.config.handshake_timeout())
            .await?;

        match response {
            ConnectResponse::Error(err) if err.code != 0 => {
                debug!(code = err.code, message = %err.message, "handshake rejected");
                Err(err.into())
            }
            _ => {
                self.transport.mark_open();
                debug!(application, url, "handshake accepted");
                self.start_keep_alive();
                Ok(())
            }
        }
    }

    /// Submit a statement; rows stream into the returned response.
    ///
    /// `timeout_secs` is sent to the server and bounds the waits on the
    /// response. Zero uses the configured statement timeout for the waits.
    pub async fn submit_statement(
        &self,
        id: u16,
        script: &str,
        timeout_secs: u32,
    ) -> ClientResult<StreamingResponse> {
        let wait = if timeout_secs == 0 {
            self.config.statement_timeout
        } else {
            Duration::from_secs(u64::from(timeout_secs))
        };

        let request = StatementRequest::new(u32::from(id), script, timeout_secs);
        let frame = request.to_frame()?;
        let (handler, response) =
            statement_channel(u32::from(id), self.config.row_buffer_capacity, wait);
        self.transport.send(frame, Some(Arc::new(handler))).await?;
        debug!(id, "statement submitted");
        Ok(response)
    }

    /// Submit a statement with the next statement id and configured timeout.
    pub async fn execute(&self, script: &str) -> ClientResult<StreamingResponse> {
        let id = self.next_statement_id();
        self.submit_statement(id, script, self.config.statement_timeout_secs())
            .await
    }

    /// Allocate a statement id: 1, 2, ..., 65534, then 0 and up again.
    pub fn next_statement_id(&self) -> u16 {
        let advance = |id: u32| {
            let next = id + 1;
            if next >= STATEMENT_ID_LIMIT {
                0
            } else {
                next
            }
        };
        let previous = self
            .statement_id
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |id| Some(advance(id)))
            .unwrap_or_else(|id| id);
        advance(previous) as u16
    }

    /// Send a keepalive ping. The server does not reply.
    pub async fn ping(&self) -> ClientResult<()> {
        send_ping(&self.transport).await
    }

    fn start_keep_alive(&self) {
        let interval = match self.config.keep_alive_interval {
            Some(interval) if !interval.is_zero() => interval,
            _ => return,
        };

        let transport = Arc::downgrade(&self.transport);
        let task = tokio::spawn(keep_alive(transport, interval));
        if let Some(previous) = self.keep_alive.lock().replace(task) {
            previous.abort();
        }
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.transport.state()
    }

    /// Check if the connection is closed.
    pub fn is_closed(&self) -> bool {
        self.transport.is_closed()
    }

    /// Connection settings.
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Close the connection and fail all outstanding statements.
    pub async fn close(&self) {
        if let Some(task) = self.keep_alive.lock().take() {
            task.abort();
        }
        self.transport.close().await;
    }
}

async fn keep_alive(transport: Weak<Transport>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.tick().await;
    loop {
        ticker.tick().await;
        let transport = match transport.upgrade() {
            Some(transport) => transport,
            None => return,
        };
        if transport.is_closed() {
            return;
        }
        if let Err(err) = send_ping(&transport).await {
            warn!(error = %err, "keepalive ping failed");
            return;
        }
    }
}

/// Send one ping frame; no reply is expected.
async fn send_ping(transport: &Transport) -> ClientResult<()> {
    transport.send(PingRequest.to_frame()?, None).await
}

impl Drop for Connection {
    fn drop(&mut self) {
        if let Some(task) = self.keep_alive.lock().take() {
            task.abort();
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("address", &self.config.address())
            .field("state", &self.state())
            .finish()
    }
}
