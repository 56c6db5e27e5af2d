//! Connection Handler Module
//!
//! This module handles individual client connections to tickstore.
//! Each client gets its own handler task that runs in a loop, accumulating
//! bytes until a complete message has arrived and then answering it.
//!
//! ## Connection Lifecycle
//!
//! ```text
//! 1. Client connects (TCP handshake)
//!        │
//!        ▼
//! 2. ConnectionHandler spawned
//!        │
//!        ▼
//! 3. ┌──────────────────────────────┐
//!    │      Main Loop               │
//!    │                              │
//!    │  ┌─────────────────────────┐ │
//!    │  │ Read bytes from socket  │ │  ACCUMULATING
//!    │  └───────────┬─────────────┘ │
//!    │              │ valid UTF-8  │
//!    │              │ ending in \n │
//!    │              ▼               │
//!    │  ┌─────────────────────────┐ │
//!    │  │ Take buffer, decode     │ │  READY
//!    │  └───────────┬─────────────┘ │
//!    │              │               │
//!    │              ▼               │
//!    │  ┌─────────────────────────┐ │
//!    │  │ Execute batch, respond  │ │  DISPATCHED
//!    │  └───────────┬─────────────┘ │
//!    │              │               │
//!    │              ▼               │
//!    │         [Loop back]          │
//!    └──────────────────────────────┘
//!        │
//!        ▼
//! 4. Client disconnects / transport error / buffer limit
//!        │
//!        ▼
//! 5. Handler task ends
//! ```
//!
//! ## Framing
//!
//! A message is complete exactly when the whole buffer is valid UTF-8 and
//! ends with `\n`, no matter how many command lines it holds. A multi-byte
//! character split across reads simply waits for its remaining bytes. Bytes
//! that never become valid UTF-8 are never answered; the connection sits in
//! the accumulating state until the client gives up or the buffer limit is
//! reached.

use crate::commands::CommandExecutor;
use crate::protocol::types::NEWLINE;
use crate::protocol::{decode, Response};
use bytes::BytesMut;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufWriter};
use tracing::{debug, error, info, trace, warn};

/// Default upper bound for a single buffered message (1 MiB)
pub const DEFAULT_MAX_BUFFER_SIZE: usize = 1024 * 1024;

/// Initial buffer capacity
const INITIAL_BUFFER_SIZE: usize = 4096;

/// Statistics for connection handling
#[derive(Debug, Default)]
pub struct ConnectionStats {
    /// Total number of connections accepted
    pub connections_accepted: AtomicU64,
    /// Currently active connections
    pub active_connections: AtomicU64,
    /// Total complete messages answered
    pub messages_processed: AtomicU64,
    /// Total commands executed
    pub commands_processed: AtomicU64,
    /// Total messages rejected with an `error` response
    pub protocol_errors: AtomicU64,
    /// Total bytes read
    pub bytes_read: AtomicU64,
    /// Total bytes written
    pub bytes_written: AtomicU64,
}

impl ConnectionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection_opened(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn message_processed(&self) {
        self.messages_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn commands_processed(&self, count: usize) {
        self.commands_processed
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn protocol_error(&self) {
        self.protocol_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn bytes_read(&self, count: usize) {
        self.bytes_read.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn bytes_written(&self, count: usize) {
        self.bytes_written
            .fetch_add(count as u64, Ordering::Relaxed);
    }
}

/// Returns the buffered text if it forms a complete message.
///
/// A message is complete when the buffer ends with `\n` and decodes as UTF-8
/// in full.
pub fn complete_message(buf: &[u8]) -> Option<&str> {
    if buf.last() != Some(&NEWLINE) {
        return None;
    }
    std::str::from_utf8(buf).ok()
}

/// Handles a single client connection.
///
/// Generic over the transport so the same state machine runs on a
/// `TcpStream` in the server and on an in-memory mock in tests.
pub struct ConnectionHandler<S> {
    /// The transport for this connection
    stream: BufWriter<S>,

    /// Client's address (for logging)
    addr: SocketAddr,

    /// Bytes received since the last complete message
    buffer: BytesMut,

    /// Executor bound to the shared store
    executor: CommandExecutor,

    /// Connection statistics (shared)
    stats: Arc<ConnectionStats>,

    /// Connection is aborted once an incomplete message reaches this size
    max_buffer_size: usize,
}

impl<S> ConnectionHandler<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates a new connection handler.
    ///
    /// # Arguments
    ///
    /// * `stream` - The transport for this connection
    /// * `addr` - The client's socket address
    /// * `executor` - Executor bound to the shared store
    /// * `stats` - Shared connection statistics
    pub fn new(
        stream: S,
        addr: SocketAddr,
        executor: CommandExecutor,
        stats: Arc<ConnectionStats>,
    ) -> Self {
        stats.connection_opened();

        Self {
            stream: BufWriter::new(stream),
            addr,
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_SIZE),
            executor,
            stats,
            max_buffer_size: DEFAULT_MAX_BUFFER_SIZE,
        }
    }

    /// Sets the size at which an incomplete message aborts the connection.
    pub fn with_max_buffer_size(mut self, max_buffer_size: usize) -> Self {
        self.max_buffer_size = max_buffer_size;
        self
    }

    /// Runs the connection until the client disconnects or a transport error
    /// occurs.
    ///
    /// A clean disconnect between messages returns `Ok(())`.
    pub async fn run(mut self) -> Result<(), ConnectionError> {
        info!(client = %self.addr, "Client connected");

        let result = match self.main_loop().await {
            Err(ConnectionError::ClientDisconnected) => Ok(()),
            other => other,
        };

        match &result {
            Ok(()) => info!(client = %self.addr, "Client disconnected"),
            Err(ConnectionError::IoError(io_err))
                if io_err.kind() == std::io::ErrorKind::ConnectionReset =>
            {
                debug!(client = %self.addr, "Connection reset by client")
            }
            Err(e) => warn!(client = %self.addr, error = %e, "Connection error"),
        }

        self.stats.connection_closed();
        result
    }

    /// The main read-frame-respond loop.
    async fn main_loop(&mut self) -> Result<(), ConnectionError> {
        loop {
            self.read_more_data().await?;

            if let Some(message) = self.take_message() {
                self.process_message(&message).await?;
            }
        }
    }

    /// Takes the buffered message if it is complete, leaving the buffer empty.
    fn take_message(&mut self) -> Option<String> {
        let message = match complete_message(&self.buffer) {
            Some(text) => text.to_owned(),
            None => {
                trace!(
                    client = %self.addr,
                    buffered = self.buffer.len(),
                    "Incomplete message, need more data"
                );
                return None;
            }
        };

        self.buffer.clear();
        Some(message)
    }

    /// Decodes, executes and answers one complete message.
    async fn process_message(&mut self, message: &str) -> Result<(), ConnectionError> {
        self.stats.message_processed();

        let response = match decode(message) {
            Ok(commands) => {
                let count = commands.len();
                let results = self.executor.run_batch(commands);
                self.stats.commands_processed(count);
                debug!(client = %self.addr, commands = count, "Batch executed");
                Response::Ok(results)
            }
            Err(e) => {
                warn!(client = %self.addr, error = %e, "Protocol error");
                self.stats.protocol_error();
                Response::Error(e.to_string())
            }
        };

        self.send_response(&response).await
    }

    /// Reads more data from the socket into the buffer.
    async fn read_more_data(&mut self) -> Result<(), ConnectionError> {
        if self.buffer.len() >= self.max_buffer_size {
            error!(
                client = %self.addr,
                size = self.buffer.len(),
                "Buffer size limit exceeded"
            );
            return Err(ConnectionError::BufferFull);
        }

        if self.buffer.capacity() - self.buffer.len() < 1024 {
            self.buffer.reserve(INITIAL_BUFFER_SIZE);
        }

        let n = self.stream.get_mut().read_buf(&mut self.buffer).await?;

        if n == 0 {
            if self.buffer.is_empty() {
                return Err(ConnectionError::ClientDisconnected);
            } else {
                return Err(ConnectionError::UnexpectedEof);
            }
        }

        self.stats.bytes_read(n);
        trace!(client = %self.addr, bytes = n, "Read data");

        Ok(())
    }

    /// Sends a response to the client.
    async fn send_response(&mut self, response: &Response) -> Result<(), ConnectionError> {
        let bytes = response.serialize();
        self.stream.write_all(&bytes).await?;
        self.stream.flush().await?;
        self.stats.bytes_written(bytes.len());
        trace!(
            client = %self.addr,
            bytes = bytes.len(),
            "Sent response"
        );
        Ok(())
    }
}

/// Errors that end a connection.
///
/// Protocol errors are not among them: they are answered in-band and the
/// connection stays open.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// I/O error (network issue)
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Client disconnected between messages
    #[error("Client disconnected")]
    ClientDisconnected,

    /// Client disconnected with an incomplete message buffered
    #[error("Unexpected end of stream")]
    UnexpectedEof,

    /// Buffer size limit exceeded
    #[error("Buffer size limit exceeded")]
    BufferFull,
}

/// Handles a client connection.
///
/// This is a convenience function that creates a ConnectionHandler
/// and runs it to completion.
pub async fn handle_connection<S>(
    stream: S,
    addr: SocketAddr,
    executor: CommandExecutor,
    stats: Arc<ConnectionStats>,
    max_buffer_size: usize,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let handler = ConnectionHandler::new(stream, addr, executor, stats)
        .with_max_buffer_size(max_buffer_size);
    // run() has already logged how the connection ended
    let _ = handler.run().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MetricStore, Sample};
    use tokio_test::io::{Builder, Mock};

    fn test_addr() -> SocketAddr {
        "127.0.0.1:40000".parse().unwrap()
    }

    fn create_handler(
        stream: Mock,
    ) -> (ConnectionHandler<Mock>, Arc<MetricStore>, Arc<ConnectionStats>) {
        let store = Arc::new(MetricStore::new());
        let stats = Arc::new(ConnectionStats::new());
        let executor = CommandExecutor::new(Arc::clone(&store));
        let handler = ConnectionHandler::new(stream, test_addr(), executor, Arc::clone(&stats));
        (handler, store, stats)
    }

    #[test]
    fn test_complete_message() {
        assert_eq!(complete_message(b"get a\n"), Some("get a\n"));
        assert_eq!(complete_message(b"put a 1 1\nget a\n"), Some("put a 1 1\nget a\n"));
        assert_eq!(complete_message(b"\n"), Some("\n"));
    }

    #[test]
    fn test_incomplete_message() {
        assert_eq!(complete_message(b""), None);
        assert_eq!(complete_message(b"get a"), None);
        assert_eq!(complete_message(b"put a 1 1\nget"), None);
    }

    #[test]
    fn test_message_with_invalid_utf8_is_incomplete() {
        // Truncated two-byte sequence followed by a newline
        assert_eq!(complete_message(b"get \xC3\n"), None);
        assert_eq!(complete_message(b"get \xff\n"), None);
        // The full sequence makes it complete
        assert_eq!(complete_message("get é\n".as_bytes()), Some("get é\n"));
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let stream = Builder::new()
            .read(b"put a 1.5 10\n")
            .write(b"ok\n\n")
            .read(b"get a\n")
            .write(b"ok\na 1.5 10\n\n")
            .build();
        let (handler, store, _) = create_handler(stream);

        handler.run().await.unwrap();
        assert_eq!(store.get("a")["a"], vec![Sample::new(10, 1.5)]);
    }

    #[tokio::test]
    async fn test_batch_in_one_message() {
        let stream = Builder::new()
            .read(b"put a 1 1\nput a 2 2\nget a\n")
            .write(b"ok\na 1.0 1\na 2.0 2\n\n")
            .build();
        let (handler, _, stats) = create_handler(stream);

        handler.run().await.unwrap();
        assert_eq!(stats.messages_processed.load(Ordering::Relaxed), 1);
        assert_eq!(stats.commands_processed.load(Ordering::Relaxed), 3);
    }

    #[tokio::test]
    async fn test_message_split_across_reads() {
        let stream = Builder::new()
            .read(b"put a 1")
            .read(b" 1\nget")
            .read(b" a\n")
            .write(b"ok\na 1.0 1\n\n")
            .build();
        let (handler, _, stats) = create_handler(stream);

        handler.run().await.unwrap();
        assert_eq!(stats.messages_processed.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_multibyte_key_split_across_reads() {
        let stream = Builder::new()
            .read(b"put caf\xC3")
            .read(b"\xA9 2.5 1\nget caf\xC3\xA9\n")
            .write("ok\ncafé 2.5 1\n\n".as_bytes())
            .build();
        let (handler, store, _) = create_handler(stream);

        handler.run().await.unwrap();
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_utf8_stalls_without_response() {
        // No write is expected; any response would fail the mock.
        let stream = Builder::new().read(b"get \xff\n").build();
        let (handler, store, stats) = create_handler(stream);

        let result = handler.run().await;
        assert!(matches!(result, Err(ConnectionError::UnexpectedEof)));
        assert_eq!(stats.messages_processed.load(Ordering::Relaxed), 0);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_protocol_error_keeps_connection_open() {
        let stream = Builder::new()
            .read(b"put k notanumber 100\n")
            .write(b"error\ninvalid value 'notanumber' on line 1\n\n")
            .read(b"get k\n")
            .write(b"ok\n\n")
            .build();
        let (handler, store, stats) = create_handler(stream);

        handler.run().await.unwrap();
        assert!(store.is_empty());
        assert_eq!(stats.protocol_errors.load(Ordering::Relaxed), 1);
        assert_eq!(stats.messages_processed.load(Ordering::Relaxed), 2);
    }

    #[tokio::test]
    async fn test_bad_line_voids_whole_batch() {
        let stream = Builder::new()
            .read(b"put a 1 1\nput a 2\n")
            .write(b"error\nwrong number of arguments for 'put' on line 2: expected 3, got 2\n\n")
            .build();
        let (handler, store, stats) = create_handler(stream);

        handler.run().await.unwrap();
        assert!(store.is_empty());
        assert_eq!(stats.commands_processed.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn test_empty_message_gets_ok() {
        let stream = Builder::new().read(b"\n").write(b"ok\n\n").build();
        let (handler, _, _) = create_handler(stream);

        handler.run().await.unwrap();
    }

    #[tokio::test]
    async fn test_read_error_ends_connection() {
        let stream = Builder::new()
            .read_error(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "reset by peer",
            ))
            .build();
        let (handler, _, stats) = create_handler(stream);

        let result = handler.run().await;
        assert!(matches!(result, Err(ConnectionError::IoError(_))));
        assert_eq!(stats.active_connections.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn test_buffer_limit_aborts_connection() {
        let stream = Builder::new().read(b"put a_rather_long_key").build();
        let (handler, _, _) = create_handler(stream);

        let result = handler.with_max_buffer_size(8).run().await;
        assert!(matches!(result, Err(ConnectionError::BufferFull)));
    }

    #[tokio::test]
    async fn test_connection_stats() {
        let stream = Builder::new()
            .read(b"put a 1 1\n")
            .write(b"ok\n\n")
            .build();
        let (handler, _, stats) = create_handler(stream);

        assert_eq!(stats.connections_accepted.load(Ordering::Relaxed), 1);
        assert_eq!(stats.active_connections.load(Ordering::Relaxed), 1);

        handler.run().await.unwrap();

        assert_eq!(stats.active_connections.load(Ordering::Relaxed), 0);
        assert_eq!(stats.bytes_read.load(Ordering::Relaxed), 10);
        assert_eq!(stats.bytes_written.load(Ordering::Relaxed), 4);
    }

    #[tokio::test]
    async fn test_handle_connection_swallows_partial_message_eof() {
        let stream = Builder::new()
            .read(b"put a 1 1\n")
            .write(b"ok\n\n")
            .read(b"get a")
            .build();
        let store = Arc::new(MetricStore::new());
        let stats = Arc::new(ConnectionStats::new());
        let executor = CommandExecutor::new(Arc::clone(&store));

        handle_connection(stream, test_addr(), executor, Arc::clone(&stats), 64).await;

        assert_eq!(store.len(), 1);
        assert_eq!(stats.active_connections.load(Ordering::Relaxed), 0);
        assert_eq!(stats.messages_processed.load(Ordering::Relaxed), 1);
    }
}
