//! Async client for the tickstore line protocol.
//!
//! Issues the two wire calls the server understands and turns responses back
//! into typed values. One request is in flight at a time; every call waits for
//! the response's blank-line terminator before returning.
//!
//! ```ignore
//! use tickstore::client::Client;
//!
//! let mut client = Client::connect("127.0.0.1:8888", None).await?;
//! client.put("cpu.load", 0.42, Some(1_700_000_000)).await?;
//! let series = client.get("*").await?;
//! client.close().await?;
//! ```

use crate::protocol::{
    decode_response, Command, CommandResult, ProtocolError, Response, RESPONSE_TERMINATOR,
};
use crate::storage::SeriesSet;
use bytes::BytesMut;
use std::future::Future;
use std::io;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, ToSocketAddrs};
use tracing::{debug, trace};

/// Errors returned by [`Client`] operations.
///
/// Any variant other than [`ClientError::Server`] leaves the connection in an
/// unknown state; callers should drop the client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Could not establish the TCP connection
    #[error("cannot connect to server: {0}")]
    Connect(#[source] io::Error),

    /// Sending or receiving failed
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The server closed the connection before a full response arrived
    #[error("connection closed by server")]
    Closed,

    /// No response within the configured timeout
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// The server answered with an `error` response
    #[error("server error: {0}")]
    Server(String),

    /// The server's response did not follow the protocol
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The key is empty or contains whitespace; nothing was sent
    #[error("invalid key {0:?}: keys must be non-empty and contain no whitespace")]
    InvalidKey(String),
}

/// A connection to a tickstore server.
#[derive(Debug)]
pub struct Client {
    stream: TcpStream,
    buffer: BytesMut,
    timeout: Option<Duration>,
}

impl Client {
    /// Connects to a server.
    ///
    /// `timeout` bounds the connect and every later response wait.
    pub async fn connect(
        addr: impl ToSocketAddrs,
        timeout: Option<Duration>,
    ) -> Result<Self, ClientError> {
        let stream = with_timeout(timeout, async {
            TcpStream::connect(addr).await.map_err(ClientError::Connect)
        })
        .await?;

        debug!(peer = ?stream.peer_addr().ok(), "Connected");

        Ok(Self {
            stream,
            buffer: BytesMut::with_capacity(1024),
            timeout,
        })
    }

    /// Records a sample. Without a timestamp the current Unix time in seconds
    /// is used.
    pub async fn put(
        &mut self,
        key: &str,
        value: f64,
        timestamp: Option<i64>,
    ) -> Result<(), ClientError> {
        validate_key(key)?;
        let timestamp = timestamp.unwrap_or_else(unix_now);
        self.request(&Command::put(key, value, timestamp)).await?;
        Ok(())
    }

    /// Reads the series for `key`, or every series with `"*"`.
    ///
    /// Keys without samples are absent from the result.
    pub async fn get(&mut self, key: &str) -> Result<SeriesSet, ClientError> {
        validate_key(key)?;
        let results = self.request(&Command::get(key)).await?;

        let mut set = SeriesSet::new();
        for result in results {
            if let CommandResult::Series(series) = result {
                for (key, mut samples) in series {
                    set.entry(key).or_default().append(&mut samples);
                }
            }
        }
        Ok(set)
    }

    /// Closes the write half of the connection.
    pub async fn close(mut self) -> Result<(), ClientError> {
        self.stream.shutdown().await?;
        Ok(())
    }

    async fn request(&mut self, command: &Command) -> Result<Vec<CommandResult>, ClientError> {
        self.stream.write_all(&command.serialize()).await?;
        trace!(command = command.name(), "Sent request");

        let text = with_timeout(self.timeout, self.read_response()).await?;

        match decode_response(&text)? {
            Response::Ok(results) => Ok(results),
            Response::Error(message) => Err(ClientError::Server(message)),
        }
    }

    async fn read_response(&mut self) -> Result<String, ClientError> {
        self.buffer.clear();

        while !self.buffer.ends_with(RESPONSE_TERMINATOR) {
            let n = self.stream.read_buf(&mut self.buffer).await?;
            if n == 0 {
                return Err(ClientError::Closed);
            }
        }

        let text = String::from_utf8(self.buffer.to_vec()).map_err(|_| {
            ProtocolError::MalformedResponse("response is not valid UTF-8".to_string())
        })?;
        self.buffer.clear();
        Ok(text)
    }
}

async fn with_timeout<T>(
    timeout: Option<Duration>,
    fut: impl Future<Output = Result<T, ClientError>>,
) -> Result<T, ClientError> {
    match timeout {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| ClientError::Timeout(limit))?,
        None => fut.await,
    }
}

/// Rejects keys that would not survive the trip as a single token.
fn validate_key(key: &str) -> Result<(), ClientError> {
    if key.is_empty() || key.chars().any(char::is_whitespace) {
        return Err(ClientError::InvalidKey(key.to_string()));
    }
    Ok(())
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}
