//! Session channel over an established byte stream.

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, trace};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::Instant;

use super::patterns::{Classification, StreamMatcher};
use crate::error::{ChannelError, Result};
use crate::transport::Transport;

/// Raw I/O primitives the navigator needs from a live session.
///
/// Implementations wrap a transport that is already connected and sitting at
/// a shell. None of these methods interpret device output beyond what the
/// supplied [`StreamMatcher`] asks for.
#[async_trait]
pub trait SessionChannel: Transport {
    /// Write raw bytes to the device.
    async fn write(&mut self, data: &[u8]) -> Result<()>;

    /// Send the configured line terminator.
    async fn send_return(&mut self) -> Result<()>;

    /// Read until `matcher` classifies the output or `timeout` elapses.
    ///
    /// The timeout is a deadline for the whole call, not per chunk.
    async fn read_until(
        &mut self,
        matcher: &mut StreamMatcher,
        timeout: Duration,
    ) -> Result<Classification>;
}

/// Configuration for channel behavior.
///
/// Read timeouts and prompt search depth belong to the driver and are
/// passed per call.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Size of each read from the underlying stream.
    pub read_chunk_size: usize,

    /// Bytes sent by `send_return`.
    pub return_sequence: Vec<u8>,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            read_chunk_size: 8192,
            return_sequence: b"\n".to_vec(),
        }
    }
}

/// [`SessionChannel`] over any tokio byte stream.
///
/// Works with an SSH channel stream, a telnet socket, a serial port, or an
/// in-memory duplex for tests.
pub struct StreamChannel<S> {
    stream: S,
    config: ChannelConfig,
    chunk: Vec<u8>,
}

impl<S> StreamChannel<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Wrap a stream with default configuration.
    pub fn new(stream: S) -> Self {
        Self::with_config(stream, ChannelConfig::default())
    }

    /// Wrap a stream with the given configuration.
    pub fn with_config(stream: S, config: ChannelConfig) -> Self {
        Self {
            chunk: vec![0; config.read_chunk_size.max(1)],
            stream,
            config,
        }
    }

    /// Get the configuration.
    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    /// Consume the channel and return the stream.
    pub fn into_inner(self) -> S {
        self.stream
    }
}

#[async_trait]
impl<S> SessionChannel for StreamChannel<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn write(&mut self, data: &[u8]) -> Result<()> {
        self.stream
            .write_all(data)
            .await
            .map_err(ChannelError::Io)?;
        self.stream.flush().await.map_err(ChannelError::Io)?;
        Ok(())
    }

    async fn send_return(&mut self) -> Result<()> {
        let sequence = self.config.return_sequence.clone();
        self.write(&sequence).await
    }

    async fn read_until(
        &mut self,
        matcher: &mut StreamMatcher,
        timeout: Duration,
    ) -> Result<Classification> {
        let deadline = Instant::now() + timeout;

        loop {
            let n = match tokio::time::timeout_at(deadline, self.stream.read(&mut self.chunk)).await
            {
                Ok(read) => read.map_err(ChannelError::Io)?,
                Err(_) => {
                    debug!(
                        "read_until: no match after {:?}, buffered {} bytes",
                        timeout,
                        matcher.captured().len()
                    );
                    return Err(ChannelError::Timeout(timeout).into());
                }
            };

            if n == 0 {
                return Err(ChannelError::Closed.into());
            }
            trace!("read_until: {} bytes", n);

            if let Some(found) = matcher.feed(&self.chunk[..n]) {
                return Ok(found);
            }
        }
    }
}

#[async_trait]
impl<S> Transport for StreamChannel<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn terminate(&mut self) -> Result<()> {
        self.stream.shutdown().await.map_err(ChannelError::Io)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{CompiledPrompt, MatchKind};

    fn cli_matcher() -> StreamMatcher {
        StreamMatcher::new(1000).with_candidate(
            MatchKind::Prompt {
                level: "cli".to_string(),
            },
            CompiledPrompt::new(r"^[\w.-]+#\s?$").unwrap(),
        )
    }

    #[tokio::test]
    async fn test_read_until_across_chunks() {
        let mock = tokio_test::io::Builder::new()
            .write(b"show clock\n")
            .read(b"show clock\r\n12:00:01 UTC\r\n")
            .read(b"sonic# ")
            .build();
        let mut channel = StreamChannel::new(mock);

        channel.write(b"show clock").await.unwrap();
        channel.send_return().await.unwrap();

        let mut matcher = cli_matcher();
        let found = channel
            .read_until(&mut matcher, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(found.matched, "sonic#");
        assert!(found.captured_str().contains("12:00:01 UTC"));
    }

    #[tokio::test]
    async fn test_read_until_closed() {
        let mock = tokio_test::io::Builder::new().read(b"partial").build();
        let mut channel = StreamChannel::new(mock);

        let mut matcher = cli_matcher();
        let err = channel
            .read_until(&mut matcher, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(err.is_channel_closed());
    }

    #[tokio::test]
    async fn test_read_until_timeout() {
        let mock = tokio_test::io::Builder::new()
            .read(b"loading")
            .wait(Duration::from_secs(30))
            .build();
        let mut channel = StreamChannel::new(mock);

        let mut matcher = cli_matcher();
        let err = channel
            .read_until(&mut matcher, Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(err.is_timeout());
    }

    #[tokio::test]
    async fn test_custom_return_sequence() {
        let mock = tokio_test::io::Builder::new().write(b"\r\n").build();
        let config = ChannelConfig {
            return_sequence: b"\r\n".to_vec(),
            ..Default::default()
        };
        let mut channel = StreamChannel::with_config(mock, config);
        channel.send_return().await.unwrap();
        channel.terminate().await.unwrap();
    }
}
