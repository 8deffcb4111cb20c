//! Line-oriented transport seam.
//!
//! The client talks to the server through object-safe reader/writer
//! traits so tests can substitute an in-memory transport for the TCP
//! stream. The default [`TcpConnector`] frames a [`TcpStream`] with the
//! protocol line codec.

use async_trait::async_trait;
use bancho_proto::LineCodec;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use tracing::debug;

use crate::error::{BanchoError, Result};

/// Reads one CR-LF-terminated line at a time. `None` is EOF.
#[async_trait]
pub trait LineReader: Send {
    /// Read the next line, or `None` when the transport closed.
    async fn read_line(&mut self) -> Result<Option<String>>;
}

/// Writes one line at a time; framing is the writer's concern.
#[async_trait]
pub trait LineWriter: Send {
    /// Write one line.
    async fn write_line(&mut self, line: &str) -> Result<()>;
}

/// Opens a line-oriented duplex transport to a host/port.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open the transport, returning its two halves.
    async fn connect(
        &self,
        host: &str,
        port: u16,
    ) -> Result<(Box<dyn LineReader>, Box<dyn LineWriter>)>;
}

/// The production connector: TCP framed with [`LineCodec`].
#[derive(Clone, Copy, Debug, Default)]
pub struct TcpConnector;

#[async_trait]
impl Connector for TcpConnector {
    async fn connect(
        &self,
        host: &str,
        port: u16,
    ) -> Result<(Box<dyn LineReader>, Box<dyn LineWriter>)> {
        let stream = TcpStream::connect((host, port))
            .await
            .map_err(BanchoError::Connection)?;
        debug!(host, port, "transport opened");
        let (sink, stream) = Framed::new(stream, LineCodec::default()).split();
        Ok((Box::new(TcpLineReader(stream)), Box::new(TcpLineWriter(sink))))
    }
}

struct TcpLineReader(SplitStream<Framed<TcpStream, LineCodec>>);

#[async_trait]
impl LineReader for TcpLineReader {
    async fn read_line(&mut self) -> Result<Option<String>> {
        match self.0.next().await {
            Some(line) => Ok(Some(line?)),
            None => Ok(None),
        }
    }
}

struct TcpLineWriter(SplitSink<Framed<TcpStream, LineCodec>, String>);

#[async_trait]
impl LineWriter for TcpLineWriter {
    async fn write_line(&mut self, line: &str) -> Result<()> {
        self.0.send(line.to_owned()).await?;
        Ok(())
    }
}
