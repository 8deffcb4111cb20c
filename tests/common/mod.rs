//! Integration test common infrastructure.
//!
//! Provides an in-memory scripted transport standing in for the Bancho
//! server, plus helpers for building clients and awaiting events.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bancho_client::error::{BanchoError, Result};
use bancho_client::transport::{Connector, LineReader, LineWriter};
use bancho_client::{BanchoClient, BanchoClientConfig, Event, IrcCredentials};
use tokio::sync::{broadcast, mpsc};
use tokio::time::timeout;

const EVENT_WAIT: Duration = Duration::from_secs(5);

/// Test-side ends of the in-memory transport.
pub struct TestServer {
    /// Lines the client will read. Dropping this is EOF.
    pub to_client: mpsc::UnboundedSender<String>,
    /// Lines the client wrote.
    pub from_client: mpsc::UnboundedReceiver<String>,
}

impl TestServer {
    /// Push one server line to the client.
    pub fn push(&self, line: &str) {
        self.to_client
            .send(line.to_owned())
            .expect("client reader dropped");
    }

    /// Await the next line the client wrote.
    pub async fn sent(&mut self) -> anyhow::Result<String> {
        timeout(EVENT_WAIT, self.from_client.recv())
            .await
            .map_err(|_| anyhow::anyhow!("timed out waiting for an outbound line"))?
            .ok_or_else(|| anyhow::anyhow!("client writer dropped"))
    }
}

struct ChannelReader(mpsc::UnboundedReceiver<String>);

#[async_trait]
impl LineReader for ChannelReader {
    async fn read_line(&mut self) -> Result<Option<String>> {
        Ok(self.0.recv().await)
    }
}

struct ChannelWriter(mpsc::UnboundedSender<String>);

#[async_trait]
impl LineWriter for ChannelWriter {
    async fn write_line(&mut self, line: &str) -> Result<()> {
        self.0.send(line.to_owned()).map_err(|_| {
            BanchoError::Connection(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "test server closed",
            ))
        })
    }
}

/// Connector that hands out one scripted in-memory transport.
pub struct ScriptedConnector {
    halves: Mutex<Option<(ChannelReader, ChannelWriter)>>,
}

#[async_trait]
impl Connector for ScriptedConnector {
    async fn connect(
        &self,
        _host: &str,
        _port: u16,
    ) -> Result<(Box<dyn LineReader>, Box<dyn LineWriter>)> {
        let (reader, writer) = self
            .halves
            .lock()
            .expect("connector mutex poisoned")
            .take()
            .expect("scripted transport consumed twice");
        Ok((Box::new(reader), Box::new(writer)))
    }
}

/// Build the scripted transport pair.
pub fn scripted() -> (ScriptedConnector, TestServer) {
    let (to_client, inbound) = mpsc::unbounded_channel();
    let (outbound, from_client) = mpsc::unbounded_channel();
    let connector = ScriptedConnector {
        halves: Mutex::new(Some((ChannelReader(inbound), ChannelWriter(outbound)))),
    };
    (
        connector,
        TestServer {
            to_client,
            from_client,
        },
    )
}

/// Default test configuration for the user `Stage`.
pub fn config() -> BanchoClientConfig {
    BanchoClientConfig::new(IrcCredentials::new("Stage", "irc-token"))
}

/// A client wired to a scripted transport.
pub fn client() -> (BanchoClient, TestServer) {
    client_with_config(config())
}

/// A client with a custom configuration wired to a scripted transport.
pub fn client_with_config(config: BanchoClientConfig) -> (BanchoClient, TestServer) {
    let (connector, server) = scripted();
    (
        BanchoClient::with_connector(config, Box::new(connector)),
        server,
    )
}

/// Await the first event matching the predicate, discarding the rest.
pub async fn wait_for<F>(
    events: &mut broadcast::Receiver<Event>,
    mut predicate: F,
) -> anyhow::Result<Event>
where
    F: FnMut(&Event) -> bool,
{
    loop {
        let event = timeout(EVENT_WAIT, events.recv())
            .await
            .map_err(|_| anyhow::anyhow!("timed out waiting for an event"))??;
        if predicate(&event) {
            return Ok(event);
        }
    }
}

/// Connect and authenticate a scripted client, consuming the handshake
/// lines on the server side.
pub async fn authenticate(
    client: &BanchoClient,
    server: &mut TestServer,
    events: &mut broadcast::Receiver<Event>,
) -> anyhow::Result<tokio::task::JoinHandle<bancho_client::Result<()>>> {
    client.connect().await?;
    assert_eq!(server.sent().await?, "PASS irc-token");
    assert_eq!(server.sent().await?, "NICK Stage");
    assert_eq!(server.sent().await?, "USER Stage");

    let driver = {
        let client = client.clone();
        tokio::spawn(async move { client.run().await })
    };
    server.push(":cho.ppy.sh 001 Stage :Welcome to the osu!Bancho.");
    wait_for(events, |e| matches!(e, Event::Authenticated)).await?;
    Ok(driver)
}
