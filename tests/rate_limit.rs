//! Outbound rate limiting through the full client, on a paused clock.

mod common;

use std::time::Duration;

use bancho_client::RateLimit;
use common::{authenticate, client_with_config, config};
use tokio::time::Instant;

#[tokio::test(start_paused = true)]
async fn test_send_beyond_threshold_suspends_the_caller() -> anyhow::Result<()> {
    let mut cfg = config();
    // Window of 4: the handshake takes 3, leaving one free send.
    cfg.rate_limit = Some(RateLimit {
        threshold: 4,
        window_secs: 60,
    });
    let (client, mut server) = client_with_config(cfg);
    let mut events = client.subscribe();

    let start = Instant::now();
    let _driver = authenticate(&client, &mut server, &mut events).await?;

    let before = Instant::now();
    client.send_private("#osu", "within quota").await?;
    assert_eq!(Instant::now(), before, "send under the threshold never waits");
    assert_eq!(server.sent().await?, "PRIVMSG #osu :within quota");

    // The window is now full; the next send waits out the handshake's
    // oldest slot before going on the wire.
    client.send_private("#osu", "over quota").await?;
    assert!(Instant::now() - start >= Duration::from_secs(60));
    assert_eq!(server.sent().await?, "PRIVMSG #osu :over quota");
    Ok(())
}
