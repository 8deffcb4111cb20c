//! Session state machine: handshake, authentication verdicts, keepalive,
//! the ignore filter, and join-failure eviction.

mod common;

use bancho_client::{BanchoError, Event};
use common::{authenticate, client, wait_for};

#[tokio::test]
async fn test_authentication_success() -> anyhow::Result<()> {
    let (client, mut server) = client();
    let mut events = client.subscribe();

    assert!(!client.is_authenticated());
    let driver = authenticate(&client, &mut server, &mut events).await?;
    assert!(client.is_authenticated());

    // EOF ends the read loop cleanly.
    drop(server.to_client);
    assert!(driver.await?.is_ok());
    wait_for(&mut events, |e| matches!(e, Event::Disconnected)).await?;
    assert!(!client.is_authenticated());
    Ok(())
}

#[tokio::test]
async fn test_authentication_failure_is_fatal() -> anyhow::Result<()> {
    let (client, mut server) = client();
    let mut events = client.subscribe();

    client.connect().await?;
    for _ in 0..3 {
        server.sent().await?;
    }
    let driver = {
        let client = client.clone();
        tokio::spawn(async move { client.run().await })
    };
    server.push(":cho.ppy.sh 464 Stage :Bad authentication token.");

    wait_for(&mut events, |e| matches!(e, Event::AuthenticationFailed)).await?;
    assert!(matches!(driver.await?, Err(BanchoError::Authentication)));
    assert!(!client.is_authenticated());
    Ok(())
}

#[tokio::test]
async fn test_password_redacted_in_sent_events() -> anyhow::Result<()> {
    let (client, mut server) = client();
    let mut events = client.subscribe();

    client.connect().await?;
    assert_eq!(server.sent().await?, "PASS irc-token");
    let sent = wait_for(&mut events, |e| matches!(e, Event::Sent(_))).await?;
    match sent {
        Event::Sent(line) => {
            assert!(!line.contains("irc-token"));
            assert!(line.contains("<redacted>"));
        }
        _ => unreachable!(),
    }
    Ok(())
}

#[tokio::test]
async fn test_send_gating() -> anyhow::Result<()> {
    let (client, mut server) = client();
    let mut events = client.subscribe();

    assert!(matches!(
        client.send_private("#osu", "hi").await,
        Err(BanchoError::NotConnected)
    ));

    client.connect().await?;
    assert!(matches!(
        client.send_private("#osu", "hi").await,
        Err(BanchoError::NotAuthenticated)
    ));

    let _driver = authenticate(&client, &mut server, &mut events).await?;
    client.send_private("#osu", "hi").await?;
    assert_eq!(server.sent().await?, "PRIVMSG #osu :hi");

    // Leading colon is escaped on the wire.
    client.send_private("#osu", ":)").await?;
    assert_eq!(server.sent().await?, "PRIVMSG #osu :::)");
    Ok(())
}

#[tokio::test]
async fn test_connect_is_idempotent() -> anyhow::Result<()> {
    let (client, mut server) = client();
    client.connect().await?;
    for _ in 0..3 {
        server.sent().await?;
    }
    // Second connect is a no-op: no second handshake appears.
    client.connect().await?;
    client.disconnect().await;
    assert_eq!(server.sent().await?, "QUIT");
    assert!(server.from_client.try_recv().is_err());
    Ok(())
}

#[tokio::test]
async fn test_message_history_when_enabled() -> anyhow::Result<()> {
    let mut cfg = common::config();
    cfg.save_message_history = true;
    let (client, mut server) = common::client_with_config(cfg);
    let mut events = client.subscribe();
    let _driver = authenticate(&client, &mut server, &mut events).await?;

    client.join("#osu").await?;
    server.sent().await?;
    server.push(":c4mmy!cho@ppy.sh PRIVMSG #osu :nah i mean gigachad lily");
    server.push(":c4mmy!cho@ppy.sh PRIVMSG #osu :second line");
    wait_for(&mut events, |e| {
        matches!(e, Event::PrivateMessage(pm) if pm.content == "second line")
    })
    .await?;

    let history = client.channel_history("#osu").expect("channel registered");
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].content, "nah i mean gigachad lily");
    assert_eq!(history[1].sender, "c4mmy");
    Ok(())
}

#[tokio::test]
async fn test_ping_answered_before_ignore_filter() -> anyhow::Result<()> {
    let (client, mut server) = client();
    let mut events = client.subscribe();
    let _driver = authenticate(&client, &mut server, &mut events).await?;

    // Ignored by default: produces no events at all.
    server.push(":someone!cho@ppy.sh QUIT :quit");
    server.push("PING :cho.ppy.sh");

    wait_for(&mut events, |e| matches!(e, Event::PingReceived)).await?;
    assert_eq!(server.sent().await?, "PONG cho.ppy.sh");
    Ok(())
}

#[tokio::test]
async fn test_join_and_part() -> anyhow::Result<()> {
    let (client, mut server) = client();
    let mut events = client.subscribe();
    let _driver = authenticate(&client, &mut server, &mut events).await?;

    client.join("#osu mapping").await?;
    assert_eq!(server.sent().await?, "JOIN #osu_mapping");
    assert!(client.contains_channel("#osu_mapping"));

    // Idempotent under any spelling: one entry, no duplicate event.
    client.join("#OSU_MAPPING").await?;
    assert_eq!(server.sent().await?, "JOIN #OSU_MAPPING");
    assert!(client.contains_channel("#osu mapping"));

    client.part("#osu_mapping").await?;
    assert_eq!(server.sent().await?, "PART #osu_mapping");
    assert!(!client.contains_channel("#osu_mapping"));
    Ok(())
}

#[tokio::test]
async fn test_join_failure_evicts_channel() -> anyhow::Result<()> {
    let (client, mut server) = client();
    let mut events = client.subscribe();
    let _driver = authenticate(&client, &mut server, &mut events).await?;

    client.join("#secret").await?;
    server.sent().await?;
    assert!(client.contains_channel("#secret"));

    server.push(":cho.ppy.sh 403 Stage #secret :No such channel");
    let event = wait_for(&mut events, |e| matches!(e, Event::ChannelJoinFailure(_))).await?;
    match event {
        Event::ChannelJoinFailure(name) => assert_eq!(name, "#secret"),
        _ => unreachable!(),
    }
    assert!(!client.contains_channel("#secret"));
    Ok(())
}

#[tokio::test]
async fn test_whisper_failure_is_not_an_eviction() -> anyhow::Result<()> {
    let (client, mut server) = client();
    let mut events = client.subscribe();
    let _driver = authenticate(&client, &mut server, &mut events).await?;

    // A whisper to an offline user also comes back as 403, but names a
    // user rather than a channel.
    client.query("OfflineUser");
    server.push(":cho.ppy.sh 403 Stage OfflineUser :No such channel");
    server.push("PING :cho.ppy.sh");
    wait_for(&mut events, |e| matches!(e, Event::PingReceived)).await?;
    assert!(client.contains_channel("OfflineUser"));
    Ok(())
}

#[tokio::test]
async fn test_inbound_whisper_opens_query() -> anyhow::Result<()> {
    let (client, mut server) = client();
    let mut events = client.subscribe();
    let _driver = authenticate(&client, &mut server, &mut events).await?;

    server.push(":TheOmyNomy!cho@ppy.sh PRIVMSG Stage :Hello world!");
    let direct = wait_for(&mut events, |e| matches!(e, Event::DirectMessage(_))).await?;
    match direct {
        Event::DirectMessage(pm) => {
            assert_eq!(pm.sender, "TheOmyNomy");
            assert_eq!(pm.content, "Hello world!");
        }
        _ => unreachable!(),
    }
    wait_for(&mut events, |e| matches!(e, Event::UserQueried(u) if u == "TheOmyNomy")).await?;
    assert!(client.contains_channel("TheOmyNomy"));
    Ok(())
}
