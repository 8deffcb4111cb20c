//! Tournament lobby lifecycle driven through the scripted transport:
//! creation via BanchoBot, the settings dump replay, and `!mp` commands.

mod common;

use bancho_client::{Event, LobbyEvent, LobbyFormat, Mods, PlayerState, TeamColor, WinCondition};
use common::{authenticate, client, wait_for};

fn bot_to(channel: &str, content: &str) -> String {
    format!(":BanchoBot!cho@ppy.sh PRIVMSG {channel} :{content}")
}

#[tokio::test]
async fn test_tournament_lobby_creation() -> anyhow::Result<()> {
    let (client, mut server) = client();
    let mut events = client.subscribe();
    let _driver = authenticate(&client, &mut server, &mut events).await?;

    client
        .make_tournament_lobby("test with spaces 9nd 4umber5", false)
        .await?;
    assert_eq!(
        server.sent().await?,
        "PRIVMSG BanchoBot :!mp make test with spaces 9nd 4umber5"
    );

    server.push(&bot_to(
        "Stage",
        "Created the tournament match https://osu.ppy.sh/mp/104889872 test with spaces 9nd 4umber5",
    ));
    let created = wait_for(&mut events, |e| matches!(e, Event::LobbyCreated { .. })).await?;
    match created {
        Event::LobbyCreated { channel, id, name } => {
            assert_eq!(channel, "#mp_104889872");
            assert_eq!(id, 104889872);
            assert_eq!(name, "test with spaces 9nd 4umber5");
        }
        _ => unreachable!(),
    }

    let lobby = client.lobby_snapshot("#mp_104889872").expect("lobby registered");
    assert_eq!(lobby.id, 104889872);
    assert_eq!(lobby.name, "test with spaces 9nd 4umber5");
    Ok(())
}

#[tokio::test]
async fn test_settings_dump_replay() -> anyhow::Result<()> {
    let (client, mut server) = client();
    let mut events = client.subscribe();
    let _driver = authenticate(&client, &mut server, &mut events).await?;

    client.join("#mp_104889872").await?;
    server.sent().await?;
    let channel = "#mp_104889872";

    server.push(&bot_to(
        channel,
        "Room name: scrim room, History: https://osu.ppy.sh/mp/104889872",
    ));
    server.push(&bot_to(channel, "Team mode: TeamVs, Win condition: ScoreV2"));
    server.push(&bot_to(channel, "Active mods: Hidden, Freemod"));
    server.push(&bot_to(channel, "Players: 2"));
    server.push(&bot_to(
        channel,
        "Slot 1  Not Ready https://osu.ppy.sh/u/8191845 Stage            [Host / Team Blue / Hidden]",
    ));
    server.push(&bot_to(
        channel,
        "Slot 2  Ready     https://osu.ppy.sh/u/6231292 TheOmyNomy       [Team Red / Hidden, HardRock]",
    ));

    wait_for(&mut events, |e| {
        matches!(
            e,
            Event::Lobby {
                event: LobbyEvent::SettingsUpdated,
                ..
            }
        )
    })
    .await?;

    let lobby = client.lobby_snapshot(channel).expect("lobby registered");
    assert_eq!(lobby.name, "scrim room");
    assert_eq!(
        lobby.history_url.as_deref(),
        Some("https://osu.ppy.sh/mp/104889872")
    );
    assert_eq!(lobby.format, LobbyFormat::TeamVs);
    assert_eq!(lobby.win_condition, WinCondition::ScoreV2);
    assert!(lobby.mods.contains(Mods::FREEMOD));
    assert_eq!(lobby.host.as_deref(), Some("Stage"));
    assert_eq!(lobby.players.len(), 2);

    let stage = lobby.player("Stage").expect("host registered");
    assert_eq!(stage.id, Some(8191845));
    assert_eq!(stage.slot, 1);
    assert_eq!(stage.team, TeamColor::Blue);
    assert_eq!(stage.state, PlayerState::NotReady);
    assert_eq!(stage.targetable_name(), "#8191845");

    let omy = lobby.player("TheOmyNomy").expect("player registered");
    assert_eq!(omy.team, TeamColor::Red);
    assert_eq!(omy.state, PlayerState::Ready);
    assert!(omy.mods.contains(Mods::HIDDEN));
    assert!(omy.mods.contains(Mods::HARD_ROCK));
    Ok(())
}

#[tokio::test]
async fn test_match_flow_events_in_wire_order() -> anyhow::Result<()> {
    let (client, mut server) = client();
    let mut events = client.subscribe();
    let _driver = authenticate(&client, &mut server, &mut events).await?;

    client.join("#mp_42").await?;
    server.sent().await?;

    server.push(&bot_to("#mp_42", "Player 1 joined in slot 1."));
    server.push(&bot_to("#mp_42", "All players are ready!"));
    server.push(&bot_to("#mp_42", "The match has started!"));
    server.push(&bot_to(
        "#mp_42",
        "Player 1 finished playing (Score: 7428260, PASSED).",
    ));
    server.push(&bot_to("#mp_42", "The match has finished!"));

    let mut seen = Vec::new();
    while seen.last() != Some(&LobbyEvent::MatchFinished) {
        if let Event::Lobby { event, .. } =
            wait_for(&mut events, |e| matches!(e, Event::Lobby { .. })).await?
        {
            if event != LobbyEvent::StateChanged {
                seen.push(event);
            }
        }
    }
    assert_eq!(
        seen,
        vec![
            LobbyEvent::PlayerJoined("Player 1".into()),
            LobbyEvent::AllPlayersReady,
            LobbyEvent::MatchStarted,
            LobbyEvent::PlayerFinished {
                name: "Player 1".into(),
                score: 7428260,
                passed: true,
            },
            LobbyEvent::MatchFinished,
        ]
    );

    let lobby = client.lobby_snapshot("#mp_42").unwrap();
    let p = lobby.player("Player 1").unwrap();
    assert_eq!(p.score, Some(7428260));
    assert_eq!(p.passed, Some(true));
    Ok(())
}

#[tokio::test]
async fn test_lobby_commands() -> anyhow::Result<()> {
    let (client, mut server) = client();
    let mut events = client.subscribe();
    let _driver = authenticate(&client, &mut server, &mut events).await?;

    client.join("#mp_42").await?;
    server.sent().await?;
    let handle = client.lobby("#mp_42").expect("lobby handle");

    handle
        .update_settings(Some(LobbyFormat::TeamVs), Some(WinCondition::ScoreV2), Some(8))
        .await?;
    assert_eq!(server.sent().await?, "PRIVMSG #mp_42 :!mp set 2 3 8");

    handle.set_host("Some Player").await?;
    assert_eq!(server.sent().await?, "PRIVMSG #mp_42 :!mp host Some_Player");

    handle.set_mods(Mods::HIDDEN | Mods::HARD_ROCK).await?;
    assert_eq!(server.sent().await?, "PRIVMSG #mp_42 :!mp mods Hidden HardRock");

    handle.set_map(1256809, None).await?;
    assert_eq!(server.sent().await?, "PRIVMSG #mp_42 :!mp map 1256809");

    handle.lock().await?;
    assert_eq!(server.sent().await?, "PRIVMSG #mp_42 :!mp lock");
    assert!(handle.snapshot().unwrap().is_locked);

    handle.set_timer(30).await?;
    assert_eq!(server.sent().await?, "PRIVMSG #mp_42 :!mp timer 30");
    assert!(handle.snapshot().unwrap().lobby_timer_end.is_some());

    handle.abort_timer().await?;
    assert_eq!(server.sent().await?, "PRIVMSG #mp_42 :!mp aborttimer");
    assert!(handle.snapshot().unwrap().lobby_timer_end.is_none());

    handle.close().await?;
    assert_eq!(server.sent().await?, "PRIVMSG #mp_42 :!mp close");
    wait_for(&mut events, |e| {
        matches!(
            e,
            Event::Lobby {
                event: LobbyEvent::Closed,
                ..
            }
        )
    })
    .await?;
    assert!(client.lobby_snapshot("#mp_42").is_none());
    Ok(())
}

#[tokio::test]
async fn test_referee_roster_tracks_commands() -> anyhow::Result<()> {
    let (client, mut server) = client();
    let mut events = client.subscribe();
    let _driver = authenticate(&client, &mut server, &mut events).await?;

    client.join("#mp_42").await?;
    server.sent().await?;
    let handle = client.lobby("#mp_42").expect("lobby handle");
    assert!(handle.snapshot().unwrap().referees.is_empty());

    handle.add_referees(&["Ref One", "Ref Two"]).await?;
    assert_eq!(
        server.sent().await?,
        "PRIVMSG #mp_42 :!mp addref Ref_One Ref_Two"
    );
    assert_eq!(
        handle.snapshot().unwrap().referees,
        vec!["Ref One", "Ref Two"]
    );

    // Re-adding under a different casing never duplicates.
    handle.add_referees(&["ref one"]).await?;
    server.sent().await?;
    assert_eq!(handle.snapshot().unwrap().referees.len(), 2);

    handle.remove_referees(&["Ref One"]).await?;
    assert_eq!(server.sent().await?, "PRIVMSG #mp_42 :!mp removeref Ref_One");
    assert_eq!(handle.snapshot().unwrap().referees, vec!["Ref Two"]);
    Ok(())
}

#[tokio::test]
async fn test_kick_removes_player_locally() -> anyhow::Result<()> {
    let (client, mut server) = client();
    let mut events = client.subscribe();
    let _driver = authenticate(&client, &mut server, &mut events).await?;

    client.join("#mp_42").await?;
    server.sent().await?;
    server.push(&bot_to("#mp_42", "BadActor joined in slot 1."));
    wait_for(&mut events, |e| {
        matches!(
            e,
            Event::Lobby {
                event: LobbyEvent::PlayerJoined(_),
                ..
            }
        )
    })
    .await?;

    let handle = client.lobby("#mp_42").unwrap();
    handle.kick("BadActor").await?;
    assert_eq!(server.sent().await?, "PRIVMSG #mp_42 :!mp kick BadActor");
    assert!(handle.snapshot().unwrap().player("BadActor").is_none());
    Ok(())
}
