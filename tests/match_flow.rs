mod support;

use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async,
    tungstenite::{Message, protocol::frame::coding::CloseCode},
};
use trash_match_server::domain::{MatchResult, RejectReason, SessionPhase, SessionProjection};
use trash_match_server::interface_adapters::protocol::{CollectResultDto, ServerMessage};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn create_lobby(difficulty_index: i64) -> String {
    let base_url = support::ensure_server();
    let lobby_id = format!("flow-{}", uuid::Uuid::new_v4());
    let res = reqwest::Client::new()
        .post(format!("{base_url}/lobbies"))
        .json(&serde_json::json!({
            "lobby_id": lobby_id,
            "difficulty_index": difficulty_index
        }))
        .send()
        .await
        .expect("request should succeed");
    assert_eq!(res.status(), reqwest::StatusCode::CREATED);
    lobby_id
}

async fn send_json(socket: &mut Socket, value: serde_json::Value) {
    socket
        .send(Message::Text(value.to_string().into()))
        .await
        .expect("send message");
}

async fn next_server_message(socket: &mut Socket) -> ServerMessage {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), socket.next())
            .await
            .expect("server message in time")
            .expect("socket open")
            .expect("websocket frame");
        if let Message::Text(text) = msg {
            return serde_json::from_str(text.as_str()).expect("server message json");
        }
    }
}

// Joins a lobby and seeds a projection from the initial snapshot.
async fn join(lobby_id: &str) -> (Socket, SessionProjection) {
    let (mut socket, _) = connect_async(support::ws_url(lobby_id))
        .await
        .expect("websocket connect");
    send_json(
        &mut socket,
        serde_json::json!({ "type": "Join", "data": { "display_name": "tester" } }),
    )
    .await;

    let ServerMessage::Identity { player_id } = next_server_message(&mut socket).await else {
        panic!("expected Identity first");
    };
    assert!(!player_id.is_empty());
    let ServerMessage::Snapshot(snapshot) = next_server_message(&mut socket).await else {
        panic!("expected Snapshot after Identity");
    };

    let mut projection = SessionProjection::new();
    projection.apply_snapshot(&snapshot);
    (socket, projection)
}

// Reads until the collect reply arrives, keeping the projection current.
async fn collect(
    socket: &mut Socket,
    projection: &mut SessionProjection,
    entity_id: u64,
) -> CollectResultDto {
    send_json(
        socket,
        serde_json::json!({ "type": "Collect", "data": { "entity_id": entity_id } }),
    )
    .await;
    loop {
        match next_server_message(socket).await {
            ServerMessage::CollectResult(result) => return result,
            other => apply(projection, other),
        }
    }
}

fn apply(projection: &mut SessionProjection, msg: ServerMessage) {
    match msg {
        ServerMessage::WorldUpdate(update) => {
            projection.apply_update(update.tick, &update.events);
        }
        ServerMessage::Snapshot(snapshot) => projection.apply_snapshot(&snapshot),
        _ => {}
    }
}

#[tokio::test]
async fn when_every_item_is_collected_over_websocket_then_match_ends_in_win() {
    let lobby_id = create_lobby(0).await;
    let (mut socket, mut projection) = join(&lobby_id).await;
    assert_eq!(projection.phase, Some(SessionPhase::Running));
    assert_eq!(projection.entity_count(), 10);

    let ids: Vec<u64> = projection.entities().map(|e| e.id).collect();
    for id in ids {
        let result = collect(&mut socket, &mut projection, id).await;
        assert_eq!(result.entity_id, id);
        assert!(result.accepted, "collect of {id} should be accepted");
    }

    while projection.result.is_none() {
        let msg = next_server_message(&mut socket).await;
        apply(&mut projection, msg);
    }

    assert_eq!(projection.result, Some(MatchResult::Win));
    assert_eq!(projection.phase, Some(SessionPhase::Ended));
    assert_eq!(projection.collected_count, 10);
    assert_eq!(projection.entity_count(), 0);
}

#[tokio::test]
async fn when_two_clients_collect_the_same_item_then_only_one_is_accepted() {
    let lobby_id = create_lobby(1).await;
    let (mut first, mut first_view) = join(&lobby_id).await;
    let (mut second, mut second_view) = join(&lobby_id).await;
    let target = first_view
        .entities()
        .next()
        .map(|e| e.id)
        .expect("running match has items");

    let (a, b) = tokio::join!(
        collect(&mut first, &mut first_view, target),
        collect(&mut second, &mut second_view, target)
    );

    assert_eq!(u8::from(a.accepted) + u8::from(b.accepted), 1);
    let rejected = if a.accepted { b } else { a };
    assert_eq!(rejected.reason, Some(RejectReason::AlreadyCollected));
}

#[tokio::test]
async fn when_configure_is_sent_twice_then_second_is_rejected() {
    let base_url = support::ensure_server();
    let lobby_id = format!("flow-{}", uuid::Uuid::new_v4());
    let res = reqwest::Client::new()
        .post(format!("{base_url}/lobbies"))
        .json(&serde_json::json!({ "lobby_id": lobby_id }))
        .send()
        .await
        .expect("request should succeed");
    assert_eq!(res.status(), reqwest::StatusCode::CREATED);

    let (mut socket, mut projection) = join(&lobby_id).await;
    assert_eq!(projection.phase, Some(SessionPhase::Idle));

    let mut replies = Vec::new();
    for index in [2, 0] {
        send_json(
            &mut socket,
            serde_json::json!({ "type": "Configure", "data": { "difficulty_index": index } }),
        )
        .await;
        loop {
            match next_server_message(&mut socket).await {
                ServerMessage::ConfigureResult(result) => {
                    replies.push(result);
                    break;
                }
                other => apply(&mut projection, other),
            }
        }
    }

    assert!(replies[0].accepted);
    assert!(!replies[1].accepted);
    while projection.entity_count() < 30 {
        let msg = next_server_message(&mut socket).await;
        apply(&mut projection, msg);
    }
    assert_eq!(projection.total_item_count, 30);
    assert_eq!(projection.total_duration, 60.0);
}

#[tokio::test]
async fn when_lobby_is_unknown_then_websocket_upgrade_is_refused() {
    let err = connect_async(support::ws_url("does-not-exist"))
        .await
        .expect_err("expected upgrade to fail");

    match err {
        tokio_tungstenite::tungstenite::Error::Http(response) => {
            assert_eq!(response.status(), 404);
        }
        other => panic!("expected http error, got {other:?}"),
    }
}

#[tokio::test]
async fn when_binary_frame_is_sent_after_join_then_socket_is_closed_as_unsupported() {
    let lobby_id = create_lobby(0).await;
    let (mut socket, _) = join(&lobby_id).await;

    socket
        .send(Message::Binary(vec![1, 2, 3].into()))
        .await
        .expect("send binary frame");

    loop {
        let frame = tokio::time::timeout(Duration::from_secs(5), socket.next())
            .await
            .expect("close in time");
        match frame {
            Some(Ok(Message::Close(Some(close)))) => {
                assert_eq!(close.code, CloseCode::Unsupported);
                break;
            }
            Some(Ok(Message::Close(None))) | None | Some(Err(_)) => {
                panic!("expected a close frame with a code");
            }
            Some(Ok(_)) => continue,
        }
    }
}
