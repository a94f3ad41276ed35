// End-to-end session flow over a real websocket on loopback.

use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use pairlink::{Board, GameConfig, RoomRegistry, available_pairs, serve};
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn start_server() -> (String, Arc<RoomRegistry>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let registry = Arc::new(RoomRegistry::new(GameConfig::default()).unwrap());
    tokio::spawn(serve(listener, Arc::clone(&registry)));
    (format!("ws://{addr}"), registry)
}

async fn recv(client: &mut Client) -> Value {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), client.next())
            .await
            .expect("timed out waiting for event")
            .expect("stream closed")
            .expect("websocket error");
        if let Message::Text(text) = msg {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

async fn send(client: &mut Client, event: Value) {
    client.send(Message::Text(event.to_string())).await.unwrap();
}

/// Connects and returns the client with its assigned player id.
async fn join_server(url: &str) -> (Client, String) {
    let (mut client, _) = connect_async(url).await.unwrap();
    let hello = recv(&mut client).await;
    assert_eq!(hello["event"], "connected");
    let player = hello["data"]["player"].to_string();
    (client, player)
}

async fn wait_for_rooms(registry: &RoomRegistry, expected: usize) {
    for _ in 0..100 {
        if registry.room_count() == expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("room count never reached {expected}");
}

#[tokio::test]
async fn two_players_match_a_pair_then_one_leaves() {
    let (url, registry) = start_server().await;

    let (mut alice, alice_id) = join_server(&url).await;
    send(&mut alice, json!({"event": "create_room", "data": {"name": "alice"}})).await;
    let created = recv(&mut alice).await;
    assert_eq!(created["event"], "room_created");
    let room = created["data"]["room"].as_str().unwrap().to_string();
    assert_eq!(room.len(), 6);

    let (mut bob, bob_id) = join_server(&url).await;
    send(
        &mut bob,
        json!({"event": "join_room_request", "data": {"room": room, "name": "bob"}}),
    )
    .await;

    let start = recv(&mut alice).await;
    assert_eq!(recv(&mut bob).await, start);
    assert_eq!(start["event"], "start_game");
    assert_eq!(start["data"]["room"], room.as_str());
    assert_eq!(start["data"]["players"][&alice_id], "alice");
    assert_eq!(start["data"]["players"][&bob_id], "bob");
    assert_eq!(start["data"]["scores"][&alice_id], 0);

    let board: Board = serde_json::from_value(start["data"]["board"].clone()).unwrap();
    let pairs = available_pairs(&board);
    assert!(pairs.len() >= 3);
    let (a, b) = pairs[0];

    send(
        &mut alice,
        json!({"event": "select", "data": {"room": room, "a": [a.row, a.col], "b": [b.row, b.col]}}),
    )
    .await;
    let update = recv(&mut alice).await;
    assert_eq!(recv(&mut bob).await, update);
    assert_eq!(update["event"], "update");
    assert_eq!(update["data"]["scores"][&alice_id], 20);
    assert_eq!(update["data"]["scores"][&bob_id], 0);
    assert_eq!(update["data"]["removed"], json!([[a.row, a.col], [b.row, b.col]]));
    let path = update["data"]["path"].as_array().unwrap();
    assert!(path.len() >= 2);
    assert_eq!(path[0], json!([a.row, a.col]));

    bob.close(None).await.unwrap();
    let exit = recv(&mut alice).await;
    assert_eq!(exit["event"], "force_exit");
    wait_for_rooms(&registry, 0).await;

    send(&mut alice, json!({"event": "restart", "data": {"room": room}})).await;
    let err = recv(&mut alice).await;
    assert_eq!(err["event"], "room_error");
}

#[tokio::test]
async fn errors_go_back_to_the_requester() {
    let (url, _registry) = start_server().await;
    let (mut carol, _) = join_server(&url).await;

    send(
        &mut carol,
        json!({"event": "join_room_request", "data": {"room": "NOROOM", "name": "carol"}}),
    )
    .await;
    let err = recv(&mut carol).await;
    assert_eq!(err["event"], "room_error");
    assert_eq!(err["data"]["msg"], "room NOROOM does not exist");

    carol.send(Message::Text("not json".into())).await.unwrap();
    let err = recv(&mut carol).await;
    assert_eq!(err["event"], "room_error");
    assert!(err["data"]["msg"].as_str().unwrap().starts_with("malformed event"));
}

#[tokio::test]
async fn third_player_is_turned_away_and_bad_moves_are_rejected() {
    let (url, _registry) = start_server().await;
    let (mut alice, _) = join_server(&url).await;
    send(&mut alice, json!({"event": "create_room", "data": {"name": "alice"}})).await;
    let room = recv(&mut alice).await["data"]["room"]
        .as_str()
        .unwrap()
        .to_string();

    let (mut bob, _) = join_server(&url).await;
    send(
        &mut bob,
        json!({"event": "join_room_request", "data": {"room": room, "name": "bob"}}),
    )
    .await;
    recv(&mut alice).await;
    recv(&mut bob).await;

    let (mut carol, _) = join_server(&url).await;
    send(
        &mut carol,
        json!({"event": "join_room_request", "data": {"room": room, "name": "carol"}}),
    )
    .await;
    let full = recv(&mut carol).await;
    assert_eq!(full, json!({"event": "room_error", "data": {"msg": "room is full"}}));

    send(
        &mut bob,
        json!({"event": "select", "data": {"room": room, "a": [0, 0], "b": [0, 0]}}),
    )
    .await;
    let rejected = recv(&mut bob).await;
    assert_eq!(
        rejected,
        json!({"event": "move_rejected", "data": {"a": [0, 0], "b": [0, 0]}})
    );
}
