//! Integration tests for the room relay over real WebSocket connections.
//!
//! Spins up an actual HTTP server and connects WS clients to validate the
//! full lifecycle: join → ready → start → state relay → game over → leave.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;

use snake_relay::api::router::create_router;
use snake_relay::api::state::AppState;
use snake_relay::config::AppConfig;

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;
type WsWrite = futures_util::stream::SplitSink<WsStream, Message>;
type WsRead = futures_util::stream::SplitStream<WsStream>;

/// Helper: start the server on an OS-assigned port, return its base URL.
async fn start_server_with(config: AppConfig) -> String {
    let state = AppState::new(config);
    let app = create_router(state);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://127.0.0.1:{}", addr.port())
}

async fn start_server() -> String {
    start_server_with(AppConfig::default()).await
}

/// Helper: connect a WS client with optional room / name query parameters.
async fn ws_connect_url(base: &str, query: &str) -> (WsWrite, WsRead) {
    let ws_url = base.replace("http://", "ws://");
    let url = format!("{ws_url}/ws{query}");
    let (stream, _) = tokio_tungstenite::connect_async(&url).await.unwrap();
    stream.split()
}

async fn ws_connect(base: &str, room: &str, name: &str) -> (WsWrite, WsRead) {
    ws_connect_url(base, &format!("?room={room}&name={name}")).await
}

/// Helper: read the next text message as JSON, with a timeout.
async fn next_json(read: &mut WsRead) -> serde_json::Value {
    let text = next_text(read).await;
    serde_json::from_str(&text).expect("invalid JSON")
}

/// Helper: read the next text frame verbatim, skipping control frames.
async fn next_text(read: &mut WsRead) -> String {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), read.next())
            .await
            .expect("timed out waiting for WS message")
            .expect("stream ended")
            .expect("WS error");

        match msg {
            Message::Text(text) => return text.as_str().to_owned(),
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("expected Text message, got {other:?}"),
        }
    }
}

/// Helper: read `n` messages and return their `type` fields.
async fn next_types(read: &mut WsRead, n: usize) -> Vec<String> {
    let mut out = Vec::with_capacity(n);
    for _ in 0..n {
        let msg = next_json(read).await;
        out.push(msg["type"].as_str().unwrap().to_string());
    }
    out
}

async fn send_json(write: &mut WsWrite, value: serde_json::Value) {
    write
        .send(Message::Text(value.to_string().into()))
        .await
        .unwrap();
}

async fn assert_silent(read: &mut WsRead) {
    let result = tokio::time::timeout(Duration::from_millis(200), read.next()).await;
    assert!(result.is_err(), "expected no further messages");
}

async fn get_json(url: String) -> (reqwest::StatusCode, serde_json::Value) {
    let resp = reqwest::get(url).await.unwrap();
    let status = resp.status();
    (status, resp.json().await.unwrap())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn join_sends_player_join_then_room_status() {
    let base = start_server().await;
    let (_write, mut read) = ws_connect(&base, "r1", "alice").await;

    let join = next_json(&mut read).await;
    assert_eq!(join["type"], "playerJoin");
    assert_eq!(join["name"], "alice");
    assert_eq!(join["count"], 1);
    assert_eq!(join["players"], serde_json::json!(["alice"]));

    let status = next_json(&mut read).await;
    assert_eq!(status["type"], "roomStatus");
    assert_eq!(
        status["players"],
        serde_json::json!([{"name": "alice", "ready": false}])
    );
}

#[tokio::test]
async fn missing_query_uses_lobby_and_default_name() {
    let base = start_server().await;
    let (_write, mut read) = ws_connect_url(&base, "").await;

    let join = next_json(&mut read).await;
    assert_eq!(join["name"], "Player");

    let (status, body) = get_json(format!("{base}/api/rooms/lobby")).await;
    assert_eq!(status, reqwest::StatusCode::OK);
    assert_eq!(body["players"][0]["name"], "Player");
}

#[tokio::test]
async fn second_join_notifies_everyone() {
    let base = start_server().await;
    let (_w1, mut r1) = ws_connect(&base, "r1", "alice").await;
    let _ = next_types(&mut r1, 2).await;

    let (_w2, mut r2) = ws_connect(&base, "r1", "bob").await;
    for read in [&mut r1, &mut r2] {
        let join = next_json(read).await;
        assert_eq!(join["type"], "playerJoin");
        assert_eq!(join["name"], "bob");
        assert_eq!(join["count"], 2);
        let status = next_json(read).await;
        assert_eq!(status["type"], "roomStatus");
        assert_eq!(status["players"].as_array().unwrap().len(), 2);
    }
}

#[tokio::test]
async fn multi_mode_needs_two_ready_players() {
    let base = start_server().await;
    let (mut w1, mut r1) = ws_connect(&base, "m", "alice").await;
    let _ = next_types(&mut r1, 2).await;

    // Alone and ready: waiting 1/1, never startGame.
    send_json(&mut w1, serde_json::json!({"type": "ready", "mode": "multi"})).await;
    assert_eq!(next_json(&mut r1).await["type"], "roomStatus");
    let waiting = next_json(&mut r1).await;
    assert_eq!(waiting, serde_json::json!({"type": "waiting", "msg": "1/1 ready"}));
    assert_silent(&mut r1).await;

    // Second, unready player joins.
    let (mut w2, mut r2) = ws_connect(&base, "m", "bob").await;
    let _ = next_types(&mut r1, 2).await;
    let _ = next_types(&mut r2, 2).await;

    // Re-sending ready is idempotent: still one ready player out of two.
    send_json(&mut w1, serde_json::json!({"type": "ready", "mode": "multi"})).await;
    for read in [&mut r1, &mut r2] {
        assert_eq!(next_json(read).await["type"], "roomStatus");
        assert_eq!(next_json(read).await["msg"], "1/2 ready");
    }

    // Second player ready: both start.
    send_json(&mut w2, serde_json::json!({"type": "ready", "mode": "multi"})).await;
    for read in [&mut r1, &mut r2] {
        let status = next_json(read).await;
        assert_eq!(status["type"], "roomStatus");
        assert_eq!(
            status["players"],
            serde_json::json!([{"name": "alice", "ready": true}, {"name": "bob", "ready": true}])
        );
        let start = next_json(read).await;
        assert_eq!(start, serde_json::json!({"type": "startGame", "countdown": 3}));
    }

    let (_, room) = get_json(format!("{base}/api/rooms/m")).await;
    assert_eq!(room["inGame"], true);
    assert_eq!(room["mode"], "multi");
}

#[tokio::test]
async fn single_mode_starts_only_the_sender() {
    let base = start_server().await;
    let (mut w1, mut r1) = ws_connect(&base, "s", "solo").await;
    let _ = next_types(&mut r1, 2).await;
    let (_w2, mut r2) = ws_connect(&base, "s", "watcher").await;
    let _ = next_types(&mut r1, 2).await;
    let _ = next_types(&mut r2, 2).await;

    send_json(&mut w1, serde_json::json!({"type": "ready", "mode": "single"})).await;
    assert_eq!(next_json(&mut r1).await["type"], "roomStatus");
    assert_eq!(
        next_json(&mut r1).await,
        serde_json::json!({"type": "startGame", "countdown": 3})
    );

    assert_eq!(next_json(&mut r2).await["type"], "roomStatus");
    assert_silent(&mut r2).await;

    let (_, room) = get_json(format!("{base}/api/rooms/s")).await;
    assert_eq!(room["inGame"], true);
}

#[tokio::test]
async fn game_over_is_relayed_and_resets_ready() {
    let base = start_server().await;
    let (mut w1, mut r1) = ws_connect(&base, "g", "alice").await;
    let _ = next_types(&mut r1, 2).await;
    let (mut w2, mut r2) = ws_connect(&base, "g", "bob").await;
    let _ = next_types(&mut r1, 2).await;
    let _ = next_types(&mut r2, 2).await;

    send_json(&mut w1, serde_json::json!({"type": "ready", "mode": "multi"})).await;
    let _ = next_types(&mut r1, 2).await;
    let _ = next_types(&mut r2, 2).await;
    send_json(&mut w2, serde_json::json!({"type": "ready", "mode": "multi"})).await;
    assert_eq!(next_types(&mut r1, 2).await, ["roomStatus", "startGame"]);
    assert_eq!(next_types(&mut r2, 2).await, ["roomStatus", "startGame"]);

    let over = r#"{"type":"gameOver","winner":"bob","score":12}"#;
    w2.send(Message::Text(over.into())).await.unwrap();
    for read in [&mut r1, &mut r2] {
        assert_eq!(next_text(read).await, over);
        let status = next_json(read).await;
        assert_eq!(status["type"], "roomStatus");
        assert_eq!(
            status["players"],
            serde_json::json!([{"name": "alice", "ready": false}, {"name": "bob", "ready": false}])
        );
    }

    let (_, room) = get_json(format!("{base}/api/rooms/g")).await;
    assert_eq!(room["inGame"], false);
}

#[tokio::test]
async fn state_payload_is_forwarded_byte_for_byte() {
    let base = start_server().await;
    let (mut w1, mut r1) = ws_connect(&base, "st", "alice").await;
    let _ = next_types(&mut r1, 2).await;
    let (_w2, mut r2) = ws_connect(&base, "st", "bob").await;
    let _ = next_types(&mut r1, 2).await;
    let _ = next_types(&mut r2, 2).await;

    let payload = r#"{ "type" : "state", "snake":[[1,2],[1,3]], "food":{"x":7,"y":9}, "tag":"é" }"#;
    w1.send(Message::Text(payload.into())).await.unwrap();

    assert_eq!(next_text(&mut r2).await, payload);
    // The sender receives its own frame back.
    assert_eq!(next_text(&mut r1).await, payload);
}

#[tokio::test]
async fn state_echo_can_be_disabled() {
    let base = start_server_with(AppConfig {
        echo_state: false,
        ..AppConfig::default()
    })
    .await;
    let (mut w1, mut r1) = ws_connect(&base, "st", "alice").await;
    let _ = next_types(&mut r1, 2).await;
    let (_w2, mut r2) = ws_connect(&base, "st", "bob").await;
    let _ = next_types(&mut r1, 2).await;
    let _ = next_types(&mut r2, 2).await;

    w1.send(Message::Text(r#"{"type":"state"}"#.into()))
        .await
        .unwrap();
    assert_eq!(next_text(&mut r2).await, r#"{"type":"state"}"#);
    assert_silent(&mut r1).await;
}

#[tokio::test]
async fn leave_notifies_remaining_members() {
    let base = start_server().await;
    let (_w1, mut r1) = ws_connect(&base, "l", "alice").await;
    let _ = next_types(&mut r1, 2).await;
    let (mut w2, mut r2) = ws_connect(&base, "l", "bob").await;
    let _ = next_types(&mut r1, 2).await;
    let _ = next_types(&mut r2, 2).await;

    w2.close().await.unwrap();
    drop(r2);

    let leave = next_json(&mut r1).await;
    assert_eq!(leave["type"], "playerLeave");
    assert_eq!(leave["name"], "bob");
    assert_eq!(leave["count"], 1);
    assert_eq!(leave["players"], serde_json::json!(["alice"]));

    let status = next_json(&mut r1).await;
    assert_eq!(status["type"], "roomStatus");
    assert_eq!(
        status["players"],
        serde_json::json!([{"name": "alice", "ready": false}])
    );
}

#[tokio::test]
async fn different_rooms_are_isolated() {
    let base = start_server().await;
    let (mut w1, mut r1) = ws_connect(&base, "one", "alice").await;
    let (_w2, mut r2) = ws_connect(&base, "two", "bob").await;
    let _ = next_types(&mut r1, 2).await;
    let _ = next_types(&mut r2, 2).await;

    w1.send(Message::Text(r#"{"type":"state","x":1}"#.into()))
        .await
        .unwrap();
    assert_eq!(next_text(&mut r1).await, r#"{"type":"state","x":1}"#);
    assert_silent(&mut r2).await;
}

#[tokio::test]
async fn malformed_frame_returns_error_and_keeps_connection() {
    let base = start_server().await;
    let (mut w1, mut r1) = ws_connect(&base, "bad", "alice").await;
    let _ = next_types(&mut r1, 2).await;
    let (_w2, mut r2) = ws_connect(&base, "bad", "bob").await;
    let _ = next_types(&mut r1, 2).await;
    let _ = next_types(&mut r2, 2).await;

    w1.send(Message::Text("{not json".into())).await.unwrap();
    let err = next_json(&mut r1).await;
    assert_eq!(err["type"], "error");
    assert!(err["message"].as_str().unwrap().contains("malformed"));

    send_json(&mut w1, serde_json::json!({"type": "ready"})).await;
    assert_eq!(next_json(&mut r1).await["type"], "error");
    assert_silent(&mut r2).await;

    // Still connected and served normally.
    send_json(&mut w1, serde_json::json!({"type": "ready", "mode": "single"})).await;
    assert_eq!(next_types(&mut r1, 2).await, ["roomStatus", "startGame"]);
}

#[tokio::test]
async fn empty_room_is_reaped() {
    let base = start_server().await;
    let (mut w1, mut r1) = ws_connect(&base, "temp", "alice").await;
    let _ = next_types(&mut r1, 2).await;

    let (_, rooms) = get_json(format!("{base}/api/rooms")).await;
    assert_eq!(rooms.as_array().unwrap().len(), 1);

    w1.close().await.unwrap();
    drop(r1);

    let mut reaped = false;
    for _ in 0..50 {
        let (status, _) = get_json(format!("{base}/api/rooms/temp")).await;
        if status == reqwest::StatusCode::NOT_FOUND {
            reaped = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(reaped, "room should be removed after its last player leaves");

    let (_, health) = get_json(format!("{base}/health")).await;
    assert_eq!(health["rooms"], 0);
    assert_eq!(health["connections"], 0);
    assert_eq!(health["droppedFrames"], 0);
}

#[tokio::test]
async fn idle_connection_is_dropped() {
    let base = start_server_with(AppConfig {
        idle_timeout_secs: 1,
        ping_interval_secs: 0,
        ..AppConfig::default()
    })
    .await;
    let (_write, mut read) = ws_connect(&base, "idle", "sleepy").await;
    let _ = next_types(&mut read, 2).await;

    let closed = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match read.next().await {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                Some(Ok(_)) => continue,
            }
        }
    })
    .await;
    assert!(closed.is_ok(), "idle connection should be closed by the server");
}

#[tokio::test]
async fn server_pings_idle_clients() {
    let base = start_server_with(AppConfig {
        ping_interval_secs: 1,
        ..AppConfig::default()
    })
    .await;
    let (_write, mut read) = ws_connect(&base, "hb", "alice").await;
    let _ = next_types(&mut read, 2).await;

    let msg = tokio::time::timeout(Duration::from_secs(5), read.next())
        .await
        .expect("timed out waiting for ping")
        .expect("stream ended")
        .expect("WS error");
    assert!(matches!(msg, Message::Ping(_)), "got {msg:?}");
}
