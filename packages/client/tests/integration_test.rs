//! Integration tests running the client against an in-process signaling server.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use tokio::time::timeout;
use tsunagi_client::{
    ChatClient, ClientConfig, ConnectionState, Termination,
    fallback::{HttpRoomFallback, RoomFallback},
    storage::{AUTH_TOKEN_KEY, KeyValueStore, MemoryStore},
};
use tsunagi_server::{bootstrap::build_in_memory_state, ui::Server};

const WAIT: Duration = Duration::from_secs(5);

/// Start a server on an ephemeral port
async fn start_server(auth_token: Option<&str>) -> SocketAddr {
    Server::new(build_in_memory_state(auth_token.map(str::to_string)))
        .spawn_local()
        .await
        .expect("Failed to start server")
}

fn config_for(addr: SocketAddr) -> ClientConfig {
    ClientConfig::for_server(&addr.ip().to_string(), addr.port())
}

/// A local port nobody listens on
async fn unused_port() -> u16 {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

async fn connected_client(addr: SocketAddr, user_id: &str) -> ChatClient {
    let client = ChatClient::new(config_for(addr), Arc::new(MemoryStore::new()));
    let handle = client.connect_socket(user_id).expect("connect refused");
    assert!(timeout(WAIT, handle.wait_connected()).await.unwrap());
    client
}

#[tokio::test]
async fn test_two_clients_exchange_messages() {
    // テスト項目: 同じ Room に参加した 2 クライアント間でメッセージが届く
    // given (前提条件):
    let addr = start_server(None).await;
    let alice = connected_client(addr, "alice").await;
    let bob = connected_client(addr, "bob").await;

    let alice_room = alice.create_chat_room("alice", "bob").await;
    let bob_room = bob.create_chat_room("bob", "alice").await;
    assert!(alice_room.confirmed);
    assert!(bob_room.confirmed);
    assert_eq!(alice_room.room_id, "chat_alice_bob");
    assert_eq!(alice_room.room_id, bob_room.room_id);

    let mut bob_inbox = bob.subscribe(&bob_room.room_id);
    let mut alice_inbox = alice.subscribe(&alice_room.room_id);
    // joins are fire-and-forget, give the server a moment to process them
    tokio::time::sleep(Duration::from_millis(200)).await;

    // when (操作):
    assert!(alice.send_message(&alice_room.room_id, "hello bob", "alice"));

    // then (期待する結果):
    let received = timeout(WAIT, bob_inbox.recv()).await.unwrap().unwrap();
    assert_eq!(received.user_id, "alice");
    assert_eq!(received.content, "hello bob");
    assert_eq!(received.room_id, "chat_alice_bob");
    assert!(received.timestamp > 0);

    // 送信者自身には配送されない
    assert!(
        timeout(Duration::from_millis(200), alice_inbox.recv())
            .await
            .is_err()
    );
}

#[tokio::test]
async fn test_left_room_receives_nothing() {
    // テスト項目: Room から退出したクライアントにはメッセージが届かない
    // given (前提条件):
    let addr = start_server(None).await;
    let alice = connected_client(addr, "alice").await;
    let bob = connected_client(addr, "bob").await;
    let room = alice.create_chat_room("alice", "bob").await;
    bob.create_chat_room("bob", "alice").await;
    let mut bob_inbox = bob.subscribe(&room.room_id);

    // when (操作):
    assert!(bob.leave_room(&room.room_id));
    tokio::time::sleep(Duration::from_millis(200)).await;
    alice.send_message(&room.room_id, "anyone?", "alice");

    // then (期待する結果):
    assert!(
        timeout(Duration::from_millis(300), bob_inbox.recv())
            .await
            .is_err()
    );
}

#[tokio::test]
async fn test_http_fallback_creates_room_on_server() {
    // テスト項目: HTTP フォールバックで作成した Room がサーバーに登録される
    // given (前提条件):
    let addr = start_server(None).await;
    let fallback = HttpRoomFallback::new(format!("http://{}", addr));

    // when (操作):
    let first = fallback.create_chat("bob", "alice", None).await.unwrap();
    let second = fallback.create_chat("alice", "bob", None).await.unwrap();

    // then (期待する結果):
    assert!(first.success);
    assert_eq!(first.room_id.as_deref(), Some("chat_alice_bob"));
    assert_eq!(first.room_id, second.room_id);

    let detail: serde_json::Value =
        reqwest::get(format!("http://{}/api/rooms/chat_alice_bob", addr))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
    assert_eq!(detail["participants"], serde_json::json!(["alice", "bob"]));
}

#[tokio::test]
async fn test_http_fallback_rejected_without_token() {
    // テスト項目: トークン必須のサーバーではトークンなしの HTTP 作成が拒否される
    // given (前提条件):
    let addr = start_server(Some("secret")).await;
    let fallback = HttpRoomFallback::new(format!("http://{}", addr));

    // when (操作):
    let rejected = fallback.create_chat("alice", "bob", None).await;
    let accepted = fallback
        .create_chat("alice", "bob", Some("secret".to_string()))
        .await;

    // then (期待する結果):
    assert!(rejected.is_err());
    assert!(accepted.unwrap().success);
}

#[tokio::test]
async fn test_room_created_over_http_when_socket_unreachable() {
    // テスト項目: WebSocket に接続できない間は HTTP 経由で Room が作成される
    // given (前提条件):
    let addr = start_server(None).await;
    let config = ClientConfig {
        ws_url: format!("ws://127.0.0.1:{}/ws", unused_port().await),
        room_timeout: Duration::from_millis(300),
        ..config_for(addr)
    };
    let client = ChatClient::new(config, Arc::new(MemoryStore::new()));
    client.connect_socket("alice").expect("connect refused");

    // when (操作):
    let outcome = client.create_chat_room("alice", "bob").await;

    // then (期待する結果):
    assert!(outcome.success);
    assert!(outcome.confirmed);
    assert_eq!(outcome.room_id, "chat_alice_bob");
    assert!(outcome.note.unwrap().contains("HTTP"));
    assert!(!client.is_socket_connected());
}

#[tokio::test]
async fn test_authorized_client_connects() {
    // テスト項目: 正しいトークンを持つクライアントは接続できる
    // given (前提条件):
    let addr = start_server(Some("secret")).await;
    let store = Arc::new(MemoryStore::new());
    store.set(AUTH_TOKEN_KEY, "secret").unwrap();
    let client = ChatClient::new(config_for(addr), store);

    // when (操作):
    let handle = client.connect_socket("alice").unwrap();
    let connected = timeout(WAIT, handle.wait_connected()).await.unwrap();

    // then (期待する結果):
    assert!(connected);
    assert!(client.is_socket_connected());
}

#[tokio::test]
async fn test_rejected_token_ends_connection_and_clears_credentials() {
    // テスト項目: トークンが拒否されると再接続せず、トークンとセッションが破棄される
    // given (前提条件):
    let addr = start_server(Some("secret")).await;
    let store = Arc::new(MemoryStore::new());
    store.set(AUTH_TOKEN_KEY, "wrong").unwrap();
    let client = ChatClient::new(config_for(addr), store.clone());

    // when (操作):
    let handle = client.connect_socket("alice").unwrap();
    let connected = timeout(WAIT, handle.wait_connected()).await.unwrap();

    // then (期待する結果):
    assert!(!connected);
    let status = client.status();
    assert_eq!(status.state, ConnectionState::Idle);
    assert_eq!(status.termination, Some(Termination::AuthRejected));
    assert_eq!(store.get(AUTH_TOKEN_KEY).unwrap(), None);
    assert!(client.connection().sessions().load().is_none());
}

#[tokio::test]
async fn test_session_restored_by_new_client() {
    // テスト項目: 保存されたセッションから別のクライアントが同じユーザーで再接続できる
    // given (前提条件):
    let addr = start_server(None).await;
    let store = Arc::new(MemoryStore::new());
    let first = ChatClient::new(config_for(addr), store.clone());
    let handle = first.connect_socket("alice").unwrap();
    assert!(timeout(WAIT, handle.wait_connected()).await.unwrap());
    drop(first);

    // when (操作):
    let second = ChatClient::new(config_for(addr), store);
    let restored = second.restore_socket_session().expect("no session");

    // then (期待する結果):
    assert_eq!(restored.user_id(), "alice");
    assert!(timeout(WAIT, restored.wait_connected()).await.unwrap());
}

#[tokio::test]
async fn test_disconnect_discards_session() {
    // テスト項目: 明示的な切断の後はセッションを復元できない
    // given (前提条件):
    let addr = start_server(None).await;
    let store = Arc::new(MemoryStore::new());
    let client = ChatClient::new(config_for(addr), store.clone());
    let handle = client.connect_socket("alice").unwrap();
    assert!(timeout(WAIT, handle.wait_connected()).await.unwrap());

    // when (操作):
    client.disconnect_socket();

    // then (期待する結果):
    assert!(!client.is_socket_connected());
    assert_eq!(client.status().termination, Some(Termination::UserRequested));
    let other = ChatClient::new(config_for(addr), store);
    assert!(other.restore_socket_session().is_none());
}
