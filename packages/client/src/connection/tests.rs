use std::time::Duration;

use tokio::time::{Instant, sleep};
use tsunagi_shared::{
    protocol::{KickReason, ServerFrame},
    time::FixedClock,
};

use super::*;
use crate::{
    session::SessionRecord,
    storage::{AUTH_TOKEN_KEY, FileStore, MemoryStore, SESSION_KEY},
    transport::{
        DisconnectReason, LinkEvent,
        testing::{RemoteEnd, Script, ScriptedConnector},
    },
};

// ========================================
// テスト作業記録
// ========================================
// 【何をテストするか】
// - connect: 引数チェック、既存接続の再利用、別ユーザーへの差し替え
// - 再接続: 線形バックオフ、最大 5 回、成功時のカウンタリセット、Room への再参加
// - 認証拒否: トークンとセッションの削除、再接続しない
// - disconnect / restore_from_session
// - request / ack の対応付け
// ========================================

const NOW: i64 = 1_700_000_000_000;
const HOUR_MS: i64 = 60 * 60 * 1000;

struct Fixture {
    manager: ConnectionManager,
    connector: Arc<ScriptedConnector>,
    remote_ends: mpsc::UnboundedReceiver<RemoteEnd>,
    store: Arc<MemoryStore>,
}

fn fixture_with(config: ClientConfig, script: Vec<Script>, otherwise: Script) -> Fixture {
    let (connector, remote_ends) = ScriptedConnector::new(script, otherwise);
    let connector = Arc::new(connector);
    let store = Arc::new(MemoryStore::new());
    let manager = ConnectionManager::new(
        config,
        connector.clone(),
        store.clone(),
        Arc::new(FixedClock::new(NOW)),
    );
    Fixture {
        manager,
        connector,
        remote_ends,
        store,
    }
}

fn fixture(script: Vec<Script>, otherwise: Script) -> Fixture {
    fixture_with(ClientConfig::default(), script, otherwise)
}

fn seed_session(store: &MemoryStore, user_id: &str, timestamp: i64) {
    let record = SessionRecord {
        user_id: user_id.to_string(),
        timestamp,
    };
    store
        .set(SESSION_KEY, &serde_json::to_string(&record).unwrap())
        .unwrap();
}

async fn wait_for_state(
    status: &mut watch::Receiver<ConnectionStatus>,
    state: ConnectionState,
) -> ConnectionStatus {
    status.wait_for(|s| s.state == state).await.unwrap().clone()
}

#[tokio::test]
async fn test_connect_with_empty_user_id() {
    // テスト項目: 空のユーザー ID では接続を開始しない
    // given (前提条件):
    let f = fixture(vec![], Script::Accept);

    // when (操作):
    let handle = f.manager.connect("");

    // then (期待する結果):
    assert!(handle.is_none());
    assert_eq!(f.manager.status().state, ConnectionState::Idle);
    assert_eq!(f.connector.opens(), 0);
}

#[test]
fn test_connect_without_runtime() {
    // テスト項目: 非同期ランタイムがない場合は接続を開始せず None を返す
    // given (前提条件):
    let f = fixture(vec![], Script::Accept);

    // when (操作):
    let handle = f.manager.connect("alice");

    // then (期待する結果):
    assert!(handle.is_none());
    assert_eq!(f.manager.status().state, ConnectionState::Idle);
}

#[tokio::test]
async fn test_connect_fails_fast_without_required_token() {
    // テスト項目: トークン必須の設定でトークンがなければ接続を開始しない
    // given (前提条件):
    let config = ClientConfig {
        require_auth_token: true,
        ..ClientConfig::default()
    };
    let f = fixture_with(config, vec![], Script::Accept);

    // when (操作):
    let handle = f.manager.connect("alice");

    // then (期待する結果):
    assert!(handle.is_none());
    assert_eq!(f.connector.opens(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_connect_persists_session_and_attaches_token() {
    // テスト項目: 接続成功でセッションが保存され、保存済みトークンが接続に付与される
    // given (前提条件):
    let mut f = fixture(vec![], Script::Accept);
    f.store.set(AUTH_TOKEN_KEY, "secret").unwrap();

    // when (操作):
    let handle = f.manager.connect("alice").unwrap();
    let connected = handle.wait_connected().await;

    // then (期待する結果):
    assert!(connected);
    assert!(f.manager.is_connected());
    let status = f.manager.status();
    assert_eq!(status.reconnect_attempt, 0);
    assert_eq!(status.connection_id.as_deref(), Some("conn-1"));
    let remote = f.remote_ends.recv().await.unwrap();
    assert_eq!(remote.request.user_id, "alice");
    assert_eq!(remote.request.auth_token.as_deref(), Some("secret"));
    assert_eq!(
        f.manager.sessions().load(),
        Some(SessionRecord {
            user_id: "alice".to_string(),
            timestamp: NOW,
        })
    );
}

#[tokio::test(start_paused = true)]
async fn test_connect_returns_existing_connection() {
    // テスト項目: 接続中・接続済みの同一ユーザーには既存の接続が返される
    // given (前提条件):
    let f = fixture(vec![], Script::Accept);
    let first = f.manager.connect("alice").unwrap();
    assert!(f.manager.is_connecting());

    // when (操作):
    let while_connecting = f.manager.connect("alice").unwrap();
    first.wait_connected().await;
    let while_connected = f.manager.connect("alice").unwrap();

    // then (期待する結果):
    assert_eq!(while_connecting.user_id(), "alice");
    assert_eq!(while_connected.user_id(), "alice");
    assert_eq!(f.connector.opens(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_connect_different_user_replaces_connection() {
    // テスト項目: 別のユーザーで接続すると既存の接続が置き換えられる
    // given (前提条件):
    let mut f = fixture(vec![], Script::Accept);
    f.manager.connect("alice").unwrap().wait_connected().await;
    let mut alice_remote = f.remote_ends.recv().await.unwrap();
    f.manager.rooms().mark_joined("chat_alice_bob");

    // when (操作):
    let handle = f.manager.connect("carol").unwrap();
    handle.wait_connected().await;

    // then (期待する結果):
    let carol_remote = f.remote_ends.recv().await.unwrap();
    assert_eq!(carol_remote.request.user_id, "carol");
    assert_eq!(f.manager.user_id().as_deref(), Some("carol"));
    assert!(f.manager.rooms().joined().is_empty());
    assert_eq!(alice_remote.frames.recv().await, None);
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_gives_up_after_five_retries() {
    // テスト項目: 接続失敗が続くと 6 回目の試行の後に諦め、カウンタとセッションがリセットされる
    // given (前提条件):
    let f = fixture(vec![], Script::Fail);
    seed_session(&f.store, "alice", NOW);
    let mut status = f.manager.subscribe_status();
    let started = Instant::now();

    // when (操作):
    f.manager.connect("alice").unwrap();
    let last = wait_for_state(&mut status, ConnectionState::Idle).await;

    // then (期待する結果):
    assert_eq!(f.connector.opens(), 6);
    assert_eq!(started.elapsed(), Duration::from_secs(3 + 6 + 9 + 9 + 9));
    assert_eq!(last.reconnect_attempt, 0);
    assert_eq!(last.termination, Some(Termination::RetriesExhausted));
    assert!(last.is_final_failure());
    assert_eq!(f.manager.sessions().load(), None);

    sleep(Duration::from_secs(60)).await;
    assert_eq!(f.connector.opens(), 6);
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_delays_are_linear_and_capped() {
    // テスト項目: 再試行は 3 秒, 6 秒, 9 秒の間隔で行われる
    // given (前提条件):
    let f = fixture(vec![], Script::Fail);

    // when (操作):
    f.manager.connect("alice").unwrap();

    // then (期待する結果):
    sleep(Duration::from_millis(2_999)).await;
    assert_eq!(f.connector.opens(), 1);
    sleep(Duration::from_millis(2)).await;
    assert_eq!(f.connector.opens(), 2);
    assert_eq!(f.manager.status().reconnect_attempt, 2);

    // 2 回目の失敗から 6 秒後
    sleep(Duration::from_millis(5_998)).await;
    assert_eq!(f.connector.opens(), 2);
    sleep(Duration::from_millis(2)).await;
    assert_eq!(f.connector.opens(), 3);

    // 3 回目以降は 9 秒
    sleep(Duration::from_millis(8_998)).await;
    assert_eq!(f.connector.opens(), 3);
    sleep(Duration::from_millis(2)).await;
    assert_eq!(f.connector.opens(), 4);
    assert!(f.manager.is_connecting());
}

#[tokio::test(start_paused = true)]
async fn test_drop_reconnects_and_rejoins_rooms() {
    // テスト項目: 切断後に再接続し、参加中の Room に再参加し、カウンタが 0 に戻る
    // given (前提条件):
    let mut f = fixture(vec![], Script::Accept);
    f.manager.connect("alice").unwrap().wait_connected().await;
    let first = f.remote_ends.recv().await.unwrap();
    f.manager.rooms().mark_joined("chat_alice_bob");
    let mut status = f.manager.subscribe_status();
    let dropped_at = Instant::now();

    // when (操作):
    first
        .events
        .send(LinkEvent::Closed(DisconnectReason::Error("reset".to_string())))
        .unwrap();
    let mut second = f.remote_ends.recv().await.unwrap();

    // then (期待する結果):
    assert_eq!(dropped_at.elapsed(), Duration::from_secs(3));
    assert_eq!(
        second.frames.recv().await,
        Some(ClientFrame::JoinRoom {
            room_id: "chat_alice_bob".to_string()
        })
    );
    let current = wait_for_state(&mut status, ConnectionState::Connected).await;
    assert_eq!(current.reconnect_attempt, 0);
    assert_eq!(current.connection_id.as_deref(), Some("conn-2"));
}

#[tokio::test(start_paused = true)]
async fn test_transient_drop_keeps_session() {
    // テスト項目: 一時的な切断ではセッションは削除されない
    // given (前提条件):
    let mut f = fixture(vec![Script::Accept], Script::Fail);
    f.manager.connect("alice").unwrap().wait_connected().await;
    let first = f.remote_ends.recv().await.unwrap();

    // when (操作):
    first
        .events
        .send(LinkEvent::Closed(DisconnectReason::Closed))
        .unwrap();
    sleep(Duration::from_secs(1)).await;

    // then (期待する結果):
    assert!(f.manager.is_connecting());
    assert!(f.manager.sessions().load().is_some());
}

#[tokio::test(start_paused = true)]
async fn test_connect_attempt_timeout_counts_as_failure() {
    // テスト項目: 接続試行がタイムアウトすると失敗として扱われ、再試行される
    // given (前提条件):
    let f = fixture(vec![Script::Hang], Script::Accept);
    let started = Instant::now();

    // when (操作):
    let connected = f.manager.connect("alice").unwrap().wait_connected().await;

    // then (期待する結果):
    assert!(connected);
    assert_eq!(f.connector.opens(), 2);
    assert_eq!(started.elapsed(), Duration::from_secs(10 + 3));
}

#[tokio::test(start_paused = true)]
async fn test_auth_rejection_at_handshake() {
    // テスト項目: ハンドシェイクで認証拒否されるとトークンとセッションを消し、再接続しない
    // given (前提条件):
    let f = fixture(vec![], Script::Unauthorized);
    f.store.set(AUTH_TOKEN_KEY, "stale").unwrap();
    seed_session(&f.store, "alice", NOW);
    let mut status = f.manager.subscribe_status();

    // when (操作):
    f.manager.connect("alice").unwrap();
    let last = wait_for_state(&mut status, ConnectionState::Idle).await;
    sleep(Duration::from_secs(60)).await;

    // then (期待する結果):
    assert_eq!(last.termination, Some(Termination::AuthRejected));
    assert_eq!(f.connector.opens(), 1);
    assert_eq!(f.manager.tokens().load(), None);
    assert_eq!(f.manager.sessions().load(), None);
}

#[tokio::test(start_paused = true)]
async fn test_kicked_unauthorized_while_connected() {
    // テスト項目: 接続中に unauthorized で切断されると認証拒否として扱われる
    // given (前提条件):
    let mut f = fixture(vec![], Script::Accept);
    f.store.set(AUTH_TOKEN_KEY, "revoked").unwrap();
    f.manager.connect("alice").unwrap().wait_connected().await;
    let remote = f.remote_ends.recv().await.unwrap();
    let mut status = f.manager.subscribe_status();

    // when (操作):
    remote
        .events
        .send(LinkEvent::Frame(ServerFrame::Kicked {
            reason: KickReason::Unauthorized,
        }))
        .unwrap();
    let last = wait_for_state(&mut status, ConnectionState::Idle).await;

    // then (期待する結果):
    assert_eq!(last.termination, Some(Termination::AuthRejected));
    assert_eq!(f.connector.opens(), 1);
    assert_eq!(f.manager.tokens().load(), None);
    assert_eq!(f.manager.sessions().load(), None);
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_tears_everything_down() {
    // テスト項目: disconnect で接続を閉じ、セッションと参加 Room を破棄し、再接続しない
    // given (前提条件):
    let mut f = fixture(vec![], Script::Accept);
    f.manager.connect("alice").unwrap().wait_connected().await;
    let mut remote = f.remote_ends.recv().await.unwrap();
    f.manager.rooms().mark_joined("chat_alice_bob");

    // when (操作):
    f.manager.disconnect();
    sleep(Duration::from_secs(60)).await;

    // then (期待する結果):
    let status = f.manager.status();
    assert_eq!(status.state, ConnectionState::Idle);
    assert_eq!(status.termination, Some(Termination::UserRequested));
    assert!(!status.is_final_failure());
    assert_eq!(remote.frames.recv().await, None);
    assert_eq!(f.manager.sessions().load(), None);
    assert!(f.manager.rooms().joined().is_empty());
    assert_eq!(f.connector.opens(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_cancels_pending_reconnect() {
    // テスト項目: 再接続待ちの間に disconnect すると再試行は行われない
    // given (前提条件):
    let f = fixture(vec![], Script::Fail);
    f.manager.connect("alice").unwrap();
    sleep(Duration::from_secs(1)).await;

    // when (操作):
    f.manager.disconnect();
    sleep(Duration::from_secs(60)).await;

    // then (期待する結果):
    assert_eq!(f.connector.opens(), 1);
    assert_eq!(f.manager.status().termination, Some(Termination::UserRequested));
}

#[tokio::test(start_paused = true)]
async fn test_restore_from_valid_session() {
    // テスト項目: 有効なセッションからは保存されたユーザーで再接続する
    // given (前提条件):
    let mut f = fixture(vec![], Script::Accept);
    seed_session(&f.store, "alice", NOW - 23 * HOUR_MS);

    // when (操作):
    let handle = f.manager.restore_from_session().unwrap();
    handle.wait_connected().await;

    // then (期待する結果):
    assert_eq!(handle.user_id(), "alice");
    let remote = f.remote_ends.recv().await.unwrap();
    assert_eq!(remote.request.user_id, "alice");
}

#[tokio::test(start_paused = true)]
async fn test_restore_from_expired_session() {
    // テスト項目: 25 時間前のセッションは復元されずに削除される
    // given (前提条件):
    let f = fixture(vec![], Script::Accept);
    seed_session(&f.store, "alice", NOW - 25 * HOUR_MS);

    // when (操作):
    let handle = f.manager.restore_from_session();

    // then (期待する結果):
    assert!(handle.is_none());
    assert_eq!(f.store.get(SESSION_KEY).unwrap(), None);
    assert_eq!(f.connector.opens(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_restore_from_malformed_session() {
    // テスト項目: 壊れたセッションは復元されずに削除される
    // given (前提条件):
    let f = fixture(vec![], Script::Accept);
    f.store.set(SESSION_KEY, "garbage").unwrap();

    // when (操作):
    let handle = f.manager.restore_from_session();

    // then (期待する結果):
    assert!(handle.is_none());
    assert_eq!(f.store.get(SESSION_KEY).unwrap(), None);
}

#[tokio::test(start_paused = true)]
async fn test_request_is_correlated_with_ack() {
    // テスト項目: request_id で ack が対応するリクエストに届く
    // given (前提条件):
    let mut f = fixture(vec![], Script::Accept);
    f.manager.connect("alice").unwrap().wait_connected().await;
    let mut remote = f.remote_ends.recv().await.unwrap();

    // when (操作):
    let waiter = f
        .manager
        .request(|request_id| ClientFrame::CreateRoom {
            request_id,
            user_id: "alice".to_string(),
            target_id: "bob".to_string(),
        })
        .unwrap();
    let Some(ClientFrame::CreateRoom { request_id, .. }) = remote.frames.recv().await else {
        panic!("expected create-room frame");
    };
    remote
        .events
        .send(LinkEvent::Frame(ServerFrame::Ack {
            request_id,
            success: true,
            room_id: Some("chat_alice_bob".to_string()),
            error: None,
        }))
        .unwrap();

    // then (期待する結果):
    assert_eq!(waiter.request_id(), request_id);
    assert_eq!(
        waiter.wait().await,
        Ok(Ack {
            success: true,
            room_id: Some("chat_alice_bob".to_string()),
            error: None,
        })
    );
}

#[tokio::test(start_paused = true)]
async fn test_abandoned_request_ignores_late_ack() {
    // テスト項目: 破棄されたリクエストへの遅れた ack は無視され、接続は維持される
    // given (前提条件):
    let mut f = fixture(vec![], Script::Accept);
    f.manager.connect("alice").unwrap().wait_connected().await;
    let remote = f.remote_ends.recv().await.unwrap();
    let waiter = f
        .manager
        .request(|request_id| ClientFrame::CreateRoom {
            request_id,
            user_id: "alice".to_string(),
            target_id: "bob".to_string(),
        })
        .unwrap();
    let request_id = waiter.request_id();

    // when (操作):
    drop(waiter);
    remote
        .events
        .send(LinkEvent::Frame(ServerFrame::Ack {
            request_id,
            success: true,
            room_id: None,
            error: None,
        }))
        .unwrap();
    sleep(Duration::from_millis(10)).await;

    // then (期待する結果):
    assert!(f.manager.is_connected());
}

#[tokio::test(start_paused = true)]
async fn test_pending_request_fails_when_link_drops() {
    // テスト項目: ack を待っている間に切断されるとリクエストは失敗する
    // given (前提条件):
    let mut f = fixture(vec![Script::Accept], Script::Fail);
    f.manager.connect("alice").unwrap().wait_connected().await;
    let remote = f.remote_ends.recv().await.unwrap();
    let waiter = f
        .manager
        .request(|request_id| ClientFrame::CreateRoom {
            request_id,
            user_id: "alice".to_string(),
            target_id: "bob".to_string(),
        })
        .unwrap();

    // when (操作):
    remote
        .events
        .send(LinkEvent::Closed(DisconnectReason::Closed))
        .unwrap();

    // then (期待する結果):
    assert_eq!(waiter.wait().await, Err(RequestError::LinkClosed));
}

#[tokio::test]
async fn test_request_without_connection() {
    // テスト項目: 未接続ではリクエストを送れない
    // given (前提条件):
    let f = fixture(vec![], Script::Fail);

    // when (操作):
    let result = f.manager.request(|request_id| ClientFrame::CreateRoom {
        request_id,
        user_id: "alice".to_string(),
        target_id: "bob".to_string(),
    });

    // then (期待する結果):
    assert!(matches!(result, Err(RequestError::NotConnected)));
}

#[tokio::test]
async fn test_session_storage_settled_before_status_is_published() {
    // テスト項目: 状態が通知された時点で、セッションの保存・削除はストレージに反映済みである
    // given (前提条件):
    let dir = tempfile::tempdir().unwrap();
    let session_file = dir.path().join(SESSION_KEY);
    let (connector, mut remote_ends) = ScriptedConnector::new(vec![], Script::Accept);
    let manager = ConnectionManager::new(
        ClientConfig::default(),
        Arc::new(connector),
        Arc::new(FileStore::new(dir.path())),
        Arc::new(FixedClock::new(NOW)),
    );
    let mut status = manager.subscribe_status();

    // when (操作):
    manager.connect("alice").unwrap();
    let mut saved_when_connected = false;
    status
        .wait_for(|s| {
            let connected = s.state == ConnectionState::Connected;
            if connected {
                saved_when_connected = session_file.exists();
            }
            connected
        })
        .await
        .unwrap();

    let remote = remote_ends.recv().await.unwrap();
    remote
        .events
        .send(LinkEvent::Frame(ServerFrame::Kicked {
            reason: KickReason::Unauthorized,
        }))
        .unwrap();
    let mut present_when_idle = true;
    status
        .wait_for(|s| {
            let idle = s.state == ConnectionState::Idle;
            if idle {
                present_when_idle = session_file.exists();
            }
            idle
        })
        .await
        .unwrap();

    // then (期待する結果):
    assert!(saved_when_connected);
    assert!(!present_when_idle);
}
