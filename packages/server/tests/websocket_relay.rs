//! WebSocket integration tests.
//!
//! Tests for admission, room-scoped broadcast, history replay, the stock
//! command and bus relay, against in-process servers.

mod fixtures;

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use chatrelay_server::{
    domain::{BusChannel, BusRecord, MessageBus, QuoteError, QuoteFetcher, RoomRegistry},
    infrastructure::bus::InMemoryBus,
};
use fixtures::{
    TestServer, recv_message, room, send_text, token_for, try_recv_message,
};
use futures_util::StreamExt;
use tokio_tungstenite::{connect_async, tungstenite};

/// Quote fetcher with a fixed price
struct FixedQuote(&'static str);

#[async_trait]
impl QuoteFetcher for FixedQuote {
    async fn fetch(&self, ticker: &str) -> Result<String, QuoteError> {
        if ticker.eq_ignore_ascii_case("aapl") {
            Ok(self.0.to_string())
        } else {
            Err(QuoteError::NotFound(ticker.to_string()))
        }
    }
}

#[tokio::test]
async fn test_message_reaches_same_room_only() {
    // テスト項目: lobby の A の発言は lobby の B に届き、other のクライアントには届かない
    // given (前提条件):
    let server = TestServer::start().await;
    let mut alice = server.connect("A", "lobby").await;
    let mut bob = server.connect("B", "lobby").await;
    let mut carol = server.connect("C", "other").await;

    // when (操作):
    send_text(&mut alice, "hello").await;

    // then (期待する結果):
    let message = recv_message(&mut bob).await;
    assert_eq!(message.user, "A");
    assert_eq!(message.text, "hello");
    assert_eq!(message.room_name, "lobby");
    assert!(message.parsed_timestamp().is_some());

    // 送信者自身にも届く
    let echo = recv_message(&mut alice).await;
    assert_eq!(echo.text, "hello");

    assert!(
        try_recv_message(&mut carol, Duration::from_millis(200))
            .await
            .is_none()
    );
}

#[tokio::test]
async fn test_invalid_token_is_rejected_before_join() {
    // テスト項目: 無効なトークンでの接続は 401 で拒否され、ルームに参加しない
    // given (前提条件):
    let server = TestServer::start().await;
    let _alice = server.connect("A", "lobby").await;

    // when (操作):
    let bad = connect_async(server.ws_url("not-a-token", Some("lobby"))).await;
    let missing = connect_async(format!("ws://{}/ws?room=lobby", server.addr)).await;

    // then (期待する結果):
    for result in [bad, missing] {
        match result {
            Err(tungstenite::Error::Http(response)) => assert_eq!(response.status(), 401),
            other => panic!("expected 401, got {:?}", other.map(|(_, r)| r.status())),
        }
    }
    assert_eq!(server.registry.client_count(&room("lobby")).await, 1);
}

#[tokio::test]
async fn test_invalid_room_name_is_bad_request() {
    // テスト項目: 区切り文字を含むルーム名は 400 で拒否される
    // given (前提条件):
    let server = TestServer::start().await;

    // when (操作):
    let result = connect_async(server.ws_url(&token_for("A"), Some("a%7Cb"))).await;

    // then (期待する結果):
    match result {
        Err(tungstenite::Error::Http(response)) => assert_eq!(response.status(), 400),
        other => panic!("expected 400, got {:?}", other.map(|(_, r)| r.status())),
    }
    assert!(server.registry.room_names().await.is_empty());
}

#[tokio::test]
async fn test_missing_room_uses_default_room() {
    // テスト項目: ルーム名を省略するとデフォルトのルームに参加する
    // given (前提条件):
    let server = TestServer::start().await;
    let (mut ws, _) = connect_async(server.ws_url(&token_for("A"), None))
        .await
        .unwrap();
    server.wait_for_clients("general", 1).await;

    // when (操作):
    send_text(&mut ws, "hi").await;

    // then (期待する結果):
    let message = recv_message(&mut ws).await;
    assert_eq!(message.room_name, "general");
}

#[tokio::test]
async fn test_history_is_replayed_in_order() {
    // テスト項目: 参加時に履歴が送信順で再生され、その後の発言も届く
    // given (前提条件):
    let server = TestServer::start().await;
    let mut alice = server.connect("A", "lobby").await;
    for text in ["one", "two", "three"] {
        send_text(&mut alice, text).await;
    }
    server.wait_for_history("lobby", 3).await;

    // when (操作):
    let mut bob = server.connect("B", "lobby").await;
    send_text(&mut alice, "four").await;

    // then (期待する結果):
    let mut texts = Vec::new();
    for _ in 0..4 {
        texts.push(recv_message(&mut bob).await.text);
    }
    assert_eq!(texts, vec!["one", "two", "three", "four"]);
}

#[tokio::test]
async fn test_stock_command_echoes_and_publishes_trigger() {
    // テスト項目: /stock=AAPL はコマンド文字列として配送され、トリガーも発行される
    // given (前提条件):
    let server = TestServer::start().await;
    let mut triggers = server.bus.subscribe(BusChannel::StockTrigger).await.unwrap();
    let mut alice = server.connect("A", "lobby").await;

    // when (操作):
    send_text(&mut alice, "/stock=AAPL").await;

    // then (期待する結果):
    let echo = recv_message(&mut alice).await;
    assert_eq!(echo.text, "/stock=AAPL");
    assert_eq!(echo.user, "A");

    let trigger = tokio::time::timeout(Duration::from_secs(2), triggers.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(trigger.body, "lobby|AAPL");
}

#[tokio::test]
async fn test_stock_command_answered_by_bot() {
    // テスト項目: ボットが株価を取得し、"Bot" の発言としてルームに届く
    // given (前提条件):
    let server = TestServer::start_with_bot(Arc::new(FixedQuote("153.42"))).await;
    let mut alice = server.connect("A", "lobby").await;

    // when (操作):
    send_text(&mut alice, "/stock= aapl ").await;

    // then (期待する結果):
    let echo = recv_message(&mut alice).await;
    assert_eq!(echo.text, "/stock= aapl ");

    let answer = recv_message(&mut alice).await;
    assert_eq!(answer.user, "Bot");
    assert_eq!(answer.text, "AAPL quote is $153.42 per share");
    assert_eq!(answer.room_name, "lobby");
}

#[tokio::test]
async fn test_failed_quote_is_silent() {
    // テスト項目: 株価の取得に失敗してもルームには何も届かない
    // given (前提条件):
    let server = TestServer::start_with_bot(Arc::new(FixedQuote("1.00"))).await;
    let mut alice = server.connect("A", "lobby").await;

    // when (操作):
    send_text(&mut alice, "/stock=ZZZZ").await;

    // then (期待する結果):
    assert_eq!(recv_message(&mut alice).await.text, "/stock=ZZZZ");
    assert!(
        try_recv_message(&mut alice, Duration::from_millis(300))
            .await
            .is_none()
    );
}

#[tokio::test]
async fn test_relay_skips_malformed_record() {
    // テスト項目: 区切り文字の無いレコードは破棄され、次の正しいレコードは配送される
    // given (前提条件):
    let server = TestServer::start().await;
    let mut alice = server.connect("A", "room1").await;

    // when (操作):
    server
        .bus
        .publish(BusChannel::BotInbound, BusRecord::from_body("noDelimiterHere"))
        .await
        .unwrap();
    server
        .bus
        .publish(BusChannel::BotInbound, BusRecord::from_body("room1|hello"))
        .await
        .unwrap();

    // then (期待する結果):
    let message = recv_message(&mut alice).await;
    assert_eq!(message.text, "hello");
    assert_eq!(message.user, "Bot");
    assert!(
        try_recv_message(&mut alice, Duration::from_millis(200))
            .await
            .is_none()
    );
}

#[tokio::test]
async fn test_peer_relay_keeps_author() {
    // テスト項目: 他インスタンスから中継されたチャットは元の作者で届く
    // given (前提条件):
    let server = TestServer::start().await;
    let mut alice = server.connect("A", "lobby").await;

    // when (操作):
    server
        .bus
        .publish(
            BusChannel::ChatRelay,
            BusRecord::from_body("lobby|from afar")
                .with_author("zed")
                .with_origin("other-node"),
        )
        .await
        .unwrap();

    // then (期待する結果):
    let message = recv_message(&mut alice).await;
    assert_eq!(message.user, "zed");
    assert_eq!(message.text, "from afar");
}

#[tokio::test]
async fn test_disconnect_removes_client() {
    // テスト項目: クライアントが切断するとルームから外れる
    // given (前提条件):
    let server = TestServer::start().await;
    let mut alice = server.connect("A", "lobby").await;
    let _bob = server.connect("B", "lobby").await;

    // when (操作):
    alice.close(None).await.unwrap();

    // then (期待する結果):
    server.wait_for_clients("lobby", 1).await;
}

#[tokio::test]
async fn test_chat_reaches_client_on_other_instance() {
    // テスト項目: インスタンス A で送ったチャットが、同じバス上のインスタンス B のクライアントに届く
    // given (前提条件):
    let bus = Arc::new(InMemoryBus::new());
    let node_a = TestServer::start_on_bus(bus.clone(), "node-a").await;
    let node_b = TestServer::start_on_bus(bus.clone(), "node-b").await;
    let mut alice = node_a.connect("A", "lobby").await;
    let mut bob = node_b.connect("B", "lobby").await;

    // when (操作):
    send_text(&mut alice, "hello from a").await;

    // then (期待する結果):
    let echoed = recv_message(&mut alice).await;
    assert_eq!(echoed.text, "hello from a");

    let relayed = recv_message(&mut bob).await;
    assert_eq!(relayed.user, "A");
    assert_eq!(relayed.text, "hello from a");
    assert_eq!(relayed.room_name, "lobby");

    // 自インスタンスへの二重配送は起きない
    assert!(
        try_recv_message(&mut alice, Duration::from_millis(200))
            .await
            .is_none()
    );
}

#[tokio::test]
async fn test_chat_reaches_every_client_on_every_instance() {
    // テスト項目: 3 インスタンス構成で、A の連続したチャットが B と C の全クライアントへ全件届く
    // given (前提条件):
    let bus = Arc::new(InMemoryBus::new());
    let node_a = TestServer::start_on_bus(bus.clone(), "node-a").await;
    let node_b = TestServer::start_on_bus(bus.clone(), "node-b").await;
    let node_c = TestServer::start_on_bus(bus.clone(), "node-c").await;
    let mut alice = node_a.connect("A", "lobby").await;
    let mut listeners = vec![
        node_b.connect("B1", "lobby").await,
        node_b.connect("B2", "lobby").await,
        node_c.connect("C1", "lobby").await,
    ];
    let texts = ["one", "two", "three", "four"];

    // when (操作):
    for text in texts {
        send_text(&mut alice, text).await;
    }

    // then (期待する結果):
    // インスタンス間の到着順は保証しないので、集合として比較する
    let mut expected: Vec<String> = texts.iter().map(|t| t.to_string()).collect();
    expected.sort();
    for listener in &mut listeners {
        let mut received = Vec::new();
        for _ in 0..texts.len() {
            let message = recv_message(listener).await;
            assert_eq!(message.user, "A");
            received.push(message.text);
        }
        received.sort();
        assert_eq!(received, expected);
    }
    node_b.wait_for_history("lobby", texts.len()).await;
    node_c.wait_for_history("lobby", texts.len()).await;
}
