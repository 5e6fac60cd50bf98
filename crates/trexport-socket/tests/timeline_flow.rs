//! 가짜 서버(loopback)로 타임라인 조회 전체 흐름을 검증합니다.

use rust_decimal_macros::dec;
use serde_json::{json, Value};
use std::time::Duration;
use trexport_core::TransactionEventType;
use trexport_socket::transport::Outbound;
use trexport_socket::{
    fetch_timeline, loopback, Connection, EmptyWorkSet, FetchOptions, LoopbackPeer, Session,
    SessionToken, SocketError,
};

fn session(capacity: usize) -> (Session, LoopbackPeer) {
    let (handle, peer) = loopback(capacity);
    let session = Session::new(
        Connection::new(handle, "connect 31 {}"),
        SessionToken::new("secret-token"),
    );
    (session, peer)
}

fn data(id: u64, body: Value) -> String {
    format!("{} A {}", id, body)
}

fn sent_frames(peer: &mut LoopbackPeer) -> Vec<String> {
    let mut frames = Vec::new();
    while let Some(out) = peer.try_next() {
        if let Outbound::Text(text) = out {
            frames.push(text);
        }
    }
    frames
}

fn sub_body(raw: &str) -> (u64, Value) {
    let mut parts = raw.splitn(3, ' ');
    assert_eq!(parts.next(), Some("sub"), "not a subscribe frame: {raw}");
    let id = parts.next().unwrap().parse().unwrap();
    (id, serde_json::from_str(parts.next().unwrap()).unwrap())
}

fn activities_page() -> Value {
    json!({
        "items": [
            {"id": "a-login", "timestamp": "2024-06-04T10:00:00.000+0000", "title": "Login", "subtitle": "Chrome"},
            {"id": "g1", "timestamp": "2024-05-10T09:00:00.000+0000", "title": "Stock Gift",
             "subtitle": "Accepted", "icon": "logos/DE0007164600/v2"}
        ],
        "cursors": {"after": null}
    })
}

fn first_transactions_page() -> Value {
    json!({
        "items": [
            {"id": "t1", "timestamp": "2024-06-03T13:39:39.593+0000", "title": "Apple",
             "icon": "logos/US0378331005/v2", "subtitle": "Buy Order",
             "amount": {"currency": "EUR", "value": -203.0, "fractionDigits": 2}, "status": "EXECUTED"},
            {"id": "t-transfer", "timestamp": "2024-05-20T00:00:00.000+0000", "title": "Max Mustermann",
             "subtitle": "Sent", "amount": {"currency": "EUR", "value": -50.0}}
        ],
        "cursors": {"after": "c1"}
    })
}

fn second_transactions_page() -> Value {
    json!({
        "items": [
            {"id": "t3", "timestamp": "2024-05-01T00:00:00.000+0000", "title": "Interest",
             "subtitle": "2.75 %", "amount": {"currency": "EUR", "value": 3.12}}
        ],
        "cursors": {}
    })
}

fn detail(id: &str, total: &str) -> Value {
    json!({
        "id": id,
        "sections": [
            {"title": "Transaction", "type": "table", "data": [
                {"title": "Total", "detail": {"text": total, "type": "text"}}
            ]}
        ]
    })
}

#[tokio::test]
async fn test_full_timeline_pipeline() {
    let (mut session, mut peer) = session(64);
    peer.open().await;
    peer.push("connected").await;
    peer.push(data(1, activities_page())).await;
    peer.push("2 C").await;
    peer.push(data(2, first_transactions_page())).await;
    peer.push(data(3, second_transactions_page())).await;
    // 상세 응답은 요청 순서와 다르게 도착
    peer.push(data(5, detail("g1", "€30.00"))).await;
    peer.push("9 A {\"stray\":true}").await;
    peer.push(data(6, detail("t3", "€3.12"))).await;
    peer.push(data(4, detail("t1", "€203.00"))).await;
    peer.push(data(7, json!([{"accountNumber": "1", "currencyId": "EUR", "amount": 12.34}]))).await;

    let snapshot = fetch_timeline(&mut session, FetchOptions::default())
        .await
        .unwrap();

    assert_eq!(snapshot.activities.len(), 2);
    let ids: Vec<&str> = snapshot.transactions.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, ["t1", "g1", "t3"], "unclassified dropped, gift merged, newest first");
    assert!(snapshot.transactions.iter().all(|t| !t.sections.is_empty()));
    let listed: Vec<&str> = snapshot.listed_transactions.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(listed, ["t1", "g1", "t3"]);
    assert!(snapshot.listed_transactions.iter().all(|t| t.sections.is_empty()));

    let gift = &snapshot.transactions[1];
    assert_eq!(gift.event_type, Some(TransactionEventType::GiftReceived));
    assert_eq!(gift.amount_value(), dec!(30.00));
    assert_eq!(snapshot.cash[0].amount, dec!(12.34));

    let frames = sent_frames(&mut peer);
    assert_eq!(frames[0], "connect 31 {}");
    let subs: Vec<(u64, Value)> = frames[1..].iter().map(|f| sub_body(f)).collect();
    let kinds: Vec<&str> = subs.iter().map(|(_, b)| b["type"].as_str().unwrap()).collect();
    assert_eq!(
        kinds,
        [
            "timelineActivityLog",
            "timelineTransactions",
            "timelineTransactions",
            "timelineDetailV2",
            "timelineDetailV2",
            "timelineDetailV2",
            "cash"
        ]
    );
    let ids: Vec<u64> = subs.iter().map(|(id, _)| *id).collect();
    assert_eq!(ids, [1, 2, 3, 4, 5, 6, 7]);
    assert_eq!(subs[2].1["after"], json!("c1"));
    assert_eq!(subs[3].1["id"], json!("t1"));
    assert!(subs.iter().all(|(_, b)| b["token"] == json!("secret-token")));
    assert!(session.registry().is_empty());
}

#[tokio::test]
async fn test_unreadable_item_does_not_stall_export() {
    let (mut session, mut peer) = session(32);
    peer.open().await;
    peer.push("connected").await;
    peer.push(data(1, json!({"items": [], "cursors": {}}))).await;
    // t2는 timestamp가 없어 읽을 수 없는 항목
    peer.push(data(
        2,
        json!({
            "items": [
                {"id": "t1", "timestamp": "2024-06-03T13:39:39.593+0000", "title": "Apple",
                 "icon": "logos/US0378331005/v2", "subtitle": "Buy Order",
                 "amount": {"currency": "EUR", "value": -203.0}},
                {"id": "t2", "title": "Apple"}
            ],
            "cursors": {}
        }),
    ))
    .await;
    peer.push(data(3, detail("t1", "€203.00"))).await;
    peer.push(data(4, json!({"currencyId": "EUR", "amount": 1}))).await;

    let snapshot = fetch_timeline(&mut session, FetchOptions::default())
        .await
        .unwrap();
    let ids: Vec<&str> = snapshot.transactions.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, ["t1"]);
    assert!(session.registry().is_empty());

    let frames = sent_frames(&mut peer);
    let detail_ids: Vec<Value> = frames[1..]
        .iter()
        .map(|f| sub_body(f).1)
        .filter(|b| b["type"] == json!("timelineDetailV2"))
        .map(|b| b["id"].clone())
        .collect();
    assert_eq!(detail_ids, [json!("t1")]);
}

#[tokio::test]
async fn test_unreadable_cash_payload_fails() {
    let (mut session, peer) = session(16);
    peer.open().await;
    peer.push("connected").await;
    peer.push(data(1, json!({"items": [], "cursors": {}}))).await;
    peer.push(data(2, second_transactions_page())).await;
    peer.push(data(3, detail("t3", "€3.12"))).await;
    peer.push("4 A [5]").await;

    let err = fetch_timeline(&mut session, FetchOptions::default())
        .await
        .unwrap_err();
    match err {
        SocketError::InvalidPayload { id, kind, .. } => {
            assert_eq!(id, 4);
            assert_eq!(kind, "cash");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(session.registry().is_empty());
}

#[tokio::test]
async fn test_unreadable_page_envelope_fails() {
    let (mut session, peer) = session(16);
    peer.open().await;
    peer.push("connected").await;
    peer.push(data(1, json!({"items": 5, "cursors": {}}))).await;

    let err = fetch_timeline(&mut session, FetchOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, SocketError::InvalidPayload { id: 1, .. }));
}

#[tokio::test]
async fn test_no_cash_and_empty_timeline() {
    let (mut session, peer) = session(16);
    peer.open().await;
    peer.push("connected").await;
    peer.push(data(1, json!({"items": [], "cursors": {}}))).await;
    peer.push(data(2, json!({"items": [], "cursors": {"after": ""}}))).await;

    let options = FetchOptions {
        fetch_cash: false,
        ..FetchOptions::default()
    };
    let snapshot = fetch_timeline(&mut session, options).await.unwrap();
    assert!(snapshot.transactions.is_empty());
    assert!(snapshot.cash.is_empty());
}

#[tokio::test]
async fn test_empty_work_set_rejected() {
    let (mut session, peer) = session(16);
    peer.open().await;
    peer.push("connected").await;
    peer.push(data(1, json!({"items": [], "cursors": {}}))).await;
    peer.push(data(2, json!({"items": [], "cursors": {}}))).await;

    let options = FetchOptions {
        empty_work_set: EmptyWorkSet::Reject,
        ..FetchOptions::default()
    };
    let err = fetch_timeline(&mut session, options).await.unwrap_err();
    assert!(matches!(err, SocketError::EmptyWorkSet));
}

#[tokio::test]
async fn test_close_during_fan_out_fails() {
    let (mut session, peer) = session(16);
    peer.open().await;
    peer.push("connected").await;
    peer.push(data(1, json!({"items": [], "cursors": {}}))).await;
    peer.push(data(2, second_transactions_page())).await;
    peer.close(1000, "bye").await;

    let err = fetch_timeline(&mut session, FetchOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, SocketError::ConnectionClosed { code: 1000, .. }));
    assert!(session.registry().is_empty());
}

#[tokio::test]
async fn test_rejected_subscription_fails() {
    let (mut session, peer) = session(16);
    peer.open().await;
    peer.push("connected").await;
    peer.push(r#"1 E {"errors":[{"errorCode":"AUTHENTICATION_ERROR"}]}"#).await;

    let err = fetch_timeline(&mut session, FetchOptions::default())
        .await
        .unwrap_err();
    match err {
        SocketError::SubscriptionRejected { id, kind, body } => {
            assert_eq!(id, 1);
            assert_eq!(kind, "timelineActivityLog");
            assert!(body.contains("AUTHENTICATION_ERROR"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_transport_error_fails() {
    let (mut session, peer) = session(16);
    peer.open().await;
    peer.push("connected").await;
    peer.fail("connection reset").await;

    let err = fetch_timeline(&mut session, FetchOptions::default())
        .await
        .unwrap_err();
    assert!(err.is_transport_fault());
}

#[tokio::test(start_paused = true)]
async fn test_silent_server_times_out() {
    let (handle, peer) = loopback(16);
    let mut session = Session::new(
        Connection::new(handle, "connect 31 {}"),
        SessionToken::new("secret-token"),
    )
    .with_subscription_timeout(Some(Duration::from_secs(30)));
    peer.open().await;
    peer.push("connected").await;
    peer.push(data(1, json!({"items": [], "cursors": {}}))).await;

    let err = fetch_timeline(&mut session, FetchOptions::default())
        .await
        .unwrap_err();
    match err {
        SocketError::Timeout { id, kind, .. } => {
            assert_eq!(id, 2);
            assert_eq!(kind, "timelineTransactions");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
