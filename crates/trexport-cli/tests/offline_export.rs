//! 네트워크 없이 저장/변환 경로를 검증합니다.

use serde_json::json;
use std::fs;
use std::io::Write;
use trexport_cli::commands::convert::{convert_file, SNOWBALL_FILE};
use trexport_cli::commands::export::{
    save_snapshot, ACTIVITIES_FILE, LISTED_TRANSACTIONS_FILE, TRANSACTIONS_FILE,
};
use trexport_cli::AppConfig;
use trexport_core::{FixedExchange, Transaction};
use trexport_socket::TimelineSnapshot;

fn trade() -> Transaction {
    serde_json::from_value(json!({
        "id": "t1",
        "timestamp": "2024-06-03T13:39:39.593+0000",
        "title": "Apple",
        "icon": "logos/US0378331005/v2",
        "subtitle": "Buy Order",
        "amount": {"currency": "EUR", "value": -203.0, "fractionDigits": 2},
        "status": "EXECUTED",
        "eventType": "trading_trade_executed",
        "sections": [{
            "title": "Transaction", "type": "table", "data": [
                {"title": "Shares", "detail": {"text": "2", "type": "text"}},
                {"title": "Share price", "detail": {"text": "€101.00", "type": "text"}},
                {"title": "Fee", "detail": {"text": "€1.00", "type": "text"}}
            ]
        }]
    }))
    .unwrap()
}

#[tokio::test]
async fn test_save_then_convert_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("export");
    let snapshot = TimelineSnapshot {
        transactions: vec![trade()],
        ..TimelineSnapshot::default()
    };
    let resolver = FixedExchange("XETRA".to_string());

    let summary = save_snapshot(&snapshot, &out, &resolver, None).await.unwrap();
    assert_eq!(summary.transactions, 1);
    assert_eq!(summary.csv_rows, 1);
    assert_eq!(fs::read_to_string(out.join(ACTIVITIES_FILE)).unwrap().trim(), "[]");

    let exported = fs::read_to_string(out.join(SNOWBALL_FILE)).unwrap();
    assert!(exported.contains(r#""Buy","2024-06-03","US0378331005","101","2","EUR","1.00","XETRA""#));

    // 저장한 JSON만으로 같은 CSV를 다시 만들 수 있어야 함
    let again = dir.path().join("again");
    let path = convert_file(&out.join(TRANSACTIONS_FILE), &again, &resolver, None)
        .await
        .unwrap();
    assert_eq!(fs::read_to_string(path).unwrap(), exported);
}

#[tokio::test]
async fn test_listed_transactions_saved_without_details() {
    let dir = tempfile::tempdir().unwrap();
    let mut listed = trade();
    listed.sections.clear();
    let snapshot = TimelineSnapshot {
        listed_transactions: vec![listed],
        transactions: vec![trade()],
        ..TimelineSnapshot::default()
    };

    save_snapshot(&snapshot, dir.path(), &FixedExchange("F".into()), None)
        .await
        .unwrap();

    let read = |name: &str| -> Vec<Transaction> {
        serde_json::from_str(&fs::read_to_string(dir.path().join(name)).unwrap()).unwrap()
    };
    let listed = read(LISTED_TRANSACTIONS_FILE);
    let detailed = read(TRANSACTIONS_FILE);
    assert_eq!(LISTED_TRANSACTIONS_FILE, "transactions.json");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, "t1");
    assert!(listed[0].sections.is_empty());
    assert_eq!(detailed[0].sections.len(), 1);
}

#[tokio::test]
async fn test_convert_rejects_invalid_json() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("broken.json");
    fs::write(&input, "{not json").unwrap();
    let err = convert_file(&input, dir.path(), &FixedExchange("F".into()), None)
        .await
        .unwrap_err();
    assert!(format!("{err:#}").contains("broken.json"));
}

#[test]
fn test_config_file_overrides_defaults() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(
        file,
        r#"
[stream]
subscription_timeout_secs = 45
empty_work_set = "reject"
detail_id = "reported"

[export]
output_dir = "out"
resolve_exchanges = false
fetch_statements = false

[logging]
level = "debug"
format = "json"
"#
    )
    .unwrap();

    let config = AppConfig::load(Some(file.path())).unwrap();
    assert_eq!(
        config.stream.subscription_timeout(),
        Some(std::time::Duration::from_secs(45))
    );
    assert_eq!(config.stream.empty_work_set, trexport_socket::EmptyWorkSet::Reject);
    assert_eq!(config.stream.detail_id, trexport_socket::DetailIdStrategy::Reported);
    assert_eq!(config.export.output_dir, "out");
    assert!(!config.export.resolve_exchanges);
    assert!(!config.export.fetch_statements);
    assert_eq!(config.export.default_exchange, "F");
    assert_eq!(config.logging.level, "debug");
    assert!(config.stream.fetch_cash);
}
