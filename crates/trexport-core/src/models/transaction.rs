//! 타임라인 거래.

use super::activity::Activity;
use super::event_type::{lenient_transaction_event_type, TransactionEventType};
use super::section::{find_table, parse_sections, Section};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::str::FromStr;

/// 금액.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Money {
    /// 통화 코드 (EUR, USD, GBP)
    pub currency: String,
    /// 부호 있는 금액 (출금은 음수)
    #[serde(with = "rust_decimal::serde::float")]
    pub value: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fraction_digits: Option<u32>,
}

impl Money {
    /// 통화와 금액으로 생성합니다.
    pub fn new(currency: impl Into<String>, value: Decimal) -> Self {
        Self {
            currency: currency.into(),
            value,
            fraction_digits: Some(2),
        }
    }
}

/// 타임라인 항목의 동작 (상세 화면 이동 등).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineAction {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub payload: Value,
}

/// 거래 한 건.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    /// ISO-8601 시각 (`2024-06-03T13:39:39.593+0000`)
    pub timestamp: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub amount: Option<Money>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub action: Option<TimelineAction>,
    #[serde(
        rename = "eventType",
        default,
        deserialize_with = "lenient_transaction_event_type",
        skip_serializing_if = "Option::is_none"
    )]
    pub event_type: Option<TransactionEventType>,
    /// 상세 조회 후 채워지는 원본 섹션
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sections: Vec<Value>,
    /// 그 밖의 서버 필드
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `timelineDetailV2` 응답.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionDetails {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub sections: Vec<Value>,
}

impl TransactionDetails {
    /// 섹션을 타입으로 읽습니다.
    pub fn typed_sections(&self) -> Vec<Section> {
        parse_sections(&self.sections)
    }
}

impl Transaction {
    /// 활동 내역의 주식 선물/보상을 거래로 합성합니다.
    ///
    /// 금액은 상세 조회 전까지 0 EUR입니다.
    pub fn from_received_activity(activity: &Activity, event_type: TransactionEventType) -> Self {
        Self {
            id: activity.id.clone(),
            timestamp: activity.timestamp.clone(),
            title: activity.title.clone(),
            icon: activity.icon.clone(),
            subtitle: activity.subtitle.clone(),
            amount: Some(Money::new("EUR", Decimal::ZERO)),
            status: Some("EXECUTED".to_string()),
            action: Some(TimelineAction {
                kind: "timelineDetail".to_string(),
                payload: Value::String(activity.id.clone()),
            }),
            event_type: Some(event_type),
            sections: Vec::new(),
            extra: Map::new(),
        }
    }

    /// 상세 응답을 붙입니다.
    ///
    /// 받은 선물은 거래 목록에 금액이 없으므로 "Transaction" 표의 "Total" 행에서 채웁니다.
    pub fn attach_details(&mut self, details: TransactionDetails) {
        if self.event_type == Some(TransactionEventType::GiftReceived) {
            let sections = details.typed_sections();
            let total = find_table(&sections, "Transaction")
                .and_then(|table| table.row("Total"))
                .and_then(|row| row.text())
                .and_then(parse_signed_amount);
            if let Some(total) = total {
                match self.amount.as_mut() {
                    Some(amount) => amount.value = total,
                    None => self.amount = Some(Money::new("EUR", total)),
                }
            }
        }
        self.sections = details.sections;
    }

    /// 섹션을 타입으로 읽습니다.
    pub fn typed_sections(&self) -> Vec<Section> {
        parse_sections(&self.sections)
    }

    /// 아이콘 경로에서 ISIN을 꺼냅니다 (`logos/<ISIN>/v2`).
    pub fn isin(&self) -> Option<&str> {
        self.icon.as_deref().and_then(isin_from_icon)
    }

    /// 금액 값. 없으면 0.
    pub fn amount_value(&self) -> Decimal {
        self.amount.as_ref().map(|a| a.value).unwrap_or_default()
    }

    /// 취소된 거래인지 확인.
    pub fn is_canceled(&self) -> bool {
        self.status.as_deref() == Some("CANCELED")
    }

    /// `YYYY-MM-DD` 날짜.
    pub fn date(&self) -> &str {
        self.timestamp.get(..10).unwrap_or(&self.timestamp)
    }

    /// UTC 시각.
    pub fn timestamp_utc(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.timestamp)
    }
}

/// 아이콘 경로의 두 번째 조각.
pub fn isin_from_icon(icon: &str) -> Option<&str> {
    icon.split('/').nth(1).filter(|s| !s.is_empty())
}

/// 서버 시각 문자열을 읽습니다.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .or_else(|_| DateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f%z"))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// `"€1,234.50"` 같은 표시 금액을 읽습니다. 통화 기호는 첫 글자만 허용.
pub fn parse_signed_amount(text: &str) -> Option<Decimal> {
    let trimmed = text.trim();
    let body = match trimmed.chars().next() {
        Some(c) if !c.is_ascii_digit() && c != '-' && c != '+' && c != '.' => {
            &trimmed[c.len_utf8()..]
        }
        _ => trimmed,
    };
    let cleaned: String = body.chars().filter(|c| *c != ',' && !c.is_whitespace()).collect();
    Decimal::from_str(&cleaned).ok()
}

/// 최신순으로 정렬합니다. 같은 시각은 기존 순서를 유지합니다.
pub fn sort_newest_first(transactions: &mut [Transaction]) {
    transactions.sort_by(|a, b| b.timestamp_utc().cmp(&a.timestamp_utc()));
}
