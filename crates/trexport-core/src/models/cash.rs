//! 현금 잔고와 통화 기호.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 통화 기호 → 통화 코드.
pub fn currency_from_sign(sign: char) -> Option<&'static str> {
    match sign {
        '€' => Some("EUR"),
        '$' => Some("USD"),
        '£' => Some("GBP"),
        _ => None,
    }
}

/// 통화 코드 → 통화 기호.
pub fn sign_for_currency(currency: &str) -> Option<&'static str> {
    match currency {
        "EUR" => Some("€"),
        "USD" => Some("$"),
        "GBP" => Some("£"),
        _ => None,
    }
}

/// `cash` 구독 응답의 계좌별 잔고.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CashBalance {
    #[serde(default)]
    pub account_number: Option<String>,
    pub currency_id: String,
    pub amount: Decimal,
}

impl fmt::Display for CashBalance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match sign_for_currency(&self.currency_id) {
            Some(sign) => write!(f, "{} {}", self.amount, sign),
            None => write!(f, "{} {}", self.amount, self.currency_id),
        }
    }
}
