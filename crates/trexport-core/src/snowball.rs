//! Snowball Analytics CSV 변환.
//!
//! 상세 섹션이 붙은 거래 목록을 Snowball 가져오기 형식으로 바꿉니다.
//! 거래소 조회는 `ExchangeResolver`에 위임합니다. 배당은 `DocumentSource`가
//! 있으면 명세서(PDF)를 먼저 읽고, 없거나 읽지 못하면 상세 표를 씁니다.

use crate::error::CoreResult;
use crate::statement::{load_dividend_statement, statement_url, DividendStatement, DocumentSource};
use crate::models::{
    currency_from_sign, find_header_icon, find_table, isin_from_icon, parse_signed_amount,
    Section, TableRow, Transaction, TransactionEventType, identify_trade_side,
};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::io::Write;
use std::str::FromStr;
use tracing::{debug, info, warn};

/// CSV 헤더.
pub const HEADERS: [&str; 11] = [
    "Event",
    "Date",
    "Symbol",
    "Price",
    "Quantity",
    "Currency",
    "FeeTax",
    "Exchange",
    "FeeCurrency",
    "DoNotAdjustCash",
    "Note",
];

/// ISIN → 거래소 코드 조회.
#[async_trait]
pub trait ExchangeResolver: Send + Sync {
    /// 거래소 코드를 반환합니다 (예: "XETRA", "F").
    async fn resolve(&self, isin: &str) -> String;
}

/// 항상 같은 거래소를 돌려주는 조회기.
#[derive(Debug, Clone)]
pub struct FixedExchange(pub String);

#[async_trait]
impl ExchangeResolver for FixedExchange {
    async fn resolve(&self, _isin: &str) -> String {
        self.0.clone()
    }
}

/// CSV 한 행.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnowballRow {
    pub event: String,
    pub date: String,
    pub symbol: String,
    pub price: String,
    pub quantity: String,
    pub currency: String,
    pub fee_tax: String,
    pub exchange: String,
    pub fee_currency: String,
    pub do_not_adjust_cash: String,
    pub note: String,
}

impl SnowballRow {
    fn fields(&self) -> [&str; 11] {
        [
            self.event.as_str(),
            self.date.as_str(),
            self.symbol.as_str(),
            self.price.as_str(),
            self.quantity.as_str(),
            self.currency.as_str(),
            self.fee_tax.as_str(),
            self.exchange.as_str(),
            self.fee_currency.as_str(),
            self.do_not_adjust_cash.as_str(),
            self.note.as_str(),
        ]
    }

    /// 모든 필드가 비어 있는지 확인.
    pub fn is_empty(&self) -> bool {
        self.fields().iter().all(|f| f.is_empty())
    }
}

/// 첫 글자(통화 기호)를 뗀 나머지.
fn without_sign(text: &str) -> &str {
    let mut chars = text.chars();
    chars.next();
    chars.as_str()
}

/// 첫 글자의 통화 기호로 통화 코드를 찾습니다.
fn currency_of(text: Option<&str>) -> String {
    text.and_then(|t| t.chars().next())
        .and_then(currency_from_sign)
        .unwrap_or_default()
        .to_string()
}

/// 숫자 문자열을 정규화합니다 (`"1,000.50"` → `"1000.5"`). 없으면 "0".
fn normalize_number(text: Option<&str>) -> String {
    let Some(text) = text else {
        return "0".to_string();
    };
    let cleaned: String = text.chars().filter(|c| *c != ',' && !c.is_whitespace()).collect();
    match Decimal::from_str(&cleaned) {
        Ok(value) => value.normalize().to_string(),
        Err(_) => {
            warn!(value = %text, "숫자로 읽을 수 없는 값");
            String::new()
        }
    }
}

/// 수수료 행 → (금액, 통화). "Free"나 빈 값은 둘 다 빈 문자열.
fn fee_fields(row: Option<&TableRow>) -> (String, String) {
    match row.and_then(TableRow::text) {
        None | Some("Free") | Some("") => (String::new(), String::new()),
        Some(text) => {
            let fee = without_sign(text).to_string();
            if fee.is_empty() {
                return (String::new(), String::new());
            }
            (fee, currency_of(Some(text)))
        }
    }
}

/// 수량/단가 표(Shares, Share price)를 읽어 행에 채웁니다.
fn fill_shares(row: &mut SnowballRow, table: &Section) {
    let price = table.row("Share price").and_then(TableRow::text);
    row.quantity = normalize_number(table.row("Shares").and_then(TableRow::text));
    row.price = normalize_number(Some(price.map(without_sign).unwrap_or("0")));
    row.currency = currency_of(price);
}

fn convert_trade(tx: &Transaction, sections: &[Section], row: &mut SnowballRow) {
    row.event = identify_trade_side(tx.subtitle.as_deref()).as_str().to_string();
    row.symbol = tx.isin().unwrap_or_default().to_string();

    if let Some(table) = find_table(sections, "Transaction") {
        fill_shares(row, table);
        (row.fee_tax, row.fee_currency) = fee_fields(table.row("Fee"));
    }

    // 예전 형식: Overview 표의 Transaction 행에 "2 × " + "€101.00"
    if let Some(overview) = find_table(sections, "Overview") {
        if let Some(tx_row) = overview.row("Transaction") {
            if row.price.is_empty() {
                let text = tx_row.display_text();
                row.price = normalize_number(Some(text.map(without_sign).unwrap_or("0")));
                row.quantity = normalize_number(Some(
                    tx_row
                        .display_prefix()
                        .map(|p| p.trim().trim_end_matches('×').trim())
                        .unwrap_or("0"),
                ));
                row.currency = currency_of(text);
            }
        }
        if row.fee_tax.is_empty() {
            (row.fee_tax, row.fee_currency) = fee_fields(overview.row("Fee"));
        }
    }
}

fn convert_received_stock(sections: &[Section], table_title: &str, row: &mut SnowballRow) {
    // 트레이드 리퍼블릭은 받은 주식을 매수로 기록
    row.event = "Buy".to_string();
    row.symbol = find_header_icon(sections)
        .and_then(isin_from_icon)
        .unwrap_or_default()
        .to_string();
    if let Some(table) = find_table(sections, table_title) {
        fill_shares(row, table);
    }
}

fn convert_dividend(
    tx: &Transaction,
    sections: &[Section],
    statement: Option<DividendStatement>,
    row: &mut SnowballRow,
) {
    row.event = "Dividend".to_string();
    row.symbol = tx.isin().unwrap_or_default().to_string();

    if let Some(statement) = statement {
        row.price = statement.dividend_per_share.to_string();
        row.quantity = statement.shares.to_string();
        row.currency = statement.currency;
        if let Some((amount, currency)) = statement.tax {
            row.fee_tax = amount.to_string();
            row.fee_currency = currency;
        }
        return;
    }

    if let Some(table) = find_table(sections, "Transaction") {
        let per_share = table.row("Dividend per share").and_then(TableRow::text);
        let tax = table.row("Tax").and_then(TableRow::text);
        row.price = per_share.map(without_sign).unwrap_or_default().to_string();
        row.quantity = table
            .row("Shares")
            .and_then(TableRow::text)
            .unwrap_or_default()
            .to_string();
        row.currency = currency_of(per_share);
        row.fee_tax = tax.map(without_sign).unwrap_or_default().to_string();
        row.fee_currency = currency_of(tax);
    } else {
        debug!(id = %tx.id, "배당 상세 표 없음, 일부 필드만 기록");
    }
}

fn convert_interest(tx: &Transaction, sections: &[Section], row: &mut SnowballRow) {
    let currency = tx.amount.as_ref().map(|a| a.currency.clone()).unwrap_or_default();
    row.event = "Cash_Gain".to_string();
    row.symbol = currency.clone();
    row.price = "1".to_string();
    row.currency = currency.clone();
    row.quantity = "0".to_string();

    if let Some(table) = find_table(sections, "Transaction") {
        let accrued = table.row("Accrued").and_then(TableRow::display_text);
        let tax = table.row("Tax").and_then(TableRow::display_text);
        let digits: Option<String> =
            accrued.map(|a| a.chars().filter(|c| c.is_ascii_digit() || *c == '.').collect());
        row.quantity = normalize_number(digits.as_deref());
        row.fee_tax = tax.map(without_sign).unwrap_or("0").to_string();
        row.fee_currency = if !row.fee_tax.is_empty() && row.fee_tax != "0.00" {
            tax.and_then(|t| t.chars().next())
                .and_then(currency_from_sign)
                .map(str::to_string)
                .unwrap_or(currency)
        } else {
            String::new()
        };
    }
}

fn convert_tax_correction(tx: &Transaction, row: &mut SnowballRow) {
    let currency = tx.amount.as_ref().map(|a| a.currency.clone()).unwrap_or_default();
    let value = tx.amount_value();
    row.event = if value > Decimal::ZERO { "Cash_Gain" } else { "Cash_Expense" }.to_string();
    row.symbol = currency.clone();
    row.price = "1".to_string();
    row.quantity = value.abs().normalize().to_string();
    row.currency = currency;
}

/// 거래 한 건을 CSV 행으로 변환합니다. 내보낼 수 없는 거래는 `None`.
pub async fn convert_transaction(
    tx: &Transaction,
    resolver: &dyn ExchangeResolver,
) -> Option<SnowballRow> {
    convert_transaction_with(tx, resolver, None).await
}

/// `convert_transaction`과 같지만 배당 명세서를 `documents`에서 받습니다.
pub async fn convert_transaction_with(
    tx: &Transaction,
    resolver: &dyn ExchangeResolver,
    documents: Option<&dyn DocumentSource>,
) -> Option<SnowballRow> {
    if tx.is_canceled() {
        return None;
    }
    let event_type = tx.event_type?;
    let sections = tx.typed_sections();

    let mut row = SnowballRow {
        date: tx.date().to_string(),
        note: tx.title.clone(),
        ..Default::default()
    };

    let needs_exchange = match event_type {
        TransactionEventType::DividendCash => {
            let statement = match (documents, statement_url(&sections)) {
                (Some(source), Some(url)) => load_dividend_statement(source, url).await,
                _ => None,
            };
            if statement.is_none() {
                debug!(id = %tx.id, "배당 명세서 없음, 상세 표 사용");
            }
            convert_dividend(tx, &sections, statement, &mut row);
            true
        }
        TransactionEventType::StockPerkRefunded => {
            convert_received_stock(&sections, "Transaction", &mut row);
            true
        }
        TransactionEventType::GiftReceived => {
            convert_received_stock(&sections, "Overview", &mut row);
            true
        }
        t if t.is_trade() => {
            convert_trade(tx, &sections, &mut row);
            true
        }
        TransactionEventType::InterestPayout => {
            convert_interest(tx, &sections, &mut row);
            false
        }
        TransactionEventType::TaxCorrection => {
            convert_tax_correction(tx, &mut row);
            false
        }
        _ => return None,
    };

    if needs_exchange && !row.symbol.is_empty() {
        row.exchange = resolver.resolve(&row.symbol).await;
    }

    (!row.is_empty()).then_some(row)
}

/// 거래 목록 전체를 변환합니다. 입력 순서를 유지합니다.
pub async fn convert_transactions(
    transactions: &[Transaction],
    resolver: &dyn ExchangeResolver,
) -> Vec<SnowballRow> {
    convert_transactions_with(transactions, resolver, None).await
}

/// 배당 명세서 조회를 포함해 거래 목록 전체를 변환합니다.
pub async fn convert_transactions_with(
    transactions: &[Transaction],
    resolver: &dyn ExchangeResolver,
    documents: Option<&dyn DocumentSource>,
) -> Vec<SnowballRow> {
    info!(
        count = transactions.len(),
        statements = documents.is_some(),
        "Snowball CSV 변환 시작"
    );
    let mut rows = Vec::with_capacity(transactions.len());
    for tx in transactions {
        if let Some(row) = convert_transaction_with(tx, resolver, documents).await {
            rows.push(row);
        }
    }
    info!(rows = rows.len(), "Snowball CSV 변환 완료");
    rows
}

/// 모든 필드를 따옴표로 감싸 CSV로 씁니다.
pub fn write_csv<W: Write>(rows: &[SnowballRow], writer: W) -> CoreResult<()> {
    let mut wtr = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(writer);
    wtr.write_record(HEADERS)?;
    for row in rows {
        wtr.write_record(row.fields())?;
    }
    wtr.flush()?;
    Ok(())
}

/// CSV 문자열로 변환합니다.
pub fn to_csv_string(rows: &[SnowballRow]) -> CoreResult<String> {
    let mut buf = Vec::new();
    write_csv(rows, &mut buf)?;
    String::from_utf8(buf).map_err(|e| crate::CoreError::Csv(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_number() {
        assert_eq!(normalize_number(Some("1,000.50")), "1000.5");
        assert_eq!(normalize_number(Some("2")), "2");
        assert_eq!(normalize_number(None), "0");
        assert_eq!(normalize_number(Some("n/a")), "");
    }

    #[test]
    fn test_fee_fields() {
        let free = TableRow {
            title: "Fee".into(),
            detail: Some(crate::models::RowDetail {
                text: Some("Free".into()),
                ..Default::default()
            }),
        };
        assert_eq!(fee_fields(Some(&free)), (String::new(), String::new()));

        let paid = TableRow {
            title: "Fee".into(),
            detail: Some(crate::models::RowDetail {
                text: Some("€1.00".into()),
                ..Default::default()
            }),
        };
        assert_eq!(fee_fields(Some(&paid)), ("1.00".to_string(), "EUR".to_string()));
        assert_eq!(fee_fields(None), (String::new(), String::new()));
    }

    #[test]
    fn test_empty_row_detection() {
        assert!(SnowballRow::default().is_empty());
        let row = SnowballRow {
            note: "x".into(),
            ..Default::default()
        };
        assert!(!row.is_empty());
    }
}
