//! 배당 명세서(PDF) 해석.
//!
//! 거래 상세의 `Documents` 섹션이 가리키는 명세서를 받아 텍스트로 바꾸고,
//! 포지션 줄과 원천징수 줄에서 수량, 주당 배당금, 세금을 읽습니다.
//!
//! ```text
//! Realty Income
//! US7561091049 78.897459 Stücke 0.2695 USD 21.26 USD
//! Quellensteuer für US-Emittenten -3.19 USD
//! ```

use crate::error::{CoreError, CoreResult};
use crate::models::Section;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;
use tracing::debug;

/// ISIN, 수량, 주당 배당금, 통화, 총액, 통화
static POSITION_LINE: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r"([A-Z0-9]{12})\s+([\d.,]+)\s+Stücke\s+([\d.,]+)\s+([A-Z]{3})\s+([\d.,]+)\s+([A-Z]{3})")
        .ok()
});

/// 원천징수 금액, 통화
static WITHHOLDING_LINE: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"Quellensteuer.*?-([\d.,]+)\s+([A-Z]{3})").ok());

/// 명세서에서 읽은 배당 내역.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DividendStatement {
    pub isin: String,
    pub shares: Decimal,
    pub dividend_per_share: Decimal,
    pub currency: String,
    /// 세전 총액
    pub total: Decimal,
    /// 원천징수 (없으면 `None`)
    pub tax: Option<(Decimal, String)>,
}

/// 명세서 숫자. 소수점 쉼표를 점으로 바꿉니다.
fn statement_number(raw: &str) -> Option<Decimal> {
    Decimal::from_str(&raw.replacen(',', ".", 1))
        .ok()
        .map(|d| d.normalize())
}

/// 명세서 텍스트를 해석합니다. 포지션 줄이 없으면 `None`.
pub fn parse_dividend_statement(text: &str) -> Option<DividendStatement> {
    let position = POSITION_LINE.as_ref()?.captures(text)?;
    let tax = WITHHOLDING_LINE
        .as_ref()
        .and_then(|re| re.captures(text))
        .and_then(|caps| Some((statement_number(&caps[1])?, caps[2].to_string())));

    Some(DividendStatement {
        isin: position[1].to_string(),
        shares: statement_number(&position[2])?,
        dividend_per_share: statement_number(&position[3])?,
        currency: position[4].to_string(),
        total: statement_number(&position[5])?,
        tax,
    })
}

/// PDF에서 텍스트를 꺼냅니다.
pub fn extract_statement_text(pdf: &[u8]) -> CoreResult<String> {
    pdf_extract::extract_text_from_mem(pdf).map_err(|e| CoreError::Document(e.to_string()))
}

/// `Documents` 섹션 첫 문서의 URL.
pub fn statement_url(sections: &[Section]) -> Option<&str> {
    sections.iter().find_map(|section| match section {
        Section::Documents { title, data } if title.as_deref() == Some("Documents") => {
            data.first()?.action.as_ref()?.payload.as_str()
        }
        _ => None,
    })
}

/// 문서 조회. PDF를 받아 텍스트로 돌려줍니다 (`extract_statement_text`).
#[async_trait]
pub trait DocumentSource: Send + Sync {
    async fn fetch_text(&self, url: &str) -> CoreResult<String>;
}

/// 문서를 받아 배당 명세서로 해석합니다. 실패하면 `None`.
pub async fn load_dividend_statement(
    source: &dyn DocumentSource,
    url: &str,
) -> Option<DividendStatement> {
    match source.fetch_text(url).await.map(|text| parse_dividend_statement(&text)) {
        Ok(Some(statement)) => Some(statement),
        Ok(None) => {
            debug!(url, "명세서에 포지션 줄 없음");
            None
        }
        Err(e) => {
            debug!(url, error = %e, "명세서 읽기 실패");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::parse_sections;
    use rust_decimal_macros::dec;
    use serde_json::json;

    const STATEMENT: &str = "DIVIDENDE\nPOSITION ANZAHL ERTRAG BETRAG\nRealty Income\nUS7561091049 78.897459 Stücke 0.2695 USD 21.26 USD\n\
        Zwischensumme 21.26 USD\nQuellensteuer für US-Emittenten -3.19 USD\nGESAMT 15.36 EUR";

    #[test]
    fn test_parse_position_and_withholding() {
        let statement = parse_dividend_statement(STATEMENT).unwrap();
        assert_eq!(statement.isin, "US7561091049");
        assert_eq!(statement.shares, dec!(78.897459));
        assert_eq!(statement.dividend_per_share, dec!(0.2695));
        assert_eq!(statement.currency, "USD");
        assert_eq!(statement.total, dec!(21.26));
        assert_eq!(statement.tax, Some((dec!(3.19), "USD".to_string())));
    }

    #[test]
    fn test_decimal_comma_and_missing_tax() {
        let text = "IE00B4L5Y983 10,5 Stücke 0,12 EUR 1,26 EUR";
        let statement = parse_dividend_statement(text).unwrap();
        assert_eq!(statement.shares, dec!(10.5));
        assert_eq!(statement.dividend_per_share, dec!(0.12));
        assert_eq!(statement.tax, None);
    }

    #[test]
    fn test_without_position_line() {
        assert_eq!(parse_dividend_statement("Quellensteuer -1.00 USD"), None);
        assert_eq!(parse_dividend_statement(""), None);
    }

    #[test]
    fn test_statement_url_from_documents_section() {
        let sections = parse_sections(&[
            json!({"type": "table", "title": "Transaction", "data": []}),
            json!({"title": "Documents", "type": "documents", "data": [
                {"title": "Dividende", "id": "d1",
                 "action": {"type": "browserModal", "payload": "https://example.invalid/d1.pdf"}},
                {"title": "Kosten", "id": "d2",
                 "action": {"type": "browserModal", "payload": "https://example.invalid/d2.pdf"}}
            ]}),
        ]);
        assert_eq!(statement_url(&sections), Some("https://example.invalid/d1.pdf"));
        assert_eq!(statement_url(&[]), None);
    }

    #[test]
    fn test_extract_rejects_non_pdf() {
        assert!(matches!(
            extract_statement_text(b"not a pdf"),
            Err(CoreError::Document(_))
        ));
    }

    struct Fixed(Result<&'static str, &'static str>);

    #[async_trait]
    impl DocumentSource for Fixed {
        async fn fetch_text(&self, _url: &str) -> CoreResult<String> {
            self.0
                .map(str::to_string)
                .map_err(|e| CoreError::Document(e.to_string()))
        }
    }

    #[tokio::test]
    async fn test_load_dividend_statement() {
        let url = "https://example.invalid/d1.pdf";
        let statement = load_dividend_statement(&Fixed(Ok(STATEMENT)), url).await.unwrap();
        assert_eq!(statement.total, dec!(21.26));
        assert_eq!(load_dividend_statement(&Fixed(Ok("leer")), url).await, None);
        assert_eq!(load_dividend_statement(&Fixed(Err("404")), url).await, None);
    }
}
