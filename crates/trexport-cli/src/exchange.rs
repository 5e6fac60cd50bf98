//! Börse Frankfurt 거래소 조회.
//!
//! 종목 페이지(주식 또는 ETF)에 Xetra가 나오면 `XETRA`, 아니면 `F`로 봅니다.
//! 조회 결과는 ISIN별로 캐시합니다.

use async_trait::async_trait;
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use trexport_core::ExchangeResolver;

/// Xetra 상장 종목
pub const XETRA: &str = "XETRA";
/// 프랑크푸르트 거래소
pub const FRANKFURT: &str = "F";

const EXCHANGE_BAR: &str = "<app-widget-exchange-bar";
const EXCHANGE_BAR_END: &str = "</app-widget-exchange-bar";

/// 페이지 본문에서 거래소를 판별합니다. 거래소 표시줄이 없으면 `None`.
pub fn exchange_from_page(html: &str) -> Option<&'static str> {
    let bar = &html[html.find(EXCHANGE_BAR)?..];
    let bar = &bar[..bar.find(EXCHANGE_BAR_END).unwrap_or(bar.len())];
    Some(if bar.contains("Xetra") { XETRA } else { FRANKFURT })
}

/// Börse Frankfurt 조회기.
pub struct BoerseFrankfurtResolver {
    client: Client,
    base_url: String,
    cache: Mutex<HashMap<String, String>>,
}

impl BoerseFrankfurtResolver {
    pub fn new(base_url: impl Into<String>, user_agent: &str) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| anyhow::anyhow!("HTTP client 생성 실패: {}", e))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            cache: Mutex::new(HashMap::new()),
        })
    }

    async fn fetch_page(&self, kind: &str, isin: &str) -> Option<String> {
        let url = format!("{}/{}/{}", self.base_url, kind, isin);
        match self.client.get(&url).send().await {
            Ok(response) if response.status().is_success() => response.text().await.ok(),
            Ok(response) => {
                debug!(url = %url, status = %response.status(), "종목 페이지 없음");
                None
            }
            Err(e) => {
                warn!(url = %url, "종목 페이지 조회 실패: {}", e);
                None
            }
        }
    }

    async fn lookup(&self, isin: &str) -> &'static str {
        let (stock, etf) = futures::join!(
            self.fetch_page("aktie", isin),
            self.fetch_page("etf", isin)
        );
        let found: Vec<&'static str> = [stock, etf]
            .iter()
            .flatten()
            .filter_map(|page| exchange_from_page(page))
            .collect();
        if found.contains(&XETRA) {
            XETRA
        } else {
            FRANKFURT
        }
    }
}

#[async_trait]
impl ExchangeResolver for BoerseFrankfurtResolver {
    async fn resolve(&self, isin: &str) -> String {
        if let Some(hit) = self.cache.lock().await.get(isin) {
            return hit.clone();
        }
        let exchange = self.lookup(isin).await.to_string();
        debug!(isin, exchange = %exchange, "거래소 조회");
        self.cache
            .lock()
            .await
            .insert(isin.to_string(), exchange.clone());
        exchange
    }
}
