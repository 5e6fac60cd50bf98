//! 트레이드 리퍼블릭 API 설정.
//!
//! REST(로그인)와 WebSocket(타임라인 구독) 엔드포인트, 그리고 연결 직후
//! 보내는 핸드셰이크의 클라이언트 식별자를 담습니다.

use crate::fanout::{DetailIdStrategy, EmptyWorkSet};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

/// 핸드셰이크 프로토콜 버전.
pub const PROTOCOL_VERSION: u32 = 31;

/// API 엔드포인트와 클라이언트 식별 정보.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// REST API 기본 URL
    pub rest_base_url: String,
    /// WebSocket URL
    pub websocket_url: String,
    pub locale: String,
    pub platform_id: String,
    pub platform_version: String,
    pub client_id: String,
    pub client_version: String,
    /// HTTP User-Agent
    pub user_agent: String,
    /// HTTP 요청 타임아웃 (초)
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            rest_base_url: "https://api.traderepublic.com".to_string(),
            websocket_url: "wss://api.traderepublic.com".to_string(),
            locale: "en".to_string(),
            platform_id: "webtrading".to_string(),
            platform_version: "Chrome/136.0.0.0".to_string(),
            client_id: "app.traderepublic.com".to_string(),
            client_version: "3.282.0".to_string(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/108.0.0.0 Safari/537.36"
                .to_string(),
            timeout_secs: 30,
        }
    }
}

impl ApiConfig {
    /// REST 기본 URL을 설정합니다.
    pub fn with_rest_base_url(mut self, url: impl Into<String>) -> Self {
        self.rest_base_url = url.into();
        self
    }

    /// WebSocket URL을 설정합니다.
    pub fn with_websocket_url(mut self, url: impl Into<String>) -> Self {
        self.websocket_url = url.into();
        self
    }

    /// 로케일을 설정합니다.
    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }

    /// REST 경로의 전체 URL.
    pub fn rest_url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.rest_base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// 연결 직후 보내는 핸드셰이크 메시지 (`connect 31 {...}`).
    pub fn handshake_message(&self) -> String {
        let identity = json!({
            "locale": self.locale,
            "platformId": self.platform_id,
            "platformVersion": self.platform_version,
            "clientId": self.client_id,
            "clientVersion": self.client_version,
        });
        format!("connect {} {}", PROTOCOL_VERSION, identity)
    }
}

/// 구독 처리 설정.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// 구독별 응답 대기 한도 (초). `None`이면 무제한.
    pub subscription_timeout_secs: Option<u64>,
    /// 수신 이벤트 채널 크기
    pub inbound_capacity: usize,
    /// 상세 조회 후 현금 잔고까지 조회할지 여부
    pub fetch_cash: bool,
    /// 분류되지 않은 거래를 버릴지 여부
    pub classified_only: bool,
    /// 상세 조회 대상이 없을 때의 처리
    pub empty_work_set: EmptyWorkSet,
    /// 상세 응답을 어떤 id로 매칭할지
    pub detail_id: DetailIdStrategy,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            subscription_timeout_secs: None,
            inbound_capacity: 1000,
            fetch_cash: true,
            classified_only: true,
            empty_work_set: EmptyWorkSet::default(),
            detail_id: DetailIdStrategy::default(),
        }
    }
}

impl StreamConfig {
    /// 구독별 타임아웃.
    pub fn subscription_timeout(&self) -> Option<Duration> {
        self.subscription_timeout_secs
            .filter(|s| *s > 0)
            .map(Duration::from_secs)
    }
}
