//! 웹 로그인과 2단계 인증.
//!
//! 처리 순서:
//! - 전화번호 + PIN → POST /api/v1/auth/web/login → `processId`
//! - 휴대폰으로 받은 코드 → POST /api/v1/auth/web/login/{processId}/{code}
//! - 응답 쿠키 `tr_session`이 WebSocket 구독에 쓰는 세션 토큰

use crate::config::ApiConfig;
use crate::error::SocketError;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info};

/// 로그인 경로.
const LOGIN_PATH: &str = "/api/v1/auth/web/login";

/// 세션 쿠키 이름.
pub const SESSION_COOKIE: &str = "tr_session";

/// WebSocket 구독에 쓰는 세션 토큰.
#[derive(Debug)]
pub struct SessionToken(SecretString);

impl SessionToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(SecretString::from(value.into()))
    }

    /// 토큰 원문. 요청 프레임에 넣을 때만 사용합니다.
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

/// 로그인 1단계 응답.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoginChallenge {
    #[serde(rename = "processId")]
    pub process_id: String,
    /// 코드 재전송까지 남은 시간 (초)
    #[serde(rename = "countdownInSeconds", default)]
    pub countdown_in_seconds: u64,
    /// 코드 전달 방식 (APP, SMS)
    #[serde(rename = "2fa", default)]
    pub two_factor_method: Option<String>,
}

/// API 에러 응답 (`{"errors":[{"errorCode":..,"errorMessage":..}]}`).
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    errors: Vec<ErrorEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorEntry {
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    error_message: Option<String>,
}

/// 에러 응답 본문에서 사람이 읽을 메시지를 뽑습니다.
fn describe_error(status: reqwest::StatusCode, body: &str) -> String {
    serde_json::from_str::<ErrorResponse>(body)
        .ok()
        .and_then(|r| r.errors.into_iter().next())
        .and_then(|e| e.error_message.or(e.error_code))
        .unwrap_or_else(|| format!("HTTP {}", status))
}

/// 웹 로그인 클라이언트.
pub struct TradeRepublicAuth {
    config: ApiConfig,
    client: Client,
}

impl TradeRepublicAuth {
    /// 쿠키 저장소가 켜진 HTTP 클라이언트를 만듭니다.
    ///
    /// # Errors
    /// HTTP 클라이언트 생성에 실패하면 `SocketError::NetworkError`를 반환합니다.
    pub fn new(config: ApiConfig) -> Result<Self, SocketError> {
        let client = Client::builder()
            .cookie_store(true)
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SocketError::NetworkError(format!("HTTP client 생성 실패: {}", e)))?;
        Ok(Self { config, client })
    }

    /// 전화번호와 PIN으로 로그인을 시작합니다.
    pub async fn login(
        &self,
        phone_number: &str,
        pin: &SecretString,
    ) -> Result<LoginChallenge, SocketError> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct LoginRequest<'a> {
            phone_number: &'a str,
            pin: &'a str,
        }

        let url = self.config.rest_url(LOGIN_PATH);
        debug!(url = %url, "로그인 요청");
        let response = self
            .client
            .post(&url)
            .json(&LoginRequest {
                phone_number,
                pin: pin.expose_secret(),
            })
            .send()
            .await
            .map_err(|e| SocketError::NetworkError(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SocketError::NetworkError(e.to_string()))?;

        if !status.is_success() {
            error!("로그인 실패: {} - {}", status, body);
            return Err(SocketError::Login {
                message: describe_error(status, &body),
                response: Some(body),
            });
        }

        let challenge: LoginChallenge = serde_json::from_str(&body).map_err(|e| {
            SocketError::Unauthorized(format!("로그인 응답에 processId 없음: {}", e))
        })?;
        info!(
            countdown = challenge.countdown_in_seconds,
            method = ?challenge.two_factor_method,
            "2단계 인증 코드 전송됨"
        );
        Ok(challenge)
    }

    /// 2단계 인증 코드를 확인하고 세션 토큰을 받습니다.
    pub async fn verify(
        &self,
        challenge: &LoginChallenge,
        code: &str,
    ) -> Result<SessionToken, SocketError> {
        let url = self.config.rest_url(&format!(
            "{}/{}/{}",
            LOGIN_PATH,
            challenge.process_id,
            code.trim()
        ));
        let response = self
            .client
            .post(&url)
            .send()
            .await
            .map_err(|e| SocketError::NetworkError(e.to_string()))?;

        let status = response.status();
        let token = response
            .cookies()
            .find(|c| c.name() == SESSION_COOKIE)
            .map(|c| c.value().to_string());
        let body = response
            .text()
            .await
            .map_err(|e| SocketError::NetworkError(e.to_string()))?;

        if !status.is_success() {
            error!("2단계 인증 실패: {} - {}", status, body);
            return Err(SocketError::PinVerification {
                message: describe_error(status, &body),
                response: Some(body),
            });
        }

        match token {
            Some(token) if !token.is_empty() => {
                info!("로그인 성공, 세션 토큰 수신");
                Ok(SessionToken::new(token))
            }
            _ => Err(SocketError::Unauthorized(format!(
                "응답에 {} 쿠키 없음",
                SESSION_COOKIE
            ))),
        }
    }
}
