//! 소켓 클라이언트 에러 타입.

use std::time::Duration;
use thiserror::Error;

/// 로그인, 연결, 구독 처리 중 발생하는 에러.
#[derive(Debug, Error)]
pub enum SocketError {
    /// 네트워크/연결 에러
    #[error("Network error: {0}")]
    NetworkError(String),

    /// 작업이 끝나기 전에 연결이 닫힘 (정상 종료 코드 포함)
    #[error("Connection closed before completion (code {code}): {reason}")]
    ConnectionClosed { code: u16, reason: String },

    /// WebSocket 전송 계층 에러
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// 로그인 요청 실패
    #[error("Login failed: {message}")]
    Login {
        message: String,
        response: Option<String>,
    },

    /// 2단계 인증 코드 확인 실패
    #[error("PIN verification failed: {message}")]
    PinVerification {
        message: String,
        response: Option<String>,
    },

    /// 인증/권한 에러
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// API 에러 코드
    #[error("API error {code}: {message}")]
    ApiError { code: u16, message: String },

    /// 파싱/역직렬화 에러
    #[error("Parse error: {0}")]
    ParseError(String),

    /// 서버가 구독을 거부함 (`E` 프레임)
    #[error("Subscription {id} ({kind}) rejected: {body}")]
    SubscriptionRejected {
        id: u64,
        kind: String,
        body: String,
    },

    /// 구독 응답의 형식이 구독 유형과 맞지 않음
    #[error("Subscription {id} ({kind}) returned an unreadable payload: {reason}")]
    InvalidPayload {
        id: u64,
        kind: String,
        reason: String,
    },

    /// 구독 응답 대기 시간 초과
    #[error("Subscription {id} ({kind}) timed out after {waited:?}")]
    Timeout {
        id: u64,
        kind: String,
        waited: Duration,
    },

    /// 팬아웃 대상이 비어 있음 (`EmptyWorkSet::Reject`)
    #[error("Fan-out started with an empty work set")]
    EmptyWorkSet,

    /// 잘못된 상태 전이
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl SocketError {
    /// 전송 계층 장애인지 확인.
    pub fn is_transport_fault(&self) -> bool {
        matches!(
            self,
            SocketError::NetworkError(_)
                | SocketError::ConnectionClosed { .. }
                | SocketError::WebSocket(_)
                | SocketError::Timeout { .. }
        )
    }

    /// 인증 에러인지 확인.
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self,
            SocketError::Login { .. }
                | SocketError::PinVerification { .. }
                | SocketError::Unauthorized(_)
        )
    }
}

impl From<reqwest::Error> for SocketError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SocketError::NetworkError(format!("timeout: {}", err))
        } else {
            SocketError::NetworkError(err.to_string())
        }
    }
}

impl From<serde_json::Error> for SocketError {
    fn from(err: serde_json::Error) -> Self {
        SocketError::ParseError(err.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for SocketError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        SocketError::WebSocket(err.to_string())
    }
}
