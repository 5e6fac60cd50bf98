//! 연결 관리자.
//!
//! 전송 계층 이벤트를 받아 핸드셰이크를 보내고, 수신 텍스트를 프레임으로
//! 해석해 올려 보냅니다. 연결이 살아 있지 않을 때의 전송은 경고만 남깁니다.

use crate::codec::{self, Decoded, Frame};
use crate::transport::{Outbound, TransportEvent, TransportHandle};
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

/// 연결 상태.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closing,
    Closed,
}

/// 상위 계층으로 올리는 연결 이벤트.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionEvent {
    /// 전송 연결 수립 (핸드셰이크 전송 완료)
    Open,
    /// 서버가 핸드셰이크를 수락함
    Connected,
    /// 일반 프레임
    Message { raw: String, frame: Frame },
    Closed { code: u16, reason: String },
    Error(String),
}

/// 단일 WebSocket 연결.
#[derive(Debug)]
pub struct Connection {
    state: ConnectionState,
    handshake: String,
    ready: bool,
    outbound: Option<mpsc::UnboundedSender<Outbound>>,
    inbound: Option<mpsc::Receiver<TransportEvent>>,
}

impl Connection {
    /// 전송 핸들 위에 연결을 만듭니다. 핸드셰이크는 `Open` 이벤트 때 보냅니다.
    pub fn new(handle: TransportHandle, handshake: impl Into<String>) -> Self {
        Self {
            state: ConnectionState::Connecting,
            handshake: handshake.into(),
            ready: false,
            outbound: Some(handle.outbound),
            inbound: Some(handle.inbound),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// 서버가 `connected`를 보냈는지 확인.
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// 텍스트를 보냅니다. 연결이 열려 있지 않으면 경고 후 `false`.
    pub fn send(&mut self, text: impl Into<String>) -> bool {
        let text = text.into();
        if self.state != ConnectionState::Open {
            warn!(state = ?self.state, "연결이 열려 있지 않아 메시지를 보내지 않음");
            return false;
        }
        let Some(outbound) = &self.outbound else {
            warn!("전송 채널 없음, 메시지를 보내지 않음");
            return false;
        };
        trace!(message = %redact_token(&text), "송신");
        if outbound.send(Outbound::Text(text)).is_err() {
            warn!("전송 채널이 닫혀 메시지를 보내지 못함");
            self.teardown();
            return false;
        }
        true
    }

    /// 다음 연결 이벤트. 전송 계층이 끝났으면 `None`.
    pub async fn next_event(&mut self) -> Option<ConnectionEvent> {
        let event = self.inbound.as_mut()?.recv().await;
        let Some(event) = event else {
            self.teardown();
            return None;
        };

        Some(match event {
            TransportEvent::Open => {
                self.state = ConnectionState::Open;
                info!("WebSocket 연결 열림, 핸드셰이크 전송");
                let handshake = self.handshake.clone();
                self.send(handshake);
                ConnectionEvent::Open
            }
            TransportEvent::Text(raw) => match codec::decode(&raw) {
                Decoded::Connected => {
                    self.ready = true;
                    info!("서버가 핸드셰이크를 수락함");
                    ConnectionEvent::Connected
                }
                Decoded::Frame(frame) => ConnectionEvent::Message { raw, frame },
            },
            TransportEvent::Closed { code, reason } => {
                info!(code, reason = %reason, "WebSocket 연결 종료");
                self.teardown();
                ConnectionEvent::Closed { code, reason }
            }
            TransportEvent::Error(message) => {
                warn!("WebSocket 에러: {}", message);
                self.teardown();
                ConnectionEvent::Error(message)
            }
        })
    }

    /// 연결을 닫습니다. 이미 닫혀 있으면 경고만 남깁니다.
    pub fn disconnect(&mut self) {
        if self.outbound.is_none() {
            warn!("이미 닫힌 연결에 대한 종료 요청");
            return;
        }
        info!("WebSocket 연결 종료 요청");
        self.close_transport();
    }

    /// 경고 없이 전송 계층을 닫습니다.
    pub(crate) fn close_transport(&mut self) {
        if self.outbound.is_none() {
            return;
        }
        self.state = ConnectionState::Closing;
        if let Some(outbound) = &self.outbound {
            let _ = outbound.send(Outbound::Close);
        }
        self.teardown();
    }

    fn teardown(&mut self) {
        if self.state != ConnectionState::Closed {
            debug!("연결 정리");
        }
        self.state = ConnectionState::Closed;
        self.ready = false;
        self.outbound = None;
        self.inbound = None;
    }
}

/// 로그에 토큰이 남지 않도록 가립니다.
fn redact_token(text: &str) -> String {
    match text.find("\"token\":\"") {
        Some(start) => {
            let value_start = start + "\"token\":\"".len();
            let value_end = text[value_start..]
                .find('"')
                .map(|i| value_start + i)
                .unwrap_or(text.len());
            format!("{}***{}", &text[..value_start], &text[value_end..])
        }
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::loopback;

    #[tokio::test]
    async fn test_handshake_sent_on_open() {
        let (handle, mut peer) = loopback(8);
        let mut conn = Connection::new(handle, "connect 31 {}");
        assert_eq!(conn.state(), ConnectionState::Connecting);

        peer.open().await;
        assert_eq!(conn.next_event().await, Some(ConnectionEvent::Open));
        assert_eq!(conn.state(), ConnectionState::Open);
        assert_eq!(peer.next_text().await.as_deref(), Some("connect 31 {}"));

        peer.push("connected").await;
        assert_eq!(conn.next_event().await, Some(ConnectionEvent::Connected));
        assert!(conn.is_ready());
    }

    #[tokio::test]
    async fn test_send_before_open_is_dropped() {
        let (handle, mut peer) = loopback(8);
        let mut conn = Connection::new(handle, "connect 31 {}");
        assert!(!conn.send("sub 1 {}"));
        assert!(peer.try_next().is_none());
    }

    #[tokio::test]
    async fn test_disconnect_is_idempotent() {
        let (handle, mut peer) = loopback(8);
        let mut conn = Connection::new(handle, "connect 31 {}");
        peer.open().await;
        conn.next_event().await;
        peer.next_text().await;

        conn.disconnect();
        assert_eq!(conn.state(), ConnectionState::Closed);
        assert_eq!(peer.try_next(), Some(Outbound::Close));

        conn.disconnect();
        assert!(peer.try_next().is_none());
        assert!(!conn.send("sub 9 {}"));
        assert_eq!(conn.next_event().await, None);
    }

    #[tokio::test]
    async fn test_close_event_tears_down() {
        let (handle, peer) = loopback(8);
        let mut conn = Connection::new(handle, "connect 31 {}");
        peer.open().await;
        conn.next_event().await;
        peer.close(1000, "bye").await;
        assert_eq!(
            conn.next_event().await,
            Some(ConnectionEvent::Closed {
                code: 1000,
                reason: "bye".into()
            })
        );
        assert_eq!(conn.state(), ConnectionState::Closed);
    }

    #[test]
    fn test_redact_token() {
        assert_eq!(
            redact_token(r#"sub 1 {"token":"secret","type":"cash"}"#),
            r#"sub 1 {"token":"***","type":"cash"}"#
        );
        assert_eq!(redact_token("echo"), "echo");
    }
}
