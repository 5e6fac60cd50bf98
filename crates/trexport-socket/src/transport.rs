//! WebSocket 전송 계층.
//!
//! 실제 소켓은 읽기/쓰기 태스크로 나뉘어 채널로 연결됩니다. 연결 관리자는
//! `TransportHandle`만 보므로 테스트에서는 `loopback`으로 대체할 수 있습니다.

use crate::error::SocketError;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

/// 비정상 종료 코드 (닫기 프레임 없이 끊김).
pub const ABNORMAL_CLOSURE: u16 = 1006;

/// 전송 계층이 올려 보내는 이벤트.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// 연결 수립
    Open,
    /// 텍스트 프레임
    Text(String),
    /// 연결 종료
    Closed { code: u16, reason: String },
    /// 전송 에러 (이후 연결은 쓸 수 없음)
    Error(String),
}

/// 전송 계층으로 내려 보내는 명령.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Text(String),
    /// 닫기 프레임을 보내고 쓰기 태스크 종료
    Close,
}

/// 연결 관리자가 쥐는 양방향 채널.
#[derive(Debug)]
pub struct TransportHandle {
    pub outbound: mpsc::UnboundedSender<Outbound>,
    pub inbound: mpsc::Receiver<TransportEvent>,
}

/// WebSocket에 연결하고 읽기/쓰기 태스크를 띄웁니다.
///
/// 반환된 핸들의 첫 이벤트는 항상 `TransportEvent::Open`입니다.
pub async fn connect_websocket(url: &str, capacity: usize) -> Result<TransportHandle, SocketError> {
    info!(url = %url, "WebSocket 연결 시도");
    let (ws_stream, _) = connect_async(url)
        .await
        .map_err(|e| SocketError::NetworkError(format!("WebSocket 연결 실패: {}", e)))?;
    info!("WebSocket 연결 성공");

    let (mut write, mut read) = ws_stream.split();
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Outbound>();
    let (in_tx, in_rx) = mpsc::channel::<TransportEvent>(capacity.max(1));

    in_tx
        .send(TransportEvent::Open)
        .await
        .map_err(|e| SocketError::WebSocket(e.to_string()))?;

    tokio::spawn(async move {
        while let Some(command) = out_rx.recv().await {
            match command {
                Outbound::Text(text) => {
                    if let Err(e) = write.send(Message::Text(text)).await {
                        warn!("메시지 전송 실패: {}", e);
                        break;
                    }
                }
                Outbound::Close => {
                    if let Err(e) = write.send(Message::Close(None)).await {
                        debug!("닫기 프레임 전송 실패: {}", e);
                    }
                    break;
                }
            }
        }
        debug!("쓰기 태스크 종료");
    });

    tokio::spawn(async move {
        let terminal = loop {
            let event = match read.next().await {
                Some(Ok(Message::Text(text))) => TransportEvent::Text(text),
                Some(Ok(Message::Binary(bytes))) => {
                    TransportEvent::Text(String::from_utf8_lossy(&bytes).into_owned())
                }
                Some(Ok(Message::Close(frame))) => {
                    let (code, reason) = frame
                        .map(|f| (u16::from(f.code), f.reason.to_string()))
                        .unwrap_or((ABNORMAL_CLOSURE, String::new()));
                    info!(code, reason = %reason, "서버에서 연결 종료");
                    break TransportEvent::Closed { code, reason };
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    warn!("WebSocket 수신 에러: {}", e);
                    break TransportEvent::Error(e.to_string());
                }
                None => {
                    break TransportEvent::Closed {
                        code: ABNORMAL_CLOSURE,
                        reason: "stream ended".to_string(),
                    }
                }
            };
            if in_tx.send(event).await.is_err() {
                debug!("수신 채널 닫힘, 읽기 태스크 종료");
                return;
            }
        };
        let _ = in_tx.send(terminal).await;
    });

    Ok(TransportHandle {
        outbound: out_tx,
        inbound: in_rx,
    })
}

/// 메모리 안의 가짜 서버 쪽 끝.
#[derive(Debug)]
pub struct LoopbackPeer {
    sent: mpsc::UnboundedReceiver<Outbound>,
    events: mpsc::Sender<TransportEvent>,
}

/// 서로 연결된 전송 핸들과 가짜 서버를 만듭니다.
pub fn loopback(capacity: usize) -> (TransportHandle, LoopbackPeer) {
    let (out_tx, out_rx) = mpsc::unbounded_channel();
    let (in_tx, in_rx) = mpsc::channel(capacity.max(1));
    (
        TransportHandle {
            outbound: out_tx,
            inbound: in_rx,
        },
        LoopbackPeer {
            sent: out_rx,
            events: in_tx,
        },
    )
}

impl LoopbackPeer {
    /// 연결 수립을 알립니다.
    pub async fn open(&self) {
        let _ = self.events.send(TransportEvent::Open).await;
    }

    /// 텍스트 프레임을 보냅니다.
    pub async fn push(&self, text: impl Into<String>) {
        let _ = self.events.send(TransportEvent::Text(text.into())).await;
    }

    /// 연결 종료를 알립니다.
    pub async fn close(&self, code: u16, reason: impl Into<String>) {
        let _ = self
            .events
            .send(TransportEvent::Closed {
                code,
                reason: reason.into(),
            })
            .await;
    }

    /// 전송 에러를 알립니다.
    pub async fn fail(&self, message: impl Into<String>) {
        let _ = self.events.send(TransportEvent::Error(message.into())).await;
    }

    /// 클라이언트가 보낸 다음 텍스트. 닫기 명령이나 채널 종료 시 `None`.
    pub async fn next_text(&mut self) -> Option<String> {
        match self.sent.recv().await? {
            Outbound::Text(text) => Some(text),
            Outbound::Close => None,
        }
    }

    /// 이미 보낸 텍스트를 기다리지 않고 꺼냅니다.
    pub fn try_next(&mut self) -> Option<Outbound> {
        self.sent.try_recv().ok()
    }
}
