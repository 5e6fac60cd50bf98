//! 대화형 구독 콘솔.
//!
//! 입력한 줄을 그대로 구독 요청으로 보내고, 받은 프레임을 모두 출력합니다.
//! `exit`로 종료합니다.

use crate::config::AppConfig;
use crate::login;
use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::debug;
use trexport_socket::{Flow, Frame, Session, SessionHandler, SocketError, Subscription};

/// 정상 종료로 보는 close 코드
const NORMAL_CLOSURE: u16 = 1000;
const GOING_AWAY: u16 = 1001;

/// 받은 프레임을 출력하는 핸들러.
#[derive(Debug, Default)]
pub struct InteractiveHandler {
    /// 받은 프레임 수
    pub received: usize,
}

impl SessionHandler for InteractiveHandler {
    fn on_connected(&mut self, _session: &mut Session) -> Result<Flow, SocketError> {
        println!("✅ 연결됨. 구독 JSON, `echo`, `unsub <id>` 입력 (`exit`로 종료)");
        Ok(Flow::Continue)
    }

    fn on_message(&mut self, raw: &str, _frame: &Frame) {
        self.received += 1;
        println!("<< {}", raw);
    }

    fn on_rejected(
        &mut self,
        _session: &mut Session,
        subscription: &Subscription,
        body: &str,
    ) -> Result<Flow, SocketError> {
        println!("⚠️  구독 {} ({}) 거부됨: {}", subscription.id, subscription.kind, body);
        Ok(Flow::Continue)
    }

    fn on_unrouted(&mut self, frame: &Frame) {
        debug!(subscription_id = ?frame.subscription_id, "등록되지 않은 프레임");
    }

    fn on_input(&mut self, session: &mut Session, line: String) -> Result<Flow, SocketError> {
        let line = line.trim();
        if line == "exit" {
            return Ok(Flow::Finish);
        }
        if let Some(id) = session.send_raw(line) {
            println!(">> 구독 {} 요청", id);
        }
        Ok(Flow::Continue)
    }

    fn on_close(&mut self, code: u16, reason: &str) -> Result<(), SocketError> {
        match code {
            NORMAL_CLOSURE | GOING_AWAY => {
                println!("연결 종료 ({}): {}", code, reason);
                Ok(())
            }
            _ => Err(SocketError::ConnectionClosed {
                code,
                reason: reason.to_string(),
            }),
        }
    }
}

/// 표준 입력을 줄 단위로 채널에 보냅니다.
fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(16);
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if tx.send(line).await.is_err() {
                break;
            }
        }
    });
    rx
}

/// 대화형 콘솔을 실행합니다.
pub async fn run_interactive(config: &AppConfig, phone: Option<String>) -> Result<()> {
    let mut session = login::open_session(&config.api, &config.stream, phone).await?;
    let mut input = spawn_stdin_reader();
    let mut handler = InteractiveHandler::default();
    session
        .run_with_input(&mut handler, &mut input)
        .await
        .context("대화형 세션 실패")?;
    println!("👋 종료 (받은 프레임 {}개)", handler.received);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use trexport_socket::transport::Outbound;
    use trexport_socket::{loopback, Connection, SessionToken};

    #[tokio::test]
    async fn test_exit_and_normal_close() {
        let (handle, mut peer) = loopback(16);
        let mut session = Session::new(
            Connection::new(handle, "connect 31 {}"),
            SessionToken::new("tok"),
        );
        peer.open().await;
        peer.push("connected").await;

        let (tx, mut rx) = mpsc::channel(4);
        let mut handler = InteractiveHandler::default();
        let run = session.run_with_input(&mut handler, &mut rx);
        let script = async {
            assert_eq!(peer.next_text().await.as_deref(), Some("connect 31 {}"));
            tx.send(r#"{"type":"cash"}"#.to_string()).await.unwrap();
            let sub = peer.next_text().await.unwrap();
            assert!(sub.starts_with("sub 1 "));
            peer.push(r#"1 A {"currencyId":"EUR","amount":1}"#).await;
            tx.send("exit".to_string()).await.unwrap();
        };
        let (result, ()) = tokio::join!(run, script);
        result.unwrap();
        assert_eq!(peer.try_next(), Some(Outbound::Close));
    }

    #[test]
    fn test_close_codes() {
        let mut handler = InteractiveHandler::default();
        assert!(handler.on_close(1000, "bye").is_ok());
        assert!(handler.on_close(1001, "away").is_ok());
        assert!(handler.on_close(1006, "lost").is_err());
    }
}
