//! 구독 세션과 이벤트 루프.
//!
//! `Session`은 연결, 구독 레지스트리, 세션 토큰을 함께 소유합니다. 모든
//! 콜백은 `run` 루프 한 곳에서 순서대로 실행되므로 핸들러 상태에 잠금이
//! 필요 없습니다.

use crate::codec::{self, Frame, Verb};
use crate::config::{ApiConfig, StreamConfig};
use crate::connection::{Connection, ConnectionEvent};
use crate::dispatcher;
use crate::error::SocketError;
use crate::transport::{connect_websocket, ABNORMAL_CLOSURE};
use crate::auth::SessionToken;
use crate::subscription::{Subscription, SubscriptionKind, SubscriptionRegistry};
use serde_json::{Map, Value};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};
use trexport_core::{Activity, CashBalance, Page, Transaction, TransactionDetails};

/// 콜백 처리 후 루프를 계속할지 여부.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// 작업 완료: 연결을 닫고 `run`이 `Ok`로 끝남
    Finish,
}

/// 구독 요청을 보낼 수 있는 대상.
///
/// 페이지네이션과 팬아웃은 이 트레이트에만 의존합니다.
pub trait RequestSink {
    /// 구독을 등록하고 요청을 보냅니다. 발급된 id를 반환합니다.
    fn subscribe(&mut self, kind: SubscriptionKind, params: Map<String, Value>) -> u64;
}

/// 세션 이벤트 콜백.
///
/// 구독 유형별 콜백의 기본 구현은 로그만 남기고 계속 진행합니다.
pub trait SessionHandler {
    /// 전송 연결 수립
    fn on_open(&mut self) {}

    /// 서버가 핸드셰이크를 수락함. 첫 구독은 여기서 보냅니다.
    fn on_connected(&mut self, session: &mut Session) -> Result<Flow, SocketError>;

    /// 라우팅 전에 모든 프레임을 받습니다.
    fn on_message(&mut self, _raw: &str, _frame: &Frame) {}

    fn on_transactions_page(
        &mut self,
        _session: &mut Session,
        subscription: &Subscription,
        _page: Page<Transaction>,
    ) -> Result<Flow, SocketError> {
        unhandled(subscription)
    }

    fn on_activities_page(
        &mut self,
        _session: &mut Session,
        subscription: &Subscription,
        _page: Page<Activity>,
    ) -> Result<Flow, SocketError> {
        unhandled(subscription)
    }

    fn on_transaction_detail(
        &mut self,
        _session: &mut Session,
        subscription: &Subscription,
        _detail: TransactionDetails,
    ) -> Result<Flow, SocketError> {
        unhandled(subscription)
    }

    fn on_cash_balance(
        &mut self,
        _session: &mut Session,
        subscription: &Subscription,
        _balances: Vec<CashBalance>,
    ) -> Result<Flow, SocketError> {
        unhandled(subscription)
    }

    fn on_raw(
        &mut self,
        _session: &mut Session,
        subscription: &Subscription,
        _payload: Value,
    ) -> Result<Flow, SocketError> {
        unhandled(subscription)
    }

    /// 서버가 구독을 거부함. 기본 동작은 작업 실패.
    fn on_rejected(
        &mut self,
        _session: &mut Session,
        subscription: &Subscription,
        body: &str,
    ) -> Result<Flow, SocketError> {
        Err(SocketError::SubscriptionRejected {
            id: subscription.id,
            kind: subscription.kind.to_string(),
            body: body.to_string(),
        })
    }

    /// 응답 형식이 구독 유형과 맞지 않음. 기본 동작은 작업 실패.
    fn on_invalid(
        &mut self,
        _session: &mut Session,
        subscription: &Subscription,
        reason: &str,
    ) -> Result<Flow, SocketError> {
        Err(SocketError::InvalidPayload {
            id: subscription.id,
            kind: subscription.kind.to_string(),
            reason: reason.to_string(),
        })
    }

    /// 등록되지 않은 구독의 프레임.
    fn on_unrouted(&mut self, frame: &Frame) {
        match frame.verb {
            Verb::KeepAlive => trace!(subscription_id = ?frame.subscription_id, "keep-alive"),
            _ => debug!(
                subscription_id = ?frame.subscription_id,
                verb = frame.verb.as_str(),
                "등록되지 않은 구독의 프레임"
            ),
        }
    }

    /// 사용자 입력 한 줄.
    fn on_input(&mut self, session: &mut Session, line: String) -> Result<Flow, SocketError> {
        session.send_raw(&line);
        Ok(Flow::Continue)
    }

    /// 작업이 끝나기 전에 연결이 닫힘. 기본 동작은 작업 실패.
    fn on_close(&mut self, code: u16, reason: &str) -> Result<(), SocketError> {
        Err(SocketError::ConnectionClosed {
            code,
            reason: reason.to_string(),
        })
    }
}

fn unhandled(subscription: &Subscription) -> Result<Flow, SocketError> {
    debug!(
        subscription_id = subscription.id,
        kind = %subscription.kind,
        "처리기 없는 응답"
    );
    Ok(Flow::Continue)
}

enum Step {
    Event(Option<ConnectionEvent>),
    Input(Option<String>),
    Deadline,
}

async fn next_line(input: &mut Option<&mut mpsc::Receiver<String>>) -> Option<String> {
    match input {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// 하나의 인증된 구독 세션.
pub struct Session {
    pub(crate) connection: Connection,
    pub(crate) registry: SubscriptionRegistry,
    token: SessionToken,
    subscription_timeout: Option<Duration>,
}

impl Session {
    /// 이미 만들어진 연결 위에 세션을 만듭니다.
    pub fn new(connection: Connection, token: SessionToken) -> Self {
        Self {
            connection,
            registry: SubscriptionRegistry::new(),
            token,
            subscription_timeout: None,
        }
    }

    /// 구독별 응답 대기 한도를 설정합니다.
    pub fn with_subscription_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.subscription_timeout = timeout;
        self
    }

    /// WebSocket에 연결해 세션을 만듭니다.
    pub async fn connect(
        api: &ApiConfig,
        stream: &StreamConfig,
        token: SessionToken,
    ) -> Result<Self, SocketError> {
        let handle = connect_websocket(&api.websocket_url, stream.inbound_capacity).await?;
        Ok(Self::new(Connection::new(handle, api.handshake_message()), token)
            .with_subscription_timeout(stream.subscription_timeout()))
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    pub fn registry(&self) -> &SubscriptionRegistry {
        &self.registry
    }

    /// 구독을 해제합니다.
    pub fn unsubscribe(&mut self, id: u64) {
        if self.registry.unregister(id).is_none() {
            debug!(subscription_id = id, "등록되지 않은 구독 해제 요청");
        }
        self.connection.send(codec::encode_unsubscribe(id));
    }

    /// 사용자가 입력한 한 줄을 보냅니다.
    ///
    /// `echo`는 그대로, `unsub <id>`는 구독 해제로 보냅니다. 그 밖에는 줄 안의
    /// 첫 JSON 객체에 토큰을 넣어 새 구독으로 보내고 id를 반환합니다.
    pub fn send_raw(&mut self, line: &str) -> Option<u64> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        if line == "echo" {
            self.connection.send(line);
            return None;
        }
        if let Some(rest) = line.strip_prefix("unsub ") {
            match rest.trim().parse::<u64>() {
                Ok(id) => self.unsubscribe(id),
                Err(_) => warn!("구독 id를 읽을 수 없음: {}", rest),
            }
            return None;
        }

        let Some(json) = codec::extract_json(line) else {
            warn!("JSON 본문이 없는 입력은 보내지 않음: {}", line);
            return None;
        };
        let mut params = match serde_json::from_str::<Value>(json) {
            Ok(Value::Object(map)) => map,
            Ok(_) => {
                warn!("JSON 객체가 아닌 입력은 보내지 않음");
                return None;
            }
            Err(e) => {
                warn!("입력 JSON 해석 실패: {}", e);
                return None;
            }
        };
        params.remove("token");
        let kind = params
            .get("type")
            .and_then(Value::as_str)
            .map(SubscriptionKind::from_wire)
            .unwrap_or(SubscriptionKind::Raw);
        if kind != SubscriptionKind::Raw {
            params.remove("type");
        }
        Some(self.subscribe(kind, params))
    }

    /// 연결을 닫습니다. 두 번째 호출은 경고만 남깁니다.
    pub fn disconnect(&mut self) {
        self.connection.disconnect();
    }

    /// 완료(`Flow::Finish`)나 실패까지 이벤트를 처리합니다.
    pub async fn run<H: SessionHandler>(&mut self, handler: &mut H) -> Result<(), SocketError> {
        let result = self.drive(handler, None).await;
        self.settle(result)
    }

    /// `run`과 같지만 입력 채널의 줄을 `on_input`으로 전달합니다.
    /// 입력 채널이 닫히면 완료로 봅니다.
    pub async fn run_with_input<H: SessionHandler>(
        &mut self,
        handler: &mut H,
        input: &mut mpsc::Receiver<String>,
    ) -> Result<(), SocketError> {
        let result = self.drive(handler, Some(input)).await;
        self.settle(result)
    }

    fn settle(&mut self, result: Result<(), SocketError>) -> Result<(), SocketError> {
        if let Err(e) = &result {
            if !self.registry.is_empty() {
                warn!(pending = self.registry.len(), "대기 중인 구독을 버림: {}", e);
            }
            self.registry.clear();
            self.connection.close_transport();
        }
        result
    }

    fn next_deadline(&self) -> Option<Instant> {
        let timeout = self.subscription_timeout?;
        self.registry.oldest().map(|s| s.issued_at + timeout)
    }

    fn expired_subscription(&self) -> Option<SocketError> {
        let timeout = self.subscription_timeout?;
        let oldest = self.registry.oldest()?;
        let waited = oldest.issued_at.elapsed();
        (waited >= timeout).then(|| SocketError::Timeout {
            id: oldest.id,
            kind: oldest.kind.to_string(),
            waited,
        })
    }

    async fn drive<H: SessionHandler>(
        &mut self,
        handler: &mut H,
        mut input: Option<&mut mpsc::Receiver<String>>,
    ) -> Result<(), SocketError> {
        loop {
            let deadline = self.next_deadline();
            let step = tokio::select! {
                event = self.connection.next_event() => Step::Event(event),
                line = next_line(&mut input) => Step::Input(line),
                _ = sleep_until(deadline) => Step::Deadline,
            };

            let flow = match step {
                Step::Event(None) => {
                    return Err(SocketError::ConnectionClosed {
                        code: ABNORMAL_CLOSURE,
                        reason: "transport ended".to_string(),
                    })
                }
                Step::Event(Some(event)) => match event {
                    ConnectionEvent::Open => {
                        handler.on_open();
                        Flow::Continue
                    }
                    ConnectionEvent::Connected => handler.on_connected(self)?,
                    ConnectionEvent::Message { raw, frame } => {
                        handler.on_message(&raw, &frame);
                        let dispatch = dispatcher::route(&mut self.registry, frame);
                        dispatcher::deliver(self, handler, dispatch)?
                    }
                    ConnectionEvent::Closed { code, reason } => {
                        handler.on_close(code, &reason)?;
                        return Ok(());
                    }
                    ConnectionEvent::Error(message) => {
                        return Err(SocketError::WebSocket(message));
                    }
                },
                Step::Input(Some(line)) => handler.on_input(self, line)?,
                Step::Input(None) => {
                    info!("입력 종료");
                    Flow::Finish
                }
                Step::Deadline => match self.expired_subscription() {
                    Some(err) => return Err(err),
                    None => Flow::Continue,
                },
            };

            if flow == Flow::Finish {
                self.connection.disconnect();
                return Ok(());
            }
        }
    }
}

impl RequestSink for Session {
    fn subscribe(&mut self, kind: SubscriptionKind, params: Map<String, Value>) -> u64 {
        let frame = params.clone();
        let id = self.registry.register(kind, params);
        let raw = codec::encode_subscribe(id, kind, &frame, Some(self.token.expose()));
        debug!(subscription_id = id, kind = %kind, "구독 요청");
        if !self.connection.send(raw) {
            self.registry.unregister(id);
        }
        id
    }
}

impl Session {
    /// 구독을 등록하고 요청을 보냅니다.
    pub fn subscribe(&mut self, kind: SubscriptionKind, params: Map<String, Value>) -> u64 {
        RequestSink::subscribe(self, kind, params)
    }
}
