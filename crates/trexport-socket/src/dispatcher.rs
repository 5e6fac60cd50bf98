//! 수신 프레임 라우팅.
//!
//! 구독 id로 레지스트리를 조회해 페이로드를 구독 유형에 맞는 타입으로
//! 읽고, 핸들러의 해당 콜백 하나만 호출합니다. 데이터 프레임을 처리하면
//! 구독은 레지스트리에서 제거됩니다.
//!
//! 페이지 응답은 항목 단위로 읽습니다. 읽을 수 없는 항목은 건너뛰고
//! 나머지와 커서는 그대로 전달합니다. 페이지 자체나 상세/잔고 응답이
//! 형식과 맞지 않으면 구독을 제거하고 `Dispatch::Invalid`로 알립니다.

use crate::codec::{Frame, Verb};
use crate::error::SocketError;
use crate::session::{Flow, Session, SessionHandler};
use crate::subscription::{Subscription, SubscriptionKind, SubscriptionRegistry};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, trace, warn};
use trexport_core::{Activity, CashBalance, Page, Transaction, TransactionDetails};

/// 구독 유형별로 읽은 페이로드.
#[derive(Debug, Clone, PartialEq)]
pub enum TimelinePayload {
    TransactionsPage(Page<Transaction>),
    ActivitiesPage(Page<Activity>),
    TransactionDetail(TransactionDetails),
    /// 단일 객체와 배열 응답을 모두 받습니다
    CashBalance(Vec<CashBalance>),
    Raw(Value),
}

impl TimelinePayload {
    /// 구독 유형에 맞춰 페이로드를 읽습니다.
    ///
    /// 페이지의 개별 항목 오류는 에러가 아닙니다 (`decode_page` 참고).
    pub fn decode(kind: SubscriptionKind, payload: Value) -> Result<Self, serde_json::Error> {
        Ok(match kind {
            SubscriptionKind::Transactions => Self::TransactionsPage(decode_page(kind, payload)?),
            SubscriptionKind::Activities => Self::ActivitiesPage(decode_page(kind, payload)?),
            SubscriptionKind::TransactionDetails => {
                Self::TransactionDetail(serde_json::from_value(payload)?)
            }
            SubscriptionKind::Cash => Self::CashBalance(match payload {
                Value::Array(_) => serde_json::from_value(payload)?,
                single => vec![serde_json::from_value(single)?],
            }),
            SubscriptionKind::Raw => Self::Raw(payload),
        })
    }
}

/// 페이지 봉투를 읽고 항목은 하나씩 변환합니다. 읽을 수 없는 항목은 버립니다.
fn decode_page<T: DeserializeOwned>(
    kind: SubscriptionKind,
    payload: Value,
) -> Result<Page<T>, serde_json::Error> {
    let page: Page<Value> = serde_json::from_value(payload)?;
    let items = page
        .items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| match serde_json::from_value(item) {
            Ok(item) => Some(item),
            Err(e) => {
                warn!(%kind, index, error = %e, "항목 형식 불일치, 건너뜀");
                None
            }
        })
        .collect();
    Ok(Page {
        items,
        cursors: page.cursors,
    })
}

/// 라우팅 결과.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// 등록된 구독의 데이터
    Routed {
        subscription: Subscription,
        payload: TimelinePayload,
    },
    /// 서버가 구독을 거부함
    Rejected {
        subscription: Subscription,
        body: String,
    },
    /// 응답 형식이 구독 유형과 맞지 않음. 구독은 이미 제거됨
    Invalid {
        subscription: Subscription,
        reason: String,
    },
    /// 등록된 구독이지만 처리할 내용 없음 (keep-alive, 깨진 JSON 등)
    Ignored,
    /// 등록되지 않은 id이거나 id 없는 프레임
    Unrouted(Frame),
}

/// 프레임을 구독에 연결합니다.
pub fn route(registry: &mut SubscriptionRegistry, frame: Frame) -> Dispatch {
    let Some(id) = frame.subscription_id else {
        return Dispatch::Unrouted(frame);
    };
    let Some(subscription) = registry.lookup(id).cloned() else {
        return Dispatch::Unrouted(frame);
    };

    match frame.verb {
        Verb::Data => {
            let Some(payload) = frame.payload else {
                warn!(
                    subscription_id = id,
                    kind = %subscription.kind,
                    body = frame.body.as_deref().unwrap_or_default(),
                    "JSON 해석 실패, 프레임 무시"
                );
                return Dispatch::Ignored;
            };
            match TimelinePayload::decode(subscription.kind, payload) {
                Ok(payload) => {
                    registry.unregister(id);
                    Dispatch::Routed {
                        subscription,
                        payload,
                    }
                }
                Err(e) => {
                    warn!(
                        subscription_id = id,
                        kind = %subscription.kind,
                        error = %e,
                        "응답 형식 불일치"
                    );
                    registry.unregister(id);
                    Dispatch::Invalid {
                        subscription,
                        reason: e.to_string(),
                    }
                }
            }
        }
        Verb::Error => {
            registry.unregister(id);
            Dispatch::Rejected {
                subscription,
                body: frame.body.unwrap_or_default(),
            }
        }
        Verb::KeepAlive => {
            trace!(subscription_id = id, "keep-alive");
            Dispatch::Ignored
        }
        Verb::Continuation | Verb::Other(_) => {
            debug!(subscription_id = id, verb = frame.verb.as_str(), "처리하지 않는 프레임");
            Dispatch::Ignored
        }
    }
}

/// 라우팅 결과를 핸들러에 전달합니다.
pub(crate) fn deliver<H: SessionHandler + ?Sized>(
    session: &mut Session,
    handler: &mut H,
    dispatch: Dispatch,
) -> Result<Flow, SocketError> {
    match dispatch {
        Dispatch::Routed {
            subscription,
            payload,
        } => match payload {
            TimelinePayload::TransactionsPage(page) => {
                handler.on_transactions_page(session, &subscription, page)
            }
            TimelinePayload::ActivitiesPage(page) => {
                handler.on_activities_page(session, &subscription, page)
            }
            TimelinePayload::TransactionDetail(detail) => {
                handler.on_transaction_detail(session, &subscription, detail)
            }
            TimelinePayload::CashBalance(balances) => {
                handler.on_cash_balance(session, &subscription, balances)
            }
            TimelinePayload::Raw(value) => handler.on_raw(session, &subscription, value),
        },
        Dispatch::Rejected { subscription, body } => {
            handler.on_rejected(session, &subscription, &body)
        }
        Dispatch::Invalid {
            subscription,
            reason,
        } => handler.on_invalid(session, &subscription, &reason),
        Dispatch::Ignored => Ok(Flow::Continue),
        Dispatch::Unrouted(frame) => {
            handler.on_unrouted(&frame);
            Ok(Flow::Continue)
        }
    }
}
