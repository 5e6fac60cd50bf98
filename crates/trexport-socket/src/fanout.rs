//! 상세 조회 팬아웃.
//!
//! 거래 id 집합 전체에 대해 상세 구독을 한 번에 보내고, 응답이 올 때마다
//! 남은 작업을 줄입니다. 마지막 응답에서 정확히 한 번 완료를 알립니다.

use crate::error::SocketError;
use crate::session::RequestSink;
use crate::subscription::{Subscription, SubscriptionKind};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use tracing::{debug, info, warn};
use trexport_core::TransactionDetails;

/// 팬아웃 진행 상태.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FanOutState {
    NotStarted,
    InFlight,
    Complete,
}

/// 작업 집합이 비었을 때의 처리.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyWorkSet {
    /// 바로 완료
    #[default]
    CompleteImmediately,
    /// `SocketError::EmptyWorkSet`
    Reject,
}

/// 상세 응답을 작업 항목에 매칭할 id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetailIdStrategy {
    /// 요청에 쓴 id (없으면 응답 본문의 id)
    #[default]
    Requested,
    /// 응답 본문의 id (없으면 요청에 쓴 id)
    Reported,
}

/// 응답 하나를 처리한 결과.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FanOutProgress {
    Pending { remaining: usize },
    /// 마지막 작업 완료. 한 번만 나옵니다.
    Completed,
    /// 이미 끝났거나 모르는 id
    Ignored,
}

/// 상세 응답에서 작업 id를 고르는 함수.
pub type IdResolver = Box<dyn Fn(&Subscription, &TransactionDetails) -> Option<String> + Send>;

fn requested_id(subscription: &Subscription, detail: &TransactionDetails) -> Option<String> {
    subscription
        .param_str("id")
        .map(str::to_string)
        .or_else(|| (!detail.id.is_empty()).then(|| detail.id.clone()))
}

fn reported_id(subscription: &Subscription, detail: &TransactionDetails) -> Option<String> {
    if detail.id.is_empty() {
        subscription.param_str("id").map(str::to_string)
    } else {
        Some(detail.id.clone())
    }
}

/// 거래 상세 팬아웃.
pub struct FanOut {
    state: FanOutState,
    policy: EmptyWorkSet,
    pending: HashSet<String>,
    resolver: IdResolver,
}

impl std::fmt::Debug for FanOut {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FanOut")
            .field("state", &self.state)
            .field("policy", &self.policy)
            .field("pending", &self.pending.len())
            .finish()
    }
}

impl FanOut {
    pub fn new(policy: EmptyWorkSet) -> Self {
        Self {
            state: FanOutState::NotStarted,
            policy,
            pending: HashSet::new(),
            resolver: Box::new(requested_id),
        }
    }

    /// 기본 id 매칭 방식을 바꿉니다.
    pub fn with_strategy(self, strategy: DetailIdStrategy) -> Self {
        match strategy {
            DetailIdStrategy::Requested => self.with_resolver(requested_id),
            DetailIdStrategy::Reported => self.with_resolver(reported_id),
        }
    }

    /// 직접 만든 id 매칭 함수를 씁니다.
    pub fn with_resolver<F>(mut self, resolver: F) -> Self
    where
        F: Fn(&Subscription, &TransactionDetails) -> Option<String> + Send + 'static,
    {
        self.resolver = Box::new(resolver);
        self
    }

    pub fn state(&self) -> FanOutState {
        self.state
    }

    /// 남은 작업 수.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn is_pending(&self, id: &str) -> bool {
        self.pending.contains(id)
    }

    /// 모든 id에 대해 상세 구독을 보냅니다. 중복 id는 한 번만 요청합니다.
    pub fn start<S, I>(&mut self, sink: &mut S, ids: I) -> Result<FanOutProgress, SocketError>
    where
        S: RequestSink + ?Sized,
        I: IntoIterator<Item = String>,
    {
        if self.state != FanOutState::NotStarted {
            return Err(SocketError::InvalidState(format!(
                "팬아웃이 이미 시작됨: {:?}",
                self.state
            )));
        }

        let mut requested = Vec::new();
        for id in ids {
            if self.pending.insert(id.clone()) {
                requested.push(id);
            }
        }

        if requested.is_empty() {
            return match self.policy {
                EmptyWorkSet::CompleteImmediately => {
                    info!("상세 조회 대상 없음, 바로 완료");
                    self.state = FanOutState::Complete;
                    Ok(FanOutProgress::Completed)
                }
                EmptyWorkSet::Reject => Err(SocketError::EmptyWorkSet),
            };
        }

        self.state = FanOutState::InFlight;
        info!(count = requested.len(), "거래 상세 조회 시작");
        for id in requested {
            let mut params = Map::new();
            params.insert("id".to_string(), Value::String(id));
            sink.subscribe(SubscriptionKind::TransactionDetails, params);
        }
        Ok(FanOutProgress::Pending {
            remaining: self.pending.len(),
        })
    }

    /// 응답의 작업 id.
    pub fn resolve_id(&self, subscription: &Subscription, detail: &TransactionDetails) -> Option<String> {
        (self.resolver)(subscription, detail)
    }

    /// 작업 하나를 완료로 표시합니다.
    pub fn complete(&mut self, id: &str) -> FanOutProgress {
        if self.state == FanOutState::Complete {
            debug!(id, "팬아웃 완료 후 도착한 응답 무시");
            return FanOutProgress::Ignored;
        }
        if !self.pending.remove(id) {
            warn!(id, "요청하지 않은 상세 응답 무시");
            return FanOutProgress::Ignored;
        }
        if self.pending.is_empty() {
            self.state = FanOutState::Complete;
            info!("거래 상세 조회 완료");
            FanOutProgress::Completed
        } else {
            FanOutProgress::Pending {
                remaining: self.pending.len(),
            }
        }
    }
}
