//! 타임라인 전체 조회.
//!
//! 활동 내역 → 거래 내역 → 거래별 상세 → 현금 잔고 순서로 진행합니다.
//! 각 단계는 앞 단계가 끝난 뒤에만 시작합니다.

use crate::config::StreamConfig;
use crate::error::SocketError;
use crate::fanout::{DetailIdStrategy, EmptyWorkSet, FanOut, FanOutProgress};
use crate::pagination::{PageProgress, Paginator};
use crate::session::{Flow, RequestSink, Session, SessionHandler};
use crate::subscription::{Subscription, SubscriptionKind};
use serde_json::Map;
use std::collections::HashMap;
use tracing::{debug, info, warn};
use trexport_core::{
    identify_transaction_event_type, sort_newest_first, Activity, CashBalance, Page,
    Transaction, TransactionDetails,
};

/// 조회 옵션.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOptions {
    pub empty_work_set: EmptyWorkSet,
    /// 마지막에 현금 잔고를 조회할지 여부
    pub fetch_cash: bool,
    /// 분류되지 않은 거래를 버릴지 여부
    pub classified_only: bool,
    pub detail_id: DetailIdStrategy,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self::from(&StreamConfig::default())
    }
}

impl From<&StreamConfig> for FetchOptions {
    fn from(config: &StreamConfig) -> Self {
        Self {
            empty_work_set: config.empty_work_set,
            fetch_cash: config.fetch_cash,
            classified_only: config.classified_only,
            detail_id: config.detail_id,
        }
    }
}

/// 조회 결과.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimelineSnapshot {
    pub activities: Vec<Activity>,
    /// 상세 조회 전 거래 목록 (분류, 선물 합치기, 정렬까지 마친 상태)
    pub listed_transactions: Vec<Transaction>,
    /// 상세가 붙은 거래 (최신순)
    pub transactions: Vec<Transaction>,
    pub cash: Vec<CashBalance>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Activities,
    Transactions,
    Details,
    Cash,
    Done,
}

/// 타임라인 조회 핸들러.
#[derive(Debug)]
pub struct TimelineFetcher {
    options: FetchOptions,
    stage: Stage,
    activities: Paginator<Activity>,
    transactions: Paginator<Transaction>,
    fanout: FanOut,
    records: Vec<Transaction>,
    index: HashMap<String, Vec<usize>>,
    snapshot: TimelineSnapshot,
}

impl TimelineFetcher {
    pub fn new(options: FetchOptions) -> Self {
        Self {
            options,
            stage: Stage::Activities,
            activities: Paginator::new(SubscriptionKind::Activities),
            transactions: Paginator::new(SubscriptionKind::Transactions),
            fanout: FanOut::new(options.empty_work_set).with_strategy(options.detail_id),
            records: Vec::new(),
            index: HashMap::new(),
            snapshot: TimelineSnapshot::default(),
        }
    }

    /// 모든 단계가 끝났는지 확인.
    pub fn is_done(&self) -> bool {
        self.stage == Stage::Done
    }

    /// 조회 결과를 꺼냅니다.
    pub fn into_snapshot(self) -> TimelineSnapshot {
        self.snapshot
    }

    /// 거래를 분류하고 선물 수령 내역을 합친 뒤 최신순으로 정렬합니다.
    fn prepare_records(&mut self, transactions: Vec<Transaction>) {
        let mut records: Vec<Transaction> = transactions
            .into_iter()
            .map(|mut tx| {
                if let Some(event_type) =
                    identify_transaction_event_type(&tx.title, tx.subtitle.as_deref())
                {
                    tx.event_type = Some(event_type);
                }
                tx
            })
            .filter(|tx| !self.options.classified_only || tx.event_type.is_some())
            .collect();

        let received: Vec<Transaction> = self
            .snapshot
            .activities
            .iter()
            .filter_map(|activity| {
                let event_type = activity.classify()?.as_received_stock()?;
                Some(Transaction::from_received_activity(activity, event_type))
            })
            .collect();
        if !received.is_empty() {
            info!(count = received.len(), "활동 내역의 주식 수령을 거래에 추가");
        }
        records.extend(received);
        sort_newest_first(&mut records);

        self.index.clear();
        for (i, tx) in records.iter().enumerate() {
            self.index.entry(tx.id.clone()).or_default().push(i);
        }
        self.snapshot.listed_transactions = records.clone();
        self.records = records;
    }

    fn start_details<S: RequestSink + ?Sized>(&mut self, sink: &mut S) -> Result<Flow, SocketError> {
        self.stage = Stage::Details;
        let ids: Vec<String> = self.records.iter().map(|tx| tx.id.clone()).collect();
        match self.fanout.start(sink, ids)? {
            FanOutProgress::Completed => self.finish_details(sink),
            _ => Ok(Flow::Continue),
        }
    }

    fn finish_details<S: RequestSink + ?Sized>(&mut self, sink: &mut S) -> Result<Flow, SocketError> {
        self.snapshot.transactions = std::mem::take(&mut self.records);
        if self.options.fetch_cash {
            self.stage = Stage::Cash;
            sink.subscribe(SubscriptionKind::Cash, Map::new());
            Ok(Flow::Continue)
        } else {
            Ok(self.finish())
        }
    }

    fn finish(&mut self) -> Flow {
        self.stage = Stage::Done;
        info!(
            activities = self.snapshot.activities.len(),
            transactions = self.snapshot.transactions.len(),
            "타임라인 조회 완료"
        );
        Flow::Finish
    }

    fn unexpected(&self, subscription: &Subscription) -> Result<Flow, SocketError> {
        debug!(
            subscription_id = subscription.id,
            kind = %subscription.kind,
            stage = ?self.stage,
            "현재 단계와 맞지 않는 응답 무시"
        );
        Ok(Flow::Continue)
    }
}

impl SessionHandler for TimelineFetcher {
    fn on_connected(&mut self, session: &mut Session) -> Result<Flow, SocketError> {
        if self.stage != Stage::Activities {
            warn!("이미 진행 중인 조회에 connected 수신");
            return Ok(Flow::Continue);
        }
        self.activities.start(session)?;
        Ok(Flow::Continue)
    }

    fn on_activities_page(
        &mut self,
        session: &mut Session,
        subscription: &Subscription,
        page: Page<Activity>,
    ) -> Result<Flow, SocketError> {
        if self.stage != Stage::Activities {
            return self.unexpected(subscription);
        }
        if let PageProgress::Complete { .. } = self.activities.on_page(session, subscription.id, page)? {
            self.snapshot.activities = self.activities.take_items();
            self.stage = Stage::Transactions;
            self.transactions.start(session)?;
        }
        Ok(Flow::Continue)
    }

    fn on_transactions_page(
        &mut self,
        session: &mut Session,
        subscription: &Subscription,
        page: Page<Transaction>,
    ) -> Result<Flow, SocketError> {
        if self.stage != Stage::Transactions {
            return self.unexpected(subscription);
        }
        match self.transactions.on_page(session, subscription.id, page)? {
            PageProgress::Complete { .. } => {
                let transactions = self.transactions.take_items();
                self.prepare_records(transactions);
                self.start_details(session)
            }
            _ => Ok(Flow::Continue),
        }
    }

    fn on_transaction_detail(
        &mut self,
        session: &mut Session,
        subscription: &Subscription,
        detail: TransactionDetails,
    ) -> Result<Flow, SocketError> {
        if self.stage != Stage::Details {
            return self.unexpected(subscription);
        }
        let Some(id) = self.fanout.resolve_id(subscription, &detail) else {
            warn!(subscription_id = subscription.id, "상세 응답의 거래 id를 알 수 없음");
            return Ok(Flow::Continue);
        };
        if !self.fanout.is_pending(&id) {
            self.fanout.complete(&id);
            return Ok(Flow::Continue);
        }

        if let Some(indices) = self.index.get(&id) {
            for &i in indices {
                if let Some(tx) = self.records.get_mut(i) {
                    tx.attach_details(detail.clone());
                }
            }
        }
        match self.fanout.complete(&id) {
            FanOutProgress::Completed => self.finish_details(session),
            FanOutProgress::Pending { remaining } => {
                debug!(remaining, "거래 상세 수신");
                Ok(Flow::Continue)
            }
            FanOutProgress::Ignored => Ok(Flow::Continue),
        }
    }

    fn on_cash_balance(
        &mut self,
        _session: &mut Session,
        subscription: &Subscription,
        balances: Vec<CashBalance>,
    ) -> Result<Flow, SocketError> {
        if self.stage != Stage::Cash {
            return self.unexpected(subscription);
        }
        for balance in &balances {
            info!("현금 잔고: {}", balance);
        }
        self.snapshot.cash = balances;
        Ok(self.finish())
    }
}

/// 세션에서 타임라인 전체를 조회합니다.
pub async fn fetch_timeline(
    session: &mut Session,
    options: FetchOptions,
) -> Result<TimelineSnapshot, SocketError> {
    let mut fetcher = TimelineFetcher::new(options);
    session.run(&mut fetcher).await?;
    if !fetcher.is_done() {
        return Err(SocketError::InvalidState(
            "타임라인 조회가 끝나기 전에 세션이 종료됨".to_string(),
        ));
    }
    Ok(fetcher.into_snapshot())
}
