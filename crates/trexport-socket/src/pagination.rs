//! 커서 기반 페이지 수집.
//!
//! 한 번에 한 페이지만 요청합니다. 응답의 `cursors.after`가 있으면 같은
//! 유형의 새 구독(새 id)으로 다음 페이지를 요청하고, 없으면 끝냅니다.

use crate::error::SocketError;
use crate::session::RequestSink;
use crate::subscription::SubscriptionKind;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};
use trexport_core::Page;

/// 페이지 수집 상태.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageState {
    Idle,
    Fetching { subscription_id: u64 },
    Done,
}

/// 페이지 하나를 처리한 결과.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageProgress {
    /// 다음 페이지를 요청함
    NextPage { subscription_id: u64, cursor: String },
    /// 마지막 페이지
    Complete { total: usize },
    /// 현재 요청과 다른 구독의 응답
    Stale,
}

/// 한 구독 유형의 모든 페이지를 모읍니다.
#[derive(Debug)]
pub struct Paginator<T> {
    kind: SubscriptionKind,
    state: PageState,
    items: Vec<T>,
    pages: usize,
}

impl<T> Paginator<T> {
    pub fn new(kind: SubscriptionKind) -> Self {
        Self {
            kind,
            state: PageState::Idle,
            items: Vec::new(),
            pages: 0,
        }
    }

    pub fn state(&self) -> PageState {
        self.state
    }

    pub fn is_done(&self) -> bool {
        self.state == PageState::Done
    }

    /// 지금까지 받은 페이지 수.
    pub fn pages(&self) -> usize {
        self.pages
    }

    /// 받은 순서대로 모은 항목.
    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn take_items(&mut self) -> Vec<T> {
        std::mem::take(&mut self.items)
    }

    /// 첫 페이지를 요청합니다.
    pub fn start<S: RequestSink + ?Sized>(&mut self, sink: &mut S) -> Result<u64, SocketError> {
        if self.state != PageState::Idle {
            return Err(SocketError::InvalidState(format!(
                "{} 페이지 수집이 이미 시작됨",
                self.kind
            )));
        }
        let subscription_id = sink.subscribe(self.kind, Map::new());
        info!(kind = %self.kind, subscription_id, "첫 페이지 요청");
        self.state = PageState::Fetching { subscription_id };
        Ok(subscription_id)
    }

    /// 받은 페이지를 반영하고 필요하면 다음 페이지를 요청합니다.
    pub fn on_page<S: RequestSink + ?Sized>(
        &mut self,
        sink: &mut S,
        subscription_id: u64,
        page: Page<T>,
    ) -> Result<PageProgress, SocketError> {
        match self.state {
            PageState::Fetching {
                subscription_id: expected,
            } if expected == subscription_id => {}
            PageState::Fetching { .. } => {
                warn!(kind = %self.kind, subscription_id, "현재 요청이 아닌 페이지 무시");
                return Ok(PageProgress::Stale);
            }
            state => {
                return Err(SocketError::InvalidState(format!(
                    "{} 페이지를 기다리지 않는 상태: {:?}",
                    self.kind, state
                )))
            }
        }

        let cursor = page.next_cursor().map(str::to_string);
        self.pages += 1;
        debug!(
            kind = %self.kind,
            page = self.pages,
            count = page.items.len(),
            "페이지 수신"
        );
        self.items.extend(page.items);

        match cursor {
            Some(cursor) => {
                let mut params = Map::new();
                params.insert("after".to_string(), Value::String(cursor.clone()));
                let subscription_id = sink.subscribe(self.kind, params);
                self.state = PageState::Fetching { subscription_id };
                Ok(PageProgress::NextPage {
                    subscription_id,
                    cursor,
                })
            }
            None => {
                self.state = PageState::Done;
                info!(
                    kind = %self.kind,
                    pages = self.pages,
                    total = self.items.len(),
                    "모든 페이지 수신"
                );
                Ok(PageProgress::Complete {
                    total: self.items.len(),
                })
            }
        }
    }
}
