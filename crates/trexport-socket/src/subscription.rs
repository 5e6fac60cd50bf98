//! 구독 레지스트리.
//!
//! 하나의 연결에서 쓰는 구독 id는 1부터 단조 증가하며 재사용하지 않습니다.
//! 수신 프레임은 이 레지스트리로만 요청과 연결됩니다.

use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use tokio::time::Instant;

/// 구독 유형.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubscriptionKind {
    /// `timelineTransactions` (페이지)
    Transactions,
    /// `timelineDetailV2` (거래 한 건의 상세)
    TransactionDetails,
    /// `timelineActivityLog` (페이지)
    Activities,
    /// `cash`
    Cash,
    /// 사용자가 직접 입력한 구독
    Raw,
}

impl SubscriptionKind {
    /// 요청 본문의 `type` 값. `Raw`는 본문에 이미 포함됩니다.
    pub fn wire_name(&self) -> Option<&'static str> {
        match self {
            SubscriptionKind::Transactions => Some("timelineTransactions"),
            SubscriptionKind::TransactionDetails => Some("timelineDetailV2"),
            SubscriptionKind::Activities => Some("timelineActivityLog"),
            SubscriptionKind::Cash => Some("cash"),
            SubscriptionKind::Raw => None,
        }
    }

    /// `type` 값에서 변환합니다. 모르는 값은 `Raw`.
    pub fn from_wire(name: &str) -> Self {
        match name {
            "timelineTransactions" => SubscriptionKind::Transactions,
            "timelineDetailV2" => SubscriptionKind::TransactionDetails,
            "timelineActivityLog" => SubscriptionKind::Activities,
            "cash" => SubscriptionKind::Cash,
            _ => SubscriptionKind::Raw,
        }
    }
}

impl fmt::Display for SubscriptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name().unwrap_or("raw"))
    }
}

/// 진행 중인 구독.
#[derive(Debug, Clone, PartialEq)]
pub struct Subscription {
    pub id: u64,
    pub kind: SubscriptionKind,
    /// 요청 파라미터 (토큰 제외)
    pub params: Map<String, Value>,
    /// 요청 시각
    pub issued_at: Instant,
}

impl Subscription {
    /// 문자열 파라미터.
    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.params.get(key).and_then(Value::as_str)
    }
}

/// 구독 id → 구독 정보.
#[derive(Debug)]
pub struct SubscriptionRegistry {
    next_id: u64,
    entries: HashMap<u64, Subscription>,
}

impl Default for SubscriptionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            entries: HashMap::new(),
        }
    }

    /// 새 id를 발급하고 구독을 등록합니다.
    pub fn register(&mut self, kind: SubscriptionKind, params: Map<String, Value>) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.insert(
            id,
            Subscription {
                id,
                kind,
                params,
                issued_at: Instant::now(),
            },
        );
        id
    }

    pub fn lookup(&self, id: u64) -> Option<&Subscription> {
        self.entries.get(&id)
    }

    /// 구독을 제거합니다. 없으면 `None`.
    pub fn unregister(&mut self, id: u64) -> Option<Subscription> {
        self.entries.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 가장 오래 기다린 구독.
    pub fn oldest(&self) -> Option<&Subscription> {
        self.entries
            .values()
            .min_by_key(|s| (s.issued_at, s.id))
    }

    /// 모든 구독을 버립니다. 발급된 id는 재사용하지 않습니다.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ids_are_monotonic_and_never_reused() {
        let mut registry = SubscriptionRegistry::new();
        let a = registry.register(SubscriptionKind::Activities, Map::new());
        let b = registry.register(SubscriptionKind::Transactions, Map::new());
        assert_eq!((a, b), (1, 2));

        registry.unregister(a);
        registry.clear();
        let c = registry.register(SubscriptionKind::Cash, Map::new());
        assert_eq!(c, 3);
    }

    #[test]
    fn test_lookup_and_unregister() {
        let mut registry = SubscriptionRegistry::new();
        let mut params = Map::new();
        params.insert("id".into(), json!("tx-1"));
        let id = registry.register(SubscriptionKind::TransactionDetails, params);

        let sub = registry.lookup(id).unwrap();
        assert_eq!(sub.kind, SubscriptionKind::TransactionDetails);
        assert_eq!(sub.param_str("id"), Some("tx-1"));

        assert!(registry.unregister(id).is_some());
        assert!(registry.unregister(id).is_none());
        assert!(registry.lookup(id).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_kind_wire_names() {
        assert_eq!(SubscriptionKind::from_wire("timelineDetailV2"), SubscriptionKind::TransactionDetails);
        assert_eq!(SubscriptionKind::from_wire("compactPortfolio"), SubscriptionKind::Raw);
        assert_eq!(SubscriptionKind::Cash.to_string(), "cash");
        assert_eq!(SubscriptionKind::Raw.wire_name(), None);
    }

    #[tokio::test]
    async fn test_oldest() {
        let mut registry = SubscriptionRegistry::new();
        let first = registry.register(SubscriptionKind::Activities, Map::new());
        registry.register(SubscriptionKind::Transactions, Map::new());
        assert_eq!(registry.oldest().map(|s| s.id), Some(first));
    }
}
