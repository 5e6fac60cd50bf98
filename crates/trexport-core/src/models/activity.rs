//! 활동 내역 (`timelineActivityLog`).

use super::event_type::{identify_activity_event_type, lenient_activity_event_type, ActivityEventType};
use super::transaction::TimelineAction;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 활동 한 건 (로그인, 문서 동의, 주식 선물 수령 등).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub id: String,
    pub timestamp: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub action: Option<TimelineAction>,
    #[serde(
        rename = "eventType",
        default,
        deserialize_with = "lenient_activity_event_type",
        skip_serializing_if = "Option::is_none"
    )]
    pub event_type: Option<ActivityEventType>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Activity {
    /// 제목/부제목 기준 분류 결과.
    pub fn classify(&self) -> Option<ActivityEventType> {
        identify_activity_event_type(&self.title, self.subtitle.as_deref())
    }
}
