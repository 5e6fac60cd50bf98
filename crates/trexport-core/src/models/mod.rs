//! 타임라인 도메인 모델.
//!
//! 서버 JSON 구조를 그대로 따르되, 알 수 없는 필드는 `extra`에 보존하여
//! 저장된 JSON 파일이 원본 응답과 같은 모양을 유지하도록 합니다.

pub mod activity;
pub mod cash;
pub mod event_type;
pub mod section;
pub mod transaction;

pub use activity::*;
pub use cash::*;
pub use event_type::*;
pub use section::*;
pub use transaction::*;

use serde::{Deserialize, Serialize};

/// 페이지 커서.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursors {
    /// 다음 페이지 커서 (`None`이면 마지막 페이지)
    #[serde(default)]
    pub after: Option<String>,
    /// 이전 페이지 커서
    #[serde(default)]
    pub before: Option<String>,
}

/// 커서 기반 페이지 응답.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    /// 이 페이지의 항목 (서버 순서 유지)
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    /// 커서
    #[serde(default)]
    pub cursors: Cursors,
}

impl<T> Page<T> {
    /// 다음 페이지 커서. 빈 문자열도 끝으로 취급합니다.
    pub fn next_cursor(&self) -> Option<&str> {
        self.cursors.after.as_deref().filter(|c| !c.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_page_cursor() {
        let page: Page<serde_json::Value> = serde_json::from_value(json!({
            "items": [{"id": "a"}],
            "cursors": {"after": "c1", "before": null}
        }))
        .unwrap();
        assert_eq!(page.next_cursor(), Some("c1"));

        let last: Page<serde_json::Value> =
            serde_json::from_value(json!({"items": [], "cursors": {"after": null}})).unwrap();
        assert_eq!(last.next_cursor(), None);

        let no_cursors: Page<serde_json::Value> =
            serde_json::from_value(json!({"items": []})).unwrap();
        assert_eq!(no_cursors.next_cursor(), None);
    }
}
