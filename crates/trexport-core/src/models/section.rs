//! 거래 상세(`timelineDetailV2`) 섹션.
//!
//! 섹션 구조는 거래 유형과 앱 버전에 따라 자주 바뀌므로 원본 JSON은
//! 그대로 보관하고, 필요한 곳에서만 이 타입으로 느슨하게 읽습니다.

use super::transaction::TimelineAction;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::debug;

/// `null`을 기본값으로 읽습니다.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// 헤더 섹션 데이터.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeaderData {
    /// 종목 아이콘 경로 (`logos/<ISIN>/v2`)
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// 표시용 값 (`"2 × "` 접두사 + `"€101.00"` 본문 형태).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DisplayValue {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub prefix: Option<String>,
}

/// 표 행의 상세 값.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RowDetail {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(rename = "displayValue", default)]
    pub display_value: Option<DisplayValue>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

/// 표 섹션의 한 행.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableRow {
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default)]
    pub detail: Option<RowDetail>,
}

impl TableRow {
    /// `detail.text`.
    pub fn text(&self) -> Option<&str> {
        self.detail.as_ref()?.text.as_deref()
    }

    /// `detail.displayValue.text`, 없으면 `detail.text`.
    pub fn display_text(&self) -> Option<&str> {
        self.detail
            .as_ref()?
            .display_value
            .as_ref()
            .and_then(|v| v.text.as_deref())
            .or_else(|| self.text())
    }

    /// `detail.displayValue.prefix`.
    pub fn display_prefix(&self) -> Option<&str> {
        self.detail
            .as_ref()?
            .display_value
            .as_ref()?
            .prefix
            .as_deref()
    }
}

/// 문서 섹션 항목.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentEntry {
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub action: Option<TimelineAction>,
    #[serde(rename = "postboxType", default)]
    pub postbox_type: Option<String>,
}

/// 거래 상세 섹션.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Section {
    Header {
        #[serde(default)]
        title: Option<String>,
        #[serde(default, deserialize_with = "null_as_default")]
        data: HeaderData,
    },
    Table {
        #[serde(default)]
        title: Option<String>,
        #[serde(default, deserialize_with = "null_as_default")]
        data: Vec<TableRow>,
    },
    Documents {
        #[serde(default)]
        title: Option<String>,
        #[serde(default, deserialize_with = "null_as_default")]
        data: Vec<DocumentEntry>,
    },
    /// 내보내기에 쓰지 않는 섹션 (steps, note, banner 등)
    #[serde(other)]
    Other,
}

impl Section {
    /// 섹션 제목.
    pub fn title(&self) -> Option<&str> {
        match self {
            Section::Header { title, .. }
            | Section::Table { title, .. }
            | Section::Documents { title, .. } => title.as_deref(),
            Section::Other => None,
        }
    }

    /// 표 행. 표가 아니면 빈 슬라이스.
    pub fn rows(&self) -> &[TableRow] {
        match self {
            Section::Table { data, .. } => data,
            _ => &[],
        }
    }

    /// 제목이 일치하는 첫 행.
    pub fn row(&self, title: &str) -> Option<&TableRow> {
        self.rows().iter().find(|r| r.title == title)
    }

    /// 헤더 섹션의 아이콘.
    pub fn header_icon(&self) -> Option<&str> {
        match self {
            Section::Header { data, .. } => data.icon.as_deref(),
            _ => None,
        }
    }
}

/// 원본 섹션 JSON을 읽습니다. 읽을 수 없는 섹션은 건너뜁니다.
pub fn parse_sections(raw: &[Value]) -> Vec<Section> {
    raw.iter()
        .filter_map(|value| match Section::deserialize(value) {
            Ok(section) => Some(section),
            Err(e) => {
                debug!(error = %e, "상세 섹션 해석 실패, 건너뜀");
                None
            }
        })
        .collect()
}

/// 제목이 일치하는 첫 표 섹션.
pub fn find_table<'a>(sections: &'a [Section], title: &str) -> Option<&'a Section> {
    sections
        .iter()
        .find(|s| matches!(s, Section::Table { .. }) && s.title() == Some(title))
}

/// 첫 헤더 섹션의 아이콘.
pub fn find_header_icon(sections: &[Section]) -> Option<&str> {
    sections.iter().find_map(Section::header_icon)
}
