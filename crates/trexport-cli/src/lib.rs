//! 타임라인 내보내기 CLI.
//!
//! 이 crate는 다음 기능을 제공합니다:
//! - 로그인과 타임라인 전체 내보내기 (JSON + Snowball CSV)
//! - 대화형 구독 콘솔
//! - 저장된 JSON의 오프라인 CSV 변환
//! - 배당 명세서(PDF) 다운로드
//! - 설정 로드

pub mod commands;
pub mod config;
pub mod documents;
pub mod exchange;
pub mod login;
pub mod prompt;

pub use config::{AppConfig, ExportConfig};
