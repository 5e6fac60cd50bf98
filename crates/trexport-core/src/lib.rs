//! # trexport-core
//!
//! 트레이드 리퍼블릭 타임라인 내보내기의 도메인 계층입니다.
//!
//! - 거래/활동/상세 섹션/현금 잔고 모델
//! - 제목/부제목 기반 이벤트 분류
//! - Snowball Analytics CSV 변환
//! - 배당 명세서(PDF) 해석
//! - 로깅 초기화

pub mod error;
pub mod logging;
pub mod models;
pub mod snowball;
pub mod statement;

pub use error::*;
pub use logging::{init_logging, LogConfig, LogFormat};
pub use models::*;
pub use snowball::{ExchangeResolver, FixedExchange, SnowballRow};
pub use statement::{DividendStatement, DocumentSource};
