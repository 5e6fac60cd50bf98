//! CLI 설정.
//!
//! 기본값 → 설정 파일(선택) → `TREXPORT__` 환경 변수 순서로 덮어씁니다.
//! 예: `TREXPORT__STREAM__SUBSCRIPTION_TIMEOUT_SECS=60`

use serde::{Deserialize, Serialize};
use std::path::Path;
use trexport_core::LogConfig;
use trexport_socket::{ApiConfig, StreamConfig};

/// 애플리케이션 설정.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// API 엔드포인트
    pub api: ApiConfig,
    /// 구독 처리
    pub stream: StreamConfig,
    /// 내보내기
    pub export: ExportConfig,
    /// 로깅
    pub logging: LogConfig,
}

/// 내보내기 설정.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// 결과 파일 디렉토리
    pub output_dir: String,
    /// 종목별 거래소를 Börse Frankfurt에서 조회할지 여부
    pub resolve_exchanges: bool,
    /// 배당 명세서(PDF)를 받아 배당 행을 채울지 여부
    pub fetch_statements: bool,
    /// 조회하지 않을 때 쓰는 거래소
    pub default_exchange: String,
    /// 거래소 조회 기본 URL
    pub exchange_lookup_url: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: "build".to_string(),
            resolve_exchanges: true,
            fetch_statements: true,
            default_exchange: "F".to_string(),
            exchange_lookup_url: "https://www.boerse-frankfurt.de".to_string(),
        }
    }
}

impl AppConfig {
    /// 설정 파일(있으면)과 환경 변수에서 설정을 로드합니다.
    pub fn load(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }
        let config = builder
            .add_source(
                config::Environment::with_prefix("TREXPORT")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        config.try_deserialize()
    }
}
