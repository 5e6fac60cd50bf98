//! 트레이드 리퍼블릭 타임라인 내보내기 CLI.
//!
//! # 사용 예시
//!
//! ```bash
//! # 전체 내보내기 (build/ 디렉토리)
//! trexport export
//!
//! # 부가 조회 없이
//! trexport export --no-cash --no-exchange-lookup --no-statements -o out
//!
//! # 대화형 콘솔
//! trexport interactive
//!
//! # 저장된 JSON → Snowball CSV
//! trexport convert -i build/transactions_with_details.json
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info};
use trexport_cli::commands::convert::convert_file;
use trexport_cli::commands::export::{
    exchange_resolver, run_export, statement_source, ExportOptions,
};
use trexport_cli::commands::interactive::run_interactive;
use trexport_cli::AppConfig;
use trexport_core::{init_logging, DocumentSource};

#[derive(Parser)]
#[command(name = "trexport")]
#[command(about = "Trade Republic 타임라인 내보내기", long_about = None)]
#[command(version)]
struct Cli {
    /// 설정 파일 (TOML, JSON 등)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// 로그 레벨 (설정 파일보다 우선)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 활동/거래/상세를 받아 JSON과 Snowball CSV로 저장
    Export {
        /// 출력 디렉토리 (기본: 설정의 export.output_dir)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// 현금 잔고 조회 생략
        #[arg(long, default_value = "false")]
        no_cash: bool,

        /// 거래소 조회 생략 (설정의 기본 거래소 사용)
        #[arg(long, default_value = "false")]
        no_exchange_lookup: bool,

        /// 배당 명세서(PDF) 다운로드 생략 (상세 표만 사용)
        #[arg(long, default_value = "false")]
        no_statements: bool,

        /// 전화번호 (생략 시 입력 요청)
        #[arg(long)]
        phone: Option<String>,
    },

    /// 구독 요청을 직접 입력하는 대화형 콘솔
    Interactive {
        /// 전화번호 (생략 시 입력 요청)
        #[arg(long)]
        phone: Option<String>,
    },

    /// 저장된 transactions_with_details.json → Snowball CSV
    Convert {
        /// 입력 JSON 파일
        #[arg(short, long)]
        input: PathBuf,

        /// 출력 디렉토리 (기본: 설정의 export.output_dir)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// 거래소 조회 생략
        #[arg(long, default_value = "false")]
        no_exchange_lookup: bool,

        /// 배당 명세서(PDF) 다운로드 생략
        #[arg(long, default_value = "false")]
        no_statements: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    init_logging(&config.logging.clone().with_env_overrides())?;

    let result = match cli.command {
        Commands::Export {
            output_dir,
            no_cash,
            no_exchange_lookup,
            no_statements,
            phone,
        } => {
            let options = ExportOptions {
                output_dir: output_dir.unwrap_or_else(|| PathBuf::from(&config.export.output_dir)),
                fetch_cash: config.stream.fetch_cash && !no_cash,
                resolve_exchanges: config.export.resolve_exchanges && !no_exchange_lookup,
                fetch_statements: config.export.fetch_statements && !no_statements,
                phone,
            };
            run_export(&config, options).await.map(|_| ())
        }
        Commands::Interactive { phone } => run_interactive(&config, phone).await,
        Commands::Convert {
            input,
            output_dir,
            no_exchange_lookup,
            no_statements,
        } => {
            let output_dir =
                output_dir.unwrap_or_else(|| PathBuf::from(&config.export.output_dir));
            let resolver =
                exchange_resolver(&config, config.export.resolve_exchanges && !no_exchange_lookup)?;
            let documents =
                statement_source(&config, config.export.fetch_statements && !no_statements)?;
            convert_file(
                &input,
                &output_dir,
                resolver.as_ref(),
                documents.as_ref().map(|d| d as &dyn DocumentSource),
            )
                .await
                .map(|path| info!(path = %path.display(), "변환 완료"))
        }
    };

    if let Err(e) = &result {
        error!("실패: {:#}", e);
    }
    result
}
