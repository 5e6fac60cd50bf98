//! 타임라인 전체 내보내기.

use crate::commands::convert::write_snowball_csv;
use crate::config::AppConfig;
use crate::documents::StatementDownloader;
use crate::exchange::BoerseFrankfurtResolver;
use crate::login;
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;
use trexport_core::{DocumentSource, ExchangeResolver, FixedExchange};
use trexport_socket::{fetch_timeline, FetchOptions, TimelineSnapshot};

/// 활동 내역 JSON 파일 이름.
pub const ACTIVITIES_FILE: &str = "activities.json";
/// 상세 조회 전 거래 목록 JSON 파일 이름.
pub const LISTED_TRANSACTIONS_FILE: &str = "transactions.json";
/// 상세가 붙은 거래 JSON 파일 이름.
pub const TRANSACTIONS_FILE: &str = "transactions_with_details.json";

/// 내보내기 옵션.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub output_dir: PathBuf,
    pub fetch_cash: bool,
    pub resolve_exchanges: bool,
    pub fetch_statements: bool,
    pub phone: Option<String>,
}

/// 저장 결과.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub activities: usize,
    pub transactions: usize,
    pub csv_rows: usize,
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let file = File::create(path).with_context(|| format!("파일 생성 실패: {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)
        .with_context(|| format!("JSON 저장 실패: {}", path.display()))?;
    writer.flush()?;
    info!(path = %path.display(), "JSON 저장");
    Ok(())
}

/// 조회 결과를 파일로 저장합니다.
pub async fn save_snapshot(
    snapshot: &TimelineSnapshot,
    output_dir: &Path,
    resolver: &dyn ExchangeResolver,
    documents: Option<&dyn DocumentSource>,
) -> Result<ExportSummary> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("디렉토리 생성 실패: {}", output_dir.display()))?;

    write_json(&output_dir.join(ACTIVITIES_FILE), &snapshot.activities)?;
    write_json(
        &output_dir.join(LISTED_TRANSACTIONS_FILE),
        &snapshot.listed_transactions,
    )?;
    write_json(&output_dir.join(TRANSACTIONS_FILE), &snapshot.transactions)?;
    let csv_rows =
        write_snowball_csv(&snapshot.transactions, output_dir, resolver, documents).await?;

    Ok(ExportSummary {
        activities: snapshot.activities.len(),
        transactions: snapshot.transactions.len(),
        csv_rows,
    })
}

/// 설정에 맞는 거래소 조회기를 만듭니다.
pub fn exchange_resolver(config: &AppConfig, resolve: bool) -> Result<Box<dyn ExchangeResolver>> {
    if resolve {
        Ok(Box::new(BoerseFrankfurtResolver::new(
            config.export.exchange_lookup_url.clone(),
            &config.api.user_agent,
        )?))
    } else {
        Ok(Box::new(FixedExchange(config.export.default_exchange.clone())))
    }
}

/// 배당 명세서 다운로더. 끄면 `None`.
pub fn statement_source(
    config: &AppConfig,
    enabled: bool,
) -> Result<Option<StatementDownloader>> {
    if !enabled {
        return Ok(None);
    }
    Ok(Some(StatementDownloader::new(&config.api.user_agent)?))
}

/// 로그인부터 파일 저장까지 실행합니다.
pub async fn run_export(config: &AppConfig, options: ExportOptions) -> Result<ExportSummary> {
    println!("\n📥 타임라인 내보내기 시작...");
    let mut session =
        login::open_session(&config.api, &config.stream, options.phone.clone()).await?;

    let fetch = FetchOptions {
        fetch_cash: options.fetch_cash,
        ..FetchOptions::from(&config.stream)
    };
    let snapshot = fetch_timeline(&mut session, fetch)
        .await
        .context("타임라인 조회 실패")?;

    let resolver = exchange_resolver(config, options.resolve_exchanges)?;
    let documents = statement_source(config, options.fetch_statements)?;
    let summary = save_snapshot(
        &snapshot,
        &options.output_dir,
        resolver.as_ref(),
        documents.as_ref().map(|d| d as &dyn DocumentSource),
    )
    .await?;

    println!(
        "✅ 활동 {}건, 거래 {}건 저장 (CSV {}행) → {}",
        summary.activities,
        summary.transactions,
        summary.csv_rows,
        options.output_dir.display()
    );
    for balance in &snapshot.cash {
        println!("💰 현금 잔고: {}", balance);
    }
    Ok(summary)
}
