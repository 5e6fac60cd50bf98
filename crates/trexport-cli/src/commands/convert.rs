//! 저장된 거래 JSON → Snowball CSV 변환 (오프라인).

use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::info;
use trexport_core::snowball::{convert_transactions_with, write_csv};
use trexport_core::{DocumentSource, ExchangeResolver, Transaction};

/// Snowball CSV 파일 이름.
pub const SNOWBALL_FILE: &str = "snowball_transactions.csv";

/// 거래 목록을 CSV로 저장합니다. 저장한 행 수를 반환합니다.
///
/// `documents`가 없으면 배당은 상세 표만으로 채웁니다.
pub async fn write_snowball_csv(
    transactions: &[Transaction],
    output_dir: &Path,
    resolver: &dyn ExchangeResolver,
    documents: Option<&dyn DocumentSource>,
) -> Result<usize> {
    let rows = convert_transactions_with(transactions, resolver, documents).await;
    let path = output_dir.join(SNOWBALL_FILE);
    let file =
        File::create(&path).with_context(|| format!("파일 생성 실패: {}", path.display()))?;
    write_csv(&rows, file)?;
    info!(rows = rows.len(), path = %path.display(), "Snowball CSV 저장");
    Ok(rows.len())
}

/// `transactions_with_details.json`을 읽어 CSV로 변환합니다.
pub async fn convert_file(
    input: &Path,
    output_dir: &Path,
    resolver: &dyn ExchangeResolver,
    documents: Option<&dyn DocumentSource>,
) -> Result<PathBuf> {
    let file = File::open(input).with_context(|| format!("파일 열기 실패: {}", input.display()))?;
    let transactions: Vec<Transaction> = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("거래 JSON 해석 실패: {}", input.display()))?;

    fs::create_dir_all(output_dir)
        .with_context(|| format!("디렉토리 생성 실패: {}", output_dir.display()))?;
    let rows = write_snowball_csv(&transactions, output_dir, resolver, documents).await?;
    println!("✅ {}건 거래 → {}행 변환", transactions.len(), rows);
    Ok(output_dir.join(SNOWBALL_FILE))
}
