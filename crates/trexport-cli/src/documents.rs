//! 거래 문서(PDF) 다운로드.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;
use trexport_core::statement::extract_statement_text;
use trexport_core::{CoreError, CoreResult, DocumentSource};

/// 문서 URL에서 PDF를 받아 텍스트로 바꿉니다.
pub struct StatementDownloader {
    client: Client,
}

impl StatementDownloader {
    pub fn new(user_agent: &str) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| anyhow::anyhow!("HTTP client 생성 실패: {}", e))?;
        Ok(Self { client })
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, reqwest::Error> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl DocumentSource for StatementDownloader {
    async fn fetch_text(&self, url: &str) -> CoreResult<String> {
        let pdf = self
            .download(url)
            .await
            .map_err(|e| CoreError::Document(format!("다운로드 실패: {}", e)))?;
        debug!(url, bytes = pdf.len(), "문서 다운로드");
        extract_statement_text(&pdf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_document_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/doc-1.pdf")
            .with_status(404)
            .create_async()
            .await;

        let downloader = StatementDownloader::new("trexport-test").unwrap();
        let err = downloader
            .fetch_text(&format!("{}/doc-1.pdf", server.url()))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("다운로드 실패"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_non_pdf_body_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/doc-2.pdf")
            .with_status(200)
            .with_header("content-type", "application/pdf")
            .with_body("<html>login required</html>")
            .create_async()
            .await;

        let downloader = StatementDownloader::new("trexport-test").unwrap();
        let result = downloader
            .fetch_text(&format!("{}/doc-2.pdf", server.url()))
            .await;
        assert!(matches!(result, Err(CoreError::Document(_))));
    }
}
