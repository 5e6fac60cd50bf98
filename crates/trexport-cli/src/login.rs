//! 로그인 후 WebSocket 세션 열기.

use crate::prompt;
use anyhow::{Context, Result};
use tracing::info;
use trexport_socket::{ApiConfig, Session, SessionToken, StreamConfig, TradeRepublicAuth};

/// 전화번호/PIN/2단계 코드를 받아 세션 토큰을 얻습니다.
pub async fn login(api: &ApiConfig, phone: Option<String>) -> Result<SessionToken> {
    let phone = prompt::phone_number(phone)?;
    let pin = prompt::prompt_secret("PIN: ")?;

    let auth = TradeRepublicAuth::new(api.clone())?;
    let challenge = auth.login(&phone, &pin).await.context("로그인 실패")?;
    println!(
        "📱 인증 코드가 전송되었습니다 ({}초 후 재전송 가능)",
        challenge.countdown_in_seconds
    );
    let code = prompt::prompt_line("인증 코드: ")?;
    let token = auth
        .verify(&challenge, &code)
        .await
        .context("2단계 인증 실패")?;
    println!("✅ 로그인 성공");
    Ok(token)
}

/// 로그인하고 WebSocket 세션을 엽니다.
pub async fn open_session(
    api: &ApiConfig,
    stream: &StreamConfig,
    phone: Option<String>,
) -> Result<Session> {
    let token = login(api, phone).await?;
    info!(url = %api.websocket_url, "WebSocket 연결");
    Session::connect(api, stream, token)
        .await
        .context("WebSocket 연결 실패")
}
