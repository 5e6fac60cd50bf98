//! 터미널 입력.

use anyhow::{Context, Result};
use secrecy::SecretString;
use std::io::{self, BufRead, Write};

/// 한 줄을 읽습니다.
pub fn prompt_line(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush().context("stdout flush 실패")?;
    let mut input = String::new();
    io::stdin()
        .lock()
        .read_line(&mut input)
        .with_context(|| format!("입력 읽기 실패: {}", label.trim()))?;
    Ok(input.trim().to_string())
}

/// 화면에 표시하지 않고 비밀 값을 읽습니다.
pub fn prompt_secret(label: &str) -> Result<SecretString> {
    let value = rpassword::prompt_password(label)
        .with_context(|| format!("입력 읽기 실패: {}", label.trim()))?;
    Ok(SecretString::from(value.trim().to_string()))
}

/// 전화번호. 인자로 받았으면 묻지 않습니다.
pub fn phone_number(given: Option<String>) -> Result<String> {
    match given {
        Some(phone) => Ok(phone),
        None => prompt_line("전화번호 (+49...): "),
    }
}
