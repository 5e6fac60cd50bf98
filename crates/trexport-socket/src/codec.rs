//! 텍스트 프레임 코덱.
//!
//! 수신 프레임 형식은 `<구독 id> <verb> [<JSON>]`이고, 핸드셰이크 응답만
//! 예외적으로 `connected` 한 단어입니다. 송신 프레임은 `sub <id> <JSON>`과
//! `unsub <id>` 두 가지입니다.

use crate::subscription::SubscriptionKind;
use serde_json::{Map, Value};

/// 핸드셰이크 수락 응답.
pub const CONNECTED: &str = "connected";

/// 프레임 동사.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verb {
    /// `A`: 데이터 (JSON 페이로드 포함)
    Data,
    /// `D`: 이전 응답에 대한 증분
    Continuation,
    /// `C`: 연결 유지 / 구독 완료 신호
    KeepAlive,
    /// `E`: 구독 에러
    Error,
    /// 그 밖의 토큰
    Other(String),
}

impl Verb {
    /// 토큰에서 변환합니다.
    pub fn from_token(token: &str) -> Self {
        match token {
            "A" => Verb::Data,
            "D" => Verb::Continuation,
            "C" => Verb::KeepAlive,
            "E" => Verb::Error,
            other => Verb::Other(other.to_string()),
        }
    }

    /// 프레임 토큰.
    pub fn as_str(&self) -> &str {
        match self {
            Verb::Data => "A",
            Verb::Continuation => "D",
            Verb::KeepAlive => "C",
            Verb::Error => "E",
            Verb::Other(token) => token,
        }
    }
}

/// 해석된 수신 프레임.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// 첫 토큰이 숫자일 때의 구독 id
    pub subscription_id: Option<u64>,
    pub verb: Verb,
    /// 첫 `{`/`[`부터의 본문 원문. 괄호가 균형을 이루면 그 JSON 부분만,
    /// 닫히지 않으면 프레임 끝까지 그대로 담습니다. 괄호가 없으면 `None`.
    pub body: Option<String>,
    /// JSON 해석 결과. 본문이 있는데 `None`이면 깨진 프레임.
    pub payload: Option<Value>,
}

impl Frame {
    /// JSON 본문이 있었지만 해석하지 못했는지 확인.
    pub fn is_malformed(&self) -> bool {
        self.body.is_some() && self.payload.is_none()
    }
}

/// 수신 프레임 해석 결과.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    /// 핸드셰이크 수락
    Connected,
    Frame(Frame),
}

/// 텍스트 안의 첫 번째 균형 잡힌 JSON 객체/배열을 찾습니다.
///
/// 문자열 리터럴 안의 괄호와 이스케이프는 무시합니다.
/// 괄호가 닫히지 않으면 `None`.
pub fn extract_json(raw: &str) -> Option<&str> {
    let start = raw.find(['{', '['])?;
    let mut closers: Vec<u8> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (offset, byte) in raw.as_bytes()[start..].iter().enumerate() {
        if in_string {
            match byte {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' => closers.push(b'}'),
            b'[' => closers.push(b']'),
            b'}' | b']' => {
                if closers.pop() != Some(*byte) {
                    return None;
                }
                if closers.is_empty() {
                    return Some(&raw[start..=start + offset]);
                }
            }
            _ => {}
        }
    }
    None
}

/// 수신 텍스트를 해석합니다. 실패하지 않으며, 깨진 JSON은 `payload: None`.
pub fn decode(raw: &str) -> Decoded {
    if raw.trim() == CONNECTED {
        return Decoded::Connected;
    }

    let json_start = raw.find(['{', '[']);
    let head = match json_start {
        Some(start) => &raw[..start],
        None => raw,
    };
    let body = json_start.map(|start| extract_json(raw).unwrap_or(&raw[start..]));
    let payload = body.and_then(|b| serde_json::from_str::<Value>(b).ok());

    let mut tokens = head.split_whitespace();
    let first = tokens.next().unwrap_or_default();
    let (subscription_id, verb) = match first.parse::<u64>() {
        Ok(id) => (Some(id), Verb::from_token(tokens.next().unwrap_or_default())),
        Err(_) => (None, Verb::from_token(first)),
    };

    Decoded::Frame(Frame {
        subscription_id,
        verb,
        body: body.map(str::to_string),
        payload,
    })
}

/// 구독 요청 프레임을 만듭니다.
///
/// 본문은 `params`에 구독 유형(`type`)과 세션 토큰을 더한 JSON 객체입니다.
/// `Raw` 구독은 `params`에 이미 `type`이 들어 있어야 합니다.
pub fn encode_subscribe(
    id: u64,
    kind: SubscriptionKind,
    params: &Map<String, Value>,
    token: Option<&str>,
) -> String {
    let mut body = params.clone();
    if let Some(name) = kind.wire_name() {
        body.insert("type".to_string(), Value::String(name.to_string()));
    }
    if let Some(token) = token {
        body.insert("token".to_string(), Value::String(token.to_string()));
    }
    format!("sub {} {}", id, Value::Object(body))
}

/// 구독 해제 프레임.
pub fn encode_unsubscribe(id: u64) -> String {
    format!("unsub {}", id)
}
