//! mockito 서버로 웹 로그인과 2단계 인증을 검증합니다.

use mockito::{Matcher, Server};
use secrecy::SecretString;
use serde_json::json;
use trexport_socket::{ApiConfig, SocketError, TradeRepublicAuth};

fn auth_for(server: &Server) -> TradeRepublicAuth {
    TradeRepublicAuth::new(ApiConfig::default().with_rest_base_url(server.url())).unwrap()
}

#[tokio::test]
async fn test_login_and_verify() {
    let mut server = Server::new_async().await;
    let login = server
        .mock("POST", "/api/v1/auth/web/login")
        .match_body(Matcher::Json(json!({"phoneNumber": "+4915112345678", "pin": "1234"})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"processId":"proc-1","countdownInSeconds":30,"2fa":"SMS"}"#)
        .create_async()
        .await;
    let verify = server
        .mock("POST", "/api/v1/auth/web/login/proc-1/0000")
        .with_status(200)
        .with_header("set-cookie", "tr_session=session-abc; Path=/; HttpOnly")
        .with_body("{}")
        .create_async()
        .await;

    let auth = auth_for(&server);
    let challenge = auth
        .login("+4915112345678", &SecretString::from("1234".to_string()))
        .await
        .unwrap();
    assert_eq!(challenge.process_id, "proc-1");
    assert_eq!(challenge.countdown_in_seconds, 30);
    assert_eq!(challenge.two_factor_method.as_deref(), Some("SMS"));

    let token = auth.verify(&challenge, " 0000\n").await.unwrap();
    assert_eq!(token.expose(), "session-abc");
    assert!(!format!("{token:?}").contains("session-abc"));

    login.assert_async().await;
    verify.assert_async().await;
}

#[tokio::test]
async fn test_login_rejected() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/api/v1/auth/web/login")
        .with_status(401)
        .with_body(r#"{"errors":[{"errorCode":"INVALID_CREDENTIALS","errorMessage":"Wrong PIN"}]}"#)
        .create_async()
        .await;

    let err = auth_for(&server)
        .login("+4915112345678", &SecretString::from("0000".to_string()))
        .await
        .unwrap_err();
    match err {
        SocketError::Login { message, response } => {
            assert_eq!(message, "Wrong PIN");
            assert!(response.unwrap().contains("INVALID_CREDENTIALS"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_wrong_code() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/api/v1/auth/web/login")
        .with_status(200)
        .with_body(r#"{"processId":"proc-2"}"#)
        .create_async()
        .await;
    server
        .mock("POST", "/api/v1/auth/web/login/proc-2/9999")
        .with_status(400)
        .with_body(r#"{"errors":[{"errorCode":"VALIDATION_CODE_INVALID"}]}"#)
        .create_async()
        .await;

    let auth = auth_for(&server);
    let challenge = auth
        .login("+4915112345678", &SecretString::from("1234".to_string()))
        .await
        .unwrap();
    let err = auth.verify(&challenge, "9999").await.unwrap_err();
    assert!(err.is_auth_error());
    assert!(matches!(
        err,
        SocketError::PinVerification { ref message, .. } if message == "VALIDATION_CODE_INVALID"
    ));
}

#[tokio::test]
async fn test_missing_session_cookie() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/api/v1/auth/web/login")
        .with_status(200)
        .with_body(r#"{"processId":"proc-3"}"#)
        .create_async()
        .await;
    server
        .mock("POST", "/api/v1/auth/web/login/proc-3/1111")
        .with_status(200)
        .with_body("{}")
        .create_async()
        .await;

    let auth = auth_for(&server);
    let challenge = auth
        .login("+4915112345678", &SecretString::from("1234".to_string()))
        .await
        .unwrap();
    let err = auth.verify(&challenge, "1111").await.unwrap_err();
    assert!(matches!(err, SocketError::Unauthorized(_)));
}

#[tokio::test]
async fn test_missing_process_id() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/api/v1/auth/web/login")
        .with_status(200)
        .with_body(r#"{"status":"ok"}"#)
        .create_async()
        .await;

    let err = auth_for(&server)
        .login("+4915112345678", &SecretString::from("1234".to_string()))
        .await
        .unwrap_err();
    assert!(matches!(err, SocketError::Unauthorized(_)));
}
