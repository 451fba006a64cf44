//! HTTP-level tests for the raw fetcher and the chat-delivery client,
//! against a local wiremock server.

use msgtrigger::{
    ChatApiClient, ChatDelivery, DeliveryError, DryRunDelivery, HttpFetcher, MediaMessage,
    MessageTrigger, PageFetcher, PipelineConfig, TextMessage, UrlError,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer) -> PipelineConfig {
    PipelineConfig::builder()
        .api_base_url(server.uri())
        .delivery_timeout_secs(5)
        .build()
        .unwrap()
}

fn text() -> TextMessage {
    TextMessage {
        instancia: "inst-1".into(),
        mensagem: "bom dia".into(),
        numero: "5511999999999".into(),
        token: "tok".into(),
    }
}

// ── HttpFetcher ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn fetch_returns_body_bytes() {
    let server = MockServer::start().await;
    let body: Vec<u8> = vec![0x00, 0xFF, b'%', b'P', b'D', b'F'];
    Mock::given(method("GET"))
        .and(path("/doc"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::new(&PipelineConfig::default()).unwrap();
    let got = fetcher.fetch(&format!("{}/doc", server.uri())).await.unwrap();
    assert_eq!(got, body);
}

#[tokio::test]
async fn fetch_non_success_is_http_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::new(&PipelineConfig::default()).unwrap();
    let err = fetcher
        .fetch(&format!("{}/missing", server.uri()))
        .await
        .unwrap_err();
    assert!(
        matches!(err, UrlError::HttpStatus { status: 404, .. }),
        "got: {err:?}"
    );
}

#[tokio::test]
async fn fetch_timeout_applies_when_configured() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let config = PipelineConfig::builder()
        .fetch_timeout_secs(Some(1))
        .build()
        .unwrap();
    let fetcher = HttpFetcher::new(&config).unwrap();
    let err = fetcher
        .fetch(&format!("{}/slow", server.uri()))
        .await
        .unwrap_err();
    assert!(
        matches!(err, UrlError::Timeout { secs: 1, .. }),
        "got: {err:?}"
    );
}

#[tokio::test]
async fn fetch_sends_configured_user_agent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("user-agent", "msgtrigger-test/1.0"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&server)
        .await;

    let config = PipelineConfig::builder()
        .user_agent("msgtrigger-test/1.0")
        .build()
        .unwrap();
    let fetcher = HttpFetcher::new(&config).unwrap();
    assert_eq!(fetcher.fetch(&server.uri()).await.unwrap(), b"ok");
}

// ── ChatApiClient ────────────────────────────────────────────────────────────

#[tokio::test]
async fn text_message_posted_as_json() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/send-message"))
        .and(body_partial_json(json!({
            "instancia": "inst-1",
            "mensagem": "bom dia",
            "numero": "5511999999999",
            "token": "tok"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&server)
        .await;

    let client = ChatApiClient::new(&config_for(&server)).unwrap();
    client.send_message(&text()).await.unwrap();
}

#[tokio::test]
async fn media_message_posted_to_media_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/send-message-media"))
        .and(body_partial_json(json!({ "media": ["JVBERi0xLjc="] })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let msg = MediaMessage {
        instancia: "inst-1".into(),
        mensagem: "segue".into(),
        numero: "5511999999999".into(),
        token: "tok".into(),
        media: vec!["JVBERi0xLjc=".into()],
    };
    let client = ChatApiClient::new(&config_for(&server)).unwrap();
    client.send_message_media(&msg).await.unwrap();
}

#[tokio::test]
async fn server_error_is_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let client = ChatApiClient::new(&config_for(&server)).unwrap();
    let err = client.send_message(&text()).await.unwrap_err();
    match err {
        DeliveryError::Api { status, body } => {
            assert_eq!(status, 500);
            assert_eq!(body, "boom");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn success_false_envelope_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "success": false, "error": "instance_offline" })),
        )
        .mount(&server)
        .await;

    let client = ChatApiClient::new(&config_for(&server)).unwrap();
    let err = client.send_message(&text()).await.unwrap_err();
    assert!(
        matches!(err, DeliveryError::Rejected(ref r) if r == "instance_offline"),
        "got: {err:?}"
    );
}

#[tokio::test]
async fn plain_text_success_body_is_accepted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
        .mount(&server)
        .await;

    let client = ChatApiClient::new(&config_for(&server)).unwrap();
    assert!(client.send_message(&text()).await.is_ok());
}

#[tokio::test]
async fn truncated_success_body_is_transport_error() {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    // Promises 100 body bytes, sends 2, then hangs up.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 4096];
        let _ = socket.read(&mut buf).await;
        let _ = socket
            .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\nContent-Type: application/json\r\n\r\n{}")
            .await;
        let _ = socket.shutdown().await;
    });

    let config = PipelineConfig::builder()
        .api_base_url(format!("http://{addr}"))
        .delivery_timeout_secs(5)
        .build()
        .unwrap();
    let client = ChatApiClient::new(&config).unwrap();
    let err = client.send_message(&text()).await.unwrap_err();
    assert!(matches!(err, DeliveryError::Transport(_)), "got: {err:?}");
}

// ── Full job over HTTP ───────────────────────────────────────────────────────

#[tokio::test]
async fn raw_fetch_job_end_to_end() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/send-message"))
        .and(body_partial_json(json!({ "numero": "5511999999999" })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let trigger = MessageTrigger::new(config_for(&server)).unwrap();
    let msg = format!("veja {}/page agora", server.uri());
    let result = trigger
        .run_payload(&json!({
            "gerar_pdf": "nao",
            "mensagem": msg,
            "numero": "5511999999999",
            "token": "tok",
            "key": "inst-1"
        }))
        .await
        .unwrap();

    assert_eq!(result.mode.label(), "text");
    assert_eq!(result.media.len(), 1);
    assert_eq!(result.stats.urls_failed, 0);
}

#[tokio::test]
async fn dry_run_delivery_makes_no_calls() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let trigger = MessageTrigger::new(config_for(&server))
        .unwrap()
        .with_delivery(Arc::new(DryRunDelivery));
    let result = trigger
        .run_payload(&json!({
            "gerar_pdf": "nao",
            "mensagem": "sem links",
            "numero": "5511999999999",
            "token": "tok",
            "key": "inst-1"
        }))
        .await
        .unwrap();
    assert!(result.urls.is_empty());
}
