use std::net::SocketAddr;

use reqwest::{Client, Method, StatusCode};
use tilt_view::{Config, OrientationBridge};

fn config() -> Config {
    Config {
        bind: "127.0.0.1:0".parse().unwrap(),
        poll_ms: 50,
    }
}

struct Phone {
    client: Client,
    addr: SocketAddr,
}

impl Phone {
    fn new(addr: SocketAddr) -> Self {
        Self {
            client: Client::new(),
            addr,
        }
    }

    async fn call(&self, method: Method, path: &str, body: &str) -> (StatusCode, String) {
        let response = self
            .client
            .request(method, format!("http://{}{}", self.addr, path))
            .header("Content-Type", "application/json")
            .body(body.to_string())
            .send()
            .await
            .unwrap();
        let status = response.status();
        (status, response.text().await.unwrap())
    }

    /// Mount a view; returns its session id and first fragment.
    async fn mount(&self, report: &str) -> (u64, String) {
        let (status, body) = self.call(Method::POST, "/mount", report).await;
        assert_eq!(status, StatusCode::OK);
        let value: serde_json::Value = serde_json::from_str(&body).unwrap();
        let id = value["session"].as_u64().unwrap();
        let html = value["html"].as_str().unwrap().to_string();
        (id, html)
    }
}

#[tokio::test]
async fn phone_session_over_http() {
    let bridge = OrientationBridge::start(&config()).unwrap();
    assert!(bridge.info().url.starts_with("http://127.0.0.1:"));
    assert!(!bridge.info().qr_terminal.is_empty());
    let phone = Phone::new(bridge.info().local_addr);

    let (status, page) = phone.call(Method::GET, "/", "").await;
    assert_eq!(status, StatusCode::OK);
    assert!(page.contains("deviceorientation"));

    let (id, html) = phone.mount(r#"{"supported":true,"prompt":true}"#).await;
    assert!(html.contains("Request Sensor Permissions and Start"));

    let (status, granted) = phone
        .call(Method::POST, &format!("/permission?session={}", id), r#"{"state":"granted"}"#)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(granted, r#"{"granted":true}"#);

    let event = r#"{"alpha":45.12345,"beta":-10.2,"gamma":5.0,"absolute":true}"#;
    let (status, body) = phone
        .call(Method::POST, &format!("/orientation?session={}", id), event)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_empty());

    let (status, view) = phone
        .call(Method::GET, &format!("/view?session={}", id), "")
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(!view.contains("Error"));
    for expected in ["45.12", "-10.20", "5.00", "Yes"] {
        assert!(view.contains(expected), "missing {} in {}", expected, view);
    }

    let (status, _) = phone
        .call(Method::POST, &format!("/unmount?session={}", id), "")
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    bridge.stop();
}

#[tokio::test]
async fn reloaded_page_keeps_its_own_view() {
    let bridge = OrientationBridge::start(&config()).unwrap();
    let phone = Phone::new(bridge.info().local_addr);

    let (old, _) = phone.mount(r#"{"supported":true,"prompt":false}"#).await;
    let (new, _) = phone.mount(r#"{"supported":true,"prompt":false}"#).await;
    assert_ne!(old, new);

    // pagehide beacon from the old page lands after the new mount
    let (status, _) = phone
        .call(Method::POST, &format!("/unmount?session={}", old), "")
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let event = r#"{"alpha":1.0,"beta":2.0,"gamma":3.0,"absolute":false}"#;
    let (status, _) = phone
        .call(Method::POST, &format!("/orientation?session={}", new), event)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, view) = phone
        .call(Method::GET, &format!("/view?session={}", new), "")
        .await;
    assert!(view.contains("1.00"), "missing reading in {}", view);

    let (status, _) = phone
        .call(Method::GET, &format!("/view?session={}", old), "")
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    bridge.stop();
}

#[tokio::test]
async fn routes_reject_missing_or_unknown_sessions() {
    let bridge = OrientationBridge::start(&config()).unwrap();
    let phone = Phone::new(bridge.info().local_addr);

    assert_eq!(
        phone.call(Method::GET, "/view", "").await.0,
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        phone.call(Method::GET, "/view?session=99", "").await.0,
        StatusCode::CONFLICT
    );
    assert_eq!(
        phone.call(Method::GET, "/missing", "").await.0,
        StatusCode::NOT_FOUND
    );

    bridge.stop();
}
