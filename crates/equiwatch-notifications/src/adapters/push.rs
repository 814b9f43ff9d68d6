//! Push-channel adapter.
//!
//! Bit-exact contract from spec §4.4/§6: `POST {base_url}/notifications`
//! with `Authorization: Key {API_KEY}` and body
//! `{app_id, include_subscription_ids:[token], headings, contents, url,
//! data:{event_numero, status}}`. Success requires HTTP 200 *and*
//! `recipients > 0` in the response body — grounded in the upstream
//! `OneSignalNotifier.send_to_player`'s `result.get("recipients", 0) > 0`
//! check; `recipients == 0` is reported as a stale/invalid token rather
//! than a generic failure.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

use super::NotificationAdapter;
use crate::error::{NotificationError, Result};
use crate::types::{NotificationTarget, RenderedContent, SendResult};

/// Hard cap on a single provider call (spec §4.4/§5: "10-15 s").
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

pub struct PushAdapter {
    http_client: Client,
    endpoint: String,
    app_id: String,
    api_key: String,
}

impl PushAdapter {
    pub fn new(
        endpoint: impl Into<String>,
        app_id: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self> {
        let http_client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http_client,
            endpoint: endpoint.into(),
            app_id: app_id.into(),
            api_key: api_key.into(),
        })
    }
}

#[async_trait]
impl NotificationAdapter for PushAdapter {
    async fn send(
        &self,
        target: &NotificationTarget,
        content: &RenderedContent,
    ) -> Result<SendResult> {
        let token = target
            .push_token
            .as_ref()
            .ok_or_else(|| NotificationError::InvalidConfig("missing push token".into()))?;

        let body = json!({
            "app_id": self.app_id,
            "include_subscription_ids": [token],
            "headings": {"en": content.subject.clone().unwrap_or_default()},
            "contents": {"en": content.body},
            "url": target.url,
            "data": {
                "event_numero": target.numero.get(),
                "status": target.status.as_str(),
            },
        });

        let response = self
            .http_client
            .post(format!("{}/notifications", self.endpoint))
            .header("Authorization", format!("Key {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| NotificationError::SendFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Ok(SendResult::failed(format!("http {status}: {text}")));
        }

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| NotificationError::SendFailed(e.to_string()))?;
        let recipients = payload.get("recipients").and_then(|v| v.as_u64()).unwrap_or(0);

        if recipients > 0 {
            Ok(SendResult::ok())
        } else {
            Ok(SendResult::failed("token no longer valid"))
        }
    }

    async fn send_test(&self, target: &NotificationTarget) -> Result<SendResult> {
        self.send(
            target,
            &RenderedContent {
                subject: Some("EquiWatch".to_string()),
                body: "This is a test notification from EquiWatch.".to_string(),
                html_body: None,
            },
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use equiwatch_core::{EventNumber, EventStatus};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn target() -> NotificationTarget {
        NotificationTarget {
            numero: EventNumber::new(123456).unwrap(),
            status: EventStatus::Engagement,
            url: "https://www.ffe.com/concours/123456".into(),
            push_token: Some("player-token".into()),
            email: "user@example.com".into(),
        }
    }

    fn content() -> RenderedContent {
        RenderedContent {
            subject: Some("Opened".into()),
            body: "Your event is open".into(),
            html_body: None,
        }
    }

    #[tokio::test]
    async fn successful_send_requires_positive_recipients() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/notifications"))
            .and(header("Authorization", "Key secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"recipients": 1})))
            .mount(&mock_server)
            .await;

        let adapter = PushAdapter::new(mock_server.uri(), "app-1", "secret").unwrap();
        let result = adapter.send(&target(), &content()).await.unwrap();
        assert!(result.success);
    }

    #[tokio::test]
    async fn zero_recipients_is_reported_as_stale_token() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/notifications"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"recipients": 0})))
            .mount(&mock_server)
            .await;

        let adapter = PushAdapter::new(mock_server.uri(), "app-1", "secret").unwrap();
        let result = adapter.send(&target(), &content()).await.unwrap();
        assert!(!result.success);
        assert_eq!(result.detail.as_deref(), Some("token no longer valid"));
    }

    #[tokio::test]
    async fn missing_token_is_rejected_before_any_request() {
        let mut target = target();
        target.push_token = None;
        let adapter = PushAdapter::new("http://localhost", "app-1", "secret").unwrap();
        let err = adapter.send(&target, &content()).await.unwrap_err();
        assert!(matches!(err, NotificationError::InvalidConfig(_)));
    }

    #[tokio::test]
    async fn send_test_surfaces_a_stale_token_the_same_way_as_send() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/notifications"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"recipients": 0})))
            .mount(&mock_server)
            .await;

        let adapter = PushAdapter::new(mock_server.uri(), "app-1", "secret").unwrap();
        let result = adapter.send_test(&target()).await.unwrap();
        assert!(!result.success);
        assert_eq!(result.detail.as_deref(), Some("token no longer valid"));
    }
}
