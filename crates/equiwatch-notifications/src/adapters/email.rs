//! Email-channel adapter.
//!
//! Contract from spec §4.4/§6: `POST {base_url}/emails` with
//! `Authorization: Bearer {API_KEY}` and body
//! `{from, to:[email], subject, html, text?}`. Success is any 2xx
//! response — unlike the push channel there is no recipients-count
//! field to gate on.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

use super::NotificationAdapter;
use crate::error::{NotificationError, Result};
use crate::types::{NotificationTarget, RenderedContent, SendResult};

/// Hard cap on a single provider call (spec §4.4/§5: "10-15 s").
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

pub struct EmailAdapter {
    http_client: Client,
    endpoint: String,
    api_key: String,
    from_address: String,
}

impl EmailAdapter {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        from_address: impl Into<String>,
    ) -> Result<Self> {
        let http_client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http_client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            from_address: from_address.into(),
        })
    }
}

#[async_trait]
impl NotificationAdapter for EmailAdapter {
    async fn send(
        &self,
        target: &NotificationTarget,
        content: &RenderedContent,
    ) -> Result<SendResult> {
        let subject = content
            .subject
            .clone()
            .ok_or_else(|| NotificationError::InvalidConfig("missing email subject".into()))?;

        let mut body = json!({
            "from": self.from_address,
            "to": [target.email],
            "subject": subject,
            "html": content.html_body.clone().unwrap_or_else(|| content.body.clone()),
        });
        body["text"] = json!(content.body);

        let response = self
            .http_client
            .post(format!("{}/emails", self.endpoint))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| NotificationError::SendFailed(e.to_string()))?;

        if response.status().is_success() {
            Ok(SendResult::ok())
        } else {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            Ok(SendResult::failed(format!("http {status}: {text}")))
        }
    }

    async fn send_test(&self, target: &NotificationTarget) -> Result<SendResult> {
        self.send(
            target,
            &RenderedContent {
                subject: Some("EquiWatch test notification".to_string()),
                body: "This is a test notification from EquiWatch.".to_string(),
                html_body: Some("<p>This is a test notification from EquiWatch.</p>".to_string()),
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
            push_token: None,
            email: "user@example.com".into(),
        }
    }

    fn content() -> RenderedContent {
        RenderedContent {
            subject: Some("Your event is open".into()),
            body: "text body".into(),
            html_body: Some("<p>html body</p>".into()),
        }
    }

    #[tokio::test]
    async fn successful_send_returns_ok() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/emails"))
            .and(header("Authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&mock_server)
            .await;

        let adapter = EmailAdapter::new(mock_server.uri(), "secret", "notifications@equiwatch.dev").unwrap();
        let result = adapter.send(&target(), &content()).await.unwrap();
        assert!(result.success);
    }

    #[tokio::test]
    async fn server_error_is_reported_as_failure() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/emails"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock_server)
            .await;

        let adapter = EmailAdapter::new(mock_server.uri(), "secret", "notifications@equiwatch.dev").unwrap();
        let result = adapter.send(&target(), &content()).await.unwrap();
        assert!(!result.success);
    }

    #[tokio::test]
    async fn missing_subject_is_rejected_before_any_request() {
        let mut content = content();
        content.subject = None;
        let adapter = EmailAdapter::new("http://localhost", "secret", "notifications@equiwatch.dev").unwrap();
        let err = adapter.send(&target(), &content).await.unwrap_err();
        assert!(matches!(err, NotificationError::InvalidConfig(_)));
    }

    #[tokio::test]
    async fn send_test_delivers_a_standalone_message() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/emails"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&mock_server)
            .await;

        let adapter = EmailAdapter::new(mock_server.uri(), "secret", "notifications@equiwatch.dev").unwrap();
        let result = adapter.send_test(&target()).await.unwrap();
        assert!(result.success);
    }
}
