//! Backing for the out-of-scope admin `/test-push`-style endpoint (spec
//! §6/§7): exercises a channel adapter against a single recipient and
//! turns the result into a human-readable `{success, message}` payload,
//! independent of the queue/dispatch path.

use serde::Serialize;

use crate::adapters::NotificationAdapter;
use crate::types::NotificationTarget;

/// The `{success, message}` payload spec §7 describes for user-visible
/// admin/test endpoints — never a crash, always a readable detail.
#[derive(Debug, Clone, Serialize)]
pub struct AdminTestOutcome {
    pub success: bool,
    pub message: String,
}

/// Sends one test notification through `adapter` and reports the outcome
/// in the shape an admin endpoint would render to the caller, so a stale
/// push token or a provider error surfaces as readable text instead of a
/// crash (spec §7: "Token invalid / recipient gone").
pub async fn send_test_notification(
    adapter: &dyn NotificationAdapter,
    target: &NotificationTarget,
) -> AdminTestOutcome {
    match adapter.send_test(target).await {
        Ok(result) if result.success => AdminTestOutcome {
            success: true,
            message: "test notification delivered".to_string(),
        },
        Ok(result) => AdminTestOutcome {
            success: false,
            message: result
                .detail
                .unwrap_or_else(|| "delivery failed".to_string()),
        },
        Err(err) => AdminTestOutcome {
            success: false,
            message: err.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use equiwatch_core::{EventNumber, EventStatus};
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn target() -> NotificationTarget {
        NotificationTarget {
            numero: EventNumber::new(1).unwrap(),
            status: EventStatus::Engagement,
            url: "https://www.ffe.com/concours/1".into(),
            push_token: Some("stale-token".into()),
            email: "user@example.com".into(),
        }
    }

    #[tokio::test]
    async fn stale_token_surfaces_as_a_readable_message() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"recipients": 0})))
            .mount(&mock_server)
            .await;

        let adapter = crate::adapters::PushAdapter::new(mock_server.uri(), "app-1", "secret").unwrap();
        let outcome = send_test_notification(&adapter, &target()).await;
        assert!(!outcome.success);
        assert_eq!(outcome.message, "token no longer valid");
    }
}
