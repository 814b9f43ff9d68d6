use std::time::Duration;

use equiwatch_core::EventNumber;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use reqwest::redirect::Policy;
use reqwest::Client;
use tracing::{debug, warn};

use crate::error::Result;
use crate::extract;
use crate::snapshot::{FetchOutcome, Snapshot};

const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Fetches and parses a single event page.
///
/// Never returns an error to its caller: any network, TLS, or HTTP-status
/// failure is logged and degrades to an empty [`Snapshot`] with
/// `is_open = false`, mirroring the upstream scraper's blanket
/// `try/except` around a default result object (spec §4.2).
#[derive(Debug, Clone)]
pub struct Scraper {
    client: Client,
    event_url_template: String,
}

impl Scraper {
    pub fn new(event_url_template: impl Into<String>, request_timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            ),
        );
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static("fr-FR,fr;q=0.9,en;q=0.8"),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));

        let client = Client::builder()
            .timeout(request_timeout)
            .redirect(Policy::limited(10))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            event_url_template: event_url_template.into(),
        })
    }

    pub async fn fetch(&self, numero: EventNumber) -> FetchOutcome {
        let url = self.event_url_template.replace("{numero}", &numero.to_string());

        let response = match self.client.get(&url).send().await {
            Ok(resp) => resp,
            Err(e) => {
                warn!(numero = %numero, error = %e, "network error fetching event page");
                return FetchOutcome {
                    snapshot: Snapshot::default(),
                    success: false,
                };
            }
        };

        let response = match response.error_for_status() {
            Ok(resp) => resp,
            Err(e) => {
                warn!(numero = %numero, status = ?e.status(), "http error fetching event page");
                return FetchOutcome {
                    snapshot: Snapshot::default(),
                    success: false,
                };
            }
        };

        let html = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                warn!(numero = %numero, error = %e, "error reading event page body");
                return FetchOutcome {
                    snapshot: Snapshot::default(),
                    success: false,
                };
            }
        };

        let snapshot = extract::extract(&html);
        debug!(
            numero = %numero,
            name = ?snapshot.name,
            is_open = snapshot.is_open,
            "scraped event page"
        );
        FetchOutcome {
            snapshot,
            success: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn fetch_extracts_fields_from_live_page() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/concours/123456"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "<title>Fiche Concours - PARIS</title>Grand Prix de Paris Organisé par Club \
                 Ouvert aux engagements 05/06/2026 07/06/2026",
            ))
            .mount(&mock_server)
            .await;

        let scraper = Scraper::new(
            format!("{}/concours/{{numero}}", mock_server.uri()),
            Duration::from_secs(5),
        )
        .unwrap();

        let outcome = scraper.fetch(EventNumber::new(123456).unwrap()).await;
        assert!(outcome.success);
        assert!(outcome.snapshot.is_open);
        assert_eq!(outcome.snapshot.start_date.as_deref(), Some("2026-06-05"));
    }

    #[tokio::test]
    async fn fetch_degrades_to_empty_snapshot_on_http_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/concours/1"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        let scraper = Scraper::new(
            format!("{}/concours/{{numero}}", mock_server.uri()),
            Duration::from_secs(5),
        )
        .unwrap();

        let outcome = scraper.fetch(EventNumber::new(1).unwrap()).await;
        assert!(!outcome.success);
        assert_eq!(outcome.snapshot, Snapshot::default());
    }
}
