// src/services/notifier.rs

//! Change report delivery.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use crate::error::{AppError, Result};

/// Delivers a report to an external channel.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, text: &str) -> Result<()>;
}

/// Body accepted by Slack-style incoming webhooks.
#[derive(Debug, Serialize)]
struct WebhookMessage<'a> {
    text: &'a str,
}

/// Posts reports to an incoming-webhook URL.
pub struct WebhookNotifier {
    client: Client,
    webhook_url: String,
}

impl WebhookNotifier {
    pub fn new(client: Client, webhook_url: impl Into<String>) -> Self {
        Self {
            client,
            webhook_url: webhook_url.into(),
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, text: &str) -> Result<()> {
        let response = self
            .client
            .post(&self.webhook_url)
            .header(
                reqwest::header::CONTENT_TYPE,
                "application/json; charset=utf-8",
            )
            .body(serde_json::to_vec(&WebhookMessage { text })?)
            .send()
            .await
            .map_err(|e| AppError::notify(format!("webhook request failed: {e}")))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        log::debug!("Webhook responded {}: {}", status, body);

        if !status.is_success() {
            return Err(AppError::notify(format!(
                "webhook returned {}: {}",
                status,
                body.trim()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Read;
    use std::thread;

    use tiny_http::{Response, Server};

    use super::*;

    /// Serve one request with `status`, returning the received body.
    fn one_shot(status: u16) -> (String, thread::JoinHandle<(String, String)>) {
        let server = Server::http("127.0.0.1:0").unwrap();
        let addr = server.server_addr().to_ip().unwrap();
        let handle = thread::spawn(move || {
            let mut request = server.recv().unwrap();
            let content_type = request
                .headers()
                .iter()
                .find(|h| h.field.equiv("Content-Type"))
                .map(|h| h.value.to_string())
                .unwrap_or_default();
            let mut body = String::new();
            request.as_reader().read_to_string(&mut body).unwrap();
            let _ = request.respond(Response::from_string("ok").with_status_code(status));
            (content_type, body)
        });
        (format!("http://{addr}/hook"), handle)
    }

    #[tokio::test]
    async fn test_posts_text_payload() {
        let (url, handle) = one_shot(200);
        let notifier = WebhookNotifier::new(Client::new(), url);

        notifier.notify("🚨 header\n- POST /users").await.unwrap();

        let (content_type, body) = handle.join().unwrap();
        assert_eq!(content_type, "application/json; charset=utf-8");
        let payload: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(payload, serde_json::json!({ "text": "🚨 header\n- POST /users" }));
    }

    #[tokio::test]
    async fn test_non_success_status_is_notify_error() {
        let (url, handle) = one_shot(500);
        let notifier = WebhookNotifier::new(Client::new(), url);

        let err = notifier.notify("text").await.unwrap_err();
        assert!(matches!(err, AppError::Notify(_)));
        assert!(!err.is_fatal());
        handle.join().unwrap();
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_notify_error() {
        // Bind then drop to obtain a port nothing listens on
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let notifier = WebhookNotifier::new(Client::new(), format!("http://127.0.0.1:{port}/"));
        let err = notifier.notify("text").await.unwrap_err();
        assert!(matches!(err, AppError::Notify(_)));
    }
}
