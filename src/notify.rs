//! Completion notifications.

use crate::config::NotificationConfig;
use crate::error::{sanitize_error_message, Error, Result};
use crate::pipeline::GenerationResult;
use async_trait::async_trait;
use serde::Serialize;
use std::fmt::Write as _;
use std::time::Duration;

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(30);

/// Receives the results of a finished batch.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Delivers the batch results. Failures are reported, never retried.
    async fn notify(&self, results: &[GenerationResult]) -> Result<()>;
}

/// Human-readable summary listing every variant URI per prompt.
pub fn build_message(results: &[GenerationResult]) -> String {
    let mut message = String::from("Image Generation Complete!\n\n");
    for result in results {
        let _ = writeln!(message, "Prompt: {}", result.prompt);
        let _ = writeln!(message, "Generated at: {}", result.timestamp);
        message.push_str("Variants:\n");
        for variant in &result.variants {
            let _ = writeln!(message, "  - {}: {}", variant.name, variant.url);
        }
        message.push('\n');
    }
    message
}

fn print_banner(message: &str) {
    println!("\n{}", "=".repeat(60));
    println!("NOTIFICATION");
    println!("{}", "=".repeat(60));
    println!("{}", message);
}

/// Prints the summary to stdout.
#[derive(Debug, Clone, Default)]
pub struct ConsoleNotifier;

#[async_trait]
impl Notifier for ConsoleNotifier {
    async fn notify(&self, results: &[GenerationResult]) -> Result<()> {
        print_banner(&build_message(results));
        Ok(())
    }
}

/// JSON body posted to the webhook.
#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    brand: Option<&'a str>,
    results: &'a [GenerationResult],
}

/// Prints the summary, then POSTs it with the raw results to a webhook.
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
    brand: Option<String>,
}

impl WebhookNotifier {
    /// Creates a notifier posting to `url` with a bounded request time.
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(WEBHOOK_TIMEOUT)
            .build()
            .map_err(|e| Error::Config(format!("failed to build webhook client: {}", e)))?;
        Ok(Self {
            client,
            url: url.into(),
            brand: None,
        })
    }

    /// Adds the brand name to the payload.
    pub fn with_brand(mut self, brand: Option<String>) -> Self {
        self.brand = brand;
        self
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, results: &[GenerationResult]) -> Result<()> {
        let message = build_message(results);
        print_banner(&message);

        let payload = WebhookPayload {
            message,
            brand: self.brand.as_deref(),
            results,
        };

        let response = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::Notification(e.to_string()))?;

        let status = response.status();
        tracing::info!(status = status.as_u16(), url = %self.url, "webhook notification sent");
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Error::Notification(format!(
                "webhook returned {}: {}",
                status.as_u16(),
                sanitize_error_message(&text)
            )));
        }
        Ok(())
    }
}

/// Builds the configured notifier, or `None` when notifications are off.
pub fn notifier_from_config(
    config: &NotificationConfig,
    brand: Option<String>,
) -> Result<Option<Box<dyn Notifier>>> {
    if !config.enabled {
        return Ok(None);
    }
    let notifier: Box<dyn Notifier> = match config.webhook() {
        Some(url) => Box::new(WebhookNotifier::new(url)?.with_brand(brand)),
        None => Box::new(ConsoleNotifier),
    };
    Ok(Some(notifier))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::VariantResult;
    use crate::image::ImageProviderKind;
    use std::path::PathBuf;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn result(prompt: &str) -> GenerationResult {
        GenerationResult {
            prompt: prompt.to_string(),
            name: "promo".to_string(),
            timestamp: "2024-06-01T12:00:00+00:00".to_string(),
            provider: ImageProviderKind::Placeholder,
            placeholder: true,
            model: None,
            duration_ms: Some(12),
            variants: vec![VariantResult {
                name: "thumb".to_string(),
                size: "400x400".to_string(),
                path: PathBuf::from("/out/thumb/promo_thumb_20240601_120000.jpg"),
                url: "file:///out/thumb/promo_thumb_20240601_120000.jpg".to_string(),
            }],
        }
    }

    /// Accepts one request, answers with `status`, returns the request body.
    async fn one_shot_server(status: u16) -> (String, tokio::task::JoinHandle<String>) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/hook", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 4096];
            loop {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
                let text = String::from_utf8_lossy(&buf);
                if let Some(split) = text.find("\r\n\r\n") {
                    let length = text[..split]
                        .lines()
                        .find_map(|l| {
                            let lower = l.to_ascii_lowercase();
                            lower
                                .strip_prefix("content-length:")
                                .map(|v| v.trim().parse::<usize>().unwrap())
                        })
                        .unwrap_or(0);
                    if buf.len() >= split + 4 + length {
                        break;
                    }
                }
            }

            let reply = format!(
                "HTTP/1.1 {} Status\r\ncontent-length: 2\r\nconnection: close\r\n\r\nok",
                status
            );
            socket.write_all(reply.as_bytes()).await.unwrap();

            let text = String::from_utf8_lossy(&buf).to_string();
            let split = text.find("\r\n\r\n").unwrap();
            text[split + 4..].to_string()
        });

        (url, handle)
    }

    #[test]
    fn test_build_message_lists_variants() {
        let message = build_message(&[result("Summer sale")]);
        assert!(message.starts_with("Image Generation Complete!\n\n"));
        assert!(message.contains("Prompt: Summer sale\n"));
        assert!(message.contains("Generated at: 2024-06-01T12:00:00+00:00\n"));
        assert!(message
            .contains("  - thumb: file:///out/thumb/promo_thumb_20240601_120000.jpg\n"));
    }

    #[test]
    fn test_notifier_from_config() {
        let disabled = NotificationConfig::default();
        assert!(notifier_from_config(&disabled, None).unwrap().is_none());

        let console = NotificationConfig {
            enabled: true,
            webhook_url: Some("  ".into()),
        };
        assert!(notifier_from_config(&console, None).unwrap().is_some());

        let webhook = NotificationConfig {
            enabled: true,
            webhook_url: Some("http://127.0.0.1:9/hook".into()),
        };
        assert!(notifier_from_config(&webhook, Some("TechBrand Inc.".into()))
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_webhook_posts_message_and_results() {
        let (url, server) = one_shot_server(200).await;
        let notifier = WebhookNotifier::new(url)
            .unwrap()
            .with_brand(Some("TechBrand Inc.".into()));

        notifier.notify(&[result("Summer sale")]).await.unwrap();

        let body: serde_json::Value = serde_json::from_str(&server.await.unwrap()).unwrap();
        assert!(body["message"]
            .as_str()
            .unwrap()
            .contains("Prompt: Summer sale"));
        assert_eq!(body["brand"], "TechBrand Inc.");
        assert_eq!(body["results"][0]["prompt"], "Summer sale");
        assert_eq!(body["results"][0]["variants"][0]["size"], "400x400");
    }

    #[tokio::test]
    async fn test_webhook_error_status_is_notification_error() {
        let (url, server) = one_shot_server(500).await;
        let err = WebhookNotifier::new(url)
            .unwrap()
            .notify(&[result("x")])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Notification(ref m) if m.contains("500")));
        assert!(!err.is_fatal());
        server.await.unwrap();
    }
}
