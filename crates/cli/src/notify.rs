// Priority-receipt webhook alerts

use std::thread;
use std::time::Duration;

use packdock_core::{AlertSink, Package};

/// Posts priority-arrival alerts to a Discord or Slack incoming webhook.
/// The payload carries both `content` (Discord) and `text` (Slack) so one
/// URL works for either.
pub struct WebhookSink {
    url: String,
    client: reqwest::blocking::Client,
}

impl WebhookSink {
    pub fn new(url: String) -> Result<Self, String> {
        if !url.starts_with("http") {
            return Err(format!("webhook URL must be http(s), got {url:?}"));
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(5))
            .user_agent("packdock")
            .build()
            .map_err(|e| e.to_string())?;
        Ok(Self { url, client })
    }

    fn message(package: &Package, quantity: u32, actor: Option<&str>) -> String {
        format!(
            "Priority item received!\nItem: {}\nQty: {}\nTracking: {}\nUser: {}",
            package.item_name,
            quantity,
            package.tracking_number,
            actor.unwrap_or("unknown"),
        )
    }
}

impl AlertSink for WebhookSink {
    /// Fire-and-forget: the scan must never wait on, or fail because of,
    /// a chat service.
    fn priority_alert(&self, package: &Package, quantity: u32, actor: Option<&str>) {
        let msg = Self::message(package, quantity, actor);
        let body = serde_json::json!({ "content": msg, "text": msg });
        let url = self.url.clone();
        let client = self.client.clone();
        let tracking = package.tracking_number.clone();
        thread::spawn(move || match client.post(&url).json(&body).send() {
            Ok(resp) if resp.status().is_success() => {
                log::info!("webhook alert sent for {tracking}");
            }
            Ok(resp) => log::error!("webhook alert for {tracking} got {}", resp.status()),
            Err(e) => log::error!("webhook alert for {tracking} failed: {e}"),
        });
    }
}
