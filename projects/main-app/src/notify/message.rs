use std::time::Duration;

use anyhow::{Context, Result, bail};
use reqwest::{Client, Url, header::CONTENT_TYPE};

use crate::stream::url::message_endpoint;

/// Fire-and-forget text sender for cameras that accept a `/message` POST next
/// to their stream. Nothing is retried.
#[derive(Clone)]
pub struct MessageSender {
    client: Client,
}

impl MessageSender {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .context("failed to build message client")?;
        Ok(Self { client })
    }

    pub async fn send_text(&self, stream_url: &Url, text: &str) -> Result<Url> {
        let endpoint = message_endpoint(stream_url);
        let response = self
            .client
            .post(endpoint.clone())
            .header(CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(text.to_owned())
            .send()
            .await
            .with_context(|| format!("failed to send message to {endpoint}"))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("message endpoint error status={status} body={body}");
        }

        Ok(endpoint)
    }
}
