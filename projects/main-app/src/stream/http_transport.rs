use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures_util::{StreamExt, TryStreamExt};
use reqwest::{
    Client, Url,
    header::{ACCEPT, CONTENT_TYPE},
    redirect,
};

use super::traits::{StreamResponse, Transport};

const MAX_REDIRECTS: usize = 10;

#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(user_agent: &str, connect_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .connect_timeout(connect_timeout)
            .redirect(no_less_safe_redirects())
            .build()
            .context("failed to build http client")?;

        Ok(Self { client })
    }
}

/// Follows redirects but never from https down to plain http.
fn no_less_safe_redirects() -> redirect::Policy {
    redirect::Policy::custom(|attempt| {
        if attempt.previous().len() >= MAX_REDIRECTS {
            return attempt.error("too many redirects");
        }
        let downgrade = attempt
            .previous()
            .last()
            .is_some_and(|prev| prev.scheme() == "https" && attempt.url().scheme() == "http");
        if downgrade {
            attempt.stop()
        } else {
            attempt.follow()
        }
    })
}

#[async_trait]
impl Transport for HttpTransport {
    async fn open(&self, url: &Url) -> Result<StreamResponse> {
        let response = self
            .client
            .get(url.clone())
            .header(ACCEPT, "multipart/x-mixed-replace")
            .send()
            .await
            .with_context(|| format!("failed to connect to {url}"))?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("server replied {status}");
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);

        let chunks = response
            .bytes_stream()
            .map_err(|err| anyhow::Error::new(err).context("stream read failed"))
            .boxed();

        Ok(StreamResponse {
            content_type,
            chunks,
        })
    }
}
