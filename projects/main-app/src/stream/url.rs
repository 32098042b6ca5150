use reqwest::Url;

use crate::core::errors::StreamError;

/// Turns what a user typed into a stream URL: a missing scheme means `http`,
/// and a bare host points at `default_path`.
pub fn normalize_stream_url(input: &str, default_path: &str) -> Result<Url, StreamError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(StreamError::InvalidInput("URL is empty".to_owned()));
    }

    let candidate = if input.contains("://") {
        input.to_owned()
    } else {
        format!("http://{input}")
    };

    let mut url = Url::parse(&candidate)
        .map_err(|err| StreamError::InvalidInput(format!("{input}: {err}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(StreamError::InvalidInput(format!(
            "unsupported scheme: {}",
            url.scheme()
        )));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(StreamError::InvalidInput(format!("{input}: missing host")));
    }

    if url.path().is_empty() || url.path() == "/" {
        url.set_path(default_path);
    }

    Ok(url)
}

/// Text messages go to `/message` on the same host, one port below the stream
/// when the stream URL names a port.
pub fn message_endpoint(stream_url: &Url) -> Url {
    let mut url = stream_url.clone();
    if let Some(port) = url.port().filter(|port| *port > 1) {
        // set_port only fails for cannot-be-a-base URLs, which http(s) never are.
        let _ = url.set_port(Some(port - 1));
    }
    url.set_path("/message");
    url.set_query(None);
    url.set_fragment(None);
    url
}
