use reqwest::{Client, Response};

use crate::types::{Outcome, ProbeConfig};

/// Targets without a scheme are probed over plain HTTP.
pub fn prefix_scheme(target: &str) -> String {
    if target.starts_with("http://") || target.starts_with("https://") {
        target.to_string()
    } else {
        format!("http://{}", target)
    }
}

/// Issues one GET against `target` and turns the answer into an [`Outcome`].
/// Transport failures (DNS, refused, timeout, TLS) yield `None` and are only
/// logged; the caller treats the target as unreachable and moves on.
pub async fn check_url(client: &Client, config: &ProbeConfig, target: &str) -> Option<Outcome> {
    let url = prefix_scheme(target);

    let response = match client.get(&url).send().await {
        Ok(response) => response,
        Err(err) => {
            if is_certificate_error(&err) {
                tracing::warn!("Invalid certificate for {}", url);
            } else {
                tracing::debug!("Request to {} failed: {}", url, err);
            }
            return None;
        }
    };

    let status = response.status().as_u16();
    let length = if config.include_length {
        measure_length(response).await
    } else {
        None
    };

    Some(Outcome { status, url, length })
}

// Content-Length when the server reports one, otherwise the number of
// characters in the decoded body. A body that cannot be read leaves the
// outcome without a length.
async fn measure_length(response: Response) -> Option<u64> {
    if let Some(len) = response.content_length() {
        if len > 0 {
            return Some(len);
        }
    }
    let body = response.text().await.ok()?;
    Some(body.chars().count() as u64)
}

fn is_certificate_error(err: &reqwest::Error) -> bool {
    let text = err.to_string();
    text.contains("certificate") || text.contains("ssl")
}
