use std::time::Duration;

use reqwest::header::{HeaderMap, COOKIE};
use reqwest::{redirect, Client};
use thiserror::Error;

use crate::types::ProbeConfig;

const MAX_REDIRECT_HOPS: usize = 10;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("Invalid worker count: {0}")]
    InvalidWorkers(usize),
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(#[from] reqwest::Error),
    #[error("Invalid cookie value: {0}")]
    InvalidCookie(#[from] reqwest::header::InvalidHeaderValue),
}

pub fn build_client(config: &ProbeConfig) -> Result<Client, ProbeError> {
    // Policy::none() surfaces 3xx answers as terminal responses instead of
    // chasing Location, which is what makes redirects reportable outcomes.
    let redirect_policy = if config.follow_redirects {
        redirect::Policy::limited(MAX_REDIRECT_HOPS)
    } else {
        redirect::Policy::none()
    };

    let mut builder = Client::builder()
        .timeout(config.timeout)
        .pool_max_idle_per_host(100)
        .pool_idle_timeout(Duration::from_secs(90))
        .tcp_keepalive(Duration::from_secs(60))
        .tcp_nodelay(true)
        .use_rustls_tls()
        .redirect(redirect_policy)
        .danger_accept_invalid_certs(config.insecure_ssl);

    if let Some(agent) = &config.user_agent {
        builder = builder.user_agent(agent.clone());
    }

    if let Some(cookie) = &config.cookie {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, cookie.parse()?);
        builder = builder.default_headers(headers);
    }

    Ok(builder.build()?)
}
