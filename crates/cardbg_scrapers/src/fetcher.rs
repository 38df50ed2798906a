use std::net::{Ipv4Addr, Ipv6Addr};
use std::time::Duration;
use async_trait::async_trait;
use reqwest::{header, redirect, Client, Response};
use cardbg_core::{Error, FetchedBytes, Fetcher, Result};
use url::{Host, Url};

#[derive(Debug, Clone)]
pub struct FetcherConfig {
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub user_agent: String,
    pub max_redirects: usize,
    pub max_html_bytes: usize,
    pub max_image_bytes: usize,
    /// When false, loopback, private and link-local hosts are refused,
    /// including as redirect targets.
    pub allow_private_hosts: bool,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(15),
            connect_timeout: Duration::from_secs(10),
            user_agent: concat!("cardbg/", env!("CARGO_PKG_VERSION")).to_string(),
            max_redirects: 5,
            max_html_bytes: 2 * 1024 * 1024,
            max_image_bytes: 20 * 1024 * 1024,
            allow_private_hosts: true,
        }
    }
}

/// reqwest-backed fetcher. Every request is bounded by the configured
/// timeout and body cap.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    config: FetcherConfig,
}

impl HttpFetcher {
    pub fn new(config: FetcherConfig) -> Result<Self> {
        let max_redirects = config.max_redirects;
        let allow_private_hosts = config.allow_private_hosts;
        let policy = redirect::Policy::custom(move |attempt| {
            if attempt.previous().len() > max_redirects {
                attempt.error("too many redirects")
            } else if !allow_private_hosts && !is_public_host(attempt.url()) {
                attempt.error("redirect to a private address")
            } else {
                attempt.follow()
            }
        });
        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent.clone())
            .redirect(policy)
            .build()
            .map_err(|e| Error::External(e.into()))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &FetcherConfig {
        &self.config
    }

    async fn get(&self, url: &Url) -> Result<Response> {
        if !self.config.allow_private_hosts && !is_public_host(url) {
            return Err(Error::network(
                None,
                format!("refusing to fetch private address {}", url.host_str().unwrap_or_default()),
            ));
        }
        tracing::debug!("🌐 GET {}", url);
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(network_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::network(
                Some(status.as_u16()),
                format!("{} returned {}", url, status),
            ));
        }
        Ok(response)
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch_html(&self, url: &Url) -> Result<String> {
        let response = self.get(url).await?;
        let body = read_capped(response, self.config.max_html_bytes).await?;
        tracing::debug!("📄 Fetched {} bytes from {}", body.len(), url);
        Ok(String::from_utf8_lossy(&body).into_owned())
    }

    async fn fetch_bytes(&self, url: &Url) -> Result<FetchedBytes> {
        let response = self.get(url).await?;
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_string())
            .filter(|v| !v.is_empty());
        let bytes = read_capped(response, self.config.max_image_bytes).await?;
        Ok(FetchedBytes { content_type, bytes })
    }
}

async fn read_capped(mut response: Response, limit: usize) -> Result<Vec<u8>> {
    if let Some(length) = response.content_length() {
        if length > limit as u64 {
            return Err(too_large(limit));
        }
    }

    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await.map_err(network_error)? {
        if body.len() + chunk.len() > limit {
            return Err(too_large(limit));
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

/// Defaults a missing scheme to `https://` and accepts only absolute
/// http(s) URLs with a host.
pub fn normalize_url(input: &str) -> Result<Url> {
    let input = input.trim();
    if input.is_empty() {
        return Err(Error::Validation("website URL is empty".to_string()));
    }

    let candidate = if input.contains("://") {
        input.to_string()
    } else {
        format!("https://{}", input)
    };
    let url = Url::parse(&candidate)
        .map_err(|e| Error::Validation(format!("invalid website URL {:?}: {}", input, e)))?;

    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(Error::Validation(format!("unsupported URL scheme: {}", other)));
        }
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(Error::Validation(format!("website URL has no host: {:?}", input)));
    }
    Ok(url)
}

/// False for localhost, loopback, private, link-local and unspecified
/// addresses. Names are not resolved, so a public name pointing at a
/// private address still passes.
pub fn is_public_host(url: &Url) -> bool {
    match url.host() {
        Some(Host::Domain(domain)) => {
            let domain = domain.trim_end_matches('.').to_ascii_lowercase();
            domain != "localhost" && !domain.ends_with(".localhost")
        }
        Some(Host::Ipv4(ip)) => is_public_ipv4(ip),
        Some(Host::Ipv6(ip)) => match ip.to_ipv4_mapped() {
            Some(v4) => is_public_ipv4(v4),
            None => is_public_ipv6(ip),
        },
        None => false,
    }
}

fn is_public_ipv4(ip: Ipv4Addr) -> bool {
    let [a, b, ..] = ip.octets();
    // 100.64.0.0/10 is carrier-grade NAT
    let shared = a == 100 && (b & 0xc0) == 64;
    !(ip.is_loopback()
        || ip.is_private()
        || ip.is_link_local()
        || ip.is_unspecified()
        || ip.is_broadcast()
        || shared)
}

fn is_public_ipv6(ip: Ipv6Addr) -> bool {
    let first = ip.segments()[0];
    let unique_local = (first & 0xfe00) == 0xfc00;
    let link_local = (first & 0xffc0) == 0xfe80;
    !(ip.is_loopback() || ip.is_unspecified() || unique_local || link_local)
}

fn too_large(limit: usize) -> Error {
    Error::network(None, format!("response body exceeds {} bytes", limit))
}

fn network_error(err: reqwest::Error) -> Error {
    let status = err.status().map(|s| s.as_u16());
    if err.is_timeout() {
        Error::network(status, format!("request timed out: {}", err))
    } else {
        Error::network(status, err.to_string())
    }
}
