// # HTTP IP Source
//
// This crate provides the public IP detector for the DDNS system.
//
// ## Architecture
//
// A fixed, ordered list of public "what is my IP" echo services is queried
// one at a time. The first service that answers with a plausible address
// wins and the rest are never contacted. A service that times out, returns
// a non-2xx status, an empty body, malformed JSON or an address of the wrong
// family is logged and skipped.
//
// ```text
// ipify ──fail──▶ jsonip ──fail──▶ myip ──ok──▶ 203.0.113.7
//                                     (ipinfo, seeip never queried)
// ```
//
// If every service fails the source reports
// `Error::AllServicesUnavailable` and the caller must not touch DNS.

use ddns_core::traits::{IpSource, IpVersion};
use ddns_core::{Error, Result};

use std::net::IpAddr;
use std::time::Duration;

use tracing::{debug, info, warn};

/// Default per-service request timeout
const DEFAULT_TIMEOUT_SECS: u64 = 5;

/// Default IP echo services, in the order they are tried
pub const DEFAULT_IP_SERVICES: &[(&str, ResponseFormat)] = &[
    ("https://api.ipify.org", ResponseFormat::PlainText),
    ("https://jsonip.com", ResponseFormat::JsonField("ip")),
    ("https://api.myip.com", ResponseFormat::JsonField("ip")),
    ("https://ipinfo.io/ip", ResponseFormat::PlainText),
    ("https://ip.seeip.org", ResponseFormat::PlainText),
];

/// How an echo service encodes the address in its response body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    /// The whole body is the address
    PlainText,
    /// A JSON object with the address in this string field
    JsonField(&'static str),
}

/// One echo service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpService {
    pub url: String,
    pub format: ResponseFormat,
}

impl IpService {
    pub fn new(url: impl Into<String>, format: ResponseFormat) -> Self {
        Self {
            url: url.into(),
            format,
        }
    }

    /// The built-in service list
    pub fn defaults() -> Vec<IpService> {
        DEFAULT_IP_SERVICES
            .iter()
            .map(|(url, format)| IpService::new(*url, *format))
            .collect()
    }
}

/// Result of querying a single service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Success(IpAddr),
    Failure(String),
}

/// Public IP detector backed by a cascade of HTTP echo services
pub struct HttpIpSource {
    /// Services in priority order
    services: Vec<IpService>,

    /// Address family to accept (None = any)
    version: Option<IpVersion>,

    /// Per-service timeout
    timeout: Duration,

    /// HTTP client
    client: reqwest::Client,
}

impl HttpIpSource {
    /// Create a detector over the default services
    ///
    /// # Parameters
    ///
    /// - `version`: Address family to accept (None = both)
    pub fn new(version: Option<IpVersion>) -> Self {
        Self {
            services: IpService::defaults(),
            version,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            client: reqwest::Client::builder()
                .user_agent(concat!("ddnsd/", env!("CARGO_PKG_VERSION")))
                .build()
                .unwrap_or_default(),
        }
    }

    /// Replace the service list
    pub fn with_services(mut self, services: Vec<IpService>) -> Self {
        self.services = services;
        self
    }

    /// Replace the per-service timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Services in the order they will be tried
    pub fn services(&self) -> &[IpService] {
        &self.services
    }

    /// Query one service
    pub async fn probe(&self, service: &IpService) -> ProbeOutcome {
        let response = match self
            .client
            .get(&service.url)
            .timeout(self.timeout)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                return ProbeOutcome::Failure(format!("timed out after {:?}", self.timeout));
            }
            Err(e) => return ProbeOutcome::Failure(format!("request failed: {}", e)),
        };

        let status = response.status();
        if !status.is_success() {
            return ProbeOutcome::Failure(format!("HTTP error: {}", status));
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return ProbeOutcome::Failure(format!("failed to read response: {}", e)),
        };

        match extract_ip(&body, service.format) {
            Ok(ip) => match self.version {
                Some(version) if !version.matches(&ip) => {
                    ProbeOutcome::Failure(format!("expected {:?} address, got {}", version, ip))
                }
                _ => ProbeOutcome::Success(ip),
            },
            Err(reason) => ProbeOutcome::Failure(reason),
        }
    }
}

#[async_trait::async_trait]
impl IpSource for HttpIpSource {
    async fn current(&self) -> Result<IpAddr> {
        for service in &self.services {
            debug!("Querying IP service {}", service.url);

            match self.probe(service).await {
                ProbeOutcome::Success(ip) => {
                    info!("Got IP {} from {}", ip, service.url);
                    return Ok(ip);
                }
                ProbeOutcome::Failure(reason) => {
                    warn!("IP service {} failed: {}", service.url, reason);
                }
            }
        }

        Err(Error::AllServicesUnavailable {
            attempted: self.services.len(),
        })
    }

    fn version(&self) -> Option<IpVersion> {
        self.version
    }
}

/// Pull the address out of a response body
fn extract_ip(body: &str, format: ResponseFormat) -> std::result::Result<IpAddr, String> {
    let text = match format {
        ResponseFormat::PlainText => body.trim().to_string(),
        ResponseFormat::JsonField(field) => {
            let value: serde_json::Value =
                serde_json::from_str(body).map_err(|e| format!("invalid JSON: {}", e))?;
            value
                .get(field)
                .and_then(|v| v.as_str())
                .map(|s| s.trim().to_string())
                .ok_or_else(|| format!("missing string field '{}'", field))?
        }
    };

    if text.is_empty() {
        return Err("empty response".to_string());
    }

    text.parse()
        .map_err(|_| format!("invalid IP address: {}", text))
}
