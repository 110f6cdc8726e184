// # Alibaba Cloud DNS Provider
//
// This crate provides the Alibaba Cloud DNS (AliDNS) provider implementation
// for the DDNS system.
//
// ## Scope
//
// - Looks up a single record by label and type (`DescribeDomainRecords`)
// - Overwrites a record's value and TTL by record ID (`UpdateDomainRecord`)
// - Signs every call with ACS3-HMAC-SHA256
// - Dry-run mode for safe testing
// - No retry, backoff or caching: each call is one HTTP request and every
//   failure is returned to the engine
//
// ## Security Requirements
//
// - The access key secret NEVER appears in logs or Debug output
// - Empty credentials are rejected at construction time
//
// ## API Reference
//
// - OpenAPI version `2015-01-09`, RPC style: `POST /?<params>` with the
//   action and version in `x-acs-*` headers
// - Errors come back as `{"Code": "...", "Message": "..."}`

mod signing;

use async_trait::async_trait;
use chrono::Utc;
use ddns_core::traits::{DnsProvider, RemoteRecord};
use ddns_core::{Error, Result};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default API endpoint host
pub const DEFAULT_ENDPOINT: &str = "alidns.cn-shanghai.aliyuncs.com";

/// OpenAPI version of the DNS service
const API_VERSION: &str = "2015-01-09";

/// Provider name used in errors and logs
const PROVIDER_NAME: &str = "aliyun";

/// Records requested per lookup
const PAGE_SIZE: &str = "500";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Error codes that mean the credentials were rejected
fn is_auth_code(code: &str) -> bool {
    code.starts_with("InvalidAccessKeyId")
        || code == "InvalidAccessKeySecret"
        || code == "SignatureDoesNotMatch"
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ApiError {
    code: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeDomainRecordsResponse {
    #[serde(default)]
    domain_records: DomainRecords,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DomainRecords {
    #[serde(default)]
    record: Vec<ApiRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ApiRecord {
    record_id: String,
    #[serde(rename = "RR")]
    rr: String,
    #[serde(rename = "Type")]
    record_type: String,
    value: String,
    #[serde(rename = "TTL", default)]
    ttl: u32,
}

impl From<ApiRecord> for RemoteRecord {
    fn from(record: ApiRecord) -> Self {
        RemoteRecord {
            record_id: record.record_id,
            rr: record.rr,
            record_type: record.record_type,
            value: record.value,
            ttl: record.ttl,
        }
    }
}

/// Alibaba Cloud DNS provider
///
/// # Dry-Run Mode
///
/// When `dry_run` is true, the provider will:
/// - Perform record lookups as usual
/// - Log the intended update
/// - **NOT** call `UpdateDomainRecord`, and return `Ok`
///
/// `is_dry_run()` tells the engine the update was not applied.
pub struct AliyunProvider {
    /// Access key ID
    access_key_id: String,

    /// Access key secret
    /// ⚠️ NEVER log this value
    access_key_secret: String,

    /// Base URL requests are sent to
    base_url: reqwest::Url,

    /// `host[:port]` as signed
    host: String,

    /// HTTP client for API requests
    client: reqwest::Client,

    /// Dry-run mode: if true, perform lookups but skip updates
    dry_run: bool,
}

// Custom Debug implementation that hides the access key secret
impl std::fmt::Debug for AliyunProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AliyunProvider")
            .field("access_key_id", &self.access_key_id)
            .field("access_key_secret", &"<REDACTED>")
            .field("endpoint", &self.base_url.as_str())
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl AliyunProvider {
    /// Create a new Alibaba Cloud DNS provider
    ///
    /// # Parameters
    ///
    /// - `access_key_id` / `access_key_secret`: RAM credentials with DNS access
    /// - `endpoint`: API host (e.g. `alidns.cn-shanghai.aliyuncs.com`), or a
    ///   full base URL such as `http://127.0.0.1:8080`
    /// - `dry_run`: If true, perform lookups but skip updates
    pub fn new(
        access_key_id: impl Into<String>,
        access_key_secret: impl Into<String>,
        endpoint: &str,
        dry_run: bool,
    ) -> Result<Self> {
        let access_key_id = access_key_id.into();
        let access_key_secret = access_key_secret.into();

        if access_key_id.is_empty() || access_key_secret.is_empty() {
            return Err(Error::config("Alibaba Cloud access key ID and secret are required"));
        }

        let base_url = parse_endpoint(endpoint)?;
        let host = match (base_url.host_str(), base_url.port()) {
            (Some(host), Some(port)) => format!("{}:{}", host, port),
            (Some(host), None) => host.to_string(),
            (None, _) => return Err(Error::config(format!("Invalid API endpoint: {}", endpoint))),
        };

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            access_key_id,
            access_key_secret,
            base_url,
            host,
            client,
            dry_run,
        })
    }

    /// Sign and send one API call, returning status and body
    async fn call(&self, action: &str, params: &[(&str, String)]) -> Result<(u16, String)> {
        let date = Utc::now().format(signing::DATE_FORMAT).to_string();
        let nonce = uuid::Uuid::new_v4().simple().to_string();

        let signed = signing::sign(&signing::SigningInput {
            access_key_id: &self.access_key_id,
            access_key_secret: &self.access_key_secret,
            method: "POST",
            host: &self.host,
            action,
            version: API_VERSION,
            params,
            date: &date,
            nonce: &nonce,
        })?;

        let url = format!("{}?{}", self.base_url, signed.query);

        let mut request = self
            .client
            .post(&url)
            .header("Authorization", &signed.authorization);
        for (name, value) in &signed.headers {
            // reqwest derives Host from the URL
            if *name != "host" {
                request = request.header(*name, value);
            }
        }

        debug!("Calling {} ({})", action, self.host);

        let response = request
            .send()
            .await
            .map_err(|e| Error::http(format!("{} request failed: {}", action, e)))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| Error::http(format!("Failed to read {} response: {}", action, e)))?;

        Ok((status, body))
    }
}

#[async_trait]
impl DnsProvider for AliyunProvider {
    /// Find the record whose label and type match exactly
    ///
    /// `DescribeDomainRecords` filters by keyword, which is a fuzzy match, so
    /// the result is narrowed down here.
    async fn find_record(
        &self,
        domain: &str,
        rr: &str,
        record_type: &str,
    ) -> Result<Option<RemoteRecord>> {
        debug!("Looking up record: {}.{} (type: {})", rr, domain, record_type);

        let params = [
            ("DomainName", domain.to_string()),
            ("RRKeyWord", rr.to_string()),
            ("TypeKeyWord", record_type.to_string()),
            ("PageSize", PAGE_SIZE.to_string()),
        ];

        let (status, body) = self.call("DescribeDomainRecords", &params).await?;

        if !(200..300).contains(&status) {
            return Err(api_error(status, &body));
        }

        let response: DescribeDomainRecordsResponse = match serde_json::from_str(&body) {
            Ok(response) => response,
            Err(e) => {
                return Err(Error::provider(
                    PROVIDER_NAME,
                    status,
                    "InvalidResponse",
                    format!("Failed to parse DescribeDomainRecords response: {}", e),
                ));
            }
        };

        let record = response
            .domain_records
            .record
            .into_iter()
            .find(|r| r.rr == rr && r.record_type == record_type);

        match record {
            Some(record) => {
                debug!("Found record ID: {}", record.record_id);
                Ok(Some(record.into()))
            }
            // A success status can still carry an error body
            None if has_error_code(&body) => Err(api_error(status, &body)),
            None => Ok(None),
        }
    }

    async fn update_record(
        &self,
        record_id: &str,
        rr: &str,
        record_type: &str,
        value: &str,
        ttl: u32,
    ) -> Result<()> {
        info!(
            "Updating AliDNS record {}: {} ({}) -> {} ttl={} [mode: {}]",
            record_id,
            rr,
            record_type,
            value,
            ttl,
            if self.dry_run { "DRY-RUN" } else { "LIVE" }
        );

        if self.dry_run {
            info!(
                "[DRY-RUN] Would call UpdateDomainRecord with RecordId={}, RR={}, Type={}, Value={}, TTL={}",
                record_id, rr, record_type, value, ttl
            );
            return Ok(());
        }

        let params = [
            ("RecordId", record_id.to_string()),
            ("RR", rr.to_string()),
            ("Type", record_type.to_string()),
            ("Value", value.to_string()),
            ("TTL", ttl.to_string()),
        ];

        let (status, body) = self.call("UpdateDomainRecord", &params).await?;

        if status != 200 {
            let err = api_error(status, &body);
            warn!("UpdateDomainRecord rejected: {}", err);
            return Err(err);
        }

        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER_NAME
    }

    fn is_dry_run(&self) -> bool {
        self.dry_run
    }
}

fn parse_endpoint(endpoint: &str) -> Result<reqwest::Url> {
    let raw = if endpoint.contains("://") {
        endpoint.to_string()
    } else {
        format!("https://{}", endpoint)
    };

    reqwest::Url::parse(&raw)
        .map_err(|e| Error::config(format!("Invalid API endpoint '{}': {}", endpoint, e)))
}

fn has_error_code(body: &str) -> bool {
    serde_json::from_str::<ApiError>(body)
        .map(|e| e.code.is_some())
        .unwrap_or(false)
}

/// Map an error response to the right error kind
fn api_error(status: u16, body: &str) -> Error {
    let parsed = serde_json::from_str::<ApiError>(body).ok();
    let code = parsed
        .as_ref()
        .and_then(|e| e.code.clone())
        .unwrap_or_else(|| "Unknown".to_string());
    let message = parsed
        .and_then(|e| e.message)
        .unwrap_or_else(|| body.trim().to_string());

    if is_auth_code(&code) {
        Error::auth(format!("{}: {}", code, message))
    } else {
        Error::provider(PROVIDER_NAME, status, code, message)
    }
}
