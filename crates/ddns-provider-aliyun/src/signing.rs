//! ACS3-HMAC-SHA256 request signing
//!
//! Every Alibaba Cloud OpenAPI call carries an `Authorization` header built
//! from a canonical form of the request:
//!
//! ```text
//! POST
//! /
//! <sorted, RFC 3986 encoded query>
//! <sorted lowercase host and x-acs-* headers, one "name:value\n" each>
//!
//! <signed header names joined with ';'>
//! <hex sha256 of the body>
//! ```
//!
//! The string to sign is `ACS3-HMAC-SHA256\n` followed by the hex SHA-256 of
//! that canonical request, and the signature is its hex HMAC-SHA256 under the
//! access key secret.

use ddns_core::{Error, Result};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

pub(crate) const ALGORITHM: &str = "ACS3-HMAC-SHA256";

/// Format of the `x-acs-date` header
pub(crate) const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Everything that goes into one signature
pub(crate) struct SigningInput<'a> {
    pub access_key_id: &'a str,
    pub access_key_secret: &'a str,
    pub method: &'a str,
    pub host: &'a str,
    pub action: &'a str,
    pub version: &'a str,
    pub params: &'a [(&'a str, String)],
    pub date: &'a str,
    pub nonce: &'a str,
}

/// Output of signing: the query string to send and the headers to attach
#[derive(Debug)]
pub(crate) struct SignedRequest {
    pub query: String,
    pub headers: Vec<(&'static str, String)>,
    pub authorization: String,
}

/// Build the canonical query string
///
/// Keys and values are percent-encoded (everything except `A-Z a-z 0-9 - _ . ~`)
/// and pairs are sorted by encoded key.
pub(crate) fn canonical_query(params: &[(&str, String)]) -> String {
    let mut pairs: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| (urlencoding::encode(k).into_owned(), urlencoding::encode(v).into_owned()))
        .collect();
    pairs.sort();

    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

pub(crate) fn sign(input: &SigningInput<'_>) -> Result<SignedRequest> {
    let query = canonical_query(input.params);
    let body_hash = hex::encode(Sha256::digest(b""));

    // Already sorted by name
    let headers: Vec<(&'static str, String)> = vec![
        ("host", input.host.to_string()),
        ("x-acs-action", input.action.to_string()),
        ("x-acs-content-sha256", body_hash.clone()),
        ("x-acs-date", input.date.to_string()),
        ("x-acs-signature-nonce", input.nonce.to_string()),
        ("x-acs-version", input.version.to_string()),
    ];

    let canonical_headers: String = headers
        .iter()
        .map(|(k, v)| format!("{}:{}\n", k, v.trim()))
        .collect();
    let signed_headers = headers
        .iter()
        .map(|(k, _)| *k)
        .collect::<Vec<_>>()
        .join(";");

    let canonical_request = format!(
        "{}\n/\n{}\n{}\n{}\n{}",
        input.method, query, canonical_headers, signed_headers, body_hash
    );

    let string_to_sign = format!(
        "{}\n{}",
        ALGORITHM,
        hex::encode(Sha256::digest(canonical_request.as_bytes()))
    );

    let mut mac = HmacSha256::new_from_slice(input.access_key_secret.as_bytes())
        .map_err(|e| Error::Other(format!("Failed to initialise HMAC: {}", e)))?;
    mac.update(string_to_sign.as_bytes());
    let signature = hex::encode(mac.finalize().into_bytes());

    let authorization = format!(
        "{} Credential={},SignedHeaders={},Signature={}",
        ALGORITHM, input.access_key_id, signed_headers, signature
    );

    Ok(SignedRequest {
        query,
        headers,
        authorization,
    })
}
