//! AliDNS client against a local mock of the OpenAPI endpoint

use ddns_core::traits::{DnsProvider, IpSource};
use ddns_core::{DdnsEngine, Decision, Error, MemoryStateStore, RecordTarget};
use std::net::IpAddr;
use ddns_provider_aliyun::AliyunProvider;
use serde_json::json;
use wiremock::matchers::{header, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn provider(server: &MockServer, dry_run: bool) -> AliyunProvider {
    AliyunProvider::new("LTAItest", "test-secret", &server.uri(), dry_run).unwrap()
}

fn records_body() -> serde_json::Value {
    json!({
        "TotalCount": 3,
        "PageSize": 500,
        "PageNumber": 1,
        "RequestId": "536E9CAD-DB30-4647-AC87-AA5CC38C5382",
        "DomainRecords": {
            "Record": [
                { "RR": "www", "Type": "A", "Value": "9.9.9.9", "RecordId": "111", "TTL": 600 },
                { "RR": "@", "Type": "AAAA", "Value": "2001:db8::1", "RecordId": "222", "TTL": 600 },
                { "RR": "@", "Type": "A", "Value": "1.2.3.4", "RecordId": "333", "TTL": 600 }
            ]
        }
    })
}

#[tokio::test]
async fn find_record_picks_exact_match() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/"))
        .and(header("x-acs-action", "DescribeDomainRecords"))
        .and(header("x-acs-version", "2015-01-09"))
        .and(header_exists("x-acs-signature-nonce"))
        .and(header_exists("authorization"))
        .and(query_param("DomainName", "example.com"))
        .and(query_param("RRKeyWord", "@"))
        .and(query_param("TypeKeyWord", "A"))
        .and(query_param("PageSize", "500"))
        .respond_with(ResponseTemplate::new(200).set_body_json(records_body()))
        .expect(1)
        .mount(&server)
        .await;

    let record = provider(&server, false)
        .find_record("example.com", "@", "A")
        .await
        .unwrap()
        .expect("record should be found");

    assert_eq!(record.record_id, "333");
    assert_eq!(record.rr, "@");
    assert_eq!(record.record_type, "A");
    assert_eq!(record.value, "1.2.3.4");
    assert_eq!(record.ttl, 600);
}

#[tokio::test]
async fn find_record_returns_none_without_exact_match() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("x-acs-action", "DescribeDomainRecords"))
        .respond_with(ResponseTemplate::new(200).set_body_json(records_body()))
        .mount(&server)
        .await;

    let found = provider(&server, false)
        .find_record("example.com", "home", "A")
        .await
        .unwrap();
    assert!(found.is_none());
}

#[tokio::test]
async fn find_record_handles_empty_listing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "TotalCount": 0,
            "DomainRecords": { "Record": [] }
        })))
        .mount(&server)
        .await;

    let found = provider(&server, false)
        .find_record("example.com", "@", "A")
        .await
        .unwrap();
    assert!(found.is_none());
}

#[tokio::test]
async fn rejected_credentials_map_to_authentication() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "RequestId": "x",
            "Code": "InvalidAccessKeyId.NotFound",
            "Message": "Specified access key is not found."
        })))
        .mount(&server)
        .await;

    let result = provider(&server, false).find_record("example.com", "@", "A").await;

    match result {
        Err(Error::Authentication(msg)) => assert!(msg.contains("InvalidAccessKeyId.NotFound")),
        other => panic!("expected Authentication, got {:?}", other),
    }
}

#[tokio::test]
async fn signature_mismatch_maps_to_authentication() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "Code": "SignatureDoesNotMatch",
            "Message": "Specified signature is not matched with our calculation."
        })))
        .mount(&server)
        .await;

    let result = provider(&server, false).find_record("example.com", "@", "A").await;
    assert!(matches!(result, Err(Error::Authentication(_))));
}

#[tokio::test]
async fn other_api_errors_keep_code_and_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "Code": "InvalidDomainName.NoExist",
            "Message": "The specified domain name does not exist."
        })))
        .mount(&server)
        .await;

    let result = provider(&server, false).find_record("example.com", "@", "A").await;

    match result {
        Err(Error::Provider {
            provider,
            status,
            code,
            ..
        }) => {
            assert_eq!(provider, "aliyun");
            assert_eq!(status, 400);
            assert_eq!(code, "InvalidDomainName.NoExist");
        }
        other => panic!("expected Provider, got {:?}", other),
    }
}

#[tokio::test]
async fn update_record_sends_value_and_ttl() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/"))
        .and(header("x-acs-action", "UpdateDomainRecord"))
        .and(query_param("RecordId", "333"))
        .and(query_param("RR", "@"))
        .and(query_param("Type", "A"))
        .and(query_param("Value", "5.6.7.8"))
        .and(query_param("TTL", "600"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "RequestId": "x",
            "RecordId": "333"
        })))
        .expect(1)
        .mount(&server)
        .await;

    provider(&server, false)
        .update_record("333", "@", "A", "5.6.7.8", 600)
        .await
        .unwrap();
}

#[tokio::test]
async fn update_record_non_200_is_provider_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("x-acs-action", "UpdateDomainRecord"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "Code": "DomainRecordDuplicate",
            "Message": "The DNS record already exists."
        })))
        .mount(&server)
        .await;

    let result = provider(&server, false)
        .update_record("333", "@", "A", "5.6.7.8", 600)
        .await;

    assert!(matches!(result, Err(Error::Provider { status: 400, .. })));
}

#[tokio::test]
async fn dry_run_looks_up_but_never_updates() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("x-acs-action", "DescribeDomainRecords"))
        .respond_with(ResponseTemplate::new(200).set_body_json(records_body()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(header("x-acs-action", "UpdateDomainRecord"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let provider = provider(&server, true);

    let record = provider.find_record("example.com", "@", "A").await.unwrap();
    assert!(record.is_some());

    provider
        .update_record("333", "@", "A", "5.6.7.8", 600)
        .await
        .unwrap();
}

#[tokio::test]
async fn unreachable_endpoint_is_http_error() {
    let provider = AliyunProvider::new("LTAItest", "test-secret", "http://127.0.0.1:9", false).unwrap();

    let result = provider.find_record("example.com", "@", "A").await;
    assert!(matches!(result, Err(Error::Http(_))));
}

struct FixedIp(IpAddr);

#[async_trait::async_trait]
impl IpSource for FixedIp {
    async fn current(&self) -> ddns_core::Result<IpAddr> {
        Ok(self.0)
    }
}

fn engine_with(provider: AliyunProvider, store: &MemoryStateStore) -> DdnsEngine {
    DdnsEngine::new(
        Box::new(FixedIp("5.6.7.8".parse().unwrap())),
        Box::new(provider),
        Box::new(store.clone()),
        RecordTarget::new("example.com", "@", "A", 600),
    )
}

#[tokio::test]
async fn live_run_after_dry_run_calls_update() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("x-acs-action", "DescribeDomainRecords"))
        .respond_with(ResponseTemplate::new(200).set_body_json(records_body()))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(header("x-acs-action", "UpdateDomainRecord"))
        .and(query_param("Value", "5.6.7.8"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "RecordId": "333" })))
        .expect(1)
        .mount(&server)
        .await;

    let store = MemoryStateStore::new();

    let dry = engine_with(provider(&server, true), &store).reconcile().await.unwrap();
    assert_eq!(dry, Decision::UpdateRequired);
    assert!(store.is_empty().await, "a dry run must not fill the cache");

    let live = engine_with(provider(&server, false), &store).reconcile().await.unwrap();
    assert_eq!(live, Decision::UpdateRequired);
    assert!(!store.is_empty().await);
}
