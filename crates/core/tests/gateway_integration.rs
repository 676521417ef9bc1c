//! Integration tests for the gateway: classification, retry profiles,
//! not-found policy and paginated scans over a scripted remote.

mod support;

use std::time::Duration;

use convergent_common::resilience::ProfileKind;
use convergent_domain::{ConvergeError, ErrorClass, NotFoundPolicy, Result};
use serde::Deserialize;
use serde_json::{json, Value};
use support::{gateway, ok, remote_err, ScriptedRemote};

fn accounts(payload: Value) -> Result<Vec<String>> {
    payload
        .get("Items")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_str).map(str::to_string).collect())
        .ok_or_else(|| ConvergeError::contract("DescribeAccounts", "missing Items"))
}

fn page_request(page: convergent_domain::PageRequest) -> Value {
    json!({"Offset": page.offset, "Limit": page.limit})
}

/// Validates transient errors are retried at the profile interval until
/// success.
///
/// # Test Steps
/// 1. Script two `RequestLimitExceeded` failures, then a payload
/// 2. Call under the write profile (2s interval)
/// 3. Verify the payload is returned after three calls and 4s
#[tokio::test(start_paused = true)]
async fn test_transient_errors_are_retried() {
    let remote = ScriptedRemote::new();
    remote.script(
        "ModifyInstanceName",
        [
            remote_err("RequestLimitExceeded"),
            remote_err("RequestLimitExceeded"),
            ok(json!({"RequestId": "req-ok"})),
        ],
    );
    let gateway = gateway(remote.clone());
    let start = tokio::time::Instant::now();

    let payload = gateway
        .call("ModifyInstanceName", &json!({}), ProfileKind::Write, NotFoundPolicy::Fatal)
        .await
        .expect("call succeeds");

    assert_eq!(payload, Some(json!({"RequestId": "req-ok"})));
    assert_eq!(remote.calls("ModifyInstanceName"), 3);
    assert_eq!(start.elapsed(), Duration::from_secs(4));
}

/// Validates a fatal error aborts without retry and keeps the remote cause.
#[tokio::test(start_paused = true)]
async fn test_fatal_error_is_not_retried() {
    let remote = ScriptedRemote::new();
    remote.script("CreateAccounts", [remote_err("InvalidParameterValue")]);
    let gateway = gateway(remote.clone());

    let err = gateway
        .call("CreateAccounts", &json!({}), ProfileKind::Write, NotFoundPolicy::Fatal)
        .await
        .unwrap_err();

    match &err {
        ConvergeError::Fatal { action, source } => {
            assert_eq!(action, "CreateAccounts");
            assert_eq!(source.code, "InvalidParameterValue");
        }
        other => panic!("expected fatal, got {other:?}"),
    }
    assert_eq!(err.request_id(), Some("req-InvalidParameterValue"));
    assert_eq!(remote.calls("CreateAccounts"), 1);
}

/// Validates the not-found policy decides between absence and error.
#[tokio::test(start_paused = true)]
async fn test_not_found_policy() {
    let remote = ScriptedRemote::new();
    remote.script("DescribeDBInstances", [remote_err("ResourceNotFound.InstanceNotFound")]);
    let gateway = gateway(remote.clone());

    let absent = gateway
        .call("DescribeDBInstances", &json!({}), ProfileKind::ShortRead, NotFoundPolicy::Absent)
        .await
        .expect("absence tolerated");
    assert_eq!(absent, None);

    let err = gateway
        .call("DescribeDBInstances", &json!({}), ProfileKind::ShortRead, NotFoundPolicy::Fatal)
        .await
        .unwrap_err();
    assert_eq!(err.class(), ErrorClass::NotFound);
    assert_eq!(err.request_id(), Some("req-ResourceNotFound.InstanceNotFound"));
    assert_eq!(remote.calls("DescribeDBInstances"), 2);
}

/// Validates a declared success without payload is a contract violation.
#[tokio::test(start_paused = true)]
async fn test_empty_response_is_contract_violation() {
    let remote = ScriptedRemote::new();
    remote.script("DescribeTopicAttributes", [Ok(None)]);
    let gateway = gateway(remote.clone());

    let err = gateway
        .call("DescribeTopicAttributes", &json!({}), ProfileKind::ShortRead, NotFoundPolicy::Absent)
        .await
        .unwrap_err();

    assert!(matches!(err, ConvergeError::ContractViolation { ref detail, .. } if detail == "empty response"));
    assert_eq!(remote.calls("DescribeTopicAttributes"), 1);
}

/// Validates a persistently transient call times out with the last remote
/// condition, after the number of attempts the short-read profile allows.
///
/// # Test Steps
/// 1. Script `InternalError` forever
/// 2. Call under short read (2s interval, 180s deadline)
/// 3. Verify a Timeout naming `InternalError` after 90 attempts
#[tokio::test(start_paused = true)]
async fn test_persistent_transient_times_out() {
    let remote = ScriptedRemote::new();
    remote.script("DescribeUsers", [remote_err("InternalError")]);
    let gateway = gateway(remote.clone());

    let err = gateway
        .call("DescribeUsers", &json!({}), ProfileKind::ShortRead, NotFoundPolicy::Fatal)
        .await
        .unwrap_err();

    match err {
        ConvergeError::Timeout { action, attempts, last_condition, .. } => {
            assert_eq!(action, "DescribeUsers");
            assert_eq!(attempts, 90);
            assert!(last_condition.unwrap_or_default().contains("InternalError"));
        }
        other => panic!("expected timeout, got {other:?}"),
    }
    assert_eq!(remote.calls("DescribeUsers"), 90);
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
struct Topic {
    topic_name: String,
    partition_num: u32,
}

#[tokio::test(start_paused = true)]
async fn test_call_typed() {
    let remote = ScriptedRemote::new();
    remote.script(
        "DescribeTopic",
        [ok(json!({"TopicName": "orders", "PartitionNum": 3})), ok(json!({"TopicName": 5}))],
    );
    let gateway = gateway(remote);

    let topic: Option<Topic> = gateway
        .call_typed("DescribeTopic", &json!({}), ProfileKind::ShortRead, NotFoundPolicy::Fatal)
        .await
        .expect("typed payload");
    assert_eq!(topic, Some(Topic { topic_name: "orders".into(), partition_num: 3 }));

    let err = gateway
        .call_typed::<Topic>("DescribeTopic", &json!({}), ProfileKind::ShortRead, NotFoundPolicy::Fatal)
        .await
        .unwrap_err();
    assert!(matches!(err, ConvergeError::ContractViolation { .. }));
}

/// Validates a paginated scan requests pages at advancing offsets and stops
/// on the first short page.
#[tokio::test(start_paused = true)]
async fn test_list_all_walks_offsets() {
    let remote = ScriptedRemote::new();
    remote.script(
        "DescribeAccounts",
        [
            ok(json!({"Items": ["a", "b"]})),
            remote_err("RequestLimitExceeded"),
            ok(json!({"Items": ["c", "d"]})),
            ok(json!({"Items": []})),
        ],
    );
    let gateway = gateway(remote.clone()).with_page_size(2).expect("valid page size");

    let items = gateway
        .list_all(
            "DescribeAccounts",
            ProfileKind::ShortRead,
            NotFoundPolicy::Fatal,
            page_request,
            accounts,
        )
        .await
        .expect("scan succeeds");

    assert_eq!(items, vec!["a", "b", "c", "d"]);
    let offsets: Vec<u64> = remote
        .requests("DescribeAccounts")
        .iter()
        .filter_map(|r| r.get("Offset").and_then(Value::as_u64))
        .collect();
    assert_eq!(offsets, vec![0, 2, 2, 4]);
}

/// Validates a scan over a missing parent returns an empty list under the
/// absent policy and a malformed page is fatal.
#[tokio::test(start_paused = true)]
async fn test_list_all_absent_parent_and_malformed_page() {
    let remote = ScriptedRemote::new();
    remote.script("DescribeAccounts", [remote_err("ResourceNotFound")]);
    let gateway = gateway(remote.clone());

    let items = gateway
        .list_all(
            "DescribeAccounts",
            ProfileKind::ShortRead,
            NotFoundPolicy::Absent,
            page_request,
            accounts,
        )
        .await
        .expect("absent parent");
    assert!(items.is_empty());

    let remote = ScriptedRemote::new();
    remote.script("DescribeAccounts", [ok(json!({"TotalCount": 3}))]);
    let err = support::gateway(remote)
        .list_filtered(
            "DescribeAccounts",
            ProfileKind::ShortRead,
            NotFoundPolicy::Fatal,
            page_request,
            accounts,
            |name: &String| name.starts_with('a'),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ConvergeError::ContractViolation { .. }));
}

/// Validates a parent that disappears after the first page fails the scan
/// instead of returning a truncated list.
///
/// # Test Steps
/// 1. Script a full first page, then `ResourceNotFound`
/// 2. Scan under the absent policy with a page size of 2
/// 3. Verify the scan fails with `NotFound` and stops after two calls
#[tokio::test(start_paused = true)]
async fn test_list_all_parent_vanishing_mid_scan_is_not_found() {
    let remote = ScriptedRemote::new();
    remote.script(
        "DescribeAccounts",
        [
            ok(json!({"Items": ["a", "b"]})),
            remote_err("ResourceNotFound"),
            ok(json!({"Items": ["c"]})),
        ],
    );

    let err = gateway(remote.clone())
        .with_page_size(2)
        .expect("page size")
        .list_all(
            "DescribeAccounts",
            ProfileKind::ShortRead,
            NotFoundPolicy::Absent,
            page_request,
            accounts,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, ConvergeError::NotFound { ref action, .. } if action == "DescribeAccounts"));
    assert_eq!(remote.calls("DescribeAccounts"), 2);
}
