// ============================================================================
// Gateway Integration Tests
// ============================================================================
//
// Spin up the gateway with stub upstreams and a scripted validator on
// ephemeral ports, then drive it over real HTTP. Covers the fail-closed
// authentication contract:
// - missing/invalid credential -> 401, upstream never touched
// - validator unreachable -> 503, upstream never touched
// - valid credential / public route -> forwarded verbatim
//
// ============================================================================

use std::sync::atomic::Ordering;
use std::sync::Arc;

mod test_utils;
use test_utils::{spawn_gateway, spawn_upstream, test_config, StubValidator, Verdict};

fn client() -> reqwest::Client {
    reqwest::Client::new()
}

#[tokio::test]
async fn protected_route_without_cookie_is_rejected_before_forwarding() {
    let upstream = spawn_upstream().await;
    let mut config = test_config();
    config.upstreams.cart_service_url = upstream.url.clone();

    let validator = Arc::new(StubValidator::new(Verdict::Valid("user-1".into())));
    let gateway = spawn_gateway(&config, validator.clone()).await;

    let response = client()
        .get(format!("{gateway}/cart/getcart"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 401);
    assert_eq!(upstream.hits.load(Ordering::SeqCst), 0);
    // Without a cookie there is nothing to validate
    assert_eq!(validator.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn rejected_credential_is_401() {
    let upstream = spawn_upstream().await;
    let mut config = test_config();
    config.upstreams.cart_service_url = upstream.url.clone();

    let gateway = spawn_gateway(&config, Arc::new(StubValidator::new(Verdict::Invalid))).await;

    let response = client()
        .get(format!("{gateway}/cart/getcart"))
        .header("Cookie", "Authorization=bad-token")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 401);
    assert_eq!(upstream.hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unreachable_validator_is_503_not_401() {
    let upstream = spawn_upstream().await;
    let mut config = test_config();
    config.upstreams.cart_service_url = upstream.url.clone();

    let gateway = spawn_gateway(&config, Arc::new(StubValidator::new(Verdict::Unreachable))).await;

    let response = client()
        .get(format!("{gateway}/cart/getcart"))
        .header("Cookie", "Authorization=some-token")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 503);
    assert_eq!(upstream.hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn valid_credential_forwards_verbatim() {
    let upstream = spawn_upstream().await;
    let mut config = test_config();
    config.upstreams.cart_service_url = upstream.url.clone();

    let validator = Arc::new(StubValidator::new(Verdict::Valid("user-1".into())));
    let gateway = spawn_gateway(&config, validator.clone()).await;

    let response = client()
        .get(format!("{gateway}/cart/getcart"))
        .header("Cookie", "Authorization=good-token")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "upstream saw /cart/getcart");
    assert_eq!(upstream.hits.load(Ordering::SeqCst), 1);
    assert_eq!(validator.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn public_route_skips_validation_entirely() {
    let upstream = spawn_upstream().await;
    let mut config = test_config();
    config.upstreams.product_service_url = upstream.url.clone();

    // Validator down must not matter on public routes
    let validator = Arc::new(StubValidator::new(Verdict::Unreachable));
    let gateway = spawn_gateway(&config, validator.clone()).await;

    let response = client()
        .get(format!("{gateway}/products/get?id=42"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(upstream.hits.load(Ordering::SeqCst), 1);
    assert_eq!(validator.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unknown_path_is_404_without_forwarding() {
    let upstream = spawn_upstream().await;
    let mut config = test_config();
    config.upstreams.cart_service_url = upstream.url.clone();

    let gateway = spawn_gateway(
        &config,
        Arc::new(StubValidator::new(Verdict::Valid("user-1".into()))),
    )
    .await;

    let response = client()
        .get(format!("{gateway}/definitely/not/a/route"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 404);
    assert_eq!(upstream.hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unreachable_upstream_is_503() {
    let mut config = test_config();
    // cart_service_url points at a closed port from test_config()
    config.gateway.forward_timeout_secs = 2;

    let gateway = spawn_gateway(
        &config,
        Arc::new(StubValidator::new(Verdict::Valid("user-1".into()))),
    )
    .await;

    let response = client()
        .get(format!("{gateway}/cart/getcart"))
        .header("Cookie", "Authorization=good-token")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 503);
}
