use std::sync::Arc;

use fail::FailScenario;
use signer::concurrency::guard::ResourceGuard;
use signer::error::{ErrorKind, SignerResult};
use signer::failpoints::{COMBINE__BEFORE_EMIT, FIRST_HASH__AFTER_EXPENSIVE, MULTI_HASH__BEFORE_EMIT};
use signer::signing::sign_values;
use signer::test_utils::notify::within_timeout;
use signer::test_utils::signer::StubSigner;
use signer_telemetry::tracing::init_test_tracing;

/// Signs `0..8` with fail point `name` configured to `actions`.
///
/// [`FailScenario`] holds a process-wide lock, so scenarios never overlap.
async fn sign_with_fail_point(name: &str, actions: &str) -> SignerResult<String> {
    let scenario = FailScenario::setup();
    fail::cfg(name, actions).unwrap();

    let result = within_timeout(sign_values(
        1,
        Arc::new(StubSigner),
        ResourceGuard::exclusive(),
        0..8,
    ))
    .await;

    scenario.teardown();
    result
}

#[tokio::test(flavor = "multi_thread")]
async fn failure_after_expensive_hash_fails_the_run() {
    init_test_tracing();

    let err = sign_with_fail_point(FIRST_HASH__AFTER_EXPENSIVE, "return")
        .await
        .unwrap_err();

    assert!(err.kinds().iter().all(|kind| *kind == ErrorKind::InjectedFailure));
    assert_eq!(err.kinds().len(), 8);
}

#[tokio::test(flavor = "multi_thread")]
async fn failure_before_multi_hash_emit_fails_the_run() {
    init_test_tracing();

    let err = sign_with_fail_point(MULTI_HASH__BEFORE_EMIT, "1*off->return(disk full)")
        .await
        .unwrap_err();

    assert!(err.kinds().contains(&ErrorKind::InjectedFailure));
    assert!(err.detail().unwrap().contains("disk full"));
}

#[tokio::test(flavor = "multi_thread")]
async fn failure_before_combine_emit_discards_the_signature() {
    init_test_tracing();

    let err = sign_with_fail_point(COMBINE__BEFORE_EMIT, "return")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InjectedFailure);
}

#[tokio::test(flavor = "multi_thread")]
async fn panic_in_fail_point_is_reported() {
    init_test_tracing();

    let err = sign_with_fail_point(MULTI_HASH__BEFORE_EMIT, "panic")
        .await
        .unwrap_err();

    assert!(err.kinds().contains(&ErrorKind::TaskPanicked));
}

#[tokio::test(flavor = "multi_thread")]
async fn disabled_fail_point_leaves_the_run_untouched() {
    init_test_tracing();

    let signature = sign_with_fail_point(COMBINE__BEFORE_EMIT, "off")
        .await
        .unwrap();

    assert_eq!(signature.split('_').count(), 8);
}
