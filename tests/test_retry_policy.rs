/// Retry envelope semantics: attempt counting, fail-fast classification and
/// last-error propagation.
use fuelops::config::RetryOptions;
use fuelops::error::{DataError, DataResult};
use fuelops::services::execute_with_retry;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

fn fast_retry(max_retries: u32) -> RetryOptions {
    RetryOptions {
        max_retries,
        delay_ms: 1,
        backoff: false,
    }
}

#[tokio::test]
async fn test_transient_failure_attempts_max_retries_plus_one() {
    let attempts = Arc::new(AtomicU32::new(0));
    let counter = attempts.clone();

    let result: DataResult<()> = execute_with_retry(
        move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(DataError::Network("connection refused".to_string()))
            }
        },
        &fast_retry(3),
    )
    .await;

    assert_eq!(attempts.load(Ordering::SeqCst), 4);
    assert_eq!(
        result.unwrap_err(),
        DataError::Network("connection refused".to_string())
    );
}

#[tokio::test]
async fn test_non_retryable_error_fails_after_one_attempt() {
    let attempts = Arc::new(AtomicU32::new(0));
    let counter = attempts.clone();

    let result: DataResult<()> = execute_with_retry(
        move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(DataError::Validation("missing column".to_string()))
            }
        },
        &fast_retry(5),
    )
    .await;

    assert_eq!(attempts.load(Ordering::SeqCst), 1);
    assert!(matches!(result.unwrap_err(), DataError::Validation(_)));
}

#[tokio::test]
async fn test_success_after_transient_failures() {
    let attempts = Arc::new(AtomicU32::new(0));
    let counter = attempts.clone();

    let result: DataResult<&'static str> = execute_with_retry(
        move || {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(DataError::Server {
                        status: 503,
                        message: "unavailable".to_string(),
                    })
                } else {
                    Ok("loaded")
                }
            }
        },
        &fast_retry(5),
    )
    .await;

    assert_eq!(result.unwrap(), "loaded");
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_rate_limit_is_retried() {
    let attempts = Arc::new(AtomicU32::new(0));
    let counter = attempts.clone();

    let result: DataResult<u32> = execute_with_retry(
        move || {
            let counter = counter.clone();
            async move {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                if n == 0 {
                    Err(DataError::RateLimited)
                } else {
                    Ok(n)
                }
            }
        },
        &fast_retry(1),
    )
    .await;

    assert_eq!(result.unwrap(), 1);
}

#[tokio::test]
async fn test_zero_retries_still_makes_one_attempt() {
    let attempts = Arc::new(AtomicU32::new(0));
    let counter = attempts.clone();

    let result: DataResult<()> = execute_with_retry(
        move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(DataError::Timeout("deadline".to_string()))
            }
        },
        &fast_retry(0),
    )
    .await;

    assert_eq!(attempts.load(Ordering::SeqCst), 1);
    assert!(result.is_err());
}

#[tokio::test]
async fn test_auth_error_is_not_retried() {
    let attempts = Arc::new(AtomicU32::new(0));
    let counter = attempts.clone();

    let result: DataResult<()> = execute_with_retry(
        move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(DataError::Auth("JWT expired".to_string()))
            }
        },
        &fast_retry(4),
    )
    .await;

    assert_eq!(attempts.load(Ordering::SeqCst), 1);
    assert!(matches!(result.unwrap_err(), DataError::Auth(_)));
}
