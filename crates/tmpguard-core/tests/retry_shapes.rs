use std::cell::Cell;
use std::io;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

use tmpguard_core::retry::{RetryError, RetryPolicy};

fn busy() -> io::Error {
    io::Error::from(io::ErrorKind::ResourceBusy)
}

#[test]
fn blocking_succeeds_after_k_transient_failures() {
    let policy = RetryPolicy::new(8, Duration::from_millis(5));
    let calls = Cell::new(0u32);
    let started = Instant::now();

    let result = policy.run_blocking(|| {
        calls.set(calls.get() + 1);
        if calls.get() <= 3 {
            Err(busy())
        } else {
            Ok("done")
        }
    });

    assert_eq!(result.expect("eventually succeeds"), "done");
    assert_eq!(calls.get(), 4);
    // 5ms × (1 + 2 + 3)
    assert!(started.elapsed() >= Duration::from_millis(30));
}

#[test]
fn blocking_non_retryable_fails_without_delay() {
    let policy = RetryPolicy::new(8, Duration::from_secs(10));
    let calls = Cell::new(0u32);
    let started = Instant::now();

    let err = policy
        .run_blocking(|| -> io::Result<()> {
            calls.set(calls.get() + 1);
            Err(io::Error::from(io::ErrorKind::NotFound))
        })
        .unwrap_err();

    assert!(matches!(err, RetryError::Fatal { attempts: 1, .. }));
    assert_eq!(err.into_inner().kind(), io::ErrorKind::NotFound);
    assert_eq!(calls.get(), 1);
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[test]
fn blocking_exhaustion_makes_r_plus_one_attempts() {
    let policy = RetryPolicy::new(3, Duration::from_millis(1));
    let calls = Cell::new(0u32);

    let err = policy
        .run_blocking(|| -> io::Result<()> {
            calls.set(calls.get() + 1);
            Err(io::Error::from(io::ErrorKind::DirectoryNotEmpty))
        })
        .unwrap_err();

    assert!(err.is_exhausted());
    assert_eq!(err.attempts(), 4);
    assert_eq!(calls.get(), 4);
    assert_eq!(err.error().kind(), io::ErrorKind::DirectoryNotEmpty);
}

#[test]
fn custom_predicate_drives_retries() {
    let policy = RetryPolicy::new(5, Duration::ZERO);
    let calls = Cell::new(0u32);

    let result: Result<(), RetryError<&str>> = policy.run_blocking_with(
        |e: &&str| *e == "again",
        || {
            calls.set(calls.get() + 1);
            if calls.get() < 3 {
                Err("again")
            } else {
                Err("stop")
            }
        },
    );

    assert!(matches!(result, Err(RetryError::Fatal { error: "stop", attempts: 3 })));
}

#[tokio::test(start_paused = true)]
async fn async_backoff_is_linear_and_scheduled() {
    let policy = RetryPolicy::new(8, Duration::from_millis(150));
    let calls = AtomicU32::new(0);
    let started = tokio::time::Instant::now();

    let result = policy
        .run(|| async {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(io::Error::from(io::ErrorKind::PermissionDenied))
            } else {
                Ok(())
            }
        })
        .await;

    assert!(result.is_ok());
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(150 + 300), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_millis(150 + 300 + 20), "elapsed {elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn async_exhaustion_waits_worst_case_backoff() {
    let policy = RetryPolicy::default();
    let calls = AtomicU32::new(0);
    let started = tokio::time::Instant::now();

    let err = policy
        .run(|| async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(busy())
        })
        .await
        .unwrap_err();

    assert!(err.is_exhausted());
    assert_eq!(calls.load(Ordering::SeqCst), 9);
    let elapsed = started.elapsed();
    assert!(elapsed >= policy.worst_case_backoff(), "elapsed {elapsed:?}");
    assert!(
        elapsed < policy.worst_case_backoff() + Duration::from_millis(50),
        "elapsed {elapsed:?}"
    );
}

#[tokio::test(start_paused = true)]
async fn async_non_retryable_fails_on_first_attempt() {
    let policy = RetryPolicy::default();
    let calls = AtomicU32::new(0);
    let started = tokio::time::Instant::now();

    let err = policy
        .run(|| async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(io::Error::from(io::ErrorKind::NotFound))
        })
        .await
        .unwrap_err();

    assert!(matches!(err, RetryError::Fatal { attempts: 1, .. }));
    assert_eq!(err.into_inner().kind(), io::ErrorKind::NotFound);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(started.elapsed(), Duration::ZERO);
}
