mod common;

use common::{Tracked, Stats, virtual_runtime};
use spindle::OperationExt;
use spindle::combinator::ready;
use spindle::time::{sleep, timeout};
use spindle::tools::retry;
use std::cell::Cell;
use std::time::Duration;

#[test]
fn test_retry_succeeds_before_limit() {
    let runtime = virtual_runtime();
    let attempts = Cell::new(0);

    let result = runtime.block_on(retry(5, || {
        let n = attempts.get();
        attempts.set(n + 1);

        ready(if n < 2 { Err("fail") } else { Ok(42) })
    }));

    assert_eq!(result, Ok(42), "Retry should succeed before limit");
    assert_eq!(attempts.get(), 3, "Should have tried 3 times");
}

#[test]
fn test_retry_fails_after_limit() {
    let runtime = virtual_runtime();
    let attempts = Cell::new(0);

    let result = runtime.block_on(retry(3, || {
        attempts.set(attempts.get() + 1);
        ready(Err::<usize, _>("fail"))
    }));

    assert_eq!(result, Err("fail"), "Retry should fail after limit");
    assert_eq!(attempts.get(), 4, "One attempt plus three retries");
}

#[test]
fn test_retry_with_interval() {
    let runtime = virtual_runtime();
    let reactor = runtime.reactor();
    let starts = std::cell::RefCell::new(Vec::new());
    let interval = Duration::from_millis(20);

    let result = runtime.block_on(
        retry(3, || {
            starts.borrow_mut().push(reactor.now());
            let n = starts.borrow().len();

            sleep(reactor, Duration::from_millis(5))
                .map(move |()| if n < 3 { Err("fail") } else { Ok(77) })
        })
        .with_interval(reactor, interval),
    );

    assert_eq!(result, Ok(77), "Retry with interval should succeed");
    assert_eq!(
        *starts.borrow(),
        [
            Duration::ZERO,
            Duration::from_millis(25),
            Duration::from_millis(50),
        ],
        "each attempt starts one interval after the previous failure"
    );
}

#[test]
fn test_timeout_with_retry() {
    let runtime = virtual_runtime();
    let reactor = runtime.reactor();
    let attempts = Cell::new(0);

    let result = runtime.block_on(retry(5, || {
        let n = attempts.get();
        attempts.set(n + 1);

        let work = if n < 3 { 20 } else { 1 };

        timeout(
            reactor,
            Duration::from_millis(10),
            sleep(reactor, Duration::from_millis(work)).map(|()| 123),
        )
    }));

    assert_eq!(result, Ok(123), "Timeout+Retry should eventually succeed");
    assert_eq!(attempts.get(), 4);
    assert_eq!(reactor.pending(), 0);
}

#[test]
fn test_cancel_during_backoff_releases_the_timer() {
    let runtime = virtual_runtime();
    let reactor = runtime.reactor();
    let attempt = Stats::default();

    let result = runtime.block_on(timeout(
        reactor,
        Duration::from_millis(30),
        retry(10, || {
            Tracked::new(sleep(reactor, Duration::from_millis(10)), &attempt)
                .map(|()| Err::<(), _>("fail"))
        })
        .with_interval(reactor, Duration::from_secs(1)),
    ));

    assert!(result.is_err());
    assert_eq!(attempt.created.get(), 1, "still backing off after the first failure");
    assert_eq!(attempt.cancels.get(), 0);
    assert_eq!(reactor.pending(), 0, "the back-off timer is deregistered");
}
