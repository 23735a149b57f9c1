mod common;

use common::{Never, Tracked, Stats, advance, virtual_runtime};
use spindle::time::sleep;
use spindle::{Context, Operation, RunError, RuntimeBuilder, WakeSignal};
use std::pin::pin;
use std::time::{Duration, Instant};

#[test]
fn test_timer_pending_until_callback() {
    let runtime = virtual_runtime();
    let reactor = runtime.reactor();
    let signal = WakeSignal::new();
    let cx = Context::new(reactor, &signal);

    let mut timer = pin!(sleep(reactor, Duration::from_millis(1000)));

    for _ in 0..3 {
        assert!(timer.as_mut().poll(&cx).is_pending());
    }
    assert!(!signal.is_requested(), "polling alone never wakes");
    assert_eq!(reactor.pending(), 1, "registered once despite three polls");

    assert_eq!(advance(reactor, &cx), 1);
    assert_eq!(reactor.now(), Duration::from_millis(1000));
    assert!(signal.take(), "callback wakes the root");

    assert!(timer.as_mut().poll(&cx).is_ready());
}

#[test]
fn test_driver_never_polls_after_ready() {
    let runtime = virtual_runtime();
    let reactor = runtime.reactor();
    let stats = Stats::default();

    runtime.block_on(Tracked::new(sleep(reactor, Duration::from_millis(250)), &stats));

    assert_eq!(stats.polls.get(), 2, "first poll, then one poll per wake");
    assert_eq!(stats.ready.get(), 1);
    assert_eq!(stats.cancels.get(), 0);
    assert_eq!(reactor.pending(), 0);
}

#[test]
fn test_zero_duration_timer_still_waits_one_turn() {
    let runtime = virtual_runtime();
    let reactor = runtime.reactor();
    let stats = Stats::default();

    runtime.block_on(Tracked::new(sleep(reactor, Duration::ZERO), &stats));

    assert_eq!(stats.polls.get(), 2);
    assert_eq!(reactor.now(), Duration::ZERO);
}

#[test]
fn test_system_clock_sleeps() {
    common::init_tracing();

    let runtime = RuntimeBuilder::new().build();
    let start = Instant::now();

    runtime.block_on(sleep(runtime.reactor(), Duration::from_millis(20)));

    assert!(
        start.elapsed() >= Duration::from_millis(20),
        "Sleep returned too early"
    );
}

#[test]
fn test_stalled_root_is_reported_and_cancelled() {
    let runtime = virtual_runtime();
    let stats = Stats::default();

    let result = runtime.run(Tracked::new(Never, &stats));

    assert_eq!(result, Err(RunError::Stalled));
    assert_eq!(stats.cancels.get(), 1, "stalled root is cancelled once");
}

#[test]
#[should_panic(expected = "timer registration failed")]
fn test_full_timer_table_is_fatal() {
    let runtime = RuntimeBuilder::new()
        .virtual_clock()
        .timer_capacity(1)
        .build();
    let reactor = runtime.reactor();

    runtime.block_on(spindle::join!(
        sleep(reactor, Duration::from_millis(1)),
        sleep(reactor, Duration::from_millis(1)),
    ));
}

#[test]
#[should_panic(expected = "another reactor")]
fn test_timer_polled_on_foreign_reactor_is_fatal() {
    let home = virtual_runtime();
    let away = virtual_runtime();

    away.block_on(sleep(home.reactor(), Duration::from_millis(1)));
}
