mod common;

use common::{Tracked, Stats, virtual_runtime};
use spindle::combinator::{join, ready};
use spindle::time::{sleep, timeout};
use spindle::{OperationExt, join};
use std::time::Duration;

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

#[test]
fn test_join_waits_for_every_child() {
    let runtime = virtual_runtime();
    let reactor = runtime.reactor();

    let result = runtime.block_on(join((
        sleep(reactor, ms(10)).map(|()| 1),
        sleep(reactor, ms(30)).map(|()| "two"),
        sleep(reactor, ms(20)).map(|()| 3.0),
    )));

    assert_eq!(result, (1, "two", 3.0));
    assert_eq!(reactor.now(), ms(30));
}

#[spindle::test]
async fn test_join_macro_single() {
    let (value,) = join!(ready(42)).await;
    assert_eq!(value, 42);
}

#[spindle::test]
async fn test_join_macro_preserves_order(reactor: &spindle::reactor::Reactor) {
    let (a, b, c) = join!(
        sleep(reactor, ms(30)).map(|()| 'a'),
        ready('b'),
        sleep(reactor, ms(10)).map(|()| 'c'),
    )
    .await;

    assert_eq!((a, b, c), ('a', 'b', 'c'));
}

#[test]
fn test_cancelled_join_cancels_only_unfinished_children() {
    let runtime = virtual_runtime();
    let reactor = runtime.reactor();
    let (fast, slow) = (Stats::default(), Stats::default());

    let result = runtime.block_on(timeout(
        reactor,
        ms(50),
        join((
            Tracked::new(sleep(reactor, ms(10)), &fast),
            Tracked::new(sleep(reactor, ms(100)), &slow),
        )),
    ));

    assert!(result.is_err());
    assert_eq!(fast.ready.get(), 1);
    assert_eq!(fast.cancels.get(), 0);
    assert_eq!(slow.cancels.get(), 1);
    assert_eq!(reactor.pending(), 0);
}
