//! Counts heap allocations made while an operation tree runs.
//!
//! Lives in its own test binary so the counting allocator sees nothing but
//! this test.

use spindle::combinator::{join, race};
use spindle::reactor::Reactor;
use spindle::time::{sleep, timeout};
use spindle::{Operation, OperationExt, RuntimeBuilder, sequence};
use std::alloc::{GlobalAlloc, Layout, System};
use std::cell::Cell;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

struct Counting;

static ALLOCATIONS: AtomicUsize = AtomicUsize::new(0);

thread_local! {
    static TRACKING: Cell<bool> = const { Cell::new(false) };
}

fn record() {
    if TRACKING.with(Cell::get) {
        ALLOCATIONS.fetch_add(1, Ordering::Relaxed);
    }
}

unsafe impl GlobalAlloc for Counting {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        record();
        unsafe { System.alloc(layout) }
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        unsafe { System.dealloc(ptr, layout) }
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        record();
        unsafe { System.alloc_zeroed(layout) }
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        record();
        unsafe { System.realloc(ptr, layout, new_size) }
    }
}

#[global_allocator]
static GLOBAL: Counting = Counting;

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

/// Three sequential timers, a race, a join and a timeout in one tree.
fn workload<'r>(reactor: &'r Reactor, log: &'r Cell<u32>) -> impl Operation<Output = u32> + 'r {
    sequence! {
        sleep(reactor, ms(1000)).await;
        log.set(log.get() + 1);
        sleep(reactor, ms(1000)).await;
        log.set(log.get() + 1);
        sleep(reactor, ms(1000)).await;
        log.set(log.get() + 1);

        let winner = race((
            sleep(reactor, ms(100)).map(|()| 100),
            sleep(reactor, ms(50)).map(|()| 50),
        ))
        .await;

        let (a, b) = join((
            sleep(reactor, ms(10)).map(|()| 1),
            sleep(reactor, ms(20)).map(|()| 2),
        ))
        .await;

        let late = timeout(reactor, ms(5), sleep(reactor, ms(500))).await;

        winner + a + b + u32::from(late.is_err())
    }
}

#[test]
fn test_no_allocation_after_the_tree_is_built() {
    let runtime = RuntimeBuilder::new().virtual_clock().build();
    let reactor = runtime.reactor();
    let log = Cell::new(0);

    // Warm-up: first use of each logging call site may register it.
    assert_eq!(runtime.block_on(workload(reactor, &log)), 54);

    let op = workload(reactor, &log);

    TRACKING.with(|tracking| tracking.set(true));
    let value = runtime.block_on(op);
    TRACKING.with(|tracking| tracking.set(false));

    assert_eq!(value, 54);
    assert_eq!(log.get(), 6);
    assert_eq!(ALLOCATIONS.load(Ordering::Relaxed), 0);
}
