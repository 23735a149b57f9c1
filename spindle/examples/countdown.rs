//! Example: a countdown written as one sequence, with a deadline
//!
//! Run with `RUST_LOG=spindle=trace` to watch every poll.

use spindle::reactor::Reactor;
use spindle::time::{instrumented, sleep, timeout};
use spindle::{Operation, sequence};
use std::time::Duration;

fn countdown(reactor: &Reactor) -> impl Operation<Output = &'static str> + '_ {
    sequence! {
        println!("3");
        sleep(reactor, Duration::from_millis(300)).await;
        println!("2");
        sleep(reactor, Duration::from_millis(300)).await;
        println!("1");
        sleep(reactor, Duration::from_millis(300)).await;
        "liftoff"
    }
}

#[spindle::main]
async fn main(reactor: &Reactor) {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let (result, elapsed) =
        instrumented(timeout(reactor, Duration::from_secs(2), countdown(reactor))).await;

    match result {
        Ok(message) => println!("{message} after {elapsed:?}"),
        Err(err) => println!("aborted: {err}"),
    }

    let late = timeout(reactor, Duration::from_millis(500), countdown(reactor)).await;
    println!("second run: {late:?}");
}
