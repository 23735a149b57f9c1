//! Example: Retry with interval using Spindle

use spindle::combinator::ready;
use spindle::reactor::Reactor;
use spindle::tools::retry;
use std::time::Duration;

#[spindle::main]
async fn main(reactor: &Reactor) {
    let mut attempts = 0;

    // Retry the operation up to 3 times, 100ms apart
    let result = retry(3, move || {
        attempts += 1;
        println!("Attempt {attempts}");

        ready(Err::<(), &str>("fail"))
    })
    .with_interval(reactor, Duration::from_millis(100))
    .await;

    println!("Result: {result:?}");
}
