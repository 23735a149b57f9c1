//! Example: racing two timers with Spindle select!

use spindle::reactor::Reactor;
use spindle::select;
use spindle::time::sleep;
use std::time::Duration;

#[spindle::main]
async fn main(reactor: &Reactor) {
    // The first timer to fire wins; the other one is cancelled
    let winner = select! {
        sleep(reactor, Duration::from_millis(500)) => |()| "fut1",
        sleep(reactor, Duration::from_millis(1000)) => |()| "fut2",
    }
    .await;

    println!("{winner} finished first");
}
