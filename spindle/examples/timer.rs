//! Example: Using a Spindle timer

use spindle::reactor::Reactor;
use spindle::time::sleep;
use std::time::Duration;

#[spindle::main]
async fn main(reactor: &Reactor) {
    // Wait for 1 second on the system clock
    println!("Waiting for 1 second...");
    sleep(reactor, Duration::from_secs(1)).await;
    println!("Done!");
}
