//! Samples small pieces of work many times and prints descriptive statistics of their cost.
//!
//! The events to count can be given on the command line using `perf` event names:
//!
//! `cargo run --example perf_cost_sampling -- instructions branch-misses cycles`.

use std::env;
use std::error::Error;
use std::hint::black_box;
use std::time::Duration;

use perf_cost::{Event, Profiler, SampleOptions};

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let events = env::args()
        .skip(1)
        .map(|name| name.parse::<Event>())
        .collect::<Result<Vec<_>, _>>()?;

    let profiler = if events.is_empty() {
        Profiler::new([Event::Instructions, Event::BranchMisses, Event::CpuCycles])?
    } else {
        Profiler::new(events)?
    };

    let options = SampleOptions::default()
        .max_duration(Duration::from_millis(500))
        .max_epochs(5_000);

    println!("Formatting a number into a string:");
    let stats = profiler.sample(&options, || {
        black_box(format!("{}", black_box(123_456_789_u64)));
    })?;
    println!("{stats}");
    println!();

    println!("Summing 1000 integers, reclaiming memory before every sample:");
    let stats = profiler.sample(&options.clone().reclaim_each_sample(true), || {
        black_box((0..1000_u64).sum::<u64>());
    })?;
    println!("{stats}");

    if let Some(elapsed) = stats.elapsed_summary() {
        println!();
        println!(
            "{} samples, median {} ns per iteration",
            elapsed.count(),
            elapsed.median()
        );
    }

    Ok(())
}
