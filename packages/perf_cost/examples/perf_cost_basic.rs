//! Profiles a single execution of a few pieces of work and prints what each one cost.
//!
//! Run with: `cargo run --example perf_cost_basic`.

use std::collections::BTreeMap;
use std::hint::black_box;

use perf_cost::{Event, ProfileOptions, Profiler};

fn main() -> Result<(), perf_cost::Error> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let profiler = Profiler::with_default_events();
    let options = ProfileOptions::default().warmup(1);

    println!("Sorting 100 000 reversed integers:");
    let sorted = profiler.profile(&options, || {
        let mut data: Vec<u32> = (0..100_000).rev().collect();
        data.sort_unstable();
        black_box(data);
    })?;
    println!("{sorted}");
    println!();

    println!("Inserting 10 000 entries into a BTreeMap:");
    let inserted = profiler.profile(&options, || {
        let mut map = BTreeMap::new();
        for i in 0..10_000_u32 {
            map.insert(i.wrapping_mul(2_654_435_761), i);
        }
        black_box(map);
    })?;
    println!("{inserted}");
    println!();

    if let (Some(sort_instructions), Some(insert_instructions)) = (
        sorted.get(Event::Instructions),
        inserted.get(Event::Instructions),
    ) {
        println!(
            "Instructions: sort {sort_instructions}, insert {insert_instructions}"
        );
    }

    Ok(())
}
