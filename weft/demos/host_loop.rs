//! Example: Driving a kernel from a fixed-step host loop

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use weft::Kernel;
use weft::task::{await_all, stall};
use weft::time::{ManualClock, wait};
use weft::tools::wrap_iterator;

const FRAME: Duration = Duration::from_millis(16);

/// Walks an agent towards `goal`, one tile per 50ms.
async fn walk(name: &'static str, goal: u32) -> anyhow::Result<u32> {
    let mut position = 0;

    while position < goal {
        wait(Duration::from_millis(50))?.await;
        position += 1;
        tracing::info!("{name} reached tile {position}");
    }

    Ok(position)
}

/// Sums a long range without holding the frame for too long.
async fn crunch(limit: u64) -> anyhow::Result<u64> {
    let mut add = wrap_iterator(|(acc, n): (u64, u64)| acc + n, true, 1_000);
    let mut total = 0;

    for n in 0..limit {
        total = add.call((total, n)).await?;
    }

    Ok(total)
}

fn main() -> anyhow::Result<()> {
    weft::logging::init();

    // The host owns time: one frame is 16ms of simulated clock.
    let clock = ManualClock::new();
    let kernel = Kernel::builder().name("game").clock(clock.clone()).build();

    let arrived = Rc::new(Cell::new(false));

    let flag = arrived.clone();
    kernel
        .task(async {
            let tiles = await_all([walk("scout", 3), walk("builder", 5)]).await?;
            tracing::info!("everyone arrived after {} tiles", tiles.iter().sum::<u32>());
            Ok::<_, anyhow::Error>(())
        })
        .name("squad")
        .on_complete(move |()| flag.set(true))
        .add();

    kernel
        .task(crunch(10_000))
        .name("crunch")
        .on_complete(|total| tracing::info!("crunch finished: {total}"))
        .add();

    let heartbeat = kernel.add_interval(|| tracing::info!("heartbeat"), Duration::from_millis(100));

    kernel.add_timeout(
        || tracing::warn!("the squad is slow today"),
        Duration::from_millis(200),
    );

    kernel.add(async {
        // Give every other task a head start before reporting.
        stall()?.await;
        tracing::info!("{} tasks still queued", Kernel::current().map_or(0, |k| k.len()));
        Ok::<_, anyhow::Error>(())
    });

    let mut frame = 0;

    while !arrived.get() {
        frame += 1;
        clock.advance(FRAME);

        // A real host would pass its remaining frame time here.
        let steps = kernel.run_for(Duration::from_millis(2), true)?;
        tracing::debug!("frame {frame}: {steps} steps");
    }

    kernel.remove(&heartbeat);
    tracing::info!("done after {frame} frames, {} tasks left", kernel.len());

    Ok(())
}
