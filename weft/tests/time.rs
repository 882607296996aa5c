use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use weft::time::{ManualClock, wait};
use weft::{Kernel, MisuseError};

const BUDGET: Duration = Duration::from_secs(1);

fn manual_kernel() -> (Kernel, ManualClock) {
    let clock = ManualClock::new();
    let kernel = Kernel::builder().clock(clock.clone()).build();

    (kernel, clock)
}

#[test]
fn test_wait_resumes_only_after_duration() {
    let (kernel, clock) = manual_kernel();
    let progress = Rc::new(Cell::new(0));

    let p = progress.clone();
    kernel.add(async move {
        p.set(1);
        wait(Duration::from_millis(100))?.await;
        p.set(2);
        Ok::<_, anyhow::Error>(())
    });

    kernel.run_for(BUDGET, true).unwrap();
    assert_eq!(progress.get(), 1);

    clock.advance(Duration::from_millis(50));
    kernel.run_for(BUDGET, true).unwrap();
    assert_eq!(progress.get(), 1, "Task should make no progress before the deadline");
    assert_eq!(kernel.stalled_len(), 1);

    clock.advance(Duration::from_millis(50));
    kernel.run_for(BUDGET, true).unwrap();
    assert_eq!(progress.get(), 2);
    assert!(kernel.is_empty());
}

#[test]
fn test_zero_wait_completes_on_first_poll() {
    let (kernel, _clock) = manual_kernel();

    kernel.add(async {
        wait(Duration::ZERO)?.await;
        Ok::<_, anyhow::Error>(())
    });

    assert_eq!(kernel.run_for(BUDGET, false).unwrap(), 1);
    assert_eq!(kernel.pivots(), 0);
}

#[test]
fn test_wait_outside_task_is_misuse() {
    let err = wait(Duration::from_millis(1)).unwrap_err();
    assert_eq!(err, MisuseError::WaitOutsideTask);
}

#[test]
fn test_wait_reports_remaining_time() {
    let (kernel, clock) = manual_kernel();
    let remaining = Rc::new(Cell::new(Duration::ZERO));

    let r = remaining.clone();
    let c = clock.clone();
    kernel.add(async move {
        let pending = wait(Duration::from_millis(40))?;
        c.advance(Duration::from_millis(15));
        r.set(pending.remaining());
        Ok::<_, anyhow::Error>(())
    });

    kernel.step().unwrap();
    assert_eq!(remaining.get(), Duration::from_millis(25));
}

#[test]
fn test_timeout_fires_once_after_delay() {
    let (kernel, clock) = manual_kernel();
    let fired = Rc::new(Cell::new(0));

    let f = fired.clone();
    let timer = kernel.add_timeout(move || f.set(f.get() + 1), Duration::from_millis(30));

    assert_eq!(timer.name(), Some("timeout"));

    kernel.run_for(BUDGET, true).unwrap();
    clock.advance(Duration::from_millis(29));
    kernel.run_for(BUDGET, true).unwrap();
    assert_eq!(fired.get(), 0);

    clock.advance(Duration::from_millis(1));
    kernel.run_for(BUDGET, true).unwrap();
    assert_eq!(fired.get(), 1);
    assert!(timer.is_finished());
    assert!(kernel.is_empty());
}

#[test]
fn test_removed_timeout_never_fires() {
    let (kernel, clock) = manual_kernel();
    let fired = Rc::new(Cell::new(false));

    let f = fired.clone();
    let timer = kernel.add_timeout(move || f.set(true), Duration::from_millis(10));

    kernel.run_for(BUDGET, true).unwrap();
    assert!(kernel.remove(&timer));

    clock.advance(Duration::from_secs(1));
    kernel.run_for(BUDGET, true).unwrap();

    assert!(!fired.get());
}

#[test]
fn test_interval_fires_every_period_until_removed() {
    let (kernel, clock) = manual_kernel();
    let count = Rc::new(Cell::new(0));

    let c = count.clone();
    let interval = kernel.add_interval(move || c.set(c.get() + 1), Duration::from_millis(10));

    kernel.run_for(BUDGET, true).unwrap();
    assert_eq!(count.get(), 0);

    for expected in 1..=3 {
        clock.advance(Duration::from_millis(10));
        kernel.run_for(BUDGET, true).unwrap();
        assert_eq!(count.get(), expected);
    }

    assert!(kernel.remove(&interval));
    assert!(kernel.is_empty());

    clock.advance(Duration::from_millis(10));
    kernel.run_for(BUDGET, true).unwrap();
    assert_eq!(count.get(), 3);
}

#[test]
fn test_run_for_stops_when_manual_clock_passes_budget() {
    let (kernel, clock) = manual_kernel();
    let turns = Rc::new(Cell::new(0));

    kernel.add(ticker(turns.clone(), clock.clone()));

    let steps = kernel.run_for(Duration::from_millis(10), false).unwrap();

    assert_eq!(steps, 3, "Budget is checked before every step");
    assert_eq!(turns.get(), 3);
}

async fn ticker(turns: Rc<Cell<u32>>, clock: ManualClock) -> anyhow::Result<()> {
    loop {
        turns.set(turns.get() + 1);
        clock.advance(Duration::from_millis(4));
        weft::task::yield_now().await;
    }
}
