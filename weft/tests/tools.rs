use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use weft::Kernel;
use weft::tools::{value, wrap_iterator};

const BUDGET: Duration = Duration::from_secs(1);

#[test]
fn test_value_stalls_until_producer_is_ready() {
    let kernel = Kernel::new();
    let polls = Rc::new(Cell::new(0));
    let seen = Rc::new(Cell::new(0));

    let p = polls.clone();
    let s = seen.clone();
    kernel
        .task(async move {
            value(move || {
                p.set(p.get() + 1);
                (p.get() >= 3).then_some(p.get() * 10)
            })
            .await
        })
        .on_complete(move |v| s.set(v))
        .add();

    let steps = kernel.run_for(BUDGET, false).unwrap();

    assert_eq!(steps, 3, "One poll per turn");
    assert_eq!(polls.get(), 3);
    assert_eq!(seen.get(), 30);
    assert_eq!(kernel.pivots(), 2);
}

#[test]
fn test_value_ready_at_once_takes_one_step() {
    let kernel = Kernel::new();

    kernel.add(async { value(|| Some("now")).await });

    assert_eq!(kernel.run_for(BUDGET, false).unwrap(), 1);
}

#[test]
fn test_wrap_iterator_stalls_every_n_calls() {
    let kernel = Kernel::new();
    let out = Rc::new(RefCell::new(Vec::new()));

    let o = out.clone();
    kernel.add(async move {
        let mut double = wrap_iterator(|x: u32| x * 2, true, 2);

        for i in 1..=4 {
            let v = double.call(i).await?;
            o.borrow_mut().push(v);
        }

        assert_eq!(double.calls(), 4);
        Ok::<_, anyhow::Error>(())
    });

    let steps = kernel.run_for(BUDGET, false).unwrap();

    assert_eq!(*out.borrow(), vec![2, 4, 6, 8]);
    assert_eq!(steps, 3, "Calls 2 and 4 each cost one turn");
    assert_eq!(kernel.pivots(), 2);
}

#[test]
fn test_wrap_iterator_yields_and_clamps_zero() {
    let kernel = Kernel::new();
    let stalled = Rc::new(Cell::new(0));

    let s = stalled.clone();
    let probe = kernel.clone();
    kernel.add(async move {
        let mut count = wrap_iterator(
            |_: ()| s.set(s.get().max(probe.stalled_len())),
            false,
            0,
        );

        count.call(()).await?;
        count.call(()).await?;

        Ok::<_, anyhow::Error>(())
    });

    let steps = kernel.run_for(BUDGET, false).unwrap();

    assert_eq!(steps, 3, "Every call yields when every_n is zero");
    assert_eq!(kernel.pivots(), 0, "Yielding never goes through the stalled queue");
    assert_eq!(stalled.get(), 0);
}
