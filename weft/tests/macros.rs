use std::cell::Cell;
use std::rc::Rc;

use weft::Kernel;
use weft::task::{stall, yield_now};

#[weft::test]
async fn test_body_runs_as_task() {
    let kernel = Kernel::current().expect("test body should run inside a task");

    assert_eq!(kernel.name(), "test");
    assert!(Kernel::current_task().is_some());
}

#[weft::test]
async fn test_body_can_suspend_and_use_question_mark() {
    let count = Rc::new(Cell::new(0));

    for _ in 0..3 {
        count.set(count.get() + 1);
        yield_now().await;
        stall()?.await;
    }

    assert_eq!(count.get(), 3);
}

#[weft::test]
#[should_panic(expected = "kernel error")]
async fn test_body_error_fails_the_test() {
    Err::<(), _>(anyhow::anyhow!("expected failure"))?;
}

#[weft::test]
#[should_panic(expected = "kernel error")]
async fn test_unhandled_sibling_failure_fails_the_test() {
    Kernel::current()
        .unwrap()
        .add(async { Err::<(), _>(anyhow::anyhow!("sibling")) });

    loop {
        stall()?.await;
    }
}
