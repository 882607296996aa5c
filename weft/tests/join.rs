use std::cell::{Cell, RefCell};
use std::rc::Rc;

use weft::task::{
    AbortGuard, TaskState, await_all, await_call, await_each, await_one, spawn, stall,
};
use weft::{Kernel, KernelError, MisuseError};

async fn stall_then(value: u32, stalls: u32, finished: Rc<RefCell<Vec<u32>>>) -> anyhow::Result<u32> {
    for _ in 0..stalls {
        stall()?.await;
    }

    finished.borrow_mut().push(value);
    Ok(value)
}

async fn fail_or_spin(fail: bool, turns: Rc<Cell<u32>>) -> anyhow::Result<u32> {
    if fail {
        anyhow::bail!("bad sibling");
    }

    loop {
        turns.set(turns.get() + 1);
        stall()?.await;
    }
}

#[weft::test]
async fn test_await_all_keeps_input_order() {
    let finished = Rc::new(RefCell::new(Vec::new()));

    let futures = [(1, 3), (2, 0), (3, 1)]
        .into_iter()
        .map(|(value, stalls)| stall_then(value, stalls, finished.clone()));

    let values = await_all(futures).await?;

    assert_eq!(values, vec![1, 2, 3], "Values come back in input order");
    assert_eq!(*finished.borrow(), vec![2, 3, 1], "Tasks finished out of order");
}

#[weft::test]
async fn test_await_all_empty() {
    let values = await_all(Vec::<std::future::Ready<anyhow::Result<u8>>>::new()).await?;
    assert!(values.is_empty());
}

#[weft::test]
async fn test_await_all_fails_fast_and_removes_siblings() {
    let turns = Rc::new(Cell::new(0));

    let futures = [false, true].map(|fail| fail_or_spin(fail, turns.clone()));
    let err = await_all(futures).await.unwrap_err();

    let failure = err.failure().unwrap();
    assert_eq!(failure.error.to_string(), "bad sibling");
    assert_eq!(failure.trace.name.as_deref(), Some("await[1]"));

    let kernel = Kernel::current().unwrap();
    assert_eq!(kernel.len(), 0, "Pending sibling should have been removed");
    assert_eq!(turns.get(), 1);
}

#[weft::test]
async fn test_await_one_unwraps_value() {
    let value = await_one(async {
        stall()?.await;
        Ok::<_, anyhow::Error>(7)
    })
    .await?;

    assert_eq!(value, 7);
}

#[weft::test]
async fn test_await_each_calls_every_function_with_args() {
    let fns = (1..=3).map(|k| move |base: u32| async move { Ok::<_, anyhow::Error>(base * k) });

    let values = await_each(fns, 10).await?;

    assert_eq!(values, vec![10, 20, 30]);
}

#[weft::test]
async fn test_await_call_moves_args_and_unwraps_value() {
    let label = String::from("weft");

    let len = await_call(|s: String| async move { Ok::<_, anyhow::Error>(s.len()) }, label).await?;

    assert_eq!(len, 4);
}

#[weft::test]
async fn test_await_call_returns_failure() {
    let err = await_call(|code: u8| async move { Err::<(), _>(anyhow::anyhow!("code {code}")) }, 7)
        .await
        .unwrap_err();

    assert_eq!(err.failure().unwrap().error.to_string(), "code 7");
}

#[weft::test]
async fn test_spawn_and_join() {
    let handle = spawn(async {
        stall()?.await;
        Ok::<_, anyhow::Error>("child")
    })?;

    assert_eq!(handle.task().state(), TaskState::Ready);
    assert_eq!(handle.await?, "child");
}

#[weft::test]
async fn test_spawned_failure_is_delivered_to_join_handle() {
    let handle = spawn(async { Err::<(), _>(anyhow::anyhow!("nope")) })?;

    let err = handle.await.unwrap_err();

    assert!(matches!(err, KernelError::Unhandled(_)));
    assert_eq!(err.failure().unwrap().error.to_string(), "nope");
}

#[weft::test]
async fn test_join_after_take_reports_result_taken() {
    let handle = spawn(async { Ok::<_, anyhow::Error>(5) })?;

    while !handle.task().is_finished() {
        stall()?.await;
    }

    assert_eq!(handle.try_take().unwrap().unwrap(), 5);

    let id = handle.task().id();
    let err = handle.try_join().unwrap().unwrap_err();
    assert!(matches!(err, KernelError::ResultTaken(task) if task == id), "got {err:?}");

    let err = handle.await.unwrap_err();
    assert!(matches!(err, KernelError::ResultTaken(_)), "Awaiting agrees with try_join");
}

#[weft::test]
async fn test_aborted_spawn_reports_cancelled() {
    let handle = spawn(async {
        stall()?.await;
        Ok::<_, anyhow::Error>(())
    })?;

    let id = handle.task().id();
    assert!(handle.abort());

    let err = handle.await.unwrap_err();
    assert!(matches!(err, KernelError::Cancelled(task) if task == id));
}

#[weft::test]
async fn test_abort_guard_removes_unfinished_tasks() {
    let slow = spawn(async {
        stall()?.await;
        Ok::<_, anyhow::Error>(())
    })?;

    let guard = AbortGuard::new(vec![slow.task().clone()]);
    assert_eq!(guard.len(), 1);
    drop(guard);

    assert_eq!(slow.task().state(), TaskState::Cancelled);
}

#[weft::test]
async fn test_await_all_macro_mixed_types() {
    let (a, b, c) = weft::await_all!(
        async { Ok::<_, anyhow::Error>(1) },
        async {
            stall()?.await;
            Ok::<_, anyhow::Error>("two")
        },
        async { Ok::<_, anyhow::Error>(3.0) }
    )?;

    assert_eq!(a, 1);
    assert_eq!(b, "two");
    assert_eq!(c, 3.0);
}

#[weft::test]
async fn test_await_all_macro_single_and_empty() {
    let value = weft::await_all!(async { Ok::<_, anyhow::Error>(42) })?;
    assert_eq!(value, 42);

    weft::await_all!()?;
}

#[weft::test]
async fn test_await_all_macro_propagates_failure() {
    let turns = Rc::new(Cell::new(0));

    let result = weft::await_all!(fail_or_spin(false, turns.clone()), fail_or_spin(true, turns.clone()));

    assert!(result.is_err());
    assert_eq!(Kernel::current().unwrap().len(), 0);
}

#[test]
fn test_spawn_outside_task_is_misuse() {
    let err = spawn(async { Ok::<_, anyhow::Error>(()) }).err();
    assert_eq!(err, Some(MisuseError::SpawnOutsideTask));
}

#[test]
fn test_failing_sibling_does_not_escalate_to_host() {
    let kernel = Kernel::new();
    let caught = Rc::new(Cell::new(false));

    let c = caught.clone();
    kernel
        .task(async {
            let turns = Rc::new(Cell::new(0));
            await_all([fail_or_spin(true, turns)]).await
        })
        .on_error(move |_| c.set(true))
        .add();

    while kernel.step().unwrap() {}

    assert!(caught.get(), "Failure should surface through the awaiting task");
}
