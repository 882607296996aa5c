use weft::Kernel;

#[inline(never)]
fn deep_panic_site() -> u32 {
    panic!("failure deep in a task")
}

#[inline(never)]
fn deep_error_site() -> anyhow::Result<u32> {
    anyhow::bail!("error deep in a task")
}

#[test]
fn test_failures_carry_the_task_backtrace() {
    // SAFETY: this is the only test in this binary and it runs before any
    // task is started, so nothing reads the environment concurrently.
    unsafe {
        std::env::set_var("RUST_BACKTRACE", "1");
        std::env::set_var("RUST_LIB_BACKTRACE", "1");
    }

    let kernel = Kernel::new();

    kernel.add(async {
        let _ = deep_panic_site();
        Ok::<_, anyhow::Error>(())
    });

    let err = kernel.step().unwrap_err();
    let failure = err.failure().unwrap();

    assert!(failure.is_panic());
    let backtrace = failure
        .backtrace()
        .expect("panic backtrace should be captured");
    assert!(
        backtrace.to_string().contains("deep_panic_site"),
        "Backtrace should be recorded at the panic, got:\n{backtrace}"
    );

    kernel.add(async { deep_error_site() });

    let err = kernel.step().unwrap_err();
    let failure = err.failure().unwrap();

    assert!(!failure.is_panic());
    let backtrace = failure
        .backtrace()
        .expect("error backtrace should be captured");
    assert!(
        backtrace.to_string().contains("deep_error_site"),
        "Backtrace should be recorded where the error was built, got:\n{backtrace}"
    );
}
