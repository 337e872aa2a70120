mod common;

use braid::cancel::StopSource;
use braid::task::{self, JoinHandle, Task};
use braid::{RuntimeBuilder, yield_now};

use common::panic_message;

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

#[test]
fn test_task_is_lazy() {
    let rt = RuntimeBuilder::new().worker_threads(2).build();
    let ran = Arc::new(AtomicBool::new(false));

    let flag = ran.clone();
    let task = Task::new(async move {
        flag.store(true, Ordering::SeqCst);
        5
    });

    thread::sleep(Duration::from_millis(20));
    assert!(!ran.load(Ordering::SeqCst));
    assert!(!task.is_started());

    assert_eq!(task.start_join(&rt), 5);
    assert!(ran.load(Ordering::SeqCst));
}

#[test]
fn test_await_runs_body_inline() {
    let rt = RuntimeBuilder::new().build();

    let result = rt.block_on(async {
        let inner = Task::new(async { 40 });
        inner.await + 2
    });

    assert_eq!(result, 42);
}

#[test]
fn test_nested_awaits_chain() {
    let rt = RuntimeBuilder::new().build();

    fn depth(n: u32) -> Task<u32> {
        Task::new(async move {
            match n {
                0 => 0,
                n => depth(n - 1).await + 1,
            }
        })
    }

    assert_eq!(depth(64).start_join(&rt), 64);
}

#[test]
fn test_start_then_await() {
    let rt = RuntimeBuilder::new().build();

    let result = rt.block_on(async {
        let mut task = Task::new(async {
            yield_now().await;
            "done"
        });

        task.start(StopSource::new());
        assert!(task.is_started());

        task.await
    });

    assert_eq!(result, "done");
}

#[test]
fn test_result_observed_exactly_once() {
    let rt = RuntimeBuilder::new().build();

    let mut task = Task::new(async { String::from("value") });
    task.start_on(&rt, StopSource::new());

    while !task.is_done() {
        thread::sleep(Duration::from_millis(1));
    }

    assert_eq!(task.result(), "value");

    let second = panic::catch_unwind(AssertUnwindSafe(|| task.result()));
    assert!(second.is_err(), "second result() must be a logic error");
}

#[test]
fn test_result_before_completion_panics() {
    let mut task = Task::new(async { 1 });

    let early = panic::catch_unwind(AssertUnwindSafe(|| task.result()));
    assert!(early.is_err());
    assert!(!task.is_started());
}

#[test]
#[should_panic(expected = "task already started")]
fn test_double_start_panics() {
    let rt = RuntimeBuilder::new().build();

    let mut task = Task::new(async {});
    task.start_on(&rt, StopSource::new());
    task.start_on(&rt, StopSource::new());
}

#[test]
fn test_panic_rethrown_at_await() {
    let rt = RuntimeBuilder::new().build();

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        rt.block_on(async {
            let failing: Task<u32> = Task::new(async { panic!("body exploded") });
            failing.await
        })
    }));

    let payload = outcome.unwrap_err();
    assert_eq!(panic_message(&*payload), "body exploded");
}

#[test]
fn test_panic_rethrown_by_start_join() {
    let rt = RuntimeBuilder::new().build();

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        Task::<()>::new(async {
            yield_now().await;
            panic!("late failure");
        })
        .start_join(&rt)
    }));

    let payload = outcome.unwrap_err();
    assert_eq!(panic_message(&*payload), "late failure");
}

#[test]
fn test_panic_rethrown_by_result() {
    let rt = RuntimeBuilder::new().build();

    let mut task: Task<()> = Task::new(async { panic!("stored") });
    task.start_on(&rt, StopSource::never());

    while !task.is_done() {
        thread::sleep(Duration::from_millis(1));
    }

    let payload = panic::catch_unwind(AssertUnwindSafe(|| task.result())).unwrap_err();
    assert_eq!(panic_message(&*payload), "stored");
}

#[test]
fn test_runtime_survives_task_panic() {
    let rt = RuntimeBuilder::new().worker_threads(1).build();

    let failed = panic::catch_unwind(AssertUnwindSafe(|| {
        rt.block_on(async {
            if true {
                panic!("first");
            }
        })
    }));
    assert!(failed.is_err());

    assert_eq!(rt.block_on(async { 7 }), 7);
}

#[test]
fn test_awaited_task_inherits_stop() {
    let rt = RuntimeBuilder::new().build();
    let source = StopSource::new();

    let mut outer = Task::new(async {
        let inner = Task::new(async { task::current_stop().expect("inside a task") });
        inner.await
    });
    outer.start_on(&rt, source.clone());

    let inherited = rt.block_on(outer);

    assert!(inherited.stop_possible());
    assert!(!inherited.stop_requested());

    source.request_stop();
    assert!(inherited.stop_requested());
}

#[test]
fn test_inner_stop_does_not_travel_upward() {
    let rt = RuntimeBuilder::new().build();
    let source = StopSource::new();

    let mut outer = Task::new(async {
        let inner = Task::new(async {
            let own = task::current_stop().expect("inside a task");
            own.request_stop();
        });
        inner.await;

        task::current_stop()
            .expect("inside a task")
            .stop_requested()
    });
    outer.start_on(&rt, source.clone());

    assert!(!rt.block_on(outer));
    assert!(!source.stop_requested());
}

#[test]
fn test_never_source_disables_cancellation() {
    let rt = RuntimeBuilder::new().build();

    let mut task = Task::new(async { task::current_stop().map(|s| s.stop_possible()) });
    task.start_on(&rt, StopSource::never());

    assert_eq!(rt.block_on(task), Some(false));
}

#[test]
fn test_request_stop_through_task() {
    let rt = RuntimeBuilder::new().build();
    let observed = Arc::new(AtomicUsize::new(0));

    let seen = observed.clone();
    let mut task = Task::new(async move {
        let stop = task::current_stop().expect("inside a task");

        while !stop.stop_requested() {
            yield_now().await;
        }

        seen.fetch_add(1, Ordering::SeqCst);
    });

    assert!(!task.request_stop(), "no source before start");

    task.start_on(&rt, StopSource::new());
    assert!(task.request_stop());
    assert!(!task.request_stop());

    rt.block_on(task);
    assert_eq!(observed.load(Ordering::SeqCst), 1);
}

#[test]
fn test_spawn_join_handle_reports_fault() {
    let rt = RuntimeBuilder::new().build();

    let outcome = rt.block_on(async {
        let handle: JoinHandle<()> = task::spawn(async { panic!("detached") });
        handle.await
    });

    let fault = outcome.unwrap_err();
    assert_eq!(fault.message(), Some("detached"));
}
