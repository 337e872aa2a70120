mod common;

use braid::cancel::StopSource;
use braid::combinator::{until_all, until_all_settled, until_one, while_next};
use braid::generator::Generator;
use braid::operation::operation;
use braid::task::Task;
use braid::time::sleep;
use braid::{RuntimeBuilder, until_all, until_all_settled};

use common::{Probe, init_tracing, panic_message};

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// A child that sleeps for `ms`, bumps `finished`, then returns `value`.
fn child(ms: u64, value: u32, finished: &Arc<AtomicUsize>) -> Task<u32> {
    let finished = finished.clone();

    Task::new(async move {
        sleep(Duration::from_millis(ms)).await;
        finished.fetch_add(1, Ordering::SeqCst);
        value
    })
}

/// A child that sleeps for `ms`, bumps `finished`, then panics.
fn failing(ms: u64, message: &'static str, finished: &Arc<AtomicUsize>) -> Task<u32> {
    let finished = finished.clone();

    Task::new(async move {
        sleep(Duration::from_millis(ms)).await;
        finished.fetch_add(1, Ordering::SeqCst);
        panic!("{message}");
    })
}

#[test]
fn test_until_all_returns_values_in_order() {
    let rt = RuntimeBuilder::new().build();
    let finished = Arc::new(AtomicUsize::new(0));

    let children = vec![child(30, 1, &finished), child(5, 2, &finished), child(15, 3, &finished)];
    let values = rt.block_on(until_all(children));

    assert_eq!(values, vec![1, 2, 3]);
    assert_eq!(finished.load(Ordering::SeqCst), 3);
}

#[test]
fn test_until_all_runs_children_concurrently() {
    let rt = RuntimeBuilder::new().worker_threads(2).build();
    let finished = Arc::new(AtomicUsize::new(0));

    let start = Instant::now();
    let children: Vec<_> = (0..4).map(|i| child(50, i, &finished)).collect();
    rt.block_on(until_all(children));

    assert!(start.elapsed() < Duration::from_millis(190));
}

#[test]
fn test_until_all_raises_after_every_child_finished() {
    init_tracing();
    let rt = RuntimeBuilder::new().build();
    let finished = Arc::new(AtomicUsize::new(0));

    let children = vec![
        child(40, 1, &finished),
        failing(5, "child two failed", &finished),
        child(60, 3, &finished),
    ];

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| rt.block_on(until_all(children))));

    let payload = outcome.unwrap_err();
    assert_eq!(panic_message(&*payload), "child two failed");
    assert_eq!(finished.load(Ordering::SeqCst), 3);
}

#[test]
fn test_until_all_settled_keeps_faults_by_index() {
    let rt = RuntimeBuilder::new().build();
    let finished = Arc::new(AtomicUsize::new(0));

    let children = vec![
        child(10, 1, &finished),
        failing(1, "second", &finished),
        child(5, 3, &finished),
    ];

    let (values, faults) = rt.block_on(until_all_settled(children));

    assert_eq!(values, vec![Some(1), None, Some(3)]);
    assert!(faults[0].is_none());
    assert_eq!(faults[1].as_ref().and_then(|f| f.message()), Some("second"));
    assert!(faults[2].is_none());
}

#[test]
fn test_until_all_empty() {
    let rt = RuntimeBuilder::new().build();

    let (values, faults) = rt.block_on(until_all_settled(Vec::<Task<u32>>::new()));

    assert!(values.is_empty());
    assert!(faults.is_empty());
}

#[test]
fn test_until_one_returns_first_success() {
    let rt = RuntimeBuilder::new().build();
    let finished = Arc::new(AtomicUsize::new(0));

    let start = Instant::now();
    let children = vec![child(150, 1, &finished), child(5, 2, &finished), child(200, 3, &finished)];
    let winner = rt.block_on(until_one(children));

    assert_eq!(winner, 2);
    assert!(start.elapsed() < Duration::from_millis(150));

    // Losers are not cancelled; they finish and are discarded.
    thread::sleep(Duration::from_millis(300));
    assert_eq!(finished.load(Ordering::SeqCst), 3);
}

#[test]
fn test_until_one_skips_failures() {
    let rt = RuntimeBuilder::new().build();
    let finished = Arc::new(AtomicUsize::new(0));

    let children = vec![failing(1, "fast failure", &finished), child(20, 7, &finished)];

    assert_eq!(rt.block_on(until_one(children)), 7);
}

#[test]
fn test_until_one_all_fail_raises_first_by_index() {
    let rt = RuntimeBuilder::new().build();
    let finished = Arc::new(AtomicUsize::new(0));

    let children = vec![failing(30, "first", &finished), failing(1, "second", &finished)];

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| rt.block_on(until_one(children))));

    assert_eq!(panic_message(&*outcome.unwrap_err()), "first");
    assert_eq!(finished.load(Ordering::SeqCst), 2);
}

#[test]
fn test_until_one_empty_panics() {
    let rt = RuntimeBuilder::new().build();

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        rt.block_on(until_one(Vec::<Task<u32>>::new()))
    }));

    assert!(outcome.is_err());
}

#[test]
fn test_until_all_macro_heterogeneous() {
    let rt = RuntimeBuilder::new().build();

    let (number, text, flag) = rt.block_on(async {
        until_all!(
            async { 100u32 },
            async {
                sleep(Duration::from_millis(5)).await;
                String::from("text")
            },
            Task::new(async { true }),
        )
    });

    assert_eq!(number, 100);
    assert_eq!(text, "text");
    assert!(flag);
}

#[test]
fn test_until_all_settled_macro() {
    let rt = RuntimeBuilder::new().build();

    let ((first, second), faults) = rt.block_on(async {
        until_all_settled!(async { "ok" }, async {
            if true {
                panic!("macro child");
            }
            5u8
        })
    });

    assert_eq!(first, Some("ok"));
    assert_eq!(second, None);
    assert_eq!(faults[1].as_ref().and_then(|f| f.message()), Some("macro child"));
}

#[test]
fn test_parent_stop_reaches_children() {
    init_tracing();
    let rt = RuntimeBuilder::new().build();
    let source = StopSource::new();
    let probes: Vec<_> = (0..3).map(|_| Probe::new()).collect();

    let children: Vec<_> = probes
        .iter()
        .cloned()
        .map(|probe| async move {
            operation(probe, |probe, done| probe.park(done))
                .cancellable()
                .await
        })
        .collect();

    let mut parent = Task::new(until_all(children));
    parent.start_on(&rt, source.clone());

    for probe in &probes {
        probe.wait_parked();
    }
    source.request_stop();

    let outcomes = rt.block_on(parent);

    assert!(outcomes.iter().all(|r| matches!(r, Err(e) if e.is_aborted())));
    assert!(probes.iter().all(|p| p.cancels() == 1));
}

fn numbers(n: u32) -> Generator<u32, &'static str> {
    Generator::new(move |co| async move {
        for i in 0..n {
            co.yield_(i).await;
        }
        "generator done"
    })
}

#[test]
fn test_while_next_collects_every_item() {
    init_tracing();
    let rt = RuntimeBuilder::new().build();
    let collected = Arc::new(Mutex::new(Vec::new()));
    let calls = Arc::new(AtomicUsize::new(0));

    let (sink, counter) = (collected.clone(), calls.clone());
    let terminal = rt.block_on(while_next(
        numbers(5),
        |n| async move {
            sleep(Duration::from_millis(u64::from(5 - n))).await;
            n * n
        },
        move |fault, value| {
            let sink = sink.clone();
            let counter = counter.clone();
            async move {
                assert!(fault.is_none());
                sleep(Duration::from_millis(10)).await;
                sink.lock().unwrap().push(value.unwrap());
                counter.fetch_add(1, Ordering::SeqCst);
            }
        },
    ));

    assert_eq!(terminal, "generator done");

    // The parent resumed only after the last collector returned.
    assert_eq!(calls.load(Ordering::SeqCst), 5);

    let mut collected = collected.lock().unwrap().clone();
    collected.sort_unstable();
    assert_eq!(collected, vec![0, 1, 4, 9, 16]);
}

#[test]
fn test_while_next_reports_item_faults() {
    let rt = RuntimeBuilder::new().build();
    let faults = Arc::new(AtomicUsize::new(0));
    let values = Arc::new(AtomicUsize::new(0));

    let (f, v) = (faults.clone(), values.clone());
    rt.block_on(while_next(
        numbers(4),
        |n| async move {
            if n == 2 {
                panic!("item {n} failed");
            }
            n
        },
        move |fault, value| {
            match (fault, value) {
                (Some(_), None) => f.fetch_add(1, Ordering::SeqCst),
                (None, Some(_)) => v.fetch_add(1, Ordering::SeqCst),
                other => panic!("collector got {other:?}"),
            };
            async {}
        },
    ));

    assert_eq!(faults.load(Ordering::SeqCst), 1);
    assert_eq!(values.load(Ordering::SeqCst), 3);
}

#[test]
fn test_while_next_survives_collector_panic() {
    let rt = RuntimeBuilder::new().build();
    let calls = Arc::new(AtomicUsize::new(0));

    let counter = calls.clone();
    let terminal = rt.block_on(while_next(
        numbers(3),
        |n| async move { n },
        move |_, value| {
            counter.fetch_add(1, Ordering::SeqCst);
            async move {
                if value == Some(1) {
                    panic!("collector rejected 1");
                }
            }
        },
    ));

    assert_eq!(terminal, "generator done");
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[test]
fn test_while_next_empty_generator() {
    let rt = RuntimeBuilder::new().build();

    let terminal = rt.block_on(while_next(
        numbers(0),
        |n| async move { n },
        |_, _| async {},
    ));

    assert_eq!(terminal, "generator done");
}

#[test]
fn test_while_next_raises_generator_fault_after_drain() {
    let rt = RuntimeBuilder::new().build();
    let calls = Arc::new(AtomicUsize::new(0));

    let faulty: Generator<u32> = Generator::new(|co| async move {
        co.yield_(1).await;
        co.yield_(2).await;
        panic!("generator broke");
    });

    let counter = calls.clone();
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        rt.block_on(while_next(
            faulty,
            |n| async move {
                sleep(Duration::from_millis(10)).await;
                n
            },
            move |_, _| {
                counter.fetch_add(1, Ordering::SeqCst);
                async {}
            },
        ))
    }));

    assert_eq!(panic_message(&*outcome.unwrap_err()), "generator broke");
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}
