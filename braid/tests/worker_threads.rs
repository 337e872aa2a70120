use braid::RuntimeBuilder;
use braid::task::spawn;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::thread;

#[test]
fn test_single_worker_thread() {
    let rt = RuntimeBuilder::new().worker_threads(1).build();

    let result = rt.block_on(async { 42 });
    assert_eq!(result, 42);
}

#[test]
fn test_worker_threads_parallel_execution() {
    let rt = RuntimeBuilder::new().worker_threads(4).build();

    let results = Arc::new(Mutex::new(Vec::new()));
    let results_clone = results.clone();

    let doubled = rt.block_on(async move {
        let handles: Vec<_> = (0..10)
            .map(|i| {
                let results = results_clone.clone();

                spawn(async move {
                    results.lock().unwrap().push(i);
                    i * 2
                })
            })
            .collect();

        let mut doubled = 0;
        for handle in handles {
            doubled += handle.await.unwrap();
        }
        doubled
    });

    assert_eq!(doubled, 90);
    assert_eq!(results.lock().unwrap().len(), 10);
}

#[test]
fn test_worker_threads_chain_spawn() {
    let rt = RuntimeBuilder::new().worker_threads(4).build();

    let result = rt.block_on(async {
        let handle1 = spawn(async {
            let handle2 = spawn(async {
                let handle3 = spawn(async { 10 });
                handle3.await.unwrap() + 20
            });
            handle2.await.unwrap() + 30
        });
        handle1.await.unwrap() + 40
    });

    assert_eq!(result, 100);
}

#[test]
fn test_worker_threads_are_named() {
    let rt = RuntimeBuilder::new()
        .worker_threads(3)
        .thread_name("ingest")
        .build();

    let names = rt.block_on(async {
        let handles: Vec<_> = (0..30)
            .map(|_| spawn(async { thread::current().name().map(str::to_owned) }))
            .collect();

        let mut names = HashSet::new();
        for handle in handles {
            if let Some(name) = handle.await.unwrap() {
                names.insert(name);
            }
        }
        names
    });

    assert!(!names.is_empty());
    assert!(names.iter().all(|n| n.starts_with("ingest-worker-")));
}

#[test]
#[should_panic(expected = "worker_threads must be > 0")]
fn test_worker_threads_zero_panics() {
    let _ = RuntimeBuilder::new().worker_threads(0).build();
}

#[test]
fn test_worker_threads_sequential_runtimes() {
    for n in 1..=4 {
        let rt = RuntimeBuilder::new().worker_threads(n).build();
        let result = rt.block_on(async move { n * 10 });
        assert_eq!(result, n * 10);
        drop(rt);
    }
}

#[test]
fn test_runtime_drop_with_pending_tasks() {
    let rt = RuntimeBuilder::new().worker_threads(2).build();

    // Never completes; dropping the runtime must not hang on it.
    let _handle = rt.spawn(std::future::pending::<()>());

    drop(rt);
}
