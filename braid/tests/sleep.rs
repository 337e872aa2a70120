use braid::time::{TimerHandle, sleep};
use braid::RuntimeBuilder;
use braid::task::Task;
use std::future::{Future, poll_fn};
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::task::Poll;
use std::time::{Duration, Instant};

#[braid::test]
async fn test_sleep_basic() {
    let start = Instant::now();
    sleep(Duration::from_millis(50)).await;
    let elapsed = start.elapsed();

    assert!(
        elapsed >= Duration::from_millis(50),
        "Sleep should wait at least the specified duration"
    );
}

#[braid::test]
async fn test_sleep_zero_duration() {
    let start = Instant::now();
    sleep(Duration::from_millis(0)).await;
    let elapsed = start.elapsed();

    assert!(
        elapsed < Duration::from_millis(10),
        "Zero duration sleep should be fast"
    );
}

#[braid::test(worker_threads = 1)]
async fn test_sleeps_overlap() {
    let start = Instant::now();

    let a = Task::new(sleep(Duration::from_millis(40)));
    let b = Task::new(sleep(Duration::from_millis(40)));
    braid::until_all!(a, b);

    assert!(start.elapsed() < Duration::from_millis(75));
}

#[braid::test]
async fn test_sleep_in_generator_body() {
    let mut ticks = braid::generator::Generator::new(|co| async move {
        sleep(Duration::from_millis(10)).await;
        co.yield_(()).await;
    });

    let start = Instant::now();
    assert_eq!(ticks.next().await, Some(()));
    assert!(start.elapsed() >= Duration::from_millis(10));
    assert_eq!(ticks.next().await, None);
}

#[test]
fn test_schedule_runs_callback() {
    let rt = RuntimeBuilder::new().build();
    let fired = Arc::new(AtomicUsize::new(0));

    let counter = fired.clone();
    let _guard = rt
        .timer()
        .schedule(Instant::now() + Duration::from_millis(10), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

    thread::sleep(Duration::from_millis(60));
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

#[test]
fn test_cancelled_timer_never_fires() {
    let rt = RuntimeBuilder::new().build();
    let fired = Arc::new(AtomicUsize::new(0));

    let counter = fired.clone();
    let guard = rt
        .timer()
        .schedule(Instant::now() + Duration::from_millis(20), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

    guard.cancel();
    assert!(guard.is_cancelled());

    thread::sleep(Duration::from_millis(60));
    assert_eq!(fired.load(Ordering::SeqCst), 0);
}

#[test]
fn test_cancel_releases_callback_immediately() {
    let rt = RuntimeBuilder::new().build();
    let captured = Arc::new(AtomicUsize::new(0));

    let guards: Vec<_> = (0..200)
        .map(|_| {
            let captured = captured.clone();
            rt.timer()
                .schedule(Instant::now() + Duration::from_secs(3600), move || {
                    captured.fetch_add(1, Ordering::SeqCst);
                })
        })
        .collect();

    assert_eq!(Arc::strong_count(&captured), 201);

    for guard in &guards {
        guard.cancel();
    }

    assert_eq!(Arc::strong_count(&captured), 1);
    assert_eq!(captured.load(Ordering::SeqCst), 0);
}

#[test]
fn test_unbounded_sleep_stays_pending() {
    let rt = RuntimeBuilder::new().build();

    let pending = rt.block_on(async {
        let mut forever = sleep(Duration::MAX);
        assert!(forever.deadline().is_none());

        poll_fn(|cx| Poll::Ready(Pin::new(&mut forever).poll(cx).is_pending())).await
    });

    assert!(pending);
}

#[test]
fn test_timers_fire_in_deadline_order() {
    let rt = RuntimeBuilder::new().build();
    let order = Arc::new(std::sync::Mutex::new(Vec::new()));
    let now = Instant::now();

    let guards: Vec<_> = [30u64, 10, 20]
        .into_iter()
        .map(|ms| {
            let order = order.clone();
            rt.timer()
                .schedule(now + Duration::from_millis(ms), move || order.lock().unwrap().push(ms))
        })
        .collect();

    thread::sleep(Duration::from_millis(80));
    assert_eq!(*order.lock().unwrap(), vec![10, 20, 30]);
    drop(guards);
}

#[test]
fn test_current_timer_outside_runtime() {
    assert!(TimerHandle::current().is_none());

    let rt = RuntimeBuilder::new().build();
    assert!(rt.block_on(async { TimerHandle::current().is_some() }));
}
