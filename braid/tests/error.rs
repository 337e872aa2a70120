mod common;

use braid::operation::operation;
use braid::{Error, ResultExt, RuntimeBuilder};

use common::Probe;

use std::io;
use std::panic::{self, AssertUnwindSafe};

#[test]
fn test_result_accessors() {
    let ok: braid::Result<u32> = Ok(4);
    let err: braid::Result<u32> = Err(Error::Timeout);

    assert!(ok.has_value() && !ok.has_error());
    assert!(err.has_error() && !err.has_value());
    assert_eq!(ok.value(), 4);
}

#[test]
#[should_panic(expected = "value() called on a result holding an error")]
fn test_value_of_error_panics() {
    let err: braid::Result<u32> = Err(Error::Aborted);
    err.value();
}

#[test]
fn test_error_display() {
    assert_eq!(Error::Timeout.to_string(), "operation timed out");
    assert_eq!(Error::Aborted.to_string(), "operation aborted");

    let other = Error::other("quota exceeded");
    assert_eq!(other.to_string(), "quota exceeded");
    assert!(!other.is_timeout() && !other.is_aborted());
}

#[test]
fn test_question_mark_short_circuits_in_task_body() {
    let rt = RuntimeBuilder::new().build();
    let probe = Probe::new();

    let result: braid::Result<u32> = rt.block_on(async move {
        let first: u32 = operation(probe.clone(), |_, done| done.succeed(1)).await?;
        let second: u32 = operation(probe, |_, done| {
            done.fail(io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed"))
        })
        .await?;

        Ok::<_, Error>(first + second + 100)
    });

    match result {
        Err(Error::Io(err)) => assert_eq!(err.kind(), io::ErrorKind::BrokenPipe),
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[test]
fn test_value_or_throw_becomes_fault() {
    let rt = RuntimeBuilder::new().build();

    let handle = rt.spawn(async {
        let failed: braid::Result<u32> = Err(Error::Timeout);
        failed.value_or_throw()
    });

    let fault = rt.block_on(handle).unwrap_err();

    assert!(fault.is::<Error>());
    assert!(fault.downcast_ref::<Error>().is_some_and(Error::is_timeout));
    assert_eq!(fault.message(), None);
    assert_eq!(fault.to_string(), "task raised: operation timed out");
}

#[test]
fn test_fault_resumes_original_payload() {
    let rt = RuntimeBuilder::new().build();

    let handle = rt.spawn(async {
        if true {
            panic!("disk full");
        }
    });

    let fault = rt.block_on(handle).unwrap_err();
    assert_eq!(fault.message(), Some("disk full"));
    assert_eq!(fault.to_string(), "task panicked: disk full");

    let payload = panic::catch_unwind(AssertUnwindSafe(|| fault.resume())).unwrap_err();
    assert_eq!(payload.downcast_ref::<&str>(), Some(&"disk full"));
}
