//! Every failure point must leave the allocation ledger balanced.
//!
//! Kept as a single test: the process-wide live-buffer counter is shared.

use cl_offload::{live_buffers, run, FaultPoint, HostBackend, OffloadError};

fn assert_balanced(backend: &HostBackend, what: &str) {
    assert_eq!(backend.allocated(), backend.released(), "{what}: ledger unbalanced");
    assert_eq!(live_buffers(), 0, "{what}: live buffers left behind");
}

#[test]
fn every_fault_point_releases_what_it_acquired() {
    let cases = [
        (FaultPoint::Allocation { nth: 0 }, 0),
        (FaultPoint::Allocation { nth: 1 }, 1),
        (FaultPoint::Allocation { nth: 2 }, 2),
        (FaultPoint::Write, 1),
        (FaultPoint::Dispatch, 3),
        (FaultPoint::Finish, 3),
        (FaultPoint::Read, 3),
    ];

    for (fault, expect_allocated) in cases {
        let backend = HostBackend::failing_at(fault);
        let err = run(&backend, 100).unwrap_err();

        match fault {
            FaultPoint::Allocation { .. } => {
                assert!(matches!(err, OffloadError::AllocationFailure { .. }), "{fault:?}: {err}")
            }
            _ => assert!(matches!(err, OffloadError::ExecutionFailure { .. }), "{fault:?}: {err}"),
        }
        assert_eq!(backend.allocated(), expect_allocated, "{fault:?}");
        assert_balanced(&backend, &format!("{fault:?}"));
    }

    let backend = HostBackend::new();
    let report = run(&backend, 100).unwrap();
    assert!(report.matches());
    assert_balanced(&backend, "clean run");
}
