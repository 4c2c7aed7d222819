//! Runs against a real GPU when one is present, otherwise skips.

use cl_offload::{live_buffers, run, ClSession, OffloadError, VEC_ADD};

fn open_or_skip() -> Option<ClSession> {
    match ClSession::open(&VEC_ADD) {
        Ok(s) => Some(s),
        Err(OffloadError::PlatformUnavailable | OffloadError::DeviceUnavailable { .. }) => {
            eprintln!("no OpenCL GPU, skipping");
            None
        }
        // cl_khr_fp64 is optional
        Err(e @ OffloadError::CompileFailure { .. }) => {
            eprintln!("{e}, skipping");
            None
        }
        Err(e) => panic!("OpenCL session failed: {e}"),
    }
}

#[test]
fn gpu_vec_add_matches_closed_form() {
    let Some(session) = open_or_skip() else { return };
    assert_eq!(session.kernel_name(), VEC_ADD.name);
    assert!(!session.platform_name().is_empty());
    assert!(!session.device_name().is_empty());

    for n in [1usize, 2, 4, 64, 65, 1000] {
        let report = run(&session, n).unwrap();
        assert_eq!(report.computed, report.expected as f64, "n = {n}");
    }
    assert_eq!(live_buffers(), 0);
}
