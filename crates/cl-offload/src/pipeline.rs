//! Vector-add offload: host prep → transfer → dispatch → wait → read back
//! → verify.
//!
//! Every step returns early on failure. Device buffers are released
//! before the host arrays they mirror, on success and on every error path.

use std::fmt;

use tracing::{debug, info};

use crate::{
    backend::{Access, Backend},
    buffer::DeviceBuffer,
    grid::WorkGrid,
    OffloadError, Result,
};

/// Outcome of one run. Verification is informational only.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VecAddReport {
    pub n: usize,
    pub grid: WorkGrid,
    /// `n * (n - 1)`, the closed form of `sum(2i)`.
    pub expected: u64,
    pub computed: f64,
}

impl VecAddReport {
    pub fn matches(&self) -> bool {
        self.computed == self.expected as f64
    }
}

impl fmt::Display for VecAddReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Sum should equal {}", self.expected)?;
        write!(f, "Sum equals: {}", self.computed)
    }
}

pub fn expected_sum(n: usize) -> u64 {
    let n = n as u64;
    n * n.saturating_sub(1)
}

/// Runs the whole pipeline for `n` elements on an open backend.
pub fn run<B: Backend>(backend: &B, n: usize) -> Result<VecAddReport> {
    let (grid, c) = offload(backend, n)?;

    // start at +0.0 so n = 0 prints `0`, not `-0`
    let computed = c.iter().fold(0.0_f64, |acc, x| acc + x);
    let report = VecAddReport { n, grid, expected: expected_sum(n), computed };
    info!(n, expected = report.expected, computed, matches = report.matches(), "verified");
    Ok(report)
}

/// Steps 1–8: returns the grid used and the host copy of `c`.
pub(crate) fn offload<B: Backend>(backend: &B, n: usize) -> Result<(WorkGrid, Vec<f64>)> {
    // 1. Hostdaten
    let a = host_array(n, |i| i as f64)?;
    let b = host_array(n, |i| i as f64)?;
    let mut c = host_array(n, |_| 0.0)?;

    // 2. Grid
    let grid = WorkGrid::for_len(n);
    debug!(n, global = grid.global, local = grid.local, groups = grid.groups(), "work grid");

    if grid.is_empty() {
        debug!("empty problem, nothing to dispatch");
        return Ok((grid, c));
    }

    debug!(device = %backend.describe(), "offloading vec_add");

    // 5. Device-Buffer + H2D
    let a_dev = DeviceBuffer::for_f64(backend, n, Access::ReadOnly)?.write(backend, &a)?;
    let b_dev = DeviceBuffer::for_f64(backend, n, Access::ReadOnly)?.write(backend, &b)?;
    let c_dev = DeviceBuffer::for_f64(backend, n, Access::WriteOnly)?;

    // 6./7. Dispatch, dann einziger Wartepunkt
    let c_dev = c_dev.launch(backend, &a_dev, &b_dev, n, grid)?.complete(backend)?;

    // 8. D2H
    c_dev.read(backend, &mut c)?;

    drop((a_dev, b_dev, c_dev));
    Ok((grid, c))
}

fn host_array(n: usize, init: impl Fn(usize) -> f64) -> Result<Vec<f64>> {
    let mut v = Vec::new();
    v.try_reserve_exact(n).map_err(|e| OffloadError::AllocationFailure {
        bytes: n.saturating_mul(size_of::<f64>()),
        reason: e.to_string(),
    })?;
    v.extend((0..n).map(init));
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{FaultPoint, HostBackend};

    #[test]
    fn sums_match_closed_form() {
        for n in [0usize, 1, 2, 64, 65, 1000] {
            let backend = HostBackend::new();
            let report = run(&backend, n).unwrap();
            assert_eq!(report.expected, expected_sum(n));
            assert_eq!(report.computed, report.expected as f64, "n = {n}");
            assert!(report.matches());
        }
    }

    #[test]
    fn four_elements_end_to_end() {
        let backend = HostBackend::new();
        let (grid, c) = offload(&backend, 4).unwrap();
        assert_eq!(grid, WorkGrid { global: 64, local: 64 });
        assert_eq!(c, vec![0.0, 2.0, 4.0, 6.0]);

        let report = run(&backend, 4).unwrap();
        assert_eq!(report.to_string(), "Sum should equal 12\nSum equals: 12");
    }

    #[test]
    fn zero_elements_touch_no_device_memory() {
        let backend = HostBackend::new();
        let report = run(&backend, 0).unwrap();
        assert_eq!(report.expected, 0);
        assert_eq!(report.computed, 0.0);
        assert_eq!(backend.allocated(), 0);
        assert_eq!(report.to_string(), "Sum should equal 0\nSum equals: 0");
    }

    #[test]
    fn successful_run_releases_all_three_buffers() {
        let backend = HostBackend::new();
        run(&backend, 65).unwrap();
        assert_eq!(backend.allocated(), 3);
        assert_eq!(backend.released(), 3);
    }

    #[test]
    fn inputs_read_only_output_write_only() {
        let backend = HostBackend::new();
        run(&backend, 65).unwrap();
        assert_eq!(
            backend.access_modes(),
            [Access::ReadOnly, Access::ReadOnly, Access::WriteOnly]
        );
    }

    #[test]
    fn large_n_expected_sum_does_not_overflow() {
        let n = i32::MAX as usize;
        assert_eq!(expected_sum(n), (n as u64) * (n as u64 - 1));
    }

    #[test]
    fn mismatch_is_reported_not_raised() {
        let report = VecAddReport {
            n: 3,
            grid: WorkGrid::for_len(3),
            expected: 6,
            computed: 5.0,
        };
        assert!(!report.matches());
    }

    #[test]
    fn dispatch_fault_surfaces_as_execution_failure() {
        let backend = HostBackend::failing_at(FaultPoint::Dispatch);
        let err = run(&backend, 10).unwrap_err();
        assert!(matches!(err, OffloadError::ExecutionFailure { op: "enqueue kernel", .. }));
    }
}
