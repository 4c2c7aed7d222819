//! OpenCL offload primitives: a platform/GPU survey and a bounds-checked
//! `f64` vector-add pipeline that runs on an OpenCL GPU or on the host
//! emulator.

// ─── Module ──────────────────────────────────────────────────────────
pub mod backend;
pub mod buffer;
pub mod config;
pub mod enumerate;
pub mod grid;
pub mod host;
pub mod kernel;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod session;

pub use backend::{Access, Backend};
pub use buffer::{DeviceBuffer, InFlight, Queued, Ready, State};
pub use enumerate::{survey, Inventory};
pub use grid::{WorkGrid, LOCAL_WORK_SIZE};
pub use host::{FaultPoint, HostBackend};
pub use kernel::{KernelSource, VEC_ADD};
pub use metrics::live_buffers;
#[cfg(feature = "metrics")]
pub use metrics::{record, summary};
pub use pipeline::{run, VecAddReport};
pub use session::ClSession;

// ─── Fehler‑Typ ──────────────────────────────────────────────────────
#[derive(thiserror::Error, Debug)]
pub enum OffloadError {
    #[error("no OpenCL platform available")]
    PlatformUnavailable,
    #[error("no GPU device on platform `{platform}`")]
    DeviceUnavailable { platform: String },
    #[error("kernel `{kernel}` failed to build:\n{log}")]
    CompileFailure { kernel: &'static str, log: String },
    #[error("allocation of {bytes} bytes failed: {reason}")]
    AllocationFailure { bytes: usize, reason: String },
    #[error("{op} failed: {reason}")]
    ExecutionFailure { op: &'static str, reason: String },
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

pub type Result<T, E = OffloadError> = std::result::Result<T, E>;

/// `cl_khr_icd`: the loader found no platform at all.
pub(crate) const CL_PLATFORM_NOT_FOUND_KHR: opencl3::types::cl_int = -1001;

impl OffloadError {
    /// Wraps an OpenCL status for the named operation.
    #[inline]
    pub(crate) fn cl(op: &'static str) -> impl FnOnce(opencl3::error_codes::ClError) -> Self {
        move |err| OffloadError::ExecutionFailure {
            op,
            reason: format!("OpenCL status {}", err.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opencl3::error_codes::ClError;

    #[test]
    fn cl_status_keeps_operation_and_code() {
        let err = OffloadError::cl("enqueue kernel")(ClError(-5));
        assert_eq!(err.to_string(), "enqueue kernel failed: OpenCL status -5");
    }

    #[test]
    fn compile_failure_carries_build_log() {
        let err = OffloadError::CompileFailure {
            kernel: "vec_add",
            log: "error: use of undeclared identifier 'x'".into(),
        };
        let msg = err.to_string();
        assert!(msg.starts_with("kernel `vec_add` failed to build"));
        assert!(msg.contains("undeclared identifier"));
    }
}
