//! Platform / GPU survey. No kernel runs.

use std::fmt;

use opencl3::{
    device::{Device, CL_DEVICE_TYPE_GPU},
    error_codes::{ClError, CL_DEVICE_NOT_FOUND},
    platform::get_platforms,
};
use tracing::debug;

use crate::{OffloadError, Result, CL_PLATFORM_NOT_FOUND_KHR};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Inventory {
    pub platforms: usize,
    /// GPUs on the first platform only.
    pub gpu_devices: usize,
}

impl fmt::Display for Inventory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "There are {} ocl platforms", self.platforms)?;
        write!(f, "There are {} ocl GPU devices ", self.gpu_devices)
    }
}

/// Counts platforms and the GPUs of the first one. Zero platforms is a
/// valid answer, not an error.
pub fn survey() -> Result<Inventory> {
    let platforms = found_or_empty(get_platforms(), CL_PLATFORM_NOT_FOUND_KHR, "query platforms")?;
    for (i, p) in platforms.iter().enumerate() {
        debug!(index = i, name = %p.name().unwrap_or_default(), "platform");
    }

    let Some(first) = platforms.first() else {
        return Ok(Inventory::default());
    };

    let devices = found_or_empty(first.get_devices(CL_DEVICE_TYPE_GPU), CL_DEVICE_NOT_FOUND, "query GPU devices")?;
    for (i, id) in devices.iter().enumerate() {
        debug!(index = i, name = %Device::new(*id).name().unwrap_or_default(), "GPU device");
    }

    Ok(Inventory { platforms: platforms.len(), gpu_devices: devices.len() })
}

/// Maps the query's "nothing found" status to an empty list.
fn found_or_empty<T>(res: Result<Vec<T>, ClError>, not_found: i32, op: &'static str) -> Result<Vec<T>> {
    match res {
        Ok(v) => Ok(v),
        Err(e) if e.0 == not_found => Ok(Vec::new()),
        Err(e) => Err(OffloadError::cl(op)(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prints_both_counts() {
        let inv = Inventory { platforms: 2, gpu_devices: 1 };
        assert_eq!(inv.to_string(), "There are 2 ocl platforms\nThere are 1 ocl GPU devices ");
    }

    #[test]
    fn empty_host_prints_zeros() {
        assert_eq!(
            Inventory::default().to_string(),
            "There are 0 ocl platforms\nThere are 0 ocl GPU devices "
        );
    }

    #[test]
    fn not_found_status_counts_as_zero() {
        let res: Result<Vec<u8>, ClError> = Err(ClError(CL_PLATFORM_NOT_FOUND_KHR));
        assert!(found_or_empty(res, CL_PLATFORM_NOT_FOUND_KHR, "query platforms").unwrap().is_empty());

        let res: Result<Vec<u8>, ClError> = Err(ClError(CL_DEVICE_NOT_FOUND));
        assert!(found_or_empty(res, CL_DEVICE_NOT_FOUND, "query GPU devices").unwrap().is_empty());
    }

    #[test]
    fn other_status_propagates() {
        let res: Result<Vec<u8>, ClError> = Err(ClError(-6));
        let err = found_or_empty(res, CL_DEVICE_NOT_FOUND, "query GPU devices").unwrap_err();
        assert!(matches!(err, OffloadError::ExecutionFailure { op: "query GPU devices", .. }));
    }

    #[test]
    fn survey_never_panics() {
        // Any host: either counts come back or a typed error does.
        match survey() {
            Ok(inv) => assert!(inv.platforms > 0 || inv.gpu_devices == 0),
            Err(e) => assert!(matches!(e, OffloadError::ExecutionFailure { .. })),
        }
    }
}
