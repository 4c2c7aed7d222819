//! Command-line inputs shared by the binaries.

use tracing::Level;

use crate::{OffloadError, Result};

/// Parses the vector-add problem size.
///
/// Must be present, a non-negative integer and fit the kernel's `int n`.
/// Zero is accepted and runs the empty pipeline.
pub fn parse_problem_size(arg: Option<&str>) -> Result<usize> {
    let raw = arg
        .map(str::trim)
        .ok_or_else(|| OffloadError::InvalidArgument("missing problem size N".into()))?;

    let n: i64 = raw
        .parse()
        .map_err(|_| OffloadError::InvalidArgument(format!("problem size `{raw}` is not an integer")))?;

    if n < 0 {
        return Err(OffloadError::InvalidArgument(format!("problem size {n} is negative")));
    }
    if n > i64::from(i32::MAX) {
        return Err(OffloadError::InvalidArgument(format!(
            "problem size {n} exceeds {}",
            i32::MAX
        )));
    }
    Ok(n as usize)
}

/// `-v` count → default log level. `RUST_LOG` still wins.
pub fn log_filter(verbosity: u8) -> Level {
    match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}
