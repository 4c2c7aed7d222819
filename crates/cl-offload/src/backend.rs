//! Seam between pipeline orchestration and a concrete accelerator.

use crate::{grid::WorkGrid, Result};

/// Device-side access mode declared at allocation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

/// One open device session with a single in-order queue.
///
/// Transfers are blocking. `enqueue_vec_add` only submits work; `finish`
/// is the one explicit wait.
pub trait Backend {
    /// Raw device allocation. Dropping it releases the memory.
    type Buffer;

    fn describe(&self) -> String;

    fn alloc(&self, bytes: usize, access: Access) -> Result<Self::Buffer>;

    fn write_blocking(&self, buf: &mut Self::Buffer, host: &[f64]) -> Result<()>;

    fn enqueue_vec_add(
        &self,
        c: &mut Self::Buffer,
        a: &Self::Buffer,
        b: &Self::Buffer,
        n: usize,
        grid: WorkGrid,
    ) -> Result<()>;

    fn finish(&self) -> Result<()>;

    fn read_blocking(&self, buf: &Self::Buffer, host: &mut [f64]) -> Result<()>;
}
