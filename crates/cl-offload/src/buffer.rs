//! Typestate wrapper over backend buffers.
//!
//! `Queued` (allocated, contents undefined) → `write` → `Ready`
//! `Queued` → `launch` → `InFlight` → `complete` → `Ready`
//!
//! Only `Ready` buffers can feed a kernel or be read back. Dropping a
//! buffer in any state releases it exactly once.

use std::marker::PhantomData;

#[cfg(feature = "metrics")]
use crate::metrics::record;
#[cfg(feature = "metrics")]
use std::time::Instant;

use crate::{
    backend::{Access, Backend},
    grid::WorkGrid,
    metrics, OffloadError, Result,
};

// ─── Typ‑State‑Marker ────────────────────────────────────────────────
mod sealed {
    pub trait Sealed {}
}

pub trait State: sealed::Sealed {}

pub struct Queued;
impl sealed::Sealed for Queued {}
impl State for Queued {}

pub struct InFlight;
impl sealed::Sealed for InFlight {}
impl State for InFlight {}

pub struct Ready;
impl sealed::Sealed for Ready {}
impl State for Ready {}

// ─── Release guard ───────────────────────────────────────────────────
struct Tracked<T> {
    raw: T,
    bytes: usize,
}

impl<T> Drop for Tracked<T> {
    fn drop(&mut self) {
        metrics::note_release(self.bytes);
        tracing::trace!(bytes = self.bytes, "device buffer released");
    }
}

// ─── Buffer ──────────────────────────────────────────────────────────
pub struct DeviceBuffer<B: Backend, S: State> {
    inner: Tracked<B::Buffer>,
    access: Access,
    _state: PhantomData<S>,
}

impl<B: Backend, S: State> std::fmt::Debug for DeviceBuffer<B, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceBuffer")
            .field("bytes", &self.inner.bytes)
            .field("access", &self.access)
            .field("state", &std::any::type_name::<S>())
            .finish()
    }
}

impl<B: Backend, S: State> DeviceBuffer<B, S> {
    #[inline(always)]
    fn transition<T: State>(self) -> DeviceBuffer<B, T> {
        DeviceBuffer { inner: self.inner, access: self.access, _state: PhantomData }
    }

    #[inline(always)]
    pub fn raw(&self) -> &B::Buffer {
        &self.inner.raw
    }

    /// Size in bytes.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.inner.bytes
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.inner.bytes == 0
    }

    #[inline(always)]
    pub fn access(&self) -> Access {
        self.access
    }

    fn check_host_len(&self, op: &'static str, host_len: usize) -> Result<()> {
        let host_bytes = host_len * size_of::<f64>();
        if host_bytes != self.inner.bytes {
            return Err(OffloadError::ExecutionFailure {
                op,
                reason: format!("host slice is {host_bytes} bytes, device buffer {}", self.inner.bytes),
            });
        }
        Ok(())
    }
}

// ── Queued ───────────────────────────────────────────────────────────
impl<B: Backend> DeviceBuffer<B, Queued> {
    pub fn alloc(backend: &B, bytes: usize, access: Access) -> Result<Self> {
        if bytes == 0 {
            return Err(OffloadError::AllocationFailure {
                bytes,
                reason: "zero-length device buffer".into(),
            });
        }

        #[cfg(feature = "metrics")]
        let t = Instant::now();

        let raw = backend.alloc(bytes, access)?;

        #[cfg(feature = "metrics")]
        record("alloc", t);

        metrics::note_alloc(bytes);
        tracing::trace!(bytes, ?access, "device buffer allocated");

        Ok(Self { inner: Tracked { raw, bytes }, access, _state: PhantomData })
    }

    /// Allocates room for `len` doubles.
    pub fn for_f64(backend: &B, len: usize, access: Access) -> Result<Self> {
        let bytes = len.checked_mul(size_of::<f64>()).ok_or_else(|| OffloadError::AllocationFailure {
            bytes: usize::MAX,
            reason: format!("{len} doubles overflow usize"),
        })?;
        Self::alloc(backend, bytes, access)
    }

    /// Blocking host → device copy.
    pub fn write(mut self, backend: &B, host: &[f64]) -> Result<DeviceBuffer<B, Ready>> {
        self.check_host_len("write buffer", host.len())?;

        #[cfg(feature = "metrics")]
        let t = Instant::now();

        backend.write_blocking(&mut self.inner.raw, host)?;

        #[cfg(feature = "metrics")]
        record("write_blocking", t);

        Ok(self.transition())
    }

    /// Submits `vec_add` with `self` as the output buffer `c`.
    pub fn launch(
        mut self,
        backend: &B,
        a: &DeviceBuffer<B, Ready>,
        b: &DeviceBuffer<B, Ready>,
        n: usize,
        grid: WorkGrid,
    ) -> Result<DeviceBuffer<B, InFlight>> {
        #[cfg(feature = "metrics")]
        let t = Instant::now();

        backend.enqueue_vec_add(&mut self.inner.raw, a.raw(), b.raw(), n, grid)?;

        #[cfg(feature = "metrics")]
        record("enqueue_vec_add", t);

        Ok(self.transition())
    }
}

// ── InFlight ─────────────────────────────────────────────────────────
impl<B: Backend> DeviceBuffer<B, InFlight> {
    /// Waits for the whole queue, not just this buffer's kernel.
    pub fn complete(self, backend: &B) -> Result<DeviceBuffer<B, Ready>> {
        #[cfg(feature = "metrics")]
        let t = Instant::now();

        backend.finish()?;

        #[cfg(feature = "metrics")]
        record("finish", t);

        Ok(self.transition())
    }
}

// ── Ready → Host ─────────────────────────────────────────────────────
impl<B: Backend> DeviceBuffer<B, Ready> {
    /// Blocking device → host copy.
    pub fn read(&self, backend: &B, host_out: &mut [f64]) -> Result<()> {
        self.check_host_len("read buffer", host_out.len())?;

        #[cfg(feature = "metrics")]
        let t = Instant::now();

        backend.read_blocking(&self.inner.raw, host_out)?;

        #[cfg(feature = "metrics")]
        record("read_blocking", t);

        Ok(())
    }
}
