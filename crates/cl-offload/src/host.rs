//! CPU backend that emulates a single in-order OpenCL queue.
//!
//! The dispatched grid is walked lane by lane, padding lanes included, so
//! the bounds check in [`vec_add_lane`] is exercised exactly as on a GPU.
//! Each buffer carries [`LOCAL_WORK_SIZE`] canary lanes past its end.

use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use crate::{
    backend::{Access, Backend},
    grid::{WorkGrid, LOCAL_WORK_SIZE},
    kernel::vec_add_lane,
    OffloadError, Result,
};

const CANARY: u64 = 0x7ff8_dead_beef_0bad;

/// Where an injected failure fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultPoint {
    /// The `nth` allocation (0-based) fails.
    Allocation { nth: usize },
    Write,
    Dispatch,
    Finish,
    Read,
}

#[derive(Debug, Default)]
struct Ledger {
    allocated: Cell<usize>,
    released: Cell<usize>,
    /// Access mode of every allocation, in order.
    modes: RefCell<Vec<Access>>,
}

#[derive(Debug, Default)]
pub struct HostBackend {
    ledger: Rc<Ledger>,
    fault: Option<FaultPoint>,
}

impl HostBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_at(fault: FaultPoint) -> Self {
        Self { fault: Some(fault), ..Self::default() }
    }

    pub fn allocated(&self) -> usize {
        self.ledger.allocated.get()
    }

    pub fn released(&self) -> usize {
        self.ledger.released.get()
    }

    pub fn access_modes(&self) -> Vec<Access> {
        self.ledger.modes.borrow().clone()
    }

    fn inject(&self, point: FaultPoint, op: &'static str) -> Result<()> {
        if self.fault == Some(point) {
            return Err(OffloadError::ExecutionFailure { op, reason: "injected fault".into() });
        }
        Ok(())
    }
}

/// Host memory standing in for a device allocation.
#[derive(Debug)]
pub struct HostBuffer {
    data: Vec<f64>,
    len: usize,
    access: Access,
    ledger: Rc<Ledger>,
}

impl HostBuffer {
    /// Elements visible to the host.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn access(&self) -> Access {
        self.access
    }

    /// `true` while no lane has written past the end.
    pub fn guard_intact(&self) -> bool {
        self.data[self.len..].iter().all(|v| v.to_bits() == CANARY)
    }

    fn visible(&self) -> &[f64] {
        &self.data[..self.len]
    }
}

impl Drop for HostBuffer {
    fn drop(&mut self) {
        self.ledger.released.set(self.ledger.released.get() + 1);
    }
}

fn check_len(op: &'static str, buf: &HostBuffer, host_len: usize) -> Result<()> {
    if host_len != buf.len {
        return Err(OffloadError::ExecutionFailure {
            op,
            reason: format!("host slice has {host_len} elements, buffer {}", buf.len),
        });
    }
    Ok(())
}

impl Backend for HostBackend {
    type Buffer = HostBuffer;

    fn describe(&self) -> String {
        "host emulator".to_string()
    }

    fn alloc(&self, bytes: usize, access: Access) -> Result<HostBuffer> {
        let nth = self.ledger.allocated.get();
        if self.fault == Some(FaultPoint::Allocation { nth }) {
            return Err(OffloadError::AllocationFailure { bytes, reason: "injected fault".into() });
        }
        if bytes % size_of::<f64>() != 0 {
            return Err(OffloadError::AllocationFailure {
                bytes,
                reason: "size is not a whole number of doubles".into(),
            });
        }

        let len = bytes / size_of::<f64>();
        let mut data = Vec::new();
        data.try_reserve_exact(len + LOCAL_WORK_SIZE)
            .map_err(|e| OffloadError::AllocationFailure { bytes, reason: e.to_string() })?;
        data.resize(len + LOCAL_WORK_SIZE, f64::from_bits(CANARY));

        self.ledger.allocated.set(nth + 1);
        self.ledger.modes.borrow_mut().push(access);
        Ok(HostBuffer { data, len, access, ledger: Rc::clone(&self.ledger) })
    }

    fn write_blocking(&self, buf: &mut HostBuffer, host: &[f64]) -> Result<()> {
        self.inject(FaultPoint::Write, "write buffer")?;
        check_len("write buffer", buf, host.len())?;
        buf.data[..buf.len].copy_from_slice(host);
        Ok(())
    }

    fn enqueue_vec_add(
        &self,
        c: &mut HostBuffer,
        a: &HostBuffer,
        b: &HostBuffer,
        n: usize,
        grid: WorkGrid,
    ) -> Result<()> {
        self.inject(FaultPoint::Dispatch, "enqueue kernel")?;
        if c.access() == Access::ReadOnly {
            return Err(OffloadError::ExecutionFailure {
                op: "enqueue kernel",
                reason: "output buffer c is read-only".into(),
            });
        }
        for (name, input) in [("a", a), ("b", b)] {
            if input.access() == Access::WriteOnly {
                return Err(OffloadError::ExecutionFailure {
                    op: "enqueue kernel",
                    reason: format!("input buffer {name} is write-only"),
                });
            }
        }
        if grid.global > c.data.len() || grid.global > a.data.len() || grid.global > b.data.len() {
            return Err(OffloadError::ExecutionFailure {
                op: "enqueue kernel",
                reason: format!("grid of {} lanes overruns the emulated guard", grid.global),
            });
        }
        for id in 0..grid.global {
            vec_add_lane(id, n, &mut c.data, &a.data, &b.data);
        }
        Ok(())
    }

    fn finish(&self) -> Result<()> {
        self.inject(FaultPoint::Finish, "finish queue")
    }

    fn read_blocking(&self, buf: &HostBuffer, host: &mut [f64]) -> Result<()> {
        self.inject(FaultPoint::Read, "read buffer")?;
        check_len("read buffer", buf, host.len())?;
        host.copy_from_slice(buf.visible());
        Ok(())
    }
}
