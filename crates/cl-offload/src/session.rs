//! OpenCL backend: first platform, first GPU, one in-order queue.

use std::ptr;

use bytemuck::{cast_slice, cast_slice_mut};
use opencl3::{
    command_queue::CommandQueue,
    context::Context,
    device::{Device, CL_DEVICE_TYPE_GPU},
    error_codes::CL_DEVICE_NOT_FOUND,
    kernel::Kernel,
    memory::{Buffer, CL_MEM_READ_ONLY, CL_MEM_READ_WRITE, CL_MEM_WRITE_ONLY},
    platform::get_platforms,
    program::Program,
    types::{cl_int, CL_BLOCKING},
};
use tracing::{debug, info};

use crate::{
    backend::{Access, Backend},
    grid::WorkGrid,
    kernel::KernelSource,
    OffloadError, Result, CL_PLATFORM_NOT_FOUND_KHR,
};

/// One device session with the kernel already built.
///
/// Fields drop top to bottom: program, kernel, queue, context.
pub struct ClSession {
    _program: Program,
    kernel: Kernel,
    queue: CommandQueue,
    context: Context,
    kernel_name: &'static str,
    platform_name: String,
    device_name: String,
}

impl ClSession {
    pub fn open(source: &KernelSource) -> Result<Self> {
        // 1. Plattform & Gerät
        let platforms = match get_platforms() {
            Ok(p) => p,
            Err(e) if e.0 == CL_PLATFORM_NOT_FOUND_KHR => Vec::new(),
            Err(e) => return Err(OffloadError::cl("query platforms")(e)),
        };
        let platform = *platforms.first().ok_or(OffloadError::PlatformUnavailable)?;
        let platform_name = platform.name().unwrap_or_else(|_| "<unnamed>".into());

        let device_ids = match platform.get_devices(CL_DEVICE_TYPE_GPU) {
            Ok(ids) => ids,
            Err(e) if e.0 == CL_DEVICE_NOT_FOUND => Vec::new(),
            Err(e) => return Err(OffloadError::cl("query GPU devices")(e)),
        };
        let device_id = *device_ids
            .first()
            .ok_or_else(|| OffloadError::DeviceUnavailable { platform: platform_name.clone() })?;
        let device = Device::new(device_id);
        let device_name = device.name().unwrap_or_else(|_| "<unnamed>".into());

        // 2. Kontext & Queue
        let context = Context::from_device(&device).map_err(OffloadError::cl("create context"))?;
        #[allow(deprecated)]
        let queue = CommandQueue::create(&context, device.id(), 0)
            .map_err(OffloadError::cl("create command queue"))?;

        // 3. Kernel bauen
        let program = Program::create_and_build_from_source(&context, source.source, "")
            .map_err(|log| OffloadError::CompileFailure { kernel: source.name, log })?;
        let kernel = Kernel::create(&program, source.name).map_err(|e| OffloadError::CompileFailure {
            kernel: source.name,
            log: format!("kernel entry point not found (OpenCL status {})", e.0),
        })?;

        info!(
            platform = %platform_name,
            device = %device_name,
            kernel = source.name,
            version = source.version,
            "OpenCL session opened"
        );

        Ok(Self {
            _program: program,
            kernel,
            queue,
            context,
            kernel_name: source.name,
            platform_name,
            device_name,
        })
    }

    pub fn platform_name(&self) -> &str {
        &self.platform_name
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub fn kernel_name(&self) -> &'static str {
        self.kernel_name
    }
}

impl Drop for ClSession {
    fn drop(&mut self) {
        debug!(device = %self.device_name, kernel = self.kernel_name, "releasing OpenCL session");
    }
}

impl Backend for ClSession {
    type Buffer = Buffer<u8>;

    fn describe(&self) -> String {
        format!("{} / {}", self.platform_name, self.device_name)
    }

    fn alloc(&self, bytes: usize, access: Access) -> Result<Buffer<u8>> {
        let flags = match access {
            Access::ReadOnly => CL_MEM_READ_ONLY,
            Access::WriteOnly => CL_MEM_WRITE_ONLY,
            Access::ReadWrite => CL_MEM_READ_WRITE,
        };
        Buffer::<u8>::create(&self.context, flags, bytes, ptr::null_mut()).map_err(|e| {
            OffloadError::AllocationFailure { bytes, reason: format!("OpenCL status {}", e.0) }
        })
    }

    fn write_blocking(&self, buf: &mut Buffer<u8>, host: &[f64]) -> Result<()> {
        self.queue
            .enqueue_write_buffer(buf, CL_BLOCKING, 0, cast_slice(host), &[])
            .map_err(OffloadError::cl("write buffer"))?;
        Ok(())
    }

    fn enqueue_vec_add(
        &self,
        c: &mut Buffer<u8>,
        a: &Buffer<u8>,
        b: &Buffer<u8>,
        n: usize,
        grid: WorkGrid,
    ) -> Result<()> {
        let n = cl_int::try_from(n)
            .map_err(|_| OffloadError::InvalidArgument(format!("{n} elements exceed the kernel's int range")))?;

        // Reihenfolge wie in `vec_add(c, a, b, n)`
        self.kernel.set_arg(0, &*c).map_err(OffloadError::cl("set kernel arg c"))?;
        self.kernel.set_arg(1, a).map_err(OffloadError::cl("set kernel arg a"))?;
        self.kernel.set_arg(2, b).map_err(OffloadError::cl("set kernel arg b"))?;
        self.kernel.set_arg(3, &n).map_err(OffloadError::cl("set kernel arg n"))?;

        let global = [grid.global];
        let local = [grid.local];
        let _evt = self
            .queue
            .enqueue_nd_range_kernel(
                self.kernel.get(),
                1,
                ptr::null(),
                global.as_ptr(),
                local.as_ptr(),
                &[],
            )
            .map_err(OffloadError::cl("enqueue kernel"))?;

        debug!(global = grid.global, local = grid.local, "vec_add enqueued");
        Ok(())
    }

    fn finish(&self) -> Result<()> {
        self.queue.finish().map_err(OffloadError::cl("finish queue"))
    }

    fn read_blocking(&self, buf: &Buffer<u8>, host: &mut [f64]) -> Result<()> {
        self.queue
            .enqueue_read_buffer(buf, CL_BLOCKING, 0, cast_slice_mut(host), &[])
            .map_err(OffloadError::cl("read buffer"))?;
        Ok(())
    }
}
