//! Embedded device code.

/// A kernel shipped as OpenCL C source inside the binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelSource {
    /// Entry point passed to `clCreateKernel`.
    pub name: &'static str,
    /// Bumped whenever the argument list or semantics change.
    pub version: u32,
    pub source: &'static str,
}

/// `vec_add(c, a, b, n)`: `c[id] = a[id] + b[id]` for every `id < n`.
pub const VEC_ADD: KernelSource = KernelSource {
    name: "vec_add",
    version: 1,
    source: include_str!("../kernels/vec_add.cl"),
};

/// Host reference of one `vec_add` work-item.
///
/// The slices may be longer than `n`; lanes at or past `n` touch nothing.
#[inline(always)]
pub fn vec_add_lane(id: usize, n: usize, c: &mut [f64], a: &[f64], b: &[f64]) {
    if id < n {
        c[id] = a[id] + b[id];
    }
}
