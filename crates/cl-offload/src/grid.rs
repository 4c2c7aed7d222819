//! One-dimensional NDRange sizing.

/// Work-items per work-group.
pub const LOCAL_WORK_SIZE: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkGrid {
    pub global: usize,
    pub local: usize,
}

impl WorkGrid {
    /// Rounds `n` up to the next multiple of [`LOCAL_WORK_SIZE`].
    #[inline]
    pub fn for_len(n: usize) -> Self {
        let local = LOCAL_WORK_SIZE;
        Self { global: n.div_ceil(local) * local, local }
    }

    #[inline]
    pub fn groups(&self) -> usize {
        self.global / self.local
    }

    /// Lanes the kernel's bounds check has to mask off.
    #[inline]
    pub fn idle_lanes(&self, n: usize) -> usize {
        self.global.saturating_sub(n)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.global == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn known_sizes() {
        assert_eq!(WorkGrid::for_len(0).global, 0);
        assert_eq!(WorkGrid::for_len(1).global, 64);
        assert_eq!(WorkGrid::for_len(64).global, 64);
        assert_eq!(WorkGrid::for_len(65).global, 128);
        assert_eq!(WorkGrid::for_len(1000).global, 1024);
        assert_eq!(WorkGrid::for_len(1000).groups(), 16);
        assert_eq!(WorkGrid::for_len(1000).idle_lanes(1000), 24);
    }

    #[test]
    fn empty_only_for_zero() {
        assert!(WorkGrid::for_len(0).is_empty());
        assert!(!WorkGrid::for_len(1).is_empty());
    }

    proptest! {
        /// Global size is a multiple of 64, covers n and wastes less than one group.
        #[test]
        fn global_covers_n_in_whole_groups(n in 0usize..(1 << 26)) {
            let grid = WorkGrid::for_len(n);
            prop_assert_eq!(grid.local, LOCAL_WORK_SIZE);
            prop_assert_eq!(grid.global % LOCAL_WORK_SIZE, 0);
            prop_assert!(grid.global >= n);
            prop_assert!(grid.idle_lanes(n) < LOCAL_WORK_SIZE);
        }
    }
}
