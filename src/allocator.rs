//! String allocators for indefinite-length strings and "allocate all" decoding.
//!
//! The decoder uses an allocator under a stack discipline: `reallocate` and `free` are only ever
//! called on the most recent allocation, and `destruct` is called once by
//! [`crate::Decoder::finish`]. Allocations are addressed by integer handles, never pointers.

#[cfg(feature = "alloc")]
use alloc::vec::Vec;

/// Handle to an allocator-owned region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AllocHandle {
    start: usize,
    len: usize,
}

impl AllocHandle {
    /// Construct a handle. Allocator implementations hand these out; the decoder never forges them.
    #[must_use]
    pub const fn new(start: usize, len: usize) -> Self {
        Self { start, len }
    }

    /// Offset of the region within the allocator's storage.
    #[must_use]
    pub const fn start(&self) -> usize {
        self.start
    }

    /// Length of the region.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns true for zero-length regions.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// The four-mode string allocator contract.
///
/// Implementations may be general-purpose; the decoder only relies on the stack discipline
/// described in the module docs.
pub trait StringAllocator {
    /// Allocate a new region of `len` bytes. `None` when exhausted.
    fn allocate(&mut self, len: usize) -> Option<AllocHandle>;

    /// Grow (in place or by moving) the most recent region to `new_len` bytes, keeping its prefix.
    fn reallocate(&mut self, handle: AllocHandle, new_len: usize) -> Option<AllocHandle>;

    /// Release the most recent region.
    fn free(&mut self, handle: AllocHandle);

    /// Release everything. Called once when decoding finishes.
    fn destruct(&mut self);

    /// Bytes of a region; empty for handles this allocator did not produce.
    fn bytes(&self, handle: AllocHandle) -> &[u8];

    /// Mutable bytes of a region; empty for handles this allocator did not produce.
    fn bytes_mut(&mut self, handle: AllocHandle) -> &mut [u8];
}

/// Bump allocator over a caller-provided buffer.
///
/// Needs no heap. Strings stay readable through [`StringAllocator::bytes`] until the next
/// allocation after [`StringAllocator::destruct`].
#[derive(Debug)]
pub struct PoolAllocator<'p> {
    pool: &'p mut [u8],
    used: usize,
    last: Option<AllocHandle>,
}

impl<'p> PoolAllocator<'p> {
    /// Create an allocator that hands out regions of `pool`.
    #[must_use]
    pub fn new(pool: &'p mut [u8]) -> Self {
        Self {
            pool,
            used: 0,
            last: None,
        }
    }

    /// Bytes currently handed out.
    #[must_use]
    pub const fn used(&self) -> usize {
        self.used
    }

    /// Total pool size.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.pool.len()
    }
}

impl StringAllocator for PoolAllocator<'_> {
    fn allocate(&mut self, len: usize) -> Option<AllocHandle> {
        let end = self.used.checked_add(len)?;
        if end > self.pool.len() {
            return None;
        }
        let handle = AllocHandle::new(self.used, len);
        self.used = end;
        self.last = Some(handle);
        Some(handle)
    }

    fn reallocate(&mut self, handle: AllocHandle, new_len: usize) -> Option<AllocHandle> {
        if self.last.map(|h| h.start) == Some(handle.start) {
            let end = handle.start.checked_add(new_len)?;
            if end > self.pool.len() {
                return None;
            }
            let grown = AllocHandle::new(handle.start, new_len);
            self.used = end;
            self.last = Some(grown);
            return Some(grown);
        }

        let keep = handle.len.min(new_len);
        if handle.start.checked_add(keep)? > self.pool.len() {
            return None;
        }
        let moved = self.allocate(new_len)?;
        self.pool
            .copy_within(handle.start..handle.start + keep, moved.start);
        Some(moved)
    }

    fn free(&mut self, handle: AllocHandle) {
        if self.last == Some(handle) {
            self.used = handle.start;
            self.last = None;
        }
    }

    fn destruct(&mut self) {
        self.used = 0;
        self.last = None;
    }

    fn bytes(&self, handle: AllocHandle) -> &[u8] {
        handle
            .start
            .checked_add(handle.len)
            .and_then(|end| self.pool.get(handle.start..end))
            .unwrap_or(&[])
    }

    fn bytes_mut(&mut self, handle: AllocHandle) -> &mut [u8] {
        match handle.start.checked_add(handle.len) {
            Some(end) if end <= self.pool.len() => &mut self.pool[handle.start..end],
            _ => &mut [],
        }
    }
}

/// Heap-backed arena with the same stack discipline as [`PoolAllocator`].
///
/// Growth uses fallible reservation; an allocation failure surfaces as `StringAllocateFailed`
/// instead of aborting.
#[cfg(feature = "alloc")]
#[cfg_attr(docsrs, doc(cfg(feature = "alloc")))]
#[derive(Debug, Default)]
pub struct VecAllocator {
    arena: Vec<u8>,
    last: Option<AllocHandle>,
    limit: Option<usize>,
}

#[cfg(feature = "alloc")]
impl VecAllocator {
    /// Create an unbounded arena.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            arena: Vec::new(),
            last: None,
            limit: None,
        }
    }

    /// Create an arena that refuses to grow beyond `limit` bytes.
    #[must_use]
    pub const fn with_limit(limit: usize) -> Self {
        Self {
            arena: Vec::new(),
            last: None,
            limit: Some(limit),
        }
    }

    fn grow_to(&mut self, end: usize) -> Option<()> {
        if self.limit.is_some_and(|limit| end > limit) {
            return None;
        }
        if end > self.arena.len() {
            self.arena.try_reserve(end - self.arena.len()).ok()?;
        }
        self.arena.resize(end, 0);
        Some(())
    }
}

#[cfg(feature = "alloc")]
impl StringAllocator for VecAllocator {
    fn allocate(&mut self, len: usize) -> Option<AllocHandle> {
        let start = self.arena.len();
        self.grow_to(start.checked_add(len)?)?;
        let handle = AllocHandle::new(start, len);
        self.last = Some(handle);
        Some(handle)
    }

    fn reallocate(&mut self, handle: AllocHandle, new_len: usize) -> Option<AllocHandle> {
        if self.last.map(|h| h.start) == Some(handle.start) {
            self.grow_to(handle.start.checked_add(new_len)?)?;
            let grown = AllocHandle::new(handle.start, new_len);
            self.last = Some(grown);
            return Some(grown);
        }

        let keep = handle.len.min(new_len);
        if handle.start.checked_add(keep)? > self.arena.len() {
            return None;
        }
        let moved = self.allocate(new_len)?;
        self.arena
            .copy_within(handle.start..handle.start + keep, moved.start);
        Some(moved)
    }

    fn free(&mut self, handle: AllocHandle) {
        if self.last == Some(handle) {
            self.arena.truncate(handle.start);
            self.last = None;
        }
    }

    fn destruct(&mut self) {
        self.arena.clear();
        self.last = None;
    }

    fn bytes(&self, handle: AllocHandle) -> &[u8] {
        handle
            .start
            .checked_add(handle.len)
            .and_then(|end| self.arena.get(handle.start..end))
            .unwrap_or(&[])
    }

    fn bytes_mut(&mut self, handle: AllocHandle) -> &mut [u8] {
        match handle.start.checked_add(handle.len) {
            Some(end) if end <= self.arena.len() => &mut self.arena[handle.start..end],
            _ => &mut [],
        }
    }
}
