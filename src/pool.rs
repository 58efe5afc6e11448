//! Pooled order store - O(1) slab-backed allocator for order records.
//!
//! Records are handed out as dense `u32` indices ("compressed pointers"),
//! halving link metadata versus raw pointers. A free list threaded through
//! the records' own `next` field gives O(1) reuse; when the free list is
//! empty, allocation bumps within the current slab, and a fresh slab is
//! appended only when the current one is exhausted. Slabs are never returned
//! to the host before the pool is dropped, so steady-state operation does no
//! heap traffic.

use crate::types::{OrderId, OrderStatus, OrderType, Price, Quantity, Side, Timestamp};

/// Sentinel value representing a null/invalid pool index.
pub const NULL_INDEX: u32 = u32::MAX;

/// Dense handle into the pool.
pub type PoolIndex = u32;

/// Records per slab if none is configured. Rounded up to a power of two.
pub const DEFAULT_SLAB_SIZE: usize = 1024;

/// A single order record.
///
/// Owned by the pool for as long as the book references it. The `next`/`prev`
/// links thread the record into its price level's FIFO queue while it rests;
/// `next` doubles as the free-list link once the record is released.
#[derive(Clone, Copy, Debug)]
pub struct Order {
    pub id: OrderId,
    pub side: Side,
    pub order_type: OrderType,
    pub status: OrderStatus,
    /// Limit price in ticks. Nominal (conventionally 0) for market orders.
    pub price: Price,
    /// Original quantity at admission.
    pub quantity: Quantity,
    /// Monotonically non-decreasing, never exceeds `quantity`.
    pub filled_quantity: Quantity,
    /// Admission stamp; the time-priority tie-breaker within a level.
    pub timestamp: Timestamp,
    pub(crate) next: PoolIndex,
    pub(crate) prev: PoolIndex,
}

impl Order {
    /// A zeroed, unlinked record.
    #[inline]
    pub const fn vacant() -> Self {
        Self {
            id: 0,
            side: Side::Buy,
            order_type: OrderType::Limit,
            status: OrderStatus::New,
            price: 0,
            quantity: 0,
            filled_quantity: 0,
            timestamp: 0,
            next: NULL_INDEX,
            prev: NULL_INDEX,
        }
    }

    /// Zero the record for reuse.
    #[inline]
    pub fn reset(&mut self) {
        *self = Self::vacant();
    }

    /// Unfilled quantity.
    #[inline]
    pub fn remaining(&self) -> Quantity {
        self.quantity - self.filled_quantity
    }

    #[inline]
    pub fn is_filled(&self) -> bool {
        self.filled_quantity >= self.quantity
    }
}

/// Pool occupancy snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PoolStats {
    /// Slabs currently allocated.
    pub slabs: usize,
    /// Records per slab.
    pub slab_size: u32,
    /// Records handed out and not yet released.
    pub live: u32,
    /// Records waiting on the free list.
    pub free: u32,
}

/// Slab-backed pool with O(1) acquire and release.
///
/// Acquire order: free list first (LIFO), then a pointer bump within the
/// newest slab, then a fresh slab. `acquire` fails only when the `u32` index
/// space is exhausted.
pub struct OrderPool {
    slabs: Vec<Box<[Order]>>,
    /// Records per slab; always a power of two.
    slab_size: u32,
    /// log2(slab_size), for handle decomposition.
    shift: u32,
    mask: u32,
    /// Offset of the next never-used record in the newest slab.
    bump: u32,
    free_head: PoolIndex,
    free_len: u32,
    live: u32,
}

impl OrderPool {
    /// Create a pool whose slabs hold `slab_size` records (rounded up to a
    /// power of two). The first slab is allocated eagerly.
    ///
    /// # Panics
    /// Panics if `slab_size` is zero or would not fit the index space.
    pub fn new(slab_size: usize) -> Self {
        assert!(slab_size > 0, "slab size must be non-zero");
        let slab_size = slab_size.next_power_of_two();
        assert!(
            slab_size <= (NULL_INDEX as usize + 1) / 2,
            "slab size exceeds index space"
        );
        let slab_size = slab_size as u32;

        let mut pool = Self {
            slabs: Vec::new(),
            slab_size,
            shift: slab_size.trailing_zeros(),
            mask: slab_size - 1,
            bump: 0,
            free_head: NULL_INDEX,
            free_len: 0,
            live: 0,
        };
        pool.push_slab();
        pool
    }

    /// Acquire a zeroed record.
    ///
    /// # Complexity
    /// O(1) amortized; a new slab is allocated only when the free list is
    /// empty and the current slab is full.
    #[inline]
    pub fn acquire(&mut self) -> Option<PoolIndex> {
        if self.free_head != NULL_INDEX {
            let index = self.free_head;
            self.free_head = self.get(index).next;
            self.free_len -= 1;
            self.live += 1;
            self.get_mut(index).reset();
            return Some(index);
        }

        if self.bump >= self.slab_size {
            if !self.can_grow() {
                return None;
            }
            self.push_slab();
        }

        let slab = (self.slabs.len() - 1) as u32;
        let index = (slab << self.shift) | self.bump;
        self.bump += 1;
        self.live += 1;
        self.get_mut(index).reset();
        Some(index)
    }

    /// Release a record back to the free list (LIFO). The free-list link
    /// aliases the record's `next` field; the storage is reused verbatim on
    /// a later acquire. Releasing `NULL_INDEX` is a no-op.
    ///
    /// The handle must not be used again after this call.
    #[inline]
    pub fn release(&mut self, index: PoolIndex) {
        if index == NULL_INDEX {
            return;
        }
        debug_assert!(self.in_bounds(index), "index out of bounds");
        debug_assert!(self.live > 0, "double free detected");

        let free_head = self.free_head;
        let node = self.get_mut(index);
        node.reset();
        node.next = free_head;
        self.free_head = index;
        self.free_len += 1;
        self.live -= 1;
    }

    /// # Complexity
    /// O(1) - direct slab indexing.
    #[inline]
    pub fn get(&self, index: PoolIndex) -> &Order {
        debug_assert!(self.in_bounds(index), "index out of bounds");
        &self.slabs[(index >> self.shift) as usize][(index & self.mask) as usize]
    }

    /// # Complexity
    /// O(1) - direct slab indexing.
    #[inline]
    pub fn get_mut(&mut self, index: PoolIndex) -> &mut Order {
        debug_assert!(self.in_bounds(index), "index out of bounds");
        &mut self.slabs[(index >> self.shift) as usize][(index & self.mask) as usize]
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            slabs: self.slabs.len(),
            slab_size: self.slab_size,
            live: self.live,
            free: self.free_len,
        }
    }

    /// An index is valid if it lies in a full slab, or below the bump
    /// watermark of the newest slab.
    #[inline]
    fn in_bounds(&self, index: PoolIndex) -> bool {
        let slab = (index >> self.shift) as usize;
        slab + 1 < self.slabs.len()
            || (slab + 1 == self.slabs.len() && (index & self.mask) < self.bump)
    }

    /// Whether one more slab still fits below `NULL_INDEX`.
    #[inline]
    fn can_grow(&self) -> bool {
        (self.slabs.len() as u64 + 1) * self.slab_size as u64 <= NULL_INDEX as u64
    }

    fn push_slab(&mut self) {
        self.slabs
            .push(vec![Order::vacant(); self.slab_size as usize].into_boxed_slice());
        self.bump = 0;
    }
}

impl std::fmt::Debug for OrderPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderPool")
            .field("slabs", &self.slabs.len())
            .field("slab_size", &self.slab_size)
            .field("live", &self.live)
            .field("free", &self.free_len)
            .finish()
    }
}
