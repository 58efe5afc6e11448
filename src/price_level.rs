//! Price level - the FIFO queue of orders resting at a single price.
//!
//! A doubly-linked list threaded through pool indices gives O(1) tail
//! insertion, O(1) head access for matching, and O(1) unlink from any
//! position for cancels. `total_quantity` is the sum of the *remaining*
//! quantity of every queued order, maintained incrementally on every
//! mutation rather than recomputed.

use crate::pool::{OrderPool, PoolIndex, NULL_INDEX};
use crate::types::{Price, Quantity};

/// All orders resting at one price on one side.
///
/// Head is the oldest order (first to match); tail is the newest.
#[derive(Clone, Copy, Debug)]
pub struct PriceLevel {
    pub price: Price,
    /// Sum of remaining quantities across the queue.
    pub total_quantity: Quantity,
    /// Number of orders in the queue.
    pub count: u32,
    pub(crate) head: PoolIndex,
    pub(crate) tail: PoolIndex,
}

impl PriceLevel {
    #[inline]
    pub const fn new(price: Price) -> Self {
        Self {
            price,
            total_quantity: 0,
            count: 0,
            head: NULL_INDEX,
            tail: NULL_INDEX,
        }
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Head of the queue, or `NULL_INDEX` if empty.
    #[inline]
    pub const fn first(&self) -> PoolIndex {
        self.head
    }

    /// Append an order to the tail of the queue, preserving time priority.
    ///
    /// # Complexity
    /// O(1)
    pub fn push_back(&mut self, pool: &mut OrderPool, index: PoolIndex) {
        let remaining = pool.get(index).remaining();

        if self.tail == NULL_INDEX {
            debug_assert!(self.head == NULL_INDEX);
            let node = pool.get_mut(index);
            node.prev = NULL_INDEX;
            node.next = NULL_INDEX;
            self.head = index;
            self.tail = index;
        } else {
            debug_assert!(
                pool.get(self.tail).timestamp <= pool.get(index).timestamp,
                "FIFO timestamps must be non-decreasing"
            );
            pool.get_mut(self.tail).next = index;
            let node = pool.get_mut(index);
            node.prev = self.tail;
            node.next = NULL_INDEX;
            self.tail = index;
        }

        self.count += 1;
        self.total_quantity += remaining;
    }

    /// Unlink an order from anywhere in the queue.
    ///
    /// Returns `true` if the level is now empty. The record is not released;
    /// the caller owns that step.
    ///
    /// # Complexity
    /// O(1)
    pub fn remove(&mut self, pool: &mut OrderPool, index: PoolIndex) -> bool {
        let (prev, next, remaining) = {
            let node = pool.get(index);
            (node.prev, node.next, node.remaining())
        };

        if prev == NULL_INDEX {
            debug_assert!(self.head == index);
            self.head = next;
        } else {
            pool.get_mut(prev).next = next;
        }

        if next == NULL_INDEX {
            debug_assert!(self.tail == index);
            self.tail = prev;
        } else {
            pool.get_mut(next).prev = prev;
        }

        let node = pool.get_mut(index);
        node.prev = NULL_INDEX;
        node.next = NULL_INDEX;

        debug_assert!(self.count > 0);
        debug_assert!(self.total_quantity >= remaining);
        self.count -= 1;
        self.total_quantity -= remaining;

        self.count == 0
    }

    /// Adjust the level total after an order's remaining quantity changed
    /// in place (partial fill or in-place size-up).
    #[inline]
    pub fn update_total(&mut self, old_remaining: Quantity, new_remaining: Quantity) {
        debug_assert!(self.total_quantity >= old_remaining);
        self.total_quantity = self.total_quantity - old_remaining + new_remaining;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::OrderPool;

    fn make_orders(pool: &mut OrderPool, count: u64) -> Vec<PoolIndex> {
        let mut indices = Vec::new();
        for i in 0..count {
            let idx = pool.acquire().unwrap();
            let node = pool.get_mut(idx);
            node.id = i;
            node.price = 100;
            node.quantity = 10;
            node.timestamp = i + 1;
            indices.push(idx);
        }
        indices
    }

    #[test]
    fn test_empty_level() {
        let level = PriceLevel::new(100);
        assert!(level.is_empty());
        assert_eq!(level.count, 0);
        assert_eq!(level.total_quantity, 0);
        assert_eq!(level.first(), NULL_INDEX);
    }

    #[test]
    fn test_push_back_fifo_linkage() {
        let mut pool = OrderPool::new(16);
        let mut level = PriceLevel::new(100);
        let idx = make_orders(&mut pool, 3);

        for &i in &idx {
            level.push_back(&mut pool, i);
        }

        assert_eq!(level.count, 3);
        assert_eq!(level.total_quantity, 30);
        assert_eq!(level.first(), idx[0]);
        assert_eq!(level.tail, idx[2]);
        assert_eq!(pool.get(idx[0]).next, idx[1]);
        assert_eq!(pool.get(idx[1]).prev, idx[0]);
        assert_eq!(pool.get(idx[1]).next, idx[2]);
        assert_eq!(pool.get(idx[2]).prev, idx[1]);
    }

    #[test]
    fn test_total_counts_remaining_not_original() {
        let mut pool = OrderPool::new(16);
        let mut level = PriceLevel::new(100);

        let idx = pool.acquire().unwrap();
        {
            let node = pool.get_mut(idx);
            node.quantity = 10;
            node.filled_quantity = 4;
        }
        level.push_back(&mut pool, idx);
        assert_eq!(level.total_quantity, 6);

        level.remove(&mut pool, idx);
        assert_eq!(level.total_quantity, 0);
    }

    #[test]
    fn test_remove_only_node() {
        let mut pool = OrderPool::new(16);
        let mut level = PriceLevel::new(100);
        let idx = make_orders(&mut pool, 1);

        level.push_back(&mut pool, idx[0]);
        let now_empty = level.remove(&mut pool, idx[0]);

        assert!(now_empty);
        assert!(level.is_empty());
        assert_eq!(level.head, NULL_INDEX);
        assert_eq!(level.tail, NULL_INDEX);
    }

    #[test]
    fn test_remove_head() {
        let mut pool = OrderPool::new(16);
        let mut level = PriceLevel::new(100);
        let idx = make_orders(&mut pool, 3);
        for &i in &idx {
            level.push_back(&mut pool, i);
        }

        assert!(!level.remove(&mut pool, idx[0]));
        assert_eq!(level.first(), idx[1]);
        assert_eq!(pool.get(idx[1]).prev, NULL_INDEX);
        assert_eq!(level.count, 2);
    }

    #[test]
    fn test_remove_tail() {
        let mut pool = OrderPool::new(16);
        let mut level = PriceLevel::new(100);
        let idx = make_orders(&mut pool, 3);
        for &i in &idx {
            level.push_back(&mut pool, i);
        }

        assert!(!level.remove(&mut pool, idx[2]));
        assert_eq!(level.tail, idx[1]);
        assert_eq!(pool.get(idx[1]).next, NULL_INDEX);
    }

    #[test]
    fn test_remove_middle() {
        let mut pool = OrderPool::new(16);
        let mut level = PriceLevel::new(100);
        let idx = make_orders(&mut pool, 3);
        for &i in &idx {
            level.push_back(&mut pool, i);
        }

        assert!(!level.remove(&mut pool, idx[1]));
        assert_eq!(pool.get(idx[0]).next, idx[2]);
        assert_eq!(pool.get(idx[2]).prev, idx[0]);
        assert_eq!(level.count, 2);
        assert_eq!(level.total_quantity, 20);
    }

    #[test]
    fn test_update_total() {
        let mut level = PriceLevel::new(100);
        level.total_quantity = 50;

        // partial fill: remaining 20 -> 5
        level.update_total(20, 5);
        assert_eq!(level.total_quantity, 35);

        // in-place size-up: remaining 5 -> 25
        level.update_total(5, 25);
        assert_eq!(level.total_quantity, 55);
    }
}
