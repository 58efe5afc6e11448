//! Order book - the central two-sided ladder.
//!
//! Ordered maps keyed by price give O(log L) level insert/erase and O(1)
//! best-price access at the map ends; each level's intrusive FIFO gives O(1)
//! admission and head removal; a hash index on order id gives O(1)
//! cancel/modify/get. The book exclusively owns the order pool and stamps
//! every admission with a monotonic tie-breaker timestamp.

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;

use crate::pool::{Order, OrderPool, PoolIndex, PoolStats, DEFAULT_SLAB_SIZE};
use crate::price_level::PriceLevel;
use crate::types::{OrderId, OrderStatus, OrderType, Price, Quantity, Side, TickClock, Timestamp};

/// Two-sided limit order book.
///
/// Bids are traversed highest-first, asks lowest-first. All order records
/// live in the pool; the level queues and the id index both hold pool
/// handles to the same records.
pub struct OrderBook {
    bid_levels: BTreeMap<Price, PriceLevel>,
    ask_levels: BTreeMap<Price, PriceLevel>,
    orders: FxHashMap<OrderId, PoolIndex>,
    pool: OrderPool,
    clock: TickClock,
}

impl OrderBook {
    pub fn new() -> Self {
        Self::with_slab_size(DEFAULT_SLAB_SIZE)
    }

    /// Create a book whose pool allocates `slab_size` records per slab.
    pub fn with_slab_size(slab_size: usize) -> Self {
        Self {
            bid_levels: BTreeMap::new(),
            ask_levels: BTreeMap::new(),
            orders: FxHashMap::default(),
            pool: OrderPool::new(slab_size),
            clock: TickClock::new(),
        }
    }

    // ========================================================================
    // Order Management
    // ========================================================================

    /// Admit an order to the book.
    ///
    /// Rejects (returns `false`) on zero quantity, a duplicate id, or pool
    /// exhaustion. Otherwise the order is stamped with a fresh admission
    /// timestamp and linked to the tail of its price level, creating the
    /// level if absent.
    ///
    /// # Complexity
    /// O(log L), dominated by level lookup/creation.
    pub fn add_order(
        &mut self,
        id: OrderId,
        side: Side,
        order_type: OrderType,
        price: Price,
        quantity: Quantity,
    ) -> bool {
        if quantity == 0 {
            return false;
        }
        if self.orders.contains_key(&id) {
            return false;
        }

        let handle = match self.pool.acquire() {
            Some(handle) => handle,
            None => return false,
        };

        let timestamp = self.clock.tick();
        {
            let order = self.pool.get_mut(handle);
            order.id = id;
            order.side = side;
            order.order_type = order_type;
            order.status = OrderStatus::New;
            order.price = price;
            order.quantity = quantity;
            order.filled_quantity = 0;
            order.timestamp = timestamp;
        }

        let levels = match side {
            Side::Buy => &mut self.bid_levels,
            Side::Sell => &mut self.ask_levels,
        };
        let level = levels.entry(price).or_insert_with(|| PriceLevel::new(price));
        level.push_back(&mut self.pool, handle);

        self.orders.insert(id, handle);
        true
    }

    /// Cancel a resting order.
    ///
    /// Returns `true` if an order was removed. The level is erased if it
    /// becomes empty, and the record is released back to the pool.
    pub fn cancel_order(&mut self, id: OrderId) -> bool {
        let handle = match self.orders.get(&id) {
            Some(&handle) => handle,
            None => return false,
        };
        if self.pool.get(handle).is_filled() {
            return false;
        }

        self.unlink_from_level(handle);
        self.orders.remove(&id);
        self.pool.release(handle);
        true
    }

    /// Modify a resting order's price and/or quantity.
    ///
    /// Rejects on zero quantity, an unknown id, or a new quantity below the
    /// already-filled amount.
    ///
    /// A size-up at the same price mutates the record in place and keeps its
    /// time priority. Any price change or quantity reduction re-admits the
    /// order at the tail of its (possibly new) level with a fresh timestamp,
    /// so time priority is lost; the filled portion carries over. Reducing
    /// the quantity to exactly the filled amount removes the order.
    ///
    /// The modified order is not re-matched: a price that now crosses the
    /// opposite side rests until the next crossing submission.
    pub fn modify_order(&mut self, id: OrderId, new_price: Price, new_quantity: Quantity) -> bool {
        if new_quantity == 0 {
            return false;
        }
        let handle = match self.orders.get(&id) {
            Some(&handle) => handle,
            None => return false,
        };

        let (side, order_type, price, quantity, filled) = {
            let order = self.pool.get(handle);
            (
                order.side,
                order.order_type,
                order.price,
                order.quantity,
                order.filled_quantity,
            )
        };
        if new_quantity < filled {
            return false;
        }

        // In-place size-up at the same price keeps time priority.
        if new_price == price && new_quantity >= quantity {
            let old_remaining = quantity - filled;
            self.pool.get_mut(handle).quantity = new_quantity;
            let levels = match side {
                Side::Buy => &mut self.bid_levels,
                Side::Sell => &mut self.ask_levels,
            };
            if let Some(level) = levels.get_mut(&price) {
                level.update_total(old_remaining, new_quantity - filled);
            }
            return true;
        }

        // Cancel + re-admit: time priority is lost.
        self.unlink_from_level(handle);
        self.orders.remove(&id);
        self.pool.release(handle);

        let remaining = new_quantity - filled;
        if remaining == 0 {
            return true;
        }
        if !self.add_order(id, side, order_type, new_price, remaining) {
            return false;
        }

        // Carry the filled portion over to the replacement record. Its
        // remaining quantity is unchanged, so the level total stays exact.
        if let Some(&new_handle) = self.orders.get(&id) {
            let order = self.pool.get_mut(new_handle);
            order.quantity = new_quantity;
            order.filled_quantity = filled;
            if filled > 0 {
                order.status = OrderStatus::PartiallyFilled;
            }
        }
        true
    }

    /// Read-only view of a live order.
    #[inline]
    pub fn get_order(&self, id: OrderId) -> Option<&Order> {
        self.orders.get(&id).map(|&handle| self.pool.get(handle))
    }

    /// Number of orders resting in the book.
    #[inline]
    pub fn order_count(&self) -> usize {
        self.orders.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Release every record and empty all structures. The pool keeps its
    /// slabs; subsequent admissions reuse them through the free list.
    pub fn clear(&mut self) {
        for (_, handle) in self.orders.drain() {
            self.pool.release(handle);
        }
        self.bid_levels.clear();
        self.ask_levels.clear();
    }

    // ========================================================================
    // Top of Book / Depth
    // ========================================================================

    /// Highest buy price, or `None` if there are no bids.
    #[inline]
    pub fn best_bid(&self) -> Option<Price> {
        self.bid_levels.keys().next_back().copied()
    }

    /// Lowest sell price, or `None` if there are no asks.
    #[inline]
    pub fn best_ask(&self) -> Option<Price> {
        self.ask_levels.keys().next().copied()
    }

    /// Best price on the opposite side, the one an aggressor matches into.
    #[inline]
    pub fn best_opposite(&self, side: Side) -> Option<Price> {
        match side {
            Side::Buy => self.best_ask(),
            Side::Sell => self.best_bid(),
        }
    }

    /// `best_ask - best_bid` when both sides are populated.
    #[inline]
    pub fn spread(&self) -> Option<Price> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some(ask - bid),
            _ => None,
        }
    }

    /// Total remaining quantity resting at a price, or 0 if no level exists.
    pub fn depth_at_price(&self, side: Side, price: Price) -> Quantity {
        self.level(side, price).map_or(0, |l| l.total_quantity)
    }

    /// Number of orders resting at a price.
    pub fn order_count_at_price(&self, side: Side, price: Price) -> u32 {
        self.level(side, price).map_or(0, |l| l.count)
    }

    /// Top `n` levels as `(price, total_quantity)` pairs in side-natural
    /// order: bids descending, asks ascending.
    pub fn get_levels(&self, side: Side, n: usize) -> Vec<(Price, Quantity)> {
        match side {
            Side::Buy => self
                .bid_levels
                .iter()
                .rev()
                .take(n)
                .map(|(&price, level)| (price, level.total_quantity))
                .collect(),
            Side::Sell => self
                .ask_levels
                .iter()
                .take(n)
                .map(|(&price, level)| (price, level.total_quantity))
                .collect(),
        }
    }

    /// Number of populated bid levels.
    #[inline]
    pub fn bid_level_count(&self) -> usize {
        self.bid_levels.len()
    }

    /// Number of populated ask levels.
    #[inline]
    pub fn ask_level_count(&self) -> usize {
        self.ask_levels.len()
    }

    /// Pool occupancy, exposing free-list reuse to callers.
    #[inline]
    pub fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }

    // ========================================================================
    // Matcher Surface
    // ========================================================================

    /// Pool handle of a live order.
    #[inline]
    pub(crate) fn handle_of(&self, id: OrderId) -> Option<PoolIndex> {
        self.orders.get(&id).copied()
    }

    #[inline]
    pub(crate) fn order(&self, handle: PoolIndex) -> &Order {
        self.pool.get(handle)
    }

    #[inline]
    pub(crate) fn order_mut(&mut self, handle: PoolIndex) -> &mut Order {
        self.pool.get_mut(handle)
    }

    /// Head of the FIFO at a price, or `None` if the level is absent.
    ///
    /// # Complexity
    /// O(log L)
    pub(crate) fn first_order_at_price(&self, side: Side, price: Price) -> Option<PoolIndex> {
        self.level(side, price).and_then(|level| {
            if level.is_empty() {
                None
            } else {
                Some(level.first())
            }
        })
    }

    /// Remove a fully-filled order: unlink, drop from the id index, release.
    pub(crate) fn remove_filled_order(&mut self, handle: PoolIndex) {
        debug_assert!(self.pool.get(handle).is_filled());
        let id = self.pool.get(handle).id;
        self.unlink_from_level(handle);
        self.orders.remove(&id);
        self.pool.release(handle);
    }

    /// Fold a resting order's changed remaining quantity into its level
    /// total. Called after the matcher bumps `filled_quantity` in place.
    pub(crate) fn update_level_total_incremental(
        &mut self,
        handle: PoolIndex,
        old_remaining: Quantity,
    ) {
        let (side, price, new_remaining) = {
            let order = self.pool.get(handle);
            (order.side, order.price, order.remaining())
        };
        let levels = match side {
            Side::Buy => &mut self.bid_levels,
            Side::Sell => &mut self.ask_levels,
        };
        if let Some(level) = levels.get_mut(&price) {
            level.update_total(old_remaining, new_remaining);
        }
    }

    /// Quantity reachable by an aggressor of `side` at prices no worse than
    /// `limit`, walking the opposite side best-first and stopping once `cap`
    /// is reached. Used for all-or-nothing admission checks.
    pub(crate) fn crossable_quantity(&self, side: Side, limit: Price, cap: Quantity) -> Quantity {
        let mut reachable: Quantity = 0;
        match side {
            Side::Buy => {
                for (&price, level) in self.ask_levels.iter() {
                    if price > limit {
                        break;
                    }
                    reachable += level.total_quantity;
                    if reachable >= cap {
                        break;
                    }
                }
            }
            Side::Sell => {
                for (&price, level) in self.bid_levels.iter().rev() {
                    if price < limit {
                        break;
                    }
                    reachable += level.total_quantity;
                    if reachable >= cap {
                        break;
                    }
                }
            }
        }
        reachable.min(cap)
    }

    /// Fresh stamp from the admission clock, shared with trade records.
    #[inline]
    pub(crate) fn stamp(&mut self) -> Timestamp {
        self.clock.tick()
    }

    // ========================================================================
    // Internals
    // ========================================================================

    #[inline]
    fn level(&self, side: Side, price: Price) -> Option<&PriceLevel> {
        match side {
            Side::Buy => self.bid_levels.get(&price),
            Side::Sell => self.ask_levels.get(&price),
        }
    }

    /// Unlink from the level FIFO, erasing the level if it becomes empty.
    fn unlink_from_level(&mut self, handle: PoolIndex) {
        let (side, price) = {
            let order = self.pool.get(handle);
            (order.side, order.price)
        };
        let levels = match side {
            Side::Buy => &mut self.bid_levels,
            Side::Sell => &mut self.ask_levels,
        };
        if let Some(level) = levels.get_mut(&price) {
            if level.remove(&mut self.pool, handle) {
                levels.remove(&price);
            }
        }
    }
}

impl Default for OrderBook {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for OrderBook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderBook")
            .field("best_bid", &self.best_bid())
            .field("best_ask", &self.best_ask())
            .field("bid_levels", &self.bid_levels.len())
            .field("ask_levels", &self.ask_levels.len())
            .field("order_count", &self.orders.len())
            .finish()
    }
}
